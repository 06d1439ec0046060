use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{info, warn};

use gatehouse_core::config::HttpConfig;
use gatehouse_core::error::Result;

use crate::request::ApiRequest;
use crate::response::ApiResponse;
use crate::transport::{HttpTransport, RawResponse, ReqwestTransport};

/// API client that retries transport failures with a linearly growing delay.
///
/// Never fails: every outcome, including exhausted retries and a bad
/// request configuration, comes back as an [`ApiResponse`].
#[derive(Clone)]
pub struct RetryingApiClient {
    transport: Arc<dyn HttpTransport>,
    base_delay: Duration,
}

impl RetryingApiClient {
    pub fn new(transport: Arc<dyn HttpTransport>, base_delay: Duration) -> Self {
        Self {
            transport,
            base_delay,
        }
    }

    /// Client over a reqwest transport built from `[http]` config.
    pub fn from_config(config: &HttpConfig) -> Result<Self> {
        let transport = ReqwestTransport::new(config)?;
        Ok(Self::new(
            Arc::new(transport),
            Duration::from_millis(config.retry_base_delay_ms),
        ))
    }

    /// Delay applied before attempt `attempt` (1-based, so attempt 1 waits nothing).
    pub fn delay_before(&self, attempt: u32) -> Duration {
        if attempt <= 1 {
            Duration::ZERO
        } else {
            self.base_delay * attempt
        }
    }

    pub async fn call(&self, request: &ApiRequest) -> ApiResponse {
        let started = Instant::now();
        let elapsed_ms = || started.elapsed().as_millis() as u64;

        let method = match request.parsed_method() {
            Ok(m) => m,
            Err(e) => {
                warn!(url = %request.url, method = %request.method, "Rejecting API request");
                return ApiResponse::error(e.to_string()).with_elapsed(elapsed_ms());
            }
        };

        info!(method = %method, url = %request.url, "Calling API");

        let max_attempts = request.retry_count + 1;
        let mut last_error = String::from("no attempt made");

        for attempt in 1..=max_attempts {
            if attempt > 1 {
                let delay = self.delay_before(attempt);
                info!(
                    attempt,
                    max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    url = %request.url,
                    "Retrying API call"
                );
                tokio::time::sleep(delay).await;
            }

            match self.transport.send(request, method).await {
                Ok(raw) => {
                    let response = into_api_response(raw).with_elapsed(elapsed_ms());
                    info!(
                        url = %request.url,
                        status = response.status_code,
                        elapsed_ms = response.execution_time_ms,
                        "API call completed"
                    );
                    return response;
                }
                Err(e) => {
                    warn!(attempt, max_attempts, error = %e, "API call attempt failed");
                    last_error = e.to_string();
                }
            }
        }

        ApiResponse::error(format!(
            "API call failed after {} retries: {}",
            request.retry_count, last_error
        ))
        .with_elapsed(elapsed_ms())
    }
}

fn into_api_response(raw: RawResponse) -> ApiResponse {
    if raw.is_success() {
        let body = serde_json::from_str(&raw.body)
            .unwrap_or_else(|_| serde_json::Value::String(raw.body.clone()));
        ApiResponse::success(raw.status, body).with_headers(raw.headers)
    } else {
        ApiResponse::failure(raw.status, format!("HTTP {}: {}", raw.status, raw.body))
            .with_headers(raw.headers)
    }
}
