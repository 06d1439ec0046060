use std::collections::HashMap;
use std::time::Duration;

use futures::future::BoxFuture;

use gatehouse_core::config::HttpConfig;
use gatehouse_core::error::{GatehouseError, Result};

use crate::request::{ApiRequest, HttpMethod};

/// Raw HTTP exchange result: any status code counts as a response.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub body: String,
}

impl RawResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Performs a single HTTP exchange.
///
/// `Err` means no response arrived (connect failure, timeout, broken
/// connection); the retrying client only retries those.
pub trait HttpTransport: Send + Sync + 'static {
    fn send<'a>(
        &'a self,
        request: &'a ApiRequest,
        method: HttpMethod,
    ) -> BoxFuture<'a, Result<RawResponse>>;
}

/// Transport backed by a shared `reqwest::Client`.
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(config: &HttpConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| GatehouseError::Transport(e.to_string()))?;
        Ok(Self { client })
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

fn to_reqwest_method(method: HttpMethod) -> reqwest::Method {
    match method {
        HttpMethod::Get => reqwest::Method::GET,
        HttpMethod::Post => reqwest::Method::POST,
        HttpMethod::Put => reqwest::Method::PUT,
        HttpMethod::Delete => reqwest::Method::DELETE,
    }
}

impl HttpTransport for ReqwestTransport {
    fn send<'a>(
        &'a self,
        request: &'a ApiRequest,
        method: HttpMethod,
    ) -> BoxFuture<'a, Result<RawResponse>> {
        Box::pin(async move {
            let mut req = self
                .client
                .request(to_reqwest_method(method), &request.url)
                .timeout(Duration::from_secs(request.timeout_seconds));
            for (k, v) in &request.headers {
                req = req.header(k.as_str(), v.as_str());
            }
            if method.carries_body() {
                if let Some(body) = request.body_text() {
                    req = req.body(body);
                }
            }

            let resp = req
                .send()
                .await
                .map_err(|e| GatehouseError::Transport(e.to_string()))?;

            let status = resp.status().as_u16();
            let headers = resp
                .headers()
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_str().unwrap_or("?").to_string()))
                .collect();
            let body = resp
                .text()
                .await
                .map_err(|e| GatehouseError::Transport(e.to_string()))?;

            Ok(RawResponse {
                status,
                headers,
                body,
            })
        })
    }
}
