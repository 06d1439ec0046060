use futures::future::BoxFuture;
use serde_json::json;
use tracing::{info, warn};

use gatehouse_core::context::WorkflowContext;
use gatehouse_core::error::Result;
use gatehouse_core::traits::Agent;
use gatehouse_core::types::AgentResult;
use gatehouse_http::{ApiRequest, RetryingApiClient};

use super::{display_value, API_CONFIG_KEY, INPUT_KEY};

pub const API_CALL_ID: &str = "api-call-agent";

const DEFAULT_API_BASE: &str = "https://jsonplaceholder.typicode.com";

/// Calls an external HTTP API described by the context's `apiConfig`.
///
/// Without an `apiConfig` the agent posts the input to a public echo API,
/// or fetches a sample record when there is no input either.
pub struct ApiCallAgent {
    client: RetryingApiClient,
}

impl ApiCallAgent {
    pub fn new(client: RetryingApiClient) -> Self {
        Self { client }
    }

    fn build_request(&self, ctx: &WorkflowContext) -> Result<ApiRequest> {
        if let Some(config) = ctx.get_value(API_CONFIG_KEY) {
            return ApiRequest::from_json(&config);
        }
        Ok(match ctx.get_value(INPUT_KEY) {
            Some(input) => ApiRequest::post(format!("{}/posts", DEFAULT_API_BASE)).with_body(json!({
                "title": "Request from Gatehouse",
                "body": display_value(&input),
                "userId": 1,
            })),
            None => ApiRequest::get(format!("{}/posts/1", DEFAULT_API_BASE)),
        })
    }
}

impl Agent for ApiCallAgent {
    fn agent_id(&self) -> &str {
        API_CALL_ID
    }

    fn description(&self) -> &str {
        "API call: invokes an external HTTP API (GET/POST/PUT/DELETE) with retries"
    }

    fn execute<'a>(&'a self, ctx: &'a WorkflowContext) -> BoxFuture<'a, Result<AgentResult>> {
        Box::pin(async move {
            let request = self.build_request(ctx)?;
            let response = self.client.call(&request).await;

            if response.is_transport_failure() {
                let message = response
                    .error_message
                    .unwrap_or_else(|| "API call failed".into());
                warn!(agent_id = API_CALL_ID, url = %request.url, error = %message, "API call failed");
                return Ok(AgentResult::failure(API_CALL_ID, message)
                    .with_metadata("url", json!(request.url)));
            }

            let mut payload = json!({
                "apiRequest": {
                    "url": request.url,
                    "method": request.method,
                    "headers": request.headers,
                },
                "apiResponse": {
                    "statusCode": response.status_code,
                    "success": response.success,
                    "body": response.body,
                    "executionTimeMs": response.execution_time_ms,
                },
                "callSuccess": response.success,
            });
            if let Some(err) = &response.error_message {
                payload["errorMessage"] = json!(err);
            }

            info!(
                agent_id = API_CALL_ID,
                status = response.status_code,
                success = response.success,
                "API call agent finished"
            );
            Ok(AgentResult::success(API_CALL_ID, payload))
        })
    }

    fn can_execute(&self, ctx: &WorkflowContext) -> bool {
        ctx.contains_key(API_CONFIG_KEY)
    }
}
