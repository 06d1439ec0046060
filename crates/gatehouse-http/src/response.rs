use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Outcome of an API call. Transport failures carry status code 0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse {
    pub status_code: u16,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<serde_json::Value>,
    #[serde(default)]
    pub headers: HashMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub execution_time_ms: u64,
    pub response_time: DateTime<Utc>,
}

impl ApiResponse {
    fn base(status_code: u16, success: bool) -> Self {
        Self {
            status_code,
            success,
            body: None,
            headers: HashMap::new(),
            error_message: None,
            execution_time_ms: 0,
            response_time: Utc::now(),
        }
    }

    pub fn success(status_code: u16, body: serde_json::Value) -> Self {
        let mut resp = Self::base(status_code, true);
        resp.body = Some(body);
        resp
    }

    /// A received HTTP response outside the 2xx range.
    pub fn failure(status_code: u16, error_message: impl Into<String>) -> Self {
        let mut resp = Self::base(status_code, false);
        resp.error_message = Some(error_message.into());
        resp
    }

    /// No HTTP response at all (transport failure or bad request config).
    pub fn error(error_message: impl Into<String>) -> Self {
        Self::failure(0, error_message)
    }

    /// True when no HTTP response was received.
    pub fn is_transport_failure(&self) -> bool {
        !self.success && self.status_code == 0
    }

    pub fn with_headers(mut self, headers: HashMap<String, String>) -> Self {
        self.headers = headers;
        self
    }

    pub fn with_elapsed(mut self, execution_time_ms: u64) -> Self {
        self.execution_time_ms = execution_time_ms;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_constructors() {
        let ok = ApiResponse::success(200, json!({"id": 1}));
        assert!(ok.success);
        assert!(!ok.is_transport_failure());

        let not_found = ApiResponse::failure(404, "HTTP 404: missing");
        assert!(!not_found.success);
        assert!(!not_found.is_transport_failure());

        let err = ApiResponse::error("connection refused").with_elapsed(12);
        assert_eq!(err.status_code, 0);
        assert!(err.is_transport_failure());
        assert_eq!(err.execution_time_ms, 12);
    }

    #[test]
    fn test_serializes_camel_case() {
        let v = serde_json::to_value(ApiResponse::failure(500, "boom")).unwrap();
        assert_eq!(v["statusCode"], 500);
        assert_eq!(v["errorMessage"], "boom");
        assert!(v.get("body").is_none());
        assert!(v.get("responseTime").is_some());
    }
}
