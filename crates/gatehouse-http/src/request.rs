use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use gatehouse_core::error::GatehouseError;

/// HTTP methods the API client supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
        }
    }

    /// Whether a request body is sent with this method.
    pub fn carries_body(&self) -> bool {
        matches!(self, Self::Post | Self::Put)
    }
}

impl FromStr for HttpMethod {
    type Err = GatehouseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "GET" => Ok(Self::Get),
            "POST" => Ok(Self::Post),
            "PUT" => Ok(Self::Put),
            "DELETE" => Ok(Self::Delete),
            other => Err(GatehouseError::InvalidApiConfig(format!(
                "unsupported HTTP method: {}",
                other
            ))),
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One outbound API call, as configured by a workflow caller.
///
/// Deserializes from the `apiConfig` object of a workflow request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiRequest {
    pub url: String,
    /// Kept as text so an unsupported method is reported by the client
    /// as a failed response instead of rejecting the whole request.
    #[serde(default = "default_method")]
    pub method: String,
    #[serde(default)]
    pub headers: HashMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<serde_json::Value>,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
    /// Additional attempts after the first transport failure.
    #[serde(default)]
    pub retry_count: u32,
}

fn default_method() -> String {
    "GET".into()
}

fn default_timeout_seconds() -> u64 {
    30
}

impl ApiRequest {
    pub fn new(url: impl Into<String>, method: HttpMethod) -> Self {
        Self {
            url: url.into(),
            method: method.as_str().to_string(),
            headers: HashMap::new(),
            body: None,
            timeout_seconds: default_timeout_seconds(),
            retry_count: 0,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(url, HttpMethod::Get)
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self::new(url, HttpMethod::Post).with_header("Content-Type", "application/json")
    }

    pub fn put(url: impl Into<String>) -> Self {
        Self::new(url, HttpMethod::Put).with_header("Content-Type", "application/json")
    }

    pub fn delete(url: impl Into<String>) -> Self {
        Self::new(url, HttpMethod::Delete)
    }

    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    pub fn with_body(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_seconds = secs;
        self
    }

    pub fn with_retries(mut self, retry_count: u32) -> Self {
        self.retry_count = retry_count;
        self
    }

    pub fn parsed_method(&self) -> Result<HttpMethod, GatehouseError> {
        self.method.parse()
    }

    /// Body text to send. Strings go out verbatim, anything else as JSON.
    pub fn body_text(&self) -> Option<String> {
        match &self.body {
            None | Some(serde_json::Value::Null) => None,
            Some(serde_json::Value::String(s)) => Some(s.clone()),
            Some(other) => Some(other.to_string()),
        }
    }

    /// Parse an `apiConfig` JSON object.
    pub fn from_json(value: &serde_json::Value) -> Result<Self, GatehouseError> {
        let req: ApiRequest = serde_json::from_value(value.clone())
            .map_err(|e| GatehouseError::InvalidApiConfig(e.to_string()))?;
        if req.url.trim().is_empty() {
            return Err(GatehouseError::InvalidApiConfig("url must not be empty".into()));
        }
        Ok(req)
    }
}
