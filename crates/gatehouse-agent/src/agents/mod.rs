//! Stock agents and the catalogue the canned workflows draw from.

mod api_call;
mod data_processor;
mod report_generator;
mod validation;

use std::sync::Arc;
use std::time::Duration;

use gatehouse_core::config::AppConfig;
use gatehouse_core::error::Result;
use gatehouse_core::traits::Agent;
use gatehouse_http::RetryingApiClient;

pub use api_call::{ApiCallAgent, API_CALL_ID};
pub use data_processor::{DataProcessorAgent, DATA_PROCESSOR_ID};
pub use report_generator::{ReportGeneratorAgent, REPORT_GENERATOR_ID};
pub use validation::{ValidationAgent, VALIDATION_ID};

/// Context key holding the caller's input.
pub const INPUT_KEY: &str = "input";
/// Context key holding an optional `apiConfig` object.
pub const API_CONFIG_KEY: &str = "apiConfig";

/// Shared instances of the four stock agents.
#[derive(Clone)]
pub struct AgentCatalogue {
    pub data_processor: Arc<dyn Agent>,
    pub validation: Arc<dyn Agent>,
    pub report_generator: Arc<dyn Agent>,
    pub api_call: Arc<dyn Agent>,
}

impl AgentCatalogue {
    /// Build the catalogue with a reqwest-backed API client.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let client = RetryingApiClient::from_config(&config.http)?;
        Ok(Self::with_client(config, client))
    }

    /// Build the catalogue around an existing API client.
    pub fn with_client(config: &AppConfig, client: RetryingApiClient) -> Self {
        let simulate = config.agents.simulate_latency;
        Self {
            data_processor: Arc::new(DataProcessorAgent::new(simulate)),
            validation: Arc::new(ValidationAgent::new(simulate)),
            report_generator: Arc::new(ReportGeneratorAgent::new(simulate)),
            api_call: Arc::new(ApiCallAgent::new(client)),
        }
    }

    /// All agents, for listings.
    pub fn all(&self) -> Vec<Arc<dyn Agent>> {
        vec![
            self.data_processor.clone(),
            self.validation.clone(),
            self.report_generator.clone(),
            self.api_call.clone(),
        ]
    }
}

/// Stand-in for a model call: sleep for `ms` when latency simulation is on.
pub(crate) async fn simulate_latency(enabled: bool, ms: u64) {
    if enabled {
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }
}

/// Render a context value as plain text (strings without quotes).
pub(crate) fn display_value(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
