use chrono::{DateTime, Utc};

use gatehouse_agent::WorkflowRunner;
use gatehouse_core::config::GatewayConfig;

/// Shared application state for axum handlers.
pub struct AppState {
    pub config: GatewayConfig,
    pub runner: WorkflowRunner,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(config: GatewayConfig, runner: WorkflowRunner) -> Self {
        Self {
            config,
            runner,
            started_at: Utc::now(),
        }
    }
}
