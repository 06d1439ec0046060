use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tracing::info;

use gatehouse_agent::WorkflowRunner;
use gatehouse_core::config::GatewayConfig;

use crate::routes;
use crate::state::AppState;

/// Build the REST router over shared state.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/workflow/execute/{kind}", post(routes::execute_workflow))
        .route("/api/workflow/info", get(routes::info))
        .route("/api/workflow/health", get(routes::health))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// HTTP gateway server built on axum.
pub struct GatewayServer {
    config: GatewayConfig,
    runner: WorkflowRunner,
}

impl GatewayServer {
    pub fn new(config: GatewayConfig, runner: WorkflowRunner) -> Self {
        Self { config, runner }
    }

    /// Run the gateway server until the cancellation token is triggered.
    pub async fn run(&self, shutdown: CancellationToken) -> anyhow::Result<()> {
        let state = Arc::new(AppState::new(self.config.clone(), self.runner.clone()));
        let app = router(state);

        let listener = TcpListener::bind(&self.config.bind).await?;
        info!(bind = %self.config.bind, "Gateway listening");

        axum::serve(listener, app)
            .with_graceful_shutdown(async move { shutdown.cancelled().await })
            .await?;

        info!("Gateway shut down");
        Ok(())
    }
}
