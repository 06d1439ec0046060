use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::{error, info, warn};

use gatehouse_agent::{LogicalOperator, WorkflowKind, WorkflowRequest};
use gatehouse_core::error::GatehouseError;

use crate::state::AppState;

/// Error body returned by workflow endpoints.
pub struct WorkflowError {
    status: StatusCode,
    body: serde_json::Value,
}

impl WorkflowError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            body: json!({ "error": message.into() }),
        }
    }
}

impl From<GatehouseError> for WorkflowError {
    fn from(e: GatehouseError) -> Self {
        let status = match &e {
            GatehouseError::InvalidApiConfig(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let mut body = json!({ "error": e.to_string() });
        if let GatehouseError::Stalled { pending, .. } = &e {
            body["pending"] = json!(pending);
        }
        Self { status, body }
    }
}

impl IntoResponse for WorkflowError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

// POST /api/workflow/execute/{kind}
pub async fn execute_workflow(
    State(state): State<Arc<AppState>>,
    Path(kind): Path<String>,
    body: Bytes,
) -> Result<Json<serde_json::Value>, WorkflowError> {
    let kind: WorkflowKind = kind.parse().map_err(|_| WorkflowError {
        status: StatusCode::NOT_FOUND,
        body: json!({ "error": format!("Unknown workflow: {}", kind) }),
    })?;

    // An empty body means all defaults.
    let request: WorkflowRequest = if body.iter().all(u8::is_ascii_whitespace) {
        WorkflowRequest::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| WorkflowError::bad_request(format!("Invalid request body: {}", e)))?
    };

    info!(workflow = %kind, has_api_config = request.api_config.is_some(), "Workflow request");

    match state.runner.run(kind, &request).await {
        Ok(report) => {
            let value = serde_json::to_value(&report)
                .map_err(|e| WorkflowError::from(GatehouseError::from(e)))?;
            Ok(Json(value))
        }
        Err(e) => {
            if matches!(e, GatehouseError::InvalidApiConfig(_)) {
                warn!(workflow = %kind, error = %e, "Rejected workflow request");
            } else {
                error!(workflow = %kind, error = %e, "Workflow execution failed");
            }
            Err(e.into())
        }
    }
}

// GET /api/workflow/info
pub async fn info(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let agents: Vec<serde_json::Value> = state
        .runner
        .agents()
        .all()
        .iter()
        .map(|a| json!({ "id": a.agent_id(), "description": a.description() }))
        .collect();
    let workflows: Vec<serde_json::Value> = WorkflowKind::all()
        .iter()
        .map(|k| {
            json!({
                "name": k.as_str(),
                "description": k.description(),
                "endpoint": format!("/api/workflow/execute/{}", k.as_str()),
            })
        })
        .collect();
    let operators: Vec<&str> = LogicalOperator::all().iter().map(|o| o.as_str()).collect();

    Json(json!({
        "title": "Gatehouse Workflow System",
        "description": "DAG-based agent orchestration with AND/OR/NOT gates",
        "version": env!("CARGO_PKG_VERSION"),
        "features": {
            "logicalOperators": operators,
            "executionMode": "Parallel rounds with dependency gates",
            "apiSupport": "HTTP GET/POST/PUT/DELETE with retry and timeout",
        },
        "agents": agents,
        "workflows": workflows,
    }))
}

// GET /api/workflow/health
pub async fn health(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "UP",
        "message": "Workflow system is running",
        "version": env!("CARGO_PKG_VERSION"),
        "bind": state.config.bind,
        "startedAt": state.started_at,
    }))
}
