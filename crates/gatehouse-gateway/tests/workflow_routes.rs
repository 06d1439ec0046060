use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

use gatehouse_agent::WorkflowRunner;
use gatehouse_gateway::{router, AppState};
use gatehouse_test_utils::test_config;

fn app() -> Router {
    let config = test_config();
    let runner = WorkflowRunner::from_config(&config).unwrap();
    router(Arc::new(AppState::new(config.gateway.clone(), runner)))
}

async fn send(app: Router, req: Request<Body>) -> (StatusCode, Value) {
    let resp = app.oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn post(uri: &str, body: Value) -> Request<Body> {
    Request::post(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn health_reports_up() {
    let req = Request::get("/api/workflow/health").body(Body::empty()).unwrap();
    let (status, body) = send(app(), req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "UP");
    assert_eq!(body["bind"], "127.0.0.1:8080");
}

#[tokio::test]
async fn info_lists_operators_and_workflows() {
    let req = Request::get("/api/workflow/info").body(Body::empty()).unwrap();
    let (status, body) = send(app(), req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["features"]["logicalOperators"], json!(["AND", "OR", "NOT"]));
    assert_eq!(body["workflows"].as_array().unwrap().len(), 4);
    assert_eq!(body["agents"].as_array().unwrap().len(), 4);
}

#[tokio::test]
async fn sample_workflow_returns_report() {
    let (status, body) = send(app(), post("/api/workflow/execute/sample", json!({"input": "hello"}))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["totalNodes"], 3);
    assert_eq!(body["completedNodes"], 3);
    assert_eq!(body["successfulNodes"], 3);
    assert_eq!(body["rounds"], 2);
    assert_eq!(body["context"]["data"]["input"], "hello");
    assert!(body["workflowId"].as_str().unwrap().starts_with("sample-workflow-"));
}

#[tokio::test]
async fn empty_body_uses_default_input() {
    let req = Request::post("/api/workflow/execute/complex")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(app(), req).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["context"]["data"]["input"], "default input data");
}

#[tokio::test]
async fn api_workflow_calls_configured_endpoint() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 7})))
        .expect(1)
        .mount(&server)
        .await;

    let (status, body) = send(
        app(),
        post(
            "/api/workflow/execute/parallel-api",
            json!({"input": "x", "apiConfig": {"url": server.uri(), "method": "GET"}}),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["totalNodes"], 4);
    assert_eq!(body["successfulNodes"], 4);
    let api = &body["context"]["agentResults"]["api-call-agent"]["result"];
    assert_eq!(api["callSuccess"], true);
    assert_eq!(api["apiResponse"]["body"]["id"], 7);
}

#[tokio::test]
async fn invalid_api_config_is_bad_request() {
    let (status, body) = send(
        app(),
        post("/api/workflow/execute/api", json!({"apiConfig": {"method": "GET"}})),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("Invalid API config"));
}

#[tokio::test]
async fn malformed_body_is_bad_request() {
    let req = Request::post("/api/workflow/execute/sample")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, _) = send(app(), req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unreachable_api_returns_stalled_report() {
    let (status, body) = send(
        app(),
        post(
            "/api/workflow/execute/api",
            json!({"apiConfig": {"url": "http://127.0.0.1:1/", "timeoutSeconds": 1}}),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["stalled"], true);
    assert_eq!(body["pending"], json!(["node-3"]));
    assert_eq!(body["completedNodes"], 2);
    assert_eq!(body["failedNodes"], 1);
    let results = &body["context"]["agentResults"];
    assert_eq!(results["data-processor-agent"]["success"], true);
    assert_eq!(results["api-call-agent"]["success"], false);
}

#[tokio::test]
async fn unknown_workflow_is_not_found() {
    let (status, _) = send(app(), post("/api/workflow/execute/serial", json!({}))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
