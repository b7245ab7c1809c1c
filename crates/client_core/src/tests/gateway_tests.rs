use std::sync::Arc;

use super::*;
use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::Mutex};

#[derive(Clone, Default)]
struct ServerState {
    seen: Arc<Mutex<Vec<(Option<String>, AgentRequest)>>>,
}

async fn handle_invoke(
    State(state): State<ServerState>,
    headers: HeaderMap,
    Json(request): Json<AgentRequest>,
) -> Json<Value> {
    let request_id = headers
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    state.seen.lock().await.push((request_id, request.clone()));
    Json(json!({
        "success": true,
        "response": {
            "result": { "explanation": format!("echo: {}", request.message) },
            "message": "ok"
        }
    }))
}

async fn handle_unavailable() -> impl IntoResponse {
    (StatusCode::SERVICE_UNAVAILABLE, "down")
}

async fn handle_garbage() -> impl IntoResponse {
    (StatusCode::OK, "<html>definitely not json</html>")
}

async fn spawn_agent_server(state: ServerState) -> String {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    let app = Router::new()
        .route("/agent", post(handle_invoke))
        .route("/down", post(handle_unavailable))
        .route("/garbage", post(handle_garbage))
        .with_state(state);
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    format!("http://{addr}")
}

#[tokio::test]
async fn posts_prompt_and_agent_id_with_request_id() {
    let state = ServerState::default();
    let base = spawn_agent_server(state.clone()).await;
    let gateway =
        HttpAgentGateway::new(&format!("{base}/agent"), Duration::from_secs(5)).expect("gateway");

    let reply = gateway
        .invoke("[Module: Registers 101] what is EAX?", &AgentId::new("tutor-1"))
        .await
        .expect("invoke");

    assert!(reply.success);
    assert_eq!(reply.message(), Some("ok"));
    assert_eq!(
        reply.result().and_then(|r| r.get("explanation")),
        Some(&json!("echo: [Module: Registers 101] what is EAX?"))
    );

    let seen = state.seen.lock().await;
    assert_eq!(seen.len(), 1);
    let (request_id, request) = &seen[0];
    assert_eq!(request.agent_id, AgentId::new("tutor-1"));
    let request_id = request_id.as_deref().expect("request id header");
    assert!(Uuid::parse_str(request_id).is_ok(), "bad id {request_id}");
}

#[tokio::test]
async fn non_success_status_is_reported() {
    let base = spawn_agent_server(ServerState::default()).await;
    let gateway =
        HttpAgentGateway::new(&format!("{base}/down"), Duration::from_secs(5)).expect("gateway");

    let err = gateway
        .invoke("hi", &AgentId::new("tutor-1"))
        .await
        .expect_err("must fail");
    assert!(matches!(err, GatewayError::Status(503)), "got {err:?}");
}

#[tokio::test]
async fn undecodable_body_is_reported() {
    let base = spawn_agent_server(ServerState::default()).await;
    let gateway = HttpAgentGateway::new(&format!("{base}/garbage"), Duration::from_secs(5))
        .expect("gateway");

    let err = gateway
        .invoke("hi", &AgentId::new("tutor-1"))
        .await
        .expect_err("must fail");
    assert!(matches!(err, GatewayError::Decode(_)), "got {err:?}");
}

#[tokio::test]
async fn unreachable_endpoint_is_a_transport_failure() {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);

    let gateway = HttpAgentGateway::new(&format!("http://{addr}/agent"), Duration::from_secs(2))
        .expect("gateway");
    let err = gateway
        .invoke("hi", &AgentId::new("tutor-1"))
        .await
        .expect_err("must fail");
    assert!(matches!(err, GatewayError::Transport(_)), "got {err:?}");
}

#[tokio::test]
async fn missing_gateway_always_fails() {
    let err = MissingAgentGateway
        .invoke("hi", &AgentId::new("evaluator"))
        .await
        .expect_err("must fail");
    assert!(err.to_string().contains("evaluator"));
}

#[test]
fn rejects_invalid_endpoint() {
    assert!(HttpAgentGateway::new("not a url", Duration::from_secs(1)).is_err());
}
