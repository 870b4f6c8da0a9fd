//! Adversarial-input coverage of the JSON-RPC surface: malformed bodies,
//! missing/mistyped fields, unknown tools/actions/resources, and
//! caller-context violations should all come back as structured JSON-RPC
//! errors, never a panic or a bare 5xx.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request as HttpRequest, StatusCode};
use ccmaster_core::config::Paths;
use ccmaster_core::injector::MockInjector;
use ccmaster_core::launcher::MockLauncher;
use ccmaster_daemon::rpc::{self, CALLER_HEADER};
use ccmaster_daemon::state::AppState;
use serde_json::{json, Value};
use tower::ServiceExt;

fn test_state() -> (AppState, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let paths = Paths::from_base(dir.path().to_path_buf());
    let state = AppState::new(paths, Arc::new(MockLauncher::new()), Arc::new(MockInjector::new()));
    (state, dir)
}

async fn call_raw(state: &AppState, caller: Option<&str>, body: &str) -> (StatusCode, Value) {
    let mut builder = HttpRequest::builder()
        .method("POST")
        .uri("/")
        .header("content-type", "application/json");
    if let Some(caller) = caller {
        builder = builder.header(CALLER_HEADER, caller);
    }
    let response = rpc::router(state.clone())
        .oneshot(builder.body(Body::from(body.to_string())).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

async fn call(state: &AppState, request: Value, caller: Option<&str>) -> Value {
    call_raw(state, caller, &request.to_string()).await.1
}

fn tool_call(name: &str, arguments: Value) -> Value {
    json!({"jsonrpc": "2.0", "id": 1, "method": "tools/call", "params": {"name": name, "arguments": arguments}})
}

/// The HTTP layer itself never signals an error: JSON-RPC always answers
/// 200 with an `error` envelope, regardless of how badly malformed the
/// request was (spec §6: a single loopback endpoint, no transport-level
/// fault reporting beyond the JSON-RPC error object).
#[tokio::test]
async fn malformed_json_body_is_parse_error_with_http_200() {
    let (state, _dir) = test_state();
    let (status, response) = call_raw(&state, None, "{not json at all").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(response["error"]["code"], -32700);
}

#[tokio::test]
async fn missing_method_field_is_parse_error() {
    let (state, _dir) = test_state();
    let response = call(&state, json!({"jsonrpc": "2.0", "id": 1, "params": null}), None).await;
    assert_eq!(response["error"]["code"], -32700);
}

#[tokio::test]
async fn empty_body_is_parse_error() {
    let (state, _dir) = test_state();
    let (status, response) = call_raw(&state, None, "").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(response["error"]["code"], -32700);
}

#[tokio::test]
async fn unknown_method_is_method_not_found() {
    let (state, _dir) = test_state();
    let response = call(&state, json!({"jsonrpc": "2.0", "id": 1, "method": "does/not-exist", "params": null}), None).await;
    assert_eq!(response["error"]["code"], -32601);
}

#[tokio::test]
async fn tools_call_without_params_is_invalid_params() {
    let (state, _dir) = test_state();
    let response = call(&state, json!({"jsonrpc": "2.0", "id": 1, "method": "tools/call", "params": null}), None).await;
    assert_eq!(response["error"]["code"], -32602);
}

#[tokio::test]
async fn tools_call_with_non_string_name_is_invalid_params() {
    let (state, _dir) = test_state();
    let response = call(
        &state,
        json!({"jsonrpc": "2.0", "id": 1, "method": "tools/call", "params": {"name": 42, "arguments": {}}}),
        None,
    )
    .await;
    assert_eq!(response["error"]["code"], -32602);
}

#[tokio::test]
async fn unknown_tool_is_method_not_found_with_kind_not_found() {
    let (state, _dir) = test_state();
    let response = call(&state, tool_call("wizardry", json!({})), None).await;
    assert_eq!(response["error"]["code"], -32601);
    assert_eq!(response["error"]["data"]["kind"], "not_found");
}

#[tokio::test]
async fn unknown_action_is_invalid_params_with_kind_invalid_params() {
    let (state, _dir) = test_state();
    let response = call(&state, tool_call("session", json!({"action": "teleport"})), None).await;
    assert_eq!(response["error"]["code"], -32602);
    assert_eq!(response["error"]["data"]["kind"], "invalid_params");
}

#[tokio::test]
async fn session_create_missing_working_dir_is_invalid_params() {
    let (state, _dir) = test_state();
    let response = call(&state, tool_call("session", json!({"action": "create"})), None).await;
    assert_eq!(response["error"]["code"], -32602);
}

#[tokio::test]
async fn session_get_status_on_unknown_id_is_not_found() {
    let (state, _dir) = test_state();
    let response = call(&state, tool_call("session", json!({"action": "get_status", "id": "mcp_nope"})), None).await;
    assert_eq!(response["error"]["code"], -32602);
    assert_eq!(response["error"]["data"]["kind"], "not_found");
}

#[tokio::test]
async fn resources_read_missing_uri_is_invalid_params() {
    let (state, _dir) = test_state();
    let response = call(
        &state,
        json!({"jsonrpc": "2.0", "id": 1, "method": "resources/read", "params": {}}),
        None,
    )
    .await;
    assert_eq!(response["error"]["code"], -32602);
}

#[tokio::test]
async fn resources_read_unknown_uri_is_method_not_found() {
    let (state, _dir) = test_state();
    let response = call(
        &state,
        json!({"jsonrpc": "2.0", "id": 1, "method": "resources/read", "params": {"uri": "ccmaster://bogus"}}),
        None,
    )
    .await;
    assert_eq!(response["error"]["code"], -32601);
}

#[tokio::test]
async fn send_mail_without_caller_context_is_invalid_params() {
    let (state, _dir) = test_state();
    let response = call(
        &state,
        tool_call("communicate", json!({"action": "send_mail", "subject": "x", "body": "y"})),
        None,
    )
    .await;
    assert_eq!(response["error"]["code"], -32602);
    assert_eq!(response["error"]["data"]["kind"], "invalid_params");
}

#[tokio::test]
async fn kill_self_without_caller_context_is_invalid_params() {
    let (state, _dir) = test_state();
    let response = call(&state, json!({"jsonrpc": "2.0", "id": 1, "method": "tools/call", "params": {"name": "kill_self", "arguments": {}}}), None).await;
    assert_eq!(response["error"]["code"], -32602);
}

#[tokio::test]
async fn kill_self_without_reason_is_invalid_params() {
    let (state, _dir) = test_state();
    let response = call(
        &state,
        json!({"jsonrpc": "2.0", "id": 1, "method": "tools/call", "params": {"name": "kill_self", "arguments": {}}}),
        Some("caller"),
    )
    .await;
    assert_eq!(response["error"]["code"], -32602);
}

#[tokio::test]
async fn send_mail_with_only_invalid_recipients_is_rejected() {
    let (state, _dir) = test_state();
    let response = call(
        &state,
        tool_call(
            "communicate",
            json!({"action": "send_mail", "to_sessions": ["nope-1", "nope-2"], "subject": "x", "body": "y"}),
        ),
        Some("caller"),
    )
    .await;
    assert_eq!(response["error"]["code"], -32602);
}

#[tokio::test]
async fn job_complete_by_non_assignee_is_not_found() {
    let (state, _dir) = test_state();
    let created = call(
        &state,
        tool_call("job", json!({"action": "send_to_session", "to": "assignee", "title": "t", "description": "d"})),
        Some("caller"),
    )
    .await;
    let job_id = created["result"]["id"].as_str().unwrap().to_string();

    let response = call(
        &state,
        tool_call("job", json!({"action": "complete", "job_id": job_id, "result": "done"})),
        Some("not-the-assignee"),
    )
    .await;
    assert_eq!(response["error"]["code"], -32602);
    assert_eq!(response["error"]["data"]["kind"], "not_found");
}

#[tokio::test]
async fn interrupting_an_idle_session_is_invalid_state() {
    let (state, _dir) = test_state();
    let created = call(&state, tool_call("session", json!({"action": "create", "working_dir": "/tmp"})), None).await;
    let id = created["result"]["session_id"].as_str().unwrap().to_string();

    let response = call(&state, tool_call("session", json!({"action": "interrupt", "id": id})), None).await;
    assert_eq!(response["error"]["code"], -32602);
    assert_eq!(response["error"]["data"]["kind"], "invalid_state");
}

#[tokio::test]
async fn continuing_a_non_idle_session_is_invalid_state() {
    let (state, _dir) = test_state();
    let created = call(&state, tool_call("session", json!({"action": "create", "working_dir": "/tmp"})), None).await;
    let id = created["result"]["session_id"].as_str().unwrap().to_string();

    let response = call(&state, tool_call("session", json!({"action": "continue", "id": id})), None).await;
    assert_eq!(response["error"]["code"], -32602);
    assert_eq!(response["error"]["data"]["kind"], "invalid_state");
}
