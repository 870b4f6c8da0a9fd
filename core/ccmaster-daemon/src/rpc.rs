//! The HTTP JSON-RPC surface (spec §4.H, §6): a single loopback endpoint
//! handling `initialize`, `tools/list`, `tools/call`, `resources/list`,
//! `resources/read`; CORS preflight answers `*`.

use axum::extract::State;
use axum::http::{HeaderMap, Method, StatusCode};
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};
use ccmaster_protocol::rpc::{ErrorCode, JsonRpcError, JsonRpcId, Request, Response, ToolCallParams};
use serde_json::{json, Value};
use tower_http::cors::{Any, CorsLayer};

use crate::dispatch;
use crate::resources;
use crate::state::AppState;

/// Request header the Bridge and direct callers use to identify the acting
/// session (spec §6's `CCMASTER_SESSION_ID` convention, carried over HTTP
/// since the RPC surface has no other notion of "current session").
pub const CALLER_HEADER: &str = "x-ccmaster-session-id";

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/", post(handle))
        .layer(cors)
        .with_state(state)
}

fn caller_from_headers(headers: &HeaderMap) -> Option<String> {
    headers
        .get(CALLER_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

async fn handle(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<Request>, axum::extract::rejection::JsonRejection>,
) -> impl IntoResponse {
    let request = match body {
        Ok(Json(request)) => request,
        Err(e) => {
            let response = Response::error(
                Value::Null,
                JsonRpcError::new(ErrorCode::ParseError, e.to_string()),
            );
            return (StatusCode::OK, Json(response));
        }
    };

    let caller = caller_from_headers(&headers);
    let response = dispatch_request(&state, request, caller.as_deref()).await;
    (StatusCode::OK, Json(response))
}

async fn dispatch_request(state: &AppState, request: Request, caller: Option<&str>) -> Response {
    let id: JsonRpcId = request.id;
    match route(state, &request.method, request.params, caller).await {
        Ok(result) => Response::ok(id, result),
        Err(error) => Response::error(id, error),
    }
}

async fn route(
    state: &AppState,
    method: &str,
    params: Option<Value>,
    caller: Option<&str>,
) -> Result<Value, JsonRpcError> {
    match method {
        "initialize" => Ok(json!({
            "protocolVersion": "2024-11-05",
            "serverInfo": {"name": "ccmasterd", "version": env!("CARGO_PKG_VERSION")},
        })),
        "tools/list" => Ok(json!({"tools": tool_descriptors()})),
        "tools/call" => {
            let params = params.ok_or_else(|| {
                JsonRpcError::new(ErrorCode::InvalidParams, "tools/call requires params")
            })?;
            let call: ToolCallParams = serde_json::from_value(params).map_err(|e| {
                JsonRpcError::new(ErrorCode::InvalidParams, format!("malformed tool call: {e}"))
            })?;
            dispatch::dispatch(state, &call.name, &call.arguments, caller)
                .await
                .map_err(|e| e.to_json_rpc())
        }
        "resources/list" => Ok(resources::list()),
        "resources/read" => {
            let uri = params
                .as_ref()
                .and_then(|p| p.get("uri"))
                .and_then(Value::as_str)
                .ok_or_else(|| JsonRpcError::new(ErrorCode::InvalidParams, "resources/read requires uri"))?;
            resources::read(state, uri).map_err(|e| e.to_json_rpc())
        }
        other => Err(JsonRpcError::with_data(
            ErrorCode::MethodNotFound,
            format!("unknown method: {other}"),
            json!({"kind": "not_found", "method": other}),
        )),
    }
}

fn tool_descriptors() -> Value {
    json!([
        {"name": "session", "description": "Create, kill, and supervise worker sessions"},
        {"name": "communicate", "description": "Direct prompts, broadcasts, and mail between sessions"},
        {"name": "job", "description": "Job queue: assign, list, cancel, complete"},
        {"name": "team", "description": "Identity assignment and team membership"},
        {"name": "prompt", "description": "Display a message in the supervisor console"},
        {"name": "list_sessions", "description": "List every known session"},
        {"name": "kill_self", "description": "Terminate the calling session"},
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use ccmaster_core::config::Paths;
    use ccmaster_core::injector::MockInjector;
    use ccmaster_core::launcher::MockLauncher;
    use std::sync::Arc;
    use tower::ServiceExt;

    fn test_app() -> (Router, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let paths = Paths::from_base(dir.path().to_path_buf());
        let state = AppState::new(paths, Arc::new(MockLauncher::new()), Arc::new(MockInjector::new()));
        (router(state), dir)
    }

    async fn call(app: Router, request: Value) -> Value {
        let response = app
            .oneshot(
                axum::http::Request::builder()
                    .method("POST")
                    .uri("/")
                    .header("content-type", "application/json")
                    .body(axum::body::Body::from(request.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn initialize_round_trips() {
        let (app, _dir) = test_app();
        let response = call(
            app,
            json!({"jsonrpc": "2.0", "id": 1, "method": "initialize", "params": null}),
        )
        .await;
        assert_eq!(response["result"]["serverInfo"]["name"], "ccmasterd");
    }

    #[tokio::test]
    async fn unknown_method_is_method_not_found() {
        let (app, _dir) = test_app();
        let response = call(
            app,
            json!({"jsonrpc": "2.0", "id": 1, "method": "bogus", "params": null}),
        )
        .await;
        assert_eq!(response["error"]["code"], -32601);
    }

    #[tokio::test]
    async fn tools_call_unknown_tool_is_method_not_found() {
        let (app, _dir) = test_app();
        let response = call(
            app,
            json!({
                "jsonrpc": "2.0",
                "id": 1,
                "method": "tools/call",
                "params": {"name": "nonexistent", "arguments": {}}
            }),
        )
        .await;
        assert_eq!(response["error"]["code"], -32601);
    }

    #[tokio::test]
    async fn list_sessions_round_trips_through_tools_call() {
        let (app, _dir) = test_app();
        let response = call(
            app,
            json!({
                "jsonrpc": "2.0",
                "id": 7,
                "method": "tools/call",
                "params": {"name": "list_sessions", "arguments": {}}
            }),
        )
        .await;
        assert_eq!(response["result"]["sessions"], json!([]));
    }

    #[tokio::test]
    async fn resources_read_unknown_uri_is_not_found() {
        let (app, _dir) = test_app();
        let response = call(
            app,
            json!({
                "jsonrpc": "2.0",
                "id": 1,
                "method": "resources/read",
                "params": {"uri": "ccmaster://nope"}
            }),
        )
        .await;
        assert_eq!(response["error"]["code"], -32601);
    }
}
