//! RPC Bridge (component J, spec §4.J): forwards line-delimited JSON-RPC
//! requests from stdin to the core's HTTP endpoint verbatim, writes
//! responses to stdout, and sends diagnostics to stderr. On startup it
//! probes the endpoint with a `tools/list` call; an unreachable server is
//! reported as a JSON-RPC error on the first forwarded line, not a process
//! exit (spec §4.J: "absence of a reachable server is reported as a
//! JSON-RPC error, not a process exit").

use std::io::Write;

use ccmaster_protocol::rpc::{ErrorCode, JsonRpcError, Response};
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, BufReader};

const RPC_ADDR_ENV: &str = "CCMASTER_RPC_ADDR";
const DEFAULT_RPC_ADDR: &str = "127.0.0.1:8080";

fn endpoint_url() -> String {
    let addr = std::env::var(RPC_ADDR_ENV).unwrap_or_else(|_| DEFAULT_RPC_ADDR.to_string());
    format!("http://{addr}")
}

fn probe_request() -> Value {
    serde_json::json!({"jsonrpc": "2.0", "id": "bridge-probe", "method": "tools/list", "params": null})
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let url = endpoint_url();
    let client = reqwest::Client::new();

    match client.post(&url).json(&probe_request()).send().await {
        Ok(resp) if resp.status().is_success() => {
            tracing::info!(url, "ccmasterd reachable");
        }
        Ok(resp) => {
            tracing::warn!(url, status = %resp.status(), "ccmasterd probe returned non-success status");
        }
        Err(e) => {
            tracing::warn!(url, error = %e, "ccmasterd unreachable at startup");
        }
    }

    let stdin = BufReader::new(tokio::io::stdin());
    let mut lines = stdin.lines();
    let stdout = std::io::stdout();

    while let Ok(Some(line)) = lines.next_line().await {
        if line.trim().is_empty() {
            continue;
        }
        let response = forward_line(&client, &url, &line).await;
        let mut handle = stdout.lock();
        if writeln!(handle, "{response}").is_err() {
            break;
        }
    }
}

/// Forwards one raw JSON-RPC line to the core and renders a response line,
/// substituting a synthesized `InternalError` if the request itself was
/// malformed or the server could not be reached — the bridge never drops a
/// line silently.
async fn forward_line(client: &reqwest::Client, url: &str, line: &str) -> String {
    let request_id: Value = serde_json::from_str(line)
        .ok()
        .and_then(|v: Value| v.get("id").cloned())
        .unwrap_or(Value::Null);

    match client.post(url).body(line.to_string()).header("content-type", "application/json").send().await {
        Ok(resp) => match resp.text().await {
            Ok(text) => text,
            Err(e) => error_line(request_id, format!("reading response body: {e}")),
        },
        Err(e) => error_line(request_id, format!("unreachable: {e}")),
    }
}

fn error_line(id: Value, message: String) -> String {
    let response = Response::error(id, JsonRpcError::new(ErrorCode::InternalError, message));
    serde_json::to_string(&response).unwrap_or_else(|_| "{}".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_url_defaults_when_env_unset() {
        std::env::remove_var(RPC_ADDR_ENV);
        assert_eq!(endpoint_url(), "http://127.0.0.1:8080");
    }

    #[test]
    fn endpoint_url_honors_override() {
        std::env::set_var(RPC_ADDR_ENV, "127.0.0.1:9999");
        assert_eq!(endpoint_url(), "http://127.0.0.1:9999");
        std::env::remove_var(RPC_ADDR_ENV);
    }

    #[test]
    fn probe_request_targets_tools_list() {
        let probe = probe_request();
        assert_eq!(probe["method"], "tools/list");
    }

    #[test]
    fn error_line_is_valid_json_rpc() {
        let line = error_line(Value::from(1), "boom".to_string());
        let parsed: Value = serde_json::from_str(&line).unwrap();
        assert_eq!(parsed["error"]["code"], -32603);
    }
}
