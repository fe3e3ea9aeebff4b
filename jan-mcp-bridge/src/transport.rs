//! `POST /v1/mcp` transport (spec §4.2.1, §6.3): a single JSON-RPC 2.0 request
//! in, a single JSON-RPC 2.0 reply out, as plain JSON or as one SSE `data:` line
//! depending on the caller's `Accept` header.

use std::sync::Arc;

use axum::body::Bytes;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::method_guard;
use crate::registry::ToolRegistry;

#[derive(Debug, Deserialize)]
struct JsonRpcRequest {
    #[allow(dead_code)]
    jsonrpc: String,
    method: String,
    #[serde(default)]
    params: Value,
    id: Value,
}

#[derive(Debug, Serialize)]
struct JsonRpcSuccess {
    jsonrpc: &'static str,
    id: Value,
    result: Value,
}

#[derive(Debug, Serialize)]
struct JsonRpcFailure {
    jsonrpc: &'static str,
    id: Value,
    error: JsonRpcErrorBody,
}

#[derive(Debug, Serialize)]
struct JsonRpcErrorBody {
    code: i32,
    message: String,
}

pub struct McpBridgeState {
    pub registry: ToolRegistry,
}

fn wants_sse(headers: &HeaderMap) -> bool {
    headers
        .get(axum::http::header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.contains("text/event-stream"))
        .unwrap_or(false)
}

fn error_reply(id: Value, code: i32, message: String) -> Value {
    serde_json::to_value(JsonRpcFailure {
        jsonrpc: "2.0",
        id,
        error: JsonRpcErrorBody { code, message },
    })
    .expect("serialize jsonrpc failure")
}

fn success_reply(id: Value, result: Value) -> Value {
    serde_json::to_value(JsonRpcSuccess {
        jsonrpc: "2.0",
        id,
        result,
    })
    .expect("serialize jsonrpc success")
}

/// Handles one JSON-RPC request against the tool registry. `initialize` and
/// `notifications/initialized`/`ping` are answered directly; `tools/list` and
/// `tools/call` dispatch to the registry. The remaining allowed methods
/// (prompts/resources) are not backed by any registered tool in this system
/// and reply with an empty list / not-found, matching a bridge that declares
/// but does not populate those MCP capabilities.
async fn dispatch(state: &McpBridgeState, method: &str, params: Value, id: Value) -> Value {
    match method {
        "initialize" => success_reply(
            id,
            serde_json::json!({
                "protocolVersion": "2024-11-05",
                "capabilities": { "tools": {} },
                "serverInfo": { "name": "jan-mcp-bridge", "version": env!("CARGO_PKG_VERSION") },
            }),
        ),
        "notifications/initialized" | "ping" => success_reply(id, serde_json::json!({})),
        "tools/list" => success_reply(
            id,
            serde_json::json!({ "tools": state.registry.list() }),
        ),
        "tools/call" => {
            let name = params.get("name").and_then(|v| v.as_str()).unwrap_or_default();
            let arguments = params.get("arguments").cloned().unwrap_or(Value::Null);
            match state.registry.call(name, arguments).await {
                Ok(result) => success_reply(
                    id,
                    serde_json::json!({
                        "content": [{"type": "text", "text": result.to_string()}],
                        "isError": false,
                    }),
                ),
                Err(e) => error_reply(id, e.kind.status().as_u16() as i32, e.message),
            }
        }
        "prompts/list" | "resources/list" | "resources/templates/list" => {
            success_reply(id, serde_json::json!({ "prompts": Value::Array(vec![]) }))
        }
        "prompts/call" | "resources/read" | "resources/subscribe" => {
            error_reply(id, -32601, format!("method '{method}' has no registered handler"))
        }
        other => error_reply(id, -32601, format!("method not found: {other}")),
    }
}

pub async fn handle_mcp_request(
    axum::extract::State(state): axum::extract::State<Arc<McpBridgeState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if body.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            axum::Json(error_reply(Value::Null, -32600, "empty request body".to_string())),
        )
            .into_response();
    }

    let request: JsonRpcRequest = match serde_json::from_slice(&body) {
        Ok(r) => r,
        Err(e) => {
            return (
                StatusCode::BAD_REQUEST,
                axum::Json(error_reply(Value::Null, -32700, format!("parse error: {e}"))),
            )
                .into_response()
        }
    };

    if !method_guard::is_allowed(&request.method) {
        let reply = error_reply(
            request.id.clone(),
            -32601,
            format!("method not allowed: {}", request.method),
        );
        return respond(&headers, StatusCode::BAD_REQUEST, reply);
    }

    let reply = dispatch(&state, &request.method, request.params, request.id).await;
    respond(&headers, StatusCode::OK, reply)
}

fn respond(headers: &HeaderMap, status: StatusCode, reply: Value) -> Response {
    if wants_sse(headers) {
        let line = format!("data: {}\n\n", reply);
        (
            status,
            [("content-type", "text/event-stream")],
            line,
        )
            .into_response()
    } else {
        (status, axum::Json(reply)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_state() -> Arc<McpBridgeState> {
        Arc::new(McpBridgeState {
            registry: ToolRegistry::new([]),
        })
    }

    #[tokio::test]
    async fn tools_list_returns_empty_array_when_no_tools_registered() {
        let state = empty_state();
        let reply = dispatch(&state, "tools/list", Value::Null, serde_json::json!(1)).await;
        assert_eq!(reply["result"]["tools"], serde_json::json!([]));
    }

    #[tokio::test]
    async fn unknown_method_is_rejected_by_guard() {
        assert!(!method_guard::is_allowed("tools/delete"));
    }

    #[tokio::test]
    async fn ping_replies_with_empty_result() {
        let state = empty_state();
        let reply = dispatch(&state, "ping", Value::Null, serde_json::json!("p1")).await;
        assert_eq!(reply["id"], serde_json::json!("p1"));
        assert_eq!(reply["result"], serde_json::json!({}));
    }
}
