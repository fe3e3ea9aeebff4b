//! External MCP provider session (spec §3.5, §4.2.4).
//!
//! One session per provider endpoint, kept in-process and reused across
//! `tools/call` requests so every call after the first skips the handshake.
//! On a "session not found" error or a 404, the session is cleared and
//! re-initialized once before the call is retried (spec §4.2.4 step 3).

use std::sync::Mutex;

use jan_core::{JanError, JanResult};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

const PROTOCOL_VERSION: &str = "2024-11-05";

/// Outcome of one call against a provider session: either the raw JSON-RPC
/// result payload, or the provider's own JSON-RPC error passed through as-is.
#[derive(Debug, Clone)]
pub struct ProviderResult {
    pub result: Value,
    pub error: Option<ProviderError>,
}

#[derive(Debug, Clone)]
pub struct ProviderError {
    pub code: i32,
    pub message: String,
}

impl ProviderResult {
    fn success(result: Value) -> Self {
        Self { result, error: None }
    }

    fn failure(error: ProviderError) -> Self {
        Self { result: Value::Null, error: Some(error) }
    }
}

#[derive(Debug, Serialize)]
struct OutgoingRequest<'a> {
    jsonrpc: &'static str,
    id: &'a str,
    method: &'a str,
    params: Value,
}

#[derive(Debug, Deserialize)]
struct JsonRpcErrorBody {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
struct JsonRpcResponse {
    #[allow(dead_code)]
    id: Option<Value>,
    result: Option<Value>,
    error: Option<JsonRpcErrorBody>,
}

/// Parses a JSON-RPC response from either a plain JSON body or an SSE body
/// carrying a single `data: <json>` line (spec §4.2.1, §4.2.4 step 4).
fn parse_body(body: &str, is_sse: bool) -> JanResult<JsonRpcResponse> {
    if is_sse {
        for line in body.lines() {
            if let Some(data) = line.strip_prefix("data: ") {
                if let Ok(r) = serde_json::from_str::<JsonRpcResponse>(data) {
                    return Ok(r);
                }
            }
        }
        Err(crate::error::external("SSE body carried no JSON-RPC response"))
    } else {
        serde_json::from_str(body).map_err(|e| crate::error::external(format!("response json: {e}")))
    }
}

fn is_session_not_found(message: &str) -> bool {
    message.to_ascii_lowercase().contains("session not found")
}

/// One provider's MCP session: endpoint, the session id replayed on subsequent
/// calls, and the HTTP client used to reach it.
pub struct ProviderSession {
    client: Client,
    endpoint: String,
    /// Port used for the synthetic `Host: localhost:<port>` header (spec §4.2.4
    /// step 2, §9 "the bridge sets Host... as a compatibility hack").
    host_port: u16,
    session_id: Mutex<Option<String>>,
}

impl ProviderSession {
    pub fn new(endpoint: impl Into<String>, host_port: u16) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.into(),
            host_port,
            session_id: Mutex::new(None),
        }
    }

    fn take_session_id(&self) -> Option<String> {
        self.session_id.lock().ok().and_then(|g| g.clone())
    }

    fn set_session_id(&self, id: Option<String>) {
        if let Ok(mut guard) = self.session_id.lock() {
            *guard = id;
        }
    }

    fn clear_session(&self) {
        self.set_session_id(None);
    }

    async fn send(&self, request_id: &str, method: &str, params: Value) -> JanResult<ProviderResult> {
        let request = OutgoingRequest {
            jsonrpc: "2.0",
            id: request_id,
            method,
            params,
        };
        let body = serde_json::to_vec(&request)
            .map_err(|e| crate::error::external(format!("encode request: {e}")))?;

        let mut req = self
            .client
            .post(&self.endpoint)
            .header("Content-Type", "application/json")
            .header("Accept", "application/json, text/event-stream")
            .header("Host", format!("localhost:{}", self.host_port))
            .body(body);
        if let Some(sid) = self.take_session_id() {
            req = req.header("mcp-session-id", sid);
        }

        let resp = req
            .send()
            .await
            .map_err(|e| crate::error::external(format!("provider request: {e}")))?;
        let status = resp.status();
        if let Some(sid) = resp
            .headers()
            .get("mcp-session-id")
            .and_then(|v| v.to_str().ok())
        {
            self.set_session_id(Some(sid.to_string()));
        }
        let is_sse = resp
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .map(|s| s.contains("text/event-stream"))
            .unwrap_or(false);

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(session_not_found_error());
        }
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(crate::error::external(format!("provider HTTP {status}: {text}")));
        }

        let text = resp
            .text()
            .await
            .map_err(|e| crate::error::external(format!("provider body: {e}")))?;
        let parsed = parse_body(&text, is_sse)?;
        if let Some(err) = parsed.error {
            if is_session_not_found(&err.message) {
                return Err(session_not_found_error());
            }
            return Ok(ProviderResult::failure(ProviderError {
                code: err.code as i32,
                message: err.message,
            }));
        }
        Ok(ProviderResult::success(parsed.result.unwrap_or(Value::Null)))
    }

    async fn initialize(&self) -> JanResult<()> {
        let params = json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": { "tools": {} },
            "clientInfo": { "name": "jan-mcp-bridge", "version": env!("CARGO_PKG_VERSION") },
        });
        self.send("jan-mcp-bridge-initialize", "initialize", params).await?;
        Ok(())
    }

    /// Calls `method` with `params`, transparently re-initializing once and
    /// retrying if the provider reports its session is gone (spec §4.2.4 step 3).
    pub async fn call(&self, request_id: &str, method: &str, params: Value) -> JanResult<ProviderResult> {
        match self.send(request_id, method, params.clone()).await {
            Ok(result) => Ok(result),
            Err(e) if is_session_not_found_error(&e) => {
                self.clear_session();
                self.initialize().await?;
                self.send(request_id, method, params).await
            }
            Err(e) => Err(e),
        }
    }
}

fn session_not_found_error() -> JanError {
    crate::error::external("session not found")
}

fn is_session_not_found_error(err: &JanError) -> bool {
    err.message.contains("session not found")
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, Respond, ResponseTemplate};

    #[tokio::test]
    async fn reinitializes_once_after_session_not_found() {
        let server = MockServer::start().await;
        let call_count = std::sync::Arc::new(std::sync::atomic::AtomicUsize::new(0));
        struct Responder(std::sync::Arc<std::sync::atomic::AtomicUsize>);
        impl Respond for Responder {
            fn respond(&self, _req: &wiremock::Request) -> ResponseTemplate {
                let n = self.0.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                match n {
                    0 => ResponseTemplate::new(200).set_body_json(serde_json::json!({
                        "jsonrpc": "2.0", "id": "jan-mcp-bridge-initialize", "result": {}
                    })),
                    1 => ResponseTemplate::new(404),
                    2 => ResponseTemplate::new(200).set_body_json(serde_json::json!({
                        "jsonrpc": "2.0", "id": "jan-mcp-bridge-initialize", "result": {}
                    })),
                    _ => ResponseTemplate::new(200).set_body_json(serde_json::json!({
                        "jsonrpc": "2.0", "id": "call-1", "result": {"ok": true}
                    })),
                }
            }
        }
        Mock::given(method("POST"))
            .respond_with(Responder(call_count.clone()))
            .mount(&server)
            .await;

        let session = ProviderSession::new(server.uri(), 9999);
        session.initialize().await.unwrap();
        let result = session
            .call("call-1", "tools/call", serde_json::json!({}))
            .await
            .unwrap();
        assert!(result.error.is_none());
        assert_eq!(call_count.load(std::sync::atomic::Ordering::SeqCst), 4);
    }
}
