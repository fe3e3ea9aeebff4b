//! Orchestrator-side JSON-RPC client for `POST /v1/mcp` (spec §4.1.3 step 3,
//! §4.2.1). The tool loop calls `list_tools` once per turn to build the tool
//! spec array handed to the LLM, and `call_tool` once per surfaced tool call.

use jan_core::{JanError, JanResult};
use serde_json::Value;

const LAYER: &str = "orchestrator_mcp_client";

#[derive(Debug, serde::Deserialize)]
struct JsonRpcErrorBody {
    #[allow(dead_code)]
    code: i32,
    message: String,
}

#[derive(Debug, serde::Deserialize)]
struct JsonRpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<JsonRpcErrorBody>,
}

pub struct McpClient {
    client: reqwest::Client,
    base_url: String,
}

impl McpClient {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    async fn call(&self, method: &str, params: Value) -> JanResult<Value> {
        let request = serde_json::json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": 1,
        });
        let response = self
            .client
            .post(&self.base_url)
            .json(&request)
            .send()
            .await
            .map_err(|e| JanError::external(LAYER, format!("mcp bridge request failed: {e}")))?;
        let body: JsonRpcResponse = response
            .json()
            .await
            .map_err(|e| JanError::external(LAYER, format!("mcp bridge returned malformed body: {e}")))?;

        if let Some(error) = body.error {
            return Err(JanError::external(
                LAYER,
                format!("mcp bridge error: {}", error.message),
            ));
        }
        body.result
            .ok_or_else(|| JanError::external(LAYER, "mcp bridge reply missing result"))
    }

    /// Fetches the current tool spec array (spec §4.1.3 step 3), in the
    /// OpenAI function-calling shape the LLM client expects.
    pub async fn list_tools(&self) -> JanResult<Vec<Value>> {
        let result = self.call("tools/list", Value::Null).await?;
        let tools = result
            .get("tools")
            .and_then(|v| v.as_array())
            .cloned()
            .unwrap_or_default();
        Ok(tools
            .into_iter()
            .map(|tool| {
                serde_json::json!({
                    "type": "function",
                    "function": {
                        "name": tool.get("name").cloned().unwrap_or(Value::Null),
                        "description": tool.get("description").cloned().unwrap_or(Value::Null),
                        "parameters": tool.get("inputSchema").cloned().unwrap_or(Value::Null),
                    }
                })
            })
            .collect())
    }

    /// Invokes one tool call and returns its parsed JSON result, unwrapping the
    /// MCP content envelope (`{"content": [{"type": "text", "text": ...}]}`).
    pub async fn call_tool(&self, name: &str, arguments: Value) -> JanResult<Value> {
        let result = self
            .call(
                "tools/call",
                serde_json::json!({ "name": name, "arguments": arguments }),
            )
            .await?;

        if result.get("isError").and_then(|v| v.as_bool()).unwrap_or(false) {
            let message = result
                .get("content")
                .and_then(|c| c.as_array())
                .and_then(|arr| arr.first())
                .and_then(|entry| entry.get("text"))
                .and_then(|t| t.as_str())
                .unwrap_or("tool call failed")
                .to_string();
            return Err(JanError::external(LAYER, message));
        }

        let text = result
            .get("content")
            .and_then(|c| c.as_array())
            .and_then(|arr| arr.first())
            .and_then(|entry| entry.get("text"))
            .and_then(|t| t.as_str())
            .ok_or_else(|| JanError::external(LAYER, "tool result missing content[0].text"))?;

        serde_json::from_str(text)
            .or_else(|_| Ok(Value::String(text.to_string())))
    }
}
