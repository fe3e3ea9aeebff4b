//! Orchestrator-side client for the external conversation store (LLM-API),
//! covering the two wire calls the tool loop makes directly (spec §4.1.3 step
//! 4): placeholder item creation before a tool runs, and history fetch when
//! resuming from `conversation_id`/`previous_response_id`. The matching PATCH
//! write-back after a tool call completes is [`jan_mcp_bridge::WriteBackClient`]
//! — both calls hit the same conversation-items resource, so the bridge's
//! client type is reused rather than duplicated.

use jan_core::{JanError, JanResult};
use serde_json::Value;

const LAYER: &str = "orchestrator_conversation_client";

pub struct ConversationClient {
    client: reqwest::Client,
    base_url: String,
}

impl ConversationClient {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    /// Creates the `mcp_call` placeholder item with `status=in_progress`
    /// (spec §4.1.3 step 4, bullet 1), carrying the model-supplied `call_id`.
    /// Returns the created item id as surfaced by the conversation store.
    pub async fn create_mcp_call_placeholder(
        &self,
        conversation_id: &str,
        authorization: &str,
        call_id: &str,
        tool_name: &str,
        arguments: &Value,
    ) -> JanResult<()> {
        let url = format!("{}/v1/conversations/{conversation_id}/items", self.base_url);
        let body = serde_json::json!({
            "type": "mcp_call",
            "call_id": call_id,
            "name": tool_name,
            "arguments": arguments,
            "status": "in_progress",
        });
        let response = self
            .client
            .post(&url)
            .header("Authorization", authorization)
            .json(&body)
            .send()
            .await
            .map_err(|e| JanError::external(LAYER, format!("placeholder item creation failed: {e}")))?;

        if !response.status().is_success() {
            return Err(JanError::external(
                LAYER,
                format!("placeholder item creation returned {}", response.status()),
            ));
        }
        Ok(())
    }

    /// Fetches ordered prior turns for `conversation_id`, used when a request
    /// carries `conversation` or `previous_response_id` instead of (or along
    /// with) inline `input` (spec §4.1.3: `history(previous_response_id or
    /// conversation)`).
    pub async fn fetch_history(
        &self,
        conversation_id: &str,
        authorization: &str,
    ) -> JanResult<Vec<jan_agent::Message>> {
        let url = format!("{}/v1/conversations/{conversation_id}/items", self.base_url);
        let response = self
            .client
            .get(&url)
            .header("Authorization", authorization)
            .send()
            .await
            .map_err(|e| JanError::external(LAYER, format!("history fetch failed: {e}")))?;

        if !response.status().is_success() {
            return Err(JanError::external(
                LAYER,
                format!("history fetch returned {}", response.status()),
            ));
        }
        let body: Value = response
            .json()
            .await
            .map_err(|e| JanError::external(LAYER, format!("history fetch malformed body: {e}")))?;

        let items = body
            .get("data")
            .and_then(|v| v.as_array())
            .cloned()
            .unwrap_or_default();
        let mut messages = Vec::with_capacity(items.len());
        for item in items {
            let role = item.get("role").and_then(|v| v.as_str()).unwrap_or("user");
            let content = item
                .get("content")
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string();
            let message = match role {
                "assistant" => jan_agent::Message::assistant(content),
                "system" => jan_agent::Message::system(content),
                _ => jan_agent::Message::user(content),
            };
            messages.push(message);
        }
        Ok(messages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn create_mcp_call_placeholder_posts_in_progress_item() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/conversations/conv_1/items"))
            .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({"id": "item_1"})))
            .mount(&server)
            .await;

        let client = ConversationClient::new(reqwest::Client::new(), server.uri());
        client
            .create_mcp_call_placeholder(
                "conv_1",
                "Bearer token",
                "call_1",
                "search",
                &serde_json::json!({"q": "rust"}),
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn fetch_history_maps_items_to_messages() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/conversations/conv_1/items"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [
                    {"role": "user", "content": "hi"},
                    {"role": "assistant", "content": "hello"},
                ]
            })))
            .mount(&server)
            .await;

        let client = ConversationClient::new(reqwest::Client::new(), server.uri());
        let messages = client.fetch_history("conv_1", "Bearer token").await.unwrap();
        assert_eq!(messages.len(), 2);
    }

    #[tokio::test]
    async fn placeholder_creation_surfaces_non_success_as_external_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/conversations/conv_1/items"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let client = ConversationClient::new(reqwest::Client::new(), server.uri());
        let err = client
            .create_mcp_call_placeholder("conv_1", "Bearer token", "call_1", "search", &Value::Null)
            .await
            .unwrap_err();
        assert_eq!(err.kind, jan_core::ErrorKind::External);
    }
}
