//! Scripted `LlmClient` for tests that don't need a real upstream call.

use async_trait::async_trait;
use std::sync::Mutex;
use tokio::sync::mpsc;

use crate::error::AgentError;
use crate::llm::{FinishReason, LlmClient, LlmResponse, ToolChoiceMode};
use crate::message::Message;
use crate::stream::MessageChunk;

/// Replays a fixed sequence of responses, one per `invoke`/`invoke_stream` call.
/// Panics if called more times than responses were scripted.
pub struct MockLlm {
    responses: Mutex<Vec<LlmResponse>>,
}

impl MockLlm {
    pub fn new(responses: Vec<LlmResponse>) -> Self {
        Self {
            responses: Mutex::new(responses),
        }
    }

    /// Convenience for the common single-turn, no-tool-calls case.
    pub fn with_text(content: impl Into<String>) -> Self {
        Self::new(vec![LlmResponse {
            content: content.into(),
            tool_calls: vec![],
            finish_reason: FinishReason::Stop,
            usage: None,
        }])
    }

    fn next_response(&self) -> LlmResponse {
        let mut responses = self.responses.lock().expect("mock llm mutex poisoned");
        if responses.is_empty() {
            panic!("MockLlm called more times than responses were scripted");
        }
        responses.remove(0)
    }
}

#[async_trait]
impl LlmClient for MockLlm {
    async fn invoke(
        &self,
        _messages: &[Message],
        _tools: &[serde_json::Value],
        _tool_choice: ToolChoiceMode,
    ) -> Result<LlmResponse, AgentError> {
        Ok(self.next_response())
    }

    async fn invoke_stream(
        &self,
        _messages: &[Message],
        _tools: &[serde_json::Value],
        _tool_choice: ToolChoiceMode,
        chunk_tx: Option<mpsc::Sender<MessageChunk>>,
    ) -> Result<LlmResponse, AgentError> {
        let response = self.next_response();
        if let Some(tx) = chunk_tx {
            if !response.content.is_empty() {
                let _ = tx
                    .send(MessageChunk {
                        content: response.content.clone(),
                    })
                    .await;
            }
        }
        Ok(response)
    }
}
