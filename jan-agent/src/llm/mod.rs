//! LLM client abstraction for the response orchestrator's tool loop.
//!
//! The orchestrator calls `invoke`/`invoke_stream` once per turn of the loop
//! (spec §4.1.3 step 2) and inspects the returned `tool_calls` to decide whether
//! to dispatch tools or finish.
//!
//! # Streaming Support
//!
//! The `LlmClient` trait supports streaming via `invoke_stream()`, which accepts
//! an optional `Sender<MessageChunk>` for emitting tokens as they arrive.
//! Implementations that support streaming (like `ChatOpenAI`) send chunks
//! through the channel; others can use the default implementation that calls
//! `invoke()` and sends the full content as one chunk.

mod mock;
mod openai;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use async_trait::async_trait;

use crate::error::AgentError;
use crate::message::Message;
use crate::stream::MessageChunk;

pub use mock::MockLlm;
pub use openai::ChatOpenAI;

/// Tool choice mode for chat completions: when tools are present, controls whether
/// the model may choose (auto), must not use (none), or must use (required).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ToolChoiceMode {
    /// Model can pick between message or tool calls. Default when tools are present.
    #[default]
    Auto,
    /// Model will not call any tool.
    None,
    /// Model must call one or more tools.
    Required,
}

impl std::str::FromStr for ToolChoiceMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "none" => Ok(Self::None),
            "required" => Ok(Self::Required),
            _ => Err(format!(
                "unknown tool_choice: {} (use auto, none, or required)",
                s
            )),
        }
    }
}

/// A tool call surfaced by the model. `id` is the opaque call-id used as the
/// idempotency key for result write-back (spec §4.2.6, GLOSSARY "Call-id").
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    /// JSON-encoded arguments, as surfaced by the model (not yet parsed).
    pub arguments: String,
}

/// Delta for one tool call from LLM streaming (for tool_call_chunk events).
#[derive(Clone, Debug)]
pub struct ToolCallDelta {
    pub call_id: Option<String>,
    pub name: Option<String>,
    pub arguments_delta: String,
}

/// Token usage for one LLM call (prompt + completion).
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct LlmUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// The reason the model stopped generating this turn.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FinishReason {
    /// Normal completion; `content` is the final assistant message.
    Stop,
    /// The model wants to call one or more tools.
    ToolCalls,
}

/// Response from an LLM completion: assistant message text, optional tool calls,
/// and the reason generation stopped.
pub struct LlmResponse {
    /// Assistant message content (plain text). Empty when `finish_reason` is
    /// `ToolCalls` and the model emitted no accompanying text.
    pub content: String,
    /// Tool calls from this turn; empty unless `finish_reason == ToolCalls`.
    pub tool_calls: Vec<ToolCall>,
    pub finish_reason: FinishReason,
    /// Token usage for this call, when available.
    pub usage: Option<LlmUsage>,
}

/// LLM client: given messages and tool specs, returns assistant text and/or
/// tool_calls for one turn of the tool loop.
///
/// # Streaming
///
/// The trait supports streaming via `invoke_stream()`. When `chunk_tx` is `Some`,
/// implementations should send `MessageChunk` tokens through the channel as they
/// arrive from the LLM. The method still returns the complete `LlmResponse` at
/// the end.
///
/// Default implementation calls `invoke()` and sends the full content as a
/// single chunk.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Invoke one turn: read messages and available tools, return assistant
    /// content and/or tool_calls.
    async fn invoke(
        &self,
        messages: &[Message],
        tools: &[serde_json::Value],
        tool_choice: ToolChoiceMode,
    ) -> Result<LlmResponse, AgentError>;

    /// Streaming variant: invoke with optional chunk sender for token streaming.
    ///
    /// Default implementation calls `invoke()` and sends the full content as one chunk.
    async fn invoke_stream(
        &self,
        messages: &[Message],
        tools: &[serde_json::Value],
        tool_choice: ToolChoiceMode,
        chunk_tx: Option<mpsc::Sender<MessageChunk>>,
    ) -> Result<LlmResponse, AgentError> {
        let response = self.invoke(messages, tools, tool_choice).await?;

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
