//! Chat message types shared by the LLM client, the SSE adapter, and the
//! context-window trimmer.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::llm::ToolCall;

/// One message in a conversation sent to the upstream chat-completions endpoint.
///
/// Unlike a plain system/user/assistant enum, this carries the `tool` role and
/// `tool_call_id` needed by the tool loop (spec §4.1.3 step 4: `{role=tool,
/// tool_call_id=call_id, content=result-or-error-json}`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    #[serde(default)]
    pub content: Option<String>,
    /// Set on assistant messages that surfaced tool calls.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
    /// Set on `role=tool` messages: the call this message answers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: Some(content.into()),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: Some(content.into()),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: Some(content.into()),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }

    pub fn assistant_tool_calls(tool_calls: Vec<ToolCall>) -> Self {
        Self {
            role: Role::Assistant,
            content: None,
            tool_calls,
            tool_call_id: None,
        }
    }

    /// Builds the `role=tool` reply message appended after a tool call returns
    /// (spec §4.1.3 step 4).
    pub fn tool_result(call_id: impl Into<String>, result_json: Value) -> Self {
        Self {
            role: Role::Tool,
            content: Some(result_json.to_string()),
            tool_calls: Vec::new(),
            tool_call_id: Some(call_id.into()),
        }
    }

    /// Rough token estimate used by trimming (spec §4.1.4): `runeCount/4 + 10`
    /// overhead per message, plus `20 + len(name) + len(args)` per tool call.
    pub fn estimated_tokens(&self) -> usize {
        let content_chars = self.content.as_deref().map(|s| s.chars().count()).unwrap_or(0);
        let mut total = content_chars / 4 + 10;
        for call in &self.tool_calls {
            total += 20 + call.name.len() + call.arguments.len();
        }
        total
    }

    pub fn is_tool_result(&self) -> bool {
        self.role == Role::Tool
    }

    pub fn is_assistant_with_tool_calls(&self) -> bool {
        self.role == Role::Assistant && !self.tool_calls.is_empty()
    }

    pub fn is_plain_assistant(&self) -> bool {
        self.role == Role::Assistant && self.tool_calls.is_empty()
    }
}
