//! `POST /v1/responses` request DTO (spec §4.1.1 Create).
//!
//! `input` accepts either a plain string (single user turn) or an array of
//! chat-message-like parts, mirroring the OpenAI Chat Completions message
//! shape so multi-part content (text + `data:<mime>;jan_<id>` placeholders)
//! can be carried without a bespoke format.

use serde::Deserialize;
use serde_json::{Map, Value};

/// Body of `POST /v1/responses`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct CreateResponseRequest {
    pub model: String,
    pub input: ResponseInput,
    #[serde(default)]
    pub system_prompt: Option<String>,
    #[serde(default)]
    pub stream: bool,
    #[serde(default)]
    pub background: bool,
    #[serde(default)]
    pub store: bool,
    #[serde(default)]
    pub metadata: Map<String, Value>,
    /// Raw JSON-schema function specs, passed through to the LLM client unparsed.
    #[serde(default)]
    pub tools: Vec<Value>,
    #[serde(default)]
    pub conversation: Option<String>,
    #[serde(default)]
    pub previous_response_id: Option<String>,
}

impl CreateResponseRequest {
    /// `metadata.webhook_url`, the only metadata key this system recognizes (spec §6.5).
    pub fn webhook_url(&self) -> Option<&str> {
        self.metadata.get("webhook_url").and_then(|v| v.as_str())
    }
}

/// Request `input`: a single user turn of plain text, or a list of chat messages.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ResponseInput {
    Text(String),
    Messages(Vec<ChatMessage>),
}

/// A single message in a multi-turn `input` array.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ChatMessage {
    pub role: String,
    pub content: Option<MessageContent>,
}

/// Message content: either a plain string or an array of parts (OpenAI multimodal).
///
/// Deserializes from `"hello"` or `[{"type":"text","text":"hello"},{"type":"image_url",...}]`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    String(String),
    Array(Vec<ContentPart>),
}

impl MessageContent {
    /// Text of this content: the string variant as-is, or the concatenation of
    /// every `text` part. Other part types (e.g. `image_url`) are skipped here;
    /// media placeholders embedded in text parts are expanded later by the
    /// media resolver, not by this parser.
    pub fn as_text(&self) -> String {
        match self {
            MessageContent::String(s) => s.clone(),
            MessageContent::Array(parts) => parts
                .iter()
                .filter_map(|p| p.text.as_deref())
                .collect::<Vec<_>>()
                .join(""),
        }
    }
}

/// One part of a multimodal message content array.
#[derive(Debug, Clone, Deserialize)]
pub struct ContentPart {
    #[serde(rename = "type")]
    pub part_type: Option<String>,
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub struct StreamOptions {
    #[serde(default)]
    pub include_usage: bool,
}
