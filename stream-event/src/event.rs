//! Wire shape for one internal orchestrator event: type + payload (spec §4.1.2,
//! §4.1.3). These are not the client-visible SSE frames themselves; jan-agent's
//! SSE writer (`openai_sse`) adapts a subset of these into OpenAI-compatible
//! `ChatCompletionDelta` lines, while the full stream (including tool lifecycle
//! events) is also available to internal consumers such as webhook delivery.

use serde::Serialize;
use serde_json::Value;

/// One step in a response's tool loop, tagged by `type` on the wire.
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResponseEvent {
    /// A content delta from the upstream chat-completions stream.
    MessageChunk { content: String },
    /// A tool call was surfaced by the model and is about to be dispatched.
    ToolCallStarted {
        call_id: String,
        tool_name: String,
        arguments: Value,
    },
    /// A tool call returned a result.
    ToolCallCompleted { call_id: String, output: Value },
    /// A tool call failed; the loop continues with the error as the tool's output.
    ToolCallFailed { call_id: String, error: String },
    /// Token accounting for the turn just completed.
    Usage {
        prompt_tokens: u32,
        completion_tokens: u32,
        total_tokens: u32,
    },
    /// `depth > MaxToolDepth`; the loop is being force-terminated (spec §4.1.3 step 5).
    MaxToolDepthExceeded { depth: u32 },
    /// Terminal event: the response reached a final status.
    Done { status: String },
}

impl ResponseEvent {
    /// Serializes this event to a JSON object (type + payload only; no envelope).
    pub fn to_value(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self)
    }
}
