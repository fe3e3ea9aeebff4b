//! Response and ToolExecution data model (spec §3.1, §3.2).

use chrono::{DateTime, Utc};
use jan_agent::Message;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Closed status enumeration (spec §9 "Tagged variants"). `Queued` and
/// `InProgress` are non-terminal; the other three are terminal and absorbing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseStatus {
    Queued,
    InProgress,
    Completed,
    Failed,
    Cancelled,
}

impl ResponseStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ResponseStatus::Completed | ResponseStatus::Failed | ResponseStatus::Cancelled
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseError {
    pub code: String,
    pub message: String,
}

/// One `POST /v1/responses` lifecycle (spec §3.1).
///
/// **Invariant**: exactly one of `completed_at, cancelled_at, failed_at` is
/// non-null iff `status` is terminal; `background=true` implies `queued_at` is
/// set at creation; `stream` and `background` are mutually exclusive.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    pub public_id: String,
    pub user_id: String,
    pub model: String,
    /// Provider id used for the catalog lookup (spec §4.1.3 step 1); distinct
    /// from `model` since one provider can serve many model ids.
    pub provider_id: String,
    pub system_prompt: Option<String>,
    pub input: Value,
    pub output: Option<String>,
    pub status: ResponseStatus,
    pub stream: bool,
    pub background: bool,
    pub store: bool,
    pub conversation_id: Option<String>,
    pub previous_response_id: Option<String>,
    pub metadata: Value,
    pub usage: Option<jan_agent::LlmUsage>,
    pub error: Option<ResponseError>,
    pub queued_at: Option<DateTime<Utc>>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub failed_at: Option<DateTime<Utc>>,
    /// Trimmed/resolved messages carried across background worker pickup and the
    /// stream loop; not part of §3.1's wire-visible Response shape, but the
    /// tool loop's working state needs to survive between handler and worker.
    #[serde(default)]
    pub messages: Vec<Message>,
    /// The inbound `Authorization` header, persisted so a background worker can
    /// replay it against the conversation store and MCP bridge after the
    /// original request has returned (spec §4.1.2: "executes the same loop
    /// against a detached context"). Never echoed in any client-visible shape.
    #[serde(default)]
    pub authorization: Option<String>,
}

impl Response {
    pub fn webhook_url(&self) -> Option<String> {
        self.metadata
            .get("webhook_url")
            .and_then(|v| v.as_str())
            .map(str::to_string)
    }

    /// spec §8.1: exactly one terminal timestamp is non-null iff status is terminal.
    pub fn terminal_timestamp_invariant_holds(&self) -> bool {
        let count = [self.completed_at, self.cancelled_at, self.failed_at]
            .iter()
            .filter(|t| t.is_some())
            .count();
        if self.status.is_terminal() {
            count == 1
        } else {
            count == 0
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolExecutionStatus {
    Success,
    Failed,
}

/// One tool invocation within a response's tool loop (spec §3.2). Persisted
/// after each tool call returns (at-least-once write).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolExecution {
    pub response_id: String,
    pub call_id: String,
    pub tool_name: String,
    pub arguments: Value,
    pub result: Option<Value>,
    pub status: ToolExecutionStatus,
    pub error_message: Option<String>,
    pub execution_order: u32,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
}
