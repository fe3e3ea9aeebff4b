//! Envelope (response_id, call_id, event_id) attached to every internal event so a
//! consumer (SSE writer, webhook payload builder, audit log) can correlate events
//! without re-deriving context from the event payload itself.

use crate::event::ResponseEvent;
use serde_json::Value;

/// Envelope fields merged into each event's JSON object.
#[derive(Clone, Debug, Default)]
pub struct Envelope {
    /// Response id (`resp_…`); constant within a response's lifecycle.
    pub response_id: Option<String>,
    /// The tool call currently in flight, if any (set between `ToolCallStarted`
    /// and its matching `ToolCallCompleted`/`ToolCallFailed`).
    pub call_id: Option<String>,
    /// Per-event sequence number; monotonically increasing within a response.
    pub event_id: Option<u64>,
}

impl Envelope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_response_id(mut self, id: impl Into<String>) -> Self {
        self.response_id = Some(id.into());
        self
    }

    pub fn with_call_id(mut self, id: impl Into<String>) -> Self {
        self.call_id = Some(id.into());
        self
    }

    pub fn with_event_id(mut self, id: u64) -> Self {
        self.event_id = Some(id);
        self
    }

    /// Merges envelope fields into the given JSON object (top-level only).
    /// Does not overwrite existing keys.
    pub fn inject_into(&self, obj: &mut Value) {
        let Some(obj) = obj.as_object_mut() else {
            return;
        };
        if let Some(ref id) = self.response_id {
            obj.entry("response_id")
                .or_insert_with(|| Value::String(id.clone()));
        }
        if let Some(ref id) = self.call_id {
            obj.entry("call_id")
                .or_insert_with(|| Value::String(id.clone()));
        }
        if let Some(id) = self.event_id {
            obj.entry("event_id")
                .or_insert_with(|| Value::Number(serde_json::Number::from(id)));
        }
    }
}

/// Envelope state for one response's tool loop: response id, the call currently
/// in flight, and the next event sequence number.
pub struct EnvelopeState {
    pub response_id: String,
    current_call_id: Option<String>,
    next_event_id: u64,
}

impl EnvelopeState {
    pub fn new(response_id: String) -> Self {
        Self {
            response_id,
            current_call_id: None,
            next_event_id: 1,
        }
    }

    /// Injects envelope into the event value and advances state.
    ///
    /// On `type == "tool_call_started"`, records `call_id` as in-flight. On
    /// `tool_call_completed`/`tool_call_failed`, clears it once injected.
    pub fn inject_into(&mut self, value: &mut Value) {
        let event_type = value.get("type").and_then(|v| v.as_str()).unwrap_or("");
        let incoming_call_id = value
            .get("call_id")
            .and_then(|v| v.as_str())
            .map(str::to_string);

        if event_type == "tool_call_started" {
            self.current_call_id = incoming_call_id.clone();
        }

        let env = Envelope::new().with_response_id(&self.response_id).with_event_id(self.next_event_id);
        let env = match self.current_call_id.clone() {
            Some(id) => env.with_call_id(id),
            None => env,
        };
        self.next_event_id += 1;
        env.inject_into(value);

        if matches!(event_type, "tool_call_completed" | "tool_call_failed") {
            self.current_call_id = None;
        }
    }

    /// The next sequence number this state would assign, without advancing it.
    pub fn peek_event_id(&self) -> u64 {
        self.next_event_id
    }
}

/// Converts a response event to JSON and injects envelope using the given state.
pub fn to_json(
    event: &ResponseEvent,
    state: &mut EnvelopeState,
) -> Result<Value, serde_json::Error> {
    let mut value = event.to_value()?;
    state.inject_into(&mut value);
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::ResponseEvent;

    #[test]
    fn envelope_inject_does_not_overwrite_existing_keys() {
        let mut obj = serde_json::json!({"type": "message_chunk", "response_id": "resp_keep"});
        let env = Envelope::new()
            .with_response_id("resp_new")
            .with_event_id(1);
        env.inject_into(&mut obj);
        assert_eq!(obj["response_id"], "resp_keep");
        assert_eq!(obj["event_id"], 1);
    }

    #[test]
    fn tool_call_id_is_attached_until_completion() {
        let mut state = EnvelopeState::new("resp_1".to_string());

        let started = ResponseEvent::ToolCallStarted {
            call_id: "call_1".to_string(),
            tool_name: "google_search".to_string(),
            arguments: serde_json::json!({"q": "weather"}),
        };
        let v1 = to_json(&started, &mut state).unwrap();
        assert_eq!(v1["call_id"], "call_1");

        let chunk = ResponseEvent::MessageChunk {
            content: "".to_string(),
        };
        let v2 = to_json(&chunk, &mut state).unwrap();
        assert_eq!(v2["call_id"], "call_1");

        let completed = ResponseEvent::ToolCallCompleted {
            call_id: "call_1".to_string(),
            output: serde_json::json!({"ok": true}),
        };
        let v3 = to_json(&completed, &mut state).unwrap();
        assert_eq!(v3["call_id"], "call_1");

        let next = ResponseEvent::MessageChunk {
            content: "done".to_string(),
        };
        let v4 = to_json(&next, &mut state).unwrap();
        assert!(v4.get("call_id").is_none());
    }

    #[test]
    fn event_ids_increase_monotonically() {
        let mut state = EnvelopeState::new("resp_1".to_string());
        let chunk = ResponseEvent::MessageChunk {
            content: "a".to_string(),
        };
        let v1 = to_json(&chunk, &mut state).unwrap();
        let v2 = to_json(&chunk, &mut state).unwrap();
        assert_eq!(v1["event_id"], 1);
        assert_eq!(v2["event_id"], 2);
    }
}
