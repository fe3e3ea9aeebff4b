//! OpenAI-compatible SSE adapter (spec §6.2).
//!
//! Converts [`ResponseEvent`](stream_event::ResponseEvent) into SSE lines of
//! the form `data: <json>\n\n`, where `<json>` is an OpenAI-compatible
//! `ChatCompletionDelta`. No HTTP dependency: callers feed events and consume
//! lines (or bytes). The literal `data: [DONE]\n\n` terminator is appended by
//! the HTTP handler, not by this adapter.
//!
//! # Types
//!
//! - **[`CreateResponseRequest`]**: `POST /v1/responses` body DTO.
//! - **[`ChatCompletionChunk`]**: response chunk DTO (id, object, created, model, choices, usage).
//! - **[`StreamToSse`]**: stateful adapter that turns `ResponseEvent` into SSE lines.
//! - **[`parse_create_request`]**: parses the request body into messages + mode flags.

mod chunk;
mod parse;
mod request;

pub use chunk::{
    ChatCompletionChunk, ChunkChoice, ChunkUsage, Delta, DeltaToolCall, DeltaToolCallFunction,
};
pub use parse::{parse_create_request, ParseError, ParsedCreateRequest};
pub use request::{ChatMessage, CreateResponseRequest, MessageContent, ResponseInput, StreamOptions};

use chunk::ChatCompletionChunk as Chunk;
use std::time::{SystemTime, UNIX_EPOCH};
use stream_event::ResponseEvent;
use tokio::sync::mpsc;

/// Metadata shared by every chunk in one stream (same id, created, model).
#[derive(Debug, Clone)]
pub struct ChunkMeta {
    /// Completion id, e.g. the Response's `resp_…` public id.
    pub id: String,
    pub model: String,
    /// Unix timestamp (seconds). If `None`, resolved to current time at first use.
    pub created: Option<u64>,
}

impl ChunkMeta {
    pub fn created_secs(&mut self) -> u64 {
        if let Some(c) = self.created {
            c
        } else {
            let secs = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or(0);
            self.created = Some(secs);
            secs
        }
    }
}

/// Converts `ResponseEvent`s into OpenAI SSE lines.
///
/// Feed events via [`feed`](StreamToSse::feed); call [`finish`](StreamToSse::finish) once the
/// loop reaches a terminal state, then [`take_lines`](StreamToSse::take_lines) for the
/// accumulated `data:` strings. When constructed with
/// [`new_with_sink`](StreamToSse::new_with_sink), each line is also sent to the channel as it
/// is produced, for response bodies that stream directly off the channel.
pub struct StreamToSse {
    meta: ChunkMeta,
    include_usage: bool,
    usage: Option<ChunkUsage>,
    lines: Vec<String>,
    sent_initial: bool,
    next_tool_call_index: u32,
    sink: Option<mpsc::Sender<String>>,
}

impl StreamToSse {
    pub fn new(meta: ChunkMeta, include_usage: bool) -> Self {
        Self {
            meta,
            include_usage,
            usage: None,
            lines: Vec::new(),
            sent_initial: false,
            next_tool_call_index: 0,
            sink: None,
        }
    }

    pub fn new_with_sink(meta: ChunkMeta, include_usage: bool, sink: mpsc::Sender<String>) -> Self {
        Self {
            meta,
            include_usage,
            usage: None,
            lines: Vec::new(),
            sent_initial: false,
            next_tool_call_index: 0,
            sink: Some(sink),
        }
    }

    fn push_line(&mut self, line: String) {
        if let Some(ref tx) = self.sink {
            let _ = tx.try_send(line.clone());
        }
        self.lines.push(line);
    }

    fn push_chunk(&mut self, choice: ChunkChoice, usage: Option<ChunkUsage>) {
        let created = self.meta.created_secs();
        let chunk = Chunk {
            id: self.meta.id.clone(),
            object: Chunk::OBJECT,
            created,
            model: self.meta.model.clone(),
            choices: vec![choice],
            usage,
        };
        self.push_line(write_sse_line(&chunk));
    }

    /// Feeds one orchestrator event and may push one SSE line into the internal buffer.
    ///
    /// Tool execution (`ToolCallCompleted`/`ToolCallFailed`) happens server-side between
    /// loop turns (spec §4.1.3) and has no OpenAI wire representation, so those events
    /// (and `MaxToolDepthExceeded`, which surfaces as the terminal `Done` status instead)
    /// are absorbed without emitting a line.
    pub fn feed(&mut self, event: &ResponseEvent) {
        match event {
            ResponseEvent::MessageChunk { content } => {
                if !self.sent_initial {
                    self.sent_initial = true;
                    self.push_chunk(
                        ChunkChoice {
                            index: 0,
                            delta: Delta {
                                role: Some("assistant".to_string()),
                                content: Some(String::new()),
                                tool_calls: None,
                            },
                            finish_reason: None,
                        },
                        None,
                    );
                }
                self.push_chunk(
                    ChunkChoice {
                        index: 0,
                        delta: Delta {
                            role: None,
                            content: Some(content.clone()),
                            tool_calls: None,
                        },
                        finish_reason: None,
                    },
                    None,
                );
            }
            ResponseEvent::ToolCallStarted {
                call_id,
                tool_name,
                arguments,
            } => {
                let index = self.next_tool_call_index;
                self.next_tool_call_index += 1;
                self.push_chunk(
                    ChunkChoice {
                        index: 0,
                        delta: Delta {
                            role: None,
                            content: None,
                            tool_calls: Some(vec![DeltaToolCall {
                                index,
                                id: Some(call_id.clone()),
                                r#type: Some("function".to_string()),
                                function: Some(DeltaToolCallFunction {
                                    name: Some(tool_name.clone()),
                                    arguments: Some(arguments.to_string()),
                                }),
                            }]),
                        },
                        finish_reason: Some("tool_calls".to_string()),
                    },
                    None,
                );
            }
            ResponseEvent::Usage {
                prompt_tokens,
                completion_tokens,
                total_tokens,
            } => {
                self.usage = Some(ChunkUsage {
                    prompt_tokens: *prompt_tokens,
                    completion_tokens: *completion_tokens,
                    total_tokens: *total_tokens,
                });
            }
            ResponseEvent::ToolCallCompleted { .. }
            | ResponseEvent::ToolCallFailed { .. }
            | ResponseEvent::MaxToolDepthExceeded { .. }
            | ResponseEvent::Done { .. } => {}
        }
    }

    /// Emits the final chunk (`delta: {}`, `finish_reason: status`, optional usage).
    /// Call once after the loop reaches a terminal state.
    pub fn finish(&mut self, status: &str) {
        self.push_chunk(
            ChunkChoice {
                index: 0,
                delta: Delta::default(),
                finish_reason: Some(status.to_string()),
            },
            if self.include_usage {
                self.usage.clone()
            } else {
                None
            },
        );
    }

    /// Returns and clears the collected SSE lines.
    pub fn take_lines(&mut self) -> Vec<String> {
        std::mem::take(&mut self.lines)
    }
}

/// Serializes a [`ChatCompletionChunk`] to a single SSE line: `data: <json>\n\n`.
pub fn write_sse_line(chunk: &ChatCompletionChunk) -> String {
    let json = serde_json::to_string(chunk).expect("chunk serialization is infallible");
    format!("data: {json}\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta() -> ChunkMeta {
        ChunkMeta {
            id: "resp_test".to_string(),
            model: "gpt-test".to_string(),
            created: Some(0),
        }
    }

    #[test]
    fn first_message_chunk_carries_assistant_role_then_content() {
        let mut adapter = StreamToSse::new(meta(), false);
        adapter.feed(&ResponseEvent::MessageChunk {
            content: "hello".to_string(),
        });
        let lines = adapter.take_lines();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains(r#""role":"assistant""#));
        assert!(lines[1].contains("hello"));
    }

    #[test]
    fn tool_call_started_increments_index_across_calls() {
        let mut adapter = StreamToSse::new(meta(), false);
        adapter.feed(&ResponseEvent::ToolCallStarted {
            call_id: "call_1".to_string(),
            tool_name: "google_search".to_string(),
            arguments: serde_json::json!({}),
        });
        adapter.feed(&ResponseEvent::ToolCallStarted {
            call_id: "call_2".to_string(),
            tool_name: "scrape".to_string(),
            arguments: serde_json::json!({}),
        });
        let lines = adapter.take_lines();
        assert!(lines[0].contains(r#""index":0"#));
        assert!(lines[1].contains(r#""index":1"#));
    }

    #[test]
    fn tool_call_completed_emits_no_line() {
        let mut adapter = StreamToSse::new(meta(), false);
        adapter.feed(&ResponseEvent::ToolCallCompleted {
            call_id: "call_1".to_string(),
            output: serde_json::json!({"ok": true}),
        });
        assert!(adapter.take_lines().is_empty());
    }

    #[test]
    fn finish_includes_usage_only_when_enabled() {
        let mut adapter = StreamToSse::new(meta(), true);
        adapter.feed(&ResponseEvent::Usage {
            prompt_tokens: 10,
            completion_tokens: 5,
            total_tokens: 15,
        });
        adapter.finish("stop");
        let lines = adapter.take_lines();
        assert!(lines[0].contains(r#""total_tokens":15"#));
    }
}
