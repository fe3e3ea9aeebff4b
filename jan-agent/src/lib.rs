//! Message types, the `LlmClient` trait and its OpenAI-compatible
//! implementation ([`ChatOpenAI`]), OpenAI-compatible request/SSE parsing and
//! encoding ([`openai_sse`]), and context-window trimming ([`trim`]).
//!
//! Shared by `jan-orchestrator`'s tool loop and `jan-server`'s HTTP handlers;
//! has no dependency on either.
//!
//! ## Main modules
//!
//! - [`message`]: [`Message`], [`Role`] — one chat turn, including `tool` role and `tool_calls`.
//! - [`llm`]: [`LlmClient`] trait, [`MockLlm`], [`ChatOpenAI`], [`ToolCall`], [`FinishReason`].
//! - [`openai_sse`]: [`CreateResponseRequest`], [`parse_create_request`], [`StreamToSse`], [`ChatCompletionChunk`].
//! - [`trim`]: context-window-aware message trimming.
//! - [`error`]: [`AgentError`].

pub mod error;
pub mod llm;
pub mod message;
pub mod openai_sse;
pub mod stream;
pub mod trim;

pub use error::AgentError;
pub use llm::{
    ChatOpenAI, FinishReason, LlmClient, LlmResponse, LlmUsage, MockLlm, ToolCall, ToolCallDelta,
    ToolChoiceMode,
};
pub use message::{Message, Role};
pub use openai_sse::{
    parse_create_request, write_sse_line, ChatCompletionChunk, ChunkMeta, ChunkUsage,
    CreateResponseRequest, DeltaToolCall, ParseError, ParsedCreateRequest, StreamToSse,
};
pub use stream::MessageChunk;
pub use trim::{token_budget, trim_to_budget, truncate_tool_result};
