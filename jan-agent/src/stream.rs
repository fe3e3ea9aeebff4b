//! Minimal streaming primitives used while an upstream chat-completions call
//! is in flight.

/// One content delta from an in-flight LLM call.
#[derive(Debug, Clone)]
pub struct MessageChunk {
    pub content: String,
}
