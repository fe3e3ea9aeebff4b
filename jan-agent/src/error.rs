//! LLM client and SSE-adapter error types.

use thiserror::Error;

/// Error from an [`LlmClient`](crate::llm::LlmClient) call or the SSE adapter.
#[derive(Debug, Error)]
pub enum AgentError {
    /// The upstream call failed (network error, non-2xx status, malformed body).
    #[error("upstream call failed: {0}")]
    Upstream(String),

    /// The model returned a response this client could not parse.
    #[error("malformed upstream response: {0}")]
    MalformedResponse(String),
}
