//! Stateless MCP JSON-RPC bridge (spec §4.2): multiplexes tool calls across
//! external providers, with per-provider circuit breakers, retry/backoff,
//! session reattachment, and idempotent write-back into the conversation store.
//!
//! ## Main modules
//!
//! - [`method_guard`]: the fixed method allow-list for `POST /v1/mcp`.
//! - [`registry`]: [`registry::Tool`] trait and [`registry::ToolRegistry`].
//! - [`tools`]: the four built-in tools (search/scrape/python_exec/memory_retrieve).
//! - [`provider_client`]: resilient HTTP client wrapping [`circuit_breaker::CircuitBreaker`].
//! - [`session`]: external MCP provider session reattachment.
//! - [`writeback`]: conversation-item PATCH by call-id.
//! - [`transport`]: the axum handler for `POST /v1/mcp`.

pub mod circuit_breaker;
pub mod error;
pub mod method_guard;
pub mod provider_client;
pub mod registry;
pub mod session;
pub mod tools;
pub mod transport;
pub mod writeback;

pub use circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState};
pub use provider_client::ProviderClient;
pub use registry::{Tool, ToolRegistry, ToolSpec};
pub use session::ProviderSession;
pub use transport::{handle_mcp_request, McpBridgeState};
pub use writeback::{WriteBackClient, WriteBackOutcome, WriteBackRequest};
