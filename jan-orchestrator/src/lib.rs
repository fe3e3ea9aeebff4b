//! Response orchestrator (spec §4.1): the tool-using agent loop run over an
//! upstream chat-completions provider, plus the `/v1/responses` lifecycle
//! (create/get/cancel/delete/list-input-items) and its three execution modes
//! (synchronous, streaming, background).
//!
//! ## Main modules
//!
//! - [`model`]: [`model::Response`], [`model::ToolExecution`] — the persisted shape.
//! - [`store`]: [`store::SqliteResponseStore`] — CRUD plus the background queue.
//! - [`tool_loop`]: [`tool_loop::ToolLoop`] — the core per-turn algorithm.
//! - [`queue`]: [`queue::BackgroundWorkerPool`] — workers draining the queue.
//! - [`service`]: [`service::ResponseService`] — the public create/get/cancel/delete/list API.
//! - [`catalog`]: HTTP-backed [`model_spec_core::ModelLimitResolver`].
//! - [`mcp_client`], [`conversation_client`]: orchestrator-side HTTP clients.
//! - [`webhook`]: terminal-state webhook delivery.
//! - [`error`]: orchestrator-tagged [`jan_core::JanError`] constructors.

pub mod catalog;
pub mod conversation_client;
pub mod error;
pub mod mcp_client;
pub mod model;
pub mod queue;
pub mod service;
pub mod store;
pub mod tool_loop;
pub mod webhook;

pub use catalog::HttpCatalogResolver;
pub use conversation_client::ConversationClient;
pub use mcp_client::McpClient;
pub use model::{Response, ResponseError, ResponseStatus, ToolExecution, ToolExecutionStatus};
pub use queue::{BackgroundWorkerPool, WorkerPoolConfig};
pub use service::{ExecutionOutcome, ResponseService};
pub use store::SqliteResponseStore;
pub use tool_loop::{LoopOutcomeKind, ToolLoop, ToolLoopContext, ToolLoopResult};
pub use webhook::WebhookSender;
