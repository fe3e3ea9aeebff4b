//! HTTP entrypoint (spec §6): wires the response orchestrator, MCP bridge,
//! realtime reconciler, and media resolver behind one axum router.

pub mod app;
pub mod auth;
pub mod error;
pub mod health;
pub mod media;
pub mod realtime;
pub mod request_id;
pub mod responses;
