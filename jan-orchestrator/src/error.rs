//! Error conversions for the orchestrator; everything ultimately becomes a
//! `jan_core::JanError` so `jan-server` can translate it to an HTTP status the
//! same way as every other crate.

use jan_core::JanError;

const LAYER: &str = "orchestrator";

pub fn validation(message: impl Into<String>) -> JanError {
    JanError::validation(LAYER, message)
}

pub fn not_found(message: impl Into<String>) -> JanError {
    JanError::not_found(LAYER, message)
}

pub fn forbidden(message: impl Into<String>) -> JanError {
    JanError::forbidden(LAYER, message)
}

pub fn conflict(message: impl Into<String>) -> JanError {
    JanError::conflict(LAYER, message)
}

/// Upstream chat-completions failure (spec §4.1.5: "Upstream 5xx or connection
/// error").
pub fn upstream_unavailable(message: impl Into<String>) -> JanError {
    JanError::external(LAYER, message)
}
