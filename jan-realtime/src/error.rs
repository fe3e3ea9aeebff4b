//! Error conversions for the realtime session reconciler; everything
//! ultimately becomes a `jan_core::JanError` so `jan-server` can translate it
//! to an HTTP status the same way as every other crate.

use jan_core::JanError;

const LAYER: &str = "realtime";

pub fn validation(message: impl Into<String>) -> JanError {
    JanError::validation(LAYER, message)
}

pub fn not_found(message: impl Into<String>) -> JanError {
    JanError::not_found(LAYER, message)
}

pub fn forbidden(message: impl Into<String>) -> JanError {
    JanError::forbidden(LAYER, message)
}

/// LiveKit control-plane or token-signing failure (spec §4.3.1, §4.3.2).
pub fn external(message: impl Into<String>) -> JanError {
    JanError::external(LAYER, message)
}

pub fn internal(message: impl Into<String>) -> JanError {
    JanError::internal(LAYER, message)
}
