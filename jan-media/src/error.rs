//! Error conversions for the media resolver and ingest path; everything
//! ultimately becomes a `jan_core::JanError` so `jan-server` can translate it
//! to an HTTP status the same way as every other crate.

use jan_core::JanError;

const LAYER: &str = "media";

pub fn validation(message: impl Into<String>) -> JanError {
    JanError::validation(LAYER, message)
}

/// Object-store or media-resolve-endpoint failure (spec §4.4.3: "propagate as
/// a 502-class error").
pub fn external(message: impl Into<String>) -> JanError {
    JanError::external(LAYER, message)
}

pub fn database(message: impl Into<String>) -> JanError {
    JanError::database(LAYER, message)
}
