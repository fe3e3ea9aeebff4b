//! Error conversions for the bridge; everything ultimately becomes a `jan_core::JanError`
//! so `jan-server` can translate it to an HTTP status the same way as every other crate.

use jan_core::JanError;

const LAYER: &str = "mcp_bridge";

/// Wraps a transport-level failure (provider unreachable, bad JSON, non-2xx) as
/// `ErrorKind::External` (spec §7: upstream service failed).
pub fn external(message: impl Into<String>) -> JanError {
    JanError::external(LAYER, message)
}

/// Wraps a request that failed the method guard or tool-argument validation.
pub fn validation(message: impl Into<String>) -> JanError {
    JanError::validation(LAYER, message)
}

/// A tool that exists but is disabled by config (spec §4.2.3).
pub fn not_implemented(message: impl Into<String>) -> JanError {
    JanError::not_implemented(LAYER, message)
}

pub fn not_found(message: impl Into<String>) -> JanError {
    JanError::not_found(LAYER, message)
}
