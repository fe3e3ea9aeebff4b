//! Error taxonomy shared by every jan-server crate.
//!
//! Every error carries a stable id for log correlation, the layer that raised it,
//! and a [`ErrorKind`] that handlers translate to an HTTP status. Secrets and stack
//! traces never reach the client-visible body (spec §7).

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

/// Closed enumeration of error kinds. Implementations should match exhaustively
/// rather than compare against free-form strings (spec §9, "Tagged variants").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// 400 - bad input from caller.
    Validation,
    /// 401 - missing or invalid token.
    Unauthorized,
    /// 403 - ownership check failed.
    Forbidden,
    /// 404 - unknown public id.
    NotFound,
    /// 409 - illegal state transition.
    Conflict,
    /// 500 - persistence failure, retriable by caller.
    DatabaseError,
    /// 502 - upstream service failed.
    External,
    /// 500 - logic invariant violated.
    Internal,
    /// 501 - feature disabled by config.
    NotImplemented,
}

impl ErrorKind {
    pub fn status(self) -> StatusCode {
        match self {
            ErrorKind::Validation => StatusCode::BAD_REQUEST,
            ErrorKind::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorKind::Forbidden => StatusCode::FORBIDDEN,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Conflict => StatusCode::CONFLICT,
            ErrorKind::DatabaseError => StatusCode::INTERNAL_SERVER_ERROR,
            ErrorKind::External => StatusCode::BAD_GATEWAY,
            ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
            ErrorKind::NotImplemented => StatusCode::NOT_IMPLEMENTED,
        }
    }
}

/// A tagged error, carrying a correlation id and the layer that raised it.
///
/// Layers wrap errors as they propagate (`JanError::wrap`), preserving the chain
/// while keeping the original `kind` unless explicitly overridden.
#[derive(Debug, Error)]
#[error("[{layer}] {message} (id={id})")]
pub struct JanError {
    pub id: Uuid,
    pub layer: &'static str,
    pub kind: ErrorKind,
    pub message: String,
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
}

impl JanError {
    pub fn new(layer: &'static str, kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            layer,
            kind,
            message: message.into(),
            source: None,
        }
    }

    pub fn validation(layer: &'static str, message: impl Into<String>) -> Self {
        Self::new(layer, ErrorKind::Validation, message)
    }

    pub fn unauthorized(layer: &'static str, message: impl Into<String>) -> Self {
        Self::new(layer, ErrorKind::Unauthorized, message)
    }

    pub fn forbidden(layer: &'static str, message: impl Into<String>) -> Self {
        Self::new(layer, ErrorKind::Forbidden, message)
    }

    pub fn not_found(layer: &'static str, message: impl Into<String>) -> Self {
        Self::new(layer, ErrorKind::NotFound, message)
    }

    pub fn conflict(layer: &'static str, message: impl Into<String>) -> Self {
        Self::new(layer, ErrorKind::Conflict, message)
    }

    pub fn database(layer: &'static str, message: impl Into<String>) -> Self {
        Self::new(layer, ErrorKind::DatabaseError, message)
    }

    pub fn external(layer: &'static str, message: impl Into<String>) -> Self {
        Self::new(layer, ErrorKind::External, message)
    }

    pub fn internal(layer: &'static str, message: impl Into<String>) -> Self {
        Self::new(layer, ErrorKind::Internal, message)
    }

    pub fn not_implemented(layer: &'static str, message: impl Into<String>) -> Self {
        Self::new(layer, ErrorKind::NotImplemented, message)
    }

    /// Re-tags this error as raised by `layer`, keeping the original `kind` and id,
    /// chaining the prior error as the source.
    pub fn wrap(self, layer: &'static str, message: impl Into<String>) -> Self {
        Self {
            id: self.id,
            layer,
            kind: self.kind,
            message: message.into(),
            source: Some(Box::new(self)),
        }
    }
}

/// Wire shape of an error body. Never includes the source chain or any secret.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub id: String,
    pub code: &'static str,
    pub message: String,
}

impl ErrorKind {
    fn code(self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation",
            ErrorKind::Unauthorized => "unauthorized",
            ErrorKind::Forbidden => "forbidden",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Conflict => "conflict",
            ErrorKind::DatabaseError => "database_error",
            ErrorKind::External => "upstream_unavailable",
            ErrorKind::Internal => "internal",
            ErrorKind::NotImplemented => "not_implemented",
        }
    }
}

impl IntoResponse for JanError {
    fn into_response(self) -> Response {
        tracing::error!(
            error.id = %self.id,
            error.layer = self.layer,
            error.kind = ?self.kind,
            "{}",
            self.message
        );
        let body = ErrorBody {
            id: self.id.to_string(),
            code: self.kind.code(),
            message: self.message,
        };
        (self.kind.status(), Json(body)).into_response()
    }
}

pub type JanResult<T> = Result<T, JanError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping_matches_spec_table() {
        assert_eq!(ErrorKind::Validation.status(), StatusCode::BAD_REQUEST);
        assert_eq!(ErrorKind::Unauthorized.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ErrorKind::Forbidden.status(), StatusCode::FORBIDDEN);
        assert_eq!(ErrorKind::NotFound.status(), StatusCode::NOT_FOUND);
        assert_eq!(ErrorKind::Conflict.status(), StatusCode::CONFLICT);
        assert_eq!(
            ErrorKind::DatabaseError.status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(ErrorKind::External.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(
            ErrorKind::Internal.status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ErrorKind::NotImplemented.status(),
            StatusCode::NOT_IMPLEMENTED
        );
    }

    #[test]
    fn wrap_preserves_kind_and_id_while_chaining_source() {
        let root = JanError::external("mcp_bridge", "provider timed out");
        let root_id = root.id;
        let wrapped = root.wrap("orchestrator", "tool call failed");

        assert_eq!(wrapped.id, root_id);
        assert_eq!(wrapped.kind, ErrorKind::External);
        assert_eq!(wrapped.layer, "orchestrator");
        assert!(wrapped.source.is_some());
    }

    #[test]
    fn display_includes_layer_and_message() {
        let err = JanError::not_found("orchestrator", "response resp_abc not found");
        let s = err.to_string();
        assert!(s.contains("orchestrator"));
        assert!(s.contains("resp_abc"));
    }
}
