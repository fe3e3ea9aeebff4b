//! `jan-server`-layer error constructors: request parsing/auth failures that
//! never reach `jan-orchestrator`/`jan-realtime`/`jan-media`.

use jan_core::JanError;

const LAYER: &str = "jan_server";

pub fn validation(message: impl Into<String>) -> JanError {
    JanError::validation(LAYER, message)
}

pub fn unauthorized(message: impl Into<String>) -> JanError {
    JanError::unauthorized(LAYER, message)
}
