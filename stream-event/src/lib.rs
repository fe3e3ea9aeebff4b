//! Internal orchestrator event protocol: type + payload + envelope.
//!
//! This crate defines the wire shape of a single tool-loop event and envelope
//! injection; it has no dependency on jan-agent or jan-orchestrator. jan-agent's
//! `openai_sse` module consumes `ResponseEvent` to emit OpenAI-compatible SSE
//! frames, and jan-orchestrator reuses the same events to build webhook payloads.

pub mod envelope;
pub mod event;

pub use envelope::{to_json, Envelope, EnvelopeState};
pub use event::ResponseEvent;
