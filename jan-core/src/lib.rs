//! Shared error taxonomy, id generation, and time helpers for jan-server.
//!
//! Every other jan-server crate depends on this one; it must stay free of
//! dependencies on any of its siblings.

mod error;
mod ids;
mod time;

pub use error::{ErrorBody, ErrorKind, JanError, JanResult};
pub use ids::{has_prefix, new_jan_id, new_response_id};
pub use time::{age, now};
