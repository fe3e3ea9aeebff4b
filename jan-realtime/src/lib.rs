//! Realtime session reconciler (spec §4.3): an authoritative session registry
//! continuously reconciled against the SFU (LiveKit) control plane.
//!
//! ## Main modules
//!
//! - [`model`]: [`model::Session`], [`model::SessionState`] — the persisted shape (spec §3.3).
//! - [`store`]: [`store::SessionStore`] — in-memory, dual-indexed by id and room.
//! - [`token`]: [`token::LiveKitTokenMinter`] — local JWT minting (spec §4.3.1).
//! - [`sfu_client`]: [`sfu_client::SfuClient`] trait + HTTP client to the control plane.
//! - [`reconciler`]: [`reconciler::Reconciler`] — the background tick loop (spec §4.3.2).
//! - [`service`]: [`service::RealtimeService`] — create/get/list/delete (spec §4.3.1).

pub mod error;
pub mod model;
pub mod reconciler;
pub mod service;
pub mod sfu_client;
pub mod store;
pub mod token;

pub use model::{Session, SessionState};
pub use reconciler::Reconciler;
pub use service::RealtimeService;
pub use sfu_client::{HttpSfuClient, RoomInfo, SfuClient};
pub use store::SessionStore;
pub use token::LiveKitTokenMinter;
