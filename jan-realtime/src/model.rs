//! Realtime Session data model (spec §3.3).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Closed lifecycle enumeration (spec §9 "Tagged variants"). `Deleted` is not
/// a stored state — the row is removed from the store instead (spec §3.3:
/// "created → connected → deleted").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Created,
    Connected,
}

/// One realtime (LiveKit-backed) session (spec §3.3). `client_secret` is
/// populated only at creation time and held by the store just long enough
/// for the create response to read it; every other path clears it so it is
/// never served again (spec §4.3.1: "returned once").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub room: String,
    pub user_id: String,
    pub state: SessionState,
    pub ws_url: String,
    pub client_secret: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Session {
    /// Age since creation, used by the reconciler's stale-TTL branch (spec §4.3.2).
    pub fn age(&self) -> chrono::Duration {
        jan_core::age(self.created_at)
    }
}
