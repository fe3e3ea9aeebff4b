//! Media Object data model (spec §3.4).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A content-addressed object. `sha256` is the dedup key: two ingests of
/// identical bytes must resolve to the same `id` and `storage_key`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaObject {
    pub id: String,
    pub storage_provider: String,
    pub storage_key: String,
    pub mime_type: String,
    pub bytes: u64,
    pub sha256: String,
    pub created_by: Option<String>,
    pub retention_until: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}
