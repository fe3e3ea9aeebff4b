//! Ingest (spec §4.4.1, §6.6): read a data URL or fetch a remote URL, hash it,
//! dedup against the store, and upload on a miss.

use std::sync::Arc;

use sha2::{Digest, Sha256};

use crate::model::MediaObject;
use crate::object_store::ObjectStore;
use crate::store::SqliteMediaStore;

/// Inbound `source` of `POST /v1/media` (spec §6.6).
pub enum Source {
    DataUrl(String),
    RemoteUrl(String),
}

pub struct IngestRequest {
    pub source: Source,
    pub user_id: Option<String>,
}

/// Outbound shape of `POST /v1/media` (spec §6.6).
pub struct IngestResult {
    pub id: String,
    pub mime: String,
    pub bytes: u64,
    pub deduped: bool,
    pub presigned_url: Option<String>,
}

pub struct IngestService {
    store: Arc<SqliteMediaStore>,
    object_store: Arc<dyn ObjectStore>,
    http: reqwest::Client,
    max_bytes: u64,
}

impl IngestService {
    pub fn new(
        store: Arc<SqliteMediaStore>,
        object_store: Arc<dyn ObjectStore>,
        http: reqwest::Client,
        max_bytes: u64,
    ) -> Self {
        Self {
            store,
            object_store,
            http,
            max_bytes,
        }
    }

    /// Resolves `source` into raw bytes + mime type, rejecting anything over
    /// `MaxMediaBytes` (spec §4.4.1 step 1).
    async fn read_payload(&self, source: &Source) -> jan_core::JanResult<(Vec<u8>, String)> {
        match source {
            Source::DataUrl(data_url) => decode_data_url(data_url, self.max_bytes),
            Source::RemoteUrl(url) => {
                let response = self
                    .http
                    .get(url)
                    .send()
                    .await
                    .map_err(|e| crate::error::external(format!("remote fetch failed: {e}")))?;
                if !response.status().is_success() {
                    return Err(crate::error::external(format!(
                        "remote fetch returned {}",
                        response.status()
                    )));
                }
                let mime = response
                    .headers()
                    .get(reqwest::header::CONTENT_TYPE)
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let bytes = response
                    .bytes()
                    .await
                    .map_err(|e| crate::error::external(format!("remote body read failed: {e}")))?;
                if bytes.len() as u64 > self.max_bytes {
                    return Err(crate::error::validation(format!(
                        "remote payload of {} bytes exceeds MaxMediaBytes",
                        bytes.len()
                    )));
                }
                Ok((bytes.to_vec(), mime))
            }
        }
    }

    /// spec §4.4.1: read, hash, dedup-lookup, upload-on-miss, return.
    pub async fn ingest(&self, req: IngestRequest) -> jan_core::JanResult<IngestResult> {
        let (bytes, mime) = self.read_payload(&req.source).await?;
        let sha256 = hex::encode(Sha256::digest(&bytes));

        if let Some(existing) = self.store.find_by_sha256(&sha256).await? {
            let presigned_url = self.presign(&existing.storage_key).await;
            return Ok(IngestResult {
                id: existing.id,
                mime: existing.mime_type,
                bytes: existing.bytes,
                deduped: true,
                presigned_url,
            });
        }

        let id = jan_core::new_jan_id();
        let storage_key = format!("content/{sha256}");
        self.object_store.put(&storage_key, &bytes, &mime).await?;

        let object = MediaObject {
            id: id.clone(),
            storage_provider: "default".to_string(),
            storage_key,
            mime_type: mime.clone(),
            bytes: bytes.len() as u64,
            sha256,
            created_by: req.user_id,
            retention_until: None,
            created_at: jan_core::now(),
        };
        // A concurrent ingest of identical bytes could race us here; treat a
        // unique-constraint failure on sha256 as a late dedup hit instead of an error.
        match self.store.insert(&object).await {
            Ok(()) => {
                let presigned_url = self.presign(&object.storage_key).await;
                Ok(IngestResult {
                    id: object.id,
                    mime: object.mime_type,
                    bytes: object.bytes,
                    deduped: false,
                    presigned_url,
                })
            }
            Err(_) => {
                let winner = self
                    .store
                    .find_by_sha256(&object.sha256)
                    .await?
                    .ok_or_else(|| crate::error::database("insert failed and no winner found"))?;
                let presigned_url = self.presign(&winner.storage_key).await;
                Ok(IngestResult {
                    id: winner.id,
                    mime: winner.mime_type,
                    bytes: winner.bytes,
                    deduped: true,
                    presigned_url,
                })
            }
        }
    }

    /// Best-effort presign; a failure here shouldn't fail the ingest itself.
    async fn presign(&self, storage_key: &str) -> Option<String> {
        match self.object_store.presign_get(storage_key).await {
            Ok(url) => Some(url),
            Err(e) => {
                tracing::warn!(error = %e, storage_key, "presign failed");
                None
            }
        }
    }
}

/// Decodes `data:<mime>;base64,<payload>` (standard RFC 2397 shape, distinct
/// from the `;jan_<id>` placeholder syntax in [`crate::resolver`]).
fn decode_data_url(data_url: &str, max_bytes: u64) -> jan_core::JanResult<(Vec<u8>, String)> {
    let rest = data_url
        .strip_prefix("data:")
        .ok_or_else(|| crate::error::validation("source.data_url must start with 'data:'"))?;
    let (meta, payload) = rest
        .split_once(',')
        .ok_or_else(|| crate::error::validation("source.data_url missing ',' separator"))?;
    let mime = meta.split(';').next().unwrap_or("application/octet-stream").to_string();
    let mime = if mime.is_empty() {
        "application/octet-stream".to_string()
    } else {
        mime
    };

    use base64::Engine;
    let bytes = if meta.contains(";base64") {
        base64::engine::general_purpose::STANDARD
            .decode(payload)
            .map_err(|e| crate::error::validation(format!("invalid base64 payload: {e}")))?
    } else {
        urlencoding_decode(payload).into_bytes()
    };

    if bytes.len() as u64 > max_bytes {
        return Err(crate::error::validation(format!(
            "payload of {} bytes exceeds MaxMediaBytes",
            bytes.len()
        )));
    }
    Ok((bytes, mime))
}

/// Minimal percent-decoding for the non-base64 data URL form; this crate has
/// no other use for a general URL-decoding dependency.
fn urlencoding_decode(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c == '%' {
            let hex: String = chars.by_ref().take(2).collect();
            if let Ok(byte) = u8::from_str_radix(&hex, 16) {
                out.push(byte as char);
                continue;
            }
        }
        out.push(c);
    }
    out
}
