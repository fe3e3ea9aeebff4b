//! `POST /v1/media` (spec §6.6): ingest a data URL or remote URL, dedup by
//! content hash, return the stored object's id and a presigned fetch URL.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use jan_core::JanResult;
use jan_media::{IngestRequest, Source};
use serde::{Deserialize, Serialize};

use crate::app::AppState;
use crate::auth::AuthUser;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct IngestMediaRequest {
    /// Exactly one of the two must be set; a `data:` URL or a fetchable remote URL.
    pub data_url: Option<String>,
    pub remote_url: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct IngestMediaResponse {
    pub id: String,
    pub mime: String,
    pub bytes: u64,
    pub deduped: bool,
    pub presigned_url: Option<String>,
}

pub async fn ingest_media(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(body): Json<IngestMediaRequest>,
) -> JanResult<Json<IngestMediaResponse>> {
    let source = match (body.data_url, body.remote_url) {
        (Some(data_url), None) => Source::DataUrl(data_url),
        (None, Some(remote_url)) => Source::RemoteUrl(remote_url),
        (Some(_), Some(_)) => {
            return Err(crate::error::validation(
                "exactly one of data_url or remote_url must be set",
            ))
        }
        (None, None) => {
            return Err(crate::error::validation(
                "one of data_url or remote_url is required",
            ))
        }
    };

    let result = state
        .ingest_service
        .ingest(IngestRequest {
            source,
            user_id: Some(user.user_id),
        })
        .await?;

    Ok(Json(IngestMediaResponse {
        id: result.id,
        mime: result.mime,
        bytes: result.bytes,
        deduped: result.deduped,
        presigned_url: result.presigned_url,
    }))
}
