//! `/v1/responses` (spec §4.1.1, §6.1, §6.2): create (sync/streaming/background),
//! get, cancel, delete, list-input-items.
//!
//! `CreateResponseRequest` is parsed twice from the same JSON body: once as a
//! typed struct (via [`parse_create_request`], for the `stream`/`background`
//! conflict check and chat-message-array validation) and once as a raw
//! [`serde_json::Value`] (so `input` is echoed back to the orchestrator, and
//! from there to `GET .../input_items`, exactly as the caller sent it,
//! matching spec §3.1's "input (opaque JSON echoed back)").

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::IntoResponse;
use axum::Json;
use futures::{Stream, StreamExt};
use jan_agent::{parse_create_request, ChunkMeta, CreateResponseRequest, StreamToSse};
use jan_core::JanResult;
use jan_orchestrator::{CreateRequest, ExecutionOutcome, Response, ResponseError, ResponseStatus};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use stream_event::ResponseEvent;
use tokio_stream::wrappers::ReceiverStream;

use crate::app::AppState;
use crate::auth::AuthUser;

/// Wire shape of a `Response` (spec §3.1): everything but `messages` (the tool
/// loop's working state) and `authorization` (the caller's bearer token),
/// neither of which §3.1 lists among the client-visible fields.
#[derive(Debug, Serialize)]
pub struct ResponseView {
    pub public_id: String,
    pub user_id: String,
    pub model: String,
    pub provider_id: String,
    pub system_prompt: Option<String>,
    pub input: Value,
    pub output: Option<String>,
    pub status: ResponseStatus,
    pub stream: bool,
    pub background: bool,
    pub store: bool,
    pub conversation_id: Option<String>,
    pub previous_response_id: Option<String>,
    pub metadata: Value,
    pub usage: Option<jan_agent::LlmUsage>,
    pub error: Option<ResponseError>,
    pub queued_at: Option<chrono::DateTime<chrono::Utc>>,
    pub started_at: Option<chrono::DateTime<chrono::Utc>>,
    pub completed_at: Option<chrono::DateTime<chrono::Utc>>,
    pub cancelled_at: Option<chrono::DateTime<chrono::Utc>>,
    pub failed_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl From<Response> for ResponseView {
    fn from(r: Response) -> Self {
        Self {
            public_id: r.public_id,
            user_id: r.user_id,
            model: r.model,
            provider_id: r.provider_id,
            system_prompt: r.system_prompt,
            input: r.input,
            output: r.output,
            status: r.status,
            stream: r.stream,
            background: r.background,
            store: r.store,
            conversation_id: r.conversation_id,
            previous_response_id: r.previous_response_id,
            metadata: r.metadata,
            usage: r.usage,
            error: r.error,
            queued_at: r.queued_at,
            started_at: r.started_at,
            completed_at: r.completed_at,
            cancelled_at: r.cancelled_at,
            failed_at: r.failed_at,
        }
    }
}

/// Fixed until a catalog-selectable provider is exposed on the wire: spec's
/// `POST /v1/responses` body names only `model`, and every configured
/// collaborator base URL is reached through the single `jan` provider (spec
/// §4.1.3 step 1 resolves `(provider_id, model)` against the catalog; this
/// system has exactly one provider).
const DEFAULT_PROVIDER_ID: &str = "jan";

pub async fn create_response(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(body): Json<Value>,
) -> JanResult<axum::response::Response> {
    let typed: CreateResponseRequest = serde_json::from_value(body.clone())
        .map_err(|e| crate::error::validation(format!("invalid request body: {e}")))?;
    parse_create_request(&typed).map_err(|e| crate::error::validation(e.to_string()))?;

    let input = body.get("input").cloned().unwrap_or(Value::Null);
    let metadata = Value::Object(typed.metadata.clone());

    let create_request = CreateRequest {
        user_id: user.user_id,
        authorization: user.bearer,
        model: typed.model.clone(),
        provider_id: DEFAULT_PROVIDER_ID.to_string(),
        input,
        system_prompt: typed.system_prompt,
        stream: typed.stream,
        background: typed.background,
        store: typed.store,
        metadata,
        conversation_id: typed.conversation,
        previous_response_id: typed.previous_response_id,
    };

    let service = state.response_service(&typed.model);
    let outcome = service.create(create_request).await?;

    match outcome {
        ExecutionOutcome::Snapshot(response) => {
            Ok(Json(ResponseView::from(response)).into_response())
        }
        ExecutionOutcome::Streaming { initial, chunks } => {
            Ok(stream_response(initial, chunks).into_response())
        }
    }
}

/// Adapts the orchestrator's raw `MessageChunk` channel into OpenAI-compatible
/// SSE (spec §4.1.2 "Streaming"). The channel carries no terminal-status
/// signal of its own — its close is the only event this handler observes —
/// so every stream finishes with `finish_reason: "stop"`; the authoritative
/// terminal status (including failures and cancellation) lands in the stored
/// `Response` row for clients that follow up with `GET /v1/responses/{id}`.
fn stream_response(
    initial: Response,
    mut chunks: tokio::sync::mpsc::Receiver<jan_agent::MessageChunk>,
) -> Sse<impl Stream<Item = Result<Event, std::convert::Infallible>>> {
    let meta = ChunkMeta {
        id: initial.public_id,
        model: initial.model,
        created: None,
    };
    let include_usage = false;

    let (line_tx, line_rx) = tokio::sync::mpsc::channel::<String>(32);
    tokio::spawn(async move {
        // `new_with_sink` forwards every pushed line to `line_tx` as `feed`/`finish`
        // produce it, so the lines accumulated in `adapter` itself are discarded here.
        let mut adapter = StreamToSse::new_with_sink(meta, include_usage, line_tx.clone());
        while let Some(chunk) = chunks.recv().await {
            adapter.feed(&ResponseEvent::MessageChunk {
                content: chunk.content,
            });
        }
        adapter.finish("stop");
        let _ = line_tx.send("data: [DONE]\n\n".to_string()).await;
    });

    let events = ReceiverStream::new(line_rx).map(|line| {
        let data = line
            .strip_prefix("data: ")
            .unwrap_or(&line)
            .trim_end_matches("\n\n")
            .to_string();
        Ok(Event::default().data(data))
    });

    Sse::new(events).keep_alive(KeepAlive::default())
}

pub async fn get_response(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(id): Path<String>,
) -> JanResult<Json<ResponseView>> {
    let response = state.default_response_service.get(&id, &user.user_id).await?;
    Ok(Json(ResponseView::from(response)))
}

pub async fn cancel_response(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(id): Path<String>,
) -> JanResult<Json<ResponseView>> {
    let response = state.default_response_service.cancel(&id, &user.user_id).await?;
    Ok(Json(ResponseView::from(response)))
}

pub async fn delete_response(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(id): Path<String>,
) -> JanResult<axum::http::StatusCode> {
    state.default_response_service.delete(&id, &user.user_id).await?;
    Ok(axum::http::StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct InputItemsQuery {
    #[serde(default)]
    pub cursor: usize,
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    20
}

pub async fn list_input_items(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(id): Path<String>,
    Query(query): Query<InputItemsQuery>,
) -> JanResult<Json<Vec<Value>>> {
    let items = state
        .default_response_service
        .list_input_items(&id, &user.user_id, query.cursor, query.limit)
        .await?;
    Ok(Json(items))
}
