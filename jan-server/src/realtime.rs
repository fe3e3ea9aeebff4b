//! `/v1/realtime/sessions` (spec §4.3.1, §6.7): create/get/list/delete,
//! ownership-scoped to the bearer token's `sub`.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use jan_core::JanResult;
use jan_realtime::Session;

use crate::app::AppState;
use crate::auth::AuthUser;

pub async fn create_session(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> JanResult<Json<Session>> {
    let session = state.realtime_service.create(&user.user_id)?;
    Ok(Json(session))
}

pub async fn get_session(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(id): Path<String>,
) -> JanResult<Json<Session>> {
    let session = state.realtime_service.get(&id, &user.user_id)?;
    Ok(Json(session))
}

pub async fn list_sessions(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> JanResult<Json<Vec<Session>>> {
    let sessions = state.realtime_service.list(&user.user_id)?;
    Ok(Json(sessions))
}

pub async fn delete_session(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(id): Path<String>,
) -> JanResult<axum::http::StatusCode> {
    state.realtime_service.delete(&id, &user.user_id)?;
    Ok(axum::http::StatusCode::NO_CONTENT)
}
