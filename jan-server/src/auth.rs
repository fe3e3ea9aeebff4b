//! Bearer JWT authentication (spec.md §1 "AuthN/Z middleware... out of scope"
//! for its *policy*, but the wire contract — a bearer token whose `sub` names
//! the caller — is load-bearing for every ownership check in
//! `jan-orchestrator`/`jan-realtime`). Validates `iss`/`aud` against
//! `Settings.collaborators` and extracts `sub` as the caller's user id.
//!
//! Mirrors [`jan_realtime::token`]'s encode side: both share the HS256
//! secret configured via `JWT_SECRET`.

use axum::extract::{FromRef, FromRequestParts};
use axum::http::request::Parts;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use std::sync::Arc;

use crate::app::AppState;

#[derive(Debug, Deserialize)]
struct Claims {
    sub: String,
    #[allow(dead_code)]
    exp: u64,
}

/// The authenticated caller: `user_id` for ownership scoping, `bearer` the
/// raw `Authorization` header value forwarded to collaborator HTTP calls
/// (spec §4.1.3 step 4, §4.2.4: every outbound call the tool loop makes
/// carries the original caller's credentials).
pub struct AuthUser {
    pub user_id: String,
    pub bearer: String,
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    Arc<AppState>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = jan_core::JanError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let state = Arc::<AppState>::from_ref(state);

        let header = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .ok_or_else(|| crate::error::unauthorized("missing Authorization header"))?;
        let value = header
            .to_str()
            .map_err(|_| crate::error::unauthorized("Authorization header is not valid UTF-8"))?
            .to_string();
        let token = value
            .strip_prefix("Bearer ")
            .ok_or_else(|| crate::error::unauthorized("Authorization header must be a Bearer token"))?;

        let collaborators = &state.settings.collaborators;
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[collaborators.jwt_issuer.as_str()]);
        validation.set_audience(&[collaborators.jwt_audience.as_str()]);

        let data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(collaborators.jwt_secret.as_bytes()),
            &validation,
        )
        .map_err(|e| crate::error::unauthorized(format!("invalid bearer token: {e}")))?;

        Ok(AuthUser {
            user_id: data.claims.sub,
            bearer: value,
        })
    }
}
