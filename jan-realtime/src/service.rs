//! Public realtime session operations (spec §4.3.1): create, get, list,
//! delete, all ownership-scoped to the calling user.

use std::sync::Arc;
use std::time::Duration;

use crate::model::{Session, SessionState};
use crate::store::SessionStore;
use crate::token::LiveKitTokenMinter;

pub struct RealtimeService {
    store: Arc<SessionStore>,
    token_minter: Arc<LiveKitTokenMinter>,
    ws_url: String,
    token_ttl: Duration,
}

impl RealtimeService {
    pub fn new(
        store: Arc<SessionStore>,
        token_minter: Arc<LiveKitTokenMinter>,
        ws_url: impl Into<String>,
        token_ttl: Duration,
    ) -> Self {
        Self {
            store,
            token_minter,
            ws_url: ws_url.into(),
            token_ttl,
        }
    }

    /// spec §4.3.1 "Create": mint a room name, a one-time client secret, and
    /// store the session as `created`.
    pub fn create(&self, user_id: &str) -> jan_core::JanResult<Session> {
        let room = format!("jan-realtime-{}", ulid::Ulid::new().to_string().to_lowercase());
        let client_secret = self.token_minter.mint(&room, user_id, self.token_ttl)?;

        let session = Session {
            id: jan_core::new_jan_id(),
            room,
            user_id: user_id.to_string(),
            state: SessionState::Created,
            ws_url: self.ws_url.clone(),
            client_secret: Some(client_secret),
            created_at: jan_core::now(),
        };
        self.store.create(session.clone())?;
        Ok(session)
    }

    /// spec §4.3.1 "Get": ownership-scoped; never returns `client_secret`
    /// again even though the stored row retains it only transiently (the
    /// store itself clears it on the first state transition, but `get` also
    /// redacts it defensively so a read between create and the first
    /// reconciliation tick cannot leak it twice).
    pub fn get(&self, id: &str, user_id: &str) -> jan_core::JanResult<Session> {
        let mut session = self.load_owned(id, user_id)?;
        session.client_secret = None;
        Ok(session)
    }

    pub fn list(&self, user_id: &str) -> jan_core::JanResult<Vec<Session>> {
        let mut sessions = self.store.get_by_user(user_id)?;
        for session in &mut sessions {
            session.client_secret = None;
        }
        Ok(sessions)
    }

    /// spec §4.3.1 "Delete": removes both indices atomically under the
    /// store's write lock.
    pub fn delete(&self, id: &str, user_id: &str) -> jan_core::JanResult<()> {
        self.load_owned(id, user_id)?;
        self.store.delete(id)?;
        Ok(())
    }

    fn load_owned(&self, id: &str, user_id: &str) -> jan_core::JanResult<Session> {
        let session = self
            .store
            .get(id)?
            .ok_or_else(|| crate::error::not_found(format!("session {id} not found")))?;
        if session.user_id != user_id {
            return Err(crate::error::forbidden(format!(
                "session {id} does not belong to caller"
            )));
        }
        Ok(session)
    }
}
