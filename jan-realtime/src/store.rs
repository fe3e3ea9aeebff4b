//! In-memory session registry (spec §3.3, §4.3.3, §9 "Global mutable
//! state"): a map protected by a read-write lock, dual-indexed by `id` and by
//! `room` (both unique). Process-wide; externalizing it for multi-replica
//! deployments is out of scope (spec §9), but the `Store` contract below is
//! the seam a future externalized implementation would fill.

use std::collections::HashMap;
use std::sync::RwLock;

use jan_core::JanResult;

use crate::model::{Session, SessionState};

#[derive(Default)]
struct Inner {
    by_id: HashMap<String, Session>,
    room_to_id: HashMap<String, String>,
}

/// `Create/Get/GetByRoom/GetByUser/Delete/List/UpdateState` (spec §9).
pub struct SessionStore {
    inner: RwLock<Inner>,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
        }
    }

    pub fn create(&self, session: Session) -> JanResult<()> {
        let mut inner = self.inner.write().map_err(|_| lock_poisoned())?;
        if inner.room_to_id.contains_key(&session.room) {
            return Err(crate::error::internal(format!(
                "room {} already has a session",
                session.room
            )));
        }
        inner.room_to_id.insert(session.room.clone(), session.id.clone());
        inner.by_id.insert(session.id.clone(), session);
        Ok(())
    }

    pub fn get(&self, id: &str) -> JanResult<Option<Session>> {
        let inner = self.inner.read().map_err(|_| lock_poisoned())?;
        Ok(inner.by_id.get(id).cloned())
    }

    pub fn get_by_room(&self, room: &str) -> JanResult<Option<Session>> {
        let inner = self.inner.read().map_err(|_| lock_poisoned())?;
        Ok(inner
            .room_to_id
            .get(room)
            .and_then(|id| inner.by_id.get(id))
            .cloned())
    }

    pub fn get_by_user(&self, user_id: &str) -> JanResult<Vec<Session>> {
        let inner = self.inner.read().map_err(|_| lock_poisoned())?;
        Ok(inner
            .by_id
            .values()
            .filter(|s| s.user_id == user_id)
            .cloned()
            .collect())
    }

    pub fn list(&self) -> JanResult<Vec<Session>> {
        let inner = self.inner.read().map_err(|_| lock_poisoned())?;
        Ok(inner.by_id.values().cloned().collect())
    }

    /// Removes both the session and its room-index entry atomically (spec §4.3.1 "Delete").
    pub fn delete(&self, id: &str) -> JanResult<Option<Session>> {
        let mut inner = self.inner.write().map_err(|_| lock_poisoned())?;
        let Some(session) = inner.by_id.remove(id) else {
            return Ok(None);
        };
        inner.room_to_id.remove(&session.room);
        Ok(Some(session))
    }

    /// Transitions a session's state and clears `client_secret` if still set
    /// (it's returned only once, at creation — spec §4.3.1).
    pub fn update_state(&self, id: &str, state: SessionState) -> JanResult<()> {
        let mut inner = self.inner.write().map_err(|_| lock_poisoned())?;
        if let Some(session) = inner.by_id.get_mut(id) {
            session.state = state;
            session.client_secret = None;
        }
        Ok(())
    }
}

fn lock_poisoned() -> jan_core::JanError {
    crate::error::internal("session store lock poisoned")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn sample(id: &str, room: &str, user_id: &str) -> Session {
        Session {
            id: id.to_string(),
            room: room.to_string(),
            user_id: user_id.to_string(),
            state: SessionState::Created,
            ws_url: "wss://sfu.example.com".to_string(),
            client_secret: Some("secret".to_string()),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn dual_index_lookup_by_id_and_room() {
        let store = SessionStore::new();
        store.create(sample("jan_1", "jan-realtime-1", "u1")).unwrap();

        assert_eq!(store.get("jan_1").unwrap().unwrap().id, "jan_1");
        assert_eq!(store.get_by_room("jan-realtime-1").unwrap().unwrap().id, "jan_1");
    }

    #[test]
    fn delete_removes_both_indices() {
        let store = SessionStore::new();
        store.create(sample("jan_1", "jan-realtime-1", "u1")).unwrap();

        store.delete("jan_1").unwrap();
        assert!(store.get("jan_1").unwrap().is_none());
        assert!(store.get_by_room("jan-realtime-1").unwrap().is_none());
    }

    #[test]
    fn update_state_clears_client_secret() {
        let store = SessionStore::new();
        store.create(sample("jan_1", "jan-realtime-1", "u1")).unwrap();

        store.update_state("jan_1", SessionState::Connected).unwrap();
        let session = store.get("jan_1").unwrap().unwrap();
        assert_eq!(session.state, SessionState::Connected);
        assert!(session.client_secret.is_none());
    }

    #[test]
    fn get_by_user_filters_ownership() {
        let store = SessionStore::new();
        store.create(sample("jan_1", "room-1", "u1")).unwrap();
        store.create(sample("jan_2", "room-2", "u2")).unwrap();

        let mine = store.get_by_user("u1").unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].id, "jan_1");
    }
}
