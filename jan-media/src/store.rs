//! SQLite-backed Media Object store (spec §3.4), keyed by id and, uniquely,
//! by `sha256` — the lookup that makes ingest idempotent on content.

use std::path::Path;
use std::sync::Arc;

use jan_core::{JanError, JanResult};
use rusqlite::{params, Connection};
use tokio::sync::Mutex;

use crate::model::MediaObject;

const LAYER: &str = "media_store";

fn db_err(e: impl std::fmt::Display) -> JanError {
    JanError::database(LAYER, e.to_string())
}

pub struct SqliteMediaStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteMediaStore {
    pub fn open(path: impl AsRef<Path>) -> JanResult<Self> {
        let conn = Connection::open(path).map_err(db_err)?;
        Self::migrate(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn open_in_memory() -> JanResult<Self> {
        let conn = Connection::open_in_memory().map_err(db_err)?;
        Self::migrate(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn migrate(conn: &Connection) -> JanResult<()> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS media_objects (
                id TEXT PRIMARY KEY,
                sha256 TEXT NOT NULL UNIQUE,
                payload TEXT NOT NULL
            );
            "#,
        )
        .map_err(db_err)
    }

    /// Looks up an existing object by content hash (spec §4.4.1 step 3 "on hit").
    pub async fn find_by_sha256(&self, sha256: &str) -> JanResult<Option<MediaObject>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn
            .prepare("SELECT payload FROM media_objects WHERE sha256 = ?1")
            .map_err(db_err)?;
        let mut rows = stmt.query(params![sha256]).map_err(db_err)?;
        match rows.next().map_err(db_err)? {
            Some(row) => {
                let payload: String = row.get(0).map_err(db_err)?;
                Ok(Some(serde_json::from_str(&payload).map_err(db_err)?))
            }
            None => Ok(None),
        }
    }

    /// Inserts a freshly minted object (spec §4.4.1 step 3 "on miss"). The
    /// `sha256 UNIQUE` constraint is the last line of defense against a race
    /// between a concurrent `find_by_sha256` miss and this insert; callers
    /// should treat a constraint violation the same as a cache hit and re-read.
    pub async fn insert(&self, object: &MediaObject) -> JanResult<()> {
        let conn = self.conn.lock().await;
        let payload = serde_json::to_string(object).map_err(db_err)?;
        conn.execute(
            "INSERT INTO media_objects (id, sha256, payload) VALUES (?1, ?2, ?3)",
            params![object.id, object.sha256, payload],
        )
        .map_err(db_err)?;
        Ok(())
    }

    pub async fn get(&self, id: &str) -> JanResult<Option<MediaObject>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn
            .prepare("SELECT payload FROM media_objects WHERE id = ?1")
            .map_err(db_err)?;
        let mut rows = stmt.query(params![id]).map_err(db_err)?;
        match rows.next().map_err(db_err)? {
            Some(row) => {
                let payload: String = row.get(0).map_err(db_err)?;
                Ok(Some(serde_json::from_str(&payload).map_err(db_err)?))
            }
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn sample(id: &str, sha: &str) -> MediaObject {
        MediaObject {
            id: id.to_string(),
            storage_provider: "s3".to_string(),
            storage_key: format!("content/{sha}"),
            mime_type: "image/png".to_string(),
            bytes: 1024,
            sha256: sha.to_string(),
            created_by: Some("u1".to_string()),
            retention_until: None,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn insert_then_find_by_sha256_round_trips() {
        let store = SqliteMediaStore::open_in_memory().unwrap();
        store.insert(&sample("jan_a", "abc")).await.unwrap();

        let found = store.find_by_sha256("abc").await.unwrap().unwrap();
        assert_eq!(found.id, "jan_a");
        assert!(store.find_by_sha256("zzz").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn duplicate_sha256_insert_is_rejected() {
        let store = SqliteMediaStore::open_in_memory().unwrap();
        store.insert(&sample("jan_a", "abc")).await.unwrap();
        let err = store.insert(&sample("jan_b", "abc")).await.unwrap_err();
        assert_eq!(err.kind, jan_core::ErrorKind::DatabaseError);
    }
}
