//! Reconciliation loop (spec §4.3.2): on each tick, ask the SFU control plane
//! for active rooms and drive stored sessions toward its observed liveness.
//! Single dedicated task; ticks are serialized by construction, so overlapping
//! ticks cannot occur (spec §5 "Ordering guarantees").

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::model::{Session, SessionState};
use crate::sfu_client::SfuClient;
use crate::store::SessionStore;

pub struct Reconciler {
    store: Arc<SessionStore>,
    sfu: Arc<dyn SfuClient>,
    tick_interval: Duration,
    stale_ttl: Duration,
    started: AtomicBool,
    stopped: AtomicBool,
    cancellation: CancellationToken,
}

impl Reconciler {
    pub fn new(
        store: Arc<SessionStore>,
        sfu: Arc<dyn SfuClient>,
        tick_interval: Duration,
        stale_ttl: Duration,
    ) -> Self {
        Self {
            store,
            sfu,
            tick_interval,
            stale_ttl,
            started: AtomicBool::new(false),
            stopped: AtomicBool::new(false),
            cancellation: CancellationToken::new(),
        }
    }

    /// Starts the background task. Idempotent: a second call is a no-op and
    /// returns `None` (spec §4.3.3: "Start/stop use once guards").
    pub fn start(self: &Arc<Self>) -> Option<JoinHandle<()>> {
        if self.started.swap(true, Ordering::SeqCst) {
            return None;
        }
        let reconciler = Arc::clone(self);
        Some(tokio::spawn(async move { reconciler.run().await }))
    }

    /// Signals shutdown. Idempotent against multiple callers (e.g. repeated
    /// SIGTERM delivery) — spec §5 "the shutdown signal uses a one-shot close
    /// coordinated by a single-call guard".
    pub fn stop(&self) {
        if !self.stopped.swap(true, Ordering::SeqCst) {
            self.cancellation.cancel();
        }
    }

    async fn run(&self) {
        loop {
            tokio::select! {
                _ = tokio::time::sleep(self.tick_interval) => {}
                _ = self.cancellation.cancelled() => return,
            }
            self.tick().await;
        }
    }

    /// One reconciliation tick (spec §4.3.2 steps 1-3). Public so callers
    /// needing deterministic timing (tests, a manual `/admin/reconcile-now`)
    /// can drive it directly instead of waiting on the sleep.
    pub async fn tick(&self) {
        let sessions = match self.store.list() {
            Ok(sessions) => sessions,
            Err(e) => {
                tracing::warn!(error = %e, "session store unreadable during reconciliation tick");
                return;
            }
        };

        match self.sfu.list_rooms().await {
            Ok(rooms) => {
                for session in sessions {
                    self.reconcile_with_live_rooms(&session, &rooms);
                }
            }
            Err(e) => {
                // Fallback (spec §4.3.2): only the TTL cleanup branch executes.
                tracing::warn!(error = %e, "SFU control plane unreachable; falling back to TTL cleanup only");
                for session in sessions {
                    self.reconcile_stale_only(&session);
                }
            }
        }
    }

    fn reconcile_with_live_rooms(
        &self,
        session: &Session,
        rooms: &std::collections::HashMap<String, crate::sfu_client::RoomInfo>,
    ) {
        let room = rooms.get(&session.room);
        let live = room.map(|r| r.num_participants > 0).unwrap_or(false);

        if !live {
            match session.state {
                SessionState::Connected => {
                    tracing::info!(session_id = %session.id, "room ended; deleting connected session");
                    let _ = self.store.delete(&session.id);
                }
                SessionState::Created if session.age() > self.stale_ttl => {
                    tracing::info!(session_id = %session.id, "session never connected and went stale; deleting");
                    let _ = self.store.delete(&session.id);
                }
                SessionState::Created => {}
            }
        } else if session.state == SessionState::Created {
            tracing::info!(session_id = %session.id, "room has participants; marking connected");
            let _ = self.store.update_state(&session.id, SessionState::Connected);
        }
    }

    /// spec §4.3.2 "Fallback": never delete a `connected` session on a
    /// control-plane failure — only stale `created` sessions are cleaned up.
    fn reconcile_stale_only(&self, session: &Session) {
        if session.state == SessionState::Created && session.age() > self.stale_ttl {
            tracing::info!(session_id = %session.id, "stale TTL cleanup during SFU outage");
            let _ = self.store.delete(&session.id);
        }
    }
}
