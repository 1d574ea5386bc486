//! Session registry and dispatch
//!
//! The hub is a single-writer state machine: one spawned loop drains three
//! command channels (register, unregister, broadcast) and is the only place
//! the session set is mutated. Roster and lookup helpers read the set under
//! a shared lock so requests never serialize through the loop.

use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};

use tokio::sync::{mpsc, RwLock};
use tracing::{debug, info, warn};

use crate::connection::Session;
use crate::protocol::UserSummary;

/// Capacity of the register/unregister command channels
const COMMAND_BUFFER: usize = 16;

/// Capacity of the broadcast intake. Kept at one frame so submissions
/// serialize through the loop and global ordering is total.
const BROADCAST_BUFFER: usize = 1;

struct HubReceivers {
    register_rx: mpsc::Receiver<Arc<Session>>,
    unregister_rx: mpsc::Receiver<Arc<Session>>,
    broadcast_rx: mpsc::Receiver<String>,
}

/// Process-wide registry of authenticated sessions
pub struct Hub {
    sessions: RwLock<HashMap<String, Arc<Session>>>,
    register_tx: mpsc::Sender<Arc<Session>>,
    unregister_tx: mpsc::Sender<Arc<Session>>,
    broadcast_tx: mpsc::Sender<String>,
    receivers: StdMutex<Option<HubReceivers>>,
}

impl Hub {
    /// Create a new hub. Call [`Hub::start`] to spawn its loop.
    #[must_use]
    pub fn new() -> Arc<Self> {
        let (register_tx, register_rx) = mpsc::channel(COMMAND_BUFFER);
        let (unregister_tx, unregister_rx) = mpsc::channel(COMMAND_BUFFER);
        let (broadcast_tx, broadcast_rx) = mpsc::channel(BROADCAST_BUFFER);

        Arc::new(Self {
            sessions: RwLock::new(HashMap::new()),
            register_tx,
            unregister_tx,
            broadcast_tx,
            receivers: StdMutex::new(Some(HubReceivers {
                register_rx,
                unregister_rx,
                broadcast_rx,
            })),
        })
    }

    /// Spawn the hub loop. Subsequent calls are no-ops.
    pub fn start(self: &Arc<Self>) {
        let receivers = {
            let mut guard = self.receivers.lock().unwrap_or_else(|e| e.into_inner());
            guard.take()
        };
        let Some(receivers) = receivers else {
            warn!("Hub is already running");
            return;
        };
        let hub = Arc::clone(self);
        tokio::spawn(hub.run(receivers));
    }

    /// Add a session to the authenticated set
    pub async fn register(&self, session: Arc<Session>) {
        if self.register_tx.send(session).await.is_err() {
            warn!("Hub register channel closed");
        }
    }

    /// Remove a session from the set and close its outbound queue.
    /// Idempotent; unknown sessions are ignored.
    pub async fn unregister(&self, session: Arc<Session>) {
        if self.unregister_tx.send(session).await.is_err() {
            warn!("Hub unregister channel closed");
        }
    }

    /// Submit an already-serialized frame for delivery to every session.
    ///
    /// Blocks until the loop accepts the frame; acceptance order is
    /// delivery order for every receiver.
    pub async fn broadcast(&self, frame: String) {
        if self.broadcast_tx.send(frame).await.is_err() {
            warn!("Hub broadcast channel closed");
        }
    }

    /// Roster of authenticated users, excluding `exclude_user_id`
    pub async fn online_users(&self, exclude_user_id: &str) -> Vec<UserSummary> {
        let sessions = self.sessions.read().await;
        let mut users: Vec<UserSummary> = sessions
            .values()
            .filter(|s| s.user_id() != exclude_user_id)
            .map(|s| UserSummary {
                user_id: s.user_id().to_string(),
                display_name: s.display_name().to_string(),
                is_online: true,
            })
            .collect();
        users.sort_by(|a, b| a.display_name.cmp(&b.display_name));
        users
    }

    /// Find a session by the identifier of its authenticated user
    pub async fn find_by_user_id(&self, user_id: &str) -> Option<Arc<Session>> {
        let sessions = self.sessions.read().await;
        sessions.values().find(|s| s.user_id() == user_id).cloned()
    }

    /// Number of authenticated sessions
    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    async fn run(self: Arc<Self>, mut receivers: HubReceivers) {
        info!("Hub loop started");
        loop {
            tokio::select! {
                Some(session) = receivers.register_rx.recv() => {
                    self.handle_register(session).await;
                }
                Some(session) = receivers.unregister_rx.recv() => {
                    self.handle_unregister(session).await;
                }
                Some(frame) = receivers.broadcast_rx.recv() => {
                    Self::handle_broadcast(&self, frame).await;
                }
                else => break,
            }
        }
        info!("Hub loop stopped");
    }

    async fn handle_register(&self, session: Arc<Session>) {
        let mut sessions = self.sessions.write().await;
        sessions.insert(session.session_id().to_string(), Arc::clone(&session));
        info!(
            session_id = %session.session_id(),
            user_id = %session.user_id(),
            display_name = %session.display_name(),
            total = sessions.len(),
            "Session registered"
        );
    }

    async fn handle_unregister(&self, session: Arc<Session>) {
        let mut sessions = self.sessions.write().await;
        if sessions.remove(session.session_id()).is_some() {
            session.close_outbound();
            info!(
                session_id = %session.session_id(),
                user_id = %session.user_id(),
                total = sessions.len(),
                "Session unregistered"
            );
        }
    }

    async fn handle_broadcast(hub: &Arc<Self>, frame: String) {
        let sessions = hub.sessions.read().await;
        debug!(receivers = sessions.len(), "Broadcasting frame");

        for session in sessions.values() {
            if let Err(e) = session.try_enqueue(frame.clone()) {
                // Never block the loop on one session: skip it now and let a
                // separate task run the unregister so the loop cannot
                // deadlock on its own command channel.
                warn!(
                    session_id = %session.session_id(),
                    user_id = %session.user_id(),
                    error = %e,
                    "Evicting slow consumer from broadcast"
                );
                let hub = Arc::clone(hub);
                let victim = Arc::clone(session);
                tokio::spawn(async move {
                    hub.unregister(victim).await;
                });
            }
        }
    }
}

impl std::fmt::Debug for Hub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Hub").finish_non_exhaustive()
    }
}
