//! Session registry: client identity → outbound command channel.
//!
//! The map is the only state shared between session tasks. Sends take the
//! read lock just long enough to clone the handle, so sends to different
//! sessions never wait on each other; register/unregister take the write
//! lock and are serialized.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use thiserror::Error;
use tokio::sync::{RwLock, mpsc};
use tracing::{debug, info, warn};
use uuid::Uuid;
use vigil_core::ServerCommand;

/// Failure to hand a command to a session's writer.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum TransportError {
    /// The session's writer has gone away.
    #[error("session channel closed")]
    Closed,
    /// The session's outbound queue is full.
    #[error("session channel full")]
    Full,
}

/// Result of a registry send that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Queued for the client.
    Sent,
    /// No session for that client; nothing was sent.
    NoSession,
}

/// Point-in-time summary of the live sessions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    /// Registered sessions.
    pub active: usize,
    /// Commands dropped across live sessions because a queue was full or closed.
    pub dropped_commands: u64,
    /// Age of the longest-lived session.
    pub oldest: Option<Duration>,
}

/// Send handle of one live session.
pub struct SessionHandle {
    /// Client identity.
    pub client_id: String,
    /// Unique per connection; distinguishes a reconnect from the session it
    /// superseded.
    pub connection_id: Uuid,
    tx: mpsc::Sender<ServerCommand>,
    connected_at: Instant,
    dropped: AtomicU64,
}

impl SessionHandle {
    /// Create a handle around the session's outbound channel.
    pub fn new(client_id: impl Into<String>, tx: mpsc::Sender<ServerCommand>) -> Self {
        Self {
            client_id: client_id.into(),
            connection_id: Uuid::now_v7(),
            tx,
            connected_at: Instant::now(),
            dropped: AtomicU64::new(0),
        }
    }

    /// Queue a command without waiting.
    pub fn send(&self, command: ServerCommand) -> Result<(), TransportError> {
        self.tx.try_send(command).map_err(|e| {
            let _ = self.dropped.fetch_add(1, Ordering::Relaxed);
            match e {
                mpsc::error::TrySendError::Full(_) => TransportError::Full,
                mpsc::error::TrySendError::Closed(_) => TransportError::Closed,
            }
        })
    }

    /// Commands that could not be queued.
    pub fn drop_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Time since the session registered.
    pub fn age(&self) -> Duration {
        self.connected_at.elapsed()
    }
}

/// Concurrent map of live sessions.
#[derive(Default)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<String, Arc<SessionHandle>>>,
}

impl SessionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a handle, superseding any existing one for the same client.
    ///
    /// Returns the superseded handle, if any.
    pub async fn register(&self, handle: Arc<SessionHandle>) -> Option<Arc<SessionHandle>> {
        let client_id = handle.client_id.clone();
        let previous = self.sessions.write().await.insert(client_id.clone(), handle);
        if previous.is_some() {
            info!(client_id, "session superseded by new connection");
        } else {
            info!(client_id, "session registered");
        }
        previous
    }

    /// Remove the handle for `client_id`. No-op if absent.
    pub async fn unregister(&self, client_id: &str) -> bool {
        let removed = self.sessions.write().await.remove(client_id).is_some();
        if removed {
            info!(client_id, "session unregistered");
        }
        removed
    }

    /// Remove `handle` only if it is still the registered connection for its
    /// client. A session that was superseded must not evict its successor.
    pub async fn unregister_connection(&self, handle: &SessionHandle) -> bool {
        let mut sessions = self.sessions.write().await;
        let current = sessions
            .get(&handle.client_id)
            .is_some_and(|h| h.connection_id == handle.connection_id);
        if current {
            let _ = sessions.remove(&handle.client_id);
            info!(client_id = %handle.client_id, "session unregistered");
        } else {
            debug!(client_id = %handle.client_id, "superseded session ended");
        }
        current
    }

    /// Send a command to a client's session.
    ///
    /// A missing session is not an error: the command is dropped and
    /// [`Delivery::NoSession`] returned.
    pub async fn send(
        &self,
        client_id: &str,
        command: ServerCommand,
    ) -> Result<Delivery, TransportError> {
        let Some(handle) = self.get(client_id).await else {
            warn!(client_id, kind = ?command.kind, "no active session, command dropped");
            return Ok(Delivery::NoSession);
        };
        handle.send(command).map(|()| Delivery::Sent)
    }

    /// Current handle for a client.
    pub async fn get(&self, client_id: &str) -> Option<Arc<SessionHandle>> {
        self.sessions.read().await.get(client_id).cloned()
    }

    /// Whether a client has a live session.
    pub async fn contains(&self, client_id: &str) -> bool {
        self.sessions.read().await.contains_key(client_id)
    }

    /// Number of live sessions.
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Whether no session is registered.
    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    /// Summarise the live sessions under one read lock.
    pub async fn stats(&self) -> SessionStats {
        let sessions = self.sessions.read().await;
        SessionStats {
            active: sessions.len(),
            dropped_commands: sessions.values().map(|h| h.drop_count()).sum(),
            oldest: sessions.values().map(|h| h.age()).max(),
        }
    }
}
