//! Process-wide bookkeeping of open streaming sessions.
//!
//! Every session holds a `SessionGuard`; dropping it removes the entry, so
//! deregistration happens on every exit path. Sessions created with
//! `subscribe` also get a bounded feed that `broadcast` fans snapshots into.
//! The map lock is synchronous and never held across an `.await`.

use std::collections::HashMap;
use std::fmt;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::Notify;
use tracing::debug;

use crate::types::MetricsSnapshot;

pub type Feed = mpsc::Receiver<Arc<MetricsSnapshot>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Accepted,
    Registered,
    Streaming,
    Disconnected,
    Failed,
    Closed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSummary {
    pub id: SessionId,
    pub peer: Option<SocketAddr>,
    pub state: SessionState,
}

struct Entry {
    peer: Option<SocketAddr>,
    state: SessionState,
    feed: Option<mpsc::Sender<Arc<MetricsSnapshot>>>,
}

#[derive(Default)]
struct Inner {
    sessions: Mutex<HashMap<SessionId, Entry>>,
    next_id: AtomicU64,
    joined: Notify,
}

/// Result of one `broadcast` call.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BroadcastReport {
    pub delivered: usize,
    /// Feed was full; this subscriber misses the snapshot.
    pub lagged: usize,
    /// Receiver already dropped; the guard will clean the entry up.
    pub closed: usize,
}

#[derive(Clone, Default)]
pub struct Registry {
    inner: Arc<Inner>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<SessionId, Entry>> {
        // A panic while holding the lock cannot leave the map half-updated.
        self.inner
            .sessions
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn insert(
        &self,
        peer: Option<SocketAddr>,
        feed: Option<mpsc::Sender<Arc<MetricsSnapshot>>>,
    ) -> SessionGuard {
        let id = SessionId(self.inner.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        self.lock().insert(
            id,
            Entry {
                peer,
                state: SessionState::Registered,
                feed,
            },
        );
        self.inner.joined.notify_waiters();
        debug!(session = %id, ?peer, "session registered");
        SessionGuard {
            id,
            registry: self.clone(),
        }
    }

    /// Registers a session that drives its own sampling.
    pub fn register(&self, peer: Option<SocketAddr>) -> SessionGuard {
        self.insert(peer, None)
    }

    /// Registers a session fed by `broadcast`, with a feed of `capacity` snapshots.
    pub fn subscribe(&self, peer: Option<SocketAddr>, capacity: usize) -> (SessionGuard, Feed) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (self.insert(peer, Some(tx)), rx)
    }

    /// Offers `snapshot` to every subscribed feed without waiting on any of them.
    pub fn broadcast(&self, snapshot: Arc<MetricsSnapshot>) -> BroadcastReport {
        let sessions = self.lock();
        let mut report = BroadcastReport::default();
        for entry in sessions.values() {
            let Some(feed) = entry.feed.as_ref() else {
                continue;
            };
            match feed.try_send(Arc::clone(&snapshot)) {
                Ok(()) => report.delivered += 1,
                Err(TrySendError::Full(_)) => report.lagged += 1,
                Err(TrySendError::Closed(_)) => report.closed += 1,
            }
        }
        report
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn subscriber_count(&self) -> usize {
        self.lock().values().filter(|e| e.feed.is_some()).count()
    }

    pub fn contains(&self, id: SessionId) -> bool {
        self.lock().contains_key(&id)
    }

    pub fn state_of(&self, id: SessionId) -> Option<SessionState> {
        self.lock().get(&id).map(|e| e.state)
    }

    pub fn sessions(&self) -> Vec<SessionSummary> {
        let mut out: Vec<SessionSummary> = self
            .lock()
            .iter()
            .map(|(id, e)| SessionSummary {
                id: *id,
                peer: e.peer,
                state: e.state,
            })
            .collect();
        out.sort_by_key(|s| s.id);
        out
    }

    /// Resolves once at least one subscribed feed exists.
    pub async fn wait_for_subscriber(&self) {
        loop {
            let joined = self.inner.joined.notified();
            tokio::pin!(joined);
            // Register interest before checking so a concurrent insert is not missed.
            joined.as_mut().enable();
            if self.subscriber_count() > 0 {
                return;
            }
            joined.await;
        }
    }

    fn set_state(&self, id: SessionId, state: SessionState) {
        if let Some(e) = self.lock().get_mut(&id) {
            e.state = state;
        }
    }

    fn remove(&self, id: SessionId) {
        if let Some(e) = self.lock().remove(&id) {
            debug!(session = %id, peer = ?e.peer, last_state = ?e.state, "session deregistered");
        }
    }
}

/// Owning handle for one registry entry.
pub struct SessionGuard {
    id: SessionId,
    registry: Registry,
}

impl SessionGuard {
    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn set_state(&self, state: SessionState) {
        self.registry.set_state(self.id, state);
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.registry.remove(self.id);
    }
}
