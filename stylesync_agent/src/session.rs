//! Streaming sessions: sample → push → sleep, one task per subscriber.
//!
//! `run_session` drives its own sampling (per-session mode). `run_subscriber`
//! consumes a registry feed filled by `spawn_broadcaster` (shared mode).
//! Either way the session's `SessionGuard` is dropped on every exit path,
//! including task abort, so the registry never keeps stale entries.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, info, trace, warn};

use crate::error::{CollectionError, SendError};
use crate::registry::{Registry, SessionGuard, SessionId, SessionState};
use crate::sampler::Sampler;
use crate::types::MetricsSnapshot;

pub const DEFAULT_CADENCE: Duration = Duration::from_secs(2);
pub const DEFAULT_FEED_CAPACITY: usize = 4;

/// Where a session writes its snapshots.
pub trait SnapshotSink: Send {
    fn push(
        &mut self,
        snapshot: &MetricsSnapshot,
    ) -> impl Future<Output = Result<(), SendError>> + Send;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum StreamMode {
    /// Every session samples on its own cadence.
    #[default]
    PerSession,
    /// One broadcaster samples and fans out to every session.
    Shared,
}

#[derive(Debug, Clone)]
pub struct StreamSettings {
    pub mode: StreamMode,
    pub cadence: Duration,
    pub feed_capacity: usize,
}

impl Default for StreamSettings {
    fn default() -> Self {
        Self {
            mode: StreamMode::PerSession,
            cadence: DEFAULT_CADENCE,
            feed_capacity: DEFAULT_FEED_CAPACITY,
        }
    }
}

#[derive(Debug, Error)]
pub enum SessionFailure {
    #[error("sampling failed: {0}")]
    Collection(#[from] CollectionError),
    #[error("{0}")]
    Send(String),
    #[error("broadcast feed closed")]
    FeedClosed,
}

#[derive(Debug)]
pub enum SessionOutcome {
    /// The peer closed the connection.
    Disconnected,
    Failed(SessionFailure),
    /// Process-wide shutdown was requested.
    Shutdown,
}

impl From<SendError> for SessionOutcome {
    fn from(e: SendError) -> Self {
        match e {
            SendError::PeerDisconnected => SessionOutcome::Disconnected,
            SendError::Unexpected(msg) => SessionOutcome::Failed(SessionFailure::Send(msg)),
        }
    }
}

#[derive(Debug)]
pub struct SessionReport {
    pub id: SessionId,
    pub pushes: u64,
    pub outcome: SessionOutcome,
    /// Always `Closed`: the report is only built after deregistration.
    pub state: SessionState,
}

/// Resolves once shutdown is signalled. A dropped sender counts as shutdown.
pub async fn shutdown_requested(rx: &mut watch::Receiver<bool>) {
    let _ = rx.wait_for(|stop| *stop).await;
}

/// Per-session loop: sample, push, sleep `cadence`, until the peer leaves,
/// something fails, or shutdown is requested.
pub async fn run_session<S: SnapshotSink>(
    mut sink: S,
    sampler: Sampler,
    registry: Registry,
    peer: Option<SocketAddr>,
    cadence: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> SessionReport {
    let guard = registry.register(peer);
    info!(session = %guard.id(), ?peer, "streaming session opened");
    guard.set_state(SessionState::Streaming);

    let mut pushes = 0u64;
    let outcome = loop {
        let sampled = tokio::select! {
            biased;
            _ = shutdown_requested(&mut shutdown) => break SessionOutcome::Shutdown,
            r = sampler.sample() => r,
        };
        let snapshot = match sampled {
            Ok(s) => s,
            Err(e) => break SessionOutcome::Failed(e.into()),
        };
        if let Err(e) = sink.push(&snapshot).await {
            break e.into();
        }
        pushes += 1;
        trace!(session = %guard.id(), pushes, "snapshot pushed");

        tokio::select! {
            biased;
            _ = shutdown_requested(&mut shutdown) => break SessionOutcome::Shutdown,
            _ = sleep(cadence) => {}
        }
    };
    close(guard, pushes, outcome)
}

/// Shared-mode session: forwards snapshots from its registry feed.
pub async fn run_subscriber<S: SnapshotSink>(
    mut sink: S,
    registry: Registry,
    peer: Option<SocketAddr>,
    feed_capacity: usize,
    mut shutdown: watch::Receiver<bool>,
) -> SessionReport {
    let (guard, mut feed) = registry.subscribe(peer, feed_capacity);
    info!(session = %guard.id(), ?peer, "subscriber session opened");
    guard.set_state(SessionState::Streaming);

    let mut pushes = 0u64;
    let outcome = loop {
        let snapshot = tokio::select! {
            biased;
            _ = shutdown_requested(&mut shutdown) => break SessionOutcome::Shutdown,
            next = feed.recv() => match next {
                Some(s) => s,
                None => break SessionOutcome::Failed(SessionFailure::FeedClosed),
            },
        };
        if let Err(e) = sink.push(&snapshot).await {
            break e.into();
        }
        pushes += 1;
    };
    close(guard, pushes, outcome)
}

fn close(guard: SessionGuard, pushes: u64, outcome: SessionOutcome) -> SessionReport {
    let id = guard.id();
    match &outcome {
        SessionOutcome::Disconnected => {
            guard.set_state(SessionState::Disconnected);
            debug!(session = %id, pushes, "peer disconnected");
        }
        SessionOutcome::Failed(e) => {
            guard.set_state(SessionState::Failed);
            warn!(session = %id, pushes, error = %e, "streaming session failed");
        }
        SessionOutcome::Shutdown => {
            debug!(session = %id, pushes, "streaming session stopped for shutdown");
        }
    }
    drop(guard);
    info!(session = %id, pushes, "streaming session closed");
    SessionReport {
        id,
        pushes,
        outcome,
        state: SessionState::Closed,
    }
}

/// Shared-mode producer. Idles while nobody is subscribed, otherwise samples
/// once per `cadence` and offers the snapshot to every feed.
pub fn spawn_broadcaster(
    sampler: Sampler,
    registry: Registry,
    cadence: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            tokio::select! {
                biased;
                _ = shutdown_requested(&mut shutdown) => break,
                _ = registry.wait_for_subscriber() => {}
            }
            let sampled = tokio::select! {
                biased;
                _ = shutdown_requested(&mut shutdown) => break,
                r = sampler.sample() => r,
            };
            match sampled {
                Ok(snapshot) => {
                    let report = registry.broadcast(Arc::new(snapshot));
                    if report.lagged > 0 {
                        debug!(lagged = report.lagged, "slow subscribers skipped a snapshot");
                    }
                    trace!(?report, "snapshot broadcast");
                }
                // Subscribers keep waiting; the next cadence samples again.
                Err(e) => warn!("shared sampling failed: {e}"),
            }
            tokio::select! {
                biased;
                _ = shutdown_requested(&mut shutdown) => break,
                _ = sleep(cadence) => {}
            }
        }
        debug!("broadcaster stopped");
    })
}
