//! Error types for sampling, process enumeration, streaming and configuration.

use std::path::PathBuf;
use thiserror::Error;

/// The OS metrics layer could not be queried.
#[derive(Debug, Error)]
pub enum CollectionError {
    #[error("{what} metrics unavailable: {reason}")]
    Unavailable { what: &'static str, reason: String },
    #[error("no filesystem mounted at {}", .0.display())]
    NoFilesystem(PathBuf),
    #[error("sampling task aborted: {0}")]
    Aborted(String),
}

impl CollectionError {
    pub fn unavailable(what: &'static str, reason: impl Into<String>) -> Self {
        Self::Unavailable {
            what,
            reason: reason.into(),
        }
    }
}

/// Per-entry races while walking the process table. Never surfaced to callers.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ProcessError {
    #[error("process {0} vanished")]
    Vanished(u32),
    #[error("access denied to process {0}")]
    AccessDenied(u32),
    #[error("process {0} is a zombie")]
    Zombie(u32),
}

/// Outcome of a failed push to a subscriber.
#[derive(Debug, Error)]
pub enum SendError {
    /// The peer went away; expected teardown, not a fault.
    #[error("peer disconnected")]
    PeerDisconnected,
    #[error("send failed: {0}")]
    Unexpected(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cadence must be greater than zero")]
    ZeroCadence,
    #[error("feed capacity must be greater than zero")]
    ZeroFeedCapacity,
    #[error("invalid CORS origin {0:?}")]
    InvalidOrigin(String),
    #[error("wildcard origin \"*\" cannot be combined with explicit origins")]
    MixedWildcardOrigin,
    #[error("invalid listen address {0:?}")]
    InvalidHost(String),
}
