//! Shared agent state handed to every handler.

use std::sync::Arc;

use tokio::sync::{watch, Mutex};

use crate::processes::{ProcessTable, SystemProcessTable};
use crate::registry::Registry;
use crate::sampler::Sampler;
use crate::session::StreamSettings;

pub type SharedProcessTable = Arc<Mutex<Box<dyn ProcessTable>>>;

#[derive(Clone)]
pub struct AppState {
    pub sampler: Sampler,
    // Persistent so per-process CPU% is a delta between requests
    pub processes: SharedProcessTable,
    pub registry: Registry,
    pub stream: StreamSettings,
    pub shutdown: watch::Receiver<bool>,
}

impl AppState {
    pub fn new(
        sampler: Sampler,
        processes: Box<dyn ProcessTable>,
        stream: StreamSettings,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            sampler,
            processes: Arc::new(Mutex::new(processes)),
            registry: Registry::new(),
            stream,
            shutdown,
        }
    }

    /// State backed by the real OS.
    pub fn system(sampler: Sampler, stream: StreamSettings, shutdown: watch::Receiver<bool>) -> Self {
        Self::new(sampler, Box::new(SystemProcessTable::new()), stream, shutdown)
    }
}
