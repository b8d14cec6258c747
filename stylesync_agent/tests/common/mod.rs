//! Shared fakes for the integration tests: a fixed-value probe with a stepping
//! clock and a sink that records pushes and can be told to fail.
#![allow(dead_code)]

use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Local, TimeZone};
use tokio::sync::mpsc;
use tokio::time::Instant;

use stylesync_agent::error::{CollectionError, SendError};
use stylesync_agent::sampler::{HostProbe, Sampler, SamplerSettings};
use stylesync_agent::session::SnapshotSink;
use stylesync_agent::types::{DiskStats, MemoryStats, MetricsSnapshot, NetworkStats};

/// Returns fixed readings; every `now()` is one millisecond after the last.
pub struct StepProbe {
    tick: AtomicI64,
    base: DateTime<Local>,
    pub fail_memory: AtomicBool,
}

impl StepProbe {
    pub fn new() -> Self {
        Self {
            tick: AtomicI64::new(0),
            base: Local.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap(),
            fail_memory: AtomicBool::new(false),
        }
    }
}

pub fn fixed_memory() -> MemoryStats {
    MemoryStats {
        total: 8 * 1024 * 1024 * 1024,
        available: 6 * 1024 * 1024 * 1024,
        used: 2 * 1024 * 1024 * 1024,
        free: 5 * 1024 * 1024 * 1024,
        percent: 25.0,
    }
}

pub fn fixed_disk() -> DiskStats {
    DiskStats {
        total: 1000,
        used: 600,
        free: 400,
        percent: 60.0,
    }
}

pub fn fixed_network() -> NetworkStats {
    NetworkStats {
        bytes_sent: 10,
        bytes_recv: 20,
        packets_sent: 1,
        packets_recv: 2,
        errin: 0,
        errout: 0,
    }
}

impl HostProbe for StepProbe {
    fn cpu_percent(&self, _interval: Duration) -> Result<f32, CollectionError> {
        Ok(33.0)
    }
    fn memory(&self) -> Result<MemoryStats, CollectionError> {
        if self.fail_memory.load(Ordering::SeqCst) {
            return Err(CollectionError::unavailable("memory", "probe told to fail"));
        }
        Ok(fixed_memory())
    }
    fn disk(&self, _path: &Path) -> Result<DiskStats, CollectionError> {
        Ok(fixed_disk())
    }
    fn network(&self) -> Result<NetworkStats, CollectionError> {
        Ok(fixed_network())
    }
    fn now(&self) -> DateTime<Local> {
        let n = self.tick.fetch_add(1, Ordering::SeqCst);
        self.base + chrono::Duration::milliseconds(n)
    }
}

pub fn step_sampler() -> (Sampler, Arc<StepProbe>) {
    let probe = Arc::new(StepProbe::new());
    (Sampler::new(probe.clone(), SamplerSettings::default()), probe)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailWith {
    Disconnect,
    Broken,
}

/// Lets a test make a running sink fail on its next push.
#[derive(Clone, Default)]
pub struct SinkControl(Arc<Mutex<Option<FailWith>>>);

impl SinkControl {
    pub fn fail_with(&self, mode: FailWith) {
        *self.0.lock().unwrap() = Some(mode);
    }
}

pub struct Push {
    pub at: Instant,
    pub snapshot: MetricsSnapshot,
}

pub struct RecordingSink {
    pushes: mpsc::UnboundedSender<Push>,
    control: SinkControl,
}

pub fn recording_sink() -> (RecordingSink, mpsc::UnboundedReceiver<Push>, SinkControl) {
    let (tx, rx) = mpsc::unbounded_channel();
    let control = SinkControl::default();
    (
        RecordingSink {
            pushes: tx,
            control: control.clone(),
        },
        rx,
        control,
    )
}

impl SnapshotSink for RecordingSink {
    async fn push(&mut self, snapshot: &MetricsSnapshot) -> Result<(), SendError> {
        let fail = *self.control.0.lock().unwrap();
        match fail {
            Some(FailWith::Disconnect) => Err(SendError::PeerDisconnected),
            Some(FailWith::Broken) => Err(SendError::Unexpected("socket buffer poisoned".into())),
            None => {
                let _ = self.pushes.send(Push {
                    at: Instant::now(),
                    snapshot: snapshot.clone(),
                });
                Ok(())
            }
        }
    }
}

pub fn parse_ts(s: &str) -> DateTime<chrono::FixedOffset> {
    DateTime::parse_from_rfc3339(s).expect("rfc3339 timestamp")
}
