//! Process listing for `/services`. Entries that vanish, deny access or are
//! unreadable zombies are skipped; they never fail the listing.

use std::collections::HashSet;

use sysinfo::{Pid, ProcessRefreshKind, ProcessStatus, ProcessesToUpdate, System};
use tracing::trace;

use crate::error::{CollectionError, ProcessError};
use crate::types::{percent_of, ProcessInfo, ProcessState};

/// The live process table.
pub trait ProcessTable: Send {
    /// Re-reads the table and returns the pids currently present.
    fn refresh(&mut self) -> Result<Vec<u32>, CollectionError>;
    /// Reads one entry from the last refresh.
    fn inspect(&self, pid: u32) -> Result<ProcessInfo, ProcessError>;
}

/// Walks the table once. Per-entry errors drop that entry only.
pub fn list_processes(table: &mut dyn ProcessTable) -> Result<Vec<ProcessInfo>, CollectionError> {
    let pids = table.refresh()?;
    let mut seen = HashSet::with_capacity(pids.len());
    let mut out = Vec::with_capacity(pids.len());
    for pid in pids {
        if !seen.insert(pid) {
            continue;
        }
        match table.inspect(pid) {
            Ok(info) => out.push(info),
            Err(e) => trace!("skipping process: {e}"),
        }
    }
    Ok(out)
}

/// sysinfo-backed table. The `System` persists between refreshes so per-process
/// CPU usage is measured against the previous request.
pub struct SystemProcessTable {
    sys: System,
}

impl SystemProcessTable {
    pub fn new() -> Self {
        Self { sys: System::new() }
    }
}

impl Default for SystemProcessTable {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessTable for SystemProcessTable {
    fn refresh(&mut self) -> Result<Vec<u32>, CollectionError> {
        let sys = &mut self.sys;
        std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            sys.refresh_memory();
            sys.refresh_processes_specifics(
                ProcessesToUpdate::All,
                true,
                ProcessRefreshKind::nothing()
                    .with_cpu()
                    .with_memory()
                    .without_tasks(),
            );
        }))
        .map_err(|_| CollectionError::unavailable("process", "sysinfo refresh panicked"))?;

        // Threads can still be in the map from an earlier refresh.
        let mut pids: Vec<u32> = self
            .sys
            .processes()
            .iter()
            .filter(|(_, p)| p.thread_kind().is_none())
            .map(|(pid, _)| pid.as_u32())
            .collect();
        // /proc lists in ascending pid order
        pids.sort_unstable();
        Ok(pids)
    }

    fn inspect(&self, pid: u32) -> Result<ProcessInfo, ProcessError> {
        let p = self
            .sys
            .process(Pid::from_u32(pid))
            .ok_or(ProcessError::Vanished(pid))?;
        if p.thread_kind().is_some() {
            return Err(ProcessError::Vanished(pid));
        }
        let status = map_status(p.status());
        let name = p.name().to_string_lossy().into_owned();
        if name.is_empty() {
            return Err(if status == ProcessState::Zombie {
                ProcessError::Zombie(pid)
            } else {
                ProcessError::AccessDenied(pid)
            });
        }
        Ok(ProcessInfo {
            pid,
            name,
            status,
            cpu_percent: p.cpu_usage(),
            memory_percent: percent_of(p.memory(), self.sys.total_memory()),
        })
    }
}

pub fn map_status(status: ProcessStatus) -> ProcessState {
    match status {
        ProcessStatus::Run => ProcessState::Running,
        ProcessStatus::Sleep => ProcessState::Sleeping,
        ProcessStatus::UninterruptibleDiskSleep => ProcessState::DiskSleep,
        ProcessStatus::Stop => ProcessState::Stopped,
        ProcessStatus::Tracing => ProcessState::TracingStop,
        ProcessStatus::Zombie => ProcessState::Zombie,
        ProcessStatus::Dead => ProcessState::Dead,
        ProcessStatus::Wakekill => ProcessState::WakeKill,
        ProcessStatus::Waking => ProcessState::Waking,
        ProcessStatus::Idle => ProcessState::Idle,
        ProcessStatus::Parked => ProcessState::Parked,
        ProcessStatus::LockBlocked => ProcessState::Locked,
        _ => ProcessState::Unknown,
    }
}
