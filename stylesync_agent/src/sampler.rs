//! Host sampler: reads CPU, memory, disk and network through a `HostProbe` and
//! bundles them into one `MetricsSnapshot` stamped after all reads.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Local, SecondsFormat};
use sysinfo::{Networks, System, MINIMUM_CPU_UPDATE_INTERVAL};
use tracing::warn;

use crate::error::CollectionError;
use crate::types::{percent_of, DiskStats, MemoryStats, MetricsSnapshot, NetworkStats};

pub const DEFAULT_CPU_INTERVAL: Duration = Duration::from_secs(1);

/// Read access to the OS metrics layer. Implementations must be safe to call
/// from several sessions at once; every call is independent.
pub trait HostProbe: Send + Sync {
    /// Blocks for `interval` and returns global CPU usage over that window.
    fn cpu_percent(&self, interval: Duration) -> Result<f32, CollectionError>;
    fn memory(&self) -> Result<MemoryStats, CollectionError>;
    /// Usage of the filesystem holding `path`.
    fn disk(&self, path: &Path) -> Result<DiskStats, CollectionError>;
    fn network(&self) -> Result<NetworkStats, CollectionError>;

    fn now(&self) -> DateTime<Local> {
        Local::now()
    }
}

/// `HostProbe` backed by sysinfo, plus `statvfs` for the disk. Holds no
/// handles; each read builds its own.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemProbe;

// sysinfo can panic on odd /proc contents; turn that into a collection error.
fn guarded<T>(what: &'static str, f: impl FnOnce() -> T) -> Result<T, CollectionError> {
    std::panic::catch_unwind(std::panic::AssertUnwindSafe(f)).map_err(|e| {
        warn!("sysinfo {what} refresh panicked: {e:?}");
        CollectionError::unavailable(what, "sysinfo refresh panicked")
    })
}

impl HostProbe for SystemProbe {
    fn cpu_percent(&self, interval: Duration) -> Result<f32, CollectionError> {
        let mut sys = System::new();
        guarded("cpu", || sys.refresh_cpu_usage())?;
        if sys.cpus().is_empty() {
            return Err(CollectionError::unavailable("cpu", "no CPUs reported"));
        }
        // Usage is a delta between two refreshes; shorter windows read as 0 or 100.
        std::thread::sleep(interval.max(MINIMUM_CPU_UPDATE_INTERVAL));
        guarded("cpu", || sys.refresh_cpu_usage())?;
        Ok(sys.global_cpu_usage().clamp(0.0, 100.0))
    }

    fn memory(&self) -> Result<MemoryStats, CollectionError> {
        let mut sys = System::new();
        guarded("memory", || sys.refresh_memory())?;
        let total = sys.total_memory();
        if total == 0 {
            return Err(CollectionError::unavailable("memory", "total memory is 0"));
        }
        let available = sys.available_memory();
        let used = total.saturating_sub(available);
        Ok(MemoryStats {
            total,
            available,
            used,
            free: sys.free_memory(),
            percent: percent_of(used, total),
        })
    }

    fn disk(&self, path: &Path) -> Result<DiskStats, CollectionError> {
        let blocks = statvfs_blocks(path)?;
        Ok(disk_usage(blocks))
    }

    fn network(&self) -> Result<NetworkStats, CollectionError> {
        let nets = guarded("network", Networks::new_with_refreshed_list)?;
        Ok(nets
            .iter()
            .fold(NetworkStats::default(), |acc, (_, data)| NetworkStats {
                bytes_sent: acc.bytes_sent.saturating_add(data.total_transmitted()),
                bytes_recv: acc.bytes_recv.saturating_add(data.total_received()),
                packets_sent: acc
                    .packets_sent
                    .saturating_add(data.total_packets_transmitted()),
                packets_recv: acc
                    .packets_recv
                    .saturating_add(data.total_packets_received()),
                errin: acc.errin.saturating_add(data.total_errors_on_received()),
                errout: acc
                    .errout
                    .saturating_add(data.total_errors_on_transmitted()),
            }))
    }
}

/// Raw `statvfs` block counts for one filesystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FsBlocks {
    pub blocks: u64,
    /// Free blocks, including those reserved for root.
    pub blocks_free: u64,
    /// Free blocks available to unprivileged users.
    pub blocks_available: u64,
    pub fragment_size: u64,
}

/// psutil-style usage: reserved blocks count as neither used nor free, and
/// `percent` is `used / (used + free)` rounded to one decimal.
pub fn disk_usage(fs: FsBlocks) -> DiskStats {
    let total = fs.blocks.saturating_mul(fs.fragment_size);
    let used = fs
        .blocks
        .saturating_sub(fs.blocks_free)
        .saturating_mul(fs.fragment_size);
    let free = fs.blocks_available.saturating_mul(fs.fragment_size);
    let percent = percent_of(used, used.saturating_add(free));
    DiskStats {
        total,
        used,
        free,
        percent: (percent * 10.0).round() / 10.0,
    }
}

#[cfg(unix)]
#[allow(clippy::unnecessary_cast)]
fn statvfs_blocks(path: &Path) -> Result<FsBlocks, CollectionError> {
    use nix::errno::Errno;

    let st = nix::sys::statvfs::statvfs(path).map_err(|e| match e {
        Errno::ENOENT | Errno::ENOTDIR => CollectionError::NoFilesystem(path.to_path_buf()),
        other => {
            CollectionError::unavailable("disk", format!("statvfs {}: {other}", path.display()))
        }
    })?;
    Ok(FsBlocks {
        blocks: st.blocks() as u64,
        blocks_free: st.blocks_free() as u64,
        blocks_available: st.blocks_available() as u64,
        fragment_size: st.fragment_size() as u64,
    })
}

#[cfg(not(unix))]
fn statvfs_blocks(path: &Path) -> Result<FsBlocks, CollectionError> {
    Err(CollectionError::unavailable(
        "disk",
        format!("statvfs is not available for {}", path.display()),
    ))
}

#[derive(Debug, Clone)]
pub struct SamplerSettings {
    /// Window over which CPU usage is measured. Longer is smoother but delays the sample.
    pub cpu_interval: Duration,
    pub disk_path: PathBuf,
}

impl Default for SamplerSettings {
    fn default() -> Self {
        Self {
            cpu_interval: DEFAULT_CPU_INTERVAL,
            disk_path: PathBuf::from("/"),
        }
    }
}

/// Cheap to clone; every clone shares the same probe.
#[derive(Clone)]
pub struct Sampler {
    probe: Arc<dyn HostProbe>,
    settings: Arc<SamplerSettings>,
}

impl Sampler {
    pub fn new(probe: Arc<dyn HostProbe>, settings: SamplerSettings) -> Self {
        Self {
            probe,
            settings: Arc::new(settings),
        }
    }

    pub fn system(settings: SamplerSettings) -> Self {
        Self::new(Arc::new(SystemProbe), settings)
    }

    pub fn settings(&self) -> &SamplerSettings {
        &self.settings
    }

    /// Takes one snapshot. The reads run back-to-back on the blocking pool, so
    /// the caller suspends once for roughly `cpu_interval`.
    pub async fn sample(&self) -> Result<MetricsSnapshot, CollectionError> {
        let probe = Arc::clone(&self.probe);
        let settings = Arc::clone(&self.settings);
        tokio::task::spawn_blocking(move || read_snapshot(probe.as_ref(), &settings))
            .await
            .map_err(|e| CollectionError::Aborted(e.to_string()))?
    }
}

/// Synchronous core of `Sampler::sample`.
pub fn read_snapshot(
    probe: &dyn HostProbe,
    settings: &SamplerSettings,
) -> Result<MetricsSnapshot, CollectionError> {
    let cpu_percent = probe.cpu_percent(settings.cpu_interval)?;
    let memory = probe.memory()?;
    let disk = probe.disk(&settings.disk_path)?;
    let network = probe.network()?;
    // Stamp once, after every read, to bound skew between the sections.
    let timestamp = format_timestamp(probe.now());
    Ok(MetricsSnapshot {
        cpu_percent,
        memory,
        disk,
        network,
        timestamp,
    })
}

pub fn format_timestamp(at: DateTime<Local>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, false)
}
