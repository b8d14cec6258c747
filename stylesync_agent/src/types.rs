//! Data types sent to clients over HTTP and WebSocket.
//! These structs are the wire format; field names are part of the API.

use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct MemoryStats {
    pub total: u64,
    pub available: u64,
    pub used: u64,
    pub free: u64,
    pub percent: f32,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct DiskStats {
    pub total: u64,
    pub used: u64,
    pub free: u64,
    pub percent: f32,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct NetworkStats {
    // cumulative totals across all interfaces (client should diff to get rates)
    pub bytes_sent: u64,
    pub bytes_recv: u64,
    pub packets_sent: u64,
    pub packets_recv: u64,
    pub errin: u64,
    pub errout: u64,
}

/// One self-consistent reading of the host. `timestamp` is RFC 3339 local time.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct MetricsSnapshot {
    pub cpu_percent: f32,
    pub memory: MemoryStats,
    pub disk: DiskStats,
    pub network: NetworkStats,
    pub timestamp: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum ProcessState {
    Running,
    Sleeping,
    DiskSleep,
    Stopped,
    TracingStop,
    Zombie,
    Dead,
    WakeKill,
    Waking,
    Idle,
    Parked,
    Locked,
    Unknown,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ProcessInfo {
    pub pid: u32,
    pub name: String,
    pub status: ProcessState,
    pub cpu_percent: f32,
    pub memory_percent: f32,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct RootInfo {
    pub message: String,
}

/// Share of `part` in `total` as a 0..=100 percentage; 0 when `total` is 0.
pub fn percent_of(part: u64, total: u64) -> f32 {
    if total == 0 {
        return 0.0;
    }
    ((part as f64 / total as f64) * 100.0).clamp(0.0, 100.0) as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percent_of_handles_zero_total() {
        assert_eq!(percent_of(10, 0), 0.0);
        assert_eq!(percent_of(50, 200), 25.0);
        assert_eq!(percent_of(300, 200), 100.0);
    }

    #[test]
    fn process_state_uses_kebab_case_on_the_wire() {
        let js = serde_json::to_string(&ProcessState::DiskSleep).unwrap();
        assert_eq!(js, "\"disk-sleep\"");
        let js = serde_json::to_string(&ProcessState::Running).unwrap();
        assert_eq!(js, "\"running\"");
    }

    #[test]
    fn snapshot_serializes_nested_sections() {
        let snap = MetricsSnapshot {
            cpu_percent: 12.5,
            memory: MemoryStats {
                total: 100,
                available: 60,
                used: 40,
                free: 50,
                percent: 40.0,
            },
            disk: DiskStats {
                total: 10,
                used: 5,
                free: 5,
                percent: 50.0,
            },
            network: NetworkStats::default(),
            timestamp: "2024-01-01T00:00:00.000000+00:00".into(),
        };
        let v = serde_json::to_value(&snap).unwrap();
        assert_eq!(v["memory"]["available"], 60);
        assert_eq!(v["disk"]["percent"], 50.0);
        assert_eq!(v["network"]["bytes_recv"], 0);
        assert_eq!(v["timestamp"], "2024-01-01T00:00:00.000000+00:00");
    }
}
