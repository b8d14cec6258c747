//! Types that mirror the agent's JSON schema.

use serde::Deserialize;

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct Memory {
    pub total: u64,
    pub available: u64,
    pub used: u64,
    pub free: u64,
    pub percent: f32,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct Disk {
    pub total: u64,
    pub used: u64,
    pub free: u64,
    pub percent: f32,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct Network {
    // cumulative counters since boot
    pub bytes_sent: u64,
    pub bytes_recv: u64,
    pub packets_sent: u64,
    pub packets_recv: u64,
    #[serde(default)]
    pub errin: u64,
    #[serde(default)]
    pub errout: u64,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct Metrics {
    pub cpu_percent: f32,
    pub memory: Memory,
    pub disk: Disk,
    pub network: Network,
    pub timestamp: String,
}

impl Metrics {
    /// Wall-clock part of the timestamp (`HH:MM:SS`), used as a chart label.
    pub fn clock_label(&self) -> String {
        chrono::DateTime::parse_from_rfc3339(&self.timestamp)
            .map(|t| t.format("%H:%M:%S").to_string())
            .unwrap_or_else(|_| self.timestamp.clone())
    }
}
