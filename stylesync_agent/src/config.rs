//! Command line / environment configuration for the agent.

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use axum::http::HeaderValue;
use clap::Parser;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

use crate::error::ConfigError;
use crate::sampler::SamplerSettings;
use crate::session::{StreamMode, StreamSettings};

pub const DEFAULT_PORT: u16 = 8000;

#[derive(Parser, Debug, Clone)]
#[command(name = "stylesync_agent", version, about = "Serve live host metrics over HTTP and WebSocket")]
pub struct AgentArgs {
    /// Address to listen on
    #[arg(long, env = "STYLESYNC_HOST", default_value = "0.0.0.0")]
    pub host: String,

    #[arg(short, long, env = "STYLESYNC_PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Milliseconds between pushes on /ws/metrics
    #[arg(long, env = "STYLESYNC_CADENCE_MS", default_value_t = 2_000)]
    pub cadence_ms: u64,

    /// Window over which CPU usage is measured, in milliseconds
    #[arg(long, env = "STYLESYNC_CPU_INTERVAL_MS", default_value_t = 1_000)]
    pub cpu_interval_ms: u64,

    /// Path whose filesystem is reported under `disk`
    #[arg(long, env = "STYLESYNC_DISK_PATH", default_value = "/")]
    pub disk_path: PathBuf,

    /// Allowed CORS origin; repeat for several. "*" allows any origin.
    #[arg(
        long = "cors-origin",
        env = "STYLESYNC_CORS_ORIGINS",
        value_delimiter = ',',
        default_value = "*"
    )]
    pub cors_origins: Vec<String>,

    #[arg(long, env = "STYLESYNC_STREAM_MODE", value_enum, default_value_t = StreamMode::PerSession)]
    pub stream_mode: StreamMode,

    /// Snapshots buffered per subscriber in shared mode
    #[arg(long, env = "STYLESYNC_FEED_CAPACITY", default_value_t = 4)]
    pub feed_capacity: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CorsPolicy {
    AllowAll,
    Origins(Vec<HeaderValue>),
}

impl CorsPolicy {
    pub fn parse(origins: &[String]) -> Result<Self, ConfigError> {
        let origins: Vec<&str> = origins
            .iter()
            .map(|o| o.trim())
            .filter(|o| !o.is_empty())
            .collect();
        if origins.is_empty() || origins == ["*"] {
            return Ok(CorsPolicy::AllowAll);
        }
        if origins.contains(&"*") {
            return Err(ConfigError::MixedWildcardOrigin);
        }
        origins
            .into_iter()
            .map(|o| HeaderValue::from_str(o).map_err(|_| ConfigError::InvalidOrigin(o.to_string())))
            .collect::<Result<Vec<_>, _>>()
            .map(CorsPolicy::Origins)
    }

    pub fn layer(&self) -> CorsLayer {
        let base = CorsLayer::new().allow_methods(Any).allow_headers(Any);
        match self {
            CorsPolicy::AllowAll => base.allow_origin(Any),
            CorsPolicy::Origins(list) => base.allow_origin(AllowOrigin::list(list.clone())),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub listen: SocketAddr,
    pub sampler: SamplerSettings,
    pub stream: StreamSettings,
    pub cors: CorsPolicy,
}

impl AgentConfig {
    pub fn from_args(args: AgentArgs) -> Result<Self, ConfigError> {
        if args.cadence_ms == 0 {
            return Err(ConfigError::ZeroCadence);
        }
        if args.feed_capacity == 0 {
            return Err(ConfigError::ZeroFeedCapacity);
        }
        let ip: IpAddr = args
            .host
            .parse()
            .map_err(|_| ConfigError::InvalidHost(args.host.clone()))?;
        Ok(Self {
            listen: SocketAddr::new(ip, args.port),
            sampler: SamplerSettings {
                cpu_interval: Duration::from_millis(args.cpu_interval_ms),
                disk_path: args.disk_path,
            },
            stream: StreamSettings {
                mode: args.stream_mode,
                cadence: Duration::from_millis(args.cadence_ms),
                feed_capacity: args.feed_capacity,
            },
            cors: CorsPolicy::parse(&args.cors_origins)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> AgentArgs {
        let mut full = vec!["stylesync_agent"];
        full.extend_from_slice(args);
        AgentArgs::try_parse_from(full).expect("args parse")
    }

    #[test]
    fn defaults_listen_on_all_interfaces_port_8000() {
        let cfg = AgentConfig::from_args(parse(&[])).unwrap();
        assert_eq!(cfg.listen, "0.0.0.0:8000".parse().unwrap());
        assert_eq!(cfg.stream.cadence, Duration::from_secs(2));
        assert_eq!(cfg.sampler.cpu_interval, Duration::from_secs(1));
        assert_eq!(cfg.sampler.disk_path, PathBuf::from("/"));
        assert_eq!(cfg.stream.mode, StreamMode::PerSession);
        assert_eq!(cfg.cors, CorsPolicy::AllowAll);
    }

    #[test]
    fn port_short_and_long() {
        assert_eq!(parse(&["-p", "9001"]).port, 9001);
        assert_eq!(parse(&["--port", "9002"]).port, 9002);
        assert_eq!(parse(&["--port=9003"]).port, 9003);
    }

    #[test]
    fn explicit_origins_are_collected() {
        let args = parse(&[
            "--cors-origin",
            "https://a.example",
            "--cors-origin",
            "https://b.example,https://c.example",
        ]);
        let cfg = AgentConfig::from_args(args).unwrap();
        match cfg.cors {
            CorsPolicy::Origins(list) => assert_eq!(list.len(), 3),
            other => panic!("expected explicit origins, got {other:?}"),
        }
    }

    #[test]
    fn wildcard_mixed_with_origins_is_rejected() {
        let args = parse(&["--cors-origin", "*,https://a.example"]);
        assert!(matches!(
            AgentConfig::from_args(args),
            Err(ConfigError::MixedWildcardOrigin)
        ));
    }

    #[test]
    fn zero_cadence_is_rejected() {
        let args = parse(&["--cadence-ms", "0"]);
        assert!(matches!(
            AgentConfig::from_args(args),
            Err(ConfigError::ZeroCadence)
        ));
    }

    #[test]
    fn bad_host_is_rejected() {
        let args = parse(&["--host", "not-an-ip"]);
        assert!(matches!(
            AgentConfig::from_args(args),
            Err(ConfigError::InvalidHost(_))
        ));
    }

    #[test]
    fn shared_mode_is_selectable() {
        let cfg = AgentConfig::from_args(parse(&["--stream-mode", "shared"])).unwrap();
        assert_eq!(cfg.stream.mode, StreamMode::Shared);
    }
}
