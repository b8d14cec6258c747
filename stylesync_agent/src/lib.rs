//! StyleSync agent: samples host CPU, memory, disk and network and serves them
//! as one-shot HTTP responses and as a WebSocket push stream.

pub mod auth;
pub mod config;
pub mod error;
pub mod http;
pub mod processes;
pub mod registry;
pub mod sampler;
pub mod session;
pub mod state;
pub mod types;
pub mod ws;

pub use error::{CollectionError, ProcessError, SendError};
pub use sampler::{HostProbe, Sampler, SamplerSettings, SystemProbe};
pub use types::{MetricsSnapshot, ProcessInfo};
