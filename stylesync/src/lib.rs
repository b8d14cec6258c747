//! Library surface for the stylesync dashboard: agent types, the stream client and the TUI.

pub mod app;
pub mod history;
pub mod types;
pub mod ui;
pub mod ws;

pub use types::Metrics;
pub use ws::{connect, next_metrics, parse_url, WsStream, DEFAULT_URL};
