//! stylesync_agent: serves host metrics over HTTP and a WebSocket push stream.

use std::net::SocketAddr;

use clap::Parser;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use stylesync_agent::config::{AgentArgs, AgentConfig, CorsPolicy};
use stylesync_agent::http::build_router;
use stylesync_agent::sampler::Sampler;
use stylesync_agent::session::{spawn_broadcaster, StreamMode};
use stylesync_agent::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let cfg = AgentConfig::from_args(AgentArgs::parse())?;
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let sampler = Sampler::system(cfg.sampler.clone());
    let state = AppState::system(sampler.clone(), cfg.stream.clone(), shutdown_rx.clone());

    let broadcaster = match cfg.stream.mode {
        StreamMode::Shared => Some(spawn_broadcaster(
            sampler,
            state.registry.clone(),
            cfg.stream.cadence,
            shutdown_rx.clone(),
        )),
        StreamMode::PerSession => None,
    };

    let app = build_router(state, &cfg.cors);
    let listener = TcpListener::bind(cfg.listen).await?;
    info!(
        listen = %listener.local_addr()?,
        mode = ?cfg.stream.mode,
        cadence_ms = cfg.stream.cadence.as_millis() as u64,
        "stylesync agent running"
    );
    if cfg.cors == CorsPolicy::AllowAll {
        info!("CORS allows every origin; pass --cors-origin to restrict it");
    }

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal(shutdown_tx))
    .await?;

    if let Some(task) = broadcaster {
        let _ = task.await;
    }
    info!("stylesync agent stopped");
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Waits for Ctrl-C, then tells every session and the broadcaster to stop.
async fn shutdown_signal(tx: watch::Sender<bool>) {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(error = %err, "failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
    let _ = tx.send(true);
}
