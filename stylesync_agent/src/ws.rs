//! WebSocket upgrade and per-connection handler for `/ws/metrics`.
//! The server only pushes; inbound frames are drained and ignored.

use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        ConnectInfo, State,
    },
    response::Response,
};
use futures_util::{
    sink::SinkExt,
    stream::{SplitSink, StreamExt},
};
use tracing::{debug, trace};

use crate::auth::BearerToken;
use crate::error::SendError;
use crate::session::{run_session, run_subscriber, SnapshotSink, StreamMode};
use crate::state::AppState;
use crate::types::MetricsSnapshot;

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    connect: Option<ConnectInfo<SocketAddr>>,
    token: BearerToken,
) -> Response {
    let peer = connect.map(|ConnectInfo(addr)| addr);
    // Token is recorded but not enforced.
    debug!(?peer, bearer = token.is_present(), "metrics stream requested");
    ws.on_upgrade(move |socket| handle_socket(socket, state, peer))
}

async fn handle_socket(socket: WebSocket, state: AppState, peer: Option<SocketAddr>) {
    let (tx, mut rx) = socket.split();
    let peer_closed = Arc::new(AtomicBool::new(false));

    // Drain client frames so pings are answered and a Close is noticed.
    let reader = {
        let peer_closed = Arc::clone(&peer_closed);
        tokio::spawn(async move {
            while let Some(msg) = rx.next().await {
                match msg {
                    Ok(Message::Close(_)) | Err(_) => break,
                    Ok(other) => trace!(?other, "ignoring client frame"),
                }
            }
            peer_closed.store(true, Ordering::Release);
        })
    };

    let sink = WsSink { tx, peer_closed };
    let report = match state.stream.mode {
        StreamMode::PerSession => {
            run_session(
                sink,
                state.sampler.clone(),
                state.registry.clone(),
                peer,
                state.stream.cadence,
                state.shutdown.clone(),
            )
            .await
        }
        StreamMode::Shared => {
            run_subscriber(
                sink,
                state.registry.clone(),
                peer,
                state.stream.feed_capacity,
                state.shutdown.clone(),
            )
            .await
        }
    };
    reader.abort();
    debug!(session = %report.id, outcome = ?report.outcome, "websocket released");
}

/// Sends each snapshot as one JSON text frame.
pub struct WsSink {
    tx: SplitSink<WebSocket, Message>,
    peer_closed: Arc<AtomicBool>,
}

impl SnapshotSink for WsSink {
    async fn push(&mut self, snapshot: &MetricsSnapshot) -> Result<(), SendError> {
        if self.peer_closed.load(Ordering::Acquire) {
            return Err(SendError::PeerDisconnected);
        }
        let json =
            serde_json::to_string(snapshot).map_err(|e| SendError::Unexpected(e.to_string()))?;
        match self.tx.send(Message::Text(json)).await {
            Ok(()) => Ok(()),
            Err(e) if self.peer_closed.load(Ordering::Acquire) || is_disconnect(&e) => {
                Err(SendError::PeerDisconnected)
            }
            Err(e) => Err(SendError::Unexpected(e.to_string())),
        }
    }
}

/// True when the error chain bottoms out in a closed WebSocket or a
/// closed/reset socket.
fn is_disconnect(err: &(dyn std::error::Error + 'static)) -> bool {
    let mut cur = Some(err);
    while let Some(e) = cur {
        if let Some(ws) = e.downcast_ref::<tungstenite::Error>() {
            match ws {
                tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed => {
                    return true
                }
                tungstenite::Error::Io(io) if is_disconnect_kind(io.kind()) => return true,
                _ => {}
            }
        }
        if let Some(io) = e.downcast_ref::<io::Error>() {
            if is_disconnect_kind(io.kind()) {
                return true;
            }
        }
        cur = e.source();
    }
    false
}

fn is_disconnect_kind(kind: io::ErrorKind) -> bool {
    matches!(
        kind,
        io::ErrorKind::BrokenPipe
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::UnexpectedEof
    )
}
