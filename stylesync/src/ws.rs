//! WebSocket client for the agent's `/ws/metrics` push stream.

use anyhow::Context;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use url::Url;

use crate::types::Metrics;

pub type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

pub const DEFAULT_URL: &str = "ws://localhost:8000/ws/metrics";

/// Checks that `raw` is a plain `ws://` URL; the agent serves no TLS.
pub fn parse_url(raw: &str) -> anyhow::Result<Url> {
    let url = Url::parse(raw).with_context(|| format!("invalid agent URL {raw:?}"))?;
    match url.scheme() {
        "ws" => Ok(url),
        "wss" => anyhow::bail!("unsupported scheme \"wss\"; the agent only speaks ws://"),
        other => anyhow::bail!("unsupported scheme {other:?}; expected ws://"),
    }
}

// Connect to the agent and return the WS stream
pub async fn connect(url: &Url) -> anyhow::Result<WsStream> {
    let (ws, _) = connect_async(url.as_str())
        .await
        .with_context(|| format!("connecting to {url}"))?;
    Ok(ws)
}

/// Waits for the next pushed snapshot. `Ok(None)` once the agent closes the stream.
pub async fn next_metrics(ws: &mut WsStream) -> anyhow::Result<Option<Metrics>> {
    while let Some(msg) = ws.next().await {
        match msg? {
            Message::Text(json) => {
                let m = serde_json::from_str::<Metrics>(&json).context("decoding snapshot")?;
                return Ok(Some(m));
            }
            Message::Close(_) => return Ok(None),
            // pings are answered by tungstenite on the next read
            _ => continue,
        }
    }
    Ok(None)
}

pub async fn close(ws: &mut WsStream) {
    let _ = ws.close(None).await;
    let _ = ws.flush().await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_plain_ws_only() {
        assert!(parse_url(DEFAULT_URL).is_ok());
        let err = parse_url("wss://metrics.local/ws/metrics").unwrap_err();
        assert!(err.to_string().contains("only speaks ws://"));
    }

    #[test]
    fn rejects_http_scheme() {
        let err = parse_url("http://localhost:8000/ws/metrics").unwrap_err();
        assert!(err.to_string().contains("unsupported scheme"));
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_url("not a url").is_err());
    }
}
