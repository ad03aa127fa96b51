//! WebSocket session lifecycle, from upgrade through disconnect.

use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use metrics::counter;
use tokio::sync::mpsc;
use tracing::{debug, warn};
use vigil_core::ServerCommand;

use super::frame::{encode_command, heartbeat_stream};
use crate::pipeline::{HeartbeatPipeline, SessionEnd};

/// Interval between server-initiated Ping frames.
const PING_INTERVAL: Duration = Duration::from_secs(30);

/// How long queued commands may take to flush after the session ends.
const FLUSH_TIMEOUT: Duration = Duration::from_secs(1);

/// Run one client connection.
///
/// The read half feeds the heartbeat pipeline; a spawned forwarder drains the
/// session's outbound queue into the write half and keeps the socket alive
/// with periodic pings.
pub async fn run_ws_session(ws: WebSocket, pipeline: HeartbeatPipeline, outbound_buffer: usize) -> SessionEnd {
    let (mut ws_tx, ws_rx) = ws.split();
    let (send_tx, mut send_rx) = mpsc::channel::<ServerCommand>(outbound_buffer.max(1));
    counter!("ws_connections_total").increment(1);

    let mut outbound = tokio::spawn(async move {
        let mut ping_interval = tokio::time::interval(PING_INTERVAL);
        // skip the immediate first tick
        let _ = ping_interval.tick().await;

        loop {
            tokio::select! {
                cmd = send_rx.recv() => {
                    let Some(cmd) = cmd else { break };
                    let frame = match encode_command(&cmd) {
                        Ok(frame) => frame,
                        Err(error) => {
                            warn!(%error, kind = ?cmd.kind, "failed to encode command");
                            continue;
                        }
                    };
                    if ws_tx.send(frame).await.is_err() {
                        debug!("socket closed while sending");
                        break;
                    }
                }
                _ = ping_interval.tick() => {
                    if ws_tx.send(Message::Ping(Vec::new().into())).await.is_err() {
                        break;
                    }
                }
            }
        }
        let _ = ws_tx.close().await;
    });

    let end = pipeline.run_session(heartbeat_stream(ws_rx), send_tx).await;

    // The session dropped its sender; let queued commands drain.
    if tokio::time::timeout(FLUSH_TIMEOUT, &mut outbound).await.is_err() {
        debug!("outbound forwarder still busy, aborting");
    }
    outbound.abort();
    counter!("ws_disconnections_total").increment(1);
    end
}
