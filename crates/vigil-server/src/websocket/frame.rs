//! Frame codec: inbound heartbeat frames, outbound command frames.
//!
//! Text and UTF-8 binary frames each carry one JSON heartbeat. A frame that
//! does not decode is logged and skipped; only a socket error ends the
//! stream with an error. A close frame ends it cleanly.

use axum::extract::ws::Message;
use futures::{Stream, StreamExt, future};
use metrics::counter;
use tracing::{debug, warn};
use vigil_core::{Heartbeat, ServerCommand};

use crate::metrics::HEARTBEAT_DECODE_ERRORS_TOTAL;

/// Parse one heartbeat from frame text.
pub fn decode_heartbeat(text: &str) -> Result<Heartbeat, serde_json::Error> {
    serde_json::from_str(text)
}

/// Serialize a command as one text frame.
pub fn encode_command(command: &ServerCommand) -> Result<Message, serde_json::Error> {
    serde_json::to_string(command).map(|json| Message::Text(json.into()))
}

fn decode_frame(message: &Message) -> Option<Heartbeat> {
    let text = match message {
        Message::Text(text) => text.as_str(),
        Message::Binary(data) => {
            let Ok(text) = std::str::from_utf8(data) else {
                warn!(len = data.len(), "non-UTF-8 binary frame skipped");
                counter!(HEARTBEAT_DECODE_ERRORS_TOTAL).increment(1);
                return None;
            };
            text
        }
        Message::Ping(_) | Message::Pong(_) | Message::Close(_) => return None,
    };

    match decode_heartbeat(text) {
        Ok(hb) => Some(hb),
        Err(error) => {
            warn!(%error, len = text.len(), "undecodable heartbeat skipped");
            counter!(HEARTBEAT_DECODE_ERRORS_TOTAL).increment(1);
            None
        }
    }
}

/// Adapt a socket's frame stream into a heartbeat stream.
pub fn heartbeat_stream<S, E>(frames: S) -> impl Stream<Item = Result<Heartbeat, E>>
where
    S: Stream<Item = Result<Message, E>>,
{
    frames
        .take_while(|frame| {
            let open = !matches!(frame, Ok(Message::Close(_)));
            if !open {
                debug!("client sent close frame");
            }
            future::ready(open)
        })
        .filter_map(|frame| {
            future::ready(match frame {
                Ok(message) => decode_frame(&message).map(Ok),
                Err(error) => Some(Err(error)),
            })
        })
}
