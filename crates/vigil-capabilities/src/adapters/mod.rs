//! HTTP adapters for peer services.
//!
//! Every adapter owns a [`LazyConnection`] to its endpoint and wraps each
//! call in a `tokio::time::timeout`. Peers answer JSON; an acknowledgement
//! body may be empty or `{"success": bool, "message": string}`.

mod intelligence;
mod physical;
mod sabotage;

pub use intelligence::{HttpIntelligence, IntelligenceTimeouts};
pub use physical::HttpPhysicalControl;
pub use sabotage::HttpSabotageDispatcher;

use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::connection::{HttpHandle, LazyConnection};
use crate::errors::{CapabilityError, Result};

/// Acknowledgement body returned by actuator services.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct Ack {
    success: Option<bool>,
    message: String,
}

async fn send_json<B: Serialize + ?Sized>(
    conn: &LazyConnection<HttpHandle>,
    path: &str,
    body: &B,
) -> Result<(u16, Vec<u8>)> {
    let handle = conn.get_or_connect(HttpHandle::open)?;
    let response = handle.client().post(handle.url(path)).json(body).send().await?;
    let status = response.status();
    if !status.is_success() {
        let message = response.text().await.unwrap_or_default();
        return Err(CapabilityError::Rejected {
            status: status.as_u16(),
            message,
        });
    }
    let bytes = response.bytes().await?;
    Ok((status.as_u16(), bytes.to_vec()))
}

/// POST `body` and decode the JSON response, bounded by `timeout`.
pub(crate) async fn post_json<B, R>(
    conn: &LazyConnection<HttpHandle>,
    path: &str,
    body: &B,
    timeout: Duration,
) -> Result<R>
where
    B: Serialize + ?Sized + Sync,
    R: DeserializeOwned,
{
    let (_, bytes) = tokio::time::timeout(timeout, send_json(conn, path, body))
        .await
        .map_err(|_| CapabilityError::timeout(timeout))??;
    Ok(serde_json::from_slice(&bytes)?)
}

/// POST `body` and require an acknowledgement, bounded by `timeout`.
pub(crate) async fn post_ack<B>(
    conn: &LazyConnection<HttpHandle>,
    path: &str,
    body: &B,
    timeout: Duration,
) -> Result<()>
where
    B: Serialize + ?Sized + Sync,
{
    let (status, bytes) = tokio::time::timeout(timeout, send_json(conn, path, body))
        .await
        .map_err(|_| CapabilityError::timeout(timeout))??;
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(());
    }
    let ack: Ack = serde_json::from_slice(&bytes)?;
    if ack.success == Some(false) {
        return Err(CapabilityError::Rejected {
            status,
            message: ack.message,
        });
    }
    Ok(())
}
