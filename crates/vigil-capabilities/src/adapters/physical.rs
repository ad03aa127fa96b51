//! Physical-control device adapter.

use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;
use vigil_core::ActionCommand;

use super::post_ack;
use crate::connection::{HttpHandle, LazyConnection};
use crate::errors::Result;
use crate::traits::PhysicalControl;

/// Forwards physical actions (`TTS`, `VIBRATE`) to the device service at
/// `POST {endpoint}/v1/actions`.
pub struct HttpPhysicalControl {
    conn: LazyConnection<HttpHandle>,
    timeout: Duration,
}

impl HttpPhysicalControl {
    /// Create a disconnected adapter.
    pub fn new(endpoint: Option<String>, timeout: Duration) -> Self {
        Self {
            conn: LazyConnection::new("physical_control", endpoint),
            timeout,
        }
    }
}

#[async_trait]
impl PhysicalControl for HttpPhysicalControl {
    async fn dispatch(&self, command: &ActionCommand) -> Result<()> {
        debug!(
            client_id = %command.client_id,
            action = %command.action_type,
            intensity = command.intensity,
            "dispatching physical action"
        );
        post_ack(&self.conn, "v1/actions", command, self.timeout).await
    }
}
