//! Sabotage command service adapter.

use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;
use vigil_core::ActionCommand;

use super::post_ack;
use crate::connection::{HttpHandle, LazyConnection};
use crate::errors::Result;
use crate::traits::SabotageDispatcher;

/// Sends sabotage commands to `POST {endpoint}/v1/sabotage`.
pub struct HttpSabotageDispatcher {
    conn: LazyConnection<HttpHandle>,
    timeout: Duration,
}

impl HttpSabotageDispatcher {
    /// Create a disconnected adapter.
    pub fn new(endpoint: Option<String>, timeout: Duration) -> Self {
        Self {
            conn: LazyConnection::new("sabotage", endpoint),
            timeout,
        }
    }
}

#[async_trait]
impl SabotageDispatcher for HttpSabotageDispatcher {
    async fn dispatch(&self, command: &ActionCommand) -> Result<()> {
        debug!(
            client_id = %command.client_id,
            action = %command.action_type,
            "dispatching sabotage command"
        );
        post_ack(&self.conn, "v1/sabotage", command, self.timeout).await
    }
}
