//! Activity relay implementations.
//!
//! - [`HttpEventBus`] POSTs `{topic, key, value}` to a relay endpoint.
//! - [`BroadcastEventBus`] fans records out to in-process subscribers.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::trace;

use crate::adapters::post_ack;
use crate::connection::{HttpHandle, LazyConnection};
use crate::errors::Result;
use crate::traits::EventBus;

/// One published message.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct BusMessage {
    /// Topic the message was published on.
    pub topic: String,
    /// Partition key (client id).
    pub key: String,
    /// Serialized activity record, UTF-8 JSON.
    pub value: String,
}

/// Relays records to an HTTP endpoint.
pub struct HttpEventBus {
    conn: LazyConnection<HttpHandle>,
    topic: String,
    timeout: Duration,
}

impl HttpEventBus {
    /// Create a disconnected relay.
    pub fn new(endpoint: impl Into<String>, topic: impl Into<String>, timeout: Duration) -> Self {
        Self {
            conn: LazyConnection::new("event_bus", Some(endpoint.into())),
            topic: topic.into(),
            timeout,
        }
    }
}

#[async_trait]
impl EventBus for HttpEventBus {
    async fn publish(&self, key: &str, value: Vec<u8>) -> Result<()> {
        let message = BusMessage {
            topic: self.topic.clone(),
            key: key.to_owned(),
            value: String::from_utf8_lossy(&value).into_owned(),
        };
        // the relay endpoint is the full publish URL
        post_ack(&self.conn, "", &message, self.timeout).await
    }
}

/// In-process bus over a `tokio::sync::broadcast` channel.
pub struct BroadcastEventBus {
    topic: String,
    tx: broadcast::Sender<BusMessage>,
}

impl BroadcastEventBus {
    /// Create a bus holding at most `capacity` unread messages per subscriber.
    pub fn new(topic: impl Into<String>, capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self {
            topic: topic.into(),
            tx,
        }
    }

    /// Subscribe to future messages.
    pub fn subscribe(&self) -> broadcast::Receiver<BusMessage> {
        self.tx.subscribe()
    }
}

#[async_trait]
impl EventBus for BroadcastEventBus {
    async fn publish(&self, key: &str, value: Vec<u8>) -> Result<()> {
        let message = BusMessage {
            topic: self.topic.clone(),
            key: key.to_owned(),
            value: String::from_utf8_lossy(&value).into_owned(),
        };
        // No subscribers is not a failure; the record is simply dropped.
        if self.tx.send(message).is_err() {
            trace!(key, "no event bus subscribers");
        }
        Ok(())
    }
}
