//! Reflex fast-path: blacklist short-circuit plus best-effort event relay.
//!
//! Both effects run for every activity record. The relay is spawned first so
//! a slow or failing blacklist never delays it, and a failing relay never
//! suppresses the block. Only the blacklist lookup is awaited; the sabotage
//! dispatch runs in its own task so a hung peer cannot hold up the caller.

use std::sync::Arc;
use std::time::Duration;

use metrics::counter;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use vigil_capabilities::{Blacklist, CapabilityError, EventBus, SabotageDispatcher};
use vigil_core::{ActionCommand, ActionKind, ActivityRecord};

use crate::metrics::{CAPABILITY_ERRORS_TOTAL, REFLEX_BLOCKS_TOTAL};

/// Intensity of reflex sabotage commands.
pub const REFLEX_INTENSITY: u8 = 5;

/// What the fast-path did with one record.
#[derive(Debug, Default)]
pub struct ReflexOutcome {
    /// The sabotage action issued, if the record hit the blacklist.
    pub blocked: Option<ActionKind>,
    /// The spawned relay task, absent when no event bus is configured.
    pub relay: Option<JoinHandle<()>>,
    /// The spawned sabotage dispatch, present exactly when `blocked` is.
    pub sabotage: Option<JoinHandle<()>>,
}

/// Reflex fast-path over injected capabilities.
#[derive(Clone)]
pub struct ReflexPath {
    blacklist: Arc<dyn Blacklist>,
    sabotage: Arc<dyn SabotageDispatcher>,
    event_bus: Option<Arc<dyn EventBus>>,
    timeout: Duration,
}

impl ReflexPath {
    /// Create a fast-path. `timeout` bounds the blacklist lookup and the
    /// sabotage dispatch.
    pub fn new(
        blacklist: Arc<dyn Blacklist>,
        sabotage: Arc<dyn SabotageDispatcher>,
        event_bus: Option<Arc<dyn EventBus>>,
        timeout: Duration,
    ) -> Self {
        Self {
            blacklist,
            sabotage,
            event_bus,
            timeout,
        }
    }

    /// Run both effects for `record`. Never fails; capability errors are
    /// logged and counted.
    pub async fn handle(&self, record: ActivityRecord) -> ReflexOutcome {
        let relay = self.spawn_relay(&record);
        let Some(command) = self.check(&record).await else {
            return ReflexOutcome {
                relay,
                ..ReflexOutcome::default()
            };
        };

        let kind = command.action_type.clone();
        info!(client_id = %command.client_id, action = %kind, target = %command.message, "blacklist hit");
        counter!(REFLEX_BLOCKS_TOTAL, "kind" => kind.as_str().to_owned()).increment(1);

        ReflexOutcome {
            blocked: Some(kind),
            relay,
            sabotage: Some(self.spawn_sabotage(command)),
        }
    }

    fn spawn_relay(&self, record: &ActivityRecord) -> Option<JoinHandle<()>> {
        let bus = self.event_bus.clone()?;
        let key = record.client_id().to_owned();
        let value = match serde_json::to_vec(record) {
            Ok(value) => value,
            Err(error) => {
                warn!(client_id = %key, %error, "failed to encode activity record");
                return None;
            }
        };

        Some(tokio::spawn(async move {
            match bus.publish(&key, value).await {
                Ok(()) => debug!(client_id = %key, "activity relayed"),
                Err(error) => {
                    counter!(CAPABILITY_ERRORS_TOTAL, "capability" => "event_bus").increment(1);
                    warn!(client_id = %key, %error, "event bus publish failed");
                }
            }
        }))
    }

    fn spawn_sabotage(&self, command: ActionCommand) -> JoinHandle<()> {
        let sabotage = self.sabotage.clone();
        let timeout = self.timeout;
        tokio::spawn(async move {
            let dispatched = tokio::time::timeout(timeout, sabotage.dispatch(&command))
                .await
                .unwrap_or_else(|_| Err(CapabilityError::timeout(timeout)));
            match dispatched {
                Ok(()) => debug!(client_id = %command.client_id, action = %command.action_type, "sabotage dispatched"),
                Err(error) => {
                    counter!(CAPABILITY_ERRORS_TOTAL, "capability" => "sabotage").increment(1);
                    warn!(client_id = %command.client_id, action = %command.action_type, %error, "sabotage dispatch failed");
                }
            }
        })
    }

    /// The sabotage command for `record`, if it hits the blacklist. URLs are
    /// checked before apps.
    async fn check(&self, record: &ActivityRecord) -> Option<ActionCommand> {
        let client_id = record.client_id();
        if let Some(url) = record.url().filter(|u| !u.is_empty()) {
            let blocked = self.lookup(client_id, self.blacklist.is_url_blocked(url)).await;
            blocked.then(|| {
                ActionCommand::new(client_id, ActionKind::BlockUrl, REFLEX_INTENSITY, url).with_target_url(url)
            })
        } else if let Some(app) = record.app_name().filter(|a| !a.is_empty()) {
            let blocked = self.lookup(client_id, self.blacklist.is_app_blocked(app)).await;
            blocked.then(|| ActionCommand::new(client_id, ActionKind::CloseApp, REFLEX_INTENSITY, app))
        } else {
            None
        }
    }

    async fn lookup<F>(&self, client_id: &str, check: F) -> bool
    where
        F: Future<Output = vigil_capabilities::Result<bool>>,
    {
        match tokio::time::timeout(self.timeout, check).await {
            Ok(Ok(blocked)) => blocked,
            Ok(Err(error)) => {
                counter!(CAPABILITY_ERRORS_TOTAL, "capability" => "blacklist").increment(1);
                warn!(client_id, %error, "blacklist lookup failed");
                false
            }
            Err(_) => {
                counter!(CAPABILITY_ERRORS_TOTAL, "capability" => "blacklist").increment(1);
                warn!(client_id, timeout = ?self.timeout, "blacklist lookup timed out");
                false
            }
        }
    }
}
