//! Routing of peer-sourced actions and results into live sessions.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use metrics::counter;
use tracing::{debug, info, warn};
use vigil_capabilities::{CapabilityError, PhysicalControl, ScreenControl};
use vigil_core::{ActionCommand, ActionKind, ServerCommand};

use crate::metrics::{CAPABILITY_ERRORS_TOTAL, COMMANDS_ROUTED_TOTAL};
use crate::registry::{Delivery, SessionRegistry};

/// Prefix of the display payload for a blocked URL.
pub const BLOCK_URL_PREFIX: &str = "BLOCK_URL:";

/// Map a domain action onto the wire command the client understands.
///
/// The mapping is lossy: several actions share one wire kind, and anything
/// the client has no command for falls back to an attention grab.
pub fn screen_command_for(action: &ActionCommand) -> ServerCommand {
    match action.action_type {
        ActionKind::BlockUrl => {
            let url = action.target_url.as_deref().unwrap_or(&action.message);
            ServerCommand::display_message(format!("{BLOCK_URL_PREFIX}{url}"))
        }
        ActionKind::CloseApp | ActionKind::SleepScreen => ServerCommand::block_screen(action.message.as_str()),
        ActionKind::MinimizeAll | ActionKind::Tts | ActionKind::Vibrate | ActionKind::Other(_) => {
            ServerCommand::attention_grab(action.message.as_str())
        }
    }
}

/// Screen control over the session registry.
pub struct RegistryScreenControl {
    registry: Arc<SessionRegistry>,
}

impl RegistryScreenControl {
    /// Create a screen control sending through `registry`.
    pub fn new(registry: Arc<SessionRegistry>) -> Self {
        Self { registry }
    }

    async fn deliver(&self, client_id: &str, command: ServerCommand) -> vigil_capabilities::Result<()> {
        match self.registry.send(client_id, command).await {
            Ok(Delivery::Sent) => Ok(()),
            Ok(Delivery::NoSession) => {
                debug!(client_id, "no session to route to");
                Ok(())
            }
            Err(error) => Err(CapabilityError::Delivery(error.to_string())),
        }
    }
}

#[async_trait]
impl ScreenControl for RegistryScreenControl {
    async fn send_action(&self, command: &ActionCommand) -> vigil_capabilities::Result<()> {
        self.deliver(&command.client_id, screen_command_for(command)).await
    }

    async fn send_result(&self, client_id: &str, markdown: &str) -> vigil_capabilities::Result<()> {
        self.deliver(client_id, ServerCommand::display_message(markdown)).await
    }
}

/// Which actuator a command went to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Physical control peer.
    Physical,
    /// Client screen via the registry.
    Screen,
}

impl Route {
    /// Label used in logs and metrics.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Physical => "physical",
            Self::Screen => "screen",
        }
    }

    /// Route chosen by action kind.
    pub fn for_action(kind: &ActionKind) -> Self {
        if kind.is_physical() { Self::Physical } else { Self::Screen }
    }
}

/// Stateless dispatcher for peer-sourced action commands.
#[derive(Clone)]
pub struct CommandRouter {
    physical: Arc<dyn PhysicalControl>,
    screen: Arc<dyn ScreenControl>,
    timeout: Duration,
}

impl CommandRouter {
    /// Create a router. `timeout` bounds each dispatch.
    pub fn new(physical: Arc<dyn PhysicalControl>, screen: Arc<dyn ScreenControl>, timeout: Duration) -> Self {
        Self {
            physical,
            screen,
            timeout,
        }
    }

    /// Forward `command` to the actuator its kind selects.
    pub async fn dispatch(&self, command: &ActionCommand) -> vigil_capabilities::Result<Route> {
        let route = Route::for_action(&command.action_type);
        info!(
            client_id = %command.client_id,
            action = %command.action_type,
            intensity = command.intensity,
            route = route.as_str(),
            "routing command"
        );
        if let ActionKind::Other(name) = &command.action_type {
            warn!(action = %name, "unrecognised action kind, using fallback");
        }

        let call = async {
            match route {
                Route::Physical => self.physical.dispatch(command).await,
                Route::Screen => self.screen.send_action(command).await,
            }
        };
        let result = tokio::time::timeout(self.timeout, call)
            .await
            .unwrap_or_else(|_| Err(CapabilityError::timeout(self.timeout)));

        match result {
            Ok(()) => {
                counter!(COMMANDS_ROUTED_TOTAL, "route" => route.as_str()).increment(1);
                Ok(route)
            }
            Err(error) => {
                counter!(CAPABILITY_ERRORS_TOTAL, "capability" => route.as_str()).increment(1);
                warn!(client_id = %command.client_id, route = route.as_str(), %error, "command dispatch failed");
                Err(error)
            }
        }
    }
}

/// Pushes externally computed results to a client's screen.
#[derive(Clone)]
pub struct SolutionRouter {
    screen: Arc<dyn ScreenControl>,
}

impl SolutionRouter {
    /// Create a router over `screen`.
    pub fn new(screen: Arc<dyn ScreenControl>) -> Self {
        Self { screen }
    }

    /// Display `markdown` on the client. A missing session is not an error.
    pub async fn route(&self, client_id: &str, markdown: &str) -> vigil_capabilities::Result<()> {
        info!(client_id, len = markdown.len(), "routing solution");
        self.screen.send_result(client_id, markdown).await.inspect_err(|error| {
            counter!(CAPABILITY_ERRORS_TOTAL, "capability" => "screen").increment(1);
            warn!(client_id, %error, "solution delivery failed");
        })
    }
}
