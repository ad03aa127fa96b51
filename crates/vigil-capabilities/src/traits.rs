//! Capability interfaces consumed by the vigil core.
//!
//! The core only ever sees these traits. Concrete implementations (HTTP
//! adapters, the in-memory blacklist, the registry-backed screen control in
//! `vigil-server`) are wired together in the composition root and injected as
//! `Arc<dyn Trait>`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use vigil_core::{ActionCommand, UrlCategory};

use crate::errors::Result;

// ─────────────────────────────────────────────────────────────────────────────
// Blacklist
// ─────────────────────────────────────────────────────────────────────────────

/// Lookup and insert of blocked applications and URLs.
#[async_trait]
pub trait Blacklist: Send + Sync {
    /// Whether the application (usually a window title) is blocked.
    async fn is_app_blocked(&self, app: &str) -> Result<bool>;

    /// Whether the URL is blocked.
    async fn is_url_blocked(&self, url: &str) -> Result<bool>;

    /// Add an application. Returns `false` if it was already listed.
    async fn add_app(&self, app: &str) -> Result<bool>;

    /// Add a URL fragment. Returns `false` if it was already listed.
    async fn add_url(&self, url: &str) -> Result<bool>;
}

// ─────────────────────────────────────────────────────────────────────────────
// Event bus
// ─────────────────────────────────────────────────────────────────────────────

/// Fire-and-forget relay of serialized activity records.
#[async_trait]
pub trait EventBus: Send + Sync {
    /// Publish `value` under `key` (the client id).
    async fn publish(&self, key: &str, value: Vec<u8>) -> Result<()>;
}

// ─────────────────────────────────────────────────────────────────────────────
// Actuators
// ─────────────────────────────────────────────────────────────────────────────

/// Sabotage command service triggered by blacklist hits.
#[async_trait]
pub trait SabotageDispatcher: Send + Sync {
    /// Dispatch one sabotage command.
    async fn dispatch(&self, command: &ActionCommand) -> Result<()>;
}

/// Physical-control device (speaker, vibration motor).
#[async_trait]
pub trait PhysicalControl: Send + Sync {
    /// Carry out a physical action.
    async fn dispatch(&self, command: &ActionCommand) -> Result<()>;
}

/// On-screen control of a connected client.
#[async_trait]
pub trait ScreenControl: Send + Sync {
    /// Translate an action into a wire command and push it to the client.
    async fn send_action(&self, command: &ActionCommand) -> Result<()>;

    /// Display externally computed result text on the client.
    async fn send_result(&self, client_id: &str, markdown: &str) -> Result<()>;
}

// ─────────────────────────────────────────────────────────────────────────────
// Intelligence
// ─────────────────────────────────────────────────────────────────────────────

/// Verdict returned for a submitted application list.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AppListVerdict {
    /// Human-readable explanation.
    pub message: String,
    /// Action to take (`CLOSE_APP`, `BLOCK_URL`, ...). Empty means none.
    pub command: String,
    /// Application the command targets.
    pub target_app: String,
}

impl AppListVerdict {
    /// Whether the verdict asks for an action.
    pub fn has_command(&self) -> bool {
        !self.command.trim().is_empty()
    }
}

/// AI service for log analysis, URL classification and app-list review.
///
/// Each call carries its own timeout; analysis is expected to take far
/// longer than classification.
#[async_trait]
pub trait Intelligence: Send + Sync {
    /// Analyze an error log. Returns markdown, or `None` when the service
    /// reported it could not produce an analysis.
    async fn analyze_log(
        &self,
        client_id: &str,
        error_log: &str,
        scream_text: &str,
    ) -> Result<Option<String>>;

    /// Classify a URL and page title.
    async fn classify_url(&self, client_id: &str, url: &str, title: &str) -> Result<UrlCategory>;

    /// Submit the client's running applications as JSON.
    async fn submit_app_list(&self, apps_json: &str) -> Result<AppListVerdict>;
}
