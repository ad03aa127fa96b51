//! Settings type definitions.
//!
//! All types use `#[serde(rename_all = "camelCase", default)]` so a settings
//! file may contain any subset of fields; missing ones take the compiled
//! default.

mod capabilities;
mod server;

pub use capabilities::*;
pub use server::*;

use serde::{Deserialize, Serialize};

/// Root settings type.
///
/// ```json
/// {
///   "server": { "port": 9000 },
///   "eventBus": { "kind": "http", "relayUrl": "http://relay:8090/publish" }
/// }
/// ```
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VigilSettings {
    /// Settings schema version.
    pub version: String,
    /// Application name.
    pub name: String,
    /// Listener settings.
    pub server: ServerSettings,
    /// Intervention emitter settings.
    pub intervention: InterventionSettings,
    /// Outbound capability endpoints and timeouts.
    pub capabilities: CapabilitySettings,
    /// Activity relay settings.
    pub event_bus: EventBusSettings,
    /// Blacklist seed and sync settings.
    pub blacklist: BlacklistSettings,
    /// Logging configuration.
    pub logging: LoggingSettings,
}

impl Default for VigilSettings {
    fn default() -> Self {
        Self {
            version: "0.1.0".to_string(),
            name: "vigil".to_string(),
            server: ServerSettings::default(),
            intervention: InterventionSettings::default(),
            capabilities: CapabilitySettings::default(),
            event_bus: EventBusSettings::default(),
            blacklist: BlacklistSettings::default(),
            logging: LoggingSettings::default(),
        }
    }
}

/// Treat an empty string as "not configured".
pub(crate) fn non_empty(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}
