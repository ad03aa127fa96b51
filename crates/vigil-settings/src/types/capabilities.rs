//! Outbound capability settings: peer endpoints, timeouts, event bus, blacklist.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::non_empty;

/// Peer service endpoints and per-call timeouts.
///
/// An empty URL leaves the capability unconfigured; calls to it fail with an
/// "unavailable" error that callers log and absorb.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CapabilitySettings {
    /// Physical-control device service.
    pub physical_control_url: String,
    /// Sabotage command service.
    pub sabotage_url: String,
    /// AI/intelligence service.
    pub intelligence_url: String,
    /// Timeout for routine routing calls, in milliseconds.
    pub routing_timeout_ms: u64,
    /// Timeout for log analysis, in milliseconds.
    pub analysis_timeout_ms: u64,
    /// Timeout for URL classification, in milliseconds.
    pub classify_timeout_ms: u64,
    /// Timeout for app-list submission, in milliseconds.
    pub app_list_timeout_ms: u64,
}

impl CapabilitySettings {
    /// Configured physical-control endpoint.
    pub fn physical_control_endpoint(&self) -> Option<&str> {
        non_empty(&self.physical_control_url)
    }

    /// Configured sabotage endpoint.
    pub fn sabotage_endpoint(&self) -> Option<&str> {
        non_empty(&self.sabotage_url)
    }

    /// Configured intelligence endpoint.
    pub fn intelligence_endpoint(&self) -> Option<&str> {
        non_empty(&self.intelligence_url)
    }

    /// Routine routing timeout.
    pub fn routing_timeout(&self) -> Duration {
        Duration::from_millis(self.routing_timeout_ms)
    }

    /// Log analysis timeout.
    pub fn analysis_timeout(&self) -> Duration {
        Duration::from_millis(self.analysis_timeout_ms)
    }

    /// URL classification timeout.
    pub fn classify_timeout(&self) -> Duration {
        Duration::from_millis(self.classify_timeout_ms)
    }

    /// App-list submission timeout.
    pub fn app_list_timeout(&self) -> Duration {
        Duration::from_millis(self.app_list_timeout_ms)
    }
}

impl Default for CapabilitySettings {
    fn default() -> Self {
        Self {
            physical_control_url: "http://127.0.0.1:50051".to_string(),
            sabotage_url: "http://127.0.0.1:50053".to_string(),
            intelligence_url: "http://127.0.0.1:50054".to_string(),
            routing_timeout_ms: 3_000,
            analysis_timeout_ms: 30_000,
            classify_timeout_ms: 10_000,
            app_list_timeout_ms: 5_000,
        }
    }
}

/// Which event bus implementation relays activity records.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventBusKind {
    /// No relay; publishing is skipped.
    #[default]
    Disabled,
    /// POST each record to `relayUrl`.
    Http,
    /// In-process broadcast channel.
    Local,
}

/// Activity relay settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EventBusSettings {
    /// Relay implementation.
    pub kind: EventBusKind,
    /// Relay endpoint for [`EventBusKind::Http`].
    pub relay_url: String,
    /// Topic name attached to every publish.
    pub topic: String,
    /// Channel capacity for [`EventBusKind::Local`].
    pub local_capacity: usize,
}

impl EventBusSettings {
    /// Configured relay endpoint.
    pub fn relay_endpoint(&self) -> Option<&str> {
        non_empty(&self.relay_url)
    }
}

impl Default for EventBusSettings {
    fn default() -> Self {
        Self {
            kind: EventBusKind::Disabled,
            relay_url: String::new(),
            topic: "client-activity".to_string(),
            local_capacity: 1024,
        }
    }
}

/// Blacklist seed entries and background sync.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BlacklistSettings {
    /// App names blocked from startup (case-insensitive substring match).
    pub apps: Vec<String>,
    /// URL fragments blocked from startup (case-insensitive substring match).
    pub urls: Vec<String>,
    /// Data service endpoint listing additional blocked apps.
    pub sync_url: String,
    /// Delay before the sync request, in milliseconds.
    pub sync_delay_ms: u64,
}

impl BlacklistSettings {
    /// Configured sync endpoint.
    pub fn sync_endpoint(&self) -> Option<&str> {
        non_empty(&self.sync_url)
    }

    /// Sync delay as a [`Duration`].
    pub fn sync_delay(&self) -> Duration {
        Duration::from_millis(self.sync_delay_ms)
    }
}

impl Default for BlacklistSettings {
    fn default() -> Self {
        Self {
            apps: vec![
                "steam".to_string(),
                "league of legends".to_string(),
                "battle.net".to_string(),
            ],
            urls: vec![
                "youtube.com".to_string(),
                "netflix.com".to_string(),
                "twitch.tv".to_string(),
            ],
            sync_url: String::new(),
            sync_delay_ms: 2_000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capability_defaults() {
        let c = CapabilitySettings::default();
        assert_eq!(c.physical_control_endpoint(), Some("http://127.0.0.1:50051"));
        assert_eq!(c.analysis_timeout(), Duration::from_secs(30));
        assert_eq!(c.classify_timeout(), Duration::from_secs(10));
        assert_eq!(c.app_list_timeout(), Duration::from_secs(5));
        assert_eq!(c.routing_timeout(), Duration::from_secs(3));
    }

    #[test]
    fn empty_url_is_unconfigured() {
        let c = CapabilitySettings {
            sabotage_url: String::new(),
            ..CapabilitySettings::default()
        };
        assert!(c.sabotage_endpoint().is_none());
    }

    #[test]
    fn event_bus_kind_wire_names() {
        let s: EventBusSettings =
            serde_json::from_str(r#"{"kind": "http", "relayUrl": "http://relay"}"#).unwrap();
        assert_eq!(s.kind, EventBusKind::Http);
        assert_eq!(s.relay_endpoint(), Some("http://relay"));
        assert_eq!(s.topic, "client-activity");
    }

    #[test]
    fn blacklist_defaults_seed_entries() {
        let b = BlacklistSettings::default();
        assert!(b.apps.iter().any(|a| a == "steam"));
        assert!(b.urls.iter().any(|u| u == "youtube.com"));
        assert_eq!(b.sync_delay(), Duration::from_secs(2));
    }
}
