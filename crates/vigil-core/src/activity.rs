//! Activity records fed to the reflex path and relayed to the event bus.
//!
//! Records come from two places: heartbeats, and activity events posted by
//! client agents (page visits, app switches). They are built in a single step
//! and never mutated afterwards, so a record can be moved into a background
//! publish task without sharing.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::heartbeat::Heartbeat;

/// What kind of client activity a record describes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActivityKind {
    /// A page visit.
    UrlVisit,
    /// An application came to the foreground.
    AppOpen,
    /// An application was closed.
    AppClose,
    /// The user went idle.
    IdleStart,
    /// The user came back.
    IdleEnd,
    /// Aggregated keyboard/mouse usage from a heartbeat.
    InputUsage,
}

/// Immutable snapshot of client activity.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityRecord {
    client_id: String,
    activity_type: ActivityKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    app_name: Option<String>,
    #[serde(default = "Utc::now")]
    timestamp: DateTime<Utc>,
    #[serde(default)]
    metadata: BTreeMap<String, String>,
}

impl ActivityRecord {
    /// Build an input-usage record from a heartbeat.
    ///
    /// The focused window title doubles as the app name for blacklist checks.
    pub fn from_heartbeat(client_id: &str, hb: &Heartbeat, timestamp: DateTime<Utc>) -> Self {
        let metadata = BTreeMap::from([
            ("keystroke_count".to_owned(), hb.keystroke_count.to_string()),
            ("mouse_distance".to_owned(), hb.mouse_distance.to_string()),
            ("click_count".to_owned(), hb.click_count.to_string()),
            ("entropy".to_owned(), format!("{:.2}", hb.keyboard_entropy)),
            ("window_title".to_owned(), hb.active_window_title.clone()),
            ("is_dragging".to_owned(), hb.is_dragging.to_string()),
            ("avg_dwell_time".to_owned(), format!("{:.2}", hb.avg_dwell_time)),
            ("eyes_closed".to_owned(), hb.is_eyes_closed.to_string()),
        ]);
        let app_name = (!hb.active_window_title.is_empty()).then(|| hb.active_window_title.clone());
        Self {
            client_id: client_id.to_owned(),
            activity_type: ActivityKind::InputUsage,
            url: None,
            app_name,
            timestamp,
            metadata,
        }
    }

    /// Build a record with every field supplied up front.
    pub fn new(
        client_id: impl Into<String>,
        activity_type: ActivityKind,
        url: Option<String>,
        app_name: Option<String>,
        timestamp: DateTime<Utc>,
        metadata: BTreeMap<String, String>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            activity_type,
            url,
            app_name,
            timestamp,
            metadata,
        }
    }

    /// Originating client.
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Record kind.
    pub fn activity_type(&self) -> ActivityKind {
        self.activity_type
    }

    /// Visited URL, if any.
    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    /// Foreground application, if any.
    pub fn app_name(&self) -> Option<&str> {
        self.app_name.as_deref()
    }

    /// When the activity was observed.
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Free-form string metadata.
    pub fn metadata(&self) -> &BTreeMap<String, String> {
        &self.metadata
    }

    /// Whether this is a URL visit with a URL attached.
    pub fn is_url_activity(&self) -> bool {
        self.activity_type == ActivityKind::UrlVisit && self.url.is_some()
    }

    /// Whether this is an app open/close with an app name attached.
    pub fn is_app_activity(&self) -> bool {
        matches!(self.activity_type, ActivityKind::AppOpen | ActivityKind::AppClose)
            && self.app_name.is_some()
    }
}
