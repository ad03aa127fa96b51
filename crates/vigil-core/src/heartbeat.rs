//! Heartbeat snapshots streamed by client agents.
//!
//! One JSON object per frame, camelCase keys. Counters default to zero and the
//! optional sensor fields (`headPitch`, `urlCategory`) default to "unavailable".

use std::fmt;

use serde::{Deserialize, Serialize};

/// Client identity used when the first heartbeat carries no `clientId`.
pub const UNKNOWN_CLIENT_ID: &str = "unknown";

/// Category assigned to the page the client is looking at.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UrlCategory {
    /// Learning material.
    Study,
    /// Work-related content.
    Work,
    /// Games, video, social media.
    Play,
    /// Nothing notable.
    #[default]
    Neutral,
    /// Classifier could not decide.
    #[serde(other)]
    Unknown,
}

impl UrlCategory {
    /// Wire name of the category.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Study => "STUDY",
            Self::Work => "WORK",
            Self::Play => "PLAY",
            Self::Neutral => "NEUTRAL",
            Self::Unknown => "UNKNOWN",
        }
    }

    /// Parse a wire name, mapping anything unrecognised to [`UrlCategory::Unknown`].
    pub fn parse(value: &str) -> Self {
        match value {
            "STUDY" => Self::Study,
            "WORK" => Self::Work,
            "PLAY" => Self::Play,
            "NEUTRAL" => Self::Neutral,
            _ => Self::Unknown,
        }
    }
}

impl fmt::Display for UrlCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Periodic status report from one client.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Heartbeat {
    /// Client identity. Empty when the agent did not send one.
    pub client_id: String,
    /// Keys pressed since the previous heartbeat.
    pub keystroke_count: u32,
    /// Pointer travel since the previous heartbeat.
    pub mouse_distance: u32,
    /// Clicks since the previous heartbeat.
    pub click_count: u32,
    /// Shannon entropy of recent key presses.
    pub keyboard_entropy: f64,
    /// Title of the focused window.
    pub active_window_title: String,
    /// Whether a drag gesture is in progress.
    pub is_dragging: bool,
    /// Average key dwell time in milliseconds.
    pub avg_dwell_time: f64,
    /// Whether the gaze model saw closed eyes.
    pub is_eyes_closed: bool,
    /// Gaze concentration in `0.0..=1.0`.
    pub concentration_score: f64,
    /// Head pitch in degrees, negative when looking down.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub head_pitch: Option<f64>,
    /// Category of the active page, when the agent classified it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url_category: Option<UrlCategory>,
}

impl Heartbeat {
    /// Identity to register the session under.
    pub fn client_id_or_unknown(&self) -> &str {
        if self.client_id.is_empty() {
            UNKNOWN_CLIENT_ID
        } else {
            &self.client_id
        }
    }

    /// Unit-less sum of keystrokes, clicks and mouse distance.
    pub fn os_activity(&self) -> u64 {
        u64::from(self.keystroke_count) + u64::from(self.click_count) + u64::from(self.mouse_distance)
    }

    /// Concentration scaled to `0..=100` and rounded half away from zero.
    pub fn vision_score(&self) -> u8 {
        (self.concentration_score * 100.0).round().clamp(0.0, 100.0) as u8
    }

    /// Head pitch, `0.0` when the agent has no head tracking.
    pub fn head_pitch_or_level(&self) -> f64 {
        self.head_pitch.unwrap_or(0.0)
    }

    /// Page category, [`UrlCategory::Neutral`] when unclassified.
    pub fn url_category_or_neutral(&self) -> UrlCategory {
        self.url_category.unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_camel_case_frame() {
        let json = r#"{
            "clientId": "desk-7",
            "keystrokeCount": 3,
            "mouseDistance": 120,
            "clickCount": 1,
            "keyboardEntropy": 2.5,
            "activeWindowTitle": "main.rs - editor",
            "isDragging": false,
            "avgDwellTime": 85.0,
            "isEyesClosed": true,
            "concentrationScore": 0.42
        }"#;
        let hb: Heartbeat = serde_json::from_str(json).unwrap();
        assert_eq!(hb.client_id, "desk-7");
        assert_eq!(hb.os_activity(), 124);
        assert!(hb.is_eyes_closed);
        assert!(hb.head_pitch.is_none());
        assert!(hb.url_category.is_none());
    }

    #[test]
    fn missing_fields_default() {
        let hb: Heartbeat = serde_json::from_str("{}").unwrap();
        assert_eq!(hb.client_id_or_unknown(), UNKNOWN_CLIENT_ID);
        assert_eq!(hb.os_activity(), 0);
        assert_eq!(hb.vision_score(), 0);
        assert!((hb.head_pitch_or_level() - 0.0).abs() < f64::EPSILON);
        assert_eq!(hb.url_category_or_neutral(), UrlCategory::Neutral);
    }

    #[test]
    fn vision_score_rounds_half_away_from_zero() {
        let mut hb = Heartbeat {
            concentration_score: 0.125,
            ..Heartbeat::default()
        };
        assert_eq!(hb.vision_score(), 13);
        hb.concentration_score = 0.375;
        assert_eq!(hb.vision_score(), 38);
        hb.concentration_score = 0.9;
        assert_eq!(hb.vision_score(), 90);
    }

    #[test]
    fn vision_score_clamps_out_of_range_sensor_values() {
        let mut hb = Heartbeat {
            concentration_score: 1.7,
            ..Heartbeat::default()
        };
        assert_eq!(hb.vision_score(), 100);
        hb.concentration_score = -0.2;
        assert_eq!(hb.vision_score(), 0);
    }

    #[test]
    fn os_activity_does_not_overflow() {
        let hb = Heartbeat {
            keystroke_count: u32::MAX,
            mouse_distance: u32::MAX,
            click_count: u32::MAX,
            ..Heartbeat::default()
        };
        assert_eq!(hb.os_activity(), 3 * u64::from(u32::MAX));
    }

    #[test]
    fn url_category_wire_names() {
        let hb: Heartbeat = serde_json::from_str(r#"{"urlCategory":"PLAY"}"#).unwrap();
        assert_eq!(hb.url_category, Some(UrlCategory::Play));
        let hb: Heartbeat = serde_json::from_str(r#"{"urlCategory":"SOMETHING"}"#).unwrap();
        assert_eq!(hb.url_category, Some(UrlCategory::Unknown));
        assert_eq!(UrlCategory::parse("WORK"), UrlCategory::Work);
        assert_eq!(UrlCategory::Study.to_string(), "STUDY");
    }
}
