//! Commands pushed to clients and action requests received from peers.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Wire-level command kinds understood by client agents.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CommandKind {
    /// Speak the payload aloud.
    PlaySound,
    /// Jiggle the pointer to grab attention.
    ShakeMouse,
    /// Show the payload on screen.
    ShowMessage,
    /// Cover the screen.
    BlockScreen,
}

/// One command frame sent to a client.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerCommand {
    /// What the client should do.
    #[serde(rename = "type")]
    pub kind: CommandKind,
    /// Text attached to the command.
    pub payload: String,
}

impl ServerCommand {
    /// Build a command.
    pub fn new(kind: CommandKind, payload: impl Into<String>) -> Self {
        Self {
            kind,
            payload: payload.into(),
        }
    }

    /// Spoken alert.
    pub fn voice_alert(payload: impl Into<String>) -> Self {
        Self::new(CommandKind::PlaySound, payload)
    }

    /// Pointer shake.
    pub fn attention_grab(payload: impl Into<String>) -> Self {
        Self::new(CommandKind::ShakeMouse, payload)
    }

    /// On-screen message.
    pub fn display_message(payload: impl Into<String>) -> Self {
        Self::new(CommandKind::ShowMessage, payload)
    }

    /// Full-screen block.
    pub fn block_screen(payload: impl Into<String>) -> Self {
        Self::new(CommandKind::BlockScreen, payload)
    }
}

/// Domain action requested by a peer service.
///
/// Unrecognised names are kept verbatim in [`ActionKind::Other`] so they can
/// be logged and still routed to the fallback command.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ActionKind {
    /// Block a URL in the client's browser.
    BlockUrl,
    /// Close the offending application.
    CloseApp,
    /// Minimise every window.
    MinimizeAll,
    /// Put the screen to sleep.
    SleepScreen,
    /// Speak through the physical device.
    Tts,
    /// Vibrate the physical device.
    Vibrate,
    /// Anything else.
    Other(String),
}

impl ActionKind {
    /// Parse a wire name.
    pub fn parse(value: &str) -> Self {
        match value {
            "BLOCK_URL" => Self::BlockUrl,
            "CLOSE_APP" => Self::CloseApp,
            "MINIMIZE_ALL" => Self::MinimizeAll,
            "SLEEP_SCREEN" => Self::SleepScreen,
            "TTS" => Self::Tts,
            "VIBRATE" => Self::Vibrate,
            other => Self::Other(other.to_owned()),
        }
    }

    /// Wire name.
    pub fn as_str(&self) -> &str {
        match self {
            Self::BlockUrl => "BLOCK_URL",
            Self::CloseApp => "CLOSE_APP",
            Self::MinimizeAll => "MINIMIZE_ALL",
            Self::SleepScreen => "SLEEP_SCREEN",
            Self::Tts => "TTS",
            Self::Vibrate => "VIBRATE",
            Self::Other(name) => name,
        }
    }

    /// Whether the action is carried out by the physical-control device.
    pub fn is_physical(&self) -> bool {
        matches!(self, Self::Tts | Self::Vibrate)
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ActionKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ActionKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::parse(&raw))
    }
}

/// Action command addressed to one client.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionCommand {
    /// Target client.
    pub client_id: String,
    /// Requested action.
    pub action_type: ActionKind,
    /// Strength hint, `1..=10` by convention.
    #[serde(default)]
    pub intensity: u8,
    /// Human-readable message for the client.
    #[serde(default)]
    pub message: String,
    /// URL for [`ActionKind::BlockUrl`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_url: Option<String>,
}

impl ActionCommand {
    /// Build a command without a target URL.
    pub fn new(
        client_id: impl Into<String>,
        action_type: ActionKind,
        intensity: u8,
        message: impl Into<String>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            action_type,
            intensity,
            message: message.into(),
            target_url: None,
        }
    }

    /// Attach a target URL.
    #[must_use]
    pub fn with_target_url(self, url: impl Into<String>) -> Self {
        Self {
            target_url: Some(url.into()),
            ..self
        }
    }
}
