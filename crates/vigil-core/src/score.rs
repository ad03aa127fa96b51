//! Attention score state machine.
//!
//! [`score`] is a pure function of its input: no clock, no I/O, no hidden
//! state. Tiers are evaluated in priority order and the first match wins:
//!
//! | Tier | Condition | New score |
//! |------|-----------|-----------|
//! | `SLEEPING` | eyes closed ≥ 3.0 s, or head pitch < −20° | 0 |
//! | `DISTRACTED` | url category is `PLAY` | 10 |
//! | `THINKING` | no input, vision > 70, head pitch > −10° | `max(current, 90)` |
//! | `FOCUSING` | any input | `round(vision·0.6 + min(activity·20, 100)·0.4)` |
//! | `IDLING` | no input, vision < 50 | `max(current − 5, 0)` |
//! | `NEUTRAL` | otherwise | unchanged |
//!
//! The 90 floor and the 5-point decay assume one evaluation per second, the
//! same cadence the eyes-closed counter assumes.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::heartbeat::UrlCategory;

/// Score a freshly connected session starts from.
pub const INITIAL_SCORE: u8 = 100;

const SLEEP_EYES_CLOSED_SECS: f64 = 3.0;
const SLEEP_HEAD_PITCH: f64 = -20.0;
const THINKING_VISION_MIN: u8 = 70;
const THINKING_HEAD_PITCH: f64 = -10.0;
const THINKING_FLOOR: u8 = 90;
const IDLING_VISION_MAX: u8 = 50;
const IDLING_DECAY: u8 = 5;
const DISTRACTED_SCORE: u8 = 10;
const ACTIVITY_WEIGHT: u64 = 20;
const MAX_SCORE: u8 = 100;

/// Attention state derived fresh on every heartbeat.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AttentionState {
    /// Eyes closed too long or head dropped.
    Sleeping,
    /// On a banned category of content.
    Distracted,
    /// Reading or reasoning without typing.
    Thinking,
    /// Actively working.
    Focusing,
    /// Passive and not looking at the screen.
    Idling,
    /// Ambiguous band, score holds.
    Neutral,
}

impl AttentionState {
    /// Wire name of the state.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sleeping => "SLEEPING",
            Self::Distracted => "DISTRACTED",
            Self::Thinking => "THINKING",
            Self::Focusing => "FOCUSING",
            Self::Idling => "IDLING",
            Self::Neutral => "NEUTRAL",
        }
    }

    /// Whether this state is worth a log line at info level.
    pub fn is_noteworthy(self) -> bool {
        matches!(self, Self::Sleeping | Self::Distracted | Self::Idling)
    }
}

impl fmt::Display for AttentionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Features fed to [`score`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScoreInput {
    /// Seconds the eyes have been continuously closed.
    pub eyes_closed_secs: f64,
    /// Head pitch in degrees (`0.0` when unavailable).
    pub head_pitch: f64,
    /// Category of the active page.
    pub url_category: UrlCategory,
    /// Keystrokes + clicks + mouse distance.
    pub os_activity: u64,
    /// Gaze concentration, `0..=100`.
    pub vision_score: u8,
    /// Score carried over from the previous heartbeat.
    pub current_score: u8,
}

/// Output of [`score`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreResult {
    /// New score, `0..=100`.
    pub score: u8,
    /// Derived state.
    pub state: AttentionState,
}

impl ScoreResult {
    const fn new(score: u8, state: AttentionState) -> Self {
        Self { score, state }
    }
}

/// Evaluate the tiers in priority order.
pub fn score(input: &ScoreInput) -> ScoreResult {
    if input.eyes_closed_secs >= SLEEP_EYES_CLOSED_SECS || input.head_pitch < SLEEP_HEAD_PITCH {
        return ScoreResult::new(0, AttentionState::Sleeping);
    }

    if input.url_category == UrlCategory::Play {
        return ScoreResult::new(DISTRACTED_SCORE, AttentionState::Distracted);
    }

    if input.os_activity == 0
        && input.vision_score > THINKING_VISION_MIN
        && input.head_pitch > THINKING_HEAD_PITCH
    {
        return ScoreResult::new(
            input.current_score.max(THINKING_FLOOR),
            AttentionState::Thinking,
        );
    }

    if input.os_activity > 0 {
        let os_norm = input
            .os_activity
            .saturating_mul(ACTIVITY_WEIGHT)
            .min(u64::from(MAX_SCORE)) as f64;
        let weighted = f64::from(input.vision_score) * 0.6 + os_norm * 0.4;
        let blended = weighted.round().clamp(0.0, f64::from(MAX_SCORE)) as u8;
        return ScoreResult::new(blended, AttentionState::Focusing);
    }

    if input.vision_score < IDLING_VISION_MAX {
        return ScoreResult::new(
            input.current_score.saturating_sub(IDLING_DECAY),
            AttentionState::Idling,
        );
    }

    ScoreResult::new(input.current_score, AttentionState::Neutral)
}
