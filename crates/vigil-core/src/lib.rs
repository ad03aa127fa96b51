//! # vigil-core
//!
//! Shared vocabulary for the vigil decision core.
//!
//! - **Heartbeats**: [`Heartbeat`] snapshots streamed by client agents
//! - **Activity records**: [`ActivityRecord`] relayed to the event bus
//! - **Commands**: [`ServerCommand`] pushed to clients, [`ActionCommand`] from peers
//! - **Scoring**: the pure [`score`] state machine mapping features to an
//!   [`AttentionState`] and a 0–100 score

#![deny(unsafe_code)]

pub mod activity;
pub mod command;
pub mod heartbeat;
pub mod score;

pub use activity::{ActivityKind, ActivityRecord};
pub use command::{ActionCommand, ActionKind, CommandKind, ServerCommand};
pub use heartbeat::{Heartbeat, UNKNOWN_CLIENT_ID, UrlCategory};
pub use score::{AttentionState, INITIAL_SCORE, ScoreInput, ScoreResult, score};
