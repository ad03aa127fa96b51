//! Per-session heartbeat pipeline.
//!
//! A session starts with its first inbound heartbeat: the client identity is
//! read from it and the outbound handle registered before anything else is
//! processed. Heartbeats are then handled strictly in order, one at a time.
//! The counters in [`SessionState`] belong to the session task alone.

use std::fmt::Display;
use std::sync::Arc;

use chrono::Utc;
use futures::{Stream, StreamExt};
use metrics::{counter, gauge, histogram};
use tokio::sync::mpsc;
use tracing::{Span, debug, info, instrument, warn};
use vigil_core::{ActivityRecord, Heartbeat, INITIAL_SCORE, ScoreInput, ScoreResult, ServerCommand, score};

use crate::intervention::{AlertCooldown, InterventionEmitter};
use crate::metrics::{HEARTBEATS_TOTAL, SESSION_DURATION_SECONDS, SESSIONS_ACTIVE};
use crate::reflex::{ReflexOutcome, ReflexPath};
use crate::registry::{SessionHandle, SessionRegistry};

/// Seconds added to the eyes-closed counter per closed-eye heartbeat.
///
/// Assumes one heartbeat per second; the counter does not measure wall time.
pub const EYES_CLOSED_STEP_SECS: f64 = 1.0;

/// Session-local counters.
#[derive(Clone, Copy, Debug)]
pub struct SessionState {
    eyes_closed_secs: f64,
    current_score: u8,
    cooldown: AlertCooldown,
}

impl SessionState {
    /// Fresh state for a new session.
    pub fn new(cooldown: AlertCooldown) -> Self {
        Self {
            eyes_closed_secs: 0.0,
            current_score: INITIAL_SCORE,
            cooldown,
        }
    }

    /// Consecutive closed-eye time.
    pub fn eyes_closed_secs(&self) -> f64 {
        self.eyes_closed_secs
    }

    /// Score after the last heartbeat.
    pub fn current_score(&self) -> u8 {
        self.current_score
    }

    /// Advance the eyes-closed counter and derive the score input.
    pub fn observe(&mut self, hb: &Heartbeat) -> ScoreInput {
        if hb.is_eyes_closed {
            self.eyes_closed_secs += EYES_CLOSED_STEP_SECS;
        } else {
            self.eyes_closed_secs = 0.0;
        }

        ScoreInput {
            eyes_closed_secs: self.eyes_closed_secs,
            head_pitch: hb.head_pitch_or_level(),
            url_category: hb.url_category_or_neutral(),
            os_activity: hb.os_activity(),
            vision_score: hb.vision_score(),
            current_score: self.current_score,
        }
    }
}

/// How a session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEnd {
    /// The stream closed before the first heartbeat.
    NeverStarted,
    /// Clean close.
    Closed,
    /// Receive failed; the message is the transport error.
    ReceiveError(String),
}

/// Result of one heartbeat.
#[derive(Debug)]
pub struct HeartbeatOutcome {
    /// Score engine output.
    pub result: ScoreResult,
    /// Interventions attempted.
    pub alerts: usize,
    /// Reflex fast-path result, when the heartbeat carried activity.
    pub reflex: Option<ReflexOutcome>,
}

/// Drives score, reflex and interventions for every session.
#[derive(Clone)]
pub struct HeartbeatPipeline {
    registry: Arc<SessionRegistry>,
    reflex: ReflexPath,
    emitter: InterventionEmitter,
}

impl HeartbeatPipeline {
    /// Create a pipeline.
    pub fn new(registry: Arc<SessionRegistry>, reflex: ReflexPath, emitter: InterventionEmitter) -> Self {
        Self {
            registry,
            reflex,
            emitter,
        }
    }

    /// State for a newly started session.
    pub fn new_session_state(&self) -> SessionState {
        SessionState::new(self.emitter.new_cooldown())
    }

    /// Process one heartbeat. Capability failures are contained here.
    pub async fn process(&self, client_id: &str, state: &mut SessionState, hb: &Heartbeat) -> HeartbeatOutcome {
        counter!(HEARTBEATS_TOTAL).increment(1);
        let input = state.observe(hb);

        // relay and sabotage run detached; their failures are logged inside
        let reflex = if input.os_activity > 0 || hb.is_eyes_closed {
            let record = ActivityRecord::from_heartbeat(client_id, hb, Utc::now());
            Some(self.reflex.handle(record).await)
        } else {
            None
        };

        let result = score(&input);
        state.current_score = result.score;
        if result.state.is_noteworthy() {
            info!(client_id, state = %result.state, score = result.score, "attention lapse");
        } else {
            debug!(
                client_id,
                state = %result.state,
                score = result.score,
                eyes_closed_secs = state.eyes_closed_secs,
                os_activity = input.os_activity,
                vision_score = input.vision_score,
                "heartbeat scored"
            );
        }

        let alerts = self.emitter.evaluate(client_id, &result, &mut state.cooldown).await;
        HeartbeatOutcome {
            result,
            alerts,
            reflex,
        }
    }

    /// Run a session over an inbound heartbeat stream until it closes or
    /// fails. `outbound` is the sending half the session's writer drains.
    #[instrument(skip_all, fields(client_id = tracing::field::Empty))]
    pub async fn run_session<S, E>(&self, inbound: S, outbound: mpsc::Sender<ServerCommand>) -> SessionEnd
    where
        S: Stream<Item = Result<Heartbeat, E>> + Send,
        E: Display,
    {
        let mut inbound = std::pin::pin!(inbound);

        let first = match inbound.next().await {
            None => return SessionEnd::NeverStarted,
            Some(Err(error)) => {
                warn!(%error, "receive failed before first heartbeat");
                return SessionEnd::ReceiveError(error.to_string());
            }
            Some(Ok(hb)) => hb,
        };

        let client_id = first.client_id_or_unknown().to_owned();
        let _ = Span::current().record("client_id", client_id.as_str());

        let handle = Arc::new(SessionHandle::new(client_id.clone(), outbound));
        let _ = self.registry.register(handle.clone()).await;
        gauge!(SESSIONS_ACTIVE).increment(1.0);
        info!(connection_id = %handle.connection_id, "session started");

        let mut state = self.new_session_state();
        let _ = self.process(&client_id, &mut state, &first).await;

        let end = loop {
            match inbound.next().await {
                None => break SessionEnd::Closed,
                Some(Err(error)) => {
                    warn!(%error, "receive failed, ending session");
                    break SessionEnd::ReceiveError(error.to_string());
                }
                Some(Ok(hb)) => {
                    let _ = self.process(&client_id, &mut state, &hb).await;
                }
            }
        };

        let _ = self.registry.unregister_connection(&handle).await;
        gauge!(SESSIONS_ACTIVE).decrement(1.0);
        histogram!(SESSION_DURATION_SECONDS).record(handle.age().as_secs_f64());
        info!(
            dropped_commands = handle.drop_count(),
            last_score = state.current_score,
            ?end,
            "session ended"
        );
        end
    }
}
