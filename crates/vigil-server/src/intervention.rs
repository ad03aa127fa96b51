//! Cooldown-gated interventions.
//!
//! Every heartbeat's [`ScoreResult`] is offered to the emitter. When the
//! session's cooldown has elapsed and the state warrants it, the mapped
//! commands are sent through the [`SessionRegistry`] and the cooldown
//! restarts. One timer per session covers every alert kind.

use std::sync::Arc;
use std::time::Duration;

use metrics::counter;
use tokio::time::Instant;
use tracing::{info, warn};
use vigil_core::{AttentionState, ScoreResult, ServerCommand};

use crate::metrics::INTERVENTIONS_TOTAL;
use crate::registry::SessionRegistry;

/// Spoken when the client is asleep.
pub const WAKE_UP_MESSAGE: &str = "Wake up! Back to work.";
/// Attention-grab payload sent alongside the wake-up alert.
pub const SHAKE_PAYLOAD: &str = "Wake Up";
/// Spoken when the client is on a distracting page.
pub const DISTRACTION_MESSAGE: &str = "No distractions! Focus.";
/// Spoken when the client has drifted into idling.
pub const STAY_FOCUSED_MESSAGE: &str = "Stay focused!";

/// Idling alerts only fire below this score.
const IDLE_ALERT_BELOW: u8 = 50;

/// Per-session alert timer.
#[derive(Clone, Copy, Debug)]
pub struct AlertCooldown {
    period: Duration,
    last_alert: Option<Instant>,
}

impl AlertCooldown {
    /// A timer that has never fired.
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            last_alert: None,
        }
    }

    /// Whether an alert may fire at `now` (strictly more than one period
    /// since the last alert).
    pub fn is_ready(&self, now: Instant) -> bool {
        self.last_alert
            .is_none_or(|last| now.saturating_duration_since(last) > self.period)
    }

    /// Restart the timer at `now`.
    pub fn mark(&mut self, now: Instant) {
        self.last_alert = Some(now);
    }

    /// When the last alert fired.
    pub fn last_alert(&self) -> Option<Instant> {
        self.last_alert
    }
}

/// Commands warranted by a score result, ignoring the cooldown.
pub fn commands_for(result: &ScoreResult) -> Vec<ServerCommand> {
    match result.state {
        AttentionState::Sleeping => vec![
            ServerCommand::voice_alert(WAKE_UP_MESSAGE),
            ServerCommand::attention_grab(SHAKE_PAYLOAD),
        ],
        AttentionState::Distracted => vec![ServerCommand::voice_alert(DISTRACTION_MESSAGE)],
        AttentionState::Idling if result.score < IDLE_ALERT_BELOW => {
            vec![ServerCommand::voice_alert(STAY_FOCUSED_MESSAGE)]
        }
        _ => Vec::new(),
    }
}

/// Sends interventions through the registry.
#[derive(Clone)]
pub struct InterventionEmitter {
    registry: Arc<SessionRegistry>,
    cooldown: Duration,
}

impl InterventionEmitter {
    /// Create an emitter.
    pub fn new(registry: Arc<SessionRegistry>, cooldown: Duration) -> Self {
        Self { registry, cooldown }
    }

    /// A fresh timer with this emitter's cooldown.
    pub fn new_cooldown(&self) -> AlertCooldown {
        AlertCooldown::new(self.cooldown)
    }

    /// Evaluate one heartbeat's result. Returns how many commands were
    /// attempted; `0` leaves the timer untouched.
    ///
    /// Send failures are logged and not retried; the attempt still restarts
    /// the timer.
    pub async fn evaluate(
        &self,
        client_id: &str,
        result: &ScoreResult,
        cooldown: &mut AlertCooldown,
    ) -> usize {
        let now = Instant::now();
        if !cooldown.is_ready(now) {
            return 0;
        }

        let commands = commands_for(result);
        if commands.is_empty() {
            return 0;
        }

        info!(client_id, state = %result.state, score = result.score, "intervention");
        counter!(INTERVENTIONS_TOTAL, "state" => result.state.as_str()).increment(1);

        let attempted = commands.len();
        for command in commands {
            let kind = command.kind;
            if let Err(error) = self.registry.send(client_id, command).await {
                warn!(client_id, ?kind, %error, "failed to send intervention");
            }
        }
        cooldown.mark(now);
        attempted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::SessionHandle;
    use tokio::sync::mpsc;
    use vigil_core::CommandKind;

    fn result(state: AttentionState, score: u8) -> ScoreResult {
        ScoreResult { score, state }
    }

    async fn setup(
        cooldown: Duration,
    ) -> (InterventionEmitter, mpsc::Receiver<ServerCommand>) {
        let registry = Arc::new(SessionRegistry::new());
        let (tx, rx) = mpsc::channel(16);
        let _ = registry.register(Arc::new(SessionHandle::new("c1", tx))).await;
        (InterventionEmitter::new(registry, cooldown), rx)
    }

    fn drain(rx: &mut mpsc::Receiver<ServerCommand>) -> Vec<ServerCommand> {
        let mut out = Vec::new();
        while let Ok(cmd) = rx.try_recv() {
            out.push(cmd);
        }
        out
    }

    #[test]
    fn sleeping_maps_to_voice_and_shake() {
        let cmds = commands_for(&result(AttentionState::Sleeping, 0));
        assert_eq!(cmds.len(), 2);
        assert_eq!(cmds[0].kind, CommandKind::PlaySound);
        assert_eq!(cmds[0].payload, WAKE_UP_MESSAGE);
        assert_eq!(cmds[1].kind, CommandKind::ShakeMouse);
        assert_eq!(cmds[1].payload, SHAKE_PAYLOAD);
    }

    #[test]
    fn distracted_maps_to_voice() {
        let cmds = commands_for(&result(AttentionState::Distracted, 10));
        assert_eq!(cmds, vec![ServerCommand::voice_alert(DISTRACTION_MESSAGE)]);
    }

    #[test]
    fn idling_alerts_only_below_fifty() {
        assert!(commands_for(&result(AttentionState::Idling, 50)).is_empty());
        assert_eq!(
            commands_for(&result(AttentionState::Idling, 49)),
            vec![ServerCommand::voice_alert(STAY_FOCUSED_MESSAGE)]
        );
    }

    #[test]
    fn calm_states_map_to_nothing() {
        for state in [
            AttentionState::Thinking,
            AttentionState::Focusing,
            AttentionState::Neutral,
        ] {
            assert!(commands_for(&result(state, 5)).is_empty(), "{state}");
        }
    }

    #[tokio::test(start_paused = true)]
    async fn cooldown_suppresses_second_alert() {
        let (emitter, mut rx) = setup(Duration::from_secs(5)).await;
        let mut cooldown = emitter.new_cooldown();
        let sleeping = result(AttentionState::Sleeping, 0);

        assert_eq!(emitter.evaluate("c1", &sleeping, &mut cooldown).await, 2);
        tokio::time::advance(Duration::from_secs(1)).await;
        assert_eq!(emitter.evaluate("c1", &sleeping, &mut cooldown).await, 0);
        assert_eq!(drain(&mut rx).len(), 2);

        tokio::time::advance(Duration::from_secs(5)).await;
        assert_eq!(emitter.evaluate("c1", &sleeping, &mut cooldown).await, 2);
        assert_eq!(drain(&mut rx).len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn cooldown_boundary_is_strict() {
        let (emitter, mut rx) = setup(Duration::from_secs(5)).await;
        let mut cooldown = emitter.new_cooldown();
        let distracted = result(AttentionState::Distracted, 10);

        assert_eq!(emitter.evaluate("c1", &distracted, &mut cooldown).await, 1);
        tokio::time::advance(Duration::from_secs(5)).await;
        assert_eq!(emitter.evaluate("c1", &distracted, &mut cooldown).await, 0);
        tokio::time::advance(Duration::from_millis(1)).await;
        assert_eq!(emitter.evaluate("c1", &distracted, &mut cooldown).await, 1);
        assert_eq!(drain(&mut rx).len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn no_alert_leaves_timer_untouched() {
        let (emitter, mut rx) = setup(Duration::from_secs(5)).await;
        let mut cooldown = emitter.new_cooldown();

        let _ = emitter
            .evaluate("c1", &result(AttentionState::Focusing, 80), &mut cooldown)
            .await;
        assert!(cooldown.last_alert().is_none());

        // an alert right after a calm heartbeat is not suppressed
        assert_eq!(
            emitter
                .evaluate("c1", &result(AttentionState::Distracted, 10), &mut cooldown)
                .await,
            1
        );
        assert_eq!(drain(&mut rx).len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn shared_timer_across_alert_kinds() {
        let (emitter, mut rx) = setup(Duration::from_secs(5)).await;
        let mut cooldown = emitter.new_cooldown();

        let _ = emitter
            .evaluate("c1", &result(AttentionState::Distracted, 10), &mut cooldown)
            .await;
        tokio::time::advance(Duration::from_secs(2)).await;
        assert_eq!(
            emitter
                .evaluate("c1", &result(AttentionState::Sleeping, 0), &mut cooldown)
                .await,
            0
        );
        assert_eq!(drain(&mut rx).len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_send_still_restarts_timer() {
        let registry = Arc::new(SessionRegistry::new());
        let emitter = InterventionEmitter::new(registry, Duration::from_secs(5));
        let mut cooldown = emitter.new_cooldown();

        // no session registered: sends are dropped, but the attempt counts
        assert_eq!(
            emitter
                .evaluate("ghost", &result(AttentionState::Sleeping, 0), &mut cooldown)
                .await,
            2
        );
        assert!(cooldown.last_alert().is_some());
    }
}
