//! Prometheus metrics recorder and metric names.

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use tracing::info;

/// Install the Prometheus recorder as the global `metrics` recorder.
///
/// Call once at startup before any metric is recorded. Without a recorder
/// every `counter!`/`gauge!` call is a no-op, which is what tests rely on.
pub fn install_recorder() -> Result<PrometheusHandle, BuildError> {
    let handle = PrometheusBuilder::new().install_recorder()?;
    info!("prometheus metrics recorder installed");
    Ok(handle)
}

/// Render Prometheus text format from the installed recorder.
pub fn render(handle: &PrometheusHandle) -> String {
    handle.render()
}

/// Live sessions (gauge).
pub const SESSIONS_ACTIVE: &str = "sessions_active";
/// Heartbeats processed (counter).
pub const HEARTBEATS_TOTAL: &str = "heartbeats_total";
/// Frames that failed to decode as heartbeats (counter).
pub const HEARTBEAT_DECODE_ERRORS_TOTAL: &str = "heartbeat_decode_errors_total";
/// Interventions emitted (counter, labels: state).
pub const INTERVENTIONS_TOTAL: &str = "interventions_total";
/// Blacklist hits that triggered sabotage (counter, labels: kind).
pub const REFLEX_BLOCKS_TOTAL: &str = "reflex_blocks_total";
/// Capability call failures (counter, labels: capability).
pub const CAPABILITY_ERRORS_TOTAL: &str = "capability_errors_total";
/// Commands routed from peers (counter, labels: route).
pub const COMMANDS_ROUTED_TOTAL: &str = "commands_routed_total";
/// Session lifetime (histogram).
pub const SESSION_DURATION_SECONDS: &str = "session_duration_seconds";
