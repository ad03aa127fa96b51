//! `/health` endpoint.

use std::time::Instant;

use serde::Serialize;

use crate::registry::SessionStats;

/// Health check response body.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Always `"ok"` when the server is running.
    pub status: &'static str,
    /// Seconds since the server started.
    pub uptime_secs: u64,
    /// Number of live sessions.
    pub active_sessions: usize,
    /// Interventions and routed commands that never reached a live client.
    pub dropped_commands: u64,
    /// Age of the longest-connected client, absent with no sessions.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub oldest_session_secs: Option<u64>,
}

/// Build a health response from a registry snapshot.
pub fn health_check(start_time: Instant, sessions: SessionStats) -> HealthResponse {
    HealthResponse {
        status: "ok",
        uptime_secs: start_time.elapsed().as_secs(),
        active_sessions: sessions.active,
        dropped_commands: sessions.dropped_commands,
        oldest_session_secs: sessions.oldest.map(|age| age.as_secs()),
    }
}
