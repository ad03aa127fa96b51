//! Capability error types.
//!
//! Every outbound call (blacklist, event bus, actuators, intelligence) fails
//! with a [`CapabilityError`]. Callers inside the heartbeat path log these and
//! carry on; HTTP routes map them to `502 Bad Gateway`.

use thiserror::Error;

/// Errors surfaced by capability implementations.
#[derive(Debug, Error)]
pub enum CapabilityError {
    /// No endpoint configured for this capability.
    #[error("{capability} is not configured")]
    Unavailable {
        /// Capability name.
        capability: &'static str,
    },

    /// Establishing the connection failed.
    #[error("connect to {endpoint} failed: {message}")]
    Connect {
        /// The endpoint that could not be reached.
        endpoint: String,
        /// Underlying cause.
        message: String,
    },

    /// The call did not complete in time.
    #[error("timeout after {timeout_ms}ms")]
    Timeout {
        /// The timeout that elapsed, in milliseconds.
        timeout_ms: u64,
    },

    /// The peer answered but refused the request.
    #[error("rejected with status {status}: {message}")]
    Rejected {
        /// HTTP status code.
        status: u16,
        /// Peer-supplied reason.
        message: String,
    },

    /// The command could not be delivered to the client session.
    #[error("delivery failed: {0}")]
    Delivery(String),

    /// Transport-level HTTP failure.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Response body could not be decoded.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CapabilityError {
    /// Timeout error for a [`std::time::Duration`].
    pub fn timeout(duration: std::time::Duration) -> Self {
        Self::Timeout {
            timeout_ms: u64::try_from(duration.as_millis()).unwrap_or(u64::MAX),
        }
    }

    /// Whether the error means "nothing is configured" rather than a failure.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable { .. })
    }
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, CapabilityError>;
