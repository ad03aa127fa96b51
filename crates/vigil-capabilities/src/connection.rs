//! Lazily established connections to peer services.
//!
//! Adapters are constructed at startup without touching the network. The
//! first call upgrades [`ConnectionState::Disconnected`] to
//! [`ConnectionState::Connected`] exactly once; later calls reuse the handle.
//! A failed upgrade leaves the state disconnected so the next call retries.

use std::time::Duration;

use parking_lot::Mutex;
use tracing::{debug, info};

use crate::errors::{CapabilityError, Result};

/// Connection state of one peer endpoint.
#[derive(Clone, Debug)]
pub enum ConnectionState<C> {
    /// No handle yet.
    Disconnected,
    /// Established handle.
    Connected(C),
}

/// Upgrade-once connection holder.
pub struct LazyConnection<C> {
    capability: &'static str,
    endpoint: Option<String>,
    state: Mutex<ConnectionState<C>>,
}

impl<C: Clone> LazyConnection<C> {
    /// Create a disconnected holder. `None` means the capability is not
    /// configured and every call fails with [`CapabilityError::Unavailable`].
    pub fn new(capability: &'static str, endpoint: Option<String>) -> Self {
        Self {
            capability,
            endpoint,
            state: Mutex::new(ConnectionState::Disconnected),
        }
    }

    /// Whether the upgrade has happened.
    pub fn is_connected(&self) -> bool {
        matches!(*self.state.lock(), ConnectionState::Connected(_))
    }

    /// Return the handle, connecting with `connect` on first use.
    ///
    /// The lock is held across `connect`, so concurrent first callers
    /// produce a single handle.
    pub fn get_or_connect<F>(&self, connect: F) -> Result<C>
    where
        F: FnOnce(&str) -> Result<C>,
    {
        let endpoint = self.endpoint.as_deref().ok_or(CapabilityError::Unavailable {
            capability: self.capability,
        })?;

        let mut state = self.state.lock();
        if let ConnectionState::Connected(handle) = &*state {
            return Ok(handle.clone());
        }

        let handle = connect(endpoint)?;
        info!(capability = self.capability, endpoint, "connected");
        *state = ConnectionState::Connected(handle.clone());
        Ok(handle)
    }
}

/// HTTP handle shared by all adapters.
#[derive(Clone, Debug)]
pub struct HttpHandle {
    base: String,
    client: reqwest::Client,
}

impl HttpHandle {
    /// Validate `endpoint` and build a client for it.
    pub fn open(endpoint: &str) -> Result<Self> {
        let connect_err = |message: String| CapabilityError::Connect {
            endpoint: endpoint.to_owned(),
            message,
        };

        let url = reqwest::Url::parse(endpoint).map_err(|e| connect_err(e.to_string()))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(connect_err(format!("unsupported scheme {}", url.scheme())));
        }

        let client = reqwest::Client::builder()
            .user_agent(concat!("vigil/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(5))
            .build()
            .map_err(|e| connect_err(e.to_string()))?;

        debug!(endpoint, "http handle opened");
        Ok(Self {
            base: endpoint.trim_end_matches('/').to_owned(),
            client,
        })
    }

    /// Absolute URL for `path` under the base endpoint.
    pub fn url(&self, path: &str) -> String {
        let path = path.trim_start_matches('/');
        if path.is_empty() {
            return self.base.clone();
        }
        format!("{}/{path}", self.base)
    }

    /// Underlying client.
    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }
}
