//! Server configuration.

use std::time::Duration;

use vigil_settings::VigilSettings;

/// Runtime configuration for [`crate::server::VigilServer`].
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// Host to bind.
    pub host: String,
    /// Port to bind (`0` auto-assigns).
    pub port: u16,
    /// Per-session outbound command queue depth.
    pub outbound_buffer: usize,
    /// Max WebSocket message size in bytes.
    pub max_message_size: usize,
    /// Minimum gap between two alerts to one session.
    pub alert_cooldown: Duration,
    /// Bound on blacklist, sabotage and physical-control calls.
    pub routing_timeout: Duration,
    /// How long shutdown waits for background tasks.
    pub shutdown_timeout: Duration,
}

impl ServerConfig {
    /// Derive the server configuration from loaded settings.
    pub fn from_settings(settings: &VigilSettings) -> Self {
        Self {
            host: settings.server.host.clone(),
            port: settings.server.port,
            outbound_buffer: settings.server.outbound_buffer.max(1),
            max_message_size: settings.server.max_message_size,
            alert_cooldown: settings.intervention.alert_cooldown(),
            routing_timeout: settings.capabilities.routing_timeout(),
            shutdown_timeout: Duration::from_millis(settings.server.shutdown_timeout_ms),
        }
    }

    /// `host:port` bind address.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 0,
            outbound_buffer: 64,
            max_message_size: 1024 * 1024,
            alert_cooldown: Duration::from_secs(5),
            routing_timeout: Duration::from_secs(3),
            shutdown_timeout: Duration::from_secs(10),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_binds_loopback_ephemeral() {
        let cfg = ServerConfig::default();
        assert_eq!(cfg.bind_addr(), "127.0.0.1:0");
    }

    #[test]
    fn default_cooldown_is_five_seconds() {
        assert_eq!(ServerConfig::default().alert_cooldown, Duration::from_secs(5));
    }

    #[test]
    fn from_default_settings() {
        let cfg = ServerConfig::from_settings(&VigilSettings::default());
        assert_eq!(cfg.host, "0.0.0.0");
        assert_eq!(cfg.port, 50052);
        assert_eq!(cfg.alert_cooldown, Duration::from_secs(5));
        assert_eq!(cfg.routing_timeout, Duration::from_secs(3));
        assert_eq!(cfg.shutdown_timeout, Duration::from_secs(10));
    }

    #[test]
    fn from_custom_settings() {
        let mut settings = VigilSettings::default();
        settings.server.port = 9000;
        settings.server.outbound_buffer = 0;
        settings.intervention.alert_cooldown_ms = 250;
        let cfg = ServerConfig::from_settings(&settings);
        assert_eq!(cfg.port, 9000);
        assert_eq!(cfg.outbound_buffer, 1);
        assert_eq!(cfg.alert_cooldown, Duration::from_millis(250));
    }
}
