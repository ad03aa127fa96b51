//! Settings loading with deep merge and environment variable overrides.
//!
//! Loading flow:
//! 1. Start with compiled [`VigilSettings::default()`]
//! 2. If the settings file exists, deep-merge user values over defaults
//! 3. Apply environment variable overrides (highest priority)
//! 4. Validate values that would otherwise fail at runtime
//!
//! Deep merge rules:
//! - Objects are merged recursively (source overrides target per-key)
//! - Arrays and primitives are replaced entirely by source
//! - Null values in source are skipped (preserving target)

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::debug;

use crate::errors::{Result, SettingsError};
use crate::types::{EventBusKind, VigilSettings};

/// Resolve the path to the settings file (`~/.vigil/settings.json`).
pub fn settings_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".vigil").join("settings.json")
}

/// Load settings from the default path with env var overrides.
pub fn load_settings() -> Result<VigilSettings> {
    load_settings_from_path(&settings_path())
}

/// Load settings from a specific path with env var overrides.
///
/// If the file does not exist, returns defaults. If the file contains
/// invalid JSON, returns an error.
pub fn load_settings_from_path(path: &Path) -> Result<VigilSettings> {
    let json_err = |source| SettingsError::Json {
        path: path.to_path_buf(),
        source,
    };
    let defaults = serde_json::to_value(VigilSettings::default()).map_err(json_err)?;

    let merged = if path.exists() {
        debug!(?path, "loading settings from file");
        let content = std::fs::read_to_string(path).map_err(|source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let user: Value = serde_json::from_str(&content).map_err(json_err)?;
        deep_merge(defaults, user)
    } else {
        debug!(?path, "settings file not found, using defaults");
        defaults
    };

    let mut settings: VigilSettings = serde_json::from_value(merged).map_err(json_err)?;
    apply_env_overrides(&mut settings);
    validate(&settings)?;
    Ok(settings)
}

/// Recursive deep merge of two JSON values.
pub fn deep_merge(target: Value, source: Value) -> Value {
    match (target, source) {
        (Value::Object(mut target_map), Value::Object(source_map)) => {
            for (key, source_val) in source_map {
                if source_val.is_null() {
                    continue;
                }
                let merged = if let Some(target_val) = target_map.remove(&key) {
                    deep_merge(target_val, source_val)
                } else {
                    source_val
                };
                let _ = target_map.insert(key, merged);
            }
            Value::Object(target_map)
        }
        (_, source) => source,
    }
}

/// Reject values the runtime cannot work with.
pub fn validate(settings: &VigilSettings) -> Result<()> {
    if settings.server.outbound_buffer == 0 {
        return Err(SettingsError::invalid("server.outboundBuffer", "must be at least 1"));
    }
    if settings.event_bus.kind == EventBusKind::Local && settings.event_bus.local_capacity == 0 {
        return Err(SettingsError::invalid("eventBus.localCapacity", "must be at least 1"));
    }
    if settings.event_bus.kind == EventBusKind::Http && settings.event_bus.relay_endpoint().is_none()
    {
        return Err(SettingsError::invalid(
            "eventBus.relayUrl",
            "required when eventBus.kind is \"http\"",
        ));
    }
    Ok(())
}

/// Apply environment variable overrides to loaded settings.
///
/// Invalid values are logged and ignored (fall back to file/default).
pub fn apply_env_overrides(settings: &mut VigilSettings) {
    // ── Server ──────────────────────────────────────────────────────
    if let Some(v) = read_env_string("VIGIL_HOST") {
        settings.server.host = v;
    }
    if let Some(v) = read_env_u16("VIGIL_PORT", 0, 65535) {
        settings.server.port = v;
    }

    // ── Logging ─────────────────────────────────────────────────────
    if let Some(v) = read_env_string("VIGIL_LOG_LEVEL") {
        settings.logging.level = v;
    }
    if let Some(v) = read_env_bool("VIGIL_LOG_JSON") {
        settings.logging.json = v;
    }

    // ── Intervention ────────────────────────────────────────────────
    if let Some(v) = read_env_u64("VIGIL_ALERT_COOLDOWN_MS", 0, 3_600_000) {
        settings.intervention.alert_cooldown_ms = v;
    }

    // ── Capabilities ────────────────────────────────────────────────
    if let Some(v) = read_env_string("VIGIL_PHYSICAL_CONTROL_URL") {
        settings.capabilities.physical_control_url = v;
    }
    if let Some(v) = read_env_string("VIGIL_SABOTAGE_URL") {
        settings.capabilities.sabotage_url = v;
    }
    if let Some(v) = read_env_string("VIGIL_INTELLIGENCE_URL") {
        settings.capabilities.intelligence_url = v;
    }

    // ── Event bus ───────────────────────────────────────────────────
    if let Some(v) = read_env_string("VIGIL_EVENT_BUS_URL") {
        settings.event_bus.relay_url = v;
        settings.event_bus.kind = EventBusKind::Http;
    }
    if let Some(v) = read_env_string("VIGIL_EVENT_BUS_TOPIC") {
        settings.event_bus.topic = v;
    }

    // ── Blacklist ───────────────────────────────────────────────────
    if let Some(v) = read_env_string("VIGIL_BLACKLIST_SYNC_URL") {
        settings.blacklist.sync_url = v;
    }
}

// ── Pure parsing functions (testable without env vars) ──────────────────────

/// Parse a string as a boolean.
///
/// Accepts (case-insensitive): `true`/`1`/`yes`/`on` or `false`/`0`/`no`/`off`.
pub fn parse_bool(val: &str) -> Option<bool> {
    match val.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Parse a string as a `u16` within a range.
pub fn parse_u16_range(val: &str, min: u16, max: u16) -> Option<u16> {
    let n: u16 = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

/// Parse a string as a `u64` within a range.
pub fn parse_u64_range(val: &str, min: u64, max: u64) -> Option<u64> {
    let n: u64 = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

// ── Env var readers (thin wrappers) ─────────────────────────────────────────

fn read_env_string(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

fn read_env_bool(name: &str) -> Option<bool> {
    let val = std::env::var(name).ok()?;
    let result = parse_bool(&val);
    if result.is_none() {
        tracing::warn!(key = name, value = %val, "invalid boolean env var, ignoring");
    }
    result
}

fn read_env_u16(name: &str, min: u16, max: u16) -> Option<u16> {
    let val = std::env::var(name).ok()?;
    let result = parse_u16_range(&val, min, max);
    if result.is_none() {
        tracing::warn!(key = name, value = %val, "invalid u16 env var, ignoring");
    }
    result
}

fn read_env_u64(name: &str, min: u64, max: u64) -> Option<u64> {
    let val = std::env::var(name).ok()?;
    let result = parse_u64_range(&val, min, max);
    if result.is_none() {
        tracing::warn!(key = name, value = %val, "invalid u64 env var, ignoring");
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── deep_merge ──────────────────────────────────────────────────

    #[test]
    fn merge_nested_override() {
        let target = serde_json::json!({
            "server": {"port": 50052, "host": "0.0.0.0"}
        });
        let source = serde_json::json!({
            "server": {"port": 9090}
        });
        let merged = deep_merge(target, source);
        assert_eq!(merged["server"]["port"], 9090);
        assert_eq!(merged["server"]["host"], "0.0.0.0");
    }

    #[test]
    fn merge_array_replace() {
        let target = serde_json::json!({"apps": ["steam", "discord"]});
        let source = serde_json::json!({"apps": ["minecraft"]});
        let merged = deep_merge(target, source);
        assert_eq!(merged["apps"], serde_json::json!(["minecraft"]));
    }

    #[test]
    fn merge_null_preserves_target() {
        let target = serde_json::json!({"a": 1, "b": 2});
        let source = serde_json::json!({"a": null});
        let merged = deep_merge(target, source);
        assert_eq!(merged["a"], 1);
        assert_eq!(merged["b"], 2);
    }

    #[test]
    fn merge_new_keys_added() {
        let merged = deep_merge(serde_json::json!({"a": 1}), serde_json::json!({"b": 2}));
        assert_eq!(merged["a"], 1);
        assert_eq!(merged["b"], 2);
    }

    #[test]
    fn merge_primitive_replaces_object() {
        let target = serde_json::json!({"a": {"nested": true}});
        let source = serde_json::json!({"a": 42});
        let merged = deep_merge(target, source);
        assert_eq!(merged["a"], 42);
    }

    // ── load_settings_from_path ─────────────────────────────────────

    #[test]
    fn load_missing_file_returns_defaults() {
        let path = Path::new("/nonexistent/vigil/settings.json");
        let settings = load_settings_from_path(path).unwrap();
        assert_eq!(settings.server.port, VigilSettings::default().server.port);
    }

    #[test]
    fn load_partial_json_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(
            &path,
            r#"{"intervention": {"alertCooldownMs": 1500}, "blacklist": {"apps": ["minecraft"]}}"#,
        )
        .unwrap();

        let settings = load_settings_from_path(&path).unwrap();
        assert_eq!(settings.intervention.alert_cooldown_ms, 1500);
        assert_eq!(settings.blacklist.apps, vec!["minecraft".to_string()]);
        assert_eq!(settings.blacklist.urls, VigilSettings::default().blacklist.urls);
    }

    #[test]
    fn load_invalid_json_returns_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "not valid json").unwrap();

        let result = load_settings_from_path(&path);
        match result.unwrap_err() {
            SettingsError::Json { path: reported, .. } => assert_eq!(reported, path),
            other => panic!("expected Json error, got {other:?}"),
        }
    }

    #[test]
    fn load_rejects_zero_outbound_buffer() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"server": {"outboundBuffer": 0}}"#).unwrap();

        let result = load_settings_from_path(&path);
        assert!(matches!(
            result.unwrap_err(),
            SettingsError::InvalidValue { key: "server.outboundBuffer", .. }
        ));
    }

    #[test]
    fn validate_requires_relay_url_for_http_bus() {
        let mut settings = VigilSettings::default();
        settings.event_bus.kind = EventBusKind::Http;
        assert!(validate(&settings).is_err());
        settings.event_bus.relay_url = "http://relay:8090/publish".to_string();
        assert!(validate(&settings).is_ok());
    }

    // ── parsing ─────────────────────────────────────────────────────

    #[test]
    fn parse_bool_variants() {
        for v in ["true", "TRUE", "1", "yes", "on"] {
            assert_eq!(parse_bool(v), Some(true), "{v}");
        }
        for v in ["false", "0", "no", "Off"] {
            assert_eq!(parse_bool(v), Some(false), "{v}");
        }
        assert_eq!(parse_bool("maybe"), None);
    }

    #[test]
    fn parse_ranges() {
        assert_eq!(parse_u16_range("8080", 1, 65535), Some(8080));
        assert_eq!(parse_u16_range("0", 1, 65535), None);
        assert_eq!(parse_u16_range("70000", 0, 65535), None);
        assert_eq!(parse_u64_range("5000", 0, 3_600_000), Some(5000));
        assert_eq!(parse_u64_range("-1", 0, 10), None);
    }
}
