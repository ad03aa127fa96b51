//! # vigil-settings
//!
//! Configuration management with layered sources.
//!
//! Settings are loaded from three layers (in priority order):
//! 1. **Compiled defaults** — [`VigilSettings::default()`]
//! 2. **User file** — `~/.vigil/settings.json` (deep-merged over defaults)
//! 3. **Environment variables** — `VIGIL_*` overrides (highest priority)
//!
//! There is no global instance: the composition root loads settings once and
//! hands the relevant sections to each component.

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{deep_merge, load_settings, load_settings_from_path, settings_path};
pub use types::*;
