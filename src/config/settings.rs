//! Scheduling settings, defaults and TOML persistence.
//!
//! [`LipsyncConfig`] implements `Serialize`, `Deserialize`, `Default` and
//! `Clone` so it can be round-tripped through a TOML file and copied into
//! each session cheaply.

use anyhow::Result;
use serde::{Deserialize, Serialize};

use super::AppPaths;

// ---------------------------------------------------------------------------
// LipsyncConfig
// ---------------------------------------------------------------------------

/// Timing tolerances for the scheduling core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LipsyncConfig {
    /// Maximum drift (seconds) between the expected and observed playback
    /// position before a pause/resume or seek is treated as a new scheduling
    /// epoch.  Below this the live scheduler simply carries on.
    pub seek_tolerance_secs: f32,

    /// Poll interval (milliseconds) while the clock is paused and the
    /// scheduler is waiting for it to start advancing again.
    pub pause_poll_ms: u64,

    /// Lower bound (milliseconds) on any scheduler sleep, so float noise in
    /// the projected remaining time never degenerates into a busy loop.
    pub min_sleep_ms: u64,
}

impl Default for LipsyncConfig {
    fn default() -> Self {
        Self {
            seek_tolerance_secs: 0.25,
            pause_poll_ms: 50,
            min_sleep_ms: 2,
        }
    }
}

impl LipsyncConfig {
    /// Load configuration from the platform-appropriate `lipsync.toml`.
    ///
    /// Returns `Ok(LipsyncConfig::default())` when the file does not exist
    /// yet (first-run scenario) so callers never need to special-case a
    /// missing file.
    pub fn load() -> Result<Self> {
        Self::load_from(&AppPaths::new().settings_file)
    }

    /// Load from an explicit path (useful for tests).
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to the platform-appropriate `lipsync.toml`,
    /// creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        self.save_to(&AppPaths::new().settings_file)
    }

    /// Save to an explicit path (useful for tests).
    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    /// Verify that a default `LipsyncConfig` survives a TOML round trip.
    #[test]
    fn round_trip_toml() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("lipsync.toml");

        let original = LipsyncConfig::default();
        original.save_to(&path).expect("save");

        let loaded = LipsyncConfig::load_from(&path).expect("load");
        assert_eq!(original, loaded);
    }

    /// `load_from` on a non-existent path must return `Default` without error.
    #[test]
    fn load_missing_returns_default() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("nonexistent.toml");

        let config = LipsyncConfig::load_from(&path).expect("should not error");
        assert_eq!(config, LipsyncConfig::default());
    }

    #[test]
    fn default_values_match_design() {
        let cfg = LipsyncConfig::default();
        assert!((cfg.seek_tolerance_secs - 0.25).abs() < f32::EPSILON);
        assert_eq!(cfg.pause_poll_ms, 50);
        assert_eq!(cfg.min_sleep_ms, 2);
    }

    /// Modified non-default values survive a round trip.
    #[test]
    fn round_trip_modified_values() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("modified.toml");

        let mut cfg = LipsyncConfig::default();
        cfg.seek_tolerance_secs = 0.5;
        cfg.pause_poll_ms = 100;

        cfg.save_to(&path).expect("save");
        let loaded = LipsyncConfig::load_from(&path).expect("load");

        assert!((loaded.seek_tolerance_secs - 0.5).abs() < f32::EPSILON);
        assert_eq!(loaded.pause_poll_ms, 100);
    }

    /// Unknown keys in the file are ignored; missing keys take defaults.
    #[test]
    fn partial_file_fills_in_defaults() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("partial.toml");
        std::fs::write(&path, "seek_tolerance_secs = 0.4\n").expect("write");

        let loaded = LipsyncConfig::load_from(&path).expect("load");
        assert!((loaded.seek_tolerance_secs - 0.4).abs() < f32::EPSILON);
        assert_eq!(loaded.pause_poll_ms, 50);
    }
}
