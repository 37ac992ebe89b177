//! Configuration module for the lipsync engine.
//!
//! Provides [`LipsyncConfig`] (scheduling tolerances), [`AppPaths`] for the
//! cross-platform config directory, and TOML persistence via
//! `LipsyncConfig::load` / `LipsyncConfig::save`.

pub mod paths;
pub mod settings;

pub use paths::AppPaths;
pub use settings::LipsyncConfig;
