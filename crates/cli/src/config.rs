//! CLI configuration utilities

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use talent_core::SessionConfig;

/// File holding the persisted session inside the data directory
pub const SESSION_FILE: &str = "session.json";

/// Load configuration from `path`, or from the default sources
///
/// Either way `TALENT__*` environment variables take precedence.
pub fn load_config(path: Option<&Path>) -> Result<SessionConfig> {
    match path {
        Some(path) => SessionConfig::load_from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display())),
        None => SessionConfig::load().context("Failed to load configuration"),
    }
}

/// Resolve the data directory: flag, then `TALENT_STATE_DIR`, then the system data dir
pub fn data_dir(flag: Option<PathBuf>) -> PathBuf {
    flag.unwrap_or_else(|| {
        std::env::var_os("TALENT_STATE_DIR").map_or_else(
            || {
                dirs::data_dir()
                    .unwrap_or_else(|| PathBuf::from("."))
                    .join("talent-connect")
            },
            PathBuf::from,
        )
    })
}
