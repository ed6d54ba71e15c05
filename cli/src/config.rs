//! CLI configuration lookup

use anyhow::Context;
use formkit_common::EngineConfig;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Explicit path, else `~/.formkit/config.toml` when present, else defaults
pub fn load(explicit: Option<&Path>) -> anyhow::Result<EngineConfig> {
    if let Some(path) = explicit {
        return EngineConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()));
    }
    match default_path().filter(|p| p.exists()) {
        Some(path) => {
            debug!(path = %path.display(), "using user config");
            EngineConfig::load(&path).with_context(|| format!("loading config {}", path.display()))
        }
        None => Ok(EngineConfig::default()),
    }
}

fn default_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".formkit").join("config.toml"))
}
