//! Engine configuration
//!
//! ```toml
//! transaction_code = "ISSU"
//! calc_step = "NBQUOTE"
//! reset_policy = "keep_ui_state"
//!
//! [parse_cache]
//! kind = "bounded"
//! capacity = 4096
//! ```

use crate::error::{FormError, FormResult};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// Default transaction context
pub const DEFAULT_TRANSACTION_CODE: &str = "ISSU";

/// Default step context
pub const DEFAULT_CALC_STEP: &str = "NBQUOTE";

/// What `reset` does with visibility/disabled/readonly/mandatory
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResetPolicy {
    /// Leave the flags as they are at reset time
    #[default]
    KeepUiState,
    /// Restore the flags computed at initialization
    RestoreUiState,
}

/// Eviction policy of the expression parse cache
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CachePolicy {
    /// Keep every parsed expression for the evaluator's lifetime
    #[default]
    Unbounded,
    /// Keep at most `capacity` entries
    Bounded {
        /// Maximum number of entries
        capacity: u64,
    },
}

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Transaction context used when the caller does not supply one
    pub transaction_code: String,
    /// Step context used when the caller does not supply one
    pub calc_step: String,
    /// Reset behaviour
    pub reset_policy: ResetPolicy,
    /// Parse cache policy
    pub parse_cache: CachePolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            transaction_code: DEFAULT_TRANSACTION_CODE.to_string(),
            calc_step: DEFAULT_CALC_STEP.to_string(),
            reset_policy: ResetPolicy::default(),
            parse_cache: CachePolicy::default(),
        }
    }
}

impl EngineConfig {
    /// Parse from TOML text
    pub fn from_toml_str(content: &str) -> FormResult<Self> {
        let config: Self = toml::from_str(content).map_err(|e| FormError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a TOML file
    pub fn load(path: impl AsRef<Path>) -> FormResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&content)?;
        debug!(path = %path.display(), policy = ?config.parse_cache, "engine config loaded");
        Ok(config)
    }

    /// Serialize to TOML text
    pub fn to_toml_string(&self) -> FormResult<String> {
        toml::to_string_pretty(self).map_err(|e| FormError::Config(e.to_string()))
    }

    fn validate(&self) -> FormResult<()> {
        if let CachePolicy::Bounded { capacity: 0 } = self.parse_cache {
            return Err(FormError::Config("parse_cache capacity must be positive".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty() {
        let config = EngineConfig::from_toml_str("").unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.transaction_code, "ISSU");
        assert_eq!(config.parse_cache, CachePolicy::Unbounded);
    }

    #[test]
    fn test_full_config() {
        let config = EngineConfig::from_toml_str(
            r#"
            transaction_code = "ENDT"
            calc_step = "QUOTE"
            reset_policy = "restore_ui_state"

            [parse_cache]
            kind = "bounded"
            capacity = 128
            "#,
        )
        .unwrap();

        assert_eq!(config.transaction_code, "ENDT");
        assert_eq!(config.reset_policy, ResetPolicy::RestoreUiState);
        assert_eq!(config.parse_cache, CachePolicy::Bounded { capacity: 128 });
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let err = EngineConfig::from_toml_str("[parse_cache]\nkind = \"bounded\"\ncapacity = 0\n");
        assert!(matches!(err, Err(FormError::Config(_))));
    }

    #[test]
    fn test_toml_roundtrip() {
        let config = EngineConfig {
            parse_cache: CachePolicy::Bounded { capacity: 64 },
            ..Default::default()
        };
        let text = config.to_toml_string().unwrap();
        assert_eq!(EngineConfig::from_toml_str(&text).unwrap(), config);
    }
}
