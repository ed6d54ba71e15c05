//! Session options

use formkit_common::{EngineConfig, ValueMap};

/// Inputs to [`FormEngine::initialize`](crate::FormEngine::initialize)
#[derive(Debug, Clone, Default)]
pub struct EngineOptions {
    /// Caller-supplied initial values; also the target of `reset`
    pub initial_values: ValueMap,
    /// Transaction context; falls back to the config default
    pub transaction_code: Option<String>,
    /// Step context; falls back to the config default
    pub calc_step: Option<String>,
    /// Engine configuration
    pub config: EngineConfig,
}

impl EngineOptions {
    /// Options with default configuration and no initial values
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the initial values
    pub fn with_values(mut self, values: ValueMap) -> Self {
        self.initial_values = values;
        self
    }

    /// Add one initial value
    pub fn with_value(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.initial_values.insert(field.into(), value.into());
        self
    }

    /// Select the transaction/step context
    pub fn for_context(mut self, transaction_code: impl Into<String>, calc_step: impl Into<String>) -> Self {
        self.transaction_code = Some(transaction_code.into());
        self.calc_step = Some(calc_step.into());
        self
    }

    /// Replace the configuration
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Effective (transaction code, calc step)
    pub fn context(&self) -> (String, String) {
        (
            self.transaction_code
                .clone()
                .unwrap_or_else(|| self.config.transaction_code.clone()),
            self.calc_step
                .clone()
                .unwrap_or_else(|| self.config.calc_step.clone()),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_falls_back_to_config() {
        let options = EngineOptions::new();
        assert_eq!(options.context(), ("ISSU".to_string(), "NBQUOTE".to_string()));

        let options = options.for_context("ENDT", "QUOTE").with_value("A", "1");
        assert_eq!(options.context(), ("ENDT".to_string(), "QUOTE".to_string()));
        assert_eq!(options.initial_values["A"], "1");
    }
}
