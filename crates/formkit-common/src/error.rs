//! Error types for formkit

use crate::state::ErrorMap;
use thiserror::Error;

/// formkit error type
#[derive(Error, Debug)]
pub enum FormError {
    /// Submission blocked by field errors
    #[error("validation failed for {} field(s)", errors.len())]
    ValidationFailed {
        /// Per-field messages
        errors: ErrorMap,
    },

    /// Dependency rules form a cycle
    #[error("circular dependency: {}", format_cycles(cycles))]
    CircularDependency {
        /// Detected cycle paths
        cycles: Vec<Vec<String>>,
    },

    /// Expression could not be evaluated
    #[error("expression `{expression}` failed: {message}")]
    Expression {
        /// Raw expression text
        expression: String,
        /// Evaluator message
        message: String,
    },

    /// Data source misconfiguration
    #[error("data source error: {0}")]
    DataSource(String),

    /// Schema payload is unusable
    #[error("schema error: {0}")]
    Schema(String),

    /// Configuration error
    #[error("config error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

fn format_cycles(cycles: &[Vec<String>]) -> String {
    cycles
        .iter()
        .map(|cycle| cycle.join(" -> "))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Result type for formkit
pub type FormResult<T> = Result<T, FormError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cycle_message() {
        let err = FormError::CircularDependency {
            cycles: vec![vec!["A".into(), "B".into(), "A".into()]],
        };
        assert_eq!(err.to_string(), "circular dependency: A -> B -> A");
    }

    #[test]
    fn test_validation_message() {
        let mut errors = ErrorMap::new();
        errors.insert("NAME".into(), vec!["Name is required".into()]);
        let err = FormError::ValidationFailed { errors };
        assert_eq!(err.to_string(), "validation failed for 1 field(s)");
    }
}
