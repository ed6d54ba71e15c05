//! Rule application against form state

use crate::rules::{RuleKind, RuleSet, ValidationRule};
use formkit_common::{ErrorMap, FormState};
use formkit_expr::{EvalContext, ExpressionEvaluator};
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::debug;

/// Outcome of validating a set of fields
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationResult {
    /// No field reported an error
    pub valid: bool,
    /// Messages per failing field
    pub errors: ErrorMap,
}

/// Applies [`ValidationRule`]s; holds no per-call state
pub struct FormValidator {
    evaluator: Arc<ExpressionEvaluator>,
}

impl FormValidator {
    /// Create validator sharing an evaluator
    pub fn new(evaluator: Arc<ExpressionEvaluator>) -> Self {
        Self { evaluator }
    }

    /// Run `rules` against one candidate value, collecting every failure
    pub fn validate_field(
        &self,
        field: &str,
        value: Option<&str>,
        rules: &[ValidationRule],
        state: &FormState,
    ) -> Vec<String> {
        let mut errors = Vec::new();
        let present = value.filter(|v| !v.is_empty());

        for rule in rules {
            if let Some(condition) = rule.condition.as_deref() {
                if !self
                    .evaluator
                    .evaluate_boolean(condition, &EvalContext::new(&state.values))
                {
                    continue;
                }
            }

            let failed = match &rule.kind {
                RuleKind::Required => {
                    if state.mandatory.get(field) == Some(&false) {
                        continue;
                    }
                    is_empty(value)
                }
                RuleKind::Pattern { regex } => present.is_some_and(|v| !regex.is_match(v)),
                RuleKind::Min { value: min } => number(present).is_some_and(|n| n < *min),
                RuleKind::Max { value: max } => number(present).is_some_and(|n| n > *max),
                RuleKind::MinLength { value: min } => {
                    present.is_some_and(|v| v.chars().count() < *min)
                }
                RuleKind::MaxLength { value: max } => {
                    present.is_some_and(|v| v.chars().count() > *max)
                }
                RuleKind::Expression { expression } => {
                    let ctx = EvalContext::new(&state.values).with_override(field, value.unwrap_or(""));
                    !self.evaluator.evaluate_boolean(expression, &ctx)
                }
            };

            if failed {
                errors.push(rule.message.clone());
            }
        }

        errors
    }

    /// Validate every ruled field that is visible
    ///
    /// With `visible`, fields outside that set are skipped too. Fields whose
    /// state visibility is `false` never report errors.
    pub fn validate_form(
        &self,
        state: &FormState,
        rules: &RuleSet,
        visible: Option<&BTreeSet<String>>,
    ) -> ValidationResult {
        let mut errors = ErrorMap::new();

        for (field, field_rules) in rules {
            if visible.is_some_and(|set| !set.contains(field)) {
                continue;
            }
            if !state.is_visible(field) {
                continue;
            }
            let messages = self.validate_field(field, state.value(field), field_rules, state);
            if !messages.is_empty() {
                errors.insert(field.clone(), messages);
            }
        }

        debug!(fields = rules.len(), failing = errors.len(), "form validated");
        ValidationResult {
            valid: errors.is_empty(),
            errors,
        }
    }

    /// Validate only the named fields
    pub fn validate_fields<S: AsRef<str>>(
        &self,
        fields: &[S],
        state: &FormState,
        rules: &RuleSet,
    ) -> ValidationResult {
        let mut errors = ErrorMap::new();

        for field in fields.iter().map(AsRef::as_ref) {
            let Some(field_rules) = rules.get(field) else {
                continue;
            };
            let messages = self.validate_field(field, state.value(field), field_rules, state);
            if !messages.is_empty() {
                errors.insert(field.to_string(), messages);
            }
        }

        ValidationResult {
            valid: errors.is_empty(),
            errors,
        }
    }

    /// All messages, field order
    pub fn summary(&self, errors: &ErrorMap) -> Vec<String> {
        errors.values().flatten().cloned().collect()
    }

    /// Whether `field` carries at least one message
    pub fn has_field_error(&self, field: &str, errors: &ErrorMap) -> bool {
        errors.get(field).is_some_and(|messages| !messages.is_empty())
    }
}

/// Absent, empty string and empty JSON list count as empty
fn is_empty(value: Option<&str>) -> bool {
    matches!(value, None | Some("") | Some("[]"))
}

fn number(value: Option<&str>) -> Option<f64> {
    value.and_then(|v| v.trim().parse::<f64>().ok())
}
