//! Validation rules derived from field definitions

use formkit_common::{DependencyAction, FieldDefinition, FieldDependency};
use formkit_expr::format_number;
use regex::Regex;
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use tracing::warn;

/// Rules per field keyword
pub type RuleSet = BTreeMap<String, Vec<ValidationRule>>;

/// What a rule checks
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RuleKind {
    /// Value must be present
    Required,
    /// Value must match a regular expression
    Pattern {
        /// Compiled pattern
        #[serde(serialize_with = "regex_as_str")]
        regex: Regex,
    },
    /// Numeric lower bound
    Min {
        /// Bound
        value: f64,
    },
    /// Numeric upper bound
    Max {
        /// Bound
        value: f64,
    },
    /// Minimum character count
    MinLength {
        /// Bound
        value: usize,
    },
    /// Maximum character count
    MaxLength {
        /// Bound
        value: usize,
    },
    /// Expression that must be truthy with the candidate value substituted
    Expression {
        /// Source text
        expression: String,
    },
}

fn regex_as_str<S: Serializer>(regex: &Regex, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(regex.as_str())
}

/// One check with its message and optional gate
#[derive(Debug, Clone, Serialize)]
pub struct ValidationRule {
    /// Check to run
    pub kind: RuleKind,
    /// Message reported on failure
    pub message: String,
    /// Rule only applies while this expression is truthy
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
}

impl ValidationRule {
    /// Rule without a gate
    pub fn new(kind: RuleKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            condition: None,
        }
    }

    /// Attach a gating condition
    pub fn when(mut self, condition: impl Into<String>) -> Self {
        self.condition = Some(condition.into());
        self
    }

    /// Whether this is the required check
    pub fn is_required(&self) -> bool {
        matches!(self.kind, RuleKind::Required)
    }
}

fn label(field: &FieldDefinition) -> &str {
    if field.caption.trim().is_empty() {
        &field.keyword
    } else {
        &field.caption
    }
}

fn required_rule(field: &FieldDefinition) -> ValidationRule {
    ValidationRule::new(RuleKind::Required, format!("{} is required", label(field)))
}

/// Derive the rules for each field from its static constraints
///
/// Fields without constraints get no entry. Invalid regex patterns are
/// logged and skipped.
pub fn build_validation_rules(fields: &[FieldDefinition]) -> RuleSet {
    let mut rules = RuleSet::new();

    for field in fields {
        let caption = label(field);
        let mut field_rules = Vec::new();

        if field.is_mandatory {
            field_rules.push(required_rule(field));
        }

        if let Some(pattern) = field.regex.as_deref().filter(|p| !p.is_empty()) {
            match Regex::new(pattern) {
                Ok(regex) => field_rules.push(ValidationRule::new(
                    RuleKind::Pattern { regex },
                    format!("{} format is invalid", caption),
                )),
                Err(e) => {
                    warn!(field = %field.keyword, pattern, error = %e, "invalid regex dropped")
                }
            }
        }

        if let Some(min) = field.min_value {
            field_rules.push(ValidationRule::new(
                RuleKind::Min { value: min },
                format!("{} must be at least {}", caption, format_number(min)),
            ));
        }
        if let Some(max) = field.max_value {
            field_rules.push(ValidationRule::new(
                RuleKind::Max { value: max },
                format!("{} must be at most {}", caption, format_number(max)),
            ));
        }
        if let Some(min) = field.min_length {
            field_rules.push(ValidationRule::new(
                RuleKind::MinLength { value: min },
                format!("{} must be at least {} characters", caption, min),
            ));
        }
        if let Some(max) = field.max_length {
            field_rules.push(ValidationRule::new(
                RuleKind::MaxLength { value: max },
                format!("{} must be at most {} characters", caption, max),
            ));
        }

        if let Some(expression) = field
            .additional_condition
            .as_deref()
            .filter(|e| !e.trim().is_empty())
        {
            field_rules.push(ValidationRule::new(
                RuleKind::Expression {
                    expression: expression.to_string(),
                },
                format!("{} validation failed", caption),
            ));
        }

        if let Some(condition) = field
            .validation_condition
            .as_deref()
            .filter(|c| !c.trim().is_empty())
        {
            for rule in &mut field_rules {
                rule.condition = Some(condition.to_string());
            }
        }

        if !field_rules.is_empty() {
            rules.insert(field.keyword.clone(), field_rules);
        }
    }

    rules
}

/// Add a required rule for every field a `mandatory` dependency can target
///
/// Whether it applies is then decided by the field's mandatory flag in state.
pub fn add_conditional_required(
    rules: &mut RuleSet,
    fields: &[FieldDefinition],
    dependencies: &[FieldDependency],
) {
    for dep in dependencies
        .iter()
        .filter(|d| d.action == DependencyAction::Mandatory)
    {
        let Some(field) = fields.iter().find(|f| f.keyword == dep.actioned_keyword) else {
            continue;
        };
        let entry = rules.entry(field.keyword.clone()).or_default();
        if entry.iter().any(ValidationRule::is_required) {
            continue;
        }
        let mut rule = required_rule(field);
        if let Some(condition) = field
            .validation_condition
            .as_deref()
            .filter(|c| !c.trim().is_empty())
        {
            rule.condition = Some(condition.to_string());
        }
        entry.insert(0, rule);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rules_from_constraints() {
        let mut field = FieldDefinition::new("AGE", "Age");
        field.is_mandatory = true;
        field.min_value = Some(18.0);
        field.max_value = Some(65.5);
        field.additional_condition = Some("@AGE != 40".into());

        let rules = build_validation_rules(&[field, FieldDefinition::new("FREE", "Free")]);
        assert!(!rules.contains_key("FREE"));
        let age = &rules["AGE"];
        assert_eq!(age.len(), 4);
        assert_eq!(age[0].message, "Age is required");
        assert_eq!(age[1].message, "Age must be at least 18");
        assert_eq!(age[2].message, "Age must be at most 65.5");
        assert_eq!(age[3].message, "Age validation failed");
    }

    #[test]
    fn test_invalid_regex_is_dropped() {
        let mut field = FieldDefinition::new("PAN", "PAN");
        field.regex = Some("([A-Z".into());
        field.max_length = Some(10);
        let rules = build_validation_rules(&[field]);
        assert_eq!(rules["PAN"].len(), 1);
        assert!(matches!(rules["PAN"][0].kind, RuleKind::MaxLength { value: 10 }));
    }

    #[test]
    fn test_validation_condition_gates_every_rule() {
        let mut field = FieldDefinition::new("NOMINEE", "Nominee");
        field.is_mandatory = true;
        field.min_length = Some(2);
        field.validation_condition = Some("@HAS_NOMINEE == 'Y'".into());
        let rules = build_validation_rules(&[field]);
        assert!(rules["NOMINEE"]
            .iter()
            .all(|r| r.condition.as_deref() == Some("@HAS_NOMINEE == 'Y'")));
    }

    #[test]
    fn test_conditional_required() {
        let fields = vec![FieldDefinition::new("GST", "GST Number")];
        let mut rules = build_validation_rules(&fields);
        add_conditional_required(
            &mut rules,
            &fields,
            &[FieldDependency::on_value("BUSINESS", "Y", DependencyAction::Mandatory, "GST")],
        );
        assert_eq!(rules["GST"].len(), 1);
        assert!(rules["GST"][0].is_required());
        assert_eq!(rules["GST"][0].message, "GST Number is required");
    }

    #[test]
    fn test_rules_serialize() {
        let mut field = FieldDefinition::new("PIN", "Pin");
        field.regex = Some(r"^\d{6}$".into());
        let rules = build_validation_rules(&[field]);
        let json = serde_json::to_value(&rules["PIN"][0]).unwrap();
        assert_eq!(json["kind"]["type"], "pattern");
        assert_eq!(json["kind"]["regex"], r"^\d{6}$");
        assert!(json.get("condition").is_none());
    }
}
