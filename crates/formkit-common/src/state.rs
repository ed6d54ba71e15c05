//! Form state aggregate

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Field values in canonical string form
pub type ValueMap = BTreeMap<String, String>;

/// Field errors: field → messages
pub type ErrorMap = BTreeMap<String, Vec<String>>;

/// Complete mutable snapshot of one form session
///
/// Flags are stored per field; a missing entry means "not computed", which
/// the accessors resolve to the neutral default (visible, enabled, editable,
/// optional).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormState {
    /// Current values
    pub values: ValueMap,
    /// Current errors
    pub errors: ErrorMap,
    /// Fields that have been blurred
    pub touched: BTreeSet<String>,
    /// Visibility per field
    pub visibility: BTreeMap<String, bool>,
    /// Disabled flag per field
    pub disabled: BTreeMap<String, bool>,
    /// Read-only flag per field
    pub readonly: BTreeMap<String, bool>,
    /// Mandatory flag per field
    pub mandatory: BTreeMap<String, bool>,
}

/// Snapshot of the UI-affecting flags only
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UiFlags {
    /// Visibility per field
    pub visibility: BTreeMap<String, bool>,
    /// Disabled flag per field
    pub disabled: BTreeMap<String, bool>,
    /// Read-only flag per field
    pub readonly: BTreeMap<String, bool>,
    /// Mandatory flag per field
    pub mandatory: BTreeMap<String, bool>,
}

impl FormState {
    /// State seeded with the given values
    pub fn with_values(values: ValueMap) -> Self {
        Self {
            values,
            ..Default::default()
        }
    }

    /// Raw value of a field
    #[inline]
    pub fn value(&self, field: &str) -> Option<&str> {
        self.values.get(field).map(String::as_str)
    }

    /// Whether the field holds a non-empty value
    #[inline]
    pub fn has_value(&self, field: &str) -> bool {
        self.value(field).is_some_and(|v| !v.is_empty())
    }

    /// Visible unless explicitly hidden
    #[inline]
    pub fn is_visible(&self, field: &str) -> bool {
        self.visibility.get(field).copied().unwrap_or(true)
    }

    /// Disabled only when flagged
    #[inline]
    pub fn is_disabled(&self, field: &str) -> bool {
        self.disabled.get(field).copied().unwrap_or(false)
    }

    /// Read-only only when flagged
    #[inline]
    pub fn is_readonly(&self, field: &str) -> bool {
        self.readonly.get(field).copied().unwrap_or(false)
    }

    /// Mandatory only when flagged
    #[inline]
    pub fn is_mandatory(&self, field: &str) -> bool {
        self.mandatory.get(field).copied().unwrap_or(false)
    }

    /// Errors of a field (empty slice when none)
    pub fn field_errors(&self, field: &str) -> &[String] {
        self.errors.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Copy out the UI flags
    pub fn ui_flags(&self) -> UiFlags {
        UiFlags {
            visibility: self.visibility.clone(),
            disabled: self.disabled.clone(),
            readonly: self.readonly.clone(),
            mandatory: self.mandatory.clone(),
        }
    }

    /// Overwrite the UI flags
    pub fn restore_ui_flags(&mut self, flags: UiFlags) {
        self.visibility = flags.visibility;
        self.disabled = flags.disabled;
        self.readonly = flags.readonly;
        self.mandatory = flags.mandatory;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_defaults() {
        let state = FormState::default();
        assert!(state.is_visible("ANY"));
        assert!(!state.is_disabled("ANY"));
        assert!(!state.is_readonly("ANY"));
        assert!(!state.is_mandatory("ANY"));
        assert!(state.field_errors("ANY").is_empty());
    }

    #[test]
    fn test_has_value() {
        let mut values = ValueMap::new();
        values.insert("A".into(), "x".into());
        values.insert("B".into(), String::new());
        let state = FormState::with_values(values);

        assert!(state.has_value("A"));
        assert!(!state.has_value("B"));
        assert!(!state.has_value("C"));
    }

    #[test]
    fn test_ui_flags_roundtrip() {
        let mut state = FormState::default();
        state.visibility.insert("A".into(), false);
        let flags = state.ui_flags();

        state.visibility.insert("A".into(), true);
        state.disabled.insert("A".into(), true);
        state.restore_ui_flags(flags);

        assert!(!state.is_visible("A"));
        assert!(!state.is_disabled("A"));
    }
}
