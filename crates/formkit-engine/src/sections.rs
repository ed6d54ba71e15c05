//! Presentation grouping of fields

use formkit_common::{FieldDefinition, FieldOption};
use serde::Serialize;

/// Section name used for fields that declare none
pub const DEFAULT_SECTION: &str = "DEFAULT";

/// One field with everything a renderer needs
#[derive(Clone, Debug, Serialize)]
pub struct SectionField {
    /// Static definition
    pub definition: FieldDefinition,
    /// Current raw value
    pub value: Option<String>,
    /// Visibility flag
    pub visible: bool,
    /// Disabled flag
    pub disabled: bool,
    /// Read-only flag
    pub readonly: bool,
    /// Mandatory flag
    pub mandatory: bool,
    /// Options offered under the current values
    pub options: Vec<FieldOption>,
    /// Current error messages
    pub errors: Vec<String>,
}

/// Fields sharing a section name
#[derive(Clone, Debug, Serialize)]
pub struct FormSection {
    /// Raw section name
    pub name: String,
    /// Display title
    pub title: String,
    /// At least one field is visible
    pub visible: bool,
    /// Fields ordered by sequence
    pub fields: Vec<SectionField>,
}

impl FormSection {
    pub(crate) fn new(name: String, mut fields: Vec<SectionField>) -> Self {
        fields.sort_by_key(|f| f.definition.sequence.unwrap_or(i64::MAX));
        Self {
            title: format_section_name(&name),
            visible: fields.iter().any(|f| f.visible),
            name,
            fields,
        }
    }
}

/// `PERSONAL_DETAILS_SECTION` → `Personal Details`
pub fn format_section_name(name: &str) -> String {
    let spaced = name.replace('_', " ");
    let stripped = spaced.strip_suffix("SECTION").unwrap_or(&spaced);
    stripped
        .split_whitespace()
        .map(|word| {
            let lower = word.to_lowercase();
            let mut chars = lower.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Keep the first option per value, then order by sequence
pub(crate) fn dedupe_and_sort(options: impl IntoIterator<Item = FieldOption>) -> Vec<FieldOption> {
    let mut seen = std::collections::BTreeSet::new();
    let mut unique: Vec<FieldOption> = options
        .into_iter()
        .filter(|o| seen.insert(o.value.clone()))
        .collect();
    unique.sort_by_key(|o| o.sequence);
    unique
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_section_name() {
        assert_eq!(format_section_name("PERSONAL_DETAILS_SECTION"), "Personal Details");
        assert_eq!(format_section_name("NOMINEE"), "Nominee");
        assert_eq!(format_section_name("DEFAULT"), "Default");
        assert_eq!(format_section_name("plan_info"), "Plan Info");
        assert_eq!(format_section_name(""), "");
    }

    #[test]
    fn test_dedupe_and_sort() {
        let mut a = FieldOption::new("F", "A", "first");
        a.sequence = 2;
        let mut b = FieldOption::new("F", "B", "b");
        b.sequence = 1;
        let dup = FieldOption::new("F", "A", "second");

        let options = dedupe_and_sort([a, b, dup]);
        assert_eq!(options.len(), 2);
        assert_eq!(options[0].value, "B");
        assert_eq!(options[1].display, "first");
    }

    #[test]
    fn test_section_visible_when_any_field_visible() {
        let field = |keyword: &str, sequence: i64, visible: bool| {
            let mut definition = FieldDefinition::new(keyword, keyword);
            definition.sequence = Some(sequence);
            SectionField {
                definition,
                value: None,
                visible,
                disabled: false,
                readonly: false,
                mandatory: false,
                options: vec![],
                errors: vec![],
            }
        };

        let section = FormSection::new(
            "PLAN_SECTION".into(),
            vec![field("B", 2, false), field("A", 1, true)],
        );
        assert!(section.visible);
        assert_eq!(section.title, "Plan");
        assert_eq!(section.fields[0].definition.keyword, "A");

        let hidden = FormSection::new("X".into(), vec![field("C", 1, false)]);
        assert!(!hidden.visible);
    }
}
