//! Option lists for fields backed by lookup tables
//!
//! A sourced field names a table in the schema's registry. Rows are filtered
//! by the field's lookup condition (`col = valueExpr AND col2 = valueExpr`),
//! then projected into [`FieldOption`]s through the configured value and
//! display columns. Value expressions and projected cells may reference form
//! fields with `@NAME`.

#![warn(missing_docs)]
#![warn(clippy::all)]

use formkit_common::{
    DataSourceSpec, FieldDefinition, FieldOption, FormError, FormResult, TableRegistry, TableRow,
    ValueMap,
};
use formkit_expr::{extract_references, EvalContext, ExpressionEvaluator};
use regex::Regex;
use std::sync::{Arc, OnceLock};
use tracing::{debug, warn};

const DEFAULT_VALUE_COLUMN: &str = "value";
const DEFAULT_DISPLAY_COLUMN: &str = "display";

fn conjunction() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?i)\s+and\s+").ok()).as_ref()
}

/// One `column = valueExpr` predicate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupPredicate {
    /// Row column to compare
    pub column: String,
    /// Literal or expression producing the expected value
    pub value: String,
}

/// Parse an `AND`-joined lookup condition
pub fn parse_lookup(condition: &str) -> FormResult<Vec<LookupPredicate>> {
    let parts: Vec<&str> = match conjunction() {
        Some(re) => re.split(condition.trim()).collect(),
        None => vec![condition.trim()],
    };

    parts
        .into_iter()
        .filter(|part| !part.trim().is_empty())
        .map(|part| {
            let (column, value) = part.split_once('=').ok_or_else(|| {
                FormError::DataSource(format!("lookup predicate `{}` has no `=`", part.trim()))
            })?;
            // tolerate `==`
            let value = value.trim_start_matches('=').trim();
            let column = column.trim();
            if column.is_empty() || value.is_empty() {
                return Err(FormError::DataSource(format!(
                    "lookup predicate `{}` is incomplete",
                    part.trim()
                )));
            }
            Ok(LookupPredicate {
                column: column.to_string(),
                value: value.to_string(),
            })
        })
        .collect()
}

/// Resolves option lists from the schema's table registry
pub struct DataSourceResolver {
    tables: Arc<TableRegistry>,
    evaluator: Arc<ExpressionEvaluator>,
}

impl DataSourceResolver {
    /// Create resolver over a table registry
    pub fn new(tables: Arc<TableRegistry>, evaluator: Arc<ExpressionEvaluator>) -> Self {
        Self { tables, evaluator }
    }

    /// Rows of a named table
    pub fn table(&self, name: &str) -> Option<&[TableRow]> {
        self.tables.get(name).map(Vec::as_slice)
    }

    /// Options for a sourced field given the current form values
    ///
    /// Missing tables and malformed lookups are logged and yield no options.
    pub fn resolve_field_options(&self, field: &FieldDefinition, values: &ValueMap) -> Vec<FieldOption> {
        let Some(spec) = sourced(field) else {
            return Vec::new();
        };
        let Some(rows) = self.table(&spec.table) else {
            warn!(field = %field.keyword, table = %spec.table, "data source table not found");
            return Vec::new();
        };

        let metadata = spec.metadata.clone().unwrap_or_default();
        let predicates = match metadata.lookup.as_deref().filter(|l| !l.trim().is_empty()) {
            Some(lookup) => match parse_lookup(lookup) {
                Ok(predicates) => predicates,
                Err(e) => {
                    warn!(field = %field.keyword, error = %e, "malformed lookup condition");
                    return Vec::new();
                }
            },
            None => Vec::new(),
        };

        let value_column = column_or(metadata.value_column.as_deref(), DEFAULT_VALUE_COLUMN);
        let display_column = column_or(metadata.display_column.as_deref(), DEFAULT_DISPLAY_COLUMN);

        let expected: Vec<(&str, String)> = predicates
            .iter()
            .map(|p| (p.column.as_str(), self.resolve_cell(unquote(&p.value), values)))
            .collect();

        let options: Vec<FieldOption> = rows
            .iter()
            .filter(|row| {
                expected
                    .iter()
                    .all(|(column, want)| row.get(*column).is_some_and(|have| have == want))
            })
            .filter_map(|row| {
                let raw_value = row.get(value_column)?;
                let value = self.resolve_cell(raw_value, values);
                let display = row
                    .get(display_column)
                    .map(|cell| self.resolve_cell(cell, values))
                    .unwrap_or_else(|| value.clone());
                Some((value, display))
            })
            .enumerate()
            .map(|(index, (value, display))| FieldOption {
                id: format!("{}_{}", spec.table, index),
                keyword: field.keyword.clone(),
                display,
                value,
                default_selected: false,
                sequence: index as i64,
                transaction_code: field.transaction_code.clone(),
                calc_step: field.calc_step.clone(),
            })
            .collect();

        debug!(field = %field.keyword, table = %spec.table, options = options.len(), "resolved data source");
        options
    }

    /// Fields whose values change this field's option list
    ///
    /// Covers references in the lookup condition, in the column specs, and
    /// in the projected cells of the table.
    pub fn get_data_source_dependencies(&self, field: &FieldDefinition) -> Vec<String> {
        let Some(spec) = sourced(field) else {
            return Vec::new();
        };
        let metadata = spec.metadata.clone().unwrap_or_default();
        let mut deps: Vec<String> = Vec::new();
        let mut add = |text: &str| {
            for name in extract_references(text) {
                if !deps.contains(&name) {
                    deps.push(name);
                }
            }
        };

        if let Some(lookup) = metadata.lookup.as_deref() {
            add(lookup);
        }
        if let Some(column) = metadata.value_column.as_deref() {
            add(column);
        }
        if let Some(column) = metadata.display_column.as_deref() {
            add(column);
        }

        let value_column = column_or(metadata.value_column.as_deref(), DEFAULT_VALUE_COLUMN);
        let display_column = column_or(metadata.display_column.as_deref(), DEFAULT_DISPLAY_COLUMN);
        for row in self.table(&spec.table).unwrap_or_default() {
            for column in [value_column, display_column] {
                if let Some(cell) = row.get(column) {
                    add(cell);
                }
            }
        }

        deps
    }

    /// Evaluate a cell or value expression when it references fields
    ///
    /// Failures and `null` results fall back to the raw text.
    fn resolve_cell(&self, text: &str, values: &ValueMap) -> String {
        if !text.contains('@') {
            return text.to_string();
        }
        match self.evaluator.evaluate(text, &EvalContext::new(values)) {
            Ok(result) if !result.value.is_null() => result.value.to_canonical(),
            _ => text.to_string(),
        }
    }
}

fn sourced(field: &FieldDefinition) -> Option<&DataSourceSpec> {
    field.data_source().filter(|spec| !spec.table.trim().is_empty())
}

fn unquote(text: &str) -> &str {
    for quote in ['\'', '"'] {
        if let Some(inner) = text.strip_prefix(quote).and_then(|t| t.strip_suffix(quote)) {
            return inner;
        }
    }
    text
}

fn column_or<'a>(configured: Option<&'a str>, default: &'a str) -> &'a str {
    configured.map(str::trim).filter(|c| !c.is_empty()).unwrap_or(default)
}
