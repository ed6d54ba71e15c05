//! CLI commands

pub mod eval;
pub mod inspect;
pub mod run;

use anyhow::Context;
use formkit_common::{ProductSchema, ValueMap};
use std::path::Path;

/// Read a schema file (bare schema or service envelope)
pub fn load_schema(path: &Path) -> anyhow::Result<ProductSchema> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading schema {}", path.display()))?;
    ProductSchema::from_json(&content).with_context(|| format!("parsing schema {}", path.display()))
}

/// Read a JSON object of initial values; scalars are stringified, nulls skipped
pub fn load_values(path: &Path) -> anyhow::Result<ValueMap> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading values {}", path.display()))?;
    let raw: serde_json::Map<String, serde_json::Value> = serde_json::from_str(&content)
        .with_context(|| format!("parsing values {}", path.display()))?;

    let mut values = ValueMap::new();
    for (field, value) in raw {
        let text = match value {
            serde_json::Value::Null => continue,
            serde_json::Value::String(s) => s,
            other => other.to_string(),
        };
        values.insert(field, text);
    }
    Ok(values)
}

/// clap value parser for `KEY=VALUE`
pub fn parse_assignment(text: &str) -> Result<(String, String), String> {
    let (key, value) = text
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got `{}`", text))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("empty key in `{}`", text));
    }
    Ok((key.to_string(), value.to_string()))
}
