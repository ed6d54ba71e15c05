//! Typed decode of canonical string values
//!
//! The engine stores every value as a string. Presentation code decodes
//! them with [`FieldType::decode`] and encodes edits back with
//! [`TypedValue::encode`], so "no value" (`None`) never collides with a
//! type's zero value.

use crate::schema::FieldType;
use chrono::NaiveDate;
use serde::Serialize;
use thiserror::Error;

/// Accepted date layouts, canonical first
const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%d/%m/%Y", "%d-%m-%Y"];

/// Decoded field value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum TypedValue {
    /// Free text (String, Phone, Email, unknown types)
    Text(String),
    /// Whole number
    Integer(i64),
    /// Decimal number
    Decimal(f64),
    /// Calendar date
    Date(NaiveDate),
    /// Yes/no
    Boolean(bool),
    /// Selected option codes
    List(Vec<String>),
}

/// Value does not fit the declared field type
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("`{raw}` is not a valid {expected}")]
pub struct CoercionError {
    /// Offending raw value
    pub raw: String,
    /// Expected type name
    pub expected: &'static str,
}

impl CoercionError {
    fn new(raw: &str, expected: &'static str) -> Self {
        Self {
            raw: raw.to_string(),
            expected,
        }
    }
}

impl FieldType {
    /// Decode a canonical string; empty input is `Ok(None)`
    pub fn decode(&self, raw: &str) -> Result<Option<TypedValue>, CoercionError> {
        if raw.is_empty() {
            return Ok(None);
        }
        let trimmed = raw.trim();

        let value = match self {
            FieldType::Integer => trimmed
                .parse::<i64>()
                .map(TypedValue::Integer)
                .map_err(|_| CoercionError::new(raw, "integer"))?,
            FieldType::Decimal => trimmed
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .map(TypedValue::Decimal)
                .ok_or_else(|| CoercionError::new(raw, "decimal"))?,
            FieldType::Date | FieldType::Dob => DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(trimmed, fmt).ok())
                .map(TypedValue::Date)
                .ok_or_else(|| CoercionError::new(raw, "date"))?,
            FieldType::Boolean => match trimmed.to_ascii_lowercase().as_str() {
                "true" | "1" | "y" | "yes" => TypedValue::Boolean(true),
                "false" | "0" | "n" | "no" => TypedValue::Boolean(false),
                _ => return Err(CoercionError::new(raw, "boolean")),
            },
            FieldType::List => {
                if trimmed.starts_with('[') {
                    serde_json::from_str::<Vec<String>>(trimmed)
                        .map(TypedValue::List)
                        .map_err(|_| CoercionError::new(raw, "list"))?
                } else {
                    TypedValue::List(vec![raw.to_string()])
                }
            }
            FieldType::String | FieldType::Phone | FieldType::Email | FieldType::Other => {
                TypedValue::Text(raw.to_string())
            }
        };

        Ok(Some(value))
    }
}

impl TypedValue {
    /// Canonical string form stored in the form state
    pub fn encode(&self) -> String {
        match self {
            TypedValue::Text(s) => s.clone(),
            TypedValue::Integer(i) => i.to_string(),
            TypedValue::Decimal(d) => d.to_string(),
            TypedValue::Date(d) => d.format(DATE_FORMATS[0]).to_string(),
            TypedValue::Boolean(b) => b.to_string(),
            TypedValue::List(items) if items.len() == 1 => items[0].clone(),
            TypedValue::List(items) => serde_json::to_string(items).unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_is_none() {
        assert_eq!(FieldType::Integer.decode("").unwrap(), None);
        assert_eq!(FieldType::String.decode("").unwrap(), None);
    }

    #[test]
    fn test_numeric_decode() {
        assert_eq!(
            FieldType::Integer.decode(" 42 ").unwrap(),
            Some(TypedValue::Integer(42))
        );
        assert_eq!(
            FieldType::Decimal.decode("12.5").unwrap(),
            Some(TypedValue::Decimal(12.5))
        );
        assert!(FieldType::Integer.decode("12.5").is_err());
        assert!(FieldType::Decimal.decode("NaN").is_err());
    }

    #[test]
    fn test_date_formats() {
        let expected = NaiveDate::from_ymd_opt(1990, 4, 21).unwrap();
        for raw in ["1990-04-21", "21/04/1990", "21-04-1990"] {
            assert_eq!(
                FieldType::Dob.decode(raw).unwrap(),
                Some(TypedValue::Date(expected)),
                "{raw}"
            );
        }
        assert_eq!(TypedValue::Date(expected).encode(), "1990-04-21");
        assert!(FieldType::Date.decode("1990-13-01").is_err());
    }

    #[test]
    fn test_boolean_and_list() {
        assert_eq!(
            FieldType::Boolean.decode("Yes").unwrap(),
            Some(TypedValue::Boolean(true))
        );
        assert!(FieldType::Boolean.decode("maybe").is_err());

        let list = FieldType::List.decode(r#"["A","B"]"#).unwrap().unwrap();
        assert_eq!(list, TypedValue::List(vec!["A".into(), "B".into()]));
        assert_eq!(list.encode(), r#"["A","B"]"#);
        assert_eq!(FieldType::List.decode("A").unwrap().unwrap().encode(), "A");
    }
}
