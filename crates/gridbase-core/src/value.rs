//! Cell value types

use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value as Json;

/// A cell's runtime payload.
///
/// Values arrive from record snapshots as JSON shapes and stay close to
/// them: scalars, arrays of scalars, or structured objects (link,
/// attachment and member cells) that only the owning field knows how to
/// render. `Null` is the single blank value; there is no per-type empty
/// sentinel.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    /// Blank cell (no value)
    Null,

    /// Boolean value
    Boolean(bool),

    /// Numeric value (all numbers stored as f64)
    Number(f64),

    /// Text value
    String(String),

    /// An instant in time. Stored as UTC; rendered in the evaluation
    /// timezone.
    DateTime(DateTime<Utc>),

    /// Multi-valued cell (lookup/link fields). Elements are scalars or
    /// objects, never nested arrays.
    Array(Vec<CellValue>),

    /// Structured payload (link/attachment/member shapes) kept verbatim;
    /// rendering goes through the owning field descriptor.
    Object(serde_json::Map<String, Json>),
}

impl CellValue {
    /// Check if the value is blank
    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }

    /// Check if the value is an array
    pub fn is_array(&self) -> bool {
        matches!(self, CellValue::Array(_))
    }

    /// Try to get the value as a number
    pub fn as_number(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) => Some(*n),
            CellValue::Boolean(true) => Some(1.0),
            CellValue::Boolean(false) => Some(0.0),
            _ => None,
        }
    }

    /// Try to get the value as a boolean
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            CellValue::Boolean(b) => Some(*b),
            CellValue::Number(n) => Some(*n != 0.0),
            _ => None,
        }
    }

    /// Try to get the value as a string slice
    pub fn as_str(&self) -> Option<&str> {
        match self {
            CellValue::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Try to get the value as an instant
    pub fn as_datetime(&self) -> Option<DateTime<Utc>> {
        match self {
            CellValue::DateTime(dt) => Some(*dt),
            _ => None,
        }
    }

    /// Get the array elements, treating a scalar as a one-element slice
    pub fn as_slice(&self) -> &[CellValue] {
        match self {
            CellValue::Array(items) => items.as_slice(),
            v => std::slice::from_ref(v),
        }
    }

    /// Get the type name for error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            CellValue::Null => "null",
            CellValue::Boolean(_) => "boolean",
            CellValue::Number(_) => "number",
            CellValue::String(_) => "string",
            CellValue::DateTime(_) => "datetime",
            CellValue::Array(_) => "array",
            CellValue::Object(_) => "object",
        }
    }

    /// Convert back into a JSON shape
    pub fn to_json(&self) -> Json {
        match self {
            CellValue::Null => Json::Null,
            CellValue::Boolean(b) => Json::Bool(*b),
            CellValue::Number(n) => serde_json::Number::from_f64(*n)
                .map(Json::Number)
                .unwrap_or(Json::Null),
            CellValue::String(s) => Json::String(s.clone()),
            CellValue::DateTime(dt) => Json::String(iso_string(*dt)),
            CellValue::Array(items) => Json::Array(items.iter().map(CellValue::to_json).collect()),
            CellValue::Object(map) => Json::Object(map.clone()),
        }
    }
}

impl Default for CellValue {
    fn default() -> Self {
        CellValue::Null
    }
}

/// ISO-8601 rendering used everywhere an instant becomes text
/// (millisecond precision, `Z` suffix).
pub fn iso_string(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Null => write!(f, ""),
            CellValue::Boolean(b) => write!(f, "{}", if *b { "true" } else { "false" }),
            CellValue::Number(n) => write!(f, "{}", n),
            CellValue::String(s) => write!(f, "{}", s),
            CellValue::DateTime(dt) => write!(f, "{}", iso_string(*dt)),
            CellValue::Array(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                Ok(())
            }
            // Structured shapes have no generic rendering; fall back to JSON
            CellValue::Object(map) => {
                write!(f, "{}", Json::Object(map.clone()))
            }
        }
    }
}

impl From<bool> for CellValue {
    fn from(b: bool) -> Self {
        CellValue::Boolean(b)
    }
}

impl From<i32> for CellValue {
    fn from(n: i32) -> Self {
        CellValue::Number(n as f64)
    }
}

impl From<i64> for CellValue {
    fn from(n: i64) -> Self {
        CellValue::Number(n as f64)
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::Number(n)
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::String(s.to_string())
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::String(s)
    }
}

impl From<DateTime<Utc>> for CellValue {
    fn from(dt: DateTime<Utc>) -> Self {
        CellValue::DateTime(dt)
    }
}

impl<T: Into<CellValue>> From<Vec<T>> for CellValue {
    fn from(items: Vec<T>) -> Self {
        CellValue::Array(items.into_iter().map(Into::into).collect())
    }
}

impl From<Json> for CellValue {
    fn from(value: Json) -> Self {
        match value {
            Json::Null => CellValue::Null,
            Json::Bool(b) => CellValue::Boolean(b),
            Json::Number(n) => n.as_f64().map(CellValue::Number).unwrap_or(CellValue::Null),
            Json::String(s) => CellValue::String(s),
            Json::Array(items) => CellValue::Array(items.into_iter().map(CellValue::from).collect()),
            Json::Object(map) => CellValue::Object(map),
        }
    }
}

impl From<&Json> for CellValue {
    fn from(value: &Json) -> Self {
        CellValue::from(value.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn test_cell_value_conversions() {
        assert_eq!(CellValue::from(42), CellValue::Number(42.0));
        assert_eq!(CellValue::from(3.14), CellValue::Number(3.14));
        assert_eq!(CellValue::from(true), CellValue::Boolean(true));
        assert_eq!(CellValue::from("hello").as_str(), Some("hello"));
    }

    #[test]
    fn test_from_json_shapes() {
        assert_eq!(CellValue::from(json!(null)), CellValue::Null);
        assert_eq!(CellValue::from(json!(5)), CellValue::Number(5.0));
        assert_eq!(
            CellValue::from(json!(["a", 1, null])),
            CellValue::Array(vec![
                CellValue::String("a".into()),
                CellValue::Number(1.0),
                CellValue::Null,
            ])
        );
        let link = CellValue::from(json!({ "recordId": "rec1", "text": "Alpha" }));
        assert!(matches!(link, CellValue::Object(_)));
    }

    #[test]
    fn test_display_is_js_flavored() {
        assert_eq!(CellValue::Number(3.0).to_string(), "3");
        assert_eq!(CellValue::Number(3.5).to_string(), "3.5");
        assert_eq!(CellValue::Boolean(true).to_string(), "true");
        assert_eq!(CellValue::Null.to_string(), "");
        let arr = CellValue::from(vec![1.0, 2.0, 3.0]);
        assert_eq!(arr.to_string(), "1, 2, 3");
    }

    #[test]
    fn test_iso_string_millisecond_precision() {
        let dt = Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap();
        assert_eq!(iso_string(dt), "2024-01-15T10:30:00.000Z");
    }

    #[test]
    fn test_as_slice_wraps_scalars() {
        assert_eq!(CellValue::Number(1.0).as_slice().len(), 1);
        assert_eq!(CellValue::from(vec![1.0, 2.0]).as_slice().len(), 2);
    }
}
