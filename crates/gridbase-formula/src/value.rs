//! Evaluation results and scalar conversion rules
//!
//! Every expression evaluates to a [`TypedValue`]: the raw cell value
//! plus the static type the checker inferred for it. Conversions between
//! scalar shapes follow script-engine rules, not Excel rules: `null`
//! participates in arithmetic as zero, strings coerce to numbers when a
//! numeric context demands it, and equality is loose.

use std::sync::Arc;

use gridbase_core::{iso_string, CellValue, CellValueType, Field};

/// A cell value paired with its inferred static type
#[derive(Clone)]
pub struct TypedValue {
    pub value: CellValue,
    pub value_type: CellValueType,
    /// Whether the static type is a list of `value_type` rather than a scalar
    pub is_multiple: bool,
    /// Set only by `BLANK()`; branch-type inference lets a blank side
    /// adopt the other side's type
    pub is_blank: bool,
    /// Present when the value was read from a field, so later operators
    /// can use the field's own display conversion
    pub field: Option<Arc<dyn Field>>,
}

impl TypedValue {
    pub fn new(value: CellValue, value_type: CellValueType) -> Self {
        Self {
            value,
            value_type,
            is_multiple: false,
            is_blank: false,
            field: None,
        }
    }

    pub fn multiple(value: CellValue, value_type: CellValueType) -> Self {
        Self {
            is_multiple: true,
            ..Self::new(value, value_type)
        }
    }

    /// A null result typed as String, the bottom of the type order
    pub fn null() -> Self {
        Self::new(CellValue::Null, CellValueType::String)
    }

    /// The result of `BLANK()`: null, but remembered as deliberately blank
    pub fn blank() -> Self {
        Self {
            is_blank: true,
            ..Self::new(CellValue::Null, CellValueType::String)
        }
    }

    /// A typed placeholder for record-less inference, carrying no value
    pub fn inferred(value_type: CellValueType, is_multiple: bool) -> Self {
        Self {
            value: CellValue::Null,
            value_type,
            is_multiple,
            is_blank: false,
            field: None,
        }
    }

    pub fn with_field(mut self, field: Arc<dyn Field>) -> Self {
        self.field = Some(field);
        self
    }

    pub fn is_null(&self) -> bool {
        self.value.is_null()
    }
}

impl std::fmt::Debug for TypedValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypedValue")
            .field("value", &self.value)
            .field("value_type", &self.value_type)
            .field("is_multiple", &self.is_multiple)
            .field("is_blank", &self.is_blank)
            .field("field", &self.field.as_ref().map(|f| f.id().to_string()))
            .finish()
    }
}

// === Numeric coercion ===

/// Coerce a value to a number the way a script engine would.
/// `None` stands in for NaN.
pub fn js_number(value: &CellValue) -> Option<f64> {
    match value {
        CellValue::Null => Some(0.0),
        CellValue::Boolean(b) => Some(if *b { 1.0 } else { 0.0 }),
        CellValue::Number(n) => {
            if n.is_finite() {
                Some(*n)
            } else {
                None
            }
        }
        CellValue::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return Some(0.0);
            }
            trimmed.parse::<f64>().ok().filter(|n| n.is_finite())
        }
        CellValue::DateTime(dt) => Some(dt.timestamp_millis() as f64),
        CellValue::Array(items) => match items.len() {
            0 => Some(0.0),
            1 => js_number(&items[0]),
            _ => None,
        },
        CellValue::Object(_) => None,
    }
}

/// Render a number the way a script engine stringifies it: integral
/// values lose their fraction, negative zero is plain zero.
pub fn format_number(n: f64) -> String {
    if !n.is_finite() {
        return String::new();
    }
    if n == 0.0 {
        return "0".to_string();
    }
    format!("{}", n)
}

// === String coercion ===

/// Coerce a value to its string form. Null becomes the empty string.
pub fn js_string(value: &CellValue) -> String {
    match value {
        CellValue::Null => String::new(),
        CellValue::Boolean(b) => b.to_string(),
        CellValue::Number(n) => format_number(*n),
        CellValue::String(s) => s.clone(),
        CellValue::DateTime(dt) => iso_string(*dt),
        CellValue::Array(items) => items
            .iter()
            .map(js_string)
            .collect::<Vec<_>>()
            .join(", "),
        CellValue::Object(_) => value.to_string(),
    }
}

// === Truthiness ===

/// Script-engine truthiness: null, zero, and the empty string are
/// false; everything else, including the string "0", is true.
pub fn js_truthy(value: &CellValue) -> bool {
    match value {
        CellValue::Null => false,
        CellValue::Boolean(b) => *b,
        CellValue::Number(n) => *n != 0.0 && !n.is_nan(),
        CellValue::String(s) => !s.is_empty(),
        CellValue::DateTime(_) => true,
        // Arrays and objects are reference values, always truthy
        CellValue::Array(_) => true,
        CellValue::Object(_) => true,
    }
}

// === Loose equality ===

/// Loose equality across scalar shapes: same shapes compare directly,
/// mixed shapes compare numerically, null equals only null.
pub fn loose_eq(left: &CellValue, right: &CellValue) -> bool {
    use CellValue::*;

    match (left, right) {
        (Null, Null) => true,
        (Null, _) | (_, Null) => false,

        (Number(a), Number(b)) => a == b,
        (String(a), String(b)) => a == b,
        (Boolean(a), Boolean(b)) => a == b,
        (DateTime(a), DateTime(b)) => a == b,

        (Number(a), String(_)) => js_number(right).map_or(false, |b| *a == b),
        (String(_), Number(b)) => js_number(left).map_or(false, |a| a == *b),

        // Booleans compare as numbers against everything else
        (Boolean(_), _) => match js_number(left) {
            Some(a) => js_number(right).map_or(false, |b| a == b),
            None => false,
        },
        (_, Boolean(_)) => match js_number(right) {
            Some(b) => js_number(left).map_or(false, |a| a == b),
            None => false,
        },

        (DateTime(dt), String(s)) | (String(s), DateTime(dt)) => iso_string(*dt) == *s,
        (DateTime(dt), Number(n)) | (Number(n), DateTime(dt)) => {
            dt.timestamp_millis() as f64 == *n
        }

        // Arrays reach here only outside field contexts; compare rendered
        (Array(_), _) | (_, Array(_)) => js_string(left) == js_string(right),

        (Object(_), _) | (_, Object(_)) => false,
    }
}

// === Ordering ===

/// Relational comparison: two strings order lexicographically, any
/// other pair orders numerically. `None` when either side fails to
/// coerce, which makes every relational operator false.
pub fn compare(left: &CellValue, right: &CellValue) -> Option<std::cmp::Ordering> {
    use CellValue::*;

    if let (String(a), String(b)) = (left, right) {
        return Some(a.cmp(b));
    }

    let a = js_number(left)?;
    let b = js_number(right)?;
    a.partial_cmp(&b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_js_number_coercion() {
        assert_eq!(js_number(&CellValue::Null), Some(0.0));
        assert_eq!(js_number(&CellValue::Boolean(true)), Some(1.0));
        assert_eq!(js_number(&CellValue::String(" 3.5 ".into())), Some(3.5));
        assert_eq!(js_number(&CellValue::String("".into())), Some(0.0));
        assert_eq!(js_number(&CellValue::String("abc".into())), None);
        assert_eq!(js_number(&CellValue::Array(vec![])), Some(0.0));
        assert_eq!(
            js_number(&CellValue::Array(vec![CellValue::Number(7.0)])),
            Some(7.0)
        );
        assert_eq!(
            js_number(&CellValue::Array(vec![
                CellValue::Number(1.0),
                CellValue::Number(2.0)
            ])),
            None
        );
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(5.0), "5");
        assert_eq!(format_number(3.14), "3.14");
        assert_eq!(format_number(-0.0), "0");
        assert_eq!(format_number(0.1), "0.1");
        assert_eq!(format_number(-2.5), "-2.5");
    }

    #[test]
    fn test_js_string() {
        assert_eq!(js_string(&CellValue::Null), "");
        assert_eq!(js_string(&CellValue::Boolean(true)), "true");
        assert_eq!(js_string(&CellValue::Number(42.0)), "42");
        let dt = chrono::Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap();
        assert_eq!(js_string(&CellValue::DateTime(dt)), "2024-01-15T10:30:00.000Z");
    }

    #[test]
    fn test_js_truthy() {
        assert!(!js_truthy(&CellValue::Null));
        assert!(!js_truthy(&CellValue::Number(0.0)));
        assert!(!js_truthy(&CellValue::String("".into())));
        assert!(!js_truthy(&CellValue::Boolean(false)));
        assert!(js_truthy(&CellValue::String("0".into())));
        assert!(js_truthy(&CellValue::Number(-1.0)));
    }

    #[test]
    fn test_loose_eq() {
        assert!(loose_eq(&CellValue::Null, &CellValue::Null));
        assert!(!loose_eq(&CellValue::Null, &CellValue::Number(0.0)));
        assert!(!loose_eq(&CellValue::Null, &CellValue::String("".into())));
        assert!(loose_eq(
            &CellValue::String("1".into()),
            &CellValue::Number(1.0)
        ));
        assert!(loose_eq(
            &CellValue::Boolean(true),
            &CellValue::Number(1.0)
        ));
        assert!(loose_eq(
            &CellValue::Boolean(false),
            &CellValue::String("0".into())
        ));
        assert!(!loose_eq(
            &CellValue::String("a".into()),
            &CellValue::Number(1.0)
        ));
    }

    #[test]
    fn test_compare() {
        use std::cmp::Ordering;

        // Two strings compare lexicographically
        assert_eq!(
            compare(
                &CellValue::String("10".into()),
                &CellValue::String("9".into())
            ),
            Some(Ordering::Less)
        );
        // Mixed shapes compare numerically
        assert_eq!(
            compare(&CellValue::String("10".into()), &CellValue::Number(9.0)),
            Some(Ordering::Greater)
        );
        assert_eq!(
            compare(&CellValue::String("abc".into()), &CellValue::Number(1.0)),
            None
        );
    }

    #[test]
    fn test_typed_value_constructors() {
        let tv = TypedValue::blank();
        assert!(tv.is_blank);
        assert!(tv.is_null());
        assert_eq!(tv.value_type, CellValueType::String);

        let tv = TypedValue::multiple(
            CellValue::Array(vec![CellValue::Number(1.0)]),
            CellValueType::Number,
        );
        assert!(tv.is_multiple);
    }
}
