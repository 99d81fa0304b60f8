//! Argument coercion
//!
//! Before a function sees its arguments, each one passes through two
//! steps: arrays collapse to scalars when the function takes scalars,
//! and values whose type the function does not accept convert to the
//! function's first accepted type. Conversion never fails; a value with
//! no sensible rendering in the target type becomes null.

use gridbase_core::{CellValue, CellValueType};

use crate::error::{FormulaError, FormulaResult};
use crate::time::{parse_datetime, Timezone};
use crate::value::{format_number, js_number, TypedValue};

/// Prepare one argument for a function call.
///
/// `accepted` is the function's declared parameter types in declaration
/// order; the first entry is the conversion target for anything else.
pub fn coerce_param(
    mut param: TypedValue,
    func_name: &str,
    accepted: &[CellValueType],
    accepts_multiple: bool,
    tz: Timezone,
) -> FormulaResult<TypedValue> {
    // Step 1: multiplicity collapse
    if param.is_multiple && !accepts_multiple {
        if let CellValue::Array(items) = param.value {
            param.value = match items.len() {
                0 => CellValue::Null,
                1 => items.into_iter().next().unwrap_or(CellValue::Null),
                n => {
                    return Err(FormulaError::param(
                        func_name,
                        format!(
                            "cannot use an array of {} elements where a single value is expected",
                            n
                        ),
                    ));
                }
            };
        }
        param.is_multiple = false;
    }

    // Step 2: type conversion toward the first accepted type
    if !accepted.contains(&param.value_type) {
        let target = match accepted.first() {
            Some(t) => *t,
            None => return Ok(param),
        };
        param.value = match param.value {
            CellValue::Array(items) => CellValue::Array(
                items
                    .into_iter()
                    .map(|item| convert_value(item, target, tz))
                    .collect(),
            ),
            value => convert_value(value, target, tz),
        };
        param.value_type = target;
    }

    Ok(param)
}

/// Convert a single scalar into the target type. Null stays null, and
/// conversions with no defined meaning yield null.
pub fn convert_value(value: CellValue, target: CellValueType, tz: Timezone) -> CellValue {
    if value.is_null() {
        return CellValue::Null;
    }

    match target {
        CellValueType::String => match value {
            CellValue::String(_) => value,
            // Date-times are already serializable; pass them through
            CellValue::DateTime(_) => value,
            CellValue::Number(n) => CellValue::String(format_number(n)),
            CellValue::Boolean(b) => CellValue::String(b.to_string()),
            other => CellValue::String(crate::value::js_string(&other)),
        },
        CellValueType::Number => match &value {
            CellValue::Number(_) => value,
            CellValue::String(_) | CellValue::Boolean(_) => match js_number(&value) {
                Some(n) => CellValue::Number(n),
                None => CellValue::Null,
            },
            // No numeric reading is defined for the rest
            _ => CellValue::Null,
        },
        CellValueType::Boolean => match value {
            CellValue::Boolean(_) => value,
            // A string is true whenever it is non-empty, "false" included
            CellValue::String(s) => CellValue::Boolean(!s.is_empty()),
            CellValue::Number(n) => CellValue::Boolean(n != 0.0),
            _ => CellValue::Null,
        },
        CellValueType::DateTime => match value {
            CellValue::DateTime(_) => value,
            CellValue::String(s) => match parse_datetime(&s, tz) {
                Some(dt) => CellValue::DateTime(dt),
                None => CellValue::Null,
            },
            // Numbers and booleans have no calendar reading here
            _ => CellValue::Null,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const UTC: Timezone = Timezone::Iana(chrono_tz::Tz::UTC);

    fn number(n: f64) -> TypedValue {
        TypedValue::new(CellValue::Number(n), CellValueType::Number)
    }

    #[test]
    fn test_collapse_empty_array_to_null() {
        let param = TypedValue::multiple(CellValue::Array(vec![]), CellValueType::Number);
        let out = coerce_param(param, "ABS", &[CellValueType::Number], false, UTC).unwrap();
        assert!(out.value.is_null());
        assert!(!out.is_multiple);
    }

    #[test]
    fn test_collapse_singleton_array_to_scalar() {
        let param = TypedValue::multiple(
            CellValue::Array(vec![CellValue::Number(7.0)]),
            CellValueType::Number,
        );
        let out = coerce_param(param, "ABS", &[CellValueType::Number], false, UTC).unwrap();
        assert_eq!(out.value, CellValue::Number(7.0));
    }

    #[test]
    fn test_collapse_wide_array_fails() {
        let param = TypedValue::multiple(
            CellValue::Array(vec![CellValue::Number(1.0), CellValue::Number(2.0)]),
            CellValueType::Number,
        );
        let err = coerce_param(param, "ABS", &[CellValueType::Number], false, UTC).unwrap_err();
        assert!(matches!(err, FormulaError::Param { .. }));
        assert!(err.to_string().contains("ABS"));
    }

    #[test]
    fn test_convert_to_first_accepted_type() {
        // A number offered to a String-only function becomes a string
        let out = coerce_param(number(42.0), "UPPER", &[CellValueType::String], false, UTC).unwrap();
        assert_eq!(out.value, CellValue::String("42".into()));
        assert_eq!(out.value_type, CellValueType::String);

        // Declaration order decides the target
        let out = coerce_param(
            TypedValue::new(CellValue::Boolean(true), CellValueType::Boolean),
            "F",
            &[CellValueType::Number, CellValueType::String],
            false,
            UTC,
        )
        .unwrap();
        assert_eq!(out.value, CellValue::Number(1.0));
    }

    #[test]
    fn test_accepted_type_passes_untouched() {
        let out = coerce_param(
            number(1.5),
            "F",
            &[CellValueType::String, CellValueType::Number],
            false,
            UTC,
        )
        .unwrap();
        assert_eq!(out.value, CellValue::Number(1.5));
        assert_eq!(out.value_type, CellValueType::Number);
    }

    #[test]
    fn test_unreachable_conversions_yield_null() {
        assert!(convert_value(CellValue::Number(5.0), CellValueType::DateTime, UTC).is_null());
        assert!(convert_value(CellValue::Boolean(true), CellValueType::DateTime, UTC).is_null());
        assert!(
            convert_value(CellValue::String("not a date".into()), CellValueType::DateTime, UTC)
                .is_null()
        );
    }

    #[test]
    fn test_null_stays_null_with_retagged_type() {
        let param = TypedValue::null();
        let out = coerce_param(param, "F", &[CellValueType::Number], false, UTC).unwrap();
        assert!(out.value.is_null());
        assert_eq!(out.value_type, CellValueType::Number);
    }

    #[test]
    fn test_string_truthiness_conversion() {
        assert_eq!(
            convert_value(CellValue::String("false".into()), CellValueType::Boolean, UTC),
            CellValue::Boolean(true)
        );
        assert_eq!(
            convert_value(CellValue::String(String::new()), CellValueType::Boolean, UTC),
            CellValue::Boolean(false)
        );
    }

    #[test]
    fn test_elementwise_array_conversion() {
        let param = TypedValue::multiple(
            CellValue::Array(vec![
                CellValue::Number(1.0),
                CellValue::String("x".into()),
                CellValue::Null,
            ]),
            CellValueType::Number,
        );
        let out = coerce_param(param, "ARRAYJOIN", &[CellValueType::String], true, UTC).unwrap();
        match out.value {
            CellValue::Array(items) => {
                assert_eq!(items[0], CellValue::String("1".into()));
                assert_eq!(items[1], CellValue::String("x".into()));
                assert_eq!(items[2], CellValue::Null);
            }
            other => panic!("expected array, got {:?}", other),
        }
        assert!(out.is_multiple);
        assert_eq!(out.value_type, CellValueType::String);
    }
}
