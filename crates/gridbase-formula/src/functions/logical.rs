//! Logical functions
//!
//! Branch selection is eager: both arms of IF and every SWITCH case
//! are evaluated before the choice is made. The static type of a
//! branching function is the common branch type, falling back to
//! String when the branches disagree; a `BLANK()` branch adopts the
//! other side's type.

use gridbase_core::{CellValue, CellValueType};

use crate::error::{FormulaError, FormulaResult};
use crate::functions::{flatten_params, string_arg, FuncContext, ReturnType};
use crate::value::{js_truthy, loose_eq, TypedValue};

fn common_branch_type<'a>(branches: impl Iterator<Item = &'a TypedValue>) -> ReturnType {
    let mut result: Option<ReturnType> = None;
    for branch in branches {
        if branch.is_blank {
            continue;
        }
        let next = ReturnType {
            value_type: branch.value_type,
            is_multiple: branch.is_multiple,
        };
        result = Some(match result {
            None => next,
            Some(acc) => ReturnType {
                value_type: if acc.value_type == next.value_type {
                    acc.value_type
                } else {
                    CellValueType::String
                },
                is_multiple: acc.is_multiple || next.is_multiple,
            },
        });
    }
    result.unwrap_or_else(|| ReturnType::scalar(CellValueType::String))
}

pub(crate) fn infer_if(params: &[TypedValue]) -> ReturnType {
    common_branch_type(params.iter().skip(1).take(2))
}

/// Result positions in a SWITCH call: every second argument after the
/// subject, plus a trailing default when the count is even
fn switch_results(params: &[TypedValue]) -> impl Iterator<Item = &TypedValue> {
    let has_default = params.len() % 2 == 0;
    let pairs = params.iter().enumerate().filter_map(|(i, p)| {
        if i >= 2 && i % 2 == 0 {
            Some(p)
        } else {
            None
        }
    });
    let default = if has_default { params.last() } else { None };
    pairs.chain(default)
}

pub(crate) fn infer_switch(params: &[TypedValue]) -> ReturnType {
    common_branch_type(switch_results(params))
}

/// IF - eager conditional; the missing third argument reads as null
pub fn fn_if(params: &[TypedValue], _ctx: &FuncContext<'_>) -> FormulaResult<CellValue> {
    let condition = params
        .first()
        .map(|p| js_truthy(&p.value))
        .unwrap_or(false);
    let chosen = if condition {
        params.get(1)
    } else {
        params.get(2)
    };
    Ok(chosen.map(|p| p.value.clone()).unwrap_or(CellValue::Null))
}

/// SWITCH - compare a subject against case/result pairs, with an
/// optional trailing default
pub fn fn_switch(params: &[TypedValue], _ctx: &FuncContext<'_>) -> FormulaResult<CellValue> {
    let subject = match params.first() {
        Some(p) => &p.value,
        None => return Ok(CellValue::Null),
    };

    let mut i = 1;
    while i + 1 < params.len() {
        if loose_eq(subject, &params[i].value) {
            return Ok(params[i + 1].value.clone());
        }
        i += 2;
    }

    // A single trailing argument is the default
    if i < params.len() {
        return Ok(params[i].value.clone());
    }
    Ok(CellValue::Null)
}

/// AND - true when every flattened item is truthy
pub fn fn_and(params: &[TypedValue], _ctx: &FuncContext<'_>) -> FormulaResult<CellValue> {
    let all = flatten_params(params).into_iter().all(js_truthy);
    Ok(CellValue::Boolean(all))
}

/// OR - true when any flattened item is truthy
pub fn fn_or(params: &[TypedValue], _ctx: &FuncContext<'_>) -> FormulaResult<CellValue> {
    let any = flatten_params(params).into_iter().any(js_truthy);
    Ok(CellValue::Boolean(any))
}

/// XOR - true when an odd number of flattened items are truthy
pub fn fn_xor(params: &[TypedValue], _ctx: &FuncContext<'_>) -> FormulaResult<CellValue> {
    let truthy = flatten_params(params).into_iter().filter(|v| js_truthy(v)).count();
    Ok(CellValue::Boolean(truthy % 2 == 1))
}

/// NOT
pub fn fn_not(params: &[TypedValue], _ctx: &FuncContext<'_>) -> FormulaResult<CellValue> {
    let value = params.first().map(|p| js_truthy(&p.value)).unwrap_or(false);
    Ok(CellValue::Boolean(!value))
}

/// BLANK - the evaluator short-circuits this before argument handling;
/// the body exists for direct calls
pub fn fn_blank(_params: &[TypedValue], _ctx: &FuncContext<'_>) -> FormulaResult<CellValue> {
    Ok(CellValue::Null)
}

/// ERROR - raise an interceptable error carrying the given message
pub fn fn_error(params: &[TypedValue], _ctx: &FuncContext<'_>) -> FormulaResult<CellValue> {
    let message = string_arg(params, 0).unwrap_or_else(|| "error".to_string());
    Err(FormulaError::Value(message))
}

/// IS_ERROR - the evaluator observes argument failure itself; reaching
/// this body means the argument evaluated cleanly
pub fn fn_is_error(_params: &[TypedValue], _ctx: &FuncContext<'_>) -> FormulaResult<CellValue> {
    Ok(CellValue::Boolean(false))
}

/// TRUE
pub fn fn_true(_params: &[TypedValue], _ctx: &FuncContext<'_>) -> FormulaResult<CellValue> {
    Ok(CellValue::Boolean(true))
}

/// FALSE
pub fn fn_false(_params: &[TypedValue], _ctx: &FuncContext<'_>) -> FormulaResult<CellValue> {
    Ok(CellValue::Boolean(false))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::Timezone;
    use chrono::Utc;

    fn ctx() -> FuncContext<'static> {
        FuncContext {
            record: None,
            timezone: Timezone::utc(),
            now: Utc::now(),
        }
    }

    fn text(s: &str) -> TypedValue {
        TypedValue::new(CellValue::String(s.into()), CellValueType::String)
    }

    fn num(n: f64) -> TypedValue {
        TypedValue::new(CellValue::Number(n), CellValueType::Number)
    }

    fn boolean(b: bool) -> TypedValue {
        TypedValue::new(CellValue::Boolean(b), CellValueType::Boolean)
    }

    #[test]
    fn test_if_picks_branch() {
        let params = vec![boolean(true), text("yes"), text("no")];
        assert_eq!(fn_if(&params, &ctx()).unwrap(), CellValue::String("yes".into()));

        let params = vec![boolean(false), text("yes"), text("no")];
        assert_eq!(fn_if(&params, &ctx()).unwrap(), CellValue::String("no".into()));

        // Missing else branch reads as null
        let params = vec![boolean(false), text("yes")];
        assert_eq!(fn_if(&params, &ctx()).unwrap(), CellValue::Null);
    }

    #[test]
    fn test_infer_if_branch_types() {
        // Matching branch types keep the type
        let t = infer_if(&[boolean(true), num(1.0), num(2.0)]);
        assert_eq!(t.value_type, CellValueType::Number);

        // Mismatched branch types fall back to String
        let t = infer_if(&[boolean(true), num(1.0), text("x")]);
        assert_eq!(t.value_type, CellValueType::String);

        // A blank branch adopts the other side
        let t = infer_if(&[boolean(true), TypedValue::blank(), num(2.0)]);
        assert_eq!(t.value_type, CellValueType::Number);
    }

    #[test]
    fn test_switch_matches_and_default() {
        let params = vec![text("b"), text("a"), num(1.0), text("b"), num(2.0)];
        assert_eq!(fn_switch(&params, &ctx()).unwrap(), CellValue::Number(2.0));

        let params = vec![
            text("z"),
            text("a"),
            num(1.0),
            text("b"),
            num(2.0),
            num(99.0),
        ];
        assert_eq!(fn_switch(&params, &ctx()).unwrap(), CellValue::Number(99.0));

        let params = vec![text("z"), text("a"), num(1.0)];
        assert_eq!(fn_switch(&params, &ctx()).unwrap(), CellValue::Null);
    }

    #[test]
    fn test_switch_null_subject_matches_null_case() {
        let params = vec![TypedValue::null(), TypedValue::null(), text("blank")];
        assert_eq!(
            fn_switch(&params, &ctx()).unwrap(),
            CellValue::String("blank".into())
        );
    }

    #[test]
    fn test_and_or_xor() {
        let params = vec![boolean(true), boolean(true), boolean(false)];
        assert_eq!(fn_and(&params, &ctx()).unwrap(), CellValue::Boolean(false));
        assert_eq!(fn_or(&params, &ctx()).unwrap(), CellValue::Boolean(true));
        assert_eq!(fn_xor(&params, &ctx()).unwrap(), CellValue::Boolean(false));

        let params = vec![boolean(true), boolean(false), boolean(false)];
        assert_eq!(fn_xor(&params, &ctx()).unwrap(), CellValue::Boolean(true));
    }

    #[test]
    fn test_not_treats_null_as_false() {
        assert_eq!(
            fn_not(&[TypedValue::null()], &ctx()).unwrap(),
            CellValue::Boolean(true)
        );
    }

    #[test]
    fn test_error_raises_interceptable() {
        let err = fn_error(&[text("boom")], &ctx()).unwrap_err();
        assert!(err.is_interceptable());
        assert_eq!(err.to_string(), "boom");
    }
}
