//! Numeric functions
//!
//! Arithmetic follows script-engine conventions rather than Excel:
//! rounding is half toward positive infinity, remainder keeps the
//! dividend's sign, and any non-finite result collapses to null.

use lazy_regex::regex;

use gridbase_core::CellValue;

use crate::error::FormulaResult;
use crate::functions::{
    flatten_numbers, map_number, number_arg, number_result, string_arg, FuncContext,
};
use crate::value::TypedValue;

/// SUM - adds numbers, flattening arrays one level
pub fn fn_sum(params: &[TypedValue], _ctx: &FuncContext<'_>) -> FormulaResult<CellValue> {
    let total: f64 = flatten_numbers(params).iter().sum();
    Ok(number_result(total))
}

/// AVERAGE - arithmetic mean of the non-null numbers
pub fn fn_average(params: &[TypedValue], _ctx: &FuncContext<'_>) -> FormulaResult<CellValue> {
    let values = flatten_numbers(params);
    if values.is_empty() {
        return Ok(CellValue::Null);
    }
    let total: f64 = values.iter().sum();
    Ok(number_result(total / values.len() as f64))
}

/// MAX - largest of the non-null numbers
pub fn fn_max(params: &[TypedValue], _ctx: &FuncContext<'_>) -> FormulaResult<CellValue> {
    let values = flatten_numbers(params);
    if values.is_empty() {
        return Ok(CellValue::Null);
    }
    Ok(number_result(values.iter().copied().fold(f64::NEG_INFINITY, f64::max)))
}

/// MIN - smallest of the non-null numbers
pub fn fn_min(params: &[TypedValue], _ctx: &FuncContext<'_>) -> FormulaResult<CellValue> {
    let values = flatten_numbers(params);
    if values.is_empty() {
        return Ok(CellValue::Null);
    }
    Ok(number_result(values.iter().copied().fold(f64::INFINITY, f64::min)))
}

/// Round half toward positive infinity, the script-engine way:
/// 2.5 rounds to 3, -2.5 rounds to -2
fn js_round(n: f64) -> f64 {
    (n + 0.5).floor()
}

fn precision_factor(params: &[TypedValue]) -> f64 {
    let digits = number_arg(params, 1).unwrap_or(0.0).trunc();
    10f64.powi(digits as i32)
}

/// ROUND - round to an optional number of digits
pub fn fn_round(params: &[TypedValue], _ctx: &FuncContext<'_>) -> FormulaResult<CellValue> {
    let factor = precision_factor(params);
    map_number(params, |n| js_round(n * factor) / factor)
}

/// ROUNDUP - round away from zero
pub fn fn_roundup(params: &[TypedValue], _ctx: &FuncContext<'_>) -> FormulaResult<CellValue> {
    let factor = precision_factor(params);
    map_number(params, |n| {
        let scaled = (n.abs() * factor).ceil() / factor;
        if n < 0.0 {
            -scaled
        } else {
            scaled
        }
    })
}

/// ROUNDDOWN - round toward zero
pub fn fn_rounddown(params: &[TypedValue], _ctx: &FuncContext<'_>) -> FormulaResult<CellValue> {
    let factor = precision_factor(params);
    map_number(params, |n| (n * factor).trunc() / factor)
}

/// CEILING - round up to a multiple of the significance (default 1)
pub fn fn_ceiling(params: &[TypedValue], _ctx: &FuncContext<'_>) -> FormulaResult<CellValue> {
    let significance = number_arg(params, 1).unwrap_or(1.0);
    map_number(params, |n| (n / significance).ceil() * significance)
}

/// FLOOR - round down to a multiple of the significance (default 1)
pub fn fn_floor(params: &[TypedValue], _ctx: &FuncContext<'_>) -> FormulaResult<CellValue> {
    let significance = number_arg(params, 1).unwrap_or(1.0);
    map_number(params, |n| (n / significance).floor() * significance)
}

/// EVEN - round away from zero to the nearest even integer
pub fn fn_even(params: &[TypedValue], _ctx: &FuncContext<'_>) -> FormulaResult<CellValue> {
    map_number(params, |n| {
        let magnitude = (n.abs() / 2.0).ceil() * 2.0;
        if n < 0.0 {
            -magnitude
        } else {
            magnitude
        }
    })
}

/// ODD - round away from zero to the nearest odd integer
pub fn fn_odd(params: &[TypedValue], _ctx: &FuncContext<'_>) -> FormulaResult<CellValue> {
    map_number(params, |n| {
        let magnitude = ((n.abs() + 1.0) / 2.0).ceil() * 2.0 - 1.0;
        if n < 0.0 {
            -magnitude
        } else {
            magnitude
        }
    })
}

/// INT - round down to an integer
pub fn fn_int(params: &[TypedValue], _ctx: &FuncContext<'_>) -> FormulaResult<CellValue> {
    map_number(params, f64::floor)
}

/// ABS - absolute value
pub fn fn_abs(params: &[TypedValue], _ctx: &FuncContext<'_>) -> FormulaResult<CellValue> {
    map_number(params, f64::abs)
}

/// SQRT - square root; negative input yields null
pub fn fn_sqrt(params: &[TypedValue], _ctx: &FuncContext<'_>) -> FormulaResult<CellValue> {
    map_number(params, f64::sqrt)
}

/// MOD - remainder with the dividend's sign; zero or null divisor
/// yields null
pub fn fn_mod(params: &[TypedValue], _ctx: &FuncContext<'_>) -> FormulaResult<CellValue> {
    let dividend = match number_arg(params, 0) {
        Some(n) => n,
        None => return Ok(CellValue::Null),
    };
    let divisor = match number_arg(params, 1) {
        Some(n) if n != 0.0 => n,
        _ => return Ok(CellValue::Null),
    };
    Ok(number_result(dividend % divisor))
}

/// POWER - base raised to an exponent
pub fn fn_power(params: &[TypedValue], _ctx: &FuncContext<'_>) -> FormulaResult<CellValue> {
    let exponent = match number_arg(params, 1) {
        Some(n) => n,
        None => return Ok(CellValue::Null),
    };
    map_number(params, |base| base.powf(exponent))
}

/// EXP - e raised to the argument
pub fn fn_exp(params: &[TypedValue], _ctx: &FuncContext<'_>) -> FormulaResult<CellValue> {
    map_number(params, f64::exp)
}

/// LOG - logarithm in an optional base, 10 by default
pub fn fn_log(params: &[TypedValue], _ctx: &FuncContext<'_>) -> FormulaResult<CellValue> {
    let base = number_arg(params, 1).unwrap_or(10.0);
    map_number(params, |n| n.log(base))
}

/// VALUE - extract a number from text, ignoring currency symbols,
/// separators and units
pub fn fn_value(params: &[TypedValue], _ctx: &FuncContext<'_>) -> FormulaResult<CellValue> {
    let text = match string_arg(params, 0) {
        Some(s) => s,
        None => return Ok(CellValue::Null),
    };
    let cleaned = regex!(r"[^0-9.+\-]").replace_all(&text, "");
    match cleaned.parse::<f64>() {
        Ok(n) => Ok(number_result(n)),
        Err(_) => Ok(CellValue::Null),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::Timezone;
    use chrono::Utc;
    use gridbase_core::CellValueType;

    fn ctx() -> FuncContext<'static> {
        FuncContext {
            record: None,
            timezone: Timezone::utc(),
            now: Utc::now(),
        }
    }

    fn num(n: f64) -> TypedValue {
        TypedValue::new(CellValue::Number(n), CellValueType::Number)
    }

    fn nums(values: &[f64]) -> TypedValue {
        TypedValue::multiple(
            CellValue::Array(values.iter().map(|n| CellValue::Number(*n)).collect()),
            CellValueType::Number,
        )
    }

    #[test]
    fn test_sum_flattens_arrays() {
        let result = fn_sum(&[nums(&[1.0, 2.0, 3.0]), num(1.0), num(2.0), num(3.0)], &ctx());
        assert_eq!(result.unwrap(), CellValue::Number(12.0));
    }

    #[test]
    fn test_average_skips_nulls() {
        let params = vec![
            TypedValue::multiple(
                CellValue::Array(vec![
                    CellValue::Number(2.0),
                    CellValue::Null,
                    CellValue::Number(4.0),
                ]),
                CellValueType::Number,
            ),
        ];
        assert_eq!(fn_average(&params, &ctx()).unwrap(), CellValue::Number(3.0));
        assert_eq!(fn_average(&[], &ctx()).unwrap(), CellValue::Null);
    }

    #[test]
    fn test_max_min() {
        let params = vec![num(3.0), num(-1.0), num(7.0)];
        assert_eq!(fn_max(&params, &ctx()).unwrap(), CellValue::Number(7.0));
        assert_eq!(fn_min(&params, &ctx()).unwrap(), CellValue::Number(-1.0));
    }

    #[test]
    fn test_round_half_toward_positive() {
        assert_eq!(fn_round(&[num(2.5)], &ctx()).unwrap(), CellValue::Number(3.0));
        assert_eq!(fn_round(&[num(-2.5)], &ctx()).unwrap(), CellValue::Number(-2.0));
        assert_eq!(
            fn_round(&[num(1.005e2), num(1.0)], &ctx()).unwrap(),
            CellValue::Number(100.5)
        );
    }

    #[test]
    fn test_roundup_rounddown() {
        assert_eq!(fn_roundup(&[num(1.1)], &ctx()).unwrap(), CellValue::Number(2.0));
        assert_eq!(fn_roundup(&[num(-1.1)], &ctx()).unwrap(), CellValue::Number(-2.0));
        assert_eq!(fn_rounddown(&[num(1.9)], &ctx()).unwrap(), CellValue::Number(1.0));
        assert_eq!(fn_rounddown(&[num(-1.9)], &ctx()).unwrap(), CellValue::Number(-1.0));
    }

    #[test]
    fn test_even_odd() {
        assert_eq!(fn_even(&[num(1.5)], &ctx()).unwrap(), CellValue::Number(2.0));
        assert_eq!(fn_even(&[num(3.0)], &ctx()).unwrap(), CellValue::Number(4.0));
        assert_eq!(fn_even(&[num(-1.0)], &ctx()).unwrap(), CellValue::Number(-2.0));
        assert_eq!(fn_odd(&[num(2.0)], &ctx()).unwrap(), CellValue::Number(3.0));
        assert_eq!(fn_odd(&[num(0.0)], &ctx()).unwrap(), CellValue::Number(1.0));
    }

    #[test]
    fn test_mod_keeps_dividend_sign() {
        assert_eq!(fn_mod(&[num(8.0), num(3.0)], &ctx()).unwrap(), CellValue::Number(2.0));
        assert_eq!(fn_mod(&[num(-8.0), num(3.0)], &ctx()).unwrap(), CellValue::Number(-2.0));
        assert_eq!(fn_mod(&[num(8.0), num(0.0)], &ctx()).unwrap(), CellValue::Null);
    }

    #[test]
    fn test_sqrt_negative_is_null() {
        assert_eq!(fn_sqrt(&[num(9.0)], &ctx()).unwrap(), CellValue::Number(3.0));
        assert_eq!(fn_sqrt(&[num(-9.0)], &ctx()).unwrap(), CellValue::Null);
    }

    #[test]
    fn test_log_default_base_ten() {
        // log(n)/log(base) is not correctly rounded, so compare loosely
        match fn_log(&[num(100.0)], &ctx()).unwrap() {
            CellValue::Number(n) => assert!((n - 2.0).abs() < 1e-12),
            other => panic!("expected a number, got {:?}", other),
        }
        match fn_log(&[num(8.0), num(2.0)], &ctx()).unwrap() {
            CellValue::Number(n) => assert!((n - 3.0).abs() < 1e-12),
            other => panic!("expected a number, got {:?}", other),
        }
        assert_eq!(fn_log(&[num(0.0)], &ctx()).unwrap(), CellValue::Null);
    }

    #[test]
    fn test_value_extracts_from_text() {
        let text = TypedValue::new(CellValue::String("$1,234.5".into()), CellValueType::String);
        assert_eq!(fn_value(&[text], &ctx()).unwrap(), CellValue::Number(1234.5));

        let junk = TypedValue::new(CellValue::String("no digits".into()), CellValueType::String);
        assert_eq!(fn_value(&[junk], &ctx()).unwrap(), CellValue::Null);
    }
}
