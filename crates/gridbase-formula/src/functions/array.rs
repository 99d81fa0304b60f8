//! Array functions
//!
//! Counting functions flatten their arguments one level; the ARRAY*
//! family returns multi-valued results whose element type follows the
//! first argument.

use gridbase_core::{CellValue, CellValueType};

use crate::error::FormulaResult;
use crate::functions::{flatten_params, string_arg, FuncContext, ReturnType};
use crate::value::{js_string, TypedValue};

/// Multi-valued result carrying the first argument's element type
pub(crate) fn infer_elements(params: &[TypedValue]) -> ReturnType {
    let value_type = params
        .first()
        .map(|p| p.value_type)
        .unwrap_or(CellValueType::String);
    ReturnType::multiple(value_type)
}

/// COUNT - numeric items only
pub fn fn_count(params: &[TypedValue], _ctx: &FuncContext<'_>) -> FormulaResult<CellValue> {
    let count = flatten_params(params)
        .into_iter()
        .filter(|v| matches!(v, CellValue::Number(_)))
        .count();
    Ok(CellValue::Number(count as f64))
}

/// COUNTA - items that are not blank
pub fn fn_counta(params: &[TypedValue], _ctx: &FuncContext<'_>) -> FormulaResult<CellValue> {
    let count = flatten_params(params)
        .into_iter()
        .filter(|v| !v.is_null())
        .count();
    Ok(CellValue::Number(count as f64))
}

/// COUNTALL - every item, blanks included
pub fn fn_countall(params: &[TypedValue], _ctx: &FuncContext<'_>) -> FormulaResult<CellValue> {
    Ok(CellValue::Number(flatten_params(params).len() as f64))
}

/// ARRAYJOIN - join the first argument's items; the separator defaults
/// to `", "` and null items are skipped
pub fn fn_arrayjoin(params: &[TypedValue], _ctx: &FuncContext<'_>) -> FormulaResult<CellValue> {
    let separator = string_arg(params, 1).unwrap_or_else(|| ", ".to_string());
    let parts: Vec<String> = match params.first().map(|p| &p.value) {
        Some(CellValue::Array(elements)) => elements
            .iter()
            .filter(|e| !e.is_null())
            .map(js_string)
            .collect(),
        Some(CellValue::Null) | None => return Ok(CellValue::Null),
        Some(value) => vec![js_string(value)],
    };
    Ok(CellValue::String(parts.join(&separator)))
}

/// ARRAYUNIQUE - first occurrence of each distinct item, in order
pub fn fn_arrayunique(params: &[TypedValue], _ctx: &FuncContext<'_>) -> FormulaResult<CellValue> {
    let mut unique: Vec<CellValue> = Vec::new();
    for item in flatten_params(params) {
        if !unique.contains(item) {
            unique.push(item.clone());
        }
    }
    Ok(CellValue::Array(unique))
}

/// ARRAYFLATTEN - every item of every argument, nested arrays opened
/// to any depth
pub fn fn_arrayflatten(params: &[TypedValue], _ctx: &FuncContext<'_>) -> FormulaResult<CellValue> {
    let mut items = Vec::new();
    for param in params {
        flatten_deep(&param.value, &mut items);
    }
    Ok(CellValue::Array(items))
}

fn flatten_deep(value: &CellValue, out: &mut Vec<CellValue>) {
    match value {
        CellValue::Array(elements) => {
            for element in elements {
                flatten_deep(element, out);
            }
        }
        other => out.push(other.clone()),
    }
}

/// ARRAYCOMPACT - drop null and empty-string items
pub fn fn_arraycompact(params: &[TypedValue], _ctx: &FuncContext<'_>) -> FormulaResult<CellValue> {
    let items: Vec<CellValue> = flatten_params(params)
        .into_iter()
        .filter(|v| !v.is_null() && !matches!(v, CellValue::String(s) if s.is_empty()))
        .cloned()
        .collect();
    Ok(CellValue::Array(items))
}
