//! System functions
//!
//! RECORD_ID reads the evaluation record; the pass-throughs back
//! rollup-style computed fields, which hand a precomputed cell value
//! through the formula machinery without reshaping it.

use gridbase_core::{CellValue, CellValueType};

use crate::error::FormulaResult;
use crate::functions::{FuncContext, ReturnType};
use crate::value::TypedValue;

pub(crate) fn infer_passthrough(params: &[TypedValue]) -> ReturnType {
    params
        .first()
        .map(|p| ReturnType {
            value_type: p.value_type,
            is_multiple: p.is_multiple,
        })
        .unwrap_or_else(|| ReturnType::scalar(CellValueType::String))
}

/// RECORD_ID - the current record's id, null in record-less evaluation
pub fn fn_record_id(_params: &[TypedValue], ctx: &FuncContext<'_>) -> FormulaResult<CellValue> {
    match ctx.record {
        Some(record) => Ok(CellValue::String(record.id().to_string())),
        None => Ok(CellValue::Null),
    }
}

/// TEXT_ALL and ROLLUP - value, type and multiplicity flow through
pub fn fn_passthrough(params: &[TypedValue], _ctx: &FuncContext<'_>) -> FormulaResult<CellValue> {
    Ok(params
        .first()
        .map(|p| p.value.clone())
        .unwrap_or(CellValue::Null))
}
