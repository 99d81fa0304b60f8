//! Formula evaluator
//!
//! Single tree walk producing a [`TypedValue`] per node. The same walk
//! serves two modes: bound to a record it computes values, without one
//! it only carries types, so a formula's result type is known before
//! any record exists. Operator result types are structural (decided
//! from operand static types), matching what the record-less mode must
//! report.

use chrono::{DateTime, Utc};

use gridbase_core::{CellValue, CellValueType, Field, FieldMap, Record};

use crate::ast::{BinaryOperator, Expr};
use crate::coerce::coerce_param;
use crate::error::{FormulaError, FormulaResult};
use crate::functions::{registry, FuncContext, FunctionDef};
use crate::parser::parse_expression;
use crate::time::Timezone;
use crate::value::{compare, js_number, js_string, js_truthy, loose_eq, TypedValue};

/// Everything one evaluation pass reads: the dependency map, the
/// record (absent in type-inference mode), the call timezone and a
/// single "now" shared by every clock function in the pass.
pub struct EvalContext<'a> {
    pub fields: &'a FieldMap,
    pub record: Option<&'a Record>,
    pub timezone: Timezone,
    pub now: DateTime<Utc>,
}

impl<'a> EvalContext<'a> {
    pub fn new(fields: &'a FieldMap, record: Option<&'a Record>, timezone: Timezone) -> Self {
        EvalContext {
            fields,
            record,
            timezone,
            now: Utc::now(),
        }
    }

    fn func_context(&self) -> FuncContext<'a> {
        FuncContext {
            record: self.record,
            timezone: self.timezone,
            now: self.now,
        }
    }

    /// Record-less calls only infer types; `eval` never runs
    fn is_static(&self) -> bool {
        self.record.is_none()
    }
}

/// Evaluate a formula expression against a record.
///
/// `time_zone` is an IANA zone name or a fixed offset such as
/// `"+08:00"`; `None` means UTC. Calendar-sensitive functions and
/// date parsing interpret wall-clock text in this zone.
pub fn evaluate(
    expression: &str,
    fields: &FieldMap,
    record: Option<&Record>,
    time_zone: Option<&str>,
) -> FormulaResult<TypedValue> {
    let timezone = resolve_timezone(time_zone)?;
    let ast = parse_expression(expression)?;
    let ctx = EvalContext::new(fields, record, timezone);
    evaluate_expr(&ast, &ctx)
}

/// Infer a formula's static result type without a record
pub fn infer_type(expression: &str, fields: &FieldMap) -> FormulaResult<TypedValue> {
    evaluate(expression, fields, None, None)
}

fn resolve_timezone(time_zone: Option<&str>) -> FormulaResult<Timezone> {
    match time_zone {
        None => Ok(Timezone::utc()),
        Some(name) => Timezone::parse(name)
            .ok_or_else(|| FormulaError::Value(format!("invalid time zone '{}'", name))),
    }
}

/// Evaluate one expression node
pub fn evaluate_expr(expr: &Expr, ctx: &EvalContext<'_>) -> FormulaResult<TypedValue> {
    match expr {
        // === Literals ===
        Expr::IntegerLiteral(n) => Ok(TypedValue::new(
            CellValue::Number(*n as f64),
            CellValueType::Number,
        )),
        Expr::DecimalLiteral(n) => Ok(TypedValue::new(
            CellValue::Number(*n),
            CellValueType::Number,
        )),
        Expr::StringLiteral(s) => Ok(TypedValue::new(
            CellValue::String(s.clone()),
            CellValueType::String,
        )),
        Expr::BooleanLiteral(b) => Ok(TypedValue::new(
            CellValue::Boolean(*b),
            CellValueType::Boolean,
        )),

        // === References ===
        Expr::FieldReference { field_id, .. } => evaluate_field(field_id, ctx),

        // === Operators ===
        Expr::BinaryOp { op, left, right } => evaluate_binary_op(*op, left, right, ctx),
        Expr::UnaryNegate(operand) => evaluate_negate(operand, ctx),

        // === Grouping ===
        Expr::Parenthesized(inner) => evaluate_expr(inner, ctx),

        // === Function call ===
        Expr::FunctionCall { name, args } => evaluate_function(name, args, ctx),
    }
}

fn evaluate_field(field_id: &str, ctx: &EvalContext<'_>) -> FormulaResult<TypedValue> {
    let field = ctx
        .fields
        .get(field_id)
        .ok_or_else(|| FormulaError::UnknownField(field_id.to_string()))?;

    let value_type = field.cell_value_type();
    let is_multiple = field.is_multiple_cell_value();

    let record = match ctx.record {
        Some(record) => record,
        None => {
            return Ok(TypedValue::inferred(value_type, is_multiple).with_field(field.clone()))
        }
    };

    let raw = record
        .cell_value(field_id)
        .cloned()
        .unwrap_or(CellValue::Null);

    // Link and attachment cells store structured payloads; a String
    // field renders them to text through its own descriptor
    let value = if value_type == CellValueType::String {
        render_string_field(field.as_ref(), raw)
    } else {
        raw
    };

    let typed = if is_multiple {
        TypedValue::multiple(value, value_type)
    } else {
        TypedValue::new(value, value_type)
    };
    Ok(typed.with_field(field.clone()))
}

fn render_string_field(field: &dyn Field, raw: CellValue) -> CellValue {
    match raw {
        CellValue::Object(_) => match field.cell_value_to_string(&raw) {
            Some(text) => CellValue::String(text),
            None => CellValue::Null,
        },
        CellValue::Array(items) => CellValue::Array(
            items
                .into_iter()
                .map(|item| match item {
                    CellValue::Object(_) => match field.item_to_string(&item) {
                        Some(text) => CellValue::String(text),
                        None => CellValue::Null,
                    },
                    other => other,
                })
                .collect(),
        ),
        other => other,
    }
}

fn evaluate_binary_op(
    op: BinaryOperator,
    left: &Expr,
    right: &Expr,
    ctx: &EvalContext<'_>,
) -> FormulaResult<TypedValue> {
    let lhs = normalize_operand(evaluate_expr(left, ctx)?, op)?;
    let rhs = normalize_operand(evaluate_expr(right, ctx)?, op)?;

    // Result types are structural: `+` is numeric only when both sides
    // are statically Number, everything else is fixed per operator
    let result_type = match op {
        BinaryOperator::Add => {
            if lhs.value_type == CellValueType::Number && rhs.value_type == CellValueType::Number {
                CellValueType::Number
            } else {
                CellValueType::String
            }
        }
        BinaryOperator::Subtract
        | BinaryOperator::Multiply
        | BinaryOperator::Divide
        | BinaryOperator::Modulo => CellValueType::Number,
        BinaryOperator::Concat => CellValueType::String,
        BinaryOperator::Equal
        | BinaryOperator::NotEqual
        | BinaryOperator::LessThan
        | BinaryOperator::LessEqual
        | BinaryOperator::GreaterThan
        | BinaryOperator::GreaterEqual
        | BinaryOperator::And
        | BinaryOperator::Or => CellValueType::Boolean,
    };

    if ctx.is_static() {
        return Ok(TypedValue::inferred(result_type, false));
    }

    let value = apply_binary_op(op, &lhs.value, &rhs.value, result_type);
    Ok(TypedValue::new(value, result_type))
}

/// Reduce a field-backed operand to a scalar an operator can combine.
///
/// Date-time fields keep their value form under comparison so equal
/// instants stay equal; elsewhere they read as display text. A
/// multi-value Number field stands in for a scalar only while it holds
/// at most one element.
fn normalize_operand(operand: TypedValue, op: BinaryOperator) -> FormulaResult<TypedValue> {
    let field = match &operand.field {
        Some(field) => field.clone(),
        None => return Ok(operand),
    };

    if operand.value_type == CellValueType::DateTime && op.is_comparison() {
        return Ok(operand);
    }

    if operand.value_type == CellValueType::Number && operand.is_multiple {
        return match operand.value {
            CellValue::Array(items) => match items.len() {
                0 => Ok(TypedValue::new(CellValue::Null, CellValueType::Number)),
                1 => Ok(TypedValue::new(
                    items.into_iter().next().unwrap_or(CellValue::Null),
                    CellValueType::Number,
                )),
                _ => Err(FormulaError::Value(
                    "cannot perform mathematical calculation on an array with more than one \
                     numeric element"
                        .to_string(),
                )),
            },
            value => Ok(TypedValue::new(value, CellValueType::Number)),
        };
    }

    if matches!(
        operand.value_type,
        CellValueType::Number | CellValueType::Boolean | CellValueType::String
    ) {
        return Ok(operand);
    }

    // Date-time (or future structured) field outside comparison: the
    // descriptor's display conversion decides the text form
    let rendered = field
        .cell_value_to_string(&operand.value)
        .map(CellValue::String)
        .unwrap_or(CellValue::Null);
    Ok(TypedValue::new(rendered, CellValueType::String))
}

fn apply_binary_op(
    op: BinaryOperator,
    lhs: &CellValue,
    rhs: &CellValue,
    result_type: CellValueType,
) -> CellValue {
    use std::cmp::Ordering;

    match op {
        BinaryOperator::Add => {
            if result_type == CellValueType::Number {
                arithmetic(op, lhs, rhs)
            } else {
                CellValue::String(format!("{}{}", js_string(lhs), js_string(rhs)))
            }
        }
        BinaryOperator::Subtract
        | BinaryOperator::Multiply
        | BinaryOperator::Divide
        | BinaryOperator::Modulo => arithmetic(op, lhs, rhs),

        // Null concatenates as the empty string
        BinaryOperator::Concat => {
            CellValue::String(format!("{}{}", js_string(lhs), js_string(rhs)))
        }

        BinaryOperator::Equal => CellValue::Boolean(loose_eq(lhs, rhs)),
        BinaryOperator::NotEqual => CellValue::Boolean(!loose_eq(lhs, rhs)),
        BinaryOperator::LessThan => {
            CellValue::Boolean(compare(lhs, rhs) == Some(Ordering::Less))
        }
        BinaryOperator::LessEqual => CellValue::Boolean(matches!(
            compare(lhs, rhs),
            Some(Ordering::Less) | Some(Ordering::Equal)
        )),
        BinaryOperator::GreaterThan => {
            CellValue::Boolean(compare(lhs, rhs) == Some(Ordering::Greater))
        }
        BinaryOperator::GreaterEqual => CellValue::Boolean(matches!(
            compare(lhs, rhs),
            Some(Ordering::Greater) | Some(Ordering::Equal)
        )),

        BinaryOperator::And => CellValue::Boolean(js_truthy(lhs) && js_truthy(rhs)),
        BinaryOperator::Or => CellValue::Boolean(js_truthy(lhs) || js_truthy(rhs)),
    }
}

/// Numeric combination with script-engine coercion. Division and
/// modulo by zero (or by null, which reads as zero) yield null rather
/// than an error, as does any non-finite result.
fn arithmetic(op: BinaryOperator, lhs: &CellValue, rhs: &CellValue) -> CellValue {
    let a = js_number(lhs).unwrap_or(f64::NAN);
    let b = js_number(rhs).unwrap_or(f64::NAN);

    let result = match op {
        BinaryOperator::Add => a + b,
        BinaryOperator::Subtract => a - b,
        BinaryOperator::Multiply => a * b,
        BinaryOperator::Divide => {
            if b == 0.0 {
                return CellValue::Null;
            }
            a / b
        }
        BinaryOperator::Modulo => {
            if b == 0.0 {
                return CellValue::Null;
            }
            a % b
        }
        _ => f64::NAN,
    };

    if result.is_finite() {
        CellValue::Number(result)
    } else {
        CellValue::Null
    }
}

fn evaluate_negate(operand: &Expr, ctx: &EvalContext<'_>) -> FormulaResult<TypedValue> {
    // Unary minus is numeric; field normalization follows the numeric
    // operators, so an empty multi-value Number field reads as null
    let operand = normalize_operand(evaluate_expr(operand, ctx)?, BinaryOperator::Subtract)?;

    if ctx.is_static() {
        return Ok(TypedValue::inferred(CellValueType::Number, false));
    }

    if operand.value.is_null() {
        return Ok(TypedValue::new(CellValue::Null, CellValueType::Number));
    }
    let value = match js_number(&operand.value) {
        Some(n) => CellValue::Number(-n),
        None => CellValue::Null,
    };
    Ok(TypedValue::new(value, CellValueType::Number))
}

fn evaluate_function(name: &str, args: &[Expr], ctx: &EvalContext<'_>) -> FormulaResult<TypedValue> {
    let def = registry()
        .get(name)
        .ok_or_else(|| FormulaError::UnknownFunction(name.to_string()))?;

    // BLANK never sees arguments: it short-circuits to the blank
    // marker the branch-type rules look for
    if def.name == "BLANK" {
        return Ok(TypedValue::blank());
    }

    def.validate_params(args)?;

    if def.name == "IS_ERROR" {
        return evaluate_is_error(def, args, ctx);
    }

    let mut params = Vec::with_capacity(args.len());
    for arg in args {
        let param = evaluate_expr(arg, ctx)?;
        params.push(coerce_param(
            param,
            def.name,
            def.accepted_types,
            def.accepts_multiple,
            ctx.timezone,
        )?);
    }

    finish_call(def, &params, ctx)
}

/// IS_ERROR observes its argument instead of propagating it: a
/// recoverable failure becomes `true`, a clean value flows into the
/// normal call path (which answers `false`), and fatal errors still
/// abort the evaluation.
fn evaluate_is_error(
    def: &FunctionDef,
    args: &[Expr],
    ctx: &EvalContext<'_>,
) -> FormulaResult<TypedValue> {
    let mut params = Vec::with_capacity(args.len());
    for arg in args {
        let outcome = evaluate_expr(arg, ctx).and_then(|param| {
            coerce_param(
                param,
                def.name,
                def.accepted_types,
                def.accepts_multiple,
                ctx.timezone,
            )
        });
        match outcome {
            Ok(param) => params.push(param),
            Err(err) if err.is_interceptable() => {
                return Ok(if ctx.is_static() {
                    TypedValue::inferred(CellValueType::Boolean, false)
                } else {
                    TypedValue::new(CellValue::Boolean(true), CellValueType::Boolean)
                });
            }
            Err(err) => return Err(err),
        }
    }
    finish_call(def, &params, ctx)
}

fn finish_call(
    def: &FunctionDef,
    params: &[TypedValue],
    ctx: &EvalContext<'_>,
) -> FormulaResult<TypedValue> {
    let return_type = (def.infer)(params);

    if ctx.is_static() {
        return Ok(TypedValue::inferred(
            return_type.value_type,
            return_type.is_multiple,
        ));
    }

    let value = (def.eval)(params, &ctx.func_context())?;
    Ok(if return_type.is_multiple {
        TypedValue::multiple(value, return_type.value_type)
    } else {
        TypedValue::new(value, return_type.value_type)
    })
}
