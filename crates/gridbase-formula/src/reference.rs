//! Field-reference utilities
//!
//! Stored formulas spell field references by id (`{fldXXX}`); editors
//! show them by display name. These helpers extract the ids a formula
//! depends on and rewrite a formula between the two spellings without
//! disturbing any other byte of the source text.

use ahash::{AHashMap, AHashSet};

use crate::ast::{Expr, Span};
use crate::error::FormulaResult;
use crate::parser::parse_expression;

/// Field ids referenced by an expression, in first-appearance order
/// with duplicates removed.
pub fn referenced_field_ids(expression: &str) -> FormulaResult<Vec<String>> {
    let ast = parse_expression(expression)?;

    let mut ids = Vec::new();
    let mut seen = AHashSet::new();
    collect_references(&ast, &mut |field_id: &str, _| {
        if seen.insert(field_id.to_string()) {
            ids.push(field_id.to_string());
        }
    });
    Ok(ids)
}

/// Rewrite `{fieldId}` tokens to `{fieldName}` form.
///
/// Ids missing from the map keep their original token.
pub fn convert_expression_id_to_name(
    expression: &str,
    id_to_name: &AHashMap<String, String>,
) -> FormulaResult<String> {
    rewrite_references(expression, id_to_name)
}

/// Rewrite `{fieldName}` tokens back to `{fieldId}` form.
///
/// Names missing from the map keep their original token. With a map
/// inverse to the one used for the name rewrite, this restores the
/// original expression byte for byte.
pub fn convert_expression_name_to_id(
    expression: &str,
    name_to_id: &AHashMap<String, String>,
) -> FormulaResult<String> {
    rewrite_references(expression, name_to_id)
}

fn rewrite_references(
    expression: &str,
    map: &AHashMap<String, String>,
) -> FormulaResult<String> {
    let ast = parse_expression(expression)?;

    // An in-order walk visits references in source position order, so
    // the spans splice left to right
    let mut references: Vec<(Span, String)> = Vec::new();
    collect_references(&ast, &mut |field_id: &str, span| {
        references.push((span, field_id.to_string()));
    });

    let mut out = String::with_capacity(expression.len());
    let mut cursor = 0;
    for (span, field_id) in references {
        let mapped = match map.get(&field_id) {
            Some(mapped) => mapped,
            None => continue,
        };
        out.push_str(&expression[cursor..span.start]);
        out.push('{');
        push_escaped(&mut out, mapped);
        out.push('}');
        cursor = span.end;
    }
    out.push_str(&expression[cursor..]);
    Ok(out)
}

/// Escape the characters the reference scanner treats specially, so a
/// spliced name survives a later parse unchanged.
fn push_escaped(out: &mut String, name: &str) {
    for c in name.chars() {
        if matches!(c, '{' | '}' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
}

fn collect_references(expr: &Expr, visit: &mut impl FnMut(&str, Span)) {
    match expr {
        Expr::IntegerLiteral(_)
        | Expr::DecimalLiteral(_)
        | Expr::StringLiteral(_)
        | Expr::BooleanLiteral(_) => {}
        Expr::FieldReference { field_id, span } => visit(field_id, *span),
        Expr::BinaryOp { left, right, .. } => {
            collect_references(left, visit);
            collect_references(right, visit);
        }
        Expr::UnaryNegate(operand) => collect_references(operand, visit),
        Expr::Parenthesized(inner) => collect_references(inner, visit),
        Expr::FunctionCall { args, .. } => {
            for arg in args {
                collect_references(arg, visit);
            }
        }
    }
}
