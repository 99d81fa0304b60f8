//! # gridbase-formula
//!
//! Formula parser and evaluator for gridbase tables.
//!
//! This crate provides:
//! - Formula parsing (text → AST)
//! - Typed evaluation against a record (AST → `TypedValue`)
//! - Record-less static type inference for formula field definitions
//! - Built-in function library (numeric, text, logical, date-time,
//!   array, system)
//! - Field-reference extraction and id/name expression rewriting
//!
//! ## Example
//!
//! ```rust,ignore
//! use gridbase_formula::{evaluate, infer_type};
//!
//! let result = evaluate("{fldPrice} * {fldQty}", &fields, Some(&record), None)?;
//! let result_type = infer_type("{fldPrice} * {fldQty}", &fields)?;
//! ```

pub mod ast;
pub mod coerce;
pub mod error;
pub mod evaluator;
pub mod functions;
pub mod parser;
pub mod reference;
pub mod time;
pub mod value;

pub use ast::{BinaryOperator, Expr, Span};
pub use error::{FormulaError, FormulaResult};
pub use evaluator::{evaluate, evaluate_expr, infer_type, EvalContext};
pub use parser::parse_expression;
pub use reference::{
    convert_expression_id_to_name, convert_expression_name_to_id, referenced_field_ids,
};
pub use time::Timezone;
pub use value::TypedValue;
