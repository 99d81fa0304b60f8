//! Built-in formula functions
//!
//! Every function is a [`FunctionDef`] entry in the registry. A call
//! passes through three phases: the evaluator coerces each evaluated
//! argument toward `accepted_types`, `validate_params` checks the call
//! shape, and the `eval` pointer computes the result. `infer` gives
//! the static result type and also serves record-less type inference,
//! where `eval` never runs.

pub mod array;
pub mod datetime;
pub mod logical;
pub mod numeric;
pub mod system;
pub mod text;

use ahash::AHashMap;
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;

use gridbase_core::{CellValue, CellValueType, Record};

use crate::ast::Expr;
use crate::error::{FormulaError, FormulaResult};
use crate::time::Timezone;
use crate::value::{js_number, js_string, TypedValue};

/// Function category, mirroring the grouping in the formula editor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FuncCategory {
    Array,
    DateTime,
    Logical,
    Numeric,
    System,
    Text,
}

/// Static result type of a function call
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReturnType {
    pub value_type: CellValueType,
    pub is_multiple: bool,
}

impl ReturnType {
    pub fn scalar(value_type: CellValueType) -> Self {
        Self {
            value_type,
            is_multiple: false,
        }
    }

    pub fn multiple(value_type: CellValueType) -> Self {
        Self {
            value_type,
            is_multiple: true,
        }
    }
}

/// Per-evaluation state visible to function bodies
pub struct FuncContext<'a> {
    pub record: Option<&'a Record>,
    pub timezone: Timezone,
    /// Snapshot taken once per evaluation, so NOW() and TODAY() agree
    /// within a single formula
    pub now: DateTime<Utc>,
}

/// Function implementation signature
pub type EvalFn = fn(&[TypedValue], &FuncContext<'_>) -> FormulaResult<CellValue>;

/// Return-type inference signature, fed the argument types
pub type InferFn = fn(&[TypedValue]) -> ReturnType;

/// Function definition
#[derive(Clone)]
pub struct FunctionDef {
    /// Canonical name (uppercase)
    pub name: &'static str,
    /// Alternative spellings resolving to the same function
    pub aliases: &'static [&'static str],
    pub category: FuncCategory,
    /// Parameter types this function consumes, in declaration order.
    /// Arguments of any other type convert to the first entry.
    pub accepted_types: &'static [CellValueType],
    /// Whether array arguments pass through instead of collapsing
    pub accepts_multiple: bool,
    /// Minimum arguments
    pub min_args: usize,
    /// Maximum arguments (None = unlimited)
    pub max_args: Option<usize>,
    /// Static result type
    pub infer: InferFn,
    /// Implementation
    pub eval: EvalFn,
}

impl FunctionDef {
    /// Check the call shape before any argument is evaluated
    pub fn validate_params(&self, params: &[Expr]) -> FormulaResult<()> {
        check_arity(self.name, params.len(), self.min_args, self.max_args)
    }
}

// Parameter type sets shared across registrations.
pub(crate) const ANY: &[CellValueType] = &[
    CellValueType::String,
    CellValueType::Number,
    CellValueType::Boolean,
    CellValueType::DateTime,
];
pub(crate) const NUMBER: &[CellValueType] = &[CellValueType::Number];
pub(crate) const STRING: &[CellValueType] = &[CellValueType::String];
pub(crate) const STRING_OR_NUMBER: &[CellValueType] =
    &[CellValueType::String, CellValueType::Number];
pub(crate) const BOOLEAN: &[CellValueType] = &[CellValueType::Boolean];
pub(crate) const DATELIKE: &[CellValueType] = &[
    CellValueType::DateTime,
    CellValueType::String,
    CellValueType::Number,
];

// Constant inference helpers; functions with argument-dependent types
// define their own next to the implementation.
pub(crate) fn infer_number(_params: &[TypedValue]) -> ReturnType {
    ReturnType::scalar(CellValueType::Number)
}

pub(crate) fn infer_string(_params: &[TypedValue]) -> ReturnType {
    ReturnType::scalar(CellValueType::String)
}

pub(crate) fn infer_boolean(_params: &[TypedValue]) -> ReturnType {
    ReturnType::scalar(CellValueType::Boolean)
}

pub(crate) fn infer_datetime(_params: &[TypedValue]) -> ReturnType {
    ReturnType::scalar(CellValueType::DateTime)
}

/// Function registry
pub struct FunctionRegistry {
    functions: AHashMap<String, FunctionDef>,
}

impl FunctionRegistry {
    /// Create a new registry with all built-in functions
    fn new() -> Self {
        let mut registry = Self {
            functions: AHashMap::new(),
        };

        registry.register_numeric_functions();
        registry.register_text_functions();
        registry.register_logical_functions();
        registry.register_datetime_functions();
        registry.register_array_functions();
        registry.register_system_functions();

        registry
    }

    /// Look up a function by name, case-insensitively
    pub fn get(&self, name: &str) -> Option<&FunctionDef> {
        self.functions.get(&name.to_uppercase())
    }

    /// Canonical names of all registered functions, sorted
    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.functions.values().map(|f| f.name).collect();
        names.sort_unstable();
        names.dedup();
        names
    }

    /// Register a function under its name and aliases
    fn register(&mut self, def: FunctionDef) {
        for alias in def.aliases {
            self.functions.insert(alias.to_string(), def.clone());
        }
        self.functions.insert(def.name.to_string(), def);
    }

    fn register_numeric_functions(&mut self) {
        // SUM
        self.register(FunctionDef {
            name: "SUM",
            aliases: &[],
            category: FuncCategory::Numeric,
            accepted_types: NUMBER,
            accepts_multiple: true,
            min_args: 1,
            max_args: None,
            infer: infer_number,
            eval: numeric::fn_sum,
        });

        // AVERAGE
        self.register(FunctionDef {
            name: "AVERAGE",
            aliases: &[],
            category: FuncCategory::Numeric,
            accepted_types: NUMBER,
            accepts_multiple: true,
            min_args: 1,
            max_args: None,
            infer: infer_number,
            eval: numeric::fn_average,
        });

        // MAX
        self.register(FunctionDef {
            name: "MAX",
            aliases: &[],
            category: FuncCategory::Numeric,
            accepted_types: NUMBER,
            accepts_multiple: true,
            min_args: 1,
            max_args: None,
            infer: infer_number,
            eval: numeric::fn_max,
        });

        // MIN
        self.register(FunctionDef {
            name: "MIN",
            aliases: &[],
            category: FuncCategory::Numeric,
            accepted_types: NUMBER,
            accepts_multiple: true,
            min_args: 1,
            max_args: None,
            infer: infer_number,
            eval: numeric::fn_min,
        });

        // ROUND
        self.register(FunctionDef {
            name: "ROUND",
            aliases: &[],
            category: FuncCategory::Numeric,
            accepted_types: NUMBER,
            accepts_multiple: false,
            min_args: 1,
            max_args: Some(2),
            infer: infer_number,
            eval: numeric::fn_round,
        });

        // ROUNDUP
        self.register(FunctionDef {
            name: "ROUNDUP",
            aliases: &[],
            category: FuncCategory::Numeric,
            accepted_types: NUMBER,
            accepts_multiple: false,
            min_args: 1,
            max_args: Some(2),
            infer: infer_number,
            eval: numeric::fn_roundup,
        });

        // ROUNDDOWN
        self.register(FunctionDef {
            name: "ROUNDDOWN",
            aliases: &[],
            category: FuncCategory::Numeric,
            accepted_types: NUMBER,
            accepts_multiple: false,
            min_args: 1,
            max_args: Some(2),
            infer: infer_number,
            eval: numeric::fn_rounddown,
        });

        // CEILING
        self.register(FunctionDef {
            name: "CEILING",
            aliases: &[],
            category: FuncCategory::Numeric,
            accepted_types: NUMBER,
            accepts_multiple: false,
            min_args: 1,
            max_args: Some(2),
            infer: infer_number,
            eval: numeric::fn_ceiling,
        });

        // FLOOR
        self.register(FunctionDef {
            name: "FLOOR",
            aliases: &[],
            category: FuncCategory::Numeric,
            accepted_types: NUMBER,
            accepts_multiple: false,
            min_args: 1,
            max_args: Some(2),
            infer: infer_number,
            eval: numeric::fn_floor,
        });

        // EVEN
        self.register(FunctionDef {
            name: "EVEN",
            aliases: &[],
            category: FuncCategory::Numeric,
            accepted_types: NUMBER,
            accepts_multiple: false,
            min_args: 1,
            max_args: Some(1),
            infer: infer_number,
            eval: numeric::fn_even,
        });

        // ODD
        self.register(FunctionDef {
            name: "ODD",
            aliases: &[],
            category: FuncCategory::Numeric,
            accepted_types: NUMBER,
            accepts_multiple: false,
            min_args: 1,
            max_args: Some(1),
            infer: infer_number,
            eval: numeric::fn_odd,
        });

        // INT
        self.register(FunctionDef {
            name: "INT",
            aliases: &[],
            category: FuncCategory::Numeric,
            accepted_types: NUMBER,
            accepts_multiple: false,
            min_args: 1,
            max_args: Some(1),
            infer: infer_number,
            eval: numeric::fn_int,
        });

        // ABS
        self.register(FunctionDef {
            name: "ABS",
            aliases: &[],
            category: FuncCategory::Numeric,
            accepted_types: NUMBER,
            accepts_multiple: false,
            min_args: 1,
            max_args: Some(1),
            infer: infer_number,
            eval: numeric::fn_abs,
        });

        // SQRT
        self.register(FunctionDef {
            name: "SQRT",
            aliases: &[],
            category: FuncCategory::Numeric,
            accepted_types: NUMBER,
            accepts_multiple: false,
            min_args: 1,
            max_args: Some(1),
            infer: infer_number,
            eval: numeric::fn_sqrt,
        });

        // MOD
        self.register(FunctionDef {
            name: "MOD",
            aliases: &[],
            category: FuncCategory::Numeric,
            accepted_types: NUMBER,
            accepts_multiple: false,
            min_args: 2,
            max_args: Some(2),
            infer: infer_number,
            eval: numeric::fn_mod,
        });

        // POWER
        self.register(FunctionDef {
            name: "POWER",
            aliases: &[],
            category: FuncCategory::Numeric,
            accepted_types: NUMBER,
            accepts_multiple: false,
            min_args: 2,
            max_args: Some(2),
            infer: infer_number,
            eval: numeric::fn_power,
        });

        // EXP
        self.register(FunctionDef {
            name: "EXP",
            aliases: &[],
            category: FuncCategory::Numeric,
            accepted_types: NUMBER,
            accepts_multiple: false,
            min_args: 1,
            max_args: Some(1),
            infer: infer_number,
            eval: numeric::fn_exp,
        });

        // LOG
        self.register(FunctionDef {
            name: "LOG",
            aliases: &[],
            category: FuncCategory::Numeric,
            accepted_types: NUMBER,
            accepts_multiple: false,
            min_args: 1,
            max_args: Some(2),
            infer: infer_number,
            eval: numeric::fn_log,
        });

        // VALUE
        self.register(FunctionDef {
            name: "VALUE",
            aliases: &[],
            category: FuncCategory::Numeric,
            accepted_types: STRING,
            accepts_multiple: false,
            min_args: 1,
            max_args: Some(1),
            infer: infer_number,
            eval: numeric::fn_value,
        });
    }

    fn register_text_functions(&mut self) {
        // CONCATENATE
        self.register(FunctionDef {
            name: "CONCATENATE",
            aliases: &[],
            category: FuncCategory::Text,
            accepted_types: STRING,
            accepts_multiple: true,
            min_args: 1,
            max_args: None,
            infer: infer_string,
            eval: text::fn_concatenate,
        });

        // FIND (1-based position, 0 when absent)
        self.register(FunctionDef {
            name: "FIND",
            aliases: &[],
            category: FuncCategory::Text,
            accepted_types: STRING_OR_NUMBER,
            accepts_multiple: false,
            min_args: 2,
            max_args: Some(3),
            infer: infer_number,
            eval: text::fn_find,
        });

        // SEARCH (1-based position, null when absent)
        self.register(FunctionDef {
            name: "SEARCH",
            aliases: &[],
            category: FuncCategory::Text,
            accepted_types: STRING_OR_NUMBER,
            accepts_multiple: false,
            min_args: 2,
            max_args: Some(3),
            infer: infer_number,
            eval: text::fn_search,
        });

        // MID
        self.register(FunctionDef {
            name: "MID",
            aliases: &[],
            category: FuncCategory::Text,
            accepted_types: STRING_OR_NUMBER,
            accepts_multiple: false,
            min_args: 3,
            max_args: Some(3),
            infer: infer_string,
            eval: text::fn_mid,
        });

        // LEFT
        self.register(FunctionDef {
            name: "LEFT",
            aliases: &[],
            category: FuncCategory::Text,
            accepted_types: STRING_OR_NUMBER,
            accepts_multiple: false,
            min_args: 1,
            max_args: Some(2),
            infer: infer_string,
            eval: text::fn_left,
        });

        // RIGHT
        self.register(FunctionDef {
            name: "RIGHT",
            aliases: &[],
            category: FuncCategory::Text,
            accepted_types: STRING_OR_NUMBER,
            accepts_multiple: false,
            min_args: 1,
            max_args: Some(2),
            infer: infer_string,
            eval: text::fn_right,
        });

        // LEN
        self.register(FunctionDef {
            name: "LEN",
            aliases: &[],
            category: FuncCategory::Text,
            accepted_types: STRING,
            accepts_multiple: false,
            min_args: 1,
            max_args: Some(1),
            infer: infer_number,
            eval: text::fn_len,
        });

        // LOWER
        self.register(FunctionDef {
            name: "LOWER",
            aliases: &[],
            category: FuncCategory::Text,
            accepted_types: STRING,
            accepts_multiple: false,
            min_args: 1,
            max_args: Some(1),
            infer: infer_string,
            eval: text::fn_lower,
        });

        // UPPER
        self.register(FunctionDef {
            name: "UPPER",
            aliases: &[],
            category: FuncCategory::Text,
            accepted_types: STRING,
            accepts_multiple: false,
            min_args: 1,
            max_args: Some(1),
            infer: infer_string,
            eval: text::fn_upper,
        });

        // TRIM
        self.register(FunctionDef {
            name: "TRIM",
            aliases: &[],
            category: FuncCategory::Text,
            accepted_types: STRING,
            accepts_multiple: false,
            min_args: 1,
            max_args: Some(1),
            infer: infer_string,
            eval: text::fn_trim,
        });

        // REPT
        self.register(FunctionDef {
            name: "REPT",
            aliases: &[],
            category: FuncCategory::Text,
            accepted_types: STRING_OR_NUMBER,
            accepts_multiple: false,
            min_args: 2,
            max_args: Some(2),
            infer: infer_string,
            eval: text::fn_rept,
        });

        // T
        self.register(FunctionDef {
            name: "T",
            aliases: &[],
            category: FuncCategory::Text,
            accepted_types: ANY,
            accepts_multiple: false,
            min_args: 1,
            max_args: Some(1),
            infer: infer_string,
            eval: text::fn_t,
        });

        // REPLACE (positional)
        self.register(FunctionDef {
            name: "REPLACE",
            aliases: &[],
            category: FuncCategory::Text,
            accepted_types: STRING_OR_NUMBER,
            accepts_multiple: false,
            min_args: 4,
            max_args: Some(4),
            infer: infer_string,
            eval: text::fn_replace,
        });

        // SUBSTITUTE (match-based)
        self.register(FunctionDef {
            name: "SUBSTITUTE",
            aliases: &[],
            category: FuncCategory::Text,
            accepted_types: STRING_OR_NUMBER,
            accepts_multiple: false,
            min_args: 3,
            max_args: Some(4),
            infer: infer_string,
            eval: text::fn_substitute,
        });

        // ENCODE_URL_COMPONENT
        self.register(FunctionDef {
            name: "ENCODE_URL_COMPONENT",
            aliases: &[],
            category: FuncCategory::Text,
            accepted_types: STRING,
            accepts_multiple: false,
            min_args: 1,
            max_args: Some(1),
            infer: infer_string,
            eval: text::fn_encode_url_component,
        });

        // REGEXP_MATCH
        self.register(FunctionDef {
            name: "REGEXP_MATCH",
            aliases: &[],
            category: FuncCategory::Text,
            accepted_types: STRING,
            accepts_multiple: false,
            min_args: 2,
            max_args: Some(2),
            infer: infer_boolean,
            eval: text::fn_regexp_match,
        });

        // REGEXP_EXTRACT
        self.register(FunctionDef {
            name: "REGEXP_EXTRACT",
            aliases: &[],
            category: FuncCategory::Text,
            accepted_types: STRING,
            accepts_multiple: false,
            min_args: 2,
            max_args: Some(2),
            infer: infer_string,
            eval: text::fn_regexp_extract,
        });

        // REGEXP_REPLACE
        self.register(FunctionDef {
            name: "REGEXP_REPLACE",
            aliases: &[],
            category: FuncCategory::Text,
            accepted_types: STRING,
            accepts_multiple: false,
            min_args: 3,
            max_args: Some(3),
            infer: infer_string,
            eval: text::fn_regexp_replace,
        });
    }

    fn register_logical_functions(&mut self) {
        // IF
        self.register(FunctionDef {
            name: "IF",
            aliases: &[],
            category: FuncCategory::Logical,
            accepted_types: ANY,
            accepts_multiple: true,
            min_args: 2,
            max_args: Some(3),
            infer: logical::infer_if,
            eval: logical::fn_if,
        });

        // SWITCH
        self.register(FunctionDef {
            name: "SWITCH",
            aliases: &[],
            category: FuncCategory::Logical,
            accepted_types: ANY,
            accepts_multiple: true,
            min_args: 2,
            max_args: None,
            infer: logical::infer_switch,
            eval: logical::fn_switch,
        });

        // AND
        self.register(FunctionDef {
            name: "AND",
            aliases: &[],
            category: FuncCategory::Logical,
            accepted_types: BOOLEAN,
            accepts_multiple: true,
            min_args: 1,
            max_args: None,
            infer: infer_boolean,
            eval: logical::fn_and,
        });

        // OR
        self.register(FunctionDef {
            name: "OR",
            aliases: &[],
            category: FuncCategory::Logical,
            accepted_types: BOOLEAN,
            accepts_multiple: true,
            min_args: 1,
            max_args: None,
            infer: infer_boolean,
            eval: logical::fn_or,
        });

        // XOR
        self.register(FunctionDef {
            name: "XOR",
            aliases: &[],
            category: FuncCategory::Logical,
            accepted_types: BOOLEAN,
            accepts_multiple: true,
            min_args: 1,
            max_args: None,
            infer: infer_boolean,
            eval: logical::fn_xor,
        });

        // NOT
        self.register(FunctionDef {
            name: "NOT",
            aliases: &[],
            category: FuncCategory::Logical,
            accepted_types: BOOLEAN,
            accepts_multiple: false,
            min_args: 1,
            max_args: Some(1),
            infer: infer_boolean,
            eval: logical::fn_not,
        });

        // BLANK (short-circuited by the evaluator; registered for
        // lookup and listing)
        self.register(FunctionDef {
            name: "BLANK",
            aliases: &[],
            category: FuncCategory::Logical,
            accepted_types: ANY,
            accepts_multiple: false,
            min_args: 0,
            max_args: Some(0),
            infer: infer_string,
            eval: logical::fn_blank,
        });

        // ERROR
        self.register(FunctionDef {
            name: "ERROR",
            aliases: &[],
            category: FuncCategory::Logical,
            accepted_types: STRING,
            accepts_multiple: false,
            min_args: 0,
            max_args: Some(1),
            infer: infer_string,
            eval: logical::fn_error,
        });

        // IS_ERROR (argument failure is observed by the evaluator)
        self.register(FunctionDef {
            name: "IS_ERROR",
            aliases: &["ISERROR"],
            category: FuncCategory::Logical,
            accepted_types: ANY,
            accepts_multiple: true,
            min_args: 1,
            max_args: Some(1),
            infer: infer_boolean,
            eval: logical::fn_is_error,
        });

        // TRUE
        self.register(FunctionDef {
            name: "TRUE",
            aliases: &[],
            category: FuncCategory::Logical,
            accepted_types: BOOLEAN,
            accepts_multiple: false,
            min_args: 0,
            max_args: Some(0),
            infer: infer_boolean,
            eval: logical::fn_true,
        });

        // FALSE
        self.register(FunctionDef {
            name: "FALSE",
            aliases: &[],
            category: FuncCategory::Logical,
            accepted_types: BOOLEAN,
            accepts_multiple: false,
            min_args: 0,
            max_args: Some(0),
            infer: infer_boolean,
            eval: logical::fn_false,
        });
    }

    fn register_datetime_functions(&mut self) {
        // TODAY
        self.register(FunctionDef {
            name: "TODAY",
            aliases: &[],
            category: FuncCategory::DateTime,
            accepted_types: DATELIKE,
            accepts_multiple: false,
            min_args: 0,
            max_args: Some(0),
            infer: infer_datetime,
            eval: datetime::fn_today,
        });

        // NOW
        self.register(FunctionDef {
            name: "NOW",
            aliases: &[],
            category: FuncCategory::DateTime,
            accepted_types: DATELIKE,
            accepts_multiple: false,
            min_args: 0,
            max_args: Some(0),
            infer: infer_datetime,
            eval: datetime::fn_now,
        });

        // TONOW
        self.register(FunctionDef {
            name: "TONOW",
            aliases: &[],
            category: FuncCategory::DateTime,
            accepted_types: DATELIKE,
            accepts_multiple: false,
            min_args: 2,
            max_args: Some(2),
            infer: infer_number,
            eval: datetime::fn_tonow,
        });

        // FROMNOW
        self.register(FunctionDef {
            name: "FROMNOW",
            aliases: &[],
            category: FuncCategory::DateTime,
            accepted_types: DATELIKE,
            accepts_multiple: false,
            min_args: 2,
            max_args: Some(2),
            infer: infer_number,
            eval: datetime::fn_fromnow,
        });

        // DATEADD
        self.register(FunctionDef {
            name: "DATEADD",
            aliases: &[],
            category: FuncCategory::DateTime,
            accepted_types: DATELIKE,
            accepts_multiple: false,
            min_args: 3,
            max_args: Some(3),
            infer: infer_datetime,
            eval: datetime::fn_dateadd,
        });

        // DATETIME_DIFF
        self.register(FunctionDef {
            name: "DATETIME_DIFF",
            aliases: &[],
            category: FuncCategory::DateTime,
            accepted_types: DATELIKE,
            accepts_multiple: false,
            min_args: 2,
            max_args: Some(3),
            infer: infer_number,
            eval: datetime::fn_datetime_diff,
        });

        // WORKDAY
        self.register(FunctionDef {
            name: "WORKDAY",
            aliases: &[],
            category: FuncCategory::DateTime,
            accepted_types: DATELIKE,
            accepts_multiple: false,
            min_args: 2,
            max_args: Some(3),
            infer: infer_datetime,
            eval: datetime::fn_workday,
        });

        // WORKDAY_DIFF
        self.register(FunctionDef {
            name: "WORKDAY_DIFF",
            aliases: &[],
            category: FuncCategory::DateTime,
            accepted_types: DATELIKE,
            accepts_multiple: false,
            min_args: 2,
            max_args: Some(3),
            infer: infer_number,
            eval: datetime::fn_workday_diff,
        });

        // DATETIME_FORMAT
        self.register(FunctionDef {
            name: "DATETIME_FORMAT",
            aliases: &[],
            category: FuncCategory::DateTime,
            accepted_types: DATELIKE,
            accepts_multiple: false,
            min_args: 1,
            max_args: Some(2),
            infer: infer_string,
            eval: datetime::fn_datetime_format,
        });

        // DATETIME_PARSE
        self.register(FunctionDef {
            name: "DATETIME_PARSE",
            aliases: &[],
            category: FuncCategory::DateTime,
            accepted_types: STRING_OR_NUMBER,
            accepts_multiple: false,
            min_args: 1,
            max_args: Some(2),
            infer: infer_datetime,
            eval: datetime::fn_datetime_parse,
        });

        // DATESTR
        self.register(FunctionDef {
            name: "DATESTR",
            aliases: &[],
            category: FuncCategory::DateTime,
            accepted_types: DATELIKE,
            accepts_multiple: false,
            min_args: 1,
            max_args: Some(1),
            infer: infer_string,
            eval: datetime::fn_datestr,
        });

        // TIMESTR
        self.register(FunctionDef {
            name: "TIMESTR",
            aliases: &[],
            category: FuncCategory::DateTime,
            accepted_types: DATELIKE,
            accepts_multiple: false,
            min_args: 1,
            max_args: Some(1),
            infer: infer_string,
            eval: datetime::fn_timestr,
        });

        // YEAR
        self.register(FunctionDef {
            name: "YEAR",
            aliases: &[],
            category: FuncCategory::DateTime,
            accepted_types: DATELIKE,
            accepts_multiple: false,
            min_args: 1,
            max_args: Some(1),
            infer: infer_number,
            eval: datetime::fn_year,
        });

        // MONTH
        self.register(FunctionDef {
            name: "MONTH",
            aliases: &[],
            category: FuncCategory::DateTime,
            accepted_types: DATELIKE,
            accepts_multiple: false,
            min_args: 1,
            max_args: Some(1),
            infer: infer_number,
            eval: datetime::fn_month,
        });

        // DAY
        self.register(FunctionDef {
            name: "DAY",
            aliases: &[],
            category: FuncCategory::DateTime,
            accepted_types: DATELIKE,
            accepts_multiple: false,
            min_args: 1,
            max_args: Some(1),
            infer: infer_number,
            eval: datetime::fn_day,
        });

        // HOUR
        self.register(FunctionDef {
            name: "HOUR",
            aliases: &[],
            category: FuncCategory::DateTime,
            accepted_types: DATELIKE,
            accepts_multiple: false,
            min_args: 1,
            max_args: Some(1),
            infer: infer_number,
            eval: datetime::fn_hour,
        });

        // MINUTE
        self.register(FunctionDef {
            name: "MINUTE",
            aliases: &[],
            category: FuncCategory::DateTime,
            accepted_types: DATELIKE,
            accepts_multiple: false,
            min_args: 1,
            max_args: Some(1),
            infer: infer_number,
            eval: datetime::fn_minute,
        });

        // SECOND
        self.register(FunctionDef {
            name: "SECOND",
            aliases: &[],
            category: FuncCategory::DateTime,
            accepted_types: DATELIKE,
            accepts_multiple: false,
            min_args: 1,
            max_args: Some(1),
            infer: infer_number,
            eval: datetime::fn_second,
        });

        // WEEKNUM
        self.register(FunctionDef {
            name: "WEEKNUM",
            aliases: &[],
            category: FuncCategory::DateTime,
            accepted_types: DATELIKE,
            accepts_multiple: false,
            min_args: 1,
            max_args: Some(2),
            infer: infer_number,
            eval: datetime::fn_weeknum,
        });

        // WEEKDAY
        self.register(FunctionDef {
            name: "WEEKDAY",
            aliases: &[],
            category: FuncCategory::DateTime,
            accepted_types: DATELIKE,
            accepts_multiple: false,
            min_args: 1,
            max_args: Some(2),
            infer: infer_number,
            eval: datetime::fn_weekday,
        });

        // IS_SAME
        self.register(FunctionDef {
            name: "IS_SAME",
            aliases: &[],
            category: FuncCategory::DateTime,
            accepted_types: DATELIKE,
            accepts_multiple: false,
            min_args: 2,
            max_args: Some(3),
            infer: infer_boolean,
            eval: datetime::fn_is_same,
        });

        // IS_BEFORE
        self.register(FunctionDef {
            name: "IS_BEFORE",
            aliases: &[],
            category: FuncCategory::DateTime,
            accepted_types: DATELIKE,
            accepts_multiple: false,
            min_args: 2,
            max_args: Some(2),
            infer: infer_boolean,
            eval: datetime::fn_is_before,
        });

        // IS_AFTER
        self.register(FunctionDef {
            name: "IS_AFTER",
            aliases: &[],
            category: FuncCategory::DateTime,
            accepted_types: DATELIKE,
            accepts_multiple: false,
            min_args: 2,
            max_args: Some(2),
            infer: infer_boolean,
            eval: datetime::fn_is_after,
        });

        // CREATED_TIME
        self.register(FunctionDef {
            name: "CREATED_TIME",
            aliases: &[],
            category: FuncCategory::DateTime,
            accepted_types: DATELIKE,
            accepts_multiple: false,
            min_args: 0,
            max_args: Some(0),
            infer: infer_datetime,
            eval: datetime::fn_created_time,
        });

        // LAST_MODIFIED_TIME
        self.register(FunctionDef {
            name: "LAST_MODIFIED_TIME",
            aliases: &[],
            category: FuncCategory::DateTime,
            accepted_types: DATELIKE,
            accepts_multiple: false,
            min_args: 0,
            max_args: Some(0),
            infer: infer_datetime,
            eval: datetime::fn_last_modified_time,
        });
    }

    fn register_array_functions(&mut self) {
        // COUNT (numeric items only)
        self.register(FunctionDef {
            name: "COUNT",
            aliases: &[],
            category: FuncCategory::Array,
            accepted_types: NUMBER,
            accepts_multiple: true,
            min_args: 1,
            max_args: None,
            infer: infer_number,
            eval: array::fn_count,
        });

        // COUNTA (non-blank items)
        self.register(FunctionDef {
            name: "COUNTA",
            aliases: &[],
            category: FuncCategory::Array,
            accepted_types: ANY,
            accepts_multiple: true,
            min_args: 1,
            max_args: None,
            infer: infer_number,
            eval: array::fn_counta,
        });

        // COUNTALL (every item, blanks included)
        self.register(FunctionDef {
            name: "COUNTALL",
            aliases: &[],
            category: FuncCategory::Array,
            accepted_types: ANY,
            accepts_multiple: true,
            min_args: 1,
            max_args: None,
            infer: infer_number,
            eval: array::fn_countall,
        });

        // ARRAYJOIN
        self.register(FunctionDef {
            name: "ARRAYJOIN",
            aliases: &[],
            category: FuncCategory::Array,
            accepted_types: STRING,
            accepts_multiple: true,
            min_args: 1,
            max_args: Some(2),
            infer: infer_string,
            eval: array::fn_arrayjoin,
        });

        // ARRAYUNIQUE
        self.register(FunctionDef {
            name: "ARRAYUNIQUE",
            aliases: &[],
            category: FuncCategory::Array,
            accepted_types: ANY,
            accepts_multiple: true,
            min_args: 1,
            max_args: None,
            infer: array::infer_elements,
            eval: array::fn_arrayunique,
        });

        // ARRAYFLATTEN
        self.register(FunctionDef {
            name: "ARRAYFLATTEN",
            aliases: &[],
            category: FuncCategory::Array,
            accepted_types: ANY,
            accepts_multiple: true,
            min_args: 1,
            max_args: None,
            infer: array::infer_elements,
            eval: array::fn_arrayflatten,
        });

        // ARRAYCOMPACT
        self.register(FunctionDef {
            name: "ARRAYCOMPACT",
            aliases: &[],
            category: FuncCategory::Array,
            accepted_types: ANY,
            accepts_multiple: true,
            min_args: 1,
            max_args: None,
            infer: array::infer_elements,
            eval: array::fn_arraycompact,
        });
    }

    fn register_system_functions(&mut self) {
        // RECORD_ID
        self.register(FunctionDef {
            name: "RECORD_ID",
            aliases: &[],
            category: FuncCategory::System,
            accepted_types: STRING,
            accepts_multiple: false,
            min_args: 0,
            max_args: Some(0),
            infer: infer_string,
            eval: system::fn_record_id,
        });

        // TEXT_ALL (rollup pass-through)
        self.register(FunctionDef {
            name: "TEXT_ALL",
            aliases: &[],
            category: FuncCategory::System,
            accepted_types: ANY,
            accepts_multiple: true,
            min_args: 1,
            max_args: Some(1),
            infer: system::infer_passthrough,
            eval: system::fn_passthrough,
        });

        // ROLLUP (rollup pass-through)
        self.register(FunctionDef {
            name: "ROLLUP",
            aliases: &[],
            category: FuncCategory::System,
            accepted_types: ANY,
            accepts_multiple: true,
            min_args: 1,
            max_args: Some(1),
            infer: system::infer_passthrough,
            eval: system::fn_passthrough,
        });
    }
}

static REGISTRY: Lazy<FunctionRegistry> = Lazy::new(FunctionRegistry::new);

/// The shared registry, built on first use and immutable afterward
pub fn registry() -> &'static FunctionRegistry {
    &REGISTRY
}

// === Shared parameter helpers ===

/// Check argument count. `max = None` means unbounded.
pub(crate) fn check_arity(
    name: &str,
    actual: usize,
    min: usize,
    max: Option<usize>,
) -> FormulaResult<()> {
    let plural = |n: usize| if n == 1 { "argument" } else { "arguments" };

    if max == Some(min) && actual != min {
        return Err(FormulaError::param(
            name,
            format!("expects exactly {} {}, got {}", min, plural(min), actual),
        ));
    }
    if actual < min {
        return Err(FormulaError::param(
            name,
            format!("expects at least {} {}, got {}", min, plural(min), actual),
        ));
    }
    if let Some(max) = max {
        if actual > max {
            return Err(FormulaError::param(
                name,
                format!("expects at most {} {}, got {}", max, plural(max), actual),
            ));
        }
    }
    Ok(())
}

/// One level of array flattening over all arguments
pub(crate) fn flatten_params<'a>(params: &'a [TypedValue]) -> Vec<&'a CellValue> {
    let mut items = Vec::new();
    for param in params {
        match &param.value {
            CellValue::Array(elements) => items.extend(elements.iter()),
            value => items.push(value),
        }
    }
    items
}

/// Flatten arguments and read each non-null item as a number;
/// unparseable items count as zero
pub(crate) fn flatten_numbers(params: &[TypedValue]) -> Vec<f64> {
    flatten_params(params)
        .into_iter()
        .filter(|v| !v.is_null())
        .map(|v| js_number(v).unwrap_or(0.0))
        .collect()
}

/// Numeric reading of one argument; `None` for missing, null or
/// non-numeric values
pub(crate) fn number_arg(params: &[TypedValue], index: usize) -> Option<f64> {
    let param = params.get(index)?;
    if param.value.is_null() {
        return None;
    }
    js_number(&param.value)
}

/// String reading of one argument; `None` for missing or null values
pub(crate) fn string_arg(params: &[TypedValue], index: usize) -> Option<String> {
    let param = params.get(index)?;
    if param.value.is_null() {
        return None;
    }
    Some(js_string(&param.value))
}

/// Helper for numeric one-in-one-out functions: null in, null out
pub(crate) fn map_number(
    params: &[TypedValue],
    f: impl FnOnce(f64) -> f64,
) -> FormulaResult<CellValue> {
    match number_arg(params, 0) {
        Some(n) => Ok(number_result(f(n))),
        None => Ok(CellValue::Null),
    }
}

/// Wrap a computed number, folding NaN and infinities to null
pub(crate) fn number_result(n: f64) -> CellValue {
    if n.is_finite() {
        CellValue::Number(n)
    } else {
        CellValue::Null
    }
}
