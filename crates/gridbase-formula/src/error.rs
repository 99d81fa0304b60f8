//! Formula error types

use thiserror::Error;

/// Result type for formula operations
pub type FormulaResult<T> = std::result::Result<T, FormulaError>;

/// Errors that can occur during formula parsing or evaluation
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FormulaError {
    /// Lexical or grammar failure while parsing an expression
    #[error("Syntax error: {message} (at offset {position})")]
    Syntax { message: String, position: usize },

    /// Expression references a field id missing from the dependency map
    #[error("Unknown field: {0}")]
    UnknownField(String),

    /// Expression calls a function the registry does not know
    #[error("Unknown function: {0}")]
    UnknownFunction(String),

    /// A function rejected its parameters (arity or type)
    #[error("{function}: {message}")]
    Param { function: String, message: String },

    /// An operand could not be combined by an operator
    #[error("{0}")]
    Value(String),
}

impl FormulaError {
    /// Syntax error at a byte offset in the source expression
    pub fn syntax<S: Into<String>>(message: S, position: usize) -> Self {
        FormulaError::Syntax {
            message: message.into(),
            position,
        }
    }

    /// Parameter rejection raised from inside a function
    pub fn param<F: Into<String>, M: Into<String>>(function: F, message: M) -> Self {
        FormulaError::Param {
            function: function.into(),
            message: message.into(),
        }
    }

    /// Whether `IS_ERROR(...)` may intercept this error. Parameter and
    /// operand failures are recoverable; bad references, unknown functions
    /// and syntax errors abort the whole evaluation.
    pub fn is_interceptable(&self) -> bool {
        matches!(self, FormulaError::Param { .. } | FormulaError::Value(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = FormulaError::syntax("unexpected token ','", 4);
        assert_eq!(err.to_string(), "Syntax error: unexpected token ',' (at offset 4)");

        let err = FormulaError::param("SUM", "expected at least 1 parameter");
        assert_eq!(err.to_string(), "SUM: expected at least 1 parameter");
    }

    #[test]
    fn test_interceptable_split() {
        assert!(FormulaError::param("WORKDAY", "bad holiday").is_interceptable());
        assert!(FormulaError::Value("array too wide".into()).is_interceptable());
        assert!(!FormulaError::UnknownField("fldX".into()).is_interceptable());
        assert!(!FormulaError::UnknownFunction("NOPE".into()).is_interceptable());
        assert!(!FormulaError::syntax("eof", 0).is_interceptable());
    }
}
