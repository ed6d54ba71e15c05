//! Expression errors

use thiserror::Error;

/// Lexing, parsing or evaluation failure
///
/// Cloneable so a failed parse can live in the parse cache next to
/// successful ones.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExprError {
    /// Character sequence the lexer does not understand
    #[error("unexpected character `{found}` at {position}")]
    Lex {
        /// Byte offset
        position: usize,
        /// Offending character
        found: char,
    },

    /// String literal without closing quote
    #[error("unterminated string starting at {0}")]
    UnterminatedString(usize),

    /// Token in the wrong place
    #[error("syntax error at {position}: {message}")]
    Syntax {
        /// Byte offset
        position: usize,
        /// What went wrong
        message: String,
    },

    /// Input ended mid-expression
    #[error("unexpected end of expression")]
    UnexpectedEnd,

    /// Bare identifier that is neither a keyword nor a function
    #[error("unknown identifier `{0}` (field references need an `@` prefix)")]
    UnknownIdentifier(String),

    /// Call to a function outside the whitelist
    #[error("unknown function `{0}`")]
    UnknownFunction(String),

    /// Function called with the wrong number of arguments
    #[error("function `{function}` expects {expected} argument(s), got {found}")]
    Arity {
        /// Function name
        function: &'static str,
        /// Human-readable expectation
        expected: &'static str,
        /// Actual count
        found: usize,
    },

    /// Arithmetic on a value that does not coerce to a number
    #[error("`{0}` is not a number")]
    NotANumber(String),
}
