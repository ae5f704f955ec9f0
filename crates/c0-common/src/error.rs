//! Error taxonomy for the compiler.
//!
//! Every failure is fatal: the first error aborts the compilation and carries
//! the source position of the offending token.

use crate::span::Span;
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Classified reason for a tokenize or analyse failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ErrorCode {
    // Lexical
    /// A character that cannot start any token.
    InvalidInput,
    /// An escape sequence other than `\\ \" \' \n \r \t`.
    InvalidEscape,
    /// A string literal without its closing quote.
    UnterminatedString,
    /// An integer literal that does not fit in 64 bits.
    IntegerOverflow,

    // Declarations
    /// The name is already declared at the same scope depth.
    DuplicateDeclaration,
    /// The name is not visible from the current scope.
    NotDeclared,

    // Mutability
    /// Assignment to a `const` variable or parameter.
    AssignToConstant,
    /// Assignment to a function name.
    AssignedToFunction,

    // Definite assignment
    /// Read of a variable that has not been assigned yet.
    NotInitialized,

    // Call shape
    /// Argument count differs from the callee's parameter count.
    WrongParamsNum,
    /// A function name used where a data address is required.
    CantGetProcAddress,

    // Return shape
    /// `return <expr>` inside a `void` function.
    WrongReturn,

    // Name resolution
    /// A name used as a call target that does not name a function.
    ExpectNameToken,

    // Internal
    /// A branch label that was never bound to a position.
    UnresolvedBranch,
}

impl ErrorCode {
    /// Human-readable description.
    pub fn description(self) -> &'static str {
        match self {
            ErrorCode::InvalidInput => "invalid input",
            ErrorCode::InvalidEscape => "invalid escape sequence",
            ErrorCode::UnterminatedString => "unterminated string literal",
            ErrorCode::IntegerOverflow => "integer literal overflow",
            ErrorCode::DuplicateDeclaration => "duplicate declaration",
            ErrorCode::NotDeclared => "not declared",
            ErrorCode::AssignToConstant => "assignment to constant",
            ErrorCode::AssignedToFunction => "assignment to function",
            ErrorCode::NotInitialized => "variable not initialized",
            ErrorCode::WrongParamsNum => "wrong number of arguments",
            ErrorCode::CantGetProcAddress => "function has no data address",
            ErrorCode::WrongReturn => "void function returns a value",
            ErrorCode::ExpectNameToken => "not a function name",
            ErrorCode::UnresolvedBranch => "unresolved branch target",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

/// Compilation failure.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CompileError {
    /// Invalid character sequence in the source.
    #[error("tokenize error at {span}: {code}")]
    Tokenize {
        /// Failure reason.
        code: ErrorCode,
        /// Offending location.
        span: Span,
    },

    /// The next token does not fit the grammar.
    #[error("syntax error at {span}: expected {}, found {found}", .expected.join(" or "))]
    ExpectedToken {
        /// Token kinds acceptable at this point.
        expected: Vec<String>,
        /// Token kind actually found.
        found: String,
        /// Location of the found token.
        span: Span,
    },

    /// Semantic check failure.
    #[error("analyse error at {span}: {code}")]
    Analyse {
        /// Failure reason.
        code: ErrorCode,
        /// Offending location.
        span: Span,
    },
}

impl CompileError {
    /// Create a tokenize error.
    pub fn tokenize(code: ErrorCode, span: Span) -> Self {
        CompileError::Tokenize { code, span }
    }

    /// Create a semantic error.
    pub fn analyse(code: ErrorCode, span: Span) -> Self {
        CompileError::Analyse { code, span }
    }

    /// Error code, if the failure is not a plain syntax error.
    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            CompileError::Tokenize { code, .. } | CompileError::Analyse { code, .. } => {
                Some(*code)
            }
            CompileError::ExpectedToken { .. } => None,
        }
    }

    /// Location of the failure.
    pub fn span(&self) -> Span {
        match self {
            CompileError::Tokenize { span, .. }
            | CompileError::ExpectedToken { span, .. }
            | CompileError::Analyse { span, .. } => *span,
        }
    }
}

/// Convenience type alias for compiler operations.
pub type CompileResult<T> = Result<T, CompileError>;
