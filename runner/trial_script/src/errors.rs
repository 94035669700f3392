//! Error types for parsing and executing scripts.
//!
//! Runtime errors carry a [`Location`] naming the *raw* identifier of the
//! chunk that raised them. Rewriting that identifier into a source path is
//! the reporter's job; the interpreter only knows sandbox identifiers.

use crate::ast::BinaryOp;
use thiserror::Error;

/// Syntax error with the line it was detected on.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("line {line}: {message}")]
pub struct ParseError {
    pub line: u32,
    pub message: String,
}

impl ParseError {
    pub fn new(line: u32, message: impl Into<String>) -> Self {
        ParseError {
            line,
            message: message.into(),
        }
    }
}

/// Where a runtime error was raised: chunk raw identifier plus line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Location {
    pub origin: String,
    pub line: u32,
}

/// Typed runtime error category.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum RuntimeErrorKind {
    // Assertion/Test
    #[error("{message}")]
    AssertionFailed { message: String },
    #[error("{message}")]
    Failed { message: String },
    #[error("Exceeded timeout of {limit_ms} ms for a test.")]
    Timeout { limit_ms: u64 },

    // Capability
    #[error("cannot mock `{name}`: only print, random and now may be intercepted")]
    UnsupportedMock { name: String },
    #[error("invalid mock for `{name}`: {reason}")]
    InvalidMock { name: String, reason: String },

    // Access
    #[error("undefined variable: {name}")]
    UndefinedVariable { name: String },
    #[error("module `{module}` has no field `{field}`")]
    UndefinedField { module: String, field: String },
    #[error("cannot access field `{field}` on {type_name}")]
    NotAModule { field: String, type_name: String },

    // Type/Operator
    #[error("type mismatch: expected {expected}, got {got}")]
    TypeMismatch { expected: String, got: String },
    #[error("operator `{}` cannot be applied to {left} and {right}", .op.as_symbol())]
    InvalidBinaryOp {
        op: BinaryOp,
        left: String,
        right: String,
    },
    #[error("division by zero")]
    DivisionByZero,
    #[error("integer overflow in {operation}")]
    IntegerOverflow { operation: String },

    // Function
    #[error("undefined function: {name}")]
    UnknownFunction { name: String },
    #[error("{name} expects {expected} argument(s), got {got}")]
    ArityMismatch {
        name: String,
        expected: usize,
        got: usize,
    },

    // Modules
    #[error("cannot find module \"{request}\"")]
    ModuleNotFound { request: String },
    #[error("failed to load module \"{request}\": {message}")]
    ModuleLoad { request: String, message: String },
    #[error("cyclic use of module \"{request}\"")]
    CyclicRequire { request: String },
    #[error("modules cannot declare tests, describes or hooks")]
    DeclarationInModule,
}

/// Runtime error with an optional location.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("{kind}")]
pub struct RuntimeError {
    pub kind: RuntimeErrorKind,
    pub location: Option<Location>,
}

impl RuntimeError {
    pub fn new(kind: RuntimeErrorKind) -> Self {
        RuntimeError {
            kind,
            location: None,
        }
    }

    /// Attach a location unless one is already present (innermost wins).
    #[must_use]
    pub fn at(mut self, origin: &str, line: u32) -> Self {
        if self.location.is_none() {
            self.location = Some(Location {
                origin: origin.to_string(),
                line,
            });
        }
        self
    }
}

impl From<RuntimeErrorKind> for RuntimeError {
    fn from(kind: RuntimeErrorKind) -> Self {
        RuntimeError::new(kind)
    }
}

/// Result of evaluating an expression or statement.
pub type ExecResult<T> = Result<T, RuntimeError>;
