//! Centralised error hierarchy for the **Rox interpreter**.
//!
//! Every phase (scanner, parser, resolver, evaluator, CLI) converts its failure
//! modes into one of the variants defined here, so the crate can share a single
//! `Result<T>` alias and the binary can map any failure to a process exit code.
//!
//! The module **does not** print diagnostics itself.

use std::fmt;
use std::io;

use log::info;
use thiserror::Error;

/// Exit status for malformed program text (lexing or parsing failed).
pub const EXIT_SYNTAX: i32 = 65;

/// Exit status for a program that parsed but failed to resolve or run.
pub const EXIT_RUNTIME: i32 = 70;

/// Exit status for failures reading input.
pub const EXIT_IO: i32 = 74;

/// Which operand of a binary operator had the wrong dynamic type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operand {
    Left,
    Right,
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Left => write!(f, "left"),
            Operand::Right => write!(f, "right"),
        }
    }
}

/// Canonical error type used throughout the interpreter.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LoxError {
    /// Lexical (scanner) error with source line information.
    #[error("[line {line}] Error: {message}")]
    Lex {
        /// Human‑readable description.
        message: String,

        /// 1‑based line where the error occurred.
        line: usize,
    },

    /// Syntactic (parser) error.
    #[error("[line {line}] Error{location}: {message}")]
    Parse {
        message: String,
        /// Either empty, ` at end`, or ` at 'lexeme'`.
        location: String,
        line: usize,
    },

    /// Static binding error found before any statement executes.
    #[error("[line {line}] Error at '{name}': {message}")]
    Resolve {
        name: String,
        message: String,
        line: usize,
    },

    /// Read or assignment of a name bound in no reachable scope.
    #[error("[line {line}] Undefined variable '{name}'.")]
    UnresolvedName { name: String, line: usize },

    /// Operand of the wrong dynamic type.
    #[error("[line {line}] Error at '{operator}': {message}")]
    Type {
        operator: String,
        side: Option<Operand>,
        message: String,
        line: usize,
    },

    #[error("[line {line}] Division by zero.")]
    DivisionByZero { line: usize },

    #[error("[line {line}] Can only call functions.")]
    NotCallable { line: usize },

    #[error("[line {line}] Expected {expected} arguments but got {got}.")]
    ArityMismatch {
        expected: usize,
        got: usize,
        line: usize,
    },

    /// Nested user-function calls exceeded the interpreter's depth limit.
    #[error("[line {line}] Stack overflow.")]
    StackOverflow { line: usize },

    /// Internal invariant violation surfaced at run time.
    #[error("Runtime error: {0}")]
    Runtime(String),

    /// Wrapper around `std::io::Error` (transparent).  Enables `?` on I/O ops.
    #[error(transparent)]
    Io(#[from] io::Error),

    /// UTF‑8 decoding failure when ingesting external text.
    #[error(transparent)]
    Utf8(#[from] std::string::FromUtf8Error),
}

impl LoxError {
    /// Helper constructor for the **scanner**.
    pub fn lex<S: Into<String>>(line: usize, msg: S) -> Self {
        let message: String = msg.into();

        info!("Creating Lex error: line={}, msg={}", line, message);

        LoxError::Lex { message, line }
    }

    /// Helper constructor for the **parser**.
    pub fn parse<S: Into<String>>(line: usize, location: String, msg: S) -> Self {
        let message: String = msg.into();

        info!("Creating Parse error: line={}, msg={}", line, message);

        LoxError::Parse {
            message,
            location,
            line,
        }
    }

    /// Helper constructor for the **resolver**.
    pub fn resolve<S: Into<String>>(line: usize, name: &str, msg: S) -> Self {
        let message: String = msg.into();

        info!("Creating Resolve error: line={}, msg={}", line, message);

        LoxError::Resolve {
            name: name.to_string(),
            message,
            line,
        }
    }

    /// Helper constructor for operand type errors.
    pub fn type_error<S: Into<String>>(
        line: usize,
        operator: &str,
        side: Option<Operand>,
        msg: S,
    ) -> Self {
        let message: String = msg.into();

        info!(
            "Creating Type error: line={}, operator={}, side={:?}, msg={}",
            line, operator, side, message
        );

        LoxError::Type {
            operator: operator.to_string(),
            side,
            message,
            line,
        }
    }

    /// Process exit status the driver should use for this failure.
    pub fn exit_code(&self) -> i32 {
        match self {
            LoxError::Lex { .. } | LoxError::Parse { .. } => EXIT_SYNTAX,
            LoxError::Io(_) | LoxError::Utf8(_) => EXIT_IO,
            _ => EXIT_RUNTIME,
        }
    }
}

/// Crate‑wide `Result` alias.
pub type Result<T> = std::result::Result<T, LoxError>;
