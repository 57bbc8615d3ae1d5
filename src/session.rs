//! One interpreter fed by one or more source texts.
//!
//! Each [`Session::run`] takes a source through lex → parse → resolve →
//! evaluate and stops at the first phase that reports anything. Global state
//! and expression ids carry over between runs, which is what the REPL needs.

use std::fs;
use std::io::{self, Write};
use std::path::Path;

use log::{debug, info};

use crate::ast::ExprId;
use crate::error::LoxError;
use crate::interpreter::Interpreter;
use crate::parser::Parser;
use crate::resolver::Resolver;
use crate::scanner::Scanner;

/// Reads a source file as UTF-8 text.
///
/// Missing or unreadable files surface as [`LoxError::Io`] and invalid UTF-8
/// as [`LoxError::Utf8`], both of which map to the I/O exit status.
pub fn read_source(path: &Path) -> Result<String, LoxError> {
    info!("Reading file: {:?}", path);

    let bytes = fs::read(path)?;
    debug!("Read {} bytes from {:?}", bytes.len(), path);

    Ok(String::from_utf8(bytes)?)
}

pub struct Session<'a, W: Write> {
    interpreter: Interpreter<'a, W>,
    next_id: ExprId,
}

impl<'a> Session<'a, io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<'a, W: Write> Session<'a, W> {
    pub fn new(out: W) -> Self {
        Self {
            interpreter: Interpreter::with_output(out),
            next_id: ExprId(0),
        }
    }

    pub fn interpreter(&self) -> &Interpreter<'a, W> {
        &self.interpreter
    }

    pub fn into_output(self) -> W {
        self.interpreter.into_output()
    }

    /// Runs `source`, returning every diagnostic of the phase that failed.
    pub fn run(&mut self, source: &'a str) -> Result<(), Vec<LoxError>> {
        info!("Running {} byte(s) of source", source.len());

        let (tokens, lex_errors) = Scanner::new(source).scan_all();
        if !lex_errors.is_empty() {
            return Err(lex_errors);
        }

        let mut parser = Parser::with_first_id(tokens, self.next_id);
        let parsed = parser.parse();
        self.next_id = parser.next_id();
        let statements = parsed?;

        let locals = Resolver::new().resolve(&statements)?;
        debug!("Resolved {} local binding(s)", locals.len());

        self.interpreter
            .interpret(&statements, locals)
            .map_err(|e| vec![e])
    }
}
