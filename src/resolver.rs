//! Static resolver pass.
//!
//! One depth‑first walk over the program, run before anything executes:
//! 1. Build lexical scopes (a stack of `HashMap<&str, bool>`, false = declared,
//!    true = defined), mirroring exactly the environments the interpreter
//!    will create.
//! 2. Report static errors: reading a local inside its own initializer, and
//!    `return` outside a function body.
//! 3. Record, for each variable read or assignment that binds to an enclosing
//!    scope, how many scopes separate it from that declaration. References
//!    found in no scope get no entry and are looked up as globals.
//!
//! After an error the pass drops back to the top-level scope and carries on
//! with the next top-level statement, so several errors can be reported at once.
//! No program with a resolution error is ever executed.

use std::collections::HashMap;

use log::{debug, info};

use crate::ast::{Expr, ExprId, ExprKind, FunctionDecl, Stmt};
use crate::error::{LoxError, Result};
use crate::token::Token;

/// Hop counts keyed by expression identity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Locals {
    depths: HashMap<ExprId, usize>,
}

impl Locals {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: ExprId) -> Option<usize> {
        self.depths.get(&id).copied()
    }

    pub fn insert(&mut self, id: ExprId, hops: usize) {
        self.depths.insert(id, hops);
    }

    pub fn len(&self) -> usize {
        self.depths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.depths.is_empty()
    }

    /// Merge another table in; ids are unique across parses, so nothing is
    /// overwritten in practice.
    pub fn extend(&mut self, other: Locals) {
        self.depths.extend(other.depths);
    }
}

/// Are we inside a user function?  Used to validate `return`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum FunctionType {
    None,
    Function,
}

pub struct Resolver<'a> {
    scopes: Vec<HashMap<&'a str, bool>>,
    current_function: FunctionType,
    locals: Locals,
}

impl<'a> Default for Resolver<'a> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> Resolver<'a> {
    pub fn new() -> Self {
        Resolver {
            scopes: Vec::new(),
            current_function: FunctionType::None,
            locals: Locals::new(),
        }
    }

    /// Resolve a whole program, returning its hop-count table or every static
    /// error found.
    pub fn resolve(
        mut self,
        statements: &[Stmt<'a>],
    ) -> std::result::Result<Locals, Vec<LoxError>> {
        info!(
            "Beginning resolve pass over {} statement(s)",
            statements.len()
        );

        let mut errors = Vec::new();

        self.begin_scope();
        for stmt in statements {
            if let Err(e) = self.resolve_stmt(stmt) {
                debug!("Resolve error, recovering at top level: {}", e);
                errors.push(e);
                self.recover();
            }
        }
        self.end_scope();

        info!(
            "Resolve pass finished: {} binding(s), {} error(s)",
            self.locals.len(),
            errors.len()
        );

        if errors.is_empty() {
            Ok(self.locals)
        } else {
            Err(errors)
        }
    }

    /// Drop back to the top-level scope. Names whose declaration was cut
    /// short count as defined so they don't trigger follow-on errors.
    fn recover(&mut self) {
        self.scopes.truncate(1);
        self.current_function = FunctionType::None;

        if let Some(top) = self.scopes.first_mut() {
            top.values_mut().for_each(|defined| *defined = true);
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Statement resolution
    // ─────────────────────────────────────────────────────────────────────────

    fn resolve_stmt(&mut self, stmt: &Stmt<'a>) -> Result<()> {
        match stmt {
            Stmt::Block(statements) => {
                self.begin_scope();
                let result = self.resolve_stmts(statements);
                self.end_scope();
                result?;
            }

            Stmt::Var { name, initializer } => {
                // declare → resolve initializer → define
                self.declare(name);
                if let Some(expr) = initializer {
                    self.resolve_expr(expr)?;
                }
                self.define(name);
            }

            Stmt::Function(decl) => {
                // Defined before the body so the function can call itself.
                self.declare(&decl.name);
                self.define(&decl.name);
                self.resolve_function(decl)?;
            }

            Stmt::Expression(expr) | Stmt::Print(expr) => {
                self.resolve_expr(expr)?;
            }

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                self.resolve_expr(condition)?;
                self.resolve_stmt(then_branch)?;
                if let Some(else_branch) = else_branch {
                    self.resolve_stmt(else_branch)?;
                }
            }

            Stmt::While { condition, body } => {
                self.resolve_expr(condition)?;
                self.resolve_stmt(body)?;
            }

            Stmt::For {
                initializer,
                condition,
                increment,
                body,
            } => {
                // Loop scope holds the initializer; each iteration runs body
                // and increment in a nested scope.
                self.begin_scope();
                let result = self.resolve_for(
                    initializer.as_deref(),
                    condition.as_ref(),
                    increment.as_ref(),
                    body,
                );
                self.end_scope();
                result?;
            }

            Stmt::Return { keyword, value } => {
                if self.current_function == FunctionType::None {
                    return Err(LoxError::resolve(
                        keyword.line,
                        keyword.lexeme,
                        "Can't return from top-level code.",
                    ));
                }
                if let Some(expr) = value {
                    self.resolve_expr(expr)?;
                }
            }
        }

        Ok(())
    }

    fn resolve_stmts(&mut self, statements: &[Stmt<'a>]) -> Result<()> {
        statements.iter().try_for_each(|s| self.resolve_stmt(s))
    }

    fn resolve_for(
        &mut self,
        initializer: Option<&Stmt<'a>>,
        condition: Option<&Expr<'a>>,
        increment: Option<&Expr<'a>>,
        body: &Stmt<'a>,
    ) -> Result<()> {
        if let Some(init) = initializer {
            self.resolve_stmt(init)?;
        }
        if let Some(cond) = condition {
            self.resolve_expr(cond)?;
        }

        self.begin_scope();
        let result = self.resolve_stmt(body).and_then(|()| match increment {
            Some(inc) => self.resolve_expr(inc),
            None => Ok(()),
        });
        self.end_scope();

        result
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Expression resolution
    // ─────────────────────────────────────────────────────────────────────────

    fn resolve_expr(&mut self, expr: &Expr<'a>) -> Result<()> {
        match &expr.kind {
            ExprKind::Literal(_) => {}

            ExprKind::Grouping(inner) => self.resolve_expr(inner)?,

            ExprKind::Unary { right, .. } => self.resolve_expr(right)?,

            ExprKind::Binary { left, right, .. } | ExprKind::Logical { left, right, .. } => {
                self.resolve_expr(left)?;
                self.resolve_expr(right)?;
            }

            ExprKind::Variable(name) => {
                if let Some(scope) = self.scopes.last() {
                    if scope.get(name.lexeme) == Some(&false) {
                        return Err(LoxError::resolve(
                            name.line,
                            name.lexeme,
                            "Can't read local variable in its own initializer.",
                        ));
                    }
                }
                self.resolve_local(expr.id, name);
            }

            ExprKind::Assign { name, value } => {
                self.resolve_expr(value)?;
                self.resolve_local(expr.id, name);
            }

            ExprKind::Call {
                callee, arguments, ..
            } => {
                self.resolve_expr(callee)?;
                for arg in arguments {
                    self.resolve_expr(arg)?;
                }
            }
        }

        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Function helper
    // ─────────────────────────────────────────────────────────────────────────

    /// Parameters and body share one fresh scope, matching the single
    /// environment a call creates.
    fn resolve_function(&mut self, decl: &FunctionDecl<'a>) -> Result<()> {
        let enclosing = self.current_function;
        self.current_function = FunctionType::Function;

        self.begin_scope();
        for param in &decl.params {
            self.declare(param);
            self.define(param);
        }
        let result = self.resolve_stmts(&decl.body);
        self.end_scope();

        self.current_function = enclosing;
        result
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Scope management
    // ─────────────────────────────────────────────────────────────────────────

    #[inline]
    fn begin_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    #[inline]
    fn end_scope(&mut self) {
        self.scopes.pop();
    }

    fn declare(&mut self, name: &Token<'a>) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.lexeme, false);
        }
    }

    fn define(&mut self, name: &Token<'a>) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.lexeme, true);
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Binding‑distance helper
    // ─────────────────────────────────────────────────────────────────────────

    /// Record the distance from the innermost scope to the nearest one that
    /// knows `name`; leave globals unrecorded.
    fn resolve_local(&mut self, id: ExprId, name: &Token<'a>) {
        for (hops, scope) in self.scopes.iter().rev().enumerate() {
            if scope.contains_key(name.lexeme) {
                debug!("Resolved '{}' at {} hop(s)", name.lexeme, hops);
                self.locals.insert(id, hops);
                return;
            }
        }

        debug!("Resolved '{}' as global", name.lexeme);
    }
}
