//! Tree-walking evaluator.
//!
//! Statements run against a "current environment" cursor. Variable reads and
//! assignments use the resolver's hop counts to reach the exact scope the
//! static pass identified; unrecorded reads go straight to the globals.
//!
//! `return` travels as [`Unwind::Return`] through the same `Result` channel as
//! run-time errors and is caught only where a user function was called. Every
//! frame that swaps the cursor restores it before propagating either kind of
//! unwind.

use std::io::{self, Write};
use std::mem;
use std::rc::Rc;

use log::{debug, info};
use thiserror::Error;

use crate::ast::{BinaryOp, Expr, ExprKind, LiteralValue, LogicalOp, Stmt, UnaryOp};
use crate::environment::{EnvRef, Environment};
use crate::error::{LoxError, Operand, Result};
use crate::native;
use crate::resolver::Locals;
use crate::token::Token;
use crate::value::{Callable, Function, Value};

/// Maximum nesting of user-function calls before `StackOverflow`.
pub const MAX_CALL_DEPTH: usize = 1024;

/// Keep at least this much native stack free before recursing further.
const RED_ZONE: usize = 128 * 1024;

/// Stack segment allocated when the red zone is hit.
const STACK_PER_RECURSION: usize = 2 * 1024 * 1024;

/// Why statement execution stopped early.
#[derive(Error, Debug)]
pub enum Unwind<'a> {
    #[error(transparent)]
    Error(#[from] LoxError),

    #[error("return signal with value: {0}")]
    Return(Value<'a>),
}

/// Result of executing a statement or evaluating an expression.
pub type ExecResult<'a, T> = std::result::Result<T, Unwind<'a>>;

pub struct Interpreter<'a, W: Write> {
    globals: EnvRef<'a>,
    environment: EnvRef<'a>,
    locals: Locals,
    out: W,
    call_depth: usize,
}

impl<'a> Interpreter<'a, io::Stdout> {
    /// An interpreter printing to standard output.
    pub fn new() -> Self {
        Self::with_output(io::stdout())
    }
}

impl<'a> Default for Interpreter<'a, io::Stdout> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a, W: Write> Interpreter<'a, W> {
    /// Creates an interpreter writing `print` output to `out`, with the
    /// native functions already bound as globals.
    pub fn with_output(out: W) -> Self {
        info!("Initializing Interpreter");

        let mut globals = Environment::new();
        native::define_natives(&mut globals);
        let globals = globals.into_ref();

        Self {
            environment: Rc::clone(&globals),
            globals,
            locals: Locals::new(),
            out,
            call_depth: 0,
        }
    }

    pub fn globals(&self) -> &EnvRef<'a> {
        &self.globals
    }

    pub fn into_output(self) -> W {
        self.out
    }

    /// Runs a resolved program against the global environment.
    ///
    /// `locals` is merged into the table kept from earlier runs, so functions
    /// declared by a previous program still find their bindings.
    pub fn interpret(&mut self, statements: &[Stmt<'a>], locals: Locals) -> Result<()> {
        info!("Interpreting {} statement(s)", statements.len());
        self.locals.extend(locals);

        for stmt in statements {
            match self.execute(stmt) {
                Ok(()) => {}
                Err(Unwind::Error(e)) => {
                    debug!("Runtime error: {}", e);
                    self.reset();
                    return Err(e);
                }
                Err(Unwind::Return(value)) => {
                    self.reset();
                    return Err(LoxError::Runtime(format!(
                        "return signal escaped to top level with value {}",
                        value
                    )));
                }
            }
        }

        self.out.flush()?;
        info!("Interpretation completed successfully");
        Ok(())
    }

    /// Evaluates a standalone expression in the global scope.
    pub fn evaluate_expression(&mut self, expr: &Expr<'a>) -> Result<Value<'a>> {
        self.evaluate(expr).map_err(|unwind| match unwind {
            Unwind::Error(e) => e,
            Unwind::Return(_) => LoxError::Runtime("return outside of a function".into()),
        })
    }

    fn reset(&mut self) {
        self.environment = Rc::clone(&self.globals);
        self.call_depth = 0;
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Statements
    // ─────────────────────────────────────────────────────────────────────────

    fn execute(&mut self, stmt: &Stmt<'a>) -> ExecResult<'a, ()> {
        match stmt {
            Stmt::Expression(expr) => {
                self.evaluate(expr)?;
            }

            Stmt::Print(expr) => {
                let value = self.evaluate(expr)?;
                writeln!(self.out, "{}", value).map_err(LoxError::from)?;
                debug!("Printed value: {}", value);
            }

            Stmt::Var { name, initializer } => {
                let value = match initializer {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };
                debug!("Defining variable '{}' = {}", name.lexeme, value);
                self.environment.borrow_mut().define(name.lexeme, value);
            }

            Stmt::Block(statements) => {
                let scope = Environment::with_enclosing(Rc::clone(&self.environment)).into_ref();
                self.execute_block(statements, scope)?;
            }

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                if self.evaluate(condition)?.is_truthy() {
                    self.execute(then_branch)?;
                } else if let Some(else_branch) = else_branch {
                    self.execute(else_branch)?;
                }
            }

            Stmt::While { condition, body } => {
                while self.evaluate(condition)?.is_truthy() {
                    self.execute(body)?;
                }
            }

            Stmt::For {
                initializer,
                condition,
                increment,
                body,
            } => {
                let scope = Environment::with_enclosing(Rc::clone(&self.environment)).into_ref();
                let previous = mem::replace(&mut self.environment, scope);
                let result = self.run_for(
                    initializer.as_deref(),
                    condition.as_ref(),
                    increment.as_ref(),
                    body,
                );
                self.environment = previous;
                result?;
            }

            Stmt::Function(decl) => {
                debug!("Defining function '{}'", decl.name.lexeme);
                let function = Function::new(Rc::clone(decl), Rc::clone(&self.environment));
                self.environment.borrow_mut().define(
                    decl.name.lexeme,
                    Value::Callable(Callable::Function(Rc::new(function))),
                );
            }

            Stmt::Return { value, .. } => {
                let value = match value {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };
                debug!("Returning value: {}", value);
                return Err(Unwind::Return(value));
            }
        }

        Ok(())
    }

    /// Runs `statements` with `scope` as the current environment, restoring
    /// the previous one on every exit path.
    pub fn execute_block(
        &mut self,
        statements: &[Stmt<'a>],
        scope: EnvRef<'a>,
    ) -> ExecResult<'a, ()> {
        let previous = mem::replace(&mut self.environment, scope);
        let result = statements.iter().try_for_each(|stmt| self.execute(stmt));
        self.environment = previous;
        result
    }

    /// Body of a `for`, already inside the loop scope.
    fn run_for(
        &mut self,
        initializer: Option<&Stmt<'a>>,
        condition: Option<&Expr<'a>>,
        increment: Option<&Expr<'a>>,
        body: &Stmt<'a>,
    ) -> ExecResult<'a, ()> {
        if let Some(init) = initializer {
            self.execute(init)?;
        }

        loop {
            let proceed = match condition {
                Some(cond) => self.evaluate(cond)?.is_truthy(),
                None => true,
            };
            if !proceed {
                return Ok(());
            }

            // `{ body; increment; }`
            let iteration = Environment::with_enclosing(Rc::clone(&self.environment)).into_ref();
            let previous = mem::replace(&mut self.environment, iteration);
            let result = self.execute(body).and_then(|()| match increment {
                Some(inc) => self.evaluate(inc).map(|_| ()),
                None => Ok(()),
            });
            self.environment = previous;
            result?;
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Expressions
    // ─────────────────────────────────────────────────────────────────────────

    fn evaluate(&mut self, expr: &Expr<'a>) -> ExecResult<'a, Value<'a>> {
        stacker::maybe_grow(RED_ZONE, STACK_PER_RECURSION, || self.evaluate_inner(expr))
    }

    fn evaluate_inner(&mut self, expr: &Expr<'a>) -> ExecResult<'a, Value<'a>> {
        let value = match &expr.kind {
            ExprKind::Literal(lit) => match lit {
                LiteralValue::Number(n) => Value::Number(*n),
                LiteralValue::Str(s) => Value::String(s.clone()),
                LiteralValue::Bool(b) => Value::Bool(*b),
                LiteralValue::Nil => Value::Nil,
            },

            ExprKind::Grouping(inner) => self.evaluate(inner)?,

            ExprKind::Unary {
                op,
                operator,
                right,
            } => {
                let right = self.evaluate(right)?;
                self.unary(*op, operator, right)?
            }

            ExprKind::Binary {
                left,
                op,
                operator,
                right,
            } => {
                let left = self.evaluate(left)?;
                let right = self.evaluate(right)?;
                binary(*op, operator, left, right)?
            }

            ExprKind::Logical {
                left, op, right, ..
            } => {
                let left = self.evaluate(left)?;
                let short_circuit = match op {
                    LogicalOp::Or => left.is_truthy(),
                    LogicalOp::And => !left.is_truthy(),
                };
                if short_circuit {
                    left
                } else {
                    self.evaluate(right)?
                }
            }

            ExprKind::Variable(name) => self.look_up_variable(expr, name)?,

            ExprKind::Assign { name, value } => {
                let value = self.evaluate(value)?;
                match self.locals.get(expr.id) {
                    Some(hops) => {
                        Environment::assign_at(&self.environment, hops, name, value.clone())?
                    }
                    None => self.environment.borrow_mut().assign(name, value.clone())?,
                }
                debug!("Assigned {} to '{}'", value, name.lexeme);
                value
            }

            ExprKind::Call {
                callee,
                paren,
                arguments,
            } => {
                let callee = match self.evaluate(callee)? {
                    Value::Callable(callable) => callable,
                    other => {
                        debug!("Attempted to call a {}", other.type_name());
                        return Err(LoxError::NotCallable { line: paren.line }.into());
                    }
                };

                let mut args = Vec::with_capacity(arguments.len());
                for arg in arguments {
                    args.push(self.evaluate(arg)?);
                }

                self.call(&callee, paren, args)?
            }
        };

        Ok(value)
    }

    fn look_up_variable(&self, expr: &Expr<'a>, name: &Token<'a>) -> Result<Value<'a>> {
        match self.locals.get(expr.id) {
            Some(hops) => Environment::get_at(&self.environment, hops, name),
            None => self.globals.borrow().get(name),
        }
    }

    fn unary(&self, op: UnaryOp, operator: &Token<'a>, right: Value<'a>) -> Result<Value<'a>> {
        match op {
            UnaryOp::Negate => match right {
                Value::Number(n) => Ok(Value::Number(-n)),
                _ => Err(LoxError::type_error(
                    operator.line,
                    operator.lexeme,
                    None,
                    "Operand must be a number.",
                )),
            },
            UnaryOp::Not => Ok(Value::Bool(!right.is_truthy())),
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Calls
    // ─────────────────────────────────────────────────────────────────────────

    fn call(
        &mut self,
        callee: &Callable<'a>,
        paren: &Token<'a>,
        args: Vec<Value<'a>>,
    ) -> Result<Value<'a>> {
        if args.len() != callee.arity() {
            return Err(LoxError::ArityMismatch {
                expected: callee.arity(),
                got: args.len(),
                line: paren.line,
            });
        }

        match callee {
            Callable::Native(native) => {
                debug!("Calling native function '{}'", native.name);
                (native.func)(&args)
            }

            Callable::Function(function) => {
                if self.call_depth >= MAX_CALL_DEPTH {
                    return Err(LoxError::StackOverflow { line: paren.line });
                }

                debug!("Calling user-defined function '{}'", function.name());

                let mut scope = Environment::with_enclosing(Rc::clone(&function.closure));
                for (param, arg) in function.declaration.params.iter().zip(args) {
                    scope.define(param.lexeme, arg);
                }

                self.call_depth += 1;
                let result = self.execute_block(&function.declaration.body, scope.into_ref());
                self.call_depth -= 1;

                match result {
                    Ok(()) => Ok(Value::Nil),
                    Err(Unwind::Return(value)) => {
                        debug!("Function '{}' returned {}", function.name(), value);
                        Ok(value)
                    }
                    Err(Unwind::Error(e)) => Err(e),
                }
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Operators
// ─────────────────────────────────────────────────────────────────────────────

fn binary<'a>(
    op: BinaryOp,
    operator: &Token<'_>,
    left: Value<'a>,
    right: Value<'a>,
) -> Result<Value<'a>> {
    match op {
        BinaryOp::Add => add(operator, left, right),

        BinaryOp::Subtract => numbers(operator, &left, &right).map(|(a, b)| Value::Number(a - b)),

        BinaryOp::Multiply => numbers(operator, &left, &right).map(|(a, b)| Value::Number(a * b)),

        BinaryOp::Divide => {
            let (a, b) = numbers(operator, &left, &right)?;
            if b == 0.0 {
                return Err(LoxError::DivisionByZero {
                    line: operator.line,
                });
            }
            Ok(Value::Number(a / b))
        }

        BinaryOp::Less => numbers(operator, &left, &right).map(|(a, b)| Value::Bool(a < b)),

        BinaryOp::LessEqual => numbers(operator, &left, &right).map(|(a, b)| Value::Bool(a <= b)),

        BinaryOp::Greater => numbers(operator, &left, &right).map(|(a, b)| Value::Bool(a > b)),

        BinaryOp::GreaterEqual => {
            numbers(operator, &left, &right).map(|(a, b)| Value::Bool(a >= b))
        }

        BinaryOp::Equal => Ok(Value::Bool(left == right)),

        BinaryOp::NotEqual => Ok(Value::Bool(left != right)),
    }
}

/// Both operands as numbers, or a type error naming the offending side.
fn numbers(operator: &Token<'_>, left: &Value<'_>, right: &Value<'_>) -> Result<(f64, f64)> {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => Ok((*a, *b)),
        (Value::Number(_), _) => Err(LoxError::type_error(
            operator.line,
            operator.lexeme,
            Some(Operand::Right),
            "Right operand must be a number.",
        )),
        (_, Value::Number(_)) => Err(LoxError::type_error(
            operator.line,
            operator.lexeme,
            Some(Operand::Left),
            "Left operand must be a number.",
        )),
        _ => Err(LoxError::type_error(
            operator.line,
            operator.lexeme,
            None,
            "Operands must be numbers.",
        )),
    }
}

/// `+` is numeric addition or string concatenation, never a mix.
fn add<'a>(operator: &Token<'_>, left: Value<'a>, right: Value<'a>) -> Result<Value<'a>> {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a + b)),
        (Value::String(a), Value::String(b)) => Ok(Value::String(a + &b)),
        (Value::Number(_), _) => Err(LoxError::type_error(
            operator.line,
            operator.lexeme,
            Some(Operand::Right),
            "Right operand must be a number.",
        )),
        (Value::String(_), _) => Err(LoxError::type_error(
            operator.line,
            operator.lexeme,
            Some(Operand::Right),
            "Right operand must be a string.",
        )),
        (_, Value::Number(_) | Value::String(_)) => Err(LoxError::type_error(
            operator.line,
            operator.lexeme,
            Some(Operand::Left),
            "Left operand must be a number or a string.",
        )),
        _ => Err(LoxError::type_error(
            operator.line,
            operator.lexeme,
            None,
            "Operands must be two numbers or two strings.",
        )),
    }
}
