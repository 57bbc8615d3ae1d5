//! Runtime value domain and the callable contract.

use std::fmt;
use std::rc::Rc;

use crate::ast::FunctionDecl;
use crate::environment::EnvRef;
use crate::error::Result;

#[derive(Debug, Clone)]
pub enum Value<'a> {
    Nil,
    Bool(bool),
    Number(f64),
    String(String),
    Callable(Callable<'a>),
}

impl<'a> Value<'a> {
    /// `nil` and `false` are falsy; everything else, `0` and `""` included,
    /// is truthy.
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Value::Nil | Value::Bool(false))
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Nil => "nil",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Callable(_) => "function",
        }
    }
}

/// Equality never fails: values of different types are unequal, `nil` equals
/// only `nil`, and callables compare by identity.
impl PartialEq for Value<'_> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Callable(a), Value::Callable(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for Value<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "nil"),

            Value::Bool(b) => write!(f, "{}", b),

            // f64's Display is already the shortest round-trip form and
            // drops a trailing ".0": 3.0 → "3", 2.5 → "2.5".
            Value::Number(n) => write!(f, "{}", n),

            Value::String(s) => write!(f, "{}", s),

            Value::Callable(c) => write!(f, "{}", c),
        }
    }
}

/// Something a call expression can invoke.
#[derive(Debug, Clone)]
pub enum Callable<'a> {
    Native(NativeFunction<'a>),
    Function(Rc<Function<'a>>),
}

impl<'a> Callable<'a> {
    pub fn arity(&self) -> usize {
        match self {
            Callable::Native(native) => native.arity,
            Callable::Function(function) => function.arity(),
        }
    }
}

impl PartialEq for Callable<'_> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Callable::Native(a), Callable::Native(b)) => a.name == b.name,
            (Callable::Function(a), Callable::Function(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Display for Callable<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Callable::Native(_) => write!(f, "<native fn>"),
            Callable::Function(function) => write!(f, "<fn {}>", function.name()),
        }
    }
}

/// A host-implemented function bound in the global scope.
#[derive(Clone)]
pub struct NativeFunction<'a> {
    pub name: &'static str,
    pub arity: usize,
    pub func: fn(&[Value<'a>]) -> Result<Value<'a>>,
}

impl fmt::Debug for NativeFunction<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeFunction")
            .field("name", &self.name)
            .field("arity", &self.arity)
            .finish_non_exhaustive()
    }
}

/// A user-defined function: its declaration plus the environment that was
/// current where it was declared.
pub struct Function<'a> {
    pub declaration: Rc<FunctionDecl<'a>>,
    pub closure: EnvRef<'a>,
}

impl<'a> Function<'a> {
    pub fn new(declaration: Rc<FunctionDecl<'a>>, closure: EnvRef<'a>) -> Self {
        Self {
            declaration,
            closure,
        }
    }

    pub fn name(&self) -> &str {
        self.declaration.name.lexeme
    }

    pub fn arity(&self) -> usize {
        self.declaration.params.len()
    }
}

// The closure environment usually contains this very function, so printing it
// would recurse forever.
impl fmt::Debug for Function<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Function")
            .field("name", &self.name())
            .field("arity", &self.arity())
            .finish_non_exhaustive()
    }
}
