//! Parent-linked binding store.
//!
//! Scopes are shared `Rc<RefCell<_>>` nodes: a closure keeps its declaring
//! scope alive, and writes through any handle are seen by every other.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use log::debug;

use crate::error::{LoxError, Result};
use crate::token::Token;
use crate::value::Value;

/// Shared handle to a scope.
pub type EnvRef<'a> = Rc<RefCell<Environment<'a>>>;

#[derive(Debug, Default)]
pub struct Environment<'a> {
    values: HashMap<String, Value<'a>>,
    enclosing: Option<EnvRef<'a>>,
}

impl<'a> Environment<'a> {
    pub fn new() -> Self {
        Environment {
            values: HashMap::new(),
            enclosing: None,
        }
    }

    pub fn with_enclosing(enclosing: EnvRef<'a>) -> Self {
        Environment {
            values: HashMap::new(),
            enclosing: Some(enclosing),
        }
    }

    pub fn into_ref(self) -> EnvRef<'a> {
        Rc::new(RefCell::new(self))
    }

    /// Create or overwrite a binding in this scope only.
    pub fn define(&mut self, name: &str, value: Value<'a>) {
        self.values.insert(name.to_string(), value);
    }

    pub fn get(&self, name: &Token<'_>) -> Result<Value<'a>> {
        if let Some(value) = self.values.get(name.lexeme) {
            Ok(value.clone())
        } else if let Some(enclosing) = &self.enclosing {
            enclosing.borrow().get(name)
        } else {
            Err(unresolved(name))
        }
    }

    /// Overwrite the nearest existing binding of `name`; never creates one.
    pub fn assign(&mut self, name: &Token<'_>, value: Value<'a>) -> Result<()> {
        if let Some(slot) = self.values.get_mut(name.lexeme) {
            *slot = value;
            Ok(())
        } else if let Some(enclosing) = &self.enclosing {
            enclosing.borrow_mut().assign(name, value)
        } else {
            Err(unresolved(name))
        }
    }

    /// Walk exactly `hops` parent links from `env`.
    pub fn ancestor(env: &EnvRef<'a>, hops: usize) -> Result<EnvRef<'a>> {
        let mut current = Rc::clone(env);

        for _ in 0..hops {
            let parent = current.borrow().enclosing.clone().ok_or_else(|| {
                LoxError::Runtime(format!("scope chain shorter than resolved depth {}", hops))
            })?;
            current = parent;
        }

        Ok(current)
    }

    /// Read `name` from the scope exactly `hops` links up, without searching
    /// any further.
    pub fn get_at(env: &EnvRef<'a>, hops: usize, name: &Token<'_>) -> Result<Value<'a>> {
        debug!("get_at({}, '{}')", hops, name.lexeme);

        let scope = Self::ancestor(env, hops)?;
        let value = scope.borrow().values.get(name.lexeme).cloned();
        value.ok_or_else(|| unresolved(name))
    }

    pub fn assign_at(
        env: &EnvRef<'a>,
        hops: usize,
        name: &Token<'_>,
        value: Value<'a>,
    ) -> Result<()> {
        debug!("assign_at({}, '{}')", hops, name.lexeme);

        let scope = Self::ancestor(env, hops)?;
        let mut scope = scope.borrow_mut();

        match scope.values.get_mut(name.lexeme) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(unresolved(name)),
        }
    }
}

fn unresolved(name: &Token<'_>) -> LoxError {
    LoxError::UnresolvedName {
        name: name.lexeme.to_string(),
        line: name.line,
    }
}
