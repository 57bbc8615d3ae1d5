//! Abstract syntax tree consumed by the resolver and the interpreter.
//!
//! Every [`Expr`] carries an [`ExprId`] handed out by the parser in creation
//! order. The resolver keys its hop-count table by that id, so two textually
//! identical references at different source positions never collide.

use std::fmt;
use std::rc::Rc;

use serde::Serialize;

use crate::token::{Token, TokenType};

/// Stable identity of an expression node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ExprId(pub u32);

impl ExprId {
    pub fn next(self) -> ExprId {
        ExprId(self.0 + 1)
    }
}

/// A literal constant copied out of its token at parse time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum LiteralValue {
    Number(f64),
    Str(String),
    Bool(bool),
    Nil,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum UnaryOp {
    Negate,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    Equal,
    NotEqual,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LogicalOp {
    And,
    Or,
}

impl UnaryOp {
    pub fn from_token(kind: &TokenType) -> Option<Self> {
        match kind {
            TokenType::MINUS => Some(UnaryOp::Negate),
            TokenType::BANG => Some(UnaryOp::Not),
            _ => None,
        }
    }
}

impl BinaryOp {
    pub fn from_token(kind: &TokenType) -> Option<Self> {
        let op = match kind {
            TokenType::PLUS => BinaryOp::Add,
            TokenType::MINUS => BinaryOp::Subtract,
            TokenType::STAR => BinaryOp::Multiply,
            TokenType::SLASH => BinaryOp::Divide,
            TokenType::LESS => BinaryOp::Less,
            TokenType::LESS_EQUAL => BinaryOp::LessEqual,
            TokenType::GREATER => BinaryOp::Greater,
            TokenType::GREATER_EQUAL => BinaryOp::GreaterEqual,
            TokenType::EQUAL_EQUAL => BinaryOp::Equal,
            TokenType::BANG_EQUAL => BinaryOp::NotEqual,
            _ => return None,
        };
        Some(op)
    }
}

impl fmt::Display for UnaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            UnaryOp::Negate => "-",
            UnaryOp::Not => "!",
        })
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BinaryOp::Add => "+",
            BinaryOp::Subtract => "-",
            BinaryOp::Multiply => "*",
            BinaryOp::Divide => "/",
            BinaryOp::Less => "<",
            BinaryOp::LessEqual => "<=",
            BinaryOp::Greater => ">",
            BinaryOp::GreaterEqual => ">=",
            BinaryOp::Equal => "==",
            BinaryOp::NotEqual => "!=",
        })
    }
}

impl fmt::Display for LogicalOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LogicalOp::And => "and",
            LogicalOp::Or => "or",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Expr<'a> {
    pub id: ExprId,
    pub kind: ExprKind<'a>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ExprKind<'a> {
    Literal(LiteralValue),

    Grouping(Box<Expr<'a>>),

    /// `-x` or `!x`; `operator` is kept for error locations.
    Unary {
        op: UnaryOp,
        operator: Token<'a>,
        right: Box<Expr<'a>>,
    },

    Binary {
        left: Box<Expr<'a>>,
        op: BinaryOp,
        operator: Token<'a>,
        right: Box<Expr<'a>>,
    },

    /// Short‑circuiting `and` / `or`.
    Logical {
        left: Box<Expr<'a>>,
        op: LogicalOp,
        operator: Token<'a>,
        right: Box<Expr<'a>>,
    },

    Variable(Token<'a>),

    Assign {
        name: Token<'a>,
        value: Box<Expr<'a>>,
    },

    Call {
        callee: Box<Expr<'a>>,
        /// The closing `)`, retained for error reporting.
        paren: Token<'a>,
        arguments: Vec<Expr<'a>>,
    },
}

impl<'a> Expr<'a> {
    pub fn new(id: ExprId, kind: ExprKind<'a>) -> Self {
        Self { id, kind }
    }
}

/// A named function: shared between the tree and every closure built from it.
#[derive(Debug, PartialEq, Serialize)]
pub struct FunctionDecl<'a> {
    pub name: Token<'a>,
    pub params: Vec<Token<'a>>,
    pub body: Vec<Stmt<'a>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Stmt<'a> {
    Expression(Expr<'a>),

    Print(Expr<'a>),

    Var {
        name: Token<'a>,
        initializer: Option<Expr<'a>>,
    },

    Block(Vec<Stmt<'a>>),

    If {
        condition: Expr<'a>,
        then_branch: Box<Stmt<'a>>,
        else_branch: Option<Box<Stmt<'a>>>,
    },

    While {
        condition: Expr<'a>,
        body: Box<Stmt<'a>>,
    },

    /// Kept as its own node. The initializer lives in a loop scope, and each
    /// iteration runs the body and increment in a fresh child of it.
    For {
        initializer: Option<Box<Stmt<'a>>>,
        condition: Option<Expr<'a>>,
        increment: Option<Expr<'a>>,
        body: Box<Stmt<'a>>,
    },

    Function(Rc<FunctionDecl<'a>>),

    Return {
        keyword: Token<'a>,
        value: Option<Expr<'a>>,
    },
}
