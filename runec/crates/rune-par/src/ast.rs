//! AST node definitions.
//!
//! The parser produces a single root [`Expr`] of kind [`ExprKind::Block`]
//! holding the program's statements. Everything in Rune is an expression;
//! statements are just expressions juxtaposed inside a block.

use std::fmt;
use std::rc::Rc;

use rune_util::Span;

/// An expression node. The span locates the node's first token.
#[derive(Clone, Debug, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

impl Expr {
    pub fn new(kind: ExprKind, span: Span) -> Self {
        Self { kind, span }
    }

    /// True if this node is a valid assignment target: a variable, an
    /// element subscript, or a field access.
    pub fn is_assign_target(&self) -> bool {
        matches!(
            self.kind,
            ExprKind::Var(_) | ExprKind::Index { .. } | ExprKind::Field { .. }
        )
    }
}

/// The shapes an expression can take.
#[derive(Clone, Debug, PartialEq)]
pub enum ExprKind {
    /// Numeric literal, kept as text; whether it is an integer or a float
    /// is decided at evaluation by the presence of a dot.
    Num(String),
    /// String literal (already unescaped by the lexer).
    Str(String),
    /// Boolean literal.
    Bool(bool),
    /// Identifier reference.
    Var(String),
    /// Subscript, `target[index]`.
    Index { target: Box<Expr>, index: Box<Expr> },
    /// Field access, `target.name`.
    Field { target: Box<Expr>, name: String },
    /// Assignment. The target is a `Var`, `Index`, or `Field` node.
    Assign { target: Box<Expr>, value: Box<Expr> },
    /// Binary operation.
    Binary {
        op: BinOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    /// Unary operation.
    Unary { op: UnOp, operand: Box<Expr> },
    /// Function literal. The body is shared with every closure value
    /// created from this node.
    Fun { params: Vec<String>, body: Rc<Expr> },
    /// Call, `callee(args)`.
    Call { callee: Box<Expr>, args: Vec<Expr> },
    /// Conditional. `alts` holds the ordered alternatives: an `If` node
    /// per `elif`, then optionally a final `Block` for `else`.
    If {
        cond: Box<Expr>,
        then_branch: Box<Expr>,
        alts: Vec<Expr>,
    },
    /// Loop.
    While { cond: Box<Expr>, body: Box<Expr> },
    /// Statement sequence.
    Block(Vec<Expr>),
    /// Array literal.
    Array(Vec<Expr>),
    /// Table literal, ordered key/value pairs.
    Table(Vec<(Expr, Expr)>),
    /// Return from the enclosing function; no operand means `false`.
    Return(Option<Box<Expr>>),
    /// Exit the enclosing loop.
    Break,
    /// Skip to the next iteration of the enclosing loop.
    Continue,
    /// Run another source file against the current environment. The
    /// operand evaluates to the path stem; `.rune` is appended.
    Import(Box<Expr>),
}

/// Binary operators, lowest precedence first.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinOp {
    Or,
    And,
    Lt,
    Gt,
    Le,
    Ge,
    Eq,
    Ne,
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

impl BinOp {
    /// Map an operator token to its `BinOp`, if it is one.
    pub fn from_token(op: &str) -> Option<Self> {
        Some(match op {
            "||" => BinOp::Or,
            "&&" => BinOp::And,
            "<" => BinOp::Lt,
            ">" => BinOp::Gt,
            "<=" => BinOp::Le,
            ">=" => BinOp::Ge,
            "==" => BinOp::Eq,
            "!=" => BinOp::Ne,
            "+" => BinOp::Add,
            "-" => BinOp::Sub,
            "*" => BinOp::Mul,
            "/" => BinOp::Div,
            "%" => BinOp::Rem,
            _ => return None,
        })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BinOp::Or => "||",
            BinOp::And => "&&",
            BinOp::Lt => "<",
            BinOp::Gt => ">",
            BinOp::Le => "<=",
            BinOp::Ge => ">=",
            BinOp::Eq => "==",
            BinOp::Ne => "!=",
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Rem => "%",
        }
    }
}

impl fmt::Display for BinOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unary operators.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnOp {
    Not,
}

impl fmt::Display for UnOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnOp::Not => f.write_str("not"),
        }
    }
}
