//! The tagged value model.
//!
//! Rune is dynamically typed; every runtime value is one of the variants
//! of [`Value`], and every interpretation site pattern-matches on it.
//! Arrays and tables are reference values: cloning a `Value` clones the
//! handle, so mutation through one binding is visible through every alias,
//! matching how scripts pass them around.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use rune_par::Expr;

use crate::env::Scope;

/// The host-callable signature: a variadic ordered argument list in, a
/// value or an error message out. The evaluator turns the error into a
/// positioned diagnostic at the call site.
pub type NativeFn = dyn Fn(&[Value]) -> Result<Value, String>;

/// A function defined in script. Invoking it extends the environment
/// captured at the definition site, so the body observes later mutations
/// of outer variables (lexical closure).
pub struct ScriptFn {
    /// Declared parameter names, in order. Missing trailing arguments
    /// bind to `false`; extra arguments are dropped.
    pub params: Vec<String>,
    /// The body block, shared with the AST.
    pub body: Rc<Expr>,
    /// The scope the function literal was evaluated in.
    pub env: Rc<Scope>,
}

/// A runtime value.
#[derive(Clone)]
pub enum Value {
    Int(i64),
    Float(f64),
    Bool(bool),
    Str(String),
    Array(Rc<RefCell<Vec<Value>>>),
    Table(Rc<RefCell<IndexMap<String, Value>>>),
    Fun(Rc<ScriptFn>),
    Native(Rc<NativeFn>),
}

impl Value {
    /// Wrap a vector as an array value.
    pub fn array(items: Vec<Value>) -> Self {
        Value::Array(Rc::new(RefCell::new(items)))
    }

    /// Wrap a map as a table value.
    pub fn table(map: IndexMap<String, Value>) -> Self {
        Value::Table(Rc::new(RefCell::new(map)))
    }

    /// The script-visible type name.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Bool(_) => "bool",
            Value::Str(_) => "string",
            Value::Array(_) => "array",
            Value::Table(_) => "table",
            Value::Fun(_) | Value::Native(_) => "fun",
        }
    }

    /// True for values that can appear to the left of a call.
    pub fn is_callable(&self) -> bool {
        matches!(self, Value::Fun(_) | Value::Native(_))
    }

    /// Boolean coercion used by `not`, `&&`, and `||`: a bool is itself,
    /// numbers are true when non-zero, a string is read as a boolean
    /// literal and is false when it is not one, everything else is false.
    pub fn coerce_bool(&self) -> bool {
        match self {
            Value::Bool(b) => *b,
            Value::Int(i) => *i != 0,
            Value::Float(f) => *f != 0.0,
            Value::Str(s) => parse_bool_literal(s).unwrap_or(false),
            _ => false,
        }
    }
}

/// The boolean literal forms accepted when coercing a string.
fn parse_bool_literal(s: &str) -> Option<bool> {
    match s {
        "1" | "t" | "T" | "true" | "TRUE" | "True" => Some(true),
        "0" | "f" | "F" | "false" | "FALSE" | "False" => Some(false),
        _ => None,
    }
}

impl PartialEq for Value {
    /// Equality is type equality first, then value equality. There is no
    /// numeric cross-type coercion: `1 == 1.0` is false. Reference values
    /// and callables compare by identity.
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => Rc::ptr_eq(a, b),
            (Value::Table(a), Value::Table(b)) => Rc::ptr_eq(a, b),
            (Value::Fun(a), Value::Fun(b)) => Rc::ptr_eq(a, b),
            (Value::Native(a), Value::Native(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    /// The host's default conversion: used by `print`, by table-key
    /// stringification, and by string `append`. Arrays and tables render
    /// their elements recursively.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Str(s) => f.write_str(s),
            Value::Array(items) => {
                f.write_str("[")?;
                for (i, item) in items.borrow().iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            Value::Table(map) => {
                f.write_str("{")?;
                for (i, (key, value)) in map.borrow().iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{key}: {value}")?;
                }
                f.write_str("}")
            }
            Value::Fun(_) => f.write_str("<fun>"),
            Value::Native(_) => f.write_str("<builtin>"),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Str(s) => write!(f, "{s:?}"),
            other => write!(f, "{other}"),
        }
    }
}
