//! The tree-walking evaluator.
//!
//! Evaluation of an expression produces a [`Flow`]: either a plain value
//! or one of the control-flow signals (`return`, `break`, `continue`).
//! Signals travel up through enclosing expressions until a loop or a
//! function boundary unwraps them; a signal that escapes past the last
//! legal boundary is a positioned diagnostic, which is how the "only
//! inside a loop/function" rule is enforced dynamically.

use std::cell::RefCell;
use std::rc::Rc;

use rustc_hash::FxHashSet;
use tracing::debug;

use rune_lex::TokenStream;
use rune_par::{BinOp, Expr, ExprKind, Parser, UnOp};
use rune_util::{Diagnostic, RuneResult, SourceMap, Span};

use crate::env::Scope;
use crate::value::{ScriptFn, Value};

/// The result of evaluating one expression.
pub enum Flow {
    /// A normal value.
    Value(Value),
    /// `return` with its operand and source position.
    Return(Value, Span),
    /// `break` with its source position.
    Break(Span),
    /// `continue` with its source position.
    Continue(Span),
}

/// Unwraps a normal value out of a [`Flow`], propagating control-flow
/// signals to the caller.
macro_rules! try_value {
    ($flow:expr) => {
        match $flow {
            Flow::Value(value) => value,
            signal => return Ok(signal),
        }
    };
}

/// The evaluator. Owns the set of already-imported paths and shares the
/// source map so imported files can be registered for diagnostics.
pub struct Evaluator {
    sources: Rc<RefCell<SourceMap>>,
    imported: FxHashSet<String>,
}

impl Evaluator {
    pub fn new(sources: Rc<RefCell<SourceMap>>) -> Self {
        Self {
            sources,
            imported: FxHashSet::default(),
        }
    }

    /// Evaluate a program root block. Any control-flow signal escaping the
    /// top level is an error.
    pub fn eval_program(&mut self, program: &Expr, env: &Rc<Scope>) -> RuneResult<Value> {
        let flow = self.eval(program, env)?;
        unwrap_top_level(flow)
    }

    /// Invoke a callable on behalf of the host, outside any script
    /// position.
    pub fn call_callable(&mut self, callee: &Value, args: &[Value]) -> RuneResult<Value> {
        self.invoke(callee, args, Span::DUMMY)
    }

    fn eval(&mut self, expr: &Expr, env: &Rc<Scope>) -> RuneResult<Flow> {
        match &expr.kind {
            ExprKind::Num(text) => Ok(Flow::Value(parse_number(text, expr.span)?)),
            ExprKind::Str(s) => Ok(Flow::Value(Value::Str(s.clone()))),
            ExprKind::Bool(b) => Ok(Flow::Value(Value::Bool(*b))),

            ExprKind::Var(name) => {
                let value = env.get(name).ok_or_else(|| {
                    Diagnostic::new(format!("Undefined variable '{name}'"), expr.span)
                })?;
                Ok(Flow::Value(value))
            }

            ExprKind::Index { target, index } => {
                let container = try_value!(self.eval(target, env)?);
                let index = try_value!(self.eval(index, env)?);
                Ok(Flow::Value(index_value(&container, &index, expr.span)?))
            }

            ExprKind::Field { target, name } => {
                let container = try_value!(self.eval(target, env)?);
                Ok(Flow::Value(field_value(&container, name, expr.span)?))
            }

            ExprKind::Assign { target, value } => self.eval_assign(target, value, env),

            ExprKind::Binary { op, left, right } => {
                let lhs = try_value!(self.eval(left, env)?);
                let rhs = try_value!(self.eval(right, env)?);
                Ok(Flow::Value(apply_binary(*op, &lhs, &rhs, expr.span)?))
            }

            ExprKind::Unary { op, operand } => {
                let value = try_value!(self.eval(operand, env)?);
                match op {
                    UnOp::Not => Ok(Flow::Value(Value::Bool(!value.coerce_bool()))),
                }
            }

            ExprKind::Fun { params, body } => Ok(Flow::Value(Value::Fun(Rc::new(ScriptFn {
                params: params.clone(),
                body: Rc::clone(body),
                env: Rc::clone(env),
            })))),

            ExprKind::Call { callee, args } => self.eval_call(callee, args, env, expr.span),

            ExprKind::If {
                cond,
                then_branch,
                alts,
            } => {
                let cond = try_value!(self.eval(cond, env)?);
                // Only the literal boolean false selects the alternatives.
                if cond != Value::Bool(false) {
                    return self.eval(then_branch, env);
                }
                for alt in alts {
                    match &alt.kind {
                        ExprKind::If {
                            cond, then_branch, ..
                        } => {
                            let cond = try_value!(self.eval(cond, env)?);
                            if cond != Value::Bool(false) {
                                return self.eval(then_branch, env);
                            }
                        }
                        _ => return self.eval(alt, env),
                    }
                }
                Ok(Flow::Value(Value::Bool(false)))
            }

            ExprKind::While { cond, body } => {
                loop {
                    let test = try_value!(self.eval(cond, env)?);
                    let Value::Bool(go) = &test else {
                        return Err(Diagnostic::new(
                            format!("While condition must be a bool, got {}", test.type_name()),
                            cond.span,
                        ));
                    };
                    if !*go {
                        break;
                    }
                    match self.eval(body, env)? {
                        Flow::Value(_) => {}
                        Flow::Break(_) => break,
                        Flow::Continue(_) => continue,
                        ret @ Flow::Return(..) => return Ok(ret),
                    }
                }
                Ok(Flow::Value(Value::Bool(false)))
            }

            ExprKind::Array(elements) => {
                let mut items = Vec::with_capacity(elements.len());
                for element in elements {
                    items.push(try_value!(self.eval(element, env)?));
                }
                Ok(Flow::Value(Value::array(items)))
            }

            ExprKind::Table(pairs) => {
                let mut map = indexmap::IndexMap::new();
                for (key, value) in pairs {
                    let key = try_value!(self.eval(key, env)?);
                    let value = try_value!(self.eval(value, env)?);
                    map.insert(key.to_string(), value);
                }
                Ok(Flow::Value(Value::table(map)))
            }

            ExprKind::Block(stmts) => {
                let mut last = Value::Bool(false);
                for stmt in stmts {
                    match self.eval(stmt, env)? {
                        Flow::Value(value) => last = value,
                        signal => return Ok(signal),
                    }
                }
                Ok(Flow::Value(last))
            }

            ExprKind::Return(operand) => {
                let value = match operand {
                    Some(operand) => try_value!(self.eval(operand, env)?),
                    None => Value::Bool(false),
                };
                Ok(Flow::Return(value, expr.span))
            }

            ExprKind::Break => Ok(Flow::Break(expr.span)),
            ExprKind::Continue => Ok(Flow::Continue(expr.span)),

            ExprKind::Import(path) => self.eval_import(path, env, expr.span),
        }
    }

    /// The four assignment shapes: plain variable, element subscript,
    /// table field, and nothing else (the parser already guarantees the
    /// target shape, so the last arm is unreachable in practice).
    fn eval_assign(&mut self, target: &Expr, value: &Expr, env: &Rc<Scope>) -> RuneResult<Flow> {
        match &target.kind {
            ExprKind::Var(name) => {
                let value = try_value!(self.eval(value, env)?);
                env.assign(name, value.clone());
                Ok(Flow::Value(value))
            }

            ExprKind::Index {
                target: container,
                index,
            } => {
                let container = try_value!(self.eval(container, env)?);
                let index = try_value!(self.eval(index, env)?);
                let value = try_value!(self.eval(value, env)?);
                match &container {
                    Value::Array(items) => {
                        let Value::Int(i) = index else {
                            return Err(Diagnostic::new(
                                "Array index must be an integer",
                                target.span,
                            ));
                        };
                        let mut items = items.borrow_mut();
                        if i < 0 || i as usize >= items.len() {
                            return Err(Diagnostic::new(
                                "Array index out of bounds",
                                target.span,
                            ));
                        }
                        items[i as usize] = value.clone();
                    }
                    Value::Table(map) => {
                        let Value::Str(key) = index else {
                            return Err(Diagnostic::new(
                                "Table key must be a string",
                                target.span,
                            ));
                        };
                        // Assignment through a key auto-creates it.
                        map.borrow_mut().insert(key, value.clone());
                    }
                    other => {
                        return Err(Diagnostic::new(
                            format!("Cannot index into type {}", other.type_name()),
                            target.span,
                        ));
                    }
                }
                Ok(Flow::Value(value))
            }

            ExprKind::Field { target: obj, name } => {
                let obj = try_value!(self.eval(obj, env)?);
                let value = try_value!(self.eval(value, env)?);
                match &obj {
                    Value::Table(map) => {
                        map.borrow_mut().insert(name.clone(), value.clone());
                        Ok(Flow::Value(value))
                    }
                    _ => Err(Diagnostic::new(
                        format!("Cannot assign to field '{name}' on non-table object"),
                        target.span,
                    )),
                }
            }

            _ => Err(Diagnostic::new("invalid assignment target", target.span)),
        }
    }

    /// Call evaluation, including the implicit `self` rule: when the
    /// callee is a field or index access whose receiver evaluates to a
    /// table, the table is prepended as the first argument. The receiver
    /// is evaluated exactly once.
    fn eval_call(
        &mut self,
        callee: &Expr,
        args: &[Expr],
        env: &Rc<Scope>,
        span: Span,
    ) -> RuneResult<Flow> {
        let (func, mut argv) = match &callee.kind {
            ExprKind::Field { target, name } => {
                let receiver = try_value!(self.eval(target, env)?);
                let func = field_value(&receiver, name, callee.span)?;
                (func, vec![receiver])
            }
            ExprKind::Index { target, index } => {
                let receiver = try_value!(self.eval(target, env)?);
                let index = try_value!(self.eval(index, env)?);
                let func = index_value(&receiver, &index, callee.span)?;
                if matches!(receiver, Value::Table(_)) {
                    (func, vec![receiver])
                } else {
                    (func, Vec::new())
                }
            }
            _ => (try_value!(self.eval(callee, env)?), Vec::new()),
        };

        if !func.is_callable() {
            return Err(Diagnostic::new(
                format!("'{}' is not a function", callee_label(callee)),
                span,
            ));
        }
        for arg in args {
            argv.push(try_value!(self.eval(arg, env)?));
        }
        Ok(Flow::Value(self.invoke(&func, &argv, span)?))
    }

    fn invoke(&mut self, func: &Value, args: &[Value], span: Span) -> RuneResult<Value> {
        match func {
            Value::Fun(fun) => self.call_script(fun, args, span),
            Value::Native(fun) => fun(args).map_err(|err| {
                Diagnostic::new(format!("Error in function call: '{err}'"), span)
            }),
            other => Err(Diagnostic::new(
                format!("'{}' is not a function", other.type_name()),
                span,
            )),
        }
    }

    /// Script function invocation: extend the captured scope, bind the
    /// parameters positionally, run the body. `return` unwraps here; a
    /// loop signal reaching a function boundary is an error.
    fn call_script(&mut self, fun: &ScriptFn, args: &[Value], _span: Span) -> RuneResult<Value> {
        let scope = fun.env.extend();
        for (i, param) in fun.params.iter().enumerate() {
            let value = args.get(i).cloned().unwrap_or(Value::Bool(false));
            scope.define(param.clone(), value);
        }
        match self.eval(&fun.body, &scope)? {
            Flow::Value(value) => Ok(value),
            Flow::Return(value, _) => Ok(value),
            Flow::Break(span) => Err(Diagnostic::new("'break' outside of a loop", span)),
            Flow::Continue(span) => Err(Diagnostic::new("'continue' outside of a loop", span)),
        }
    }

    /// `import "path"`: append `.rune`, reject duplicates, then run the
    /// file's program against the current environment. The path joins the
    /// imported set before the read, so a failed import also blocks a
    /// retry.
    fn eval_import(&mut self, path: &Expr, env: &Rc<Scope>, span: Span) -> RuneResult<Flow> {
        let stem = try_value!(self.eval(path, env)?);
        let Value::Str(stem) = &stem else {
            return Err(Diagnostic::new(
                format!("Import path must be a string, got {}", stem.type_name()),
                path.span,
            ));
        };
        let file_path = format!("{stem}.rune");

        if !self.imported.insert(file_path.clone()) {
            return Err(Diagnostic::new(
                format!("Duplicate import detected: '{file_path}' was already imported"),
                span,
            ));
        }

        let source = std::fs::read_to_string(&file_path).map_err(|err| {
            Diagnostic::new(
                format!("Failed to import file '{file_path}': {err}"),
                span,
            )
        })?;
        debug!(path = %file_path, "importing file");

        let file_id = self
            .sources
            .borrow_mut()
            .add_file(file_path.as_str(), source.as_str());
        let program = Parser::new(TokenStream::new(&source, file_id)).parse_program()?;
        let flow = self.eval(&program, env)?;
        unwrap_top_level(flow)?;
        Ok(Flow::Value(Value::Bool(false)))
    }
}

fn unwrap_top_level(flow: Flow) -> RuneResult<Value> {
    match flow {
        Flow::Value(value) => Ok(value),
        Flow::Return(_, span) => Err(Diagnostic::new("'return' outside of a function", span)),
        Flow::Break(span) => Err(Diagnostic::new("'break' outside of a loop", span)),
        Flow::Continue(span) => Err(Diagnostic::new("'continue' outside of a loop", span)),
    }
}

/// Turn numeric literal text into a value: a dot means float, otherwise
/// integer. Malformed literals like `1.2.3` fail here, at evaluation.
pub(crate) fn parse_number(text: &str, span: Span) -> RuneResult<Value> {
    let parsed = if text.contains('.') {
        text.parse::<f64>().ok().map(Value::Float)
    } else {
        text.parse::<i64>().ok().map(Value::Int)
    };
    parsed.ok_or_else(|| Diagnostic::new(format!("Expected number but got '{text}'"), span))
}

/// Numeric view of a value for arithmetic and comparison. Strings are
/// read as number literals.
enum Num {
    Int(i64),
    Float(f64),
}

impl Num {
    fn as_f64(&self) -> f64 {
        match self {
            Num::Int(i) => *i as f64,
            Num::Float(f) => *f,
        }
    }

    fn trunc(&self) -> i64 {
        match self {
            Num::Int(i) => *i,
            Num::Float(f) => *f as i64,
        }
    }
}

fn as_number(value: &Value, span: Span) -> RuneResult<Num> {
    match value {
        Value::Int(i) => Ok(Num::Int(*i)),
        Value::Float(f) => Ok(Num::Float(*f)),
        Value::Str(s) => match parse_number(s, span)? {
            Value::Int(i) => Ok(Num::Int(i)),
            Value::Float(f) => Ok(Num::Float(f)),
            _ => unreachable!("parse_number only yields numbers"),
        },
        other => Err(Diagnostic::new(
            format!("Expected number but got {}", other.type_name()),
            span,
        )),
    }
}

/// Arithmetic stays integral when both sides are integers; one float
/// makes the result a float.
fn numeric_op(
    a: &Value,
    b: &Value,
    span: Span,
    int_op: fn(i64, i64) -> i64,
    float_op: fn(f64, f64) -> f64,
) -> RuneResult<Value> {
    match (as_number(a, span)?, as_number(b, span)?) {
        (Num::Int(x), Num::Int(y)) => Ok(Value::Int(int_op(x, y))),
        (x, y) => Ok(Value::Float(float_op(x.as_f64(), y.as_f64()))),
    }
}

fn compare_op(
    a: &Value,
    b: &Value,
    span: Span,
    int_op: fn(&i64, &i64) -> bool,
    float_op: fn(&f64, &f64) -> bool,
) -> RuneResult<Value> {
    let result = match (as_number(a, span)?, as_number(b, span)?) {
        (Num::Int(x), Num::Int(y)) => int_op(&x, &y),
        (x, y) => float_op(&x.as_f64(), &y.as_f64()),
    };
    Ok(Value::Bool(result))
}

pub(crate) fn apply_binary(op: BinOp, a: &Value, b: &Value, span: Span) -> RuneResult<Value> {
    match op {
        BinOp::Add => {
            if let (Value::Str(x), Value::Str(y)) = (a, b) {
                return Ok(Value::Str(format!("{x}{y}")));
            }
            numeric_op(a, b, span, i64::wrapping_add, |x, y| x + y)
        }
        BinOp::Sub => numeric_op(a, b, span, i64::wrapping_sub, |x, y| x - y),
        BinOp::Mul => numeric_op(a, b, span, i64::wrapping_mul, |x, y| x * y),
        BinOp::Div => match (as_number(a, span)?, as_number(b, span)?) {
            (_, Num::Int(0)) => Err(Diagnostic::new("Divide by zero", span)),
            (_, Num::Float(y)) if y == 0.0 => Err(Diagnostic::new("Divide by zero", span)),
            (Num::Int(x), Num::Int(y)) => Ok(Value::Int(x.wrapping_div(y))),
            (x, y) => Ok(Value::Float(x.as_f64() / y.as_f64())),
        },
        BinOp::Rem => {
            // Modulo is integral; both sides coerce by truncation.
            let x = as_number(a, span)?.trunc();
            let y = as_number(b, span)?.trunc();
            if y == 0 {
                return Err(Diagnostic::new("Divide by zero", span));
            }
            Ok(Value::Int(x.wrapping_rem(y)))
        }
        BinOp::Lt => compare_op(a, b, span, i64::lt, f64::lt),
        BinOp::Gt => compare_op(a, b, span, i64::gt, f64::gt),
        BinOp::Le => compare_op(a, b, span, i64::le, f64::le),
        BinOp::Ge => compare_op(a, b, span, i64::ge, f64::ge),
        BinOp::Eq => Ok(Value::Bool(a == b)),
        BinOp::Ne => Ok(Value::Bool(a != b)),
        BinOp::And => Ok(Value::Bool(a.coerce_bool() && b.coerce_bool())),
        BinOp::Or => Ok(Value::Bool(a.coerce_bool() || b.coerce_bool())),
    }
}

/// Subscript a container: arrays take in-range integers, tables take
/// known string keys.
fn index_value(container: &Value, index: &Value, span: Span) -> RuneResult<Value> {
    match container {
        Value::Array(items) => {
            let Value::Int(i) = index else {
                return Err(Diagnostic::new("Array index must be an integer", span));
            };
            let items = items.borrow();
            if *i < 0 || *i as usize >= items.len() {
                return Err(Diagnostic::new(
                    format!("Index '{}' out of bounds for array of length {}", i, items.len()),
                    span,
                ));
            }
            Ok(items[*i as usize].clone())
        }
        Value::Table(map) => {
            let Value::Str(key) = index else {
                return Err(Diagnostic::new("Table key must be a string", span));
            };
            map.borrow().get(key).cloned().ok_or_else(|| {
                Diagnostic::new(format!("Key '{key}' not found in table"), span)
            })
        }
        other => Err(Diagnostic::new(
            format!("Value of type {} is not an array or table", other.type_name()),
            span,
        )),
    }
}

/// Read a field off a table.
fn field_value(container: &Value, name: &str, span: Span) -> RuneResult<Value> {
    match container {
        Value::Table(map) => map.borrow().get(name).cloned().ok_or_else(|| {
            Diagnostic::new(format!("Key '{name}' not found in table"), span)
        }),
        other => Err(Diagnostic::new(
            format!(
                "Cannot access field '{}' on value of type {}",
                name,
                other.type_name()
            ),
            span,
        )),
    }
}

/// A printable name for the callee in "is not a function" messages.
fn callee_label(callee: &Expr) -> String {
    match &callee.kind {
        ExprKind::Var(name) => name.clone(),
        ExprKind::Field { name, .. } => name.clone(),
        ExprKind::Index { target, .. } => callee_label(target),
        _ => "expression".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eval_source(source: &str) -> RuneResult<Value> {
        let sources = Rc::new(RefCell::new(SourceMap::new()));
        let file_id = sources.borrow_mut().add_file("test.rune", source);
        let program = Parser::new(TokenStream::new(source, file_id)).parse_program()?;
        let root = Scope::root();
        Evaluator::new(sources).eval_program(&program, &root)
    }

    fn eval_ok(source: &str) -> Value {
        eval_source(source).unwrap()
    }

    fn eval_err(source: &str) -> Diagnostic {
        eval_source(source).unwrap_err()
    }

    #[test]
    fn test_integer_arithmetic() {
        assert_eq!(eval_ok("1 + 2 * 3"), Value::Int(7));
        assert_eq!(eval_ok("10 - 4 - 3"), Value::Int(3));
        assert_eq!(eval_ok("7 / 2"), Value::Int(3));
        assert_eq!(eval_ok("7 % 3"), Value::Int(1));
    }

    #[test]
    fn test_float_contaminates() {
        assert_eq!(eval_ok("1 + 2.5"), Value::Float(3.5));
        assert_eq!(eval_ok("5.0 / 2"), Value::Float(2.5));
        assert_eq!(eval_ok("2 * 2.0"), Value::Float(4.0));
    }

    #[test]
    fn test_modulo_truncates_floats() {
        assert_eq!(eval_ok("7.9 % 3"), Value::Int(1));
    }

    #[test]
    fn test_divide_by_zero() {
        assert_eq!(eval_err("1 / 0").message, "Divide by zero");
        assert_eq!(eval_err("1.0 / 0.0").message, "Divide by zero");
        assert_eq!(eval_err("5 % 0").message, "Divide by zero");
    }

    #[test]
    fn test_string_concatenation() {
        assert_eq!(eval_ok("\"hi \" + \"there\""), Value::Str("hi there".into()));
    }

    #[test]
    fn test_string_numeric_coercion() {
        assert_eq!(eval_ok("\"5\" + 1"), Value::Int(6));
        assert_eq!(eval_ok("\"2.5\" * 2"), Value::Float(5.0));
        let err = eval_err("\"five\" + 1");
        assert_eq!(err.message, "Expected number but got 'five'");
    }

    #[test]
    fn test_comparisons() {
        assert_eq!(eval_ok("2 < 3"), Value::Bool(true));
        assert_eq!(eval_ok("2 > 3"), Value::Bool(false));
        assert_eq!(eval_ok("2.5 >= 2"), Value::Bool(true));
        assert_eq!(eval_ok("2 <= 1.5"), Value::Bool(false));
    }

    #[test]
    fn test_equality_is_typed() {
        assert_eq!(eval_ok("1 == 1"), Value::Bool(true));
        assert_eq!(eval_ok("1 == 1.0"), Value::Bool(false));
        assert_eq!(eval_ok("\"a\" == \"a\""), Value::Bool(true));
        assert_eq!(eval_ok("true != false"), Value::Bool(true));
    }

    #[test]
    fn test_logical_coercion() {
        assert_eq!(eval_ok("1 && true"), Value::Bool(true));
        assert_eq!(eval_ok("\"true\" && 1"), Value::Bool(true));
        assert_eq!(eval_ok("0 || false"), Value::Bool(false));
        assert_eq!(eval_ok("not 0"), Value::Bool(true));
        assert_eq!(eval_ok("not \"maybe\""), Value::Bool(true));
    }

    #[test]
    fn test_malformed_number_literal() {
        let err = eval_err("1.2.3");
        assert_eq!(err.message, "Expected number but got '1.2.3'");
    }

    #[test]
    fn test_undefined_variable() {
        let err = eval_err("nope");
        assert_eq!(err.message, "Undefined variable 'nope'");
        assert_eq!(err.span.column, 1);
    }

    #[test]
    fn test_assignment_yields_value_and_defines() {
        assert_eq!(eval_ok("x = 41 x + 1"), Value::Int(42));
        assert_eq!(eval_ok("a = b = 2 a * b"), Value::Int(4));
    }

    #[test]
    fn test_if_only_literal_false_is_falsy() {
        assert_eq!(eval_ok("if true { 1 }"), Value::Int(1));
        assert_eq!(eval_ok("if false { 1 }"), Value::Bool(false));
        // 0 is not the literal false, so the then branch runs.
        assert_eq!(eval_ok("if 0 { 1 } else { 2 }"), Value::Int(1));
    }

    #[test]
    fn test_elif_chain() {
        let source = "x = 2
            if x == 1 { \"one\" } elif x == 2 { \"two\" } else { \"many\" }";
        assert_eq!(eval_ok(source), Value::Str("two".into()));
        let source = "x = 9
            if x == 1 { \"one\" } elif x == 2 { \"two\" } else { \"many\" }";
        assert_eq!(eval_ok(source), Value::Str("many".into()));
    }

    #[test]
    fn test_while_loop() {
        assert_eq!(eval_ok("x = 0 while x < 3 { x = x + 1 } x"), Value::Int(3));
    }

    #[test]
    fn test_while_condition_must_be_bool() {
        let err = eval_err("while 1 { }");
        assert_eq!(err.message, "While condition must be a bool, got int");
    }

    #[test]
    fn test_break_and_continue() {
        let source = "x = 0
            while true {
                x = x + 1
                if x == 5 { break }
            }
            x";
        assert_eq!(eval_ok(source), Value::Int(5));

        // Sum the odd numbers below 10.
        let source = "i = 0 sum = 0
            while i < 10 {
                i = i + 1
                if i % 2 == 0 { continue }
                sum = sum + i
            }
            sum";
        assert_eq!(eval_ok(source), Value::Int(25));
    }

    #[test]
    fn test_return_propagates_through_loop() {
        let source = "fun first () {
                while true { return 42 }
            }
            first()";
        assert_eq!(eval_ok(source), Value::Int(42));
    }

    #[test]
    fn test_factorial() {
        let source = "fun f (n) { if n == 0 { return 1 } return n * f(n - 1) } f(5)";
        assert_eq!(eval_ok(source), Value::Int(120));
    }

    #[test]
    fn test_function_body_value_without_return() {
        assert_eq!(eval_ok("fun add (a, b) { a + b } add(2, 3)"), Value::Int(5));
    }

    #[test]
    fn test_missing_arguments_bind_false() {
        assert_eq!(eval_ok("fun f (a, b) { b } f(1)"), Value::Bool(false));
    }

    #[test]
    fn test_closure_observes_later_mutation() {
        let source = "x = 1 fun get () { x } x = 2 get()";
        assert_eq!(eval_ok(source), Value::Int(2));
    }

    #[test]
    fn test_counter_closure_keeps_scope_alive() {
        let source = "fun counter () {
                n = 0
                return fun () { n = n + 1 return n }
            }
            tick = counter()
            tick() tick() tick()";
        // The counter's `n` lands in the root scope by assignment, so the
        // closure increments a shared binding.
        assert_eq!(eval_ok(source), Value::Int(3));
    }

    #[test]
    fn test_assignment_inside_function_defines_at_root() {
        assert_eq!(eval_ok("fun set () { y = 5 } set() y"), Value::Int(5));
    }

    #[test]
    fn test_parameters_do_not_leak() {
        let err = eval_err("fun f (p) { p } f(1) p");
        assert_eq!(err.message, "Undefined variable 'p'");
    }

    #[test]
    fn test_control_blocks_share_scope() {
        assert_eq!(eval_ok("if true { leaked = 7 } leaked"), Value::Int(7));
    }

    #[test]
    fn test_array_literal_and_indexing() {
        assert_eq!(eval_ok("a = array { 10, 20, 30 } a[0] + a[2]"), Value::Int(40));
    }

    #[test]
    fn test_array_element_assignment() {
        let source = "a = array { 10, 20, 30 } a[1] = 99 a[1]";
        assert_eq!(eval_ok(source), Value::Int(99));
    }

    #[test]
    fn test_array_out_of_bounds() {
        let err = eval_err("a = array { 1 } a[1]");
        assert_eq!(err.message, "Index '1' out of bounds for array of length 1");
        let err = eval_err("a = array { 1 } a[0 - 1]");
        assert_eq!(err.message, "Index '-1' out of bounds for array of length 1");
        let err = eval_err("a = array { 1 } a[5] = 2");
        assert_eq!(err.message, "Array index out of bounds");
    }

    #[test]
    fn test_array_index_must_be_integer() {
        let err = eval_err("a = array { 1 } a[\"x\"]");
        assert_eq!(err.message, "Array index must be an integer");
        let err = eval_err("a = array { 1 } a[0.5]");
        assert_eq!(err.message, "Array index must be an integer");
    }

    #[test]
    fn test_arrays_alias() {
        let source = "a = array { 1, 2 } b = a b[0] = 9 a[0]";
        assert_eq!(eval_ok(source), Value::Int(9));
    }

    #[test]
    fn test_table_literal_field_and_index() {
        assert_eq!(eval_ok("t = table { k: 5 } t.k"), Value::Int(5));
        assert_eq!(eval_ok("t = table { k: 5 } t[\"k\"]"), Value::Int(5));
    }

    #[test]
    fn test_table_key_auto_creation() {
        assert_eq!(eval_ok("t = table { } t[\"k\"] = 1 t.k"), Value::Int(1));
        assert_eq!(eval_ok("t = table { } t.f = 2 t[\"f\"]"), Value::Int(2));
    }

    #[test]
    fn test_table_missing_key() {
        let err = eval_err("t = table { } t.nope");
        assert_eq!(err.message, "Key 'nope' not found in table");
        let err = eval_err("t = table { } t[\"nope\"]");
        assert_eq!(err.message, "Key 'nope' not found in table");
    }

    #[test]
    fn test_table_numeric_keys_stringify() {
        assert_eq!(eval_ok("t = table { 3: \"x\" } t[\"3\"]"), Value::Str("x".into()));
    }

    #[test]
    fn test_table_key_must_be_string() {
        let err = eval_err("t = table { } t[1]");
        assert_eq!(err.message, "Table key must be a string");
    }

    #[test]
    fn test_field_access_on_non_table() {
        let err = eval_err("x = 1 x.f");
        assert_eq!(err.message, "Cannot access field 'f' on value of type int");
        let err = eval_err("x = 1 x.f = 2");
        assert_eq!(err.message, "Cannot assign to field 'f' on non-table object");
    }

    #[test]
    fn test_indexing_non_container() {
        let err = eval_err("x = true x[0]");
        assert_eq!(err.message, "Value of type bool is not an array or table");
    }

    #[test]
    fn test_implicit_self_injection() {
        let source = "t = table {
                name: \"ada\",
                greet: fun (self) { return \"hi \" + self.name },
            }
            t.greet()";
        assert_eq!(eval_ok(source), Value::Str("hi ada".into()));
    }

    #[test]
    fn test_implicit_self_through_subscript() {
        let source = "t = table {
                name: \"ada\",
                greet: fun (self) { return \"hi \" + self.name },
            }
            t[\"greet\"]()";
        assert_eq!(eval_ok(source), Value::Str("hi ada".into()));
    }

    #[test]
    fn test_no_self_injection_for_array_elements() {
        let source = "fns = array { fun (a) { a } }
            fns[0](7)";
        assert_eq!(eval_ok(source), Value::Int(7));
    }

    #[test]
    fn test_calling_a_non_function() {
        let err = eval_err("x = 3 x()");
        assert_eq!(err.message, "'x' is not a function");
        let err = eval_err("t = table { k: 1 } t.k()");
        assert_eq!(err.message, "'k' is not a function");
    }

    #[test]
    fn test_signals_outside_their_context() {
        assert_eq!(eval_err("break").message, "'break' outside of a loop");
        assert_eq!(eval_err("continue").message, "'continue' outside of a loop");
        assert_eq!(eval_err("return 1").message, "'return' outside of a function");
        assert_eq!(
            eval_err("fun f () { break } f()").message,
            "'break' outside of a loop"
        );
    }

    #[test]
    fn test_if_as_expression_value() {
        assert_eq!(eval_ok("x = if true { 1 + 1 } x"), Value::Int(2));
    }

    #[test]
    fn test_empty_block_value() {
        assert_eq!(eval_ok("fun f () { } f()"), Value::Bool(false));
    }

    #[test]
    fn test_import_path_must_be_string() {
        let err = eval_err("import 42");
        assert_eq!(err.message, "Import path must be a string, got int");
    }

    #[test]
    fn test_runtime_error_positions() {
        let err = eval_err("x = 1\ny = nope");
        assert_eq!(err.span.line, 2);
        assert_eq!(err.span.column, 5);
    }
}
