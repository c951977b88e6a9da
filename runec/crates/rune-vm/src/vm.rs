//! The engine facade.
//!
//! [`RuneVm`] is what a host embeds: it owns the root environment, the
//! source map, and the evaluator, and drives the lex/parse/eval pipeline
//! for the main script and everything it imports. After a run the host
//! can pull values back out of the root scope and invoke callables stored
//! in tables.

use std::cell::RefCell;
use std::rc::Rc;

use tracing::debug;

use rune_lex::TokenStream;
use rune_par::Parser;
use rune_util::{Diagnostic, RuneResult, SourceMap};

use crate::builtins;
use crate::env::Scope;
use crate::eval::Evaluator;
use crate::value::Value;

/// An embeddable Rune interpreter instance.
///
/// # Example
///
/// ```
/// use rune_vm::{RuneVm, Value};
///
/// let mut vm = RuneVm::new();
/// vm.register("answer", |_args| Ok(Value::Int(42)));
/// vm.run("x = answer()", "host.rune").unwrap();
/// assert_eq!(vm.get("x"), Some(Value::Int(42)));
/// ```
pub struct RuneVm {
    root: Rc<Scope>,
    sources: Rc<RefCell<SourceMap>>,
    evaluator: Evaluator,
}

impl RuneVm {
    /// Create an engine whose root environment is preloaded with the
    /// builtin catalogue.
    pub fn new() -> Self {
        let root = Scope::root();
        builtins::install(&root);
        let sources = Rc::new(RefCell::new(SourceMap::new()));
        Self {
            root,
            evaluator: Evaluator::new(Rc::clone(&sources)),
            sources,
        }
    }

    /// Register a host function under the given name. Call before
    /// [`run`](Self::run); scripts see it like any other builtin.
    pub fn register(
        &mut self,
        name: &str,
        f: impl Fn(&[Value]) -> Result<Value, String> + 'static,
    ) {
        self.root.define(name, builtins::native(f));
    }

    /// Place an arbitrary host value into the root scope.
    pub fn define(&mut self, name: &str, value: Value) {
        self.root.define(name, value);
    }

    /// Run a source text against the root environment. `path` labels the
    /// source in diagnostics. Returns the program's resulting value (the
    /// last top-level statement's value).
    pub fn run(&mut self, source: &str, path: &str) -> RuneResult<Value> {
        let file_id = self.sources.borrow_mut().add_file(path, source);
        debug!(path, "running script");
        let program = Parser::new(TokenStream::new(source, file_id)).parse_program()?;
        self.evaluator.eval_program(&program, &self.root)
    }

    /// Render a diagnostic as the full positioned banner, with the
    /// offending source line and caret underline.
    pub fn render(&self, diag: &Diagnostic) -> String {
        self.sources.borrow().render(diag)
    }

    /// Read a value from the root scope.
    pub fn get(&self, name: &str) -> Option<Value> {
        self.root.get(name)
    }

    /// Read a table from the root scope, failing when the name is
    /// missing or bound to something else.
    pub fn get_table(&self, name: &str) -> Result<Value, String> {
        match self.root.get(name) {
            Some(value @ Value::Table(_)) => Ok(value),
            Some(other) => Err(format!("'{}' is not a table, got {}", name, other.type_name())),
            None => Err(format!("'{name}' is not defined")),
        }
    }

    /// Read a callable stored under `key` inside the named table. Returns
    /// the table and the callable; the callable is not bound to the
    /// table, so a method-style function expects the table as its first
    /// argument.
    pub fn get_table_function(&self, table: &str, key: &str) -> Result<(Value, Value), String> {
        let table_value = self.get_table(table)?;
        let entry = match &table_value {
            Value::Table(map) => map.borrow().get(key).cloned(),
            _ => None,
        }
        .ok_or_else(|| format!("'{key}' not found in table '{table}'"))?;
        if !entry.is_callable() {
            return Err(format!(
                "'{}' in table '{}' is not a function, got {}",
                key,
                table,
                entry.type_name()
            ));
        }
        Ok((table_value, entry))
    }

    /// Invoke a callable extracted from the environment. For method-style
    /// values pass the table as the first argument.
    pub fn call(&mut self, callee: &Value, args: &[Value]) -> RuneResult<Value> {
        self.evaluator.call_callable(callee, args)
    }
}

impl Default for RuneVm {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_and_get() {
        let mut vm = RuneVm::new();
        vm.run("x = 6 * 7", "test.rune").unwrap();
        assert_eq!(vm.get("x"), Some(Value::Int(42)));
        assert_eq!(vm.get("missing"), None);
    }

    #[test]
    fn test_run_returns_last_value() {
        let mut vm = RuneVm::new();
        assert_eq!(vm.run("1 2 3", "test.rune").unwrap(), Value::Int(3));
    }

    #[test]
    fn test_registered_function_is_callable_from_script() {
        let mut vm = RuneVm::new();
        vm.register("double", |args| match args {
            [Value::Int(i)] => Ok(Value::Int(i * 2)),
            _ => Err("double requires exactly 1 int argument".to_string()),
        });
        vm.run("x = double(21)", "test.rune").unwrap();
        assert_eq!(vm.get("x"), Some(Value::Int(42)));
    }

    #[test]
    fn test_host_function_error_becomes_diagnostic() {
        let mut vm = RuneVm::new();
        vm.register("boom", |_| Err("it broke".to_string()));
        let err = vm.run("boom()", "test.rune").unwrap_err();
        assert_eq!(err.message, "Error in function call: 'it broke'");
        assert_eq!(err.span.line, 1);
    }

    #[test]
    fn test_define_host_value() {
        let mut vm = RuneVm::new();
        vm.define("greeting", Value::Str("hello".into()));
        assert_eq!(
            vm.run("greeting + \"!\"", "test.rune").unwrap(),
            Value::Str("hello!".into())
        );
    }

    #[test]
    fn test_get_table() {
        let mut vm = RuneVm::new();
        vm.run("person = table { name: \"ada\" }", "test.rune").unwrap();
        assert!(vm.get_table("person").is_ok());
        assert!(vm.get_table("missing").is_err());
        vm.run("n = 3", "n.rune").unwrap();
        let err = vm.get_table("n").unwrap_err();
        assert_eq!(err, "'n' is not a table, got int");
    }

    #[test]
    fn test_get_table_function_and_call() {
        let mut vm = RuneVm::new();
        vm.run(
            "person = table {
                name: \"ada\",
                greet: fun (self) { return \"hi \" + self.name },
            }",
            "test.rune",
        )
        .unwrap();

        let (person, greet) = vm.get_table_function("person", "greet").unwrap();
        let result = vm.call(&greet, &[person]).unwrap();
        assert_eq!(result, Value::Str("hi ada".into()));

        assert!(vm.get_table_function("person", "name").is_err());
        assert!(vm.get_table_function("person", "missing").is_err());
    }

    #[test]
    fn test_render_diagnostic_banner() {
        let mut vm = RuneVm::new();
        let err = vm.run("x = nope", "main.rune").unwrap_err();
        assert_eq!(
            vm.render(&err),
            "error (main.rune:1:5): Undefined variable 'nope'\nx = nope\n    ^~~~"
        );
    }

    #[test]
    fn test_builtins_are_preloaded() {
        let mut vm = RuneVm::new();
        assert_eq!(
            vm.run("typeof(array { })", "test.rune").unwrap(),
            Value::Str("array".into())
        );
        assert_eq!(
            vm.run("len(\"four\")", "t2.rune").unwrap(),
            Value::Int(4)
        );
    }

    #[test]
    fn test_builtin_arity_error_is_positioned() {
        let mut vm = RuneVm::new();
        let err = vm.run("x = 1\nlen()", "test.rune").unwrap_err();
        assert_eq!(
            err.message,
            "Error in function call: 'len requires exactly 1 argument'"
        );
        assert_eq!(err.span.line, 2);
        assert_eq!(err.span.column, 1);
    }
}
