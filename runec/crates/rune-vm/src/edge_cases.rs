//! Edge-case tests for the evaluator, mostly around `import`, which is
//! the one language feature that touches the filesystem.

use std::fs;

use tempfile::TempDir;

use crate::value::Value;
use crate::vm::RuneVm;

/// Create a `.rune` file in `dir` and return the path stem a script
/// would pass to `import`.
fn write_module(dir: &TempDir, name: &str, source: &str) -> String {
    let path = dir.path().join(format!("{name}.rune"));
    fs::write(&path, source).unwrap();
    dir.path().join(name).to_string_lossy().into_owned()
}

#[test]
fn test_import_populates_current_environment() {
    let dir = TempDir::new().unwrap();
    let stem = write_module(&dir, "mathlib", "fun triple (n) { return n * 3 }");

    let mut vm = RuneVm::new();
    let source = format!("import \"{stem}\" x = triple(4)");
    vm.run(&source, "main.rune").unwrap();
    assert_eq!(vm.get("x"), Some(Value::Int(12)));
}

#[test]
fn test_duplicate_import_is_an_error() {
    let dir = TempDir::new().unwrap();
    let stem = write_module(&dir, "once", "a = 1");

    let mut vm = RuneVm::new();
    let source = format!("import \"{stem}\" import \"{stem}\"");
    let err = vm.run(&source, "main.rune").unwrap_err();
    assert_eq!(
        err.message,
        format!("Duplicate import detected: '{stem}.rune' was already imported")
    );
}

#[test]
fn test_distinct_paths_with_identical_content_both_import() {
    let dir = TempDir::new().unwrap();
    let first = write_module(&dir, "first", "counter = 1");
    let second = write_module(&dir, "second", "counter = 1");

    let mut vm = RuneVm::new();
    let source = format!("import \"{first}\" import \"{second}\"");
    vm.run(&source, "main.rune").unwrap();
    assert_eq!(vm.get("counter"), Some(Value::Int(1)));
}

#[test]
fn test_missing_import_is_a_positioned_failure() {
    let mut vm = RuneVm::new();
    let err = vm.run("import \"missing\"", "main.rune").unwrap_err();
    assert!(
        err.message.starts_with("Failed to import file 'missing.rune'"),
        "unexpected message: {}",
        err.message
    );
    assert_eq!(err.span.line, 1);
    assert_eq!(err.span.column, 1);
}

#[test]
fn test_failed_import_still_poisons_the_path() {
    // The path joins the imported set before the read, so a retry in the
    // same engine reports a duplicate rather than failing the read again.
    let mut vm = RuneVm::new();
    let err = vm.run("import \"nowhere\"", "main.rune").unwrap_err();
    assert!(err.message.starts_with("Failed to import file"));

    let err = vm.run("import \"nowhere\"", "retry.rune").unwrap_err();
    assert!(err.message.starts_with("Duplicate import detected"));
}

#[test]
fn test_imported_file_errors_point_into_that_file() {
    let dir = TempDir::new().unwrap();
    let stem = write_module(&dir, "broken", "x = undefined_name");

    let mut vm = RuneVm::new();
    let source = format!("import \"{stem}\"");
    let err = vm.run(&source, "main.rune").unwrap_err();
    assert_eq!(err.message, "Undefined variable 'undefined_name'");

    let banner = vm.render(&err);
    assert!(
        banner.contains("broken.rune:1:5"),
        "diagnostic does not point into the imported file: {banner}"
    );
    assert!(banner.contains("x = undefined_name"));
}

#[test]
fn test_imported_closures_survive_the_import() {
    let dir = TempDir::new().unwrap();
    let stem = write_module(
        &dir,
        "greeter",
        "greeter = table {
            name: \"rune\",
            hello: fun (self) { return \"hey \" + self.name },
        }",
    );

    let mut vm = RuneVm::new();
    let source = format!("import \"{stem}\" msg = greeter.hello()");
    vm.run(&source, "main.rune").unwrap();
    assert_eq!(vm.get("msg"), Some(Value::Str("hey rune".into())));
}

#[test]
fn test_import_path_is_an_expression() {
    let dir = TempDir::new().unwrap();
    let stem = write_module(&dir, "dynamic", "loaded = true");

    // The import operand is evaluated, so paths can be built at runtime.
    let (prefix, name) = stem.split_at(stem.len() - "dynamic".len());
    let mut vm = RuneVm::new();
    let source = format!("base = \"{prefix}\" import base + \"{name}\"");
    vm.run(&source, "main.rune").unwrap();
    assert_eq!(vm.get("loaded"), Some(Value::Bool(true)));
}

#[test]
fn test_import_runs_against_current_scope() {
    // Importing inside a function body still lands definitions in the
    // environment the import runs in; assignment semantics put fresh
    // names in the root scope.
    let dir = TempDir::new().unwrap();
    let stem = write_module(&dir, "inner", "from_inner = 99");

    let mut vm = RuneVm::new();
    let source = format!("fun load () {{ import \"{stem}\" }} load() from_inner");
    assert_eq!(vm.run(&source, "main.rune").unwrap(), Value::Int(99));
}
