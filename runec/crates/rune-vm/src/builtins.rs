//! The builtin catalogue.
//!
//! Every builtin follows the host-callable contract: it receives the
//! evaluated argument list, checks arity and types itself, and returns a
//! value or a descriptive error message. The evaluator turns the message
//! into a positioned diagnostic at the call site.
//!
//! Builtins that conceptually return nothing return `false`, the
//! language's general absent value.

use std::io::Write;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::env::Scope;
use crate::value::Value;

/// Register the whole catalogue into the given scope.
pub fn install(scope: &Scope) {
    scope.define("vmversion", native(builtin_vmversion));
    scope.define("print", native(builtin_print));
    scope.define("println", native(builtin_println));
    scope.define("wait", native(builtin_wait));
    scope.define("millisecs", native(builtin_millisecs));
    scope.define("exit", native(builtin_exit));
    scope.define("readfile", native(builtin_readfile));
    scope.define("writefile", native(builtin_writefile));
    scope.define("fileexists", native(builtin_fileexists));
    scope.define("direxists", native(builtin_direxists));
    scope.define("isfileordir", native(builtin_isfileordir));
    scope.define("strsplit", native(builtin_strsplit));
    scope.define("trim", native(builtin_trim));
    scope.define("trimleft", native(builtin_trimleft));
    scope.define("trimright", native(builtin_trimright));
    scope.define("isdigit", native(builtin_isdigit));
    scope.define("isalpha", native(builtin_isalpha));
    scope.define("iswhite", native(builtin_iswhite));
    scope.define("replace", native(builtin_replace));
    scope.define("contains", native(builtin_contains));
    scope.define("hasprefix", native(builtin_hasprefix));
    scope.define("hassuffix", native(builtin_hassuffix));
    scope.define("cutprefix", native(builtin_cutprefix));
    scope.define("cutsuffix", native(builtin_cutsuffix));
    scope.define("strlower", native(builtin_strlower));
    scope.define("strupper", native(builtin_strupper));
    scope.define("typeof", native(builtin_typeof));
    scope.define("append", native(builtin_append));
    scope.define("remove", native(builtin_remove));
    scope.define("haskey", native(builtin_haskey));
    scope.define("slice", native(builtin_slice));
    scope.define("sliceleft", native(builtin_sliceleft));
    scope.define("sliceright", native(builtin_sliceright));
    scope.define("len", native(builtin_len));
    scope.define("new", native(builtin_new));
    scope.define("exec", native(builtin_exec));
    scope.define("assert", native(builtin_assert));
}

/// Wrap a Rust function as a native callable value.
pub fn native(f: impl Fn(&[Value]) -> Result<Value, String> + 'static) -> Value {
    Value::Native(Rc::new(f))
}

fn expect_str(value: &Value) -> Result<&str, String> {
    match value {
        Value::Str(s) => Ok(s),
        other => Err(format!(
            "argument must be of type string, got: {}",
            other.type_name()
        )),
    }
}

fn expect_int(value: &Value) -> Result<i64, String> {
    match value {
        Value::Int(i) => Ok(*i),
        other => Err(format!(
            "argument must be of type int, got: {}",
            other.type_name()
        )),
    }
}

fn expect_char(value: &Value) -> Result<u8, String> {
    let s = expect_str(value)?;
    if s.len() != 1 {
        return Err(format!(
            "argument must be a single character, got a string of length {}",
            s.len()
        ));
    }
    Ok(s.as_bytes()[0])
}

/// The vm version, `x.x.x`.
fn builtin_vmversion(args: &[Value]) -> Result<Value, String> {
    if !args.is_empty() {
        return Err("vmversion requires no arguments".to_string());
    }
    Ok(Value::Str(env!("CARGO_PKG_VERSION").to_string()))
}

fn builtin_print(args: &[Value]) -> Result<Value, String> {
    for arg in args {
        print!("{arg}");
    }
    // `exit` bypasses the normal unwind, so flush per call.
    std::io::stdout().flush().map_err(|e| e.to_string())?;
    Ok(Value::Bool(false))
}

fn builtin_println(args: &[Value]) -> Result<Value, String> {
    for arg in args {
        print!("{arg}");
    }
    println!();
    std::io::stdout().flush().map_err(|e| e.to_string())?;
    Ok(Value::Bool(false))
}

/// Block the interpreter for the given number of milliseconds.
fn builtin_wait(args: &[Value]) -> Result<Value, String> {
    if args.len() != 1 {
        return Err("wait requires exactly 1 argument".to_string());
    }
    let ms = expect_int(&args[0])?;
    std::thread::sleep(std::time::Duration::from_millis(ms.max(0) as u64));
    Ok(Value::Bool(false))
}

/// Milliseconds since the Unix epoch.
fn builtin_millisecs(args: &[Value]) -> Result<Value, String> {
    if !args.is_empty() {
        return Err("millisecs requires no arguments".to_string());
    }
    let now = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map_err(|e| e.to_string())?;
    Ok(Value::Int(now.as_millis() as i64))
}

fn builtin_exit(args: &[Value]) -> Result<Value, String> {
    if !args.is_empty() {
        return Err("exit requires no arguments".to_string());
    }
    let _ = std::io::stdout().flush();
    std::process::exit(0);
}

/// Read a whole file into a string.
fn builtin_readfile(args: &[Value]) -> Result<Value, String> {
    if args.len() != 1 {
        return Err("readfile requires exactly 1 argument".to_string());
    }
    let filename = expect_str(&args[0])?;
    std::fs::read_to_string(filename)
        .map(Value::Str)
        .map_err(|e| format!("failed to read file: {e}"))
}

fn builtin_writefile(args: &[Value]) -> Result<Value, String> {
    if args.len() != 2 {
        return Err("writefile requires exactly 2 arguments".to_string());
    }
    let filename = expect_str(&args[0])?;
    let content = expect_str(&args[1])?;
    std::fs::write(filename, content).map_err(|e| format!("failed to write file: {e}"))?;
    Ok(Value::Bool(false))
}

fn builtin_fileexists(args: &[Value]) -> Result<Value, String> {
    if args.len() != 1 {
        return Err("fileexists requires exactly 1 argument".to_string());
    }
    let filename = expect_str(&args[0])?;
    match std::fs::metadata(filename) {
        Ok(_) => Ok(Value::Bool(true)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Value::Bool(false)),
        Err(e) => Err(format!("failed to check file: {e}")),
    }
}

fn builtin_direxists(args: &[Value]) -> Result<Value, String> {
    if args.len() != 1 {
        return Err("direxists requires exactly 1 argument".to_string());
    }
    let dirname = expect_str(&args[0])?;
    match std::fs::metadata(dirname) {
        Ok(info) => Ok(Value::Bool(info.is_dir())),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Value::Bool(false)),
        Err(e) => Err(format!("failed to check directory: {e}")),
    }
}

/// 0 when the path does not exist, 1 for a file, 2 for a directory.
fn builtin_isfileordir(args: &[Value]) -> Result<Value, String> {
    if args.len() != 1 {
        return Err("isfileordir requires exactly 1 argument".to_string());
    }
    let path = expect_str(&args[0])?;
    match std::fs::metadata(path) {
        Ok(info) if info.is_dir() => Ok(Value::Int(2)),
        Ok(_) => Ok(Value::Int(1)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Value::Int(0)),
        Err(e) => Err(format!("failed to check path: {e}")),
    }
}

fn builtin_strsplit(args: &[Value]) -> Result<Value, String> {
    if args.len() != 2 {
        return Err("strsplit requires exactly 2 arguments".to_string());
    }
    let s = expect_str(&args[0])?;
    let delimiter = expect_str(&args[1])?;
    let parts = s
        .split(delimiter)
        .map(|part| Value::Str(part.to_string()))
        .collect();
    Ok(Value::array(parts))
}

fn builtin_trim(args: &[Value]) -> Result<Value, String> {
    if args.len() != 1 {
        return Err("trim requires exactly 1 argument".to_string());
    }
    Ok(Value::Str(expect_str(&args[0])?.trim().to_string()))
}

fn builtin_trimleft(args: &[Value]) -> Result<Value, String> {
    if args.len() != 1 {
        return Err("trimleft requires exactly 1 argument".to_string());
    }
    Ok(Value::Str(expect_str(&args[0])?.trim_start().to_string()))
}

fn builtin_trimright(args: &[Value]) -> Result<Value, String> {
    if args.len() != 1 {
        return Err("trimright requires exactly 1 argument".to_string());
    }
    Ok(Value::Str(expect_str(&args[0])?.trim_end().to_string()))
}

fn builtin_isdigit(args: &[Value]) -> Result<Value, String> {
    if args.len() != 1 {
        return Err("isdigit requires exactly 1 argument".to_string());
    }
    let ch = expect_char(&args[0])?;
    Ok(Value::Bool(ch.is_ascii_digit()))
}

fn builtin_isalpha(args: &[Value]) -> Result<Value, String> {
    if args.len() != 1 {
        return Err("isalpha requires exactly 1 argument".to_string());
    }
    let ch = expect_char(&args[0])?;
    Ok(Value::Bool((ch as char).is_alphabetic()))
}

fn builtin_iswhite(args: &[Value]) -> Result<Value, String> {
    if args.len() != 1 {
        return Err("iswhite requires exactly 1 argument".to_string());
    }
    let ch = expect_char(&args[0])?;
    Ok(Value::Bool((ch as char).is_whitespace()))
}

fn builtin_replace(args: &[Value]) -> Result<Value, String> {
    if args.len() != 3 {
        return Err("replace requires exactly 3 arguments".to_string());
    }
    let s = expect_str(&args[0])?;
    let old = expect_str(&args[1])?;
    let new = expect_str(&args[2])?;
    Ok(Value::Str(s.replace(old, new)))
}

fn builtin_contains(args: &[Value]) -> Result<Value, String> {
    if args.len() != 2 {
        return Err("contains requires exactly 2 arguments".to_string());
    }
    let s = expect_str(&args[0])?;
    let substr = expect_str(&args[1])?;
    Ok(Value::Bool(s.contains(substr)))
}

fn builtin_hasprefix(args: &[Value]) -> Result<Value, String> {
    if args.len() != 2 {
        return Err("hasprefix requires exactly 2 arguments".to_string());
    }
    let s = expect_str(&args[0])?;
    let prefix = expect_str(&args[1])?;
    Ok(Value::Bool(s.starts_with(prefix)))
}

fn builtin_hassuffix(args: &[Value]) -> Result<Value, String> {
    if args.len() != 2 {
        return Err("hassuffix requires exactly 2 arguments".to_string());
    }
    let s = expect_str(&args[0])?;
    let suffix = expect_str(&args[1])?;
    Ok(Value::Bool(s.ends_with(suffix)))
}

/// Cut the prefix when present, otherwise return the string unchanged.
fn builtin_cutprefix(args: &[Value]) -> Result<Value, String> {
    if args.len() != 2 {
        return Err("cutprefix requires exactly 2 arguments".to_string());
    }
    let s = expect_str(&args[0])?;
    let prefix = expect_str(&args[1])?;
    Ok(Value::Str(s.strip_prefix(prefix).unwrap_or(s).to_string()))
}

fn builtin_cutsuffix(args: &[Value]) -> Result<Value, String> {
    if args.len() != 2 {
        return Err("cutsuffix requires exactly 2 arguments".to_string());
    }
    let s = expect_str(&args[0])?;
    let suffix = expect_str(&args[1])?;
    Ok(Value::Str(s.strip_suffix(suffix).unwrap_or(s).to_string()))
}

fn builtin_strlower(args: &[Value]) -> Result<Value, String> {
    if args.len() != 1 {
        return Err("strlower requires exactly 1 argument".to_string());
    }
    Ok(Value::Str(expect_str(&args[0])?.to_lowercase()))
}

fn builtin_strupper(args: &[Value]) -> Result<Value, String> {
    if args.len() != 1 {
        return Err("strupper requires exactly 1 argument".to_string());
    }
    Ok(Value::Str(expect_str(&args[0])?.to_uppercase()))
}

/// The type name of the argument as a string. Callables report as
/// `unknown`, like every other value a script cannot construct a literal
/// of.
fn builtin_typeof(args: &[Value]) -> Result<Value, String> {
    if args.len() != 1 {
        return Err("typeof requires exactly 1 argument".to_string());
    }
    let name = match &args[0] {
        Value::Fun(_) | Value::Native(_) => "unknown",
        other => other.type_name(),
    };
    Ok(Value::Str(name.to_string()))
}

/// Append to an array, concatenate onto a string, or insert into a table
/// (three-argument form). Returns the container.
fn builtin_append(args: &[Value]) -> Result<Value, String> {
    if args.len() < 2 {
        return Err(
            "append requires exactly 2 arguments for array/string or 3 arguments for table"
                .to_string(),
        );
    }
    match &args[0] {
        Value::Array(items) => {
            items.borrow_mut().push(args[1].clone());
            Ok(args[0].clone())
        }
        Value::Str(s) => Ok(Value::Str(format!("{}{}", s, args[1]))),
        Value::Table(map) => {
            if args.len() != 3 {
                return Err("append requires 3 arguments for table: table, key, value".to_string());
            }
            let Value::Str(key) = &args[1] else {
                return Err("second argument must be a string key for a table".to_string());
            };
            map.borrow_mut().insert(key.clone(), args[2].clone());
            Ok(args[0].clone())
        }
        other => Err(format!(
            "first argument must be an array, string, or table, got {}",
            other.type_name()
        )),
    }
}

/// Remove an array element by index, a string byte by index, or a table
/// key. Returns the container (a new string for strings).
fn builtin_remove(args: &[Value]) -> Result<Value, String> {
    if args.len() != 2 {
        return Err("remove requires exactly 2 arguments".to_string());
    }
    match &args[0] {
        Value::Array(items) => {
            let Value::Int(index) = &args[1] else {
                return Err("second argument must be a valid index".to_string());
            };
            let mut items = items.borrow_mut();
            if *index < 0 || *index as usize >= items.len() {
                return Err(format!(
                    "index {} out of bounds for array[{}]",
                    index,
                    items.len()
                ));
            }
            items.remove(*index as usize);
            drop(items);
            Ok(args[0].clone())
        }
        Value::Str(s) => {
            let Value::Int(index) = &args[1] else {
                return Err("second argument must be a valid index".to_string());
            };
            if *index < 0 || *index as usize >= s.len() {
                return Err(format!(
                    "index {} out of bounds for string[{}]",
                    index,
                    s.len()
                ));
            }
            // Strings index by byte; refuse a removal that would leave
            // invalid UTF-8 behind.
            let mut bytes = s.as_bytes().to_vec();
            bytes.remove(*index as usize);
            String::from_utf8(bytes)
                .map(Value::Str)
                .map_err(|_| "removal would split a multi-byte character".to_string())
        }
        Value::Table(map) => {
            let Value::Str(key) = &args[1] else {
                return Err("second argument must be a string key for a table".to_string());
            };
            if map.borrow_mut().shift_remove(key).is_none() {
                return Err(format!("key '{key}' does not exist in table"));
            }
            Ok(args[0].clone())
        }
        other => Err(format!(
            "first argument must be an array, string, or table, got {}",
            other.type_name()
        )),
    }
}

fn builtin_haskey(args: &[Value]) -> Result<Value, String> {
    if args.len() != 2 {
        return Err("haskey requires exactly 2 arguments".to_string());
    }
    let Value::Table(map) = &args[0] else {
        return Err(format!(
            "first argument must be a table, got {}",
            args[0].type_name()
        ));
    };
    let Value::Str(key) = &args[1] else {
        return Err(format!(
            "second argument must be a string key, got {}",
            args[1].type_name()
        ));
    };
    Ok(Value::Bool(map.borrow().contains_key(key)))
}

fn slice_start(args: &[Value], index: usize) -> Result<usize, String> {
    match &args[index] {
        Value::Int(i) if *i >= 0 => Ok(*i as usize),
        Value::Int(_) => Ok(usize::MAX), // negative, always out of bounds
        _ => Err("second argument must be a valid start index".to_string()),
    }
}

/// Slice out a range of an array, a table (by key order), or a string
/// (by byte).
fn builtin_slice(args: &[Value]) -> Result<Value, String> {
    if args.len() != 3 {
        return Err("slice requires exactly 3 arguments".to_string());
    }
    let start = slice_start(args, 1)?;
    let Value::Int(end) = &args[2] else {
        return Err("third argument must be a valid end index".to_string());
    };
    let end = if *end < 0 { usize::MAX } else { *end as usize };
    slice_range(&args[0], start, end)
}

fn builtin_sliceleft(args: &[Value]) -> Result<Value, String> {
    if args.len() != 2 {
        return Err("sliceleft requires exactly 2 arguments".to_string());
    }
    let Value::Int(end) = &args[1] else {
        return Err("second argument must be a valid end index".to_string());
    };
    let end = if *end < 0 { usize::MAX } else { *end as usize };
    slice_range(&args[0], 0, end)
}

fn builtin_sliceright(args: &[Value]) -> Result<Value, String> {
    if args.len() != 2 {
        return Err("sliceright requires exactly 2 arguments".to_string());
    }
    let start = slice_start(args, 1)?;
    match &args[0] {
        Value::Array(items) => {
            let len = items.borrow().len();
            slice_range(&args[0], start, len)
        }
        Value::Table(map) => {
            let len = map.borrow().len();
            slice_range(&args[0], start, len)
        }
        Value::Str(s) => {
            let len = s.len();
            slice_range(&args[0], start, len)
        }
        other => Err(format!(
            "first argument must be an array, table, or string, got {}",
            other.type_name()
        )),
    }
}

fn slice_range(container: &Value, start: usize, end: usize) -> Result<Value, String> {
    match container {
        Value::Array(items) => {
            let items = items.borrow();
            if start > end || end > items.len() {
                return Err("index out of bounds for array slice".to_string());
            }
            Ok(Value::array(items[start..end].to_vec()))
        }
        Value::Table(map) => {
            let map = map.borrow();
            if start > end || end > map.len() {
                return Err("index out of bounds for table slice".to_string());
            }
            let mut sliced = IndexMap::new();
            for (key, value) in map.iter().skip(start).take(end - start) {
                sliced.insert(key.clone(), value.clone());
            }
            Ok(Value::table(sliced))
        }
        Value::Str(s) => {
            if start > end || end > s.len() {
                return Err("index out of bounds for string slice".to_string());
            }
            s.get(start..end)
                .map(|part| Value::Str(part.to_string()))
                .ok_or_else(|| "slice would split a multi-byte character".to_string())
        }
        other => Err(format!(
            "first argument must be an array, table, or string, got {}",
            other.type_name()
        )),
    }
}

/// Length of an array or table in elements, of a string in bytes.
fn builtin_len(args: &[Value]) -> Result<Value, String> {
    if args.len() != 1 {
        return Err("len requires exactly 1 argument".to_string());
    }
    match &args[0] {
        Value::Array(items) => Ok(Value::Int(items.borrow().len() as i64)),
        Value::Str(s) => Ok(Value::Int(s.len() as i64)),
        Value::Table(map) => Ok(Value::Int(map.borrow().len() as i64)),
        other => Err(format!(
            "argument must be an array, string, or table, got {}",
            other.type_name()
        )),
    }
}

/// A deep copy of an array or table, recursively copying nested
/// containers.
fn builtin_new(args: &[Value]) -> Result<Value, String> {
    if args.len() != 1 {
        return Err("new requires exactly 1 argument".to_string());
    }
    match &args[0] {
        Value::Array(_) | Value::Table(_) => Ok(deep_copy(&args[0])),
        other => Err(format!(
            "new can only create copies of arrays or tables, got {}",
            other.type_name()
        )),
    }
}

fn deep_copy(value: &Value) -> Value {
    match value {
        Value::Array(items) => Value::array(items.borrow().iter().map(deep_copy).collect()),
        Value::Table(map) => {
            let mut copy = IndexMap::new();
            for (key, item) in map.borrow().iter() {
                copy.insert(key.clone(), deep_copy(item));
            }
            Value::table(copy)
        }
        other => other.clone(),
    }
}

/// Run a shell command and capture its stdout. The command string splits
/// on whitespace into program and arguments; an optional second argument
/// is the working directory. Failure is reported in the returned string,
/// not as an error value.
fn builtin_exec(args: &[Value]) -> Result<Value, String> {
    if args.is_empty() {
        return Err("exec requires at least one argument".to_string());
    }
    if args.len() > 2 {
        return Err("exec requires at most two arguments".to_string());
    }
    let Value::Str(command) = &args[0] else {
        return Err(format!(
            "first argument must be of type string, got: {}",
            args[0].type_name()
        ));
    };
    let working_dir = match args.get(1) {
        Some(Value::Str(dir)) => Some(dir.clone()),
        Some(other) => {
            return Err(format!(
                "second argument must be of type string, got: {}",
                other.type_name()
            ));
        }
        None => None,
    };

    let mut parts = command.split_whitespace();
    let Some(program) = parts.next() else {
        return Ok(Value::Str("error: empty command".to_string()));
    };
    let mut cmd = std::process::Command::new(program);
    cmd.args(parts);
    if let Some(dir) = working_dir {
        cmd.current_dir(dir);
    }

    match cmd.output() {
        Ok(output) if output.status.success() => Ok(Value::Str(format!(
            "ok: {}",
            String::from_utf8_lossy(&output.stdout)
        ))),
        Ok(output) => Ok(Value::Str(format!("error: {}", output.status))),
        Err(e) => Ok(Value::Str(format!("error: {e}"))),
    }
}

/// Fail with the given message when the condition is false. The arity
/// message disagrees with the enforced arity; scripts in the wild match
/// on the text, so it stays as is.
fn builtin_assert(args: &[Value]) -> Result<Value, String> {
    if args.len() != 2 {
        return Err("assert requires exactly 1 argument".to_string());
    }
    let Value::Bool(condition) = &args[0] else {
        return Err(format!(
            "first argument must be of type bool, got: {}",
            args[0].type_name()
        ));
    };
    let Value::Str(msg) = &args[1] else {
        return Err(format!(
            "second argument must be of type string, got: {}",
            args[1].type_name()
        ));
    };
    if !condition {
        return Err(format!("assertion failed: {msg}"));
    }
    Ok(Value::Bool(false))
}
