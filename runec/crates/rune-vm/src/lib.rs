//! rune-vm - Values, environments, and the tree-walking evaluator.
//!
//! This crate is the back half of the Rune pipeline. It defines the tagged
//! [`Value`] model, the lexically-scoped [`Scope`] chain, the recursive
//! [`Evaluator`], the builtin catalogue preloaded into every root scope,
//! and the [`RuneVm`] facade a host embeds:
//!
//! ```
//! use rune_vm::RuneVm;
//!
//! let mut vm = RuneVm::new();
//! vm.run("x = 6 * 7", "demo.rune").unwrap();
//! assert_eq!(vm.get("x").unwrap().to_string(), "42");
//! ```

pub mod builtins;
pub mod env;
pub mod eval;
pub mod value;
pub mod vm;

pub use env::Scope;
pub use eval::{Evaluator, Flow};
pub use value::{NativeFn, ScriptFn, Value};
pub use vm::RuneVm;

// Hosts embedding the engine only need this crate in scope.
pub use rune_util::{Diagnostic, RuneResult};

#[cfg(test)]
mod edge_cases;
