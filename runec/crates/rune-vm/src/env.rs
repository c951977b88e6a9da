//! The environment chain.
//!
//! A [`Scope`] is a name-to-value map with an optional parent link. The
//! engine creates one root scope and preloads it with the builtins;
//! entering a function body extends the scope captured when the function
//! literal was evaluated. Control blocks (`if`, `while`) do not open a
//! scope of their own, so variables assigned inside them leak outward.
//!
//! Scopes are shared (`Rc`) because closures keep their defining scope
//! alive, and interior-mutable (`RefCell`) because assignments through a
//! closure must be visible to every other holder of the chain.

use std::cell::RefCell;
use std::rc::Rc;

use rustc_hash::FxHashMap;

use crate::value::Value;

/// One scope in the environment chain.
pub struct Scope {
    vars: RefCell<FxHashMap<String, Value>>,
    parent: Option<Rc<Scope>>,
}

impl Scope {
    /// Create a root scope with no parent.
    pub fn root() -> Rc<Self> {
        Rc::new(Self {
            vars: RefCell::new(FxHashMap::default()),
            parent: None,
        })
    }

    /// Create a child scope with `self` as parent.
    pub fn extend(self: &Rc<Self>) -> Rc<Self> {
        Rc::new(Self {
            vars: RefCell::new(FxHashMap::default()),
            parent: Some(Rc::clone(self)),
        })
    }

    /// Create a binding in this scope, overwriting any existing one here.
    pub fn define(&self, name: impl Into<String>, value: Value) {
        self.vars.borrow_mut().insert(name.into(), value);
    }

    /// Look up a name, walking parent scopes. Returns `None` when the
    /// name is not bound anywhere in the chain.
    pub fn get(&self, name: &str) -> Option<Value> {
        if let Some(value) = self.vars.borrow().get(name) {
            return Some(value.clone());
        }
        self.parent.as_ref().and_then(|parent| parent.get(name))
    }

    /// Update the binding in the scope that defines `name`. When no scope
    /// in the chain defines it, the name is created in the root scope:
    /// assignment to an unknown name auto-defines a global.
    pub fn assign(self: &Rc<Self>, name: &str, value: Value) {
        let mut current = Rc::clone(self);
        loop {
            if current.vars.borrow().contains_key(name) {
                current.vars.borrow_mut().insert(name.to_string(), value);
                return;
            }
            match &current.parent {
                Some(parent) => {
                    let parent = Rc::clone(parent);
                    current = parent;
                }
                None => {
                    current.define(name, value);
                    return;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_define_and_get() {
        let scope = Scope::root();
        scope.define("x", Value::Int(1));
        assert_eq!(scope.get("x"), Some(Value::Int(1)));
        assert_eq!(scope.get("y"), None);
    }

    #[test]
    fn test_get_walks_parents() {
        let root = Scope::root();
        root.define("x", Value::Int(1));
        let child = root.extend();
        assert_eq!(child.get("x"), Some(Value::Int(1)));
    }

    #[test]
    fn test_shadowing() {
        let root = Scope::root();
        root.define("x", Value::Int(1));
        let child = root.extend();
        child.define("x", Value::Int(2));
        assert_eq!(child.get("x"), Some(Value::Int(2)));
        assert_eq!(root.get("x"), Some(Value::Int(1)));
    }

    #[test]
    fn test_assign_updates_defining_scope() {
        let root = Scope::root();
        root.define("x", Value::Int(1));
        let child = root.extend();
        child.assign("x", Value::Int(9));
        assert_eq!(root.get("x"), Some(Value::Int(9)));
        // The child has no binding of its own.
        assert!(child.vars.borrow().get("x").is_none());
    }

    #[test]
    fn test_assign_undefined_creates_at_root() {
        let root = Scope::root();
        let inner = root.extend().extend();
        inner.assign("fresh", Value::Bool(true));
        assert_eq!(root.get("fresh"), Some(Value::Bool(true)));
    }

    #[test]
    fn test_define_overwrites_in_place() {
        let scope = Scope::root();
        scope.define("x", Value::Int(1));
        scope.define("x", Value::Int(2));
        assert_eq!(scope.get("x"), Some(Value::Int(2)));
    }
}
