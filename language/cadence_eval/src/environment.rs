//! Runtime activations: the evaluator's scope stack.
//!
//! Uses a scope stack (not cloning) so inner scopes see and update outer
//! slots. Every slot read checks for the invalidated-resource sentinel;
//! reaching one at runtime means the checker missed a move, which is an
//! invariant violation, not a user error.

use cadence_ir::Name;
use rustc_hash::FxHashMap;

use crate::errors::{EvalResult, RuntimeError};
use crate::value::Value;

/// The scope stack of one function invocation plus the globals below it.
#[derive(Debug, Default)]
pub struct Environment {
    scopes: Vec<FxHashMap<Name, Value>>,
}

impl Environment {
    pub fn new() -> Self {
        Environment {
            scopes: vec![FxHashMap::default()],
        }
    }

    pub fn push(&mut self) {
        self.scopes.push(FxHashMap::default());
    }

    pub fn pop(&mut self) {
        debug_assert!(self.scopes.len() > 1, "cannot pop the base scope");
        self.scopes.pop();
    }

    /// Bind in the innermost scope.
    pub fn declare(&mut self, name: Name, value: Value) {
        self.scopes
            .last_mut()
            .expect("at least the base scope")
            .insert(name, value);
    }

    /// Read a slot. The checker resolved the name, so a miss is an
    /// internal error; an invalidated slot is a use-after-move.
    pub fn lookup(&self, name: Name) -> EvalResult<Value> {
        for scope in self.scopes.iter().rev() {
            if let Some(value) = scope.get(&name) {
                if matches!(value, Value::InvalidatedResource) {
                    return Err(RuntimeError::UseAfterMoveRuntime);
                }
                return Ok(value.clone());
            }
        }
        Err(RuntimeError::Internal(format!(
            "unbound variable slot {name:?}"
        )))
    }

    /// Overwrite the innermost slot with this name.
    pub fn assign(&mut self, name: Name, value: Value) -> EvalResult<()> {
        for scope in self.scopes.iter_mut().rev() {
            if let Some(slot) = scope.get_mut(&name) {
                *slot = value;
                return Ok(());
            }
        }
        Err(RuntimeError::Internal(format!(
            "assignment to unbound slot {name:?}"
        )))
    }

    /// Read a slot for a move: the value comes out, the invalidated
    /// sentinel goes in.
    pub fn take_for_move(&mut self, name: Name) -> EvalResult<Value> {
        for scope in self.scopes.iter_mut().rev() {
            if let Some(slot) = scope.get_mut(&name) {
                let value = std::mem::replace(slot, Value::InvalidatedResource);
                if matches!(value, Value::InvalidatedResource) {
                    return Err(RuntimeError::UseAfterMoveRuntime);
                }
                return Ok(value);
            }
        }
        Err(RuntimeError::Internal(format!(
            "move from unbound slot {name:?}"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadence_ir::SharedInterner;

    #[test]
    fn test_declare_lookup_assign() {
        let interner = SharedInterner::new();
        let x = interner.intern("x");

        let mut env = Environment::new();
        env.declare(x, Value::int(1));
        assert!(env.lookup(x).unwrap().equals(&Value::int(1)));

        env.assign(x, Value::int(2)).unwrap();
        assert!(env.lookup(x).unwrap().equals(&Value::int(2)));
    }

    #[test]
    fn test_inner_scope_sees_outer() {
        let interner = SharedInterner::new();
        let x = interner.intern("x");

        let mut env = Environment::new();
        env.declare(x, Value::int(1));
        env.push();
        assert!(env.lookup(x).is_ok());
        env.assign(x, Value::int(5)).unwrap();
        env.pop();
        assert!(env.lookup(x).unwrap().equals(&Value::int(5)));
    }

    #[test]
    fn test_move_invalidates_slot() {
        let interner = SharedInterner::new();
        let r = interner.intern("r");

        let mut env = Environment::new();
        env.declare(r, Value::int(7));
        let moved = env.take_for_move(r).unwrap();
        assert!(moved.equals(&Value::int(7)));

        assert_eq!(env.lookup(r).unwrap_err(), RuntimeError::UseAfterMoveRuntime);
        assert_eq!(
            env.take_for_move(r).unwrap_err(),
            RuntimeError::UseAfterMoveRuntime
        );
    }
}
