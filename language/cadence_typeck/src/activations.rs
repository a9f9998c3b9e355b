//! Activations: the checker's lexical scope stack.
//!
//! Each activation maps identifiers to variable records. Type
//! declarations are hoisted within their scope; value declarations are
//! ordered, so a variable becomes visible only after its declaration is
//! checked.

use cadence_ir::{Name, VariableKind};
use cadence_types::TypeId;
use rustc_hash::FxHashMap;

/// One resolved variable.
#[derive(Clone, Debug)]
pub struct Variable {
    pub ty: TypeId,
    pub kind: VariableKind,
    /// Activation depth at declaration; 0 is the global scope.
    pub depth: usize,
}

/// The scope stack.
#[derive(Debug, Default)]
pub struct Activations {
    scopes: Vec<FxHashMap<Name, Variable>>,
}

impl Activations {
    /// A fresh stack with the global activation pushed.
    pub fn new() -> Self {
        Activations {
            scopes: vec![FxHashMap::default()],
        }
    }

    pub fn push(&mut self) {
        self.scopes.push(FxHashMap::default());
    }

    pub fn pop(&mut self) {
        debug_assert!(self.scopes.len() > 1, "cannot pop the global activation");
        self.scopes.pop();
    }

    /// Current activation depth; 0 is global.
    pub fn depth(&self) -> usize {
        self.scopes.len() - 1
    }

    /// Declare in the current activation.
    ///
    /// Returns `false` if the name is already declared at this level; the
    /// caller reports the duplicate.
    pub fn declare(&mut self, name: Name, ty: TypeId, kind: VariableKind) -> bool {
        let depth = self.depth();
        let scope = self.scopes.last_mut().expect("at least the global scope");
        if scope.contains_key(&name) {
            return false;
        }
        scope.insert(name, Variable { ty, kind, depth });
        true
    }

    /// Declare into the global activation regardless of depth.
    pub fn declare_global(&mut self, name: Name, ty: TypeId, kind: VariableKind) -> bool {
        let scope = &mut self.scopes[0];
        if scope.contains_key(&name) {
            return false;
        }
        scope.insert(name, Variable { ty, kind, depth: 0 });
        true
    }

    /// Innermost-out lookup.
    pub fn lookup(&self, name: Name) -> Option<&Variable> {
        self.scopes.iter().rev().find_map(|scope| scope.get(&name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadence_ir::SharedInterner;

    #[test]
    fn test_shadowing_across_scopes() {
        let interner = SharedInterner::new();
        let x = interner.intern("x");

        let mut activations = Activations::new();
        assert!(activations.declare(x, TypeId::INT, VariableKind::Let));
        activations.push();
        assert!(activations.declare(x, TypeId::BOOL, VariableKind::Let));
        assert_eq!(activations.lookup(x).unwrap().ty, TypeId::BOOL);
        activations.pop();
        assert_eq!(activations.lookup(x).unwrap().ty, TypeId::INT);
    }

    #[test]
    fn test_duplicate_in_same_scope_rejected() {
        let interner = SharedInterner::new();
        let x = interner.intern("x");

        let mut activations = Activations::new();
        assert!(activations.declare(x, TypeId::INT, VariableKind::Let));
        assert!(!activations.declare(x, TypeId::INT, VariableKind::Var));
    }
}
