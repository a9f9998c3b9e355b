//! Resource ownership tracking.
//!
//! Every resource-typed slot is a state-machine token: `Owned → Moved`
//! on a move, `Owned → Destroyed` on destruction, and both terminal
//! states error on any later access. At the end of a scope every tracked
//! resource must have left `Owned`, and control-flow joins require the
//! branches to agree per slot.

use cadence_ir::Name;
use rustc_hash::FxHashMap;

/// Ownership state of one resource slot.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum ResourceState {
    Owned,
    Moved,
    Destroyed,
}

/// Per-scope resource state tables, parallel to the activations.
#[derive(Clone, Debug, Default)]
pub struct ResourceTracker {
    scopes: Vec<FxHashMap<Name, ResourceState>>,
}

impl ResourceTracker {
    pub fn new() -> Self {
        ResourceTracker {
            scopes: vec![FxHashMap::default()],
        }
    }

    pub fn push(&mut self) {
        self.scopes.push(FxHashMap::default());
    }

    /// Pop the innermost scope, returning every slot that is still owned:
    /// those are resource losses at the scope end.
    pub fn pop(&mut self) -> Vec<Name> {
        let scope = self.scopes.pop().unwrap_or_default();
        scope
            .into_iter()
            .filter(|&(_, state)| state == ResourceState::Owned)
            .map(|(name, _)| name)
            .collect()
    }

    /// Track a newly bound resource slot.
    pub fn declare(&mut self, name: Name) {
        self.scopes
            .last_mut()
            .expect("at least one scope")
            .insert(name, ResourceState::Owned);
    }

    /// Current state, innermost-out.
    pub fn state(&self, name: Name) -> Option<ResourceState> {
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| scope.get(&name))
            .copied()
    }

    /// Transition the innermost slot with this name.
    pub fn transition(&mut self, name: Name, state: ResourceState) {
        for scope in self.scopes.iter_mut().rev() {
            if let Some(entry) = scope.get_mut(&name) {
                *entry = state;
                return;
            }
        }
    }

    /// Snapshot all states for branch analysis.
    pub fn snapshot(&self) -> Vec<FxHashMap<Name, ResourceState>> {
        self.scopes.clone()
    }

    /// Restore a snapshot taken before a branch.
    pub fn restore(&mut self, snapshot: Vec<FxHashMap<Name, ResourceState>>) {
        self.scopes = snapshot;
    }

    /// Join two branch outcomes.
    ///
    /// For every slot visible before the branch, both sides must agree on
    /// the end state; disagreeing slots are reported and forced to
    /// `Moved` so checking continues. A side that definitely exited
    /// (returned) imposes no constraint.
    pub fn join(
        &mut self,
        then_states: Vec<FxHashMap<Name, ResourceState>>,
        else_states: Vec<FxHashMap<Name, ResourceState>>,
        then_exits: bool,
        else_exits: bool,
    ) -> Vec<Name> {
        if then_exits && else_exits {
            // Code after the branch is unreachable; keep either side.
            self.scopes = then_states;
            return Vec::new();
        }
        if then_exits {
            self.scopes = else_states;
            return Vec::new();
        }
        if else_exits {
            self.scopes = then_states;
            return Vec::new();
        }

        let mut disagreements = Vec::new();
        let mut joined = Vec::with_capacity(then_states.len());
        for (then_scope, else_scope) in then_states.into_iter().zip(else_states) {
            let mut scope = FxHashMap::default();
            for (name, then_state) in then_scope {
                let else_state = else_scope.get(&name).copied().unwrap_or(then_state);
                if then_state == else_state {
                    scope.insert(name, then_state);
                } else {
                    disagreements.push(name);
                    scope.insert(name, ResourceState::Moved);
                }
            }
            joined.push(scope);
        }
        self.scopes = joined;
        disagreements
    }

    /// Every slot in any scope that is still owned. Used at `return`
    /// statements: returning with a live resource anywhere in the
    /// function is a loss.
    pub fn owned_anywhere(&self) -> Vec<Name> {
        self.scopes
            .iter()
            .flat_map(|scope| {
                scope
                    .iter()
                    .filter(|&(_, &state)| state == ResourceState::Owned)
                    .map(|(&name, _)| name)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadence_ir::SharedInterner;

    #[test]
    fn test_owned_at_pop_is_lost() {
        let interner = SharedInterner::new();
        let r = interner.intern("r");
        let s = interner.intern("s");

        let mut tracker = ResourceTracker::new();
        tracker.push();
        tracker.declare(r);
        tracker.declare(s);
        tracker.transition(r, ResourceState::Moved);

        let lost = tracker.pop();
        assert_eq!(lost, vec![s]);
    }

    #[test]
    fn test_join_disagreement_detected() {
        let interner = SharedInterner::new();
        let r = interner.intern("r");

        let mut tracker = ResourceTracker::new();
        tracker.declare(r);

        let before = tracker.snapshot();
        tracker.transition(r, ResourceState::Destroyed);
        let then_states = tracker.snapshot();
        tracker.restore(before);
        let else_states = tracker.snapshot();

        let disagreements = tracker.join(then_states, else_states, false, false);
        assert_eq!(disagreements, vec![r]);
    }

    #[test]
    fn test_join_ignores_exiting_branch() {
        let interner = SharedInterner::new();
        let r = interner.intern("r");

        let mut tracker = ResourceTracker::new();
        tracker.declare(r);

        let before = tracker.snapshot();
        // then-branch returns without consuming r
        let then_states = tracker.snapshot();
        tracker.restore(before);
        tracker.transition(r, ResourceState::Moved);
        let else_states = tracker.snapshot();

        let disagreements = tracker.join(then_states, else_states, true, false);
        assert!(disagreements.is_empty());
        assert_eq!(tracker.state(r), Some(ResourceState::Moved));
    }
}
