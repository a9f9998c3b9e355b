//! Cadence Typeck - the static checker.
//!
//! The checker walks a program's AST, resolves identifiers through a
//! stack of activations, elaborates a type for every expression, and
//! enforces the rules the interpreter relies on:
//!
//! - resource linearity (owned / moved / destroyed state per slot, with a
//!   join rule at control-flow merges)
//! - access control, including the external-mutation rule for
//!   composite-owned containers
//! - pre-/post-condition well-formedness and `before(...)` snapshots
//! - interface conformance
//!
//! Errors accumulate; the walk never aborts. Offending nodes elaborate to
//! the invalid type, which is assignable in both directions so a single
//! mistake does not cascade.

mod activations;
mod checker;
mod elaboration;
mod resources;

pub use activations::{Activations, Variable};
pub use checker::{check_program, CheckResult, Checker, ImportResolver, NoImports, Phase};
pub use elaboration::{Elaboration, FunctionKey, MemberInfo};
pub use resources::{ResourceState, ResourceTracker};
