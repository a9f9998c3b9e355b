//! The elaboration: the checker's output side table.
//!
//! Maps AST node ids to resolved semantic information. The interpreter
//! reads types, cast targets, and condition snapshots from here and
//! re-checks nothing.

use cadence_ir::{Access, ExprId, Name, StmtId, VariableKind};
use cadence_types::TypeId;
use rustc_hash::FxHashMap;

/// Identity of a function for snapshot bookkeeping: the enclosing
/// composite (if a member) and the function name. Duplicate declarations
/// are rejected, so the pair is unique per program.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct FunctionKey {
    pub composite: Option<Name>,
    pub function: Name,
}

impl FunctionKey {
    pub fn global(function: Name) -> Self {
        FunctionKey {
            composite: None,
            function,
        }
    }

    pub fn member(composite: Name, function: Name) -> Self {
        FunctionKey {
            composite: Some(composite),
            function,
        }
    }
}

/// Resolved member access information.
#[derive(Clone, Debug)]
pub struct MemberInfo {
    /// The composite or interface the member was found on.
    pub owner: TypeId,
    pub ty: TypeId,
    pub access: Access,
    /// `Some` for fields, `None` for functions.
    pub field_kind: Option<VariableKind>,
}

/// Elaborated program facts, keyed by AST node ids.
#[derive(Debug, Default)]
pub struct Elaboration {
    /// Type of every checked expression.
    pub expr_types: FxHashMap<ExprId, TypeId>,
    /// Resolved member accesses.
    pub member_info: FxHashMap<ExprId, MemberInfo>,
    /// Target type of `as?` / `as!` casts, for the runtime check.
    pub cast_targets: FxHashMap<ExprId, TypeId>,
    /// Resolved reference expression types (`&x as &T`).
    pub reference_types: FxHashMap<ExprId, TypeId>,
    /// Declared or inferred type per variable declaration.
    pub variable_types: FxHashMap<StmtId, TypeId>,
    /// Resolved type arguments per invocation (`Type<T>()`, storage API).
    pub type_arguments: FxHashMap<ExprId, Vec<TypeId>>,
    /// Composite and interface types declared by this program.
    pub declared_types: FxHashMap<Name, TypeId>,
    /// Global function types.
    pub function_types: FxHashMap<Name, TypeId>,
    /// `before(...)` snapshot id per invocation expression.
    pub snapshot_ids: FxHashMap<ExprId, u32>,
    /// Snapshot expressions per function, in evaluation order.
    pub snapshots: FxHashMap<FunctionKey, Vec<(u32, ExprId)>>,
    /// Expressions that name a type rather than a value: enum types in
    /// case access, nested composites in `C.Foo()`, constructors.
    pub type_references: FxHashMap<ExprId, TypeId>,
    /// Constructor function type per composite type.
    pub constructor_types: FxHashMap<TypeId, TypeId>,
    /// Interface supplying the default body for a composite function the
    /// composite did not declare itself.
    pub default_implementations: FxHashMap<(TypeId, Name), TypeId>,
}

impl Elaboration {
    pub fn new() -> Self {
        Self::default()
    }

    /// Type of an expression. Untyped means the checker never reached the
    /// node (dead code behind an error); treat as invalid.
    pub fn expr_type(&self, id: ExprId) -> TypeId {
        self.expr_types.get(&id).copied().unwrap_or(TypeId::INVALID)
    }
}
