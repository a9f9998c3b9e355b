//! The checker: multi-pass static analysis.
//!
//! `check_program` runs the phases in order:
//!
//! 1. **Declared** - builtin types, imports, and the program's own
//!    nominal declarations are interned into the pool. Types are hoisted:
//!    order between declarations does not matter.
//! 2. **Elaborated** - every function body is walked; each expression
//!    gets a type, each resource slot a state machine.
//! 3. **Finalized** - conformance witnesses and whole-declaration checks
//!    (initializer completeness, destructor legality) run last.
//!
//! Every error is recorded with a position and checking continues; the
//! phase result is `Failed` only in the sense that the diagnostics carry
//! at least one error.

mod annotations;
mod conformance;
mod declarations;
mod expressions;
mod members;
mod statements;

#[cfg(test)]
mod tests;

use cadence_diagnostic::{Diagnostic, Diagnostics, ErrorCode};
use cadence_ir::{
    ConditionKind, Location, Name, Program, SharedInterner, Span,
};
use cadence_types::{TypeId, TypePool};
use rustc_hash::FxHashMap;

use crate::activations::Activations;
use crate::elaboration::{Elaboration, FunctionKey};
use crate::resources::ResourceTracker;

/// Checker phase, in order.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub enum Phase {
    Pending,
    Declared,
    Elaborated,
    Finalized,
}

/// Resolves `import` locations to previously checked programs.
pub trait ImportResolver {
    fn resolve(&self, location: &Location) -> Option<&Program>;
}

/// The empty resolver: every import fails.
#[derive(Debug, Default)]
pub struct NoImports;

impl ImportResolver for NoImports {
    fn resolve(&self, _location: &Location) -> Option<&Program> {
        None
    }
}

/// Everything a checking run produces.
pub struct CheckResult {
    pub pool: TypePool,
    pub elaboration: Elaboration,
    pub diagnostics: Diagnostics,
}

impl CheckResult {
    /// Whether the host may hand the program to the interpreter.
    pub fn is_ready(&self) -> bool {
        !self.diagnostics.has_errors()
    }
}

/// Pre-interned names the checker compares against on hot paths.
pub(crate) struct WellKnownNames {
    pub self_: Name,
    pub result: Name,
    pub before: Name,
    pub panic: Name,
    pub assert: Name,
    pub unsafe_random: Name,
    pub type_: Name,
    pub get_type: Name,
    pub is_instance: Name,
    pub is_subtype: Name,
    pub length: Name,
    pub append: Name,
    pub concat: Name,
    pub contains: Name,
    pub remove: Name,
    pub insert: Name,
    pub keys: Name,
    pub values: Name,
    pub contains_key: Name,
    pub raw_value: Name,
    pub address: Name,
    pub save: Name,
    pub load: Name,
    pub copy: Name,
    pub borrow: Name,
    pub link: Name,
    pub unlink: Name,
    pub get_capability: Name,
    pub check: Name,
}

impl WellKnownNames {
    fn new(interner: &SharedInterner) -> Self {
        WellKnownNames {
            self_: interner.intern("self"),
            result: interner.intern("result"),
            before: interner.intern("before"),
            panic: interner.intern("panic"),
            assert: interner.intern("assert"),
            unsafe_random: interner.intern("unsafeRandom"),
            type_: interner.intern("Type"),
            get_type: interner.intern("getType"),
            is_instance: interner.intern("isInstance"),
            is_subtype: interner.intern("isSubtype"),
            length: interner.intern("length"),
            append: interner.intern("append"),
            concat: interner.intern("concat"),
            contains: interner.intern("contains"),
            remove: interner.intern("remove"),
            insert: interner.intern("insert"),
            keys: interner.intern("keys"),
            values: interner.intern("values"),
            contains_key: interner.intern("containsKey"),
            raw_value: interner.intern("rawValue"),
            address: interner.intern("address"),
            save: interner.intern("save"),
            load: interner.intern("load"),
            copy: interner.intern("copy"),
            borrow: interner.intern("borrow"),
            link: interner.intern("link"),
            unlink: interner.intern("unlink"),
            get_capability: interner.intern("getCapability"),
            check: interner.intern("check"),
        }
    }
}

/// Builtin composite types, declared once per run.
#[derive(Copy, Clone)]
pub(crate) struct BuiltinTypes {
    pub auth_account: TypeId,
    pub public_account: TypeId,
    pub public_key: TypeId,
    pub signature_algorithm: TypeId,
    pub hash_algorithm: TypeId,
    pub rlp: TypeId,
    pub bls: TypeId,
    pub crypto: TypeId,
}

/// The checker.
pub struct Checker<'a> {
    pub(crate) program: &'a Program,
    pub(crate) pool: TypePool,
    pub(crate) interner: SharedInterner,
    pub(crate) diagnostics: Diagnostics,
    pub(crate) elaboration: Elaboration,
    pub(crate) activations: Activations,
    pub(crate) resources: ResourceTracker,
    pub(crate) imports: &'a dyn ImportResolver,
    pub(crate) phase: Phase,
    pub(crate) names: WellKnownNames,
    pub(crate) builtins: BuiltinTypes,

    // Walk context.
    /// Type of `self` inside a composite member.
    pub(crate) current_composite: Option<TypeId>,
    /// Name of the enclosing contract declaration, if any.
    pub(crate) current_contract: Option<Name>,
    pub(crate) current_return_type: Option<TypeId>,
    pub(crate) current_function: Option<FunctionKey>,
    pub(crate) in_initializer: bool,
    pub(crate) condition_context: Option<ConditionKind>,
    pub(crate) next_snapshot_id: u32,
    /// Fields assigned so far in the current initializer.
    pub(crate) initialized_fields: Vec<Name>,
    /// Expressions that resolve to a type, not a value.
    pub(crate) type_references: FxHashMap<cadence_ir::ExprId, TypeId>,
    /// While filling an imported declaration, nominal resolution runs
    /// against the imported location instead of the program's.
    pub(crate) import_location: Option<Location>,
    /// Declaration spans of tracked resource slots, for loss reports.
    pub(crate) resource_spans: FxHashMap<Name, Span>,
    /// Builtin primitive type names (`Int`, `Bool`, `AnyResource`, ...).
    pub(crate) primitive_types: FxHashMap<Name, TypeId>,
}

/// Intern the primitive type names once per run.
fn primitive_type_names(
    interner: &SharedInterner,
    pool: &TypePool,
) -> FxHashMap<Name, TypeId> {
    use cadence_types::NumericType;
    let mut names = FxHashMap::default();
    let fixed = [
        ("Void", TypeId::VOID),
        ("Never", TypeId::NEVER),
        ("Bool", TypeId::BOOL),
        ("String", TypeId::STRING),
        ("Character", TypeId::CHARACTER),
        ("Address", TypeId::ADDRESS),
        ("Path", TypeId::PATH),
        ("StoragePath", TypeId::STORAGE_PATH),
        ("CapabilityPath", TypeId::CAPABILITY_PATH),
        ("PrivatePath", TypeId::PRIVATE_PATH),
        ("PublicPath", TypeId::PUBLIC_PATH),
        ("AnyStruct", TypeId::ANY_STRUCT),
        ("AnyResource", TypeId::ANY_RESOURCE),
        ("Type", TypeId::META_TYPE),
    ];
    for (name, id) in fixed {
        names.insert(interner.intern(name), id);
    }
    for numeric in NumericType::ALL {
        names.insert(interner.intern(numeric.name()), pool.numeric_id(numeric));
    }
    names
}

/// Check a program against an import resolver.
#[tracing::instrument(level = "debug", skip_all, fields(location = %program.location))]
pub fn check_program(
    program: &Program,
    interner: SharedInterner,
    imports: &dyn ImportResolver,
) -> CheckResult {
    let mut checker = Checker::new(program, interner, imports);
    checker.run();
    let Checker {
        pool,
        mut elaboration,
        diagnostics,
        type_references,
        ..
    } = checker;
    elaboration.type_references = type_references;
    CheckResult {
        pool,
        elaboration,
        diagnostics,
    }
}

impl<'a> Checker<'a> {
    pub fn new(
        program: &'a Program,
        interner: SharedInterner,
        imports: &'a dyn ImportResolver,
    ) -> Self {
        let mut pool = TypePool::new(interner.clone());
        let names = WellKnownNames::new(&interner);
        let builtins = declarations::declare_builtins(&mut pool, &interner);
        let primitive_types = primitive_type_names(&interner, &pool);
        Checker {
            program,
            pool,
            interner,
            diagnostics: Diagnostics::new(),
            elaboration: Elaboration::new(),
            activations: Activations::new(),
            resources: ResourceTracker::new(),
            imports,
            phase: Phase::Pending,
            names,
            builtins,
            current_composite: None,
            current_contract: None,
            current_return_type: None,
            current_function: None,
            in_initializer: false,
            condition_context: None,
            next_snapshot_id: 0,
            initialized_fields: Vec::new(),
            type_references: FxHashMap::default(),
            import_location: None,
            resource_spans: FxHashMap::default(),
            primitive_types,
        }
    }

    fn run(&mut self) {
        self.declare_globals();
        self.phase = Phase::Declared;
        tracing::debug!(phase = ?self.phase, "declaration pass complete");

        self.elaborate_bodies();
        self.phase = Phase::Elaborated;
        tracing::debug!(phase = ?self.phase, "elaboration pass complete");

        self.finalize();
        self.phase = Phase::Finalized;
        tracing::debug!(
            phase = ?self.phase,
            errors = self.diagnostics.error_count(),
            "checking finished"
        );
    }

    // Shared helpers.

    pub(crate) fn report(&mut self, code: ErrorCode, span: Span, message: impl Into<String>) {
        self.diagnostics
            .push(Diagnostic::error(code).with_label(span, "").with_message(message));
    }

    /// Render a type for a message.
    pub(crate) fn display(&self, ty: TypeId) -> String {
        self.pool.display(ty)
    }

    /// Look up a nominal type: the active location first (the imported
    /// one while filling imported declarations), then builtins.
    pub(crate) fn resolve_nominal(&self, name: Name) -> Option<TypeId> {
        let location = self
            .import_location
            .as_ref()
            .unwrap_or(&self.program.location);
        self.pool
            .lookup_nominal(location, name)
            .or_else(|| self.pool.lookup_nominal(&Location::Builtin, name))
    }

    /// Qualified name for a composite nested in a contract: `C.Foo`.
    pub(crate) fn qualified(&self, outer: Name, inner: Name) -> Name {
        let qualified = format!(
            "{}.{}",
            self.interner.lookup(outer),
            self.interner.lookup(inner)
        );
        self.interner.intern(&qualified)
    }
}
