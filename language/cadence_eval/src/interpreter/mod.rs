//! Tree-walking interpreter for checked programs.
//!
//! The interpreter consumes a program together with the checker's
//! output (pool + elaboration) and re-checks nothing the checker
//! guarantees. The exceptions are capability-mediated accesses, whose
//! borrow types are enforced on every dereference, and the
//! defense-in-depth invariant checks on resource slots.
//!
//! Helper modules split the evaluator by concern:
//!
//! - `expr` - literals, operators, member and index reads, references
//! - `stmt` - statements, blocks, control flow
//! - `call` - function calls, conditions, snapshots, construction and
//!   destruction
//! - `dispatch` - invocation dispatch: builtins, storage API, member
//!   functions
//! - `storage` - account storage and capability resolution

mod call;
mod dispatch;
mod expr;
mod stmt;
mod storage;

use cadence_ir::{
    CompositeDeclaration, CompositeKind, Declaration, FunctionDeclaration, Location, Name,
    Program, SharedInterner,
};
use cadence_typeck::{CheckResult, Elaboration, FunctionKey};
use cadence_types::{StaticType, TypePool};
use rustc_hash::FxHashMap;

use crate::environment::Environment;
use crate::errors::{EvalResult, RuntimeError};
use crate::host::Host;
use crate::metering::MeterGauge;
use crate::value::{CompositeValue, Value};

/// Pre-interned names for hot-path dispatch.
pub(crate) struct RuntimeNames {
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
    pub uuid: Name,
    pub utf8: Name,
    pub decode_string: Name,
    pub decode_list: Name,
    pub aggregate_signatures: Name,
    pub aggregate_public_keys: Name,
    pub verify: Name,
    pub add: Name,
    pub get: Name,
    pub revoke: Name,
    pub public_key: Name,
    pub signature_algorithm: Name,
    pub hash_algorithm: Name,
    pub weight: Name,
    pub is_revoked: Name,
    pub key_index: Name,
    pub signature: Name,
    pub entries: Name,
}

impl RuntimeNames {
    fn new(interner: &SharedInterner) -> Self {
        RuntimeNames {
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
            uuid: interner.intern("uuid"),
            utf8: interner.intern("utf8"),
            decode_string: interner.intern("decodeString"),
            decode_list: interner.intern("decodeList"),
            aggregate_signatures: interner.intern("aggregateSignatures"),
            aggregate_public_keys: interner.intern("aggregatePublicKeys"),
            verify: interner.intern("verify"),
            add: interner.intern("add"),
            get: interner.intern("get"),
            revoke: interner.intern("revoke"),
            public_key: interner.intern("publicKey"),
            signature_algorithm: interner.intern("signatureAlgorithm"),
            hash_algorithm: interner.intern("hashAlgorithm"),
            weight: interner.intern("weight"),
            is_revoked: interner.intern("isRevoked"),
            key_index: interner.intern("keyIndex"),
            signature: interner.intern("signature"),
            entries: interner.intern("entries"),
        }
    }
}

/// The interpreter for one transaction over one checked program.
pub struct Interpreter<'a, H: Host> {
    pub(crate) program: &'a Program,
    pub(crate) pool: TypePool,
    pub(crate) elaboration: Elaboration,
    pub(crate) interner: SharedInterner,
    pub(crate) host: H,
    pub(crate) gauge: MeterGauge,
    pub(crate) environment: Environment,
    /// Contract instances and builtin contract singletons.
    pub(crate) globals: FxHashMap<Name, Value>,
    /// `before(...)` snapshot frames, one per active call.
    pub(crate) snapshots: Vec<FxHashMap<u32, Value>>,
    pub(crate) names: RuntimeNames,
    /// Function declarations by key, including interface defaults.
    pub(crate) functions: FxHashMap<FunctionKey, &'a FunctionDeclaration>,
    /// Composite declarations by qualified name.
    pub(crate) composites: FxHashMap<Name, &'a CompositeDeclaration>,
}

impl<'a, H: Host> Interpreter<'a, H> {
    /// Build an interpreter over a checked program and run contract
    /// initializers.
    ///
    /// The check result must come from checking this very program with
    /// this interner; the host convention is that execution only starts
    /// with zero check errors.
    pub fn new(
        program: &'a Program,
        check_result: CheckResult,
        interner: SharedInterner,
        host: H,
        gauge: MeterGauge,
    ) -> EvalResult<Self> {
        let CheckResult {
            pool, elaboration, ..
        } = check_result;
        let names = RuntimeNames::new(&interner);

        let mut functions = FxHashMap::default();
        let mut composites = FxHashMap::default();
        for declaration in &program.declarations {
            match declaration {
                Declaration::Function(decl) => {
                    functions.insert(FunctionKey::global(decl.name), decl);
                }
                Declaration::Composite(decl) => {
                    index_composite(decl, None, &interner, &mut functions, &mut composites);
                }
                Declaration::Interface(decl) => {
                    for function in &decl.functions {
                        if function.body.is_some() {
                            functions
                                .insert(FunctionKey::member(decl.name, function.name), function);
                        }
                    }
                }
            }
        }

        let mut interpreter = Interpreter {
            program,
            pool,
            elaboration,
            interner,
            host,
            gauge,
            environment: Environment::new(),
            globals: FxHashMap::default(),
            snapshots: Vec::new(),
            names,
            functions,
            composites,
        };
        interpreter.bind_builtin_contracts();
        interpreter.load_contracts()?;
        Ok(interpreter)
    }

    /// Invoke a global function by name with pre-built argument values.
    #[tracing::instrument(level = "debug", skip_all, fields(function = name))]
    pub fn invoke(&mut self, name: &str, arguments: Vec<Value>) -> EvalResult<Value> {
        let name = self.interner.intern(name);
        let key = FunctionKey::global(name);
        let Some(decl) = self.functions.get(&key).copied() else {
            return Err(RuntimeError::Internal(format!(
                "no function `{}`",
                self.interner.lookup(name)
            )));
        };
        self.call_declared(decl, key, None, arguments)
    }

    /// The host driving this interpreter; tests inspect events and
    /// storage through it.
    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn gauge(&self) -> &MeterGauge {
        &self.gauge
    }

    /// An `AuthAccount` value for an address, handed to invoked
    /// functions by the transaction driver.
    pub fn auth_account(&mut self, address: [u8; 8]) -> Value {
        self.account_value("AuthAccount", address)
    }

    /// A `PublicAccount` value for an address.
    pub fn public_account(&mut self, address: [u8; 8]) -> Value {
        self.account_value("PublicAccount", address)
    }

    fn account_value(&mut self, type_name: &str, address: [u8; 8]) -> Value {
        let name = self.interner.intern(type_name);
        let type_id = self
            .pool
            .lookup_nominal(&Location::Builtin, name)
            .expect("builtin account types are pre-declared");
        Value::composite(CompositeValue::new(
            Location::Builtin,
            type_name,
            CompositeKind::Structure,
            type_id,
            vec![(self.names.address, Value::Address(address))],
        ))
    }

    /// Builtin contract singletons: `RLP`, `BLS`, `Crypto`.
    fn bind_builtin_contracts(&mut self) {
        for type_name in ["RLP", "BLS", "Crypto"] {
            let name = self.interner.intern(type_name);
            let Some(type_id) = self.pool.lookup_nominal(&Location::Builtin, name) else {
                continue;
            };
            let value = Value::composite(CompositeValue::new(
                Location::Builtin,
                type_name,
                CompositeKind::Contract,
                type_id,
                Vec::new(),
            ));
            self.globals.insert(name, value);
        }
    }

    /// Instantiate contract declarations: run each initializer and bind
    /// the instance globally.
    fn load_contracts(&mut self) -> EvalResult<()> {
        let program = self.program;
        for declaration in &program.declarations {
            let Declaration::Composite(decl) = declaration else {
                continue;
            };
            if decl.kind != CompositeKind::Contract {
                continue;
            }
            let Some(type_id) = self
                .pool
                .lookup_nominal(&program.location, decl.name)
            else {
                continue;
            };
            tracing::debug!(contract = %self.interner.lookup(decl.name), "instantiating contract");
            let value = self.construct_composite(type_id, Vec::new())?;
            self.globals.insert(decl.name, value);
        }
        Ok(())
    }

    /// The static form of a pool type, for values that carry one.
    pub(crate) fn static_type_of(&self, id: cadence_types::TypeId) -> StaticType {
        StaticType::from_type(&self.pool, id)
    }

    /// Transfer a value into a new slot: resources move as-is,
    /// non-resource containers copy (value semantics).
    pub(crate) fn transferred(&self, value: Value) -> Value {
        if value.is_resource_kinded() {
            value
        } else {
            value.deep_copy()
        }
    }

    /// Bump the referent's move version so outstanding ephemeral
    /// references die with the move.
    pub(crate) fn bump_transfer(&self, value: &Value) {
        match value {
            Value::Composite(composite) => composite.borrow_mut().transfer_count += 1,
            Value::Array(array) => array.borrow_mut().transfer_count += 1,
            Value::Dictionary(dictionary) => dictionary.borrow_mut().transfer_count += 1,
            _ => {}
        }
    }
}

fn index_composite<'a>(
    decl: &'a CompositeDeclaration,
    outer: Option<&str>,
    interner: &SharedInterner,
    functions: &mut FxHashMap<FunctionKey, &'a FunctionDeclaration>,
    composites: &mut FxHashMap<Name, &'a CompositeDeclaration>,
) {
    let qualified_string = match outer {
        Some(outer) => format!("{outer}.{}", interner.lookup(decl.name)),
        None => interner.lookup(decl.name),
    };
    let qualified = interner.intern(&qualified_string);
    composites.insert(qualified, decl);
    for function in &decl.functions {
        functions.insert(FunctionKey::member(qualified, function.name), function);
    }
    if decl.kind == CompositeKind::Contract {
        for nested in &decl.nested_composites {
            index_composite(
                nested,
                Some(&qualified_string),
                interner,
                functions,
                composites,
            );
        }
    }
}
