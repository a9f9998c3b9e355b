//! The declaration pass: builtins, imports, and the program's own
//! nominal declarations.
//!
//! Types are hoisted: every composite and interface is declared as a
//! shell first, then members are filled in, so mutually recursive
//! declarations resolve regardless of order.

use cadence_diagnostic::ErrorCode;
use cadence_ir::{
    Access, CompositeDeclaration, CompositeKind, Declaration, FunctionDeclaration,
    InterfaceDeclaration, Location, Name, SharedInterner, VariableKind,
};
use cadence_types::{
    CompositeData, FieldMember, FunctionMember, InterfaceData, TypeId, TypePool,
};
use rustc_hash::FxHashSet;

use super::{BuiltinTypes, Checker};

/// Declare the builtin composite types into a fresh pool.
pub(crate) fn declare_builtins(pool: &mut TypePool, interner: &SharedInterner) -> BuiltinTypes {
    let let_field = |name: Name, ty: TypeId| FieldMember {
        name,
        access: Access::Public,
        kind: VariableKind::Let,
        ty,
    };

    let bytes = pool.variable_array(TypeId::UINT8);
    let bytes_array = pool.variable_array(bytes);

    // Enums first: PublicKey members reference them.
    let signature_algorithm = declare_builtin_enum(
        pool,
        interner,
        "SignatureAlgorithm",
        &["ECDSA_P256", "ECDSA_secp256k1", "BLS_BLS12_381"],
    );
    let hash_algorithm = declare_builtin_enum(
        pool,
        interner,
        "HashAlgorithm",
        &["SHA2_256", "SHA2_384", "SHA3_256", "SHA3_384", "KMAC128_BLS_BLS12_381"],
    );

    // PublicKey: host-provided simple composite.
    let public_key = pool.declare_composite(CompositeData {
        location: Location::Builtin,
        name: interner.intern("PublicKey"),
        kind: CompositeKind::Structure,
        fields: vec![
            let_field(interner.intern("publicKey"), bytes),
            let_field(interner.intern("signatureAlgorithm"), signature_algorithm),
        ],
        functions: Vec::new(),
        conformances: Vec::new(),
        raw_type: None,
        case_names: Vec::new(),
    });
    let verify_ty = pool.function(
        vec![bytes, bytes, TypeId::STRING, hash_algorithm],
        TypeId::BOOL,
    );
    if let Some(cid) = pool.as_composite(public_key) {
        pool.composite_data_mut(cid).functions.push(FunctionMember {
            name: interner.intern("verify"),
            access: Access::Public,
            ty: verify_ty,
        });
    }

    // Accounts: `address` is an ordinary field, the storage API members
    // are resolved specially (they are generic over a type argument).
    let auth_account = pool.declare_composite(CompositeData {
        location: Location::Builtin,
        name: interner.intern("AuthAccount"),
        kind: CompositeKind::Structure,
        fields: vec![let_field(interner.intern("address"), TypeId::ADDRESS)],
        functions: Vec::new(),
        conformances: Vec::new(),
        raw_type: None,
        case_names: Vec::new(),
    });
    let public_account = pool.declare_composite(CompositeData {
        location: Location::Builtin,
        name: interner.intern("PublicAccount"),
        kind: CompositeKind::Structure,
        fields: vec![let_field(interner.intern("address"), TypeId::ADDRESS)],
        functions: Vec::new(),
        conformances: Vec::new(),
        raw_type: None,
        case_names: Vec::new(),
    });

    // Builtin contracts accessible without import.
    let decode_string_ty = pool.function(vec![bytes], bytes);
    let decode_list_ty = pool.function(vec![bytes], bytes_array);
    let rlp = pool.declare_composite(CompositeData {
        location: Location::Builtin,
        name: interner.intern("RLP"),
        kind: CompositeKind::Contract,
        fields: Vec::new(),
        functions: vec![
            FunctionMember {
                name: interner.intern("decodeString"),
                access: Access::Public,
                ty: decode_string_ty,
            },
            FunctionMember {
                name: interner.intern("decodeList"),
                access: Access::Public,
                ty: decode_list_ty,
            },
        ],
        conformances: Vec::new(),
        raw_type: None,
        case_names: Vec::new(),
    });

    let public_keys = pool.variable_array(public_key);
    let optional_bytes = pool.optional(bytes);
    let optional_public_key = pool.optional(public_key);
    let aggregate_signatures_ty = pool.function(vec![bytes_array], optional_bytes);
    let aggregate_public_keys_ty = pool.function(vec![public_keys], optional_public_key);
    let bls = pool.declare_composite(CompositeData {
        location: Location::Builtin,
        name: interner.intern("BLS"),
        kind: CompositeKind::Contract,
        fields: Vec::new(),
        functions: vec![
            FunctionMember {
                name: interner.intern("aggregateSignatures"),
                access: Access::Public,
                ty: aggregate_signatures_ty,
            },
            FunctionMember {
                name: interner.intern("aggregatePublicKeys"),
                access: Access::Public,
                ty: aggregate_public_keys_ty,
            },
        ],
        conformances: Vec::new(),
        raw_type: None,
        case_names: Vec::new(),
    });

    let crypto = declare_crypto_contract(pool, interner, public_key, hash_algorithm, bytes);

    BuiltinTypes {
        auth_account,
        public_account,
        public_key,
        signature_algorithm,
        hash_algorithm,
        rlp,
        bls,
        crypto,
    }
}

fn declare_builtin_enum(
    pool: &mut TypePool,
    interner: &SharedInterner,
    name: &str,
    cases: &[&str],
) -> TypeId {
    pool.declare_composite(CompositeData {
        location: Location::Builtin,
        name: interner.intern(name),
        kind: CompositeKind::Enum,
        fields: Vec::new(),
        functions: Vec::new(),
        conformances: Vec::new(),
        raw_type: Some(TypeId::UINT8),
        case_names: cases.iter().map(|c| interner.intern(c)).collect(),
    })
}

/// `Crypto` with its nested key-list types, registered under qualified
/// names (`Crypto.KeyList`, ...).
fn declare_crypto_contract(
    pool: &mut TypePool,
    interner: &SharedInterner,
    public_key: TypeId,
    hash_algorithm: TypeId,
    bytes: TypeId,
) -> TypeId {
    let let_field = |name: &str, ty: TypeId| FieldMember {
        name: interner.intern(name),
        access: Access::Public,
        kind: VariableKind::Let,
        ty,
    };

    let key_list_entry = pool.declare_composite(CompositeData {
        location: Location::Builtin,
        name: interner.intern("Crypto.KeyListEntry"),
        kind: CompositeKind::Structure,
        fields: vec![
            let_field("keyIndex", TypeId::INT),
            let_field("publicKey", public_key),
            let_field("hashAlgorithm", hash_algorithm),
            let_field("weight", TypeId::UFIX64),
            let_field("isRevoked", TypeId::BOOL),
        ],
        functions: Vec::new(),
        conformances: Vec::new(),
        raw_type: None,
        case_names: Vec::new(),
    });

    let key_list_signature = pool.declare_composite(CompositeData {
        location: Location::Builtin,
        name: interner.intern("Crypto.KeyListSignature"),
        kind: CompositeKind::Structure,
        fields: vec![
            let_field("keyIndex", TypeId::INT),
            let_field("signature", bytes),
        ],
        functions: Vec::new(),
        conformances: Vec::new(),
        raw_type: None,
        case_names: Vec::new(),
    });

    let optional_entry = pool.optional(key_list_entry);
    let add_ty = pool.function(vec![public_key, hash_algorithm, TypeId::UFIX64], key_list_entry);
    let get_ty = pool.function(vec![TypeId::INT], optional_entry);
    let revoke_ty = pool.function(vec![TypeId::INT], TypeId::VOID);
    let signatures = pool.variable_array(key_list_signature);
    let verify_ty = pool.function(vec![signatures, bytes], TypeId::BOOL);
    pool.declare_composite(CompositeData {
        location: Location::Builtin,
        name: interner.intern("Crypto.KeyList"),
        kind: CompositeKind::Structure,
        fields: Vec::new(),
        functions: vec![
            FunctionMember {
                name: interner.intern("add"),
                access: Access::Public,
                ty: add_ty,
            },
            FunctionMember {
                name: interner.intern("get"),
                access: Access::Public,
                ty: get_ty,
            },
            FunctionMember {
                name: interner.intern("revoke"),
                access: Access::Public,
                ty: revoke_ty,
            },
            FunctionMember {
                name: interner.intern("verify"),
                access: Access::Public,
                ty: verify_ty,
            },
        ],
        conformances: Vec::new(),
        raw_type: None,
        case_names: Vec::new(),
    });

    pool.declare_composite(CompositeData {
        location: Location::Builtin,
        name: interner.intern("Crypto"),
        kind: CompositeKind::Contract,
        fields: Vec::new(),
        functions: Vec::new(),
        conformances: Vec::new(),
        raw_type: None,
        case_names: Vec::new(),
    })
}

impl Checker<'_> {
    /// Phase 1: declare everything nominal and bind global values.
    pub(crate) fn declare_globals(&mut self) {
        self.bind_builtin_values();

        let program = self.program;
        for import in &program.imports {
            self.declare_import(import);
        }

        // Shells first: declarations may reference each other.
        for declaration in &program.declarations {
            match declaration {
                Declaration::Composite(decl) => {
                    self.declare_composite_shell(decl, program.location.clone(), None);
                }
                Declaration::Interface(decl) => {
                    self.declare_interface_shell(decl, program.location.clone());
                }
                Declaration::Function(_) => {}
            }
        }

        for declaration in &program.declarations {
            match declaration {
                Declaration::Composite(decl) => {
                    self.fill_composite(decl, None);
                    if decl.kind == CompositeKind::Contract {
                        // The contract declaration also binds the contract
                        // value globally.
                        if let Some(ty) = self.resolve_nominal(decl.name) {
                            self.declare_global_value(decl.name, ty, decl.span);
                        }
                    }
                }
                Declaration::Interface(decl) => self.fill_interface(decl),
                Declaration::Function(decl) => self.declare_global_function(decl),
            }
        }
    }

    fn bind_builtin_values(&mut self) {
        let names = [
            (self.interner.intern("RLP"), self.builtins.rlp),
            (self.interner.intern("BLS"), self.builtins.bls),
            (self.interner.intern("Crypto"), self.builtins.crypto),
        ];
        for (name, ty) in names {
            self.activations.declare_global(name, ty, VariableKind::Let);
        }

        let panic_ty = self.pool.function(vec![TypeId::STRING], TypeId::NEVER);
        let optional_string = self.pool.optional(TypeId::STRING);
        let assert_ty = self
            .pool
            .function(vec![TypeId::BOOL, optional_string], TypeId::VOID);
        let unsafe_random_ty = self.pool.function(vec![], TypeId::UINT64);
        let builtins = [
            (self.names.panic, panic_ty),
            (self.names.assert, assert_ty),
            (self.names.unsafe_random, unsafe_random_ty),
        ];
        for (name, ty) in builtins {
            self.activations.declare_global(name, ty, VariableKind::Let);
        }

        // Constructible builtins.
        let bytes = self.pool.variable_array(TypeId::UINT8);
        let public_key_ctor = self
            .pool
            .function(vec![bytes, self.builtins.signature_algorithm], self.builtins.public_key);
        self.elaboration
            .constructor_types
            .insert(self.builtins.public_key, public_key_ctor);

        let key_list_name = self.interner.intern("Crypto.KeyList");
        let signature_name = self.interner.intern("Crypto.KeyListSignature");
        if let Some(key_list) = self.pool.lookup_nominal(&Location::Builtin, key_list_name) {
            let ctor = self.pool.function(vec![], key_list);
            self.elaboration.constructor_types.insert(key_list, ctor);
        }
        if let Some(signature) = self.pool.lookup_nominal(&Location::Builtin, signature_name) {
            let ctor = self.pool.function(vec![TypeId::INT, bytes], signature);
            self.elaboration.constructor_types.insert(signature, ctor);
        }
    }

    fn declare_import(&mut self, import: &cadence_ir::ImportDeclaration) {
        let resolver = self.imports;
        let Some(imported) = resolver.resolve(&import.location) else {
            self.report(
                ErrorCode::C1003,
                import.span,
                format!("cannot resolve import of `{}`", import.location),
            );
            return;
        };

        for declaration in &imported.declarations {
            match declaration {
                Declaration::Composite(decl) => {
                    self.declare_composite_shell(decl, import.location.clone(), None);
                }
                Declaration::Interface(decl) => {
                    self.declare_interface_shell(decl, import.location.clone());
                }
                Declaration::Function(_) => {}
            }
        }
        for declaration in &imported.declarations {
            match declaration {
                Declaration::Composite(decl) => self.fill_imported_composite(decl, import),
                Declaration::Interface(decl) => self.fill_interface(decl),
                Declaration::Function(_) => {}
            }
        }

        for &identifier in &import.identifiers {
            let Some(ty) = self.pool.lookup_nominal(&import.location, identifier) else {
                self.report(
                    ErrorCode::C1001,
                    import.span,
                    format!(
                        "`{}` is not declared by `{}`",
                        self.interner.lookup(identifier),
                        import.location
                    ),
                );
                continue;
            };
            self.declare_global_value(identifier, ty, import.span);
        }
    }

    fn fill_imported_composite(
        &mut self,
        decl: &CompositeDeclaration,
        import: &cadence_ir::ImportDeclaration,
    ) {
        // Members of imported composites resolve against the imported
        // location, so swap the nominal-resolution context.
        let saved = self.import_location.replace(import.location.clone());
        self.fill_composite(decl, None);
        self.import_location = saved;
    }

    pub(crate) fn declare_composite_shell(
        &mut self,
        decl: &CompositeDeclaration,
        location: Location,
        outer: Option<Name>,
    ) {
        let name = match outer {
            Some(outer) => self.qualified(outer, decl.name),
            None => decl.name,
        };
        if self.pool.lookup_nominal(&location, name).is_some() {
            self.report(
                ErrorCode::C1002,
                decl.span,
                format!("`{}` is already declared", self.interner.lookup(decl.name)),
            );
            return;
        }
        let ty = self.pool.declare_composite(CompositeData {
            location: location.clone(),
            name,
            kind: decl.kind,
            fields: Vec::new(),
            functions: Vec::new(),
            conformances: Vec::new(),
            raw_type: None,
            case_names: decl.enum_cases.iter().map(|c| c.name).collect(),
        });
        self.elaboration.declared_types.insert(name, ty);

        if decl.kind == CompositeKind::Contract {
            for nested in &decl.nested_composites {
                self.declare_composite_shell(nested, location.clone(), Some(decl.name));
            }
        }
    }

    fn declare_interface_shell(&mut self, decl: &InterfaceDeclaration, location: Location) {
        if self.pool.lookup_nominal(&location, decl.name).is_some() {
            self.report(
                ErrorCode::C1002,
                decl.span,
                format!("`{}` is already declared", self.interner.lookup(decl.name)),
            );
            return;
        }
        let ty = self.pool.declare_interface(InterfaceData {
            location,
            name: decl.name,
            kind: decl.kind,
            fields: Vec::new(),
            functions: Vec::new(),
            default_functions: FxHashSet::default(),
        });
        self.elaboration.declared_types.insert(decl.name, ty);
    }

    pub(crate) fn fill_composite(&mut self, decl: &CompositeDeclaration, outer: Option<Name>) {
        let name = match outer {
            Some(outer) => self.qualified(outer, decl.name),
            None => decl.name,
        };
        let Some(ty) = self.resolve_nominal(name) else {
            return; // duplicate shell, already reported
        };
        let Some(cid) = self.pool.as_composite(ty) else {
            return;
        };

        let saved_contract = self.current_contract;
        if decl.kind == CompositeKind::Contract {
            self.current_contract = Some(decl.name);
        } else if outer.is_some() {
            self.current_contract = outer;
        }

        // Fields.
        let mut fields = Vec::with_capacity(decl.fields.len());
        for field in &decl.fields {
            let field_ty = self.resolve_annotation(&field.type_annotation);
            if self.pool.is_resource(field_ty) {
                match decl.kind {
                    CompositeKind::Structure => self.report(
                        ErrorCode::C3006,
                        field.span,
                        format!(
                            "struct field `{}` cannot hold a resource",
                            self.interner.lookup(field.name)
                        ),
                    ),
                    CompositeKind::Event => self.report(
                        ErrorCode::C2015,
                        field.span,
                        "event fields cannot be resources".to_string(),
                    ),
                    _ => {}
                }
            }
            if decl.kind == CompositeKind::Event
                && field_ty != TypeId::INVALID
                && !self.pool.is_storable(field_ty)
            {
                self.report(
                    ErrorCode::C2015,
                    field.span,
                    format!("`{}` is not a valid event field type", self.display(field_ty)),
                );
            }
            fields.push(FieldMember {
                name: field.name,
                access: field.access,
                kind: field.kind,
                ty: field_ty,
            });
        }

        // Functions.
        let mut functions = Vec::with_capacity(decl.functions.len());
        for function in &decl.functions {
            let fn_ty = self.function_type(function);
            functions.push(FunctionMember {
                name: function.name,
                access: function.access,
                ty: fn_ty,
            });
        }

        // Conformances.
        let mut conformances = Vec::with_capacity(decl.conformances.len());
        for &conformance in &decl.conformances {
            let Some(interface_ty) = self.resolve_nominal(conformance) else {
                self.report(
                    ErrorCode::C2002,
                    decl.span,
                    format!("unknown type `{}`", self.interner.lookup(conformance)),
                );
                continue;
            };
            let Some(iid) = self.pool.as_interface(interface_ty) else {
                self.report(
                    ErrorCode::C5004,
                    decl.span,
                    format!("`{}` is not an interface", self.display(interface_ty)),
                );
                continue;
            };
            if self.pool.interface_data(iid).kind != decl.kind {
                self.report(
                    ErrorCode::C5005,
                    decl.span,
                    format!(
                        "{} `{}` cannot conform to a {} interface",
                        decl.kind,
                        self.interner.lookup(decl.name),
                        self.pool.interface_data(iid).kind
                    ),
                );
                continue;
            }
            conformances.push(iid);
        }

        // Enum raw type.
        let raw_type = decl.enum_raw_type.as_ref().map(|annotation| {
            let raw = self.resolve_annotation_inner(annotation);
            let valid = self
                .pool
                .numeric(raw)
                .is_some_and(|n| !n.is_fixed_point() && n.bit_width().is_some());
            if raw != TypeId::INVALID && !valid {
                self.report(
                    ErrorCode::C2014,
                    annotation.span,
                    format!("`{}` is not a valid enum raw type", self.display(raw)),
                );
            }
            raw
        });

        // Destructor legality.
        if decl.destructor.is_some() && decl.kind != CompositeKind::Resource {
            self.report(
                ErrorCode::C1005,
                decl.span,
                format!("{} `{}` cannot declare `destroy`", decl.kind, self.interner.lookup(decl.name)),
            );
        }

        // Constructor type.
        let ctor_params: Vec<TypeId> = match (&decl.initializer, decl.kind) {
            (Some(init), _) => init
                .parameters
                .iter()
                .map(|p| self.resolve_annotation(&p.type_annotation))
                .collect(),
            // Events synthesize a constructor from their fields.
            (None, CompositeKind::Event) => fields.iter().map(|f| f.ty).collect(),
            (None, _) => Vec::new(),
        };
        let ctor_ty = self.pool.function(ctor_params, ty);
        self.elaboration.constructor_types.insert(ty, ctor_ty);

        let data = self.pool.composite_data_mut(cid);
        data.fields = fields;
        data.functions = functions;
        data.conformances = conformances;
        data.raw_type = raw_type;

        if decl.kind == CompositeKind::Contract {
            for nested in &decl.nested_composites {
                self.fill_composite(nested, Some(decl.name));
            }
        }
        self.current_contract = saved_contract;
    }

    fn fill_interface(&mut self, decl: &InterfaceDeclaration) {
        let Some(ty) = self.resolve_nominal(decl.name) else {
            return;
        };
        let Some(iid) = self.pool.as_interface(ty) else {
            return;
        };

        let mut fields = Vec::with_capacity(decl.fields.len());
        for field in &decl.fields {
            let field_ty = self.resolve_annotation(&field.type_annotation);
            fields.push(FieldMember {
                name: field.name,
                access: field.access,
                kind: field.kind,
                ty: field_ty,
            });
        }

        let mut functions = Vec::with_capacity(decl.functions.len());
        let mut default_functions = FxHashSet::default();
        for function in &decl.functions {
            let fn_ty = self.function_type(function);
            functions.push(FunctionMember {
                name: function.name,
                access: function.access,
                ty: fn_ty,
            });
            if function.body.is_some() {
                default_functions.insert(function.name);
            }
        }

        let data = self.pool.interface_data_mut(iid);
        data.fields = fields;
        data.functions = functions;
        data.default_functions = default_functions;
    }

    fn declare_global_function(&mut self, decl: &FunctionDeclaration) {
        let fn_ty = self.function_type(decl);
        if !self
            .activations
            .declare_global(decl.name, fn_ty, VariableKind::Let)
        {
            self.report(
                ErrorCode::C1002,
                decl.span,
                format!("`{}` is already declared", self.interner.lookup(decl.name)),
            );
        }
        self.elaboration.function_types.insert(decl.name, fn_ty);
    }

    fn declare_global_value(&mut self, name: Name, ty: TypeId, span: cadence_ir::Span) {
        if !self.activations.declare_global(name, ty, VariableKind::Let) {
            self.report(
                ErrorCode::C1002,
                span,
                format!("`{}` is already declared", self.interner.lookup(name)),
            );
        }
    }

    /// The interned function type of a declaration.
    pub(crate) fn function_type(&mut self, decl: &FunctionDeclaration) -> TypeId {
        let parameters: Vec<TypeId> = decl
            .parameters
            .iter()
            .map(|p| self.resolve_annotation(&p.type_annotation))
            .collect();
        let return_type = decl
            .return_type
            .as_ref()
            .map_or(TypeId::VOID, |annotation| self.resolve_annotation(annotation));
        self.pool.function(parameters, return_type)
    }
}
