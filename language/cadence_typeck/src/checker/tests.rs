use cadence_diagnostic::ErrorCode;
use cadence_ir::{
    Access, BinaryOp, CompositeKind, Declaration, ProgramBuilder, Transfer, VariableKind,
};

use super::{check_program, CheckResult, NoImports};

fn check(build: impl FnOnce(&mut ProgramBuilder)) -> CheckResult {
    let mut builder = ProgramBuilder::script();
    let interner = builder.interner().clone();
    build(&mut builder);
    let program = builder.finish();
    check_program(&program, interner, &NoImports)
}

fn error_codes(result: &CheckResult) -> Vec<ErrorCode> {
    result.diagnostics.errors().map(|d| d.code).collect()
}

/// `resource R { let id: UInt64; init(i: UInt64) { self.id = i } }`
fn declare_resource_r(builder: &mut ProgramBuilder) {
    let mut r = builder.composite(CompositeKind::Resource, "R");
    r.fields.push(builder.field(
        Access::Public,
        VariableKind::Let,
        "id",
        builder.nominal_type("UInt64"),
    ));
    let self_expr = builder.ident("self");
    let id_member = builder.member(self_expr, "id");
    let i_expr = builder.ident("i");
    let assign = builder.assign(id_member, Transfer::Copy, i_expr);
    let param = builder.parameter(Some("i"), "i", builder.nominal_type("UInt64"));
    r.initializer = Some(builder.special_function(vec![param], builder.block(vec![assign])));
    builder.add_declaration(Declaration::Composite(r));
}

#[test]
fn test_move_and_destroy_checks() {
    let result = check(|b| {
        declare_resource_r(b);
        let ctor = b.ident("R");
        let seven = b.int(7);
        let arg = b.labeled_arg("i", seven);
        let call = b.call(ctor, vec![], vec![arg]);
        let create = b.create(call);
        let let_r = b.let_move("r", create);
        let r = b.ident("r");
        let destroy = b.destroy(r);
        let body = b.block(vec![let_r, destroy]);
        let main = b.function("main", vec![], None, body);
        b.add_declaration(Declaration::Function(main));
    });
    assert!(result.is_ready(), "unexpected errors: {:?}", error_codes(&result));
}

#[test]
fn test_resource_loss_detected() {
    let result = check(|b| {
        declare_resource_r(b);
        let ctor = b.ident("R");
        let seven = b.int(7);
        let arg = b.labeled_arg("i", seven);
        let call = b.call(ctor, vec![], vec![arg]);
        let create = b.create(call);
        let let_r = b.let_move("r", create);
        let body = b.block(vec![let_r]);
        let main = b.function("main", vec![], None, body);
        b.add_declaration(Declaration::Function(main));
    });
    assert_eq!(error_codes(&result), vec![ErrorCode::C3001]);
}

#[test]
fn test_use_after_move() {
    let result = check(|b| {
        declare_resource_r(b);
        let ctor = b.ident("R");
        let seven = b.int(7);
        let arg = b.labeled_arg("i", seven);
        let call = b.call(ctor, vec![], vec![arg]);
        let create = b.create(call);
        let let_r = b.let_move("r", create);
        let r1 = b.ident("r");
        let let_s = b.let_move("s", r1);
        let s = b.ident("s");
        let destroy_s = b.destroy(s);
        let r2 = b.ident("r");
        let destroy_r = b.destroy(r2);
        let body = b.block(vec![let_r, let_s, destroy_s, destroy_r]);
        let main = b.function("main", vec![], None, body);
        b.add_declaration(Declaration::Function(main));
    });
    assert_eq!(error_codes(&result), vec![ErrorCode::C3002]);
}

#[test]
fn test_resource_requires_move_operator() {
    let result = check(|b| {
        declare_resource_r(b);
        let ctor = b.ident("R");
        let seven = b.int(7);
        let arg = b.labeled_arg("i", seven);
        let call = b.call(ctor, vec![], vec![arg]);
        let create = b.create(call);
        let let_r = b.let_move("r", create);
        let r1 = b.ident("r");
        // `let s = r` - resource bound with the copy transfer
        let let_s = b.let_copy("s", r1);
        let s = b.ident("s");
        let destroy_s = b.destroy(s);
        let body = b.block(vec![let_r, let_s, destroy_s]);
        let main = b.function("main", vec![], None, body);
        b.add_declaration(Declaration::Function(main));
    });
    // The copy is an error, and `r` is then still owned at scope end.
    let codes = error_codes(&result);
    assert!(codes.contains(&ErrorCode::C3005), "got {codes:?}");
}

#[test]
fn test_branches_must_agree_on_resource_state() {
    let result = check(|b| {
        declare_resource_r(b);
        let ctor = b.ident("R");
        let seven = b.int(7);
        let arg = b.labeled_arg("i", seven);
        let call = b.call(ctor, vec![], vec![arg]);
        let create = b.create(call);
        let let_r = b.let_move("r", create);
        let r = b.ident("r");
        let destroy = b.destroy(r);
        let then_block = b.block(vec![destroy]);
        let cond = b.boolean(true);
        let if_stmt = b.if_stmt(cond, then_block, None);
        let body = b.block(vec![let_r, if_stmt]);
        let main = b.function("main", vec![], None, body);
        b.add_declaration(Declaration::Function(main));
    });
    assert_eq!(error_codes(&result), vec![ErrorCode::C3007]);
}

#[test]
fn test_external_mutation_rejected() {
    let result = check(|b| {
        // contract C { struct Foo { pub let x: [Int]; init() {...} }
        //              fun bar() { let foo = Foo(); foo.x[0] = 3 } }
        let mut foo = b.composite(CompositeKind::Structure, "Foo");
        let int_array = b.array_type(b.nominal_type("Int"));
        foo.fields
            .push(b.field(Access::Public, VariableKind::Let, "x", int_array));
        let self_expr = b.ident("self");
        let x_member = b.member(self_expr, "x");
        let three = b.int(3);
        let literal = b.array(vec![three]);
        let assign = b.assign(x_member, Transfer::Copy, literal);
        foo.initializer = Some(b.special_function(vec![], b.block(vec![assign])));

        let foo_ctor = b.ident("Foo");
        let call = b.call(foo_ctor, vec![], vec![]);
        let let_foo = b.let_copy("foo", call);
        let foo_ident = b.ident("foo");
        let foo_x = b.member(foo_ident, "x");
        let zero = b.int(0);
        let indexed = b.index(foo_x, zero);
        let three2 = b.int(3);
        let mutate = b.assign(indexed, Transfer::Copy, three2);
        let bar = b.function("bar", vec![], None, b.block(vec![let_foo, mutate]));

        let mut contract = b.composite(CompositeKind::Contract, "C");
        contract.nested_composites.push(foo);
        contract.functions.push(bar);
        b.add_declaration(Declaration::Composite(contract));
    });
    assert_eq!(error_codes(&result), vec![ErrorCode::C4002]);
}

#[test]
fn test_integer_literal_range() {
    let result = check(|b| {
        let v255 = b.int(255);
        let uint8 = b.nominal_type("UInt8");
        let ok = b.variable(VariableKind::Let, "x", Some(uint8), Transfer::Copy, v255);
        let v256 = b.int(256);
        let uint8b = b.nominal_type("UInt8");
        let bad = b.variable(VariableKind::Let, "y", Some(uint8b), Transfer::Copy, v256);
        let main = b.function("main", vec![], None, b.block(vec![ok, bad]));
        b.add_declaration(Declaration::Function(main));
    });
    assert_eq!(error_codes(&result), vec![ErrorCode::C2001]);
}

#[test]
fn test_arithmetic_requires_same_width() {
    let result = check(|b| {
        let v1 = b.int(1);
        let uint8 = b.nominal_type("UInt8");
        let x = b.variable(VariableKind::Let, "x", Some(uint8), Transfer::Copy, v1);
        let v2 = b.int(2);
        let uint16 = b.nominal_type("UInt16");
        let y = b.variable(VariableKind::Let, "y", Some(uint16), Transfer::Copy, v2);
        let x_ref = b.ident("x");
        let y_ref = b.ident("y");
        let sum = b.binary(BinaryOp::Add, x_ref, y_ref);
        let z = b.let_copy("z", sum);
        let main = b.function("main", vec![], None, b.block(vec![x, y, z]));
        b.add_declaration(Declaration::Function(main));
    });
    assert_eq!(error_codes(&result), vec![ErrorCode::C2001]);
}

#[test]
fn test_duplicate_declaration() {
    let result = check(|b| {
        let v1 = b.int(1);
        let first = b.let_copy("x", v1);
        let v2 = b.int(2);
        let second = b.let_copy("x", v2);
        let main = b.function("main", vec![], None, b.block(vec![first, second]));
        b.add_declaration(Declaration::Function(main));
    });
    assert_eq!(error_codes(&result), vec![ErrorCode::C1002]);
}

#[test]
fn test_undeclared_identifier() {
    let result = check(|b| {
        let ghost = b.ident("ghost");
        let stmt = b.expr_stmt(ghost);
        let main = b.function("main", vec![], None, b.block(vec![stmt]));
        b.add_declaration(Declaration::Function(main));
    });
    assert_eq!(error_codes(&result), vec![ErrorCode::C1001]);
}

#[test]
fn test_assert_and_panic_are_builtin() {
    let result = check(|b| {
        let cond = b.boolean(true);
        let arg = b.arg(cond);
        let assert_call = b.call_named("assert", vec![arg]);
        let s1 = b.expr_stmt(assert_call);
        let message = b.string("boom");
        let arg = b.arg(message);
        let panic_call = b.call_named("panic", vec![arg]);
        let s2 = b.expr_stmt(panic_call);
        let main = b.function("main", vec![], None, b.block(vec![s1, s2]));
        b.add_declaration(Declaration::Function(main));
    });
    assert!(result.is_ready(), "unexpected errors: {:?}", error_codes(&result));
}

#[test]
fn test_bls_contract_is_builtin() {
    let mut aggregate_signatures = None;
    let mut aggregate_keys = None;
    let result = check(|b| {
        // let sigs: [[UInt8]] = []
        let byte_array = b.array_type(b.nominal_type("UInt8"));
        let signature_list = b.array_type(byte_array);
        let empty = b.array(vec![]);
        let sigs = b.variable(
            VariableKind::Let,
            "sigs",
            Some(signature_list),
            Transfer::Copy,
            empty,
        );
        let bls = b.ident("BLS");
        let callee = b.member(bls, "aggregateSignatures");
        let sigs_ref = b.ident("sigs");
        let arg = b.arg(sigs_ref);
        let signatures_call = b.call(callee, vec![], vec![arg]);
        aggregate_signatures = Some(signatures_call);
        let s1 = b.let_copy("aggregated", signatures_call);

        // let keys: [PublicKey] = []
        let key_list = b.array_type(b.nominal_type("PublicKey"));
        let empty = b.array(vec![]);
        let keys = b.variable(
            VariableKind::Let,
            "keys",
            Some(key_list),
            Transfer::Copy,
            empty,
        );
        let bls2 = b.ident("BLS");
        let callee2 = b.member(bls2, "aggregatePublicKeys");
        let keys_ref = b.ident("keys");
        let arg = b.arg(keys_ref);
        let keys_call = b.call(callee2, vec![], vec![arg]);
        aggregate_keys = Some(keys_call);
        let s2 = b.let_copy("key", keys_call);

        let main = b.function("main", vec![], None, b.block(vec![sigs, s1, keys, s2]));
        b.add_declaration(Declaration::Function(main));
    });
    assert!(result.is_ready(), "unexpected errors: {:?}", error_codes(&result));

    let signatures_ty = result.elaboration.expr_type(aggregate_signatures.unwrap());
    assert_eq!(result.pool.display(signatures_ty), "[UInt8]?");
    let keys_ty = result.elaboration.expr_type(aggregate_keys.unwrap());
    assert_eq!(result.pool.display(keys_ty), "PublicKey?");
}

#[test]
fn test_struct_cannot_hold_resource_field() {
    let result = check(|b| {
        declare_resource_r(b);
        let mut s = b.composite(CompositeKind::Structure, "S");
        let r_ty = b.resource_type("R");
        s.fields
            .push(b.field(Access::Public, VariableKind::Let, "r", r_ty));
        b.add_declaration(Declaration::Composite(s));
    });
    let codes = error_codes(&result);
    assert!(codes.contains(&ErrorCode::C3006), "got {codes:?}");
}

#[test]
fn test_interface_conformance_missing_member() {
    let result = check(|b| {
        use cadence_ir::InterfaceDeclaration;
        let getter = cadence_ir::FunctionDeclaration {
            access: Access::Public,
            name: b.name("getBalance"),
            parameters: vec![],
            return_type: Some(b.nominal_type("UInt64")),
            preconditions: vec![],
            postconditions: vec![],
            body: None,
            span: cadence_ir::Span::DUMMY,
        };
        b.add_declaration(Declaration::Interface(InterfaceDeclaration {
            access: Access::Public,
            kind: CompositeKind::Resource,
            name: b.name("Provider"),
            fields: vec![],
            functions: vec![getter],
            span: cadence_ir::Span::DUMMY,
        }));

        let mut r = b.composite(CompositeKind::Resource, "Vault");
        r.conformances.push(b.name("Provider"));
        b.add_declaration(Declaration::Composite(r));
    });
    assert_eq!(error_codes(&result), vec![ErrorCode::C5001]);
}
