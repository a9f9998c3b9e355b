//! End-to-end scenarios: programs built through the IR builder, run
//! through check and interpret.

use cadence_eval::{Interpreter, MeterGauge, RuntimeError, TestHost, Value};
use cadence_ir::{
    Access, BinaryOp, CompositeKind, Condition, ConditionKind, Declaration, PathDomain, Program,
    ProgramBuilder, SharedInterner, Transfer, VariableKind,
};
use cadence_typeck::{check_program, CheckResult, NoImports};
use num_bigint::BigInt;

const ACCOUNT: [u8; 8] = [0, 0, 0, 0, 0, 0, 0, 1];

fn build(build: impl FnOnce(&mut ProgramBuilder)) -> (Program, SharedInterner) {
    let mut builder = ProgramBuilder::script();
    let interner = builder.interner().clone();
    build(&mut builder);
    (builder.finish(), interner)
}

fn checked(program: &Program, interner: &SharedInterner) -> CheckResult {
    let result = check_program(program, interner.clone(), &NoImports);
    let errors: Vec<_> = result.diagnostics.errors().collect();
    assert!(errors.is_empty(), "check errors: {errors:?}");
    result
}

fn interpreter<'a>(
    program: &'a Program,
    interner: &SharedInterner,
) -> Interpreter<'a, TestHost> {
    let result = checked(program, interner);
    Interpreter::new(
        program,
        result,
        interner.clone(),
        TestHost::new(),
        MeterGauge::unlimited(),
    )
    .expect("contract initialization")
}

/// `resource R { let id: UInt64; init(i: UInt64) { self.id = i } }`
fn declare_resource_r(b: &mut ProgramBuilder) {
    let mut r = b.composite(CompositeKind::Resource, "R");
    r.fields.push(b.field(
        Access::Public,
        VariableKind::Let,
        "id",
        b.nominal_type("UInt64"),
    ));
    let self_expr = b.ident("self");
    let id_member = b.member(self_expr, "id");
    let i = b.ident("i");
    let assign = b.assign(id_member, Transfer::Copy, i);
    let param = b.parameter(Some("i"), "i", b.nominal_type("UInt64"));
    r.initializer = Some(b.special_function(vec![param], b.block(vec![assign])));
    b.add_declaration(Declaration::Composite(r));
}

fn create_r(b: &mut ProgramBuilder, id: i64) -> cadence_ir::ExprId {
    let ctor = b.ident("R");
    let id = b.int(id);
    let arg = b.labeled_arg("i", id);
    let call = b.call(ctor, vec![], vec![arg]);
    b.create(call)
}

#[test]
fn test_move_and_destroy() {
    let (program, interner) = build(|b| {
        declare_resource_r(b);
        let create = create_r(b, 7);
        let let_r = b.let_move("r", create);
        let r = b.ident("r");
        let destroy = b.destroy(r);
        let main = b.function("main", vec![], None, b.block(vec![let_r, destroy]));
        b.add_declaration(Declaration::Function(main));
    });
    let mut interpreter = interpreter(&program, &interner);
    let result = interpreter.invoke("main", vec![]).unwrap();
    assert!(result.equals(&Value::Void));
    assert!(interpreter.host().events.is_empty());
}

#[test]
fn test_capability_borrow_reads_through_link() {
    let (program, interner) = build(|b| {
        declare_resource_r(b);
        let account_ty = b.nominal_type("AuthAccount");

        // setup: save @R at /storage/p, link &R at /public/p
        let account = b.ident("account");
        let create = create_r(b, 7);
        let moved = b.move_expr(create);
        let storage_p = b.path(PathDomain::Storage, "p");
        let save_callee = b.member(account, "save");
        let r_ty = b.resource_type("R");
        let save = b.call(
            save_callee,
            vec![r_ty],
            vec![b.arg(moved), b.labeled_arg("to", storage_p)],
        );
        let s1 = b.expr_stmt(save);

        let account2 = b.ident("account");
        let public_p = b.path(PathDomain::Public, "p");
        let storage_p2 = b.path(PathDomain::Storage, "p");
        let link_callee = b.member(account2, "link");
        let ref_r = b.reference_type(false, b.nominal_type("R"));
        let link = b.call(
            link_callee,
            vec![ref_r],
            vec![b.arg(public_p), b.labeled_arg("target", storage_p2)],
        );
        let s2 = b.expr_stmt(link);

        let param = b.parameter(None, "account", account_ty.clone());
        let setup = b.function("setup", vec![param], None, b.block(vec![s1, s2]));
        b.add_declaration(Declaration::Function(setup));

        // readId: getCapability<&R>(/public/p).borrow()!.id
        let account3 = b.ident("account");
        let public_p2 = b.path(PathDomain::Public, "p");
        let get_cap_callee = b.member(account3, "getCapability");
        let ref_r2 = b.reference_type(false, b.nominal_type("R"));
        let capability = b.call(get_cap_callee, vec![ref_r2], vec![b.arg(public_p2)]);
        let borrow_callee = b.member(capability, "borrow");
        let borrowed = b.call(borrow_callee, vec![], vec![]);
        let unwrapped = b.force_unwrap(borrowed);
        let id = b.member(unwrapped, "id");
        let ret = b.ret(Some(id));
        let param = b.parameter(None, "account", account_ty.clone());
        let read_id = b.function(
            "readId",
            vec![param],
            Some(b.nominal_type("UInt64")),
            b.block(vec![ret]),
        );
        b.add_declaration(Declaration::Function(read_id));

        // checkMissing: a link whose target holds no value
        let account4 = b.ident("account");
        let public_q = b.path(PathDomain::Public, "q");
        let storage_q = b.path(PathDomain::Storage, "q");
        let link_callee2 = b.member(account4, "link");
        let ref_r3 = b.reference_type(false, b.nominal_type("R"));
        let link2 = b.call(
            link_callee2,
            vec![ref_r3],
            vec![b.arg(public_q), b.labeled_arg("target", storage_q)],
        );
        let s = b.expr_stmt(link2);
        let account5 = b.ident("account");
        let public_q2 = b.path(PathDomain::Public, "q");
        let get_cap2 = b.member(account5, "getCapability");
        let ref_r4 = b.reference_type(false, b.nominal_type("R"));
        let capability2 = b.call(get_cap2, vec![ref_r4], vec![b.arg(public_q2)]);
        let borrow2_callee = b.member(capability2, "borrow");
        let borrowed2 = b.call(borrow2_callee, vec![], vec![]);
        let is_nil = {
            let nil = b.nil();
            b.binary(BinaryOp::Equal, borrowed2, nil)
        };
        let ret2 = b.ret(Some(is_nil));
        let param = b.parameter(None, "account", account_ty);
        let check_missing = b.function(
            "checkMissing",
            vec![param],
            Some(b.nominal_type("Bool")),
            b.block(vec![s, ret2]),
        );
        b.add_declaration(Declaration::Function(check_missing));
    });

    let mut interpreter = interpreter(&program, &interner);
    let account = interpreter.auth_account(ACCOUNT);
    interpreter.invoke("setup", vec![account]).unwrap();

    let account = interpreter.auth_account(ACCOUNT);
    let id = interpreter.invoke("readId", vec![account]).unwrap();
    assert!(id.equals(
        &Value::integer(cadence_types::NumericType::UInt64, BigInt::from(7)).unwrap()
    ));

    let account = interpreter.auth_account(ACCOUNT);
    let missing = interpreter.invoke("checkMissing", vec![account]).unwrap();
    assert!(missing.equals(&Value::Bool(true)));
}

#[test]
fn test_bounded_arithmetic_overflows() {
    let (program, interner) = build(|b| {
        let v255 = b.int(255);
        let uint8 = b.nominal_type("UInt8");
        let x = b.variable(VariableKind::Let, "x", Some(uint8), Transfer::Copy, v255);
        let x_ref = b.ident("x");
        let one = b.int(1);
        let sum = b.binary(BinaryOp::Add, x_ref, one);
        let y = b.let_copy("y", sum);
        let main = b.function("main", vec![], None, b.block(vec![x, y]));
        b.add_declaration(Declaration::Function(main));
    });
    let mut interpreter = interpreter(&program, &interner);
    let err = interpreter.invoke("main", vec![]).unwrap_err();
    assert_eq!(err, RuntimeError::Overflow { type_name: "UInt8" });
}

#[test]
fn test_word_arithmetic_wraps() {
    let (program, interner) = build(|b| {
        let v255 = b.int(255);
        let word8 = b.nominal_type("Word8");
        let x = b.variable(VariableKind::Let, "x", Some(word8), Transfer::Copy, v255);
        let x_ref = b.ident("x");
        let one = b.int(1);
        let sum = b.binary(BinaryOp::Add, x_ref, one);
        let ret = b.ret(Some(sum));
        let main = b.function(
            "main",
            vec![],
            Some(b.nominal_type("Word8")),
            b.block(vec![x, ret]),
        );
        b.add_declaration(Declaration::Function(main));
    });
    let mut interpreter = interpreter(&program, &interner);
    let result = interpreter.invoke("main", vec![]).unwrap();
    assert!(result.equals(
        &Value::integer(cadence_types::NumericType::Word8, BigInt::from(0)).unwrap()
    ));
}

#[test]
fn test_meta_type_equality_and_subtyping() {
    let (program, interner) = build(|b| {
        declare_resource_r(b);

        let bool_ty = Some(b.nominal_type("Bool"));

        // Type<Int>() == Type<Int>()
        let t1 = {
            let type_callee = b.ident("Type");
            let int_ty = b.nominal_type("Int");
            let a = b.call(type_callee, vec![int_ty], vec![]);
            let type_callee2 = b.ident("Type");
            let int_ty2 = b.nominal_type("Int");
            let bt = b.call(type_callee2, vec![int_ty2], vec![]);
            b.binary(BinaryOp::Equal, a, bt)
        };
        let ret1 = b.ret(Some(t1));
        let same = b.function("same", vec![], bool_ty.clone(), b.block(vec![ret1]));
        b.add_declaration(Declaration::Function(same));

        // Type<Int>() == Type<Int?>()
        let t2 = {
            let type_callee = b.ident("Type");
            let int_ty = b.nominal_type("Int");
            let a = b.call(type_callee, vec![int_ty], vec![]);
            let type_callee2 = b.ident("Type");
            let opt = b.optional_type(b.nominal_type("Int"));
            let bt = b.call(type_callee2, vec![opt], vec![]);
            b.binary(BinaryOp::Equal, a, bt)
        };
        let ret2 = b.ret(Some(t2));
        let optional_differs =
            b.function("optionalDiffers", vec![], bool_ty.clone(), b.block(vec![ret2]));
        b.add_declaration(Declaration::Function(optional_differs));

        // Type<Int>().isSubtype(of: Type<Int?>())
        let t3 = {
            let type_callee = b.ident("Type");
            let int_ty = b.nominal_type("Int");
            let a = b.call(type_callee, vec![int_ty], vec![]);
            let type_callee2 = b.ident("Type");
            let opt = b.optional_type(b.nominal_type("Int"));
            let bt = b.call(type_callee2, vec![opt], vec![]);
            let is_subtype = b.member(a, "isSubtype");
            b.call(is_subtype, vec![], vec![b.labeled_arg("of", bt)])
        };
        let ret3 = b.ret(Some(t3));
        let int_in_optional =
            b.function("intInOptional", vec![], bool_ty.clone(), b.block(vec![ret3]));
        b.add_declaration(Declaration::Function(int_in_optional));

        // Type<@R>().isSubtype(of: Type<AnyResource>())
        let t4 = {
            let type_callee = b.ident("Type");
            let r_ty = b.resource_type("R");
            let a = b.call(type_callee, vec![r_ty], vec![]);
            let type_callee2 = b.ident("Type");
            let any = b.resource_type("AnyResource");
            let bt = b.call(type_callee2, vec![any], vec![]);
            let is_subtype = b.member(a, "isSubtype");
            b.call(is_subtype, vec![], vec![b.labeled_arg("of", bt)])
        };
        let ret4 = b.ret(Some(t4));
        let resource_in_top =
            b.function("resourceInTop", vec![], bool_ty.clone(), b.block(vec![ret4]));
        b.add_declaration(Declaration::Function(resource_in_top));

        // Type<@R>().isSubtype(of: Type<AnyStruct>())
        let t5 = {
            let type_callee = b.ident("Type");
            let r_ty = b.resource_type("R");
            let a = b.call(type_callee, vec![r_ty], vec![]);
            let type_callee2 = b.ident("Type");
            let any = b.nominal_type("AnyStruct");
            let bt = b.call(type_callee2, vec![any], vec![]);
            let is_subtype = b.member(a, "isSubtype");
            b.call(is_subtype, vec![], vec![b.labeled_arg("of", bt)])
        };
        let ret5 = b.ret(Some(t5));
        let hierarchies_disjoint =
            b.function("hierarchiesDisjoint", vec![], bool_ty, b.block(vec![ret5]));
        b.add_declaration(Declaration::Function(hierarchies_disjoint));
    });

    let mut interpreter = interpreter(&program, &interner);
    let expect = |interpreter: &mut Interpreter<'_, TestHost>, name: &str, value: bool| {
        let result = interpreter.invoke(name, vec![]).unwrap();
        assert!(result.equals(&Value::Bool(value)), "{name}");
    };
    expect(&mut interpreter, "same", true);
    expect(&mut interpreter, "optionalDiffers", false);
    expect(&mut interpreter, "intInOptional", true);
    expect(&mut interpreter, "resourceInTop", true);
    expect(&mut interpreter, "hierarchiesDisjoint", false);
}

#[test]
fn test_rlp_trailing_bytes_abort() {
    let (program, interner) = build(|b| {
        // RLP-encoded "abc" with one junk byte appended.
        let bytes: Vec<_> = [0x83u8, 97, 98, 99, 1]
            .iter()
            .map(|&byte| b.int(i64::from(byte)))
            .collect();
        let literal = b.array(bytes);
        let byte_array = b.array_type(b.nominal_type("UInt8"));
        let input = b.variable(
            VariableKind::Let,
            "input",
            Some(byte_array),
            Transfer::Copy,
            literal,
        );
        let rlp = b.ident("RLP");
        let decode = b.member(rlp, "decodeString");
        let input_ref = b.ident("input");
        let call = b.call(decode, vec![], vec![b.arg(input_ref)]);
        let stmt = b.expr_stmt(call);
        let main = b.function("main", vec![], None, b.block(vec![input, stmt]));
        b.add_declaration(Declaration::Function(main));
    });
    let mut interpreter = interpreter(&program, &interner);
    let err = interpreter.invoke("main", vec![]).unwrap_err();
    assert!(matches!(err, RuntimeError::RlpDecode(_)), "got {err:?}");
}

#[test]
fn test_events_reach_the_sink_only() {
    let (program, interner) = build(|b| {
        let mut event = b.composite(CompositeKind::Event, "Transfer");
        event.fields.push(b.field(
            Access::Public,
            VariableKind::Let,
            "amount",
            b.nominal_type("Int"),
        ));
        b.add_declaration(Declaration::Composite(event));

        let ctor = b.ident("Transfer");
        let three = b.int(3);
        let invocation = b.call(ctor, vec![], vec![b.labeled_arg("amount", three)]);
        let emit = b.emit(invocation);
        let main = b.function("main", vec![], None, b.block(vec![emit]));
        b.add_declaration(Declaration::Function(main));
    });
    let mut interpreter = interpreter(&program, &interner);
    interpreter.invoke("main", vec![]).unwrap();

    let events = &interpreter.host().events;
    assert_eq!(events.len(), 1);
    assert!(events[0].type_identifier.ends_with("Transfer"));
    assert_eq!(events[0].fields.len(), 1);
    assert_eq!(events[0].fields[0].0, "amount");
}

#[test]
fn test_save_then_load_round_trips() {
    let (program, interner) = build(|b| {
        let account_ty = b.nominal_type("AuthAccount");

        let account = b.ident("account");
        let value = b.int(42);
        let storage_p = b.path(PathDomain::Storage, "answer");
        let save_callee = b.member(account, "save");
        let int_ty = b.nominal_type("Int");
        let save = b.call(
            save_callee,
            vec![int_ty],
            vec![b.arg(value), b.labeled_arg("to", storage_p)],
        );
        let s1 = b.expr_stmt(save);

        let account2 = b.ident("account");
        let storage_p2 = b.path(PathDomain::Storage, "answer");
        let load_callee = b.member(account2, "load");
        let int_ty2 = b.nominal_type("Int");
        let load = b.call(load_callee, vec![int_ty2], vec![b.labeled_arg("from", storage_p2)]);
        let unwrapped = b.force_unwrap(load);
        let ret = b.ret(Some(unwrapped));

        let param = b.parameter(None, "account", account_ty);
        let main = b.function(
            "main",
            vec![param],
            Some(b.nominal_type("Int")),
            b.block(vec![s1, ret]),
        );
        b.add_declaration(Declaration::Function(main));
    });
    let mut interpreter = interpreter(&program, &interner);
    let account = interpreter.auth_account(ACCOUNT);
    let result = interpreter.invoke("main", vec![account]).unwrap();
    assert!(result.equals(&Value::int(42)));
}

#[test]
fn test_postcondition_sees_before_snapshot() {
    let (program, interner) = build(|b| {
        let int_ty = b.nominal_type("Int");
        let param = b.parameter(None, "x", int_ty);

        // post { result == before(x) + 1 }
        let result = b.ident("result");
        let before_callee = b.ident("before");
        let x1 = b.ident("x");
        let before = b.call(before_callee, vec![], vec![b.arg(x1)]);
        let one = b.int(1);
        let expected = b.binary(BinaryOp::Add, before, one);
        let condition_expr = b.binary(BinaryOp::Equal, result, expected);
        let post = Condition {
            kind: ConditionKind::Post,
            expr: condition_expr,
            message: None,
        };

        let x2 = b.ident("x");
        let one2 = b.int(1);
        let sum = b.binary(BinaryOp::Add, x2, one2);
        let ret = b.ret(Some(sum));

        let mut bump = b.function(
            "bump",
            vec![param],
            Some(b.nominal_type("Int")),
            b.block(vec![ret]),
        );
        bump.postconditions.push(post);
        b.add_declaration(Declaration::Function(bump));
    });
    let mut interpreter = interpreter(&program, &interner);
    let result = interpreter.invoke("bump", vec![Value::int(5)]).unwrap();
    assert!(result.equals(&Value::int(6)));
}

#[test]
fn test_failing_precondition_aborts_with_message() {
    let (program, interner) = build(|b| {
        let int_ty = b.nominal_type("Int");
        let param = b.parameter(None, "x", int_ty);

        // pre { x > 0: "needs a positive amount" }
        let x = b.ident("x");
        let zero = b.int(0);
        let cond = b.binary(BinaryOp::Greater, x, zero);
        let message = b.string("needs a positive amount");
        let pre = Condition {
            kind: ConditionKind::Pre,
            expr: cond,
            message: Some(message),
        };

        let mut check = b.function("check", vec![param], None, b.block(vec![]));
        check.preconditions.push(pre);
        b.add_declaration(Declaration::Function(check));
    });
    let mut interpreter = interpreter(&program, &interner);
    assert!(interpreter.invoke("check", vec![Value::int(1)]).is_ok());
    let err = interpreter.invoke("check", vec![Value::int(0)]).unwrap_err();
    assert_eq!(
        err,
        RuntimeError::PreconditionFailed(Some("needs a positive amount".to_string()))
    );
}

#[test]
fn test_computation_metering_unwinds() {
    let (program, interner) = build(|b| {
        // while true {} - only the meter stops this.
        let cond = b.boolean(true);
        let body = b.block(vec![]);
        let spin = b.while_stmt(cond, body);
        let main = b.function("main", vec![], None, b.block(vec![spin]));
        b.add_declaration(Declaration::Function(main));
    });
    let result = checked(&program, &interner);
    let mut interpreter = Interpreter::new(
        &program,
        result,
        interner.clone(),
        TestHost::new(),
        MeterGauge::with_limits(Some(10_000), None),
    )
    .unwrap();
    let err = interpreter.invoke("main", vec![]).unwrap_err();
    assert_eq!(err, RuntimeError::ComputationLimitExceeded { limit: 10_000 });
}
