//! End-to-end evaluation tests: laziness, objects, composition,
//! comprehensions and argument binding.

mod common;

use std::{cell::Cell, rc::Rc};

use common::*;
use jonnet::{
    CollectTrace, NoTrace, Runner, Scientific, Value,
    ast::{BinOp, UnyOp, Visibility},
    std_object,
};
use pretty_assertions::assert_eq;
use serde_json::json;

#[test]
fn self_reference() {
    // { a: 1, b: self.a + 1 }
    let program = obj(vec![
        ("a", num(1)),
        ("b", bin(dot(ident("self"), "a"), BinOp::Add, num(1))),
    ]);
    assert_eq!(run_ok(&program), json!({"a": 1, "b": 2}));
}

#[test]
fn hidden_fields_are_dropped_but_reachable() {
    // { a:: 1, b: 2 }
    let program = obj_vis(vec![
        ("a", Visibility::Hidden, num(1)),
        ("b", Visibility::Visible, num(2)),
    ]);
    assert_eq!(run_ok(&program), json!({"b": 2}));

    let lookup = dot(
        obj_vis(vec![
            ("a", Visibility::Hidden, num(1)),
            ("b", Visibility::Visible, num(2)),
        ]),
        "a",
    );
    assert_eq!(run_ok(&lookup), json!(1));
}

#[test]
fn array_comprehension_filters() {
    // [x * 2 for x in [1, 2, 3] if x > 1]
    let program = arr_comp(
        bin(ident("x"), BinOp::Mul, num(2)),
        vec![comp_spec(
            "x",
            arr(vec![num(1), num(2), num(3)]),
            Some(bin(ident("x"), BinOp::Gt, num(1))),
        )],
    );
    assert_eq!(run_ok(&program), json!([4, 6]));
}

#[test]
fn nested_comprehension_order() {
    // [x + y for x in ["a", "b"] for y in ["1", "2"]]
    let program = arr_comp(
        bin(ident("x"), BinOp::Add, ident("y")),
        vec![
            comp_spec("x", arr(vec![str_("a"), str_("b")]), None),
            comp_spec("y", arr(vec![str_("1"), str_("2")]), None),
        ],
    );
    assert_eq!(run_ok(&program), json!(["a1", "a2", "b1", "b2"]));
}

#[test]
fn comprehension_iterable_sees_outer_variable() {
    // [x + y for x in [1, 10] for y in [x, x + 1]]
    let program = arr_comp(
        bin(ident("x"), BinOp::Add, ident("y")),
        vec![
            comp_spec("x", arr(vec![num(1), num(10)]), None),
            comp_spec(
                "y",
                arr(vec![ident("x"), bin(ident("x"), BinOp::Add, num(1))]),
                None,
            ),
        ],
    );
    assert_eq!(run_ok(&program), json!([2, 3, 20, 21]));
}

#[test]
fn object_comprehension() {
    // { [k]: v for k in ["a", "b"] for v in [1] }
    let program = obj_comp(
        computed_field(ident("k"), Visibility::Visible, ident("v")),
        vec![
            comp_spec("k", arr(vec![str_("a"), str_("b")]), None),
            comp_spec("v", arr(vec![num(1)]), None),
        ],
    );
    assert_eq!(run_ok(&program), json!({"a": 1, "b": 1}));
}

#[test]
fn object_comprehension_null_key_skips() {
    // { [if k == "a" then k]: 1 for k in ["a", "b"] }
    let program = obj_comp(
        computed_field(
            if_then(bin(ident("k"), BinOp::Eq, str_("a")), ident("k")),
            Visibility::Visible,
            num(1),
        ),
        vec![comp_spec("k", arr(vec![str_("a"), str_("b")]), None)],
    );
    assert_eq!(run_ok(&program), json!({"a": 1}));
}

#[test]
fn default_parameters_see_each_other() {
    // local f(x, y = x + 1) = y; f(10)
    let program = local(
        vec![(
            "f",
            fun(
                vec![
                    param("x"),
                    param_def("y", bin(ident("x"), BinOp::Add, num(1))),
                ],
                ident("y"),
            ),
        )],
        call_pos(ident("f"), vec![num(10)]),
    );
    assert_eq!(run_ok(&program), json!(11));
}

#[test]
fn composition_merges_fields() {
    // { a: 1 } + { b: 2 }
    let program = bin(obj(vec![("a", num(1))]), BinOp::Add, obj(vec![("b", num(2))]));
    assert_eq!(run_ok(&program), json!({"a": 1, "b": 2}));
}

#[test]
fn composition_rebinds_self() {
    // ({ a: 1, b: self.a } + { a: 100 }).b
    let program = dot(
        bin(
            obj(vec![("a", num(1)), ("b", dot(ident("self"), "a"))]),
            BinOp::Add,
            obj(vec![("a", num(100))]),
        ),
        "b",
    );
    assert_eq!(run_ok(&program), json!(100));

    // ({ a: 1, b: self.a + 1 } + { a: 10 }).b
    let program = dot(
        bin(
            obj(vec![
                ("a", num(1)),
                ("b", bin(dot(ident("self"), "a"), BinOp::Add, num(1))),
            ]),
            BinOp::Add,
            obj(vec![("a", num(10))]),
        ),
        "b",
    );
    assert_eq!(run_ok(&program), json!(11));
}

#[test]
fn composition_binds_super() {
    // ({ a: 1 } + { a: super.a + 1 }).a
    let program = dot(
        bin(
            obj(vec![("a", num(1))]),
            BinOp::Add,
            obj(vec![("a", bin(dot(ident("super"), "a"), BinOp::Add, num(1)))]),
        ),
        "a",
    );
    assert_eq!(run_ok(&program), json!(2));
}

#[test]
fn visibility_composes() {
    // { a:: 1 } + { a::: 2 } manifests the forced field.
    let program = bin(
        obj_vis(vec![("a", Visibility::Hidden, num(1))]),
        BinOp::Add,
        obj_vis(vec![("a", Visibility::Forced, num(2))]),
    );
    assert_eq!(run_ok(&program), json!({"a": 2}));

    // { a:: 1 } + { a: 2 }: the default override inherits hiddenness.
    let program = bin(
        obj_vis(vec![("a", Visibility::Hidden, num(1))]),
        BinOp::Add,
        obj_vis(vec![("a", Visibility::Visible, num(2))]),
    );
    assert_eq!(run_ok(&program), json!({}));

    let lookup = dot(
        bin(
            obj_vis(vec![("a", Visibility::Hidden, num(1))]),
            BinOp::Add,
            obj_vis(vec![("a", Visibility::Visible, num(2))]),
        ),
        "a",
    );
    assert_eq!(run_ok(&lookup), json!(2));
}

#[test]
fn dollar_reaches_outermost_object() {
    // { x: { y: $.z }, z: 3 }
    let program = obj(vec![
        ("x", obj(vec![("y", dot(ident("$"), "z"))])),
        ("z", num(3)),
    ]);
    assert_eq!(run_ok(&program), json!({"x": {"y": 3}, "z": 3}));

    let lookup = dot(
        dot(
            obj(vec![
                ("x", obj(vec![("y", dot(ident("$"), "z"))])),
                ("z", num(3)),
            ]),
            "x",
        ),
        "y",
    );
    assert_eq!(run_ok(&lookup), json!(3));
}

#[test]
fn fields_are_lazy() {
    // { a: 1, b: error "x" }.a
    let program = dot(
        obj(vec![("a", num(1)), ("b", err(str_("x")))]),
        "a",
    );
    assert_eq!(run_ok(&program), json!(1));
}

#[test]
fn infinite_recursion_in_locals() {
    // local a = b, b = a; a
    let program = local(vec![("a", ident("b")), ("b", ident("a"))], ident("a"));
    let rendered = run_err(&program);
    assert!(
        rendered.starts_with("Runtime error: infinite recursion"),
        "unexpected rendering: {rendered}"
    );
}

#[test]
fn infinite_recursion_between_fields() {
    // { a: self.b, b: self.a }.a
    let program = dot(
        obj(vec![
            ("a", dot(ident("self"), "b")),
            ("b", dot(ident("self"), "a")),
        ]),
        "a",
    );
    assert!(run_err(&program).contains("infinite recursion"));
}

#[test]
fn named_arguments_bind_in_any_order() {
    // local f(x, y) = x - y; f(y = 1, x = 10)
    let program = local(
        vec![(
            "f",
            fun(
                vec![param("x"), param("y")],
                bin(ident("x"), BinOp::Sub, ident("y")),
            ),
        )],
        call(ident("f"), vec![named("y", num(1)), named("x", num(10))]),
    );
    assert_eq!(run_ok(&program), json!(9));
}

#[test]
fn positional_arguments_skip_named_slots() {
    // local f(a, b, c) = [a, b, c]; f(1, 2, b = 9)
    let program = local(
        vec![(
            "f",
            fun(
                vec![param("a"), param("b"), param("c")],
                arr(vec![ident("a"), ident("b"), ident("c")]),
            ),
        )],
        call(
            ident("f"),
            vec![pos(num(1)), pos(num(2)), named("b", num(9))],
        ),
    );
    assert_eq!(run_ok(&program), json!([1, 9, 2]));
}

#[test]
fn argument_binding_errors() {
    let f = (
        "f",
        fun(vec![param("x")], ident("x")),
    );
    // unknown named argument
    let program = local(vec![f.clone()], call(ident("f"), vec![named("y", num(1))]));
    assert!(run_err(&program).contains("function has no parameter y"));

    // too many positional arguments
    let program = local(vec![f.clone()], call_pos(ident("f"), vec![num(1), num(2)]));
    assert!(run_err(&program).contains("too many arguments"));

    // missing required argument
    let two = (
        "g",
        fun(vec![param("x"), param("y")], ident("x")),
    );
    let program = local(vec![two], call_pos(ident("g"), vec![num(1)]));
    assert!(run_err(&program).contains("function parameter y is not bound"));
}

#[test]
fn slice_desugars_to_std_slice() {
    // "hello"[1:4]
    let program = slice(str_("hello"), Some(num(1)), Some(num(4)), None);
    assert_eq!(run_ok(&program), json!("ell"));

    // [1, 2, 3, 4, 5][::2]
    let program = slice(
        arr(vec![num(1), num(2), num(3), num(4), num(5)]),
        None,
        None,
        Some(num(2)),
    );
    assert_eq!(run_ok(&program), json!([1, 3, 5]));
}

#[test]
fn assert_expression() {
    // assert false : "boom"; 1
    let program = assert_expr(boolean(false), Some(str_("boom")), num(1));
    assert!(run_err(&program).starts_with("Runtime error: boom"));

    // assert true; 1
    let program = assert_expr(boolean(true), None, num(1));
    assert_eq!(run_ok(&program), json!(1));
}

#[test]
fn object_asserts_run_on_observation() {
    use jonnet::ast::Assert;

    let failing = || {
        obj_full(
            vec![field("a", Visibility::Visible, num(2))],
            vec![],
            vec![Assert {
                cond: bin(dot(ident("self"), "a"), BinOp::Eq, num(1)),
                msg: Some(str_("a must be 1")),
            }],
        )
    };
    // manifestation triggers the assert
    assert!(run_err(&failing()).contains("a must be 1"));
    // so does a plain field lookup
    assert!(run_err(&dot(failing(), "a")).contains("a must be 1"));

    let passing = obj_full(
        vec![field("a", Visibility::Visible, num(1))],
        vec![],
        vec![Assert {
            cond: bin(dot(ident("self"), "a"), BinOp::Eq, num(1)),
            msg: None,
        }],
    );
    assert_eq!(run_ok(&passing), json!({"a": 1}));
}

#[test]
fn composed_asserts_see_the_composite() {
    use jonnet::ast::Assert;

    // ({ a: 1, assert self.a == 1 } + { a: 2 }).a fails the carried assert.
    let left = obj_full(
        vec![field("a", Visibility::Visible, num(1))],
        vec![],
        vec![Assert {
            cond: bin(dot(ident("self"), "a"), BinOp::Eq, num(1)),
            msg: Some(str_("a drifted")),
        }],
    );
    let program = dot(
        bin(left, BinOp::Add, obj(vec![("a", num(2))])),
        "a",
    );
    assert!(run_err(&program).contains("a drifted"));
}

#[test]
fn object_locals_are_in_scope() {
    // { local two = 2, a: two }
    let program = obj_full(
        vec![field("a", Visibility::Visible, ident("two"))],
        vec![bind("two", num(2))],
        vec![],
    );
    assert_eq!(run_ok(&program), json!({"a": 2}));
}

#[test]
fn string_coercion_on_add() {
    let program = bin(str_("a"), BinOp::Add, num(1));
    assert_eq!(run_ok(&program), json!("a1"));

    let program = bin(num(1), BinOp::Add, str_("a"));
    assert_eq!(run_ok(&program), json!("1a"));

    let program = bin(str_("x="), BinOp::Add, obj(vec![("a", num(1))]));
    assert_eq!(run_ok(&program), json!("x={\"a\":1}"));
}

#[test]
fn equality_ignores_hidden_fields() {
    let program = bin(
        obj_vis(vec![
            ("a", Visibility::Visible, num(1)),
            ("b", Visibility::Hidden, num(2)),
        ]),
        BinOp::Eq,
        obj(vec![("a", num(1))]),
    );
    assert_eq!(run_ok(&program), json!(true));

    let program = bin(num(1), BinOp::Eq, str_("1"));
    assert_eq!(run_ok(&program), json!(false));

    let program = bin(fun(vec![], num(1)), BinOp::Eq, fun(vec![], num(1)));
    assert!(run_err(&program).contains("cannot manifest a function"));
}

#[test]
fn membership_includes_hidden_fields() {
    let program = bin(
        str_("h"),
        BinOp::In,
        obj_vis(vec![("h", Visibility::Hidden, num(1))]),
    );
    assert_eq!(run_ok(&program), json!(true));

    let program = bin(str_("x"), BinOp::In, obj(vec![("a", num(1))]));
    assert_eq!(run_ok(&program), json!(false));
}

#[test]
fn if_without_else_is_null() {
    let program = if_then(boolean(false), num(1));
    assert_eq!(run_ok(&program), json!(null));
}

#[test]
fn operators() {
    assert_eq!(run_ok(&bin(num(7), BinOp::Mod, num(3))), json!(1));
    assert_eq!(run_ok(&bin(num(10), BinOp::Div, num(4))), json!(2.5));
    assert_eq!(run_ok(&bin(num(6), BinOp::And, num(3))), json!(2));
    assert_eq!(run_ok(&bin(num(6), BinOp::Or, num(3))), json!(7));
    assert_eq!(run_ok(&bin(num(6), BinOp::Xor, num(3))), json!(5));
    assert_eq!(run_ok(&bin(num(1), BinOp::ShiftL, num(4))), json!(16));
    assert_eq!(run_ok(&bin(num(16), BinOp::ShiftR, num(3))), json!(2));
    assert_eq!(run_ok(&uny(UnyOp::Minus, num(3))), json!(-3));
    assert_eq!(run_ok(&uny(UnyOp::LNot, boolean(false))), json!(true));
    assert_eq!(run_ok(&uny(UnyOp::Compl, num(0))), json!(-1));
    assert_eq!(
        run_ok(&bin(boolean(true), BinOp::LOr, err(str_("not taken")))),
        json!(true)
    );
    assert_eq!(
        run_ok(&bin(boolean(false), BinOp::LAnd, err(str_("not taken")))),
        json!(false)
    );
}

#[test]
fn runtime_error_reporting() {
    let rendered = run_err(&bin(num(1), BinOp::Div, num(0)));
    assert!(rendered.starts_with("Runtime error: division by zero"));
    assert!(rendered.contains("test.jsonnet:1:1-2"));

    let rendered = run_err(&dot(obj(vec![("a", num(1))]), "b"));
    assert!(rendered.contains("no such key: b"));

    let rendered = run_err(&index(arr(vec![num(1)]), num(5)));
    assert!(rendered.contains("index 5 out of bounds"));

    let rendered = run_err(&ident("nope"));
    assert!(rendered.contains("unknown variable: nope"));
}

#[test]
fn backtrace_names_functions() {
    // local boom(x) = error "kapow"; boom(1)
    let program = local(
        vec![("boom", fun(vec![param("x")], err(str_("kapow"))))],
        call_pos(ident("boom"), vec![num(1)]),
    );
    let rendered = run_err(&program);
    assert!(rendered.starts_with("Runtime error: kapow"));
    assert!(rendered.contains("function boom"), "missing frame: {rendered}");
}

#[test]
fn deep_recursion_is_an_error_not_a_crash() {
    // local f(x) = f(x); f(1)
    let program = local(
        vec![("f", fun(vec![param("x")], call_pos(ident("f"), vec![ident("x")])))],
        call_pos(ident("f"), vec![num(1)]),
    );
    assert!(run_err(&program).contains("max stack frames exceeded"));
}

#[test]
fn thunks_are_memoized_once() {
    let counter = Rc::new(Cell::new(0i64));
    let seen = counter.clone();
    let native = Value::native("counter", &[], move |_args| {
        seen.set(seen.get() + 1);
        Ok(Value::Num(Scientific::from_i64(seen.get())))
    });
    let Value::Obj(std) = std_object() else {
        panic!("std is an object");
    };
    let std = Value::Obj(std.with_field("counter", native, Visibility::Hidden));

    // local x = std.counter(); [x, x, x]
    let program = local(
        vec![("x", call_pos(dot(ident("std"), "counter"), vec![]))],
        arr(vec![ident("x"), ident("x"), ident("x")]),
    );
    let json = Runner::new("test.jsonnet")
        .run_with(&program, std, &mut NoTrace)
        .expect("evaluation succeeds");
    assert_eq!(json, json!([1, 1, 1]));
    assert_eq!(counter.get(), 1);
}

#[test]
fn trace_writes_through_the_writer() {
    let mut trace = CollectTrace::new();
    let program = std_call("trace", vec![str_("checkpoint"), num(42)]);
    let json = Runner::new("test.jsonnet")
        .run_with(&program, std_object(), &mut trace)
        .expect("evaluation succeeds");
    assert_eq!(json, json!(42));
    assert_eq!(trace.messages().len(), 1);
    assert!(trace.messages()[0].contains("checkpoint"));
    assert!(trace.messages()[0].starts_with("TRACE: test.jsonnet:1"));
}

#[test]
fn determinism() {
    let program = obj(vec![
        ("a", std_call("range", vec![num(1), num(3)])),
        ("b", bin(dot(ident("self"), "a"), BinOp::Add, arr(vec![num(9)]))),
    ]);
    let first = run_ok(&program);
    let second = run_ok(&program);
    assert_eq!(first, second);
    assert_eq!(first, json!({"a": [1, 2, 3], "b": [1, 2, 3, 9]}));
}
