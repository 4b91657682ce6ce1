//! Manifestation tests: key ordering, visibility filtering and exact
//! number rendering.

mod common;

use common::*;
use jonnet::ast::{BinOp, Visibility};
use pretty_assertions::assert_eq;
use serde_json::json;

fn rendered(program: &jonnet::ast::Expr) -> String {
    serde_json::to_string(&run_ok(program)).expect("json serializes")
}

#[test]
fn object_keys_sort_lexicographically() {
    let program = obj(vec![("b", num(1)), ("a", num(2)), ("aa", num(3))]);
    assert_eq!(rendered(&program), r#"{"a":2,"aa":3,"b":1}"#);
}

#[test]
fn nested_structures() {
    let program = obj(vec![
        ("arr", arr(vec![num(1), str_("two"), null(), boolean(false)])),
        ("obj", obj(vec![("inner", arr(vec![obj(vec![])]))])),
    ]);
    assert_eq!(
        run_ok(&program),
        json!({"arr": [1, "two", null, false], "obj": {"inner": [{}]}})
    );
}

#[test]
fn hidden_fields_are_not_forced() {
    // { err:: error "never", ok: 1 } manifests without touching `err`.
    let program = obj_vis(vec![
        ("err", Visibility::Hidden, err(str_("never"))),
        ("ok", Visibility::Visible, num(1)),
    ]);
    assert_eq!(run_ok(&program), json!({"ok": 1}));
}

#[test]
fn big_integers_are_exact() {
    let digits = "123456789123456789123456789";
    let program = bin(number(digits), BinOp::Add, num(1));
    assert_eq!(rendered(&program), "123456789123456789123456790");
}

#[test]
fn decimal_arithmetic_is_exact() {
    // 0.1 + 0.2 == 0.3, exactly
    let program = bin(number("0.1"), BinOp::Add, number("0.2"));
    assert_eq!(rendered(&program), "0.3");

    let program = bin(
        bin(number("0.1"), BinOp::Add, number("0.2")),
        BinOp::Eq,
        number("0.3"),
    );
    assert_eq!(run_ok(&program), json!(true));
}

#[test]
fn number_rendering_forms() {
    assert_eq!(rendered(&number("1.5")), "1.5");
    assert_eq!(rendered(&number("10.0")), "10");
    assert_eq!(rendered(&number("1e2000")), "1e2000");
    assert_eq!(rendered(&number("2.5e-3")), "0.0025");
    assert_eq!(rendered(&number("1.5e-10")), "1.5e-10");
    assert_eq!(rendered(&uny(jonnet::ast::UnyOp::Minus, number("42"))), "-42");
}

#[test]
fn functions_do_not_manifest() {
    let program = fun(vec![], num(1));
    let error = run_err(&program);
    assert!(error.starts_with("Runtime error: cannot manifest a function"));

    let inside = obj(vec![("f", fun(vec![], num(1)))]);
    assert!(run_err(&inside).contains("cannot manifest a function"));
}

#[test]
fn manifested_output_is_plain_json() {
    // A composed object with hidden machinery manifests to plain data.
    let program = bin(
        obj_vis(vec![
            ("base", Visibility::Hidden, num(10)),
            ("total", Visibility::Visible, bin(dot(ident("self"), "base"), BinOp::Mul, num(2))),
        ]),
        BinOp::Add,
        obj_vis(vec![("base", Visibility::Visible, num(21))]),
    );
    // `base` stays hidden (default override inherits), total sees the new value.
    assert_eq!(run_ok(&program), json!({"total": 42}));
}
