//! Rendered diagnostics for errors produced by the checker.

use spl_ast::{FnSig, ModuleBuilder};
use spl_typeck::diagnostics::{error_code, render_diagnostic};
use spl_typeck::TypeError;
use spl_types::Placeholder;

/// Builder spans are one byte per node, so any source at least as long as
/// the node count lines up.
fn source() -> String {
    "abcdefghij".repeat(8)
}

fn first_error(b: ModuleBuilder) -> TypeError {
    let mut m = b.finish();
    match spl_typeck::check(&mut m) {
        Ok(_) => panic!("expected an error"),
        Err(e) => e,
    }
}

#[test]
fn branch_mismatch_labels_both_branches() {
    let mut b = ModuleBuilder::new("t");
    let c = b.boolean(true);
    let one = b.number(1);
    let no = b.boolean(false);
    let if_e = b.if_else(c, one, no);
    b.function(FnSig::new("main"), if_e);
    let err = first_error(b);

    assert_eq!(error_code(&err), "E0001");
    let out = render_diagnostic(&err, &source());
    assert!(out.contains("[E0001]"), "{out}");
    assert!(out.contains("type mismatch: expected `Int32`, found `Bool`"), "{out}");
    assert!(out.contains("this branch is Int32"), "{out}");
    assert!(out.contains("this branch is Bool"), "{out}");
}

#[test]
fn immutable_assignment_points_at_declaration() {
    let mut b = ModuleBuilder::new("t");
    let one = b.number(1);
    let x = b.var("x");
    let two = b.number(2);
    let assign = b.assign(x, two);
    let let_e = b.let_in("x", one, assign);
    b.function(FnSig::new("main"), let_e);
    let err = first_error(b);

    let out = render_diagnostic(&err, &source());
    assert!(out.contains("[E0015]"), "{out}");
    assert!(out.contains("declared without `mut`"), "{out}");
    assert!(out.contains("let mut"), "{out}");
}

#[test]
fn unknown_type_name_uses_resolve_code() {
    let mut b = ModuleBuilder::new("t");
    let x = b.var("x");
    b.function(FnSig::new("f").param("x", Placeholder::new("Widget")), x);
    let err = first_error(b);

    assert_eq!(error_code(&err), "E0010");
    let out = render_diagnostic(&err, &source());
    assert!(out.contains("Widget"), "{out}");
}

#[test]
fn ambiguity_asks_for_annotations() {
    let mut b = ModuleBuilder::new("t");
    let x = b.var("x");
    b.function(FnSig::new("f").param_inferred("x"), x);
    let err = first_error(b);

    let out = render_diagnostic(&err, &source());
    assert!(out.contains("[E0009]"), "{out}");
    assert!(out.contains("type annotations needed"), "{out}");
}

#[test]
fn renders_against_exact_source() {
    let mut b = ModuleBuilder::new("t");
    let y = b.var("y");
    b.function(FnSig::new("main"), y);
    let err = first_error(b);

    let out = render_diagnostic(&err, "y");
    assert!(out.contains("unbound name `y`"), "{out}");
}

#[test]
fn calling_a_value_names_its_type() {
    // let x = 1 in x(2)
    let mut b = ModuleBuilder::new("t");
    let one = b.number(1);
    let x = b.var("x");
    let two = b.number(2);
    let call = b.call(x, vec![two]);
    let body = b.let_in("x", one, call);
    b.function(FnSig::new("main"), body);
    let err = first_error(b);

    assert_eq!(error_code(&err), "E0005");
    let out = render_diagnostic(&err, &source());
    assert!(out.contains("[E0005]"), "{out}");
    assert!(out.contains("`Int32` is not a function"), "{out}");
}
