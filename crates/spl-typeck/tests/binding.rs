//! Name binding tests: every reference resolves to the innermost declaration
//! of the same name, and binding errors abort with the offending node.

use spl_ast::{DeclKind, ExprId, ExprKind, FnSig, Module, ModuleBuilder};
use spl_typeck::{bind_module, TypeError};

// ── Helpers ────────────────────────────────────────────────────────────

fn bound_decl_name(m: &Module, var: ExprId) -> String {
    let decl = m
        .expr(var)
        .binding()
        .unwrap_or_else(|| panic!("{var:?} is not bound"));
    m.decl(decl).name.clone()
}

fn let_decl(m: &Module, let_expr: ExprId) -> spl_ast::DeclId {
    match m.expr(let_expr).kind {
        ExprKind::Let { decl, .. } => decl,
        ref other => panic!("expected let, found {other:?}"),
    }
}

// ── Resolution ─────────────────────────────────────────────────────────

#[test]
fn let_reference_links_to_let() {
    // let x = 3 in x + 4
    let mut b = ModuleBuilder::new("t");
    let three = b.number(3);
    let x = b.var("x");
    let four = b.number(4);
    let sum = b.add(x, four);
    let let_e = b.let_in("x", three, sum);
    b.function(FnSig::new("main"), let_e);
    let mut m = b.finish();

    bind_module(&mut m).unwrap();
    assert_eq!(m.expr(x).binding(), Some(let_decl(&m, let_e)));
    assert_eq!(bound_decl_name(&m, x), "x");
}

#[test]
fn shadowing_resolves_to_innermost() {
    // let x = 1 in (let x = true in x)
    let mut b = ModuleBuilder::new("t");
    let one = b.number(1);
    let t = b.boolean(true);
    let inner_x = b.var("x");
    let inner = b.let_in("x", t, inner_x);
    let outer = b.let_in("x", one, inner);
    b.function(FnSig::new("main"), outer);
    let mut m = b.finish();

    bind_module(&mut m).unwrap();
    assert_eq!(m.expr(inner_x).binding(), Some(let_decl(&m, inner)));
    assert_ne!(m.expr(inner_x).binding(), Some(let_decl(&m, outer)));
}

#[test]
fn let_initializer_does_not_see_its_own_name() {
    // let x = 1 in (let x = x + 1 in x)
    let mut b = ModuleBuilder::new("t");
    let one = b.number(1);
    let x_init = b.var("x");
    let one_b = b.number(1);
    let init = b.add(x_init, one_b);
    let x_body = b.var("x");
    let inner = b.let_in("x", init, x_body);
    let outer = b.let_in("x", one, inner);
    b.function(FnSig::new("main"), outer);
    let mut m = b.finish();

    bind_module(&mut m).unwrap();
    assert_eq!(m.expr(x_init).binding(), Some(let_decl(&m, outer)));
    assert_eq!(m.expr(x_body).binding(), Some(let_decl(&m, inner)));
}

#[test]
fn parameters_and_globals() {
    let mut b = ModuleBuilder::new("t");
    let n = b.var("n");
    let call = b.call_named("helper", vec![n]);
    let main = b.function(FnSig::new("main").param_inferred("n"), call);
    // Defined after its use: top-level names are mutually visible.
    let y = b.var("y");
    let helper = b.function(FnSig::new("helper").param_inferred("y"), y);
    let mut m = b.finish();

    bind_module(&mut m).unwrap();
    assert_eq!(
        m.decl(m.expr(n).binding().unwrap()).kind,
        DeclKind::Param {
            func: main,
            index: 0
        }
    );
    let ExprKind::Call { callee, .. } = m.expr(call).kind else {
        panic!("expected call");
    };
    assert_eq!(m.expr(callee).binding(), Some(m.func(helper).decl));
}

#[test]
fn literal_sees_enclosing_scope_and_its_own_name() {
    let mut b = ModuleBuilder::new("t");
    let x = b.var("x");
    let rec = b.var("loop");
    let inner_body = b.seq(x, rec);
    let lit = b.lambda(FnSig::new("loop"), inner_body);
    let one = b.number(1);
    let body = b.let_in("x", one, lit);
    let main = b.function(FnSig::new("main"), body);
    let mut m = b.finish();

    bind_module(&mut m).unwrap();
    let ExprKind::Func(f) = m.expr(lit).kind else {
        panic!("expected literal");
    };
    assert_eq!(m.expr(x).binding(), Some(let_decl(&m, body)));
    assert_eq!(m.expr(rec).binding(), Some(m.func(f).decl));
    assert_eq!(m.func(f).context, Some(main));
    assert_eq!(m.func(main).context, None);
}

#[test]
fn bound_tree_serializes() {
    let mut b = ModuleBuilder::new("t");
    let one = b.number(1);
    let x = b.var("x");
    let let_e = b.let_in("x", one, x);
    b.function(FnSig::new("main"), let_e);
    let mut m = b.finish();
    bind_module(&mut m).unwrap();

    let json = serde_json::to_value(&m).unwrap();
    let back: Module = serde_json::from_value(json).unwrap();
    assert_eq!(back.expr(x).binding(), m.expr(x).binding());
}

// ── Errors ─────────────────────────────────────────────────────────────

#[test]
fn unbound_name_reports_expression() {
    let mut b = ModuleBuilder::new("t");
    let y = b.var("y");
    b.function(FnSig::new("main"), y);
    let mut m = b.finish();

    let err = bind_module(&mut m).unwrap_err();
    assert_eq!(
        err,
        TypeError::UnboundName {
            name: "y".into(),
            expr: y,
            span: m.expr(y).span,
        }
    );
}

#[test]
fn names_do_not_leak_out_of_let_bodies() {
    // (let x = 1 in x); x
    let mut b = ModuleBuilder::new("t");
    let one = b.number(1);
    let x_in = b.var("x");
    let let_e = b.let_in("x", one, x_in);
    let x_out = b.var("x");
    let body = b.seq(let_e, x_out);
    b.function(FnSig::new("main"), body);
    let mut m = b.finish();

    let err = bind_module(&mut m).unwrap_err();
    assert!(matches!(err, TypeError::UnboundName { expr, .. } if expr == x_out));
}

#[test]
fn duplicate_top_level_definition() {
    let mut b = ModuleBuilder::new("t");
    let one = b.number(1);
    b.function(FnSig::new("f"), one);
    let two = b.number(2);
    b.function(FnSig::new("f"), two);
    let mut m = b.finish();

    let err = bind_module(&mut m).unwrap_err();
    assert!(matches!(err, TypeError::DuplicateDefinition { ref name, .. } if name == "f"));
}

#[test]
fn assignment_requires_mutable_let() {
    let mut b = ModuleBuilder::new("t");
    let one = b.number(1);
    let x = b.var("x");
    let two = b.number(2);
    let assign = b.assign(x, two);
    let let_e = b.let_in("x", one, assign);
    b.function(FnSig::new("main"), let_e);
    let mut m = b.finish();

    let err = bind_module(&mut m).unwrap_err();
    assert!(
        matches!(err, TypeError::AssignToImmutable { ref name, expr, .. } if name == "x" && expr == x),
        "{err:?}"
    );
}

#[test]
fn assignment_to_mutable_let_is_accepted() {
    let mut b = ModuleBuilder::new("t");
    let one = b.number(1);
    let x = b.var("x");
    let two = b.number(2);
    let assign = b.assign(x, two);
    let let_e = b.let_mut("x", one, assign);
    b.function(FnSig::new("main"), let_e);
    let mut m = b.finish();

    assert!(bind_module(&mut m).is_ok());
}

#[test]
fn assignment_to_parameter_is_rejected() {
    let mut b = ModuleBuilder::new("t");
    let p = b.var("p");
    let one = b.number(1);
    let assign = b.assign(p, one);
    b.function(FnSig::new("main").param_inferred("p"), assign);
    let mut m = b.finish();

    assert!(matches!(
        bind_module(&mut m),
        Err(TypeError::AssignToImmutable { .. })
    ));
}

#[test]
fn assignment_to_literal_is_invalid() {
    let mut b = ModuleBuilder::new("t");
    let one = b.number(1);
    let two = b.number(2);
    let assign = b.assign(one, two);
    b.function(FnSig::new("main"), assign);
    let mut m = b.finish();

    assert!(matches!(
        bind_module(&mut m),
        Err(TypeError::InvalidAssignTarget { expr, .. }) if expr == one
    ));
}
