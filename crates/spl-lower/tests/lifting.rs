//! Lambda lifting over type-checked modules.

use spl_ast::{DeclKind, ExprId, ExprKind, FnSig, FuncId, Module, ModuleBuilder, Purity};
use spl_lower::backend::lowered_signature;
use spl_lower::{lift_module, verify_handoff, CaptureOrder, LiftStats};
use spl_types::{Placeholder, Ty};

// ── Helpers ────────────────────────────────────────────────────────────

fn lower_with(b: ModuleBuilder, order: CaptureOrder) -> (Module, LiftStats) {
    let mut m = b.finish();
    spl_typeck::check(&mut m).unwrap();
    let stats = lift_module(&mut m, order).unwrap();
    verify_handoff(&m).unwrap();
    (m, stats)
}

fn lower(b: ModuleBuilder) -> (Module, LiftStats) {
    lower_with(b, CaptureOrder::Discovery)
}

/// The function a lifted use site builds, with its record.
fn closure_of(m: &Module, e: ExprId) -> (FuncId, Vec<ExprId>, Vec<String>) {
    match &m.expr(e).kind {
        ExprKind::Closure {
            func,
            record,
            names,
        } => (*func, record.clone(), names.clone()),
        other => panic!("expected closure, found {other:?}"),
    }
}

fn capture_names(m: &Module, f: FuncId) -> Vec<String> {
    m.func(f)
        .captures
        .iter()
        .map(|d| m.decl(*d).name.clone())
        .collect()
}

fn let_decl(m: &Module, e: ExprId) -> spl_ast::DeclId {
    match m.expr(e).kind {
        ExprKind::Let { decl, .. } => decl,
        ref other => panic!("expected let, found {other:?}"),
    }
}

// ── Basic lifting ──────────────────────────────────────────────────────

#[test]
fn capture_free_literal_becomes_function_reference() {
    // main = (fn g() => 1)()
    let mut b = ModuleBuilder::new("t");
    let one = b.number(1);
    let lit = b.lambda(FnSig::new("g"), one);
    let call = b.call(lit, vec![]);
    b.function(FnSig::new("main"), call);
    let (m, stats) = lower(b);

    let ExprKind::FuncRef(g) = m.expr(lit).kind else {
        panic!("expected function reference, found {:?}", m.expr(lit).kind);
    };
    let def = m.func(g);
    assert_eq!(def.name, "main.g");
    assert!(def.captures.is_empty());
    assert_eq!(def.context, None);
    assert_eq!(def.literal, None);
    assert!(m.items.contains(&g));
    assert_eq!(stats.lifted, 1);
    assert_eq!(stats.func_refs, 1);
    assert_eq!(stats.closures, 0);
}

#[test]
fn captured_variable_becomes_leading_parameter() {
    // let x = 1 in (fn add(y) => x + y)(2)
    let mut b = ModuleBuilder::new("t");
    let one = b.number(1);
    let x = b.var("x");
    let y = b.var("y");
    let sum = b.add(x, y);
    let lit = b.lambda(FnSig::new("add").param_inferred("y"), sum);
    let two = b.number(2);
    let call = b.call(lit, vec![two]);
    let let_e = b.let_in("x", one, call);
    b.function(FnSig::new("main"), let_e);
    let (m, stats) = lower(b);

    let (add, record, names) = closure_of(&m, lit);
    assert_eq!(names, ["x"]);
    assert_eq!(record.len(), 1);
    assert_eq!(m.expr(record[0]).binding(), Some(let_decl(&m, let_e)));
    assert_eq!(m.expr(record[0]).ty(), Some(&Ty::int32()));

    let capture = m.func(add).captures[0];
    assert_eq!(
        m.decl(capture).kind,
        DeclKind::Capture {
            func: add,
            index: 0
        }
    );
    assert_eq!(m.expr(x).binding(), Some(capture));
    assert_eq!(
        lowered_signature(&m, add),
        Some(Ty::fun(vec![Ty::int32(), Ty::int32()], Ty::int32()))
    );
    // The declared signature still excludes captures.
    assert_eq!(m.expr(lit).ty(), Some(&Ty::fun(vec![Ty::int32()], Ty::int32())));
    assert_eq!(stats.closures, 1);
}

#[test]
fn nested_literals_are_lifted_innermost_first() {
    // let a = 1 in fn outer() => (let b = 2 in fn inner() => a + b)
    let mut b = ModuleBuilder::new("t");
    let one = b.number(1);
    let two = b.number(2);
    let va = b.var("a");
    let vb = b.var("b");
    let sum = b.add(va, vb);
    let inner = b.lambda(FnSig::new("inner"), sum);
    let let_b = b.let_in("b", two, inner);
    let outer = b.lambda(FnSig::new("outer"), let_b);
    let let_a = b.let_in("a", one, outer);
    b.function(FnSig::new("main"), let_a);
    let (m, stats) = lower(b);

    let (inner_f, inner_record, _) = closure_of(&m, inner);
    let (outer_f, outer_record, _) = closure_of(&m, outer);
    assert_eq!(m.func(inner_f).name, "main.outer.inner");
    assert_eq!(m.func(outer_f).name, "main.outer");
    assert_eq!(capture_names(&m, inner_f), ["a", "b"]);
    assert_eq!(capture_names(&m, outer_f), ["a"]);

    // Inside `outer`, the record for `inner` reads outer's own capture and
    // its own `let`.
    let outer_capture = m.func(outer_f).captures[0];
    assert_eq!(m.expr(inner_record[0]).binding(), Some(outer_capture));
    assert_eq!(m.expr(inner_record[1]).binding(), Some(let_decl(&m, let_b)));
    // Inside `main`, the record for `outer` reads main's `let`.
    assert_eq!(m.expr(outer_record[0]).binding(), Some(let_decl(&m, let_a)));
    assert_eq!(stats.lifted, 2);
}

#[test]
fn recursive_literal_rebuilds_its_closure() {
    // let limit = 10 in
    //   (fn count(n: Int32) -> Int32 = if n == limit then n else count(n + 1))(0)
    let mut b = ModuleBuilder::new("t");
    let ten = b.number(10);
    let n1 = b.var("n");
    let limit = b.var("limit");
    let cond = b.eq(n1, limit);
    let n2 = b.var("n");
    let n3 = b.var("n");
    let one = b.number(1);
    let next = b.add(n3, one);
    let rec = b.call_named("count", vec![next]);
    let body = b.if_else(cond, n2, rec);
    let lit = b.lambda(
        FnSig::new("count")
            .param("n", Placeholder::new("Int32"))
            .returns(Placeholder::new("Int32")),
        body,
    );
    let zero = b.number(0);
    let call = b.call(lit, vec![zero]);
    let let_e = b.let_in("limit", ten, call);
    b.function(FnSig::new("main"), let_e);
    let (m, _) = lower(b);

    let (count, _, _) = closure_of(&m, lit);
    let ExprKind::Call { callee, .. } = m.expr(rec).kind else {
        panic!("expected call");
    };
    let (again, record, names) = closure_of(&m, callee);
    assert_eq!(again, count);
    assert_eq!(names, ["limit"]);
    assert_eq!(m.expr(record[0]).binding(), Some(m.func(count).captures[0]));
}

#[test]
fn capture_order_is_configurable() {
    // let b = 1 in let a = 2 in fn f() => b + a
    let build = || {
        let mut b = ModuleBuilder::new("t");
        let one = b.number(1);
        let two = b.number(2);
        let vb = b.var("b");
        let va = b.var("a");
        let sum = b.add(vb, va);
        let lit = b.lambda(FnSig::new("f"), sum);
        let call = b.call(lit, vec![]);
        let la = b.let_in("a", two, call);
        let lb = b.let_in("b", one, la);
        b.function(FnSig::new("main"), lb);
        (b, lit)
    };

    let (b, lit) = build();
    let (m, _) = lower_with(b, CaptureOrder::Discovery);
    let (f, _, names) = closure_of(&m, lit);
    assert_eq!(names, ["b", "a"]);
    assert_eq!(capture_names(&m, f), ["b", "a"]);

    let (b, lit) = build();
    let (m, _) = lower_with(b, CaptureOrder::Sorted);
    let (f, record, names) = closure_of(&m, lit);
    assert_eq!(names, ["a", "b"]);
    assert_eq!(capture_names(&m, f), ["a", "b"]);
    assert_eq!(m.decl(m.expr(record[0]).binding().unwrap()).name, "a");
}

#[test]
fn captured_mutable_keeps_its_mutability() {
    // let mut x = 1 in (fn f() => x = 2)()
    let mut b = ModuleBuilder::new("t");
    let one = b.number(1);
    let target = b.var("x");
    let two = b.number(2);
    let assign = b.assign(target, two);
    let lit = b.lambda(FnSig::new("f"), assign);
    let call = b.call(lit, vec![]);
    let let_e = b.let_mut("x", one, call);
    b.function(FnSig::new("main"), let_e);
    let (m, _) = lower(b);

    let (f, _, _) = closure_of(&m, lit);
    let capture = m.func(f).captures[0];
    assert_eq!(m.expr(target).binding(), Some(capture));
    assert!(m.decl(capture).mutable);
    assert!(m.decl(let_decl(&m, let_e)).mutable);
}

// ── Naming ─────────────────────────────────────────────────────────────

#[test]
fn local_colliding_with_capture_is_renamed() {
    // let x = 1 in (fn f(y) => x + (let x = y in x))(2)
    let mut b = ModuleBuilder::new("t");
    let one = b.number(1);
    let outer_x = b.var("x");
    let y = b.var("y");
    let inner_x = b.var("x");
    let inner = b.let_in("x", y, inner_x);
    let sum = b.add(outer_x, inner);
    let lit = b.lambda(FnSig::new("f").param_inferred("y"), sum);
    let two = b.number(2);
    let call = b.call(lit, vec![two]);
    let let_e = b.let_in("x", one, call);
    b.function(FnSig::new("main"), let_e);
    let (m, stats) = lower(b);

    let (f, _, names) = closure_of(&m, lit);
    assert_eq!(names, ["x"]);
    assert_eq!(m.expr(outer_x).binding(), Some(m.func(f).captures[0]));
    assert_eq!(m.decl(let_decl(&m, inner)).name, "x$1");
    assert!(matches!(
        &m.expr(inner_x).kind,
        ExprKind::Variable { name, .. } if name == "x$1"
    ));
    assert_eq!(stats.renamed, 1);
}

#[test]
fn lifted_names_are_unique() {
    // main = (fn f() => 1)(); (fn f() => 2)()
    let mut b = ModuleBuilder::new("t");
    let one = b.number(1);
    let f1 = b.lambda(FnSig::new("f"), one);
    let c1 = b.call(f1, vec![]);
    let two = b.number(2);
    let f2 = b.lambda(FnSig::new("f"), two);
    let c2 = b.call(f2, vec![]);
    let body = b.seq(c1, c2);
    b.function(FnSig::new("main"), body);
    let (m, _) = lower(b);

    let mut names: Vec<&str> = m.items.iter().map(|f| m.func(*f).name.as_str()).collect();
    names.sort();
    assert_eq!(names, ["main", "main.f", "main.f$1"]);
}

#[test]
fn purity_survives_lifting() {
    let mut b = ModuleBuilder::new("t");
    let one = b.number(1);
    let lit = b.lambda(FnSig::new("g").purity(Purity::Sealed), one);
    let call = b.call(lit, vec![]);
    b.function(FnSig::new("main").purity(Purity::Pure), call);
    let (m, _) = lower(b);

    let ExprKind::FuncRef(g) = m.expr(lit).kind else {
        panic!("expected function reference");
    };
    assert_eq!(m.func(g).purity, Purity::Sealed);
    assert_eq!(m.func(m.item("main").unwrap()).purity, Purity::Pure);
}

#[test]
fn unlifted_module_fails_verification() {
    let mut b = ModuleBuilder::new("t");
    let one = b.number(1);
    let lit = b.lambda(FnSig::new("g"), one);
    let call = b.call(lit, vec![]);
    b.function(FnSig::new("main"), call);
    let mut m = b.finish();
    spl_typeck::check(&mut m).unwrap();

    let err = verify_handoff(&m).unwrap_err();
    assert!(err.is_defect());
    insta::assert_snapshot!(
        err,
        @"`main` is not ready for code generation: unlifted function literal"
    );
}
