//! The backend boundary: what gets declared, what gets defined.

use spl_ast::{FnSig, FuncId, Module, ModuleBuilder};
use spl_lower::{hand_off, lift_module, materialize_locals, Backend, CaptureOrder, LowerError};
use spl_types::{Placeholder, Ty};

// ── Helpers ────────────────────────────────────────────────────────────

/// Records every call as text; optionally refuses to define one function.
#[derive(Default)]
struct RecordingBackend {
    events: Vec<String>,
    reject: Option<String>,
}

impl Backend for RecordingBackend {
    type Value = String;
    type NativeType = String;
    type Error = String;

    fn lower_type(&mut self, ty: &Ty) -> Result<String, String> {
        Ok(ty.to_string())
    }

    fn declare_function(
        &mut self,
        module: &Module,
        func: FuncId,
        signature: String,
    ) -> Result<String, String> {
        let name = module.func(func).name.clone();
        self.events.push(format!("declare {name}: {signature}"));
        Ok(name)
    }

    fn define_function(&mut self, module: &Module, func: FuncId, handle: &String) -> Result<(), String> {
        if self.reject.as_deref() == Some(module.func(func).name.as_str()) {
            return Err("unsupported construct".into());
        }
        self.events.push(format!("define {handle}"));
        Ok(())
    }
}

/// extern print(s: String) -> Void
/// main = let x = 1 in (fn add(y: Int32) -> Int32 = x + y)(2); print("done")
fn program() -> Module {
    let mut b = ModuleBuilder::new("t");
    b.extern_fn(
        FnSig::new("print")
            .param("s", Placeholder::new("String"))
            .returns(Placeholder::new("Void")),
    );
    let one = b.number(1);
    let x = b.var("x");
    let y = b.var("y");
    let sum = b.add(x, y);
    let lit = b.lambda(
        FnSig::new("add")
            .param("y", Placeholder::new("Int32"))
            .returns(Placeholder::new("Int32")),
        sum,
    );
    let two = b.number(2);
    let call = b.call(lit, vec![two]);
    let done = b.string("done");
    let print = b.call_named("print", vec![done]);
    let body = b.seq(call, print);
    let let_e = b.let_in("x", one, body);
    b.function(FnSig::new("main"), let_e);

    let mut m = b.finish();
    spl_typeck::check(&mut m).unwrap();
    lift_module(&mut m, CaptureOrder::Discovery).unwrap();
    m
}

// ── Handoff ────────────────────────────────────────────────────────────

#[test]
fn declares_everything_before_defining_bodies() {
    let m = program();
    let mut backend = RecordingBackend::default();
    let handles = hand_off(&m, &mut backend).unwrap();

    assert_eq!(handles.len(), 3);
    insta::assert_snapshot!(backend.events.join("\n"), @r"
    declare print: (String) -> Void
    declare main: () -> Void
    declare main.add: (Int32, Int32) -> Int32
    define main
    define main.add
    ");
}

#[test]
fn materialized_locals_still_satisfy_the_contract() {
    let mut m = program();
    assert!(materialize_locals(&mut m) > 0);
    let mut backend = RecordingBackend::default();
    hand_off(&m, &mut backend).unwrap();
    assert_eq!(
        backend.events.iter().filter(|e| e.starts_with("define")).count(),
        2
    );
}

#[test]
fn backend_failures_name_the_function() {
    let m = program();
    let mut backend = RecordingBackend {
        reject: Some("main.add".into()),
        ..Default::default()
    };
    let err = hand_off(&m, &mut backend).unwrap_err();
    assert!(!err.is_defect());
    assert!(
        matches!(&err, LowerError::Backend { func, message } if func == "main.add" && message == "unsupported construct"),
        "{err:?}"
    );
}

#[test]
fn unverified_modules_never_reach_the_backend() {
    let mut b = ModuleBuilder::new("t");
    let one = b.number(1);
    let lit = b.lambda(FnSig::new("g"), one);
    let call = b.call(lit, vec![]);
    b.function(FnSig::new("main"), call);
    let mut m = b.finish();
    spl_typeck::check(&mut m).unwrap();

    let mut backend = RecordingBackend::default();
    let err = hand_off(&m, &mut backend).unwrap_err();
    assert!(err.is_defect());
    assert!(backend.events.is_empty());
}
