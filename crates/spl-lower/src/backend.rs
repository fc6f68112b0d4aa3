//! The code-generation boundary.
//!
//! A backend receives functions that are bound, fully typed with concrete
//! types, closure-free and alpha-unique. [`verify_handoff`] checks exactly
//! that before anything is handed over; a violation is a compiler defect.
//! The handles a backend returns are opaque here.

use rustc_hash::FxHashSet;
use spl_ast::{DeclKind, ExprKind, FuncId, Module};
use spl_common::Span;
use spl_types::Ty;

use crate::alpha::owned_decls;
use crate::error::LowerError;

/// A native code generator.
///
/// Functions are declared first, all of them, so that bodies can refer to
/// any function by its handle, then bodies are defined.
pub trait Backend {
    /// Handle to an emitted function.
    type Value;
    /// Native representation of a type.
    type NativeType;
    type Error: std::fmt::Display;

    fn lower_type(&mut self, ty: &Ty) -> Result<Self::NativeType, Self::Error>;

    fn declare_function(
        &mut self,
        module: &Module,
        func: FuncId,
        signature: Self::NativeType,
    ) -> Result<Self::Value, Self::Error>;

    fn define_function(
        &mut self,
        module: &Module,
        func: FuncId,
        handle: &Self::Value,
    ) -> Result<(), Self::Error>;
}

/// The calling signature of a lifted function: captures, then declared
/// parameters.
pub fn lowered_signature(module: &Module, func: FuncId) -> Option<Ty> {
    let def = module.func(func);
    let Some(Ty::Fun(params, ret)) = &def.ty else {
        return None;
    };
    let mut all = Vec::with_capacity(def.captures.len() + params.len());
    for c in &def.captures {
        all.push(module.decl(*c).ty()?.clone());
    }
    all.extend(params.iter().cloned());
    Some(Ty::fun(all, (**ret).clone()))
}

/// Verify, then declare and define every emitted function.
#[tracing::instrument(level = "debug", skip_all, fields(module = %module.name))]
pub fn hand_off<B: Backend>(
    module: &Module,
    backend: &mut B,
) -> Result<Vec<(FuncId, B::Value)>, LowerError> {
    verify_handoff(module)?;

    let backend_error = |f: FuncId, e: B::Error| LowerError::Backend {
        func: module.func(f).name.clone(),
        message: e.to_string(),
    };

    let mut handles = Vec::new();
    for f in module.emitted_items() {
        let Some(sig) = lowered_signature(module, f) else {
            unreachable!("verified functions have signatures");
        };
        let native = backend.lower_type(&sig).map_err(|e| backend_error(f, e))?;
        let handle = backend
            .declare_function(module, f, native)
            .map_err(|e| backend_error(f, e))?;
        handles.push((f, handle));
    }
    for (f, handle) in &handles {
        if module.func(*f).is_extern() {
            continue;
        }
        backend
            .define_function(module, *f, handle)
            .map_err(|e| backend_error(*f, e))?;
    }
    tracing::debug!(functions = handles.len(), "handed off to backend");
    Ok(handles)
}

/// Check the backend contract for every emitted function.
pub fn verify_handoff(module: &Module) -> Result<(), LowerError> {
    for f in module.emitted_items() {
        verify_function(module, f)?;
    }
    Ok(())
}

fn verify_function(module: &Module, func: FuncId) -> Result<(), LowerError> {
    let def = module.func(func);
    let fail = |reason: String, span: Span| LowerError::Handoff {
        func: def.name.clone(),
        reason,
        span,
    };

    if def.context.is_some() || def.literal.is_some() {
        return Err(fail("still nested in another function".into(), def.span));
    }
    match &def.ty {
        Some(ty) if ty.is_concrete() => {}
        Some(ty) => return Err(fail(format!("signature `{}` is not concrete", ty), def.span)),
        None => return Err(fail("signature was never inferred".into(), def.span)),
    }

    let owned = owned_decls(module, func);
    let mut spellings = FxHashSet::default();
    for d in &owned {
        let decl = module.decl(*d);
        match decl.ty() {
            Some(ty) if ty.is_concrete() => {}
            _ => {
                return Err(fail(
                    format!("declaration `{}` has no concrete type", decl.name),
                    decl.span,
                ))
            }
        }
        if !spellings.insert(decl.name.as_str()) {
            return Err(fail(format!("`{}` is declared twice", decl.name), decl.span));
        }
    }
    let owned: FxHashSet<_> = owned.into_iter().collect();

    let Some(body) = def.body else {
        return Ok(());
    };
    for e in module.subtree(body) {
        let expr = module.expr(e);
        let label = expr.kind.label();
        match expr.ty() {
            Some(ty) if ty.is_concrete() => {}
            Some(ty) => {
                return Err(fail(
                    format!("{} has non-concrete type `{}`", label, ty),
                    expr.span,
                ))
            }
            None => return Err(fail(format!("{} has no type", label), expr.span)),
        }

        match &expr.kind {
            ExprKind::Func(_) => {
                return Err(fail("unlifted function literal".into(), expr.span));
            }
            ExprKind::Variable { name, binding, .. } => {
                let Some(d) = binding else {
                    return Err(fail(format!("`{}` is unbound", name), expr.span));
                };
                let decl = module.decl(*d);
                if decl.name != *name {
                    return Err(fail(
                        format!("`{}` is bound to a declaration named `{}`", name, decl.name),
                        expr.span,
                    ));
                }
                match decl.kind {
                    DeclKind::Func(g) | DeclKind::Extern(g) if module.func(g).is_generic() => {
                        return Err(fail(
                            format!("`{}` refers to a generic template", name),
                            expr.span,
                        ));
                    }
                    DeclKind::Let(_) | DeclKind::Param { .. } | DeclKind::Capture { .. }
                        if !owned.contains(d) =>
                    {
                        return Err(fail(
                            format!("`{}` belongs to another function", name),
                            expr.span,
                        ));
                    }
                    _ => {}
                }
            }
            ExprKind::Closure { func: g, record, .. } => {
                let target = module.func(*g);
                if target.literal.is_some() || target.is_generic() {
                    return Err(fail(
                        format!("closure over `{}`, which is not a lifted function", target.name),
                        expr.span,
                    ));
                }
                if record.len() != target.captures.len() {
                    return Err(fail(
                        format!(
                            "closure over `{}` supplies {} values for {} captures",
                            target.name,
                            record.len(),
                            target.captures.len()
                        ),
                        expr.span,
                    ));
                }
            }
            ExprKind::FuncRef(g) => {
                let target = module.func(*g);
                if !target.captures.is_empty() {
                    return Err(fail(
                        format!("bare reference to `{}`, which captures", target.name),
                        expr.span,
                    ));
                }
            }
            ExprKind::Register(d) if !owned.contains(d) => {
                return Err(fail(
                    format!("register for `{}` outside its function", module.decl(*d).name),
                    expr.span,
                ));
            }
            ExprKind::ArgRegister { func: g, index } => {
                if *g != func || *index >= def.captures.len() + def.params.len() {
                    return Err(fail(
                        format!("argument register {} does not belong here", index),
                        expr.span,
                    ));
                }
            }
            _ => {}
        }
    }
    Ok(())
}
