//! Free-variable analysis for function literals.

use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use spl_ast::{DeclId, DeclKind, ExprKind, FuncId, Module};

/// Order in which a literal's captures become leading parameters.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptureOrder {
    /// First reference in a pre-order walk of the body.
    #[default]
    Discovery,
    /// By name, ties broken by declaration order.
    Sorted,
}

/// Whether `decl` lives in a function frame, as opposed to naming a
/// top-level function or extern.
pub fn is_local(module: &Module, decl: DeclId) -> bool {
    match module.decl(decl).kind {
        DeclKind::Let(_) | DeclKind::Param { .. } | DeclKind::Capture { .. } => true,
        DeclKind::Func(f) => module.func(f).literal.is_some(),
        DeclKind::Extern(_) => false,
    }
}

/// Declarations `func` itself introduces: its captures, parameters, own
/// name and every `let` in its body.
pub fn introduced_by(module: &Module, func: FuncId) -> FxHashSet<DeclId> {
    let def = module.func(func);
    let mut out: FxHashSet<DeclId> = def.all_params().collect();
    out.insert(def.decl);
    if let Some(body) = def.body {
        for e in module.subtree(body) {
            if let ExprKind::Let { decl, .. } = module.expr(e).kind {
                out.insert(decl);
            }
        }
    }
    out
}

/// The local declarations `func`'s body reads without introducing them.
///
/// Nested literals are not entered: once lifted they appear in the body
/// only through their activation records, which are ordinary references.
pub fn free_variables(module: &Module, func: FuncId, order: CaptureOrder) -> Vec<DeclId> {
    let Some(body) = module.func(func).body else {
        return Vec::new();
    };
    let introduced = introduced_by(module, func);
    let mut seen = FxHashSet::default();
    let mut out = Vec::new();
    for e in module.subtree(body) {
        let decl = match module.expr(e).kind {
            ExprKind::Variable {
                binding: Some(d), ..
            } => d,
            ExprKind::Register(d) => d,
            _ => continue,
        };
        if introduced.contains(&decl) || !is_local(module, decl) {
            continue;
        }
        if seen.insert(decl) {
            out.push(decl);
        }
    }
    if order == CaptureOrder::Sorted {
        out.sort_by(|a, b| {
            module
                .decl(*a)
                .name
                .cmp(&module.decl(*b).name)
                .then(a.cmp(b))
        });
    }
    out
}
