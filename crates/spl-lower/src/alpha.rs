//! Alpha-renaming.
//!
//! Renaming rewrites one declaration and the references to it inside a
//! given subtree. Arena nodes belong to exactly one tree, so a rename never
//! reaches a sibling function's nodes.

use rustc_hash::FxHashSet;
use spl_ast::{DeclId, ExprId, ExprKind, FuncId, Module};

/// Rename `decl` to `new_name`, along with every reference to it below
/// `root`. Returns the number of references rewritten.
pub fn rename_binding(module: &mut Module, root: ExprId, decl: DeclId, new_name: &str) -> usize {
    module.decl_mut(decl).name = new_name.to_string();
    let mut rewritten = 0;
    for e in module.subtree(root) {
        if let ExprKind::Variable {
            name,
            binding: Some(d),
            ..
        } = &mut module.expr_mut(e).kind
        {
            if *d == decl {
                *name = new_name.to_string();
                rewritten += 1;
            }
        }
    }
    rewritten
}

/// Declarations owned by `func` in introduction order: captures,
/// parameters, then `let`s in pre-order.
pub(crate) fn owned_decls(module: &Module, func: FuncId) -> Vec<DeclId> {
    let def = module.func(func);
    let mut out: Vec<DeclId> = def.all_params().collect();
    if let Some(body) = def.body {
        for e in module.subtree(body) {
            if let ExprKind::Let { decl, .. } = module.expr(e).kind {
                out.push(decl);
            }
        }
    }
    out
}

/// Give every declaration in `func` a distinct spelling.
///
/// The first declaration with a spelling keeps it; later ones become
/// `name$N` with the smallest `N` not already taken in the function.
/// Returns the number of declarations renamed.
pub fn uniquify_function(module: &mut Module, func: FuncId) -> usize {
    let decls = owned_decls(module, func);
    let mut taken: FxHashSet<String> = decls
        .iter()
        .map(|d| module.decl(*d).name.clone())
        .collect();
    let mut used: FxHashSet<String> = FxHashSet::default();
    let body = module.func(func).body;
    let mut renamed = 0;

    for d in decls {
        let name = module.decl(d).name.clone();
        if used.insert(name.clone()) {
            continue;
        }
        let mut n = 1;
        let fresh = loop {
            let candidate = format!("{}${}", name, n);
            if !taken.contains(&candidate) {
                break candidate;
            }
            n += 1;
        };
        tracing::trace!(func = %module.func(func).name, from = %name, to = %fresh, "alpha rename");
        match body {
            Some(root) => {
                rename_binding(module, root, d, &fresh);
            }
            None => module.decl_mut(d).name = fresh.clone(),
        }
        taken.insert(fresh.clone());
        used.insert(fresh);
        renamed += 1;
    }
    renamed
}

/// Refresh the `names` of every closure in `module` from the capture
/// declarations of the function it builds.
pub fn sync_closure_names(module: &mut Module) {
    let ids: Vec<ExprId> = module.expr_ids().collect();
    for e in ids {
        let ExprKind::Closure { func, .. } = module.expr(e).kind else {
            continue;
        };
        let fresh: Vec<String> = module
            .func(func)
            .captures
            .iter()
            .map(|d| module.decl(*d).name.clone())
            .collect();
        if let ExprKind::Closure { names, .. } = &mut module.expr_mut(e).kind {
            *names = fresh;
        }
    }
}
