//! Local storage materialization.
//!
//! Rewrites reads of a function's own storage into the backend-facing
//! wrapper nodes: parameters and captures become `ArgRegister`s indexed by
//! incoming argument position, `let` locals become `Register`s. Names of
//! top-level functions stay `Variable`s.

use spl_ast::{DeclId, DeclKind, ExprKind, FuncId, Module};

/// Materialize every emitted function. Returns the number of rewritten
/// references.
#[tracing::instrument(level = "debug", skip_all, fields(module = %module.name))]
pub fn materialize_locals(module: &mut Module) -> usize {
    let funcs: Vec<FuncId> = module.emitted_items().collect();
    let total: usize = funcs.into_iter().map(|f| materialize_function(module, f)).sum();
    tracing::debug!(rewritten = total, "locals materialized");
    total
}

pub fn materialize_function(module: &mut Module, func: FuncId) -> usize {
    let Some(body) = module.func(func).body else {
        return 0;
    };
    let args: Vec<DeclId> = module.func(func).all_params().collect();
    let mut rewritten = 0;
    for e in module.subtree(body) {
        let Some(decl) = module.expr(e).binding() else {
            continue;
        };
        let kind = if let Some(index) = args.iter().position(|a| *a == decl) {
            ExprKind::ArgRegister { func, index }
        } else if matches!(module.decl(decl).kind, DeclKind::Let(_)) {
            ExprKind::Register(decl)
        } else {
            continue;
        };
        module.expr_mut(e).kind = kind;
        rewritten += 1;
    }
    rewritten
}
