//! Closure conversion by lambda lifting.
//!
//! Every function literal reachable from emitted code becomes a top-level
//! function. Its free variables turn into leading capture parameters, and
//! the literal at its use site becomes a `Closure` carrying the activation
//! record (or a plain `FuncRef` when nothing is captured). Literals are
//! lifted innermost-first, so an outer literal that mentions an inner one
//! only sees the inner closure's record, never its body.

use rustc_hash::{FxHashMap, FxHashSet};
use spl_ast::{Decl, DeclId, DeclKind, Expr, ExprId, ExprKind, FuncId, Module};
use spl_common::Span;

use crate::alpha::{sync_closure_names, uniquify_function};
use crate::error::LowerError;
use crate::free_vars::{free_variables, CaptureOrder};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LiftStats {
    /// Literals turned into top-level functions.
    pub lifted: usize,
    /// Use sites that became closures with a non-empty record.
    pub closures: usize,
    /// Use sites that became bare function references.
    pub func_refs: usize,
    /// Declarations renamed to keep spellings unique per function.
    pub renamed: usize,
}

/// Lift every nested function literal of the module's emitted functions and
/// alpha-uniquify the result.
#[tracing::instrument(level = "debug", skip_all, fields(module = %module.name))]
pub fn lift_module(module: &mut Module, order: CaptureOrder) -> Result<LiftStats, LowerError> {
    let mut taken: FxHashSet<String> = module
        .items
        .iter()
        .map(|f| module.func(*f).name.clone())
        .collect();
    let mut stats = LiftStats::default();

    let roots: Vec<FuncId> = module.emitted_items().collect();
    for root in roots {
        let mut literals = Vec::new();
        innermost_first(module, root, &mut literals);
        for lit in literals {
            lift_literal(module, lit, order, &mut taken, &mut stats)?;
        }
    }

    let emitted: Vec<FuncId> = module.emitted_items().collect();
    for f in emitted {
        stats.renamed += uniquify_function(module, f);
    }
    sync_closure_names(module);

    tracing::debug!(
        lifted = stats.lifted,
        closures = stats.closures,
        func_refs = stats.func_refs,
        renamed = stats.renamed,
        "closure conversion complete"
    );
    Ok(stats)
}

fn innermost_first(module: &Module, func: FuncId, out: &mut Vec<FuncId>) {
    for lit in module.nested_literals(func) {
        innermost_first(module, lit, out);
        out.push(lit);
    }
}

fn lift_literal(
    module: &mut Module,
    lit: FuncId,
    order: CaptureOrder,
    taken: &mut FxHashSet<String>,
    stats: &mut LiftStats,
) -> Result<(), LowerError> {
    let captured = free_variables(module, lit, order);
    let def = module.func(lit).clone();
    let Some(use_site) = def.literal else {
        unreachable!("`{}` was listed as a literal", def.name);
    };

    // Leading parameters, one per captured declaration.
    let mut captures = Vec::with_capacity(captured.len());
    for (index, outer) in captured.iter().enumerate() {
        let decl = module.decl(*outer);
        let Some(ty) = decl.ty().cloned() else {
            return Err(LowerError::Handoff {
                func: def.name.clone(),
                reason: format!("captured `{}` has no type", decl.name),
                span: decl.span,
            });
        };
        let capture = Decl::typed(
            decl.name.clone(),
            decl.mutable,
            DeclKind::Capture { func: lit, index },
            decl.span,
            ty,
        );
        captures.push(module.alloc_decl(capture));
    }
    module.func_mut(lit).captures = captures.clone();

    if let Some(body) = def.body {
        let rebind: FxHashMap<DeclId, DeclId> =
            captured.iter().copied().zip(captures.iter().copied()).collect();
        let nodes = module.subtree(body);
        let mut self_refs = Vec::new();
        for e in nodes {
            match &mut module.expr_mut(e).kind {
                ExprKind::Variable {
                    binding: Some(d), ..
                } if *d == def.decl => self_refs.push(e),
                ExprKind::Variable {
                    binding: Some(d), ..
                }
                | ExprKind::Register(d) => {
                    if let Some(inner) = rebind.get(&*d) {
                        *d = *inner;
                    }
                }
                _ => {}
            }
        }
        // A recursive call rebuilds the closure from the lifted function's
        // own capture parameters.
        for e in self_refs {
            let span = module.expr(e).span;
            let kind = closure_kind(module, lit, &captures, span);
            module.expr_mut(e).kind = kind;
        }
    }

    let span = module.expr(use_site).span;
    let kind = closure_kind(module, lit, &captured, span);
    if matches!(kind, ExprKind::FuncRef(_)) {
        stats.func_refs += 1;
    } else {
        stats.closures += 1;
    }
    module.expr_mut(use_site).kind = kind;

    check_consistency(module, lit, use_site, &captured, order)?;

    let name = unique_name(module, lit, taken);
    tracing::debug!(name = %name, captures = captured.len(), "lifted function literal");
    let f = module.func_mut(lit);
    f.name = name;
    f.context = None;
    f.literal = None;
    module.items.push(lit);
    stats.lifted += 1;
    Ok(())
}

/// The expression that builds `func`'s closure from `values`, read in the
/// current scope.
fn closure_kind(module: &mut Module, func: FuncId, values: &[DeclId], span: Span) -> ExprKind {
    if values.is_empty() {
        return ExprKind::FuncRef(func);
    }
    let mut record = Vec::with_capacity(values.len());
    let mut names = Vec::with_capacity(values.len());
    for d in values {
        let decl = module.decl(*d);
        let name = decl.name.clone();
        let kind = ExprKind::Variable {
            name: name.clone(),
            binding: Some(*d),
            instantiation: None,
        };
        let expr = match decl.ty() {
            Some(ty) => Expr::typed(kind, span, ty.clone()),
            None => Expr::new(kind, span),
        };
        record.push(module.alloc_expr(expr));
        names.push(name);
    }
    ExprKind::Closure {
        func,
        record,
        names,
    }
}

/// The lifted body must reference nothing outside itself, and the record
/// at the use site must read exactly the captured declarations, in order.
fn check_consistency(
    module: &Module,
    lit: FuncId,
    use_site: ExprId,
    captured: &[DeclId],
    order: CaptureOrder,
) -> Result<(), LowerError> {
    let names = |ds: &[DeclId]| -> Vec<String> {
        ds.iter().map(|d| module.decl(*d).name.clone()).collect()
    };
    let def = module.func(lit);
    let error = |expected: Vec<String>, found: Vec<String>| LowerError::LiftingConsistency {
        func: def.name.clone(),
        expected,
        found,
        span: def.span,
    };

    let remaining = free_variables(module, lit, order);
    if !remaining.is_empty() {
        let mut expected = captured.to_vec();
        expected.extend(remaining);
        return Err(error(names(&expected), names(captured)));
    }

    let record: Vec<DeclId> = match &module.expr(use_site).kind {
        ExprKind::Closure { record, .. } => record
            .iter()
            .filter_map(|e| module.expr(*e).binding())
            .collect(),
        _ => Vec::new(),
    };
    if record != captured || def.captures.len() != captured.len() {
        return Err(error(names(captured), names(&record)));
    }
    Ok(())
}

/// `outer.inner` along the chain of enclosing functions, suffixed with
/// `$N` if that name is already taken.
fn unique_name(module: &Module, lit: FuncId, taken: &mut FxHashSet<String>) -> String {
    let mut parts = vec![module.func(lit).name.clone()];
    let mut ctx = module.func(lit).context;
    while let Some(c) = ctx {
        parts.push(module.func(c).name.clone());
        ctx = module.func(c).context;
    }
    parts.reverse();
    let base = parts.join(".");

    let mut name = base.clone();
    let mut n = 1;
    while taken.contains(&name) {
        name = format!("{}${}", base, n);
        n += 1;
    }
    taken.insert(name.clone());
    name
}
