//! Monomorphization.
//!
//! Starting from every non-generic item, each reference to a generic
//! function is redirected to a specialization for its recorded type
//! arguments. Specializations are deep copies of the template with every
//! type substituted, and are cached on the template by argument tuple: a
//! second request for the same tuple returns the function created by the
//! first. New specializations are queued so that generic calls inside them
//! are specialized in turn.

use rustc_hash::FxHashMap;
use spl_ast::{Decl, DeclId, DeclKind, Expr, ExprId, ExprKind, FuncDef, FuncId, Module};
use spl_common::Span;
use spl_types::Ty;

use crate::error::LowerError;

/// Upper bound on specializations per module. Polymorphic recursion such as
/// `f<T>` calling `f<Array<T>>` would otherwise never terminate.
pub const SPECIALIZATION_LIMIT: usize = 1024;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MonoStats {
    pub specializations: usize,
    pub cache_hits: usize,
    /// References redirected to a specialization.
    pub rebound: usize,
}

#[tracing::instrument(level = "debug", skip_all, fields(module = %module.name))]
pub fn monomorphize(module: &mut Module) -> Result<MonoStats, LowerError> {
    let mut stats = MonoStats::default();
    let mut worklist: Vec<FuncId> = module.emitted_items().collect();
    worklist.reverse();

    while let Some(f) = worklist.pop() {
        let Some(body) = module.func(f).body else {
            continue;
        };
        for e in module.subtree_deep(body) {
            let (decl, args) = match &module.expr(e).kind {
                ExprKind::Variable {
                    binding: Some(d),
                    instantiation: Some(args),
                    ..
                } => (*d, args.clone()),
                _ => continue,
            };
            let Some(template) = module.decl(decl).func() else {
                continue;
            };
            if !module.func(template).is_generic() {
                continue;
            }

            let span = module.expr(e).span;
            let (spec, created) = specialize(module, template, &args, span, stats.specializations)?;
            if created {
                stats.specializations += 1;
                worklist.push(spec);
            } else {
                stats.cache_hits += 1;
            }

            let spec_name = module.func(spec).name.clone();
            let spec_decl = module.func(spec).decl;
            if let ExprKind::Variable { name, binding, .. } = &mut module.expr_mut(e).kind {
                *name = spec_name;
                *binding = Some(spec_decl);
            }
            stats.rebound += 1;
        }
    }

    tracing::debug!(
        specializations = stats.specializations,
        cache_hits = stats.cache_hits,
        rebound = stats.rebound,
        "monomorphization complete"
    );
    Ok(stats)
}

/// The specialization of `template` for `args`, creating it on first
/// request. The flag reports whether it was created now.
pub fn specialize(
    module: &mut Module,
    template: FuncId,
    args: &[Ty],
    span: Span,
    created_so_far: usize,
) -> Result<(FuncId, bool), LowerError> {
    if let Some(&spec) = module.func(template).specializations.get(args) {
        return Ok((spec, false));
    }
    let def = module.func(template);
    if created_so_far >= SPECIALIZATION_LIMIT {
        return Err(LowerError::SpecializationLimit {
            name: def.name.clone(),
            limit: SPECIALIZATION_LIMIT,
            span,
        });
    }

    let subst: FxHashMap<u32, Ty> = def
        .generic_vars
        .iter()
        .zip(args.iter())
        .map(|(g, a)| (g.id, a.clone()))
        .collect();
    // An extern links against one symbol whatever its instantiation.
    let name = if def.is_extern() {
        def.name.clone()
    } else {
        let mangled: Vec<String> = args.iter().map(Ty::mangle).collect();
        format!("{}${}", def.name, mangled.join("$"))
    };
    let template_decl = def.decl;

    let mut cloner = Cloner {
        module,
        subst,
        decls: FxHashMap::default(),
        funcs: FxHashMap::default(),
    };
    let spec = cloner.clone_header(template, name, None);
    // Recursive references keep pointing at the template so that they are
    // specialized for their own arguments.
    cloner.decls.remove(&template_decl);

    // Cached before the body is copied: a recursive use resolves to this
    // specialization instead of starting another.
    cloner
        .module
        .func_mut(template)
        .specializations
        .insert(args.to_vec(), spec);
    cloner.clone_body(template, spec);

    let module = cloner.module;
    module.func_mut(spec).specialization_of = Some((template, args.to_vec()));
    module.items.push(spec);
    tracing::trace!(name = %module.func(spec).name, "specialized");
    Ok((spec, true))
}

/// Deep copy of a function with its types substituted.
struct Cloner<'m> {
    module: &'m mut Module,
    subst: FxHashMap<u32, Ty>,
    decls: FxHashMap<DeclId, DeclId>,
    funcs: FxHashMap<FuncId, FuncId>,
}

impl Cloner<'_> {
    fn ty(&self, ty: Option<&Ty>) -> Option<Ty> {
        ty.map(|t| t.substitute(&self.subst))
    }

    fn decl(&self, d: DeclId) -> DeclId {
        self.decls.get(&d).copied().unwrap_or(d)
    }

    fn func(&self, f: FuncId) -> FuncId {
        self.funcs.get(&f).copied().unwrap_or(f)
    }

    fn clone_decl(&mut self, old: DeclId, kind: DeclKind) -> DeclId {
        let d = self.module.decl(old);
        let copy = match self.ty(d.ty()) {
            Some(ty) => Decl::typed(d.name.clone(), d.mutable, kind, d.span, ty),
            None => Decl::new(d.name.clone(), d.mutable, kind, d.span),
        };
        let id = self.module.alloc_decl(copy);
        self.decls.insert(old, id);
        id
    }

    /// Everything but the body. Parameters and the name declaration are
    /// copied so that references inside the body can be redirected.
    fn clone_header(&mut self, old: FuncId, name: String, context: Option<FuncId>) -> FuncId {
        let def = self.module.func(old).clone();
        let id = FuncId::new(self.module.func_count() as u32);

        let captures = def
            .captures
            .iter()
            .enumerate()
            .map(|(index, d)| self.clone_decl(*d, DeclKind::Capture { func: id, index }))
            .collect();
        let params = def
            .params
            .iter()
            .enumerate()
            .map(|(index, d)| self.clone_decl(*d, DeclKind::Param { func: id, index }))
            .collect();
        let kind = match self.module.decl(def.decl).kind {
            DeclKind::Extern(_) => DeclKind::Extern(id),
            _ => DeclKind::Func(id),
        };
        let decl = self.clone_decl(def.decl, kind);

        let copy = FuncDef {
            name,
            generics: Vec::new(),
            params,
            param_types: def.param_types,
            ret_type: def.ret_type,
            body: None,
            context,
            literal: None,
            purity: def.purity,
            decl,
            span: def.span,
            captures,
            generic_vars: Vec::new(),
            ty: self.ty(def.ty.as_ref()),
            specializations: FxHashMap::default(),
            specialization_of: None,
        };
        let allocated = self.module.alloc_func(copy);
        debug_assert_eq!(allocated, id);
        // References are renamed along with their binding, so the
        // declaration must spell the function's new name.
        self.module.decl_mut(decl).name = self.module.func(id).name.clone();
        self.funcs.insert(old, id);
        id
    }

    fn clone_body(&mut self, old: FuncId, new: FuncId) {
        if let Some(body) = self.module.func(old).body {
            let copy = self.clone_expr(body, new);
            self.module.func_mut(new).body = Some(copy);
        }
    }

    fn clone_expr(&mut self, e: ExprId, owner: FuncId) -> ExprId {
        let old = self.module.expr(e).clone();
        let ty = self.ty(old.ty());
        let span = old.span;
        let kind = match old.kind {
            ExprKind::Number(n) => ExprKind::Number(n),
            ExprKind::Str(s) => ExprKind::Str(s),
            ExprKind::Bool(b) => ExprKind::Bool(b),
            ExprKind::Variable {
                name,
                binding,
                instantiation,
            } => ExprKind::Variable {
                name,
                binding: binding.map(|d| self.decl(d)),
                instantiation: instantiation
                    .map(|args| args.iter().map(|a| a.substitute(&self.subst)).collect()),
            },
            ExprKind::Unary { op, operand } => ExprKind::Unary {
                op,
                operand: self.clone_expr(operand, owner),
            },
            ExprKind::Binary { op, lhs, rhs } => ExprKind::Binary {
                op,
                lhs: self.clone_expr(lhs, owner),
                rhs: self.clone_expr(rhs, owner),
            },
            ExprKind::Seq { first, second } => ExprKind::Seq {
                first: self.clone_expr(first, owner),
                second: self.clone_expr(second, owner),
            },
            ExprKind::Assign { target, value } => ExprKind::Assign {
                target: self.clone_expr(target, owner),
                value: self.clone_expr(value, owner),
            },
            ExprKind::Index { base, index } => ExprKind::Index {
                base: self.clone_expr(base, owner),
                index: self.clone_expr(index, owner),
            },
            ExprKind::Member {
                base,
                field,
                field_index,
            } => ExprKind::Member {
                base: self.clone_expr(base, owner),
                field,
                field_index,
            },
            ExprKind::If {
                cond,
                then_branch,
                else_branch,
            } => ExprKind::If {
                cond: self.clone_expr(cond, owner),
                then_branch: self.clone_expr(then_branch, owner),
                else_branch: self.clone_expr(else_branch, owner),
            },
            ExprKind::While { cond, body } => ExprKind::While {
                cond: self.clone_expr(cond, owner),
                body: self.clone_expr(body, owner),
            },
            ExprKind::Let { decl, init, body } => {
                let init = self.clone_expr(init, owner);
                // Pointed at the copied `Let` once it is allocated.
                let decl = self.clone_decl(decl, DeclKind::Let(e));
                let body = self.clone_expr(body, owner);
                ExprKind::Let { decl, init, body }
            }
            ExprKind::Func(f) => {
                let name = self.module.func(f).name.clone();
                let copy = self.clone_header(f, name, Some(owner));
                self.clone_body(f, copy);
                ExprKind::Func(copy)
            }
            ExprKind::Closure {
                func,
                record,
                names,
            } => ExprKind::Closure {
                func: self.func(func),
                record: record.iter().map(|r| self.clone_expr(*r, owner)).collect(),
                names,
            },
            ExprKind::FuncRef(f) => ExprKind::FuncRef(self.func(f)),
            ExprKind::Call { callee, args } => ExprKind::Call {
                callee: self.clone_expr(callee, owner),
                args: args.iter().map(|a| self.clone_expr(*a, owner)).collect(),
            },
            ExprKind::Array {
                elem,
                size,
                default,
            } => ExprKind::Array {
                elem,
                size: self.clone_expr(size, owner),
                default: self.clone_expr(default, owner),
            },
            ExprKind::Construct { name, params, args } => ExprKind::Construct {
                name,
                params,
                args: args.iter().map(|a| self.clone_expr(*a, owner)).collect(),
            },
            ExprKind::Register(d) => ExprKind::Register(self.decl(d)),
            ExprKind::ArgRegister { func, index } => ExprKind::ArgRegister {
                func: self.func(func),
                index,
            },
        };

        let copy = match ty {
            Some(ty) => Expr::typed(kind, span, ty),
            None => Expr::new(kind, span),
        };
        let id = self.module.alloc_expr(copy);
        if let ExprKind::Let { decl, .. } = self.module.expr(id).kind {
            self.module.decl_mut(decl).kind = DeclKind::Let(id);
        }
        if let ExprKind::Func(f) = self.module.expr(id).kind {
            self.module.func_mut(f).literal = Some(id);
        }
        id
    }
}
