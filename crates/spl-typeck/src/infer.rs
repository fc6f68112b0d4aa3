//! Constraint-based type inference.
//!
//! Inference runs in phases over one equation store keyed by node identity:
//!
//! 1. **Signatures**: every function's parameter and return annotations are
//!    resolved (missing ones become fresh variables) and packaged as a
//!    [`Scheme`].
//! 2. **Collection**: each expression asserts its typing rule as direct type
//!    assertions, equations between two nodes, or deferred registrations
//!    (member and element access wait for their receiver's type).
//! 3. **Unification**: assertions, then equations, are merged through the
//!    union-find table.
//! 4. **Second pass**: deferred member and element accesses are resolved
//!    until a fixed point; generic references are matched against their
//!    signatures; every node must now be concrete.
//! 5. **Population**: resolved types are written back onto expressions,
//!    declarations and function signatures.

use rustc_hash::FxHashMap;
use spl_ast::{BinOp, DeclId, ExprId, ExprKind, FuncId, Module};
use spl_types::{Placeholder, Scheme, Ty, TyVar, TypeRegistry};

use crate::error::{ConstraintOrigin, TypeError};
use crate::unify::InferCtx;

/// The identity a type variable is attached to.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
enum Slot {
    Expr(ExprId),
    Decl(DeclId),
}

struct Assertion {
    slot: Slot,
    ty: Ty,
    origin: ConstraintOrigin,
}

struct Equation {
    lhs: Slot,
    rhs: Slot,
    origin: ConstraintOrigin,
}

/// A call, checked once everything else about its callee is known.
struct CallSite {
    call: ExprId,
    callee: ExprId,
    ty: Ty,
}

/// A use of a generic function's name.
#[derive(Copy, Clone)]
struct GenericRef {
    expr: ExprId,
    func: FuncId,
}

/// Counters reported once inference finishes.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct InferStats {
    pub assertions: usize,
    pub equations: usize,
    pub deferred: usize,
    pub instantiations: usize,
}

/// Transient state of one inference run over one module.
pub struct TypeInferer<'a> {
    module: &'a mut Module,
    registry: &'a TypeRegistry,
    ctx: InferCtx,
    slots: FxHashMap<Slot, TyVar>,
    tys: Vec<Assertion>,
    eqns: Vec<Equation>,
    calls: Vec<CallSite>,
    members: Vec<ExprId>,
    array_accesses: Vec<ExprId>,
    arithmetic: Vec<ExprId>,
    generic_refs: Vec<GenericRef>,
    schemes: FxHashMap<FuncId, Scheme>,
    /// Generic parameters in scope inside each function, by written name.
    generic_envs: FxHashMap<FuncId, FxHashMap<String, Ty>>,
    /// Field index resolved for each member access.
    field_indices: FxHashMap<ExprId, usize>,
    /// Expressions visited by collection, in visit order.
    visited: Vec<ExprId>,
}

/// Infer and record types for every expression in an already bound module.
#[tracing::instrument(level = "debug", skip_all, fields(module = %module.name))]
pub fn infer_module(module: &mut Module, registry: &TypeRegistry) -> Result<InferStats, TypeError> {
    let mut inferer = TypeInferer::new(module, registry);
    inferer.declare_signatures()?;
    inferer.collect_bodies()?;
    inferer.type_unification()?;
    inferer.resolve_deferred()?;
    let instantiations = inferer.match_generic_refs()?;
    inferer.check_arithmetic()?;
    let stats = InferStats {
        assertions: inferer.tys.len() + inferer.calls.len(),
        equations: inferer.eqns.len(),
        deferred: inferer.members.len() + inferer.array_accesses.len(),
        instantiations: instantiations.len(),
    };
    inferer.type_population(instantiations)?;
    tracing::debug!(
        assertions = stats.assertions,
        equations = stats.equations,
        deferred = stats.deferred,
        instantiations = stats.instantiations,
        "inference complete"
    );
    Ok(stats)
}

impl<'a> TypeInferer<'a> {
    fn new(module: &'a mut Module, registry: &'a TypeRegistry) -> Self {
        TypeInferer {
            module,
            registry,
            ctx: InferCtx::new(),
            slots: FxHashMap::default(),
            tys: Vec::new(),
            eqns: Vec::new(),
            calls: Vec::new(),
            members: Vec::new(),
            array_accesses: Vec::new(),
            arithmetic: Vec::new(),
            generic_refs: Vec::new(),
            schemes: FxHashMap::default(),
            generic_envs: FxHashMap::default(),
            field_indices: FxHashMap::default(),
            visited: Vec::new(),
        }
    }

    // ── Store ──────────────────────────────────────────────────────────

    fn var(&mut self, slot: Slot) -> TyVar {
        if let Some(v) = self.slots.get(&slot) {
            return *v;
        }
        let v = self.ctx.fresh_var();
        self.slots.insert(slot, v);
        v
    }

    fn ty(&mut self, slot: Slot, ty: Ty, origin: ConstraintOrigin) {
        self.var(slot);
        self.tys.push(Assertion { slot, ty, origin });
    }

    fn eqn(&mut self, lhs: Slot, rhs: Slot, origin: ConstraintOrigin) {
        self.var(lhs);
        self.var(rhs);
        self.eqns.push(Equation { lhs, rhs, origin });
    }

    fn span(&self, e: ExprId) -> spl_common::Span {
        self.module.expr(e).span
    }

    fn resolved(&mut self, slot: Slot) -> Ty {
        let v = self.var(slot);
        self.ctx.resolve(&Ty::Var(v))
    }

    // ── Phase 1: signatures ────────────────────────────────────────────

    fn declare_signatures(&mut self) -> Result<(), TypeError> {
        let items = self.module.items.clone();
        for f in items {
            self.declare_function(f, FxHashMap::default())?;
        }
        tracing::debug!(functions = self.schemes.len(), "signatures declared");
        Ok(())
    }

    fn declare_function(
        &mut self,
        f: FuncId,
        mut env: FxHashMap<String, Ty>,
    ) -> Result<(), TypeError> {
        let def = self.module.func(f);
        if def.is_generic() && def.literal.is_some() {
            return Err(TypeError::NestedGeneric {
                name: def.name.clone(),
                span: def.span,
            });
        }

        let generic_vars = def
            .generics
            .iter()
            .map(Placeholder::resolve_as_generic)
            .collect::<Result<Vec<_>, _>>()?;
        for g in &generic_vars {
            env.insert(g.name.clone(), Ty::Generic(g.clone()));
        }

        let param_types = def.param_types.clone();
        let ret_type = def.ret_type.clone();
        let params = def.params.clone();
        let decl = def.decl;
        let generic = def.is_generic();

        let mut param_tys = Vec::with_capacity(params.len());
        for (p, annotation) in params.iter().zip(param_types.iter()) {
            let ty = match annotation {
                Some(placeholder) => placeholder.resolve(self.registry, &env)?,
                None => Ty::Var(self.ctx.fresh_var()),
            };
            let annotation_span = self.module.decl(*p).span;
            self.ty(
                Slot::Decl(*p),
                ty.clone(),
                ConstraintOrigin::Annotation { annotation_span },
            );
            param_tys.push(ty);
        }
        let ret = match &ret_type {
            Some(placeholder) => placeholder.resolve(self.registry, &env)?,
            None => Ty::Var(self.ctx.fresh_var()),
        };
        let sig = Ty::fun(param_tys, ret);

        if !generic {
            let annotation_span = self.module.decl(decl).span;
            self.ty(
                Slot::Decl(decl),
                sig.clone(),
                ConstraintOrigin::Annotation { annotation_span },
            );
        }

        self.module.func_mut(f).generic_vars = generic_vars.clone();
        self.schemes.insert(
            f,
            Scheme {
                generics: generic_vars,
                ty: sig,
            },
        );
        self.generic_envs.insert(f, env.clone());

        for lit in self.module.nested_literals(f) {
            self.declare_function(lit, env.clone())?;
        }
        Ok(())
    }

    // ── Phase 2: collection ────────────────────────────────────────────

    fn collect_bodies(&mut self) -> Result<(), TypeError> {
        let items = self.module.items.clone();
        for f in items {
            self.collect_function(f)?;
        }
        tracing::debug!(
            assertions = self.tys.len(),
            equations = self.eqns.len(),
            members = self.members.len(),
            array_accesses = self.array_accesses.len(),
            "constraints collected"
        );
        Ok(())
    }

    fn collect_function(&mut self, f: FuncId) -> Result<(), TypeError> {
        let def = self.module.func(f);
        let Some(body) = def.body else {
            return Ok(());
        };
        let fn_span = def.span;
        let Ty::Fun(_, ret) = &self.schemes[&f].ty else {
            unreachable!("function signatures are always function types");
        };
        let ret = (**ret).clone();

        self.collect(f, body)?;
        self.ty(
            Slot::Expr(body),
            ret,
            ConstraintOrigin::Return {
                body,
                body_span: self.span(body),
                fn_span,
            },
        );
        Ok(())
    }

    /// Emit the constraints for `e` and everything below it. Children are
    /// visited first.
    fn collect(&mut self, f: FuncId, e: ExprId) -> Result<(), TypeError> {
        self.visited.push(e);
        self.var(Slot::Expr(e));
        let kind = self.module.expr(e).kind.clone();
        for child in kind.children() {
            self.collect(f, child)?;
        }

        let this = Slot::Expr(e);
        let span = self.span(e);
        match kind {
            ExprKind::Number(_) => {
                self.ty(this, Ty::int32(), ConstraintOrigin::Literal { expr: e, span });
            }
            ExprKind::Str(_) => {
                self.ty(this, Ty::string(), ConstraintOrigin::Literal { expr: e, span });
            }
            ExprKind::Bool(_) => {
                self.ty(this, Ty::bool(), ConstraintOrigin::Literal { expr: e, span });
            }
            ExprKind::Variable { name, binding, .. } => {
                let Some(decl) = binding else {
                    return Err(TypeError::UnboundName { name, expr: e, span });
                };
                match self.module.decl(decl).func() {
                    Some(g) if self.module.func(g).is_generic() => {
                        let arity = self.schemes[&g].generics.len();
                        let fresh: Vec<Ty> =
                            (0..arity).map(|_| Ty::Var(self.ctx.fresh_var())).collect();
                        let inst = self.schemes[&g].param_rebind(&fresh);
                        self.ty(this, inst, ConstraintOrigin::Instantiation { expr: e, span });
                        self.generic_refs.push(GenericRef { expr: e, func: g });
                    }
                    _ => {
                        let decl_span = self.module.decl(decl).span;
                        self.eqn(
                            this,
                            Slot::Decl(decl),
                            ConstraintOrigin::VariableUse {
                                expr: e,
                                span,
                                decl_span,
                            },
                        );
                    }
                }
            }
            ExprKind::Unary { operand, .. } => {
                let origin = ConstraintOrigin::Condition {
                    expr: operand,
                    span: self.span(operand),
                };
                self.ty(Slot::Expr(operand), Ty::bool(), origin);
                self.ty(this, Ty::bool(), ConstraintOrigin::Literal { expr: e, span });
            }
            ExprKind::Binary { op, lhs, rhs } => {
                let origin = ConstraintOrigin::BinOp {
                    expr: e,
                    op,
                    op_span: span,
                };
                match op {
                    BinOp::Add | BinOp::Sub | BinOp::Mul => {
                        self.eqn(Slot::Expr(lhs), Slot::Expr(rhs), origin.clone());
                        self.eqn(this, Slot::Expr(lhs), origin);
                        self.arithmetic.push(e);
                    }
                    BinOp::Eq => {
                        self.eqn(Slot::Expr(lhs), Slot::Expr(rhs), origin.clone());
                        self.ty(this, Ty::bool(), origin);
                    }
                    BinOp::Concat => {
                        self.ty(Slot::Expr(lhs), Ty::string(), origin.clone());
                        self.ty(Slot::Expr(rhs), Ty::string(), origin.clone());
                        self.ty(this, Ty::string(), origin);
                    }
                }
            }
            ExprKind::Seq { second, .. } => {
                self.eqn(this, Slot::Expr(second), ConstraintOrigin::Sequence { expr: e, span });
            }
            ExprKind::Assign { target, value } => {
                let origin = ConstraintOrigin::Assignment {
                    lhs: target,
                    lhs_span: self.span(target),
                    rhs: value,
                    rhs_span: self.span(value),
                };
                self.eqn(Slot::Expr(target), Slot::Expr(value), origin);
                self.ty(this, Ty::Void, ConstraintOrigin::Literal { expr: e, span });
            }
            ExprKind::Index { index, .. } => {
                let origin = ConstraintOrigin::Index {
                    expr: index,
                    span: self.span(index),
                };
                self.ty(Slot::Expr(index), Ty::int32(), origin);
                self.array_accesses.push(e);
            }
            ExprKind::Member { .. } => {
                self.members.push(e);
            }
            ExprKind::If {
                cond,
                then_branch,
                else_branch,
            } => {
                let cond_origin = ConstraintOrigin::Condition {
                    expr: cond,
                    span: self.span(cond),
                };
                self.ty(Slot::Expr(cond), Ty::bool(), cond_origin);
                let origin = ConstraintOrigin::IfBranches {
                    if_span: span,
                    then_expr: then_branch,
                    then_span: self.span(then_branch),
                    else_expr: else_branch,
                    else_span: self.span(else_branch),
                };
                self.eqn(Slot::Expr(then_branch), Slot::Expr(else_branch), origin.clone());
                self.eqn(this, Slot::Expr(then_branch), origin);
            }
            ExprKind::While { cond, .. } => {
                let cond_origin = ConstraintOrigin::Condition {
                    expr: cond,
                    span: self.span(cond),
                };
                self.ty(Slot::Expr(cond), Ty::bool(), cond_origin);
                self.ty(this, Ty::Void, ConstraintOrigin::Literal { expr: e, span });
            }
            ExprKind::Let { decl, init, body } => {
                let origin = ConstraintOrigin::LetBinding {
                    decl_span: self.module.decl(decl).span,
                    init,
                    init_span: self.span(init),
                };
                self.eqn(Slot::Decl(decl), Slot::Expr(init), origin.clone());
                self.eqn(this, Slot::Expr(body), origin);
            }
            ExprKind::Func(g) => {
                let sig = self.schemes[&g].ty.clone();
                self.ty(this, sig, ConstraintOrigin::Literal { expr: e, span });
                self.collect_function(g)?;
            }
            ExprKind::Closure { func, record, .. } => {
                let sig = self.schemes[&func].ty.clone();
                self.ty(this, sig, ConstraintOrigin::Literal { expr: e, span });
                let captures = self.module.func(func).captures.clone();
                for (value, capture) in record.into_iter().zip(captures) {
                    let origin = ConstraintOrigin::Capture {
                        expr: value,
                        span: self.span(value),
                    };
                    self.eqn(Slot::Expr(value), Slot::Decl(capture), origin);
                }
            }
            ExprKind::FuncRef(g) => {
                let sig = self.schemes[&g].ty.clone();
                self.ty(this, sig, ConstraintOrigin::Literal { expr: e, span });
            }
            ExprKind::Call { callee, args } => {
                let params = args
                    .iter()
                    .map(|a| Ty::Var(self.var(Slot::Expr(*a))))
                    .collect();
                let result = Ty::Var(self.var(this));
                self.var(Slot::Expr(callee));
                self.calls.push(CallSite {
                    call: e,
                    callee,
                    ty: Ty::fun(params, result),
                });
            }
            ExprKind::Array {
                elem,
                size,
                default,
            } => {
                let elem_ty = elem.resolve(self.registry, &self.generic_envs[&f])?;
                let origin = ConstraintOrigin::ArrayInit { expr: e, span };
                self.ty(Slot::Expr(size), Ty::int32(), origin.clone());
                self.ty(Slot::Expr(default), elem_ty.clone(), origin.clone());
                self.ty(this, Ty::array(elem_ty), origin);
            }
            ExprKind::Construct { name, params, args } => {
                self.collect_construct(f, e, &name, &params, &args)?;
            }
            ExprKind::Register(decl) => {
                self.eqn(this, Slot::Decl(decl), ConstraintOrigin::Capture { expr: e, span });
            }
            ExprKind::ArgRegister { func, index } => {
                let decl = self.module.func(func).all_params().nth(index);
                let Some(decl) = decl else {
                    panic!(
                        "argument register {} out of range for `{}`",
                        index,
                        self.module.func(func).name
                    );
                };
                self.eqn(this, Slot::Decl(decl), ConstraintOrigin::Capture { expr: e, span });
            }
        }
        Ok(())
    }

    fn collect_construct(
        &mut self,
        f: FuncId,
        e: ExprId,
        name: &str,
        params: &[Placeholder],
        args: &[ExprId],
    ) -> Result<(), TypeError> {
        let span = self.span(e);
        let registry = self.registry;
        let Some(def) = registry.struct_def(name) else {
            return Err(spl_types::ResolveError::UnknownTypeName {
                name: name.to_string(),
                span,
            }
            .into());
        };
        let ty_args: Vec<Ty> = if params.is_empty() {
            def.generics
                .iter()
                .map(|_| Ty::Var(self.ctx.fresh_var()))
                .collect()
        } else {
            let written = Placeholder {
                name: name.to_string(),
                params: params.to_vec(),
                span,
            };
            match written.resolve(registry, &self.generic_envs[&f])? {
                Ty::Struct { args, .. } => args,
                other => unreachable!("struct name resolved to `{}`", other),
            }
        };

        if args.len() != def.fields.len() {
            return Err(TypeError::ConstructorArity {
                name: name.to_string(),
                expected: def.fields.len(),
                found: args.len(),
                expr: e,
                span,
            });
        }
        let field_types = def.field_types(&ty_args);
        for ((field, _), (arg, field_ty)) in def.fields.iter().zip(args.iter().zip(field_types)) {
            let origin = ConstraintOrigin::ConstructorArg {
                arg: *arg,
                span: self.span(*arg),
                field: field.clone(),
            };
            self.ty(Slot::Expr(*arg), field_ty, origin);
        }
        self.ty(
            Slot::Expr(e),
            Ty::struct_ty(name, ty_args),
            ConstraintOrigin::Literal { expr: e, span },
        );
        Ok(())
    }

    // ── Phase 3: unification ───────────────────────────────────────────

    fn type_unification(&mut self) -> Result<(), TypeError> {
        for i in 0..self.tys.len() {
            let slot = self.tys[i].slot;
            let v = self.var(slot);
            let a = &self.tys[i];
            self.ctx.unify(&Ty::Var(v), &a.ty, a.origin.clone())?;
        }
        for i in 0..self.eqns.len() {
            let (lhs, rhs) = (self.eqns[i].lhs, self.eqns[i].rhs);
            let (l, r) = (self.var(lhs), self.var(rhs));
            let origin = self.eqns[i].origin.clone();
            self.ctx.unify(&Ty::Var(l), &Ty::Var(r), origin)?;
        }
        for i in 0..self.calls.len() {
            let (call, callee) = (self.calls[i].call, self.calls[i].callee);
            let known = self.resolved(Slot::Expr(callee));
            if !matches!(known, Ty::Fun(..) | Ty::Var(_)) {
                return Err(TypeError::NotAFunction {
                    ty: known,
                    expr: callee,
                    span: self.span(callee),
                });
            }
            let v = self.var(Slot::Expr(callee));
            let origin = ConstraintOrigin::Call {
                call,
                span: self.span(call),
            };
            let ty = self.calls[i].ty.clone();
            self.ctx.unify(&Ty::Var(v), &ty, origin)?;
        }
        Ok(())
    }

    // ── Phase 4: second pass ───────────────────────────────────────────

    /// Resolve member and element accesses whose receivers became known,
    /// repeating while any progress is made.
    fn resolve_deferred(&mut self) -> Result<(), TypeError> {
        let mut members = self.members.clone();
        let mut arrays = self.array_accesses.clone();
        let mut rounds = 0;
        loop {
            rounds += 1;
            let before = members.len() + arrays.len();
            members = self.resolve_members(members)?;
            arrays = self.resolve_array_accesses(arrays)?;
            let after = members.len() + arrays.len();
            if after == 0 || after == before {
                break;
            }
        }
        tracing::trace!(rounds, "deferred accesses settled");

        if let Some(&e) = members.first().or(arrays.first()) {
            let base = match &self.module.expr(e).kind {
                ExprKind::Member { base, .. } | ExprKind::Index { base, .. } => *base,
                _ => e,
            };
            let ty = self.resolved(Slot::Expr(base));
            return Err(TypeError::Ambiguous {
                ty,
                expr: base,
                span: self.span(base),
            });
        }
        Ok(())
    }

    fn resolve_members(&mut self, pending: Vec<ExprId>) -> Result<Vec<ExprId>, TypeError> {
        let mut remaining = Vec::new();
        for e in pending {
            let ExprKind::Member { base, field, .. } = self.module.expr(e).kind.clone() else {
                continue;
            };
            let base_ty = self.resolved(Slot::Expr(base));
            if matches!(base_ty, Ty::Var(_)) {
                remaining.push(e);
                continue;
            }
            let span = self.span(e);
            let Some((index, field_ty)) = self.registry.field_of(&base_ty, &field) else {
                return Err(TypeError::UnknownField {
                    ty: base_ty,
                    field,
                    expr: base,
                    span: self.span(base),
                });
            };
            self.field_indices.insert(e, index);
            let v = self.var(Slot::Expr(e));
            self.ctx.unify(
                &Ty::Var(v),
                &field_ty,
                ConstraintOrigin::Member { expr: e, span },
            )?;
        }
        Ok(remaining)
    }

    fn resolve_array_accesses(&mut self, pending: Vec<ExprId>) -> Result<Vec<ExprId>, TypeError> {
        let mut remaining = Vec::new();
        for e in pending {
            let ExprKind::Index { base, .. } = self.module.expr(e).kind else {
                continue;
            };
            let base_ty = self.resolved(Slot::Expr(base));
            if matches!(base_ty, Ty::Var(_)) {
                remaining.push(e);
                continue;
            }
            let Some(elem) = base_ty.element() else {
                return Err(TypeError::NotIndexable {
                    ty: base_ty,
                    expr: base,
                    span: self.span(base),
                });
            };
            let v = self.var(Slot::Expr(e));
            let span = self.span(e);
            self.ctx
                .unify(&Ty::Var(v), &elem, ConstraintOrigin::Index { expr: e, span })?;
        }
        Ok(remaining)
    }

    /// Derive the type arguments of every generic reference from its
    /// unified use-site type.
    fn match_generic_refs(&mut self) -> Result<FxHashMap<ExprId, Vec<Ty>>, TypeError> {
        let mut out = FxHashMap::default();
        for i in 0..self.generic_refs.len() {
            let GenericRef { expr, func } = self.generic_refs[i];
            let use_ty = self.resolved(Slot::Expr(expr));
            let span = self.span(expr);
            if use_ty.has_vars() {
                return Err(TypeError::Ambiguous {
                    ty: use_ty,
                    expr,
                    span,
                });
            }
            let Ty::Fun(params, ret) = use_ty else {
                unreachable!("generic references instantiate function signatures");
            };
            let mut call_types = params;
            call_types.push(*ret);
            let args = self.schemes[&func]
                .match_generics(&call_types)
                .map_err(|reason| TypeError::GenericInstantiation {
                    name: self.module.func(func).name.clone(),
                    reason,
                    expr,
                    span,
                })?;
            tracing::trace!(
                name = %self.module.func(func).name,
                args = ?args,
                "generic instantiation"
            );
            out.insert(expr, args);
        }
        Ok(out)
    }

    fn check_arithmetic(&mut self) -> Result<(), TypeError> {
        for i in 0..self.arithmetic.len() {
            let e = self.arithmetic[i];
            let ty = self.resolved(Slot::Expr(e));
            match ty {
                Ty::Int(_) | Ty::Var(_) => {}
                other => {
                    return Err(TypeError::NotNumeric {
                        ty: other,
                        expr: e,
                        span: self.span(e),
                    })
                }
            }
        }
        Ok(())
    }

    // ── Phase 5: population ────────────────────────────────────────────

    fn type_population(
        &mut self,
        mut instantiations: FxHashMap<ExprId, Vec<Ty>>,
    ) -> Result<(), TypeError> {
        // Every node must be concrete before anything is written.
        let mut expr_types = Vec::with_capacity(self.visited.len());
        for i in 0..self.visited.len() {
            let e = self.visited[i];
            let ty = self.resolved(Slot::Expr(e));
            if ty.has_vars() {
                return Err(TypeError::Ambiguous {
                    ty,
                    expr: e,
                    span: self.span(e),
                });
            }
            expr_types.push((e, ty));
        }

        let mut decl_slots: Vec<DeclId> = self
            .slots
            .keys()
            .filter_map(|s| match s {
                Slot::Decl(d) => Some(*d),
                Slot::Expr(_) => None,
            })
            .collect();
        decl_slots.sort();
        let mut decl_types = Vec::with_capacity(decl_slots.len());
        for d in decl_slots {
            let ty = self.resolved(Slot::Decl(d));
            if ty.has_vars() {
                let decl = self.module.decl(d);
                return Err(TypeError::AmbiguousDecl {
                    name: decl.name.clone(),
                    ty,
                    span: decl.span,
                });
            }
            decl_types.push((d, ty));
        }

        let mut func_types = Vec::with_capacity(self.schemes.len());
        let mut funcs: Vec<FuncId> = self.schemes.keys().copied().collect();
        funcs.sort();
        for f in funcs {
            let sig = self.schemes[&f].ty.clone();
            func_types.push((f, self.ctx.resolve(&sig)));
        }

        let decl_count = decl_types.len();
        for (e, ty) in expr_types {
            let expr = self.module.expr_mut(e);
            expr.set_ty(ty);
            if let Some(index) = self.field_indices.get(&e) {
                if let ExprKind::Member { field_index, .. } = &mut expr.kind {
                    *field_index = Some(*index);
                }
            }
            if let Some(args) = instantiations.remove(&e) {
                if let ExprKind::Variable { instantiation, .. } = &mut expr.kind {
                    *instantiation = Some(args);
                }
            }
        }
        for (d, ty) in decl_types {
            self.module.decl_mut(d).set_ty(ty);
        }
        for (f, ty) in func_types {
            let def = self.module.func(f);
            if def.is_generic() {
                let decl = def.decl;
                self.module.decl_mut(decl).set_ty(ty.clone());
            }
            self.module.func_mut(f).ty = Some(ty);
        }

        tracing::debug!(
            exprs = self.visited.len(),
            decls = decl_count,
            "types populated"
        );
        Ok(())
    }
}
