//! Construction API for unresolved trees.
//!
//! This is the surface a parser drives: identifiers are plain strings, type
//! positions are [`Placeholder`]s, and nothing is bound or typed yet. Every
//! node gets a distinct one-byte span in creation order so diagnostics can
//! tell nodes apart even without source text.

use rustc_hash::FxHashMap;
use spl_common::Span;
use spl_types::{Placeholder, StructDecl, TypeDecl};

use crate::decl::{Decl, DeclKind, FuncDef, Purity};
use crate::expr::{BinOp, Expr, ExprKind, UnaryOp};
use crate::ids::{ExprId, FuncId};
use crate::module::Module;

/// A function header as written.
#[derive(Clone, Debug, Default)]
pub struct FnSig {
    pub name: String,
    pub generics: Vec<Placeholder>,
    pub params: Vec<(String, Option<Placeholder>)>,
    pub ret: Option<Placeholder>,
    pub purity: Purity,
}

impl FnSig {
    pub fn new(name: impl Into<String>) -> Self {
        FnSig {
            name: name.into(),
            ..FnSig::default()
        }
    }

    pub fn generic(mut self, name: impl Into<String>) -> Self {
        self.generics.push(Placeholder::new(name));
        self
    }

    pub fn param(mut self, name: impl Into<String>, ty: Placeholder) -> Self {
        self.params.push((name.into(), Some(ty)));
        self
    }

    /// A parameter whose type is left to inference.
    pub fn param_inferred(mut self, name: impl Into<String>) -> Self {
        self.params.push((name.into(), None));
        self
    }

    pub fn returns(mut self, ty: Placeholder) -> Self {
        self.ret = Some(ty);
        self
    }

    pub fn purity(mut self, purity: Purity) -> Self {
        self.purity = purity;
        self
    }
}

pub struct ModuleBuilder {
    module: Module,
    offset: u32,
}

impl ModuleBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        ModuleBuilder {
            module: Module::new(name),
            offset: 0,
        }
    }

    pub fn finish(self) -> Module {
        self.module
    }

    /// Read access while building, e.g. to look up a node's span.
    pub fn module(&self) -> &Module {
        &self.module
    }

    fn next_span(&mut self) -> Span {
        let span = Span::new(self.offset, self.offset + 1);
        self.offset += 1;
        span
    }

    fn node(&mut self, kind: ExprKind) -> ExprId {
        let span = self.next_span();
        self.module.alloc_expr(Expr::new(kind, span))
    }

    // ── Literals and names ─────────────────────────────────────────────

    pub fn number(&mut self, value: i64) -> ExprId {
        self.node(ExprKind::Number(value))
    }

    pub fn string(&mut self, value: &str) -> ExprId {
        self.node(ExprKind::Str(value.to_string()))
    }

    pub fn boolean(&mut self, value: bool) -> ExprId {
        self.node(ExprKind::Bool(value))
    }

    pub fn var(&mut self, name: &str) -> ExprId {
        self.node(ExprKind::Variable {
            name: name.to_string(),
            binding: None,
            instantiation: None,
        })
    }

    // ── Operators ──────────────────────────────────────────────────────

    pub fn not(&mut self, operand: ExprId) -> ExprId {
        self.node(ExprKind::Unary {
            op: UnaryOp::Not,
            operand,
        })
    }

    pub fn binary(&mut self, op: BinOp, lhs: ExprId, rhs: ExprId) -> ExprId {
        self.node(ExprKind::Binary { op, lhs, rhs })
    }

    pub fn add(&mut self, lhs: ExprId, rhs: ExprId) -> ExprId {
        self.binary(BinOp::Add, lhs, rhs)
    }

    pub fn sub(&mut self, lhs: ExprId, rhs: ExprId) -> ExprId {
        self.binary(BinOp::Sub, lhs, rhs)
    }

    pub fn mul(&mut self, lhs: ExprId, rhs: ExprId) -> ExprId {
        self.binary(BinOp::Mul, lhs, rhs)
    }

    pub fn eq(&mut self, lhs: ExprId, rhs: ExprId) -> ExprId {
        self.binary(BinOp::Eq, lhs, rhs)
    }

    pub fn concat(&mut self, lhs: ExprId, rhs: ExprId) -> ExprId {
        self.binary(BinOp::Concat, lhs, rhs)
    }

    // ── Control flow and binding ───────────────────────────────────────

    pub fn seq(&mut self, first: ExprId, second: ExprId) -> ExprId {
        self.node(ExprKind::Seq { first, second })
    }

    pub fn assign(&mut self, target: ExprId, value: ExprId) -> ExprId {
        self.node(ExprKind::Assign { target, value })
    }

    pub fn index(&mut self, base: ExprId, index: ExprId) -> ExprId {
        self.node(ExprKind::Index { base, index })
    }

    pub fn member(&mut self, base: ExprId, field: &str) -> ExprId {
        self.node(ExprKind::Member {
            base,
            field: field.to_string(),
            field_index: None,
        })
    }

    pub fn if_else(&mut self, cond: ExprId, then_branch: ExprId, else_branch: ExprId) -> ExprId {
        self.node(ExprKind::If {
            cond,
            then_branch,
            else_branch,
        })
    }

    pub fn while_loop(&mut self, cond: ExprId, body: ExprId) -> ExprId {
        self.node(ExprKind::While { cond, body })
    }

    /// `let name = init in body` with an immutable binding.
    pub fn let_in(&mut self, name: &str, init: ExprId, body: ExprId) -> ExprId {
        self.binding(name, false, init, body)
    }

    /// `let mut name = init in body`.
    pub fn let_mut(&mut self, name: &str, init: ExprId, body: ExprId) -> ExprId {
        self.binding(name, true, init, body)
    }

    fn binding(&mut self, name: &str, mutable: bool, init: ExprId, body: ExprId) -> ExprId {
        let span = self.next_span();
        let expr = ExprId::new(self.module.expr_count() as u32);
        let decl = self
            .module
            .alloc_decl(Decl::new(name, mutable, DeclKind::Let(expr), span));
        let id = self
            .module
            .alloc_expr(Expr::new(ExprKind::Let { decl, init, body }, span));
        debug_assert_eq!(id, expr);
        id
    }

    pub fn call(&mut self, callee: ExprId, args: Vec<ExprId>) -> ExprId {
        self.node(ExprKind::Call { callee, args })
    }

    /// Call through a plain name.
    pub fn call_named(&mut self, callee: &str, args: Vec<ExprId>) -> ExprId {
        let callee = self.var(callee);
        self.call(callee, args)
    }

    // ── Aggregates ─────────────────────────────────────────────────────

    pub fn array(&mut self, elem: Placeholder, size: ExprId, default: ExprId) -> ExprId {
        self.node(ExprKind::Array {
            elem,
            size,
            default,
        })
    }

    pub fn construct(&mut self, name: &str, params: Vec<Placeholder>, args: Vec<ExprId>) -> ExprId {
        self.node(ExprKind::Construct {
            name: name.to_string(),
            params,
            args,
        })
    }

    pub fn struct_type(&mut self, decl: StructDecl) {
        self.module.types.push(TypeDecl::Struct(decl));
    }

    pub fn union_type(&mut self, name: &str) {
        let span = self.next_span();
        self.module.types.push(TypeDecl::Union {
            name: name.to_string(),
            span,
        });
    }

    // ── Functions ──────────────────────────────────────────────────────

    /// A top-level function.
    pub fn function(&mut self, sig: FnSig, body: ExprId) -> FuncId {
        let f = self.func_def(sig, Some(body));
        self.module.items.push(f);
        f
    }

    /// A top-level function provided by the environment.
    pub fn extern_fn(&mut self, sig: FnSig) -> FuncId {
        let f = self.func_def(sig, None);
        self.module.items.push(f);
        f
    }

    /// A function literal nested inside another body.
    pub fn lambda(&mut self, sig: FnSig, body: ExprId) -> ExprId {
        let f = self.func_def(sig, Some(body));
        let e = self.node(ExprKind::Func(f));
        self.module.func_mut(f).literal = Some(e);
        e
    }

    fn func_def(&mut self, sig: FnSig, body: Option<ExprId>) -> FuncId {
        let span = self.next_span();
        let func = FuncId::new(self.module.func_count() as u32);

        let mut params = Vec::with_capacity(sig.params.len());
        let mut param_types = Vec::with_capacity(sig.params.len());
        for (index, (name, ty)) in sig.params.into_iter().enumerate() {
            let pspan = self.next_span();
            params.push(self.module.alloc_decl(Decl::new(
                name,
                false,
                DeclKind::Param { func, index },
                pspan,
            )));
            param_types.push(ty);
        }

        let kind = if body.is_some() {
            DeclKind::Func(func)
        } else {
            DeclKind::Extern(func)
        };
        let decl = self
            .module
            .alloc_decl(Decl::new(sig.name.clone(), false, kind, span));

        let id = self.module.alloc_func(FuncDef {
            name: sig.name,
            generics: sig.generics,
            params,
            param_types,
            ret_type: sig.ret,
            body,
            context: None,
            literal: None,
            purity: sig.purity,
            decl,
            span,
            captures: Vec::new(),
            generic_vars: Vec::new(),
            ty: None,
            specializations: FxHashMap::default(),
            specialization_of: None,
        });
        debug_assert_eq!(id, func);
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spans_are_distinct() {
        let mut b = ModuleBuilder::new("t");
        let x = b.number(1);
        let y = b.number(2);
        let sum = b.add(x, y);
        let m = b.finish();
        assert_ne!(m.expr(x).span, m.expr(y).span);
        assert_ne!(m.expr(y).span, m.expr(sum).span);
    }

    #[test]
    fn let_decl_points_back_at_let() {
        let mut b = ModuleBuilder::new("t");
        let init = b.number(3);
        let body = b.var("x");
        let let_e = b.let_in("x", init, body);
        let m = b.finish();
        let ExprKind::Let { decl, .. } = m.expr(let_e).kind else {
            panic!("expected let");
        };
        assert_eq!(m.decl(decl).kind, DeclKind::Let(let_e));
        assert!(!m.decl(decl).mutable);
    }

    #[test]
    fn lambda_records_literal_and_params() {
        let mut b = ModuleBuilder::new("t");
        let body = b.var("y");
        let lit = b.lambda(FnSig::new("inner").param_inferred("y"), body);
        let m = b.finish();
        let ExprKind::Func(f) = m.expr(lit).kind else {
            panic!("expected function literal");
        };
        let def = m.func(f);
        assert_eq!(def.literal, Some(lit));
        assert_eq!(def.params.len(), 1);
        assert_eq!(m.decl(def.params[0]).kind, DeclKind::Param { func: f, index: 0 });
        assert!(m.items.is_empty());
    }

    #[test]
    fn extern_has_no_body() {
        let mut b = ModuleBuilder::new("t");
        let f = b.extern_fn(FnSig::new("puts").param("s", Placeholder::new("String")));
        let m = b.finish();
        assert!(m.func(f).is_extern());
        assert_eq!(m.decl(m.func(f).decl).kind, DeclKind::Extern(f));
        assert_eq!(m.item("puts"), Some(f));
    }
}
