//! The compilation unit: flat arenas of expressions, declarations and
//! functions, plus the ordered list of top-level items.

use serde::{Deserialize, Serialize};
use spl_types::TypeDecl;

use crate::decl::{Decl, FuncDef};
use crate::expr::{Expr, ExprKind};
use crate::ids::{DeclId, ExprId, FuncId};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Module {
    pub name: String,
    exprs: Vec<Expr>,
    decls: Vec<Decl>,
    funcs: Vec<FuncDef>,
    /// Top-level functions and externs in definition order. Lifting and
    /// specialization append to it.
    pub items: Vec<FuncId>,
    pub types: Vec<TypeDecl>,
}

impl Module {
    pub fn new(name: impl Into<String>) -> Self {
        Module {
            name: name.into(),
            exprs: Vec::new(),
            decls: Vec::new(),
            funcs: Vec::new(),
            items: Vec::new(),
            types: Vec::new(),
        }
    }

    // ── Arena access ───────────────────────────────────────────────────

    pub fn expr(&self, id: ExprId) -> &Expr {
        &self.exprs[id.index()]
    }

    pub fn expr_mut(&mut self, id: ExprId) -> &mut Expr {
        &mut self.exprs[id.index()]
    }

    pub fn decl(&self, id: DeclId) -> &Decl {
        &self.decls[id.index()]
    }

    pub fn decl_mut(&mut self, id: DeclId) -> &mut Decl {
        &mut self.decls[id.index()]
    }

    pub fn func(&self, id: FuncId) -> &FuncDef {
        &self.funcs[id.index()]
    }

    pub fn func_mut(&mut self, id: FuncId) -> &mut FuncDef {
        &mut self.funcs[id.index()]
    }

    pub fn alloc_expr(&mut self, expr: Expr) -> ExprId {
        let id = ExprId::new(self.exprs.len() as u32);
        self.exprs.push(expr);
        id
    }

    pub fn alloc_decl(&mut self, decl: Decl) -> DeclId {
        let id = DeclId::new(self.decls.len() as u32);
        self.decls.push(decl);
        id
    }

    pub fn alloc_func(&mut self, func: FuncDef) -> FuncId {
        let id = FuncId::new(self.funcs.len() as u32);
        self.funcs.push(func);
        id
    }

    pub fn expr_ids(&self) -> impl Iterator<Item = ExprId> {
        (0..self.exprs.len() as u32).map(ExprId::new)
    }

    pub fn decl_ids(&self) -> impl Iterator<Item = DeclId> {
        (0..self.decls.len() as u32).map(DeclId::new)
    }

    pub fn func_ids(&self) -> impl Iterator<Item = FuncId> {
        (0..self.funcs.len() as u32).map(FuncId::new)
    }

    pub fn expr_count(&self) -> usize {
        self.exprs.len()
    }

    pub fn decl_count(&self) -> usize {
        self.decls.len()
    }

    pub fn func_count(&self) -> usize {
        self.funcs.len()
    }

    // ── Queries ────────────────────────────────────────────────────────

    /// Top-level item with the given name.
    pub fn item(&self, name: &str) -> Option<FuncId> {
        self.items
            .iter()
            .copied()
            .find(|&f| self.func(f).name == name)
    }

    /// Items that reach the backend: everything but generic templates.
    pub fn emitted_items(&self) -> impl Iterator<Item = FuncId> + '_ {
        self.items
            .iter()
            .copied()
            .filter(|&f| !self.func(f).is_generic())
    }

    /// `root` and every expression below it, pre-order, without entering
    /// nested function literals.
    pub fn subtree(&self, root: ExprId) -> Vec<ExprId> {
        let mut out = Vec::new();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            out.push(id);
            let children = self.expr(id).kind.children();
            stack.extend(children.into_iter().rev());
        }
        out
    }

    /// Like [`subtree`](Self::subtree), but also descends into the bodies
    /// of nested function literals.
    pub fn subtree_deep(&self, root: ExprId) -> Vec<ExprId> {
        let mut out = Vec::new();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            out.push(id);
            let expr = self.expr(id);
            if let ExprKind::Func(f) = expr.kind {
                if let Some(body) = self.func(f).body {
                    stack.push(body);
                }
            }
            stack.extend(expr.kind.children().into_iter().rev());
        }
        out
    }

    /// Nested function literals directly inside `func`'s body (not inside
    /// other literals).
    pub fn nested_literals(&self, func: FuncId) -> Vec<FuncId> {
        let Some(body) = self.func(func).body else {
            return Vec::new();
        };
        self.subtree(body)
            .into_iter()
            .filter_map(|e| match self.expr(e).kind {
                ExprKind::Func(f) => Some(f),
                _ => None,
            })
            .collect()
    }
}
