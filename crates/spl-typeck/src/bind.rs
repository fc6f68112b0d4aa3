//! Name resolution.
//!
//! One top-down walk links every `Variable` to the declaration that
//! introduces it. Top-level functions and externs share the global scope;
//! let bodies, function parameters and function literals each open a scope
//! visible only below them.

use spl_ast::{DeclKind, ExprId, ExprKind, FuncId, Module};

use crate::env::ScopeStack;
use crate::error::TypeError;

/// Resolve every name in `module`.
#[tracing::instrument(level = "debug", skip_all, fields(module = %module.name, items = module.items.len()))]
pub fn bind_module(module: &mut Module) -> Result<(), TypeError> {
    let mut binder = Binder {
        module,
        scopes: ScopeStack::new(),
        current: None,
        bound: 0,
    };
    binder.declare_items()?;

    let items = binder.module.items.clone();
    for f in items {
        binder.bind_function(f)?;
    }
    tracing::debug!(bound = binder.bound, "binding complete");
    Ok(())
}

struct Binder<'m> {
    module: &'m mut Module,
    scopes: ScopeStack,
    /// Function whose body is being walked.
    current: Option<FuncId>,
    bound: usize,
}

impl Binder<'_> {
    fn declare_items(&mut self) -> Result<(), TypeError> {
        for &f in &self.module.items {
            let def = self.module.func(f);
            if let Some(previous) = self.scopes.insert(def.name.clone(), def.decl) {
                return Err(TypeError::DuplicateDefinition {
                    name: def.name.clone(),
                    span: def.span,
                    previous: self.module.decl(previous).span,
                });
            }
        }
        Ok(())
    }

    fn bind_function(&mut self, f: FuncId) -> Result<(), TypeError> {
        let def = self.module.func(f);
        let Some(body) = def.body else {
            return Ok(());
        };

        self.scopes.push_scope();
        if def.literal.is_some() {
            self.scopes.insert(def.name.clone(), def.decl);
        }
        for &p in &def.params {
            let name = self.module.decl(p).name.clone();
            self.scopes.insert(name, p);
        }

        let saved = self.current.replace(f);
        let result = self.bind_expr(body);
        self.current = saved;
        self.scopes.pop_scope();
        result
    }

    fn bind_expr(&mut self, id: ExprId) -> Result<(), TypeError> {
        match &self.module.expr(id).kind {
            ExprKind::Variable { name, .. } => {
                let name = name.clone();
                let Some(decl) = self.scopes.lookup(&name) else {
                    return Err(TypeError::UnboundName {
                        name,
                        expr: id,
                        span: self.module.expr(id).span,
                    });
                };
                tracing::trace!(name = %name, ?decl, "bound");
                if let ExprKind::Variable { binding, .. } = &mut self.module.expr_mut(id).kind {
                    *binding = Some(decl);
                }
                self.bound += 1;
                Ok(())
            }
            &ExprKind::Let { decl, init, body } => {
                self.bind_expr(init)?;
                self.scopes.push_scope();
                let name = self.module.decl(decl).name.clone();
                self.scopes.insert(name, decl);
                let result = self.bind_expr(body);
                self.scopes.pop_scope();
                result
            }
            &ExprKind::Func(f) => {
                self.module.func_mut(f).context = self.current;
                self.bind_function(f)
            }
            &ExprKind::Assign { target, value } => {
                self.bind_expr(target)?;
                self.bind_expr(value)?;
                self.check_assign_target(target)
            }
            kind => {
                let children = kind.children();
                for child in children {
                    self.bind_expr(child)?;
                }
                Ok(())
            }
        }
    }

    fn check_assign_target(&self, target: ExprId) -> Result<(), TypeError> {
        let expr = self.module.expr(target);
        match &expr.kind {
            ExprKind::Variable {
                name,
                binding: Some(decl),
                ..
            } => {
                let decl = self.module.decl(*decl);
                let assignable = decl.mutable && matches!(decl.kind, DeclKind::Let(_));
                if assignable {
                    Ok(())
                } else {
                    Err(TypeError::AssignToImmutable {
                        name: name.clone(),
                        expr: target,
                        span: expr.span,
                        decl_span: decl.span,
                    })
                }
            }
            ExprKind::Member { .. } | ExprKind::Index { .. } => Ok(()),
            _ => Err(TypeError::InvalidAssignTarget {
                expr: target,
                span: expr.span,
            }),
        }
    }
}
