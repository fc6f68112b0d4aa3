//! Unification engine.
//!
//! Wraps `ena`'s union-find table. A variable is bound at most once; merging
//! two bound variables requires their solutions to be structurally equal.

use ena::unify::InPlaceUnificationTable;
use spl_types::{Ty, TyVar};

use crate::error::{ConstraintOrigin, TypeError};

/// Structural failure found below the top of a unification.
enum Failure {
    Mismatch,
    Arity { expected: usize, found: usize },
    Infinite { var: TyVar, ty: Ty },
}

/// The inference context: owns the unification table.
pub struct InferCtx {
    table: InPlaceUnificationTable<TyVar>,
}

impl InferCtx {
    pub fn new() -> Self {
        InferCtx {
            table: InPlaceUnificationTable::new(),
        }
    }

    // ── Type Variable Creation ──────────────────────────────────────────

    pub fn fresh_var(&mut self) -> TyVar {
        self.table.new_key(None)
    }

    pub fn var_count(&self) -> usize {
        self.table.len()
    }

    // ── Resolution ──────────────────────────────────────────────────────

    /// Follow union-find indirection through the whole type.
    ///
    /// Unbound variables are normalized to their root so that members of
    /// one equivalence class print identically.
    pub fn resolve(&mut self, ty: &Ty) -> Ty {
        match ty {
            Ty::Var(v) => match self.table.probe_value(*v) {
                Some(inner) => self.resolve(&inner),
                None => Ty::Var(self.table.find(*v)),
            },
            Ty::Struct { name, args } => Ty::Struct {
                name: name.clone(),
                args: args.iter().map(|a| self.resolve(a)).collect(),
            },
            Ty::Array(elem) => Ty::array(self.resolve(elem)),
            Ty::Ptr(inner) => Ty::ptr(self.resolve(inner)),
            Ty::Fun(params, ret) => {
                let params = params.iter().map(|p| self.resolve(p)).collect();
                let ret = self.resolve(ret);
                Ty::fun(params, ret)
            }
            Ty::Void | Ty::Int(_) | Ty::Bool | Ty::String | Ty::Union(_) | Ty::Generic(_) => {
                ty.clone()
            }
        }
    }

    /// Resolve only the outermost variable.
    pub fn shallow_resolve(&mut self, ty: &Ty) -> Ty {
        match ty {
            Ty::Var(v) => match self.table.probe_value(*v) {
                Some(inner) => self.shallow_resolve(&inner),
                None => Ty::Var(self.table.find(*v)),
            },
            other => other.clone(),
        }
    }

    // ── Occurs Check ────────────────────────────────────────────────────

    pub fn occurs_in(&mut self, var: TyVar, ty: &Ty) -> bool {
        match ty {
            Ty::Var(v) => {
                if self.table.find(*v) == self.table.find(var) {
                    return true;
                }
                match self.table.probe_value(*v) {
                    Some(inner) => self.occurs_in(var, &inner),
                    None => false,
                }
            }
            Ty::Struct { args, .. } => args.iter().any(|a| self.occurs_in(var, a)),
            Ty::Array(inner) | Ty::Ptr(inner) => self.occurs_in(var, inner),
            Ty::Fun(params, ret) => {
                params.iter().any(|p| self.occurs_in(var, p)) || self.occurs_in(var, ret)
            }
            Ty::Void | Ty::Int(_) | Ty::Bool | Ty::String | Ty::Union(_) | Ty::Generic(_) => false,
        }
    }

    // ── Unification ─────────────────────────────────────────────────────

    /// Unify two types, making them equal.
    ///
    /// A structural mismatch reports the two complete types being unified,
    /// not just the innermost components that disagreed.
    pub fn unify(&mut self, a: &Ty, b: &Ty, origin: ConstraintOrigin) -> Result<(), TypeError> {
        match self.unify_inner(a, b) {
            Ok(()) => Ok(()),
            Err(Failure::Mismatch) => Err(TypeError::Mismatch {
                expected: self.resolve(a),
                found: self.resolve(b),
                origin,
            }),
            Err(Failure::Arity { expected, found }) => Err(TypeError::ArityMismatch {
                expected,
                found,
                origin,
            }),
            Err(Failure::Infinite { var, ty }) => Err(TypeError::InfiniteType {
                var,
                ty: self.resolve(&ty),
                origin,
            }),
        }
    }

    fn unify_inner(&mut self, a: &Ty, b: &Ty) -> Result<(), Failure> {
        let a = self.shallow_resolve(a);
        let b = self.shallow_resolve(b);

        match (a, b) {
            (Ty::Var(v1), Ty::Var(v2)) if v1 == v2 => Ok(()),

            (Ty::Var(v1), Ty::Var(v2)) => {
                self.table
                    .unify_var_var(v1, v2)
                    .expect("unifying two unbound vars should not fail");
                Ok(())
            }

            (Ty::Var(v), ty) | (ty, Ty::Var(v)) => {
                if self.occurs_in(v, &ty) {
                    return Err(Failure::Infinite { var: v, ty });
                }
                self.table
                    .unify_var_value(v, Some(ty))
                    .expect("binding an unbound var after occurs check should not fail");
                Ok(())
            }

            (Ty::Fun(p1, r1), Ty::Fun(p2, r2)) => {
                if p1.len() != p2.len() {
                    return Err(Failure::Arity {
                        expected: p1.len(),
                        found: p2.len(),
                    });
                }
                for (x, y) in p1.iter().zip(p2.iter()) {
                    self.unify_inner(x, y)?;
                }
                self.unify_inner(&r1, &r2)
            }

            (Ty::Array(x), Ty::Array(y)) | (Ty::Ptr(x), Ty::Ptr(y)) => self.unify_inner(&x, &y),

            (
                Ty::Struct {
                    name: n1,
                    args: a1,
                },
                Ty::Struct {
                    name: n2,
                    args: a2,
                },
            ) if n1 == n2 => {
                if a1.len() != a2.len() {
                    return Err(Failure::Arity {
                        expected: a1.len(),
                        found: a2.len(),
                    });
                }
                for (x, y) in a1.iter().zip(a2.iter()) {
                    self.unify_inner(x, y)?;
                }
                Ok(())
            }

            (x, y) if x == y => Ok(()),

            _ => Err(Failure::Mismatch),
        }
    }
}

impl Default for InferCtx {
    fn default() -> Self {
        Self::new()
    }
}
