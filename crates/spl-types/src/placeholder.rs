//! Unresolved type names as written in source.
//!
//! A placeholder is a name plus nested argument placeholders
//! (`Array<Pair<Int32, T>>`). Resolution happens once the registry of
//! declared types is known and the enclosing generic environment is fixed.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use spl_common::Span;

use crate::error::ResolveError;
use crate::registry::{Builtin, Builtins, TypeRegistry};
use crate::ty::{GenericVar, Ty};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Placeholder {
    pub name: String,
    pub params: Vec<Placeholder>,
    pub span: Span,
}

impl Placeholder {
    pub fn new(name: impl Into<String>) -> Self {
        Placeholder {
            name: name.into(),
            params: Vec::new(),
            span: Span::default(),
        }
    }

    pub fn with_params(name: impl Into<String>, params: Vec<Placeholder>) -> Self {
        Placeholder {
            name: name.into(),
            params,
            span: Span::default(),
        }
    }

    pub fn at(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// Resolve against the generic environment, then builtins, then declared
    /// structs and unions.
    pub fn resolve(
        &self,
        registry: &TypeRegistry,
        env: &FxHashMap<String, Ty>,
    ) -> Result<Ty, ResolveError> {
        if let Some(ty) = env.get(&self.name) {
            if !self.params.is_empty() {
                return Err(ResolveError::GenericArguments {
                    name: self.name.clone(),
                    span: self.span,
                });
            }
            return Ok(ty.clone());
        }

        if let Some(builtin) = Builtins::get().lookup(&self.name) {
            return match builtin {
                Builtin::Scalar(ty) => {
                    self.check_arity(0)?;
                    Ok(ty.clone())
                }
                Builtin::Array => {
                    self.check_arity(1)?;
                    Ok(Ty::array(self.params[0].resolve(registry, env)?))
                }
                Builtin::Ptr => {
                    self.check_arity(1)?;
                    Ok(Ty::ptr(self.params[0].resolve(registry, env)?))
                }
            };
        }

        if let Some(def) = registry.struct_def(&self.name) {
            self.check_arity(def.generics.len())?;
            let args = self
                .params
                .iter()
                .map(|p| p.resolve(registry, env))
                .collect::<Result<Vec<_>, _>>()?;
            return Ok(Ty::struct_ty(self.name.clone(), args));
        }

        if registry.is_union(&self.name) {
            self.check_arity(0)?;
            return Ok(Ty::Union(self.name.clone()));
        }

        Err(ResolveError::UnknownTypeName {
            name: self.name.clone(),
            span: self.span,
        })
    }

    /// Interpret this placeholder as the declaration of a fresh generic
    /// parameter. Generic parameters never take arguments.
    pub fn resolve_as_generic(&self) -> Result<GenericVar, ResolveError> {
        if !self.params.is_empty() {
            return Err(ResolveError::GenericArguments {
                name: self.name.clone(),
                span: self.span,
            });
        }
        Ok(GenericVar::fresh(self.name.clone()))
    }

    fn check_arity(&self, expected: usize) -> Result<(), ResolveError> {
        if self.params.len() != expected {
            return Err(ResolveError::TypeArity {
                name: self.name.clone(),
                expected,
                found: self.params.len(),
                span: self.span,
            });
        }
        Ok(())
    }
}

impl std::fmt::Display for Placeholder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)?;
        if !self.params.is_empty() {
            write!(f, "<")?;
            for (i, p) in self.params.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{}", p)?;
            }
            write!(f, ">")?;
        }
        Ok(())
    }
}
