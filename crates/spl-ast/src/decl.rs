//! Declarations and function definitions.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use spl_common::Span;
use spl_types::{GenericVar, Placeholder, Ty};

use crate::ids::{DeclId, ExprId, FuncId};

/// Effect classification carried on every function.
///
/// The tag is preserved through binding, inference, lifting and
/// specialization. Nothing in the middle-end enforces it.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Purity {
    Pure,
    #[default]
    Impure,
    Sealed,
    FunIO,
}

/// What introduced a name.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeclKind {
    /// Bound by the `Let` expression with this id.
    Let(ExprId),
    /// The `index`-th declared parameter of `func`.
    Param { func: FuncId, index: usize },
    /// The `index`-th leading capture parameter of a lifted `func`.
    Capture { func: FuncId, index: usize },
    /// The name of a function with a body.
    Func(FuncId),
    /// The name of an externally provided function.
    Extern(FuncId),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Decl {
    pub name: String,
    pub mutable: bool,
    pub kind: DeclKind,
    pub span: Span,
    ty: Option<Ty>,
}

impl Decl {
    pub fn new(name: impl Into<String>, mutable: bool, kind: DeclKind, span: Span) -> Self {
        Decl {
            name: name.into(),
            mutable,
            kind,
            span,
            ty: None,
        }
    }

    pub fn typed(
        name: impl Into<String>,
        mutable: bool,
        kind: DeclKind,
        span: Span,
        ty: Ty,
    ) -> Self {
        Decl {
            ty: Some(ty),
            ..Decl::new(name, mutable, kind, span)
        }
    }

    pub fn ty(&self) -> Option<&Ty> {
        self.ty.as_ref()
    }

    /// # Panics
    ///
    /// Panics on a second write, like [`Expr::set_ty`](crate::Expr::set_ty).
    pub fn set_ty(&mut self, ty: Ty) {
        if let Some(prev) = &self.ty {
            panic!(
                "type of declaration `{}` set twice (was `{}`, now `{}`)",
                self.name, prev, ty
            );
        }
        self.ty = Some(ty);
    }

    /// The function this declaration names, if it names one.
    pub fn func(&self) -> Option<FuncId> {
        match self.kind {
            DeclKind::Func(f) | DeclKind::Extern(f) => Some(f),
            _ => None,
        }
    }
}

/// A function: top-level item, extern, nested literal or specialization.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FuncDef {
    pub name: String,
    /// Generic parameter names as written.
    pub generics: Vec<Placeholder>,
    pub params: Vec<DeclId>,
    pub param_types: Vec<Option<Placeholder>>,
    pub ret_type: Option<Placeholder>,
    /// `None` for externs.
    pub body: Option<ExprId>,
    /// Enclosing function of a nested literal. Cleared by lifting.
    pub context: Option<FuncId>,
    /// The `Func` expression that introduces a nested literal.
    pub literal: Option<ExprId>,
    pub purity: Purity,
    /// The declaration carrying this function's name.
    pub decl: DeclId,
    pub span: Span,
    /// Leading synthetic parameters added by lifting, in record order.
    pub captures: Vec<DeclId>,
    /// Rigid parameters the signature quantifies over.
    pub generic_vars: Vec<GenericVar>,
    /// Signature excluding captures, set by population.
    pub ty: Option<Ty>,
    /// Specializations of a generic template, keyed by type arguments.
    #[serde(with = "specialization_pairs")]
    pub specializations: FxHashMap<Vec<Ty>, FuncId>,
    /// Template and type arguments this function was specialized from.
    pub specialization_of: Option<(FuncId, Vec<Ty>)>,
}

impl FuncDef {
    pub fn is_generic(&self) -> bool {
        !self.generics.is_empty()
    }

    pub fn is_extern(&self) -> bool {
        self.body.is_none()
    }

    /// Captures followed by declared parameters: the order of incoming
    /// arguments once lifted.
    pub fn all_params(&self) -> impl Iterator<Item = DeclId> + '_ {
        self.captures.iter().chain(self.params.iter()).copied()
    }
}

mod specialization_pairs {
    use rustc_hash::FxHashMap;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use spl_types::Ty;

    use crate::ids::FuncId;

    pub fn serialize<S: Serializer>(
        map: &FxHashMap<Vec<Ty>, FuncId>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        let mut pairs: Vec<(&Vec<Ty>, &FuncId)> = map.iter().collect();
        pairs.sort_by_key(|(_, f)| **f);
        pairs.serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<FxHashMap<Vec<Ty>, FuncId>, D::Error> {
        let pairs: Vec<(Vec<Ty>, FuncId)> = Vec::deserialize(deserializer)?;
        Ok(pairs.into_iter().collect())
    }
}
