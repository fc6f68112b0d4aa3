//! Type representation for the SPL type system.
//!
//! Defines the closed `Ty` enum, inference variables (`TyVar`), rigid generic
//! parameters (`GenericVar`), and generic function signatures (`Scheme`).
//! Types are plain values: structural equality and hashing double as the
//! interning key, so two `Array<Int32>` built at different call sites are the
//! same type.

use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

/// An inference variable, identified by a `u32` index into the unification
/// table.
///
/// The `ena` crate handles the union-find mechanics. A variable's binding is
/// set at most once; `ena` refuses to overwrite a bound value with a
/// different one.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TyVar(pub u32);

static NEXT_GENERIC: AtomicU32 = AtomicU32::new(0);

/// A rigid type parameter of a generic declaration (`T` in `fn id<T>`).
///
/// Each declaration gets fresh parameters, so two functions that both name
/// their parameter `T` never share one. Identity is the numeric id; the name
/// is only used for display.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GenericVar {
    pub id: u32,
    pub name: String,
}

impl GenericVar {
    /// Create a fresh, uninterned generic parameter.
    pub fn fresh(name: impl Into<String>) -> Self {
        GenericVar {
            id: NEXT_GENERIC.fetch_add(1, Ordering::Relaxed),
            name: name.into(),
        }
    }
}

impl PartialEq for GenericVar {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for GenericVar {}

impl std::hash::Hash for GenericVar {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

/// Width of a fixed-width integer primitive.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IntWidth {
    I8,
    I16,
    I32,
    I64,
}

impl IntWidth {
    pub fn bits(self) -> u32 {
        match self {
            IntWidth::I8 => 8,
            IntWidth::I16 => 16,
            IntWidth::I32 => 32,
            IntWidth::I64 => 64,
        }
    }
}

/// An SPL type.
///
/// - `Void`, `Int`, `Bool`: primitives
/// - `Struct`: a declared aggregate applied to its type arguments; field
///   types live in the [`TypeRegistry`](crate::TypeRegistry)
/// - `Array`: element type plus a runtime length
/// - `String`: an array of `Int8` with a trailing terminator
/// - `Fun`: ordered parameter types and a return type
/// - `Ptr`: wraps a referent type
/// - `Union`: an opaque placeholder variant
/// - `Generic`: a rigid parameter of a generic declaration
/// - `Var`: an inference variable (resolved by unification)
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Ty {
    Void,
    Int(IntWidth),
    Bool,
    Struct { name: String, args: Vec<Ty> },
    Array(Box<Ty>),
    String,
    Fun(Vec<Ty>, Box<Ty>),
    Ptr(Box<Ty>),
    Union(String),
    Generic(GenericVar),
    Var(TyVar),
}

impl Ty {
    /// The type of integer literals.
    pub fn int32() -> Ty {
        Ty::Int(IntWidth::I32)
    }

    pub fn int8() -> Ty {
        Ty::Int(IntWidth::I8)
    }

    pub fn bool() -> Ty {
        Ty::Bool
    }

    pub fn void() -> Ty {
        Ty::Void
    }

    pub fn string() -> Ty {
        Ty::String
    }

    pub fn array(elem: Ty) -> Ty {
        Ty::Array(Box::new(elem))
    }

    pub fn ptr(referent: Ty) -> Ty {
        Ty::Ptr(Box::new(referent))
    }

    pub fn fun(params: Vec<Ty>, ret: Ty) -> Ty {
        Ty::Fun(params, Box::new(ret))
    }

    pub fn struct_ty(name: impl Into<String>, args: Vec<Ty>) -> Ty {
        Ty::Struct {
            name: name.into(),
            args,
        }
    }

    pub fn is_integer(&self) -> bool {
        matches!(self, Ty::Int(_))
    }

    /// Element type for array-like types. Strings index to `Int8`.
    pub fn element(&self) -> Option<Ty> {
        match self {
            Ty::Array(elem) => Some((**elem).clone()),
            Ty::String => Some(Ty::int8()),
            _ => None,
        }
    }

    /// Whether any inference variable occurs in this type.
    pub fn has_vars(&self) -> bool {
        self.any(&mut |t| matches!(t, Ty::Var(_)))
    }

    /// Whether any rigid generic parameter occurs in this type.
    pub fn has_generics(&self) -> bool {
        self.any(&mut |t| matches!(t, Ty::Generic(_)))
    }

    /// Fully concrete: no inference variables and no generic parameters.
    pub fn is_concrete(&self) -> bool {
        !self.has_vars() && !self.has_generics()
    }

    fn any(&self, pred: &mut impl FnMut(&Ty) -> bool) -> bool {
        if pred(self) {
            return true;
        }
        match self {
            Ty::Struct { args, .. } => args.iter().any(|a| a.any(pred)),
            Ty::Array(inner) | Ty::Ptr(inner) => inner.any(pred),
            Ty::Fun(params, ret) => params.iter().any(|p| p.any(pred)) || ret.any(pred),
            Ty::Void
            | Ty::Int(_)
            | Ty::Bool
            | Ty::String
            | Ty::Union(_)
            | Ty::Generic(_)
            | Ty::Var(_) => false,
        }
    }

    /// Substitute `args` for this type's own generic parameters `params`.
    ///
    /// Structural positions are rebuilt; the receiver is never mutated, so
    /// one generic declaration can be rebound independently at every use
    /// site. A type without generic parameters comes back unchanged.
    pub fn param_rebind(&self, params: &[GenericVar], args: &[Ty]) -> Ty {
        debug_assert_eq!(params.len(), args.len(), "rebind arity");
        if params.is_empty() {
            return self.clone();
        }
        let subst: FxHashMap<u32, Ty> = params
            .iter()
            .zip(args.iter())
            .map(|(p, a)| (p.id, a.clone()))
            .collect();
        self.substitute(&subst)
    }

    /// Replace generic parameters (keyed by id) according to `subst`.
    pub fn substitute(&self, subst: &FxHashMap<u32, Ty>) -> Ty {
        match self {
            Ty::Generic(g) => subst.get(&g.id).cloned().unwrap_or_else(|| self.clone()),
            Ty::Struct { name, args } => Ty::Struct {
                name: name.clone(),
                args: args.iter().map(|a| a.substitute(subst)).collect(),
            },
            Ty::Array(elem) => Ty::array(elem.substitute(subst)),
            Ty::Ptr(inner) => Ty::ptr(inner.substitute(subst)),
            Ty::Fun(params, ret) => Ty::fun(
                params.iter().map(|p| p.substitute(subst)).collect(),
                ret.substitute(subst),
            ),
            Ty::Void | Ty::Int(_) | Ty::Bool | Ty::String | Ty::Union(_) | Ty::Var(_) => {
                self.clone()
            }
        }
    }

    /// Short identifier-safe spelling, used when naming specializations.
    pub fn mangle(&self) -> String {
        match self {
            Ty::Void => "Void".to_string(),
            Ty::Int(w) => format!("Int{}", w.bits()),
            Ty::Bool => "Bool".to_string(),
            Ty::String => "String".to_string(),
            Ty::Struct { name, args } => {
                let mut out = name.clone();
                for a in args {
                    out.push('_');
                    out.push_str(&a.mangle());
                }
                out
            }
            Ty::Array(elem) => format!("Array_{}", elem.mangle()),
            Ty::Ptr(inner) => format!("Ptr_{}", inner.mangle()),
            Ty::Fun(params, ret) => {
                let p: Vec<String> = params.iter().map(Ty::mangle).collect();
                format!("Fn_{}_to_{}", p.join("_"), ret.mangle())
            }
            Ty::Union(name) => name.clone(),
            Ty::Generic(g) => g.name.clone(),
            Ty::Var(v) => format!("var{}", v.0),
        }
    }
}

fn write_list(f: &mut fmt::Formatter<'_>, items: &[Ty]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", item)?;
    }
    Ok(())
}

impl fmt::Display for Ty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ty::Void => write!(f, "Void"),
            Ty::Int(w) => write!(f, "Int{}", w.bits()),
            Ty::Bool => write!(f, "Bool"),
            Ty::String => write!(f, "String"),
            Ty::Struct { name, args } => {
                write!(f, "{}", name)?;
                if !args.is_empty() {
                    write!(f, "<")?;
                    write_list(f, args)?;
                    write!(f, ">")?;
                }
                Ok(())
            }
            Ty::Array(elem) => write!(f, "Array<{}>", elem),
            Ty::Ptr(inner) => write!(f, "Ptr<{}>", inner),
            Ty::Fun(params, ret) => {
                write!(f, "(")?;
                write_list(f, params)?;
                write!(f, ") -> {}", ret)
            }
            Ty::Union(name) => write!(f, "{}", name),
            Ty::Generic(g) => write!(f, "{}", g.name),
            Ty::Var(v) => write!(f, "?{}", v.0),
        }
    }
}

/// Why a use site could not be matched against a generic signature.
#[derive(Clone, Debug, PartialEq)]
pub enum GenericMatchError {
    /// The signature is not a function type.
    NotAFunction { ty: Ty },
    /// Use site supplies a different number of types than the signature has.
    Arity { expected: usize, found: usize },
    /// Two positions demand different bindings for one parameter.
    Conflict { generic: String, first: Ty, second: Ty },
    /// A position's shape does not fit the signature.
    Shape { expected: Ty, found: Ty },
    /// No position mentions the parameter, so it cannot be derived.
    Underivable { generic: String },
}

impl fmt::Display for GenericMatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GenericMatchError::NotAFunction { ty } => {
                write!(f, "`{}` is not a generic function signature", ty)
            }
            GenericMatchError::Arity { expected, found } => {
                write!(f, "expected {} types, found {}", expected, found)
            }
            GenericMatchError::Conflict {
                generic,
                first,
                second,
            } => write!(
                f,
                "type parameter `{}` bound to both `{}` and `{}`",
                generic, first, second
            ),
            GenericMatchError::Shape { expected, found } => {
                write!(f, "expected `{}`, found `{}`", expected, found)
            }
            GenericMatchError::Underivable { generic } => {
                write!(f, "cannot derive type parameter `{}`", generic)
            }
        }
    }
}

/// A generic function signature: a type quantified over rigid parameters.
///
/// For example, `fn id<T>(x: T) -> T` has the scheme
/// `Scheme { generics: [T], ty: Fun([Generic(T)], Generic(T)) }`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Scheme {
    pub generics: Vec<GenericVar>,
    pub ty: Ty,
}

impl Scheme {
    /// Create a monomorphic scheme (no quantified parameters).
    pub fn mono(ty: Ty) -> Self {
        Scheme {
            generics: Vec::new(),
            ty,
        }
    }

    pub fn is_generic(&self) -> bool {
        !self.generics.is_empty()
    }

    /// Substitute `args` for the scheme's parameters, in declaration order.
    pub fn param_rebind(&self, args: &[Ty]) -> Ty {
        self.ty.param_rebind(&self.generics, args)
    }

    /// Match one use site against the signature.
    ///
    /// `call_types` are the use site's parameter types followed by its return
    /// type. Returns the type-argument tuple in declaration order.
    pub fn match_generics(&self, call_types: &[Ty]) -> Result<Vec<Ty>, GenericMatchError> {
        let Ty::Fun(params, ret) = &self.ty else {
            return Err(GenericMatchError::NotAFunction {
                ty: self.ty.clone(),
            });
        };
        if params.len() + 1 != call_types.len() {
            return Err(GenericMatchError::Arity {
                expected: params.len() + 1,
                found: call_types.len(),
            });
        }

        let mut bindings: FxHashMap<u32, Ty> = FxHashMap::default();
        let patterns = params.iter().chain(std::iter::once(ret.as_ref()));
        for (pattern, actual) in patterns.zip(call_types.iter()) {
            match_ty(pattern, actual, &mut bindings)?;
        }

        self.generics
            .iter()
            .map(|g| {
                bindings
                    .get(&g.id)
                    .cloned()
                    .ok_or_else(|| GenericMatchError::Underivable {
                        generic: g.name.clone(),
                    })
            })
            .collect()
    }
}

fn match_ty(
    pattern: &Ty,
    actual: &Ty,
    bindings: &mut FxHashMap<u32, Ty>,
) -> Result<(), GenericMatchError> {
    match (pattern, actual) {
        (Ty::Generic(g), _) => match bindings.get(&g.id) {
            Some(prev) if prev != actual => Err(GenericMatchError::Conflict {
                generic: g.name.clone(),
                first: prev.clone(),
                second: actual.clone(),
            }),
            Some(_) => Ok(()),
            None => {
                bindings.insert(g.id, actual.clone());
                Ok(())
            }
        },
        (Ty::Fun(p1, r1), Ty::Fun(p2, r2)) if p1.len() == p2.len() => {
            for (p, a) in p1.iter().zip(p2.iter()) {
                match_ty(p, a, bindings)?;
            }
            match_ty(r1, r2, bindings)
        }
        (Ty::Array(p), Ty::Array(a)) | (Ty::Ptr(p), Ty::Ptr(a)) => match_ty(p, a, bindings),
        (
            Ty::Struct {
                name: n1,
                args: a1,
            },
            Ty::Struct {
                name: n2,
                args: a2,
            },
        ) if n1 == n2 && a1.len() == a2.len() => {
            for (p, a) in a1.iter().zip(a2.iter()) {
                match_ty(p, a, bindings)?;
            }
            Ok(())
        }
        (p, a) if p == a => Ok(()),
        (p, a) => Err(GenericMatchError::Shape {
            expected: p.clone(),
            found: a.clone(),
        }),
    }
}

// ── ena trait implementations ──────────────────────────────────────────

impl ena::unify::UnifyKey for TyVar {
    type Value = Option<Ty>;

    fn index(&self) -> u32 {
        self.0
    }

    fn from_index(u: u32) -> Self {
        TyVar(u)
    }

    fn tag() -> &'static str {
        "TyVar"
    }
}

impl ena::unify::EqUnifyValue for Ty {}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity_scheme() -> (Scheme, GenericVar) {
        let t = GenericVar::fresh("T");
        let scheme = Scheme {
            generics: vec![t.clone()],
            ty: Ty::fun(vec![Ty::Generic(t.clone())], Ty::Generic(t.clone())),
        };
        (scheme, t)
    }

    #[test]
    fn ty_display() {
        insta::assert_snapshot!(Ty::fun(vec![Ty::int32(), Ty::string()], Ty::bool()), @"(Int32, String) -> Bool");
        insta::assert_snapshot!(Ty::array(Ty::ptr(Ty::struct_ty("Pair", vec![Ty::int8(), Ty::Void]))), @"Array<Ptr<Pair<Int8, Void>>>");
        assert_eq!(Ty::Var(TyVar(7)).to_string(), "?7");
    }

    #[test]
    fn fresh_generics_are_distinct() {
        let a = GenericVar::fresh("T");
        let b = GenericVar::fresh("T");
        assert_ne!(a, b);
        assert_ne!(Ty::Generic(a), Ty::Generic(b));
    }

    #[test]
    fn param_rebind_does_not_mutate_receiver() {
        let (scheme, t) = identity_scheme();
        let at_int = scheme.param_rebind(&[Ty::int32()]);
        let at_bool = scheme.param_rebind(&[Ty::bool()]);
        assert_eq!(at_int, Ty::fun(vec![Ty::int32()], Ty::int32()));
        assert_eq!(at_bool, Ty::fun(vec![Ty::bool()], Ty::bool()));
        assert_eq!(
            scheme.ty,
            Ty::fun(vec![Ty::Generic(t.clone())], Ty::Generic(t))
        );
    }

    #[test]
    fn param_rebind_without_params_is_identity() {
        let ty = Ty::array(Ty::int32());
        assert_eq!(ty.param_rebind(&[], &[]), ty);
    }

    #[test]
    fn match_generics_derives_binding() {
        let (scheme, _) = identity_scheme();
        let args = scheme.match_generics(&[Ty::bool(), Ty::bool()]).unwrap();
        assert_eq!(args, vec![Ty::bool()]);
    }

    #[test]
    fn match_generics_through_structure() {
        let t = GenericVar::fresh("T");
        let scheme = Scheme {
            generics: vec![t.clone()],
            ty: Ty::fun(vec![Ty::array(Ty::Generic(t.clone()))], Ty::int32()),
        };
        let args = scheme
            .match_generics(&[Ty::array(Ty::string()), Ty::int32()])
            .unwrap();
        assert_eq!(args, vec![Ty::string()]);
    }

    #[test]
    fn match_generics_conflict() {
        let t = GenericVar::fresh("T");
        let scheme = Scheme {
            generics: vec![t.clone()],
            ty: Ty::fun(
                vec![Ty::Generic(t.clone()), Ty::Generic(t.clone())],
                Ty::Void,
            ),
        };
        let err = scheme
            .match_generics(&[Ty::int32(), Ty::bool(), Ty::Void])
            .unwrap_err();
        assert!(matches!(err, GenericMatchError::Conflict { .. }), "{err:?}");
    }

    #[test]
    fn match_generics_underivable() {
        let t = GenericVar::fresh("T");
        let scheme = Scheme {
            generics: vec![t],
            ty: Ty::fun(vec![], Ty::int32()),
        };
        let err = scheme.match_generics(&[Ty::int32()]).unwrap_err();
        assert_eq!(
            err,
            GenericMatchError::Underivable {
                generic: "T".to_string()
            }
        );
    }

    #[test]
    fn concreteness() {
        assert!(Ty::array(Ty::int32()).is_concrete());
        assert!(!Ty::array(Ty::Var(TyVar(0))).is_concrete());
        assert!(Ty::fun(vec![Ty::Generic(GenericVar::fresh("U"))], Ty::Void).has_generics());
        assert_eq!(Ty::String.element(), Some(Ty::int8()));
    }
}
