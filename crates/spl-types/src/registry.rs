//! Builtin type names and the registry of declared structs and unions.

use std::sync::OnceLock;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use spl_common::Span;

use crate::error::ResolveError;
use crate::placeholder::Placeholder;
use crate::ty::{GenericVar, IntWidth, Ty};

/// What a builtin type name resolves to.
#[derive(Clone, Debug, PartialEq)]
pub enum Builtin {
    /// A name with no type arguments.
    Scalar(Ty),
    /// `Array<T>`
    Array,
    /// `Ptr<T>`
    Ptr,
}

/// Process-wide table of builtin type names, built once on first use.
pub struct Builtins {
    names: FxHashMap<&'static str, Builtin>,
}

impl Builtins {
    pub fn get() -> &'static Builtins {
        static BUILTINS: OnceLock<Builtins> = OnceLock::new();
        BUILTINS.get_or_init(|| {
            let mut names = FxHashMap::default();
            names.insert("Void", Builtin::Scalar(Ty::Void));
            names.insert("Int8", Builtin::Scalar(Ty::Int(IntWidth::I8)));
            names.insert("Int16", Builtin::Scalar(Ty::Int(IntWidth::I16)));
            names.insert("Int32", Builtin::Scalar(Ty::Int(IntWidth::I32)));
            names.insert("Int64", Builtin::Scalar(Ty::Int(IntWidth::I64)));
            names.insert("Int", Builtin::Scalar(Ty::Int(IntWidth::I32)));
            names.insert("Bool", Builtin::Scalar(Ty::Bool));
            names.insert("String", Builtin::Scalar(Ty::String));
            names.insert("Array", Builtin::Array);
            names.insert("Ptr", Builtin::Ptr);
            Builtins { names }
        })
    }

    pub fn lookup(&self, name: &str) -> Option<&Builtin> {
        self.names.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains_key(name)
    }
}

/// A struct declaration as written: generic parameter names plus field
/// types as placeholders.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StructDecl {
    pub name: String,
    pub generics: Vec<Placeholder>,
    pub fields: Vec<(String, Placeholder)>,
    pub span: Span,
}

/// A top-level type declaration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum TypeDecl {
    Struct(StructDecl),
    Union { name: String, span: Span },
}

impl TypeDecl {
    pub fn name(&self) -> &str {
        match self {
            TypeDecl::Struct(s) => &s.name,
            TypeDecl::Union { name, .. } => name,
        }
    }

    pub fn span(&self) -> Span {
        match self {
            TypeDecl::Struct(s) => s.span,
            TypeDecl::Union { span, .. } => *span,
        }
    }
}

/// A resolved struct: field types mention the struct's own generic
/// parameters, which are rebound per use.
#[derive(Clone, Debug, PartialEq)]
pub struct StructDef {
    pub name: String,
    pub generics: Vec<GenericVar>,
    pub fields: Vec<(String, Ty)>,
}

impl StructDef {
    /// Index and type of `field` in the instance `Name<args>`.
    pub fn field(&self, field: &str, args: &[Ty]) -> Option<(usize, Ty)> {
        self.fields
            .iter()
            .position(|(n, _)| n == field)
            .map(|idx| (idx, self.fields[idx].1.param_rebind(&self.generics, args)))
    }

    /// Field types of the instance `Name<args>`, in declaration order.
    pub fn field_types(&self, args: &[Ty]) -> Vec<Ty> {
        self.fields
            .iter()
            .map(|(_, ty)| ty.param_rebind(&self.generics, args))
            .collect()
    }
}

/// All user-declared types of a compilation unit.
#[derive(Clone, Debug, Default)]
pub struct TypeRegistry {
    structs: FxHashMap<String, StructDef>,
    unions: FxHashMap<String, Span>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        TypeRegistry::default()
    }

    /// Build a registry from declarations.
    ///
    /// Names are registered first so that field types may refer to any
    /// declared type, including the struct itself or one declared later.
    pub fn from_decls(decls: &[TypeDecl]) -> Result<Self, ResolveError> {
        let mut registry = TypeRegistry::new();

        // Phase 1: names and generic parameters.
        let mut pending: Vec<(&StructDecl, FxHashMap<String, Ty>)> = Vec::new();
        for decl in decls {
            let name = decl.name();
            if Builtins::get().contains(name)
                || registry.structs.contains_key(name)
                || registry.unions.contains_key(name)
            {
                return Err(ResolveError::DuplicateType {
                    name: name.to_string(),
                    span: decl.span(),
                });
            }
            match decl {
                TypeDecl::Struct(s) => {
                    let generics = s
                        .generics
                        .iter()
                        .map(Placeholder::resolve_as_generic)
                        .collect::<Result<Vec<_>, _>>()?;
                    let env = generics
                        .iter()
                        .map(|g| (g.name.clone(), Ty::Generic(g.clone())))
                        .collect();
                    registry.structs.insert(
                        s.name.clone(),
                        StructDef {
                            name: s.name.clone(),
                            generics,
                            fields: Vec::new(),
                        },
                    );
                    pending.push((s, env));
                }
                TypeDecl::Union { name, span } => {
                    registry.unions.insert(name.clone(), *span);
                }
            }
        }

        // Phase 2: field types.
        for (decl, env) in pending {
            let fields = decl
                .fields
                .iter()
                .map(|(n, p)| Ok((n.clone(), p.resolve(&registry, &env)?)))
                .collect::<Result<Vec<_>, ResolveError>>()?;
            if let Some(def) = registry.structs.get_mut(&decl.name) {
                def.fields = fields;
            }
        }

        Ok(registry)
    }

    pub fn struct_def(&self, name: &str) -> Option<&StructDef> {
        self.structs.get(name)
    }

    pub fn is_union(&self, name: &str) -> bool {
        self.unions.contains_key(name)
    }

    /// Index and type of `field` on a value of type `ty`.
    ///
    /// Arrays and strings expose their runtime length as `length: Int32`.
    pub fn field_of(&self, ty: &Ty, field: &str) -> Option<(usize, Ty)> {
        match ty {
            Ty::Array(_) | Ty::String if field == "length" => Some((0, Ty::int32())),
            Ty::Struct { name, args } => self.structs.get(name)?.field(field, args),
            _ => None,
        }
    }
}
