//! Errors raised while turning written type names into `Ty` values.

use std::fmt;

use spl_common::Span;

/// A failure resolving a type placeholder or registering a type declaration.
#[derive(Clone, Debug, PartialEq)]
pub enum ResolveError {
    /// No generic parameter, builtin, struct, or union carries this name.
    UnknownTypeName { name: String, span: Span },
    /// A type was applied to the wrong number of arguments.
    TypeArity {
        name: String,
        expected: usize,
        found: usize,
        span: Span,
    },
    /// Two declarations share one type name.
    DuplicateType { name: String, span: Span },
    /// A generic parameter was written with arguments of its own (`T<Int32>`).
    GenericArguments { name: String, span: Span },
}

impl ResolveError {
    pub fn span(&self) -> Span {
        match self {
            ResolveError::UnknownTypeName { span, .. }
            | ResolveError::TypeArity { span, .. }
            | ResolveError::DuplicateType { span, .. }
            | ResolveError::GenericArguments { span, .. } => *span,
        }
    }
}

impl fmt::Display for ResolveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolveError::UnknownTypeName { name, .. } => {
                write!(f, "unknown type `{}`", name)
            }
            ResolveError::TypeArity {
                name,
                expected,
                found,
                ..
            } => write!(
                f,
                "type `{}` expects {} type argument(s), found {}",
                name, expected, found
            ),
            ResolveError::DuplicateType { name, .. } => {
                write!(f, "type `{}` is declared more than once", name)
            }
            ResolveError::GenericArguments { name, .. } => {
                write!(f, "generic parameter `{}` cannot take type arguments", name)
            }
        }
    }
}

impl std::error::Error for ResolveError {}
