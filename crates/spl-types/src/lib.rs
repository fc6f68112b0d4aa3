//! SPL type model.
//!
//! Everything the later passes know about types lives here:
//!
//! - [`ty`]: the closed set of type variants (`Ty`), inference variables
//!   (`TyVar`), rigid generic parameters (`GenericVar`) and generic
//!   signatures (`Scheme`) with rebinding and generic matching
//! - [`placeholder`]: unresolved, source-level type references and their
//!   resolution against an environment
//! - [`registry`]: the process-wide builtin table and the per-unit registry
//!   of declared aggregates
//! - [`error`]: resolution failures

pub mod error;
pub mod placeholder;
pub mod registry;
pub mod ty;

pub use error::ResolveError;
pub use placeholder::Placeholder;
pub use registry::{Builtin, Builtins, StructDecl, StructDef, TypeDecl, TypeRegistry};
pub use ty::{GenericMatchError, GenericVar, IntWidth, Scheme, Ty, TyVar};
