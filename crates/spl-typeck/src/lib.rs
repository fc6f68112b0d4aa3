//! SPL front half of the middle-end: binding and type inference.
//!
//! - [`bind`]: links every name reference to its declaration
//! - [`infer`]: equation-based inference with deferred member/element
//!   resolution and generic instantiation
//! - [`unify`]: the `ena` union-find engine
//! - [`env`]: scope stack used by the binder
//! - [`error`]: errors with constraint provenance
//! - [`diagnostics`]: ariadne rendering

pub mod bind;
pub mod diagnostics;
pub mod env;
pub mod error;
pub mod infer;
pub mod unify;

use spl_ast::Module;
use spl_types::TypeRegistry;

pub use bind::bind_module;
pub use error::{ConstraintOrigin, TypeError};
pub use infer::{infer_module, InferStats};

/// Register the module's declared types, bind every name, and infer every
/// type. On success the module is fully bound and typed.
pub fn check(module: &mut Module) -> Result<TypeRegistry, TypeError> {
    let registry = TypeRegistry::from_decls(&module.types)?;
    bind_module(module)?;
    infer_module(module, &registry)?;
    Ok(registry)
}
