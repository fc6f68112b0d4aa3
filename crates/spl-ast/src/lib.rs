//! SPL expression tree.
//!
//! Nodes live in flat arenas owned by a [`Module`] and refer to each other
//! by index. Every pass mutates the module in place: the binder fills
//! `Variable::binding`, inference fills node and declaration types, and the
//! lowering passes rewrite function literals into top-level functions.

mod builder;
mod decl;
mod expr;
mod ids;
mod module;

pub use builder::{FnSig, ModuleBuilder};
pub use decl::{Decl, DeclKind, FuncDef, Purity};
pub use expr::{BinOp, Expr, ExprKind, UnaryOp};
pub use ids::{DeclId, ExprId, FuncId};
pub use module::Module;
