//! SPL back half of the middle-end: everything between a typed module and
//! the code generator.
//!
//! - [`mono`]: one specialization per generic instantiation, memoized
//! - [`lift`]: lambda lifting into top-level functions plus activation records
//! - [`free_vars`]: free-variable analysis that drives lifting
//! - [`alpha`]: alpha-renaming and per-function name uniqueness
//! - [`materialize`]: optional register nodes for locals and arguments
//! - [`backend`]: the backend trait and the handoff contract check

pub mod alpha;
pub mod backend;
pub mod error;
pub mod free_vars;
pub mod lift;
pub mod materialize;
pub mod mono;

pub use backend::{hand_off, verify_handoff, Backend};
pub use error::LowerError;
pub use free_vars::CaptureOrder;
pub use lift::{lift_module, LiftStats};
pub use materialize::materialize_locals;
pub use mono::{monomorphize, MonoStats};
