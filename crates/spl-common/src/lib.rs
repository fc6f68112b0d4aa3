//! Shared types for the SPL compiler middle-end.
//!
//! Every pass reports problems against the source identity the parser attached
//! to a node, which is a [`Span`] of byte offsets into the compilation unit.

pub mod span;

pub use span::{LineIndex, Span};
