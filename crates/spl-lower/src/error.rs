//! Errors raised after type checking.
//!
//! Most of these are internal invariant violations: a well-typed module
//! must always lift and hand off cleanly. [`LowerError::is_defect`] tells
//! them apart from the few conditions a user program can trigger.

use std::fmt;

use spl_common::Span;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LowerError {
    /// The free variables of a literal disagree with the activation record
    /// built for it, or with what its lifted body still references.
    LiftingConsistency {
        func: String,
        expected: Vec<String>,
        found: Vec<String>,
        span: Span,
    },
    /// The module breaks the contract the backend relies on.
    Handoff {
        func: String,
        reason: String,
        span: Span,
    },
    /// Specialization kept producing new instantiations (polymorphic
    /// recursion).
    SpecializationLimit {
        name: String,
        limit: usize,
        span: Span,
    },
    /// The backend rejected a function.
    Backend { func: String, message: String },
}

impl LowerError {
    /// Whether this error is a compiler bug rather than a problem with the
    /// input program.
    pub fn is_defect(&self) -> bool {
        matches!(
            self,
            LowerError::LiftingConsistency { .. } | LowerError::Handoff { .. }
        )
    }

    pub fn span(&self) -> Option<Span> {
        match self {
            LowerError::LiftingConsistency { span, .. }
            | LowerError::Handoff { span, .. }
            | LowerError::SpecializationLimit { span, .. } => Some(*span),
            LowerError::Backend { .. } => None,
        }
    }
}

impl fmt::Display for LowerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LowerError::LiftingConsistency {
                func,
                expected,
                found,
                ..
            } => write!(
                f,
                "lifting `{}`: free variables [{}] do not match activation record [{}]",
                func,
                expected.join(", "),
                found.join(", ")
            ),
            LowerError::Handoff { func, reason, .. } => {
                write!(f, "`{}` is not ready for code generation: {}", func, reason)
            }
            LowerError::SpecializationLimit { name, limit, .. } => write!(
                f,
                "specializing `{}` exceeded the limit of {} instantiations",
                name, limit
            ),
            LowerError::Backend { func, message } => {
                write!(f, "backend failed on `{}`: {}", func, message)
            }
        }
    }
}

impl std::error::Error for LowerError {}
