//! Binding and type errors with provenance tracking.
//!
//! Every unification failure carries a `ConstraintOrigin` naming the
//! expressions that produced the constraint, so a mismatch can point at both
//! sides instead of just reporting two types.

use std::fmt;

use spl_ast::{BinOp, ExprId};
use spl_common::Span;
use spl_types::{GenericMatchError, ResolveError, Ty, TyVar};

/// Where a type constraint came from.
#[derive(Clone, Debug, PartialEq)]
pub enum ConstraintOrigin {
    /// A literal has its fixed type.
    Literal { expr: ExprId, span: Span },
    /// A name reference shares its declaration's type.
    VariableUse {
        expr: ExprId,
        span: Span,
        decl_span: Span,
    },
    /// A reference to a generic function, instantiated with fresh variables.
    Instantiation { expr: ExprId, span: Span },
    /// The callee of `call` must be a function over the argument types.
    Call { call: ExprId, span: Span },
    /// Operands of a binary operator.
    BinOp {
        expr: ExprId,
        op: BinOp,
        op_span: Span,
    },
    /// A condition must be `Bool`.
    Condition { expr: ExprId, span: Span },
    /// Both branches of a conditional share one type.
    IfBranches {
        if_span: Span,
        then_expr: ExprId,
        then_span: Span,
        else_expr: ExprId,
        else_span: Span,
    },
    /// `let x = init`: the declaration takes the initializer's type.
    LetBinding {
        decl_span: Span,
        init: ExprId,
        init_span: Span,
    },
    /// `target = value`.
    Assignment {
        lhs: ExprId,
        lhs_span: Span,
        rhs: ExprId,
        rhs_span: Span,
    },
    /// A sequence takes the type of its second expression.
    Sequence { expr: ExprId, span: Span },
    /// A written type annotation.
    Annotation { annotation_span: Span },
    /// A function body must produce the declared return type.
    Return {
        body: ExprId,
        body_span: Span,
        fn_span: Span,
    },
    /// Element access `base[index]`.
    Index { expr: ExprId, span: Span },
    /// Field access `base.field`.
    Member { expr: ExprId, span: Span },
    /// Size and default value of an array construction.
    ArrayInit { expr: ExprId, span: Span },
    /// An argument of a struct construction must match its field.
    ConstructorArg {
        arg: ExprId,
        span: Span,
        field: String,
    },
    /// A captured value or storage slot shares its declaration's type.
    Capture { expr: ExprId, span: Span },
}

impl ConstraintOrigin {
    /// Primary source location.
    pub fn span(&self) -> Span {
        match self {
            ConstraintOrigin::Literal { span, .. }
            | ConstraintOrigin::VariableUse { span, .. }
            | ConstraintOrigin::Instantiation { span, .. }
            | ConstraintOrigin::Call { span, .. }
            | ConstraintOrigin::Condition { span, .. }
            | ConstraintOrigin::Sequence { span, .. }
            | ConstraintOrigin::Index { span, .. }
            | ConstraintOrigin::Member { span, .. }
            | ConstraintOrigin::ArrayInit { span, .. }
            | ConstraintOrigin::ConstructorArg { span, .. }
            | ConstraintOrigin::Capture { span, .. } => *span,
            ConstraintOrigin::BinOp { op_span, .. } => *op_span,
            ConstraintOrigin::IfBranches { if_span, .. } => *if_span,
            ConstraintOrigin::LetBinding { decl_span, .. } => *decl_span,
            ConstraintOrigin::Assignment { lhs_span, .. } => *lhs_span,
            ConstraintOrigin::Annotation { annotation_span } => *annotation_span,
            ConstraintOrigin::Return { body_span, .. } => *body_span,
        }
    }

    /// The expressions this constraint relates.
    pub fn exprs(&self) -> Vec<ExprId> {
        match self {
            ConstraintOrigin::Literal { expr, .. }
            | ConstraintOrigin::VariableUse { expr, .. }
            | ConstraintOrigin::Instantiation { expr, .. }
            | ConstraintOrigin::BinOp { expr, .. }
            | ConstraintOrigin::Condition { expr, .. }
            | ConstraintOrigin::Sequence { expr, .. }
            | ConstraintOrigin::Index { expr, .. }
            | ConstraintOrigin::Member { expr, .. }
            | ConstraintOrigin::ArrayInit { expr, .. }
            | ConstraintOrigin::Capture { expr, .. } => vec![*expr],
            ConstraintOrigin::Call { call, .. } => vec![*call],
            ConstraintOrigin::ConstructorArg { arg, .. } => vec![*arg],
            ConstraintOrigin::IfBranches {
                then_expr,
                else_expr,
                ..
            } => vec![*then_expr, *else_expr],
            ConstraintOrigin::LetBinding { init, .. } => vec![*init],
            ConstraintOrigin::Assignment { lhs, rhs, .. } => vec![*lhs, *rhs],
            ConstraintOrigin::Return { body, .. } => vec![*body],
            ConstraintOrigin::Annotation { .. } => Vec::new(),
        }
    }
}

/// An error found while binding names or inferring types.
///
/// Any of these aborts the compilation unit.
#[derive(Clone, Debug, PartialEq)]
pub enum TypeError {
    /// A written type could not be resolved.
    Resolve(ResolveError),
    /// A name has no enclosing declaration.
    UnboundName {
        name: String,
        expr: ExprId,
        span: Span,
    },
    /// Two top-level functions share a name.
    DuplicateDefinition {
        name: String,
        span: Span,
        previous: Span,
    },
    /// Assignment to a binding that is not mutable.
    AssignToImmutable {
        name: String,
        expr: ExprId,
        span: Span,
        decl_span: Span,
    },
    /// Assignment to something that is not a place.
    InvalidAssignTarget { expr: ExprId, span: Span },
    /// A function literal nested in another body declares type parameters.
    NestedGeneric { name: String, span: Span },
    /// Two types that should be equal are not.
    Mismatch {
        expected: Ty,
        found: Ty,
        origin: ConstraintOrigin,
    },
    /// A type variable occurs in its own solution.
    InfiniteType {
        var: TyVar,
        ty: Ty,
        origin: ConstraintOrigin,
    },
    /// Function or struct types with different numbers of components.
    ArityMismatch {
        expected: usize,
        found: usize,
        origin: ConstraintOrigin,
    },
    /// A non-function value is called.
    NotAFunction { ty: Ty, expr: ExprId, span: Span },
    /// Arithmetic on a non-integer.
    NotNumeric { ty: Ty, expr: ExprId, span: Span },
    /// Element access on something that is neither an array nor a string.
    NotIndexable { ty: Ty, expr: ExprId, span: Span },
    /// Field access on a type without that field.
    UnknownField {
        ty: Ty,
        field: String,
        expr: ExprId,
        span: Span,
    },
    /// Struct construction with the wrong number of arguments.
    ConstructorArity {
        name: String,
        expected: usize,
        found: usize,
        expr: ExprId,
        span: Span,
    },
    /// A generic function used where no consistent type arguments exist.
    GenericInstantiation {
        name: String,
        reason: GenericMatchError,
        expr: ExprId,
        span: Span,
    },
    /// An expression whose type no constraint pins down.
    Ambiguous { ty: Ty, expr: ExprId, span: Span },
    /// A declaration whose type no constraint pins down.
    AmbiguousDecl { name: String, ty: Ty, span: Span },
}

impl TypeError {
    /// Primary source location of the error.
    pub fn span(&self) -> Span {
        match self {
            TypeError::Resolve(e) => e.span(),
            TypeError::UnboundName { span, .. }
            | TypeError::DuplicateDefinition { span, .. }
            | TypeError::AssignToImmutable { span, .. }
            | TypeError::InvalidAssignTarget { span, .. }
            | TypeError::NestedGeneric { span, .. }
            | TypeError::NotAFunction { span, .. }
            | TypeError::NotNumeric { span, .. }
            | TypeError::NotIndexable { span, .. }
            | TypeError::UnknownField { span, .. }
            | TypeError::ConstructorArity { span, .. }
            | TypeError::GenericInstantiation { span, .. }
            | TypeError::Ambiguous { span, .. }
            | TypeError::AmbiguousDecl { span, .. } => *span,
            TypeError::Mismatch { origin, .. }
            | TypeError::InfiniteType { origin, .. }
            | TypeError::ArityMismatch { origin, .. } => origin.span(),
        }
    }

    /// The offending expression, when the error is tied to one.
    pub fn expr(&self) -> Option<ExprId> {
        match self {
            TypeError::UnboundName { expr, .. }
            | TypeError::AssignToImmutable { expr, .. }
            | TypeError::InvalidAssignTarget { expr, .. }
            | TypeError::NotAFunction { expr, .. }
            | TypeError::NotNumeric { expr, .. }
            | TypeError::NotIndexable { expr, .. }
            | TypeError::UnknownField { expr, .. }
            | TypeError::ConstructorArity { expr, .. }
            | TypeError::GenericInstantiation { expr, .. }
            | TypeError::Ambiguous { expr, .. } => Some(*expr),
            TypeError::Mismatch { origin, .. }
            | TypeError::InfiniteType { origin, .. }
            | TypeError::ArityMismatch { origin, .. } => origin.exprs().first().copied(),
            TypeError::Resolve(_)
            | TypeError::DuplicateDefinition { .. }
            | TypeError::NestedGeneric { .. }
            | TypeError::AmbiguousDecl { .. } => None,
        }
    }
}

impl From<ResolveError> for TypeError {
    fn from(err: ResolveError) -> Self {
        TypeError::Resolve(err)
    }
}

impl fmt::Display for TypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeError::Resolve(err) => write!(f, "{}", err),
            TypeError::UnboundName { name, .. } => {
                write!(f, "unbound name `{}`", name)
            }
            TypeError::DuplicateDefinition { name, .. } => {
                write!(f, "`{}` is defined more than once", name)
            }
            TypeError::AssignToImmutable { name, .. } => {
                write!(f, "cannot assign to immutable binding `{}`", name)
            }
            TypeError::InvalidAssignTarget { .. } => {
                write!(f, "invalid assignment target")
            }
            TypeError::NestedGeneric { name, .. } => write!(
                f,
                "function `{}` declares type parameters but is not at top level",
                name
            ),
            TypeError::Mismatch {
                expected, found, ..
            } => write!(f, "type mismatch: expected `{}`, found `{}`", expected, found),
            TypeError::InfiniteType { var, ty, .. } => {
                write!(f, "infinite type: `{}` occurs in `{}`", Ty::Var(*var), ty)
            }
            TypeError::ArityMismatch {
                expected, found, ..
            } => write!(
                f,
                "arity mismatch: expected {} component(s), found {}",
                expected, found
            ),
            TypeError::NotAFunction { ty, .. } => {
                write!(f, "`{}` is not a function", ty)
            }
            TypeError::NotNumeric { ty, .. } => {
                write!(f, "arithmetic requires an integer type, found `{}`", ty)
            }
            TypeError::NotIndexable { ty, .. } => {
                write!(f, "type `{}` cannot be indexed", ty)
            }
            TypeError::UnknownField { ty, field, .. } => {
                write!(f, "type `{}` has no field `{}`", ty, field)
            }
            TypeError::ConstructorArity {
                name,
                expected,
                found,
                ..
            } => write!(
                f,
                "`{}` has {} field(s), but {} argument(s) were supplied",
                name, expected, found
            ),
            TypeError::GenericInstantiation { name, reason, .. } => {
                write!(f, "cannot instantiate `{}`: {}", name, reason)
            }
            TypeError::Ambiguous { ty, .. } => {
                write!(f, "cannot infer a concrete type (found `{}`)", ty)
            }
            TypeError::AmbiguousDecl { name, ty, .. } => write!(
                f,
                "cannot infer a concrete type for `{}` (found `{}`)",
                name, ty
            ),
        }
    }
}

impl std::error::Error for TypeError {}
