//! Expression nodes.

use serde::{Deserialize, Serialize};
use spl_common::Span;
use spl_types::{Placeholder, Ty};

use crate::ids::{DeclId, ExprId, FuncId};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnaryOp {
    Not,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Eq,
    /// String concatenation.
    Concat,
}

impl BinOp {
    pub fn is_arithmetic(self) -> bool {
        matches!(self, BinOp::Add | BinOp::Sub | BinOp::Mul)
    }

    pub fn symbol(self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Eq => "==",
            BinOp::Concat => "++",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ExprKind {
    Number(i64),
    Str(String),
    Bool(bool),
    /// A name reference. `binding` is filled by the binder; `instantiation`
    /// holds the type arguments when the name refers to a generic function.
    Variable {
        name: String,
        binding: Option<DeclId>,
        instantiation: Option<Vec<Ty>>,
    },
    Unary {
        op: UnaryOp,
        operand: ExprId,
    },
    Binary {
        op: BinOp,
        lhs: ExprId,
        rhs: ExprId,
    },
    /// Evaluate `first` for effect, then `second`.
    Seq {
        first: ExprId,
        second: ExprId,
    },
    Assign {
        target: ExprId,
        value: ExprId,
    },
    Index {
        base: ExprId,
        index: ExprId,
    },
    /// Field access. `field_index` is filled once the receiver type is known.
    Member {
        base: ExprId,
        field: String,
        field_index: Option<usize>,
    },
    If {
        cond: ExprId,
        then_branch: ExprId,
        else_branch: ExprId,
    },
    While {
        cond: ExprId,
        body: ExprId,
    },
    /// `let decl = init in body`
    Let {
        decl: DeclId,
        init: ExprId,
        body: ExprId,
    },
    /// A function literal nested in another function body.
    Func(FuncId),
    /// A lifted function paired with its activation record.
    Closure {
        func: FuncId,
        record: Vec<ExprId>,
        names: Vec<String>,
    },
    /// A lifted function that captures nothing.
    FuncRef(FuncId),
    Call {
        callee: ExprId,
        args: Vec<ExprId>,
    },
    /// `Array<elem>(size, default)`
    Array {
        elem: Placeholder,
        size: ExprId,
        default: ExprId,
    },
    /// Struct construction `Name<params>(args...)`.
    Construct {
        name: String,
        params: Vec<Placeholder>,
        args: Vec<ExprId>,
    },
    /// Backend storage slot of a let-bound local.
    Register(DeclId),
    /// Backend storage slot of the `index`-th incoming argument of `func`,
    /// counting captures first.
    ArgRegister {
        func: FuncId,
        index: usize,
    },
}

impl ExprKind {
    /// Direct sub-expressions in evaluation order.
    ///
    /// A nested function literal has none: its body is a separate scope
    /// reached through its `FuncDef`.
    pub fn children(&self) -> Vec<ExprId> {
        match self {
            ExprKind::Number(_)
            | ExprKind::Str(_)
            | ExprKind::Bool(_)
            | ExprKind::Variable { .. }
            | ExprKind::Func(_)
            | ExprKind::FuncRef(_)
            | ExprKind::Register(_)
            | ExprKind::ArgRegister { .. } => Vec::new(),
            ExprKind::Unary { operand, .. } => vec![*operand],
            ExprKind::Binary { lhs, rhs, .. } => vec![*lhs, *rhs],
            ExprKind::Seq { first, second } => vec![*first, *second],
            ExprKind::Assign { target, value } => vec![*target, *value],
            ExprKind::Index { base, index } => vec![*base, *index],
            ExprKind::Member { base, .. } => vec![*base],
            ExprKind::If {
                cond,
                then_branch,
                else_branch,
            } => vec![*cond, *then_branch, *else_branch],
            ExprKind::While { cond, body } => vec![*cond, *body],
            ExprKind::Let { init, body, .. } => vec![*init, *body],
            ExprKind::Closure { record, .. } => record.clone(),
            ExprKind::Call { callee, args } => {
                let mut out = Vec::with_capacity(args.len() + 1);
                out.push(*callee);
                out.extend(args.iter().copied());
                out
            }
            ExprKind::Array { size, default, .. } => vec![*size, *default],
            ExprKind::Construct { args, .. } => args.clone(),
        }
    }

    /// Short variant name for logs and diagnostics.
    pub fn label(&self) -> &'static str {
        match self {
            ExprKind::Number(_) => "number",
            ExprKind::Str(_) => "string",
            ExprKind::Bool(_) => "bool",
            ExprKind::Variable { .. } => "variable",
            ExprKind::Unary { .. } => "unary",
            ExprKind::Binary { .. } => "binary",
            ExprKind::Seq { .. } => "seq",
            ExprKind::Assign { .. } => "assign",
            ExprKind::Index { .. } => "index",
            ExprKind::Member { .. } => "member",
            ExprKind::If { .. } => "if",
            ExprKind::While { .. } => "while",
            ExprKind::Let { .. } => "let",
            ExprKind::Func(_) => "function literal",
            ExprKind::Closure { .. } => "closure",
            ExprKind::FuncRef(_) => "function reference",
            ExprKind::Call { .. } => "call",
            ExprKind::Array { .. } => "array",
            ExprKind::Construct { .. } => "constructor",
            ExprKind::Register(_) => "register",
            ExprKind::ArgRegister { .. } => "argument register",
        }
    }
}

/// One expression node: its variant, its source span and its resolved type.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
    ty: Option<Ty>,
}

impl Expr {
    pub fn new(kind: ExprKind, span: Span) -> Self {
        Expr {
            kind,
            span,
            ty: None,
        }
    }

    /// A node created after inference, born with its type.
    pub fn typed(kind: ExprKind, span: Span, ty: Ty) -> Self {
        Expr {
            kind,
            span,
            ty: Some(ty),
        }
    }

    pub fn ty(&self) -> Option<&Ty> {
        self.ty.as_ref()
    }

    /// Record the resolved type.
    ///
    /// # Panics
    ///
    /// Panics if the type was already set: types are written once, by
    /// population, and a second write means a pass ran out of order.
    pub fn set_ty(&mut self, ty: Ty) {
        if let Some(prev) = &self.ty {
            panic!(
                "type of {} at {} set twice (was `{}`, now `{}`)",
                self.kind.label(),
                self.span,
                prev,
                ty
            );
        }
        self.ty = Some(ty);
    }

    /// Binding of a `Variable` node, if any.
    pub fn binding(&self) -> Option<DeclId> {
        match &self.kind {
            ExprKind::Variable { binding, .. } => *binding,
            _ => None,
        }
    }
}
