//! Ariadne-based rendering for binding and type errors.
//!
//! Output is colorless so tests can compare it verbatim. Each report
//! carries a stable error code, a one-line message and labeled spans; a
//! mismatch between two expressions labels both of them.

use std::ops::Range;

use ariadne::{Color, Config, Label, Report, ReportKind, Source};
use spl_common::Span;
use spl_types::ResolveError;

use crate::error::{ConstraintOrigin, TypeError};

// ── Error Codes ────────────────────────────────────────────────────────

/// Stable error code for each `TypeError` variant.
pub fn error_code(err: &TypeError) -> &'static str {
    match err {
        TypeError::Mismatch { .. } => "E0001",
        TypeError::InfiniteType { .. } => "E0002",
        TypeError::ArityMismatch { .. } => "E0003",
        TypeError::UnboundName { .. } => "E0004",
        TypeError::NotAFunction { .. } => "E0005",
        TypeError::UnknownField { .. } => "E0006",
        TypeError::NotIndexable { .. } => "E0007",
        TypeError::NotNumeric { .. } => "E0008",
        TypeError::Ambiguous { .. } | TypeError::AmbiguousDecl { .. } => "E0009",
        TypeError::Resolve(ResolveError::UnknownTypeName { .. }) => "E0010",
        TypeError::Resolve(ResolveError::TypeArity { .. }) => "E0011",
        TypeError::Resolve(ResolveError::DuplicateType { .. }) => "E0012",
        TypeError::Resolve(ResolveError::GenericArguments { .. }) => "E0013",
        TypeError::DuplicateDefinition { .. } => "E0014",
        TypeError::AssignToImmutable { .. } => "E0015",
        TypeError::InvalidAssignTarget { .. } => "E0016",
        TypeError::NestedGeneric { .. } => "E0017",
        TypeError::ConstructorArity { .. } => "E0018",
        TypeError::GenericInstantiation { .. } => "E0019",
    }
}

// ── Rendering ──────────────────────────────────────────────────────────

/// Render a type error against the source text it was found in.
pub fn render_diagnostic(error: &TypeError, source: &str) -> String {
    let source_len = source.len();

    // ariadne needs a non-empty range inside the source.
    let clamp = |span: Span| -> Range<usize> {
        let r = span.to_range();
        let s = r.start.min(source_len);
        let e = r.end.min(source_len).max(s);
        if s == e {
            s..e.saturating_add(1).min(source_len)
        } else {
            s..e
        }
    };

    let code = error_code(error);
    let msg = error.to_string();
    let primary = clamp(error.span());
    let mut builder = Report::build(ReportKind::Error, primary.clone())
        .with_code(code)
        .with_message(&msg)
        .with_config(Config::default().with_color(false));

    match error {
        TypeError::Mismatch {
            expected,
            found,
            origin,
        } => match origin {
            ConstraintOrigin::IfBranches {
                then_span,
                else_span,
                ..
            } => {
                builder.add_label(
                    Label::new(clamp(*then_span))
                        .with_message(format!("this branch is {}", expected))
                        .with_color(Color::Red),
                );
                builder.add_label(
                    Label::new(clamp(*else_span))
                        .with_message(format!("this branch is {}", found))
                        .with_color(Color::Blue),
                );
            }
            ConstraintOrigin::Assignment {
                lhs_span,
                rhs_span,
                ..
            } => {
                builder.add_label(
                    Label::new(clamp(*lhs_span))
                        .with_message(format!("target is {}", expected))
                        .with_color(Color::Red),
                );
                builder.add_label(
                    Label::new(clamp(*rhs_span))
                        .with_message(format!("value is {}", found))
                        .with_color(Color::Blue),
                );
            }
            ConstraintOrigin::Return {
                body_span, fn_span, ..
            } => {
                builder.add_label(
                    Label::new(clamp(*body_span))
                        .with_message(format!("body produces {}", expected))
                        .with_color(Color::Red),
                );
                builder.add_label(
                    Label::new(clamp(*fn_span))
                        .with_message(format!("declared to return {}", found))
                        .with_color(Color::Blue),
                );
            }
            _ => {
                builder.add_label(
                    Label::new(primary)
                        .with_message(format!("expected {}, found {}", expected, found))
                        .with_color(Color::Red),
                );
            }
        },
        TypeError::AssignToImmutable { decl_span, .. } => {
            builder.add_label(
                Label::new(primary)
                    .with_message("assigned here")
                    .with_color(Color::Red),
            );
            builder.add_label(
                Label::new(clamp(*decl_span))
                    .with_message("declared without `mut`")
                    .with_color(Color::Blue),
            );
            builder.set_help("declare the binding with `let mut`");
        }
        TypeError::DuplicateDefinition { previous, .. } => {
            builder.add_label(
                Label::new(primary)
                    .with_message("redefined here")
                    .with_color(Color::Red),
            );
            builder.add_label(
                Label::new(clamp(*previous))
                    .with_message("first defined here")
                    .with_color(Color::Blue),
            );
        }
        TypeError::InfiniteType { .. } => {
            builder.add_label(
                Label::new(primary)
                    .with_message("recursive type here")
                    .with_color(Color::Red),
            );
            builder.set_help("a value cannot have a type that refers to itself");
        }
        TypeError::Ambiguous { .. } | TypeError::AmbiguousDecl { .. } => {
            builder.add_label(
                Label::new(primary)
                    .with_message("type annotations needed")
                    .with_color(Color::Red),
            );
        }
        _ => {
            builder.add_label(
                Label::new(primary)
                    .with_message(msg.clone())
                    .with_color(Color::Red),
            );
        }
    }

    let mut buf = Vec::new();
    builder
        .finish()
        .write(Source::from(source), &mut buf)
        .expect("failed to write diagnostic");
    String::from_utf8(buf).expect("diagnostic output should be valid UTF-8")
}

#[cfg(test)]
mod tests {
    use super::*;
    use spl_ast::ExprId;
    use spl_types::Ty;

    #[test]
    fn codes_are_distinct_per_kind() {
        let unbound = TypeError::UnboundName {
            name: "x".into(),
            expr: ExprId::new(0),
            span: Span::new(0, 1),
        };
        let numeric = TypeError::NotNumeric {
            ty: Ty::bool(),
            expr: ExprId::new(0),
            span: Span::new(0, 1),
        };
        assert_eq!(error_code(&unbound), "E0004");
        assert_eq!(error_code(&numeric), "E0008");
    }

    #[test]
    fn renders_code_and_message() {
        let err = TypeError::UnboundName {
            name: "count".into(),
            expr: ExprId::new(0),
            span: Span::new(4, 9),
        };
        let out = render_diagnostic(&err, "1 + count");
        assert!(out.contains("E0004"), "{out}");
        assert!(out.contains("unbound name `count`"), "{out}");
    }
}
