//! Errors from a whole pipeline run, and their rendering.

use std::fmt;
use std::ops::Range;

use ariadne::{Color, Config, Label, Report, ReportKind, Source};
use spl_common::{LineIndex, Span};
use spl_lower::LowerError;
use spl_typeck::diagnostics::{error_code, render_diagnostic};
use spl_typeck::TypeError;

#[derive(Clone, Debug, PartialEq)]
pub enum CompileError {
    /// Binding or inference rejected the program.
    Type(TypeError),
    /// Lowering failed or produced a tree the backend cannot take.
    Lower(LowerError),
}

impl CompileError {
    /// An internal invariant was broken; the program itself may be fine.
    pub fn is_defect(&self) -> bool {
        match self {
            CompileError::Type(_) => false,
            CompileError::Lower(e) => e.is_defect(),
        }
    }

    /// Stable code for the report header.
    pub fn code(&self) -> &'static str {
        match self {
            CompileError::Type(e) => error_code(e),
            CompileError::Lower(LowerError::LiftingConsistency { .. }) => "E0100",
            CompileError::Lower(LowerError::Handoff { .. }) => "E0101",
            CompileError::Lower(LowerError::SpecializationLimit { .. }) => "E0102",
            CompileError::Lower(LowerError::Backend { .. }) => "E0103",
        }
    }

    pub fn span(&self) -> Option<Span> {
        match self {
            CompileError::Type(e) => Some(e.span()),
            CompileError::Lower(e) => e.span(),
        }
    }

    /// One-line form for logs and summaries: `line:col: error[CODE]: message`.
    pub fn headline(&self, source: &str) -> String {
        match self.span() {
            Some(span) => {
                let (line, col) = LineIndex::new(source).position(span);
                format!("{}:{}: error[{}]: {}", line, col, self.code(), self)
            }
            None => format!("error[{}]: {}", self.code(), self),
        }
    }

    /// Render against the source the module was built from.
    pub fn render(&self, source: &str) -> String {
        match self {
            CompileError::Type(e) => render_diagnostic(e, source),
            CompileError::Lower(e) => render_lower(self.code(), e, source),
        }
    }
}

fn render_lower(code: &str, error: &LowerError, source: &str) -> String {
    let len = source.len();
    let range: Range<usize> = match error.span() {
        Some(span) => {
            let r = span.to_range();
            let s = r.start.min(len);
            s..r.end.min(len).max(s)
        }
        None => 0..0,
    };
    let msg = error.to_string();
    let mut builder = Report::build(ReportKind::Error, range.clone())
        .with_code(code)
        .with_message(&msg)
        .with_config(Config::default().with_color(false));
    if error.span().is_some() {
        builder.add_label(Label::new(range).with_message(msg.clone()).with_color(Color::Red));
    }
    if error.is_defect() {
        builder.set_note("this is a compiler bug, not an error in the program");
    }

    let mut buf = Vec::new();
    builder
        .finish()
        .write(Source::from(source), &mut buf)
        .expect("failed to write diagnostic");
    String::from_utf8(buf).expect("diagnostic output should be valid UTF-8")
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompileError::Type(e) => write!(f, "{}", e),
            CompileError::Lower(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for CompileError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CompileError::Type(e) => Some(e),
            CompileError::Lower(e) => Some(e),
        }
    }
}

impl From<TypeError> for CompileError {
    fn from(e: TypeError) -> Self {
        CompileError::Type(e)
    }
}

impl From<LowerError> for CompileError {
    fn from(e: LowerError) -> Self {
        CompileError::Lower(e)
    }
}
