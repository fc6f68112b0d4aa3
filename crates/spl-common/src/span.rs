use std::fmt;
use std::ops::Range;

use serde::{Deserialize, Serialize};

/// Half-open byte range of a node in its compilation unit's source.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    pub start: u32,
    pub end: u32,
}

impl Span {
    /// Create a new span from byte offsets.
    pub fn new(start: u32, end: u32) -> Self {
        debug_assert!(start <= end, "span start ({start}) must be <= end ({end})");
        Self { start, end }
    }

    /// The span as a `usize` range, the shape diagnostic renderers expect.
    pub fn to_range(self) -> Range<usize> {
        self.start as usize..self.end as usize
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

/// Line starts of one source text, for turning a span into the
/// `line:column` position a one-line report shows.
#[derive(Debug)]
pub struct LineIndex {
    line_starts: Vec<u32>,
}

impl LineIndex {
    pub fn new(source: &str) -> Self {
        let line_starts = std::iter::once(0)
            .chain(
                source
                    .match_indices('\n')
                    .map(|(i, _)| (i + 1) as u32),
            )
            .collect();
        LineIndex { line_starts }
    }

    /// 1-based line and column of the start of `span`. Offsets past the end
    /// of the text land on the last line.
    pub fn position(&self, span: Span) -> (u32, u32) {
        let line = self
            .line_starts
            .partition_point(|&start| start <= span.start)
            .max(1);
        let col = span.start - self.line_starts[line - 1] + 1;
        (line as u32, col)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn span_as_range() {
        assert_eq!(Span::new(5, 10).to_range(), 5..10);
    }

    #[test]
    fn span_display() {
        assert_eq!(Span::new(3, 7).to_string(), "3..7");
    }

    #[test]
    fn positions_count_from_one() {
        let idx = LineIndex::new("let x = 3\nin x + 4");
        assert_eq!(idx.position(Span::new(0, 3)), (1, 1));
        assert_eq!(idx.position(Span::new(10, 12)), (2, 1));
        assert_eq!(idx.position(Span::new(13, 14)), (2, 4));
    }

    #[test]
    fn trailing_newline_starts_an_empty_line() {
        let idx = LineIndex::new("x\n");
        assert_eq!(idx.position(Span::new(2, 2)), (2, 1));
    }
}
