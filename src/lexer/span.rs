//! Source positions: byte spans with line/column, and the line index that
//! computes them.

/// A position in source text, tracking line and column for error reporting.
///
/// `start`/`end` are byte offsets; `line` and `column` are 1-based, with the
/// column counted in characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    pub line: u32,
    pub column: u32,
}

impl Span {
    pub fn new(start: usize, end: usize, line: u32, column: u32) -> Self {
        Self {
            start,
            end,
            line,
            column,
        }
    }

    /// Span covering `self` through `other`, keeping `self`'s line/column.
    pub fn to(self, other: Span) -> Span {
        Span {
            start: self.start,
            end: other.end.max(self.end),
            line: self.line,
            column: self.column,
        }
    }
}

/// Maps byte offsets to 1-based line/column pairs.
#[derive(Debug, Clone)]
pub struct LineIndex<'a> {
    source: &'a str,
    line_starts: Vec<usize>,
}

impl<'a> LineIndex<'a> {
    pub fn new(source: &'a str) -> Self {
        let mut line_starts = vec![0];
        line_starts.extend(
            source
                .bytes()
                .enumerate()
                .filter(|&(_, b)| b == b'\n')
                .map(|(i, _)| i + 1),
        );
        Self {
            source,
            line_starts,
        }
    }

    /// Line and column of a byte offset.
    pub fn position(&self, offset: usize) -> (u32, u32) {
        let offset = offset.min(self.source.len());
        let line = match self.line_starts.binary_search(&offset) {
            Ok(exact) => exact,
            Err(next) => next - 1,
        };
        let line_start = self.line_starts[line];
        let column = self
            .source
            .get(line_start..offset)
            .map_or(offset - line_start, |s| s.chars().count());
        (line as u32 + 1, column as u32 + 1)
    }

    /// Build a [`Span`] for the byte range `start..end`.
    pub fn span(&self, start: usize, end: usize) -> Span {
        let (line, column) = self.position(start);
        Span::new(start, end, line, column)
    }

    /// Whether only blank characters precede `offset` on its line.
    pub fn starts_line(&self, offset: usize) -> bool {
        let before = &self.source[..offset.min(self.source.len())];
        let line_start = before.rfind('\n').map_or(0, |i| i + 1);
        before[line_start..].trim().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_line_positions() {
        let index = LineIndex::new("div { }");
        assert_eq!(index.position(0), (1, 1));
        assert_eq!(index.position(4), (1, 5));
    }

    #[test]
    fn positions_after_newlines() {
        let index = LineIndex::new("a\nbc\n\nd");
        assert_eq!(index.position(2), (2, 1));
        assert_eq!(index.position(3), (2, 2));
        assert_eq!(index.position(6), (4, 1));
    }

    #[test]
    fn column_counts_characters() {
        let index = LineIndex::new("é x");
        // 'é' is two bytes but one column.
        assert_eq!(index.position(3), (1, 3));
    }

    #[test]
    fn offset_past_end_is_clamped() {
        let index = LineIndex::new("ab");
        assert_eq!(index.position(10), (1, 3));
    }

    #[test]
    fn starts_line_ignores_indentation() {
        let index = LineIndex::new("x\n    -- note");
        assert!(index.starts_line(6));
        assert!(!index.starts_line(1));
        assert!(index.starts_line(0));
    }

    #[test]
    fn span_to_extends_end() {
        let a = Span::new(0, 3, 1, 1);
        let b = Span::new(5, 9, 1, 6);
        let joined = a.to(b);
        assert_eq!((joined.start, joined.end, joined.column), (0, 9, 1));
    }
}
