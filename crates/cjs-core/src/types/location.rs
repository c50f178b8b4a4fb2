//! Source position types.
//!
//! [`Span`] is what the rewrite pipeline works in: half-open byte ranges into
//! the original source. [`SourceLocation`] is what humans read in diagnostics.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A half-open `[start, end)` byte range in the original source text.
///
/// # Examples
///
/// ```
/// use cjs_core::Span;
///
/// let a = Span::new(0, 10);
/// let b = Span::new(10, 12);
/// assert!(!a.overlaps(b));
/// assert_eq!(a.len(), 10);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Span {
    /// Inclusive start byte offset.
    pub start: usize,

    /// Exclusive end byte offset.
    pub end: usize,
}

impl Span {
    /// Creates a new span. No ordering check is made here; the editor
    /// rejects spans with `end < start`.
    #[inline]
    #[must_use]
    pub const fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Number of bytes covered, zero for inverted spans.
    #[inline]
    #[must_use]
    pub const fn len(self) -> usize {
        self.end.saturating_sub(self.start)
    }

    /// Returns `true` if the span covers no bytes.
    #[inline]
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.len() == 0
    }

    /// Returns `true` if `other` lies entirely inside this span.
    #[inline]
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    /// Returns `true` if the two spans share at least one byte, or if both
    /// are empty insertion points at the same offset.
    #[must_use]
    pub const fn overlaps(self, other: Self) -> bool {
        if self.is_empty() && other.is_empty() {
            return self.start == other.start;
        }
        self.start < other.end && other.start < self.end
    }
}

/// A position within a source file.
///
/// # Field Conventions
///
/// - `line` is 1-indexed (first line is line 1)
/// - `column` is 0-indexed (UTF-8 byte offset within the line)
/// - `byte_offset` is the absolute byte position from the start of the file
///
/// The [`Display`](fmt::Display) form is `line:column` with a 1-indexed
/// column, matching what editors show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct SourceLocation {
    /// Line number (1-indexed).
    pub line: u32,

    /// Column number (0-indexed, UTF-8 byte offset within the line).
    pub column: u32,

    /// Absolute byte offset from the start of the file.
    pub byte_offset: u32,
}

impl SourceLocation {
    /// Creates a new source location.
    ///
    /// # Examples
    ///
    /// ```
    /// use cjs_core::SourceLocation;
    ///
    /// let loc = SourceLocation::new(3, 4, 40);
    /// assert_eq!(loc.to_string(), "3:5");
    /// ```
    #[inline]
    #[must_use]
    pub const fn new(line: u32, column: u32, byte_offset: u32) -> Self {
        Self {
            line,
            column,
            byte_offset,
        }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_span_overlap_rules() {
        let stmt = Span::new(0, 25);
        assert!(stmt.overlaps(Span::new(10, 18)));
        assert!(stmt.overlaps(Span::new(24, 30)));
        assert!(!stmt.overlaps(Span::new(25, 30)));
        assert!(!Span::new(5, 5).overlaps(Span::new(6, 6)));
        assert!(Span::new(5, 5).overlaps(Span::new(5, 5)));
        assert!(Span::new(0, 10).overlaps(Span::new(5, 5)));
    }

    #[test]
    fn test_span_contains() {
        let outer = Span::new(4, 20);
        assert!(outer.contains(Span::new(4, 20)));
        assert!(outer.contains(Span::new(8, 12)));
        assert!(!outer.contains(Span::new(2, 12)));
    }

    #[test]
    fn test_inverted_span_is_empty() {
        let span = Span::new(9, 3);
        assert_eq!(span.len(), 0);
        assert!(span.is_empty());
    }

    #[test]
    fn test_source_location_display() {
        assert_eq!(SourceLocation::new(1, 0, 0).to_string(), "1:1");
        assert_eq!(SourceLocation::new(12, 7, 300).to_string(), "12:8");
    }

    #[test]
    fn test_source_location_serialization() {
        let loc = SourceLocation::new(10, 5, 245);
        let json = serde_json::to_string(&loc).expect("serialize");
        let parsed: SourceLocation = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(loc, parsed);
    }
}
