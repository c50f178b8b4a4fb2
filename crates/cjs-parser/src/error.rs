//! Error types for the cjs-parser crate.

use cjs_core::SourceLocation;

/// Errors that can occur while parsing a JavaScript or TypeScript source.
///
/// # Examples
///
/// ```
/// use cjs_core::SourceLocation;
/// use cjs_parser::ParseError;
///
/// let err = ParseError::Syntax {
///     location: SourceLocation::new(2, 4, 17),
/// };
/// assert!(err.is_syntax());
/// assert_eq!(err.to_string(), "syntax error at 2:5");
/// ```
#[derive(Debug, Clone, thiserror::Error)]
pub enum ParseError {
    /// Failed to set the grammar on the tree-sitter parser.
    #[error("failed to set {grammar} language")]
    LanguageInit {
        /// Name of the grammar that failed to load.
        grammar: &'static str,
    },

    /// Tree-sitter produced no tree (cancelled or out of memory).
    #[error("failed to parse source code")]
    Parse,

    /// The tree contains at least one `ERROR` or `MISSING` node.
    #[error("syntax error at {location}")]
    Syntax {
        /// Where the first erroneous node starts.
        location: SourceLocation,
    },
}

impl ParseError {
    /// Returns `true` for errors caused by the source text rather than the parser.
    #[inline]
    pub fn is_syntax(&self) -> bool {
        matches!(self, Self::Syntax { .. })
    }
}
