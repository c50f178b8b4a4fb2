//! Error types for the cjs-transform crate.
//!
//! - [`EditError`] - An invalid or overlapping text edit
//! - [`ImportError`] - A `require` call that can never become an import
//! - [`TransformError`] - Everything that can abort one file's transform

use cjs_core::{ConfigError, SourceLocation, Span};
use cjs_parser::ParseError;

/// Errors reported by [`TextEditor`](crate::TextEditor).
///
/// Every variant points at a bug in a planner, not at user input.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EditError {
    /// `end` is before `start`.
    #[error("invalid range {start}..{end}: end is before start")]
    InvalidRange {
        /// Range start.
        start: usize,
        /// Range end.
        end: usize,
    },

    /// The range reaches past the end of the source.
    #[error("range {start}..{end} is out of bounds for source of length {len}")]
    OutOfBounds {
        /// Range start.
        start: usize,
        /// Range end.
        end: usize,
        /// Source length in bytes.
        len: usize,
    },

    /// An offset falls inside a multi-byte character.
    #[error("offset {offset} is not on a character boundary")]
    CharBoundary {
        /// The offending offset.
        offset: usize,
    },

    /// The range overlaps an edit recorded earlier.
    #[error("edit {}..{} overlaps earlier edit {}..{}", span.start, span.end, existing.start, existing.end)]
    Overlap {
        /// The rejected range.
        span: Span,
        /// The range it collides with.
        existing: Span,
    },
}

/// Errors raised while planning static imports.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ImportError {
    /// A `require` call without arguments, or whose first argument can
    /// never evaluate to a string.
    #[error("the following require call at {location} cannot be converted\n  -> {snippet}\n     {underline}")]
    Unconvertible {
        /// The call's source text.
        snippet: String,
        /// Where the call starts.
        location: SourceLocation,
        /// A row of `^` as wide as the snippet.
        underline: String,
    },
}

impl ImportError {
    /// Creates an [`ImportError::Unconvertible`] for `snippet`.
    ///
    /// Only the snippet's first line is shown, underlined in full.
    #[must_use]
    pub fn unconvertible(snippet: &str, location: SourceLocation) -> Self {
        let snippet = snippet.lines().next().unwrap_or_default().to_owned();
        let underline = "^".repeat(snippet.chars().count());
        Self::Unconvertible {
            snippet,
            location,
            underline,
        }
    }
}

/// Errors that abort the transform of one file.
///
/// Syntax errors are not among them: an unparsable file is passed through
/// untouched.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum TransformError {
    /// A `require` call cannot be converted.
    #[error("{id}: {source}")]
    Import {
        /// The file identifier.
        id: String,
        /// The underlying import error.
        #[source]
        source: ImportError,
    },

    /// A planner produced an invalid edit.
    #[error("internal edit error: {0}")]
    Edit(#[from] EditError),

    /// The parser could not be created or run.
    #[error("parser error: {0}")]
    Parse(#[from] ParseError),

    /// The options are invalid.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The blocking task running an async transform panicked or was cancelled.
    #[error("transform task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl TransformError {
    /// Creates a new [`TransformError::Import`] error.
    #[inline]
    pub fn import(id: impl Into<String>, source: ImportError) -> Self {
        Self::Import {
            id: id.into(),
            source,
        }
    }

    /// Returns `true` if the error comes from the source being transformed
    /// rather than from the transformer itself.
    #[must_use]
    pub const fn is_source_error(&self) -> bool {
        matches!(self, Self::Import { .. })
    }
}
