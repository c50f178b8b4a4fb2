//! Error types for the cjs-dynamic crate.
//!
//! None of these abort a file transform. The resolver logs them and leaves
//! the offending `require` call as it was.

/// Errors that can occur while enumerating files for a dynamic `require`.
///
/// # Error Recovery Strategy
///
/// - **Pattern errors** ([`GlobError::Pattern`]): the occurrence is skipped
/// - **Walk errors** ([`GlobError::Walk`]): I/O failures on a single entry
///   are skipped and the walk continues; anything else skips the occurrence
/// - **Non-UTF-8 paths** ([`GlobError::NonUtf8Path`]): the entry is skipped
#[derive(Debug, thiserror::Error)]
pub enum GlobError {
    /// A generated glob pattern failed to compile.
    #[error("invalid glob pattern '{pattern}': {source}")]
    Pattern {
        /// The pattern that failed.
        pattern: String,
        /// The underlying globset error.
        #[source]
        source: globset::Error,
    },

    /// Directory traversal failed.
    #[error("failed to walk directory: {0}")]
    Walk(#[from] ignore::Error),

    /// A matched path is not valid UTF-8.
    #[error("path is not valid UTF-8: {}", _0.display())]
    NonUtf8Path(std::path::PathBuf),
}

impl GlobError {
    /// Creates a new [`GlobError::Pattern`] error.
    #[inline]
    pub fn pattern(pattern: impl Into<String>, source: globset::Error) -> Self {
        Self::Pattern {
            pattern: pattern.into(),
            source,
        }
    }

    /// Returns `true` if the walk can continue past this error.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Pattern { .. } => false,
            Self::Walk(err) => err.io_error().is_some(),
            Self::NonUtf8Path(_) => true,
        }
    }
}
