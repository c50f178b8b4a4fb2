//! File enumeration for dynamic `require` globs.
//!
//! [`GlobWalker`] walks one directory with the `ignore` crate and keeps the
//! files whose root-relative path matches any of its patterns.
//!
//! # Features
//!
//! - Hidden files and directories are skipped
//! - `node_modules` and `.git` are never entered
//! - Depth is bounded by the number of segments in the longest pattern
//! - `.gitignore` rules are NOT applied: a require can reach ignored files

use camino::{Utf8Path, Utf8PathBuf};
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use ignore::WalkBuilder;

use crate::error::GlobError;

/// Directories a dynamic require never reaches into.
const SKIP_DIRECTORIES: &[&str] = &["node_modules", ".git"];

/// Enumerates files below a root directory that match a set of globs.
///
/// # Examples
///
/// ```no_run
/// use camino::Utf8Path;
/// use cjs_dynamic::GlobWalker;
///
/// let walker = GlobWalker::new(Utf8Path::new("/project/src/plugins"), &["*.{js,ts}".to_owned()])?;
/// for file in walker.collect()? {
///     println!("matched {file}");
/// }
/// # Ok::<(), cjs_dynamic::GlobError>(())
/// ```
#[derive(Debug)]
pub struct GlobWalker {
    /// The directory the patterns are relative to.
    root: Utf8PathBuf,
    /// Compiled patterns.
    matcher: GlobSet,
    /// Maximum depth below `root`.
    max_depth: usize,
}

impl GlobWalker {
    /// Compiles `patterns` for matching below `root`.
    ///
    /// Patterns use `/` separators; `*` never crosses one.
    ///
    /// # Errors
    ///
    /// Returns [`GlobError::Pattern`] if a pattern fails to compile.
    pub fn new(root: &Utf8Path, patterns: &[String]) -> Result<Self, GlobError> {
        let mut builder = GlobSetBuilder::new();
        let mut max_depth = 1;

        for pattern in patterns {
            let glob = GlobBuilder::new(pattern)
                .literal_separator(true)
                .backslash_escape(true)
                .build()
                .map_err(|e| GlobError::pattern(pattern, e))?;
            builder.add(glob);
            max_depth = max_depth.max(pattern.split('/').count());
        }

        let matcher = builder
            .build()
            .map_err(|e| GlobError::pattern(patterns.join(", "), e))?;

        Ok(Self {
            root: root.to_owned(),
            matcher,
            max_depth,
        })
    }

    /// Returns the sorted root-relative paths of all matching files.
    ///
    /// A missing root yields an empty list.
    ///
    /// # Errors
    ///
    /// Returns [`GlobError::Walk`] for non-recoverable traversal failures.
    /// Recoverable per-entry failures are logged and skipped.
    pub fn collect(&self) -> Result<Vec<String>, GlobError> {
        if !self.root.is_dir() {
            return Ok(Vec::new());
        }

        let mut matches = Vec::new();
        for result in self.build_walker() {
            match self.visit(result) {
                Ok(Some(path)) => matches.push(path),
                Ok(None) => {}
                Err(err) if err.is_recoverable() => {
                    tracing::debug!(root = %self.root, error = %err, "skipping unreadable entry");
                }
                Err(err) => return Err(err),
            }
        }

        matches.sort_unstable();
        Ok(matches)
    }

    fn visit(
        &self,
        result: Result<ignore::DirEntry, ignore::Error>,
    ) -> Result<Option<String>, GlobError> {
        let entry = result?;
        if !entry.file_type().is_some_and(|ft| ft.is_file()) {
            return Ok(None);
        }

        let path = entry.path();
        let relative = path.strip_prefix(self.root.as_std_path()).unwrap_or(path);
        let relative = Utf8Path::from_path(relative)
            .ok_or_else(|| GlobError::NonUtf8Path(path.to_owned()))?;

        // Patterns use `/` on every platform.
        let relative = relative
            .components()
            .map(|c| c.as_str())
            .collect::<Vec<_>>()
            .join("/");

        Ok(self.matcher.is_match(&relative).then_some(relative))
    }

    fn build_walker(&self) -> ignore::Walk {
        WalkBuilder::new(&self.root)
            .standard_filters(false)
            .hidden(true)
            .follow_links(false)
            .max_depth(Some(self.max_depth))
            .filter_entry(|entry| {
                !entry.file_type().is_some_and(|ft| ft.is_dir())
                    || !entry
                        .file_name()
                        .to_str()
                        .is_some_and(|name| SKIP_DIRECTORIES.contains(&name))
            })
            .build()
    }

    /// Returns the directory being walked.
    #[inline]
    #[must_use]
    pub fn root(&self) -> &Utf8Path {
        &self.root
    }
}
