//! Concurrent cache for glob enumeration results.
//!
//! [`GlobCache`] memoizes [`GlobWalker::collect`](crate::GlobWalker::collect)
//! results keyed by the normalized walk root plus the pattern list. It lives
//! as long as the transformer that owns it, so new files appearing on disk
//! are only seen after [`GlobCache::clear`].
//!
//! # Safety Pattern
//!
//! - The lock is never held while walking the filesystem
//! - Values are `Arc<[String]>`, so readers clone a pointer, not the list

use std::sync::Arc;

use camino::Utf8Path;
use cjs_core::FxHashMap;
use parking_lot::RwLock;

/// A thread-safe cache of matched file lists.
///
/// # Examples
///
/// ```
/// use camino::Utf8Path;
/// use cjs_dynamic::GlobCache;
///
/// let cache = GlobCache::new();
/// let patterns = ["*.js".to_owned()];
/// let key = GlobCache::key(Utf8Path::new("/p/src"), &patterns);
///
/// let files = cache.get_or_try_insert_with(&key, || {
///     Ok::<_, std::convert::Infallible>(vec!["a.js".to_owned()])
/// })?;
/// assert_eq!(&*files, ["a.js".to_owned()]);
/// assert_eq!(cache.len(), 1);
/// # Ok::<(), std::convert::Infallible>(())
/// ```
#[derive(Debug, Default)]
pub struct GlobCache {
    entries: RwLock<FxHashMap<String, Arc<[String]>>>,
}

impl GlobCache {
    /// Creates an empty cache.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the cache key for a walk.
    #[must_use]
    pub fn key(root: &Utf8Path, patterns: &[String]) -> String {
        let mut key = root.as_str().to_owned();
        for pattern in patterns {
            key.push('\0');
            key.push_str(pattern);
        }
        key
    }

    /// Returns the cached list for `key`, if any.
    pub fn get(&self, key: &str) -> Option<Arc<[String]>> {
        self.entries.read().get(key).cloned()
    }

    /// Stores `files` under `key`, replacing any previous entry.
    pub fn insert(&self, key: String, files: Vec<String>) -> Arc<[String]> {
        let files: Arc<[String]> = files.into();
        self.entries.write().insert(key, Arc::clone(&files));
        files
    }

    /// Returns the cached list, or computes and stores it.
    ///
    /// Two threads missing on the same key may both run `compute`; the last
    /// writer wins and both results are equal.
    pub fn get_or_try_insert_with<E>(
        &self,
        key: &str,
        compute: impl FnOnce() -> Result<Vec<String>, E>,
    ) -> Result<Arc<[String]>, E> {
        if let Some(files) = self.get(key) {
            return Ok(files);
        }
        let files = compute()?;
        Ok(self.insert(key.to_owned(), files))
    }

    /// Number of cached walks.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Returns `true` if nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Drops every cached entry.
    pub fn clear(&self) {
        self.entries.write().clear();
    }
}
