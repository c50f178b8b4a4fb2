//! Fast hash map and hash set type aliases.
//!
//! Alias counters, member dedup and the glob cache are all keyed by short
//! strings, which is the case the Fx hash is tuned for. None of these maps
//! see attacker-controlled keys at a scale where DoS resistance matters.

/// A [`HashMap`](std::collections::HashMap) using the Fx hash algorithm.
pub type FxHashMap<K, V> = rustc_hash::FxHashMap<K, V>;

/// A [`HashSet`](std::collections::HashSet) using the Fx hash algorithm.
pub type FxHashSet<V> = rustc_hash::FxHashSet<V>;

/// Creates a new empty [`FxHashMap`].
///
/// # Examples
///
/// ```
/// use cjs_core::fx_hash_map;
///
/// let map: cjs_core::FxHashMap<String, usize> = fx_hash_map();
/// assert!(map.is_empty());
/// ```
#[inline]
#[must_use]
pub fn fx_hash_map<K, V>() -> FxHashMap<K, V> {
    FxHashMap::default()
}

/// Creates a new empty [`FxHashSet`].
#[inline]
#[must_use]
pub fn fx_hash_set<V>() -> FxHashSet<V> {
    FxHashSet::default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fx_hash_map_alias_lookup() {
        let mut aliases: FxHashMap<&str, &str> = fx_hash_map();
        aliases.insert("fs", "__CJS__import__0__");
        assert_eq!(aliases.get("fs"), Some(&"__CJS__import__0__"));
        assert_eq!(aliases.get("path"), None);
    }

    #[test]
    fn test_fx_hash_set_dedup() {
        let mut members: FxHashSet<&str> = fx_hash_set();
        assert!(members.insert("default"));
        assert!(!members.insert("default"));
        assert_eq!(members.len(), 1);
    }
}
