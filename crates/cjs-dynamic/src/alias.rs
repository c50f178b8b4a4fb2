//! Path alias resolution for dynamic `require` globs.
//!
//! An alias maps a request prefix (`@`) to an absolute directory
//! (`/project/src`). Before a glob can be enumerated relative to the
//! importer, an aliased prefix has to be rewritten into an importer-relative
//! one; [`ResolvedAlias`] remembers both spellings so the runtime dispatch
//! can answer to either.

use camino::{Utf8Component, Utf8Path, Utf8PathBuf};
use cjs_core::AliasEntry;

use crate::glob;

/// The outcome of resolving an aliased glob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedAlias {
    /// The alias prefix as written in the request, e.g. `@`.
    pub find: String,

    /// The importer-relative spelling of the alias target, ending in `/`,
    /// e.g. `./` or `../src/`. Unescaped.
    pub relative: String,

    /// The rewritten glob, now importer-relative.
    pub glob: String,
}

impl ResolvedAlias {
    /// Re-spells an importer-relative request in alias form.
    ///
    /// # Examples
    ///
    /// ```
    /// use cjs_dynamic::ResolvedAlias;
    ///
    /// let alias = ResolvedAlias {
    ///     find: "@".to_owned(),
    ///     relative: "../src/".to_owned(),
    ///     glob: "../src/*".to_owned(),
    /// };
    /// assert_eq!(alias.to_alias_form("../src/a/b.js").as_deref(), Some("@/a/b.js"));
    /// assert_eq!(alias.to_alias_form("./c.js"), None);
    /// ```
    #[must_use]
    pub fn to_alias_form(&self, request: &str) -> Option<String> {
        let rest = request.strip_prefix(&self.relative)?;
        Some(format!("{}/{rest}", self.find))
    }
}

/// Resolves aliased globs to importer-relative ones.
///
/// Implementations must be thread-safe; one resolver is shared by every
/// worker of a batch transform.
pub trait AliasResolver: Send + Sync {
    /// Rewrites `glob` if it starts with a known alias.
    ///
    /// `glob` is in escaped glob syntax and `importer` is the absolute path
    /// of the file being transformed. Returns `None` when no alias applies.
    fn resolve(&self, glob: &str, importer: &Utf8Path) -> Option<ResolvedAlias>;
}

/// An [`AliasResolver`] over a fixed list of [`AliasEntry`] values, tried in
/// order.
///
/// # Examples
///
/// ```
/// use camino::Utf8Path;
/// use cjs_core::AliasEntry;
/// use cjs_dynamic::{AliasMap, AliasResolver};
///
/// let aliases = AliasMap::new(vec![AliasEntry::new("@", "/project/src")]);
/// let resolved = aliases
///     .resolve("@/plugins/*", Utf8Path::new("/project/src/pages/home.js"))
///     .expect("alias applies");
///
/// assert_eq!(resolved.glob, "../plugins/*");
/// assert_eq!(resolved.relative, "../");
/// ```
#[derive(Debug, Clone, Default)]
pub struct AliasMap {
    entries: Vec<AliasEntry>,
}

impl AliasMap {
    /// Creates a resolver over `entries`.
    #[must_use]
    pub fn new(entries: Vec<AliasEntry>) -> Self {
        Self { entries }
    }

    /// Returns `true` if no aliases are configured.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl AliasResolver for AliasMap {
    fn resolve(&self, glob_text: &str, importer: &Utf8Path) -> Option<ResolvedAlias> {
        let importer_dir = importer.parent().unwrap_or(Utf8Path::new(""));

        self.entries.iter().find_map(|entry| {
            let find = glob::escape(&entry.find);
            let rest = match glob_text.strip_prefix(find.as_str())? {
                "" => "",
                rest => rest.strip_prefix('/')?,
            };

            let mut relative = relative_path(importer_dir, &entry.replacement);
            if !relative.ends_with('/') {
                relative.push('/');
            }
            Some(ResolvedAlias {
                find: entry.find.clone(),
                glob: format!("{}{rest}", glob::escape(&relative)),
                relative,
            })
        })
    }
}

/// Lexically normalizes a path: drops `.` components and folds `..` into
/// the preceding normal component.
///
/// # Examples
///
/// ```
/// use camino::Utf8Path;
/// use cjs_dynamic::alias::normalize;
///
/// assert_eq!(normalize(Utf8Path::new("/a/b/../c/./d.js")), "/a/c/d.js");
/// ```
#[must_use]
pub fn normalize(path: &Utf8Path) -> Utf8PathBuf {
    let mut out: Vec<Utf8Component<'_>> = Vec::new();
    for component in path.components() {
        match component {
            Utf8Component::CurDir => {}
            Utf8Component::ParentDir => match out.last() {
                Some(Utf8Component::Normal(_)) => {
                    out.pop();
                }
                Some(Utf8Component::RootDir | Utf8Component::Prefix(_)) => {}
                _ => out.push(component),
            },
            other => out.push(other),
        }
    }
    out.iter().collect()
}

/// The `./`- or `../`-prefixed path from directory `from` to `to`.
///
/// Both paths are normalized first. The result always starts with `.`.
///
/// # Examples
///
/// ```
/// use camino::Utf8Path;
/// use cjs_dynamic::alias::relative_path;
///
/// assert_eq!(relative_path(Utf8Path::new("/p/src/a"), Utf8Path::new("/p/lib/x.js")), "../../lib/x.js");
/// assert_eq!(relative_path(Utf8Path::new("/p/src"), Utf8Path::new("/p/src/x")), "./x");
/// assert_eq!(relative_path(Utf8Path::new("/p/src"), Utf8Path::new("/p/src")), ".");
/// ```
#[must_use]
pub fn relative_path(from: &Utf8Path, to: &Utf8Path) -> String {
    let from = normalize(from);
    let to = normalize(to);
    let from_parts: Vec<&str> = from.components().map(|c| c.as_str()).collect();
    let to_parts: Vec<&str> = to.components().map(|c| c.as_str()).collect();

    let common = from_parts
        .iter()
        .zip(&to_parts)
        .take_while(|(a, b)| a == b)
        .count();

    let mut parts: Vec<&str> = Vec::new();
    parts.extend(std::iter::repeat_n("..", from_parts.len() - common));
    parts.extend(&to_parts[common..]);

    match parts.first() {
        None => ".".to_owned(),
        Some(&"..") => parts.join("/"),
        Some(_) => format!("./{}", parts.join("/")),
    }
}
