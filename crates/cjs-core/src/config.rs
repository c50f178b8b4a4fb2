//! Configuration structures for cjs2esm.
//!
//! - [`TransformOptions`] - Root options for a transformer instance
//! - [`DynamicOptions`] - Dynamic `require` resolution settings
//! - [`AliasEntry`] - A path alias (`@` → `/abs/src`)
//!
//! All types implement [`Default`] and deserialize with `#[serde(default)]`,
//! so a JSON file only needs to name the fields it changes.

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::types::ImportInterop;

/// Extensions of files the transformer will rewrite.
pub const DEFAULT_EXTENSIONS: &[&str] = &[
    ".mjs", ".js", ".cjs", ".mts", ".ts", ".cts", ".jsx", ".tsx",
];

/// Extensions tried when a dynamic `require` glob has none of its own.
pub const DEFAULT_DYNAMIC_EXTENSIONS: &[&str] = &[
    ".mjs", ".js", ".cjs", ".mts", ".ts", ".jsx", ".tsx", ".json", ".vue", ".svelte",
    ".css", ".scss", ".less",
];

/// Settings for dynamic `require` resolution.
///
/// # Examples
///
/// ```
/// use cjs_core::DynamicOptions;
///
/// let options = DynamicOptions::default();
/// assert!(options.loose);
/// assert!(options.extensions.iter().any(|e| e == ".json"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DynamicOptions {
    /// Also match files one directory level below the last wildcard.
    ///
    /// `true` behaves like webpack's context modules; `false` matches the
    /// glob literally.
    pub loose: bool,

    /// Extensions appended to globs whose last segment has none.
    pub extensions: Vec<String>,

    /// Memoize glob enumeration results for the lifetime of the transformer.
    pub cache: bool,
}

impl Default for DynamicOptions {
    fn default() -> Self {
        Self {
            loose: true,
            extensions: DEFAULT_DYNAMIC_EXTENSIONS
                .iter()
                .map(|e| (*e).to_owned())
                .collect(),
            cache: true,
        }
    }
}

/// A path alias used when resolving dynamic `require` globs.
///
/// A request starting with `find` followed by `/` (or equal to it) resolves
/// into `replacement`, which must be an absolute directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AliasEntry {
    /// The request prefix, e.g. `@`.
    pub find: String,

    /// Absolute directory the prefix stands for.
    pub replacement: Utf8PathBuf,
}

impl AliasEntry {
    /// Creates a new alias entry.
    #[must_use]
    pub fn new(find: impl Into<String>, replacement: impl Into<Utf8PathBuf>) -> Self {
        Self {
            find: find.into(),
            replacement: replacement.into(),
        }
    }
}

/// Root options for a transformer instance.
///
/// # Examples
///
/// ```
/// use cjs_core::{ImportInterop, TransformOptions};
///
/// let options = TransformOptions::from_json_str(
///     r#"{ "import_interop": "named_first", "dynamic": { "loose": false } }"#,
/// )?;
/// assert_eq!(options.import_interop, ImportInterop::NamedFirst);
/// assert!(!options.dynamic.loose);
/// assert!(options.source_map);
/// # Ok::<(), cjs_core::ConfigError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransformOptions {
    /// Extensions (with leading dot) of files eligible for rewriting.
    pub extensions: Vec<String>,

    /// Dynamic `require` resolution settings.
    pub dynamic: DynamicOptions,

    /// Interop rule for hoisted namespace imports.
    pub import_interop: ImportInterop,

    /// Path aliases, tried in order.
    pub aliases: Vec<AliasEntry>,

    /// Generate a source map alongside the rewritten code.
    pub source_map: bool,
}

impl Default for TransformOptions {
    fn default() -> Self {
        Self {
            extensions: DEFAULT_EXTENSIONS.iter().map(|e| (*e).to_owned()).collect(),
            dynamic: DynamicOptions::default(),
            import_interop: ImportInterop::default(),
            aliases: Vec::new(),
            source_map: true,
        }
    }
}

impl TransformOptions {
    /// Parses and validates options from a JSON string.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let options: Self = serde_json::from_str(json)?;
        options.validate()?;
        Ok(options)
    }

    /// Reads, parses, and validates options from a JSON file.
    pub fn from_file(path: &Utf8Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Checks the options for values the pipeline cannot work with.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::InvalidOption`] for extensions without a leading dot,
    ///   empty alias prefixes, or an interop template without the placeholder
    /// - [`ConfigError::InvalidPath`] for relative alias replacements
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (option, list) in [
            ("extensions", &self.extensions),
            ("dynamic.extensions", &self.dynamic.extensions),
        ] {
            if let Some(bad) = list.iter().find(|e| !e.starts_with('.') || e.len() < 2) {
                return Err(ConfigError::invalid_option(
                    option,
                    format!("'{bad}' must be a dot followed by an extension"),
                ));
            }
        }

        if self.import_interop.is_degenerate() {
            return Err(ConfigError::invalid_option(
                "import_interop",
                format!(
                    "template must reference the namespace with {}",
                    crate::types::INTEROP_PLACEHOLDER
                ),
            ));
        }

        for alias in &self.aliases {
            if alias.find.is_empty() {
                return Err(ConfigError::invalid_option("aliases", "empty alias prefix"));
            }
            if !alias.replacement.is_absolute() {
                return Err(ConfigError::InvalidPath {
                    path: alias.replacement.clone(),
                    reason: format!("replacement for alias '{}' must be absolute", alias.find),
                });
            }
        }

        Ok(())
    }

    /// Returns `true` if `extension` (with leading dot) is eligible for rewriting.
    #[must_use]
    pub fn accepts_extension(&self, extension: &str) -> bool {
        self.extensions.iter().any(|e| e == extension)
    }
}
