//! Generated import statements.
//!
//! The planners never build import text by hand; they describe the statement
//! with an [`ImportClause`] and let [`ImportStatement`]'s `Display` impl
//! produce the canonical spelling.

use std::fmt;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// How a `require` occurrence was rewritten.
///
/// # Examples
///
/// ```
/// use cjs_core::ImportStrategy;
///
/// assert!(ImportStrategy::Hoisted.is_hoisted());
/// assert!(!ImportStrategy::Named.is_hoisted());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum ImportStrategy {
    /// `require('x');` became `import 'x';`
    SideEffect,

    /// `const a = require('x')` became `import * as a from 'x';`
    Namespace,

    /// `const a = require('x').default` became `import a from 'x';`
    Default,

    /// A destructured or single-member require became `import { .. } from 'x';`
    Named,

    /// `const { .. } = require('x').m` became an aliased import plus a
    /// local destructuring declaration.
    MemberDestructure,

    /// The call was replaced in place by an interop expression over a
    /// namespace import hoisted to the top of the file.
    Hoisted,
}

impl ImportStrategy {
    /// Returns `true` if the occurrence was left in place and its import hoisted.
    #[inline]
    #[must_use]
    pub const fn is_hoisted(self) -> bool {
        matches!(self, Self::Hoisted)
    }
}

/// One entry of a named import list: `imported` or `imported as local`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NamedSpecifier {
    /// Name exported by the target module.
    pub imported: String,

    /// Local binding name.
    pub local: String,
}

impl NamedSpecifier {
    /// Creates a specifier binding `imported` to `local`.
    #[must_use]
    pub fn new(imported: impl Into<String>, local: impl Into<String>) -> Self {
        Self {
            imported: imported.into(),
            local: local.into(),
        }
    }
}

impl fmt::Display for NamedSpecifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.imported == self.local {
            f.write_str(&self.imported)
        } else {
            write!(f, "{} as {}", self.imported, self.local)
        }
    }
}

/// The binding part of an import statement.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ImportClause {
    /// `import 'x'`
    SideEffect,

    /// `import * as name from 'x'`
    Namespace(String),

    /// `import name from 'x'`
    Default(String),

    /// `import { a, b as c } from 'x'`
    Named(SmallVec<[NamedSpecifier; 4]>),
}

/// A complete ES import statement.
///
/// `specifier` is kept as a ready-to-print JavaScript string literal
/// (including its quotes) so the original quoting of the source survives.
///
/// # Examples
///
/// ```
/// use cjs_core::{ImportClause, ImportStatement, NamedSpecifier};
/// use smallvec::smallvec;
///
/// let stmt = ImportStatement::new(
///     ImportClause::Named(smallvec![
///         NamedSpecifier::new("stat", "stat"),
///         NamedSpecifier::new("cp", "cpAlias"),
///     ]),
///     "'fs'",
/// );
/// assert_eq!(stmt.to_string(), "import { stat, cp as cpAlias } from 'fs';");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImportStatement {
    /// What the statement binds.
    pub clause: ImportClause,

    /// The module specifier as a JavaScript string literal.
    pub specifier: String,
}

impl ImportStatement {
    /// Creates a new import statement.
    #[must_use]
    pub fn new(clause: ImportClause, specifier: impl Into<String>) -> Self {
        Self {
            clause,
            specifier: specifier.into(),
        }
    }
}

impl fmt::Display for ImportStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.clause {
            ImportClause::SideEffect => write!(f, "import {};", self.specifier),
            ImportClause::Namespace(name) => {
                write!(f, "import * as {name} from {};", self.specifier)
            }
            ImportClause::Default(name) => write!(f, "import {name} from {};", self.specifier),
            ImportClause::Named(specifiers) => {
                f.write_str("import { ")?;
                for (i, spec) in specifiers.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{spec}")?;
                }
                write!(f, " }} from {};", self.specifier)
            }
        }
    }
}

/// Quotes a cooked string value as a single-quoted JavaScript literal.
///
/// # Examples
///
/// ```
/// use cjs_core::quote_js_string;
///
/// assert_eq!(quote_js_string("./a.js"), "'./a.js'");
/// assert_eq!(quote_js_string("it's"), r"'it\'s'");
/// ```
#[must_use]
pub fn quote_js_string(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('\'');
    for ch in value.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\u{2028}' => out.push_str("\\u2028"),
            '\u{2029}' => out.push_str("\\u2029"),
            c => out.push(c),
        }
    }
    out.push('\'');
    out
}
