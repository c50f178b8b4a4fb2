//! Interop rules for standing a namespace import in for a `require` result.
//!
//! `require('x')` evaluates to whatever `x` put on `module.exports`. An
//! `import * as ns from 'x'` namespace has a different shape, and which member
//! of it corresponds to the CommonJS value cannot be known statically. The
//! rules below are alternatives the caller picks between.

use serde::{Deserialize, Serialize};

/// Placeholder substituted with the namespace alias in
/// [`ImportInterop::Template`] expressions.
pub const INTEROP_PLACEHOLDER: &str = "{ns}";

/// How a hoisted namespace import is turned back into a `require` value.
///
/// # Examples
///
/// ```
/// use cjs_core::ImportInterop;
///
/// assert_eq!(
///     ImportInterop::DefaultFirst.render("__ns"),
///     "(__ns.default ?? __ns)"
/// );
/// assert_eq!(
///     ImportInterop::Template("interop({ns})".to_owned()).render("__ns"),
///     "interop(__ns)"
/// );
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportInterop {
    /// `ns.default ?? ns`
    #[default]
    DefaultFirst,

    /// The namespace itself, unless its only own key is `default`.
    NamedFirst,

    /// A shallow copy of the namespace with `default`'s own keys merged over it.
    Merge,

    /// A raw expression with every [`INTEROP_PLACEHOLDER`] replaced by the alias.
    Template(String),
}

impl ImportInterop {
    /// Renders the interop expression over the namespace binding `ns`.
    ///
    /// Built-in rules are parenthesized so the result can replace a call
    /// expression anywhere, including as the object of a member access.
    #[must_use]
    pub fn render(&self, ns: &str) -> String {
        match self {
            Self::DefaultFirst => format!("({ns}.default ?? {ns})"),
            Self::NamedFirst => {
                format!("(Object.keys({ns}).join() === 'default' ? {ns}.default : {ns})")
            }
            Self::Merge => format!("Object.assign({{}}, {ns}, {ns}.default)"),
            Self::Template(template) => template.replace(INTEROP_PLACEHOLDER, ns),
        }
    }

    /// Returns `true` for a template that never mentions the namespace.
    #[must_use]
    pub fn is_degenerate(&self) -> bool {
        matches!(self, Self::Template(t) if !t.contains(INTEROP_PLACEHOLDER))
    }
}
