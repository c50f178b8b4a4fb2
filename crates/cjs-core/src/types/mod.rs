//! Domain types shared across the cjs2esm workspace.
//!
//! # Module Organization
//!
//! - [`import`] - Generated import statements and the strategy that produced them
//! - [`interop`] - Namespace-to-`require` interop rules
//! - [`location`] - Byte spans and line/column locations
//!
//! All public types are re-exported at this module level and at the crate root.

pub mod import;
pub mod interop;
pub mod location;

pub use import::{ImportClause, ImportStatement, ImportStrategy, NamedSpecifier, quote_js_string};
pub use interop::{INTEROP_PLACEHOLDER, ImportInterop};
pub use location::{SourceLocation, Span};
