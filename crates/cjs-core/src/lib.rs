//! Core types, configuration, and errors for cjs2esm.
//!
//! This crate holds everything the other workspace crates agree on:
//!
//! - [`TransformOptions`] and its nested option types (serde, JSON-loadable)
//! - [`ConfigError`] for configuration failures
//! - Source positions ([`Span`], [`SourceLocation`])
//! - The generated-import vocabulary ([`ImportStatement`], [`ImportStrategy`])
//! - The namespace interop rules ([`ImportInterop`])
//! - `FxHashMap`/`FxHashSet` aliases
//!
//! # Example
//!
//! ```
//! use cjs_core::{ImportClause, ImportStatement};
//!
//! let stmt = ImportStatement::new(ImportClause::Namespace("fs".to_owned()), "'fs'");
//! assert_eq!(stmt.to_string(), "import * as fs from 'fs';");
//! ```

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod hash;
pub mod types;

pub use config::{AliasEntry, DynamicOptions, TransformOptions};
pub use error::ConfigError;
pub use hash::{FxHashMap, FxHashSet, fx_hash_map, fx_hash_set};
pub use types::{
    INTEROP_PLACEHOLDER, ImportClause, ImportInterop, ImportStatement, ImportStrategy,
    NamedSpecifier, SourceLocation, Span, quote_js_string,
};
