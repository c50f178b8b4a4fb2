//! Tree-sitter parsing and CommonJS analysis for cjs2esm.
//!
//! This crate turns source text into a tree-sitter [`Tree`](tree_sitter::Tree)
//! and finds the CommonJS constructs the rewrite pipeline cares about:
//!
//! - `require(...)` calls, classified by argument shape ([`RequireKind`])
//! - assignments through `module`, `exports` and `module.exports`
//!
//! # Overview
//!
//! ```
//! use cjs_parser::{ParserSet, RequireKind, analyze};
//!
//! let source = "const fs = require('fs');\nexports.read = fs.readFileSync;\n";
//! let mut parsers = ParserSet::new()?;
//! let tree = parsers.parse(source, "src/index.js")?;
//! let analysis = analyze(&tree, source);
//!
//! assert!(matches!(analysis.requires[0].kind, RequireKind::StaticLiteral(_)));
//! assert_eq!(analysis.exports[0].member(), Some("read"));
//! # Ok::<(), cjs_parser::ParseError>(())
//! ```
//!
//! # Grammars
//!
//! | Extension | Grammar |
//! |-----------|---------|
//! | `.ts`, `.mts`, `.cts` | TypeScript |
//! | anything else | TSX |
//!
//! A tree containing any `ERROR` or `MISSING` node is reported as
//! [`ParseError::Syntax`]; callers pass such files through untouched.
//!
//! # Thread Safety
//!
//! [`JsParser`] and [`ParserSet`] are `Send` but not `Sync`. Batch callers
//! create one [`ParserSet`] per worker thread.

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod analyzer;
pub mod error;
pub mod node;
mod parser;
pub mod walker;

pub use analyzer::{
    Analysis, ExportObject, ExportOccurrence, RequireKind, RequireOccurrence, Specifier, analyze,
    cook,
};
pub use error::ParseError;
pub use node::NodeExt;
pub use parser::{Grammar, JsParser, ParserSet};
pub use walker::{Visit, walk};

// Re-export tree-sitter types that appear in our public API
pub use tree_sitter::{Node, Tree};
