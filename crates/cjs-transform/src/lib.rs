//! CommonJS to ES module rewriting for cjs2esm.
//!
//! Given a file's source text and id, [`Transformer`] returns the file
//! rewritten as an ES module, or `None` when there is nothing to do.
//!
//! # Overview
//!
//! ```
//! use cjs_core::TransformOptions;
//! use cjs_transform::Transformer;
//!
//! let transformer = Transformer::new(TransformOptions::default())?;
//! let source = "const { join } = require('path');\nexports.root = join('/', 'srv');\n";
//! let output = transformer.transform(source, "/src/paths.js")?.expect("rewritten");
//!
//! assert!(output.code.contains("import { join } from 'path';"));
//! assert!(output.code.contains("__CJS__export_root__ as root,"));
//! assert!(output.map.is_some());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! # Module Organization
//!
//! - [`import`] - Static `require` occurrences to `import` statements
//! - [`export`] - Export assignments to a polyfill and an `export` statement
//! - [`editor`] - Non-overlapping span edits against the original text
//! - [`sourcemap`] - Version 3 source maps for editor output
//! - [`transformer`] - The pipeline tying them together
//!
//! # Concurrency
//!
//! [`Transformer::transform_batch`] fans files out over rayon's pool with one
//! parser set per worker; [`Transformer::transform_async`] runs a single file
//! on tokio's blocking pool.

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod editor;
pub mod error;
pub mod export;
pub mod import;
pub mod sourcemap;
pub mod transformer;

pub use editor::TextEditor;
pub use error::{EditError, ImportError, TransformError};
pub use export::{EXPORT_POLYFILL, ExportPlan};
pub use import::{IMPORT_ALIAS_PREFIX, ImportPlan, ImportPlanner, ImportPlans};
pub use sourcemap::SourceMap;
pub use transformer::{
    IdFilter, InteropRule, SourceFile, TransformOutput, Transformer, clean_url,
};
