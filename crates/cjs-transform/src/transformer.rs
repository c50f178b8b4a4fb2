//! The per-file rewrite pipeline.
//!
//! ```text
//! id ──► eligibility gate ──► parse ──► analyze
//!                                          │
//!            ┌─────────────────────────────┼──────────────────────────┐
//!            ▼                             ▼                          ▼
//!      ImportPlanner                  ExportPlan               DynamicRequire
//!   overwrites + hoist block   polyfill + export statement   overwrites + runtime
//!            └─────────────────────────────┼──────────────────────────┘
//!                                          ▼
//!                                     TextEditor ──► code + source map
//! ```
//!
//! Generated blocks are wrapped in `/* [cjs2esm] <name>-S */` and
//! `/* [cjs2esm] <name>-E */` marker comments.

use std::fmt;
use std::sync::Arc;

use camino::Utf8Path;
use cjs_core::{ImportInterop, ImportStatement, TransformOptions};
use cjs_dynamic::{AliasMap, AliasResolver, DynamicRequire, FileFilter, Resolution};
use cjs_parser::{ParserSet, Tree, analyze};
use rayon::prelude::*;

use crate::editor::TextEditor;
use crate::error::TransformError;
use crate::export::ExportPlan;
use crate::import::ImportPlanner;
use crate::sourcemap::SourceMap;

/// Caller hook deciding eligibility by id: `Some(true)` forces a transform
/// (even under `node_modules`), `Some(false)` skips, `None` defers to the
/// default rules.
pub type IdFilter = Arc<dyn Fn(&str) -> Option<bool> + Send + Sync>;

/// Caller hook choosing the interop rule per file.
pub type InteropRule = Arc<dyn Fn(&Utf8Path) -> ImportInterop + Send + Sync>;

const MARKER: &str = "[cjs2esm]";

/// One input of [`Transformer::transform_batch`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// File identifier, usually an absolute path, possibly with a query.
    pub id: String,

    /// Source text.
    pub code: String,
}

impl SourceFile {
    /// Creates a new source file.
    pub fn new(id: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            code: code.into(),
        }
    }
}

/// The result of rewriting one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformOutput {
    /// Rewritten code.
    pub code: String,

    /// Source map back to the input, when enabled.
    pub map: Option<SourceMap>,
}

/// Rewrites CommonJS files into ES modules.
///
/// A transformer is `Send + Sync`. Its glob cache is shared by every file it
/// processes, sequentially or in parallel.
///
/// # Examples
///
/// ```
/// use cjs_core::TransformOptions;
/// use cjs_transform::Transformer;
///
/// let transformer = Transformer::new(TransformOptions::default())?;
/// let output = transformer
///     .transform("const fs = require('fs');\nconsole.log(fs);\n", "/src/main.js")?
///     .expect("file changed");
/// assert_eq!(output.code, "import * as fs from 'fs';\nconsole.log(fs);\n");
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct Transformer {
    options: TransformOptions,
    dynamic: DynamicRequire,
    id_filter: Option<IdFilter>,
    interop_rule: Option<InteropRule>,
}

impl Transformer {
    /// Creates a transformer, resolving dynamic aliases with
    /// `options.aliases`.
    ///
    /// # Errors
    ///
    /// Returns the first problem [`TransformOptions::validate`] reports.
    pub fn new(options: TransformOptions) -> Result<Self, cjs_core::ConfigError> {
        options.validate()?;
        let aliases = Arc::new(AliasMap::new(options.aliases.clone()));
        let dynamic = DynamicRequire::new(options.dynamic.clone()).with_aliases(aliases);
        Ok(Self {
            options,
            dynamic,
            id_filter: None,
            interop_rule: None,
        })
    }

    /// Sets the id filter hook.
    #[must_use]
    pub fn with_id_filter(mut self, filter: IdFilter) -> Self {
        self.id_filter = Some(filter);
        self
    }

    /// Sets the per-file interop rule, overriding `options.import_interop`.
    #[must_use]
    pub fn with_interop_rule(mut self, rule: InteropRule) -> Self {
        self.interop_rule = Some(rule);
        self
    }

    /// Sets the dynamic-require file filter hook.
    #[must_use]
    pub fn with_file_filter(mut self, filter: FileFilter) -> Self {
        self.dynamic = self.dynamic.with_file_filter(filter);
        self
    }

    /// Replaces the alias resolver built from `options.aliases`.
    #[must_use]
    pub fn with_alias_resolver(mut self, resolver: Arc<dyn AliasResolver>) -> Self {
        self.dynamic = self.dynamic.with_aliases(resolver);
        self
    }

    /// The options this transformer was created with.
    #[inline]
    pub fn options(&self) -> &TransformOptions {
        &self.options
    }

    /// Forgets all cached glob results.
    pub fn clear_cache(&self) {
        if let Some(cache) = self.dynamic.cache() {
            cache.clear();
        }
    }

    /// Returns `true` if `id` passes the extension gate, the id filter and
    /// the `node_modules` rule.
    pub fn is_eligible(&self, id: &str) -> bool {
        let path = clean_url(id);
        let accepted = Utf8Path::new(path)
            .extension()
            .is_some_and(|ext| self.options.accepts_extension(&format!(".{ext}")));
        if !accepted {
            return false;
        }

        match self.id_filter.as_ref().and_then(|filter| filter(id)) {
            Some(verdict) => verdict,
            None => !path.contains("node_modules/"),
        }
    }

    /// Rewrites one file.
    ///
    /// Returns `Ok(None)` when the file is skipped, fails to parse, or
    /// contains nothing to rewrite.
    ///
    /// # Errors
    ///
    /// See [`TransformError`].
    pub fn transform(&self, code: &str, id: &str) -> Result<Option<TransformOutput>, TransformError> {
        let mut parsers = ParserSet::new()?;
        self.transform_with(&mut parsers, code, id)
    }

    /// Rewrites many files in parallel, one parser set per worker thread.
    ///
    /// Results are returned in input order, paired with each file's id.
    pub fn transform_batch(
        &self,
        files: &[SourceFile],
    ) -> Vec<(String, Result<Option<TransformOutput>, TransformError>)> {
        let results: Vec<_> = files
            .par_iter()
            .map_init(ParserSet::new, |parsers, file| {
                let result = match parsers {
                    Ok(parsers) => self.transform_with(parsers, &file.code, &file.id),
                    Err(err) => Err(err.clone().into()),
                };
                (file.id.clone(), result)
            })
            .collect();

        let changed = results
            .iter()
            .filter(|(_, result)| matches!(result, Ok(Some(_))))
            .count();
        let failed = results.iter().filter(|(_, result)| result.is_err()).count();
        tracing::info!(files = files.len(), changed, failed, "batch transform finished");

        results
    }

    /// Rewrites one file on tokio's blocking pool.
    ///
    /// # Errors
    ///
    /// See [`TransformError`]; a panicking transform surfaces as
    /// [`TransformError::Join`].
    pub async fn transform_async(
        self: Arc<Self>,
        code: String,
        id: String,
    ) -> Result<Option<TransformOutput>, TransformError> {
        tokio::task::spawn_blocking(move || self.transform(&code, &id)).await?
    }

    /// Rewrites one file with caller-provided parsers.
    ///
    /// # Errors
    ///
    /// See [`TransformError`].
    pub fn transform_with(
        &self,
        parsers: &mut ParserSet,
        code: &str,
        id: &str,
    ) -> Result<Option<TransformOutput>, TransformError> {
        if !self.is_eligible(id) {
            tracing::debug!(id = %id, "skipped: not eligible");
            return Ok(None);
        }
        if !mentions_commonjs(code) {
            return Ok(None);
        }

        let path = clean_url(id);
        let tree = match parsers.parse(code, path) {
            Ok(tree) => tree,
            Err(err) if err.is_syntax() => {
                tracing::debug!(id = %id, error = %err, "skipped: does not parse");
                return Ok(None);
            }
            Err(err) => return Err(err.into()),
        };

        let analysis = analyze(&tree, code);
        if analysis.is_empty() {
            return Ok(None);
        }

        let importer = Utf8Path::new(path);
        let interop = match &self.interop_rule {
            Some(rule) => rule(importer),
            None => self.options.import_interop.clone(),
        };

        let mut editor = TextEditor::new(code);
        if let Some(offset) = hashbang_end(&tree, code) {
            editor.set_prepend_offset(offset)?;
        }
        let mut appender = Appender::new(code);

        let imports = ImportPlanner::new(code, &interop)
            .plan(&analysis.requires)
            .map_err(|err| TransformError::import(id, err))?;
        for plan in &imports.plans {
            editor.overwrite_span(plan.span, &plan.replacement)?;
        }
        if !imports.hoisted.is_empty() {
            editor.prepend(inline_block("import-hoist", &imports.hoisted));
        }

        if id.contains("node_modules/.vite") {
            tracing::debug!(id = %id, "pre-bundled file: no export runtime");
        } else if let Some(exports) = ExportPlan::plan(&analysis.exports) {
            editor.prepend(format!(
                "/* {MARKER} export-runtime-S */ {} /* {MARKER} export-runtime-E */ ",
                exports.polyfill
            ));

            let mut lines = vec![format!("/* {MARKER} export-statement-S */")];
            lines.extend(exports.declarations);
            lines.push(exports.statement);
            lines.push(format!("/* {MARKER} export-statement-E */"));
            appender.push(&mut editor, &lines.join("\n"));
        }

        if let Some(runtime) = self
            .dynamic
            .generate_runtime(&analysis.requires, code, importer)
        {
            for record in &runtime.records {
                match &record.resolution {
                    Resolution::Normal { namespace } => {
                        editor.overwrite_span(record.call, &interop.render(namespace))?;
                    }
                    Resolution::Dispatch { function } => {
                        editor.overwrite_span(record.callee, function)?;
                    }
                }
            }
            editor.prepend(inline_block("import-require2import", &runtime.imports));
            if !runtime.functions.is_empty() {
                let functions: Vec<String> =
                    runtime.functions.iter().map(ToString::to_string).collect();
                appender.push(&mut editor, &functions.join("\n"));
            }
        }

        if !editor.has_changed() {
            return Ok(None);
        }

        let map = self.options.source_map.then(|| editor.generate_map(path));
        tracing::debug!(
            id = %id,
            requires = analysis.requires.len(),
            exports = analysis.exports.len(),
            "transformed"
        );
        Ok(Some(TransformOutput {
            code: editor.to_string(),
            map,
        }))
    }
}

impl fmt::Debug for Transformer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transformer")
            .field("options", &self.options)
            .field("dynamic", &self.dynamic)
            .field("id_filter", &self.id_filter.is_some())
            .field("interop_rule", &self.interop_rule.is_some())
            .finish()
    }
}

/// Appends blocks on their own lines after the module body.
struct Appender {
    at_line_start: bool,
}

impl Appender {
    fn new(code: &str) -> Self {
        Self {
            at_line_start: code.is_empty() || code.ends_with('\n'),
        }
    }

    fn push(&mut self, editor: &mut TextEditor<'_>, block: &str) {
        let separator = if self.at_line_start { "" } else { "\n" };
        editor.append(format!("{separator}{block}\n"));
        self.at_line_start = true;
    }
}

/// Joins import statements into one marked, single-line prefix.
fn inline_block(name: &str, imports: &[ImportStatement]) -> String {
    let mut block = format!("/* {MARKER} {name}-S */");
    for import in imports {
        block.push(' ');
        block.push_str(&import.to_string());
    }
    block.push_str(&format!(" /* {MARKER} {name}-E */ "));
    block
}

/// Offset just past a leading `#!` line and its newline.
fn hashbang_end(tree: &Tree, code: &str) -> Option<usize> {
    let first = tree.root_node().child(0)?;
    if first.kind() != "hash_bang_line" {
        return None;
    }
    let end = first.end_byte();
    let newline = code.get(end..).and_then(|rest| rest.find('\n'));
    Some(newline.map_or(code.len(), |i| end + i + 1))
}

/// Strips a `?query` or `#hash` suffix from an id.
pub fn clean_url(id: &str) -> &str {
    id.split(['?', '#']).next().unwrap_or(id)
}

fn mentions_commonjs(code: &str) -> bool {
    code.contains("require") || code.contains("module") || code.contains("exports")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transformer() -> Transformer {
        Transformer::new(TransformOptions::default()).expect("valid options")
    }

    #[test]
    fn test_clean_url() {
        assert_eq!(clean_url("/a/b.js?v=123"), "/a/b.js");
        assert_eq!(clean_url("/a/b.js#top"), "/a/b.js");
        assert_eq!(clean_url("/a/b.js"), "/a/b.js");
    }

    #[test]
    fn test_eligibility_by_extension() {
        let t = transformer();
        assert!(t.is_eligible("/src/a.js"));
        assert!(t.is_eligible("/src/a.ts?import"));
        assert!(!t.is_eligible("/src/a.json"));
        assert!(!t.is_eligible("/src/Makefile"));
    }

    #[test]
    fn test_node_modules_needs_explicit_filter() {
        assert!(!transformer().is_eligible("/p/node_modules/x/index.js"));

        let forced = transformer().with_id_filter(Arc::new(|id: &str| {
            id.contains("node_modules/x/").then_some(true)
        }));
        assert!(forced.is_eligible("/p/node_modules/x/index.js"));
        assert!(!forced.is_eligible("/p/node_modules/y/index.js"));

        let denied = transformer().with_id_filter(Arc::new(|_: &str| Some(false)));
        assert!(!denied.is_eligible("/src/a.js"));
    }

    #[test]
    fn test_inline_block_format() {
        let imports = [ImportStatement::new(
            cjs_core::ImportClause::Namespace("a".to_owned()),
            "'a'",
        )];
        assert_eq!(
            inline_block("import-hoist", &imports),
            "/* [cjs2esm] import-hoist-S */ import * as a from 'a'; /* [cjs2esm] import-hoist-E */ "
        );
    }

    #[test]
    fn test_appender_separates_from_body() {
        let code = "x";
        let mut editor = TextEditor::new(code);
        let mut appender = Appender::new(code);
        appender.push(&mut editor, "a");
        appender.push(&mut editor, "b");
        assert_eq!(editor.to_string(), "x\na\nb\n");
    }

    #[test]
    fn test_hashbang_end() {
        let mut parsers = ParserSet::new().expect("Parser creation failed");
        let code = "#!/usr/bin/env node\nrequire('a');\n";
        let tree = parsers.parse(code, "/src/a.js").expect("Parse failed");
        assert_eq!(hashbang_end(&tree, code), Some(20));

        let tree = parsers.parse("require('a');\n", "/src/a.js").expect("Parse failed");
        assert_eq!(hashbang_end(&tree, "require('a');\n"), None);
    }

    #[test]
    fn test_syntax_error_passes_through() {
        let output = transformer()
            .transform("const a = require('a'\nlet = ;", "/src/a.js")
            .expect("no hard error");
        assert!(output.is_none());
    }

    #[test]
    fn test_debug_hides_hooks() {
        let debug = format!("{:?}", transformer());
        assert!(debug.contains("id_filter: false"));
    }
}
