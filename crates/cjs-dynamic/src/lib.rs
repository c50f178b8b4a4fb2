//! Dynamic `require` resolution for cjs2esm.
//!
//! A `require` whose argument is not a plain literal cannot become a static
//! import directly. This crate expands such arguments into globs, finds the
//! files they can reach, and generates a runtime dispatch function that maps
//! every reachable request string onto a statically imported namespace.
//!
//! # Pipeline
//!
//! ```text
//! argument expression
//!     └── expression_to_glob ──► ./plugins/*
//!         └── AliasResolver ───► (aliased globs become importer-relative)
//!             └── loose variant + extension completion
//!                 └── GlobWalker (GlobCache) ──► ./plugins/a.js, ./plugins/b.js
//!                     └── file filter hook
//!                         └── map_requests ──► DispatchFunction
//! ```
//!
//! A glob without any wildcard (`'./a' + '.js'`) is a "normal" resolution:
//! the literal path is imported and the whole call replaced by the caller.
//!
//! # Example
//!
//! ```no_run
//! use camino::Utf8Path;
//! use cjs_core::DynamicOptions;
//! use cjs_dynamic::DynamicRequire;
//! use cjs_parser::{JsParser, analyze};
//!
//! let source = "const p = require(`./plugins/${name}`);";
//! let tree = JsParser::tsx()?.parse(source)?;
//! let analysis = analyze(&tree, source);
//!
//! let dynamic = DynamicRequire::new(DynamicOptions::default());
//! if let Some(runtime) =
//!     dynamic.generate_runtime(&analysis.requires, source, Utf8Path::new("/project/src/main.js"))
//! {
//!     for function in &runtime.functions {
//!         println!("{function}");
//!     }
//! }
//! # Ok::<(), cjs_parser::ParseError>(())
//! ```
//!
//! # Failure Handling
//!
//! Nothing here fails a transform. Non-relative globs, multi-argument calls
//! without wildcards, glob compile errors and empty matches are logged with
//! `tracing::warn!` and the call is left as written.

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod alias;
pub mod cache;
pub mod error;
pub mod glob;
pub mod mapping;
pub mod runtime;
pub mod walker;

use std::sync::Arc;

use camino::Utf8Path;
use cjs_core::{
    DynamicOptions, FxHashMap, ImportClause, ImportStatement, Span, quote_js_string,
};
use cjs_parser::{NodeExt, RequireOccurrence};

pub use alias::{AliasMap, AliasResolver, ResolvedAlias};
pub use cache::GlobCache;
pub use error::GlobError;
pub use glob::expression_to_glob;
pub use mapping::{RequestMapping, map_requests};
pub use runtime::{DispatchCase, DispatchFunction};
pub use walker::GlobWalker;

/// Caller hook that can drop (or add) matched files: `(files, importer) -> files`.
pub type FileFilter = Arc<dyn Fn(Vec<String>, &Utf8Path) -> Vec<String> + Send + Sync>;

/// How one dynamic call site is rewritten.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// The argument folded to a literal path imported as `namespace`. The
    /// whole call is replaced by an interop expression over it.
    Normal {
        /// The namespace binding.
        namespace: String,
    },

    /// The callee `require` is renamed to the dispatch function `function`.
    Dispatch {
        /// The dispatch function's name.
        function: String,
    },
}

/// A resolved dynamic call site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DynamicRecord {
    /// The whole call expression.
    pub call: Span,

    /// The callee identifier.
    pub callee: Span,

    /// What to do with it.
    pub resolution: Resolution,
}

/// Everything needed to rewrite a file's dynamic `require` calls.
#[derive(Debug, Clone, Default)]
pub struct DynamicRuntime {
    /// One record per resolved call site, in occurrence order.
    pub records: Vec<DynamicRecord>,

    /// Namespace imports the records depend on, each file once.
    pub imports: Vec<ImportStatement>,

    /// Dispatch functions, appended after the module body.
    pub functions: Vec<DispatchFunction>,
}

struct GlobMatch {
    files: Vec<String>,
    alias: Option<ResolvedAlias>,
}

/// Resolves dynamic `require` occurrences into a [`DynamicRuntime`].
///
/// One `DynamicRequire` is shared by all files a transformer processes; its
/// [`GlobCache`] persists across them.
pub struct DynamicRequire {
    options: DynamicOptions,
    aliases: Arc<dyn AliasResolver>,
    cache: Option<GlobCache>,
    file_filter: Option<FileFilter>,
}

impl DynamicRequire {
    /// Creates a resolver with no aliases and no file filter.
    #[must_use]
    pub fn new(options: DynamicOptions) -> Self {
        let cache = options.cache.then(GlobCache::new);
        Self {
            options,
            aliases: Arc::new(AliasMap::default()),
            cache,
            file_filter: None,
        }
    }

    /// Uses `aliases` to resolve aliased globs.
    #[must_use]
    pub fn with_aliases(mut self, aliases: Arc<dyn AliasResolver>) -> Self {
        self.aliases = aliases;
        self
    }

    /// Runs `filter` over every non-empty match list.
    #[must_use]
    pub fn with_file_filter(mut self, filter: FileFilter) -> Self {
        self.file_filter = Some(filter);
        self
    }

    /// The glob cache, when caching is enabled.
    #[inline]
    pub fn cache(&self) -> Option<&GlobCache> {
        self.cache.as_ref()
    }

    /// Resolves the dynamic occurrences among `occurrences`.
    ///
    /// Static occurrences are ignored. Returns `None` when no dynamic call
    /// could be resolved.
    pub fn generate_runtime(
        &self,
        occurrences: &[RequireOccurrence<'_>],
        source: &str,
        importer: &Utf8Path,
    ) -> Option<DynamicRuntime> {
        let mut runtime = DynamicRuntime::default();
        let mut file_namespaces: FxHashMap<String, String> = FxHashMap::default();
        let mut normal_count = 0usize;
        let mut function_count = 0usize;

        for occurrence in occurrences.iter().filter(|o| o.kind.is_dynamic()) {
            let args = occurrence.argument_list();
            let Some(first) = args.first() else {
                continue;
            };
            let Some(callee) = occurrence.call.child_by_field_name("function") else {
                continue;
            };
            let location = occurrence.call.location();
            let glob = expression_to_glob(*first, source);

            if !glob::has_wildcard(&glob) {
                if args.len() != 1 {
                    tracing::warn!(
                        id = %importer,
                        %location,
                        arguments = args.len(),
                        "dynamic require with several arguments left unchanged"
                    );
                    continue;
                }
                let namespace = format!("__require2import__{normal_count}__");
                normal_count += 1;
                runtime.imports.push(ImportStatement::new(
                    ImportClause::Namespace(namespace.clone()),
                    quote_js_string(&glob::unescape(&glob)),
                ));
                runtime.records.push(DynamicRecord {
                    call: occurrence.call.span(),
                    callee: callee.span(),
                    resolution: Resolution::Normal { namespace },
                });
                continue;
            }

            let matched = match self.glob_files(&glob, importer) {
                Ok(Some(matched)) => matched,
                Ok(None) => {
                    tracing::warn!(id = %importer, %location, %glob, "dynamic require glob is not relative");
                    continue;
                }
                Err(err) => {
                    tracing::warn!(id = %importer, %location, %glob, error = %err, "dynamic require glob failed");
                    continue;
                }
            };

            let files = self.filter_files(matched.files, importer);
            if files.is_empty() {
                tracing::warn!(id = %importer, %location, %glob, "dynamic require matched no files");
                continue;
            }

            let mut cases = Vec::new();
            for mapping in map_requests(&files, matched.alias.as_ref()) {
                let namespace = if let Some(namespace) = file_namespaces.get(&mapping.file) {
                    namespace.clone()
                } else {
                    let namespace =
                        format!("__dynamic_require2import__{}__", file_namespaces.len());
                    runtime.imports.push(ImportStatement::new(
                        ImportClause::Namespace(namespace.clone()),
                        quote_js_string(&mapping.file),
                    ));
                    file_namespaces.insert(mapping.file.clone(), namespace.clone());
                    namespace
                };
                cases.push(DispatchCase {
                    requests: mapping.requests,
                    namespace,
                });
            }

            let function = format!("__matchRequireRuntime{function_count}__");
            function_count += 1;
            tracing::debug!(id = %importer, %location, %glob, files = files.len(), %function, "dynamic require resolved");

            runtime.records.push(DynamicRecord {
                call: occurrence.call.span(),
                callee: callee.span(),
                resolution: Resolution::Dispatch {
                    function: function.clone(),
                },
            });
            runtime.functions.push(DispatchFunction {
                name: function,
                cases,
            });
        }

        (!runtime.records.is_empty()).then_some(runtime)
    }

    /// Expands `glob` into importer-relative file paths.
    ///
    /// Returns `Ok(None)` if the glob does not resolve to a relative one.
    fn glob_files(&self, glob: &str, importer: &Utf8Path) -> Result<Option<GlobMatch>, GlobError> {
        let (glob, alias) = match self.aliases.resolve(glob, importer) {
            Some(resolved) => (resolved.glob.clone(), Some(resolved)),
            None => (glob.to_owned(), None),
        };
        if !glob::is_relative(&glob) {
            return Ok(None);
        }

        let mut globs = vec![glob.clone()];
        if self.options.loose {
            globs.extend(glob::loose_variant(&glob));
        }

        // Loose variants only change what follows the last wildcard, but
        // group by prefix anyway so each walk root is visited once.
        let mut groups: Vec<(String, Vec<String>)> = Vec::new();
        for glob in &globs {
            let completed = glob::with_extensions(glob, &self.options.extensions);
            let (prefix, rest) = glob::split_static_prefix(&completed);
            match groups.iter_mut().find(|(p, _)| *p == prefix) {
                Some((_, patterns)) => patterns.push(rest),
                None => groups.push((prefix, vec![rest])),
            }
        }

        let importer_dir = importer.parent().unwrap_or(Utf8Path::new(""));
        let importer_path = alias::normalize(importer);
        let mut files = Vec::new();
        for (prefix, patterns) in &groups {
            let root = alias::normalize(&importer_dir.join(prefix));
            for relative in self.enumerate(&root, patterns)?.iter() {
                let file = format!("{prefix}/{relative}");
                if alias::normalize(&importer_dir.join(&file)) != importer_path {
                    files.push(file);
                }
            }
        }
        files.sort_unstable();
        files.dedup();

        Ok(Some(GlobMatch { files, alias }))
    }

    fn enumerate(&self, root: &Utf8Path, patterns: &[String]) -> Result<Arc<[String]>, GlobError> {
        let walk = || GlobWalker::new(root, patterns)?.collect();
        match &self.cache {
            Some(cache) => cache.get_or_try_insert_with(&GlobCache::key(root, patterns), walk),
            None => walk().map(Arc::from),
        }
    }

    fn filter_files(&self, files: Vec<String>, importer: &Utf8Path) -> Vec<String> {
        match &self.file_filter {
            Some(filter) if !files.is_empty() => filter(files, importer),
            _ => files,
        }
    }
}

impl std::fmt::Debug for DynamicRequire {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DynamicRequire")
            .field("options", &self.options)
            .field("cache", &self.cache)
            .field("file_filter", &self.file_filter.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use camino::Utf8PathBuf;
    use cjs_core::AliasEntry;
    use cjs_parser::{JsParser, analyze};

    use super::*;

    struct Project {
        _dir: tempfile::TempDir,
        root: Utf8PathBuf,
    }

    impl Project {
        fn new(files: &[&str]) -> Self {
            let dir = tempfile::TempDir::new().expect("temp dir");
            let root =
                Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf-8 temp path");
            for file in files {
                let path = root.join(file);
                fs::create_dir_all(path.parent().expect("parent")).expect("create dirs");
                fs::write(path, "module.exports = {};\n").expect("write file");
            }
            Self { _dir: dir, root }
        }

        fn resolve(&self, dynamic: &DynamicRequire, source: &str, importer: &str) -> Option<DynamicRuntime> {
            let tree = JsParser::tsx()
                .expect("Parser creation failed")
                .parse(source)
                .expect("Parse failed");
            let analysis = analyze(&tree, source);
            dynamic.generate_runtime(&analysis.requires, source, &self.root.join(importer))
        }
    }

    #[test]
    fn test_template_dispatch() {
        let project = Project::new(&["src/main.js", "src/plugins/x.js", "src/plugins/y.js"]);
        let dynamic = DynamicRequire::new(DynamicOptions::default());
        let runtime = project
            .resolve(&dynamic, "const p = require(`./plugins/${name}`);", "src/main.js")
            .expect("resolved");

        assert_eq!(runtime.functions.len(), 1);
        let text = runtime.functions[0].to_string();
        assert!(text.contains("case './plugins/x.js':"));
        assert!(text.contains("case './plugins/y':"));
        assert_eq!(
            runtime
                .imports
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>(),
            [
                "import * as __dynamic_require2import__0__ from './plugins/x.js';",
                "import * as __dynamic_require2import__1__ from './plugins/y.js';",
            ]
        );
        assert_eq!(
            runtime.records[0].resolution,
            Resolution::Dispatch {
                function: "__matchRequireRuntime0__".to_owned()
            }
        );
    }

    #[test]
    fn test_loose_mode_reaches_one_level_deeper() {
        let project = Project::new(&["main.js", "a/x.js", "a/nested/index.js"]);
        let source = "require('./a/' + name);";

        let loose = DynamicRequire::new(DynamicOptions::default());
        let runtime = project.resolve(&loose, source, "main.js").expect("resolved");
        let text = runtime.functions[0].to_string();
        assert!(text.contains("case './a/nested':"));

        let strict = DynamicRequire::new(DynamicOptions {
            loose: false,
            ..DynamicOptions::default()
        });
        let runtime = project.resolve(&strict, source, "main.js").expect("resolved");
        assert!(!runtime.functions[0].to_string().contains("nested"));
    }

    #[test]
    fn test_importer_excluded() {
        let project = Project::new(&["main.js", "other.js"]);
        let dynamic = DynamicRequire::new(DynamicOptions::default());
        let runtime = project
            .resolve(&dynamic, "require('./' + name);", "main.js")
            .expect("resolved");
        let text = runtime.functions[0].to_string();
        assert!(text.contains("./other.js"));
        assert!(!text.contains("./main.js"));
    }

    #[test]
    fn test_shared_imports_across_calls() {
        let project = Project::new(&["main.js", "p/a.js"]);
        let dynamic = DynamicRequire::new(DynamicOptions::default());
        let runtime = project
            .resolve(&dynamic, "require(`./p/${a}`); require('./p/' + b);", "main.js")
            .expect("resolved");
        assert_eq!(runtime.functions.len(), 2);
        assert_eq!(runtime.imports.len(), 1);
        assert_eq!(runtime.functions[1].name, "__matchRequireRuntime1__");
    }

    #[test]
    fn test_normal_resolution() {
        let project = Project::new(&["main.js"]);
        let dynamic = DynamicRequire::new(DynamicOptions::default());
        let source = "const a = require('./a' + '.js');";
        let runtime = project.resolve(&dynamic, source, "main.js").expect("resolved");

        assert!(runtime.functions.is_empty());
        assert_eq!(
            runtime.imports[0].to_string(),
            "import * as __require2import__0__ from './a.js';"
        );
        assert_eq!(runtime.records[0].call, Span::new(10, 32));
    }

    #[test]
    fn test_unresolvable_calls_skipped() {
        let project = Project::new(&["main.js"]);
        let dynamic = DynamicRequire::new(DynamicOptions::default());
        let source = "require(name); require('./none/' + x); require('./a' + '.js', 1); require('x');";
        assert!(project.resolve(&dynamic, source, "main.js").is_none());
    }

    #[test]
    fn test_alias_forms_and_file_filter() {
        let project = Project::new(&["src/main.js", "src/mods/a.cjs", "src/mods/types.d.ts"]);
        let aliases = AliasMap::new(vec![AliasEntry::new("@", project.root.join("src"))]);
        let filter: FileFilter = Arc::new(|files: Vec<String>, _: &Utf8Path| -> Vec<String> {
            files.into_iter().filter(|f| !f.ends_with(".d.ts")).collect()
        });
        let dynamic = DynamicRequire::new(DynamicOptions::default())
            .with_aliases(Arc::new(aliases))
            .with_file_filter(filter);

        let runtime = project
            .resolve(&dynamic, "require(`@/mods/${name}`);", "src/main.js")
            .expect("resolved");
        let text = runtime.functions[0].to_string();
        assert!(text.contains("case '@/mods/a.cjs':"));
        assert!(text.contains("case './mods/a':"));
        assert!(!text.contains("types"));
    }

    #[test]
    fn test_cache_is_populated() {
        let project = Project::new(&["main.js", "p/a.js"]);
        let dynamic = DynamicRequire::new(DynamicOptions::default());
        assert!(project.resolve(&dynamic, "require(`./p/${a}`);", "main.js").is_some());
        assert_eq!(dynamic.cache().map(GlobCache::len), Some(1));

        let uncached = DynamicRequire::new(DynamicOptions {
            cache: false,
            ..DynamicOptions::default()
        });
        assert!(uncached.cache().is_none());
    }
}
