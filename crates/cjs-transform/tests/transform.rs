//! End-to-end tests for the rewrite pipeline.

use std::fs;
use std::sync::Arc;

use camino::{Utf8Path, Utf8PathBuf};
use cjs_core::{AliasEntry, ImportInterop, TransformOptions};
use cjs_transform::{SourceFile, TransformError, TransformOutput, Transformer};
use tempfile::TempDir;

fn transformer() -> Transformer {
    Transformer::new(TransformOptions::default()).expect("valid options")
}

fn rewrite(code: &str) -> String {
    transformer()
        .transform(code, "/project/src/main.js")
        .expect("transform")
        .expect("file changed")
        .code
}

/// A project directory laid out on disk for dynamic `require` tests.
struct Project {
    dir: TempDir,
}

impl Project {
    fn new(files: &[&str]) -> Self {
        let dir = TempDir::new().expect("Failed to create temp dir");
        for file in files {
            let path = dir.path().join(file);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).expect("Failed to create dir");
            }
            fs::write(&path, "module.exports = 1;\n").expect("Failed to write file");
        }
        Self { dir }
    }

    fn root(&self) -> Utf8PathBuf {
        Utf8PathBuf::from_path_buf(self.dir.path().to_path_buf()).expect("UTF-8 temp dir")
    }

    fn id(&self, file: &str) -> String {
        self.root().join(file).to_string()
    }
}

#[test]
fn test_plain_module_is_untouched() {
    let output = transformer()
        .transform("const a = 1;\nconsole.log(a);\n", "/project/src/main.js")
        .expect("transform");
    assert!(output.is_none());
}

#[test]
fn test_commonjs_words_in_comments_only() {
    let output = transformer()
        .transform("// this module has no exports\nlet a = 1;\n", "/project/src/main.js")
        .expect("transform");
    assert!(output.is_none());
}

#[test]
fn test_namespace_import() {
    let code = rewrite("const fs = require('fs');\nconsole.log(fs);\n");
    assert_eq!(code, "import * as fs from 'fs';\nconsole.log(fs);\n");
    assert!(!code.contains("require("));
}

#[test]
fn test_default_import() {
    let code = rewrite("const def = require('foo').default;\n");
    assert_eq!(code, "import def from 'foo';\n");
}

#[test]
fn test_member_destructure() {
    let code = rewrite("const { a, b: bAlias } = require('foo').bar;\nuse(a, bAlias);\n");
    assert_eq!(
        code,
        "import { bar as __CJS__import__0__ } from 'foo'; const { a, b: bAlias } = __CJS__import__0__;\nuse(a, bAlias);\n"
    );
}

#[test]
fn test_nested_require_is_hoisted() {
    let code = rewrite("if (cond) { const x = require('foo') }\n");
    assert_eq!(code.matches("import * as __CJS__import__0__ from 'foo';").count(), 1);
    assert!(code.contains("const x = (__CJS__import__0__.default ?? __CJS__import__0__)"));
    assert!(code.starts_with("/* [cjs2esm] import-hoist-S */"));
    assert!(!code.contains("require("));
}

#[test]
fn test_untouched_text_is_preserved() {
    let source = "'use strict';\n// keep me\nconst fs = require('fs');\nfunction f() {\n  return fs;\n}\n";
    let code = rewrite(source);
    assert_eq!(
        code,
        "'use strict';\n// keep me\nimport * as fs from 'fs';\nfunction f() {\n  return fs;\n}\n"
    );
}

#[test]
fn test_export_members_in_first_seen_order() {
    let code = rewrite("module.exports.a = 1;\nmodule.exports = { b: 2 };\nexports.a = 3;\n");
    assert!(code.starts_with(
        "/* [cjs2esm] export-runtime-S */ var module = { exports: {} }; var exports = module.exports; /* [cjs2esm] export-runtime-E */ "
    ));
    assert!(code.ends_with(
        "exports.a = 3;\n/* [cjs2esm] export-statement-S */\n\
         const __CJS__export_a__ = (module.exports ?? {}).a;\n\
         const __CJS__export_default__ = (module.exports ?? {}).default || module.exports;\n\
         export {\n  __CJS__export_a__ as a,\n  __CJS__export_default__ as default,\n}\n\
         /* [cjs2esm] export-statement-E */\n"
    ));
    assert_eq!(code.matches(" as a,").count(), 1);
    assert_eq!(code.matches(" as default,").count(), 1);
}

#[test]
fn test_export_block_on_its_own_line() {
    let code = rewrite("exports.x = 1;");
    assert!(code.contains("exports.x = 1;\n/* [cjs2esm] export-statement-S */"));
}

#[test]
fn test_prebundled_files_get_no_export_runtime() {
    let transformer = transformer().with_id_filter(Arc::new(|_: &str| Some(true)));
    let output = transformer
        .transform(
            "const a = require('a');\nexports.b = a;\n",
            "/p/node_modules/.vite/deps/chunk.js",
        )
        .expect("transform")
        .expect("file changed");
    assert!(output.code.starts_with("import * as a from 'a';"));
    assert!(!output.code.contains("export-runtime"));
    assert!(!output.code.contains("export {"));
}

#[test]
fn test_node_modules_skipped_by_default() {
    let output = transformer()
        .transform("const a = require('a');", "/p/node_modules/x/index.js")
        .expect("transform");
    assert!(output.is_none());
}

#[test]
fn test_unconvertible_require_aborts() {
    let err = transformer()
        .transform("const a = 1;\nconst b = require(42);\n", "/project/src/main.js")
        .expect_err("hard error");
    assert!(err.is_source_error());
    let message = err.to_string();
    assert!(message.starts_with("/project/src/main.js: "));
    assert!(message.contains("require(42)"));
    assert!(message.contains("^^^^^^^^^^^"));
    assert!(matches!(err, TransformError::Import { .. }));
}

#[test]
fn test_mixed_file_has_no_overlapping_edits() {
    let source = "\
const fs = require('fs');
const { join } = require('path');
require('./polyfill');
const cfg = require('./config').default;
const { a } = require('./lib').nested;
const lazy = () => require('./lazy');
const again = () => require('./lazy').value;
module.exports = { fs, join, cfg, a, lazy, again };
";
    let code = rewrite(source);
    assert!(code.contains("import * as fs from 'fs';"));
    assert!(code.contains("import { join } from 'path';"));
    assert!(code.contains("import './polyfill';"));
    assert!(code.contains("import cfg from './config';"));
    assert!(code.contains("import { nested as __CJS__import__0__ } from './lib';"));
    assert_eq!(code.matches("from './lazy';").count(), 1);
    assert!(code.contains("(__CJS__import__1__.default ?? __CJS__import__1__).value"));
    assert!(!code.contains("require("));
}

#[test]
fn test_prepend_order() {
    let project = Project::new(&["src/main.js", "src/parts/a.js"]);
    let code = transformer()
        .transform(
            "f(require('x'));\nconst p = require('./parts/' + 'a.js');\nexports.p = p;\n",
            &project.id("src/main.js"),
        )
        .expect("transform")
        .expect("file changed")
        .code;

    let require2import = code.find("import-require2import-S").expect("dynamic block");
    let runtime = code.find("export-runtime-S").expect("export runtime");
    let hoist = code.find("import-hoist-S").expect("hoist block");
    assert!(require2import < runtime && runtime < hoist);
    assert!(code.contains("import * as __require2import__0__ from './parts/a.js';"));
    assert!(code.contains("const p = (__require2import__0__.default ?? __require2import__0__);"));
}

#[test]
fn test_hashbang_stays_on_first_line() {
    let code = rewrite("#!/usr/bin/env node\nconst fs = require('fs');\nmodule.exports = fs;\n");
    assert!(code.starts_with("#!/usr/bin/env node\n/* [cjs2esm] export-runtime-S */ "));
    assert!(code.contains("/* [cjs2esm] export-runtime-E */ import * as fs from 'fs';\n"));
    assert_eq!(code.matches("#!").count(), 1);

    let code = rewrite("#!/usr/bin/env node\nf(require('x'));\n");
    assert!(code.starts_with("#!/usr/bin/env node\n/* [cjs2esm] import-hoist-S */ "));
}

#[test]
fn test_dynamic_template_dispatch() {
    let project = Project::new(&["src/main.js", "src/plugins/x.js", "src/plugins/y.js"]);
    let code = transformer()
        .transform(
            "const plugin = require(`./plugins/${name}`);\n",
            &project.id("src/main.js"),
        )
        .expect("transform")
        .expect("file changed")
        .code;

    assert!(code.contains("import * as __dynamic_require2import__0__ from './plugins/x.js';"));
    assert!(code.contains("import * as __dynamic_require2import__1__ from './plugins/y.js';"));
    assert!(code.contains("const plugin = __matchRequireRuntime0__(`./plugins/${name}`);"));
    assert!(code.contains(
        "    case './plugins/x.js':\n    case './plugins/x':\n      return __dynamic_require2import__0__;"
    ));
    assert!(code.contains("    case './plugins/y':\n      return __dynamic_require2import__1__;"));
    assert!(code.contains("throw new Error(\"Cannot find module: \" + path);"));
    assert!(code.ends_with("}\n"));
}

#[test]
fn test_dynamic_excludes_importer() {
    let project = Project::new(&["src/main.js", "src/other.js"]);
    let code = transformer()
        .transform("const m = require('./' + name);\n", &project.id("src/main.js"))
        .expect("transform")
        .expect("file changed")
        .code;
    assert!(code.contains("case './other.js':"));
    assert!(!code.contains("case './main.js':"));
}

#[test]
fn test_dynamic_without_matches_is_left_alone() {
    let project = Project::new(&["src/main.js"]);
    let output = transformer()
        .transform("const m = require(`./missing/${name}`);\n", &project.id("src/main.js"))
        .expect("transform");
    assert!(output.is_none());
}

#[test]
fn test_file_filter_hook() {
    let project = Project::new(&["src/main.js", "src/plugins/x.js", "src/plugins/y.js"]);
    let transformer = transformer().with_file_filter(Arc::new(
        |files: Vec<String>, _: &Utf8Path| -> Vec<String> {
            files.into_iter().filter(|f| f.ends_with("x.js")).collect()
        },
    ));
    let code = transformer
        .transform("const p = require(`./plugins/${n}`);\n", &project.id("src/main.js"))
        .expect("transform")
        .expect("file changed")
        .code;
    assert!(code.contains("case './plugins/x':"));
    assert!(!code.contains("./plugins/y"));
}

#[test]
fn test_alias_forms_in_dispatch() {
    let project = Project::new(&["src/pages/home.js", "src/plugins/x.js"]);
    let options = TransformOptions {
        aliases: vec![AliasEntry::new("@", project.root().join("src"))],
        ..TransformOptions::default()
    };
    let code = Transformer::new(options)
        .expect("valid options")
        .transform(
            "const p = require(`@/plugins/${n}`);\n",
            &project.id("src/pages/home.js"),
        )
        .expect("transform")
        .expect("file changed")
        .code;
    assert!(code.contains("import * as __dynamic_require2import__0__ from '../plugins/x.js';"));
    assert!(code.contains("case '../plugins/x.js':\n    case '@/plugins/x.js':"));
    assert!(code.contains("case '@/plugins/x':"));
}

#[test]
fn test_interop_rule_hook() {
    let transformer = transformer().with_interop_rule(Arc::new(|path: &Utf8Path| {
        if path.as_str().ends_with(".ts") {
            ImportInterop::NamedFirst
        } else {
            ImportInterop::Merge
        }
    }));
    let output = transformer
        .transform("f(require('x'));\n", "/src/a.js")
        .expect("transform")
        .expect("file changed");
    assert!(output.code.contains("f(Object.assign({}, __CJS__import__0__, __CJS__import__0__.default));"));
}

#[test]
fn test_typescript_grammar_for_ts_files() {
    let output = transformer()
        .transform(
            "const fs = <any>require('fs');\nlet n: number = 1;\n",
            "/src/a.ts",
        )
        .expect("transform")
        .expect("file changed");
    assert!(output.code.contains("import * as __CJS__import__0__ from 'fs';"));
}

#[test]
fn test_source_map_output() {
    let output = transformer()
        .transform("const fs = require('fs');\nfs.x();\n", "/src/a.js?v=1")
        .expect("transform")
        .expect("file changed");
    let map = output.map.expect("source map");
    assert_eq!(map.sources, ["/src/a.js"]);
    assert_eq!(map.mappings, "AAAA;AACA;");
    let json = map.to_json().expect("serialize");
    assert!(json.contains(r#""version":3"#));
}

#[test]
fn test_source_map_disabled() {
    let options = TransformOptions::from_json_str(r#"{ "source_map": false }"#).expect("options");
    let output = Transformer::new(options)
        .expect("valid options")
        .transform("const fs = require('fs');\n", "/src/a.js")
        .expect("transform")
        .expect("file changed");
    assert!(output.map.is_none());
}

#[test]
fn test_batch_keeps_input_order() {
    let files = vec![
        SourceFile::new("/src/a.js", "const a = require('a');\n"),
        SourceFile::new("/src/b.js", "const b = 1;\n"),
        SourceFile::new("/src/c.js", "require(null);\n"),
        SourceFile::new("/src/d.json", "{}"),
    ];
    let results = transformer().transform_batch(&files);

    let ids: Vec<_> = results.iter().map(|(id, _)| id.as_str()).collect();
    assert_eq!(ids, ["/src/a.js", "/src/b.js", "/src/c.js", "/src/d.json"]);
    assert!(matches!(&results[0].1, Ok(Some(TransformOutput { code, .. })) if code == "import * as a from 'a';\n"));
    assert!(matches!(results[1].1, Ok(None)));
    assert!(results[2].1.is_err());
    assert!(matches!(results[3].1, Ok(None)));
}

#[tokio::test]
async fn test_async_transform() {
    let transformer = Arc::new(transformer());
    let output = Arc::clone(&transformer)
        .transform_async("exports.answer = 42;\n".to_owned(), "/src/a.js".to_owned())
        .await
        .expect("transform")
        .expect("file changed");
    assert!(output.code.contains("__CJS__export_answer__ as answer,"));
}
