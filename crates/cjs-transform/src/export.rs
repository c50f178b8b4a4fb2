//! Export runtime generation.
//!
//! CommonJS assignments are left where they are. A small polyfill gives
//! them a `module`/`exports` pair to write into, and the appended export
//! statement reads each member back off `module.exports` once the module
//! body has run.

use cjs_core::FxHashSet;
use cjs_parser::ExportOccurrence;

/// The polyfill prepended to files that assign exports.
pub const EXPORT_POLYFILL: &str = "var module = { exports: {} }; var exports = module.exports;";

/// The export runtime of one file.
///
/// # Examples
///
/// ```
/// use cjs_parser::{JsParser, analyze};
/// use cjs_transform::ExportPlan;
///
/// let source = "module.exports.a = 1;\nmodule.exports = { b: 2 };\nexports.a = 3;";
/// let tree = JsParser::tsx()?.parse(source)?;
/// let analysis = analyze(&tree, source);
///
/// let plan = ExportPlan::plan(&analysis.exports).expect("exports present");
/// assert_eq!(plan.members, ["a", "default"]);
/// assert_eq!(
///     plan.statement,
///     "export {\n  __CJS__export_a__ as a,\n  __CJS__export_default__ as default,\n}"
/// );
/// # Ok::<(), cjs_parser::ParseError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportPlan {
    /// Exported names in first-seen order.
    pub members: Vec<String>,

    /// Code giving the module body its `module` and `exports` bindings.
    pub polyfill: String,

    /// One `const` per member reading it off `module.exports`.
    pub declarations: Vec<String>,

    /// The aggregate `export { .. }` statement.
    pub statement: String,
}

impl ExportPlan {
    /// Builds the export runtime, or `None` without export occurrences.
    ///
    /// A file whose only occurrences are `module.<other>` assignments still
    /// gets the polyfill, with an empty export list.
    pub fn plan(occurrences: &[ExportOccurrence<'_>]) -> Option<Self> {
        if occurrences.is_empty() {
            return None;
        }

        let mut seen = FxHashSet::default();
        let members: Vec<String> = occurrences
            .iter()
            .filter_map(ExportOccurrence::member)
            .filter(|member| seen.insert(*member))
            .map(str::to_owned)
            .collect();

        let declarations = members
            .iter()
            .map(|member| {
                let read = if member == "default" {
                    "(module.exports ?? {}).default || module.exports".to_owned()
                } else {
                    format!("(module.exports ?? {{}}).{member}")
                };
                format!("const {} = {read};", binding(member))
            })
            .collect();

        let mut statement = String::from("export {\n");
        for member in &members {
            statement.push_str(&format!("  {} as {member},\n", binding(member)));
        }
        statement.push('}');

        Some(Self {
            members,
            polyfill: EXPORT_POLYFILL.to_owned(),
            declarations,
            statement,
        })
    }
}

fn binding(member: &str) -> String {
    format!("__CJS__export_{member}__")
}
