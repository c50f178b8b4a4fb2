//! Generated runtime code for dynamic `require` calls.

use std::fmt;

use cjs_core::quote_js_string;

/// One `case` group of a dispatch function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchCase {
    /// Request strings that select this case.
    pub requests: Vec<String>,

    /// Namespace binding returned for them.
    pub namespace: String,
}

/// A `switch`-based function standing in for `require` at one call site.
///
/// # Examples
///
/// ```
/// use cjs_dynamic::{DispatchCase, DispatchFunction};
///
/// let function = DispatchFunction {
///     name: "__matchRequireRuntime0__".to_owned(),
///     cases: vec![DispatchCase {
///         requests: vec!["./a.js".to_owned(), "./a".to_owned()],
///         namespace: "__dynamic_require2import__0__".to_owned(),
///     }],
/// };
/// assert_eq!(
///     function.to_string(),
///     "function __matchRequireRuntime0__(path) {\n  switch(path) {\n    case './a.js':\n    case './a':\n      return __dynamic_require2import__0__;\n    default: throw new Error(\"Cannot find module: \" + path);\n  }\n}"
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchFunction {
    /// The function's name.
    pub name: String,

    /// Cases in emission order.
    pub cases: Vec<DispatchCase>,
}

impl fmt::Display for DispatchFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "function {}(path) {{", self.name)?;
        writeln!(f, "  switch(path) {{")?;
        for case in &self.cases {
            for request in &case.requests {
                writeln!(f, "    case {}:", quote_js_string(request))?;
            }
            writeln!(f, "      return {};", case.namespace)?;
        }
        writeln!(
            f,
            "    default: throw new Error(\"Cannot find module: \" + path);"
        )?;
        writeln!(f, "  }}")?;
        write!(f, "}}")
    }
}
