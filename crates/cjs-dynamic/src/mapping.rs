//! Mapping matched files to the request strings that reach them.

use cjs_core::FxHashSet;

use crate::alias::ResolvedAlias;

/// Every request string that `require` could be called with to reach `file`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestMapping {
    /// The importer-relative file path, e.g. `./plugins/a.js`.
    pub file: String,

    /// Request strings in emission order, without duplicates.
    pub requests: Vec<String>,
}

/// Builds a [`RequestMapping`] per file.
///
/// For `./dir/index.js` the requests are `./dir/index.js`, `./dir/index`
/// and `./dir`. With an alias, each request under the alias target is also
/// listed in alias form.
///
/// # Examples
///
/// ```
/// use cjs_dynamic::mapping::map_requests;
///
/// let maps = map_requests(&["./plugins/index.js".to_owned()], None);
/// assert_eq!(maps[0].requests, ["./plugins/index.js", "./plugins/index", "./plugins"]);
/// ```
#[must_use]
pub fn map_requests(files: &[String], alias: Option<&ResolvedAlias>) -> Vec<RequestMapping> {
    files
        .iter()
        .map(|file| {
            let mut seen = FxHashSet::default();
            let mut requests = Vec::new();
            let mut push = |request: String| {
                if seen.insert(request.clone()) {
                    requests.push(request);
                }
            };

            let relative = relative_forms(file);
            if let Some(alias) = alias {
                for request in &relative {
                    push(request.clone());
                    if let Some(aliased) = alias.to_alias_form(request) {
                        push(aliased);
                    }
                }
            } else {
                relative.into_iter().for_each(&mut push);
            }

            RequestMapping {
                file: file.clone(),
                requests,
            }
        })
        .collect()
}

fn relative_forms(file: &str) -> Vec<String> {
    let (dir, name) = file.rsplit_once('/').unwrap_or((".", file));
    let stem = match name.rfind('.') {
        Some(dot) if dot > 0 => &name[..dot],
        _ => name,
    };

    let mut forms = vec![file.to_owned()];
    if stem != name {
        forms.push(format!("{dir}/{stem}"));
    }
    if stem == "index" {
        forms.push(dir.to_owned());
    }
    forms
}
