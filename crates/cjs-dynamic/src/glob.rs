//! Turning `require` argument expressions into glob patterns.
//!
//! The glob dialect is the one [`globset`] understands with
//! `backslash_escape(true)`: literal text coming from string literals has its
//! meta characters backslash-escaped, and everything that cannot be known
//! statically becomes `*`.
//!
//! | Expression | Glob |
//! |------------|------|
//! | `'./a/' + name` | `./a/*` |
//! | `` `./a/${x}.js` `` | `./a/*.js` |
//! | `'./a/'.concat(x, '.js')` | `./a/*.js` |
//! | `('./a')` | `./a` |

use cjs_parser::{Node, NodeExt, cook};

const META: &[char] = &['*', '?', '[', ']', '{', '}', '\\'];

/// Converts an argument expression into a glob.
///
/// # Examples
///
/// ```
/// use cjs_dynamic::expression_to_glob;
/// use cjs_parser::JsParser;
///
/// let source = "require('./locale/' + lang + '.json');";
/// let tree = JsParser::tsx()?.parse(source)?;
/// let call = tree.root_node().named_child(0).and_then(|s| s.named_child(0)).unwrap();
/// let arg = call.child_by_field_name("arguments").and_then(|a| a.named_child(0)).unwrap();
///
/// assert_eq!(expression_to_glob(arg, source), "./locale/*.json");
/// # Ok::<(), cjs_parser::ParseError>(())
/// ```
pub fn expression_to_glob(node: Node<'_>, source: &str) -> String {
    let mut glob = String::new();
    push_expression(node, source, &mut glob);
    collapse_stars(&glob)
}

fn push_expression(node: Node<'_>, source: &str, out: &mut String) {
    match node.kind() {
        "string" => {
            let text = node.text(source);
            let inner = text.get(1..text.len().saturating_sub(1)).unwrap_or_default();
            out.push_str(&escape(&cook(inner)));
        }
        "template_string" => push_template(node, source, out),
        "binary_expression"
            if node
                .child_by_field_name("operator")
                .is_some_and(|op| op.kind() == "+") =>
        {
            match (
                node.child_by_field_name("left"),
                node.child_by_field_name("right"),
            ) {
                (Some(left), Some(right)) => {
                    push_expression(left, source, out);
                    push_expression(right, source, out);
                }
                _ => out.push('*'),
            }
        }
        "parenthesized_expression" => match node.significant_children().first() {
            Some(inner) => push_expression(*inner, source, out),
            None => out.push('*'),
        },
        "call_expression" if is_string_concat(node, source) => {
            if let Some(object) = node
                .child_by_field_name("function")
                .and_then(|callee| callee.child_by_field_name("object"))
            {
                push_expression(object, source, out);
            }
            if let Some(args) = node.child_by_field_name("arguments") {
                for arg in args.significant_children() {
                    push_expression(arg, source, out);
                }
            }
        }
        _ => out.push('*'),
    }
}

fn push_template(node: Node<'_>, source: &str, out: &mut String) {
    // Quasis are the text between the backticks and the substitutions.
    let mut pos = node.start_byte() + 1;
    let end = node.end_byte().saturating_sub(1);
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        if child.kind() != "template_substitution" {
            continue;
        }
        out.push_str(&escape(&cook(source.get(pos..child.start_byte()).unwrap_or_default())));
        out.push('*');
        pos = child.end_byte();
    }
    out.push_str(&escape(&cook(source.get(pos..end).unwrap_or_default())));
}

/// `'literal'.concat(...)` or `` `literal`.concat(...) ``.
fn is_string_concat(call: Node<'_>, source: &str) -> bool {
    let Some(callee) = call.child_by_field_name("function") else {
        return false;
    };
    callee.kind() == "member_expression"
        && callee.child_by_field_name("optional_chain").is_none()
        && callee
            .child_by_field_name("property")
            .is_some_and(|p| p.text(source) == "concat")
        && callee
            .child_by_field_name("object")
            .is_some_and(|o| matches!(o.kind(), "string" | "template_string"))
        && call
            .child_by_field_name("arguments")
            .is_some_and(|a| a.kind() == "arguments")
}

/// Backslash-escapes glob meta characters.
///
/// # Examples
///
/// ```
/// use cjs_dynamic::glob::escape;
///
/// assert_eq!(escape("a[1]*.js"), r"a\[1\]\*.js");
/// ```
#[must_use]
pub fn escape(literal: &str) -> String {
    let mut out = String::with_capacity(literal.len());
    for ch in literal.chars() {
        if META.contains(&ch) {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

/// Removes backslash escapes, giving back the literal text.
#[must_use]
pub fn unescape(glob: &str) -> String {
    let mut out = String::with_capacity(glob.len());
    let mut chars = glob.chars();
    while let Some(ch) = chars.next() {
        if ch == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
            }
        } else {
            out.push(ch);
        }
    }
    out
}

/// Byte offsets of unescaped meta characters in `glob`.
fn meta_positions(glob: &str) -> impl Iterator<Item = (usize, char)> + '_ {
    let mut escaped = false;
    glob.char_indices().filter(move |(_, ch)| {
        if escaped {
            escaped = false;
            return false;
        }
        if *ch == '\\' {
            escaped = true;
            return false;
        }
        META.contains(ch)
    })
}

/// Returns `true` if `glob` contains an unescaped wildcard or class.
#[must_use]
pub fn has_wildcard(glob: &str) -> bool {
    meta_positions(glob).next().is_some()
}

/// Collapses runs of unescaped `*` into one, so no `**` survives.
#[must_use]
pub fn collapse_stars(glob: &str) -> String {
    let mut out = String::with_capacity(glob.len());
    let mut escaped = false;
    let mut last_star = false;
    for ch in glob.chars() {
        if escaped {
            escaped = false;
            last_star = false;
            out.push(ch);
            continue;
        }
        match ch {
            '\\' => {
                escaped = true;
                last_star = false;
            }
            '*' if last_star => continue,
            '*' => last_star = true,
            _ => last_star = false,
        }
        out.push(ch);
    }
    out
}

/// The one-directory-deeper variant used in loose mode.
///
/// Inserts `/*` after the last wildcard, so `./a/*.js` also reaches
/// `./a/b/c.js`. Returns `None` when the text after the last wildcard
/// already crosses a directory boundary.
///
/// # Examples
///
/// ```
/// use cjs_dynamic::glob::loose_variant;
///
/// assert_eq!(loose_variant("./a/*.js").as_deref(), Some("./a/*/*.js"));
/// assert_eq!(loose_variant("./a/*/index.js"), None);
/// ```
#[must_use]
pub fn loose_variant(glob: &str) -> Option<String> {
    let (index, _) = meta_positions(glob).filter(|(_, ch)| *ch == '*').last()?;
    let tail = &glob[index + 1..];
    if tail.contains('/') {
        return None;
    }
    Some(format!("{}/*{tail}", &glob[..=index]))
}

/// Completes a glob whose last segment has no extension with `extensions`.
///
/// # Examples
///
/// ```
/// use cjs_dynamic::glob::with_extensions;
///
/// let exts = [".js".to_owned(), ".ts".to_owned()];
/// assert_eq!(with_extensions("./a/*", &exts), "./a/*.{js,ts}");
/// assert_eq!(with_extensions("./a/*.vue", &exts), "./a/*.vue");
/// ```
#[must_use]
pub fn with_extensions(glob: &str, extensions: &[String]) -> String {
    let last = glob.rsplit('/').next().unwrap_or(glob);
    let has_extension = last.char_indices().any(|(i, ch)| ch == '.' && i > 0);
    if has_extension || extensions.is_empty() {
        return glob.to_owned();
    }
    let list: Vec<String> = extensions
        .iter()
        .map(|e| escape(e.trim_start_matches('.')))
        .collect();
    if let [single] = list.as_slice() {
        return format!("{glob}.{single}");
    }
    format!("{glob}.{{{}}}", list.join(","))
}

/// Splits a glob into its literal directory prefix and the pattern below it.
///
/// The prefix is unescaped and ready to join onto a filesystem path. The
/// rest always keeps at least one segment.
///
/// # Examples
///
/// ```
/// use cjs_dynamic::glob::split_static_prefix;
///
/// assert_eq!(
///     split_static_prefix("../a/b/*/c.js"),
///     ("../a/b".to_owned(), "*/c.js".to_owned())
/// );
/// ```
#[must_use]
pub fn split_static_prefix(glob: &str) -> (String, String) {
    let segments: Vec<&str> = glob.split('/').collect();
    let static_count = segments
        .iter()
        .take_while(|segment| !has_wildcard(segment))
        .count()
        .min(segments.len().saturating_sub(1));

    let prefix = segments[..static_count]
        .iter()
        .map(|segment| unescape(segment))
        .collect::<Vec<_>>()
        .join("/");
    let rest = segments[static_count..].join("/");
    (prefix, rest)
}

/// Returns `true` for requests resolved relative to the importer.
#[inline]
#[must_use]
pub fn is_relative(request: &str) -> bool {
    request.starts_with("./") || request.starts_with("../")
}

#[cfg(test)]
mod tests {
    use cjs_parser::JsParser;

    use super::*;

    fn glob_of(expr: &str) -> String {
        let source = format!("require({expr});");
        let tree = JsParser::tsx()
            .expect("Parser creation failed")
            .parse(&source)
            .expect("Parse failed");
        let call = tree
            .root_node()
            .named_child(0)
            .and_then(|s| s.named_child(0))
            .expect("call");
        let arg = call
            .child_by_field_name("arguments")
            .and_then(|a| a.named_child(0))
            .expect("argument");
        expression_to_glob(arg, &source)
    }

    #[test]
    fn test_template_substitutions() {
        assert_eq!(glob_of("`./plugins/${name}`"), "./plugins/*");
        assert_eq!(glob_of("`./${a}/${b}.js`"), "./*/*.js");
        assert_eq!(glob_of("`./${a}${b}`"), "./*");
    }

    #[test]
    fn test_concatenation_forms() {
        assert_eq!(glob_of("'./a/' + x + '.js'"), "./a/*.js");
        assert_eq!(glob_of("('./a/' + (x))"), "./a/*");
        assert_eq!(glob_of("'./a/'.concat(x, '.js')"), "./a/*.js");
        assert_eq!(glob_of("x.concat('.js')"), "*");
    }

    #[test]
    fn test_literal_meta_is_escaped() {
        assert_eq!(glob_of("'./[id]/' + x"), r"./\[id\]/*");
        assert!(has_wildcard(&glob_of("'./[id]/' + x")));
        assert!(!has_wildcard(&glob_of("'./[id]/' + 'x.js'")));
    }

    #[test]
    fn test_no_wildcard_for_pure_literals() {
        let glob = glob_of("'./a' + '.js'");
        assert_eq!(glob, "./a.js");
        assert!(!has_wildcard(&glob));
        assert_eq!(unescape(&glob_of("'./{x}' + '.js'")), "./{x}.js");
    }

    #[test]
    fn test_collapse_keeps_escaped_star() {
        assert_eq!(collapse_stars("a/***/b"), "a/*/b");
        assert_eq!(collapse_stars(r"a\**"), r"a\**");
    }

    #[test]
    fn test_loose_variant_ignores_escaped_star() {
        assert_eq!(loose_variant(r"./\*"), None);
        assert_eq!(loose_variant("./*").as_deref(), Some("./*/*"));
    }

    #[test]
    fn test_with_extensions_single() {
        assert_eq!(with_extensions("./*", &[".json".to_owned()]), "./*.json");
        assert_eq!(with_extensions("./.*", &[".js".to_owned()]), "./.*.js");
    }

    #[test]
    fn test_split_static_prefix() {
        assert_eq!(
            split_static_prefix("./*.js"),
            (".".to_owned(), "*.js".to_owned())
        );
        assert_eq!(
            split_static_prefix(r"./\[x\]/*"),
            ("./[x]".to_owned(), "*".to_owned())
        );
    }

    #[test]
    fn test_is_relative() {
        assert!(is_relative("./a"));
        assert!(is_relative("../a"));
        assert!(!is_relative("a/b"));
        assert!(!is_relative("/abs"));
        assert!(!is_relative("@/x"));
    }
}
