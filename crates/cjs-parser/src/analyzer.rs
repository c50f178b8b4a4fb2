//! CommonJS occurrence analysis.
//!
//! [`analyze`] makes one [`walk`] over a tree and records two kinds of
//! occurrence:
//!
//! | Occurrence | Shape | Recorded as |
//! |------------|-------|-------------|
//! | require | `require(<args>)` with callee identifier `require` | [`RequireOccurrence`] |
//! | export | `module.x = ..`, `exports.x = ..`, `module.exports.x = ..` | [`ExportOccurrence`] |
//!
//! Nothing is rewritten here. Occurrences keep the tree's nodes so planners
//! can inspect the surrounding syntax.

use cjs_core::quote_js_string;
use tree_sitter::{Node, Tree};

use crate::node::NodeExt;
use crate::walker::{Visit, walk};

/// A statically known module specifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Specifier {
    /// The cooked string value, escapes resolved.
    pub value: String,

    /// A JavaScript string literal for `value`, ready to print.
    ///
    /// For plain string arguments this is the source text, quotes included.
    pub literal: String,
}

/// What a `require` call's argument list looks like.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequireKind {
    /// Exactly one plain string argument.
    StaticLiteral(Specifier),

    /// Exactly one template literal argument without substitutions.
    StaticTemplateLiteral(Specifier),

    /// Anything else.
    Dynamic,
}

impl RequireKind {
    /// Returns the specifier for static kinds.
    #[inline]
    pub fn specifier(&self) -> Option<&Specifier> {
        match self {
            Self::StaticLiteral(spec) | Self::StaticTemplateLiteral(spec) => Some(spec),
            Self::Dynamic => None,
        }
    }

    /// Returns `true` for [`RequireKind::Dynamic`].
    #[inline]
    pub fn is_dynamic(&self) -> bool {
        matches!(self, Self::Dynamic)
    }
}

/// One `require(...)` call site.
#[derive(Debug, Clone)]
pub struct RequireOccurrence<'tree> {
    /// The `call_expression` node.
    pub call: Node<'tree>,

    /// Ancestors of `call`, root first.
    pub ancestors: Vec<Node<'tree>>,

    /// The enclosing expression statement or variable declaration, when it
    /// sits directly under the program root.
    pub statement: Option<Node<'tree>>,

    /// Argument classification.
    pub kind: RequireKind,
}

impl<'tree> RequireOccurrence<'tree> {
    /// The call's `arguments` node.
    pub fn arguments(&self) -> Option<Node<'tree>> {
        self.call.child_by_field_name("arguments")
    }

    /// The call's arguments, skipping comments.
    pub fn argument_list(&self) -> Vec<Node<'tree>> {
        self.arguments()
            .map(|args| args.significant_children())
            .unwrap_or_default()
    }
}

/// The object an export assignment writes through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExportObject {
    /// `module.<property> = ..`
    Module,

    /// `exports.<property> = ..`
    Exports,

    /// `module.exports.<property> = ..`
    ModuleExports,
}

/// One assignment to a property of `module`, `exports` or `module.exports`.
#[derive(Debug, Clone)]
pub struct ExportOccurrence<'tree> {
    /// The `assignment_expression` node.
    pub assignment: Node<'tree>,

    /// The object written through.
    pub object: ExportObject,

    /// The property name on the left-hand side.
    pub property: String,
}

impl ExportOccurrence<'_> {
    /// The ES export name this assignment contributes, if any.
    ///
    /// `module.exports = ..` contributes `default`; `module.<other>`
    /// contributes nothing.
    ///
    /// # Examples
    ///
    /// ```
    /// use cjs_parser::{JsParser, analyze};
    ///
    /// let source = "module.exports = 1; exports.a = 2; module.id = 3;";
    /// let tree = JsParser::tsx()?.parse(source)?;
    /// let analysis = analyze(&tree, source);
    /// let members: Vec<_> = analysis.exports.iter().map(|e| e.member()).collect();
    /// assert_eq!(members, [Some("default"), Some("a"), None]);
    /// # Ok::<(), cjs_parser::ParseError>(())
    /// ```
    pub fn member(&self) -> Option<&str> {
        match self.object {
            ExportObject::Module if self.property == "exports" => Some("default"),
            ExportObject::Module => None,
            ExportObject::Exports | ExportObject::ModuleExports => Some(self.property.as_str()),
        }
    }
}

/// Everything [`analyze`] found in one file, in traversal order.
#[derive(Debug, Default)]
pub struct Analysis<'tree> {
    /// `require` call sites.
    pub requires: Vec<RequireOccurrence<'tree>>,

    /// Export assignment sites.
    pub exports: Vec<ExportOccurrence<'tree>>,
}

impl Analysis<'_> {
    /// Returns `true` if nothing CommonJS was found.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.requires.is_empty() && self.exports.is_empty()
    }
}

/// Finds every `require` call and export assignment in `tree`.
pub fn analyze<'tree>(tree: &'tree Tree, source: &str) -> Analysis<'tree> {
    let mut analyzer = Analyzer {
        source,
        analysis: Analysis::default(),
    };
    walk(tree.root_node(), &mut analyzer);
    analyzer.analysis
}

struct Analyzer<'s, 'tree> {
    source: &'s str,
    analysis: Analysis<'tree>,
}

impl<'tree> Visit<'tree> for Analyzer<'_, 'tree> {
    fn visit(&mut self, node: Node<'tree>, ancestors: &[Node<'tree>]) {
        match node.kind() {
            "call_expression" => self.visit_call(node, ancestors),
            "assignment_expression" => self.visit_assignment(node),
            _ => {}
        }
    }
}

impl<'tree> Analyzer<'_, 'tree> {
    fn visit_call(&mut self, call: Node<'tree>, ancestors: &[Node<'tree>]) {
        let is_require = call
            .child_by_field_name("function")
            .is_some_and(|callee| callee.is_identifier(self.source, "require"));
        if !is_require {
            return;
        }
        // Tagged templates (require`x`) put the template in the arguments field.
        let Some(arguments) = call.child_by_field_name("arguments") else {
            return;
        };
        if arguments.kind() != "arguments" {
            return;
        }

        self.analysis.requires.push(RequireOccurrence {
            call,
            ancestors: ancestors.to_vec(),
            statement: top_level_statement(ancestors),
            kind: classify_arguments(&arguments.significant_children(), self.source),
        });
    }

    fn visit_assignment(&mut self, assignment: Node<'tree>) {
        let Some(left) = assignment.child_by_field_name("left") else {
            return;
        };
        let Some((object, property)) = export_target(left, self.source) else {
            return;
        };
        self.analysis.exports.push(ExportOccurrence {
            assignment,
            object,
            property: property.to_owned(),
        });
    }
}

fn top_level_statement<'tree>(ancestors: &[Node<'tree>]) -> Option<Node<'tree>> {
    match ancestors {
        [program, statement, ..]
            if program.kind() == "program"
                && matches!(
                    statement.kind(),
                    "expression_statement" | "lexical_declaration" | "variable_declaration"
                ) =>
        {
            Some(*statement)
        }
        _ => None,
    }
}

fn classify_arguments(args: &[Node<'_>], source: &str) -> RequireKind {
    let [arg] = args else {
        return RequireKind::Dynamic;
    };
    match arg.kind() {
        "string" => {
            let literal = arg.text(source);
            RequireKind::StaticLiteral(Specifier {
                value: cook(strip_delimiters(literal)),
                literal: literal.to_owned(),
            })
        }
        "template_string" if !has_substitution(*arg) => {
            let value = cook(strip_delimiters(arg.text(source)));
            RequireKind::StaticTemplateLiteral(Specifier {
                literal: quote_js_string(&value),
                value,
            })
        }
        _ => RequireKind::Dynamic,
    }
}

/// Returns `true` if a template literal has at least one `${..}`.
pub(crate) fn has_substitution(template: Node<'_>) -> bool {
    let mut cursor = template.walk();
    template
        .named_children(&mut cursor)
        .any(|child| child.kind() == "template_substitution")
}

fn export_target<'s>(left: Node<'_>, source: &'s str) -> Option<(ExportObject, &'s str)> {
    if left.kind() != "member_expression" || left.child_by_field_name("optional_chain").is_some()
    {
        return None;
    }
    let property = left.child_by_field_name("property")?;
    if property.kind() != "property_identifier" {
        return None;
    }
    let object = left.child_by_field_name("object")?;

    let target = if object.is_identifier(source, "module") {
        ExportObject::Module
    } else if object.is_identifier(source, "exports") {
        ExportObject::Exports
    } else if object.kind() == "member_expression"
        && object
            .child_by_field_name("object")
            .is_some_and(|o| o.is_identifier(source, "module"))
        && object
            .child_by_field_name("property")
            .is_some_and(|p| p.kind() == "property_identifier" && p.text(source) == "exports")
    {
        ExportObject::ModuleExports
    } else {
        return None;
    };

    Some((target, property.text(source)))
}

/// Drops the surrounding quote or backtick characters.
fn strip_delimiters(literal: &str) -> &str {
    let mut chars = literal.chars();
    chars.next();
    chars.next_back();
    chars.as_str()
}

/// Resolves JavaScript escape sequences in string literal contents.
///
/// Malformed escapes keep the escaped character.
pub fn cook(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        let Some(escaped) = chars.next() else {
            break;
        };
        match escaped {
            'n' => out.push('\n'),
            'r' => out.push('\r'),
            't' => out.push('\t'),
            'b' => out.push('\u{8}'),
            'f' => out.push('\u{c}'),
            'v' => out.push('\u{b}'),
            '0' if !chars.peek().is_some_and(char::is_ascii_digit) => out.push('\0'),
            // Line continuation.
            '\n' | '\u{2028}' | '\u{2029}' => {}
            '\r' => {
                if chars.peek() == Some(&'\n') {
                    chars.next();
                }
            }
            'x' => {
                let hex: String = chars.by_ref().take(2).collect();
                push_code_point(&mut out, &hex, 'x');
            }
            'u' if chars.peek() == Some(&'{') => {
                chars.next();
                let hex: String = chars.by_ref().take_while(|c| *c != '}').collect();
                push_code_point(&mut out, &hex, 'u');
            }
            'u' => {
                let hex: String = chars.by_ref().take(4).collect();
                push_code_point(&mut out, &hex, 'u');
            }
            other => out.push(other),
        }
    }

    out
}

fn push_code_point(out: &mut String, hex: &str, fallback: char) {
    match u32::from_str_radix(hex, 16).ok().and_then(char::from_u32) {
        Some(ch) => out.push(ch),
        None => {
            out.push(fallback);
            out.push_str(hex);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::JsParser;

    fn parse(source: &str) -> Tree {
        JsParser::tsx()
            .expect("Parser creation failed")
            .parse(source)
            .expect("Parse failed")
    }

    #[test]
    fn test_static_literal_keeps_quotes() {
        let source = r#"const a = require("a\x2fb");"#;
        let tree = parse(source);
        let analysis = analyze(&tree, source);

        assert_eq!(analysis.requires.len(), 1);
        let spec = analysis.requires[0].kind.specifier().expect("static");
        assert_eq!(spec.value, "a/b");
        assert_eq!(spec.literal, r#""a\x2fb""#);
        assert!(matches!(analysis.requires[0].kind, RequireKind::StaticLiteral(_)));
    }

    #[test]
    fn test_template_without_substitution_is_static() {
        let source = "require(`it's`);";
        let tree = parse(source);
        let analysis = analyze(&tree, source);

        match &analysis.requires[0].kind {
            RequireKind::StaticTemplateLiteral(spec) => {
                assert_eq!(spec.value, "it's");
                assert_eq!(spec.literal, r"'it\'s'");
            }
            other => panic!("unexpected kind: {other:?}"),
        }
    }

    #[test]
    fn test_dynamic_classifications() {
        let source = "require(`./${a}`); require(name); require('a', 'b'); require();";
        let tree = parse(source);
        let analysis = analyze(&tree, source);

        assert_eq!(analysis.requires.len(), 4);
        assert!(analysis.requires.iter().all(|r| r.kind.is_dynamic()));
    }

    #[test]
    fn test_non_require_calls_ignored() {
        let source = "foo('x'); obj.require('y'); require`z`;";
        let tree = parse(source);
        assert!(analyze(&tree, source).requires.is_empty());
    }

    #[test]
    fn test_top_level_statement_detection() {
        let source = "const a = require('a');\nif (x) { require('b'); }\nrequire('c').d;";
        let tree = parse(source);
        let analysis = analyze(&tree, source);

        let kinds: Vec<_> = analysis
            .requires
            .iter()
            .map(|r| r.statement.map(|s| s.kind()))
            .collect();
        assert_eq!(
            kinds,
            [
                Some("lexical_declaration"),
                None,
                Some("expression_statement")
            ]
        );
    }

    #[test]
    fn test_export_occurrences() {
        let source = "module.exports.a = 1;\nexports.b = 2;\nmodule.exports = {};\nexports['c'] = 3;\nfoo.exports = 4;";
        let tree = parse(source);
        let analysis = analyze(&tree, source);

        let found: Vec<_> = analysis
            .exports
            .iter()
            .map(|e| (e.object, e.property.as_str()))
            .collect();
        assert_eq!(
            found,
            [
                (ExportObject::ModuleExports, "a"),
                (ExportObject::Exports, "b"),
                (ExportObject::Module, "exports"),
            ]
        );
    }

    #[test]
    fn test_empty_analysis() {
        let source = "const x = 1;";
        let tree = parse(source);
        assert!(analyze(&tree, source).is_empty());
    }

    #[test]
    fn test_cook_escapes() {
        assert_eq!(cook(r"a\nb"), "a\nb");
        assert_eq!(cook(r"\u{1F600}"), "\u{1F600}");
        assert_eq!(cook(r"A\'"), "A'");
        assert_eq!(cook("a\\\nb"), "ab");
        assert_eq!(cook(r"\q"), "q");
    }
}
