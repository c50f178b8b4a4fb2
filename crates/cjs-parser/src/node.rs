//! Convenience accessors on tree-sitter nodes.

use cjs_core::{SourceLocation, Span};
use tree_sitter::Node;

/// Extension methods for [`Node`].
pub trait NodeExt<'tree> {
    /// The node's byte range as a [`Span`].
    fn span(&self) -> Span;

    /// The node's source text, or `""` if the range does not fit `source`.
    fn text<'s>(&self, source: &'s str) -> &'s str;

    /// The node's start position.
    fn location(&self) -> SourceLocation;

    /// Named children, skipping comments.
    fn significant_children(&self) -> Vec<Node<'tree>>;

    /// Returns `true` if the node is an identifier spelled `name`.
    fn is_identifier(&self, source: &str, name: &str) -> bool;
}

impl<'tree> NodeExt<'tree> for Node<'tree> {
    #[inline]
    fn span(&self) -> Span {
        Span::new(self.start_byte(), self.end_byte())
    }

    #[inline]
    fn text<'s>(&self, source: &'s str) -> &'s str {
        source.get(self.byte_range()).unwrap_or_default()
    }

    fn location(&self) -> SourceLocation {
        let point = self.start_position();
        SourceLocation::new(
            to_u32(point.row.saturating_add(1)),
            to_u32(point.column),
            to_u32(self.start_byte()),
        )
    }

    fn significant_children(&self) -> Vec<Node<'tree>> {
        let mut cursor = self.walk();
        self.named_children(&mut cursor)
            .filter(|child| child.kind() != "comment")
            .collect()
    }

    fn is_identifier(&self, source: &str, name: &str) -> bool {
        self.kind() == "identifier" && self.text(source) == name
    }
}

fn to_u32(value: usize) -> u32 {
    u32::try_from(value).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::JsParser;

    #[test]
    fn test_span_text_and_location() {
        let source = "let a;\n  require('x');";
        let mut parser = JsParser::tsx().expect("Parser creation failed");
        let tree = parser.parse(source).expect("Parse failed");
        let stmt = tree.root_node().named_child(1).expect("second statement");

        assert_eq!(stmt.text(source), "require('x');");
        assert_eq!(stmt.span(), Span::new(9, 22));
        assert_eq!(stmt.location().to_string(), "2:3");
    }

    #[test]
    fn test_significant_children_skip_comments() {
        let source = "f(/* a */ 1, 2);";
        let mut parser = JsParser::tsx().expect("Parser creation failed");
        let tree = parser.parse(source).expect("Parse failed");
        let call = tree
            .root_node()
            .named_child(0)
            .and_then(|s| s.named_child(0))
            .expect("call expression");
        let args = call.child_by_field_name("arguments").expect("arguments");

        assert_eq!(args.significant_children().len(), 2);
        assert!(
            call.child_by_field_name("function")
                .expect("callee")
                .is_identifier(source, "f")
        );
    }
}
