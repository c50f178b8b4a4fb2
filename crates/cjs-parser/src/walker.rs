//! Post-order traversal with ancestor chains.

use tree_sitter::Node;

/// Callback for [`walk`].
pub trait Visit<'tree> {
    /// Called once per named node, after all of its descendants.
    ///
    /// `ancestors` runs from the root down to the node's parent.
    fn visit(&mut self, node: Node<'tree>, ancestors: &[Node<'tree>]);
}

impl<'tree, F> Visit<'tree> for F
where
    F: FnMut(Node<'tree>, &[Node<'tree>]),
{
    fn visit(&mut self, node: Node<'tree>, ancestors: &[Node<'tree>]) {
        self(node, ancestors);
    }
}

/// Visits every named node under (and including) `root` in post-order.
///
/// The traversal uses a single [`TreeCursor`](tree_sitter::TreeCursor), so
/// deeply nested sources do not grow the call stack.
///
/// # Examples
///
/// ```
/// use cjs_parser::{JsParser, walk};
///
/// let mut parser = JsParser::tsx()?;
/// let tree = parser.parse("a(b);")?;
///
/// let mut kinds = Vec::new();
/// walk(tree.root_node(), &mut |node: tree_sitter::Node<'_>, _: &[tree_sitter::Node<'_>]| {
///     kinds.push(node.kind());
/// });
/// assert_eq!(kinds.last(), Some(&"program"));
/// # Ok::<(), cjs_parser::ParseError>(())
/// ```
pub fn walk<'tree, V>(root: Node<'tree>, visitor: &mut V)
where
    V: Visit<'tree> + ?Sized,
{
    let mut cursor = root.walk();
    let mut ancestors: Vec<Node<'tree>> = Vec::new();

    loop {
        loop {
            let node = cursor.node();
            if !cursor.goto_first_child() {
                break;
            }
            ancestors.push(node);
        }

        loop {
            let node = cursor.node();
            if node.is_named() {
                visitor.visit(node, &ancestors);
            }
            if cursor.goto_next_sibling() {
                break;
            }
            if !cursor.goto_parent() {
                return;
            }
            ancestors.pop();
        }
    }
}
