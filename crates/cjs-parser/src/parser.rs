//! Tree-sitter parser management.
//!
//! [`JsParser`] wraps one tree-sitter parser bound to a grammar.
//! [`ParserSet`] holds one of each and picks by file extension, so a worker
//! thread can parse any eligible file with a single value.

use camino::Utf8Path;
use tree_sitter::{Language, Node, Parser, Tree};

use crate::error::ParseError;
use crate::node::NodeExt;

/// The grammar a source file is parsed with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Grammar {
    /// Plain TypeScript. Angle-bracket type assertions parse, JSX does not.
    TypeScript,

    /// TypeScript with JSX. A superset of JavaScript, used for every
    /// non-TypeScript extension so JSX inside `.js` files parses.
    Tsx,
}

impl Grammar {
    /// Chooses the grammar for a (query-free) file path.
    ///
    /// # Examples
    ///
    /// ```
    /// use cjs_parser::Grammar;
    ///
    /// assert_eq!(Grammar::for_path("src/a.cts"), Grammar::TypeScript);
    /// assert_eq!(Grammar::for_path("src/a.jsx"), Grammar::Tsx);
    /// assert_eq!(Grammar::for_path("src/a.js"), Grammar::Tsx);
    /// ```
    #[must_use]
    pub fn for_path(path: &str) -> Self {
        match Utf8Path::new(path).extension() {
            Some("ts" | "mts" | "cts") => Self::TypeScript,
            _ => Self::Tsx,
        }
    }

    fn language(self) -> Language {
        match self {
            Self::TypeScript => tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
            Self::Tsx => tree_sitter_typescript::LANGUAGE_TSX.into(),
        }
    }

    const fn name(self) -> &'static str {
        match self {
            Self::TypeScript => "TypeScript",
            Self::Tsx => "TSX",
        }
    }
}

/// A tree-sitter parser bound to one [`Grammar`].
///
/// `JsParser` is `Send` but not `Sync`; create one per thread.
///
/// # Examples
///
/// ```
/// use cjs_parser::JsParser;
///
/// let mut parser = JsParser::tsx()?;
/// let tree = parser.parse("const fs = require('fs');")?;
/// assert_eq!(tree.root_node().kind(), "program");
/// # Ok::<(), cjs_parser::ParseError>(())
/// ```
pub struct JsParser {
    parser: Parser,
    grammar: Grammar,
}

impl JsParser {
    /// Creates a parser for `grammar`.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::LanguageInit`] if the grammar's ABI version is
    /// incompatible with the linked tree-sitter runtime.
    pub fn new(grammar: Grammar) -> Result<Self, ParseError> {
        let mut parser = Parser::new();
        parser
            .set_language(&grammar.language())
            .map_err(|_| ParseError::LanguageInit {
                grammar: grammar.name(),
            })?;

        Ok(Self { parser, grammar })
    }

    /// Creates a TypeScript parser.
    pub fn typescript() -> Result<Self, ParseError> {
        Self::new(Grammar::TypeScript)
    }

    /// Creates a TSX parser.
    pub fn tsx() -> Result<Self, ParseError> {
        Self::new(Grammar::Tsx)
    }

    /// Returns the grammar this parser was created with.
    #[inline]
    pub fn grammar(&self) -> Grammar {
        self.grammar
    }

    /// Parses `source` into a syntax tree.
    ///
    /// # Errors
    ///
    /// - [`ParseError::Parse`] if tree-sitter returns no tree
    /// - [`ParseError::Syntax`] if the tree contains error or missing nodes
    pub fn parse(&mut self, source: &str) -> Result<Tree, ParseError> {
        let tree = self.parser.parse(source, None).ok_or(ParseError::Parse)?;

        let root = tree.root_node();
        if root.has_error() {
            let node = first_error(root).unwrap_or(root);
            return Err(ParseError::Syntax {
                location: node.location(),
            });
        }

        Ok(tree)
    }
}

impl std::fmt::Debug for JsParser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsParser")
            .field("grammar", &self.grammar)
            .finish_non_exhaustive()
    }
}

/// One parser per grammar.
#[derive(Debug)]
pub struct ParserSet {
    typescript: JsParser,
    tsx: JsParser,
}

impl ParserSet {
    /// Creates both parsers.
    pub fn new() -> Result<Self, ParseError> {
        Ok(Self {
            typescript: JsParser::typescript()?,
            tsx: JsParser::tsx()?,
        })
    }

    /// Returns the parser for `path`'s extension.
    pub fn for_path(&mut self, path: &str) -> &mut JsParser {
        match Grammar::for_path(path) {
            Grammar::TypeScript => &mut self.typescript,
            Grammar::Tsx => &mut self.tsx,
        }
    }

    /// Parses `source` with the grammar chosen for `path`.
    pub fn parse(&mut self, source: &str, path: &str) -> Result<Tree, ParseError> {
        self.for_path(path).parse(source)
    }
}

/// Finds the first (in document order) `ERROR` or `MISSING` node below `root`.
fn first_error(root: Node<'_>) -> Option<Node<'_>> {
    let mut node = root;
    'descend: loop {
        if node.is_error() || node.is_missing() {
            return Some(node);
        }
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            if child.has_error() {
                node = child;
                continue 'descend;
            }
        }
        return None;
    }
}
