//! Static import planning.
//!
//! Every non-dynamic `require` occurrence gets exactly one [`ImportPlan`].
//! Occurrences in a directly convertible top-level position replace their
//! whole statement with an `import`; every other occurrence keeps its place
//! and reads an interop expression over a namespace import hoisted to the
//! top of the file.
//!
//! # Convertible positions
//!
//! | Source | Result |
//! |--------|--------|
//! | `require('x');` | `import 'x';` |
//! | `const a = require('x');` | `import * as a from 'x';` |
//! | `const { a, b: c } = require('x');` | `import { a, b as c } from 'x';` |
//! | `const a = require('x').default;` | `import a from 'x';` |
//! | `const a = require('x').m;` | `import { m as a } from 'x';` |
//! | `const { a } = require('x').m;` | aliased import of `m`, then `const { a } = <alias>;` |
//!
//! Import bindings are immutable, so a declaration whose names are declared
//! again or assigned anywhere in the file is hoisted instead. Comments inside
//! a replaced statement are kept after the replacement.

use cjs_core::{
    FxHashMap, FxHashSet, ImportClause, ImportInterop, ImportStatement, ImportStrategy,
    NamedSpecifier, Span,
};
use cjs_parser::{Node, NodeExt, RequireOccurrence, Specifier, Visit, walk};
use smallvec::{SmallVec, smallvec};

use crate::error::ImportError;

/// Prefix of aliases generated for hoisted and member-destructure imports.
pub const IMPORT_ALIAS_PREFIX: &str = "__CJS__import__";

/// Nodes that start a new `var` scope.
const FUNCTION_SCOPES: &[&str] = &[
    "function_declaration",
    "generator_function_declaration",
    "function_expression",
    "function",
    "generator_function",
    "arrow_function",
    "method_definition",
];

/// Argument kinds that can never evaluate to a module id.
const NON_STRING_ARGUMENTS: &[&str] = &[
    "number",
    "true",
    "false",
    "null",
    "undefined",
    "regex",
    "object",
    "array",
    "arrow_function",
    "function",
    "function_expression",
    "generator_function",
    "class",
];

/// The rewrite of one `require` occurrence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportPlan {
    /// The module id being imported.
    pub specifier: Specifier,

    /// Which rule produced the plan.
    pub strategy: ImportStrategy,

    /// Range of the original source to replace.
    pub span: Span,

    /// Text replacing `span`.
    pub replacement: String,

    /// Generated alias, for hoisted and member-destructure plans.
    pub alias: Option<String>,
}

/// All import plans of one file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportPlans {
    /// One plan per static occurrence, in occurrence order.
    pub plans: Vec<ImportPlan>,

    /// Namespace imports to place at the top of the file, one per module id.
    pub hoisted: Vec<ImportStatement>,
}

impl ImportPlans {
    /// Returns `true` if no occurrence was planned.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.plans.is_empty()
    }
}

/// Plans static imports for one file.
///
/// Alias numbering is a pure function of occurrence order; a fresh planner
/// must be used for each file.
///
/// # Examples
///
/// ```
/// use cjs_core::ImportInterop;
/// use cjs_parser::{JsParser, analyze};
/// use cjs_transform::ImportPlanner;
///
/// let source = "const fs = require('fs');";
/// let tree = JsParser::tsx()?.parse(source)?;
/// let analysis = analyze(&tree, source);
///
/// let plans = ImportPlanner::new(source, &ImportInterop::default()).plan(&analysis.requires)?;
/// assert_eq!(plans.plans[0].replacement, "import * as fs from 'fs';");
/// assert!(plans.hoisted.is_empty());
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug)]
pub struct ImportPlanner<'a> {
    source: &'a str,
    interop: &'a ImportInterop,
    next_alias: usize,
    hoisted_aliases: FxHashMap<String, String>,
    hoisted: Vec<ImportStatement>,
    mutable: FxHashSet<String>,
}

impl<'a> ImportPlanner<'a> {
    /// Creates a planner over `source` using `interop` for hoisted calls.
    #[must_use]
    pub fn new(source: &'a str, interop: &'a ImportInterop) -> Self {
        Self {
            source,
            interop,
            next_alias: 0,
            hoisted_aliases: FxHashMap::default(),
            hoisted: Vec::new(),
            mutable: FxHashSet::default(),
        }
    }

    /// Plans every static occurrence; dynamic ones are skipped.
    ///
    /// # Errors
    ///
    /// Returns [`ImportError::Unconvertible`] for the first call, dynamic
    /// ones included, that has no arguments or whose first argument can
    /// never be a string.
    pub fn plan(mut self, occurrences: &[RequireOccurrence<'_>]) -> Result<ImportPlans, ImportError> {
        for occurrence in occurrences {
            self.check_convertible(occurrence)?;
        }
        if let Some(program) = occurrences.first().and_then(|o| o.ancestors.first()) {
            self.mutable = mutable_bindings(*program, self.source);
        }

        let plans = occurrences
            .iter()
            .filter_map(|occurrence| {
                let specifier = occurrence.kind.specifier()?;
                Some(self.plan_one(occurrence, specifier.clone()))
            })
            .collect();

        Ok(ImportPlans {
            plans,
            hoisted: self.hoisted,
        })
    }

    fn check_convertible(&self, occurrence: &RequireOccurrence<'_>) -> Result<(), ImportError> {
        let convertible = occurrence
            .argument_list()
            .first()
            .is_some_and(|arg| !NON_STRING_ARGUMENTS.contains(&arg.kind()));
        if convertible {
            return Ok(());
        }
        Err(ImportError::unconvertible(
            occurrence.call.text(self.source),
            occurrence.call.location(),
        ))
    }

    fn plan_one(&mut self, occurrence: &RequireOccurrence<'_>, specifier: Specifier) -> ImportPlan {
        let position = Position::classify(occurrence, self.source);

        let planned = match position {
            Some(Position::Statement { statement }) => Some(Planned::new(
                ImportStrategy::SideEffect,
                statement.span(),
                keep_comments(
                    ImportStatement::new(ImportClause::SideEffect, &specifier.literal).to_string(),
                    statement,
                    None,
                    self.source,
                ),
            )),
            Some(Position::Declaration {
                declaration,
                binding,
                member,
            }) => self.plan_declaration(declaration, binding, member, &specifier),
            None => None,
        };

        let planned = match planned {
            Some(planned) => planned,
            None => self.plan_hoisted(occurrence.call, &specifier),
        };

        ImportPlan {
            specifier,
            strategy: planned.strategy,
            span: planned.span,
            replacement: planned.replacement,
            alias: planned.alias,
        }
    }

    fn plan_declaration(
        &mut self,
        declaration: Node<'_>,
        binding: Node<'_>,
        member: Option<&str>,
        specifier: &Specifier,
    ) -> Option<Planned> {
        let source = self.source;
        let span = declaration.span();
        let import = |clause| {
            keep_comments(
                ImportStatement::new(clause, &specifier.literal).to_string(),
                declaration,
                None,
                source,
            )
        };

        // Only the member destructure keeps a declaration of its own.
        let imports_binding = !matches!((member, binding.kind()), (Some(_), "object_pattern"));
        if imports_binding
            && pattern_names(binding, source)
                .iter()
                .any(|name| self.mutable.contains(*name))
        {
            return None;
        }

        let planned = match (member, binding.kind()) {
            (None, "identifier") => Planned::new(
                ImportStrategy::Namespace,
                span,
                import(ImportClause::Namespace(binding.text(source).to_owned())),
            ),
            (None, "object_pattern") => {
                let specifiers = simple_pattern(binding, source)?;
                Planned::new(
                    ImportStrategy::Named,
                    span,
                    import(ImportClause::Named(specifiers)),
                )
            }
            (Some("default"), "identifier") => Planned::new(
                ImportStrategy::Default,
                span,
                import(ImportClause::Default(binding.text(source).to_owned())),
            ),
            (Some(member), "identifier") => Planned::new(
                ImportStrategy::Named,
                span,
                import(ImportClause::Named(smallvec![NamedSpecifier::new(
                    member,
                    binding.text(source)
                )])),
            ),
            (Some(member), "object_pattern") if !contains_call(binding) => {
                let kind = declaration_keyword(declaration, source)?;
                let alias = self.allocate_alias();
                let clause = if member == "default" {
                    ImportClause::Default(alias.clone())
                } else {
                    ImportClause::Named(smallvec![NamedSpecifier::new(member, alias.as_str())])
                };
                let replacement = keep_comments(
                    format!(
                        "{} {kind} {} = {alias};",
                        ImportStatement::new(clause, &specifier.literal),
                        binding.text(source)
                    ),
                    declaration,
                    Some(binding.span()),
                    source,
                );
                Planned {
                    strategy: ImportStrategy::MemberDestructure,
                    span,
                    replacement,
                    alias: Some(alias),
                }
            }
            _ => return None,
        };
        Some(planned)
    }

    fn plan_hoisted(&mut self, call: Node<'_>, specifier: &Specifier) -> Planned {
        let alias = match self.hoisted_aliases.get(&specifier.value) {
            Some(alias) => alias.clone(),
            None => {
                let alias = self.allocate_alias();
                self.hoisted_aliases
                    .insert(specifier.value.clone(), alias.clone());
                self.hoisted.push(ImportStatement::new(
                    ImportClause::Namespace(alias.clone()),
                    &specifier.literal,
                ));
                alias
            }
        };
        Planned {
            strategy: ImportStrategy::Hoisted,
            span: call.span(),
            replacement: self.interop.render(&alias),
            alias: Some(alias),
        }
    }

    fn allocate_alias(&mut self) -> String {
        let alias = format!("{IMPORT_ALIAS_PREFIX}{}__", self.next_alias);
        self.next_alias += 1;
        alias
    }
}

struct Planned {
    strategy: ImportStrategy,
    span: Span,
    replacement: String,
    alias: Option<String>,
}

impl Planned {
    fn new(strategy: ImportStrategy, span: Span, replacement: String) -> Self {
        Self {
            strategy,
            span,
            replacement,
            alias: None,
        }
    }
}

/// A directly convertible top-level position.
#[derive(Debug)]
enum Position<'tree, 's> {
    /// `require('x');` or `require('x').m;`
    Statement { statement: Node<'tree> },

    /// `<kind> <binding> = require('x')[.member];`
    Declaration {
        declaration: Node<'tree>,
        binding: Node<'tree>,
        member: Option<&'s str>,
    },
}

impl<'tree, 's> Position<'tree, 's> {
    fn classify(occurrence: &RequireOccurrence<'tree>, source: &'s str) -> Option<Self> {
        let (target, member, chain) = match occurrence.ancestors.split_last() {
            Some((parent, rest)) => match plain_member(*parent, occurrence.call, source) {
                Some(member) => (*parent, Some(member), rest),
                None => (occurrence.call, None, occurrence.ancestors.as_slice()),
            },
            None => return None,
        };

        match chain {
            [program, statement]
                if program.kind() == "program" && statement.kind() == "expression_statement" =>
            {
                let expression = statement.significant_children().into_iter().next()?;
                (expression == target).then_some(Self::Statement {
                    statement: *statement,
                })
            }
            [program, declaration, declarator]
                if program.kind() == "program"
                    && matches!(
                        declaration.kind(),
                        "lexical_declaration" | "variable_declaration"
                    )
                    && declarator.kind() == "variable_declarator" =>
            {
                let declarators = declaration
                    .significant_children()
                    .into_iter()
                    .filter(|child| child.kind() == "variable_declarator")
                    .count();
                if declarators != 1 || declarator.child_by_field_name("type").is_some() {
                    return None;
                }
                let value = declarator.child_by_field_name("value")?;
                if value != target {
                    return None;
                }
                Some(Self::Declaration {
                    declaration: *declaration,
                    binding: declarator.child_by_field_name("name")?,
                    member,
                })
            }
            _ => None,
        }
    }
}

/// Returns the property name if `parent` is `<call>.<name>` with a plain,
/// non-optional, non-computed property.
fn plain_member<'s>(parent: Node<'_>, call: Node<'_>, source: &'s str) -> Option<&'s str> {
    if parent.kind() != "member_expression" || parent.child_by_field_name("optional_chain").is_some()
    {
        return None;
    }
    if parent.child_by_field_name("object")? != call {
        return None;
    }
    let property = parent.child_by_field_name("property")?;
    (property.kind() == "property_identifier").then(|| property.text(source))
}

/// Converts a non-empty object pattern of shorthand names and
/// `key: identifier` pairs into named import specifiers.
fn simple_pattern(pattern: Node<'_>, source: &str) -> Option<SmallVec<[NamedSpecifier; 4]>> {
    let mut specifiers = SmallVec::new();
    for property in pattern.significant_children() {
        match property.kind() {
            "shorthand_property_identifier_pattern" => {
                let name = property.text(source);
                specifiers.push(NamedSpecifier::new(name, name));
            }
            "pair_pattern" => {
                let key = property.child_by_field_name("key")?;
                let value = property.child_by_field_name("value")?;
                if key.kind() != "property_identifier" || value.kind() != "identifier" {
                    return None;
                }
                specifiers.push(NamedSpecifier::new(key.text(source), value.text(source)));
            }
            _ => return None,
        }
    }
    (!specifiers.is_empty()).then_some(specifiers)
}

/// Appends the comments inside `node`, other than those within `reused`,
/// to `replacement`.
fn keep_comments(
    mut replacement: String,
    node: Node<'_>,
    reused: Option<Span>,
    source: &str,
) -> String {
    let mut comments = Vec::new();
    collect_comments(node, &mut comments);
    for comment in comments {
        let span = comment.span();
        if reused.is_some_and(|reused| reused.start <= span.start && span.end <= reused.end) {
            continue;
        }
        let text = comment.text(source);
        replacement.push(' ');
        replacement.push_str(text);
        if text.starts_with("//") {
            replacement.push('\n');
        }
    }
    replacement
}

fn collect_comments<'tree>(node: Node<'tree>, out: &mut Vec<Node<'tree>>) {
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        if child.kind() == "comment" {
            out.push(child);
        } else {
            collect_comments(child, out);
        }
    }
}

/// Names bound (or assigned) by a declaration name or assignment target.
fn pattern_names<'s>(pattern: Node<'_>, source: &'s str) -> Vec<&'s str> {
    let mut names = Vec::new();
    push_pattern_names(pattern, source, &mut names);
    names
}

fn push_pattern_names<'s>(pattern: Node<'_>, source: &'s str, names: &mut Vec<&'s str>) {
    match pattern.kind() {
        "identifier" | "shorthand_property_identifier_pattern" => names.push(pattern.text(source)),
        "member_expression" | "subscript_expression" | "comment" => {}
        "pair_pattern" => {
            if let Some(value) = pattern.child_by_field_name("value") {
                push_pattern_names(value, source, names);
            }
        }
        "assignment_pattern" | "object_assignment_pattern" => {
            if let Some(left) = pattern.child_by_field_name("left") {
                push_pattern_names(left, source, names);
            }
        }
        _ => {
            let mut cursor = pattern.walk();
            for child in pattern.named_children(&mut cursor) {
                push_pattern_names(child, source, names);
            }
        }
    }
}

/// Module-scope names that are declared more than once, plus every name
/// that is assigned, updated or used as a `for..in`/`for..of` target.
///
/// Assignments are matched by name alone, so a shadowing local that gets
/// reassigned also counts.
fn mutable_bindings(program: Node<'_>, source: &str) -> FxHashSet<String> {
    let mut scan = BindingScan {
        source,
        declared: FxHashMap::default(),
        assigned: FxHashSet::default(),
    };
    walk(program, &mut scan);

    scan.declared
        .into_iter()
        .filter(|&(_, count)| count > 1)
        .map(|(name, _)| name)
        .chain(scan.assigned)
        .map(str::to_owned)
        .collect()
}

struct BindingScan<'s> {
    source: &'s str,
    declared: FxHashMap<&'s str, usize>,
    assigned: FxHashSet<&'s str>,
}

impl BindingScan<'_> {
    fn declare(&mut self, pattern: Node<'_>) {
        for name in pattern_names(pattern, self.source) {
            *self.declared.entry(name).or_default() += 1;
        }
    }

    fn assign(&mut self, target: Node<'_>) {
        self.assigned.extend(pattern_names(target, self.source));
    }
}

impl<'tree> Visit<'tree> for BindingScan<'_> {
    fn visit(&mut self, node: Node<'tree>, ancestors: &[Node<'tree>]) {
        let parent = ancestors.last().map(Node::kind);
        let at_top = ancestors.len() == 1;

        match node.kind() {
            "variable_declarator" => {
                let module_scope = match parent {
                    Some("lexical_declaration") => ancestors.len() == 2,
                    Some("variable_declaration") => !ancestors
                        .iter()
                        .any(|a| FUNCTION_SCOPES.contains(&a.kind())),
                    _ => false,
                };
                if module_scope {
                    if let Some(name) = node.child_by_field_name("name") {
                        self.declare(name);
                    }
                }
            }
            "function_declaration" | "generator_function_declaration" | "class_declaration"
                if at_top =>
            {
                if let Some(name) = node.child_by_field_name("name") {
                    *self.declared.entry(name.text(self.source)).or_default() += 1;
                }
            }
            "assignment_expression" | "augmented_assignment_expression" => {
                if let Some(left) = node.child_by_field_name("left") {
                    self.assign(left);
                }
            }
            "update_expression" => {
                if let Some(argument) = node.child_by_field_name("argument") {
                    self.assign(argument);
                }
            }
            "for_in_statement" if node.child_by_field_name("kind").is_none() => {
                if let Some(left) = node.child_by_field_name("left") {
                    self.assign(left);
                }
            }
            _ => {}
        }
    }
}

fn declaration_keyword<'s>(declaration: Node<'_>, source: &'s str) -> Option<&'s str> {
    let keyword = declaration.child(0)?.text(source);
    matches!(keyword, "const" | "let" | "var").then_some(keyword)
}

fn contains_call(node: Node<'_>) -> bool {
    if node.kind() == "call_expression" {
        return true;
    }
    let mut cursor = node.walk();
    let found = node.named_children(&mut cursor).any(contains_call);
    found
}
