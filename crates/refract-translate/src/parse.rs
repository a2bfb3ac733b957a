//! Tree-sitter based Go front end.

use tree_sitter::{Node, Parser, Tree};

/// Error that can occur when the front end cannot produce a tree at all.
///
/// Ordinary syntax errors are not reported here: tree-sitter recovers from
/// them and they surface through [`ParsedSource::syntax_errors`].
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("failed to load Go grammar: {0}")]
    Language(String),

    #[error("parser produced no tree")]
    NoTree,
}

/// A syntax error located in the source text (1-based line and column).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxError {
    pub line: usize,
    pub column: usize,
    pub message: String,
}

/// Source text together with its parse tree.
pub struct ParsedSource {
    source: String,
    tree: Tree,
}

/// Parse Go source text.
pub fn parse_source(source: impl Into<String>) -> Result<ParsedSource, ParseError> {
    let source = source.into();
    let mut parser = Parser::new();
    parser
        .set_language(&arborium_go::language().into())
        .map_err(|err| ParseError::Language(err.to_string()))?;

    let tree = parser.parse(&source, None).ok_or(ParseError::NoTree)?;
    Ok(ParsedSource { source, tree })
}

impl ParsedSource {
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    pub fn root(&self) -> Node<'_> {
        self.tree.root_node()
    }

    /// S-expression rendering of the parse tree (for `--show-parse-tree`).
    pub fn sexp(&self) -> String {
        self.tree.root_node().to_sexp()
    }

    /// Every `ERROR` and `MISSING` node in the tree, in source order.
    ///
    /// Error nodes are not descended into, so one malformed region yields
    /// one diagnostic.
    pub fn syntax_errors(&self) -> Vec<SyntaxError> {
        let root = self.tree.root_node();
        if !root.has_error() {
            return Vec::new();
        }

        let mut errors = Vec::new();
        let mut cursor = root.walk();
        loop {
            let node = cursor.node();
            let mut descend = node.has_error();

            if node.is_missing() {
                errors.push(located(node, format!("missing `{}`", node.kind())));
                descend = false;
            } else if node.is_error() {
                errors.push(located(
                    node,
                    format!("syntax error near `{}`", excerpt(text(node, &self.source))),
                ));
                descend = false;
            }

            if descend && cursor.goto_first_child() {
                continue;
            }
            loop {
                if cursor.goto_next_sibling() {
                    break;
                }
                if !cursor.goto_parent() {
                    return errors;
                }
            }
        }
    }
}

fn located(node: Node<'_>, message: String) -> SyntaxError {
    let pos = node.start_position();
    SyntaxError {
        line: pos.row + 1,
        column: pos.column + 1,
        message,
    }
}

fn excerpt(text: &str) -> String {
    let first = text.lines().next().unwrap_or("").trim();
    if first.chars().count() > 40 {
        let cut: String = first.chars().take(40).collect();
        format!("{}...", cut)
    } else {
        first.to_string()
    }
}

/// Source text covered by a node.
pub fn text<'s>(node: Node<'_>, source: &'s str) -> &'s str {
    node.utf8_text(source.as_bytes()).unwrap_or("")
}

/// Named children of a node, collected so callers need not juggle cursors.
pub fn named_children<'t>(node: Node<'t>) -> Vec<Node<'t>> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor).collect()
}

/// All children (named and anonymous) of a node.
pub fn children<'t>(node: Node<'t>) -> Vec<Node<'t>> {
    let mut cursor = node.walk();
    node.children(&mut cursor).collect()
}

/// Children stored under a field name (e.g. the `name`s of `a, b int`).
pub fn field_children<'t>(node: Node<'t>, field: &str) -> Vec<Node<'t>> {
    let mut cursor = node.walk();
    node.children_by_field_name(field, &mut cursor).collect()
}

/// First named child, if any.
pub fn first_named(node: Node<'_>) -> Option<Node<'_>> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor).next()
}

/// Whether the node has an anonymous child token with the given text.
pub fn has_token(node: Node<'_>, token: &str) -> bool {
    let mut cursor = node.walk();
    node.children(&mut cursor)
        .any(|child| !child.is_named() && child.kind() == token)
}

/// Unquote an interpreted or raw string literal.
pub fn unquote(literal: &str) -> &str {
    literal
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .or_else(|| literal.strip_prefix('`').and_then(|s| s.strip_suffix('`')))
        .unwrap_or(literal)
}
