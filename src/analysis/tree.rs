//! Read-only helpers over a tree-sitter concrete syntax tree.
//!
//! Everything here is a pure read: nodes are borrowed from a tree owned by
//! the caller and nothing is retained past the call.

use std::fmt;

use serde::Serialize;
use tree_sitter::Node;

/// Holds a parsed tree-sitter tree and associated metadata.
pub struct ParsedFile {
    /// The tree-sitter parse tree.
    pub tree: tree_sitter::Tree,
    /// The original source code (kept for node text extraction).
    pub source: Vec<u8>,
    /// The file path (for error reporting).
    pub path: String,
}

impl ParsedFile {
    /// Get text for a tree-sitter node.
    pub fn node_text(&self, node: Node) -> &str {
        node_text(node, &self.source)
    }

    /// Root node of the tree.
    pub fn root(&self) -> Node<'_> {
        self.tree.root_node()
    }
}

/// Source text covered by `node`, or an empty string for non-UTF-8 spans.
pub fn node_text<'s>(node: Node, source: &'s [u8]) -> &'s str {
    node.utf8_text(source).unwrap_or("")
}

/// 1-based line of the node's first byte.
pub fn line_of(node: Node) -> usize {
    node.start_position().row + 1
}

/// Source location span with byte offsets and line/column positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Span {
    /// Start byte offset (0-indexed).
    pub start_byte: usize,
    /// End byte offset (0-indexed, exclusive).
    pub end_byte: usize,
    /// Start line (1-indexed).
    pub start_line: usize,
    /// Start column (1-indexed).
    pub start_col: usize,
    /// End line (1-indexed).
    pub end_line: usize,
    /// End column (1-indexed).
    pub end_col: usize,
}

impl Span {
    /// Create a span from a tree-sitter node.
    pub fn from_node(node: Node) -> Self {
        let start = node.start_position();
        let end = node.end_position();
        Self {
            start_byte: node.start_byte(),
            end_byte: node.end_byte(),
            start_line: start.row + 1, // tree-sitter is 0-indexed
            start_col: start.column + 1,
            end_line: end.row + 1,
            end_col: end.column + 1,
        }
    }

    /// Whether `line` falls inside this span (inclusive).
    pub fn contains_line(&self, line: usize) -> bool {
        self.start_line <= line && line <= self.end_line
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.start_line, self.start_col)
    }
}

/// Collect `node` and every descendant whose kind is in `kinds`.
///
/// Uses an explicit stack rather than recursion so deeply nested sources
/// cannot overflow the call stack. Results come back in document order
/// (parents before children, left before right).
pub fn collect_descendants<'t>(node: Node<'t>, kinds: &[&str]) -> Vec<Node<'t>> {
    let mut found = Vec::new();
    let mut stack = vec![node];
    let mut cursor = node.walk();

    while let Some(current) = stack.pop() {
        if kinds.contains(&current.kind()) {
            found.push(current);
        }
        let children: Vec<Node<'t>> = current.children(&mut cursor).collect();
        stack.extend(children.into_iter().rev());
    }

    found
}

/// Visit `node` and its descendants in document order.
///
/// `visit` returns whether to descend into the visited node's children.
pub fn walk_pruned<'t>(node: Node<'t>, mut visit: impl FnMut(Node<'t>) -> bool) {
    let mut stack = vec![node];
    let mut cursor = node.walk();

    while let Some(current) = stack.pop() {
        if visit(current) {
            let children: Vec<Node<'t>> = current.children(&mut cursor).collect();
            stack.extend(children.into_iter().rev());
        }
    }
}

/// Topmost ancestor of `node`.
pub fn root_of(node: Node) -> Node {
    let mut current = node;
    while let Some(parent) = current.parent() {
        current = parent;
    }
    current
}

/// Immediate children of `node` with the given kind, in source order.
pub fn direct_children<'t>(node: Node<'t>, kind: &str) -> Vec<Node<'t>> {
    let mut cursor = node.walk();
    node.children(&mut cursor)
        .filter(|child| child.kind() == kind)
        .collect()
}

/// Named children of `node`, in source order.
pub fn named_children<'t>(node: Node<'t>) -> Vec<Node<'t>> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor).collect()
}

/// All children attached to `node` under field `field`.
pub fn field_children<'t>(node: Node<'t>, field: &str) -> Vec<Node<'t>> {
    let mut cursor = node.walk();
    node.children_by_field_name(field, &mut cursor).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::Language;

    fn parse(language: Language, source: &str) -> ParsedFile {
        language
            .parse(std::path::Path::new("test"), source.as_bytes())
            .unwrap()
    }

    #[test]
    fn test_collect_descendants_document_order() {
        let parsed = parse(
            Language::Python,
            "def a():\n    def b():\n        pass\n\ndef c():\n    pass\n",
        );
        let names: Vec<_> = collect_descendants(parsed.root(), &["function_definition"])
            .into_iter()
            .map(|n| parsed.node_text(n.child_by_field_name("name").unwrap()).to_string())
            .collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_collect_descendants_includes_self() {
        let parsed = parse(Language::Python, "x = 1\n");
        let root = parsed.root();
        let found = collect_descendants(root, &["module"]);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id(), root.id());
    }

    #[test]
    fn test_collect_descendants_deep_nesting() {
        let depth = 500;
        let source = format!("x = {}1{}\n", "(".repeat(depth), ")".repeat(depth));
        let parsed = parse(Language::Python, &source);
        let found = collect_descendants(parsed.root(), &["integer"]);
        assert_eq!(found.len(), 1);
    }

    #[test]
    fn test_direct_children_only_immediate() {
        let parsed = parse(
            Language::Python,
            "class A:\n    def m(self):\n        def inner():\n            pass\n",
        );
        let class = collect_descendants(parsed.root(), &["class_definition"])[0];
        let body = class.child_by_field_name("body").unwrap();
        let direct = direct_children(body, "function_definition");
        assert_eq!(direct.len(), 1);
        assert_eq!(
            parsed.node_text(direct[0].child_by_field_name("name").unwrap()),
            "m"
        );
    }

    #[test]
    fn test_walk_pruned_skips_subtrees() {
        let parsed = parse(
            Language::Python,
            "def a():\n    def b():\n        x = 1\n    y = 2\n",
        );
        let mut seen = Vec::new();
        walk_pruned(parsed.root(), |node| {
            if node.kind() == "identifier" {
                seen.push(parsed.node_text(node).to_string());
            }
            !(node.kind() == "function_definition"
                && node.child_by_field_name("name").map(|n| parsed.node_text(n)) == Some("b"))
        });
        assert_eq!(seen, vec!["a", "y"]);
    }

    #[test]
    fn test_root_of() {
        let parsed = parse(Language::Python, "x = 1\n");
        let int = collect_descendants(parsed.root(), &["integer"])[0];
        assert_eq!(root_of(int).id(), parsed.root().id());
    }

    #[test]
    fn test_span_from_node() {
        let parsed = parse(Language::Python, "\n\ndef f():\n    pass\n");
        let func = collect_descendants(parsed.root(), &["function_definition"])[0];
        let span = Span::from_node(func);
        assert_eq!(span.start_line, 3);
        assert_eq!(span.end_line, 4);
        assert_eq!(span.start_col, 1);
        assert!(span.contains_line(4));
        assert!(!span.contains_line(5));
        assert_eq!(span.to_string(), "3:1");
    }
}
