//! Go scope policy.
//!
//! Methods live outside the struct, so private fields use the looser
//! occurrence-count heuristic over the whole file: a field whose name
//! appears at most once (its own declaration) is unused.

use std::collections::HashSet;

use tree_sitter::Node;

use crate::analysis::{
    collect_descendants, direct_children, field_children, named_children, node_text, root_of,
};
use crate::deadcode::policy::{FieldDecl, FieldHeuristic, NodeRole, ScopePolicy};

/// Grammar node kinds the Go policy distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GoKind {
    FunctionDeclaration,
    MethodDeclaration,
    FuncLiteral,
    TypeSpec,
    ShortVarDeclaration,
    VarSpec,
    RangeClause,
    Identifier,
    Other,
}

impl GoKind {
    fn of(node: Node) -> Self {
        match node.kind() {
            "function_declaration" => GoKind::FunctionDeclaration,
            "method_declaration" => GoKind::MethodDeclaration,
            "func_literal" => GoKind::FuncLiteral,
            "type_spec" => GoKind::TypeSpec,
            "short_var_declaration" => GoKind::ShortVarDeclaration,
            "var_spec" => GoKind::VarSpec,
            "range_clause" => GoKind::RangeClause,
            "identifier" => GoKind::Identifier,
            _ => GoKind::Other,
        }
    }
}

/// `foo` is unexported, `Foo` is exported.
pub fn is_unexported(name: &str) -> bool {
    name.chars().next().is_some_and(|c| c.is_lowercase())
}

fn struct_type(type_spec: Node) -> Option<Node> {
    type_spec
        .child_by_field_name("type")
        .filter(|t| t.kind() == "struct_type")
}

fn field_declarations(type_spec: Node) -> Vec<Node> {
    struct_type(type_spec)
        .and_then(|s| direct_children(s, "field_declaration_list").into_iter().next())
        .map(|list| direct_children(list, "field_declaration"))
        .unwrap_or_default()
}

fn identifiers_in_list(list: Node) -> Vec<Node> {
    named_children(list)
        .into_iter()
        .filter(|n| GoKind::of(*n) == GoKind::Identifier)
        .collect()
}

pub struct GoPolicy;

impl ScopePolicy for GoPolicy {
    fn role(&self, node: Node) -> NodeRole {
        match GoKind::of(node) {
            GoKind::FunctionDeclaration | GoKind::MethodDeclaration | GoKind::FuncLiteral => {
                NodeRole::Function
            }
            GoKind::TypeSpec if struct_type(node).is_some() => NodeRole::Class,
            GoKind::TypeSpec
            | GoKind::ShortVarDeclaration
            | GoKind::VarSpec
            | GoKind::RangeClause
            | GoKind::Identifier
            | GoKind::Other => NodeRole::Other,
        }
    }

    fn self_names(&self) -> &'static [&'static str] {
        // The receiver sits outside the parameter list.
        &[]
    }

    fn body<'t>(&self, function: Node<'t>) -> Option<Node<'t>> {
        function.child_by_field_name("body")
    }

    fn parameters<'t>(&self, function: Node<'t>) -> Vec<Node<'t>> {
        function
            .child_by_field_name("parameters")
            .map(named_children)
            .unwrap_or_default()
            .into_iter()
            .filter(|p| {
                matches!(
                    p.kind(),
                    "parameter_declaration" | "variadic_parameter_declaration"
                )
            })
            .flat_map(|p| field_children(p, "name"))
            .collect()
    }

    fn local_bindings<'t>(&self, node: Node<'t>) -> Vec<Node<'t>> {
        match GoKind::of(node) {
            GoKind::ShortVarDeclaration => node
                .child_by_field_name("left")
                .map(identifiers_in_list)
                .unwrap_or_default(),
            GoKind::VarSpec => field_children(node, "name"),
            GoKind::RangeClause if !direct_children(node, ":=").is_empty() => node
                .child_by_field_name("left")
                .map(identifiers_in_list)
                .unwrap_or_default(),
            _ => Vec::new(),
        }
    }

    fn is_use(&self, node: Node) -> bool {
        GoKind::of(node) == GoKind::Identifier
    }

    fn private_fields<'t>(&self, class: Node<'t>, source: &[u8]) -> Vec<FieldDecl<'t>> {
        field_declarations(class)
            .into_iter()
            .flat_map(|decl| field_children(decl, "name"))
            .map(|name| FieldDecl::new(name, source))
            .filter(|f| is_unexported(&f.name))
            .collect()
    }

    /// Every field name occurrence in the file: declarations, selectors and
    /// composite-literal keys.
    fn field_uses<'t>(&self, class: Node<'t>, _source: &[u8]) -> Vec<Node<'t>> {
        let root = root_of(class);
        let mut seen = HashSet::new();
        let mut uses: Vec<Node<'t>> = collect_descendants(root, &["field_identifier"]);

        for element in collect_descendants(root, &["keyed_element"]) {
            let key = element
                .child_by_field_name("key")
                .or_else(|| named_children(element).into_iter().next());
            let key = match key {
                Some(k) if k.kind() == "literal_element" => named_children(k).into_iter().next(),
                other => other,
            };
            if let Some(key) = key.filter(|k| matches!(k.kind(), "identifier" | "field_identifier")) {
                uses.push(key);
            }
        }

        uses.retain(|n| seen.insert(n.id()));
        uses
    }

    /// Struct tags drive encoders through reflection, and so does any
    /// `reflect.*` call in the file.
    fn has_dynamic_access(&self, class: Node, source: &[u8]) -> bool {
        let tagged = field_declarations(class)
            .into_iter()
            .any(|decl| decl.child_by_field_name("tag").is_some());
        if tagged {
            return true;
        }
        collect_descendants(root_of(class), &["selector_expression"])
            .into_iter()
            .any(|sel| {
                sel.child_by_field_name("operand")
                    .is_some_and(|o| node_text(o, source) == "reflect")
            })
    }

    fn field_heuristic(&self) -> FieldHeuristic {
        FieldHeuristic::OccurrenceCount
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::Language;
    use crate::deadcode::{analyze_fine_grained, FineGrainedIssue, IssueKind};
    use std::path::Path;

    fn analyze(source: &str) -> Vec<FineGrainedIssue> {
        let parsed = Language::Go
            .parse(Path::new("store.go"), source.as_bytes())
            .unwrap();
        analyze_fine_grained(&parsed, Language::Go)
    }

    fn names(issues: &[FineGrainedIssue], kind: IssueKind) -> Vec<&str> {
        issues
            .iter()
            .filter(|i| i.kind == kind)
            .map(|i| i.symbol_name.as_str())
            .collect()
    }

    const STORE: &str = r#"package store

import "sync"

type Store struct {
	mu    sync.Mutex
	items map[string]int
	stale bool
	Name  string
}

func (s *Store) Put(key string, value int, unused bool) {
	s.mu.Lock()
	defer s.mu.Unlock()
	old, ok := s.items[key]
	var count int
	for i, v := range s.items {
		_ = v
	}
	s.items[key] = value
	_ = ok
}
"#;

    #[test]
    fn test_unused_parameters_and_locals() {
        let issues = analyze(STORE);
        assert_eq!(names(&issues, IssueKind::UnusedParameter), vec!["unused"]);
        assert_eq!(
            names(&issues, IssueKind::UnusedLocalVariable),
            vec!["old", "count", "i"]
        );
    }

    #[test]
    fn test_receiver_is_not_a_parameter() {
        let source = "package p\n\ntype T struct{}\n\nfunc (t T) Name() string { return \"t\" }\n";
        assert!(analyze(source).is_empty());
    }

    #[test]
    fn test_private_field_occurrence_count() {
        let issues = analyze(STORE);
        let fields: Vec<_> = issues
            .iter()
            .filter(|i| i.kind == IssueKind::UnusedPrivateField)
            .collect();
        assert_eq!(fields.len(), 1);
        assert_eq!(fields[0].symbol_name, "stale");
        assert_eq!(fields[0].class_name.as_deref(), Some("Store"));
        assert_eq!(fields[0].line, 8);
    }

    #[test]
    fn test_composite_literal_key_counts() {
        let source = r#"package p

type point struct {
	x int
	y int
}

func origin() point {
	return point{x: 0}
}
"#;
        assert_eq!(names(&analyze(source), IssueKind::UnusedPrivateField), vec!["y"]);
    }

    #[test]
    fn test_struct_tags_and_reflect_suppress_fields() {
        let tagged = "package p\n\ntype Config struct {\n\thost string `json:\"host\"`\n}\n";
        assert!(names(&analyze(tagged), IssueKind::UnusedPrivateField).is_empty());

        let reflective = r#"package p

import "reflect"

type hidden struct {
	secret string
}

func inspect(v any) string {
	return reflect.TypeOf(v).Name()
}
"#;
        assert!(names(&analyze(reflective), IssueKind::UnusedPrivateField).is_empty());
    }

    #[test]
    fn test_func_literal_parameters() {
        let source = r#"package p

func run() {
	handler := func(event string, ctx int) {
		println(event)
	}
	handler("x", 1)
}
"#;
        assert_eq!(names(&analyze(source), IssueKind::UnusedParameter), vec!["ctx"]);
    }

    #[test]
    fn test_is_unexported() {
        assert!(is_unexported("count"));
        assert!(!is_unexported("Count"));
        assert!(!is_unexported(""));
    }

    #[test]
    fn test_short_var_redeclaration_is_not_a_use() {
        let source = r#"
package store

func load() (int, int) {
	a, err := first()
	b, err := second()
	return a, b
}
"#;
        let issues = analyze(source);
        let found: Vec<(&str, usize)> = issues
            .iter()
            .map(|i| (i.symbol_name.as_str(), i.line))
            .collect();
        assert_eq!(found, vec![("err", 5)]);
        assert_eq!(issues[0].kind, IssueKind::UnusedLocalVariable);
    }
}
