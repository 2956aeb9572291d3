//! Java scope policy.

use tree_sitter::Node;

use crate::analysis::{collect_descendants, direct_children, named_children, node_text};
use crate::deadcode::policy::{is_field_of_parent, FieldDecl, NodeRole, ScopePolicy};

/// Reflection calls that read or open up fields by name.
const REFLECTIVE_CALLS: &[&str] = &[
    "getDeclaredField",
    "getDeclaredFields",
    "getField",
    "getFields",
    "setAccessible",
];

/// Serialization reads this field reflectively.
const SERIAL_VERSION_UID: &str = "serialVersionUID";

const SELF_NAMES: &[&str] = &["this"];

/// Code-bearing members whose identifiers count as field uses.
const METHOD_KINDS: &[&str] = &[
    "method_declaration",
    "constructor_declaration",
    "compact_constructor_declaration",
    "static_initializer",
];

/// Grammar node kinds the Java policy distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum JavaKind {
    MethodDeclaration,
    ConstructorDeclaration,
    LambdaExpression,
    ClassDeclaration,
    EnumDeclaration,
    RecordDeclaration,
    LocalVariableDeclaration,
    EnhancedForStatement,
    Identifier,
    Other,
}

impl JavaKind {
    fn of(node: Node) -> Self {
        match node.kind() {
            "method_declaration" => JavaKind::MethodDeclaration,
            "constructor_declaration" | "compact_constructor_declaration" => {
                JavaKind::ConstructorDeclaration
            }
            "lambda_expression" => JavaKind::LambdaExpression,
            "class_declaration" => JavaKind::ClassDeclaration,
            "enum_declaration" => JavaKind::EnumDeclaration,
            "record_declaration" => JavaKind::RecordDeclaration,
            "local_variable_declaration" => JavaKind::LocalVariableDeclaration,
            "enhanced_for_statement" => JavaKind::EnhancedForStatement,
            "identifier" => JavaKind::Identifier,
            _ => JavaKind::Other,
        }
    }
}

/// Member declarations of a class, enum or record body.
fn members(class: Node) -> Vec<Node> {
    let Some(body) = class.child_by_field_name("body") else {
        return Vec::new();
    };
    let mut members = Vec::new();
    for child in named_children(body) {
        if child.kind() == "enum_body_declarations" {
            members.extend(named_children(child));
        } else {
            members.push(child);
        }
    }
    members
}

fn is_private(declaration: Node, source: &[u8]) -> bool {
    direct_children(declaration, "modifiers")
        .into_iter()
        .any(|mods| {
            let mut cursor = mods.walk();
            let private = mods
                .children(&mut cursor)
                .any(|m| node_text(m, source) == "private");
            private
        })
}

pub struct JavaPolicy;

impl ScopePolicy for JavaPolicy {
    fn role(&self, node: Node) -> NodeRole {
        match JavaKind::of(node) {
            JavaKind::MethodDeclaration
            | JavaKind::ConstructorDeclaration
            | JavaKind::LambdaExpression => NodeRole::Function,
            JavaKind::ClassDeclaration | JavaKind::EnumDeclaration | JavaKind::RecordDeclaration => {
                NodeRole::Class
            }
            JavaKind::LocalVariableDeclaration
            | JavaKind::EnhancedForStatement
            | JavaKind::Identifier
            | JavaKind::Other => NodeRole::Other,
        }
    }

    fn self_names(&self) -> &'static [&'static str] {
        SELF_NAMES
    }

    /// Abstract and interface methods have no body.
    fn body<'t>(&self, function: Node<'t>) -> Option<Node<'t>> {
        function.child_by_field_name("body")
    }

    fn parameters<'t>(&self, function: Node<'t>) -> Vec<Node<'t>> {
        let Some(params) = function.child_by_field_name("parameters") else {
            return Vec::new();
        };
        // `x -> ...`
        if params.kind() == "identifier" {
            return vec![params];
        }
        named_children(params)
            .into_iter()
            .filter_map(|param| match param.kind() {
                "identifier" => Some(param),
                "formal_parameter" => param.child_by_field_name("name"),
                "spread_parameter" => direct_children(param, "variable_declarator")
                    .into_iter()
                    .next()
                    .and_then(|d| d.child_by_field_name("name")),
                _ => None,
            })
            .collect()
    }

    fn local_bindings<'t>(&self, node: Node<'t>) -> Vec<Node<'t>> {
        match JavaKind::of(node) {
            JavaKind::LocalVariableDeclaration => direct_children(node, "variable_declarator")
                .into_iter()
                .filter_map(|d| d.child_by_field_name("name"))
                .collect(),
            JavaKind::EnhancedForStatement => node.child_by_field_name("name").into_iter().collect(),
            _ => Vec::new(),
        }
    }

    fn is_use(&self, node: Node) -> bool {
        JavaKind::of(node) == JavaKind::Identifier
            && !is_field_of_parent(node, "method_invocation", "name")
            && !is_field_of_parent(node, "field_access", "field")
    }

    fn private_fields<'t>(&self, class: Node<'t>, source: &[u8]) -> Vec<FieldDecl<'t>> {
        members(class)
            .into_iter()
            .filter(|m| m.kind() == "field_declaration" && is_private(*m, source))
            .flat_map(|m| direct_children(m, "variable_declarator"))
            .filter_map(|d| d.child_by_field_name("name"))
            .map(|name| FieldDecl::new(name, source))
            .filter(|f| f.name != SERIAL_VERSION_UID)
            .collect()
    }

    /// Identifiers inside methods, constructors and initializers, including
    /// those of nested classes.
    fn field_uses<'t>(&self, class: Node<'t>, _source: &[u8]) -> Vec<Node<'t>> {
        let Some(body) = class.child_by_field_name("body") else {
            return Vec::new();
        };
        let mut uses = Vec::new();
        let mut seen = std::collections::HashSet::new();
        for method in collect_descendants(body, METHOD_KINDS) {
            for ident in collect_descendants(method, &["identifier"]) {
                if seen.insert(ident.id()) {
                    uses.push(ident);
                }
            }
        }
        uses
    }

    fn has_dynamic_access(&self, class: Node, source: &[u8]) -> bool {
        collect_descendants(class, &["method_invocation"])
            .into_iter()
            .any(|call| {
                call.child_by_field_name("name")
                    .is_some_and(|n| REFLECTIVE_CALLS.contains(&node_text(n, source)))
            })
    }
}

#[cfg(test)]
mod tests {
    use crate::analysis::Language;
    use crate::deadcode::{analyze_fine_grained, FineGrainedIssue, IssueKind};
    use std::path::Path;

    fn analyze(source: &str) -> Vec<FineGrainedIssue> {
        let parsed = Language::Java
            .parse(Path::new("Account.java"), source.as_bytes())
            .unwrap();
        analyze_fine_grained(&parsed, Language::Java)
    }

    fn names(issues: &[FineGrainedIssue], kind: IssueKind) -> Vec<&str> {
        issues
            .iter()
            .filter(|i| i.kind == kind)
            .map(|i| i.symbol_name.as_str())
            .collect()
    }

    const ACCOUNT: &str = r#"public class Account implements java.io.Serializable {
    private static final long serialVersionUID = 1L;
    private long balance;
    private String owner;
    private int audits, _reserved;
    public String label;

    public Account(String owner, boolean verbose) {
        this.owner = owner;
    }

    public long deposit(long amount, String memo) {
        long previous = balance;
        int attempts = 0;
        for (String entry : history()) {}
        balance += amount;
        return balance;
    }

    private java.util.List<String> history() {
        return java.util.List.of(owner);
    }
}
"#;

    #[test]
    fn test_unused_parameters_and_locals() {
        let issues = analyze(ACCOUNT);
        assert_eq!(
            names(&issues, IssueKind::UnusedParameter),
            vec!["verbose", "memo"]
        );
        assert_eq!(
            names(&issues, IssueKind::UnusedLocalVariable),
            vec!["previous", "attempts", "entry"]
        );
    }

    #[test]
    fn test_unused_private_fields() {
        let issues = analyze(ACCOUNT);
        let fields: Vec<_> = issues
            .iter()
            .filter(|i| i.kind == IssueKind::UnusedPrivateField)
            .collect();
        assert_eq!(fields.len(), 1);
        assert_eq!(fields[0].symbol_name, "audits");
        assert_eq!(fields[0].class_name.as_deref(), Some("Account"));
        assert_eq!(fields[0].line, 5);
    }

    #[test]
    fn test_reflection_suppresses_fields() {
        let source = r#"class Mapper {
    private String hidden;

    Object read(Object target) throws Exception {
        var field = getClass().getDeclaredField("hidden");
        field.setAccessible(true);
        return field.get(target);
    }
}
"#;
        assert!(names(&analyze(source), IssueKind::UnusedPrivateField).is_empty());
    }

    #[test]
    fn test_interface_and_abstract_methods_are_skipped() {
        let source = r#"interface Handler {
    void handle(String event);
}

abstract class Base {
    abstract void run(String input);
}
"#;
        assert!(analyze(source).is_empty());
    }

    #[test]
    fn test_lambda_parameters() {
        let source = r#"class Streams {
    void run(java.util.List<String> items) {
        items.forEach((item) -> System.out.println("x"));
        items.removeIf(s -> s.isEmpty());
    }
}
"#;
        assert_eq!(names(&analyze(source), IssueKind::UnusedParameter), vec!["item"]);
    }

    #[test]
    fn test_inner_class_method_uses_outer_field() {
        let source = r#"class Outer {
    private int count;

    class Inner {
        int read() { return count; }
    }
}
"#;
        assert!(names(&analyze(source), IssueKind::UnusedPrivateField).is_empty());
    }
}
