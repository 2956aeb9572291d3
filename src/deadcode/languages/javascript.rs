//! JavaScript scope policy, plus the ECMAScript pieces TypeScript reuses.

use tree_sitter::Node;

use crate::analysis::{collect_descendants, direct_children, named_children, node_text};
use crate::deadcode::policy::{pattern_bindings, FieldDecl, NodeRole, ScopePolicy};

/// `Object.*` helpers that enumerate or copy an instance's own fields.
const OBJECT_REFLECTION: &[&str] = &["keys", "values", "entries", "assign", "getOwnPropertyNames"];

const SELF_NAMES: &[&str] = &["this"];

/// Grammar node kinds shared by the JavaScript and TypeScript grammars.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum EcmaKind {
    FunctionDeclaration,
    FunctionExpression,
    GeneratorFunction,
    ArrowFunction,
    MethodDefinition,
    ClassDeclaration,
    AbstractClassDeclaration,
    ClassExpression,
    VariableDeclarator,
    ForInStatement,
    Identifier,
    ShorthandPropertyIdentifier,
    MemberExpression,
    SubscriptExpression,
    CallExpression,
    Other,
}

impl EcmaKind {
    pub(super) fn of(node: Node) -> Self {
        match node.kind() {
            "function_declaration" => EcmaKind::FunctionDeclaration,
            "function_expression" | "function" => EcmaKind::FunctionExpression,
            "generator_function_declaration" | "generator_function" => EcmaKind::GeneratorFunction,
            "arrow_function" => EcmaKind::ArrowFunction,
            "method_definition" => EcmaKind::MethodDefinition,
            "class_declaration" => EcmaKind::ClassDeclaration,
            "abstract_class_declaration" => EcmaKind::AbstractClassDeclaration,
            "class" => EcmaKind::ClassExpression,
            "variable_declarator" => EcmaKind::VariableDeclarator,
            "for_in_statement" => EcmaKind::ForInStatement,
            "identifier" => EcmaKind::Identifier,
            "shorthand_property_identifier" => EcmaKind::ShorthandPropertyIdentifier,
            "member_expression" => EcmaKind::MemberExpression,
            "subscript_expression" => EcmaKind::SubscriptExpression,
            "call_expression" => EcmaKind::CallExpression,
            _ => EcmaKind::Other,
        }
    }

    pub(super) fn role(self) -> NodeRole {
        match self {
            EcmaKind::FunctionDeclaration
            | EcmaKind::FunctionExpression
            | EcmaKind::GeneratorFunction
            | EcmaKind::ArrowFunction
            | EcmaKind::MethodDefinition => NodeRole::Function,
            EcmaKind::ClassDeclaration
            | EcmaKind::AbstractClassDeclaration
            | EcmaKind::ClassExpression => NodeRole::Class,
            EcmaKind::VariableDeclarator
            | EcmaKind::ForInStatement
            | EcmaKind::Identifier
            | EcmaKind::ShorthandPropertyIdentifier
            | EcmaKind::MemberExpression
            | EcmaKind::SubscriptExpression
            | EcmaKind::CallExpression
            | EcmaKind::Other => NodeRole::Other,
        }
    }
}

/// Identifiers bound by a destructuring pattern.
pub(super) fn pattern_names<'t>(pattern: Node<'t>) -> Vec<Node<'t>> {
    pattern_bindings(
        pattern,
        &["identifier", "shorthand_property_identifier_pattern"],
        |node| match node.kind() {
            "object_pattern" | "array_pattern" | "rest_pattern" => named_children(node),
            "pair_pattern" => node.child_by_field_name("value").into_iter().collect(),
            "assignment_pattern" | "object_assignment_pattern" => {
                node.child_by_field_name("left").into_iter().collect()
            }
            _ => Vec::new(),
        },
    )
}

/// Parameter nodes of a function, before pattern expansion.
pub(super) fn parameter_nodes<'t>(function: Node<'t>) -> Vec<Node<'t>> {
    if let Some(single) = function.child_by_field_name("parameter") {
        return vec![single];
    }
    function
        .child_by_field_name("parameters")
        .map(named_children)
        .unwrap_or_default()
}

pub(super) fn local_bindings<'t>(node: Node<'t>) -> Vec<Node<'t>> {
    match EcmaKind::of(node) {
        EcmaKind::VariableDeclarator => node
            .child_by_field_name("name")
            .map(pattern_names)
            .unwrap_or_default(),
        // Only `for (const x of ...)` declares; `for (x of ...)` assigns.
        EcmaKind::ForInStatement if node.child_by_field_name("kind").is_some() => node
            .child_by_field_name("left")
            .map(pattern_names)
            .unwrap_or_default(),
        _ => Vec::new(),
    }
}

pub(super) fn is_use(node: Node) -> bool {
    matches!(
        EcmaKind::of(node),
        EcmaKind::Identifier | EcmaKind::ShorthandPropertyIdentifier
    )
}

pub(super) fn class_body<'t>(class: Node<'t>) -> Option<Node<'t>> {
    class.child_by_field_name("body")
}

/// Property names accessed through member expressions inside methods.
///
/// Field initializers are not methods, so they never count.
pub(super) fn field_uses<'t>(class: Node<'t>) -> Vec<Node<'t>> {
    let Some(body) = class_body(class) else {
        return Vec::new();
    };
    let mut uses = Vec::new();
    for method in collect_descendants(body, &["method_definition"]) {
        for node in collect_descendants(method, &["member_expression", "private_property_identifier"]) {
            match EcmaKind::of(node) {
                EcmaKind::MemberExpression => uses.extend(node.child_by_field_name("property")),
                // `#x in obj` checks
                _ if node.parent().is_some_and(|p| p.kind() != "member_expression") => {
                    uses.push(node)
                }
                _ => {}
            }
        }
    }
    uses
}

/// `this[...]`, `Reflect.*` or `Object.keys(this)`-style access in the class.
pub(super) fn has_dynamic_access(class: Node, source: &[u8]) -> bool {
    let is_this = |node: Option<Node>| node.is_some_and(|n| n.kind() == "this");
    let kinds = ["subscript_expression", "member_expression", "call_expression"];

    collect_descendants(class, &kinds).into_iter().any(|node| match EcmaKind::of(node) {
        EcmaKind::SubscriptExpression => is_this(node.child_by_field_name("object")),
        EcmaKind::MemberExpression => node
            .child_by_field_name("object")
            .is_some_and(|o| node_text(o, source) == "Reflect"),
        EcmaKind::CallExpression => {
            let Some(callee) = node
                .child_by_field_name("function")
                .filter(|f| EcmaKind::of(*f) == EcmaKind::MemberExpression)
            else {
                return false;
            };
            let on_object = callee
                .child_by_field_name("object")
                .is_some_and(|o| node_text(o, source) == "Object");
            let reflective = callee
                .child_by_field_name("property")
                .is_some_and(|p| OBJECT_REFLECTION.contains(&node_text(p, source)));
            let first_arg = node
                .child_by_field_name("arguments")
                .and_then(|args| named_children(args).into_iter().next());
            on_object && reflective && is_this(first_arg)
        }
        _ => false,
    })
}

pub struct JavaScriptPolicy;

impl ScopePolicy for JavaScriptPolicy {
    fn role(&self, node: Node) -> NodeRole {
        EcmaKind::of(node).role()
    }

    fn self_names(&self) -> &'static [&'static str] {
        SELF_NAMES
    }

    fn body<'t>(&self, function: Node<'t>) -> Option<Node<'t>> {
        function.child_by_field_name("body")
    }

    fn parameters<'t>(&self, function: Node<'t>) -> Vec<Node<'t>> {
        parameter_nodes(function)
            .into_iter()
            .flat_map(pattern_names)
            .collect()
    }

    fn local_bindings<'t>(&self, node: Node<'t>) -> Vec<Node<'t>> {
        local_bindings(node)
    }

    fn is_use(&self, node: Node) -> bool {
        is_use(node)
    }

    fn private_fields<'t>(&self, class: Node<'t>, source: &[u8]) -> Vec<FieldDecl<'t>> {
        let Some(body) = class_body(class) else {
            return Vec::new();
        };
        direct_children(body, "field_definition")
            .into_iter()
            .filter_map(|field| field.child_by_field_name("property"))
            .filter(|name| name.kind() == "private_property_identifier")
            .map(|name| FieldDecl::new(name, source))
            .collect()
    }

    fn field_uses<'t>(&self, class: Node<'t>, _source: &[u8]) -> Vec<Node<'t>> {
        field_uses(class)
    }

    fn has_dynamic_access(&self, class: Node, source: &[u8]) -> bool {
        has_dynamic_access(class, source)
    }
}

#[cfg(test)]
mod tests {
    use crate::analysis::Language;
    use crate::deadcode::{analyze_fine_grained, FineGrainedIssue, IssueKind};
    use std::path::Path;

    fn analyze(source: &str) -> Vec<FineGrainedIssue> {
        let parsed = Language::JavaScript
            .parse(Path::new("test.js"), source.as_bytes())
            .unwrap();
        analyze_fine_grained(&parsed, Language::JavaScript)
    }

    fn names(issues: &[FineGrainedIssue], kind: IssueKind) -> Vec<&str> {
        issues
            .iter()
            .filter(|i| i.kind == kind)
            .map(|i| i.symbol_name.as_str())
            .collect()
    }

    #[test]
    fn test_unused_parameters_and_locals() {
        let source = r#"
function handle(req, res, _next) {
  const { body, headers: h, ...rest } = req;
  let [first, , third = 1] = body.items;
  for (const key of Object.keys(h)) {}
  const unused = 42;
  return first;
}
"#;
        let issues = analyze(source);
        assert_eq!(names(&issues, IssueKind::UnusedParameter), vec!["res"]);
        assert_eq!(
            names(&issues, IssueKind::UnusedLocalVariable),
            vec!["rest", "third", "key", "unused"]
        );
    }

    #[test]
    fn test_arrow_functions_and_closures() {
        let source = r#"
const add = (a, b) => a;
const make = (x) => () => x;
items.map(item => item.id);
"#;
        let issues = analyze(source);
        assert_eq!(names(&issues, IssueKind::UnusedParameter), vec!["b"]);
    }

    #[test]
    fn test_shorthand_property_counts_as_use() {
        let source = r#"
function build(name) {
  const age = 3;
  return { name, age };
}
"#;
        assert!(analyze(source).is_empty());
    }

    #[test]
    fn test_unused_private_field() {
        let source = r#"
class Counter {
  #count = 0;
  #step = 1;
  #label = "counter";
  label = this.#label;

  increment() {
    this.#count += this.#step;
    return this.#count;
  }
}
"#;
        let issues = analyze(source);
        let fields: Vec<_> = issues
            .iter()
            .filter(|i| i.kind == IssueKind::UnusedPrivateField)
            .collect();
        assert_eq!(fields.len(), 1);
        assert_eq!(fields[0].symbol_name, "#label");
        assert_eq!(fields[0].class_name.as_deref(), Some("Counter"));
        assert_eq!(fields[0].line, 5);
    }

    #[test]
    fn test_dynamic_access_suppresses_fields() {
        for access in ["this[key]", "Reflect.get(this, key)", "Object.keys(this)"] {
            let source = format!(
                "class Bag {{\n  #hidden = 1;\n  read(key) {{\n    return {};\n  }}\n}}\n",
                access
            );
            let issues = analyze(&source);
            assert!(
                names(&issues, IssueKind::UnusedPrivateField).is_empty(),
                "{} should suppress field reports",
                access
            );
        }
    }

    #[test]
    fn test_redeclaration_is_not_a_use() {
        let source = r#"
function reset() {
  var count = 1;
  var count = 2;
}
"#;
        let issues = analyze(source);
        assert_eq!(names(&issues, IssueKind::UnusedLocalVariable), vec!["count"]);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].line, 3);
    }
}
