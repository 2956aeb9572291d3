//! Python scope policy.

use tree_sitter::Node;

use crate::analysis::{collect_descendants, named_children, node_text};
use crate::deadcode::policy::{
    is_field_of_parent, pattern_bindings, FieldDecl, NodeRole, ScopePolicy,
};

/// Builtins whose use on an instance makes field access dynamic.
const DYNAMIC_ACCESSORS: &[&str] = &["getattr", "setattr", "delattr", "hasattr", "vars"];

const SELF_NAMES: &[&str] = &["self", "cls"];

/// Grammar node kinds the Python policy distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PyKind {
    FunctionDefinition,
    Lambda,
    ClassDefinition,
    Assignment,
    ForStatement,
    NamedExpression,
    AsPattern,
    Identifier,
    Attribute,
    Call,
    Other,
}

impl PyKind {
    fn of(node: Node) -> Self {
        match node.kind() {
            "function_definition" => PyKind::FunctionDefinition,
            "lambda" => PyKind::Lambda,
            "class_definition" => PyKind::ClassDefinition,
            "assignment" => PyKind::Assignment,
            "for_statement" => PyKind::ForStatement,
            "named_expression" => PyKind::NamedExpression,
            "as_pattern" => PyKind::AsPattern,
            "identifier" => PyKind::Identifier,
            "attribute" => PyKind::Attribute,
            "call" => PyKind::Call,
            _ => PyKind::Other,
        }
    }
}

pub struct PythonPolicy;

impl PythonPolicy {
    /// `_x` and `__x` are private; dunder names are not.
    pub fn is_private(name: &str) -> bool {
        name.starts_with('_') && !(name.starts_with("__") && name.ends_with("__"))
    }

    fn targets<'t>(pattern: Node<'t>) -> Vec<Node<'t>> {
        pattern_bindings(pattern, &["identifier"], |node| match node.kind() {
            "pattern_list" | "tuple_pattern" | "list_pattern" | "list_splat_pattern" => {
                named_children(node)
            }
            _ => Vec::new(),
        })
    }

    fn methods<'t>(class: Node<'t>) -> Vec<Node<'t>> {
        class
            .child_by_field_name("body")
            .map(|body| collect_descendants(body, &["function_definition"]))
            .unwrap_or_default()
    }
}

impl ScopePolicy for PythonPolicy {
    fn role(&self, node: Node) -> NodeRole {
        match PyKind::of(node) {
            PyKind::FunctionDefinition | PyKind::Lambda => NodeRole::Function,
            PyKind::ClassDefinition => NodeRole::Class,
            PyKind::Assignment
            | PyKind::ForStatement
            | PyKind::NamedExpression
            | PyKind::AsPattern
            | PyKind::Identifier
            | PyKind::Attribute
            | PyKind::Call
            | PyKind::Other => NodeRole::Other,
        }
    }

    fn self_names(&self) -> &'static [&'static str] {
        SELF_NAMES
    }

    fn body<'t>(&self, function: Node<'t>) -> Option<Node<'t>> {
        function.child_by_field_name("body")
    }

    fn parameters<'t>(&self, function: Node<'t>) -> Vec<Node<'t>> {
        let Some(params) = function.child_by_field_name("parameters") else {
            return Vec::new();
        };
        named_children(params)
            .into_iter()
            .filter_map(|param| match param.kind() {
                "identifier" => Some(param),
                "default_parameter" | "typed_default_parameter" => {
                    param.child_by_field_name("name")
                }
                "list_splat_pattern" | "dictionary_splat_pattern" => {
                    named_children(param).into_iter().next()
                }
                "typed_parameter" => named_children(param).into_iter().next().and_then(|n| {
                    match n.kind() {
                        "list_splat_pattern" | "dictionary_splat_pattern" => {
                            named_children(n).into_iter().next()
                        }
                        _ => Some(n),
                    }
                }),
                _ => None,
            })
            .filter(|n| n.kind() == "identifier")
            .collect()
    }

    fn local_bindings<'t>(&self, node: Node<'t>) -> Vec<Node<'t>> {
        let target = match PyKind::of(node) {
            PyKind::Assignment | PyKind::ForStatement => node.child_by_field_name("left"),
            PyKind::NamedExpression => node.child_by_field_name("name"),
            PyKind::AsPattern => node
                .child_by_field_name("alias")
                .and_then(|alias| named_children(alias).into_iter().next()),
            _ => None,
        };
        target.map(Self::targets).unwrap_or_default()
    }

    fn is_use(&self, node: Node) -> bool {
        PyKind::of(node) == PyKind::Identifier
            && !is_field_of_parent(node, "attribute", "attribute")
            && !is_field_of_parent(node, "keyword_argument", "name")
    }

    fn private_fields<'t>(&self, class: Node<'t>, source: &[u8]) -> Vec<FieldDecl<'t>> {
        let Some(body) = class.child_by_field_name("body") else {
            return Vec::new();
        };
        let mut fields = Vec::new();

        // Class-level attributes.
        for stmt in named_children(body) {
            if stmt.kind() != "expression_statement" {
                continue;
            }
            for assign in named_children(stmt) {
                if PyKind::of(assign) != PyKind::Assignment {
                    continue;
                }
                if let Some(left) = assign.child_by_field_name("left") {
                    fields.extend(
                        Self::targets(left)
                            .into_iter()
                            .map(|n| FieldDecl::new(n, source)),
                    );
                }
            }
        }

        // Instance attributes assigned through self.
        for method in Self::methods(class) {
            for assign in collect_descendants(method, &["assignment"]) {
                let Some(left) = assign.child_by_field_name("left") else {
                    continue;
                };
                let attributes = if PyKind::of(left) == PyKind::Attribute {
                    vec![left]
                } else {
                    named_children(left)
                        .into_iter()
                        .filter(|n| PyKind::of(*n) == PyKind::Attribute)
                        .collect()
                };
                for attr in attributes {
                    let on_self = attr
                        .child_by_field_name("object")
                        .is_some_and(|o| SELF_NAMES.contains(&node_text(o, source)));
                    if let Some(name) = attr.child_by_field_name("attribute").filter(|_| on_self) {
                        fields.push(FieldDecl::new(name, source));
                    }
                }
            }
        }

        fields.retain(|f| Self::is_private(&f.name));
        fields
    }

    fn field_uses<'t>(&self, class: Node<'t>, _source: &[u8]) -> Vec<Node<'t>> {
        Self::methods(class)
            .into_iter()
            .flat_map(|method| collect_descendants(method, &["attribute"]))
            .filter_map(|attr| attr.child_by_field_name("attribute"))
            .collect()
    }

    fn has_dynamic_access(&self, class: Node, source: &[u8]) -> bool {
        let dynamic_call = collect_descendants(class, &["call"]).into_iter().any(|call| {
            call.child_by_field_name("function")
                .filter(|f| PyKind::of(*f) == PyKind::Identifier)
                .is_some_and(|f| DYNAMIC_ACCESSORS.contains(&node_text(f, source)))
        });
        let dict_access = collect_descendants(class, &["attribute"]).into_iter().any(|attr| {
            attr.child_by_field_name("attribute")
                .is_some_and(|a| node_text(a, source) == "__dict__")
        });
        dynamic_call || dict_access
    }

    fn underscore_marks_privacy(&self) -> bool {
        true
    }
}
