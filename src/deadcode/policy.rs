//! The per-language seam of the scope engine.
//!
//! A policy tells the generic engine which nodes open scopes, which nodes
//! bind and which use names, what "private" means for a field, and which
//! idioms make static field analysis unreliable for a class.

use tree_sitter::Node;

use crate::analysis::node_text;

/// Role a syntax node plays for scope analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeRole {
    /// Function, method or closure: owns a parameter/local scope.
    Function,
    /// Class-like body: owns private fields.
    Class,
    Other,
}

/// How unused private fields are decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldHeuristic {
    /// A field is used when any access other than its declaration names it.
    DeclarationVsUse,
    /// A field is unused when its name occurs at most once, declaration
    /// included.
    OccurrenceCount,
}

/// A private field declaration found in a class.
#[derive(Debug, Clone)]
pub struct FieldDecl<'t> {
    pub name: String,
    pub node: Node<'t>,
}

impl<'t> FieldDecl<'t> {
    pub fn new(node: Node<'t>, source: &[u8]) -> Self {
        Self {
            name: node_text(node, source).to_string(),
            node,
        }
    }

    /// 1-based declaration line.
    pub fn line(&self) -> usize {
        self.node.start_position().row + 1
    }
}

/// Language-specific tables and predicates for the scope engine.
///
/// Implementations are stateless; one static instance per language.
pub trait ScopePolicy: Send + Sync {
    /// Classify a node.
    fn role(&self, node: Node) -> NodeRole;

    /// Parameter names that refer to the receiving instance.
    fn self_names(&self) -> &'static [&'static str];

    /// Body of a function node, or `None` for abstract, interface and
    /// ambient declarations.
    fn body<'t>(&self, function: Node<'t>) -> Option<Node<'t>>;

    /// Identifier nodes declaring the function's parameters.
    fn parameters<'t>(&self, function: Node<'t>) -> Vec<Node<'t>>;

    /// Identifier nodes bound as locals by `node` itself.
    fn local_bindings<'t>(&self, node: Node<'t>) -> Vec<Node<'t>>;

    /// Whether `node` is an identifier occurrence that reads a name.
    fn is_use(&self, node: Node) -> bool;

    /// Display name of a class node.
    fn class_name(&self, class: Node, source: &[u8]) -> Option<String> {
        class
            .child_by_field_name("name")
            .map(|n| node_text(n, source).to_string())
    }

    /// Private field declarations of a class.
    fn private_fields<'t>(&self, class: Node<'t>, source: &[u8]) -> Vec<FieldDecl<'t>>;

    /// Nodes naming a field that count toward its usage.
    fn field_uses<'t>(&self, class: Node<'t>, source: &[u8]) -> Vec<Node<'t>>;

    /// Whether the class uses an idiom that defeats static field analysis.
    fn has_dynamic_access(&self, class: Node, source: &[u8]) -> bool;

    fn field_heuristic(&self) -> FieldHeuristic {
        FieldHeuristic::DeclarationVsUse
    }

    /// Whether a leading underscore is itself the privacy marker for fields.
    fn underscore_marks_privacy(&self) -> bool {
        false
    }
}

/// Parameters and locals named `_` or starting with `_` are never reported.
pub fn ignored_by_underscore(name: &str) -> bool {
    name.starts_with('_')
}

/// Whether a private field is exempt from reporting by naming convention.
pub fn field_ignored_by_underscore(policy: &dyn ScopePolicy, name: &str) -> bool {
    name == "_" || (name.starts_with('_') && !policy.underscore_marks_privacy())
}

/// Expand a destructuring pattern into the identifier nodes it binds.
///
/// `expand` maps one pattern node to its sub-patterns; identifier kinds in
/// `leaf_kinds` are bindings.
pub fn pattern_bindings<'t>(
    pattern: Node<'t>,
    leaf_kinds: &[&str],
    expand: impl Fn(Node<'t>) -> Vec<Node<'t>>,
) -> Vec<Node<'t>> {
    let mut bindings = Vec::new();
    let mut stack = vec![pattern];
    while let Some(node) = stack.pop() {
        if leaf_kinds.contains(&node.kind()) {
            bindings.push(node);
            continue;
        }
        let parts = expand(node);
        stack.extend(parts.into_iter().rev());
    }
    bindings
}

/// Whether `node` is attached to its parent under `field`.
pub fn is_field_of_parent(node: Node, parent_kind: &str, field: &str) -> bool {
    node.parent()
        .filter(|p| p.kind() == parent_kind)
        .and_then(|p| p.child_by_field_name(field))
        .is_some_and(|child| child.id() == node.id())
}
