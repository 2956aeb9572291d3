//! The generic scope/usage algorithm.
//!
//! One pass over the tree finds every function-like and class-like node.
//! Functions get a [`ScopeData`] of declared parameters/locals and used
//! names; classes get a private-field check. All language differences come
//! from the [`ScopePolicy`].

use std::collections::{HashMap, HashSet};

use tree_sitter::Node;

use super::policy::{
    field_ignored_by_underscore, ignored_by_underscore, FieldHeuristic, NodeRole, ScopePolicy,
};
use super::{DeadCodeOptions, FineGrainedIssue, IssueKind};
use crate::analysis::{line_of, node_text, walk_pruned, ParsedFile};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolKind {
    Parameter,
    Local,
    PrivateField,
}

impl SymbolKind {
    fn issue_kind(self) -> IssueKind {
        match self {
            SymbolKind::Parameter => IssueKind::UnusedParameter,
            SymbolKind::Local => IssueKind::UnusedLocalVariable,
            SymbolKind::PrivateField => IssueKind::UnusedPrivateField,
        }
    }
}

/// A declared name inside one scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbol {
    pub name: String,
    pub kind: SymbolKind,
    pub line: usize,
    pub class_name: Option<String>,
}

/// Declarations and uses of one function, method or closure body.
#[derive(Debug, Default)]
pub struct ScopeData {
    pub declared: Vec<Symbol>,
    pub used: HashSet<String>,
}

impl ScopeData {
    fn declare(&mut self, name: &str, kind: SymbolKind, line: usize) {
        if name.is_empty() || self.declared.iter().any(|s| s.name == name) {
            return;
        }
        self.declared.push(Symbol {
            name: name.to_string(),
            kind,
            line,
            class_name: None,
        });
    }

    /// Declared symbols never used and not exempt by naming.
    pub fn unused(&self) -> impl Iterator<Item = &Symbol> {
        self.declared
            .iter()
            .filter(|s| !self.used.contains(&s.name) && !ignored_by_underscore(&s.name))
    }
}

/// Run every pass of the engine over one parsed file.
pub fn analyze(
    policy: &dyn ScopePolicy,
    parsed: &ParsedFile,
    options: &DeadCodeOptions,
) -> Vec<FineGrainedIssue> {
    let source = &parsed.source[..];
    let mut functions = Vec::new();
    let mut classes = Vec::new();
    walk_pruned(parsed.root(), |node| {
        match policy.role(node) {
            NodeRole::Function => functions.push(node),
            NodeRole::Class => classes.push(node),
            NodeRole::Other => {}
        }
        true
    });

    let mut issues = Vec::new();
    let report = |symbol: &Symbol| -> FineGrainedIssue {
        FineGrainedIssue {
            kind: symbol.kind.issue_kind(),
            file: parsed.path.clone(),
            line: symbol.line,
            symbol_name: symbol.name.clone(),
            class_name: symbol.class_name.clone(),
        }
    };

    if options.unused_parameters || options.unused_locals {
        for function in functions {
            let Some(scope) = function_scope(policy, function, source) else {
                continue;
            };
            issues.extend(
                scope
                    .unused()
                    .filter(|s| match s.kind {
                        SymbolKind::Parameter => options.unused_parameters,
                        SymbolKind::Local => options.unused_locals,
                        SymbolKind::PrivateField => false,
                    })
                    .map(report),
            );
        }
    }

    if options.unused_private_fields {
        for class in classes {
            issues.extend(unused_private_fields(policy, class, source).iter().map(report));
        }
    }

    issues.sort_by(|a, b| {
        (a.line, &a.symbol_name, a.kind).cmp(&(b.line, &b.symbol_name, b.kind))
    });
    issues.dedup();
    issues
}

/// Build the scope of one function. `None` when the policy skips it.
pub fn function_scope(policy: &dyn ScopePolicy, function: Node, source: &[u8]) -> Option<ScopeData> {
    let body = policy.body(function)?;
    let mut scope = ScopeData::default();
    let mut declaration_sites = HashSet::new();

    for param in policy.parameters(function) {
        declaration_sites.insert(param.id());
        let name = node_text(param, source);
        if policy.self_names().contains(&name) {
            continue;
        }
        scope.declare(name, SymbolKind::Parameter, line_of(param));
    }

    walk_pruned(body, |node| {
        for binding in policy.local_bindings(node) {
            declaration_sites.insert(binding.id());
            scope.declare(node_text(binding, source), SymbolKind::Local, line_of(binding));
        }
        node.id() == body.id() || policy.role(node) == NodeRole::Other
    });

    // Nested closures reading a name count as uses of it.
    walk_pruned(body, |node| {
        if policy.is_use(node) && !declaration_sites.contains(&node.id()) {
            scope.used.insert(node_text(node, source).to_string());
        }
        true
    });

    Some(scope)
}

/// Private fields of `class` that no counted access names.
pub fn unused_private_fields(policy: &dyn ScopePolicy, class: Node, source: &[u8]) -> Vec<Symbol> {
    if policy.has_dynamic_access(class, source) {
        return Vec::new();
    }

    let mut fields = policy.private_fields(class, source);
    if fields.is_empty() {
        return Vec::new();
    }
    // Keep the first declaration of each name.
    let mut seen = HashSet::new();
    fields.retain(|f| seen.insert(f.name.clone()));

    let uses = policy.field_uses(class, source);
    let unused: HashSet<&str> = match policy.field_heuristic() {
        FieldHeuristic::DeclarationVsUse => {
            let declaration_sites: HashSet<usize> = fields.iter().map(|f| f.node.id()).collect();
            let used: HashSet<&str> = uses
                .iter()
                .filter(|n| !declaration_sites.contains(&n.id()))
                .map(|n| node_text(*n, source))
                .collect();
            fields
                .iter()
                .map(|f| f.name.as_str())
                .filter(|name| !used.contains(name))
                .collect()
        }
        FieldHeuristic::OccurrenceCount => {
            let mut counts: HashMap<&str, usize> = HashMap::new();
            for node in &uses {
                *counts.entry(node_text(*node, source)).or_default() += 1;
            }
            fields
                .iter()
                .map(|f| f.name.as_str())
                .filter(|name| counts.get(name).copied().unwrap_or(0) <= 1)
                .collect()
        }
    };

    let class_name = policy.class_name(class, source);
    fields
        .iter()
        .filter(|f| unused.contains(f.name.as_str()) && !field_ignored_by_underscore(policy, &f.name))
        .map(|f| Symbol {
            name: f.name.clone(),
            kind: SymbolKind::PrivateField,
            line: f.line(),
            class_name: class_name.clone(),
        })
        .collect()
}
