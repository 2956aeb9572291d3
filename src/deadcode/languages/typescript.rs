//! TypeScript (and TSX) scope policy.
//!
//! Builds on the ECMAScript tables; adds typed parameters, the `private`
//! accessibility modifier and constructor parameter properties.

use tree_sitter::Node;

use super::javascript::{self as ecma, EcmaKind};
use crate::analysis::{direct_children, node_text};
use crate::deadcode::policy::{FieldDecl, NodeRole, ScopePolicy};

const SELF_NAMES: &[&str] = &["this"];

/// Accessibility modifier text of a parameter or field, if any.
fn accessibility<'s>(node: Node, source: &'s [u8]) -> Option<&'s str> {
    direct_children(node, "accessibility_modifier")
        .into_iter()
        .next()
        .map(|m| node_text(m, source))
}

/// Constructor parameters declared with an accessibility modifier.
fn parameter_properties<'t>(class_body: Node<'t>, source: &[u8]) -> Vec<Node<'t>> {
    direct_children(class_body, "method_definition")
        .into_iter()
        .filter(|m| {
            m.child_by_field_name("name")
                .is_some_and(|n| node_text(n, source) == "constructor")
        })
        .flat_map(ecma::parameter_nodes)
        .filter(|p| accessibility(*p, source).is_some())
        .collect()
}

pub struct TypeScriptPolicy;

impl ScopePolicy for TypeScriptPolicy {
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
        ecma::parameter_nodes(function)
            .into_iter()
            .filter_map(|param| match param.kind() {
                "required_parameter" | "optional_parameter" => {
                    // Parameter properties are fields, not parameters.
                    if !direct_children(param, "accessibility_modifier").is_empty() {
                        return None;
                    }
                    param.child_by_field_name("pattern")
                }
                _ => Some(param),
            })
            .flat_map(ecma::pattern_names)
            .collect()
    }

    fn local_bindings<'t>(&self, node: Node<'t>) -> Vec<Node<'t>> {
        ecma::local_bindings(node)
    }

    fn is_use(&self, node: Node) -> bool {
        ecma::is_use(node)
    }

    fn private_fields<'t>(&self, class: Node<'t>, source: &[u8]) -> Vec<FieldDecl<'t>> {
        let Some(body) = ecma::class_body(class) else {
            return Vec::new();
        };
        let mut fields = Vec::new();

        for field in direct_children(body, "public_field_definition") {
            let Some(name) = field.child_by_field_name("name") else {
                continue;
            };
            let private = name.kind() == "private_property_identifier"
                || accessibility(field, source) == Some("private");
            if private {
                fields.push(FieldDecl::new(name, source));
            }
        }

        for param in parameter_properties(body, source) {
            if accessibility(param, source) != Some("private") {
                continue;
            }
            let name = param
                .child_by_field_name("pattern")
                .filter(|p| p.kind() == "identifier");
            if let Some(name) = name {
                fields.push(FieldDecl::new(name, source));
            }
        }

        fields.sort_by_key(|f| f.node.start_byte());
        fields
    }

    fn field_uses<'t>(&self, class: Node<'t>, _source: &[u8]) -> Vec<Node<'t>> {
        ecma::field_uses(class)
    }

    fn has_dynamic_access(&self, class: Node, source: &[u8]) -> bool {
        ecma::has_dynamic_access(class, source)
    }
}

#[cfg(test)]
mod tests {
    use crate::analysis::Language;
    use crate::deadcode::{analyze_fine_grained, FineGrainedIssue, IssueKind};
    use std::path::Path;

    fn analyze(language: Language, source: &str) -> Vec<FineGrainedIssue> {
        let parsed = language.parse(Path::new("test.ts"), source.as_bytes()).unwrap();
        analyze_fine_grained(&parsed, language)
    }

    fn names(issues: &[FineGrainedIssue], kind: IssueKind) -> Vec<&str> {
        issues
            .iter()
            .filter(|i| i.kind == kind)
            .map(|i| i.symbol_name.as_str())
            .collect()
    }

    #[test]
    fn test_typed_parameters() {
        let source = r#"
function greet(name: string, greeting?: string, ...extra: string[]): string {
  const unused: number = 1;
  return `hello ${name}`;
}
"#;
        let issues = analyze(Language::TypeScript, source);
        assert_eq!(
            names(&issues, IssueKind::UnusedParameter),
            vec!["extra", "greeting"]
        );
        assert_eq!(names(&issues, IssueKind::UnusedLocalVariable), vec!["unused"]);
    }

    #[test]
    fn test_private_fields_and_parameter_properties() {
        let source = r#"
class UserService {
  private cache: Map<string, User> = new Map();
  private readonly stale = 0;
  private _internal = 1;
  public visible = 2;
  #secret = "s";

  constructor(private repo: Repo, private logger: Logger, public name: string) {}

  find(id: string): User | undefined {
    this.logger.debug(id);
    return this.cache.get(id) ?? this.repo.load(id);
  }
}
"#;
        let issues = analyze(Language::TypeScript, source);
        assert_eq!(
            names(&issues, IssueKind::UnusedPrivateField),
            vec!["stale", "#secret"]
        );
        // Parameter properties are never reported as parameters.
        assert!(names(&issues, IssueKind::UnusedParameter).is_empty());
    }

    #[test]
    fn test_abstract_and_interface_members_are_skipped() {
        let source = r#"
interface Store {
  save(key: string, value: string): void;
}

abstract class Base {
  abstract run(input: string): void;
  protected log(message: string): void {}
}
"#;
        let issues = analyze(Language::TypeScript, source);
        assert_eq!(names(&issues, IssueKind::UnusedParameter), vec!["message"]);
    }

    #[test]
    fn test_tsx_component() {
        let source = r#"
function Greeting({ name, unused }: Props) {
  const Title = "h1";
  return <div title={name}><Title /></div>;
}
"#;
        let issues = analyze(Language::Tsx, source);
        assert_eq!(names(&issues, IssueKind::UnusedParameter), vec!["unused"]);
        assert!(names(&issues, IssueKind::UnusedLocalVariable).is_empty());
    }
}
