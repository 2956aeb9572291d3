//! Python function, class and call-site extraction.

use std::fmt;

use phf::phf_set;
use serde::Serialize;
use tree_sitter::Node;

use crate::analysis::{collect_descendants, direct_children, named_children, ParsedFile, Span};

/// Call targets that never resolve to project code.
pub static BUILTINS: phf::Set<&'static str> = phf_set! {
    "print", "len", "range", "str", "int", "float", "bool", "list", "dict", "set",
    "tuple", "frozenset", "isinstance", "issubclass", "super", "type", "open",
    "enumerate", "zip", "map", "filter", "sorted", "reversed", "min", "max", "sum",
    "any", "all", "abs", "round", "repr", "hash", "id", "iter", "next", "getattr",
    "setattr", "hasattr", "delattr", "vars", "dir", "callable", "format", "input",
    "globals", "locals", "object", "property", "staticmethod", "classmethod",
};

/// Arguments longer than this are cut.
pub const MAX_ARGUMENT_CHARS: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FunctionKind {
    Function,
    Method,
    Class,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Parameter {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub annotation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if let Some(annotation) = &self.annotation {
            write!(f, ": {}", annotation)?;
        }
        if let Some(default) = &self.default {
            let sep = if self.annotation.is_some() { " = " } else { "=" };
            write!(f, "{}{}", sep, default)?;
        }
        Ok(())
    }
}

/// One function, method or class declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PythonFunction {
    pub name: String,
    /// `Class.method` for methods, the bare name otherwise.
    pub qualified_name: String,
    pub kind: FunctionKind,
    /// Span of the `def`/`class` statement, decorators excluded.
    pub span: Span,
    pub parameters: Vec<Parameter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub return_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub docstring: Option<String>,
    pub is_async: bool,
    /// Decorator expressions without `@`, in source order.
    pub decorators: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class_name: Option<String>,
}

impl PythonFunction {
    pub fn start_line(&self) -> usize {
        self.span.start_line
    }

    pub fn end_line(&self) -> usize {
        self.span.end_line
    }

    /// Whether `line` is the declaration line or falls inside the body.
    pub fn covers_line(&self, line: usize) -> bool {
        self.start_line() == line || self.span.contains_line(line)
    }

    /// One-line signature such as `async def fetch(url: str) -> bytes`.
    pub fn signature(&self) -> String {
        match self.kind {
            FunctionKind::Class => format!("class {}", self.name),
            FunctionKind::Function | FunctionKind::Method => {
                let params: Vec<String> = self.parameters.iter().map(|p| p.to_string()).collect();
                let prefix = if self.is_async { "async def" } else { "def" };
                let mut sig = format!("{} {}({})", prefix, self.name, params.join(", "));
                if let Some(ret) = &self.return_type {
                    sig.push_str(" -> ");
                    sig.push_str(ret);
                }
                sig
            }
        }
    }
}

/// One call expression.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CallSite {
    /// Callee as written: `helper`, `self.save`, `os.path.join`.
    pub callee: String,
    pub line: usize,
    pub column: usize,
    pub arguments: Vec<String>,
}

impl CallSite {
    /// Last segment of the callee.
    pub fn bare_name(&self) -> &str {
        self.callee.rsplit('.').next().unwrap_or(&self.callee)
    }

    /// Whether this call may target a function named `name`.
    pub fn targets(&self, name: &str) -> bool {
        self.bare_name() == name
    }

    /// Whether `column` on this call's line falls on the callee text.
    pub fn callee_covers(&self, column: usize) -> bool {
        self.column <= column && column <= self.column + self.callee.chars().count()
    }
}

/// Extract every function, method and class declaration in document order.
pub fn extract_functions(parsed: &ParsedFile) -> Vec<PythonFunction> {
    let mut functions = Vec::new();
    // (node, enclosing class qualified name)
    let mut stack: Vec<(Node, Option<String>)> = vec![(parsed.root(), None)];
    let mut cursor = parsed.root().walk();

    while let Some((node, class)) = stack.pop() {
        let mut child_class = class.clone();
        match node.kind() {
            "function_definition" => {
                if let Some(func) = function_record(parsed, node, class.as_deref()) {
                    functions.push(func);
                }
                // Functions nested in a method are plain functions.
                child_class = None;
            }
            "class_definition" => {
                if let Some(record) = class_record(parsed, node, class.as_deref()) {
                    child_class = Some(record.qualified_name.clone());
                    functions.push(record);
                }
            }
            _ => {}
        }
        let children: Vec<Node> = node.children(&mut cursor).collect();
        stack.extend(children.into_iter().rev().map(|c| (c, child_class.clone())));
    }

    functions
}

fn qualify(class: Option<&str>, name: &str) -> String {
    match class {
        Some(class) => format!("{}.{}", class, name),
        None => name.to_string(),
    }
}

fn class_record(parsed: &ParsedFile, node: Node, class: Option<&str>) -> Option<PythonFunction> {
    let name = parsed.node_text(node.child_by_field_name("name")?).to_string();
    Some(PythonFunction {
        qualified_name: qualify(class, &name),
        kind: FunctionKind::Class,
        span: Span::from_node(node),
        parameters: Vec::new(),
        return_type: None,
        docstring: node
            .child_by_field_name("body")
            .and_then(|b| docstring(parsed, b)),
        is_async: false,
        decorators: decorators(parsed, node),
        class_name: class.map(str::to_string),
        name,
    })
}

fn function_record(parsed: &ParsedFile, node: Node, class: Option<&str>) -> Option<PythonFunction> {
    let name = parsed.node_text(node.child_by_field_name("name")?).to_string();
    let kind = if class.is_some() {
        FunctionKind::Method
    } else {
        FunctionKind::Function
    };
    Some(PythonFunction {
        qualified_name: qualify(class, &name),
        kind,
        span: Span::from_node(node),
        parameters: node
            .child_by_field_name("parameters")
            .map(|p| parameters(parsed, p))
            .unwrap_or_default(),
        return_type: node
            .child_by_field_name("return_type")
            .map(|t| parsed.node_text(t).to_string()),
        docstring: node
            .child_by_field_name("body")
            .and_then(|b| docstring(parsed, b)),
        is_async: !direct_children(node, "async").is_empty(),
        decorators: decorators(parsed, node),
        class_name: class.map(str::to_string),
        name,
    })
}

/// Decorators are the `decorator` siblings preceding the definition.
fn decorators(parsed: &ParsedFile, node: Node) -> Vec<String> {
    let mut found = Vec::new();
    let mut current = node.prev_named_sibling();
    while let Some(sibling) = current {
        if sibling.kind() != "decorator" {
            break;
        }
        let expr = named_children(sibling)
            .into_iter()
            .next()
            .map(|e| parsed.node_text(e).to_string())
            .unwrap_or_else(|| parsed.node_text(sibling).trim_start_matches('@').to_string());
        found.push(expr);
        current = sibling.prev_named_sibling();
    }
    found.reverse();
    found
}

fn parameters(parsed: &ParsedFile, params: Node) -> Vec<Parameter> {
    let text = |n: Node| parsed.node_text(n).to_string();
    named_children(params)
        .into_iter()
        .filter_map(|param| {
            let field = |name: &str| param.child_by_field_name(name);
            match param.kind() {
                "identifier" | "list_splat_pattern" | "dictionary_splat_pattern" => Some(Parameter {
                    name: text(param),
                    annotation: None,
                    default: None,
                }),
                "typed_parameter" => Some(Parameter {
                    name: named_children(param).into_iter().next().map(text)?,
                    annotation: field("type").map(text),
                    default: None,
                }),
                "default_parameter" | "typed_default_parameter" => Some(Parameter {
                    name: field("name").map(text)?,
                    annotation: field("type").map(text),
                    default: field("value").map(text),
                }),
                _ => None,
            }
        })
        .collect()
}

/// Leading string statement of a body, quotes and prefixes stripped.
fn docstring(parsed: &ParsedFile, body: Node) -> Option<String> {
    let first = named_children(body)
        .into_iter()
        .find(|n| n.kind() != "comment")?;
    if first.kind() != "expression_statement" {
        return None;
    }
    let string = named_children(first)
        .into_iter()
        .next()
        .filter(|n| n.kind() == "string")?;
    Some(strip_string_literal(parsed.node_text(string)))
}

fn strip_string_literal(raw: &str) -> String {
    let unprefixed = raw.trim_start_matches(|c: char| "rRbBuUfF".contains(c));
    for quote in ["\"\"\"", "'''", "\"", "'"] {
        if unprefixed.len() >= 2 * quote.len()
            && unprefixed.starts_with(quote)
            && unprefixed.ends_with(quote)
        {
            return unprefixed[quote.len()..unprefixed.len() - quote.len()]
                .trim()
                .to_string();
        }
    }
    unprefixed.trim().to_string()
}

/// Extract every non-builtin call with an identifier or dotted callee.
pub fn extract_calls(parsed: &ParsedFile) -> Vec<CallSite> {
    collect_descendants(parsed.root(), &["call"])
        .into_iter()
        .filter_map(|call| {
            let function = call.child_by_field_name("function")?;
            let callee = match function.kind() {
                "identifier" => {
                    let name = parsed.node_text(function);
                    if BUILTINS.contains(name) {
                        return None;
                    }
                    name.to_string()
                }
                "attribute" => parsed.node_text(function).to_string(),
                _ => return None,
            };
            let arguments = call
                .child_by_field_name("arguments")
                .map(named_children)
                .unwrap_or_default()
                .into_iter()
                .map(|arg| truncate(parsed.node_text(arg)))
                .collect();
            let start = call.start_position();
            Some(CallSite {
                callee,
                line: start.row + 1,
                column: start.column + 1,
                arguments,
            })
        })
        .collect()
}

fn truncate(text: &str) -> String {
    if text.chars().count() <= MAX_ARGUMENT_CHARS {
        return text.to_string();
    }
    let cut: String = text.chars().take(MAX_ARGUMENT_CHARS).collect();
    format!("{}...", cut)
}
