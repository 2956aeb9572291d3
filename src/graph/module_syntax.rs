//! Import/export extraction for ECMAScript-family modules.

use once_cell::sync::OnceCell;
use streaming_iterator::StreamingIterator;
use tree_sitter::{Node, Query, QueryCursor};

use crate::analysis::{collect_descendants, direct_children, named_children, Language, ParsedFile};
use crate::error::Result;

/// Tree-sitter query for extracting module specifiers.
const IMPORT_QUERY: &str = r#"
; import x from 'module'
(import_statement
  source: (string) @import_source
)

; export * from 'module'
(export_statement
  source: (string) @reexport_source
)

; require('module')
(call_expression
  function: (identifier) @require_func (#eq? @require_func "require")
  arguments: (arguments (string) @require_source)
)
"#;

static JAVASCRIPT_QUERY: OnceCell<Query> = OnceCell::new();
static TYPESCRIPT_QUERY: OnceCell<Query> = OnceCell::new();
static TSX_QUERY: OnceCell<Query> = OnceCell::new();

/// One import specifier as written in the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportSpec {
    pub module: String,
    /// 1-based line of the specifier.
    pub line: usize,
}

/// Module-level facts for one file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModuleSyntax {
    pub imports: Vec<ImportSpec>,
    pub exports: Vec<String>,
}

/// Extract import specifiers and exported names from a parsed module.
///
/// Non-ECMAScript files yield empty facts.
pub fn extract_module_syntax(language: Language, parsed: &ParsedFile) -> Result<ModuleSyntax> {
    if !language.is_ecmascript() {
        return Ok(ModuleSyntax::default());
    }

    Ok(ModuleSyntax {
        imports: extract_imports(language, parsed)?,
        exports: extract_exports(parsed),
    })
}

fn import_query(language: Language) -> Result<&'static Query> {
    let cell = match language {
        Language::TypeScript => &TYPESCRIPT_QUERY,
        Language::Tsx => &TSX_QUERY,
        _ => &JAVASCRIPT_QUERY,
    };
    let query = cell.get_or_try_init(|| Query::new(&language.ts_language(), IMPORT_QUERY))?;
    Ok(query)
}

fn extract_imports(language: Language, parsed: &ParsedFile) -> Result<Vec<ImportSpec>> {
    let query = import_query(language)?;
    let mut cursor = QueryCursor::new();
    let mut matches = cursor.matches(query, parsed.root(), &parsed.source[..]);

    let mut found: Vec<(usize, ImportSpec)> = Vec::new();

    while let Some(m) = matches.next() {
        for capture in m.captures {
            let name = query.capture_names()[capture.index as usize];
            match name {
                "import_source" | "reexport_source" | "require_source" => {
                    let module = unquote(parsed.node_text(capture.node));
                    if !module.is_empty() {
                        found.push((
                            capture.node.start_byte(),
                            ImportSpec {
                                module,
                                line: capture.node.start_position().row + 1,
                            },
                        ));
                    }
                }
                _ => {}
            }
        }
    }

    // import('module')
    for call in collect_descendants(parsed.root(), &["call_expression"]) {
        let is_dynamic_import = call
            .child_by_field_name("function")
            .is_some_and(|f| f.kind() == "import");
        if !is_dynamic_import {
            continue;
        }
        let source = call
            .child_by_field_name("arguments")
            .and_then(|args| named_children(args).into_iter().next())
            .filter(|arg| arg.kind() == "string");
        if let Some(source) = source {
            found.push((
                source.start_byte(),
                ImportSpec {
                    module: unquote(parsed.node_text(source)),
                    line: source.start_position().row + 1,
                },
            ));
        }
    }

    found.sort_by_key(|(offset, _)| *offset);

    let mut imports: Vec<ImportSpec> = Vec::new();
    for (_, spec) in found {
        if !imports.iter().any(|i| i.module == spec.module) {
            imports.push(spec);
        }
    }
    Ok(imports)
}

fn extract_exports(parsed: &ParsedFile) -> Vec<String> {
    let mut exports: Vec<String> = Vec::new();
    let mut push = |name: String| {
        if !name.is_empty() && !exports.contains(&name) {
            exports.push(name);
        }
    };

    for stmt in direct_children(parsed.root(), "export_statement") {
        if !direct_children(stmt, "default").is_empty() {
            push("default".to_string());
            continue;
        }

        if let Some(decl) = stmt.child_by_field_name("declaration") {
            for name in declared_names(decl, parsed) {
                push(name);
            }
        }

        for clause in direct_children(stmt, "export_clause") {
            for spec in direct_children(clause, "export_specifier") {
                let exported = spec
                    .child_by_field_name("alias")
                    .or_else(|| spec.child_by_field_name("name"));
                if let Some(node) = exported {
                    push(unquote(parsed.node_text(node)));
                }
            }
        }
    }

    exports
}

fn declared_names(decl: Node, parsed: &ParsedFile) -> Vec<String> {
    match decl.kind() {
        "lexical_declaration" | "variable_declaration" => direct_children(decl, "variable_declarator")
            .into_iter()
            .filter_map(|d| d.child_by_field_name("name"))
            .filter(|n| n.kind() == "identifier")
            .map(|n| parsed.node_text(n).to_string())
            .collect(),
        _ => decl
            .child_by_field_name("name")
            .map(|n| vec![parsed.node_text(n).to_string()])
            .unwrap_or_default(),
    }
}

fn unquote(raw: &str) -> String {
    raw.trim_matches(|c| c == '"' || c == '\'' || c == '`')
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn extract(language: Language, source: &str) -> ModuleSyntax {
        let parsed = language.parse(Path::new("mod"), source.as_bytes()).unwrap();
        extract_module_syntax(language, &parsed).unwrap()
    }

    fn modules(syntax: &ModuleSyntax) -> Vec<&str> {
        syntax.imports.iter().map(|i| i.module.as_str()).collect()
    }

    #[test]
    fn test_extract_imports() {
        let source = r#"
import express from 'express';
import { helper } from "./helper";
import type { Handler } from './types';
export * from './reexported';
const fs = require('fs');
const lazy = import('./lazy');
import { again } from './helper';
"#;
        let syntax = extract(Language::TypeScript, source);
        assert_eq!(
            modules(&syntax),
            vec!["express", "./helper", "./types", "./reexported", "fs", "./lazy"]
        );
        assert_eq!(syntax.imports[1].line, 3);
    }

    #[test]
    fn test_extract_exports() {
        let source = r#"
export function run() {}
export class Service {}
export const a = 1, b = 2;
const local = 3;
export { local as renamed, run as alsoRun };
export default Service;
"#;
        let syntax = extract(Language::JavaScript, source);
        assert_eq!(
            syntax.exports,
            vec!["run", "Service", "a", "b", "renamed", "alsoRun", "default"]
        );
    }

    #[test]
    fn test_typescript_declaration_exports() {
        let source = r#"
export interface Shape { area(): number }
export type Id = string;
export enum Color { Red }
"#;
        let syntax = extract(Language::TypeScript, source);
        assert_eq!(syntax.exports, vec!["Shape", "Id", "Color"]);
    }

    #[test]
    fn test_non_ecmascript_is_empty() {
        let syntax = extract(Language::Python, "import os\n");
        assert_eq!(syntax, ModuleSyntax::default());
    }
}
