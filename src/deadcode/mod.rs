//! Fine-grained dead-code detection: unused parameters, unused locals and
//! unused private fields.
//!
//! One generic scope algorithm ([`scope`]) runs over every supported
//! language; each language contributes a [`ScopePolicy`] describing its
//! grammar and conventions:
//!
//! | language   | private field                  | dynamic escape                        |
//! |------------|--------------------------------|---------------------------------------|
//! | Python     | `_x`, not `__x__`              | `getattr`/`setattr`/..., `__dict__`   |
//! | JavaScript | `#x`                           | `this[k]`, `Reflect.*`, `Object.keys(this)` |
//! | TypeScript | `private x`, `#x`              | as JavaScript                         |
//! | Go         | lowercase struct field         | struct tags, `reflect.*`              |
//! | Java       | `private` field                | `getDeclaredField`, `setAccessible`   |

mod languages;
mod policy;
mod scope;

pub use languages::{
    policy_for, GoPolicy, JavaPolicy, JavaScriptPolicy, PythonPolicy, TypeScriptPolicy,
};
pub use policy::{FieldDecl, FieldHeuristic, NodeRole, ScopePolicy};
pub use scope::{function_scope, unused_private_fields, ScopeData, Symbol, SymbolKind};

use std::fmt;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::analysis::{Language, ParsedFile};
use crate::error::{AnalysisError, Result};
use crate::graph::{absolute_path, collect_source_files, compile_excludes};

/// Category of a dead-code finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IssueKind {
    UnusedParameter,
    UnusedLocalVariable,
    UnusedPrivateField,
}

impl IssueKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            IssueKind::UnusedParameter => "unused-parameter",
            IssueKind::UnusedLocalVariable => "unused-local-variable",
            IssueKind::UnusedPrivateField => "unused-private-field",
        }
    }

    fn describe(&self) -> &'static str {
        match self {
            IssueKind::UnusedParameter => "parameter",
            IssueKind::UnusedLocalVariable => "local variable",
            IssueKind::UnusedPrivateField => "private field",
        }
    }
}

impl fmt::Display for IssueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An unused symbol at its declaration line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FineGrainedIssue {
    pub kind: IssueKind,
    pub file: String,
    pub line: usize,
    pub symbol_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class_name: Option<String>,
}

impl FineGrainedIssue {
    /// Human-readable one-line description.
    pub fn message(&self) -> String {
        match &self.class_name {
            Some(class) => format!(
                "{} '{}' of {} is never used",
                self.kind.describe(),
                self.symbol_name,
                class
            ),
            None => format!(
                "{} '{}' is never used",
                self.kind.describe(),
                self.symbol_name
            ),
        }
    }
}

/// Which issue kinds to report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeadCodeOptions {
    pub unused_parameters: bool,
    pub unused_locals: bool,
    pub unused_private_fields: bool,
}

impl Default for DeadCodeOptions {
    fn default() -> Self {
        Self {
            unused_parameters: true,
            unused_locals: true,
            unused_private_fields: true,
        }
    }
}

/// Analyze one parsed file with every issue kind enabled.
pub fn analyze_fine_grained(parsed: &ParsedFile, language: Language) -> Vec<FineGrainedIssue> {
    analyze_fine_grained_with(parsed, language, &DeadCodeOptions::default())
}

/// Analyze one parsed file, reporting only the kinds `options` enables.
pub fn analyze_fine_grained_with(
    parsed: &ParsedFile,
    language: Language,
    options: &DeadCodeOptions,
) -> Vec<FineGrainedIssue> {
    scope::analyze(policy_for(language), parsed, options)
}

/// Read, parse and analyze a single file.
pub fn check_dead_code(path: &Path, options: &DeadCodeOptions) -> Result<Vec<FineGrainedIssue>> {
    let language =
        Language::from_path(path).ok_or_else(|| AnalysisError::UnsupportedFile(path.to_path_buf()))?;
    let source = fs::read(path).map_err(|e| AnalysisError::io(path, e))?;
    let parsed = language.parse(path, &source)?;
    Ok(analyze_fine_grained_with(&parsed, language, options))
}

/// Outcome of [`check_dead_code_dir`]. Failures are reported here.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DeadCodeReport {
    pub success: bool,
    pub issues: Vec<FineGrainedIssue>,
    pub files_analyzed: usize,
    pub summary: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DeadCodeReport {
    fn failed(message: String) -> Self {
        Self {
            success: false,
            summary: format!("Dead code check failed: {}", message),
            error: Some(message),
            ..Default::default()
        }
    }

    /// Issue counts per kind, in kind order.
    pub fn counts(&self) -> Vec<(IssueKind, usize)> {
        [
            IssueKind::UnusedParameter,
            IssueKind::UnusedLocalVariable,
            IssueKind::UnusedPrivateField,
        ]
        .into_iter()
        .map(|kind| (kind, self.issues.iter().filter(|i| i.kind == kind).count()))
        .collect()
    }
}

/// Analyze every supported file under `root` (or `root` itself if a file).
///
/// A file that cannot be read or parsed is skipped.
pub fn check_dead_code_dir(
    root: &Path,
    exclude_patterns: &[String],
    options: &DeadCodeOptions,
) -> DeadCodeReport {
    let root = match absolute_path(root) {
        Ok(root) => root,
        Err(e) => {
            warn!(error = %e, "dead code check failed");
            return DeadCodeReport::failed(e.to_string());
        }
    };
    let root = root.as_path();
    let files = if root.is_file() {
        Ok(vec![root.to_path_buf()])
    } else if root.is_dir() {
        compile_excludes(exclude_patterns)
            .and_then(|excludes| collect_source_files(root, &excludes, |_| true))
    } else {
        Err(AnalysisError::io(
            root,
            std::io::Error::new(std::io::ErrorKind::NotFound, "no such file or directory"),
        ))
    };

    let files = match files {
        Ok(files) => files,
        Err(e) => {
            warn!(error = %e, "dead code check failed");
            return DeadCodeReport::failed(e.to_string());
        }
    };

    let mut issues = Vec::new();
    let mut analyzed = 0;
    for path in &files {
        match check_dead_code(path, options) {
            Ok(found) => {
                analyzed += 1;
                issues.extend(found);
            }
            Err(e) => debug!(file = %path.display(), error = %e, "skipping file"),
        }
    }

    let summary = match issues.len() {
        0 => format!("No unused symbols found in {} files", analyzed),
        1 => format!("Found 1 unused symbol in {} files", analyzed),
        n => format!("Found {} unused symbols in {} files", n, analyzed),
    };
    info!(files = analyzed, issues = issues.len(), "dead code check finished");

    DeadCodeReport {
        success: true,
        issues,
        files_analyzed: analyzed,
        summary,
        error: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn parse(language: Language, source: &str) -> ParsedFile {
        language.parse(Path::new("test"), source.as_bytes()).unwrap()
    }

    #[test]
    fn test_underscore_names_never_reported() {
        let samples = [
            (Language::Python, "def f(_a, _):\n    _tmp = 1\n"),
            (Language::JavaScript, "function f(_a, _) { const _tmp = 1; }\n"),
            (Language::TypeScript, "function f(_a: number, _: string) { let _tmp = 1; }\n"),
            (Language::Go, "package p\nfunc f(_a int, _ string) { _tmp := 1 }\n"),
            (Language::Java, "class A { void f(int _a) { int _tmp = 1; } }\n"),
        ];
        for (language, source) in samples {
            let issues = analyze_fine_grained(&parse(language, source), language);
            assert!(issues.is_empty(), "{}: {:?}", language, issues);
        }
    }

    #[test]
    fn test_options_disable_kinds() {
        let source = "class A:\n    def __init__(self, x):\n        y = 1\n        self._z = 2\n";
        let parsed = parse(Language::Python, source);
        assert_eq!(analyze_fine_grained(&parsed, Language::Python).len(), 3);

        let options = DeadCodeOptions {
            unused_parameters: false,
            ..Default::default()
        };
        let kinds: Vec<_> = analyze_fine_grained_with(&parsed, Language::Python, &options)
            .into_iter()
            .map(|i| i.kind)
            .collect();
        assert_eq!(
            kinds,
            vec![IssueKind::UnusedLocalVariable, IssueKind::UnusedPrivateField]
        );
    }

    #[test]
    fn test_issues_sorted_by_line() {
        let source = "def f(b, a):\n    z = 1\n    y = 2\n";
        let issues = analyze_fine_grained(&parse(Language::Python, source), Language::Python);
        let order: Vec<_> = issues.iter().map(|i| (i.line, i.symbol_name.as_str())).collect();
        assert_eq!(order, vec![(1, "a"), (1, "b"), (2, "z"), (3, "y")]);
    }

    #[test]
    fn test_issue_message_and_serialization() {
        let issue = FineGrainedIssue {
            kind: IssueKind::UnusedPrivateField,
            file: "a.py".to_string(),
            line: 3,
            symbol_name: "_cache".to_string(),
            class_name: Some("Store".to_string()),
        };
        assert_eq!(issue.message(), "private field '_cache' of Store is never used");
        let json = serde_json::to_value(&issue).unwrap();
        assert_eq!(json["kind"], "unused-private-field");
        assert_eq!(json["symbol_name"], "_cache");
    }

    #[test]
    fn test_check_dead_code_unsupported_file() {
        let err = check_dead_code(Path::new("notes.txt"), &DeadCodeOptions::default()).unwrap_err();
        assert!(matches!(err, AnalysisError::UnsupportedFile(_)));
    }

    #[test]
    fn test_check_dead_code_dir_missing_root() {
        let report = check_dead_code_dir(
            Path::new("/no/such/dir"),
            &[],
            &DeadCodeOptions::default(),
        );
        assert!(!report.success);
        assert!(report.error.is_some());
    }
}
