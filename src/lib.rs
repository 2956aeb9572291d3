//! codelens - structural facts about multi-language codebases.
//!
//! Everything is derived from tree-sitter syntax trees; no code is executed
//! and no whole-project index is built.
//!
//! # Architecture
//!
//! - `analysis`: grammar front-end and tree access helpers
//! - `graph`: file-level import graph and bounded cycle detection
//! - `deadcode`: unused parameters, locals and private fields for Python,
//!   JavaScript, TypeScript, Go and Java
//! - `callgraph`: on-demand call-hierarchy adapters with per-instance caches
//! - `config`: YAML configuration
//! - `report`: output formatting (pretty, JSON)
//!
//! # Adding a Language
//!
//! Dead-code support: implement `ScopePolicy` in `src/deadcode/languages/`
//! and map the language in `policy_for`. Call-graph support: implement
//! `CallGraphAdapter` and list it in `cli::adapter_for`.

pub mod analysis;
pub mod callgraph;
pub mod cli;
pub mod config;
pub mod deadcode;
pub mod error;
pub mod graph;
pub mod logging;
pub mod report;

pub use analysis::{collect_descendants, direct_children, Language, ParsedFile, Span};
pub use callgraph::{CallGraphAdapter, CallHierarchyItem, FileSymbol, Position, PythonCallGraph};
pub use config::Config;
pub use deadcode::{
    analyze_fine_grained, check_dead_code, check_dead_code_dir, DeadCodeOptions,
    FineGrainedIssue, IssueKind,
};
pub use error::{AnalysisError, Result};
pub use graph::{check_circular, CircularCheckResult, CircularIssue, CircularOptions, GraphBuilder};
