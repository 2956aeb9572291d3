//! On-demand call-graph queries.
//!
//! An adapter answers definition, reference and call-hierarchy queries for
//! one language and one project root. Files are parsed lazily and memoized
//! per adapter instance; queries only ever see files parsed so far, there is
//! no whole-project index.
//!
//! ```text
//! get_file_symbols / parse_functions / parse_calls
//!        │ (first touch of a file: read + parse once)
//!        ▼
//! ┌───────────────────────────────┐
//! │ AdapterCaches                 │  contents · functions · calls
//! └───────────────────────────────┘
//!        │
//!        ▼
//! find_references · get_definition · prepare_call_hierarchy
//! get_incoming_calls · get_outgoing_calls
//! ```

mod adapter;
mod cache;
mod python;

pub use adapter::{PythonCallGraph, OUTGOING_FALLBACK_LINES};
pub use cache::{AdapterCaches, FileEntry};
pub use python::{
    extract_calls, extract_functions, CallSite, FunctionKind, Parameter, PythonFunction,
    BUILTINS, MAX_ARGUMENT_CHARS,
};

use std::fmt;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Serialize;

use crate::error::Result;

/// A 1-based source position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl Position {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Location {
    pub file: PathBuf,
    pub line: usize,
    pub column: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_line: Option<usize>,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file.display(), self.line, self.column)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SymbolKind {
    Function,
    Method,
    Class,
    Module,
}

impl From<FunctionKind> for SymbolKind {
    fn from(kind: FunctionKind) -> Self {
        match kind {
            FunctionKind::Function => SymbolKind::Function,
            FunctionKind::Method => SymbolKind::Method,
            FunctionKind::Class => SymbolKind::Class,
        }
    }
}

impl fmt::Display for SymbolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SymbolKind::Function => "function",
            SymbolKind::Method => "method",
            SymbolKind::Class => "class",
            SymbolKind::Module => "module",
        };
        write!(f, "{}", s)
    }
}

/// A node of the call hierarchy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CallHierarchyItem {
    pub name: String,
    pub qualified_name: String,
    pub kind: SymbolKind,
    pub file: PathBuf,
    pub line: usize,
    pub column: usize,
    /// `None` when the extent is unknown.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_line: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl CallHierarchyItem {
    /// Item for a parsed declaration in `file`.
    pub fn from_function(file: &Path, function: &PythonFunction) -> Self {
        Self {
            name: function.name.clone(),
            qualified_name: function.qualified_name.clone(),
            kind: function.kind.into(),
            file: file.to_path_buf(),
            line: function.start_line(),
            column: function.span.start_col,
            end_line: Some(function.end_line()),
            detail: Some(function.signature()),
        }
    }

    /// Synthetic item for top-level code of `file`.
    pub fn module(file: &Path) -> Self {
        Self {
            name: "<module>".to_string(),
            qualified_name: "<module>".to_string(),
            kind: SymbolKind::Module,
            file: file.to_path_buf(),
            line: 1,
            column: 1,
            end_line: None,
            detail: None,
        }
    }

    pub fn location(&self) -> Location {
        Location {
            file: self.file.clone(),
            line: self.line,
            column: self.column,
            end_line: self.end_line,
        }
    }
}

/// A caller of the queried item and where it makes the calls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IncomingCall {
    pub from: CallHierarchyItem,
    pub from_ranges: Vec<Position>,
}

/// A callee of the queried item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutgoingCall {
    /// Callee text as written at the call sites.
    pub callee: String,
    /// The cached definition it resolves to, if any.
    pub to: Option<CallHierarchyItem>,
    pub from_ranges: Vec<Position>,
}

/// A declaration listed by [`CallGraphAdapter::get_file_symbols`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileSymbol {
    pub name: String,
    pub qualified_name: String,
    pub kind: SymbolKind,
    pub location: Location,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub container: Option<String>,
    pub exported: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Call-graph queries for one language over one project root.
///
/// Object safe, so hosts can hold adapters as `Box<dyn CallGraphAdapter>`.
/// Lookup misses are empty results, never errors.
#[async_trait]
pub trait CallGraphAdapter: Send + Sync {
    /// Language id such as `python`.
    fn language_id(&self) -> &'static str;

    /// Set up the parsing front-end for `root`. Idempotent.
    async fn initialize(&self, root: &Path) -> Result<()>;

    /// Drop every cache. Later queries parse files again.
    async fn shutdown(&self);

    /// Whether this adapter handles `path`, by extension.
    fn supports_file(&self, path: &Path) -> bool;

    /// Call sites, among parsed files, of the function at `position`.
    async fn find_references(&self, file: &Path, position: Position) -> Result<Vec<Location>>;

    /// Definition of the callee at `position`, or of the enclosing function.
    async fn get_definition(&self, file: &Path, position: Position) -> Result<Vec<Location>>;

    /// The function at `position` as a call-hierarchy item.
    async fn prepare_call_hierarchy(
        &self,
        file: &Path,
        position: Position,
    ) -> Result<Vec<CallHierarchyItem>>;

    /// Callers of `item`, grouped by calling function.
    async fn get_incoming_calls(&self, item: &CallHierarchyItem) -> Result<Vec<IncomingCall>>;

    /// Calls made inside `item`, grouped by callee.
    async fn get_outgoing_calls(&self, item: &CallHierarchyItem) -> Result<Vec<OutgoingCall>>;

    /// Every declaration in `file`. Also makes the file's calls visible to
    /// reference and incoming-call queries.
    async fn get_file_symbols(&self, file: &Path) -> Result<Vec<FileSymbol>>;
}
