//! Typed errors for the analysis library.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while analyzing source code.
#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {}", path.display())]
    Parse { path: PathBuf },
    #[error("no analyzer handles {}", .0.display())]
    UnsupportedFile(PathBuf),
    #[error("unknown language: {0}")]
    UnknownLanguage(String),
    #[error("grammar setup failed: {0}")]
    Language(#[from] tree_sitter::LanguageError),
    #[error("query compilation failed: {0}")]
    Query(#[from] tree_sitter::QueryError),
    #[error("invalid exclude pattern {pattern:?}: {source}")]
    Glob {
        pattern: String,
        #[source]
        source: globset::Error,
    },
    #[error("call graph adapter used before initialize()")]
    NotInitialized,
}

impl AnalysisError {
    /// Wrap an I/O error with the path it happened at.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, AnalysisError>;
