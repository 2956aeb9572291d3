//! Per-adapter memoized parse results.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::python::{CallSite, PythonFunction};

/// Everything parsed for one file.
#[derive(Debug, Clone)]
pub struct FileEntry {
    pub path: PathBuf,
    pub functions: Arc<Vec<PythonFunction>>,
    pub calls: Arc<Vec<CallSite>>,
}

/// Caches owned by one adapter instance, keyed by absolute path.
///
/// Entries are only ever added; the whole struct is dropped on shutdown.
#[derive(Debug, Default)]
pub struct AdapterCaches {
    file_contents: HashMap<PathBuf, Arc<str>>,
    functions: HashMap<PathBuf, Arc<Vec<PythonFunction>>>,
    calls: HashMap<PathBuf, Arc<Vec<CallSite>>>,
}

impl AdapterCaches {
    pub fn get(&self, path: &Path) -> Option<FileEntry> {
        let functions = self.functions.get(path)?;
        let calls = self.calls.get(path)?;
        Some(FileEntry {
            path: path.to_path_buf(),
            functions: Arc::clone(functions),
            calls: Arc::clone(calls),
        })
    }

    pub fn contents(&self, path: &Path) -> Option<Arc<str>> {
        self.file_contents.get(path).cloned()
    }

    /// Store a parsed file. A file already present keeps its first entry,
    /// which is returned.
    pub fn insert(
        &mut self,
        path: PathBuf,
        contents: Arc<str>,
        functions: Vec<PythonFunction>,
        calls: Vec<CallSite>,
    ) -> FileEntry {
        if let Some(existing) = self.get(&path) {
            return existing;
        }
        self.file_contents.insert(path.clone(), contents);
        self.functions.insert(path.clone(), Arc::new(functions));
        self.calls.insert(path.clone(), Arc::new(calls));
        self.get(&path).unwrap_or_else(|| FileEntry {
            path,
            functions: Arc::default(),
            calls: Arc::default(),
        })
    }

    /// Every cached file, in path order.
    pub fn entries(&self) -> Vec<FileEntry> {
        let mut paths: Vec<&PathBuf> = self.calls.keys().collect();
        paths.sort();
        paths.into_iter().filter_map(|p| self.get(p)).collect()
    }

    pub fn len(&self) -> usize {
        self.calls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }
}
