//! Python implementation of [`CallGraphAdapter`].

use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::{debug, info};

use super::cache::{AdapterCaches, FileEntry};
use super::python::{extract_calls, extract_functions, CallSite, PythonFunction};
use super::{
    CallGraphAdapter, CallHierarchyItem, FileSymbol, IncomingCall, Location, OutgoingCall,
    Position,
};
use crate::analysis::Language;
use crate::error::{AnalysisError, Result};
use crate::graph::normalize_path;

/// Lines scanned after an item's start when its end line is unknown.
pub const OUTGOING_FALLBACK_LINES: usize = 100;

#[derive(Debug)]
struct FrontEnd {
    root: PathBuf,
    language: Language,
}

/// Call-graph adapter for Python sources under one project root.
///
/// Files are parsed the first time a query touches them and stay cached
/// until [`CallGraphAdapter::shutdown`].
#[derive(Debug, Default)]
pub struct PythonCallGraph {
    front_end: OnceCell<FrontEnd>,
    caches: RwLock<Option<AdapterCaches>>,
}

impl PythonCallGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Project root, once initialized.
    pub fn root(&self) -> Option<&Path> {
        self.front_end.get().map(|fe| fe.root.as_path())
    }

    /// Function, method and class records of `file`, parsed at most once.
    pub async fn parse_functions(&self, file: &Path) -> Result<Arc<Vec<PythonFunction>>> {
        let path = self.resolve(file)?;
        Ok(self
            .load(&path)
            .await?
            .map(|entry| entry.functions)
            .unwrap_or_default())
    }

    /// Call sites of `file`, parsed at most once.
    pub async fn parse_calls(&self, file: &Path) -> Result<Arc<Vec<CallSite>>> {
        let path = self.resolve(file)?;
        Ok(self
            .load(&path)
            .await?
            .map(|entry| entry.calls)
            .unwrap_or_default())
    }

    /// Source text of an already parsed file.
    pub fn cached_source(&self, file: &Path) -> Option<Arc<str>> {
        let path = self.resolve(file).ok()?;
        self.read_caches(|caches| caches.contents(&path)).flatten()
    }

    /// Files parsed so far, in path order.
    pub fn cached_files(&self) -> Vec<PathBuf> {
        self.cached_entries()
            .into_iter()
            .map(|entry| entry.path)
            .collect()
    }

    fn front_end(&self) -> Result<&FrontEnd> {
        self.front_end.get().ok_or(AnalysisError::NotInitialized)
    }

    fn resolve(&self, file: &Path) -> Result<PathBuf> {
        let front_end = self.front_end()?;
        if file.is_absolute() {
            Ok(normalize_path(file))
        } else {
            Ok(normalize_path(&front_end.root.join(file)))
        }
    }

    fn read_caches<T>(&self, f: impl FnOnce(&AdapterCaches) -> T) -> Option<T> {
        let guard = self.caches.read().unwrap_or_else(PoisonError::into_inner);
        guard.as_ref().map(f)
    }

    fn cached_entries(&self) -> Vec<FileEntry> {
        self.read_caches(AdapterCaches::entries).unwrap_or_default()
    }

    /// Cached entry for `path`, reading and parsing it on first use.
    ///
    /// A file that cannot be read or parsed yields `None` and is not cached.
    async fn load(&self, path: &Path) -> Result<Option<FileEntry>> {
        let front_end = self.front_end()?;
        if let Some(entry) = self.read_caches(|caches| caches.get(path)).flatten() {
            return Ok(Some(entry));
        }

        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) => {
                debug!(file = %path.display(), error = %e, "skipping unreadable file");
                return Ok(None);
            }
        };
        let parsed = match front_end.language.parse(path, &bytes) {
            Ok(parsed) => parsed,
            Err(e) => {
                debug!(file = %path.display(), error = %e, "skipping unparsable file");
                return Ok(None);
            }
        };
        let functions = extract_functions(&parsed);
        let calls = extract_calls(&parsed);
        debug!(
            file = %path.display(),
            functions = functions.len(),
            calls = calls.len(),
            "parsed file"
        );

        let contents: Arc<str> = Arc::from(String::from_utf8_lossy(&bytes).as_ref());
        let mut guard = self.caches.write().unwrap_or_else(PoisonError::into_inner);
        let caches = guard.get_or_insert_with(AdapterCaches::default);
        Ok(Some(caches.insert(path.to_path_buf(), contents, functions, calls)))
    }

    /// Cached declarations named `name`, those in `prefer` first.
    fn definitions_named(&self, name: &str, prefer: &Path) -> Vec<CallHierarchyItem> {
        let mut entries = self.cached_entries();
        entries.sort_by_key(|entry| entry.path != prefer);
        entries
            .iter()
            .flat_map(|entry| {
                entry
                    .functions
                    .iter()
                    .filter(|f| f.name == name)
                    .map(|f| CallHierarchyItem::from_function(&entry.path, f))
                    .collect::<Vec<_>>()
            })
            .collect()
    }
}

async fn open_front_end(requested: PathBuf) -> Result<FrontEnd> {
    let absolute = if requested.is_absolute() {
        requested
    } else {
        std::env::current_dir()
            .map_err(|e| AnalysisError::io(&requested, e))?
            .join(&requested)
    };
    let root = normalize_path(&absolute);
    let metadata = tokio::fs::metadata(&root)
        .await
        .map_err(|e| AnalysisError::io(&root, e))?;
    if !metadata.is_dir() {
        return Err(AnalysisError::io(
            &root,
            io::Error::new(io::ErrorKind::InvalidInput, "not a directory"),
        ));
    }
    let language = Language::Python;
    language.create_parser()?;
    info!(root = %root.display(), "python call graph initialized");
    Ok(FrontEnd { root, language })
}

/// The declaration at `line`: one starting exactly there, otherwise the
/// innermost one whose span covers it.
fn function_at(functions: &[PythonFunction], line: usize) -> Option<&PythonFunction> {
    functions
        .iter()
        .find(|f| f.start_line() == line)
        .or_else(|| {
            functions
                .iter()
                .filter(|f| f.covers_line(line))
                .max_by_key(|f| f.start_line())
        })
}

fn is_exported(name: &str) -> bool {
    let dunder = name.len() > 4 && name.starts_with("__") && name.ends_with("__");
    dunder || !name.starts_with('_')
}

fn location_of(file: &Path, function: &PythonFunction) -> Location {
    Location {
        file: file.to_path_buf(),
        line: function.start_line(),
        column: function.span.start_col,
        end_line: Some(function.end_line()),
    }
}

#[async_trait]
impl CallGraphAdapter for PythonCallGraph {
    fn language_id(&self) -> &'static str {
        Language::Python.as_str()
    }

    async fn initialize(&self, root: &Path) -> Result<()> {
        let front_end = self
            .front_end
            .get_or_try_init(|| open_front_end(root.to_path_buf()))
            .await?;
        if root.is_absolute() && front_end.root != normalize_path(root) {
            debug!(
                requested = %root.display(),
                root = %front_end.root.display(),
                "already initialized for another root"
            );
        }
        Ok(())
    }

    async fn shutdown(&self) {
        let mut guard = self.caches.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(caches) = guard.take() {
            info!(files = caches.len(), "call graph caches cleared");
        }
    }

    fn supports_file(&self, path: &Path) -> bool {
        Language::from_path(path) == Some(Language::Python)
    }

    async fn find_references(&self, file: &Path, position: Position) -> Result<Vec<Location>> {
        let path = self.resolve(file)?;
        let Some(entry) = self.load(&path).await? else {
            return Ok(Vec::new());
        };
        let Some(target) = function_at(&entry.functions, position.line) else {
            return Ok(Vec::new());
        };

        let references = self
            .cached_entries()
            .iter()
            .flat_map(|cached| {
                cached
                    .calls
                    .iter()
                    .filter(|call| call.targets(&target.name))
                    .map(|call| Location {
                        file: cached.path.clone(),
                        line: call.line,
                        column: call.column,
                        end_line: None,
                    })
                    .collect::<Vec<_>>()
            })
            .collect();
        Ok(references)
    }

    async fn get_definition(&self, file: &Path, position: Position) -> Result<Vec<Location>> {
        let path = self.resolve(file)?;
        let Some(entry) = self.load(&path).await? else {
            return Ok(Vec::new());
        };

        let on_callee = entry
            .calls
            .iter()
            .find(|call| call.line == position.line && call.callee_covers(position.column));
        if let Some(call) = on_callee {
            return Ok(self
                .definitions_named(call.bare_name(), &path)
                .iter()
                .map(CallHierarchyItem::location)
                .collect());
        }

        Ok(function_at(&entry.functions, position.line)
            .map(|f| location_of(&path, f))
            .into_iter()
            .collect())
    }

    async fn prepare_call_hierarchy(
        &self,
        file: &Path,
        position: Position,
    ) -> Result<Vec<CallHierarchyItem>> {
        let path = self.resolve(file)?;
        let Some(entry) = self.load(&path).await? else {
            return Ok(Vec::new());
        };
        Ok(function_at(&entry.functions, position.line)
            .map(|f| CallHierarchyItem::from_function(&path, f))
            .into_iter()
            .collect())
    }

    async fn get_incoming_calls(&self, item: &CallHierarchyItem) -> Result<Vec<IncomingCall>> {
        self.front_end()?;
        let mut incoming: Vec<IncomingCall> = Vec::new();

        for entry in self.cached_entries() {
            for call in entry.calls.iter().filter(|call| call.targets(&item.name)) {
                let from = match function_at(&entry.functions, call.line) {
                    Some(caller) => CallHierarchyItem::from_function(&entry.path, caller),
                    None => CallHierarchyItem::module(&entry.path),
                };
                let range = Position::new(call.line, call.column);
                match incoming.iter_mut().find(|group| group.from == from) {
                    Some(group) => group.from_ranges.push(range),
                    None => incoming.push(IncomingCall {
                        from,
                        from_ranges: vec![range],
                    }),
                }
            }
        }
        Ok(incoming)
    }

    async fn get_outgoing_calls(&self, item: &CallHierarchyItem) -> Result<Vec<OutgoingCall>> {
        let path = self.resolve(&item.file)?;
        let Some(entry) = self.load(&path).await? else {
            return Ok(Vec::new());
        };

        let last_line = item
            .end_line
            .unwrap_or(item.line + OUTGOING_FALLBACK_LINES);
        let mut outgoing: Vec<OutgoingCall> = Vec::new();
        for call in entry
            .calls
            .iter()
            .filter(|call| item.line <= call.line && call.line <= last_line)
        {
            let range = Position::new(call.line, call.column);
            match outgoing.iter_mut().find(|group| group.callee == call.callee) {
                Some(group) => group.from_ranges.push(range),
                None => outgoing.push(OutgoingCall {
                    callee: call.callee.clone(),
                    to: self
                        .definitions_named(call.bare_name(), &path)
                        .into_iter()
                        .next(),
                    from_ranges: vec![range],
                }),
            }
        }
        Ok(outgoing)
    }

    async fn get_file_symbols(&self, file: &Path) -> Result<Vec<FileSymbol>> {
        let path = self.resolve(file)?;
        let Some(entry) = self.load(&path).await? else {
            return Ok(Vec::new());
        };
        Ok(entry
            .functions
            .iter()
            .map(|f| FileSymbol {
                name: f.name.clone(),
                qualified_name: f.qualified_name.clone(),
                kind: f.kind.into(),
                location: location_of(&path, f),
                container: f.class_name.clone(),
                exported: is_exported(&f.name),
                detail: Some(f.signature()),
            })
            .collect())
    }
}
