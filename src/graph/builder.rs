//! File-level dependency graph construction.
//!
//! The builder walks a directory, extracts import/export facts from every
//! supported module and links relative imports to the files they name.
//! A file that cannot be read or parsed is skipped; it never aborts the walk.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Component, Path, PathBuf};

use globset::{Glob, GlobSet, GlobSetBuilder};
use phf::phf_set;
use serde::Serialize;
use tracing::{debug, info};
use walkdir::WalkDir;

use super::module_syntax::extract_module_syntax;
use crate::analysis::Language;
use crate::error::{AnalysisError, Result};

/// Vendor and build output directories that are never walked.
pub static SKIPPED_DIRS: phf::Set<&'static str> = phf_set! {
    "node_modules",
    ".git",
    "dist",
    "build",
    "out",
    "coverage",
    "vendor",
    "target",
    "__pycache__",
    ".next",
    ".nuxt",
    ".venv",
    "venv",
    ".turbo",
    ".cache",
};

/// Extensions tried, in order, when resolving an extensionless specifier.
pub const MODULE_EXTENSIONS: &[&str] = &["ts", "tsx", "js", "jsx", "mjs", "cjs", "mts", "cts"];

/// A vertex of the dependency graph.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FileNode {
    pub path: PathBuf,
    pub exported_names: BTreeSet<String>,
    /// Specifiers exactly as written in the source.
    pub import_paths: BTreeSet<String>,
    /// Files this file imports (resolved edges only).
    pub imports_from: BTreeSet<PathBuf>,
    /// Files importing this file.
    pub imported_by: BTreeSet<PathBuf>,
}

impl FileNode {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            ..Default::default()
        }
    }
}

/// File-level import graph keyed by path.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DependencyGraph {
    root: PathBuf,
    nodes: BTreeMap<PathBuf, FileNode>,
}

impl DependencyGraph {
    /// Create an empty graph rooted at `root`.
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            nodes: BTreeMap::new(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Insert a node, replacing any node with the same path.
    pub fn insert(&mut self, node: FileNode) {
        self.nodes.insert(node.path.clone(), node);
    }

    pub fn get(&self, path: &Path) -> Option<&FileNode> {
        self.nodes.get(path)
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.nodes.contains_key(path)
    }

    /// Nodes in path order.
    pub fn nodes(&self) -> impl Iterator<Item = &FileNode> {
        self.nodes.values()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Number of resolved import edges.
    pub fn edge_count(&self) -> usize {
        self.nodes.values().map(|n| n.imports_from.len()).sum()
    }

    /// Path relative to the graph root, for display.
    pub fn display_path(&self, path: &Path) -> String {
        path.strip_prefix(&self.root)
            .unwrap_or(path)
            .to_string_lossy()
            .replace('\\', "/")
    }

    /// Resolve every relative import specifier into an edge.
    ///
    /// Bare package specifiers are left unlinked.
    pub fn link(&mut self) {
        let mut edges: Vec<(PathBuf, PathBuf)> = Vec::new();

        for node in self.nodes.values() {
            for spec in &node.import_paths {
                match self.resolve_import(&node.path, spec) {
                    Some(target) if target != node.path => edges.push((node.path.clone(), target)),
                    Some(_) => {}
                    None => debug!(file = %node.path.display(), import = %spec, "import left unlinked"),
                }
            }
        }

        for (from, to) in edges {
            if let Some(node) = self.nodes.get_mut(&from) {
                node.imports_from.insert(to.clone());
            }
            if let Some(node) = self.nodes.get_mut(&to) {
                node.imported_by.insert(from);
            }
        }
    }

    /// Resolve `spec` as imported from `importer` to a known file.
    ///
    /// Tries the literal path, then each module extension (after stripping
    /// a recognized one), then `index.<ext>` inside the directory. First
    /// match wins.
    pub fn resolve_import(&self, importer: &Path, spec: &str) -> Option<PathBuf> {
        if !(spec.starts_with('.') || spec.starts_with('/')) {
            return None;
        }

        let base_dir = importer.parent().unwrap_or(Path::new(""));
        let literal = normalize_path(&base_dir.join(spec));
        if self.contains(&literal) {
            return Some(literal);
        }

        let stem = strip_module_extension(&literal);
        for ext in MODULE_EXTENSIONS {
            let candidate = append_extension(&stem, ext);
            if self.contains(&candidate) {
                return Some(candidate);
            }
        }

        for ext in MODULE_EXTENSIONS {
            let candidate = literal.join(format!("index.{}", ext));
            if self.contains(&candidate) {
                return Some(candidate);
            }
        }

        None
    }
}

/// Builds a [`DependencyGraph`] from a directory tree.
pub struct GraphBuilder {
    root: PathBuf,
    excludes: Vec<String>,
}

impl GraphBuilder {
    /// Create a builder for the tree under `root`.
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            excludes: Vec::new(),
        }
    }

    /// Add glob patterns (relative to the root) for files to leave out.
    pub fn exclude<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.excludes.extend(patterns.into_iter().map(Into::into));
        self
    }

    /// Walk the tree and build the linked graph.
    pub fn build(&self) -> Result<DependencyGraph> {
        let excludes = compile_excludes(&self.excludes)?;
        let mut graph = DependencyGraph::new(&self.root);

        for path in collect_source_files(&self.root, &excludes, |lang| lang.is_ecmascript())? {
            match analyze_module(&path) {
                Ok(node) => graph.insert(node),
                Err(e) => debug!(file = %path.display(), error = %e, "skipping unreadable module"),
            }
        }

        graph.link();
        info!(
            root = %self.root.display(),
            files = graph.len(),
            edges = graph.edge_count(),
            "dependency graph built"
        );
        Ok(graph)
    }
}

fn analyze_module(path: &Path) -> Result<FileNode> {
    let language = Language::from_path(path)
        .ok_or_else(|| AnalysisError::UnsupportedFile(path.to_path_buf()))?;
    let source = fs::read(path).map_err(|e| AnalysisError::io(path, e))?;
    let parsed = language.parse(path, &source)?;
    let syntax = extract_module_syntax(language, &parsed)?;

    let mut node = FileNode::new(path.to_path_buf());
    node.import_paths = syntax.imports.into_iter().map(|i| i.module).collect();
    node.exported_names = syntax.exports.into_iter().collect();
    Ok(node)
}

/// Compile exclude globs into a matcher.
pub fn compile_excludes(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern).map_err(|source| AnalysisError::Glob {
            pattern: pattern.clone(),
            source,
        })?;
        builder.add(glob);
    }
    builder.build().map_err(|source| AnalysisError::Glob {
        pattern: patterns.join(", "),
        source,
    })
}

/// Walk `root` and return every file whose grammar passes `accept`.
///
/// Skips [`SKIPPED_DIRS`] and anything matching `excludes` (matched against
/// the root-relative path). Results are sorted by path.
pub fn collect_source_files(
    root: &Path,
    excludes: &GlobSet,
    accept: impl Fn(Language) -> bool,
) -> Result<Vec<PathBuf>> {
    let root = normalize_path(root);
    let mut files = Vec::new();

    let walker = WalkDir::new(&root).follow_links(true).into_iter();
    for entry in walker.filter_entry(|e| {
        !(e.depth() > 0
            && e.file_type().is_dir()
            && SKIPPED_DIRS.contains(e.file_name().to_string_lossy().as_ref()))
    }) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) if e.depth() > 0 => {
                debug!(error = %e, "skipping unreadable entry");
                continue;
            }
            Err(e) => {
                let source = e
                    .into_io_error()
                    .unwrap_or_else(|| std::io::Error::other("directory walk failed"));
                return Err(AnalysisError::io(&root, source));
            }
        };

        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        if !Language::from_path(path).is_some_and(&accept) {
            continue;
        }
        let relative = path.strip_prefix(&root).unwrap_or(path);
        if excludes.is_match(relative) {
            debug!(file = %relative.display(), "excluded by pattern");
            continue;
        }
        files.push(path.to_path_buf());
    }

    files.sort();
    Ok(files)
}

/// Collapse `.` and `..` components without touching the filesystem.
///
/// A path that collapses to nothing becomes `.`.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    if out.as_os_str().is_empty() {
        out.push(".");
    }
    out
}

/// `path` joined onto the working directory when relative, then normalized.
pub fn absolute_path(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        return Ok(normalize_path(path));
    }
    let cwd = std::env::current_dir().map_err(|e| AnalysisError::io(path, e))?;
    Ok(normalize_path(&cwd.join(path)))
}

fn strip_module_extension(path: &Path) -> PathBuf {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) if MODULE_EXTENSIONS.contains(&ext) => path.with_extension(""),
        _ => path.to_path_buf(),
    }
}

fn append_extension(path: &Path, ext: &str) -> PathBuf {
    let mut os = path.as_os_str().to_owned();
    os.push(".");
    os.push(ext);
    PathBuf::from(os)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn graph_with(root: &str, files: &[&str]) -> DependencyGraph {
        let mut graph = DependencyGraph::new(root);
        for f in files {
            graph.insert(FileNode::new(PathBuf::from(root).join(f)));
        }
        graph
    }

    #[test]
    fn test_normalize_path() {
        assert_eq!(
            normalize_path(Path::new("/a/b/./../c/d.ts")),
            PathBuf::from("/a/c/d.ts")
        );
        assert_eq!(normalize_path(Path::new("a/../../b")), PathBuf::from("../b"));
        assert_eq!(normalize_path(Path::new(".")), PathBuf::from("."));
        assert_eq!(normalize_path(Path::new("a/..")), PathBuf::from("."));
    }

    #[test]
    fn test_absolute_path() {
        let cwd = std::env::current_dir().unwrap();
        assert_eq!(absolute_path(Path::new(".")).unwrap(), normalize_path(&cwd));
        assert_eq!(absolute_path(Path::new("./x/../y.ts")).unwrap(), cwd.join("y.ts"));
        assert_eq!(
            absolute_path(Path::new("/p/./q")).unwrap(),
            PathBuf::from("/p/q")
        );
    }

    #[test]
    fn test_resolve_literal_extension_and_index() {
        let graph = graph_with(
            "/p",
            &["src/a.ts", "src/b.js", "src/util/index.ts", "src/c.tsx"],
        );
        let importer = Path::new("/p/src/a.ts");

        assert_eq!(
            graph.resolve_import(importer, "./b.js"),
            Some(PathBuf::from("/p/src/b.js"))
        );
        assert_eq!(
            graph.resolve_import(importer, "./b"),
            Some(PathBuf::from("/p/src/b.js"))
        );
        // `.js` written for a TypeScript source
        assert_eq!(
            graph.resolve_import(importer, "./c.js"),
            Some(PathBuf::from("/p/src/c.tsx"))
        );
        assert_eq!(
            graph.resolve_import(importer, "./util"),
            Some(PathBuf::from("/p/src/util/index.ts"))
        );
        assert_eq!(
            graph.resolve_import(Path::new("/p/src/util/index.ts"), "../a"),
            Some(PathBuf::from("/p/src/a.ts"))
        );
    }

    #[test]
    fn test_bare_and_missing_specifiers_unresolved() {
        let graph = graph_with("/p", &["a.ts"]);
        let importer = Path::new("/p/a.ts");
        assert_eq!(graph.resolve_import(importer, "react"), None);
        assert_eq!(graph.resolve_import(importer, "./missing"), None);
    }

    #[test]
    fn test_extension_preference_order() {
        let graph = graph_with("/p", &["a.ts", "m.js", "m.ts"]);
        assert_eq!(
            graph.resolve_import(Path::new("/p/a.ts"), "./m"),
            Some(PathBuf::from("/p/m.ts"))
        );
    }

    #[test]
    fn test_build_links_edges_both_ways() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        fs::write(root.join("a.ts"), "import { b } from './b';\nimport React from 'react';\n").unwrap();
        fs::write(root.join("b.ts"), "export const b = 1;\n").unwrap();

        let graph = GraphBuilder::new(root).build().unwrap();
        let root = normalize_path(root);
        let a = graph.get(&root.join("a.ts")).unwrap();
        let b = graph.get(&root.join("b.ts")).unwrap();

        assert_eq!(graph.len(), 2);
        assert!(a.imports_from.contains(&root.join("b.ts")));
        assert!(a.import_paths.contains("react"));
        assert_eq!(a.imports_from.len(), 1);
        assert!(b.imported_by.contains(&root.join("a.ts")));
        assert!(b.exported_names.contains("b"));
    }

    #[test]
    fn test_build_skips_vendor_and_excluded() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        fs::create_dir_all(root.join("node_modules/lib")).unwrap();
        fs::create_dir_all(root.join("generated")).unwrap();
        fs::write(root.join("node_modules/lib/index.js"), "export const x = 1;\n").unwrap();
        fs::write(root.join("generated/api.ts"), "export const y = 1;\n").unwrap();
        fs::write(root.join("main.ts"), "import './generated/api';\n").unwrap();
        fs::write(root.join("notes.md"), "# notes\n").unwrap();

        let graph = GraphBuilder::new(root)
            .exclude(["generated/**"])
            .build()
            .unwrap();

        assert_eq!(graph.len(), 1);
        assert_eq!(graph.edge_count(), 0);
    }

    #[test]
    fn test_invalid_glob_is_error() {
        let temp = TempDir::new().unwrap();
        let result = GraphBuilder::new(temp.path()).exclude(["a[b"]).build();
        assert!(matches!(result, Err(AnalysisError::Glob { .. })));
    }

    #[test]
    fn test_binary_file_does_not_abort_walk() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        fs::write(root.join("good.ts"), "export const ok = 1;\n").unwrap();
        fs::write(root.join("bad.ts"), [0xff, 0xfe, 0x00, 0x41]).unwrap();

        let graph = GraphBuilder::new(root).build().unwrap();
        assert!(graph.get(&normalize_path(root).join("good.ts")).is_some());
    }
}
