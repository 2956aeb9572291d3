//! File-level dependency graph and import-cycle detection.

mod builder;
mod cycles;
mod module_syntax;

pub use builder::{
    absolute_path, collect_source_files, compile_excludes, normalize_path, DependencyGraph,
    FileNode, GraphBuilder, MODULE_EXTENSIONS, SKIPPED_DIRS,
};
pub use cycles::{
    check_circular, CircularCheckResult, CircularIssue, CircularOptions, Cycle, CycleDetector,
    Detection,
};
pub use module_syntax::{extract_module_syntax, ImportSpec, ModuleSyntax};
