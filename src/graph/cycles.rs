//! Bounded circular-dependency detection.
//!
//! Depth-first search over `imports_from` edges. A node is marked visited
//! once its subtree is fully explored and is never entered again, so a cycle
//! that only closes through an already-finished node is not reported. Output
//! is capped by `max_cycles` and `max_cycle_length`, so dense graphs always
//! terminate with bounded output.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::builder::{absolute_path, DependencyGraph, GraphBuilder};

/// Limits for cycle detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CircularOptions {
    /// Longest cycle (in distinct files) that is reported.
    pub max_cycle_length: usize,
    /// Stop recording after this many cycles.
    pub max_cycles: usize,
}

impl Default for CircularOptions {
    fn default() -> Self {
        Self {
            max_cycle_length: 10,
            max_cycles: 50,
        }
    }
}

/// One closed import loop: first and last entries are the same file.
pub type Cycle = Vec<PathBuf>;

/// Finds import cycles in a [`DependencyGraph`].
pub struct CycleDetector<'g> {
    graph: &'g DependencyGraph,
    options: CircularOptions,
    visiting: HashSet<PathBuf>,
    visited: HashSet<PathBuf>,
    cycles: Vec<Cycle>,
    truncated: bool,
}

/// Cycles found by [`CycleDetector::run`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Detection {
    pub cycles: Vec<Cycle>,
    /// A cycle beyond `max_cycles` was found and the search stopped there.
    pub truncated: bool,
}

impl<'g> CycleDetector<'g> {
    pub fn new(graph: &'g DependencyGraph, options: CircularOptions) -> Self {
        Self {
            graph,
            options,
            visiting: HashSet::new(),
            visited: HashSet::new(),
            cycles: Vec::new(),
            truncated: false,
        }
    }

    /// Run detection over every node and return the recorded cycles.
    pub fn detect(self) -> Vec<Cycle> {
        self.run().cycles
    }

    /// Like [`detect`](Self::detect), also reporting whether the cap cut the search short.
    pub fn run(mut self) -> Detection {
        let graph = self.graph;
        for node in graph.nodes() {
            if self.truncated {
                break;
            }
            if !self.visited.contains(&node.path) {
                self.dfs(&node.path, &[]);
            }
        }
        Detection {
            cycles: self.cycles,
            truncated: self.truncated,
        }
    }

    fn record(&mut self, cycle: Cycle) {
        if self.cycles.len() >= self.options.max_cycles {
            self.truncated = true;
        } else {
            self.cycles.push(cycle);
        }
    }

    fn dfs(&mut self, path: &Path, trail: &[PathBuf]) {
        if self.truncated {
            return;
        }

        if self.visiting.contains(path) {
            if let Some(start) = trail.iter().position(|p| p == path) {
                let mut cycle: Cycle = trail[start..].to_vec();
                cycle.push(path.to_path_buf());
                if cycle.len() <= self.options.max_cycle_length + 1 {
                    self.record(cycle);
                }
            }
            return;
        }

        if self.visited.contains(path) {
            return;
        }

        // Each branch extends its own copy of the trail.
        let mut trail = trail.to_vec();
        trail.push(path.to_path_buf());
        self.visiting.insert(path.to_path_buf());

        let graph = self.graph;
        if let Some(node) = graph.get(path) {
            for next in &node.imports_from {
                self.dfs(next, &trail);
            }
        }

        self.visiting.remove(path);
        self.visited.insert(path.to_path_buf());
    }
}

/// A detected cycle, ready for reporting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CircularIssue {
    /// Root-relative files in cycle order, first repeated at the end.
    pub files: Vec<String>,
    /// Arrow-joined rendering of `files`.
    pub summary: String,
    /// Number of distinct files in the cycle.
    pub length: usize,
}

impl CircularIssue {
    pub fn from_cycle(graph: &DependencyGraph, cycle: &[PathBuf]) -> Self {
        let files: Vec<String> = cycle.iter().map(|p| graph.display_path(p)).collect();
        Self {
            summary: files.join(" → "),
            length: files.len().saturating_sub(1),
            files,
        }
    }
}

/// Outcome of [`check_circular`]. Failures are reported here, never thrown.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CircularCheckResult {
    pub success: bool,
    pub issues: Vec<CircularIssue>,
    pub summary: String,
    pub files_analyzed: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CircularCheckResult {
    fn failed(message: String) -> Self {
        Self {
            success: false,
            summary: format!("Circular dependency check failed: {}", message),
            error: Some(message),
            ..Default::default()
        }
    }
}

/// Build the dependency graph under `target` and report import cycles.
///
/// `target` may be a directory or a single file (its directory is walked).
pub fn check_circular(
    target: &Path,
    options: &CircularOptions,
    exclude_patterns: &[String],
) -> CircularCheckResult {
    let target = match absolute_path(target) {
        Ok(target) => target,
        Err(e) => {
            warn!(error = %e, "cannot resolve target");
            return CircularCheckResult::failed(e.to_string());
        }
    };
    let root = match target.parent() {
        Some(parent) if target.is_file() => parent.to_path_buf(),
        _ => target.clone(),
    };

    if !root.is_dir() {
        let message = format!("cannot access {}", target.display());
        warn!("{}", message);
        return CircularCheckResult::failed(message);
    }

    let graph = match GraphBuilder::new(&root)
        .exclude(exclude_patterns.iter().cloned())
        .build()
    {
        Ok(graph) => graph,
        Err(e) => {
            warn!(error = %e, "dependency graph build failed");
            return CircularCheckResult::failed(e.to_string());
        }
    };

    let detection = CycleDetector::new(&graph, *options).run();
    let issues: Vec<CircularIssue> = detection
        .cycles
        .iter()
        .map(|c| CircularIssue::from_cycle(&graph, c))
        .collect();

    let files = graph.len();
    let mut summary = match issues.len() {
        0 => format!("No circular dependencies found in {} files", files),
        1 => format!("Found 1 circular dependency in {} files", files),
        n => format!("Found {} circular dependencies in {} files", n, files),
    };
    if detection.truncated {
        summary.push_str(&format!(" (stopped at limit of {})", options.max_cycles));
    }
    info!(files, cycles = issues.len(), "circular dependency check finished");

    CircularCheckResult {
        success: true,
        issues,
        summary,
        files_analyzed: files,
        error: None,
    }
}
