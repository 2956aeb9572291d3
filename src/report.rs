//! Output formatting for codelens results.
//!
//! Supports two output formats:
//! - Pretty: colored terminal output for human readability
//! - JSON: structured output for programmatic consumption

use colored::*;
use serde::Serialize;
use std::path::Path;

use crate::callgraph::{FileSymbol, IncomingCall, Location, OutgoingCall};
use crate::deadcode::{DeadCodeReport, IssueKind};
use crate::graph::CircularCheckResult;

// =============================================================================
// JSON Format
// =============================================================================

/// Envelope around every JSON result.
#[derive(Debug, Serialize)]
pub struct JsonReport<'a, T: Serialize> {
    pub version: &'static str,
    pub command: &'a str,
    pub path: &'a str,
    pub result: &'a T,
}

impl<'a, T: Serialize> JsonReport<'a, T> {
    pub fn new(command: &'a str, path: &'a str, result: &'a T) -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION"),
            command,
            path,
            result,
        }
    }
}

/// Write any result in JSON format.
pub fn write_json<T: Serialize>(command: &str, path: &str, result: &T) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(&JsonReport::new(command, path, result))?;
    println!("{}", json);
    Ok(())
}

/// Answer of a `calls` query, tagged by direction.
#[derive(Debug, Serialize)]
#[serde(tag = "direction", content = "results", rename_all = "lowercase")]
pub enum CallQueryResult {
    Incoming(Vec<IncomingCall>),
    Outgoing(Vec<OutgoingCall>),
    References(Vec<Location>),
    Definition(Vec<Location>),
}

impl CallQueryResult {
    pub fn len(&self) -> usize {
        match self {
            CallQueryResult::Incoming(v) => v.len(),
            CallQueryResult::Outgoing(v) => v.len(),
            CallQueryResult::References(v) | CallQueryResult::Definition(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Path of `file` relative to `base`, with `/` separators.
pub fn make_relative_path(file: &Path, base: &Path) -> String {
    if base.as_os_str().is_empty() {
        return file.to_string_lossy().to_string();
    }

    // Single-file runs show just the filename.
    if file == base {
        return file
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| file.to_string_lossy().to_string());
    }

    file.strip_prefix(base)
        .map(|p| p.to_string_lossy().replace('\\', "/"))
        .unwrap_or_else(|_| file.to_string_lossy().to_string())
}

// =============================================================================
// Pretty Format
// =============================================================================

fn write_header(command: &str, path: &str) {
    println!();
    print!("  ");
    print!("{}", "codelens".cyan().bold());
    println!(" v{}  {}", env!("CARGO_PKG_VERSION"), command.dimmed());
    println!();
    print!("  {}", "Target: ".dimmed());
    println!("{}", path);
    println!();
}

fn write_status(clean: bool, summary: &str) {
    if clean {
        println!("  {}  {}", "✓".green(), summary);
    } else {
        println!("  {}  {}", "✗".red(), summary);
    }
}

/// Circular dependency results.
pub fn write_circular_pretty(path: &str, result: &CircularCheckResult) {
    write_header("circular", path);

    if !result.success {
        println!("  {}  {}", "ERROR".red().bold(), result.summary);
        println!();
        return;
    }

    write_status(result.issues.is_empty(), &result.summary);
    println!();

    for (index, issue) in result.issues.iter().enumerate() {
        print!("    {} ", format!("#{:<3}", index + 1).dimmed());
        print!("{}", issue.summary.yellow());
        println!("  {}", format!("({} files)", issue.length).dimmed());
    }
    if !result.issues.is_empty() {
        println!();
    }
}

/// Dead-code results.
pub fn write_dead_code_pretty(path: &str, base: &Path, report: &DeadCodeReport) {
    write_header("dead-code", path);

    if !report.success {
        println!("  {}  {}", "ERROR".red().bold(), report.summary);
        println!();
        return;
    }

    write_status(report.issues.is_empty(), &report.summary);
    println!();

    if report.issues.is_empty() {
        return;
    }

    for issue in &report.issues {
        write_kind_tag(issue.kind);
        print!("{}", make_relative_path(Path::new(&issue.file), base).blue());
        println!("{}", format!(":{}", issue.line).dimmed());
        println!("            {}", issue.message());
    }
    println!();

    println!("  {}", "Breakdown:".bold());
    for (kind, count) in report.counts() {
        if count > 0 {
            println!("    {:<24} {:>4}", kind.as_str(), count);
        }
    }
    println!();
}

fn write_kind_tag(kind: IssueKind) {
    match kind {
        IssueKind::UnusedParameter => print!("    {} ", "PARAM ".yellow()),
        IssueKind::UnusedLocalVariable => print!("    {} ", "LOCAL ".yellow()),
        IssueKind::UnusedPrivateField => print!("    {} ", "FIELD ".magenta()),
    }
}

/// Symbols declared in one file.
pub fn write_symbols_pretty(path: &str, symbols: &[FileSymbol]) {
    write_header("symbols", path);

    if symbols.is_empty() {
        println!("  {}", "No symbols found".dimmed());
        println!();
        return;
    }

    for symbol in symbols {
        let indent = if symbol.container.is_some() { "      " } else { "    " };
        print!("{}{:<9}", indent, symbol.kind.to_string().dimmed());
        if symbol.exported {
            print!("{}", symbol.qualified_name.bold());
        } else {
            print!("{}", symbol.qualified_name.as_str());
        }
        println!(
            "  {}",
            format!(":{}", symbol.location.line).dimmed()
        );
        if let Some(detail) = &symbol.detail {
            println!("{}    {}", indent, detail.dimmed());
        }
    }
    println!();
}

/// Answer of a `calls` query.
pub fn write_calls_pretty(path: &str, base: &Path, result: &CallQueryResult) {
    write_header("calls", path);

    if result.is_empty() {
        println!("  {}", "No results".dimmed());
        println!();
        return;
    }

    let at = |location: &Location| {
        format!(
            "{}:{}:{}",
            make_relative_path(&location.file, base),
            location.line,
            location.column
        )
    };

    match result {
        CallQueryResult::Incoming(calls) => {
            println!("  {} ({}):", "Callers".bold(), calls.len());
            for call in calls {
                print!("    {}", call.from.qualified_name.cyan());
                println!("  {}", at(&call.from.location()).blue());
                for range in &call.from_ranges {
                    println!("        {}", format!("call at {}", range).dimmed());
                }
            }
        }
        CallQueryResult::Outgoing(calls) => {
            println!("  {} ({}):", "Callees".bold(), calls.len());
            for call in calls {
                print!("    {}", call.callee.cyan());
                match &call.to {
                    Some(target) => println!("  → {}", at(&target.location()).blue()),
                    None => println!("  {}", "(unresolved)".dimmed()),
                }
                for range in &call.from_ranges {
                    println!("        {}", format!("call at {}", range).dimmed());
                }
            }
        }
        CallQueryResult::References(locations) | CallQueryResult::Definition(locations) => {
            let title = if matches!(result, CallQueryResult::References(_)) {
                "References"
            } else {
                "Definitions"
            };
            println!("  {} ({}):", title.bold(), locations.len());
            for location in locations {
                println!("    {}", at(location).blue());
            }
        }
    }
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::callgraph::{CallHierarchyItem, Position};
    use std::path::PathBuf;

    #[test]
    fn test_make_relative_path() {
        let base = Path::new("/repo");
        assert_eq!(make_relative_path(Path::new("/repo/src/a.ts"), base), "src/a.ts");
        assert_eq!(make_relative_path(Path::new("/elsewhere/b.ts"), base), "/elsewhere/b.ts");
        assert_eq!(make_relative_path(Path::new("/repo/a.py"), Path::new("/repo/a.py")), "a.py");
        assert_eq!(make_relative_path(Path::new("x.go"), Path::new("")), "x.go");
    }

    #[test]
    fn test_json_envelope() {
        let result = CircularCheckResult {
            success: true,
            issues: Vec::new(),
            summary: "No circular dependencies found in 2 files".to_string(),
            files_analyzed: 2,
            error: None,
        };
        let value = serde_json::to_value(JsonReport::new("circular", "src", &result)).unwrap();
        assert_eq!(value["version"], env!("CARGO_PKG_VERSION"));
        assert_eq!(value["command"], "circular");
        assert_eq!(value["result"]["files_analyzed"], 2);
        assert!(value["result"].get("error").is_none());
    }

    #[test]
    fn test_call_query_result_tagging() {
        let item = CallHierarchyItem::module(Path::new("/p/a.py"));
        let result = CallQueryResult::Incoming(vec![IncomingCall {
            from: item,
            from_ranges: vec![Position::new(3, 1)],
        }]);
        assert_eq!(result.len(), 1);
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["direction"], "incoming");
        assert_eq!(value["results"][0]["from"]["kind"], "module");
        assert_eq!(value["results"][0]["from_ranges"][0]["line"], 3);

        let empty = CallQueryResult::Definition(Vec::<Location>::new());
        assert!(empty.is_empty());
        let location = Location {
            file: PathBuf::from("/p/b.py"),
            line: 1,
            column: 1,
            end_line: None,
        };
        let value = serde_json::to_value(CallQueryResult::References(vec![location])).unwrap();
        assert_eq!(value["direction"], "references");
        assert!(value["results"][0].get("end_line").is_none());
    }
}
