//! Command-line interface for codelens.

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};

use crate::analysis::Language;
use crate::callgraph::{CallGraphAdapter, Position, PythonCallGraph};
use crate::config::{self, Config};
use crate::deadcode::{self, DeadCodeOptions};
use crate::graph::{self, absolute_path, collect_source_files, compile_excludes};
use crate::report::{self, CallQueryResult};

/// Exit codes.
pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_FAILED: i32 = 1;
pub const EXIT_ERROR: i32 = 2;

/// Structural facts about multi-language codebases.
///
/// Finds import cycles, unused parameters, locals and private fields, and
/// answers call-hierarchy queries, all from syntax trees without running
/// the code.
#[derive(Parser)]
#[command(name = "codelens")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Pretty, global = true)]
    pub format: OutputFormat,

    /// Path to configuration YAML file (default: auto-discover)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Emit logs as JSON on stderr
    #[arg(long, global = true)]
    pub json_logs: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Detect circular imports between JavaScript/TypeScript modules
    #[command(visible_alias = "cycles")]
    Circular(CircularArgs),
    /// Report unused parameters, locals and private fields
    DeadCode(DeadCodeArgs),
    /// List functions, methods and classes declared in a file
    Symbols(SymbolsArgs),
    /// Query the call hierarchy at a position
    Calls(CallsArgs),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Pretty,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Direction {
    Incoming,
    Outgoing,
    References,
    Definition,
}

/// Arguments for the circular command.
#[derive(Args)]
pub struct CircularArgs {
    /// Directory (or file within it) to check
    pub path: PathBuf,

    /// Longest cycle, in files, to report
    #[arg(long)]
    pub max_cycle_length: Option<usize>,

    /// Stop after this many cycles
    #[arg(long)]
    pub max_cycles: Option<usize>,

    /// Extra glob patterns to exclude (repeatable)
    #[arg(short, long)]
    pub exclude: Vec<String>,
}

/// Arguments for the dead-code command.
#[derive(Args)]
pub struct DeadCodeArgs {
    /// File or directory to check
    pub path: PathBuf,

    /// Extra glob patterns to exclude (repeatable)
    #[arg(short, long)]
    pub exclude: Vec<String>,

    /// Do not report unused parameters
    #[arg(long)]
    pub no_parameters: bool,

    /// Do not report unused local variables
    #[arg(long)]
    pub no_locals: bool,

    /// Do not report unused private fields
    #[arg(long)]
    pub no_fields: bool,
}

/// Arguments for the symbols command.
#[derive(Args)]
pub struct SymbolsArgs {
    /// Source file to list
    pub file: PathBuf,

    /// Project root (default: the file's directory)
    #[arg(long)]
    pub root: Option<PathBuf>,
}

/// Arguments for the calls command.
#[derive(Args)]
pub struct CallsArgs {
    /// Source file containing the position
    pub file: PathBuf,

    /// 1-based line
    pub line: usize,

    /// 1-based column
    #[arg(default_value_t = 1)]
    pub column: usize,

    /// Project root (default: the file's directory)
    #[arg(long)]
    pub root: Option<PathBuf>,

    /// What to look up
    #[arg(short, long, value_enum, default_value_t = Direction::Incoming)]
    pub direction: Direction,

    /// Parse every supported file under the root before querying
    #[arg(long)]
    pub preload: bool,
}

/// Run the selected command.
pub async fn run(cli: &Cli) -> anyhow::Result<i32> {
    let cwd = std::env::current_dir()?;
    let config = match Config::load(cli.config.as_deref(), &cwd) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: invalid configuration: {:#}", e);
            return Ok(EXIT_ERROR);
        }
    };

    match &cli.command {
        Commands::Circular(args) => run_circular(args, &config, cli.format),
        Commands::DeadCode(args) => run_dead_code(args, &config, cli.format),
        Commands::Symbols(args) => run_symbols(args, cli.format).await,
        Commands::Calls(args) => run_calls(args, &config, cli.format).await,
    }
}

fn merged_excludes(config: &Config, extra: &[String]) -> Vec<String> {
    config
        .exclude
        .iter()
        .chain(extra.iter())
        .cloned()
        .collect()
}

/// Run the circular command.
pub fn run_circular(
    args: &CircularArgs,
    config: &Config,
    format: OutputFormat,
) -> anyhow::Result<i32> {
    let mut effective = config.clone();
    if let Some(length) = args.max_cycle_length {
        effective.circular.max_cycle_length = length;
    }
    if let Some(max) = args.max_cycles {
        effective.circular.max_cycles = max;
    }
    effective.exclude = merged_excludes(config, &args.exclude);
    if let Err(e) = config::validate(&effective) {
        eprintln!("Error: {}", e);
        return Ok(EXIT_ERROR);
    }

    let result = graph::check_circular(&args.path, &effective.circular, &effective.exclude);
    let path_str = args.path.to_string_lossy().to_string();

    match format {
        OutputFormat::Json => report::write_json("circular", &path_str, &result)?,
        OutputFormat::Pretty => report::write_circular_pretty(&path_str, &result),
    }

    Ok(if !result.success {
        EXIT_ERROR
    } else if result.issues.is_empty() {
        EXIT_SUCCESS
    } else {
        EXIT_FAILED
    })
}

/// Run the dead-code command.
pub fn run_dead_code(
    args: &DeadCodeArgs,
    config: &Config,
    format: OutputFormat,
) -> anyhow::Result<i32> {
    let options = DeadCodeOptions {
        unused_parameters: config.dead_code.unused_parameters && !args.no_parameters,
        unused_locals: config.dead_code.unused_locals && !args.no_locals,
        unused_private_fields: config.dead_code.unused_private_fields && !args.no_fields,
    };
    let excludes = merged_excludes(config, &args.exclude);

    let outcome = deadcode::check_dead_code_dir(&args.path, &excludes, &options);
    let path_str = args.path.to_string_lossy().to_string();

    match format {
        OutputFormat::Json => report::write_json("dead-code", &path_str, &outcome)?,
        OutputFormat::Pretty => {
            let base = absolutize(&args.path)?;
            report::write_dead_code_pretty(&path_str, &base, &outcome)
        }
    }

    Ok(if !outcome.success {
        EXIT_ERROR
    } else if outcome.issues.is_empty() {
        EXIT_SUCCESS
    } else {
        EXIT_FAILED
    })
}

/// Absolute, lexically normalized form of `path`.
fn absolutize(path: &Path) -> anyhow::Result<PathBuf> {
    Ok(absolute_path(path)?)
}

/// The file plus the project root to initialize the adapter with.
fn locate(file: &Path, root: Option<&Path>) -> anyhow::Result<(PathBuf, PathBuf)> {
    let file = absolutize(file)?;
    let root = match root {
        Some(root) => absolutize(root)?,
        None => file
            .parent()
            .map(Path::to_path_buf)
            .ok_or_else(|| anyhow::anyhow!("{} has no parent directory", file.display()))?,
    };
    Ok((file, root))
}

/// The call-graph adapter handling `file`, if any.
pub fn adapter_for(file: &Path) -> Option<Box<dyn CallGraphAdapter>> {
    let adapters: Vec<Box<dyn CallGraphAdapter>> = vec![Box::new(PythonCallGraph::new())];
    adapters.into_iter().find(|adapter| adapter.supports_file(file))
}

/// Run the symbols command.
pub async fn run_symbols(args: &SymbolsArgs, format: OutputFormat) -> anyhow::Result<i32> {
    let (file, root) = locate(&args.file, args.root.as_deref())?;
    let Some(adapter) = adapter_for(&file) else {
        eprintln!("Error: no call-graph adapter handles {}", args.file.display());
        return Ok(EXIT_ERROR);
    };
    adapter.initialize(&root).await?;

    let symbols = adapter.get_file_symbols(&file).await?;
    adapter.shutdown().await;

    let path_str = args.file.to_string_lossy().to_string();
    match format {
        OutputFormat::Json => report::write_json("symbols", &path_str, &symbols)?,
        OutputFormat::Pretty => report::write_symbols_pretty(&path_str, &symbols),
    }
    Ok(EXIT_SUCCESS)
}

/// Pass every file under `root` that `adapter` handles through
/// `get_file_symbols`, making it visible to reference queries.
pub async fn preload(
    adapter: &dyn CallGraphAdapter,
    root: &Path,
    exclude_patterns: &[String],
) -> anyhow::Result<usize> {
    let excludes = compile_excludes(exclude_patterns)?;
    let files = collect_source_files(root, &excludes, |language| language == Language::Python)?;
    let mut loaded = 0;
    for file in files.iter().filter(|f| adapter.supports_file(f)) {
        adapter.get_file_symbols(file).await?;
        loaded += 1;
    }
    tracing::info!(files = loaded, root = %root.display(), "preloaded call graph");
    Ok(loaded)
}

/// Run the calls command.
pub async fn run_calls(
    args: &CallsArgs,
    config: &Config,
    format: OutputFormat,
) -> anyhow::Result<i32> {
    if args.line == 0 || args.column == 0 {
        eprintln!("Error: line and column are 1-based");
        return Ok(EXIT_ERROR);
    }
    let (file, root) = locate(&args.file, args.root.as_deref())?;
    let Some(adapter) = adapter_for(&file) else {
        eprintln!("Error: no call-graph adapter handles {}", args.file.display());
        return Ok(EXIT_ERROR);
    };
    adapter.initialize(&root).await?;
    if args.preload {
        preload(&*adapter, &root, &config.exclude).await?;
    }

    let position = Position::new(args.line, args.column);
    let result = query_calls(&*adapter, &file, args.direction, position).await?;
    adapter.shutdown().await;

    let path_str = format!("{}:{}:{}", args.file.display(), args.line, args.column);
    match format {
        OutputFormat::Json => report::write_json("calls", &path_str, &result)?,
        OutputFormat::Pretty => report::write_calls_pretty(&path_str, &root, &result),
    }
    Ok(EXIT_SUCCESS)
}

/// Answer one call-hierarchy query.
pub async fn query_calls(
    adapter: &dyn CallGraphAdapter,
    file: &Path,
    direction: Direction,
    position: Position,
) -> crate::error::Result<CallQueryResult> {
    // The queried file itself always takes part.
    adapter.get_file_symbols(file).await?;

    Ok(match direction {
        Direction::References => {
            CallQueryResult::References(adapter.find_references(file, position).await?)
        }
        Direction::Definition => {
            CallQueryResult::Definition(adapter.get_definition(file, position).await?)
        }
        Direction::Incoming => {
            let mut calls = Vec::new();
            for item in adapter.prepare_call_hierarchy(file, position).await? {
                calls.extend(adapter.get_incoming_calls(&item).await?);
            }
            CallQueryResult::Incoming(calls)
        }
        Direction::Outgoing => {
            let mut calls = Vec::new();
            for item in adapter.prepare_call_hierarchy(file, position).await? {
                calls.extend(adapter.get_outgoing_calls(&item).await?);
            }
            CallQueryResult::Outgoing(calls)
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_calls_args() {
        let cli = Cli::try_parse_from([
            "codelens", "calls", "pkg/a.py", "12", "--direction", "outgoing", "--preload", "-f",
            "json",
        ])
        .unwrap();
        assert_eq!(cli.format, OutputFormat::Json);
        match cli.command {
            Commands::Calls(args) => {
                assert_eq!(args.line, 12);
                assert_eq!(args.column, 1);
                assert_eq!(args.direction, Direction::Outgoing);
                assert!(args.preload);
            }
            _ => panic!("expected calls command"),
        }
    }

    #[test]
    fn test_merged_excludes() {
        let config = Config {
            exclude: vec!["gen/**".to_string()],
            ..Default::default()
        };
        assert_eq!(
            merged_excludes(&config, &["dist/**".to_string()]),
            vec!["gen/**", "dist/**"]
        );
    }

    #[test]
    fn test_adapter_for() {
        assert!(adapter_for(Path::new("/p/a.py")).is_some());
        assert!(adapter_for(Path::new("/p/a.ts")).is_none());
    }

    #[test]
    fn test_locate_defaults_root_to_parent() {
        let (file, root) = locate(Path::new("/p/pkg/../a.py"), None).unwrap();
        assert_eq!(file, PathBuf::from("/p/a.py"));
        assert_eq!(root, PathBuf::from("/p"));
    }
}
