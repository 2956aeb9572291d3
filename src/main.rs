//! codelens CLI entry point.

use clap::Parser;
use codelens::cli::{self, Cli, EXIT_ERROR};
use codelens::logging;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    logging::init(cli.verbose, cli.json_logs);

    let exit_code = match cli::run(&cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            EXIT_ERROR
        }
    };

    std::process::exit(exit_code);
}
