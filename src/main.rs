//! suppscore - supplement product page extractor and quality scorer

use clap::Parser;
use colored::Colorize;
use tracing_subscriber::EnvFilter;

use suppscore::cli::{Cli, Commands};
use suppscore::error::Result;

mod commands;
mod utils;

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("{} {}", "Error:".red().bold(), e);
        if let Some(hint) = e.hint() {
            eprintln!("\n{}", hint);
        }
        std::process::exit(1);
    }
}

/// Logs go to stderr; RUST_LOG wins over -v
fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("suppscore={}", default_level)));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Scrape { url, timeout, json } => commands::cmd_scrape(&url, timeout, json),
        Commands::Extract { file, url, json } => commands::cmd_extract(&file, &url, json),
        Commands::Batch {
            file,
            delay,
            timeout,
            output,
            format,
            summary,
        } => commands::cmd_batch(&file, delay, timeout, output, format, summary),
        Commands::Score { file, json } => commands::cmd_score(&file, json),
        Commands::Categorize { text } => commands::cmd_categorize(&text),
        Commands::Init { force } => commands::cmd_init(force),
        Commands::Completions { shell } => commands::cmd_completions(shell),
    }
}
