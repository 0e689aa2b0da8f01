use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand, ValueEnum};

use crate::export::ExportFormat;

/// Shell types for completion generation
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum CompletionShell {
    Bash,
    Zsh,
    Fish,
    Powershell,
}

#[derive(Parser)]
#[command(name = "suppscore")]
#[command(author, version, about = "Extract supplement facts from product pages and score their quality", long_about = None)]
#[command(after_help = r#"Examples:
  suppscore scrape "https://www.iherb.com/pr/now-foods-magnesium/..."   Score one product page
  suppscore extract saved.html --url https://www.target.com/p/...       Use a page saved from a browser
  suppscore batch urls.csv --output products.csv --summary summary.csv  Process a list of URLs
  suppscore categorize "Whey protein isolate, creatine monohydrate"     Categorize an ingredient list
"#)]
pub struct Cli {
    /// More log output on stderr (-v info, -vv debug); RUST_LOG overrides
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Fetch a product page, extract its facts and score it
    Scrape {
        /// Product page URL (http:// or https://)
        url: String,

        /// Fetch timeout in seconds (overrides config)
        #[arg(long)]
        timeout: Option<u64>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Run extraction and scoring on a saved HTML file (no network)
    Extract {
        /// HTML file
        file: PathBuf,

        /// URL the page was saved from (selects retailer rules, resolves images)
        #[arg(long)]
        url: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Process a list of URLs one at a time with a politeness delay
    #[command(after_help = r#"Input files:
  .csv / .tsv   URLs from the column whose header contains "url" or "link",
                otherwise from the first column
  anything else one URL per line, '#' starts a comment

Examples:
  suppscore batch urls.txt
  suppscore batch products.csv --format keyed --output products.json
  suppscore batch urls.txt --delay 1 --summary summary.csv
"#)]
    Batch {
        /// File listing product URLs
        file: PathBuf,

        /// Seconds between fetches, 1-3 (overrides config)
        #[arg(long)]
        delay: Option<u64>,

        /// Fetch timeout in seconds (overrides config)
        #[arg(long)]
        timeout: Option<u64>,

        /// Write scored products here
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Layout of --output
        #[arg(long, value_enum, default_value = "csv")]
        format: ExportFormat,

        /// Write the URL/Status/Brand/Product/Score table as CSV here
        #[arg(long)]
        summary: Option<PathBuf>,
    },

    /// Score product records from a JSON file (one object or an array)
    Score {
        /// JSON file with product records
        file: PathBuf,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Categorize an ingredient list
    Categorize {
        /// Ingredient text
        text: String,
    },

    /// Write the default config file
    Init {
        /// Overwrite an existing config
        #[arg(long)]
        force: bool,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: CompletionShell,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_batch_args() {
        let cli = Cli::parse_from(["suppscore", "-vv", "batch", "urls.csv", "--delay", "2", "--format", "keyed"]);
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::Batch { delay, format, output, .. } => {
                assert_eq!(delay, Some(2));
                assert_eq!(format, ExportFormat::Keyed);
                assert!(output.is_none());
            }
            _ => panic!("expected batch"),
        }
    }
}
