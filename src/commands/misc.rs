//! Miscellaneous commands: score, categorize, init, completions

use clap::CommandFactory;
use clap_complete::{generate, Shell};
use colored::Colorize;
use std::io;
use std::path::Path;

use suppscore::categorize::categorize;
use suppscore::cli::{Cli, CompletionShell};
use suppscore::config::Config;
use suppscore::error::{Result, ScrapeError};
use suppscore::export::ScoredProduct;
use suppscore::record::{present, ProductRecord};
use suppscore::score::calculate_scores;

use crate::commands::print_product;

/// Score records read from JSON; missing categories are derived from ingredients
pub fn cmd_score(file: &Path, json: bool) -> Result<()> {
    let content = std::fs::read_to_string(file)?;
    let value: serde_json::Value = serde_json::from_str(&content)?;
    let records: Vec<ProductRecord> = match value {
        serde_json::Value::Array(_) => serde_json::from_value(value)?,
        serde_json::Value::Object(_) => vec![serde_json::from_value(value)?],
        _ => {
            return Err(ScrapeError::ParseError(
                "expected a product object or an array of them".into(),
            ))
        }
    };

    let products: Vec<ScoredProduct> = records
        .into_iter()
        .map(|mut record| {
            if record.main_category.trim().is_empty() {
                let (main, sub) = categorize(present(&record.ingredients).unwrap_or(""));
                record.main_category = main.to_string();
                record.subcategory = sub.to_string();
            }
            let scores = calculate_scores(&record);
            ScoredProduct::new(record, scores)
        })
        .collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&products)?);
        return Ok(());
    }
    for product in &products {
        print_product(product, false)?;
    }
    Ok(())
}

pub fn cmd_categorize(text: &str) -> Result<()> {
    let (main, sub) = categorize(text);
    println!("{} > {}", main.bold(), sub);
    Ok(())
}

/// Write the default config file
pub fn cmd_init(force: bool) -> Result<()> {
    let path = Config::config_path()?;
    if path.exists() && !force {
        println!("Config already exists at {}", path.display());
        println!("Use --force to overwrite it with defaults.");
        return Ok(());
    }
    Config::default().save()?;
    println!("{} {}", "Wrote".green(), path.display());
    Ok(())
}

/// Generate shell completions
pub fn cmd_completions(shell: CompletionShell) -> Result<()> {
    let mut cmd = Cli::command();
    let shell = match shell {
        CompletionShell::Bash => Shell::Bash,
        CompletionShell::Zsh => Shell::Zsh,
        CompletionShell::Fish => Shell::Fish,
        CompletionShell::Powershell => Shell::PowerShell,
    };
    generate(shell, &mut cmd, "suppscore", &mut io::stdout());
    Ok(())
}
