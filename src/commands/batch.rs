//! Batch command: many URLs, one at a time

use colored::Colorize;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use suppscore::batch::{load_urls, BatchItem, BatchRunner, SummaryRow};
use suppscore::config::{check_delay, Config};
use suppscore::error::{Result, ScrapeError};
use suppscore::export::{self, ExportFormat, ScoredProduct};
use suppscore::fetch::HttpFetcher;

use crate::utils::{format_status, truncate_str, use_color};

pub fn cmd_batch(
    file: &Path,
    delay: Option<u64>,
    timeout: Option<u64>,
    output: Option<PathBuf>,
    format: ExportFormat,
    summary: Option<PathBuf>,
) -> Result<()> {
    let mut config = Config::load()?;
    if let Some(d) = delay {
        config.delay_secs = check_delay(d)?;
    }
    if let Some(t) = timeout {
        config.timeout_secs = t;
    }
    config.validate()?;

    let urls = load_urls(file)?;
    if urls.is_empty() {
        println!("No URLs found in {}", file.display());
        return Ok(());
    }

    let cancel = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&cancel);
    ctrlc::set_handler(move || {
        eprintln!("\nCancelling after the current page...");
        flag.store(true, Ordering::SeqCst);
    })
    .map_err(|e| ScrapeError::ConfigError(format!("Failed to set Ctrl+C handler: {}", e)))?;

    let color = use_color();
    let total = urls.len();
    println!(
        "\nProcessing {} URL{} ({}s between requests)\n",
        total,
        if total == 1 { "" } else { "s" },
        config.delay_secs
    );

    let runner = BatchRunner::new(HttpFetcher::new(&config), config.delay())
        .with_cancel_flag(cancel);
    let items = runner.run_with(&urls, |i, item| {
        println!(
            "  [{}/{}] {}  {}",
            i + 1,
            total,
            format_status(&item.status.to_string(), color),
            truncate_str(&item.url, 70)
        );
    });

    let rows: Vec<SummaryRow> = items.iter().map(BatchItem::summary_row).collect();
    print_summary(&rows, color);
    let failed = items.iter().filter(|i| i.status.is_failure()).count();
    let partial = items.iter().filter(|i| i.status.is_partial()).count();
    println!(
        "\n  {} succeeded, {} partial, {} failed\n",
        items.len() - failed - partial,
        partial,
        failed
    );

    if let Some(path) = summary {
        export::write_summary(&rows, BufWriter::new(File::create(&path)?))?;
        println!("Summary written to {}", path.display());
    }

    let products: Vec<ScoredProduct> = items.into_iter().filter_map(BatchItem::into_product).collect();
    if let Some(path) = output {
        export::export(&products, format, BufWriter::new(File::create(&path)?))?;
        println!(
            "{} product{} written to {}",
            products.len(),
            if products.len() == 1 { "" } else { "s" },
            path.display()
        );
    }

    Ok(())
}

fn print_summary(rows: &[SummaryRow], color: bool) {
    let header = format!("{:<42} {:<58} {:<20} {:<28} {:>5}", "URL", "Status", "Brand", "Product", "Score");
    println!("\n  {}", if color { header.bold().to_string() } else { header });
    for row in rows {
        // pad before coloring so escape codes don't break alignment
        let status = format_status(&format!("{:<58}", truncate_str(&row.status, 58)), color);
        println!(
            "  {:<42} {} {:<20} {:<28} {:>5}",
            truncate_str(&row.url, 42),
            status,
            truncate_str(&row.brand, 20),
            truncate_str(&row.product, 28),
            row.score
        );
    }
}
