//! Single-page commands: scrape (network) and extract (saved HTML)

use colored::Colorize;
use std::path::Path;

use suppscore::batch::{analyze_html, scrape_url, Status};
use suppscore::config::Config;
use suppscore::error::Result;
use suppscore::export::ScoredProduct;
use suppscore::fetch::HttpFetcher;
use suppscore::record::Field;

use crate::utils::{format_field, format_score, format_status, use_color};

/// Fetch a product page and print its record and scores
pub fn cmd_scrape(url: &str, timeout: Option<u64>, json: bool) -> Result<()> {
    let mut config = Config::load()?;
    if let Some(t) = timeout {
        config.timeout_secs = t;
        config.validate()?;
    }

    if !json {
        println!("\n  Fetching {}...", url);
    }
    let fetcher = HttpFetcher::new(&config);
    let product = scrape_url(&fetcher, url)?;
    print_product(&product, json)
}

/// Run the pipeline on a saved HTML file
pub fn cmd_extract(file: &Path, url: &str, json: bool) -> Result<()> {
    let html = std::fs::read_to_string(file)?;
    let product = analyze_html(&html, url)?;
    print_product(&product, json)
}

const TEXT_FIELDS: &[Field] = &[
    Field::Ingredients,
    Field::Directions,
    Field::Warnings,
    Field::ServingSize,
    Field::CountryOfOrigin,
    Field::Certifications,
];

pub fn print_product(product: &ScoredProduct, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(product)?);
        return Ok(());
    }

    let color = use_color();
    let record = &product.record;
    let status = Status::from_record(record).to_string();

    println!();
    println!("  {}", format_field(&record.product_name, 70, color).bold());
    println!("  Brand:      {}", format_field(&record.brand, 60, color));
    println!("  Category:   {} > {}", record.main_category, record.subcategory);
    println!("  Status:     {}", format_status(&status, color));
    println!("  ID:         {} ({})", product.id, product.last_updated);
    println!();

    for field in TEXT_FIELDS {
        let value = record.text(*field).unwrap_or("");
        println!("  {:<18} {}", format!("{}:", field.label()), format_field(value, 100, color));
        if let Some(source) = record.sources.get(field) {
            let via = format!("via {}", source);
            println!("  {:<18} {}", "", if color { via.dimmed().to_string() } else { via });
        }
    }

    for field in [Field::ImageUrl, Field::IngredientImageUrl] {
        let value = record.text(field).unwrap_or("-");
        println!("  {:<18} {}", format!("{}:", field.label()), value);
    }

    let flags: Vec<&str> = [
        (record.gmp_certified, "GMP"),
        (record.third_party_tested, "third-party tested"),
        (record.allergen_free, "allergen-free"),
        (record.vegan, "vegan"),
        (record.gluten_free, "gluten-free"),
        (record.non_gmo, "non-GMO"),
        (record.organic, "organic"),
    ]
    .iter()
    .filter(|(set, _)| *set)
    .map(|(_, name)| *name)
    .collect();
    println!(
        "  {:<18} {}",
        "Claims:",
        if flags.is_empty() { "-".to_string() } else { flags.join(", ") }
    );

    let s = &product.scores;
    println!("\n  {}", "Scores".bold());
    let rows = [
        ("Ingredients", s.ingredients_score),
        ("Manufacturing", s.manufacturing_quality_score),
        ("Testing", s.testing_verification_score),
        ("Label accuracy", s.label_accuracy_score),
        ("Nutritional", s.nutritional_quality_score),
        ("Sustainability", s.sustainability_score),
    ];
    for (name, score) in rows {
        println!("    {:<16} {}", name, format_score(score, color));
    }
    println!("    {} {}", format!("{:<16}", "Overall").bold(), format_score(s.overall_score, color));
    println!();
    Ok(())
}
