//! Export of scored products: CSV, JSON array, keyed JSON, batch summary

use std::io::Write;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::batch::SummaryRow;
use crate::error::Result;
use crate::record::ProductRecord;
use crate::score::ScoreRecord;

/// Export layouts
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    /// One row per product
    Csv,
    /// JSON array of products
    Json,
    /// JSON object keyed by product id
    Keyed,
}

/// A product record merged with its scores, ready for persistence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredProduct {
    pub id: String,
    #[serde(flatten)]
    pub record: ProductRecord,
    #[serde(flatten)]
    pub scores: ScoreRecord,
    /// YYYY-MM-DD
    pub last_updated: String,
}

impl ScoredProduct {
    pub fn new(record: ProductRecord, scores: ScoreRecord) -> Self {
        Self {
            id: generate_id(),
            record,
            scores,
            last_updated: chrono::Local::now().format("%Y-%m-%d").to_string(),
        }
    }
}

/// "SUPP" followed by 8 uppercase hex characters
pub fn generate_id() -> String {
    let hex = uuid::Uuid::new_v4().simple().to_string();
    format!("SUPP{}", hex[..8].to_uppercase())
}

pub const CSV_HEADERS: &[&str] = &[
    "id",
    "brand",
    "product_name",
    "website",
    "main_category",
    "subcategory",
    "ingredients",
    "directions",
    "warnings",
    "serving_size",
    "country_of_origin",
    "certifications",
    "gmp_certified",
    "third_party_tested",
    "allergen_free",
    "vegan",
    "gluten_free",
    "non_gmo",
    "organic",
    "image_url",
    "ingredient_image_url",
    "ingredients_score",
    "manufacturing_quality_score",
    "testing_verification_score",
    "label_accuracy_score",
    "nutritional_quality_score",
    "sustainability_score",
    "overall_score",
    "last_updated",
];

fn csv_row(p: &ScoredProduct) -> Vec<String> {
    let r = &p.record;
    let flag = |b: bool| b.to_string();
    let mut row = vec![
        p.id.clone(),
        r.brand.clone(),
        r.product_name.clone(),
        r.website.clone(),
        r.main_category.clone(),
        r.subcategory.clone(),
        r.ingredients.clone(),
        r.directions.clone(),
        r.warnings.clone(),
        r.serving_size.clone(),
        r.country_of_origin.clone(),
        r.certifications.clone(),
        flag(r.gmp_certified),
        flag(r.third_party_tested),
        flag(r.allergen_free),
        flag(r.vegan),
        flag(r.gluten_free),
        flag(r.non_gmo),
        flag(r.organic),
        r.image_url.clone().unwrap_or_default(),
        r.ingredient_image_url.clone().unwrap_or_default(),
    ];
    row.extend(p.scores.subscores().iter().map(|s| format!("{:.1}", s)));
    row.push(format!("{:.1}", p.scores.overall_score));
    row.push(p.last_updated.clone());
    row
}

/// CSV with a header row; provenance is left to the JSON exports
pub fn write_csv<W: Write>(products: &[ScoredProduct], writer: W) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(CSV_HEADERS)?;
    for product in products {
        wtr.write_record(csv_row(product))?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn to_json_array(products: &[ScoredProduct]) -> Result<String> {
    Ok(serde_json::to_string_pretty(products)?)
}

/// `{ "<id>": { ...product... }, ... }` for document-store import
pub fn to_keyed_json(products: &[ScoredProduct]) -> Result<String> {
    let mut map = serde_json::Map::new();
    for product in products {
        map.insert(product.id.clone(), serde_json::to_value(product)?);
    }
    Ok(serde_json::to_string_pretty(&serde_json::Value::Object(map))?)
}

pub fn export<W: Write>(products: &[ScoredProduct], format: ExportFormat, mut writer: W) -> Result<()> {
    match format {
        ExportFormat::Csv => write_csv(products, writer),
        ExportFormat::Json => {
            writeln!(writer, "{}", to_json_array(products)?)?;
            Ok(())
        }
        ExportFormat::Keyed => {
            writeln!(writer, "{}", to_keyed_json(products)?)?;
            Ok(())
        }
    }
}

pub const SUMMARY_HEADERS: &[&str] = &["URL", "Status", "Brand", "Product", "Score"];

/// URL, Status, Brand, Product, Score; the header is written even for no rows
pub fn write_summary<W: Write>(rows: &[SummaryRow], writer: W) -> Result<()> {
    let mut wtr = csv::WriterBuilder::new().has_headers(false).from_writer(writer);
    wtr.write_record(SUMMARY_HEADERS)?;
    for row in rows {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    Ok(())
}
