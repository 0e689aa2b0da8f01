//! Single-URL pipeline and sequential batch processing
//!
//! A batch never aborts on a bad item: every input URL yields exactly one
//! [`BatchItem`] whose [`Status`] says whether the page was unreachable,
//! reachable without matching structure, or (partially) extracted.

use std::fmt;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{Result, ScrapeError};
use crate::export::ScoredProduct;
use crate::extract::extract_product;
use crate::fetch::{validate_url, PageSource};
use crate::record::{Field, ProductRecord, Unavailable};
use crate::score::{calculate_scores, ScoreRecord};

/// Slice used when sleeping so cancellation is noticed promptly
const CANCEL_POLL: Duration = Duration::from_millis(100);

/// Extract, categorize and score already-fetched HTML
pub fn analyze_html(html: &str, url: &str) -> Result<ScoredProduct> {
    let record = extract_product(html, url)?;
    let scores = calculate_scores(&record);
    Ok(ScoredProduct::new(record, scores))
}

/// Fetch a URL and run the full pipeline on it
pub fn scrape_url(source: &dyn PageSource, url: &str) -> Result<ScoredProduct> {
    validate_url(url)?;
    let html = source.fetch(url.trim())?;
    analyze_html(&html, url.trim())
}

/// Outcome of one batch item
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    /// Every cascade field resolved
    Success,
    /// Ingredients and directions resolved, something else missing
    IngredientsAndDirections,
    DirectionsAndPartialIngredients,
    IngredientsOnly { partial: bool },
    DirectionsOnly,
    /// `Failed - <reason>`
    Failed(String),
}

impl Status {
    /// Status of an extracted record, from which fields hold real content
    pub fn from_record(record: &ProductRecord) -> Status {
        let ingredients = record.has(Field::Ingredients);
        let directions = record.has(Field::Directions);
        let partial = ingredients && record.ingredients_partial();

        match (ingredients, directions) {
            (false, false) => Status::Failed(ScrapeError::NoDataFound.status_reason()),
            (false, true) => Status::DirectionsOnly,
            (true, false) => Status::IngredientsOnly { partial },
            (true, true) if partial => Status::DirectionsAndPartialIngredients,
            (true, true) => {
                if Field::CASCADE.iter().all(|f| record.has(*f)) {
                    Status::Success
                } else {
                    Status::IngredientsAndDirections
                }
            }
        }
    }

    pub fn from_error(err: &ScrapeError) -> Status {
        Status::Failed(err.status_reason())
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Status::Failed(_))
    }

    pub fn is_partial(&self) -> bool {
        matches!(
            self,
            Status::DirectionsAndPartialIngredients | Status::IngredientsOnly { .. } | Status::DirectionsOnly
        )
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Success => write!(f, "Success"),
            Status::IngredientsAndDirections => write!(f, "Success - Ingredients & Directions Found"),
            Status::DirectionsAndPartialIngredients => {
                write!(f, "Partial Success - Directions & Partial Ingredients Found")
            }
            Status::IngredientsOnly { partial: false } => write!(f, "Partial Success - Ingredients Found Only"),
            Status::IngredientsOnly { partial: true } => {
                write!(f, "Partial Success - Ingredients Found Only (Partial Possible)")
            }
            Status::DirectionsOnly => write!(f, "Partial Success - Directions Found Only"),
            Status::Failed(reason) => write!(f, "{}", reason),
        }
    }
}

/// One row of batch output
#[derive(Debug, Clone)]
pub struct BatchItem {
    pub url: String,
    pub status: Status,
    pub outcome: Outcome,
}

/// What a batch item produced
#[derive(Debug, Clone)]
pub enum Outcome {
    /// Extracted and scored, with generated id and date
    Scored(ScoredProduct),
    /// Nothing could be analysed; text fields carry the failure sentinel
    Unavailable(ProductRecord),
}

impl BatchItem {
    fn failed(url: &str, err: &ScrapeError) -> Self {
        let sentinel = match err {
            ScrapeError::InvalidUrl(_) => Some(Unavailable::InvalidUrl),
            ScrapeError::ParseError(_) => Some(Unavailable::ParsingError),
            e if e.is_fetch_failure() => Some(Unavailable::FetchError),
            _ => None,
        };
        let record = match sentinel {
            Some(reason) => ProductRecord::unavailable(url, reason),
            None => ProductRecord::new(url),
        };
        Self {
            url: url.to_string(),
            status: Status::from_error(err),
            outcome: Outcome::Unavailable(record),
        }
    }

    fn extracted(url: &str, product: ScoredProduct) -> Self {
        Self {
            url: url.to_string(),
            status: Status::from_record(&product.record),
            outcome: Outcome::Scored(product),
        }
    }

    pub fn record(&self) -> &ProductRecord {
        match &self.outcome {
            Outcome::Scored(product) => &product.record,
            Outcome::Unavailable(record) => record,
        }
    }

    /// Present only when the page was extracted
    pub fn scores(&self) -> Option<&ScoreRecord> {
        self.product().map(|p| &p.scores)
    }

    pub fn product(&self) -> Option<&ScoredProduct> {
        match &self.outcome {
            Outcome::Scored(product) => Some(product),
            Outcome::Unavailable(_) => None,
        }
    }

    pub fn into_product(self) -> Option<ScoredProduct> {
        match self.outcome {
            Outcome::Scored(product) => Some(product),
            Outcome::Unavailable(_) => None,
        }
    }

    pub fn summary_row(&self) -> SummaryRow {
        let text = |field: Field| {
            self.record()
                .text(field)
                .and_then(crate::record::present)
                .unwrap_or("")
                .to_string()
        };
        SummaryRow {
            url: self.url.clone(),
            status: self.status.to_string(),
            brand: text(Field::Brand),
            product: text(Field::ProductName),
            score: self
                .scores()
                .map(|s| format!("{:.1}", s.overall_score))
                .unwrap_or_default(),
        }
    }
}

/// Batch summary table row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryRow {
    #[serde(rename = "URL")]
    pub url: String,
    #[serde(rename = "Status")]
    pub status: String,
    #[serde(rename = "Brand")]
    pub brand: String,
    #[serde(rename = "Product")]
    pub product: String,
    #[serde(rename = "Score")]
    pub score: String,
}

/// Sequential batch processor with a politeness delay between fetches
pub struct BatchRunner<S: PageSource> {
    source: S,
    delay: Duration,
    cancel: Arc<AtomicBool>,
}

impl<S: PageSource> BatchRunner<S> {
    pub fn new(source: S, delay: Duration) -> Self {
        Self {
            source,
            delay,
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Share an externally owned cancellation flag (e.g. set from Ctrl+C)
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = flag;
        self
    }

    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::SeqCst)
    }

    /// Sleep for the delay; false if cancelled meanwhile
    fn pause(&self) -> bool {
        let deadline = Instant::now() + self.delay;
        loop {
            if self.is_cancelled() {
                return false;
            }
            let now = Instant::now();
            if now >= deadline {
                return true;
            }
            std::thread::sleep((deadline - now).min(CANCEL_POLL));
        }
    }

    /// Fetch and analyse one URL; failures become Failed rows
    pub fn process_url(&self, url: &str) -> BatchItem {
        match scrape_url(&self.source, url) {
            Ok(product) => {
                let item = BatchItem::extracted(url, product);
                info!(url, status = %item.status, "processed");
                item
            }
            Err(e) => {
                warn!(url, error = %e, "item failed");
                BatchItem::failed(url, &e)
            }
        }
    }

    pub fn run(&self, urls: &[String]) -> Vec<BatchItem> {
        self.run_with(urls, |_, _| {})
    }

    /// Process every URL in order, calling `on_item` as each row completes
    pub fn run_with(&self, urls: &[String], mut on_item: impl FnMut(usize, &BatchItem)) -> Vec<BatchItem> {
        let mut items = Vec::with_capacity(urls.len());
        let mut fetched_any = false;

        for (i, url) in urls.iter().enumerate() {
            let needs_fetch = validate_url(url).is_ok();
            let cancelled = self.is_cancelled() || (needs_fetch && fetched_any && !self.pause());

            let item = if cancelled {
                debug!(url = %url, "skipped after cancellation");
                BatchItem::failed(url, &ScrapeError::Cancelled)
            } else {
                fetched_any |= needs_fetch;
                self.process_url(url)
            };
            on_item(i, &item);
            items.push(item);
        }

        info!(
            total = items.len(),
            failed = items.iter().filter(|i| i.status.is_failure()).count(),
            "batch finished"
        );
        items
    }
}

impl<S: PageSource + ?Sized> PageSource for &S {
    fn fetch(&self, url: &str) -> Result<String> {
        (**self).fetch(url)
    }
}

/// Read a URL list: a column of a .csv/.tsv file, or one URL per line
pub fn load_urls(path: &Path) -> Result<Vec<String>> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();
    let content = std::fs::read_to_string(path)?;
    match ext.as_str() {
        "csv" => urls_from_table(&content, b','),
        "tsv" => urls_from_table(&content, b'\t'),
        _ => Ok(urls_from_lines(&content)),
    }
}

fn has_scheme(s: &str) -> bool {
    let lower = s.to_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

/// Column whose header mentions "url" or "link"; else the first column with
/// non-URL entries dropped
pub fn urls_from_table(content: &str, delimiter: u8) -> Result<Vec<String>> {
    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .has_headers(true)
        .from_reader(content.as_bytes());
    let headers = rdr.headers()?.clone();

    let headerless = headers.iter().any(|h| has_scheme(h.trim()));
    let url_column = headers.iter().position(|h| {
        let h = h.to_lowercase();
        !headerless && (h.contains("url") || h.contains("link"))
    });

    let mut urls = Vec::new();
    match url_column {
        Some(col) => {
            debug!(column = col, header = headers.get(col).unwrap_or(""), "URL column");
            for row in rdr.records() {
                let row = row?;
                if let Some(value) = row.get(col).map(str::trim).filter(|v| !v.is_empty()) {
                    urls.push(value.to_string());
                }
            }
        }
        None => {
            // headerless file: the first line is data
            if let Some(first) = headers.get(0).map(str::trim).filter(|v| has_scheme(v)) {
                urls.push(first.to_string());
            }
            for row in rdr.records() {
                let row = row?;
                if let Some(value) = row.get(0).map(str::trim).filter(|v| has_scheme(v)) {
                    urls.push(value.to_string());
                }
            }
        }
    }
    Ok(urls)
}

pub fn urls_from_lines(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(str::to_string)
        .collect()
}
