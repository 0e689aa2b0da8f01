//! ProductRecord - the field dictionary produced by extraction
//!
//! Text fields hold either real page content (trimmed, non-empty, no internal
//! whitespace runs) or a sentinel string starting with [`SENTINEL_PREFIX`].
//! Consumers must test for sentinels with [`is_sentinel`] / [`present`] and
//! never rely on emptiness.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::cascade::StrategyKind;
use crate::retailer::Retailer;

/// Every "not found" value begins with this marker
pub const SENTINEL_PREFIX: &str = "N/A - ";

/// Appended to ingredients when only an "other ingredients" block was captured
pub const PARTIAL_INGREDIENTS_NOTE: &str =
    " [Partial Data Possible - Check Image/Full Description]";

/// Check whether a field value is a sentinel rather than page content
pub fn is_sentinel(value: &str) -> bool {
    value.starts_with(SENTINEL_PREFIX)
}

/// Real content of a text field, or None for empty/sentinel values
pub fn present(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    if trimmed.is_empty() || is_sentinel(trimmed) {
        None
    } else {
        Some(trimmed)
    }
}

/// Text fields of a ProductRecord
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Brand,
    ProductName,
    Ingredients,
    Directions,
    Warnings,
    ServingSize,
    CountryOfOrigin,
    Certifications,
    ImageUrl,
    IngredientImageUrl,
}

impl Field {
    /// Fields filled by the five-strategy text cascade
    pub const CASCADE: [Field; 5] = [
        Field::Ingredients,
        Field::Directions,
        Field::Warnings,
        Field::ServingSize,
        Field::CountryOfOrigin,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Field::Brand => "Brand",
            Field::ProductName => "Product name",
            Field::Ingredients => "Ingredients",
            Field::Directions => "Directions",
            Field::Warnings => "Warnings",
            Field::ServingSize => "Serving size",
            Field::CountryOfOrigin => "Country of origin",
            Field::Certifications => "Certifications",
            Field::ImageUrl => "Product image",
            Field::IngredientImageUrl => "Ingredient image",
        }
    }

    /// Sentinel for a field that no strategy could resolve
    pub fn not_found(&self) -> String {
        match self {
            Field::Ingredients | Field::Directions => format!(
                "{}{} not found (check HTML structure or image)",
                SENTINEL_PREFIX,
                self.label()
            ),
            _ => format!("{}{} not found", SENTINEL_PREFIX, self.label()),
        }
    }
}

/// Sentinels written when no HTML could be analysed at all
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unavailable {
    InvalidUrl,
    FetchError,
    ParsingError,
}

impl Unavailable {
    pub fn sentinel(&self) -> String {
        let text = match self {
            Unavailable::InvalidUrl => "Invalid URL format",
            Unavailable::FetchError => "Fetch Error",
            Unavailable::ParsingError => "Parsing Error",
        };
        format!("{}{}", SENTINEL_PREFIX, text)
    }
}

/// Where an extracted value came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Source {
    /// Retailer-specific rule (index into that retailer's rule list)
    Retailer { retailer: Retailer, rule: usize },
    /// Generic text cascade
    Cascade { strategy: StrategyKind, keyword: String },
    /// Generic CSS selector list
    Selector { selector: String },
    /// JSON-LD Product object
    JsonLd,
    /// The document <title>
    PageTitle,
    /// Keyword scan over the page text
    TextScan,
    /// Scored image candidate
    ImageCandidate { score: u32 },
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::Retailer { retailer, rule } => write!(f, "{} rule #{}", retailer, rule + 1),
            Source::Cascade { strategy, keyword } => write!(f, "{} ('{}')", strategy, keyword),
            Source::Selector { selector } => write!(f, "selector {}", selector),
            Source::JsonLd => write!(f, "JSON-LD"),
            Source::PageTitle => write!(f, "page title"),
            Source::TextScan => write!(f, "text scan"),
            Source::ImageCandidate { score } => write!(f, "image candidate (score {})", score),
        }
    }
}

/// The field dictionary for one product page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductRecord {
    #[serde(default)]
    pub brand: String,
    #[serde(default)]
    pub product_name: String,
    #[serde(default)]
    pub website: String,
    #[serde(default)]
    pub ingredients: String,
    #[serde(default)]
    pub directions: String,
    #[serde(default)]
    pub warnings: String,
    #[serde(default)]
    pub serving_size: String,
    #[serde(default)]
    pub country_of_origin: String,
    #[serde(default)]
    pub certifications: String,

    #[serde(default)]
    pub gmp_certified: bool,
    #[serde(default)]
    pub third_party_tested: bool,
    #[serde(default)]
    pub allergen_free: bool,
    #[serde(default)]
    pub vegan: bool,
    #[serde(default)]
    pub gluten_free: bool,
    #[serde(default)]
    pub non_gmo: bool,
    #[serde(default)]
    pub organic: bool,

    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub ingredient_image_url: Option<String>,

    #[serde(default)]
    pub main_category: String,
    #[serde(default)]
    pub subcategory: String,

    /// Provenance of each resolved field
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub sources: BTreeMap<Field, Source>,
}

impl ProductRecord {
    /// Fresh record for a page, every text field starting as "not found"
    pub fn new(website: &str) -> Self {
        Self {
            brand: Field::Brand.not_found(),
            product_name: Field::ProductName.not_found(),
            website: website.to_string(),
            ingredients: Field::Ingredients.not_found(),
            directions: Field::Directions.not_found(),
            warnings: Field::Warnings.not_found(),
            serving_size: Field::ServingSize.not_found(),
            country_of_origin: Field::CountryOfOrigin.not_found(),
            certifications: Field::Certifications.not_found(),
            gmp_certified: false,
            third_party_tested: false,
            allergen_free: false,
            vegan: false,
            gluten_free: false,
            non_gmo: false,
            organic: false,
            image_url: None,
            ingredient_image_url: None,
            main_category: String::new(),
            subcategory: String::new(),
            sources: BTreeMap::new(),
        }
    }

    /// Record for a URL that never produced HTML
    pub fn unavailable(website: &str, reason: Unavailable) -> Self {
        let sentinel = reason.sentinel();
        let mut record = Self::new(website);
        for field in Field::CASCADE {
            record.set_text(field, sentinel.clone());
        }
        record.brand = sentinel.clone();
        record.product_name = sentinel.clone();
        record.certifications = sentinel;
        record
    }

    pub fn text(&self, field: Field) -> Option<&str> {
        match field {
            Field::Brand => Some(&self.brand),
            Field::ProductName => Some(&self.product_name),
            Field::Ingredients => Some(&self.ingredients),
            Field::Directions => Some(&self.directions),
            Field::Warnings => Some(&self.warnings),
            Field::ServingSize => Some(&self.serving_size),
            Field::CountryOfOrigin => Some(&self.country_of_origin),
            Field::Certifications => Some(&self.certifications),
            Field::ImageUrl => self.image_url.as_deref(),
            Field::IngredientImageUrl => self.ingredient_image_url.as_deref(),
        }
    }

    pub fn set_text(&mut self, field: Field, value: String) {
        match field {
            Field::Brand => self.brand = value,
            Field::ProductName => self.product_name = value,
            Field::Ingredients => self.ingredients = value,
            Field::Directions => self.directions = value,
            Field::Warnings => self.warnings = value,
            Field::ServingSize => self.serving_size = value,
            Field::CountryOfOrigin => self.country_of_origin = value,
            Field::Certifications => self.certifications = value,
            Field::ImageUrl => self.image_url = Some(value),
            Field::IngredientImageUrl => self.ingredient_image_url = Some(value),
        }
    }

    /// Store a resolved value together with its provenance
    pub fn resolve(&mut self, field: Field, value: String, source: Source) {
        self.set_text(field, value);
        self.sources.insert(field, source);
    }

    /// Whether a field holds real content
    pub fn has(&self, field: Field) -> bool {
        self.text(field).and_then(present).is_some()
    }

    /// Whether ingredients carry the "other ingredients only" advisory
    pub fn ingredients_partial(&self) -> bool {
        self.ingredients.contains(PARTIAL_INGREDIENTS_NOTE)
    }
}
