//! Static keyword configuration for extraction
//!
//! Everything here is read-only data consumed by generic matchers; adding a
//! keyword never requires a code change elsewhere.

use crate::record::Field;

/// Keyword lists driving the text cascade for one field
#[derive(Debug, Clone, Copy)]
pub struct FieldKeywords {
    /// Substrings looked for in id/class attributes (strategy 1)
    pub attributes: &'static [&'static str],
    /// Phrases looked for in visible text (strategies 2-5)
    pub text: &'static [&'static str],
}

pub const INGREDIENTS: FieldKeywords = FieldKeywords {
    attributes: &["ingredient", "supplement", "nutrition", "facts"],
    text: &[
        "ingredients",
        "supplement facts",
        "other ingredients",
        "nutrition facts",
        "components",
        "composition",
        "contains",
        "what's inside",
    ],
};

pub const DIRECTIONS: FieldKeywords = FieldKeywords {
    attributes: &["direction", "usage", "instruction", "how-to", "serving"],
    text: &[
        "directions",
        "suggested use",
        "how to use",
        "usage",
        "recommended dose",
        "instructions",
        "serving suggestion",
        "how to take",
        "suggested dosage",
    ],
};

pub const WARNINGS: FieldKeywords = FieldKeywords {
    attributes: &["warning", "caution", "safety"],
    text: &[
        "warnings",
        "warning",
        "caution",
        "safety information",
        "precautions",
    ],
};

pub const SERVING_SIZE: FieldKeywords = FieldKeywords {
    attributes: &["serving-size", "servingsize", "serving_size"],
    text: &["serving size", "servings per container", "serving"],
};

pub const COUNTRY_OF_ORIGIN: FieldKeywords = FieldKeywords {
    attributes: &["origin", "country", "made-in"],
    text: &[
        "country of origin",
        "made in",
        "manufactured in",
        "product of",
        "origin",
    ],
};

/// Keyword set for a cascade field
pub fn for_field(field: Field) -> Option<FieldKeywords> {
    match field {
        Field::Ingredients => Some(INGREDIENTS),
        Field::Directions => Some(DIRECTIONS),
        Field::Warnings => Some(WARNINGS),
        Field::ServingSize => Some(SERVING_SIZE),
        Field::CountryOfOrigin => Some(COUNTRY_OF_ORIGIN),
        _ => None,
    }
}

/// Text keywords that only capture the inactive part of a label
pub const OTHER_INGREDIENTS_KEYWORDS: &[&str] = &["other ingredients", "inactive ingredients"];

/// Captures shorter than this from an "other ingredients" match get the advisory
pub const PARTIAL_INGREDIENTS_MAX_CHARS: usize = 250;

// ---------------------------------------------------------------------------
// Brand / product name
// ---------------------------------------------------------------------------

pub const BRAND_SELECTORS: &[&str] = &[
    ".brand",
    ".product-brand",
    ".product_brand",
    "[itemprop=\"brand\"]",
    ".manufacturer",
    ".vendor",
    ".product-vendor",
    "meta[property=\"og:brand\"]",
    "meta[name=\"brand\"]",
];

pub const PRODUCT_NAME_SELECTORS: &[&str] = &[
    "h1.product-title",
    "h1.product_title",
    "h1.productName",
    "h1[itemprop=\"name\"]",
    ".product-name",
    ".product_name",
    "meta[property=\"og:title\"]",
    "meta[name=\"title\"]",
];

/// Leading noise stripped from brand text
pub const BRAND_PREFIXES: &[&str] = &["Brand:", "by ", "By ", "Visit the ", "From ", "from "];

/// Store names stripped from the end of a <title>
pub const STORE_NAMES: &[&str] = &[
    "Amazon.com",
    "Walmart.com",
    "Target",
    "GNC",
    "The Vitamin Shoppe",
    "iHerb",
];

// ---------------------------------------------------------------------------
// Images
// ---------------------------------------------------------------------------

pub const PRODUCT_IMAGE_SELECTORS: &[&str] = &[
    "img.product-image",
    "img.productImage",
    "img.product_image",
    "img.main-image",
    "img.mainImage",
    "img.primary-image",
    ".product-main-image img",
    ".product-media img",
    ".product-image-container img",
    ".product-image-gallery img",
    ".woocommerce-product-gallery__image img",
    ".product-single__photo img",
    ".product-photo-container img",
    "[data-component=\"ProductImage\"] img",
    ".main-product-image img",
    ".gallery-image-container img",
];

/// Alt/src keywords marking a main product shot
pub const PRODUCT_IMAGE_KEYWORDS: &[&str] = &["product", "main", "hero", "front"];

/// Alt/src keywords marking a label shot
pub const INGREDIENT_IMAGE_KEYWORDS: &[&str] = &[
    "ingredients",
    "supplement facts",
    "nutrition facts",
    "label",
    "facts",
    "nutritional",
    "nutrition information",
    "drug facts",
];

/// Heading texts whose neighbouring images are likely label shots
pub const INGREDIENT_IMAGE_HEADINGS: &[&str] = &["Ingredients", "Supplement Facts", "Nutrition Facts"];

/// Minimum width/height for an image to be readable
pub const MIN_IMAGE_DIMENSION: u32 = 200;

// ---------------------------------------------------------------------------
// Certifications and claims
// ---------------------------------------------------------------------------

/// (match phrase, canonical name) in reporting order
pub const CERTIFICATIONS: &[(&str, &str)] = &[
    ("usp verified", "USP Verified"),
    ("nsf certified", "NSF Certified"),
    ("nsf certified for sport", "NSF Certified for Sport"),
    ("informed choice", "Informed Choice"),
    ("informed sport", "Informed Sport"),
    ("consumerlab", "ConsumerLab"),
    ("usda organic", "USDA Organic"),
    ("certified organic", "Certified Organic"),
    ("non-gmo project", "Non-GMO Project"),
    ("b corporation", "B Corporation"),
    ("certified b corp", "B Corporation"),
    ("fair trade", "Fair Trade"),
    ("rainforest alliance", "Rainforest Alliance"),
    ("carbon neutral", "Carbon Neutral"),
    ("eco-cert", "Eco-Cert"),
    ("ecocert", "Eco-Cert"),
    ("kosher", "Kosher"),
    ("halal", "Halal"),
    ("gmp certified", "GMP"),
    ("good manufacturing practice", "GMP"),
];

/// Packaging claims reported alongside certifications
pub const PACKAGING_CLAIMS: &[(&str, &str)] = &[
    ("recyclable", "Recyclable"),
    ("compostable", "Compostable"),
    ("biodegradable", "Biodegradable"),
    ("plastic-free", "Plastic-Free"),
    ("glass bottle", "Glass Bottle"),
];

pub const GMP_TERMS: &[&str] = &["gmp", "good manufacturing practice"];
pub const THIRD_PARTY_TERMS: &[&str] = &[
    "third-party tested",
    "third party tested",
    "3rd party tested",
    "independently tested",
    "third-party verified",
    "third party verified",
    "usp verified",
    "nsf certified",
    "informed choice",
    "informed sport",
];
pub const ALLERGEN_FREE_TERMS: &[&str] = &["allergen free", "allergen-free", "free of major allergens"];
pub const VEGAN_TERMS: &[&str] = &["vegan"];
pub const GLUTEN_FREE_TERMS: &[&str] = &["gluten free", "gluten-free"];
pub const NON_GMO_TERMS: &[&str] = &["non-gmo", "non gmo", "gmo free", "gmo-free"];
pub const ORGANIC_TERMS: &[&str] = &["usda organic", "certified organic", "organic"];

/// Whether any term occurs in already-lowercased text
pub fn contains_any(lower_text: &str, terms: &[&str]) -> bool {
    terms.iter().any(|t| lower_text.contains(t))
}
