//! Product page extraction
//!
//! Builds a [`ProductRecord`] from raw HTML. Every field is tried against the
//! retailer's own rules first, then against generic heuristics; a field that
//! nothing resolves keeps its "not found" sentinel. Individual heuristics never
//! fail the extraction.

use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use tracing::{debug, info};

use crate::cascade::{self, Hit, StrategyKind, MIN_TEXT_LENGTH};
use crate::categorize::categorize;
use crate::error::{Result, ScrapeError};
use crate::images::{best_image, resolve_url, Criteria};
use crate::keywords::{
    self, contains_any, ALLERGEN_FREE_TERMS, BRAND_PREFIXES, BRAND_SELECTORS, CERTIFICATIONS, GLUTEN_FREE_TERMS,
    GMP_TERMS, NON_GMO_TERMS, ORGANIC_TERMS, OTHER_INGREDIENTS_KEYWORDS, PACKAGING_CLAIMS,
    PARTIAL_INGREDIENTS_MAX_CHARS, PRODUCT_NAME_SELECTORS, STORE_NAMES, THIRD_PARTY_TERMS, VEGAN_TERMS,
};
use crate::normalize::{char_len, clean_text, flatten_text, preview};
use crate::record::{present, Field, ProductRecord, Source, PARTIAL_INGREDIENTS_NOTE};
use crate::retailer::{element_value, Retailer};

static JSONLD_SEL: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(r#"script[type="application/ld+json"]"#).expect("Invalid JSON-LD selector")
});
static TITLE_SEL: Lazy<Selector> = Lazy::new(|| Selector::parse("title").expect("Invalid title selector"));

/// Separators between a product title and the store name in <title>
const TITLE_SEPARATORS: &[&str] = &[" | ", " - ", " : ", " – ", " at "];

/// Extract every field of a product page
pub fn extract_product(html: &str, url: &str) -> Result<ProductRecord> {
    if html.trim().is_empty() || !html.contains('<') {
        return Err(ScrapeError::ParseError("document contains no markup".into()));
    }

    let document = Html::parse_document(html);
    let retailer = Retailer::classify(url);
    info!(url, retailer = %retailer, "extracting product page");

    let mut record = ProductRecord::new(url);
    let products = jsonld_products(&document);

    extract_identity(&document, retailer, &products, &mut record);

    for field in Field::CASCADE {
        extract_text_field(&document, retailer, field, &mut record);
    }

    extract_claims(&document, &mut record);
    extract_images(&document, retailer, url, &products, &mut record);

    let (main, sub) = categorize(present(&record.ingredients).unwrap_or(""));
    record.main_category = main.to_string();
    record.subcategory = sub.to_string();
    info!(main_category = main, subcategory = sub, "categorized product");

    Ok(record)
}

/// First retailer rule producing a qualifying value, with its index
fn retailer_value(
    document: &Html,
    retailer: Retailer,
    field: Field,
    accept: impl Fn(&str) -> bool,
) -> Option<(String, Source)> {
    retailer
        .rules(field)
        .iter()
        .enumerate()
        .find_map(|(i, rule)| {
            let value = rule.apply(document)?;
            if accept(&value) {
                Some((value, Source::Retailer { retailer, rule: i }))
            } else {
                debug!(field = field.label(), retailer = %retailer, rule = i, "retailer rule result rejected");
                None
            }
        })
}

/// Shortest value a retailer rule may produce for a field
fn retailer_min_len(field: Field) -> usize {
    match field {
        // "USA", "1 tablet"
        Field::ServingSize | Field::CountryOfOrigin => 1,
        _ => MIN_TEXT_LENGTH,
    }
}

/// Ingredients, directions, warnings, serving size, country of origin
fn extract_text_field(document: &Html, retailer: Retailer, field: Field, record: &mut ProductRecord) {
    let min_len = retailer_min_len(field);
    if let Some((value, source)) = retailer_value(document, retailer, field, |v: &str| char_len(v) >= min_len) {
        debug!(field = field.label(), source = %source, "field resolved");
        record.resolve(field, value, source);
        return;
    }

    let Some(keywords) = keywords::for_field(field) else {
        return;
    };
    match cascade::run(document, &keywords) {
        Some(hit) => {
            let mut value = hit.candidate.text.clone();
            if field == Field::Ingredients && is_other_ingredients_only(&hit) {
                debug!("only an other-ingredients block was found");
                value.push_str(PARTIAL_INGREDIENTS_NOTE);
            }
            debug!(field = field.label(), strategy = %hit.strategy, value = %preview(&value, 60), "field resolved");
            record.resolve(
                field,
                value,
                Source::Cascade {
                    strategy: hit.strategy,
                    keyword: hit.candidate.keyword.to_string(),
                },
            );
        }
        None => debug!(field = field.label(), "all strategies exhausted"),
    }
}

/// A short capture that came from an "other/inactive ingredients" label
pub fn is_other_ingredients_only(hit: &Hit) -> bool {
    let normalize = |s: &str| s.to_lowercase().replace(['-', '_'], " ");
    let keyword = normalize(hit.candidate.keyword);
    let label = normalize(&hit.candidate.label);
    let text = normalize(&hit.candidate.text);

    let labelled_other = |k: &str| match hit.strategy {
        // attribute values name the whole block ("product-inactive-ingredients")
        StrategyKind::AttributeMatch => label.contains(k),
        // the label is the matched element's full text, which may list actives first
        StrategyKind::ParentText => false,
        _ => label.starts_with(k),
    };
    let from_other_label = OTHER_INGREDIENTS_KEYWORDS
        .iter()
        .any(|k| keyword == *k || labelled_other(k) || text.starts_with(k));
    from_other_label && char_len(&hit.candidate.text) < PARTIAL_INGREDIENTS_MAX_CHARS
}

/// Brand and product name
fn extract_identity(
    document: &Html,
    retailer: Retailer,
    products: &[serde_json::Value],
    record: &mut ProductRecord,
) {
    let non_empty = |s: &str| !s.trim().is_empty();

    let brand = retailer_value(document, retailer, Field::Brand, non_empty)
        .or_else(|| first_selector_value(document, BRAND_SELECTORS))
        .or_else(|| {
            products
                .iter()
                .find_map(|p| nested_name(p, "brand"))
                .map(|b| (b, Source::JsonLd))
        })
        .and_then(|(raw, source)| clean_brand(&raw).map(|b| (b, source)));

    if let Some((value, source)) = brand {
        debug!(brand = %value, source = %source, "brand resolved");
        record.resolve(Field::Brand, value, source);
    }

    let name = retailer_value(document, retailer, Field::ProductName, non_empty)
        .or_else(|| first_selector_value(document, PRODUCT_NAME_SELECTORS))
        .or_else(|| {
            products
                .iter()
                .find_map(|p| p.get("name").and_then(|n| n.as_str()).map(clean_text))
                .filter(|n| !n.is_empty())
                .map(|n| (n, Source::JsonLd))
        })
        .or_else(|| page_title(document).map(|t| (t, Source::PageTitle)));

    if let Some((raw, source)) = name {
        let value = match present(&record.brand) {
            Some(brand) => strip_brand_prefix(&raw, brand),
            None => raw,
        };
        debug!(product_name = %value, source = %source, "product name resolved");
        record.resolve(Field::ProductName, value, source);
    }
}

fn first_selector_value(document: &Html, selectors: &[&str]) -> Option<(String, Source)> {
    selectors.iter().find_map(|s| {
        let sel = Selector::parse(s).ok()?;
        let value = document
            .select(&sel)
            .filter_map(|el| element_value(&el))
            .map(|v| clean_text(&v))
            .find(|v| !v.is_empty())?;
        Some((
            value,
            Source::Selector {
                selector: s.to_string(),
            },
        ))
    })
}

/// Strip "Brand:", "by ", "Visit the ... Store" and similar noise
pub fn clean_brand(raw: &str) -> Option<String> {
    let mut brand = clean_text(raw);
    let mut visit_store = false;
    loop {
        let before = brand.len();
        for prefix in BRAND_PREFIXES {
            if let Some(rest) = brand.strip_prefix(prefix) {
                if *prefix == "Visit the " {
                    visit_store = true;
                }
                brand = rest.trim().to_string();
            }
        }
        if brand.len() == before {
            break;
        }
    }
    if visit_store {
        if let Some(rest) = brand.strip_suffix(" Store") {
            brand = rest.trim().to_string();
        }
    }
    if brand.is_empty() {
        None
    } else {
        Some(brand)
    }
}

/// Drop a leading brand from the product name ("Thorne Magnesium" -> "Magnesium")
pub fn strip_brand_prefix(name: &str, brand: &str) -> String {
    let head = name.get(..brand.len());
    if brand.is_empty() || !head.is_some_and(|h| h.eq_ignore_ascii_case(brand)) {
        return name.to_string();
    }
    let rest = name[brand.len()..].trim_start_matches([' ', '-', ':', ',']).trim();
    // "Thorne" followed by letters belongs to a longer word ("Thornebrook")
    let joined_word = name[brand.len()..].starts_with(|c: char| c.is_alphanumeric());
    if rest.is_empty() || joined_word {
        name.to_string()
    } else {
        rest.to_string()
    }
}

/// <title> text with the store name removed
fn page_title(document: &Html) -> Option<String> {
    let title = document.select(&TITLE_SEL).next().map(|el| flatten_text(&el))?;
    let title = strip_store_name(&title);
    if title.is_empty() {
        None
    } else {
        Some(title)
    }
}

pub fn strip_store_name(title: &str) -> String {
    let mut title = clean_text(title);
    let is_store = |s: &str| STORE_NAMES.iter().any(|store| s.trim().eq_ignore_ascii_case(store));

    // "Amazon.com: Vitamin D3 5000 IU"
    if let Some((head, rest)) = title.split_once(':') {
        if is_store(head) && !rest.trim().is_empty() {
            title = rest.trim().to_string();
        }
    }
    // "Vitamin D3 5000 IU | GNC"
    for sep in TITLE_SEPARATORS {
        if let Some((head, tail)) = title.rsplit_once(sep) {
            if is_store(tail) && !head.trim().is_empty() {
                title = head.trim().to_string();
            }
        }
    }
    title
}

// ---------------------------------------------------------------------------
// JSON-LD
// ---------------------------------------------------------------------------

/// All JSON-LD objects typed Product (handles @graph and arrays)
fn jsonld_products(document: &Html) -> Vec<serde_json::Value> {
    let mut products = Vec::new();
    for script in document.select(&JSONLD_SEL) {
        let text: String = script.text().collect();
        if let Ok(json) = serde_json::from_str::<serde_json::Value>(&text) {
            collect_products(&json, &mut products);
        }
    }
    products
}

fn collect_products(json: &serde_json::Value, out: &mut Vec<serde_json::Value>) {
    match json {
        serde_json::Value::Object(map) => {
            if let Some(serde_json::Value::Array(graph)) = map.get("@graph") {
                for item in graph {
                    collect_products(item, out);
                }
            } else if is_product(json) {
                out.push(json.clone());
            }
        }
        serde_json::Value::Array(arr) => {
            for item in arr {
                collect_products(item, out);
            }
        }
        _ => {}
    }
}

/// "@type" is Product, possibly namespaced or in an array
fn is_product(json: &serde_json::Value) -> bool {
    let matches = |t: &str| {
        let clean = t.rsplit_once(':').map(|(_, t)| t).unwrap_or(t);
        clean.eq_ignore_ascii_case("Product")
    };
    match json.get("@type") {
        Some(serde_json::Value::String(s)) => matches(s),
        Some(serde_json::Value::Array(arr)) => arr.iter().filter_map(|t| t.as_str()).any(matches),
        _ => false,
    }
}

/// Name from a string or nested object (brand.name)
fn nested_name(json: &serde_json::Value, field: &str) -> Option<String> {
    let value = json.get(field)?;
    let name = match value {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Object(_) => value.get("name").and_then(|n| n.as_str().map(String::from)),
        serde_json::Value::Array(arr) => arr.first().and_then(|v| match v {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Object(_) => v.get("name").and_then(|n| n.as_str().map(String::from)),
            _ => None,
        }),
        _ => None,
    }?;
    let name = clean_text(&name);
    if name.is_empty() {
        None
    } else {
        Some(name)
    }
}

/// `image` as a string, an array of strings, or an ImageObject with `url`
fn jsonld_image(product: &serde_json::Value) -> Option<String> {
    let image = product.get("image")?;
    let first = match image {
        serde_json::Value::Array(arr) => arr.first()?,
        other => other,
    };
    let src = match first {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Object(_) => first.get("url")?.as_str()?.to_string(),
        _ => return None,
    };
    let src = src.trim().to_string();
    if src.is_empty() {
        None
    } else {
        Some(src)
    }
}

// ---------------------------------------------------------------------------
// Certifications and claim flags
// ---------------------------------------------------------------------------

fn extract_claims(document: &Html, record: &mut ProductRecord) {
    let page_text = flatten_text(&document.root_element()).to_lowercase();

    if let Some(certifications) = scan_certifications(&page_text) {
        debug!(certifications = %certifications, "certifications found");
        record.resolve(Field::Certifications, certifications, Source::TextScan);
    }

    record.gmp_certified = contains_any(&page_text, GMP_TERMS);
    record.third_party_tested = contains_any(&page_text, THIRD_PARTY_TERMS);
    record.allergen_free = contains_any(&page_text, ALLERGEN_FREE_TERMS);
    record.vegan = contains_any(&page_text, VEGAN_TERMS);
    record.gluten_free = contains_any(&page_text, GLUTEN_FREE_TERMS);
    record.non_gmo = contains_any(&page_text, NON_GMO_TERMS);
    record.organic = contains_any(&page_text, ORGANIC_TERMS);
}

/// Certification and packaging names found in lowercased page text, in
/// vocabulary order without duplicates
pub fn scan_certifications(lower_text: &str) -> Option<String> {
    let mut found: Vec<&str> = Vec::new();
    for (phrase, name) in CERTIFICATIONS.iter().chain(PACKAGING_CLAIMS.iter()) {
        if lower_text.contains(phrase) && !found.contains(name) {
            found.push(name);
        }
    }
    if found.is_empty() {
        None
    } else {
        Some(found.join(", "))
    }
}

// ---------------------------------------------------------------------------
// Images
// ---------------------------------------------------------------------------

fn extract_images(
    document: &Html,
    retailer: Retailer,
    url: &str,
    products: &[serde_json::Value],
    record: &mut ProductRecord,
) {
    let base = url::Url::parse(url).ok();
    let product_name = present(&record.product_name).map(str::to_string);

    let lookups = [
        (Field::ImageUrl, Criteria::product(product_name.as_deref())),
        (Field::IngredientImageUrl, Criteria::ingredient_label()),
    ];
    for (field, criteria) in lookups {
        let from_rule = retailer_value(document, retailer, field, |v| !v.is_empty())
            .and_then(|(src, source)| resolve_url(base.as_ref(), &src).map(|u| (u, source)));
        let found = from_rule
            .or_else(|| {
                best_image(document, url, &criteria).map(|c| (c.url, Source::ImageCandidate { score: c.score }))
            })
            .or_else(|| match field {
                Field::ImageUrl => products
                    .iter()
                    .find_map(jsonld_image)
                    .and_then(|src| resolve_url(base.as_ref(), &src))
                    .map(|u| (u, Source::JsonLd)),
                _ => None,
            });
        if let Some((image, source)) = found {
            debug!(field = field.label(), url = %image, source = %source, "image resolved");
            record.resolve(field, image, source);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cascade::Candidate;

    const URL: &str = "https://shop.example.com/products/magnesium";

    #[test]
    fn test_empty_document_is_parse_error() {
        assert!(matches!(extract_product("", URL), Err(ScrapeError::ParseError(_))));
        assert!(matches!(extract_product("plain text", URL), Err(ScrapeError::ParseError(_))));
    }

    #[test]
    fn test_blank_page_keeps_sentinels() {
        let record = extract_product("<html><body><p>Hello</p></body></html>", URL).unwrap();
        for field in Field::CASCADE {
            assert_eq!(record.text(field), Some(field.not_found().as_str()));
        }
        assert_eq!(record.brand, Field::Brand.not_found());
        assert_eq!(record.main_category, "Uncategorized");
        assert!(record.image_url.is_none());
    }

    #[test]
    fn test_clean_brand() {
        assert_eq!(clean_brand("Brand: Thorne"), Some("Thorne".into()));
        assert_eq!(clean_brand("Visit the NOW Foods Store"), Some("NOW Foods".into()));
        assert_eq!(clean_brand("  by   Garden of Life "), Some("Garden of Life".into()));
        assert_eq!(clean_brand("Brand: "), None);
        // only Amazon's "Visit the ... Store" loses its suffix
        assert_eq!(clean_brand("The Vitamin Store"), Some("The Vitamin Store".into()));
    }

    #[test]
    fn test_strip_brand_prefix() {
        assert_eq!(strip_brand_prefix("Thorne - Magnesium Bisglycinate", "Thorne"), "Magnesium Bisglycinate");
        assert_eq!(strip_brand_prefix("NOW Foods: Vitamin D3", "now foods"), "Vitamin D3");
        assert_eq!(strip_brand_prefix("Thornebrook Tea", "Thorne"), "Thornebrook Tea");
        assert_eq!(strip_brand_prefix("Thorne", "Thorne"), "Thorne");
        assert_eq!(strip_brand_prefix("Vitamin C", "Solgar"), "Vitamin C");
        assert_eq!(
            strip_brand_prefix("NOW Foods, Magnesium Citrate, 200 mg", "NOW Foods"),
            "Magnesium Citrate, 200 mg"
        );
    }

    #[test]
    fn test_strip_store_name() {
        assert_eq!(strip_store_name("Amazon.com: Vitamin D3 5000 IU"), "Vitamin D3 5000 IU");
        assert_eq!(strip_store_name("Fish Oil 1000mg | GNC"), "Fish Oil 1000mg");
        assert_eq!(strip_store_name("Probiotic 50B - Walmart.com"), "Probiotic 50B");
        assert_eq!(strip_store_name("Plain Product Title"), "Plain Product Title");
        // a segment that merely contains a store name stays
        assert_eq!(
            strip_store_name("Joint Formula - Targeted Relief"),
            "Joint Formula - Targeted Relief"
        );
        assert_eq!(strip_store_name("GNC Mega Men: Multivitamin"), "GNC Mega Men: Multivitamin");
    }

    #[test]
    fn test_scan_certifications_dedupes() {
        let text = "ecocert and eco-cert approved, usp verified, packed in a glass bottle";
        assert_eq!(
            scan_certifications(text),
            Some("USP Verified, Eco-Cert, Glass Bottle".to_string())
        );
        assert_eq!(scan_certifications("nothing to see"), None);
    }

    #[test]
    fn test_other_ingredients_detection() {
        let hit = |keyword: &'static str, label: &str, text: &str| Hit {
            candidate: Candidate {
                text: text.to_string(),
                keyword,
                label: label.to_string(),
            },
            strategy: StrategyKind::HeadingSibling,
        };
        assert!(is_other_ingredients_only(&hit(
            "ingredients",
            "Other Ingredients",
            "Cellulose, magnesium stearate, silica"
        )));
        assert!(is_other_ingredients_only(&hit(
            "ingredient",
            "inactive_ingredients",
            "Gelatin, glycerin, purified water"
        )));
        assert!(!is_other_ingredients_only(&hit(
            "ingredients",
            "Ingredients",
            "Magnesium (as bisglycinate) 200 mg"
        )));
        let long = "x".repeat(PARTIAL_INGREDIENTS_MAX_CHARS);
        assert!(!is_other_ingredients_only(&hit("other ingredients", "Other Ingredients", &long)));
    }

    #[test]
    fn test_other_ingredients_label_must_lead() {
        let hit = |strategy: StrategyKind, keyword: &'static str, label: &str, text: &str| Hit {
            candidate: Candidate {
                text: text.to_string(),
                keyword,
                label: label.to_string(),
            },
            strategy,
        };
        let full = "Ingredients: Vitamin C (as ascorbic acid) 500 mg, Zinc 15 mg. Other ingredients: cellulose.";

        // parent-text labels are whole element texts
        assert!(!is_other_ingredients_only(&hit(StrategyKind::ParentText, "ingredients", full, full)));
        assert!(is_other_ingredients_only(&hit(
            StrategyKind::ParentText,
            "other ingredients",
            "Other ingredients: cellulose, silica",
            "Other ingredients: cellulose, silica"
        )));
        assert!(!is_other_ingredients_only(&hit(
            StrategyKind::HeadingSibling,
            "ingredients",
            "Ingredients (see other ingredients below)",
            "Zinc (as zinc picolinate) 15 mg"
        )));
        assert!(is_other_ingredients_only(&hit(
            StrategyKind::AttributeMatch,
            "ingredient",
            "product-inactive-ingredients",
            "Gelatin, glycerin, purified water"
        )));
    }

    #[test]
    fn test_retailer_floor_allows_short_origin() {
        assert_eq!(retailer_min_len(Field::CountryOfOrigin), 1);
        assert_eq!(retailer_min_len(Field::ServingSize), 1);
        assert_eq!(retailer_min_len(Field::Ingredients), MIN_TEXT_LENGTH);
    }

    #[test]
    fn test_jsonld_identity() {
        let html = r#"<html><head>
            <script type="application/ld+json">
            {"@context": "https://schema.org", "@graph": [
                {"@type": "BreadcrumbList"},
                {"@type": "Product", "name": "Pure Encapsulations Zinc 30", "brand": {"@type": "Brand", "name": "Pure Encapsulations"}}
            ]}
            </script></head><body><p>Zinc picolinate</p></body></html>"#;
        let record = extract_product(html, URL).unwrap();
        assert_eq!(record.brand, "Pure Encapsulations");
        assert_eq!(record.product_name, "Zinc 30");
        assert_eq!(record.sources.get(&Field::Brand), Some(&Source::JsonLd));
    }

    #[test]
    fn test_jsonld_image_fallback() {
        let html = r#"<html><head>
            <script type="application/ld+json">
            {"@type": "Product", "name": "Zinc 30", "image": [{"@type": "ImageObject", "url": "/img/zinc-30.jpg"}]}
            </script></head><body><img src="/img/tiny.gif" width="1" height="1"></body></html>"#;
        let record = extract_product(html, URL).unwrap();
        assert_eq!(
            record.image_url.as_deref(),
            Some("https://shop.example.com/img/zinc-30.jpg")
        );
        assert_eq!(record.sources.get(&Field::ImageUrl), Some(&Source::JsonLd));
    }

    #[test]
    fn test_title_fallback_for_name() {
        let html = "<html><head><title>Omega-3 Fish Oil | The Vitamin Shoppe</title></head><body></body></html>";
        let record = extract_product(html, URL).unwrap();
        assert_eq!(record.product_name, "Omega-3 Fish Oil");
        assert_eq!(record.sources.get(&Field::ProductName), Some(&Source::PageTitle));
    }

    #[test]
    fn test_claim_flags() {
        let html = "<html><body><ul><li>Certified Vegan</li><li>Gluten-Free</li><li>Non-GMO Project Verified</li><li>Made in a GMP facility</li></ul></body></html>";
        let record = extract_product(html, URL).unwrap();
        assert!(record.vegan);
        assert!(record.gluten_free);
        assert!(record.non_gmo);
        assert!(record.gmp_certified);
        assert!(!record.organic);
        assert!(!record.third_party_tested);
        assert_eq!(record.certifications, "Non-GMO Project");
    }
}
