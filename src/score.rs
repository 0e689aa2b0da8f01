//! Quality scoring
//!
//! Six pure sub-scorers, each starting from a baseline, applying keyword
//! deltas and clamping to [0, 10]; plus the weighted overall score. Text
//! inputs are sentinel-aware: a "not found" value scores as absent.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::keywords::contains_any;
use crate::record::{present, ProductRecord};

pub const MIN_SCORE: f64 = 0.0;
pub const MAX_SCORE: f64 = 10.0;

/// Weights for (ingredients, manufacturing, testing, label, nutritional, sustainability)
pub const WEIGHTS: [f64; 6] = [0.25, 0.20, 0.20, 0.15, 0.15, 0.05];

const ARTIFICIAL_INGREDIENTS: &[&str] = &[
    "artificial flavor",
    "artificial color",
    "sodium benzoate",
    "potassium sorbate",
    "propylene glycol",
    "bht",
    "bha",
    "hydrogenated",
    "high fructose",
    "aspartame",
    "sucralose",
    "acesulfame",
    "saccharin",
    "red dye",
    "yellow dye",
    "blue dye",
];

const BENEFICIAL_INGREDIENTS: &[&str] = &[
    "extract",
    "natural",
    "organic",
    "whole",
    "raw",
    "fermented",
    "sprouted",
    "cultured",
    "pure",
    "unrefined",
    "cold-pressed",
];

const HIGH_STANDARD_COUNTRIES: &[&str] = &[
    "usa",
    "canada",
    "japan",
    "australia",
    "new zealand",
    "switzerland",
    "germany",
    "france",
    "uk",
    "united kingdom",
    "sweden",
    "norway",
    "finland",
    "denmark",
    "netherlands",
];

const REPUTABLE_BRANDS: &[&str] = &[
    "now foods",
    "thorne",
    "jarrow",
    "life extension",
    "nordic naturals",
    "garden of life",
    "solgar",
    "pure encapsulations",
    "standard process",
    "designs for health",
    "metagenics",
    "gaia herbs",
    "integrative therapeutics",
    "natural factors",
    "carlson",
    "nature's way",
    "doctor's best",
    "bluebonnet",
];

const TESTING_CERTIFICATIONS: &[&str] = &["usp", "nsf", "informed choice", "informed sport", "consumerlab"];

const BIOAVAILABLE_FORMS: &[&str] = &[
    "methylcobalamin",
    "pyridoxal-5-phosphate",
    "methylfolate",
    "chelated",
    "glycinate",
    "citrate",
    "malate",
    "picolinate",
];

const PROVEN_PERFORMANCE: &[&str] = &[
    "creatine monohydrate",
    "whey protein isolate",
    "casein protein",
    "beta-alanine",
    "citrulline malate",
    "bcaa",
    "eaa",
    "glutamine",
];

const RESEARCHED_NOOTROPICS: &[&str] = &[
    "bacopa monnieri",
    "lions mane",
    "phosphatidylserine",
    "acetyl-l-carnitine",
    "rhodiola rosea",
    "ginkgo biloba",
    "ashwagandha",
    "l-theanine",
];

const QUALITY_TERMS: &[&str] = &[
    "standardized extract",
    "full spectrum",
    "whole food",
    "organic",
    "wild-crafted",
    "fermented",
    "activated",
    "sprouted",
];

const SUSTAINABILITY_CERTIFICATIONS: &[&str] = &[
    "b corporation",
    "fair trade",
    "rainforest alliance",
    "usda organic",
    "carbon neutral",
    "non-gmo project",
    "certified organic",
    "eco-cert",
];

const PACKAGING_TERMS: &[&str] = &["recyclable", "compostable", "biodegradable", "plastic-free", "glass"];

const SUSTAINABLE_BRANDS: &[&str] = &[
    "garden of life",
    "nordic naturals",
    "new chapter",
    "megafood",
    "nutiva",
    "gaia herbs",
    "himalaya",
    "traditional medicinals",
];

static CFU_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\d+)\s*billion\s*cfu").expect("Invalid CFU regex pattern")
});

/// Claim flags consumed by the ingredients scorer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Claims {
    pub allergen_free: bool,
    pub vegan: bool,
    pub gluten_free: bool,
    pub non_gmo: bool,
    pub organic: bool,
}

/// The six sub-scores and their weighted overall
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ScoreRecord {
    pub ingredients_score: f64,
    pub manufacturing_quality_score: f64,
    pub testing_verification_score: f64,
    pub label_accuracy_score: f64,
    pub nutritional_quality_score: f64,
    pub sustainability_score: f64,
    pub overall_score: f64,
}

impl ScoreRecord {
    pub fn from_subscores(subscores: [f64; 6]) -> Self {
        Self {
            ingredients_score: subscores[0],
            manufacturing_quality_score: subscores[1],
            testing_verification_score: subscores[2],
            label_accuracy_score: subscores[3],
            nutritional_quality_score: subscores[4],
            sustainability_score: subscores[5],
            overall_score: weighted_overall(&subscores),
        }
    }

    pub fn subscores(&self) -> [f64; 6] {
        [
            self.ingredients_score,
            self.manufacturing_quality_score,
            self.testing_verification_score,
            self.label_accuracy_score,
            self.nutritional_quality_score,
            self.sustainability_score,
        ]
    }
}

pub fn clamp_score(value: f64) -> f64 {
    value.clamp(MIN_SCORE, MAX_SCORE)
}

/// Round half away from zero to one decimal, tolerant of binary float error
/// (5.15 stored as 5.1499999... still rounds to 5.2)
pub fn round_one_decimal(value: f64) -> f64 {
    let scaled = value * 10.0;
    let rounded = if scaled >= 0.0 {
        (scaled + 0.5 + 1e-9).floor()
    } else {
        (scaled - 0.5 - 1e-9).ceil()
    };
    rounded / 10.0
}

/// Weighted sum of the six sub-scores, rounded to one decimal
pub fn weighted_overall(subscores: &[f64; 6]) -> f64 {
    let total: f64 = subscores.iter().zip(WEIGHTS.iter()).map(|(s, w)| s * w).sum();
    round_one_decimal(total)
}

fn count_hits(lower_text: &str, terms: &[&str]) -> usize {
    terms.iter().filter(|t| lower_text.contains(*t)).count()
}

fn lowered(text: &str) -> Option<String> {
    present(text).map(str::to_lowercase)
}

pub fn score_ingredients(ingredients: &str, claims: Claims) -> f64 {
    let mut score = 5.0;

    if let Some(lower) = lowered(ingredients) {
        score -= count_hits(&lower, ARTIFICIAL_INGREDIENTS) as f64 * 0.5;
        if lower.contains("proprietary blend") {
            score -= 1.0;
        }
        score += (count_hits(&lower, BENEFICIAL_INGREDIENTS) as f64 * 0.3).min(1.5);
    }

    if claims.organic {
        score += 1.5;
    }
    if claims.non_gmo {
        score += 1.0;
    }
    if claims.allergen_free {
        score += 0.5;
    }
    if claims.gluten_free {
        score += 0.5;
    }
    if claims.vegan {
        score += 0.5;
    }

    clamp_score(score)
}

pub fn score_manufacturing(gmp_certified: bool, country_of_origin: &str, brand: &str) -> f64 {
    let mut score = 5.0;
    if gmp_certified {
        score += 3.0;
    }
    if lowered(country_of_origin).is_some_and(|c| contains_any(&c, HIGH_STANDARD_COUNTRIES)) {
        score += 1.0;
    }
    if lowered(brand).is_some_and(|b| contains_any(&b, REPUTABLE_BRANDS)) {
        score += 1.0;
    }
    clamp_score(score)
}

/// The certification bonus is uncapped; only the final clamp bounds it
pub fn score_testing(third_party_tested: bool, certifications: &str) -> f64 {
    let mut score = 4.0;
    if third_party_tested {
        score += 3.0;
    }
    if let Some(lower) = lowered(certifications) {
        score += count_hits(&lower, TESTING_CERTIFICATIONS) as f64;
    }
    clamp_score(score)
}

pub fn score_label_accuracy(ingredients: &str, warnings: &str, directions: &str, serving_size: &str) -> f64 {
    let longer_than = |text: &str, n: usize| present(text).is_some_and(|t| t.chars().count() > n);

    let mut score = 3.0;
    if longer_than(ingredients, 10) {
        score += 2.0;
    }
    if longer_than(warnings, 10) {
        score += 1.5;
    }
    if longer_than(directions, 10) {
        score += 1.5;
    }
    if longer_than(serving_size, 2) {
        score += 2.0;
    }
    clamp_score(score)
}

/// First "N billion CFU" figure in the text
fn cfu_billions(lower_text: &str) -> Option<u64> {
    CFU_RE.captures(lower_text)?.get(1)?.as_str().parse().ok()
}

pub fn score_nutritional_quality(main_category: &str, subcategory: &str, ingredients: &str) -> f64 {
    let mut score = 5.0;
    let Some(lower) = lowered(ingredients) else {
        return score;
    };
    if main_category.trim().is_empty() {
        return score;
    }

    match main_category {
        "Vitamins & Minerals" => {
            score += count_hits(&lower, BIOAVAILABLE_FORMS) as f64 * 0.5;
        }
        "Digestive Health" if subcategory == "Probiotics" => {
            match cfu_billions(&lower) {
                Some(n) if n > 30 => score += 2.0,
                Some(n) if n > 10 => score += 1.0,
                _ => {}
            }
            let strains = lower.matches("lactobacillus").count() + lower.matches("bifidobacterium").count();
            score += (strains as f64 * 0.5).min(3.0);
        }
        "Fitness & Performance" => {
            score += count_hits(&lower, PROVEN_PERFORMANCE) as f64 * 0.5;
        }
        "Cognitive & Mental Health" => {
            score += count_hits(&lower, RESEARCHED_NOOTROPICS) as f64 * 0.5;
        }
        _ => {}
    }

    score += count_hits(&lower, QUALITY_TERMS) as f64 * 0.3;
    clamp_score(score)
}

pub fn score_sustainability(certifications: &str, brand: &str) -> f64 {
    let mut score = 5.0;
    if let Some(lower) = lowered(certifications) {
        score += count_hits(&lower, SUSTAINABILITY_CERTIFICATIONS) as f64 * 0.7;
        if contains_any(&lower, PACKAGING_TERMS) {
            score += 1.0;
        }
    }
    if lowered(brand).is_some_and(|b| contains_any(&b, SUSTAINABLE_BRANDS)) {
        score += 1.0;
    }
    clamp_score(score)
}

/// Score a record. Pure: no I/O, same input gives the same output.
pub fn calculate_scores(record: &ProductRecord) -> ScoreRecord {
    let claims = Claims {
        allergen_free: record.allergen_free,
        vegan: record.vegan,
        gluten_free: record.gluten_free,
        non_gmo: record.non_gmo,
        organic: record.organic,
    };

    let scores = ScoreRecord::from_subscores([
        score_ingredients(&record.ingredients, claims),
        score_manufacturing(record.gmp_certified, &record.country_of_origin, &record.brand),
        score_testing(record.third_party_tested, &record.certifications),
        score_label_accuracy(
            &record.ingredients,
            &record.warnings,
            &record.directions,
            &record.serving_size,
        ),
        score_nutritional_quality(&record.main_category, &record.subcategory, &record.ingredients),
        score_sustainability(&record.certifications, &record.brand),
    ]);

    info!(
        website = %record.website,
        overall = scores.overall_score,
        "scored product"
    );
    scores
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Field;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_overall_extremes() {
        assert_eq!(weighted_overall(&[10.0; 6]), 10.0);
        assert_eq!(weighted_overall(&[0.0; 6]), 0.0);
    }

    #[test]
    fn test_overall_rounds_half_up() {
        // 2.0 + 1.0 + 1.0 + 0.45 + 0.45 + 0.25 = 5.15
        assert_eq!(weighted_overall(&[8.0, 5.0, 5.0, 3.0, 3.0, 5.0]), 5.2);
    }

    #[test]
    fn test_weights_sum_to_one() {
        assert!(approx(WEIGHTS.iter().sum::<f64>(), 1.0));
    }

    #[test]
    fn test_ingredients_floor_at_zero() {
        let many = ARTIFICIAL_INGREDIENTS.join(", ").repeat(50);
        let score = score_ingredients(&format!("{} proprietary blend", many), Claims::default());
        assert_eq!(score, 0.0);
    }

    #[test]
    fn test_beneficial_bonus_capped() {
        let text = "organic whole raw fermented sprouted cultured pure unrefined cold-pressed natural extract";
        assert!(approx(score_ingredients(text, Claims::default()), 6.5));
    }

    #[test]
    fn test_ingredients_ignores_sentinel_text() {
        // sentinel mentions nothing scorable and must not count as content
        let sentinel = Field::Ingredients.not_found();
        assert_eq!(score_ingredients(&sentinel, Claims::default()), 5.0);
        let claims = Claims { organic: true, vegan: true, ..Claims::default() };
        assert!(approx(score_ingredients(&sentinel, claims), 7.0));
    }

    #[test]
    fn test_manufacturing() {
        assert_eq!(score_manufacturing(true, "Made in USA", "Thorne Research"), 10.0);
        assert_eq!(score_manufacturing(false, &Field::CountryOfOrigin.not_found(), "Acme"), 5.0);
    }

    #[test]
    fn test_testing_is_clamped_not_capped() {
        let certs = "USP Verified, NSF Certified, Informed Choice, Informed Sport, ConsumerLab";
        assert_eq!(score_testing(true, certs), 10.0);
        assert_eq!(score_testing(false, "USP Verified"), 5.0);
    }

    #[test]
    fn test_label_accuracy_requires_real_text() {
        assert_eq!(
            score_label_accuracy(
                "Vitamin D3 (as cholecalciferol)",
                "Keep out of reach of children.",
                "Take one softgel daily.",
                "1 softgel"
            ),
            10.0
        );
        let missing = Field::Warnings.not_found();
        assert_eq!(score_label_accuracy(&missing, &missing, &missing, &missing), 3.0);
    }

    #[test]
    fn test_probiotic_cfu_and_strains() {
        let text = "50 billion CFU: Lactobacillus acidophilus, Lactobacillus rhamnosus, Bifidobacterium longum";
        // +2.0 for >30 billion, +1.5 for three strains
        assert!(approx(score_nutritional_quality("Digestive Health", "Probiotics", text), 8.5));
        // subcategory gates the probiotic rules
        assert_eq!(score_nutritional_quality("Digestive Health", "Prebiotics", text), 5.0);
    }

    #[test]
    fn test_first_cfu_figure_counts() {
        assert_eq!(cfu_billions("50 billion cfu at manufacture, 20 billion cfu at expiration"), Some(50));
        assert_eq!(cfu_billions("15 billion cfu at expiration, 100 billion cfu at manufacture"), Some(15));
        assert_eq!(cfu_billions("live cultures"), None);
        // first figure is 15 billion: +1.0 only
        let text = "15 billion CFU per capsule (100 billion CFU at manufacture)";
        assert!(approx(score_nutritional_quality("Digestive Health", "Probiotics", text), 6.0));
    }

    #[test]
    fn test_strain_bonus_capped() {
        let text = "lactobacillus ".repeat(10);
        assert!(approx(score_nutritional_quality("Digestive Health", "Probiotics", &text), 8.0));
    }

    #[test]
    fn test_nutritional_without_category() {
        assert_eq!(score_nutritional_quality("", "", "magnesium glycinate"), 5.0);
    }

    #[test]
    fn test_sustainability_packaging_and_brand() {
        let score = score_sustainability("USDA Organic, Fair Trade, Glass Bottle", "Garden of Life");
        assert!(approx(score, 5.0 + 1.4 + 1.0 + 1.0));
    }

    #[test]
    fn test_calculate_scores_is_deterministic() {
        let mut record = ProductRecord::new("https://example.com/p");
        record.ingredients = "Whey protein isolate, creatine monohydrate".into();
        record.main_category = "Fitness & Performance".into();
        record.subcategory = "Muscle Building".into();
        let a = calculate_scores(&record);
        let b = calculate_scores(&record);
        assert_eq!(a, b);
        for s in a.subscores() {
            assert!((MIN_SCORE..=MAX_SCORE).contains(&s));
        }
    }
}
