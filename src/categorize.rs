//! Ingredient-text categorization by keyword voting

use tracing::debug;

use crate::normalize::preview;

pub const UNCATEGORIZED: (&str, &str) = ("Uncategorized", "General");

/// Ingredient keyword -> (main category, subcategory), in voting order.
/// Matching is by substring on lowercased text.
pub const TAXONOMY: &[(&str, (&str, &str))] = &[
    ("l-theanine", ("Cognitive & Mental Health", "Nootropics")),
    ("alpha-gpc", ("Cognitive & Mental Health", "Nootropics")),
    ("bacopa", ("Cognitive & Mental Health", "Nootropics")),
    ("ginkgo biloba", ("Cognitive & Mental Health", "Memory & Focus")),
    ("lion's mane", ("Cognitive & Mental Health", "Memory & Focus")),
    ("5-htp", ("Cognitive & Mental Health", "Mood Support")),
    ("st. john's wort", ("Cognitive & Mental Health", "Mood Support")),
    ("sam-e", ("Cognitive & Mental Health", "Mood Support")),
    ("ashwagandha", ("Cognitive & Mental Health", "Stress & Anxiety Relief")),
    ("rhodiola", ("Cognitive & Mental Health", "Stress & Anxiety Relief")),
    ("beta-alanine", ("Fitness & Performance", "Pre-Workout")),
    ("citrulline", ("Fitness & Performance", "Pre-Workout")),
    ("bcaa", ("Fitness & Performance", "Post-Workout / Recovery")),
    ("glutamine", ("Fitness & Performance", "Post-Workout / Recovery")),
    ("creatine", ("Fitness & Performance", "Muscle Building")),
    ("protein", ("Fitness & Performance", "Muscle Building")),
    ("whey", ("Fitness & Performance", "Muscle Building")),
    ("cordyceps", ("Fitness & Performance", "Endurance & Energy")),
    ("caffeine", ("Fitness & Performance", "Endurance & Energy")),
    ("glucosamine", ("Joint & Bone Health", "Joint Support")),
    ("chondroitin", ("Joint & Bone Health", "Joint Support")),
    ("msm", ("Joint & Bone Health", "Joint Support")),
    ("calcium", ("Joint & Bone Health", "Bone Strength")),
    ("vitamin d3", ("Joint & Bone Health", "Bone Strength")),
    ("vitamin k2", ("Joint & Bone Health", "Bone Strength")),
    ("niacin", ("Heart & Circulatory Health", "Cholesterol Support")),
    ("red yeast rice", ("Heart & Circulatory Health", "Cholesterol Support")),
    ("coq10", ("Heart & Circulatory Health", "Blood Pressure Support")),
    ("magnesium", ("Heart & Circulatory Health", "Blood Pressure Support")),
    ("beetroot", ("Heart & Circulatory Health", "Circulation Enhancers")),
    ("garlic", ("Heart & Circulatory Health", "Circulation Enhancers")),
    ("vitamin c", ("Immune Support", "General Immune Boosters")),
    ("zinc", ("Immune Support", "General Immune Boosters")),
    ("elderberry", ("Immune Support", "General Immune Boosters")),
    ("olive leaf", ("Immune Support", "Antivirals")),
    ("echinacea", ("Immune Support", "Antivirals")),
    ("astragalus", ("Immune Support", "Adaptogens")),
    ("schisandra", ("Immune Support", "Adaptogens")),
    ("glutathione", ("Cellular Health & Longevity", "Antioxidants")),
    ("resveratrol", ("Cellular Health & Longevity", "Antioxidants")),
    ("nac", ("Cellular Health & Longevity", "Antioxidants")),
    ("pqq", ("Cellular Health & Longevity", "Mitochondrial Support")),
    ("ubiquinol", ("Cellular Health & Longevity", "Mitochondrial Support")),
    ("nmn", ("Cellular Health & Longevity", "Telomere/Anti-aging")),
    ("nr", ("Cellular Health & Longevity", "Telomere/Anti-aging")),
    ("fisetin", ("Cellular Health & Longevity", "Telomere/Anti-aging")),
    ("tongkat ali", ("Hormonal Support", "Testosterone Boosters")),
    ("d-aspartic acid", ("Hormonal Support", "Testosterone Boosters")),
    ("dim", ("Hormonal Support", "Estrogen Balance")),
    ("maca", ("Hormonal Support", "Estrogen Balance")),
    ("vitex", ("Hormonal Support", "Estrogen Balance")),
    ("iodine", ("Hormonal Support", "Thyroid Support")),
    ("selenium", ("Hormonal Support", "Thyroid Support")),
    ("l-tyrosine", ("Hormonal Support", "Thyroid Support")),
    ("black cohosh", ("Hormonal Support", "Menopause & PMS")),
    ("evening primrose", ("Hormonal Support", "Menopause & PMS")),
    ("probiotic", ("Digestive Health", "Probiotics")),
    ("lactobacillus", ("Digestive Health", "Probiotics")),
    ("bifidobacterium", ("Digestive Health", "Probiotics")),
    ("inulin", ("Digestive Health", "Prebiotics")),
    ("fos", ("Digestive Health", "Prebiotics")),
    ("xos", ("Digestive Health", "Prebiotics")),
    ("amylase", ("Digestive Health", "Digestive Enzymes")),
    ("lipase", ("Digestive Health", "Digestive Enzymes")),
    ("protease", ("Digestive Health", "Digestive Enzymes")),
    ("l-glutamine", ("Digestive Health", "Gut Lining Support")),
    ("licorice root", ("Digestive Health", "Gut Lining Support")),
    ("multivitamin", ("Vitamins & Minerals", "Multivitamins")),
    ("vitamin a", ("Vitamins & Minerals", "Individual Vitamins")),
    ("vitamin b", ("Vitamins & Minerals", "Individual Vitamins")),
    ("vitamin e", ("Vitamins & Minerals", "Individual Vitamins")),
    ("iron", ("Vitamins & Minerals", "Individual Minerals")),
    ("potassium", ("Vitamins & Minerals", "Individual Minerals")),
    ("spirulina", ("Greens & Superfoods", "Greens Powders")),
    // chlorella votes for detox even though it sits with the greens
    ("chlorella", ("Detox & Cleanse", "Heavy Metal Detox")),
    ("kelp", ("Greens & Superfoods", "Algae & Sea Vegetables")),
    ("dulse", ("Greens & Superfoods", "Algae & Sea Vegetables")),
    ("acai", ("Greens & Superfoods", "Reds/Berries Powders")),
    ("goji", ("Greens & Superfoods", "Reds/Berries Powders")),
    ("melatonin", ("Sleep & Relaxation", "Sleep Aids")),
    ("gaba", ("Sleep & Relaxation", "Sleep Aids")),
    ("glycine", ("Sleep & Relaxation", "Sleep Aids")),
    ("valerian", ("Sleep & Relaxation", "Relaxation Support")),
    ("chamomile", ("Sleep & Relaxation", "Relaxation Support")),
    ("garcinia cambogia", ("Weight Management", "Appetite Suppressants")),
    ("green tea extract", ("Weight Management", "Fat Burners")),
    ("yohimbine", ("Weight Management", "Fat Burners")),
    ("l-carnitine", ("Weight Management", "Metabolism Boosters")),
    ("milk thistle", ("Detox & Cleanse", "Liver Support")),
    ("dandelion root", ("Detox & Cleanse", "Liver Support")),
    ("cilantro", ("Detox & Cleanse", "Heavy Metal Detox")),
    ("psyllium husk", ("Detox & Cleanse", "Colon Cleanses")),
    ("senna", ("Detox & Cleanse", "Colon Cleanses")),
];

/// Generic hints used when no taxonomy keyword matches; first match wins
pub const FALLBACK_HINTS: &[(&str, (&str, &str))] = &[
    ("vitamin", ("Vitamins & Minerals", "Individual Vitamins")),
    ("mineral", ("Vitamins & Minerals", "Individual Minerals")),
    ("probiotic", ("Digestive Health", "Probiotics")),
    ("protein", ("Fitness & Performance", "Muscle Building")),
    ("herb", ("Cognitive & Mental Health", "Stress & Anxiety Relief")),
    ("extract", ("Immune Support", "General Immune Boosters")),
    ("oil", ("Heart & Circulatory Health", "Cholesterol Support")),
];

/// Vote tally preserving first-seen order, so ties resolve to the earliest key
struct Tally<K> {
    counts: Vec<(K, usize)>,
}

impl<K: PartialEq + Copy> Tally<K> {
    fn new() -> Self {
        Self { counts: Vec::new() }
    }

    fn vote(&mut self, key: K) {
        match self.counts.iter_mut().find(|(k, _)| *k == key) {
            Some((_, n)) => *n += 1,
            None => self.counts.push((key, 1)),
        }
    }

    /// First key holding the maximum count
    fn winner(&self) -> Option<K> {
        let mut best: Option<(K, usize)> = None;
        for &(key, n) in &self.counts {
            if best.map_or(true, |(_, b)| n > b) {
                best = Some((key, n));
            }
        }
        best.map(|(k, _)| k)
    }
}

/// Map ingredient text to (main_category, subcategory)
pub fn categorize(ingredients: &str) -> (&'static str, &'static str) {
    let lower = ingredients.trim().to_lowercase();
    if lower.is_empty() {
        return UNCATEGORIZED;
    }

    let mut categories = Tally::new();
    let mut subcategories = Tally::new();
    for (keyword, (main, sub)) in TAXONOMY {
        if lower.contains(keyword) {
            categories.vote(*main);
            subcategories.vote((*main, *sub));
        }
    }

    if let Some(main) = categories.winner() {
        let sub = subcategories
            .counts
            .iter()
            .filter(|((m, _), _)| *m == main)
            .fold(None::<(&str, usize)>, |best, &((_, s), n)| match best {
                Some((_, b)) if n <= b => best,
                _ => Some((s, n)),
            })
            .map(|(s, _)| s)
            .unwrap_or(UNCATEGORIZED.1);
        debug!(main, sub, "categorized by taxonomy vote");
        return (main, sub);
    }

    match FALLBACK_HINTS.iter().find(|(hint, _)| lower.contains(hint)) {
        Some((hint, pair)) => {
            debug!(hint, main = pair.0, sub = pair.1, "categorized by generic hint");
            *pair
        }
        None => {
            debug!("could not categorize: {}", preview(ingredients, 100));
            UNCATEGORIZED
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protein_blend_is_muscle_building() {
        assert_eq!(
            categorize("Whey protein isolate, creatine monohydrate, BCAA"),
            ("Fitness & Performance", "Muscle Building")
        );
    }

    #[test]
    fn test_empty_input_is_uncategorized() {
        assert_eq!(categorize(""), UNCATEGORIZED);
        assert_eq!(categorize("   "), UNCATEGORIZED);
    }

    #[test]
    fn test_fallback_hints_in_order() {
        // "herb" precedes "extract" in the hint list
        assert_eq!(
            categorize("Herbal extract blend"),
            ("Cognitive & Mental Health", "Stress & Anxiety Relief")
        );
        assert_eq!(
            categorize("Cold-pressed flaxseed oil"),
            ("Heart & Circulatory Health", "Cholesterol Support")
        );
    }

    #[test]
    fn test_no_match_is_uncategorized() {
        assert_eq!(categorize("Water, salt"), UNCATEGORIZED);
    }

    #[test]
    fn test_category_tie_goes_to_first_seen() {
        // one vote each: Cognitive (ashwagandha) precedes Sleep (melatonin)
        assert_eq!(
            categorize("melatonin, ashwagandha"),
            ("Cognitive & Mental Health", "Stress & Anxiety Relief")
        );
    }

    #[test]
    fn test_chlorella_counts_as_detox() {
        assert_eq!(
            categorize("Chlorella powder, cilantro leaf"),
            ("Detox & Cleanse", "Heavy Metal Detox")
        );
    }

    #[test]
    fn test_taxonomy_keywords_lowercase_and_unique() {
        let mut seen = std::collections::HashSet::new();
        for (kw, _) in TAXONOMY {
            assert_eq!(*kw, kw.to_lowercase());
            assert!(seen.insert(*kw), "duplicate taxonomy keyword {}", kw);
        }
    }
}
