//! Image extraction by scored candidates
//!
//! Every `<img>` on the page is a potential candidate. Points are awarded for
//! matching a known product-image selector, for keywords in alt text and URL,
//! and for sitting right after (or before) a relevant heading. The best score
//! wins; ties go to the image seen first.

use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use tracing::debug;
use url::Url;

use crate::keywords::{
    INGREDIENT_IMAGE_HEADINGS, INGREDIENT_IMAGE_KEYWORDS, MIN_IMAGE_DIMENSION, PRODUCT_IMAGE_KEYWORDS,
    PRODUCT_IMAGE_SELECTORS,
};
use crate::normalize::flatten_text;

static ALL_SEL: Lazy<Selector> = Lazy::new(|| Selector::parse("*").expect("Invalid selector"));
static OG_IMAGE_SEL: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(r#"meta[property="og:image"]"#).expect("Invalid og:image selector")
});

const SELECTOR_POINTS: u32 = 2;
const OG_IMAGE_POINTS: u32 = 1;
const ALT_KEYWORD_POINTS: u32 = 2;
const SRC_KEYWORD_POINTS: u32 = 1;
const AFTER_HEADING_POINTS: u32 = 3;
const BEFORE_HEADING_POINTS: u32 = 2;

/// Attributes holding an image URL, in preference order
const SRC_ATTRS: &[&str] = &["src", "data-src", "data-old-hires", "data-lazy-src"];

const HEADING_TAGS: &[&str] = &["h1", "h2", "h3", "h4", "h5", "h6", "strong", "b"];

/// What makes an image interesting for one kind of lookup
#[derive(Debug, Clone)]
pub struct Criteria {
    pub selectors: &'static [&'static str],
    pub keywords: Vec<String>,
    pub headings: &'static [&'static str],
    /// Fall back to the og:image meta tag
    pub og_image: bool,
}

impl Criteria {
    /// Main product shot; words of the product name count as keywords
    pub fn product(product_name: Option<&str>) -> Self {
        let mut keywords: Vec<String> = PRODUCT_IMAGE_KEYWORDS.iter().map(|k| k.to_string()).collect();
        if let Some(name) = product_name {
            for word in name.split_whitespace() {
                let word = word
                    .trim_matches(|c: char| !c.is_alphanumeric())
                    .to_lowercase();
                if word.chars().count() > 3 && !keywords.contains(&word) {
                    keywords.push(word);
                }
            }
        }
        Self {
            selectors: PRODUCT_IMAGE_SELECTORS,
            keywords,
            headings: &[],
            og_image: true,
        }
    }

    /// Supplement/nutrition facts panel
    pub fn ingredient_label() -> Self {
        Self {
            selectors: &[],
            keywords: INGREDIENT_IMAGE_KEYWORDS.iter().map(|k| k.to_string()).collect(),
            headings: INGREDIENT_IMAGE_HEADINGS,
            og_image: false,
        }
    }
}

/// A scored image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageCandidate {
    pub url: String,
    pub score: u32,
}

/// Best image on the page for the given criteria, URL resolved against `page_url`
pub fn best_image(document: &Html, page_url: &str, criteria: &Criteria) -> Option<ImageCandidate> {
    let base = Url::parse(page_url).ok();
    let elements: Vec<ElementRef> = document.select(&ALL_SEL).collect();

    let selected: HashSet<_> = criteria
        .selectors
        .iter()
        .filter_map(|s| Selector::parse(s).ok())
        .flat_map(|sel| document.select(&sel).map(|el| el.id()).collect::<Vec<_>>())
        .collect();

    // (position in document, element, src)
    let images: Vec<(usize, ElementRef, String)> = elements
        .iter()
        .enumerate()
        .filter(|(_, el)| el.value().name() == "img")
        .filter_map(|(pos, el)| image_src(el).map(|src| (pos, *el, src)))
        .collect();

    let mut scores = vec![0u32; images.len()];

    for (i, (_, el, src)) in images.iter().enumerate() {
        if selected.contains(&el.id()) {
            scores[i] += SELECTOR_POINTS;
        }
        let alt = el.value().attr("alt").unwrap_or("").to_lowercase();
        let src_lower = src.to_lowercase();
        for kw in &criteria.keywords {
            if alt.contains(kw.as_str()) {
                scores[i] += ALT_KEYWORD_POINTS;
            }
            if src_lower.contains(kw.as_str()) {
                scores[i] += SRC_KEYWORD_POINTS;
            }
        }
    }

    if !criteria.headings.is_empty() {
        let mut matched = HashSet::new();
        for (pos, el) in elements.iter().enumerate() {
            if !HEADING_TAGS.contains(&el.value().name()) {
                continue;
            }
            let text = flatten_text(el).to_lowercase();
            if !criteria.headings.iter().any(|h| text.contains(&h.to_lowercase())) {
                continue;
            }
            matched.insert(el.id());
            // <h3><strong>Supplement Facts</strong></h3> is one heading
            if el.ancestors().any(|a| matched.contains(&a.id())) {
                continue;
            }
            if let Some(i) = images.iter().position(|(p, _, _)| *p > pos) {
                scores[i] += AFTER_HEADING_POINTS;
            }
            if let Some(i) = images.iter().rposition(|(p, _, _)| *p < pos) {
                scores[i] += BEFORE_HEADING_POINTS;
            }
        }
    }

    let mut best: Option<ImageCandidate> = None;
    for (i, (_, el, src)) in images.iter().enumerate() {
        let score = scores[i];
        if score == 0 || too_small(el) {
            continue;
        }
        if best.as_ref().map_or(true, |b| score > b.score) {
            if let Some(url) = resolve_url(base.as_ref(), src) {
                best = Some(ImageCandidate { url, score });
            }
        }
    }

    if best.is_none() && criteria.og_image {
        best = document
            .select(&OG_IMAGE_SEL)
            .filter_map(|m| m.value().attr("content"))
            .find_map(|src| resolve_url(base.as_ref(), src.trim()))
            .map(|url| ImageCandidate { url, score: OG_IMAGE_POINTS });
    }

    if let Some(ref c) = best {
        debug!(url = %c.url, score = c.score, "selected image candidate");
    }
    best
}

fn image_src(el: &ElementRef) -> Option<String> {
    SRC_ATTRS
        .iter()
        .filter_map(|a| el.value().attr(a))
        .map(str::trim)
        .find(|s| !s.is_empty() && !s.starts_with("data:"))
        .map(str::to_string)
}

/// Declared width or height below the readable minimum
fn too_small(el: &ElementRef) -> bool {
    ["width", "height"].iter().any(|attr| {
        el.value()
            .attr(attr)
            .and_then(|v| v.trim().trim_end_matches("px").parse::<u32>().ok())
            .is_some_and(|n| n < MIN_IMAGE_DIMENSION)
    })
}

/// Resolve relative and protocol-relative URLs against the page
pub fn resolve_url(base: Option<&Url>, src: &str) -> Option<String> {
    if src.is_empty() {
        return None;
    }
    match base {
        Some(base) => base.join(src).ok().map(|u| u.to_string()),
        None => Url::parse(src).ok().map(|u| u.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = "https://shop.example.com/products/d3";

    #[test]
    fn test_selector_match_beats_plain_image() {
        let html = Html::parse_document(
            r#"<img src="/banner.jpg" alt="Summer sale">
               <div class="product-media"><img src="/img/d3-bottle.jpg" alt="Bottle"></div>"#,
        );
        let best = best_image(&html, PAGE, &Criteria::product(None)).unwrap();
        assert_eq!(best.url, "https://shop.example.com/img/d3-bottle.jpg");
        assert_eq!(best.score, 2);
    }

    #[test]
    fn test_small_images_discarded() {
        let html = Html::parse_document(
            r#"<img class="product-image" src="/thumb.jpg" width="50" height="50">
               <img class="product-image" src="/full.jpg" width="600" height="600">"#,
        );
        let best = best_image(&html, PAGE, &Criteria::product(None)).unwrap();
        assert!(best.url.ends_with("/full.jpg"));
    }

    #[test]
    fn test_ties_go_to_first() {
        let html = Html::parse_document(
            r#"<img class="product-image" src="/a.jpg"><img class="product-image" src="/b.jpg">"#,
        );
        let best = best_image(&html, PAGE, &Criteria::product(None)).unwrap();
        assert!(best.url.ends_with("/a.jpg"));
    }

    #[test]
    fn test_ingredient_image_near_heading() {
        let html = Html::parse_document(
            r#"<img src="/lifestyle.jpg" alt="Happy customer">
               <h3>Supplement Facts</h3>
               <img src="/panel.png" alt="Panel">"#,
        );
        let best = best_image(&html, PAGE, &Criteria::ingredient_label()).unwrap();
        assert!(best.url.ends_with("/panel.png"));
        assert_eq!(best.score, 3);
    }

    #[test]
    fn test_nested_heading_counts_once() {
        let html = Html::parse_document(
            r#"<img src="/lifestyle.jpg" alt="Happy customer">
               <h3><strong>Supplement Facts</strong></h3>
               <img src="/panel.png" alt="Panel">"#,
        );
        let best = best_image(&html, PAGE, &Criteria::ingredient_label()).unwrap();
        assert!(best.url.ends_with("/panel.png"));
        assert_eq!(best.score, AFTER_HEADING_POINTS);
    }

    #[test]
    fn test_ingredient_image_by_alt_text() {
        let html = Html::parse_document(
            r#"<img src="//cdn.example.com/x1.jpg" alt="Front of bottle">
               <img src="//cdn.example.com/x2.jpg" alt="Supplement Facts label">"#,
        );
        let best = best_image(&html, PAGE, &Criteria::ingredient_label()).unwrap();
        assert_eq!(best.url, "https://cdn.example.com/x2.jpg");
    }

    #[test]
    fn test_og_image_fallback() {
        let html = Html::parse_document(
            r#"<html><head><meta property="og:image" content="https://cdn.example.com/og.jpg"></head>
               <body><img src="/spacer.gif" alt=""></body></html>"#,
        );
        let best = best_image(&html, PAGE, &Criteria::product(None)).unwrap();
        assert_eq!(best.url, "https://cdn.example.com/og.jpg");
        assert_eq!(best.score, OG_IMAGE_POINTS);
    }

    #[test]
    fn test_product_name_words_are_keywords() {
        let criteria = Criteria::product(Some("Magnesium Glycinate 400"));
        assert!(criteria.keywords.contains(&"magnesium".to_string()));
        assert!(criteria.keywords.contains(&"glycinate".to_string()));
        assert!(!criteria.keywords.contains(&"400".to_string()));
    }

    #[test]
    fn test_no_candidates() {
        let html = Html::parse_document("<p>No pictures here</p>");
        assert!(best_image(&html, PAGE, &Criteria::ingredient_label()).is_none());
    }
}
