//! Generic text-field cascade
//!
//! Five independent strategies share one interface and are tried in a fixed
//! order; the first one producing a qualifying candidate wins. A strategy that
//! finds nothing simply yields `None`, it never errors.

use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

use crate::keywords::FieldKeywords;
use crate::normalize::{char_len, flatten_text, prefix_regex, word_regex};

/// Minimum characters for any candidate to count as content
pub const MIN_TEXT_LENGTH: usize = 20;

/// Parent-text fallback rejects anything longer than this
pub const MAX_PARENT_TEXT_LENGTH: usize = 4000;

/// Parent-text fallback requires the keyword within this many characters
pub const MAX_KEYWORD_OFFSET: usize = 200;

static ALL_SEL: Lazy<Selector> = Lazy::new(|| Selector::parse("*").expect("Invalid selector"));

static HEADING_SEL: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("h1, h2, h3, h4, h5, h6, strong, b").expect("Invalid selector")
});

static BLOCK_SEL: Lazy<Selector> = Lazy::new(|| Selector::parse("p, div, li").expect("Invalid selector"));

static DT_SEL: Lazy<Selector> = Lazy::new(|| Selector::parse("dt").expect("Invalid selector"));

static FALLBACK_SEL: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("p, div, span, li, td, section, article, b, strong").expect("Invalid selector")
});

/// Elements too broad to be a field container
const STRUCTURAL_TAGS: &[&str] = &["html", "head", "body", "script", "style", "noscript"];

/// Which strategy produced a value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    AttributeMatch,
    HeadingSibling,
    KeywordPrefix,
    DefinitionList,
    ParentText,
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StrategyKind::AttributeMatch => "attribute match",
            StrategyKind::HeadingSibling => "heading + sibling",
            StrategyKind::KeywordPrefix => "keyword-prefixed block",
            StrategyKind::DefinitionList => "definition list",
            StrategyKind::ParentText => "parent text",
        };
        write!(f, "{}", name)
    }
}

/// A qualifying result from one strategy
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    /// Flattened, collapsed text
    pub text: String,
    /// Keyword that triggered the match
    pub keyword: &'static str,
    /// The attribute value or label text that actually matched
    pub label: String,
}

/// A cascade result with the strategy that produced it
#[derive(Debug, Clone, PartialEq)]
pub struct Hit {
    pub candidate: Candidate,
    pub strategy: StrategyKind,
}

/// One extraction heuristic
pub trait Strategy: Sync {
    fn kind(&self) -> StrategyKind;
    fn attempt(&self, document: &Html, keywords: &FieldKeywords) -> Option<Candidate>;
}

/// The generic cascade in priority order
pub static CASCADE: &[&dyn Strategy] = &[
    &AttributeMatch,
    &HeadingSibling,
    &KeywordPrefix,
    &DefinitionList,
    &ParentText,
];

/// Run the cascade, stopping at the first strategy that succeeds
pub fn run(document: &Html, keywords: &FieldKeywords) -> Option<Hit> {
    CASCADE.iter().find_map(|strategy| {
        let candidate = strategy.attempt(document, keywords)?;
        debug!(
            strategy = %strategy.kind(),
            keyword = candidate.keyword,
            "cascade strategy succeeded"
        );
        Some(Hit {
            candidate,
            strategy: strategy.kind(),
        })
    })
}

fn qualifies(text: &str) -> bool {
    char_len(text) >= MIN_TEXT_LENGTH
}

/// Strategy 1: id/class attribute contains a keyword
pub struct AttributeMatch;

impl AttributeMatch {
    /// id or class value containing the keyword, case-insensitive
    fn matching_attr(element: &ElementRef, keyword: &str) -> Option<String> {
        let el = element.value();
        if let Some(id) = el.id() {
            if id.to_lowercase().contains(keyword) {
                return Some(id.to_string());
            }
        }
        el.classes()
            .find(|c| c.to_lowercase().contains(keyword))
            .map(str::to_string)
    }
}

impl Strategy for AttributeMatch {
    fn kind(&self) -> StrategyKind {
        StrategyKind::AttributeMatch
    }

    fn attempt(&self, document: &Html, keywords: &FieldKeywords) -> Option<Candidate> {
        for &keyword in keywords.attributes {
            for element in document.select(&ALL_SEL) {
                if STRUCTURAL_TAGS.contains(&element.value().name()) {
                    continue;
                }
                let Some(label) = Self::matching_attr(&element, keyword) else {
                    continue;
                };
                let text = flatten_text(&element);
                if qualifies(&text) {
                    return Some(Candidate { text, keyword, label });
                }
            }
        }
        None
    }
}

/// Strategy 2: heading mentions the keyword, content is its next non-empty sibling
pub struct HeadingSibling;

impl Strategy for HeadingSibling {
    fn kind(&self) -> StrategyKind {
        StrategyKind::HeadingSibling
    }

    fn attempt(&self, document: &Html, keywords: &FieldKeywords) -> Option<Candidate> {
        for &keyword in keywords.text {
            let Some(re) = word_regex(keyword) else { continue };
            for heading in document.select(&HEADING_SEL) {
                let label = flatten_text(&heading);
                if !re.is_match(&label) {
                    continue;
                }
                let sibling_text = heading
                    .next_siblings()
                    .filter_map(ElementRef::wrap)
                    .map(|sibling| flatten_text(&sibling))
                    .find(|text| !text.is_empty());
                if let Some(text) = sibling_text {
                    if qualifies(&text) {
                        return Some(Candidate { text, keyword, label });
                    }
                }
            }
        }
        None
    }
}

/// Strategy 3: block whose text starts with the keyword (optionally with a colon)
pub struct KeywordPrefix;

impl Strategy for KeywordPrefix {
    fn kind(&self) -> StrategyKind {
        StrategyKind::KeywordPrefix
    }

    fn attempt(&self, document: &Html, keywords: &FieldKeywords) -> Option<Candidate> {
        for &keyword in keywords.text {
            let Some(re) = prefix_regex(keyword) else { continue };
            for element in document.select(&BLOCK_SEL) {
                let text = flatten_text(&element);
                if !re.is_match(&text) {
                    continue;
                }
                // Prefer the innermost block; an enclosing wrapper starts with the same text
                let inner_match = element
                    .select(&BLOCK_SEL)
                    .any(|inner| re.is_match(&flatten_text(&inner)));
                if inner_match {
                    continue;
                }
                if qualifies(&text) {
                    let label = keyword.to_string();
                    return Some(Candidate { text, keyword, label });
                }
            }
        }
        None
    }
}

/// Strategy 4: <dt> mentions the keyword, content is the following <dd>
pub struct DefinitionList;

impl Strategy for DefinitionList {
    fn kind(&self) -> StrategyKind {
        StrategyKind::DefinitionList
    }

    fn attempt(&self, document: &Html, keywords: &FieldKeywords) -> Option<Candidate> {
        for &keyword in keywords.text {
            let Some(re) = word_regex(keyword) else { continue };
            for dt in document.select(&DT_SEL) {
                let label = flatten_text(&dt);
                if !re.is_match(&label) {
                    continue;
                }
                let dd = dt
                    .next_siblings()
                    .filter_map(ElementRef::wrap)
                    .find(|sibling| sibling.value().name() == "dd");
                if let Some(dd) = dd {
                    let text = flatten_text(&dd);
                    if qualifies(&text) {
                        return Some(Candidate { text, keyword, label });
                    }
                }
            }
        }
        None
    }
}

/// Strategy 5: any element mentioning the keyword, content is its parent's text
/// when the keyword sits near the start and the text is not a page dump
pub struct ParentText;

impl Strategy for ParentText {
    fn kind(&self) -> StrategyKind {
        StrategyKind::ParentText
    }

    fn attempt(&self, document: &Html, keywords: &FieldKeywords) -> Option<Candidate> {
        for &keyword in keywords.text {
            let Some(re) = word_regex(keyword) else { continue };
            for element in document.select(&FALLBACK_SEL) {
                let own_text = flatten_text(&element);
                if !re.is_match(&own_text) {
                    continue;
                }
                let Some(parent) = element.parent().and_then(ElementRef::wrap) else {
                    continue;
                };
                let text = flatten_text(&parent);
                if let Some(found) = parent_text_accepts(&text, &re) {
                    return Some(Candidate {
                        text: found,
                        keyword,
                        label: own_text,
                    });
                }
            }
        }
        None
    }
}

/// Offset and length bounds for the parent-text fallback
fn parent_text_accepts(text: &str, re: &regex::Regex) -> Option<String> {
    let m = re.find(text)?;
    let offset = text[..m.start()].chars().count();
    let len = char_len(text);
    if offset < MAX_KEYWORD_OFFSET && (MIN_TEXT_LENGTH..=MAX_PARENT_TEXT_LENGTH).contains(&len) {
        Some(text.to_string())
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keywords::{DIRECTIONS, INGREDIENTS};

    fn doc(body: &str) -> Html {
        Html::parse_document(&format!("<html><body>{}</body></html>", body))
    }

    #[test]
    fn test_attribute_match() {
        let html = doc(r#"<div id="product-ingredients">Vitamin C (as ascorbic acid), rice flour</div>"#);
        let hit = AttributeMatch.attempt(&html, &INGREDIENTS).unwrap();
        assert_eq!(hit.text, "Vitamin C (as ascorbic acid), rice flour");
        assert_eq!(hit.keyword, "ingredient");
        assert_eq!(hit.label, "product-ingredients");
    }

    #[test]
    fn test_attribute_match_rejects_short_text() {
        let html = doc(r#"<div class="ingredients">See label</div>
            <h3>Ingredients</h3><p>Magnesium glycinate, vegetable cellulose capsule</p>"#);
        assert!(AttributeMatch.attempt(&html, &INGREDIENTS).is_none());

        let hit = run(&html, &INGREDIENTS).unwrap();
        assert_eq!(hit.strategy, StrategyKind::HeadingSibling);
        assert_eq!(hit.candidate.text, "Magnesium glycinate, vegetable cellulose capsule");
    }

    #[test]
    fn test_heading_sibling_skips_empty_siblings() {
        let html = doc(r#"<h2>Suggested Use</h2><div></div><span>  </span>
            <p>Take one capsule daily with food or as directed.</p>"#);
        let hit = HeadingSibling.attempt(&html, &DIRECTIONS).unwrap();
        assert_eq!(hit.text, "Take one capsule daily with food or as directed.");
        assert_eq!(hit.keyword, "suggested use");
    }

    #[test]
    fn test_heading_requires_whole_word() {
        let html = doc(r#"<h2>Usages and more</h2><p>Take one capsule daily with food or as directed.</p>"#);
        assert!(HeadingSibling.attempt(&html, &DIRECTIONS).is_none());
    }

    #[test]
    fn test_keyword_prefix_prefers_innermost() {
        let html = doc(r#"<div><p>Directions: Take two capsules daily with water.</p></div>"#);
        let hit = KeywordPrefix.attempt(&html, &DIRECTIONS).unwrap();
        assert_eq!(hit.text, "Directions: Take two capsules daily with water.");
    }

    #[test]
    fn test_definition_list_walks_past_other_siblings() {
        let html = doc(r#"<dl><dt>Ingredients</dt><span>note</span>
            <dd>Organic spirulina powder, chlorella</dd></dl>"#);
        let hit = DefinitionList.attempt(&html, &INGREDIENTS).unwrap();
        assert_eq!(hit.text, "Organic spirulina powder, chlorella");
    }

    #[test]
    fn test_parent_text_accepts_keyword_near_start() {
        let html = doc(r#"<section><span>Directions</span> take 1 tablet every morning</section>"#);
        let hit = ParentText.attempt(&html, &DIRECTIONS).unwrap();
        assert_eq!(hit.text, "Directions take 1 tablet every morning");
    }

    #[test]
    fn test_parent_text_rejects_far_keyword() {
        let filler = "lorem ipsum ".repeat(20);
        let html = doc(&format!(
            "<section>{}<span>Directions</span> take 1 tablet every morning</section>",
            filler
        ));
        assert!(ParentText.attempt(&html, &DIRECTIONS).is_none());
    }

    #[test]
    fn test_parent_text_rejects_page_dump() {
        let filler = "x".repeat(MAX_PARENT_TEXT_LENGTH);
        let html = doc(&format!(
            "<section><span>Directions</span> take 1 tablet {}</section>",
            filler
        ));
        assert!(ParentText.attempt(&html, &DIRECTIONS).is_none());
    }

    #[test]
    fn test_cascade_is_deterministic() {
        let html = doc(r#"<h3>Ingredients</h3><p>Whey protein isolate, cocoa, sunflower lecithin</p>"#);
        let first = run(&html, &INGREDIENTS);
        let second = run(&html, &INGREDIENTS);
        assert_eq!(first, second);
        assert!(first.is_some());
    }

    #[test]
    fn test_cascade_exhausted() {
        let html = doc("<p>Nothing relevant on this page at all.</p>");
        assert!(run(&html, &DIRECTIONS).is_none());
    }
}
