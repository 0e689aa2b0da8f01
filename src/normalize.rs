use once_cell::sync::Lazy;
use regex::Regex;
use scraper::ElementRef;

// Pre-compiled regex for whitespace runs (compile once, use many times)
static WHITESPACE_RUN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\s{2,}").expect("Invalid whitespace regex pattern")
});

/// Elements whose text never counts as page content
const SKIPPED_TAGS: &[&str] = &["script", "style", "noscript", "template"];

/// Flatten an element's text: every descendant text node trimmed, empties
/// dropped, joined with one space, then whitespace runs collapsed
pub fn flatten_text(element: &ElementRef) -> String {
    let mut parts = Vec::new();
    collect_text(element, &mut parts);
    clean_text(&parts.join(" "))
}

fn collect_text<'a>(element: &ElementRef<'a>, parts: &mut Vec<&'a str>) {
    for child in element.children() {
        if let Some(child_el) = ElementRef::wrap(child) {
            if !SKIPPED_TAGS.contains(&child_el.value().name()) {
                collect_text(&child_el, parts);
            }
        } else if let Some(text) = child.value().as_text() {
            let trimmed = text.trim();
            if !trimmed.is_empty() {
                parts.push(trimmed);
            }
        }
    }
}

/// Collapse runs of 2+ whitespace characters into one space and trim
pub fn clean_text(text: &str) -> String {
    WHITESPACE_RUN_RE.replace_all(text.trim(), " ").to_string()
}

/// Case-insensitive whole-word matcher for a keyword phrase
pub fn word_regex(keyword: &str) -> Option<Regex> {
    Regex::new(&format!(r"(?i)\b{}\b", regex::escape(keyword))).ok()
}

/// Case-insensitive "starts with keyword, optional colon, then whitespace"
pub fn prefix_regex(keyword: &str) -> Option<Regex> {
    Regex::new(&format!(r"(?i)^\s*{}:?\s+", regex::escape(keyword))).ok()
}

/// Length in characters (not bytes)
pub fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Truncate for log output, safe on char boundaries
pub fn preview(text: &str, max_chars: usize) -> String {
    if char_len(text) <= max_chars {
        text.to_string()
    } else {
        format!("{}...", text.chars().take(max_chars).collect::<String>())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::{Html, Selector};

    #[test]
    fn test_flatten_text_joins_nodes() {
        let html = Html::parse_fragment("<div> Whey <b>Protein</b>\n\n  Isolate  </div>");
        let sel = Selector::parse("div").unwrap();
        let div = html.select(&sel).next().unwrap();
        assert_eq!(flatten_text(&div), "Whey Protein Isolate");
    }

    #[test]
    fn test_flatten_text_skips_scripts() {
        let html = Html::parse_fragment("<div>Vitamin C<script>var x = 1;</script> 500 mg</div>");
        let sel = Selector::parse("div").unwrap();
        let div = html.select(&sel).next().unwrap();
        assert_eq!(flatten_text(&div), "Vitamin C 500 mg");
    }

    #[test]
    fn test_clean_text_collapses_runs() {
        assert_eq!(clean_text("  a \t\n b  c "), "a b c");
        assert_eq!(clean_text("a\nb"), "a\nb");
    }

    #[test]
    fn test_word_regex_respects_boundaries() {
        let re = word_regex("usage").unwrap();
        assert!(re.is_match("Suggested Usage"));
        assert!(!re.is_match("usages"));
    }

    #[test]
    fn test_prefix_regex() {
        let re = prefix_regex("ingredients").unwrap();
        assert!(re.is_match("Ingredients: whey"));
        assert!(re.is_match("  INGREDIENTS whey"));
        assert!(!re.is_match("Other ingredients: rice flour"));
    }
}
