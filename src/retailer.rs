//! Retailer dispatch - per-site extraction rules tried ahead of the generic cascade
//!
//! Each retailer is a tag mapping to a static table of rules per field. Adding a
//! retailer is a data change: a new variant, a host pattern and its rule rows.

use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::warn;

use crate::normalize::{clean_text, flatten_text};
use crate::record::Field;

/// Known retail sites
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Retailer {
    Target,
    Amazon,
    Walmart,
    Gnc,
    VitaminShoppe,
    IHerb,
    Generic,
}

/// Host substrings in evaluation order; first match wins
const HOST_PATTERNS: &[(&str, Retailer)] = &[
    ("target.com", Retailer::Target),
    ("amazon.", Retailer::Amazon),
    ("walmart.com", Retailer::Walmart),
    ("gnc.com", Retailer::Gnc),
    ("vitaminshoppe.com", Retailer::VitaminShoppe),
    ("iherb.com", Retailer::IHerb),
];

impl Retailer {
    /// Classify a product URL by its host
    pub fn classify(url: &str) -> Retailer {
        let host = url::Url::parse(url)
            .ok()
            .and_then(|u| u.host_str().map(|h| h.to_lowercase()));
        let Some(host) = host else {
            return Retailer::Generic;
        };
        HOST_PATTERNS
            .iter()
            .find(|(pattern, _)| host.contains(pattern))
            .map(|(_, retailer)| *retailer)
            .unwrap_or(Retailer::Generic)
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Retailer::Target => "Target",
            Retailer::Amazon => "Amazon",
            Retailer::Walmart => "Walmart",
            Retailer::Gnc => "GNC",
            Retailer::VitaminShoppe => "The Vitamin Shoppe",
            Retailer::IHerb => "iHerb",
            Retailer::Generic => "Generic",
        }
    }

    /// Retailer-specific rules for a field, in the order they are tried
    pub fn rules(&self, field: Field) -> &'static [Rule] {
        use Field::*;
        use Retailer::*;

        match (self, field) {
            (Target, Brand) => &[Rule::Text("[data-test=\"product-brand\"]")],
            (Target, ProductName) => &[Rule::Text("[data-test=\"product-title\"]")],
            (Target, Ingredients) => &[Rule::Labeled {
                container: "[data-test=\"detailsTab\"] div.h-padding-h-default",
                label: "ingredients",
                value: None,
            }],
            (Target, Directions) => &[Rule::Labeled {
                container: "[data-test=\"detailsTab\"] div.h-padding-h-default",
                label: "directions",
                value: None,
            }],
            (Target, Warnings) => &[Rule::Labeled {
                container: "[data-test=\"detailsTab\"] div.h-padding-h-default",
                label: "warning",
                value: None,
            }],
            (Target, ImageUrl) => &[Rule::Attr {
                selector: "[data-test=\"product-image\"] img",
                attrs: &["srcset", "src"],
            }],
            (Target, IngredientImageUrl) => &[Rule::Attr {
                selector: "[data-test=\"image-gallery\"] img[alt*=\"Facts\"]",
                attrs: &["src"],
            }],

            (Amazon, Brand) => &[
                Rule::Labeled {
                    container: "tr.a-spacing-small",
                    label: "brand",
                    value: Some("td.a-span9"),
                },
                Rule::Text("#bylineInfo"),
            ],
            (Amazon, ProductName) => &[Rule::Text("#productTitle")],
            (Amazon, Ingredients) => &[
                Rule::Labeled {
                    container: "#productDetails li, #detailBullets_feature_div li, #detail-bullets li",
                    label: "ingredients",
                    value: None,
                },
                Rule::Labeled {
                    container: "#important-information .content",
                    label: "ingredients",
                    value: Some("p"),
                },
            ],
            (Amazon, Directions) => &[Rule::Labeled {
                container: "#important-information .content",
                label: "directions",
                value: Some("p"),
            }],
            (Amazon, Warnings) => &[Rule::Labeled {
                container: "#important-information .content",
                label: "safety information",
                value: Some("p"),
            }],
            (Amazon, ImageUrl) => &[Rule::Attr {
                selector: "#landingImage, #imgBlkFront",
                attrs: &["data-old-hires", "src"],
            }],

            (Walmart, Brand) => &[Rule::LabelSibling {
                label_selector: "div.specTable-label",
                label: "brand",
            }],
            (Walmart, ProductName) => &[
                Rule::Text("h1.prod-ProductTitle"),
                Rule::Text("h1[itemprop=\"name\"]"),
            ],
            (Walmart, CountryOfOrigin) => &[Rule::LabelSibling {
                label_selector: "div.specTable-label",
                label: "country of origin",
            }],
            (Walmart, ImageUrl) => &[Rule::Attr {
                selector: "[data-testid=\"hero-image-container\"] img",
                attrs: &["src"],
            }],

            (Gnc, ProductName) => &[Rule::Text("h1.product-name")],
            (Gnc, ImageUrl) => &[Rule::Attr {
                selector: "img.product-image",
                attrs: &["src"],
            }],

            (VitaminShoppe, ProductName) => &[Rule::Text("h1.product-name")],
            (VitaminShoppe, ImageUrl) => &[Rule::Attr {
                selector: "img.product-image",
                attrs: &["src"],
            }],

            (IHerb, Brand) => &[Rule::Text("#brand a span"), Rule::Text("#brand a")],
            (IHerb, ProductName) => &[Rule::Text("h1#name")],
            (IHerb, Ingredients) => &[Rule::Text(".prodOverviewIngred")],
            (IHerb, Warnings) => &[Rule::Text(".prodOverviewWarn")],
            (IHerb, ImageUrl) => &[
                Rule::Attr {
                    selector: "#iherb-product-image",
                    attrs: &["src"],
                },
                Rule::Attr {
                    selector: "div.product-inner img",
                    attrs: &["src"],
                },
            ],

            _ => &[],
        }
    }
}

impl fmt::Display for Retailer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// One site-specific selection rule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    /// Text of the first element matching the selector (`content` for meta tags)
    Text(&'static str),
    /// First non-empty attribute, in order, on the first matching element;
    /// `srcset` resolves to its largest (last) entry
    Attr {
        selector: &'static str,
        attrs: &'static [&'static str],
    },
    /// Container whose text mentions `label`; the value is the text of `value`
    /// inside it, or else the container text after its first ':'
    Labeled {
        container: &'static str,
        label: &'static str,
        value: Option<&'static str>,
    },
    /// Label element mentioning `label`; the value is its next element sibling
    LabelSibling {
        label_selector: &'static str,
        label: &'static str,
    },
}

impl Rule {
    /// Evaluate the rule; a rule that cannot match yields None
    pub fn apply(&self, document: &Html) -> Option<String> {
        let value = match *self {
            Rule::Text(selector) => {
                let sel = parse_selector(selector)?;
                let el = document.select(&sel).next()?;
                element_value(&el)
            }
            Rule::Attr { selector, attrs } => {
                let sel = parse_selector(selector)?;
                let el = document.select(&sel).next()?;
                attrs.iter().find_map(|attr| {
                    let raw = el.value().attr(attr)?;
                    if *attr == "srcset" {
                        largest_srcset_entry(raw)
                    } else {
                        Some(raw.trim().to_string())
                    }
                })
            }
            Rule::Labeled { container, label, value } => {
                let sel = parse_selector(container)?;
                document
                    .select(&sel)
                    .filter(|el| flatten_text(el).to_lowercase().contains(label))
                    .find_map(|el| match value {
                        Some(value_selector) => {
                            let vsel = parse_selector(value_selector)?;
                            el.select(&vsel).next().map(|v| flatten_text(&v))
                        }
                        None => Some(after_colon(&flatten_text(&el))),
                    })
            }
            Rule::LabelSibling { label_selector, label } => {
                let sel = parse_selector(label_selector)?;
                document
                    .select(&sel)
                    .filter(|el| flatten_text(el).to_lowercase().contains(label))
                    .find_map(|el| {
                        el.next_siblings()
                            .filter_map(ElementRef::wrap)
                            .next()
                            .map(|v| flatten_text(&v))
                    })
            }
        };
        value.map(|v| clean_text(&v)).filter(|v| !v.is_empty())
    }
}

fn parse_selector(selector: &str) -> Option<Selector> {
    match Selector::parse(selector) {
        Ok(sel) => Some(sel),
        Err(e) => {
            warn!(selector, "invalid retailer selector: {:?}", e);
            None
        }
    }
}

/// Text of an element, or its `content` attribute for <meta>
pub fn element_value(el: &ElementRef) -> Option<String> {
    if el.value().name() == "meta" {
        el.value().attr("content").map(str::to_string)
    } else {
        Some(flatten_text(el))
    }
}

/// Text after the first ':' if there is one
fn after_colon(text: &str) -> String {
    match text.split_once(':') {
        Some((_, rest)) if !rest.trim().is_empty() => rest.trim().to_string(),
        _ => text.trim().to_string(),
    }
}

/// URL of the last `srcset` candidate (retailers list them smallest first)
pub fn largest_srcset_entry(srcset: &str) -> Option<String> {
    srcset
        .split(',')
        .filter_map(|entry| entry.split_whitespace().next())
        .filter(|url| !url.is_empty())
        .last()
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_known_hosts() {
        assert_eq!(Retailer::classify("https://www.target.com/p/vitamin-d/-/A-123"), Retailer::Target);
        assert_eq!(Retailer::classify("https://www.amazon.com/dp/B000123"), Retailer::Amazon);
        assert_eq!(Retailer::classify("https://www.walmart.com/ip/456"), Retailer::Walmart);
        assert_eq!(Retailer::classify("https://www.gnc.com/protein/789.html"), Retailer::Gnc);
        assert_eq!(Retailer::classify("https://www.vitaminshoppe.com/p/x"), Retailer::VitaminShoppe);
        assert_eq!(Retailer::classify("https://www.iherb.com/pr/now-foods/1"), Retailer::IHerb);
    }

    #[test]
    fn test_classify_uses_host_only() {
        assert_eq!(
            Retailer::classify("https://shop.example.com/compare?vs=amazon.com"),
            Retailer::Generic
        );
        assert_eq!(Retailer::classify("not a url"), Retailer::Generic);
    }

    #[test]
    fn test_generic_has_no_rules() {
        for field in Field::CASCADE {
            assert!(Retailer::Generic.rules(field).is_empty());
        }
    }

    #[test]
    fn test_all_rule_selectors_parse() {
        let retailers = [
            Retailer::Target,
            Retailer::Amazon,
            Retailer::Walmart,
            Retailer::Gnc,
            Retailer::VitaminShoppe,
            Retailer::IHerb,
        ];
        let fields = [
            Field::Brand,
            Field::ProductName,
            Field::Ingredients,
            Field::Directions,
            Field::Warnings,
            Field::ServingSize,
            Field::CountryOfOrigin,
            Field::ImageUrl,
            Field::IngredientImageUrl,
        ];
        for retailer in retailers {
            for field in fields {
                for rule in retailer.rules(field) {
                    let selectors: Vec<&str> = match *rule {
                        Rule::Text(s) => vec![s],
                        Rule::Attr { selector, .. } => vec![selector],
                        Rule::Labeled { container, value, .. } => {
                            value.into_iter().chain(std::iter::once(container)).collect()
                        }
                        Rule::LabelSibling { label_selector, .. } => vec![label_selector],
                    };
                    for s in selectors {
                        assert!(Selector::parse(s).is_ok(), "bad selector {}", s);
                    }
                }
            }
        }
    }

    #[test]
    fn test_labeled_rule_with_value_selector() {
        let html = Html::parse_document(
            r#"<table><tr class="a-spacing-small"><td class="a-span3">Brand</td><td class="a-span9">Optimum Nutrition</td></tr></table>"#,
        );
        let rule = Retailer::Amazon.rules(Field::Brand)[0];
        assert_eq!(rule.apply(&html), Some("Optimum Nutrition".to_string()));
    }

    #[test]
    fn test_labeled_rule_splits_colon() {
        let html = Html::parse_document(
            r#"<div data-test="detailsTab"><div class="h-padding-h-default">Ingredients: Vitamin D3, olive oil, gelatin</div></div>"#,
        );
        let rule = Retailer::Target.rules(Field::Ingredients)[0];
        assert_eq!(rule.apply(&html), Some("Vitamin D3, olive oil, gelatin".to_string()));
    }

    #[test]
    fn test_label_sibling_rule() {
        let html = Html::parse_document(
            r#"<div class="specTable-label">Brand</div><div class="specTable-value">Nature Made</div>"#,
        );
        let rule = Retailer::Walmart.rules(Field::Brand)[0];
        assert_eq!(rule.apply(&html), Some("Nature Made".to_string()));
    }

    #[test]
    fn test_attr_rule_prefers_hires() {
        let html = Html::parse_document(
            r#"<img id="landingImage" src="/small.jpg" data-old-hires="https://m.media-amazon.com/big.jpg">"#,
        );
        let rule = Retailer::Amazon.rules(Field::ImageUrl)[0];
        assert_eq!(rule.apply(&html), Some("https://m.media-amazon.com/big.jpg".to_string()));
    }

    #[test]
    fn test_largest_srcset_entry() {
        assert_eq!(
            largest_srcset_entry("a.jpg 100w, b.jpg 400w, c.jpg 800w"),
            Some("c.jpg".to_string())
        );
        assert_eq!(largest_srcset_entry(""), None);
    }
}
