//! Metadata vocabularies: schema.org microdata and OpenGraph

use super::{attr, score, text, FieldMapping};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use std::collections::{BTreeMap, BTreeSet};

pub(super) const SCHEMA_ORG_HINTS: &[&str] = &[
    "[itemscope]",
    "[itemscope][itemtype]",
    "[itemtype*='schema.org/Article']",
    "[itemtype*='schema.org/Product']",
    "[itemtype*='schema.org/Event']",
    "[itemtype*='schema.org/BlogPosting']",
    "[itemtype*='schema.org/NewsArticle']",
    "article[itemscope]",
    "div[itemscope]",
];

pub(super) const SCHEMA_ORG_FIELDS: &[FieldMapping] = &[
    (
        "title",
        &[
            text("[itemprop='headline']"),
            text("[itemprop='name']"),
            text("[itemprop='title']"),
            text("h1[itemprop='headline']"),
            text("h2[itemprop='name']"),
        ],
    ),
    (
        "url",
        &[
            attr("[itemprop='url']", "href"),
            attr("a[itemprop='url']", "href"),
            attr("[itemprop='mainEntityOfPage']", "href"),
            attr("link[itemprop='url']", "href"),
        ],
    ),
    (
        "link",
        &[
            attr("[itemprop='url']", "href"),
            attr("a[itemprop='url']", "href"),
            attr("[itemprop='mainEntityOfPage']", "href"),
        ],
    ),
    (
        "date",
        &[
            attr("time[itemprop='datePublished']", "datetime"),
            text("[itemprop='datePublished']"),
            text("[itemprop='dateCreated']"),
            text("[itemprop='startDate']"),
            text("[itemprop='dateModified']"),
        ],
    ),
    (
        "description",
        &[
            text("[itemprop='description']"),
            text("[itemprop='articleBody']"),
            text("p[itemprop='description']"),
            text("div[itemprop='description']"),
            text("[itemprop='text']"),
        ],
    ),
    (
        "author",
        &[
            text("[itemprop='author'] [itemprop='name']"),
            text("[itemprop='author']"),
            text("span[itemprop='author']"),
            text("a[itemprop='author']"),
            text("[itemprop='creator']"),
        ],
    ),
    (
        "image",
        &[
            attr("[itemprop='image']", "src"),
            attr("img[itemprop='image']", "src"),
            attr("[itemprop='thumbnailUrl']", "src"),
            attr("[itemprop='image']", "content"),
            attr("meta[itemprop='image']", "content"),
        ],
    ),
    (
        "price",
        &[
            attr("meta[itemprop='price']", "content"),
            attr("[itemprop='price']", "content"),
            text("[itemprop='price']"),
            text("span[itemprop='price']"),
            text("[itemprop='lowPrice']"),
            text("[itemprop='highPrice']"),
        ],
    ),
    (
        "category",
        &[
            text("[itemprop='category']"),
            text("[itemprop='genre']"),
            text("a[itemprop='category']"),
            text("[itemprop='articleSection']"),
        ],
    ),
    (
        "rating",
        &[
            attr("meta[itemprop='ratingValue']", "content"),
            attr("[itemprop='ratingValue']", "content"),
            text("[itemprop='ratingValue']"),
            text("[itemprop='reviewRating'] [itemprop='ratingValue']"),
        ],
    ),
    (
        "publisher",
        &[
            text("[itemprop='publisher'] [itemprop='name']"),
            text("[itemprop='publisher']"),
            text("span[itemprop='publisher']"),
        ],
    ),
    (
        "location",
        &[
            text("[itemprop='location'] [itemprop='name']"),
            text("[itemprop='location']"),
            text("[itemprop='address']"),
            text("[itemprop='contentLocation']"),
        ],
    ),
];

/// Weighted markers of schema.org markup
const SCHEMA_ORG_MARKERS: &[(&str, u32)] = &[
    ("itemscope", 40),
    ("itemprop=", 35),
    ("itemtype=", 30),
    ("type=\"application/ld+json\"", 25),
    ("schema.org/Article", 15),
    ("schema.org/Product", 15),
    ("schema.org/Event", 10),
    ("schema.org/Recipe", 10),
    ("schema.org/Person", 10),
];

pub(super) fn detect_schema_org(html: &str, _item_classes: Option<&str>) -> u8 {
    let total = SCHEMA_ORG_MARKERS
        .iter()
        .filter(|(marker, _)| html.contains(marker))
        .map(|(_, weight)| weight)
        .sum();
    score(total)
}

pub(super) const OPENGRAPH_HINTS: &[&str] = &["article", "main", "[role='main']"];

pub(super) const OPENGRAPH_FIELDS: &[FieldMapping] = &[
    ("title", &[attr("meta[property='og:title']", "content")]),
    ("url", &[attr("meta[property='og:url']", "content")]),
    ("link", &[attr("meta[property='og:url']", "content")]),
    (
        "description",
        &[attr("meta[property='og:description']", "content")],
    ),
    ("image", &[attr("meta[property='og:image']", "content")]),
    (
        "date",
        &[
            attr("meta[property='article:published_time']", "content"),
            attr("meta[property='article:modified_time']", "content"),
        ],
    ),
    ("author", &[attr("meta[property='article:author']", "content")]),
    ("type", &[attr("meta[property='og:type']", "content")]),
];

static OG_PROPERTY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"property\s*=\s*["']og:([A-Za-z_:]+)["']"#)
        .expect("OpenGraph property pattern is hardcoded and valid")
});

/// Bonus points for the OpenGraph tags that make a page useful on its own
const OPENGRAPH_BONUS: &[(&str, u32)] = &[
    ("title", 10),
    ("description", 5),
    ("image", 5),
    ("url", 5),
    ("type", 5),
];

/// Scores by distinct `og:` tags, with bonuses for the common ones
pub(super) fn detect_opengraph(html: &str, _item_classes: Option<&str>) -> u8 {
    let tags: BTreeSet<&str> = OG_PROPERTY
        .captures_iter(html)
        .filter_map(|c| c.get(1).map(|m| m.as_str()))
        .collect();

    let base = match tags.len() {
        0 => return 0,
        1..=2 => 15,
        3..=4 => 30,
        _ => 50,
    };
    let bonus: u32 = OPENGRAPH_BONUS
        .iter()
        .filter(|(tag, _)| tags.contains(tag))
        .map(|(_, points)| points)
        .sum();
    score(base + bonus)
}

/// Collects `og:*` and `article:*` meta properties with the prefix removed
///
/// Empty `content` values are skipped. When two properties share a name
/// after the prefix is removed, the first one in document order wins.
pub fn extract_og_metadata(html: &str) -> BTreeMap<String, String> {
    let mut metadata = BTreeMap::new();
    if html.trim().is_empty() {
        return metadata;
    }

    let document = Html::parse_document(html);
    let meta = match Selector::parse("meta[property]") {
        Ok(selector) => selector,
        Err(_) => return metadata,
    };

    for element in document.select(&meta) {
        let property = element.value().attr("property").unwrap_or_default();
        let key = match property
            .strip_prefix("og:")
            .or_else(|| property.strip_prefix("article:"))
        {
            Some(key) if !key.is_empty() => key,
            _ => continue,
        };
        let content = element.value().attr("content").unwrap_or_default().trim();
        if content.is_empty() {
            continue;
        }
        metadata
            .entry(key.to_string())
            .or_insert_with(|| content.to_string());
    }

    metadata
}
