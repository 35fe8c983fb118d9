//! CSS framework profiles: Bootstrap and Tailwind

use super::{attr, class_tokens, score, text, FieldMapping};
use std::collections::HashSet;

pub(super) const BOOTSTRAP_HINTS: &[&str] = &[".card", ".list-group-item", ".media", ".row .col"];

pub(super) const BOOTSTRAP_FIELDS: &[FieldMapping] = &[
    (
        "title",
        &[
            text(".card-title"),
            text(".media-heading"),
            text("h5.card-title"),
        ],
    ),
    (
        "url",
        &[attr(".card-title a", "href"), attr(".card-link", "href")],
    ),
    ("date", &[text(".card-subtitle"), text(".text-muted")]),
    (
        "body",
        &[text(".card-text"), text(".card-body"), text(".media-body")],
    ),
    (
        "image",
        &[attr(".card-img-top", "src"), attr(".media-object", "src")],
    ),
];

pub(super) fn detect_bootstrap(html: &str, item_classes: Option<&str>) -> u8 {
    let tokens = class_tokens(html);
    let mut total = 0;
    if tokens.contains("list-group-item") {
        total += 40;
    }
    if tokens.contains("card-body") || tokens.contains("card-title") {
        total += 30;
    }
    if tokens.contains("card") {
        total += 15;
    }
    if tokens.contains("media-body") {
        total += 20;
    }
    if tokens
        .iter()
        .any(|t| t.starts_with("col-md-") || t.starts_with("col-lg-") || t.starts_with("col-sm-"))
    {
        total += 20;
    }
    if html.contains("bootstrap.min.css") || html.contains("bootstrap.bundle") {
        total += 30;
    }
    let item_hit = item_classes
        .map(|c| ["card", "list-group-item", "media"].iter().any(|k| c.contains(k)))
        .unwrap_or(false);
    if item_hit {
        total += 30;
    }
    score(total)
}

pub(super) const TAILWIND_HINTS: &[&str] = &["article", "li", "div[class*='flex']", "div[class*='grid']"];

/// Tailwind markup is semantic HTML plus utilities; there is no field vocabulary
pub(super) const TAILWIND_FIELDS: &[FieldMapping] = &[];

/// Utility families counted towards the Tailwind score
const TAILWIND_FAMILIES: &[&str] = &[
    "flex", "grid", "space-y-", "gap-", "p-", "m-", "text-", "bg-", "rounded", "shadow",
];

/// Scores by how many distinct utility families appear in class attributes
///
/// These tokens are generic, so fewer than five families score low.
pub(super) fn detect_tailwind(html: &str, _item_classes: Option<&str>) -> u8 {
    let tokens = class_tokens(html);
    let families: HashSet<&str> = tokens
        .iter()
        .flat_map(|token| {
            let base = token.rsplit(':').next().unwrap_or(token);
            TAILWIND_FAMILIES
                .iter()
                .copied()
                .filter(move |family| base.starts_with(family))
        })
        .collect();

    let hits = families.len() as u32;
    if hits >= 5 {
        score(hits * 10)
    } else {
        score(hits * 5)
    }
}
