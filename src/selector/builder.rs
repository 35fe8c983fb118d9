//! Robust selector synthesis from a concrete element
//!
//! Given an element picked out of a document, build a selector that will
//! still find it after a redeploy: prefer ids and meaningful classes, skip
//! generated and utility tokens, and keep the ancestor path short.

use crate::selector::generated::{is_likely_generated, is_plain_identifier, is_utility_class};
use scraper::ElementRef;

/// Landmark tags whose classed form is unique enough to anchor a selector
const SEMANTIC_TAGS: &[&str] = &["article", "header", "footer", "nav", "main", "section", "aside"];

/// Containers that get a bare `.class` marker instead of `tag.class`
const GENERIC_TAGS: &[&str] = &["div", "span"];

/// Returns a short marker identifying `element` among its neighbours
///
/// In order of preference: a usable `#id`, the first stable class (as
/// `tag.class`, or `.class` for `div`/`span`), a positional
/// `tag:nth-of-type(n)` when same-tag siblings exist, or the bare tag.
pub fn stable_marker(element: ElementRef<'_>) -> String {
    let value = element.value();
    let tag = value.name();

    if let Some(id) = value.id() {
        if is_plain_identifier(id) && !is_likely_generated(id) {
            return format!("#{}", id);
        }
    }

    let stable_class = value
        .classes()
        .find(|class| is_plain_identifier(class) && !is_likely_generated(class) && !is_utility_class(class));

    if let Some(class) = stable_class {
        return if GENERIC_TAGS.contains(&tag) {
            format!(".{}", class)
        } else {
            format!("{}.{}", tag, class)
        };
    }

    let (position, total) = position_among_type(element);
    if total > 1 {
        return format!("{}:nth-of-type({})", tag, position);
    }

    tag.to_string()
}

/// 1-based position of `element` among same-tag siblings, and their count
fn position_among_type(element: ElementRef<'_>) -> (usize, usize) {
    let tag = element.value().name();
    let same_tag = |sibling: Option<ElementRef<'_>>| {
        sibling
            .map(|s| s.value().name() == tag)
            .unwrap_or(false)
    };

    let before = element
        .prev_siblings()
        .filter(|n| same_tag(ElementRef::wrap(*n)))
        .count();
    let after = element
        .next_siblings()
        .filter(|n| same_tag(ElementRef::wrap(*n)))
        .count();
    (before + 1, before + after + 1)
}

/// Returns true for markers that are unique enough to stop climbing at
///
/// # Examples
///
/// ```
/// use gleaner::selector::is_very_stable;
///
/// assert!(is_very_stable("#main-content"));
/// assert!(is_very_stable("article.post"));
/// assert!(!is_very_stable("div.container"));
/// assert!(!is_very_stable("nav"));
/// ```
pub fn is_very_stable(marker: &str) -> bool {
    if marker.starts_with('#') {
        return true;
    }

    match marker.split_once('.') {
        Some((tag, class)) => SEMANTIC_TAGS.contains(&tag) && !class.is_empty(),
        None => false,
    }
}

/// Builds a descendant-combinator selector from `element` up its ancestors
///
/// The walk stops at `root` (whose marker is included), at `body`/`html`,
/// or as soon as a very stable marker has been emitted. Bare `div`/`span`
/// ancestors are skipped so deep wrapper nesting collapses.
///
/// # Arguments
///
/// * `element` - The element the selector must match
/// * `root` - Optional ancestor to build the selector relative to
///
/// # Returns
///
/// A selector string such as `#main-content article.post h2.title`
pub fn build_robust_selector(element: ElementRef<'_>, root: Option<ElementRef<'_>>) -> String {
    let mut markers = Vec::new();
    let mut current = Some(element);
    let mut first = true;

    while let Some(el) = current {
        let tag = el.value().name();
        if tag == "body" || tag == "html" {
            break;
        }

        let is_root = root.map(|r| r.id() == el.id()).unwrap_or(false);
        let marker = stable_marker(el);

        let bare_wrapper = GENERIC_TAGS.contains(&marker.as_str());
        if first || is_root || !bare_wrapper {
            markers.push(marker.clone());
        }
        first = false;

        if is_root || is_very_stable(&marker) {
            break;
        }

        current = el.parent().and_then(ElementRef::wrap);
    }

    markers.reverse();
    markers.join(" ")
}
