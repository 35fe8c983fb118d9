//! Framework and metadata-vocabulary profiles
//!
//! A profile recognizes a family of markup (a CMS, a CSS framework, an
//! e-commerce platform, or an embedded metadata vocabulary), scores how
//! strongly a page looks like it, and knows the selectors that usually
//! hold list items and common fields on such pages.

mod cms;
mod commerce;
mod css;
mod metadata;
mod report;

pub use metadata::extract_og_metadata;
pub use report::{inspect_page, PageInspection, ProfileScore};

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;

/// Minimum score for [`detect_framework`] to report a profile
pub const DETECTION_FLOOR: u8 = 40;

/// A candidate selector for one field, optionally reading an attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FieldCandidate {
    pub selector: &'static str,
    pub attribute: Option<&'static str>,
}

impl fmt::Display for FieldCandidate {
    /// Renders as `selector` or `selector::attr(name)`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.attribute {
            Some(attribute) => write!(f, "{}::attr({})", self.selector, attribute),
            None => write!(f, "{}", self.selector),
        }
    }
}

/// Field type paired with its candidates in priority order
pub type FieldMapping = (&'static str, &'static [FieldCandidate]);

const fn text(selector: &'static str) -> FieldCandidate {
    FieldCandidate {
        selector,
        attribute: None,
    }
}

const fn attr(selector: &'static str, attribute: &'static str) -> FieldCandidate {
    FieldCandidate {
        selector,
        attribute: Some(attribute),
    }
}

fn score(total: u32) -> u8 {
    total.min(100) as u8
}

static CLASS_ATTR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"class\s*=\s*["']([^"']*)["']"#).expect("class attribute pattern is hardcoded and valid")
});

/// All distinct class tokens found in `class` attributes of raw markup
fn class_tokens(html: &str) -> HashSet<String> {
    CLASS_ATTR
        .captures_iter(html)
        .filter_map(|c| c.get(1))
        .flat_map(|m| m.as_str().split_whitespace().map(str::to_string).collect::<Vec<_>>())
        .collect()
}

/// Broad family a profile belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfileCategory {
    Cms,
    CssFramework,
    Ecommerce,
    Metadata,
}

/// Known markup families
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FrameworkProfile {
    SchemaOrg,
    DrupalViews,
    WordPress,
    Shopify,
    Bootstrap,
    Tailwind,
    OpenGraph,
}

impl FrameworkProfile {
    /// Every profile, in tie-breaking order
    pub const ALL: [FrameworkProfile; 7] = [
        FrameworkProfile::SchemaOrg,
        FrameworkProfile::DrupalViews,
        FrameworkProfile::WordPress,
        FrameworkProfile::Shopify,
        FrameworkProfile::Bootstrap,
        FrameworkProfile::Tailwind,
        FrameworkProfile::OpenGraph,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            FrameworkProfile::SchemaOrg => "schema_org",
            FrameworkProfile::DrupalViews => "drupal_views",
            FrameworkProfile::WordPress => "wordpress",
            FrameworkProfile::Shopify => "shopify",
            FrameworkProfile::Bootstrap => "bootstrap",
            FrameworkProfile::Tailwind => "tailwind",
            FrameworkProfile::OpenGraph => "opengraph",
        }
    }

    pub fn category(&self) -> ProfileCategory {
        match self {
            FrameworkProfile::DrupalViews | FrameworkProfile::WordPress => ProfileCategory::Cms,
            FrameworkProfile::Bootstrap | FrameworkProfile::Tailwind => ProfileCategory::CssFramework,
            FrameworkProfile::Shopify => ProfileCategory::Ecommerce,
            FrameworkProfile::SchemaOrg | FrameworkProfile::OpenGraph => ProfileCategory::Metadata,
        }
    }

    /// Scores how strongly `html` (and optionally a sample item) matches
    ///
    /// # Arguments
    ///
    /// * `html` - Raw page markup
    /// * `item` - An element believed to be one list item, if known
    ///
    /// # Returns
    ///
    /// A confidence between 0 and 100
    pub fn detect(&self, html: &str, item: Option<ElementRef<'_>>) -> u8 {
        let classes = item.map(|el| el.value().classes().collect::<Vec<_>>().join(" "));
        let classes = classes.as_deref();
        match self {
            FrameworkProfile::SchemaOrg => metadata::detect_schema_org(html, classes),
            FrameworkProfile::DrupalViews => cms::detect_drupal(html, classes),
            FrameworkProfile::WordPress => cms::detect_wordpress(html, classes),
            FrameworkProfile::Shopify => commerce::detect_shopify(html, classes),
            FrameworkProfile::Bootstrap => css::detect_bootstrap(html, classes),
            FrameworkProfile::Tailwind => css::detect_tailwind(html, classes),
            FrameworkProfile::OpenGraph => metadata::detect_opengraph(html, classes),
        }
    }

    /// Selectors that typically match one list item on such pages
    pub fn item_selector_hints(&self) -> &'static [&'static str] {
        match self {
            FrameworkProfile::SchemaOrg => metadata::SCHEMA_ORG_HINTS,
            FrameworkProfile::DrupalViews => cms::DRUPAL_HINTS,
            FrameworkProfile::WordPress => cms::WORDPRESS_HINTS,
            FrameworkProfile::Shopify => commerce::SHOPIFY_HINTS,
            FrameworkProfile::Bootstrap => css::BOOTSTRAP_HINTS,
            FrameworkProfile::Tailwind => css::TAILWIND_HINTS,
            FrameworkProfile::OpenGraph => metadata::OPENGRAPH_HINTS,
        }
    }

    /// Field types this profile knows, each with candidates in priority order
    pub fn field_mappings(&self) -> &'static [FieldMapping] {
        match self {
            FrameworkProfile::SchemaOrg => metadata::SCHEMA_ORG_FIELDS,
            FrameworkProfile::DrupalViews => cms::DRUPAL_FIELDS,
            FrameworkProfile::WordPress => cms::WORDPRESS_FIELDS,
            FrameworkProfile::Shopify => commerce::SHOPIFY_FIELDS,
            FrameworkProfile::Bootstrap => css::BOOTSTRAP_FIELDS,
            FrameworkProfile::Tailwind => css::TAILWIND_FIELDS,
            FrameworkProfile::OpenGraph => metadata::OPENGRAPH_FIELDS,
        }
    }

    /// Candidates for one field type, empty when the profile has none
    pub fn candidates_for(&self, field_type: &str) -> &'static [FieldCandidate] {
        self.field_mappings()
            .iter()
            .find(|(name, _)| *name == field_type)
            .map(|(_, candidates)| *candidates)
            .unwrap_or(&[])
    }

    /// Picks the first candidate for `field_type` that matches inside `item`
    pub fn generate_field_selector(&self, item: ElementRef<'_>, field_type: &str) -> Option<FieldCandidate> {
        self.candidates_for(field_type).iter().copied().find(|candidate| {
            let selector = match Selector::parse(candidate.selector) {
                Ok(selector) => selector,
                Err(_) => return false,
            };
            item.select(&selector).any(|el| match candidate.attribute {
                Some(attribute) => el.value().attr(attribute).is_some(),
                None => true,
            })
        })
    }

    /// First item hint that matches at least two elements in `document`
    ///
    /// Returns the hint together with its match count.
    pub fn match_item_hint(&self, document: &Html) -> Option<(&'static str, usize)> {
        self.item_selector_hints().iter().find_map(|hint| {
            let selector = Selector::parse(hint).ok()?;
            let count = document.select(&selector).count();
            (count >= 2).then_some((*hint, count))
        })
    }
}

impl fmt::Display for FrameworkProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// The best-scoring profile, if any clears [`DETECTION_FLOOR`]
///
/// Ties go to the profile listed first in [`FrameworkProfile::ALL`].
pub fn detect_framework(html: &str, item: Option<ElementRef<'_>>) -> Option<(FrameworkProfile, u8)> {
    let mut best: Option<(FrameworkProfile, u8)> = None;
    for profile in FrameworkProfile::ALL {
        let confidence = profile.detect(html, item);
        if confidence < DETECTION_FLOOR {
            continue;
        }
        if best.map(|(_, b)| confidence > b).unwrap_or(true) {
            best = Some((profile, confidence));
        }
    }
    if let Some((profile, confidence)) = best {
        tracing::debug!("Detected framework {} ({}%)", profile, confidence);
    }
    best
}

/// Every profile with a non-zero score, highest first
pub fn detect_all_frameworks(html: &str, item: Option<ElementRef<'_>>) -> Vec<(FrameworkProfile, u8)> {
    let mut scored: Vec<(FrameworkProfile, u8)> = FrameworkProfile::ALL
        .iter()
        .map(|profile| (*profile, profile.detect(html, item)))
        .filter(|(_, confidence)| *confidence > 0)
        .collect();
    // stable sort keeps ALL order among equal scores
    scored.sort_by(|a, b| b.1.cmp(&a.1));
    scored
}
