use crate::framework::{
    detect_all_frameworks, detect_framework, extract_og_metadata, FieldCandidate,
    FrameworkProfile, ProfileCategory,
};
use crate::selector::build_robust_selector;
use scraper::{Html, Selector};
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProfileScore {
    pub profile: &'static str,
    pub category: ProfileCategory,
    pub confidence: u8,
}

/// What a page looks like to the profile engine, as a starting point for a schema
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PageInspection {
    /// Every profile with a non-zero score, highest first
    pub frameworks: Vec<ProfileScore>,

    /// Best profile at or above the detection floor, scored with a sample item
    pub detected: Option<&'static str>,

    /// Profile hint that matched repeating items
    pub item_selector: Option<&'static str>,
    pub item_count: usize,

    /// Structural selector for the first matched item
    pub robust_item_selector: Option<String>,

    /// Field type to the first candidate that matched inside the sample item
    pub fields: BTreeMap<String, String>,

    pub opengraph: BTreeMap<String, String>,
}

/// Scores `html` against every profile and suggests item and field selectors
pub fn inspect_page(html: &str) -> PageInspection {
    let ranked = detect_all_frameworks(html, None);
    let document = Html::parse_document(html);

    let mut inspection = PageInspection {
        frameworks: ranked
            .iter()
            .map(|(profile, confidence)| ProfileScore {
                profile: profile.name(),
                category: profile.category(),
                confidence: *confidence,
            })
            .collect(),
        opengraph: extract_og_metadata(html),
        ..PageInspection::default()
    };

    // ranked profiles first, then the rest, so a zero-score hint can still match
    let order = ranked
        .iter()
        .map(|(profile, _)| *profile)
        .chain(FrameworkProfile::ALL);
    let Some((profile, hint, count)) = order
        .into_iter()
        .find_map(|profile| profile.match_item_hint(&document).map(|(h, c)| (profile, h, c)))
    else {
        inspection.detected = detect_framework(html, None).map(|(p, _)| p.name());
        return inspection;
    };

    inspection.item_selector = Some(hint);
    inspection.item_count = count;

    let item = Selector::parse(hint)
        .ok()
        .and_then(|selector| document.select(&selector).next());
    let Some(item) = item else {
        return inspection;
    };

    inspection.robust_item_selector = Some(build_robust_selector(item, None));
    let detected = detect_framework(html, Some(item)).map(|(p, _)| p);
    inspection.detected = detected.map(|p| p.name());

    let source = detected.unwrap_or(profile);
    for (field_type, _) in source.field_mappings() {
        if let Some(candidate) = source.generate_field_selector(item, field_type) {
            inspection
                .fields
                .insert(field_type.to_string(), FieldCandidate::to_string(&candidate));
        }
    }

    inspection
}

#[cfg(test)]
mod tests {
    use super::*;

    const WORDPRESS_PAGE: &str = r#"<html><head>
        <meta property="og:title" content="Blog">
        <link rel="stylesheet" href="/wp-content/themes/x/style.css"></head><body>
        <main id="main">
        <article class="post hentry"><h2 class="entry-title"><a href="/p/1">Hello</a></h2>
        <div class="entry-content">Body</div></article>
        <article class="post hentry"><h2 class="entry-title"><a href="/p/2">Again</a></h2>
        <div class="entry-content">More</div></article>
        </main>
    </body></html>"#;

    #[test]
    fn test_inspect_wordpress_listing() {
        let inspection = inspect_page(WORDPRESS_PAGE);
        assert_eq!(inspection.detected, Some("wordpress"));
        assert_eq!(inspection.item_count, 2);
        assert!(inspection.item_selector.is_some());
        assert!(inspection.robust_item_selector.is_some());
        assert!(!inspection.fields.is_empty());
        assert_eq!(inspection.opengraph.get("title").map(String::as_str), Some("Blog"));
        assert_eq!(inspection.frameworks[0].profile, "wordpress");
    }

    #[test]
    fn test_inspect_plain_page() {
        let inspection = inspect_page("<html><body><p>hello</p></body></html>");
        assert!(inspection.frameworks.is_empty());
        assert_eq!(inspection.detected, None);
        assert_eq!(inspection.item_selector, None);
        assert!(inspection.fields.is_empty());
    }
}
