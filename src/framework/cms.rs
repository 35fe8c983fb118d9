//! Content-management-system profiles: Drupal Views and WordPress

use super::{attr, score, text, FieldMapping};

pub(super) const DRUPAL_HINTS: &[&str] = &[
    ".views-row",
    "tr.views-row-first",
    "tr.even",
    "tr.odd",
    "tbody > tr",
    ".view-content .views-row",
];

pub(super) const DRUPAL_FIELDS: &[FieldMapping] = &[
    (
        "title",
        &[
            text(".views-field-title"),
            text(".views-field-name"),
            text(".views-field-field-title"),
            text(".views-field-field-product-description"),
            text(".field-content"),
        ],
    ),
    (
        "url",
        &[
            attr(".views-field-title a", "href"),
            attr(".views-field-name a", "href"),
            attr(".views-field-path a", "href"),
        ],
    ),
    (
        "date",
        &[
            text(".views-field-created"),
            text(".views-field-changed"),
            text(".views-field-field-date"),
            text(".views-field-post-date"),
        ],
    ),
    (
        "author",
        &[
            text(".views-field-name"),
            text(".views-field-uid"),
            text(".views-field-author"),
            text(".views-field-field-author"),
            text(".views-field-company-name"),
        ],
    ),
    (
        "body",
        &[
            text(".views-field-body"),
            text(".views-field-field-body"),
            text(".views-field-description"),
        ],
    ),
    (
        "image",
        &[
            attr(".views-field-field-image img", "src"),
            attr(".views-field-field-photo img", "src"),
        ],
    ),
];

pub(super) fn detect_drupal(html: &str, item_classes: Option<&str>) -> u8 {
    let mut total = 0;
    if html.contains("views-row") {
        total += 50;
    }
    if html.contains("views-field") {
        total += 30;
    }
    if html.contains("view-content") {
        total += 10;
    }
    if html.contains("Drupal.settings") || html.contains("drupal-settings-json") {
        total += 20;
    }
    if item_classes.map(|c| c.contains("views-row")).unwrap_or(false) {
        total += 40;
    }
    score(total)
}

pub(super) const WORDPRESS_HINTS: &[&str] = &[
    "article.post",
    ".post",
    ".hentry",
    "article.hentry",
    ".entry",
    ".type-post",
];

pub(super) const WORDPRESS_FIELDS: &[FieldMapping] = &[
    (
        "title",
        &[
            text(".entry-title"),
            text(".post-title"),
            text("h2.entry-title"),
            text("h1.entry-title"),
        ],
    ),
    (
        "url",
        &[attr(".entry-title a", "href"), attr(".post-title a", "href")],
    ),
    (
        "date",
        &[
            attr("time.entry-date", "datetime"),
            text(".entry-date"),
            text(".post-date"),
            text(".published"),
        ],
    ),
    (
        "author",
        &[
            text(".author"),
            text(".entry-author"),
            text(".post-author"),
            text(".by-author"),
        ],
    ),
    (
        "body",
        &[
            text(".entry-content"),
            text(".entry-summary"),
            text(".post-content"),
        ],
    ),
    (
        "image",
        &[
            attr(".post-thumbnail img", "src"),
            attr(".entry-image img", "src"),
        ],
    ),
];

pub(super) fn detect_wordpress(html: &str, item_classes: Option<&str>) -> u8 {
    let mut total = 0;
    if html.contains("wp-content") || html.contains("wp-includes") {
        total += 40;
    }
    if html.contains("hentry") {
        total += 25;
    }
    if html.contains("entry-") {
        total += 15;
    }
    if html.contains("post-") {
        total += 10;
    }
    let item_hit = item_classes
        .map(|c| ["post", "entry", "hentry", "article"].iter().any(|k| c.contains(k)))
        .unwrap_or(false);
    if item_hit {
        total += 20;
    }
    score(total)
}
