//! E-commerce platform profile: Shopify

use super::{attr, score, text, FieldMapping};

pub(super) const SHOPIFY_HINTS: &[&str] = &[
    ".product-card",
    ".product-item",
    ".grid-product",
    ".collection-item",
];

pub(super) const SHOPIFY_FIELDS: &[FieldMapping] = &[
    (
        "title",
        &[
            text(".product-card__title"),
            text(".product-title"),
            text(".grid-product__title"),
        ],
    ),
    (
        "url",
        &[
            attr(".product-card__title a", "href"),
            attr(".product-link", "href"),
            attr("a.product-card", "href"),
        ],
    ),
    (
        "price",
        &[
            text(".product-price"),
            text(".price"),
            text(".grid-product__price"),
        ],
    ),
    (
        "image",
        &[
            attr(".product-card__image img", "src"),
            attr(".grid-product__image img", "src"),
        ],
    ),
];

pub(super) fn detect_shopify(html: &str, item_classes: Option<&str>) -> u8 {
    let mut total = 0;
    if html.contains("cdn.shopify.com") || html.contains("Shopify.theme") {
        total += 50;
    } else if html.to_ascii_lowercase().contains("shopify") {
        total += 30;
    }
    if html.contains("product-") {
        total += 20;
    }
    if html.contains("collection-") {
        total += 20;
    }
    let item_hit = item_classes
        .map(|c| c.contains("product-") || c.contains("grid-product"))
        .unwrap_or(false);
    if item_hit {
        total += 20;
    }
    score(total)
}
