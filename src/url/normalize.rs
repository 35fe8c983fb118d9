use url::Url;

/// Resolves an `href` against the page it appeared on
///
/// Returns `None` for links that cannot be followed:
/// - empty or fragment-only hrefs
/// - `javascript:`, `mailto:`, `tel:`, and `data:` schemes
/// - anything that does not resolve to HTTP(S)
pub fn resolve_link(href: &str, base_url: &Url) -> Option<Url> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lower = href.to_ascii_lowercase();
    if ["javascript:", "mailto:", "tel:", "data:"]
        .iter()
        .any(|scheme| lower.starts_with(scheme))
    {
        return None;
    }

    let absolute = base_url.join(href).ok()?;
    matches!(absolute.scheme(), "http" | "https").then_some(absolute)
}

/// Key used by the pagination cycle guard: the URL without its fragment
pub fn visit_key(url: &Url) -> String {
    let mut key = url.clone();
    key.set_fragment(None);
    key.to_string()
}
