//! Classification of class and id tokens
//!
//! Build tools (CSS-in-JS, CSS modules, hashed bundles) emit class names that
//! change on every deploy. Selectors built on them break silently, so the
//! selector builder needs to recognise and avoid them.

use once_cell::sync::Lazy;
use regex::Regex;

/// Prefixes emitted by common CSS-in-JS and component libraries
static GENERATOR_PREFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:css|sc|jsx|emotion|styled|makeStyles|svelte|astro|tw)-|^Mui[A-Z]")
        .expect("Generator prefix regex is hardcoded and valid")
});

/// react-native-web atomic classes, e.g. `r-1awozwy`
static ATOMIC_CLASS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^r-[0-9a-z]{5,}$").expect("Atomic class regex is hardcoded and valid")
});

/// CSS modules style `_abc123def` or `__x7f2k`
static UNDERSCORE_HASH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^_{1,2}[0-9A-Za-z]{5,}$").expect("Underscore hash regex is hardcoded and valid")
});

static UUID: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}")
        .expect("UUID regex is hardcoded and valid")
});

static LONG_DIGITS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[0-9]{5,}").expect("Digit run regex is hardcoded and valid"));

/// Tailwind-style utility vocabulary
static UTILITY_CLASS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?x)^(?:[a-z0-9]+:)*(?:
            -?(?:m|p)[trblxy]?-[0-9a-z./\[\]]+
          | (?:w|h|min-w|max-w|min-h|max-h|gap|gap-x|gap-y|space-x|space-y|inset|top|left|right|bottom|z|order)-[0-9a-z./\[\]]+
          | text-(?:xs|sm|base|lg|[2-9]?xl|left|right|center|justify|[a-z]+-[0-9]{2,3}|white|black)
          | font-(?:thin|light|normal|medium|semibold|bold|extrabold|black|sans|serif|mono)
          | bg-[a-z]+(?:-[0-9]{2,3})?
          | border(?:-[a-z0-9]+)*
          | rounded(?:-[a-z0-9]+)*
          | shadow(?:-[a-z0-9]+)*
          | opacity-[0-9]+
          | leading-[a-z0-9]+
          | tracking-[a-z]+
          | (?:items|justify|content|self|place)-[a-z]+
          | (?:flex|grid|inline|inline-flex|inline-block|block|hidden|contents|relative|absolute|fixed|sticky|static)
          | flex-(?:row|col|wrap|nowrap|1|auto|none|grow|shrink)(?:-reverse)?
          | grid-(?:cols|rows)-[0-9a-z]+
          | col-span-[0-9a-z]+
          | (?:overflow|truncate|underline|uppercase|lowercase|capitalize|italic|antialiased)(?:-[a-z]+)?
          | (?:transition|duration|ease|cursor|select|pointer-events)(?:-[a-z0-9]+)*
          | sr-only
        )$",
    )
    .expect("Utility class regex is hardcoded and valid")
});

/// Returns true when a class or id token looks build-generated
///
/// Empty and very short tokens count as generated: they carry no meaning a
/// selector can rely on.
///
/// # Examples
///
/// ```
/// use gleaner::selector::is_likely_generated;
///
/// assert!(is_likely_generated("css-1a2b3c4"));
/// assert!(is_likely_generated("item-12345678"));
/// assert!(!is_likely_generated("post-content"));
/// ```
pub fn is_likely_generated(token: &str) -> bool {
    let token = token.trim();
    if token.chars().count() <= 2 {
        return true;
    }

    if GENERATOR_PREFIX.is_match(token)
        || ATOMIC_CLASS.is_match(token)
        || (UNDERSCORE_HASH.is_match(token) && token.chars().any(|c| c.is_ascii_digit()))
        || UUID.is_match(token)
        || LONG_DIGITS.is_match(token)
    {
        return true;
    }

    token
        .split(|c| c == '-' || c == '_')
        .any(is_opaque_segment)
}

/// A single `-`/`_` separated segment that reads like a hash
fn is_opaque_segment(segment: &str) -> bool {
    let len = segment.len();
    if len < 5 || !segment.chars().all(|c| c.is_ascii_alphanumeric()) {
        return false;
    }

    let digits = segment.chars().filter(|c| c.is_ascii_digit()).count();
    let all_hex = segment.chars().all(|c| c.is_ascii_hexdigit());

    if all_hex && (len >= 8 || (len >= 6 && digits > 0 && digits < len)) {
        return true;
    }

    // short mixed runs like `x7f2k9`
    len <= 8 && digits >= 2 && digits < len
}

/// Returns true for CSS-utility classes that are stable but meaningless
pub fn is_utility_class(token: &str) -> bool {
    UTILITY_CLASS.is_match(token)
}

/// Returns true when a token can be written after `.` or `#` unescaped
pub(crate) fn is_plain_identifier(token: &str) -> bool {
    let mut chars = token.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        Some('-') => match chars.next() {
            Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
            _ => return false,
        },
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_prefixes() {
        assert!(is_likely_generated("css-1a2b3c4"));
        assert!(is_likely_generated("sc-1x2y3z"));
        assert!(is_likely_generated("jsx-2871293847"));
        assert!(is_likely_generated("styled-abc123"));
        assert!(is_likely_generated("emotion-abc"));
        assert!(is_likely_generated("MuiBox-root"));
        assert!(is_likely_generated("MuiBox-root-123"));
        assert!(is_likely_generated("r-1awozwy"));
        assert!(is_likely_generated("_abc123def"));
    }

    #[test]
    fn test_short_and_empty_tokens() {
        assert!(is_likely_generated(""));
        assert!(is_likely_generated("ab"));
        assert!(!is_likely_generated("nav"));
    }

    #[test]
    fn test_numeric_and_hex_suffixes() {
        assert!(is_likely_generated("item-12345678"));
        assert!(is_likely_generated("element-123456789"));
        assert!(is_likely_generated("item-abc123def"));
        assert!(is_likely_generated("container-deadbeef"));
        assert!(is_likely_generated("card-1a2b3c"));
    }

    #[test]
    fn test_uuid() {
        assert!(is_likely_generated("550e8400-e29b-41d4-a716-446655440000"));
    }

    #[test]
    fn test_stable_tokens() {
        for token in [
            "title",
            "post-content",
            "article-header",
            "nav-item",
            "views-row",
            "entry-title",
            "product-card__title",
            "col-md-6",
            "_private",
        ] {
            assert!(!is_likely_generated(token), "{} should be stable", token);
        }
    }

    #[test]
    fn test_utility_classes() {
        for token in [
            "flex",
            "items-center",
            "justify-between",
            "p-4",
            "mt-2",
            "bg-white",
            "text-lg",
            "font-bold",
            "rounded-lg",
            "md:flex",
            "grid-cols-3",
        ] {
            assert!(is_utility_class(token), "{} should be utility", token);
        }
        assert!(!is_utility_class("item-title"));
        assert!(!is_utility_class("post"));
        assert!(!is_utility_class("card-title"));
    }

    #[test]
    fn test_plain_identifier() {
        assert!(is_plain_identifier("main-content"));
        assert!(is_plain_identifier("_private"));
        assert!(!is_plain_identifier("1column"));
        assert!(!is_plain_identifier("a:b"));
        assert!(!is_plain_identifier(""));
    }
}
