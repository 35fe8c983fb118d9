use crate::selector::generated::is_likely_generated;
use crate::selector::pattern::selector_tokens;
use scraper::{Html, Selector};
use serde::Serialize;

/// Maximum number of sample texts kept in a report
const MAX_SAMPLES: usize = 3;

/// Sample texts are cut to this many characters
const SAMPLE_CHARS: usize = 100;

/// Outcome of testing a selector against a document
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SelectorReport {
    /// Parsed, matched something, and matched the expected count if given
    pub valid: bool,
    pub count: usize,
    pub sample_texts: Vec<String>,
    pub warnings: Vec<String>,
}

/// Tests `selector` against `document` and reports what it matched
///
/// # Arguments
///
/// * `document` - The parsed page
/// * `selector` - CSS selector to test
/// * `expected` - Optional exact match count the caller expects
///
/// # Returns
///
/// A report; parse failures are reported in `warnings`, never raised.
pub fn validate_selector(document: &Html, selector: &str, expected: Option<usize>) -> SelectorReport {
    let parsed = match Selector::parse(selector) {
        Ok(parsed) => parsed,
        Err(e) => {
            return SelectorReport {
                valid: false,
                count: 0,
                sample_texts: Vec::new(),
                warnings: vec![format!("Selector parsing failed: {:?}", e)],
            };
        }
    };

    let mut warnings = Vec::new();
    let texts: Vec<String> = document
        .select(&parsed)
        .map(|el| collapse_whitespace(&el.text().collect::<String>()))
        .collect();
    let count = texts.len();

    if count == 0 {
        warnings.push(format!("Selector '{}' matched no elements", selector));
    }

    let empty = texts.iter().filter(|t| t.is_empty()).count();
    if empty > 0 {
        warnings.push(format!("{} of {} matched elements have empty text", empty, count));
    }

    for token in selector_tokens(selector) {
        if is_likely_generated(&token) {
            warnings.push(format!(
                "Selector uses dynamic-looking token '{}' that may change between deploys",
                token
            ));
        }
    }

    let count_matches = match expected {
        Some(n) if n != count => {
            warnings.push(format!("Expected {} elements, found {}", n, count));
            false
        }
        _ => true,
    };

    let sample_texts = texts
        .iter()
        .filter(|t| !t.is_empty())
        .take(MAX_SAMPLES)
        .map(|t| t.chars().take(SAMPLE_CHARS).collect())
        .collect();

    SelectorReport {
        valid: count > 0 && count_matches,
        count,
        sample_texts,
        warnings,
    }
}

pub(crate) fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
