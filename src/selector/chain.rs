use crate::selector::pattern::{extract_structural_pattern, tag_only_pattern};
use scraper::{ElementRef, Html, Selector};

/// An ordered list of selectors tried until one matches
///
/// Candidates that fail to parse are skipped, never raised: a chain lookup
/// either finds something or returns nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorChain {
    selectors: Vec<String>,
}

impl SelectorChain {
    pub fn new<I, S>(selectors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut chain = Self {
            selectors: Vec::new(),
        };
        for selector in selectors {
            chain.push(selector);
        }
        chain
    }

    /// Appends a candidate unless it is blank or already present
    pub fn push(&mut self, selector: impl Into<String>) {
        let selector = selector.into().trim().to_string();
        if !selector.is_empty() && !self.selectors.contains(&selector) {
            self.selectors.push(selector);
        }
    }

    pub fn selectors(&self) -> &[String] {
        &self.selectors
    }

    pub fn primary(&self) -> Option<&str> {
        self.selectors.first().map(String::as_str)
    }

    fn parsed(&self) -> impl Iterator<Item = (&str, Selector)> + '_ {
        self.selectors.iter().filter_map(|raw| match Selector::parse(raw) {
            Ok(selector) => Some((raw.as_str(), selector)),
            Err(_) => {
                tracing::debug!("Skipping unparsable selector '{}'", raw);
                None
            }
        })
    }

    /// First match under `scope` for the first candidate that matches anything
    pub fn select_one<'a>(&self, scope: ElementRef<'a>) -> Option<ElementRef<'a>> {
        self.parsed()
            .find_map(|(_, selector)| scope.select(&selector).next())
    }

    /// All matches under `scope` for the first candidate that matches anything
    pub fn select_all<'a>(&self, scope: ElementRef<'a>) -> Vec<ElementRef<'a>> {
        for (raw, selector) in self.parsed() {
            let matches: Vec<_> = scope.select(&selector).collect();
            if !matches.is_empty() {
                if Some(raw) != self.primary() {
                    tracing::debug!("Selector chain fell back to '{}'", raw);
                }
                return matches;
            }
        }
        Vec::new()
    }

    /// [`select_one`](Self::select_one) over a whole document
    pub fn select_one_in<'a>(&self, document: &'a Html) -> Option<ElementRef<'a>> {
        self.parsed()
            .find_map(|(_, selector)| document.select(&selector).next())
    }

    /// [`select_all`](Self::select_all) over a whole document
    pub fn select_all_in<'a>(&self, document: &'a Html) -> Vec<ElementRef<'a>> {
        for (raw, selector) in self.parsed() {
            let matches: Vec<_> = document.select(&selector).collect();
            if !matches.is_empty() {
                if Some(raw) != self.primary() {
                    tracing::debug!("Selector chain fell back to '{}'", raw);
                }
                return matches;
            }
        }
        Vec::new()
    }
}

/// Builds a specific-to-general chain for `selector`
///
/// The chain holds the selector itself, its structural variant without
/// generated tokens, and its tag-only variant, without duplicates.
pub fn build_fallback_chain(selector: &str) -> SelectorChain {
    let mut chain = SelectorChain::new([selector]);
    chain.push(extract_structural_pattern(selector));
    chain.push(tag_only_pattern(selector));
    chain
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(el: ElementRef<'_>) -> String {
        el.text().collect::<String>()
    }

    #[test]
    fn test_select_one_first_match() {
        let doc = Html::parse_fragment(r#"<div class="container"><p class="text">Hello</p></div>"#);
        let chain = SelectorChain::new([".text", "p"]);
        let found = chain.select_one(doc.root_element()).unwrap();
        assert_eq!(text(found), "Hello");
    }

    #[test]
    fn test_select_one_fallback() {
        let doc = Html::parse_fragment("<div><p>Hello</p></div>");
        let chain = SelectorChain::new([".missing", "p"]);
        let found = chain.select_one(doc.root_element()).unwrap();
        assert_eq!(text(found), "Hello");
    }

    #[test]
    fn test_select_one_no_match() {
        let doc = Html::parse_fragment("<div><span>Hello</span></div>");
        let chain = SelectorChain::new([".missing", "p"]);
        assert!(chain.select_one(doc.root_element()).is_none());
    }

    #[test]
    fn test_select_one_invalid_selector() {
        let doc = Html::parse_fragment("<div><p>Hello</p></div>");
        let chain = SelectorChain::new(["[[[invalid", "p"]);
        let found = chain.select_one(doc.root_element()).unwrap();
        assert_eq!(found.value().name(), "p");
    }

    #[test]
    fn test_select_all() {
        let doc = Html::parse_fragment("<div><p>One</p><p>Two</p><p>Three</p></div>");
        let chain = SelectorChain::new(["p"]);
        let found = chain.select_all(doc.root_element());
        assert_eq!(found.len(), 3);
        assert_eq!(text(found[0]), "One");
    }

    #[test]
    fn test_select_all_fallback_and_invalid() {
        let doc = Html::parse_fragment("<div><span>One</span><span>Two</span></div>");
        assert_eq!(
            SelectorChain::new([".missing", "span"])
                .select_all(doc.root_element())
                .len(),
            2
        );
        assert!(SelectorChain::new([".missing", "p"])
            .select_all(doc.root_element())
            .is_empty());
        assert_eq!(
            SelectorChain::new(["[[[invalid", "span"])
                .select_all_in(&doc)
                .len(),
            2
        );
    }

    #[test]
    fn test_chain_skips_duplicates_and_blanks() {
        let chain = SelectorChain::new(["p", " ", "p", "a"]);
        assert_eq!(chain.selectors(), &["p".to_string(), "a".to_string()]);
    }

    #[test]
    fn test_fallback_chain_order() {
        let chain = build_fallback_chain("h3.css-17p10p8 a");
        assert_eq!(chain.selectors(), &["h3.css-17p10p8 a".to_string(), "h3 a".to_string()]);
    }

    #[test]
    fn test_fallback_chain_includes_structural_and_tag_only() {
        let chain = build_fallback_chain("div.css-abc123 h2.emotion-xyz");
        assert!(chain
            .selectors()
            .iter()
            .any(|s| s.contains("h2") && !s.contains("emotion")));

        let chain = build_fallback_chain("article.post h2.title a");
        assert_eq!(chain.selectors().len(), 2);
        assert_eq!(chain.selectors()[1], "article h2 a");
    }

    #[test]
    fn test_fallback_chain_recovers_after_redeploy() {
        // class hash changed between authoring and crawl
        let doc = Html::parse_fragment(r#"<h3 class="css-9zz9zz"><a href="/x">X</a></h3>"#);
        let chain = build_fallback_chain("h3.css-17p10p8 a");
        let found = chain.select_one_in(&doc).unwrap();
        assert_eq!(found.value().attr("href"), Some("/x"));
    }
}
