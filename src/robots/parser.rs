//! Robots.txt rule evaluation
//!
//! Allow/Disallow matching is delegated to the `robotstxt` crate (Google's
//! longest-match semantics). `Crawl-delay` is not part of that matcher, so
//! it is read here with a small group-aware scan.

use robotstxt::DefaultMatcher;

/// Longest `Crawl-delay` honoured, in seconds; larger values are clamped
pub const MAX_CRAWL_DELAY_SECS: f64 = 3600.0;

/// Parsed robots.txt data
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedRobots {
    /// Raw robots.txt content (empty string means allow all)
    content: String,
    allow_all: bool,
}

impl ParsedRobots {
    pub fn from_content(content: &str) -> Self {
        Self {
            content: content.to_string(),
            allow_all: false,
        }
    }

    /// A ruleset that allows everything and sets no delay
    pub fn allow_all() -> Self {
        Self {
            content: String::new(),
            allow_all: true,
        }
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn is_allow_all(&self) -> bool {
        self.allow_all
    }

    /// Checks if a URL is allowed for the given user agent
    ///
    /// # Arguments
    ///
    /// * `url` - Absolute URL or path (e.g., "/page.html")
    /// * `user_agent` - Product token the rules are matched against
    pub fn is_allowed(&self, url: &str, user_agent: &str) -> bool {
        if self.allow_all || self.content.trim().is_empty() {
            return true;
        }

        let mut matcher = DefaultMatcher::default();
        matcher.one_agent_allowed_by_robots(&self.content, user_agent, url)
    }

    /// Gets the crawl delay, in seconds, for a specific user agent
    ///
    /// A group naming the agent wins over the `*` group. Several
    /// `User-agent` lines in a row share one group; the first rule line
    /// closes the agent list.
    pub fn crawl_delay(&self, user_agent: &str) -> Option<f64> {
        if self.allow_all || self.content.is_empty() {
            return None;
        }

        let token = product_token(user_agent);
        let mut group: Vec<String> = Vec::new();
        let mut in_rules = false;
        let mut for_agent: Option<f64> = None;
        let mut for_wildcard: Option<f64> = None;

        for line in self.content.lines() {
            let line = line.split('#').next().unwrap_or_default().trim();
            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            let key = key.trim().to_ascii_lowercase();
            let value = value.trim();

            match key.as_str() {
                "user-agent" => {
                    if in_rules {
                        group.clear();
                        in_rules = false;
                    }
                    group.push(value.to_ascii_lowercase());
                }
                "crawl-delay" => {
                    in_rules = true;
                    let Ok(delay) = value.parse::<f64>() else {
                        continue;
                    };
                    if !delay.is_finite() || delay < 0.0 {
                        continue;
                    }
                    let delay = delay.min(MAX_CRAWL_DELAY_SECS);
                    if group.iter().any(|ua| *ua == token) {
                        for_agent.get_or_insert(delay);
                    } else if group.iter().any(|ua| ua == "*") {
                        for_wildcard.get_or_insert(delay);
                    }
                }
                _ => in_rules = true,
            }
        }

        for_agent.or(for_wildcard)
    }
}

/// Lowercased product token of a User-Agent (`Gleaner/1.0 (+url)` → `gleaner`)
fn product_token(user_agent: &str) -> String {
    user_agent
        .split(|c: char| c == '/' || c.is_whitespace())
        .next()
        .unwrap_or_default()
        .to_ascii_lowercase()
}
