//! Browser-like request headers

use rand::seq::SliceRandom;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, ACCEPT_ENCODING, ACCEPT_LANGUAGE, USER_AGENT};

/// Current desktop browser User-Agent strings
pub const USER_AGENT_POOL: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/123.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:125.0) Gecko/20100101 Firefox/125.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 14.4; rv:125.0) Gecko/20100101 Firefox/125.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 14_4_1) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.4.1 Safari/605.1.15",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36 Edg/124.0.2478.51",
];

const ACCEPT_HTML: &str =
    "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8";

/// Picks a User-Agent from [`USER_AGENT_POOL`] at random
pub fn pick_user_agent() -> &'static str {
    USER_AGENT_POOL
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or(USER_AGENT_POOL[0])
}

/// Chrome and Chromium-based Edge send the `Sec-Fetch-*` family
fn is_chromium(user_agent: &str) -> bool {
    user_agent.contains("Chrome/") && !user_agent.contains("Firefox/")
}

/// Builds the header set for one page request
///
/// # Arguments
///
/// * `user_agent` - Fixed agent to send; `None` rotates through the pool
pub fn build_browser_headers(user_agent: Option<&str>) -> HeaderMap {
    let agent = user_agent
        .map(str::trim)
        .filter(|ua| !ua.is_empty())
        .unwrap_or_else(|| pick_user_agent());

    let mut headers = HeaderMap::new();
    match HeaderValue::from_str(agent) {
        Ok(value) => {
            headers.insert(USER_AGENT, value);
        }
        Err(_) => {
            tracing::warn!("User-Agent '{}' is not a valid header value; using pool", agent);
            headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_POOL[0]));
        }
    }
    headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_HTML));
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));
    headers.insert(ACCEPT_ENCODING, HeaderValue::from_static("gzip, br"));
    headers.insert(
        HeaderName::from_static("upgrade-insecure-requests"),
        HeaderValue::from_static("1"),
    );

    let chromium = headers
        .get(USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(is_chromium)
        .unwrap_or(false);
    if chromium {
        for (name, value) in [
            ("sec-fetch-dest", "document"),
            ("sec-fetch-mode", "navigate"),
            ("sec-fetch-site", "none"),
            ("sec-fetch-user", "?1"),
        ] {
            headers.insert(HeaderName::from_static(name), HeaderValue::from_static(value));
        }
    }

    headers
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_agents_look_like_browsers() {
        for agent in USER_AGENT_POOL {
            assert!(agent.starts_with("Mozilla/5.0"));
        }
        assert!(USER_AGENT_POOL.contains(&pick_user_agent()));
    }

    #[test]
    fn test_custom_agent_is_used() {
        let headers = build_browser_headers(Some("gleaner-test/1.0"));
        assert_eq!(headers[USER_AGENT], "gleaner-test/1.0");
        assert!(headers.get("sec-fetch-mode").is_none());
        assert!(headers.contains_key(ACCEPT));
        assert!(headers.contains_key(ACCEPT_LANGUAGE));
        assert_eq!(headers["upgrade-insecure-requests"], "1");
    }

    #[test]
    fn test_chrome_gets_sec_fetch() {
        let headers = build_browser_headers(Some(USER_AGENT_POOL[0]));
        assert_eq!(headers["sec-fetch-mode"], "navigate");
        assert_eq!(headers["sec-fetch-dest"], "document");
    }

    #[test]
    fn test_firefox_and_safari_skip_sec_fetch() {
        let firefox = build_browser_headers(Some(USER_AGENT_POOL[3]));
        assert!(firefox.get("sec-fetch-mode").is_none());

        let safari = build_browser_headers(Some(USER_AGENT_POOL[5]));
        assert!(safari.get("sec-fetch-mode").is_none());
    }

    #[test]
    fn test_blank_agent_falls_back_to_pool() {
        let headers = build_browser_headers(Some("   "));
        let agent = headers.get(USER_AGENT).unwrap().to_str().unwrap();
        assert!(USER_AGENT_POOL.contains(&agent));
    }
}
