use regex::Regex;
use serde::{Deserialize, Serialize};
use url::Url;

/// Configuration for URL filtering in the crawler
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UrlFilterConfig {
    /// Host every crawled URL must share with the seed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required_host: Option<String>,

    /// Regex patterns for URLs to include (if empty, all URLs are included unless excluded)
    #[serde(default)]
    pub include_patterns: Vec<String>,

    /// Regex patterns for URLs to exclude (these take precedence over include patterns)
    #[serde(default)]
    pub exclude_patterns: Vec<String>,
}

/// Static assets never worth rendering as pages
pub const ASSET_PATTERN: &str = r"(?i)\.(jpg|jpeg|png|gif|css|js|ico|svg|woff|woff2|ttf|eot|pdf|zip)$";

impl Default for UrlFilterConfig {
    fn default() -> Self {
        Self {
            required_host: None,
            include_patterns: Vec::new(),
            exclude_patterns: vec![ASSET_PATTERN.to_string()],
        }
    }
}

impl UrlFilterConfig {
    /// Scope crawling to the seed URL's host
    pub fn for_seed(seed: &Url) -> Self {
        Self {
            required_host: seed.host_str().map(str::to_string),
            ..Self::default()
        }
    }
}

/// URL filter that uses host scoping and regex patterns to decide which URLs to crawl
#[derive(Debug)]
pub struct UrlFilter {
    config: UrlFilterConfig,
    include_regexes: Vec<Regex>,
    exclude_regexes: Vec<Regex>,
}

impl UrlFilter {
    /// Create a new URL filter from configuration
    pub fn new(config: UrlFilterConfig) -> Result<Self, regex::Error> {
        let include_regexes = config
            .include_patterns
            .iter()
            .map(|p| Regex::new(p))
            .collect::<Result<Vec<_>, _>>()?;

        let exclude_regexes = config
            .exclude_patterns
            .iter()
            .map(|p| Regex::new(p))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            config,
            include_regexes,
            exclude_regexes,
        })
    }

    /// Determine if a URL should be crawled based on all filtering rules
    pub fn should_crawl(&self, url: &Url) -> bool {
        if !matches!(url.scheme(), "http" | "https") {
            return false;
        }

        if !self.is_in_host_scope(url) {
            return false;
        }

        // Exclusions take precedence; matched against the path so a query
        // string cannot hide an asset extension.
        let path = url.path();
        let url_str = url.as_str();
        if self
            .exclude_regexes
            .iter()
            .any(|r| r.is_match(path) || r.is_match(url_str))
        {
            return false;
        }

        if !self.include_regexes.is_empty()
            && !self.include_regexes.iter().any(|r| r.is_match(url_str))
        {
            return false;
        }

        true
    }

    fn is_in_host_scope(&self, url: &Url) -> bool {
        match (&self.config.required_host, url.host_str()) {
            (Some(required), Some(host)) => host.eq_ignore_ascii_case(required),
            (Some(_), None) => false,
            (None, _) => true,
        }
    }

    /// Canonical string form of a URL.
    ///
    /// Query and fragment are dropped and trailing slashes stripped, so the
    /// site root is `scheme://host` whether or not it was written with `/`.
    pub fn normalize_url(url: &Url) -> String {
        let mut authority = url.host_str().unwrap_or_default().to_string();
        if let Some(port) = url.port() {
            authority.push_str(&format!(":{}", port));
        }
        let path = url.path().trim_end_matches('/');
        format!("{}://{}{}", url.scheme(), authority, path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_host_restriction() {
        let filter = UrlFilter::new(UrlFilterConfig::for_seed(&url("https://example.com"))).unwrap();

        assert!(filter.should_crawl(&url("https://example.com/page")));
        assert!(filter.should_crawl(&url("http://EXAMPLE.com/page")));
        assert!(!filter.should_crawl(&url("https://other.com/page")));
        assert!(!filter.should_crawl(&url("https://blog.example.com/page")));
        assert!(!filter.should_crawl(&url("mailto:team@example.com")));
    }

    #[test]
    fn test_assets_excluded_by_default() {
        let filter = UrlFilter::new(UrlFilterConfig::default()).unwrap();

        assert!(!filter.should_crawl(&url("https://example.com/logo.PNG")));
        assert!(!filter.should_crawl(&url("https://example.com/app.js?v=3")));
        assert!(filter.should_crawl(&url("https://example.com/page.html")));
    }

    #[test]
    fn test_regex_patterns() {
        let config = UrlFilterConfig {
            required_host: None,
            include_patterns: vec![r"/docs/.*\.html$".to_string()],
            exclude_patterns: vec![r"/docs/draft/".to_string()],
        };
        let filter = UrlFilter::new(config).unwrap();

        assert!(filter.should_crawl(&url("https://example.com/docs/page.html")));
        assert!(!filter.should_crawl(&url("https://example.com/docs/page.txt")));
        assert!(!filter.should_crawl(&url("https://example.com/docs/draft/page.html")));
    }

    #[test]
    fn test_invalid_pattern_is_reported() {
        let config = UrlFilterConfig {
            exclude_patterns: vec!["(".to_string()],
            ..UrlFilterConfig::default()
        };
        assert!(UrlFilter::new(config).is_err());
    }

    #[test]
    fn test_normalize_url() {
        assert_eq!(UrlFilter::normalize_url(&url("https://example.com")), "https://example.com");
        assert_eq!(UrlFilter::normalize_url(&url("https://example.com/")), "https://example.com");
        assert_eq!(
            UrlFilter::normalize_url(&url("https://example.com/a/?q=1#top")),
            "https://example.com/a"
        );
        assert_eq!(
            UrlFilter::normalize_url(&url("http://localhost:8080/b//")),
            "http://localhost:8080/b"
        );
    }
}
