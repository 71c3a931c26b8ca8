use crate::browser::BrowserSession;
use crate::config::GeneratorConfig;
use crate::crawlers::frontier::CrawlState;
use crate::error::{Error, Result};
use crate::filter::{UrlFilter, UrlFilterConfig};
use crate::parsers::html;
use std::time::Duration;
use tokio::time::timeout;
use url::Url;

/// Upper bound for rendering a single page, on top of the readiness wait
const SCRAPE_TIMEOUT: Duration = Duration::from_secs(45);

/// Crawl pacing
#[derive(Debug, Clone, Copy)]
pub struct CrawlSettings {
    /// Pause before every navigation so the target is not hammered
    pub pause: Duration,
    /// Maximum wait for the document body
    pub ready_timeout: Duration,
}

impl Default for CrawlSettings {
    fn default() -> Self {
        Self {
            pause: Duration::from_secs(1),
            ready_timeout: Duration::from_secs(10),
        }
    }
}

impl From<&GeneratorConfig> for CrawlSettings {
    fn from(config: &GeneratorConfig) -> Self {
        Self {
            pause: config.crawl_pause(),
            ready_timeout: config.page_ready_timeout(),
        }
    }
}

/// Breadth-first discovery of same-host pages reachable from `seed_url`
/// within `max_depth` links (0 = seed only).
///
/// Rendering failures are logged and the URL is left out of the result; they
/// never stop the crawl. The session is left on whichever page was rendered
/// last.
pub async fn extract_urls(
    session: &mut dyn BrowserSession,
    seed_url: &str,
    max_depth: usize,
    settings: &CrawlSettings,
) -> Vec<String> {
    ::log::info!("Starting recursive URL extraction from: {}", seed_url);

    let seed = match Url::parse(seed_url) {
        Ok(seed) => seed,
        Err(e) => {
            ::log::error!("URL extraction failed for {}: {}", seed_url, e);
            return Vec::new();
        }
    };

    let filter = match UrlFilter::new(UrlFilterConfig::for_seed(&seed)) {
        Ok(filter) => filter,
        Err(e) => {
            ::log::error!("Invalid URL filter pattern: {}", e);
            return Vec::new();
        }
    };

    let domain = seed.host_str().unwrap_or_default().to_string();
    let mut state = CrawlState::new(UrlFilter::normalize_url(&seed), domain);

    while let Some((current_url, depth)) = state.pop() {
        if state.is_visited(&current_url) || depth > max_depth {
            continue;
        }

        let links = match timeout(SCRAPE_TIMEOUT, render(session, &current_url, settings)).await
        {
            Ok(Ok(links)) => links,
            Ok(Err(e)) => {
                ::log::error!("Failed to process {}: {}", current_url, e);
                continue;
            }
            Err(_) => {
                ::log::error!("Timeout processing: {}", current_url);
                continue;
            }
        };

        state.mark_visited(current_url.clone());
        ::log::info!("Processing depth {}: {}", depth, current_url);

        if depth == max_depth {
            continue;
        }

        let base = match Url::parse(&current_url) {
            Ok(base) => base,
            Err(_) => continue,
        };

        let mut queued = 0;
        for link in links {
            let resolved = match base.join(&link) {
                Ok(resolved) => resolved,
                Err(_) => continue,
            };
            if !filter.should_crawl(&resolved) {
                ::log::trace!("URL filter rejected: {}", resolved);
                continue;
            }

            if state.enqueue(UrlFilter::normalize_url(&resolved), depth + 1) {
                queued += 1;
            }
        }
        ::log::debug!("Found {} new URLs at depth {}", queued, depth);
    }

    ::log::info!(
        "Total unique URLs found on {}: {}",
        state.domain(),
        state.visited_count()
    );
    let urls = state.into_sorted();
    for url in &urls {
        ::log::debug!("Found URL: {}", url);
    }
    urls
}

/// Navigates to `url`, waits for the body and returns the anchor targets
async fn render(
    session: &mut dyn BrowserSession,
    url: &str,
    settings: &CrawlSettings,
) -> Result<Vec<String>> {
    ::log::debug!("Waiting {:?} before processing {}", settings.pause, url);
    tokio::time::sleep(settings.pause).await;

    session.goto(url).await?;
    session.wait_until_ready(settings.ready_timeout).await?;
    let source = session.source().await?;
    if source.trim().is_empty() {
        return Err(Error::Browser(format!("empty document at {}", url)));
    }

    Ok(html::parse_links_only(&source))
}
