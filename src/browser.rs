use crate::error::{Error, Result};
use async_trait::async_trait;
use fantoccini::{Client, ClientBuilder, Locator};
use serde_json::{Map, Value, json};
use std::time::Duration;

/// Snapshot of the page the browser session currently shows
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedPage {
    pub url: String,
    pub title: String,
    pub source: String,
}

/// A stateful browser the pipeline drives one page at a time.
///
/// Every method takes `&mut self`: navigating from two call sites at once
/// would corrupt what `current_url`/`source` report, so the session is held
/// exclusively by whoever is processing the current page.
#[async_trait]
pub trait BrowserSession: Send {
    /// Navigate to `url`
    async fn goto(&mut self, url: &str) -> Result<()>;

    /// Wait at most `timeout` for the document body to exist
    async fn wait_until_ready(&mut self, timeout: Duration) -> Result<()>;

    async fn current_url(&mut self) -> Result<String>;

    async fn title(&mut self) -> Result<String>;

    /// Rendered markup of the current document
    async fn source(&mut self) -> Result<String>;

    async fn close(&mut self) -> Result<()>;

    /// Capture url, title and markup of the current page
    async fn snapshot(&mut self) -> Result<RenderedPage> {
        let url = self.current_url().await?;
        let title = self.title().await?;
        let source = self.source().await?;
        Ok(RenderedPage { url, title, source })
    }
}

/// Browser session backed by a WebDriver server
pub struct WebDriverSession {
    client: Client,
}

impl WebDriverSession {
    /// Connects to the WebDriver instance, trying common local ports when
    /// the configured one refuses.
    pub async fn connect(webdriver_url: &str) -> Result<Self> {
        match Self::connect_to(webdriver_url).await {
            Ok(client) => {
                ::log::debug!("Connected to WebDriver at {}", webdriver_url);
                return Ok(Self { client });
            }
            Err(e) => {
                ::log::error!("Failed to connect to WebDriver at {}: {}", webdriver_url, e);
            }
        }

        let fallback_urls = [
            "http://localhost:9515", // ChromeDriver default
            "http://localhost:4723", // Appium default
            "http://localhost:9222", // Chrome debug port default
            "http://127.0.0.1:4444", // Try with IP instead of localhost
        ];

        for url in fallback_urls.iter() {
            if *url == webdriver_url {
                continue;
            }

            ::log::info!("Trying fallback WebDriver URL: {}", url);
            if let Ok(client) = Self::connect_to(url).await {
                ::log::debug!("Connected to fallback WebDriver at {}", url);
                return Ok(Self { client });
            }
        }

        Err(Error::Browser(format!(
            "failed to connect to any WebDriver server (tried {} and fallbacks); \
             make sure one is running or set WEBDRIVER_URL",
            webdriver_url
        )))
    }

    async fn connect_to(url: &str) -> std::result::Result<Client, String> {
        ClientBuilder::native()
            .capabilities(headless_capabilities())
            .connect(url)
            .await
            .map_err(|e| e.to_string())
    }
}

fn headless_capabilities() -> Map<String, Value> {
    let mut caps = Map::new();
    caps.insert(
        "goog:chromeOptions".to_string(),
        json!({
            "args": ["--headless", "--window-size=1920,1080", "--disable-gpu", "--no-sandbox"]
        }),
    );
    caps.insert(
        "moz:firefoxOptions".to_string(),
        json!({ "args": ["-headless"] }),
    );
    caps
}

#[async_trait]
impl BrowserSession for WebDriverSession {
    async fn goto(&mut self, url: &str) -> Result<()> {
        self.client.goto(url).await?;
        Ok(())
    }

    async fn wait_until_ready(&mut self, timeout: Duration) -> Result<()> {
        self.client
            .wait()
            .at_most(timeout)
            .for_element(Locator::Css("body"))
            .await?;
        Ok(())
    }

    async fn current_url(&mut self) -> Result<String> {
        Ok(self.client.current_url().await?.to_string())
    }

    async fn title(&mut self) -> Result<String> {
        Ok(self.client.title().await?)
    }

    async fn source(&mut self) -> Result<String> {
        Ok(self.client.source().await?)
    }

    async fn close(&mut self) -> Result<()> {
        self.client.clone().close().await?;
        Ok(())
    }
}
