// Re-export modules
pub mod analysis;
pub mod browser;
pub mod config;
pub mod crawlers;
pub mod error;
pub mod executor;
pub mod filter;
pub mod interrupt;
pub mod llm;
pub mod materializer;
pub mod model;
pub mod parsers;
pub mod pipeline;
pub mod prompts;
pub mod report;
pub mod results;
pub mod store;
pub mod synthesizer;
pub mod testdata;
pub mod utils;

// Re-export commonly used types for convenience
pub use error::{Error, Result};
pub use model::{PageRecord, ScriptArtifact, TestCaseSpec};
pub use pipeline::Pipeline;
pub use results::{ExecutionResult, RunLog, TestResult};

use browser::WebDriverSession;
use config::{GeneratorConfig, LlmConfig};
use interrupt::InterruptRouter;
use llm::ChatClient;
use materializer::ConsoleOperator;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use store::SqliteStore;

/// Builder for a full run against a live WebDriver and model provider
pub struct SiteProbe {
    url: String,
    recursive: bool,
    max_depth: usize,
    no_cache: bool,
    config: GeneratorConfig,
    llm_config: Option<LlmConfig>,
}

impl SiteProbe {
    /// Create a new builder for the given seed URL
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            recursive: false,
            max_depth: 1,
            no_cache: false,
            config: GeneratorConfig::default(),
            llm_config: None,
        }
    }

    /// Crawl the site from the seed instead of testing the seed page only
    pub fn with_recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    /// Link depth limit for recursive runs
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Ignore stored analyses and regenerate every page
    pub fn with_no_cache(mut self, no_cache: bool) -> Self {
        self.no_cache = no_cache;
        self
    }

    pub fn with_config(mut self, config: GeneratorConfig) -> Self {
        self.config = config;
        self
    }

    /// Load the generator configuration from a file
    pub fn with_config_file(self, path: impl AsRef<Path>) -> Result<Self> {
        let config = GeneratorConfig::from_file(path.as_ref()).map_err(|e| {
            Error::Config(format!("failed to load {}: {}", path.as_ref().display(), e))
        })?;
        Ok(self.with_config(config))
    }

    pub fn with_llm_config(mut self, llm_config: LlmConfig) -> Self {
        self.llm_config = Some(llm_config);
        self
    }

    /// Load the model provider configuration from a file
    pub fn with_llm_config_file(self, path: impl AsRef<Path>) -> Result<Self> {
        let llm_config = LlmConfig::from_file(path.as_ref()).map_err(|e| {
            Error::Config(format!("failed to load {}: {}", path.as_ref().display(), e))
        })?;
        Ok(self.with_llm_config(llm_config))
    }

    pub fn config_mut(&mut self) -> &mut GeneratorConfig {
        &mut self.config
    }

    /// Connects the collaborators, runs the pipeline and returns the report path
    pub async fn run(self) -> Result<PathBuf> {
        let mut config = self.config;
        config.validate()?;

        // Override the WebDriver URL with an environment variable if provided
        if let Ok(webdriver_url) = std::env::var("WEBDRIVER_URL") {
            if !webdriver_url.is_empty() {
                config.webdriver_url = webdriver_url;
            }
        }

        let interrupts = InterruptRouter::install();

        let llm_config = self
            .llm_config
            .ok_or_else(|| Error::Config("no model provider configuration given".to_string()))?;
        let generator = Arc::new(ChatClient::from_config(&llm_config)?);
        let store = Arc::new(SqliteStore::open(&config.database_path)?);
        let session = WebDriverSession::connect(&config.webdriver_url).await?;

        let mut pipeline = Pipeline::new(
            config,
            Box::new(session),
            Box::new(ConsoleOperator::new(interrupts)),
            generator,
            store,
        )?;
        pipeline
            .run(&self.url, self.recursive, self.max_depth, self.no_cache)
            .await
    }
}
