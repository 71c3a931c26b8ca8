//! Crawl, analyze, materialize and execute, one page at a time.

use crate::analysis::{CacheDecision, PageAnalyzer};
use crate::browser::BrowserSession;
use crate::config::GeneratorConfig;
use crate::crawlers::{CrawlSettings, extract_urls};
use crate::error::Result;
use crate::executor::{ScriptExecutor, validate_script_structure};
use crate::filter::UrlFilter;
use crate::llm::TextGenerator;
use crate::materializer::{MaterializedScript, Operator, ScriptMaterializer};
use crate::model::TestCaseSpec;
use crate::parsers::Parser;
use crate::prompts::PromptSet;
use crate::report::write_report;
use crate::results::{RunLog, TestResult};
use crate::store::PageStore;
use crate::synthesizer::TestSynthesizer;
use chrono::Local;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use url::Url;

/// Owns the browser session for the whole run; every stage borrows it in turn
pub struct Pipeline {
    config: GeneratorConfig,
    session: Box<dyn BrowserSession>,
    operator: Box<dyn Operator>,
    store: Arc<dyn PageStore>,
    analyzer: PageAnalyzer,
    materializer: ScriptMaterializer,
    executor: ScriptExecutor,
    run_log: RunLog,
}

impl Pipeline {
    /// Validates the configuration and wires the stages together. Only
    /// configuration problems fail here.
    pub fn new(
        config: GeneratorConfig,
        session: Box<dyn BrowserSession>,
        operator: Box<dyn Operator>,
        generator: Arc<dyn TextGenerator>,
        store: Arc<dyn PageStore>,
    ) -> Result<Self> {
        config.validate()?;
        let prompts = Arc::new(PromptSet::load(config.prompts_path.as_deref())?);

        let synthesizer = TestSynthesizer::new(
            generator.clone(),
            prompts.clone(),
            config.test_data_path.clone(),
        );
        let analyzer = PageAnalyzer::new(generator.clone(), store.clone(), prompts.clone(), synthesizer);
        let materializer = ScriptMaterializer::new(generator, store.clone(), prompts, &config);
        let executor = ScriptExecutor::from_config(&config);

        Ok(Self {
            config,
            session,
            operator,
            store,
            analyzer,
            materializer,
            executor,
            run_log: RunLog::new(),
        })
    }

    pub fn run_log(&self) -> &RunLog {
        &self.run_log
    }

    /// Processes `url` (or, when `recursive`, every page the crawl finds),
    /// closes the browser and writes the report. Failures of individual
    /// pages are logged and skipped.
    pub async fn run(
        &mut self,
        url: &str,
        recursive: bool,
        max_depth: usize,
        no_cache: bool,
    ) -> Result<PathBuf> {
        let urls = if recursive {
            let settings = CrawlSettings::from(&self.config);
            let urls = extract_urls(self.session.as_mut(), url, max_depth, &settings).await;
            if urls.is_empty() {
                ::log::warn!("No URLs found to test");
            }
            urls
        } else {
            match Url::parse(url) {
                Ok(parsed) => vec![UrlFilter::normalize_url(&parsed)],
                Err(e) => {
                    ::log::error!("Invalid URL {}: {}", url, e);
                    Vec::new()
                }
            }
        };

        for (i, page_url) in urls.iter().enumerate() {
            ::log::info!("Processing URL {}/{}: {}", i + 1, urls.len(), page_url);
            if let Err(e) = self.process_single_url(page_url, no_cache).await {
                ::log::error!("Failed to process {}: {}", page_url, e);
            }
        }

        if let Err(e) = self.session.close().await {
            ::log::warn!("Failed to close browser session: {}", e);
        }

        write_report(
            &self.run_log,
            &self.config.scripts_dir,
            &self.config.reports_dir,
        )
    }

    /// Renders one page, analyzes it (or reuses the stored analysis), lets
    /// the operator pick test cases and runs the resulting scripts.
    pub async fn process_single_url(&mut self, url: &str, no_cache: bool) -> Result<()> {
        self.session.goto(url).await?;
        self.session
            .wait_until_ready(self.config.page_ready_timeout())
            .await?;
        let page = self.session.snapshot().await?;
        self.run_log.visit(url);

        let (_, content_hash) = Parser::fingerprint(&page);
        let decision = CacheDecision::evaluate(self.store.as_ref(), url, &content_hash, no_cache)?;
        ::log::debug!("Cache decision for {}: {:?}", url, decision);

        let analysis = self.analyzer.analyze_page(url, &page, decision).await?;
        ::log::info!(
            "{} test cases available for {}",
            analysis.test_cases.len(),
            url
        );

        let (scripts, selected) = self
            .materializer
            .materialize(self.operator.as_mut(), &analysis)
            .await;
        self.execute_test_cycle(&scripts, &selected, url).await;
        Ok(())
    }

    /// Runs every structurally valid script and records the outcome.
    /// `selected[i]` is the test case `scripts[i]` was made from.
    pub async fn execute_test_cycle(
        &mut self,
        scripts: &[MaterializedScript],
        selected: &[TestCaseSpec],
        url: &str,
    ) {
        let markers = self
            .config
            .testing_tool
            .required_markers(self.config.language);

        for (script, spec) in scripts.iter().zip(selected) {
            let test_name = spec.display_name();
            if !validate_script_structure(&script.source, markers) {
                ::log::warn!("Skipping '{}': script failed structure check", test_name);
                continue;
            }
            if !self.executor.can_execute() {
                ::log::info!(
                    "Skipping '{}': {} scripts are not executed directly",
                    test_name,
                    self.config.language
                );
                continue;
            }

            ::log::info!("Running test: {}", test_name);
            let result = self.executor.execute_test_script(&script.source).await;
            ::log::info!(
                "Test '{}' {}",
                test_name,
                if result.success { "passed" } else { "failed" }
            );

            let file_name = Path::new(&script.filename)
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| script.filename.clone());
            self.run_log.record(TestResult {
                timestamp: Local::now(),
                url: url.to_string(),
                test_name: test_name.to_string(),
                file_name,
                result,
            });
        }
    }
}
