//! Per-URL analysis with a content-addressed cache in front of it.

use crate::browser::RenderedPage;
use crate::error::Result;
use crate::llm::{Purpose, TextGenerator};
use crate::model::{PageMetadata, PageRecord, TestCaseSpec};
use crate::parsers::Parser;
use crate::parsers::response::{ParsedResponse, parse_json};
use crate::prompts::{PromptSet, render};
use crate::store::PageStore;
use crate::synthesizer::TestSynthesizer;
use crate::utils::registrable_domain;
use chrono::Local;
use std::sync::Arc;
use url::Url;

/// Whether a page must be analysed again
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheDecision {
    /// Cache disabled by the operator
    pub regenerate: bool,
    /// No usable record: never analysed, or the minimized markup changed
    pub first_time: bool,
}

impl CacheDecision {
    /// Compares the stored record for `url` with the current markup hash
    pub fn evaluate(
        store: &dyn PageStore,
        url: &str,
        content_hash: &str,
        no_cache: bool,
    ) -> Result<Self> {
        let first_time = match store.page(url)? {
            Some(record) if record.content_hash == content_hash => false,
            Some(_) => {
                ::log::info!("Content changed since last analysis: {}", url);
                true
            }
            None => true,
        };
        Ok(Self {
            regenerate: no_cache,
            first_time,
        })
    }

    pub fn recompute(&self) -> bool {
        self.regenerate || self.first_time
    }
}

/// Analysis handed to the materializer
#[derive(Debug, Clone, PartialEq)]
pub struct PageAnalysis {
    pub url: String,
    pub metadata: PageMetadata,
    pub test_cases: Vec<TestCaseSpec>,
    /// Minimized markup the analysis was made from
    pub minimized: String,
    pub from_cache: bool,
}

pub struct PageAnalyzer {
    generator: Arc<dyn TextGenerator>,
    store: Arc<dyn PageStore>,
    prompts: Arc<PromptSet>,
    synthesizer: TestSynthesizer,
}

impl PageAnalyzer {
    pub fn new(
        generator: Arc<dyn TextGenerator>,
        store: Arc<dyn PageStore>,
        prompts: Arc<PromptSet>,
        synthesizer: TestSynthesizer,
    ) -> Self {
        Self {
            generator,
            store,
            prompts,
            synthesizer,
        }
    }

    /// Returns the stored analysis of `url` on a cache hit, otherwise
    /// extracts facts, asks for semantic facts and test cases, and persists
    /// the merged result.
    pub async fn analyze_page(
        &self,
        url: &str,
        page: &RenderedPage,
        decision: CacheDecision,
    ) -> Result<PageAnalysis> {
        if !decision.recompute() {
            if let Some(record) = self.store.page(url)? {
                ::log::info!("Using stored analysis for {}", url);
                return Ok(PageAnalysis {
                    url: record.url,
                    metadata: record.metadata,
                    test_cases: record.test_cases,
                    minimized: record.source,
                    from_cache: true,
                });
            }
            ::log::warn!("Stored analysis for {} disappeared, recomputing", url);
        }

        ::log::info!("Analyzing page: {}", url);
        let parsed = Parser::parse(page);

        let mut metadata = parsed.facts;
        let semantic = self.semantic_facts(&parsed.minimized).await;
        metadata.extend(semantic);

        let test_cases = self
            .synthesizer
            .generate_tests(&metadata, &parsed.minimized)
            .await;

        let host = Url::parse(url)?
            .host_str()
            .map(str::to_string)
            .unwrap_or_default();
        let domain = self.store.ensure_domain(&registrable_domain(&host))?;

        let record = PageRecord {
            url: url.to_string(),
            domain_id: domain.id,
            title: page.title.clone(),
            source: parsed.minimized.clone(),
            content_hash: parsed.content_hash,
            metadata: metadata.clone(),
            test_cases_count: test_cases.len(),
            test_cases: test_cases.clone(),
            timestamp: Local::now(),
        };
        self.store.upsert_page(&record)?;
        ::log::info!(
            "Stored analysis for {} with {} test cases",
            url,
            record.test_cases_count
        );

        Ok(PageAnalysis {
            url: url.to_string(),
            metadata,
            test_cases,
            minimized: parsed.minimized,
            from_cache: false,
        })
    }

    /// Model-derived facts; any failure yields an empty map
    async fn semantic_facts(&self, minimized: &str) -> PageMetadata {
        let user = render(
            &self.prompts.page_analysis.user,
            &[("page_source", minimized)],
        );
        let raw = match self
            .generator
            .generate(&self.prompts.page_analysis.system, &user, Purpose::Analysis)
            .await
        {
            Ok(raw) => raw,
            Err(e) => {
                ::log::error!("Page analysis failed: {}", e);
                return PageMetadata::new();
            }
        };
        ::log::debug!("Raw page analysis response: {}", raw);

        match parse_json::<PageMetadata>(&raw) {
            ParsedResponse::Parsed(facts) => facts,
            ParsedResponse::ParseError { raw, reason } => {
                ::log::error!("Failed to parse page analysis: {}", reason);
                ::log::error!("Raw response: {}", raw);
                PageMetadata::new()
            }
        }
    }
}
