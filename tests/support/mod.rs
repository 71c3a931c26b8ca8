#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use site_probe::browser::BrowserSession;
use site_probe::config::GeneratorConfig;
use site_probe::llm::{Purpose, TextGenerator};
use site_probe::prompts::PromptSet;
use site_probe::{Error, Result};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Browser over a fixed url -> markup map
#[derive(Default)]
pub struct FakeBrowser {
    pages: HashMap<String, String>,
    current: Option<String>,
    pub visits: Arc<Mutex<Vec<String>>>,
    pub closed: Arc<AtomicUsize>,
}

impl FakeBrowser {
    pub fn new<'a>(pages: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        Self {
            pages: pages
                .into_iter()
                .map(|(url, html)| (url.to_string(), html.to_string()))
                .collect(),
            ..Self::default()
        }
    }

    fn current(&self) -> Result<&str> {
        self.current
            .as_deref()
            .ok_or_else(|| Error::Browser("no page loaded".to_string()))
    }
}

#[async_trait]
impl BrowserSession for FakeBrowser {
    async fn goto(&mut self, url: &str) -> Result<()> {
        self.visits.lock().push(url.to_string());
        if !self.pages.contains_key(url) {
            return Err(Error::Browser(format!("net::ERR_NAME_NOT_RESOLVED at {}", url)));
        }
        self.current = Some(url.to_string());
        Ok(())
    }

    async fn wait_until_ready(&mut self, _timeout: Duration) -> Result<()> {
        self.current().map(|_| ())
    }

    async fn current_url(&mut self) -> Result<String> {
        self.current().map(str::to_string)
    }

    async fn title(&mut self) -> Result<String> {
        let url = self.current()?.to_string();
        Ok(format!("Title of {}", url))
    }

    async fn source(&mut self) -> Result<String> {
        let url = self.current()?;
        Ok(self.pages[url].clone())
    }

    async fn close(&mut self) -> Result<()> {
        self.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Canned model: page analysis, test cases and scripts each get their own reply
pub struct FakeGenerator {
    pub facts: String,
    pub tests: String,
    pub script: String,
    pub analysis_calls: AtomicUsize,
    pub test_calls: AtomicUsize,
    pub script_calls: AtomicUsize,
    analysis_system: String,
}

impl FakeGenerator {
    pub fn new(facts: &str, tests: &str, script: &str) -> Self {
        Self {
            facts: facts.to_string(),
            tests: tests.to_string(),
            script: script.to_string(),
            analysis_calls: AtomicUsize::new(0),
            test_calls: AtomicUsize::new(0),
            script_calls: AtomicUsize::new(0),
            analysis_system: PromptSet::default().page_analysis.system,
        }
    }

    pub fn total_calls(&self) -> usize {
        self.analysis_calls.load(Ordering::SeqCst)
            + self.test_calls.load(Ordering::SeqCst)
            + self.script_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TextGenerator for FakeGenerator {
    async fn generate(&self, system: &str, _user: &str, purpose: Purpose) -> Result<String> {
        match purpose {
            Purpose::Script => {
                self.script_calls.fetch_add(1, Ordering::SeqCst);
                Ok(self.script.clone())
            }
            Purpose::Analysis if system == self.analysis_system => {
                self.analysis_calls.fetch_add(1, Ordering::SeqCst);
                Ok(self.facts.clone())
            }
            Purpose::Analysis => {
                self.test_calls.fetch_add(1, Ordering::SeqCst);
                Ok(self.tests.clone())
            }
        }
    }
}

/// Config writing everything under `dir`, with no crawl pause and `sh`
/// standing in for the python interpreter
pub fn config_in(dir: &Path) -> GeneratorConfig {
    GeneratorConfig {
        scripts_dir: dir.join("test_scripts"),
        reports_dir: dir.join("reports"),
        test_data_path: dir.join("auth_test_data.json"),
        database_path: dir.join("site_probe.db"),
        crawl_pause_ms: 0,
        page_ready_secs: 1,
        execution_timeout_secs: 5,
        python_bin: Some("sh".to_string()),
        ..GeneratorConfig::default()
    }
}

pub const HOME: &str = r#"<html><head><title>Home</title></head><body>
<nav><a href="/a">A</a><a href="/b">B</a></nav>
<a href="https://other.com">Partner</a>
<form id="login" action="/session" method="post"><input type="email" name="email"><button type="submit">Log in</button></form>
</body></html>"#;

pub const FACTS: &str = r#"```json
{"auth_requirements": {"auth_required": false}, "security_indicators": ["https"]}
```"#;

pub const TESTS: &str = r#"{"test_cases": [
  {"name": "Login/Logout Test!!", "type": "auth", "steps": ["enter email", "submit"],
   "selectors": {"email": "input[name=email]"}, "validation": "dashboard visible",
   "test_data": {"email": "a@example.com"}},
  {"name": "Navigation", "type": "navigation", "steps": ["click A"], "validation": "page A loads"}
]}"#;

/// Runs under `sh`; the comment carries the selenium markers
pub const SCRIPT: &str = "Here is the script:\n```python\n# from selenium import webdriver; By\necho 'PASS: login works'\n```";
