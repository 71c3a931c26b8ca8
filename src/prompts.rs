//! Prompt templates for the three generation steps.
//!
//! Templates use `{name}` placeholders. Built-in templates can be replaced
//! piecewise from a JSON file shaped like [`PromptSet`].

use crate::config::TestingTool;
use crate::error::Result;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::OnceLock;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptPair {
    pub system: String,
    pub user: String,
}

/// Test case generation prompts plus the optional blocks appended to `user`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestPrompts {
    pub system: String,
    pub user: String,
    pub test_data_suffix: String,
    pub contact_form_suffix: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptSet {
    pub page_analysis: PromptPair,
    pub generate_tests: TestPrompts,
    /// Script prompts keyed by testing tool name
    pub generate_script: HashMap<String, PromptPair>,
}

impl Default for PromptSet {
    fn default() -> Self {
        let generate_script = [
            (TestingTool::Selenium, SELENIUM_SYSTEM),
            (TestingTool::Playwright, PLAYWRIGHT_SYSTEM),
            (TestingTool::Puppeteer, PUPPETEER_SYSTEM),
        ]
        .into_iter()
        .map(|(tool, system)| {
            (
                tool.as_str().to_string(),
                PromptPair {
                    system: system.to_string(),
                    user: SCRIPT_USER.to_string(),
                },
            )
        })
        .collect();

        Self {
            page_analysis: PromptPair {
                system: ANALYSIS_SYSTEM.to_string(),
                user: ANALYSIS_USER.to_string(),
            },
            generate_tests: TestPrompts {
                system: TESTS_SYSTEM.to_string(),
                user: TESTS_USER.to_string(),
                test_data_suffix: TEST_DATA_SUFFIX.to_string(),
                contact_form_suffix: CONTACT_FORM_SUFFIX.to_string(),
            },
            generate_script,
        }
    }
}

impl PromptSet {
    /// Built-in prompts, with any sections present in `path` replacing them.
    /// Script prompts are merged per tool.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };

        let overrides: PromptSet = serde_json::from_str(&std::fs::read_to_string(path)?)?;
        let mut prompts = Self::default();
        prompts.page_analysis = overrides.page_analysis;
        prompts.generate_tests = overrides.generate_tests;
        prompts.generate_script.extend(overrides.generate_script);
        ::log::info!("Loaded prompt overrides from {}", path.display());
        Ok(prompts)
    }

    /// Script prompts for `tool`, falling back to the selenium pair
    pub fn script(&self, tool: TestingTool) -> &PromptPair {
        self.generate_script
            .get(tool.as_str())
            .or_else(|| self.generate_script.get(TestingTool::Selenium.as_str()))
            .unwrap_or_else(|| {
                FALLBACK_SCRIPT_PROMPT.get_or_init(|| PromptPair {
                    system: SELENIUM_SYSTEM.to_string(),
                    user: SCRIPT_USER.to_string(),
                })
            })
    }
}

static FALLBACK_SCRIPT_PROMPT: OnceLock<PromptPair> = OnceLock::new();

/// Substitutes `{name}` placeholders in one pass; unknown placeholders and
/// other braces are left untouched, and substituted values are never
/// re-expanded.
pub fn render(template: &str, vars: &[(&str, &str)]) -> String {
    static PLACEHOLDER: OnceLock<Regex> = OnceLock::new();
    let placeholder =
        PLACEHOLDER.get_or_init(|| Regex::new(r"\{([a-z_]+)\}").expect("valid regex"));

    placeholder
        .replace_all(template, |caps: &Captures<'_>| {
            let key = &caps[1];
            match vars.iter().find(|(name, _)| *name == key) {
                Some((_, value)) => value.to_string(),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

const ANALYSIS_SYSTEM: &str = "You are a senior QA engineer analysing web pages for automated \
regression testing. Answer with a single JSON object and nothing else.";

const ANALYSIS_USER: &str = r#"Analyse the page below and describe its testable behaviour.

Return a JSON object with these keys:
- "auth_requirements": {"auth_required": bool, "auth_type": string, "login_form_selector": string}
- "contact_form_fields": [{"form_selector": string, "fields": [{"name": string, "type": string, "required": bool}]}]
- "interactive_elements": [{"selector": string, "purpose": string}]
- "ui_validation_indicators": [{"selector": string, "meaning": string}]
- "security_indicators": [string]

Use empty lists or false when something is absent.

Page markup:
{page_source}"#;

const TESTS_SYSTEM: &str = "You are a QA lead designing concise, independent functional test \
cases for a single web page. Answer with JSON only.";

const TESTS_USER: &str = r#"Design test cases for the page "{title}" at {url}.

Page metadata:
{page_metadata}

Forms: {forms}
Interactive elements: {buttons}
Semantic elements: {interactive_elements}
Validation indicators: {ui_validation_indicators}

Page markup:
{page_source}

Return {"test_cases": [...]} where every test case has:
"name", "type" (e.g. navigation, form, auth, validation), "steps" (list of strings),
"selectors" (name -> CSS selector), "validation" (expected outcome) and
"test_data" (field -> value, may be empty).
{prompt_suffix}"#;

const TEST_DATA_SUFFIX: &str = r#"

This page needs input data. Use ONLY the values below in "test_data"; do not invent
credentials or field values. Use the valid sets for positive cases and the invalid sets
for negative cases.

Authentication requirements:
{auth_requirements}

Permitted test data:
{test_data}"#;

const CONTACT_FORM_SUFFIX: &str = r#"

The page has a contact form with these fields. Cover a successful submission and at
least one validation failure:
{contact_form_fields}"#;

const SELENIUM_SYSTEM: &str = "You write robust Selenium {selenium_version} end-to-end tests in \
{language}. Use explicit waits, stable selectors and clear PASS:/FAIL: log lines. Reply with a \
single fenced code block.";

const PLAYWRIGHT_SYSTEM: &str = "You write robust Playwright end-to-end tests in {language}. Use \
locators with auto-waiting and print clear PASS:/FAIL: lines. Reply with a single fenced code \
block.";

const PUPPETEER_SYSTEM: &str = "You write robust pyppeteer end-to-end tests in {language}. Use \
querySelector with explicit waits and print clear PASS:/FAIL: lines. Reply with a single fenced \
code block.";

const SCRIPT_USER: &str = r#"Write a complete, runnable {language} test script for this test case:
{test_case}

Page metadata:
{page_metadata}

Security indicators: {security_indicators}

Page markup:
{page_source}

If a CAPTCHA appears, wait up to {captcha_wait_time} for it to be solved manually before
continuing. Print "PASS: <step>" or "FAIL: <reason>" for every validation, exit with a
non-zero status on failure and always close the browser."#;
