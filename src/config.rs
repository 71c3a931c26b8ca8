use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// Browser automation framework the generated scripts target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestingTool {
    Selenium,
    Playwright,
    Puppeteer,
}

impl TestingTool {
    pub fn as_str(&self) -> &'static str {
        match self {
            TestingTool::Selenium => "selenium",
            TestingTool::Playwright => "playwright",
            TestingTool::Puppeteer => "puppeteer",
        }
    }

    /// Languages scripts can be generated in for this tool
    pub fn supported_languages(&self) -> &'static [ScriptLanguage] {
        use ScriptLanguage::*;
        match self {
            TestingTool::Selenium => &[Python, Java, CSharp, JavaScript, Ruby],
            TestingTool::Playwright => &[Python, JavaScript, CSharp, Java],
            TestingTool::Puppeteer => &[Python],
        }
    }

    /// Text a script must contain before it is allowed to run: the driver
    /// import and the element locator symbol.
    pub fn required_markers(&self, language: ScriptLanguage) -> &'static [&'static str] {
        match (self, language) {
            (TestingTool::Selenium, ScriptLanguage::Python) => {
                &["from selenium import webdriver", "By"]
            }
            (TestingTool::Selenium, ScriptLanguage::JavaScript) => &["selenium-webdriver", "By"],
            (TestingTool::Selenium, ScriptLanguage::Ruby) => &["selenium-webdriver", "find_element"],
            (TestingTool::Selenium, ScriptLanguage::Java) => &["org.openqa.selenium", "By"],
            (TestingTool::Selenium, ScriptLanguage::CSharp) => &["OpenQA.Selenium", "By"],
            (TestingTool::Playwright, _) => &["playwright", "locator"],
            (TestingTool::Puppeteer, _) => &["pyppeteer", "querySelector"],
        }
    }
}

impl FromStr for TestingTool {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "selenium" => Ok(TestingTool::Selenium),
            "playwright" => Ok(TestingTool::Playwright),
            "puppeteer" => Ok(TestingTool::Puppeteer),
            other => Err(Error::Config(format!("Unsupported testing tool: {}", other))),
        }
    }
}

impl fmt::Display for TestingTool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Language of generated test scripts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScriptLanguage {
    Python,
    Java,
    #[serde(rename = "csharp")]
    CSharp,
    #[serde(rename = "javascript")]
    JavaScript,
    Ruby,
}

impl ScriptLanguage {
    pub const ALL: [ScriptLanguage; 5] = [
        ScriptLanguage::Python,
        ScriptLanguage::Java,
        ScriptLanguage::CSharp,
        ScriptLanguage::JavaScript,
        ScriptLanguage::Ruby,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ScriptLanguage::Python => "python",
            ScriptLanguage::Java => "java",
            ScriptLanguage::CSharp => "csharp",
            ScriptLanguage::JavaScript => "javascript",
            ScriptLanguage::Ruby => "ruby",
        }
    }

    /// Markdown fence tags a model may use for this language
    pub fn fence_tags(&self) -> &'static [&'static str] {
        match self {
            ScriptLanguage::Python => &["python", "py"],
            ScriptLanguage::Java => &["java"],
            ScriptLanguage::CSharp => &["csharp", "cs", "c#"],
            ScriptLanguage::JavaScript => &["javascript", "js"],
            ScriptLanguage::Ruby => &["ruby", "rb"],
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ScriptLanguage::Python => "py",
            ScriptLanguage::Java => "java",
            ScriptLanguage::CSharp => "cs",
            ScriptLanguage::JavaScript => "js",
            ScriptLanguage::Ruby => "rb",
        }
    }

    /// Default interpreter for scripts that can be run directly
    pub fn interpreter(&self) -> Option<&'static str> {
        match self {
            ScriptLanguage::Python => Some("python"),
            ScriptLanguage::JavaScript => Some("node"),
            ScriptLanguage::Ruby => Some("ruby"),
            ScriptLanguage::Java | ScriptLanguage::CSharp => None,
        }
    }
}

impl FromStr for ScriptLanguage {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let lower = s.to_lowercase();
        ScriptLanguage::ALL
            .into_iter()
            .find(|lang| lang.as_str() == lower)
            .ok_or_else(|| Error::Config(format!("Unsupported language: {}", s)))
    }
}

impl fmt::Display for ScriptLanguage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Configuration for the crawl/generate/execute pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratorConfig {
    /// Framework the generated scripts target
    #[serde(default = "default_testing_tool")]
    pub testing_tool: TestingTool,

    /// Language of the generated scripts
    #[serde(default = "default_language")]
    pub language: ScriptLanguage,

    /// Selenium version quoted in script prompts
    #[serde(default = "default_selenium_version")]
    pub selenium_version: String,

    /// Wait hint given to scripts for manual CAPTCHA solving
    #[serde(default)]
    pub captcha_wait_time: String,

    /// Directory generated scripts are written to
    #[serde(default = "default_scripts_dir")]
    pub scripts_dir: PathBuf,

    /// Directory run reports are written to
    #[serde(default = "default_reports_dir")]
    pub reports_dir: PathBuf,

    /// Wall-clock limit for one script execution, in seconds
    #[serde(default = "default_execution_timeout_secs")]
    pub execution_timeout_secs: u64,

    /// Pause before each crawl navigation, in milliseconds
    #[serde(default = "default_crawl_pause_ms")]
    pub crawl_pause_ms: u64,

    /// Maximum wait for a page body to appear, in seconds
    #[serde(default = "default_page_ready_secs")]
    pub page_ready_secs: u64,

    /// URL for the WebDriver instance
    #[serde(default = "default_webdriver_url")]
    pub webdriver_url: String,

    /// SQLite file holding page records and scripts
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,

    /// Credential / form value fixture
    #[serde(default = "default_test_data_path")]
    pub test_data_path: PathBuf,

    /// Optional JSON file overriding the built-in prompts
    #[serde(default)]
    pub prompts_path: Option<PathBuf>,

    /// Interpreter override for python scripts
    #[serde(default)]
    pub python_bin: Option<String>,
}

fn default_testing_tool() -> TestingTool {
    TestingTool::Selenium
}

fn default_language() -> ScriptLanguage {
    ScriptLanguage::Python
}

fn default_selenium_version() -> String {
    "4.15.2".to_string()
}

fn default_scripts_dir() -> PathBuf {
    PathBuf::from("test_scripts")
}

fn default_reports_dir() -> PathBuf {
    PathBuf::from("reports")
}

fn default_execution_timeout_secs() -> u64 {
    30
}

fn default_crawl_pause_ms() -> u64 {
    1000
}

fn default_page_ready_secs() -> u64 {
    10
}

fn default_webdriver_url() -> String {
    "http://localhost:4444".to_string()
}

fn default_database_path() -> PathBuf {
    PathBuf::from("site_probe.db")
}

fn default_test_data_path() -> PathBuf {
    PathBuf::from("config/auth_test_data.json")
}

/// Default CAPTCHA wait hint when none is configured
pub const DEFAULT_CAPTCHA_WAIT: &str = "2 minutes (120 seconds)";

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            testing_tool: default_testing_tool(),
            language: default_language(),
            selenium_version: default_selenium_version(),
            captcha_wait_time: String::new(),
            scripts_dir: default_scripts_dir(),
            reports_dir: default_reports_dir(),
            execution_timeout_secs: default_execution_timeout_secs(),
            crawl_pause_ms: default_crawl_pause_ms(),
            page_ready_secs: default_page_ready_secs(),
            webdriver_url: default_webdriver_url(),
            database_path: default_database_path(),
            test_data_path: default_test_data_path(),
            prompts_path: None,
            python_bin: None,
        }
    }
}

impl GeneratorConfig {
    /// Load configuration from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config: Self = serde_json::from_str(&read_file(path)?)?;
        Ok(config)
    }

    /// Rejects tool/language pairs no script template exists for
    pub fn validate(&self) -> Result<()> {
        let supported = self.testing_tool.supported_languages();
        if !supported.contains(&self.language) {
            let names: Vec<&str> = supported.iter().map(|l| l.as_str()).collect();
            return Err(Error::Config(format!(
                "'{}' not supported for {}. Valid options: {}",
                self.language,
                self.testing_tool,
                names.join(", ")
            )));
        }
        Ok(())
    }

    pub fn captcha_wait(&self) -> &str {
        if self.captcha_wait_time.trim().is_empty() {
            DEFAULT_CAPTCHA_WAIT
        } else {
            &self.captcha_wait_time
        }
    }

    pub fn execution_timeout(&self) -> Duration {
        Duration::from_secs(self.execution_timeout_secs)
    }

    pub fn crawl_pause(&self) -> Duration {
        Duration::from_millis(self.crawl_pause_ms)
    }

    pub fn page_ready_timeout(&self) -> Duration {
        Duration::from_secs(self.page_ready_secs)
    }

    /// Interpreter for the configured language, if scripts can run directly
    pub fn interpreter(&self) -> Option<String> {
        match (self.language, &self.python_bin) {
            (ScriptLanguage::Python, Some(bin)) => Some(bin.clone()),
            (lang, _) => lang.interpreter().map(str::to_string),
        }
    }
}

/// Model provider the text generator talks to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Provider {
    OpenAi,
    Groq,
    GoogleGemini,
    Ollama,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::OpenAi => "openai",
            Provider::Groq => "groq",
            Provider::GoogleGemini => "google-gemini",
            Provider::Ollama => "ollama",
        }
    }

    /// OpenAI-compatible chat completions base URL
    pub fn default_base_url(&self) -> &'static str {
        match self {
            Provider::OpenAi => "https://api.openai.com/v1",
            Provider::Groq => "https://api.groq.com/openai/v1",
            Provider::GoogleGemini => "https://generativelanguage.googleapis.com/v1beta/openai",
            Provider::Ollama => "http://localhost:11434/v1",
        }
    }

    /// Environment variable holding the API key
    pub fn api_key_env(&self) -> Option<&'static str> {
        match self {
            Provider::OpenAi => Some("OPENAI_API_KEY"),
            Provider::Groq => Some("GROQ_API_KEY"),
            Provider::GoogleGemini => Some("GOOGLE_API_KEY"),
            Provider::Ollama => None,
        }
    }
}

impl FromStr for Provider {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "openai" => Ok(Provider::OpenAi),
            "groq" => Ok(Provider::Groq),
            "google-gemini" | "gemini" => Ok(Provider::GoogleGemini),
            "ollama" => Ok(Provider::Ollama),
            other => Err(Error::Config(format!("Unsupported provider: {}", other))),
        }
    }
}

/// Per-provider model selection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelSettings {
    /// Model used for page analysis and test case synthesis
    pub analysis_model: String,

    /// Model used for script synthesis
    #[serde(alias = "selenium_model")]
    pub script_model: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Override for the provider's API base URL
    #[serde(default)]
    pub base_url: Option<String>,
}

fn default_temperature() -> f32 {
    0.3
}

/// Text generation configuration file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    pub model_provider: String,

    #[serde(default)]
    pub model_settings: HashMap<String, ModelSettings>,
}

impl LlmConfig {
    /// Load configuration from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config: Self = serde_json::from_str(&read_file(path)?)?;
        Ok(config)
    }

    /// Resolves the selected provider and its settings
    pub fn resolve(&self) -> Result<(Provider, ModelSettings)> {
        let provider: Provider = self.model_provider.parse()?;
        let settings = self
            .model_settings
            .get(provider.as_str())
            .or_else(|| self.model_settings.get(&self.model_provider))
            .cloned()
            .ok_or_else(|| {
                Error::Config(format!(
                    "No model_settings entry for provider {}",
                    provider.as_str()
                ))
            })?;
        Ok((provider, settings))
    }
}

fn read_file<P: AsRef<Path>>(path: P) -> Result<String> {
    let mut file = File::open(path)?;
    let mut contents = String::new();
    file.read_to_string(&mut contents)?;
    Ok(contents)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = GeneratorConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.captcha_wait(), "2 minutes (120 seconds)");
        assert_eq!(config.execution_timeout(), Duration::from_secs(30));
        assert_eq!(config.scripts_dir, PathBuf::from("test_scripts"));
    }

    #[test]
    fn test_unsupported_language_is_fatal() {
        let config = GeneratorConfig {
            testing_tool: TestingTool::Puppeteer,
            language: ScriptLanguage::Java,
            ..GeneratorConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.is_config());
        assert!(err.to_string().contains("'java' not supported for puppeteer"));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: GeneratorConfig =
            serde_json::from_str(r#"{"testing_tool":"playwright","language":"javascript"}"#)
                .unwrap();
        assert_eq!(config.testing_tool, TestingTool::Playwright);
        assert_eq!(config.language, ScriptLanguage::JavaScript);
        assert_eq!(config.webdriver_url, "http://localhost:4444");
        assert_eq!(config.interpreter().as_deref(), Some("node"));
    }

    #[test]
    fn test_language_parse() {
        assert_eq!("Python".parse::<ScriptLanguage>().unwrap(), ScriptLanguage::Python);
        assert_eq!("csharp".parse::<ScriptLanguage>().unwrap(), ScriptLanguage::CSharp);
        assert!("cobol".parse::<ScriptLanguage>().unwrap_err().is_config());
    }

    #[test]
    fn test_llm_config_resolution() {
        let config: LlmConfig = serde_json::from_str(
            r#"{"model_provider":"groq","model_settings":{
                "groq":{"analysis_model":"llama-3.3-70b","selenium_model":"llama-3.3-70b","temperature":0.2}}}"#,
        )
        .unwrap();
        let (provider, settings) = config.resolve().unwrap();
        assert_eq!(provider, Provider::Groq);
        assert_eq!(settings.script_model, "llama-3.3-70b");
        assert!((settings.temperature - 0.2).abs() < f32::EPSILON);
    }

    #[test]
    fn test_unknown_provider_is_fatal() {
        let config = LlmConfig {
            model_provider: "mystery".to_string(),
            model_settings: HashMap::new(),
        };
        assert!(config.resolve().unwrap_err().is_config());

        let missing = LlmConfig {
            model_provider: "openai".to_string(),
            model_settings: HashMap::new(),
        };
        assert!(missing.resolve().unwrap_err().is_config());
    }
}
