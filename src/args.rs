use clap::{Parser, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "site-probe")]
#[command(about = "Crawls a web site, generates test scripts for its pages and runs them")]
#[command(version)]
pub struct Args {
    /// Seed URL to test
    pub url: String,

    /// Crawl same-host links from the seed and test every page found
    #[arg(short, long)]
    pub recursive: bool,

    /// Maximum link depth for recursive crawling
    #[arg(long, default_value_t = 1)]
    pub max_depth: usize,

    /// Regenerate page analyses even when a stored one matches
    #[arg(long)]
    pub no_cache: bool,

    /// Test framework the scripts target (selenium, playwright, puppeteer)
    #[arg(long)]
    pub testing_tool: Option<String>,

    /// Script language (python, java, csharp, javascript, ruby)
    #[arg(long)]
    pub language: Option<String>,

    /// Selenium version quoted in script prompts
    #[arg(long)]
    pub selenium_version: Option<String>,

    /// How long scripts wait for a CAPTCHA to be solved, e.g. "3 minutes"
    #[arg(long)]
    pub wait_time: Option<String>,

    /// Model provider configuration
    #[arg(long, default_value = "config/llm_config.json")]
    pub llm_config: PathBuf,

    /// Generator configuration; built-in defaults when omitted
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Logging level
    #[arg(long, value_enum, ignore_case = true, default_value_t = LogLevel::Info)]
    pub log_level: LogLevel,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
#[value(rename_all = "UPPER")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_filter(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}
