use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

/// Outcome of running one script
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub success: bool,

    #[serde(default)]
    pub stdout: String,

    #[serde(default)]
    pub stderr: String,

    /// Why the run could not be judged normally (timeout, spawn failure, empty script)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ExecutionResult {
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            stdout: String::new(),
            stderr: String::new(),
            error: Some(error.into()),
        }
    }
}

/// One executed script, as recorded in the run log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestResult {
    pub timestamp: DateTime<Local>,
    pub url: String,
    pub test_name: String,
    pub file_name: String,
    pub result: ExecutionResult,
}

/// Everything the report is built from
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunLog {
    pub start_time: DateTime<Local>,
    pub pages_visited: Vec<String>,
    pub test_results: Vec<TestResult>,
}

impl Default for RunLog {
    fn default() -> Self {
        Self::new()
    }
}

impl RunLog {
    pub fn new() -> Self {
        Self {
            start_time: Local::now(),
            pages_visited: Vec::new(),
            test_results: Vec::new(),
        }
    }

    pub fn visit(&mut self, url: &str) {
        if !self.pages_visited.iter().any(|u| u == url) {
            self.pages_visited.push(url.to_string());
        }
    }

    pub fn record(&mut self, result: TestResult) {
        self.test_results.push(result);
    }

    pub fn passed(&self) -> usize {
        self.test_results.iter().filter(|r| r.result.success).count()
    }

    /// Fraction of recorded runs that passed; 0 when nothing ran
    pub fn success_rate(&self) -> f64 {
        if self.test_results.is_empty() {
            return 0.0;
        }
        self.passed() as f64 / self.test_results.len() as f64
    }
}
