//! Runs generated scripts in a subprocess and judges the outcome.

use crate::config::{GeneratorConfig, ScriptLanguage};
use crate::results::ExecutionResult;
use std::io::Write;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

/// Checked before success keywords; any hit means failure
pub const FAILURE_KEYWORDS: &[&str] = &[
    "[error] fail",
    "fail:",
    "failed:",
    "test failed",
    "assertion failed",
    "assertionerror",
    "validation result: false",
    "valid: false",
    "does not display correct",
    "does not match expected",
    "element not found",
    "timeout",
    "exception:",
    "[error]",
    "failed",
];

pub const SUCCESS_KEYWORDS: &[&str] = &[
    "pass:",
    "passed:",
    "test passed",
    "success:",
    "all tests passed",
    "validation successful",
    "test completed successfully",
    "test completed:",
];

pub const EMPTY_SCRIPT: &str = "Empty test script";
pub const TIMED_OUT: &str = "Test execution timed out";

/// Whether `source` mentions every required marker (driver import and locator symbol)
pub fn validate_script_structure(source: &str, required_markers: &[&str]) -> bool {
    let missing: Vec<&&str> = required_markers
        .iter()
        .filter(|marker| !source.contains(**marker))
        .collect();
    if !missing.is_empty() {
        ::log::warn!("Script is missing required markers: {:?}", missing);
        return false;
    }
    true
}

/// Pass/fail verdict over combined stdout+stderr.
///
/// Failure keywords win over success keywords, which win over the exit code.
/// A process killed by a signal has no exit code and counts as failed.
pub fn classify_output(output: &str, exit_code: Option<i32>) -> bool {
    let lower = output.to_lowercase();

    if let Some(keyword) = FAILURE_KEYWORDS.iter().find(|k| lower.contains(**k)) {
        ::log::debug!("Failure keyword found in output: {}", keyword);
        return false;
    }
    if let Some(keyword) = SUCCESS_KEYWORDS.iter().find(|k| lower.contains(**k)) {
        ::log::debug!("Success keyword found in output: {}", keyword);
        return true;
    }
    exit_code == Some(0)
}

pub struct ScriptExecutor {
    interpreter: Option<String>,
    language: ScriptLanguage,
    timeout: Duration,
}

impl ScriptExecutor {
    pub fn new(interpreter: Option<String>, language: ScriptLanguage, timeout: Duration) -> Self {
        Self {
            interpreter,
            language,
            timeout,
        }
    }

    pub fn from_config(config: &GeneratorConfig) -> Self {
        Self::new(
            config.interpreter(),
            config.language,
            config.execution_timeout(),
        )
    }

    /// False for languages that need a compile step (java, csharp)
    pub fn can_execute(&self) -> bool {
        self.interpreter.is_some()
    }

    /// Writes `source` to a temporary file and runs it under the timeout.
    ///
    /// Never returns an error: spawn failures, timeouts and empty scripts are
    /// all failed results. The temporary file is removed on every path.
    pub async fn execute_test_script(&self, source: &str) -> ExecutionResult {
        if source.trim().is_empty() {
            return ExecutionResult::failed(EMPTY_SCRIPT);
        }
        let Some(interpreter) = &self.interpreter else {
            return ExecutionResult::failed(format!(
                "No interpreter configured for {} scripts",
                self.language
            ));
        };

        let script = match self.write_temp(source) {
            Ok(script) => script,
            Err(e) => {
                ::log::error!("Failed to write temporary script: {}", e);
                return ExecutionResult::failed(e.to_string());
            }
        };

        ::log::info!("Executing {} with {}", script.path().display(), interpreter);
        let run = Command::new(interpreter)
            .arg(script.path())
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output();

        match tokio::time::timeout(self.timeout, run).await {
            Ok(Ok(output)) => {
                let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
                let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
                let combined = format!("{}\n{}", stdout, stderr);
                let success = classify_output(&combined, output.status.code());
                ::log::debug!("Script stdout:\n{}", stdout);
                if !stderr.is_empty() {
                    ::log::debug!("Script stderr:\n{}", stderr);
                }
                ExecutionResult {
                    success,
                    stdout,
                    stderr,
                    error: None,
                }
            }
            Ok(Err(e)) => {
                ::log::error!("Failed to run {}: {}", interpreter, e);
                ExecutionResult::failed(e.to_string())
            }
            Err(_) => {
                ::log::error!("Test execution timed out after {:?}", self.timeout);
                ExecutionResult::failed(TIMED_OUT)
            }
        }
    }

    fn write_temp(&self, source: &str) -> std::io::Result<tempfile::NamedTempFile> {
        let mut file = tempfile::Builder::new()
            .prefix("site_probe_")
            .suffix(&format!(".{}", self.language.extension()))
            .tempfile()?;
        file.write_all(source.as_bytes())?;
        file.flush()?;
        Ok(file)
    }
}
