use crate::config::ScriptLanguage;
use crate::error::Result;
use crate::results::{RunLog, TestResult};
use crate::utils::file_timestamp;
use chrono::{DateTime, Local};
use serde::Serialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Serialize)]
struct TestSummary<'a> {
    test_name: &'a str,
    file_name: &'a str,
    success: bool,
    timestamp: DateTime<Local>,
}

#[derive(Debug, Serialize)]
struct Report<'a> {
    start_time: DateTime<Local>,
    pages_visited: &'a [String],
    test_results: &'a [TestResult],
    success_rate: f64,
    generated_scripts: Vec<String>,
    test_summary: Vec<TestSummary<'a>>,
}

/// Writes `test_report_<timestamp>.json` under `reports_dir` and returns its path
pub fn write_report(run_log: &RunLog, scripts_dir: &Path, reports_dir: &Path) -> Result<PathBuf> {
    let report = Report {
        start_time: run_log.start_time,
        pages_visited: &run_log.pages_visited,
        test_results: &run_log.test_results,
        success_rate: run_log.success_rate(),
        generated_scripts: generated_scripts(scripts_dir),
        test_summary: run_log
            .test_results
            .iter()
            .map(|r| TestSummary {
                test_name: &r.test_name,
                file_name: &r.file_name,
                success: r.result.success,
                timestamp: r.timestamp,
            })
            .collect(),
    };

    std::fs::create_dir_all(reports_dir)?;
    let path = reports_dir.join(format!("test_report_{}.json", file_timestamp(Local::now())));
    std::fs::write(&path, serde_json::to_string_pretty(&report)?)?;

    ::log::info!(
        "Report written to {} ({} results, success rate {:.2})",
        path.display(),
        run_log.test_results.len(),
        report.success_rate
    );
    Ok(path)
}

/// Script file names in `scripts_dir`, sorted; empty when the directory is missing
fn generated_scripts(scripts_dir: &Path) -> Vec<String> {
    let Ok(entries) = std::fs::read_dir(scripts_dir) else {
        return Vec::new();
    };
    let mut names: Vec<String> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| ScriptLanguage::ALL.iter().any(|l| l.extension() == ext))
        })
        .filter_map(|path| path.file_name().map(|n| n.to_string_lossy().into_owned()))
        .collect();
    names.sort();
    names
}
