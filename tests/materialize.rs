mod support;

use site_probe::analysis::PageAnalysis;
use site_probe::materializer::{OperatorEvent, ScriptMaterializer, ScriptedOperator};
use site_probe::model::{PageMetadata, TestCaseEnvelope};
use site_probe::prompts::PromptSet;
use site_probe::store::MemoryStore;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use support::{FakeGenerator, SCRIPT, TESTS, config_in};

fn analysis() -> PageAnalysis {
    let envelope: TestCaseEnvelope = serde_json::from_str(TESTS).unwrap();
    PageAnalysis {
        url: "https://example.com".to_string(),
        metadata: PageMetadata::new(),
        test_cases: envelope.test_cases,
        minimized: "<html><body></body></html>".to_string(),
        from_cache: false,
    }
}

struct Fixture {
    _dir: tempfile::TempDir,
    generator: Arc<FakeGenerator>,
    store: Arc<MemoryStore>,
    materializer: ScriptMaterializer,
}

fn fixture(script: &str) -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let generator = Arc::new(FakeGenerator::new("{}", TESTS, script));
    let store = Arc::new(MemoryStore::new());
    let materializer = ScriptMaterializer::new(
        generator.clone(),
        store.clone(),
        Arc::new(PromptSet::default()),
        &config_in(dir.path()),
    );
    Fixture {
        _dir: dir,
        generator,
        store,
        materializer,
    }
}

#[tokio::test]
async fn test_generates_and_writes_sanitized_file() {
    let f = fixture(SCRIPT);
    let mut operator = ScriptedOperator::new(["1", "quit"]);
    let (scripts, selected) = f.materializer.materialize(&mut operator, &analysis()).await;

    assert_eq!(scripts.len(), 1);
    assert_eq!(selected[0].name, "Login/Logout Test!!");
    assert!(scripts[0].source.starts_with("# from selenium import webdriver"));

    let path = std::path::Path::new(&scripts[0].filename);
    assert_eq!(std::fs::read_to_string(path).unwrap(), scripts[0].source);
    let name = path.file_name().unwrap().to_str().unwrap();
    assert!(name.starts_with("test_") && name.ends_with("_Login_Logout_Test.py"));
    let stem = name.trim_end_matches(".py");
    assert!(stem.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-'));
    assert!(!stem.contains("__"));
}

#[tokio::test]
async fn test_declining_regeneration_reuses_script() {
    let f = fixture(SCRIPT);
    let page = analysis();

    let (first, _) = f
        .materializer
        .materialize(&mut ScriptedOperator::new(["1", "quit"]), &page)
        .await;
    let (second, selected) = f
        .materializer
        .materialize(&mut ScriptedOperator::new(["1", "n", "quit"]), &page)
        .await;

    assert_eq!(first, second);
    assert_eq!(selected.len(), 1);
    assert_eq!(f.generator.script_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_regeneration_overwrites_in_place() {
    let f = fixture(SCRIPT);
    let page = analysis();
    f.materializer
        .materialize(&mut ScriptedOperator::new(["1", "quit"]), &page)
        .await;

    let mut operator = ScriptedOperator::new(["1", "maybe", "Y", "quit"]);
    let (scripts, _) = f.materializer.materialize(&mut operator, &page).await;

    assert_eq!(scripts.len(), 1);
    assert_eq!(f.generator.script_calls.load(Ordering::SeqCst), 2);
    assert_eq!(f.store.script_count(), 1);
    assert!(operator.transcript().contains("Please enter 'y' or 'n'."));
}

#[tokio::test]
async fn test_bad_input_is_reported_and_loop_continues() {
    let f = fixture(SCRIPT);
    let mut operator = ScriptedOperator::new(["7", "abc", "list", "2", "quit", "1"]);
    let (scripts, selected) = f.materializer.materialize(&mut operator, &analysis()).await;

    let transcript = operator.transcript();
    assert!(transcript.contains("Invalid test case number. Please choose between 1 and 2."));
    assert!(transcript.contains("Invalid input. Please enter a number, 'list', or 'quit'."));
    assert_eq!(transcript.matches("Available test cases:").count(), 2);

    // "quit" stops before the trailing "1"
    assert_eq!(scripts.len(), 1);
    assert_eq!(selected[0].name, "Navigation");
}

#[tokio::test]
async fn test_interrupt_returns_partial_results() {
    let f = fixture(SCRIPT);
    let mut operator = ScriptedOperator::new(["2"]);
    operator.push(OperatorEvent::Interrupt);
    operator.push(OperatorEvent::Line("1".to_string()));

    let (scripts, _) = f.materializer.materialize(&mut operator, &analysis()).await;
    assert_eq!(scripts.len(), 1);
    assert_eq!(f.generator.script_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_case_error_is_shown_and_loop_continues() {
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("not_a_dir");
    std::fs::write(&blocker, "").unwrap();
    let mut config = config_in(dir.path());
    config.scripts_dir = blocker.join("test_scripts");

    let generator = Arc::new(FakeGenerator::new("{}", TESTS, SCRIPT));
    let materializer = ScriptMaterializer::new(
        generator.clone(),
        Arc::new(MemoryStore::new()),
        Arc::new(PromptSet::default()),
        &config,
    );
    let mut operator = ScriptedOperator::new(["1", "2", "quit"]);
    let (scripts, _) = materializer.materialize(&mut operator, &analysis()).await;

    assert!(scripts.is_empty());
    assert_eq!(generator.script_calls.load(Ordering::SeqCst), 2);
    assert_eq!(operator.transcript().matches("Error occurred: ").count(), 2);
}

#[tokio::test]
async fn test_empty_generation_is_skipped() {
    let f = fixture("```python\n\n```");
    let mut operator = ScriptedOperator::new(["1", "quit"]);
    let (scripts, selected) = f.materializer.materialize(&mut operator, &analysis()).await;
    assert!(scripts.is_empty() && selected.is_empty());
    assert_eq!(f.store.script_count(), 0);
}
