mod support;

use site_probe::Pipeline;
use site_probe::materializer::ScriptedOperator;
use site_probe::store::{MemoryStore, PageStore};
use std::sync::Arc;
use std::sync::atomic::Ordering;
use support::{FACTS, FakeBrowser, FakeGenerator, HOME, SCRIPT, TESTS, config_in};

fn read_report(path: &std::path::Path) -> serde_json::Value {
    serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
}

#[tokio::test]
async fn test_single_page_run_executes_selected_scripts() {
    let dir = tempfile::tempdir().unwrap();
    let browser = FakeBrowser::new([("https://example.com", HOME)]);
    let closed = browser.closed.clone();
    let generator = Arc::new(FakeGenerator::new(FACTS, TESTS, SCRIPT));
    let store = Arc::new(MemoryStore::new());

    let mut pipeline = Pipeline::new(
        config_in(dir.path()),
        Box::new(browser),
        Box::new(ScriptedOperator::new(["1", "2", "quit"])),
        generator.clone(),
        store.clone(),
    )
    .unwrap();
    let report_path = pipeline.run("https://example.com/", false, 1, false).await.unwrap();

    assert_eq!(closed.load(Ordering::SeqCst), 1);
    let report = read_report(&report_path);
    assert_eq!(report["pages_visited"], serde_json::json!(["https://example.com"]));
    assert_eq!(report["test_results"].as_array().unwrap().len(), 2);
    assert_eq!(report["success_rate"], 1.0);
    assert_eq!(report["test_summary"][0]["test_name"], "Login/Logout Test!!");
    assert_eq!(report["generated_scripts"].as_array().unwrap().len(), 2);

    let record = store.page("https://example.com").unwrap().unwrap();
    assert_eq!(record.test_cases_count, 2);
    assert_eq!(record.metadata["security_indicators"][0], "https");
    assert_eq!(record.metadata["forms"][0]["id"], "login");
}

#[tokio::test]
async fn test_unchanged_page_reuses_stored_analysis() {
    let dir = tempfile::tempdir().unwrap();
    let generator = Arc::new(FakeGenerator::new(FACTS, TESTS, SCRIPT));
    let store = Arc::new(MemoryStore::new());

    for _ in 0..2 {
        let mut pipeline = Pipeline::new(
            config_in(dir.path()),
            Box::new(FakeBrowser::new([("https://example.com", HOME)])),
            Box::new(ScriptedOperator::new(["quit"])),
            generator.clone(),
            store.clone(),
        )
        .unwrap();
        pipeline.run("https://example.com", false, 1, false).await.unwrap();
    }
    assert_eq!(generator.analysis_calls.load(Ordering::SeqCst), 1);
    assert_eq!(generator.test_calls.load(Ordering::SeqCst), 1);

    // --no-cache forces a fresh analysis
    let mut pipeline = Pipeline::new(
        config_in(dir.path()),
        Box::new(FakeBrowser::new([("https://example.com", HOME)])),
        Box::new(ScriptedOperator::new(["quit"])),
        generator.clone(),
        store.clone(),
    )
    .unwrap();
    pipeline.run("https://example.com", false, 1, true).await.unwrap();
    assert_eq!(generator.analysis_calls.load(Ordering::SeqCst), 2);

    // changed markup invalidates the stored analysis
    let changed = HOME.replace("Log in", "Sign in");
    let mut pipeline = Pipeline::new(
        config_in(dir.path()),
        Box::new(FakeBrowser::new([("https://example.com", changed.as_str())])),
        Box::new(ScriptedOperator::new(["quit"])),
        generator.clone(),
        store.clone(),
    )
    .unwrap();
    pipeline.run("https://example.com", false, 1, false).await.unwrap();
    assert_eq!(generator.analysis_calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_recursive_run_survives_failing_pages() {
    let dir = tempfile::tempdir().unwrap();
    let generator = Arc::new(FakeGenerator::new("not json", "not json either", SCRIPT));
    let browser = FakeBrowser::new([
        ("https://example.com", HOME),
        ("https://example.com/a", "<p>A</p>"),
        ("https://example.com/b", "<p>B</p>"),
    ]);

    let mut pipeline = Pipeline::new(
        config_in(dir.path()),
        Box::new(browser),
        Box::new(ScriptedOperator::new(Vec::<String>::new())),
        generator.clone(),
        Arc::new(MemoryStore::new()),
    )
    .unwrap();
    let report_path = pipeline.run("https://example.com", true, 1, false).await.unwrap();

    let report = read_report(&report_path);
    assert_eq!(report["pages_visited"].as_array().unwrap().len(), 3);
    assert_eq!(report["test_results"], serde_json::json!([]));
    assert_eq!(generator.script_calls.load(Ordering::SeqCst), 0);
    assert_eq!(pipeline.run_log().pages_visited[0], "https://example.com");
}

#[tokio::test]
async fn test_structurally_invalid_scripts_are_not_run() {
    let dir = tempfile::tempdir().unwrap();
    let generator = Arc::new(FakeGenerator::new(
        FACTS,
        TESTS,
        "```python\necho 'PASS: no imports here'\n```",
    ));
    let mut pipeline = Pipeline::new(
        config_in(dir.path()),
        Box::new(FakeBrowser::new([("https://example.com", HOME)])),
        Box::new(ScriptedOperator::new(["1", "quit"])),
        generator.clone(),
        Arc::new(MemoryStore::new()),
    )
    .unwrap();
    let report_path = pipeline.run("https://example.com", false, 1, false).await.unwrap();

    assert_eq!(generator.script_calls.load(Ordering::SeqCst), 1);
    assert_eq!(read_report(&report_path)["test_results"], serde_json::json!([]));
}

#[test]
fn test_unsupported_language_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = config_in(dir.path());
    config.testing_tool = "puppeteer".parse().unwrap();
    config.language = "ruby".parse().unwrap();

    let result = Pipeline::new(
        config,
        Box::new(FakeBrowser::default()),
        Box::new(ScriptedOperator::default()),
        Arc::new(FakeGenerator::new("{}", "{}", "")),
        Arc::new(MemoryStore::new()),
    );
    match result {
        Err(e) => assert!(e.is_config()),
        Ok(_) => panic!("ruby is not a puppeteer language"),
    }
}
