//! Interactive selection of test cases and generation of their scripts.
//!
//! The operator picks cases from a numbered menu. A case already
//! materialized for the same page (same URL, structurally equal spec) is
//! offered for reuse before anything is regenerated.

use crate::analysis::PageAnalysis;
use crate::config::{GeneratorConfig, ScriptLanguage, TestingTool};
use crate::error::Result;
use crate::interrupt::InterruptRouter;
use crate::llm::{Purpose, TextGenerator};
use crate::model::{PageMetadata, ScriptArtifact, TestCaseSpec};
use crate::parsers::response::extract_script;
use crate::prompts::{PromptSet, render};
use crate::store::PageStore;
use crate::utils::script_file_name;
use async_trait::async_trait;
use chrono::Local;
use serde_json::Value;
use std::collections::VecDeque;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

pub const SELECTION_PROMPT: &str =
    "\nEnter test case number, 'list' to show cases, or 'quit' to stop: ";
pub const INVALID_INPUT: &str = "Invalid input. Please enter a number, 'list', or 'quit'.";

/// One thing the operator did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperatorEvent {
    Line(String),
    /// Ctrl-C; handled like `quit`
    Interrupt,
    /// Input closed; handled like `quit`
    Eof,
}

/// Line-oriented operator console
#[async_trait]
pub trait Operator: Send {
    /// Shows `prompt` and waits, without timeout, for the next event
    async fn next_event(&mut self, prompt: &str) -> OperatorEvent;

    fn show(&mut self, text: &str);
}

/// Operator on the process's stdin/stdout. Ctrl-C pressed while it waits
/// arrives through `interrupts` as [`OperatorEvent::Interrupt`].
pub struct ConsoleOperator {
    lines: Lines<BufReader<Stdin>>,
    interrupts: Arc<InterruptRouter>,
}

impl ConsoleOperator {
    pub fn new(interrupts: Arc<InterruptRouter>) -> Self {
        Self {
            lines: BufReader::new(tokio::io::stdin()).lines(),
            interrupts,
        }
    }
}

#[async_trait]
impl Operator for ConsoleOperator {
    async fn next_event(&mut self, prompt: &str) -> OperatorEvent {
        print!("{}", prompt);
        let _ = std::io::stdout().flush();

        let mut prompting = self.interrupts.prompt();
        tokio::select! {
            line = self.lines.next_line() => match line {
                Ok(Some(line)) => OperatorEvent::Line(line),
                Ok(None) => OperatorEvent::Eof,
                Err(e) => {
                    ::log::error!("Failed to read operator input: {}", e);
                    OperatorEvent::Eof
                }
            },
            _ = prompting.interrupted() => {
                println!();
                OperatorEvent::Interrupt
            }
        }
    }

    fn show(&mut self, text: &str) {
        println!("{}", text);
    }
}

/// Replays a fixed list of events and records everything shown
#[derive(Debug, Default)]
pub struct ScriptedOperator {
    events: VecDeque<OperatorEvent>,
    pub shown: Vec<String>,
}

impl ScriptedOperator {
    pub fn new<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            events: lines
                .into_iter()
                .map(|l| OperatorEvent::Line(l.into()))
                .collect(),
            shown: Vec::new(),
        }
    }

    pub fn push(&mut self, event: OperatorEvent) {
        self.events.push_back(event);
    }

    pub fn transcript(&self) -> String {
        self.shown.join("\n")
    }
}

#[async_trait]
impl Operator for ScriptedOperator {
    async fn next_event(&mut self, _prompt: &str) -> OperatorEvent {
        self.events.pop_front().unwrap_or(OperatorEvent::Eof)
    }

    fn show(&mut self, text: &str) {
        self.shown.push(text.to_string());
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Selection {
    Quit,
    List,
    Case(usize),
    OutOfRange,
    Invalid,
}

fn parse_selection(input: &str, count: usize) -> Selection {
    let input = input.trim().to_lowercase();
    match input.as_str() {
        "quit" => Selection::Quit,
        "list" => Selection::List,
        _ => match input.parse::<usize>() {
            Ok(n) if (1..=count).contains(&n) => Selection::Case(n - 1),
            Ok(_) => Selection::OutOfRange,
            Err(_) => Selection::Invalid,
        },
    }
}

/// Numbered menu of test cases
pub fn format_menu(cases: &[TestCaseSpec]) -> String {
    let mut out = String::from("\nAvailable test cases:");
    for (i, case) in cases.iter().enumerate() {
        out.push_str(&format!("\n{}. {}", i + 1, case.display_name()));
        out.push_str(&format!("\n   Type: {}", case.kind));
        out.push_str(&format!("\n   Steps: {} step(s)", case.steps.len()));
        for step in &case.steps {
            out.push_str(&format!("\n      - {}", step));
        }
        out.push_str(&format!("\n   Validation: {}", case.validation));
    }
    out
}

/// A script ready to run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaterializedScript {
    pub source: String,
    /// Where the script was written
    pub filename: String,
}

impl From<&ScriptArtifact> for MaterializedScript {
    fn from(artifact: &ScriptArtifact) -> Self {
        Self {
            source: artifact.source_text.clone(),
            filename: artifact.storage_path.clone(),
        }
    }
}

enum State {
    AwaitingSelection,
    AwaitingRegenConfirmation {
        index: usize,
        existing: ScriptArtifact,
    },
    Generating {
        index: usize,
    },
    Done,
}

pub struct ScriptMaterializer {
    generator: Arc<dyn TextGenerator>,
    store: Arc<dyn PageStore>,
    prompts: Arc<PromptSet>,
    tool: TestingTool,
    language: ScriptLanguage,
    selenium_version: String,
    captcha_wait: String,
    scripts_dir: PathBuf,
}

impl ScriptMaterializer {
    pub fn new(
        generator: Arc<dyn TextGenerator>,
        store: Arc<dyn PageStore>,
        prompts: Arc<PromptSet>,
        config: &GeneratorConfig,
    ) -> Self {
        Self {
            generator,
            store,
            prompts,
            tool: config.testing_tool,
            language: config.language,
            selenium_version: config.selenium_version.clone(),
            captcha_wait: config.captcha_wait().to_string(),
            scripts_dir: config.scripts_dir.clone(),
        }
    }

    /// Runs the selection loop for one page until `quit`, Ctrl-C or end of
    /// input, returning the scripts and the specs they were made from (in
    /// selection order).
    pub async fn materialize(
        &self,
        operator: &mut dyn Operator,
        analysis: &PageAnalysis,
    ) -> (Vec<MaterializedScript>, Vec<TestCaseSpec>) {
        let cases = &analysis.test_cases;
        let mut scripts = Vec::new();
        let mut selected = Vec::new();

        if cases.is_empty() {
            ::log::info!("No test cases to materialize for {}", analysis.url);
            return (scripts, selected);
        }

        operator.show(&format_menu(cases));
        let mut state = State::AwaitingSelection;

        loop {
            state = match state {
                State::Done => break,

                State::AwaitingSelection => {
                    let line = match operator.next_event(SELECTION_PROMPT).await {
                        OperatorEvent::Line(line) => line,
                        OperatorEvent::Interrupt => {
                            ::log::info!("Interrupted, stopping test case selection");
                            break;
                        }
                        OperatorEvent::Eof => break,
                    };

                    match parse_selection(&line, cases.len()) {
                        Selection::Quit => State::Done,
                        Selection::List => {
                            operator.show(&format_menu(cases));
                            State::AwaitingSelection
                        }
                        Selection::OutOfRange => {
                            operator.show(&format!(
                                "Invalid test case number. Please choose between 1 and {}.",
                                cases.len()
                            ));
                            State::AwaitingSelection
                        }
                        Selection::Invalid => {
                            operator.show(INVALID_INPUT);
                            State::AwaitingSelection
                        }
                        Selection::Case(index) => {
                            match self.store.find_script(&analysis.url, &cases[index]) {
                                Ok(Some(existing)) => {
                                    State::AwaitingRegenConfirmation { index, existing }
                                }
                                Ok(None) => State::Generating { index },
                                Err(e) => {
                                    ::log::error!(
                                        "Failed to look up script for '{}': {}",
                                        cases[index].display_name(),
                                        e
                                    );
                                    operator.show(&format!("Error occurred: {}", e));
                                    State::AwaitingSelection
                                }
                            }
                        }
                    }
                }

                State::AwaitingRegenConfirmation { index, existing } => {
                    let prompt = format!(
                        "A script already exists for '{}'. Regenerate? (y/n): ",
                        cases[index].display_name()
                    );
                    match operator.next_event(&prompt).await {
                        OperatorEvent::Line(line) => match line.trim().to_lowercase().as_str() {
                            "y" => State::Generating { index },
                            "n" => {
                                ::log::info!("Reusing stored script {}", existing.storage_path);
                                operator.show(&format!("Using existing script: {}", existing.file_name()));
                                scripts.push(MaterializedScript::from(&existing));
                                selected.push(cases[index].clone());
                                State::AwaitingSelection
                            }
                            _ => {
                                operator.show("Please enter 'y' or 'n'.");
                                State::AwaitingRegenConfirmation { index, existing }
                            }
                        },
                        OperatorEvent::Interrupt | OperatorEvent::Eof => State::Done,
                    }
                }

                State::Generating { index } => {
                    let spec = &cases[index];
                    match self.materialize_case(analysis, spec).await {
                        Ok(Some(script)) => {
                            operator.show(&format!("Generated script: {}", script.filename));
                            scripts.push(script);
                            selected.push(spec.clone());
                        }
                        Ok(None) => {
                            operator.show(&format!(
                                "No script could be generated for '{}'.",
                                spec.display_name()
                            ));
                        }
                        Err(e) => {
                            ::log::error!(
                                "Script generation failed for '{}': {}",
                                spec.display_name(),
                                e
                            );
                            operator.show(&format!("Error occurred: {}", e));
                        }
                    }
                    State::AwaitingSelection
                }
            };
        }

        (scripts, selected)
    }

    /// Generates, writes and records the script for one case. `None` when the
    /// model returned no usable source.
    async fn materialize_case(
        &self,
        analysis: &PageAnalysis,
        spec: &TestCaseSpec,
    ) -> Result<Option<MaterializedScript>> {
        let Some((source, path)) = self
            .generate_script(spec, &analysis.metadata, &analysis.minimized)
            .await?
        else {
            return Ok(None);
        };

        let artifact = ScriptArtifact {
            page_url: analysis.url.clone(),
            test_case_name: spec.display_name().to_string(),
            test_case_type: spec.kind.clone(),
            test_case_spec: spec.clone(),
            source_text: source,
            storage_path: path.to_string_lossy().into_owned(),
        };
        self.store.save_script(&artifact)?;
        Ok(Some(MaterializedScript::from(&artifact)))
    }

    /// Asks for a script, strips the fence and writes it under the scripts
    /// directory. Returns the source and its path, or `None` if the
    /// extracted source is empty.
    pub async fn generate_script(
        &self,
        spec: &TestCaseSpec,
        metadata: &PageMetadata,
        minimized: &str,
    ) -> Result<Option<(String, PathBuf)>> {
        let templates = self.prompts.script(self.tool);
        let language = self.language.as_str();

        let system = render(
            &templates.system,
            &[
                ("selenium_version", &self.selenium_version),
                ("language", language),
            ],
        );
        let test_case = serde_json::to_string_pretty(spec)?;
        let page_metadata = serde_json::to_string_pretty(metadata)?;
        let security_indicators = metadata
            .get("security_indicators")
            .map(Value::to_string)
            .unwrap_or_else(|| "[]".to_string());
        let user = render(
            &templates.user,
            &[
                ("language", language),
                ("selenium_version", &self.selenium_version),
                ("test_case", &test_case),
                ("page_metadata", &page_metadata),
                ("page_source", minimized),
                ("captcha_wait_time", &self.captcha_wait),
                ("security_indicators", &security_indicators),
            ],
        );

        ::log::info!("Generating script for '{}'", spec.display_name());
        let raw = self.generator.generate(&system, &user, Purpose::Script).await?;
        ::log::debug!("Raw script generation response: {}", raw);

        let extracted = extract_script(&raw, self.language);
        if let Some(found) = extracted.language.filter(|l| *l != self.language) {
            ::log::warn!("Expected a {} script but got {}", self.language, found);
        }
        if extracted.source.trim().is_empty() {
            ::log::warn!("Empty script returned for '{}'", spec.display_name());
            return Ok(None);
        }

        tokio::fs::create_dir_all(&self.scripts_dir).await?;
        let path = self.scripts_dir.join(script_file_name(
            spec.display_name(),
            Local::now(),
            self.language.extension(),
        ));
        tokio::fs::write(&path, &extracted.source).await?;
        ::log::info!("Saved script to {}", path.display());

        Ok(Some((extracted.source, path)))
    }
}
