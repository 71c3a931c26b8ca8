use crate::llm::{Purpose, TextGenerator};
use crate::model::{PageMetadata, TestCaseEnvelope, TestCaseSpec};
use crate::parsers::response::{ParsedResponse, parse_json};
use crate::prompts::{PromptSet, render};
use crate::testdata::{TestDataFixture, validate_auth_test_data_usage};
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;

/// Turns merged page metadata into test case specifications
pub struct TestSynthesizer {
    generator: Arc<dyn TextGenerator>,
    prompts: Arc<PromptSet>,
    test_data_path: PathBuf,
}

impl TestSynthesizer {
    pub fn new(
        generator: Arc<dyn TextGenerator>,
        prompts: Arc<PromptSet>,
        test_data_path: PathBuf,
    ) -> Self {
        Self {
            generator,
            prompts,
            test_data_path,
        }
    }

    /// One generation call. Collaborator and parse failures are logged and
    /// yield an empty list.
    pub async fn generate_tests(&self, metadata: &PageMetadata, minimized: &str) -> Vec<TestCaseSpec> {
        let mut suffix = String::new();
        let mut fixture = None;

        if requires_auth(metadata) || has_contact_form(metadata) {
            fixture = TestDataFixture::load(&self.test_data_path);
            if let Some(fixture) = &fixture {
                let auth_requirements = metadata
                    .get("auth_requirements")
                    .cloned()
                    .unwrap_or_else(|| Value::Object(Default::default()));
                suffix.push_str(&render(
                    &self.prompts.generate_tests.test_data_suffix,
                    &[
                        ("test_data", &fixture.to_pretty_json()),
                        ("auth_requirements", &pretty(&auth_requirements)),
                    ],
                ));
            }
        }

        if let Some(fields) = contact_form_fields(metadata) {
            suffix.push_str(&render(
                &self.prompts.generate_tests.contact_form_suffix,
                &[("contact_form_fields", &pretty(fields))],
            ));
        }

        let text = |key: &str| {
            metadata
                .get(key)
                .map(|v| match v {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .unwrap_or_default()
        };
        let list = |key: &str| {
            metadata
                .get(key)
                .map(Value::to_string)
                .unwrap_or_else(|| "[]".to_string())
        };

        let page_metadata = pretty(&Value::Object(metadata.clone()));
        let user = render(
            &self.prompts.generate_tests.user,
            &[
                ("page_metadata", &page_metadata),
                ("prompt_suffix", &suffix),
                ("title", &text("title")),
                ("url", &text("url")),
                ("forms", &list("forms")),
                ("buttons", &list("buttons")),
                ("interactive_elements", &list("interactive_elements")),
                ("ui_validation_indicators", &list("ui_validation_indicators")),
                ("page_source", minimized),
            ],
        );

        ::log::info!("Sending request for test case generation...");
        let raw = match self
            .generator
            .generate(&self.prompts.generate_tests.system, &user, Purpose::Analysis)
            .await
        {
            Ok(raw) => raw,
            Err(e) => {
                ::log::error!("Test generation failed: {}", e);
                return Vec::new();
            }
        };
        ::log::debug!("Raw test generation response: {}", raw);

        let test_cases = match parse_json::<TestCaseEnvelope>(&raw) {
            ParsedResponse::Parsed(envelope) => envelope.test_cases,
            ParsedResponse::ParseError { raw, reason } => {
                ::log::error!("Failed to parse JSON for test cases: {}", reason);
                ::log::error!("Raw response: {}", raw);
                return Vec::new();
            }
        };
        ::log::info!("Successfully parsed {} test cases", test_cases.len());

        if let Some(fixture) = &fixture {
            validate_auth_test_data_usage(&test_cases, fixture);
        }
        test_cases
    }
}

fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_default()
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

fn requires_auth(metadata: &PageMetadata) -> bool {
    metadata
        .get("auth_requirements")
        .and_then(|a| a.get("auth_required"))
        .is_some_and(truthy)
}

fn has_contact_form(metadata: &PageMetadata) -> bool {
    metadata.get("contact_form_fields").is_some_and(truthy)
}

/// `fields` of the first detected contact form
fn contact_form_fields(metadata: &PageMetadata) -> Option<&Value> {
    if !has_contact_form(metadata) {
        return None;
    }
    metadata
        .get("contact_form_fields")
        .and_then(|forms| forms.get(0))
        .and_then(|form| form.get("fields"))
}
