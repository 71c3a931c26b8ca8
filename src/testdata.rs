//! Credential and form-value fixture handed to test case generation.
//!
//! Expected shape:
//!
//! ```json
//! {
//!   "credentials": {"valid": {"username": "..."}, "invalid": {"username": "..."}},
//!   "registration_fields": {"email": {"valid": ["..."], "invalid": ["..."]}},
//!   "contact_form": {"valid": {"name": "..."}, "invalid": {"name": "..."}}
//! }
//! ```

use crate::model::TestCaseSpec;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

/// Section whose fields each carry lists of values
const LIST_SECTION: &str = "registration_fields";

#[derive(Debug, Clone, PartialEq)]
pub struct TestDataFixture {
    sections: Map<String, Value>,
}

impl TestDataFixture {
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(sections) => Some(Self { sections }),
            _ => None,
        }
    }

    /// Reads the fixture; any failure is logged and yields `None`
    pub fn load(path: &Path) -> Option<Self> {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) => {
                ::log::error!("Failed to load test data from {}: {}", path.display(), e);
                return None;
            }
        };
        match serde_json::from_str::<Value>(&contents) {
            Ok(value) => {
                let fixture = Self::from_value(value);
                if fixture.is_none() {
                    ::log::error!("Test data in {} is not a JSON object", path.display());
                }
                fixture
            }
            Err(e) => {
                ::log::error!("Failed to load test data from {}: {}", path.display(), e);
                None
            }
        }
    }

    pub fn to_pretty_json(&self) -> String {
        serde_json::to_string_pretty(&self.sections).unwrap_or_default()
    }

    /// Whether `test_data` draws only on one fixture section.
    ///
    /// Sections are tried in file order. The first one whose field names
    /// cover every key decides: all
    /// values must then be one of that field's valid or invalid values, or
    /// empty.
    pub fn allows(&self, test_data: &BTreeMap<String, String>) -> bool {
        if test_data.is_empty() {
            return false;
        }
        let keys: BTreeSet<&str> = test_data.keys().map(String::as_str).collect();

        for (name, section) in &self.sections {
            let Some(permitted) = permitted_values(name, section) else {
                continue;
            };
            if !keys.iter().all(|k| permitted.contains_key(*k)) {
                continue;
            }
            return test_data.iter().all(|(field, value)| {
                value.is_empty()
                    || permitted
                        .get(field.as_str())
                        .is_some_and(|allowed| allowed.contains(value))
            });
        }
        false
    }
}

/// Field name -> permitted values for one section, or `None` when the
/// section does not follow either known shape.
fn permitted_values<'a>(name: &str, section: &'a Value) -> Option<BTreeMap<&'a str, Vec<String>>> {
    let section = section.as_object()?;

    if name == LIST_SECTION {
        return Some(
            section
                .iter()
                .map(|(field, sets)| {
                    let values = ["valid", "invalid"]
                        .iter()
                        .filter_map(|kind| sets.get(*kind).and_then(Value::as_array))
                        .flatten()
                        .map(scalar_text)
                        .collect();
                    (field.as_str(), values)
                })
                .collect(),
        );
    }

    let valid = section.get("valid")?.as_object()?;
    let invalid = section.get("invalid").and_then(Value::as_object);
    Some(
        valid
            .iter()
            .map(|(field, value)| {
                let mut values = vec![scalar_text(value)];
                if let Some(other) = invalid.and_then(|m| m.get(field)) {
                    values.push(scalar_text(other));
                }
                (field.as_str(), values)
            })
            .collect(),
    )
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Logs, per auth test case, whether its data came from the fixture.
/// Never rejects anything; returns how many cases missed.
pub fn validate_auth_test_data_usage(test_cases: &[TestCaseSpec], fixture: &TestDataFixture) -> usize {
    let mut misses = 0;
    for case in test_cases.iter().filter(|c| c.kind.contains("auth")) {
        if fixture.allows(&case.test_data) {
            ::log::debug!(
                "Test case '{}' has properly used provided test data",
                case.display_name()
            );
        } else {
            misses += 1;
            ::log::warn!(
                "Test case '{}' doesn't use provided test data",
                case.display_name()
            );
        }
    }
    misses
}
