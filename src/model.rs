use chrono::{DateTime, Local};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::Path;

/// Merged structural + semantic description of a page
pub type PageMetadata = Map<String, Value>;

/// One generated test scenario.
///
/// Equality and hashing are field-wise, which makes a test case usable as the
/// lookup key for previously materialized scripts. Maps are ordered so the
/// serialized form is canonical.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TestCaseSpec {
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: String,

    #[serde(rename = "type", default, deserialize_with = "lenient_string")]
    pub kind: String,

    #[serde(default, deserialize_with = "lenient_strings")]
    pub steps: Vec<String>,

    #[serde(default, deserialize_with = "lenient_map")]
    pub selectors: BTreeMap<String, String>,

    #[serde(default, deserialize_with = "lenient_string")]
    pub validation: String,

    #[serde(default, deserialize_with = "lenient_map")]
    pub test_data: BTreeMap<String, String>,
}

impl TestCaseSpec {
    /// Name shown to the operator, never empty
    pub fn display_name(&self) -> &str {
        if self.name.trim().is_empty() {
            "Unnamed Test Case"
        } else {
            &self.name
        }
    }

    /// Canonical JSON used as the persisted lookup key
    pub fn canonical_json(&self) -> crate::Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Envelope the generation collaborator is asked to return
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TestCaseEnvelope {
    #[serde(default)]
    pub test_cases: Vec<TestCaseSpec>,
}

/// Coarse grouping of pages by registrable domain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Domain {
    pub id: i64,
    pub name: String,
}

/// Persisted analysis of one normalized page URL
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageRecord {
    pub url: String,
    pub domain_id: i64,
    pub title: String,
    /// Minimized rendered markup
    pub source: String,
    /// SHA-256 of `source`, hex encoded
    pub content_hash: String,
    pub metadata: PageMetadata,
    pub test_cases: Vec<TestCaseSpec>,
    pub test_cases_count: usize,
    pub timestamp: DateTime<Local>,
}

/// A generated script tied to one (page, test case) pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptArtifact {
    pub page_url: String,
    pub test_case_name: String,
    pub test_case_type: String,
    pub test_case_spec: TestCaseSpec,
    pub source_text: String,
    pub storage_path: String,
}

impl ScriptArtifact {
    pub fn file_name(&self) -> String {
        Path::new(&self.storage_path)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.storage_path.clone())
    }
}

fn value_to_string(value: Value) -> String {
    match value {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

// Model output is loosely typed: numbers, booleans and nested values are kept
// as their JSON text rather than rejecting the whole test case.
fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.map(value_to_string).unwrap_or_default())
}

fn lenient_strings<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Array(items)) => items.into_iter().map(value_to_string).collect(),
        Some(Value::Null) | None => Vec::new(),
        Some(other) => vec![value_to_string(other)],
    })
}

fn lenient_map<'de, D>(deserializer: D) -> Result<BTreeMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Object(map)) => map
            .into_iter()
            .map(|(k, v)| (k, value_to_string(v)))
            .collect(),
        _ => BTreeMap::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_spec_equality_is_structural() {
        let json = r##"{"name":"Login","type":"auth","steps":["open","submit"],
            "selectors":{"user":"#u","pass":"#p"},"validation":"redirects",
            "test_data":{"username":"alice"}}"##;
        let a: TestCaseSpec = serde_json::from_str(json).unwrap();
        let b: TestCaseSpec = serde_json::from_str(json).unwrap();
        assert_eq!(a, b);

        let mut set = HashSet::new();
        set.insert(a.clone());
        assert!(set.contains(&b));

        let mut c = b.clone();
        c.steps.push("logout".to_string());
        assert_ne!(a, c);
    }

    #[test]
    fn test_canonical_json_ignores_key_order() {
        let a: TestCaseSpec =
            serde_json::from_str(r#"{"name":"x","selectors":{"b":"2","a":"1"}}"#).unwrap();
        let b: TestCaseSpec =
            serde_json::from_str(r#"{"selectors":{"a":"1","b":"2"},"name":"x"}"#).unwrap();
        assert_eq!(a.canonical_json().unwrap(), b.canonical_json().unwrap());
    }

    #[test]
    fn test_lenient_fields() {
        let spec: TestCaseSpec = serde_json::from_str(
            r#"{"name":"Age check","type":"form","steps":"single step",
                "test_data":{"age":42,"agree":true,"note":null},"validation":null}"#,
        )
        .unwrap();
        assert_eq!(spec.steps, vec!["single step"]);
        assert_eq!(spec.test_data["age"], "42");
        assert_eq!(spec.test_data["agree"], "true");
        assert_eq!(spec.test_data["note"], "");
        assert_eq!(spec.validation, "");
        assert!(spec.selectors.is_empty());
    }

    #[test]
    fn test_display_name_fallback() {
        let spec = TestCaseSpec::default();
        assert_eq!(spec.display_name(), "Unnamed Test Case");
    }

    #[test]
    fn test_artifact_file_name() {
        let artifact = ScriptArtifact {
            page_url: "https://example.com".into(),
            test_case_name: "Login".into(),
            test_case_type: "auth".into(),
            test_case_spec: TestCaseSpec::default(),
            source_text: "print('x')".into(),
            storage_path: "test_scripts/test_20240101_000000_Login.py".into(),
        };
        assert_eq!(artifact.file_name(), "test_20240101_000000_Login.py");
    }
}
