//! Parsing of free-text model responses.
//!
//! Models may wrap their answer in a Markdown fence or return it bare; the
//! helpers here peel the fence and hand back either the parsed value or the
//! raw text that failed to parse.

use crate::config::ScriptLanguage;
use serde::de::DeserializeOwned;

const FENCE: &str = "```";

/// Outcome of parsing a model response
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedResponse<T> {
    Parsed(T),
    ParseError { raw: String, reason: String },
}

impl<T> ParsedResponse<T> {
    pub fn ok(self) -> Option<T> {
        match self {
            ParsedResponse::Parsed(value) => Some(value),
            ParsedResponse::ParseError { .. } => None,
        }
    }

    pub fn is_parsed(&self) -> bool {
        matches!(self, ParsedResponse::Parsed(_))
    }
}

/// Parses a JSON document, optionally wrapped in a ```json or bare fence
pub fn parse_json<T: DeserializeOwned>(raw: &str) -> ParsedResponse<T> {
    let body = strip_json_fence(raw);
    ::log::debug!("Sanitized model response: {}", body);

    match serde_json::from_str(body) {
        Ok(value) => ParsedResponse::Parsed(value),
        Err(e) => ParsedResponse::ParseError {
            raw: raw.to_string(),
            reason: e.to_string(),
        },
    }
}

/// Body of the first ```json block, else of the first bare block, else the
/// whole text
pub fn strip_json_fence(raw: &str) -> &str {
    fenced_block(raw, "json")
        .or_else(|| bare_block(raw))
        .unwrap_or(raw)
        .trim()
}

/// Source code pulled out of a script-generation response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedScript {
    pub source: String,
    /// Language named by the fence, if any
    pub language: Option<ScriptLanguage>,
}

/// Extracts script source, preferring a fence tagged with `preferred`, then
/// any other known language fence, then a bare fence, then the raw text
pub fn extract_script(raw: &str, preferred: ScriptLanguage) -> ExtractedScript {
    let candidates = std::iter::once(preferred)
        .chain(ScriptLanguage::ALL.into_iter().filter(|l| *l != preferred));

    for language in candidates {
        for tag in language.fence_tags() {
            if let Some(body) = fenced_block(raw, tag) {
                return ExtractedScript {
                    source: body.trim().to_string(),
                    language: Some(language),
                };
            }
        }
    }

    let source = bare_block(raw).unwrap_or(raw).trim().to_string();
    ExtractedScript {
        source,
        language: None,
    }
}

// A tag only counts when the next character cannot extend it, so ```java
// does not match the opening of ```javascript while ```json{"a":1}``` does.
fn fenced_block<'a>(raw: &'a str, tag: &str) -> Option<&'a str> {
    let marker = format!("{FENCE}{tag}");
    for (idx, _) in raw.match_indices(&marker) {
        let rest = &raw[idx + marker.len()..];
        if rest.chars().next().is_some_and(is_tag_char) {
            continue;
        }
        let end = rest.find(FENCE).unwrap_or(rest.len());
        return Some(&rest[..end]);
    }
    None
}

fn is_tag_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '#' | '+' | '-' | '_')
}

fn bare_block(raw: &str) -> Option<&str> {
    let start = raw.find(FENCE)? + FENCE.len();
    let mut rest = &raw[start..];

    // Drop an unknown info string such as ```html
    if let Some(newline) = rest.find('\n') {
        let info = rest[..newline].trim();
        if !info.is_empty() && info.chars().all(is_tag_char) {
            rest = &rest[newline + 1..];
        }
    }

    let end = rest.find(FENCE).unwrap_or(rest.len());
    Some(&rest[..end])
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};

    #[test]
    fn test_strip_json_fence_variants() {
        assert_eq!(strip_json_fence("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_json_fence("Here you go:\n```\n{\"a\":1}\n```\nDone"), "{\"a\":1}");
        assert_eq!(strip_json_fence("  {\"a\":1}  "), "{\"a\":1}");
        assert_eq!(strip_json_fence("```JSONC\n{}\n```"), "{}");
        assert_eq!(strip_json_fence("```jsonc\n{}\n```"), "{}");
    }

    #[test]
    fn test_single_line_json_fence() {
        assert_eq!(strip_json_fence("```json{\"a\":1}```"), "{\"a\":1}");
        let parsed: ParsedResponse<Value> = parse_json("```json[1, 2]```");
        assert_eq!(parsed, ParsedResponse::Parsed(json!([1, 2])));
    }

    #[test]
    fn test_parse_json_success_and_failure() {
        let parsed: ParsedResponse<Value> = parse_json("```json\n{\"auth\": true}\n```");
        assert_eq!(parsed, ParsedResponse::Parsed(json!({"auth": true})));

        let failed: ParsedResponse<Value> = parse_json("I could not analyze this page.");
        match failed {
            ParsedResponse::ParseError { raw, .. } => {
                assert_eq!(raw, "I could not analyze this page.")
            }
            ParsedResponse::Parsed(_) => panic!("expected parse error"),
        }
    }

    #[test]
    fn test_extract_script_prefers_language_fence() {
        let raw = "Explanation\n```python\nfrom selenium import webdriver\n```\nmore";
        let script = extract_script(raw, ScriptLanguage::Python);
        assert_eq!(script.source, "from selenium import webdriver");
        assert_eq!(script.language, Some(ScriptLanguage::Python));
    }

    #[test]
    fn test_java_tag_does_not_match_javascript() {
        let raw = "```javascript\nconst { Builder, By } = require('selenium-webdriver');\n```";
        let script = extract_script(raw, ScriptLanguage::Java);
        assert_eq!(script.language, Some(ScriptLanguage::JavaScript));
        assert!(script.source.starts_with("const"));
    }

    #[test]
    fn test_extract_script_bare_and_plain() {
        let bare = extract_script("```\nprint('hi')\n```", ScriptLanguage::Python);
        assert_eq!(bare.source, "print('hi')");
        assert_eq!(bare.language, None);

        let plain = extract_script("  print('hi')\n", ScriptLanguage::Python);
        assert_eq!(plain.source, "print('hi')");

        let empty = extract_script("```python\n```", ScriptLanguage::Python);
        assert!(empty.source.is_empty());
    }
}
