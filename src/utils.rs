use chrono::{DateTime, Local};
use regex::Regex;
use sha2::{Digest, Sha256};
use std::sync::OnceLock;

/// Convert a test case name to a filesystem-safe stem
///
/// Anything outside `[A-Za-z0-9_-]` becomes `_`, runs of `_` collapse to one
/// and leading/trailing `_` are trimmed.
pub fn sanitize_filename(name: &str) -> String {
    static INVALID: OnceLock<Regex> = OnceLock::new();
    static REPEATED: OnceLock<Regex> = OnceLock::new();
    let invalid = INVALID.get_or_init(|| Regex::new(r"[^a-zA-Z0-9\-_]").expect("valid regex"));
    let repeated = REPEATED.get_or_init(|| Regex::new(r"_+").expect("valid regex"));

    let replaced = invalid.replace_all(name, "_");
    let collapsed = repeated.replace_all(&replaced, "_");
    collapsed.trim_matches('_').to_string()
}

/// Timestamp fragment used in script and report file names
pub fn file_timestamp(at: DateTime<Local>) -> String {
    at.format("%Y%m%d_%H%M%S").to_string()
}

/// `test_<timestamp>_<sanitized name>.<ext>`
pub fn script_file_name(test_name: &str, at: DateTime<Local>, extension: &str) -> String {
    let stem = sanitize_filename(test_name);
    let stem = if stem.is_empty() { "unnamed" } else { stem.as_str() };
    format!("test_{}_{}.{}", file_timestamp(at), stem, extension)
}

/// First `max_chars` characters of `text`
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

/// Hex SHA-256 of page content
pub fn content_hash(content: &str) -> String {
    hex::encode(Sha256::digest(content.as_bytes()))
}

// Second-level labels that sit under a two-letter country code
// (example.co.uk, example.com.au).
const SECOND_LEVEL_LABELS: &[&str] = &["co", "com", "org", "net", "ac", "gov", "edu", "ne", "or"];

/// Registrable domain of a host name, used to bucket page records
pub fn registrable_domain(host: &str) -> String {
    let host = host.trim_end_matches('.').to_lowercase();
    if host.parse::<std::net::IpAddr>().is_ok() {
        return host;
    }

    let labels: Vec<&str> = host.split('.').filter(|l| !l.is_empty()).collect();
    if labels.len() <= 2 {
        return labels.join(".");
    }

    let tld = labels[labels.len() - 1];
    let second = labels[labels.len() - 2];
    let keep = if tld.len() == 2 && SECOND_LEVEL_LABELS.contains(&second) {
        3
    } else {
        2
    };
    labels[labels.len() - keep..].join(".")
}
