use regex::Regex;
use scraper::node::Node;
use scraper::{ElementRef, Html, Selector};
use std::sync::OnceLock;

/// Elements dropped from minimized markup
const STRIPPED_TAGS: &[&str] = &["script", "style", "meta", "link", "noscript", "path"];

const VOID_TAGS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

/// Extracts anchor targets in document order
pub fn parse_links_only(html: &str) -> Vec<String> {
    let doc = Html::parse_document(html);

    let link_selector = Selector::parse("a[href]").expect("static selector");
    let links: Vec<String> = doc
        .select(&link_selector)
        .filter_map(|e| e.value().attr("href"))
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();

    ::log::debug!("HTML parser found {} links", links.len());
    if !links.is_empty() {
        ::log::trace!(
            "First few links: {:?}",
            links.iter().take(5).collect::<Vec<_>>()
        );
    }

    links
}

/// Visible-ish text of an element with whitespace collapsed
pub fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .collect::<Vec<_>>()
        .join(" ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Reduces rendered markup to what matters for writing tests.
///
/// Scripts, styles, metadata, svg paths and comments are removed, whitespace
/// runs collapse to one space and whitespace between tags disappears.
pub fn minimize(html: &str) -> String {
    static WHITESPACE: OnceLock<Regex> = OnceLock::new();
    static BETWEEN_TAGS: OnceLock<Regex> = OnceLock::new();
    let whitespace = WHITESPACE.get_or_init(|| Regex::new(r"\s+").expect("valid regex"));
    let between_tags = BETWEEN_TAGS.get_or_init(|| Regex::new(r">\s+<").expect("valid regex"));

    let doc = Html::parse_document(html);
    let mut out = String::with_capacity(html.len() / 2);
    for child in doc.tree.root().children() {
        if let Node::Doctype(doctype) = child.value() {
            out.push_str("<!DOCTYPE ");
            out.push_str(doctype.name());
            out.push('>');
        } else if let Some(element) = ElementRef::wrap(child) {
            serialize_element(element, &mut out);
        }
    }

    let collapsed = whitespace.replace_all(&out, " ");
    between_tags
        .replace_all(&collapsed, "><")
        .trim()
        .to_string()
}

// Attributes are written in name order so equal documents hash equally.
fn serialize_element(element: ElementRef<'_>, out: &mut String) {
    let name = element.value().name();
    if STRIPPED_TAGS.contains(&name) {
        return;
    }

    out.push('<');
    out.push_str(name);
    let mut attrs: Vec<(&str, &str)> = element.value().attrs().collect();
    attrs.sort_unstable();
    for (attr, value) in attrs {
        out.push(' ');
        out.push_str(attr);
        out.push_str("=\"");
        escape_attr(value, out);
        out.push('"');
    }
    out.push('>');
    if VOID_TAGS.contains(&name) {
        return;
    }

    for child in element.children() {
        if let Some(child_element) = ElementRef::wrap(child) {
            serialize_element(child_element, out);
        } else if let Node::Text(text) = child.value() {
            escape_text(text, out);
        }
    }
    out.push_str("</");
    out.push_str(name);
    out.push('>');
}

fn escape_text(text: &str, out: &mut String) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
}

fn escape_attr(value: &str, out: &mut String) {
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
}
