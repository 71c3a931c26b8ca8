//! Deterministic structural facts about a rendered page.
//!
//! Everything here is a pure function of the page snapshot: no retries, no
//! collaborator calls. Missing elements yield empty lists or `None` fields.

use crate::browser::RenderedPage;
use crate::model::PageMetadata;
use crate::parsers::html::element_text;
use crate::utils::truncate_chars;
use scraper::{ElementRef, Html, Selector};
use serde::Serialize;
use serde_json::Value;
use url::Url;

/// CSS selector set for interactive elements
pub const INTERACTIVE_SELECTOR: &str = "button, a, input, select, textarea";
/// Links considered primary navigation
pub const NAVIGATION_SELECTOR: &str = "nav a, .menu a";
/// Class hints for primary call-to-action elements
pub const PRIMARY_ACTION_SELECTOR: &str = ".primary-btn, .cta-button";

const ELEMENT_TEXT_LIMIT: usize = 50;
const NAVIGATION_LIMIT: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageFacts {
    pub title: String,
    pub url: String,
    pub forms: Vec<FormFacts>,
    pub buttons: Vec<ElementFacts>,
    pub tables: Vec<TableFacts>,
    pub key_flows: KeyFlows,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FormFacts {
    pub id: Option<String>,
    pub action: Option<String>,
    pub method: Option<String>,
    pub inputs: Vec<InputFacts>,
    pub buttons: Vec<ButtonFacts>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InputFacts {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub name: Option<String>,
    pub id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ButtonFacts {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub text: String,
    pub id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ElementFacts {
    pub tag: String,
    pub text: String,
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableFacts {
    pub id: Option<String>,
    pub headers: Vec<String>,
    pub row_count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct KeyFlows {
    pub main_navigation: Vec<String>,
    pub primary_actions: Vec<String>,
}

impl PageFacts {
    /// Facts as a metadata object, ready to be merged with semantic facts
    pub fn to_metadata(&self) -> PageMetadata {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            _ => PageMetadata::new(),
        }
    }
}

/// Extracts structural facts from a page snapshot
pub fn extract(page: &RenderedPage) -> PageFacts {
    let doc = Html::parse_document(&page.source);
    let base = Url::parse(&page.url).ok();

    PageFacts {
        title: page.title.clone(),
        url: page.url.clone(),
        forms: extract_forms(&doc),
        buttons: extract_interactive_elements(&doc),
        tables: extract_data_tables(&doc),
        key_flows: identify_key_flows(&doc, base.as_ref()),
    }
}

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("static selector")
}

fn attr(element: &ElementRef<'_>, name: &str) -> Option<String> {
    element.value().attr(name).map(str::to_string)
}

fn extract_forms(doc: &Html) -> Vec<FormFacts> {
    let form_selector = selector("form");
    let input_selector = selector("input");
    let button_selector = selector("button");

    doc.select(&form_selector)
        .map(|form| FormFacts {
            id: attr(&form, "id"),
            action: attr(&form, "action"),
            method: attr(&form, "method"),
            inputs: form
                .select(&input_selector)
                .map(|input| InputFacts {
                    kind: attr(&input, "type"),
                    name: attr(&input, "name"),
                    id: attr(&input, "id"),
                })
                .collect(),
            buttons: form
                .select(&button_selector)
                .map(|button| ButtonFacts {
                    kind: attr(&button, "type"),
                    text: element_text(button),
                    id: attr(&button, "id"),
                })
                .collect(),
        })
        .collect()
}

fn extract_interactive_elements(doc: &Html) -> Vec<ElementFacts> {
    doc.select(&selector(INTERACTIVE_SELECTOR))
        .map(|element| ElementFacts {
            tag: element.value().name().to_string(),
            text: truncate_chars(&element_text(element), ELEMENT_TEXT_LIMIT),
            id: attr(&element, "id"),
            kind: attr(&element, "type"),
        })
        .collect()
}

fn extract_data_tables(doc: &Html) -> Vec<TableFacts> {
    let header_selector = selector("th");
    let row_selector = selector("tr");

    doc.select(&selector("table"))
        .map(|table| TableFacts {
            id: attr(&table, "id"),
            headers: table.select(&header_selector).map(element_text).collect(),
            row_count: table.select(&row_selector).count(),
        })
        .collect()
}

fn identify_key_flows(doc: &Html, base: Option<&Url>) -> KeyFlows {
    let main_navigation = doc
        .select(&selector(NAVIGATION_SELECTOR))
        .take(NAVIGATION_LIMIT)
        .filter_map(|a| a.value().attr("href"))
        .map(|href| match base.and_then(|b| b.join(href).ok()) {
            Some(resolved) => resolved.to_string(),
            None => href.to_string(),
        })
        .collect();

    let primary_actions = doc
        .select(&selector(PRIMARY_ACTION_SELECTOR))
        .map(element_text)
        .collect();

    KeyFlows {
        main_navigation,
        primary_actions,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(source: &str) -> RenderedPage {
        RenderedPage {
            url: "https://example.com/account".to_string(),
            title: "Account".to_string(),
            source: source.to_string(),
        }
    }

    #[test]
    fn test_empty_page_yields_empty_facts() {
        let facts = extract(&page("<html><body></body></html>"));
        assert!(facts.forms.is_empty());
        assert!(facts.buttons.is_empty());
        assert!(facts.tables.is_empty());
        assert_eq!(facts.key_flows, KeyFlows::default());
        assert_eq!(facts.title, "Account");
    }

    #[test]
    fn test_forms() {
        let facts = extract(&page(
            r#"<form id="login" action="/session" method="post">
                 <input type="email" name="email" id="email">
                 <input type="password" name="password">
                 <button type="submit" id="go">  Log in </button>
               </form>"#,
        ));
        assert_eq!(facts.forms.len(), 1);
        let form = &facts.forms[0];
        assert_eq!(form.id.as_deref(), Some("login"));
        assert_eq!(form.method.as_deref(), Some("post"));
        assert_eq!(form.inputs.len(), 2);
        assert_eq!(form.inputs[1].id, None);
        assert_eq!(form.buttons[0].text, "Log in");
    }

    #[test]
    fn test_interactive_elements_truncate_text() {
        let long = "x".repeat(80);
        let facts = extract(&page(&format!(
            r#"<a href="/a" id="l">{long}</a><select name="s"></select><textarea></textarea>"#
        )));
        let tags: Vec<&str> = facts.buttons.iter().map(|b| b.tag.as_str()).collect();
        assert_eq!(tags, vec!["a", "select", "textarea"]);
        assert_eq!(facts.buttons[0].text.len(), 50);
    }

    #[test]
    fn test_tables() {
        let facts = extract(&page(
            r#"<table id="orders"><tr><th>Id</th><th>Total</th></tr>
               <tr><td>1</td><td>9</td></tr><tr><td>2</td><td>5</td></tr></table>"#,
        ));
        assert_eq!(facts.tables[0].headers, vec!["Id", "Total"]);
        assert_eq!(facts.tables[0].row_count, 3);
    }

    #[test]
    fn test_key_flows() {
        let nav: String = (1..=7)
            .map(|i| format!(r#"<a href="/p{i}">P{i}</a>"#))
            .collect();
        let facts = extract(&page(&format!(
            r#"<nav>{nav}</nav><button class="cta-button">Buy now</button>"#
        )));
        assert_eq!(facts.key_flows.main_navigation.len(), 5);
        assert_eq!(facts.key_flows.main_navigation[0], "https://example.com/p1");
        assert_eq!(facts.key_flows.primary_actions, vec!["Buy now"]);
    }

    #[test]
    fn test_metadata_shape() {
        let metadata = extract(&page("<form></form>")).to_metadata();
        for key in ["title", "url", "forms", "buttons", "tables", "key_flows"] {
            assert!(metadata.contains_key(key), "{key}");
        }
        assert!(metadata["forms"][0]["id"].is_null());
    }
}
