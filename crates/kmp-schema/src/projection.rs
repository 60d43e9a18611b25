//! # XML to JSON Projection
//!
//! JSON Schema cannot address XML directly, so documents are projected onto
//! a JSON value before validation:
//!
//! - the document becomes `{ "<root tag>": <element> }`;
//! - an element becomes an object;
//! - each attribute becomes a string member `"@<name>"`;
//! - non-blank text becomes `"#text"`, trimmed;
//! - child elements are grouped by tag into arrays, `"<tag>": [ ... ]`,
//!   keeping document order within each tag.
//!
//! Grouping every child into an array lets schemas express cardinality with
//! `minItems` / `maxItems`.

use serde_json::{Map, Value};

use kmp_core::Element;

/// Member name carrying trimmed element text.
pub const TEXT_KEY: &str = "#text";

/// Prefix of members carrying attributes.
pub const ATTRIBUTE_PREFIX: char = '@';

/// Project a document rooted at `root`.
pub fn project_document(root: &Element) -> Value {
    let mut doc = Map::new();
    doc.insert(root.tag.clone(), project_element(root));
    Value::Object(doc)
}

/// Project a single element.
pub fn project_element(element: &Element) -> Value {
    let mut obj = Map::new();
    for (name, value) in &element.attributes {
        obj.insert(format!("{ATTRIBUTE_PREFIX}{name}"), Value::String(value.clone()));
    }
    if let Some(text) = element.text() {
        let trimmed = text.trim();
        if !trimmed.is_empty() {
            obj.insert(TEXT_KEY.to_string(), Value::String(trimmed.to_string()));
        }
    }
    for child in &element.children {
        let slot = obj
            .entry(child.tag.clone())
            .or_insert_with(|| Value::Array(Vec::new()));
        if let Value::Array(items) = slot {
            items.push(project_element(child));
        }
    }
    Value::Object(obj)
}

/// Turn a JSON Pointer into the projected document into an XPath-like
/// location.
///
/// `/profile/policies/0/policy/1/policy_path/0/#text` becomes
/// `/profile/policies[1]/policy[2]/policy_path[1]/text()`.
pub fn xpath_of(pointer: &str) -> String {
    let mut out = String::new();
    for raw in pointer.split('/').filter(|s| !s.is_empty()) {
        let segment = raw.replace("~1", "/").replace("~0", "~");
        if let Ok(index) = segment.parse::<usize>() {
            out.push_str(&format!("[{}]", index + 1));
        } else if segment == TEXT_KEY {
            out.push_str("/text()");
        } else {
            out.push('/');
            out.push_str(&segment);
        }
    }
    out
}
