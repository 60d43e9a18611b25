//! # XML Element Tree
//!
//! An owned element tree built from `roxmltree`. Only elements, attributes
//! and text are kept; comments and processing instructions are dropped.
//! Namespaces are reduced to local names, which is all the keymint
//! manifests use.
//!
//! ## Path lookups
//!
//! [`Element::find`], [`Element::find_all`] and [`Element::find_text`] take
//! slash-separated tag paths relative to the element they are called on:
//! `find_all("policies/policy")` returns every `policy` child of every
//! `policies` child, in document order.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::error::XmlError;

/// A single XML element with its attributes, direct text and children.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Element {
    /// Local tag name.
    pub tag: String,
    /// Attributes by local name.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, String>,
    /// Concatenated direct text content, untrimmed. `None` when the element
    /// holds no text nodes at all.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Child elements in document order.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Element>,
}

impl Element {
    /// Create an empty element.
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            attributes: BTreeMap::new(),
            text: None,
            children: Vec::new(),
        }
    }

    /// Builder: set the text content.
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Builder: set an attribute.
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Builder: append a child element.
    pub fn with_child(mut self, child: Element) -> Self {
        self.children.push(child);
        self
    }

    /// Parse a document and return its root element.
    ///
    /// # Errors
    ///
    /// Returns [`XmlError::Parse`] without a label when the text is not
    /// well-formed XML.
    pub fn parse(text: &str) -> Result<Self, XmlError> {
        let doc = roxmltree::Document::parse(text).map_err(|e| XmlError::Parse {
            label: None,
            reason: e.to_string(),
        })?;
        Ok(Self::from_node(doc.root_element()))
    }

    /// Parse a document, labelling any error with `label`.
    pub fn parse_named(text: &str, label: &str) -> Result<Self, XmlError> {
        Self::parse(text).map_err(|e| e.with_label(label))
    }

    fn from_node(node: roxmltree::Node<'_, '_>) -> Self {
        let mut element = Element::new(node.tag_name().name());
        for attr in node.attributes() {
            element
                .attributes
                .insert(attr.name().to_string(), attr.value().to_string());
        }

        let mut text: Option<String> = None;
        for child in node.children() {
            if child.is_element() {
                element.children.push(Self::from_node(child));
            } else if child.is_text() {
                if let Some(t) = child.text() {
                    text.get_or_insert_with(String::new).push_str(t);
                }
            }
        }
        element.text = text;
        element
    }

    /// Attribute value by name.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// Direct text content, untrimmed.
    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    /// True when the element carries text other than whitespace.
    pub fn has_text(&self) -> bool {
        self.text.as_deref().is_some_and(|t| !t.trim().is_empty())
    }

    /// Direct children with the given tag, in document order.
    pub fn children_named<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a Element> + 'a {
        self.children.iter().filter(move |c| c.tag == tag)
    }

    /// First element matching `path`, in document order.
    pub fn find(&self, path: &str) -> Option<&Element> {
        self.find_all(path).into_iter().next()
    }

    /// Every element matching `path`, in document order.
    ///
    /// An empty path matches nothing.
    pub fn find_all(&self, path: &str) -> Vec<&Element> {
        let mut current: Vec<&Element> = vec![self];
        let mut matched_any_segment = false;
        for segment in path.split('/').filter(|s| !s.is_empty()) {
            matched_any_segment = true;
            current = current
                .into_iter()
                .flat_map(|el| el.children.iter().filter(move |c| c.tag == segment))
                .collect();
            if current.is_empty() {
                break;
            }
        }
        if matched_any_segment {
            current
        } else {
            Vec::new()
        }
    }

    /// Every element matching `path` when `self` is a document root.
    ///
    /// The first segment must name `self`: `select("policies/policy")` on a
    /// `<policies>` root returns its `policy` children.
    pub fn select(&self, path: &str) -> Vec<&Element> {
        let mut segments = path.split('/').filter(|s| !s.is_empty());
        match segments.next() {
            Some(first) if first == self.tag => {
                let rest: Vec<&str> = segments.collect();
                if rest.is_empty() {
                    vec![self]
                } else {
                    self.find_all(&rest.join("/"))
                }
            }
            _ => Vec::new(),
        }
    }

    /// Text of the first element matching `path`.
    ///
    /// Returns `Some("")` when the element exists but holds no text, and
    /// `None` when no element matches.
    pub fn find_text(&self, path: &str) -> Option<&str> {
        self.find(path).map(|el| el.text().unwrap_or(""))
    }

    /// Render the element and its subtree as XML text.
    pub fn to_xml(&self) -> String {
        let mut out = String::new();
        self.write_xml(&mut out);
        out
    }

    fn write_xml(&self, out: &mut String) {
        out.push('<');
        out.push_str(&self.tag);
        for (name, value) in &self.attributes {
            out.push(' ');
            out.push_str(name);
            out.push_str("=\"");
            escape_into(out, value, true);
            out.push('"');
        }
        if self.text.is_none() && self.children.is_empty() {
            out.push_str("/>");
            return;
        }
        out.push('>');
        if let Some(text) = &self.text {
            escape_into(out, text, false);
        }
        for child in &self.children {
            child.write_xml(out);
        }
        out.push_str("</");
        out.push_str(&self.tag);
        out.push('>');
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_xml())
    }
}

fn escape_into(out: &mut String, raw: &str, attribute: bool) {
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' if attribute => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
}
