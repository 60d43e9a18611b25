//! # Error Types
//!
//! Errors raised by the XML tree model. Schema and profile errors live in
//! their own crates and wrap [`XmlError`] through `#[from]`.

use thiserror::Error;

/// A document could not be parsed as well-formed XML.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum XmlError {
    /// The text is not well-formed XML.
    #[error("{}", describe_parse(.label.as_deref(), .reason))]
    Parse {
        /// Path or identifier of the document, when known.
        label: Option<String>,
        /// Parser diagnostic, including the position of the defect.
        reason: String,
    },
}

impl XmlError {
    /// Attach a document label to an error that has none.
    ///
    /// A label that is already present is kept, so re-labelling at an
    /// outer boundary never hides the innermost document name.
    pub fn with_label(self, new_label: impl Into<String>) -> Self {
        match self {
            XmlError::Parse {
                label: None,
                reason,
            } => XmlError::Parse {
                label: Some(new_label.into()),
                reason,
            },
            other => other,
        }
    }

    /// The parser diagnostic without the label prefix.
    pub fn reason(&self) -> &str {
        match self {
            XmlError::Parse { reason, .. } => reason,
        }
    }
}

fn describe_parse(label: Option<&str>, reason: &str) -> String {
    match label {
        Some(label) => format!("malformed XML in '{label}': {reason}"),
        None => format!("malformed XML: {reason}"),
    }
}
