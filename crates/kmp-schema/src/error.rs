//! Schema error types.
//!
//! [`SchemaError::InvalidDocument`] renders exactly the operator-facing
//! message of the manifest tooling:
//!
//! ```text
//! The manifest 'policies.xml' contains invalid XML:
//!   /policies[1]/policy[1]: missing required attribute 'name'
//! ```

use std::fmt;

use thiserror::Error;

/// Errors returned by schema loading, validation and defaults overlay.
#[derive(Error, Debug)]
pub enum SchemaError {
    /// The schema file could not be read or parsed.
    #[error("failed to load schema {path}: {reason}")]
    SchemaLoad {
        /// Path or identifier of the schema that failed to load.
        path: String,
        /// Human-readable reason for the failure.
        reason: String,
    },

    /// The requested schema is not registered.
    #[error("schema not found: {0}")]
    SchemaNotFound(String),

    /// The schema could not be compiled into a validator.
    #[error("failed to compile schema {name}: {reason}")]
    SchemaCompile {
        /// Schema name.
        name: String,
        /// Human-readable reason.
        reason: String,
    },

    /// A document failed structural validation.
    #[error("{}", describe_invalid(.label.as_deref(), .violations))]
    InvalidDocument {
        /// Filename or label of the offending document, when known.
        label: Option<String>,
        /// The engine's diagnostic.
        violations: ValidationViolations,
    },

    /// A defaults document does not describe the same root as its target.
    #[error("defaults root <{defaults}> does not match document root <{target}>")]
    DefaultsMismatch {
        /// Root tag of the target document.
        target: String,
        /// Root tag of the defaults document.
        defaults: String,
    },

    /// I/O error while reading schema files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

fn describe_invalid(label: Option<&str>, violations: &ValidationViolations) -> String {
    match label {
        Some(label) => format!("The manifest '{label}' contains invalid XML:\n{violations}"),
        None => format!("The manifest contains invalid XML:\n{violations}"),
    }
}

/// A single structural violation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// XPath-like location of the violating node; empty for the document root.
    pub location: String,
    /// Human-readable description of the violation.
    pub message: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.location.is_empty() {
            write!(f, "  (root): {}", self.message)
        } else {
            write!(f, "  {}: {}", self.location, self.message)
        }
    }
}

/// Collection of violations reported for one document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationViolations {
    violations: Vec<Violation>,
}

impl ValidationViolations {
    /// Wrap a list of violations.
    pub fn new(violations: Vec<Violation>) -> Self {
        Self { violations }
    }

    /// A diagnostic made of one violation.
    pub fn single(location: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            violations: vec![Violation {
                location: location.into(),
                message: message.into(),
            }],
        }
    }

    /// Returns the number of violations.
    pub fn len(&self) -> usize {
        self.violations.len()
    }

    /// Returns true if there are no violations.
    pub fn is_empty(&self) -> bool {
        self.violations.is_empty()
    }

    /// Returns a slice of all violations.
    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }
}

impl fmt::Display for ValidationViolations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, v) in self.violations.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{v}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_document_with_label() {
        let err = SchemaError::InvalidDocument {
            label: Some("profiles/a/keymint_profile.xml".to_string()),
            violations: ValidationViolations::single("/profile", "\"name\" is a required property"),
        };
        let msg = err.to_string();
        assert!(msg.starts_with(
            "The manifest 'profiles/a/keymint_profile.xml' contains invalid XML:\n"
        ));
        assert!(msg.ends_with("  /profile: \"name\" is a required property"));
    }

    #[test]
    fn invalid_document_without_label() {
        let err = SchemaError::InvalidDocument {
            label: None,
            violations: ValidationViolations::single("", "bad root"),
        };
        assert_eq!(
            err.to_string(),
            "The manifest contains invalid XML:\n  (root): bad root"
        );
    }

    #[test]
    fn violations_join_with_newlines() {
        let violations = ValidationViolations::new(vec![
            Violation {
                location: "/a".to_string(),
                message: "first".to_string(),
            },
            Violation {
                location: "/b".to_string(),
                message: "second".to_string(),
            },
        ]);
        assert_eq!(violations.len(), 2);
        assert_eq!(violations.to_string(), "  /a: first\n  /b: second");
    }

    #[test]
    fn defaults_mismatch_display() {
        let err = SchemaError::DefaultsMismatch {
            target: "policies".to_string(),
            defaults: "authorities".to_string(),
        };
        assert!(err.to_string().contains("<authorities>"));
        assert!(err.to_string().contains("<policies>"));
    }
}
