//! Profile error types.
//!
//! Errors fall into three classes that callers treat differently:
//!
//! - **path errors** ([`ProfileError::is_path_error`]): the manifest or a
//!   referenced file is missing or unreadable;
//! - **format errors** ([`ProfileError::is_format_error`]): the manifest
//!   declares a `format` this release cannot handle;
//! - **invalid-profile errors** ([`ProfileError::is_invalid_profile`]):
//!   schema violations, malformed fragments and rule violations. These are
//!   the errors [`crate::ProfileParser::parse`] prefixes with the manifest
//!   path.

use std::fmt;
use std::path::PathBuf;

use kmp_core::XmlError;
use kmp_schema::SchemaError;
use thiserror::Error;

use crate::locator::PROFILE_MANIFEST_FILENAME;

/// Errors that can occur while locating, parsing or validating a profile.
#[derive(Error, Debug)]
pub enum ProfileError {
    /// The path is neither a manifest file nor a profile directory.
    #[error(
        "Path '{}' is neither a directory containing a '{}' file nor a file",
        .path.display(),
        PROFILE_MANIFEST_FILENAME
    )]
    NotAProfile { path: PathBuf },

    /// A directory was given that holds no manifest.
    #[error("Directory '{}' does not contain a '{}'", .dir.display(), PROFILE_MANIFEST_FILENAME)]
    MissingManifest { dir: PathBuf },

    /// A fragment or defaults document referenced by the manifest is missing.
    #[error("referenced file not found: '{}'", .path.display())]
    FragmentNotFound { path: PathBuf },

    /// A bootstrap template path is not a directory.
    #[error("Template directory '{}' does not exist or is not a directory", .path.display())]
    TemplateNotFound { path: PathBuf },

    /// Any other I/O failure while reading a file.
    #[error("I/O error at '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Schema loading or structural validation failed.
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// A referenced document is not well-formed XML.
    #[error(transparent)]
    Xml(#[from] XmlError),

    /// The `format` attribute is not an integer.
    #[error("Unable to handle '{filename}' format version '{value}': not an integer")]
    NonIntegerFormat { filename: String, value: String },

    /// The `format` attribute is zero or negative.
    #[error(
        "Unable to handle '{filename}' format version '{format}', please update the \
         manifest file to at least format version 1"
    )]
    MalformedFormat { filename: String, format: String },

    /// The `format` attribute names a version this release does not know.
    #[error(
        "Unable to handle '{filename}' format version '{format}', please update \
         keymint-profile to a release that supports it"
    )]
    UnsupportedFormat { filename: String, format: String },

    /// A mandatory element is absent.
    #[error("The manifest is missing the mandatory <{element}> element")]
    MissingElement { element: &'static str },

    /// `export` does not hold exactly one `policy_type`.
    #[error("Only one <policy_type> element is permitted.")]
    PolicyType { found: usize },

    /// One or more profile rules failed.
    #[error("{0}")]
    Validation(RuleViolations),

    /// Construction named fields the profile does not have.
    #[error("Unknown properties: {}", .0.join(", "))]
    UnknownProperties(Vec<String>),

    /// Construction supplied a value of the wrong kind for a field.
    #[error("property '{property}' expects {expected}")]
    PropertyType {
        property: &'static str,
        expected: &'static str,
    },

    /// Bootstrap target already exists.
    #[error("Target '{}' already exists", .path.display())]
    TargetExists { path: PathBuf },

    /// An invalid-profile error annotated with the manifest it came from.
    #[error("Invalid profile manifest '{}': {source}", .manifest.display())]
    InvalidManifest {
        manifest: PathBuf,
        source: Box<ProfileError>,
    },
}

impl ProfileError {
    /// Missing or unreadable files.
    pub fn is_path_error(&self) -> bool {
        matches!(
            self,
            ProfileError::NotAProfile { .. }
                | ProfileError::MissingManifest { .. }
                | ProfileError::FragmentNotFound { .. }
                | ProfileError::TemplateNotFound { .. }
                | ProfileError::Io { .. }
        )
    }

    /// Unsupported or malformed `format` attribute.
    pub fn is_format_error(&self) -> bool {
        matches!(
            self,
            ProfileError::NonIntegerFormat { .. }
                | ProfileError::MalformedFormat { .. }
                | ProfileError::UnsupportedFormat { .. }
        )
    }

    /// Schema violations, malformed documents and rule violations.
    pub fn is_invalid_profile(&self) -> bool {
        match self {
            ProfileError::Schema(e) => matches!(
                e,
                SchemaError::InvalidDocument { .. } | SchemaError::DefaultsMismatch { .. }
            ),
            ProfileError::Xml(_)
            | ProfileError::MissingElement { .. }
            | ProfileError::PolicyType { .. }
            | ProfileError::Validation(_)
            | ProfileError::UnknownProperties(_)
            | ProfileError::PropertyType { .. }
            | ProfileError::InvalidManifest { .. } => true,
            _ => false,
        }
    }

    /// Prefix an invalid-profile error with the manifest path.
    ///
    /// Other errors, and errors that already carry a manifest, are returned
    /// unchanged.
    pub fn in_manifest(self, manifest: impl Into<PathBuf>) -> Self {
        match self {
            ProfileError::InvalidManifest { .. } => self,
            e if e.is_invalid_profile() => ProfileError::InvalidManifest {
                manifest: manifest.into(),
                source: Box::new(e),
            },
            e => e,
        }
    }

    /// Rule violations carried by this error, looking through the manifest
    /// annotation.
    pub fn violations(&self) -> Option<&RuleViolations> {
        match self {
            ProfileError::Validation(v) => Some(v),
            ProfileError::InvalidManifest { source, .. } => source.violations(),
            _ => None,
        }
    }
}

/// Result type alias for profile operations.
pub type ProfileResult<T> = Result<T, ProfileError>;

/// The semantic rules [`crate::Profile::validate`] enforces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProfileRule {
    /// `format` is a positive decimal integer.
    Format,
    /// `name` is not empty.
    NameEmpty,
    /// `export` holds exactly one `policy_type`.
    PolicyType,
    /// `name` follows the convention of the policy type.
    NameConvention,
    /// `version` is `MAJOR.MINOR.PATCH`.
    Version,
}

/// One failed rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleViolation {
    pub rule: ProfileRule,
    pub message: String,
}

/// All rules that failed for one profile, in evaluation order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleViolations {
    violations: Vec<RuleViolation>,
}

impl RuleViolations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, rule: ProfileRule, message: impl Into<String>) {
        self.violations.push(RuleViolation {
            rule,
            message: message.into(),
        });
    }

    pub fn len(&self) -> usize {
        self.violations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn violations(&self) -> &[RuleViolation] {
        &self.violations
    }

    /// Whether `rule` is among the failures.
    pub fn contains(&self, rule: ProfileRule) -> bool {
        self.violations.iter().any(|v| v.rule == rule)
    }

    /// `Ok(())` when nothing failed, otherwise a single
    /// [`ProfileError::Validation`] holding every failure.
    pub fn into_result(self) -> ProfileResult<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(ProfileError::Validation(self))
        }
    }
}

impl fmt::Display for RuleViolations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, v) in self.violations.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            f.write_str(&v.message)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kmp_schema::ValidationViolations;

    #[test]
    fn not_a_profile_display() {
        let err = ProfileError::NotAProfile {
            path: PathBuf::from("/tmp/nowhere"),
        };
        assert_eq!(
            err.to_string(),
            "Path '/tmp/nowhere' is neither a directory containing a 'keymint_profile.xml' \
             file nor a file"
        );
        assert!(err.is_path_error());
    }

    #[test]
    fn missing_manifest_display() {
        let err = ProfileError::MissingManifest {
            dir: PathBuf::from("profiles/a"),
        };
        assert_eq!(
            err.to_string(),
            "Directory 'profiles/a' does not contain a 'keymint_profile.xml'"
        );
    }

    #[test]
    fn format_messages_differ_by_cause() {
        let malformed = ProfileError::MalformedFormat {
            filename: "p.xml".to_string(),
            format: "0".to_string(),
        };
        let unsupported = ProfileError::UnsupportedFormat {
            filename: "p.xml".to_string(),
            format: "2".to_string(),
        };
        assert!(malformed.to_string().contains("at least format version 1"));
        assert!(unsupported.to_string().contains("update keymint-profile"));
        assert!(malformed.is_format_error() && unsupported.is_format_error());
        assert!(!malformed.is_invalid_profile());
    }

    #[test]
    fn rule_violations_join_with_newlines() {
        let mut v = RuleViolations::new();
        v.push(ProfileRule::NameEmpty, "Profile name must not be empty");
        v.push(ProfileRule::Version, "Profile version 'x' does not follow version conventions");
        assert!(v.contains(ProfileRule::Version));
        assert!(!v.contains(ProfileRule::Format));
        let err = v.into_result().unwrap_err();
        assert_eq!(
            err.to_string(),
            "Profile name must not be empty\n\
             Profile version 'x' does not follow version conventions"
        );
    }

    #[test]
    fn empty_violations_are_ok() {
        assert!(RuleViolations::new().into_result().is_ok());
    }

    #[test]
    fn in_manifest_wraps_invalid_profile_once() {
        let err = ProfileError::PolicyType { found: 0 }
            .in_manifest("a/keymint_profile.xml")
            .in_manifest("b/keymint_profile.xml");
        assert_eq!(
            err.to_string(),
            "Invalid profile manifest 'a/keymint_profile.xml': \
             Only one <policy_type> element is permitted."
        );
    }

    #[test]
    fn in_manifest_leaves_other_errors_alone() {
        let err = ProfileError::FragmentNotFound {
            path: PathBuf::from("policies.xml"),
        }
        .in_manifest("keymint_profile.xml");
        assert!(matches!(err, ProfileError::FragmentNotFound { .. }));

        let err = ProfileError::UnsupportedFormat {
            filename: "p.xml".to_string(),
            format: "7".to_string(),
        }
        .in_manifest("p.xml");
        assert!(matches!(err, ProfileError::UnsupportedFormat { .. }));
    }

    #[test]
    fn schema_violation_is_invalid_profile() {
        let err = ProfileError::from(SchemaError::InvalidDocument {
            label: None,
            violations: ValidationViolations::single("", "bad"),
        });
        assert!(err.is_invalid_profile());
        let err = ProfileError::from(SchemaError::SchemaNotFound("x".to_string()));
        assert!(!err.is_invalid_profile());
    }

    #[test]
    fn violations_look_through_manifest() {
        let mut v = RuleViolations::new();
        v.push(ProfileRule::NameEmpty, "Profile name must not be empty");
        let err = ProfileError::Validation(v).in_manifest("p.xml");
        assert_eq!(err.violations().map(RuleViolations::len), Some(1));
    }

    #[test]
    fn unknown_properties_display() {
        let err = ProfileError::UnknownProperties(vec!["colour".to_string(), "size".to_string()]);
        assert_eq!(err.to_string(), "Unknown properties: colour, size");
    }
}
