//! # Profile Model
//!
//! The in-memory form of a parsed `keymint_profile.xml`, after every
//! referenced policy and authority fragment has been merged in.
//!
//! Fields stay optional because the parser fills them one by one; a
//! [`Profile`] handed out by [`crate::ProfileParser`] has always passed
//! [`Profile::validate`].

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::OnceLock;

use kmp_core::Element;
use regex::Regex;
use serde::Serialize;

use crate::error::{ProfileError, ProfileResult, ProfileRule, RuleViolations};

/// Manifest `format` versions this release understands.
pub const SUPPORTED_FORMATS: &[i64] = &[1];

/// Object representation of a profile manifest.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Profile {
    /// Value of the root `format` attribute.
    pub profile_format: Option<i64>,
    pub name: Option<String>,
    pub version: Option<String>,
    pub description: Option<String>,
    /// Merged `policy` elements in document order.
    pub policies: Option<Vec<Element>>,
    /// Merged `authority` elements in document order.
    pub authorities: Option<Vec<Element>>,
    /// The `export` sub-tree, verbatim.
    pub export: Option<Element>,
    /// Raw manifest text.
    #[serde(skip)]
    pub string: Option<String>,
    /// Parsed manifest root.
    #[serde(skip)]
    pub tree: Option<Element>,
    /// Manifest path; `None` for profiles parsed from memory.
    pub filename: Option<PathBuf>,
}

/// Names of the [`Profile`] fields, as accepted by
/// [`Profile::from_properties`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProfileField {
    ProfileFormat,
    Name,
    Version,
    Description,
    Policies,
    Authorities,
    String,
    Tree,
    Export,
    Filename,
}

impl ProfileField {
    /// Every field in declaration order.
    pub const ALL: [ProfileField; 10] = [
        ProfileField::ProfileFormat,
        ProfileField::Name,
        ProfileField::Version,
        ProfileField::Description,
        ProfileField::Policies,
        ProfileField::Authorities,
        ProfileField::String,
        ProfileField::Tree,
        ProfileField::Export,
        ProfileField::Filename,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ProfileField::ProfileFormat => "profile_format",
            ProfileField::Name => "name",
            ProfileField::Version => "version",
            ProfileField::Description => "description",
            ProfileField::Policies => "policies",
            ProfileField::Authorities => "authorities",
            ProfileField::String => "string",
            ProfileField::Tree => "tree",
            ProfileField::Export => "export",
            ProfileField::Filename => "filename",
        }
    }
}

impl FromStr for ProfileField {
    type Err = ProfileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ProfileField::ALL
            .into_iter()
            .find(|f| f.as_str() == s)
            .ok_or_else(|| ProfileError::UnknownProperties(vec![s.to_string()]))
    }
}

impl fmt::Display for ProfileField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A value handed to [`Profile::from_properties`].
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    Format(i64),
    Text(String),
    Element(Element),
    Elements(Vec<Element>),
    Path(PathBuf),
}

impl From<i64> for PropertyValue {
    fn from(v: i64) -> Self {
        PropertyValue::Format(v)
    }
}

impl From<&str> for PropertyValue {
    fn from(v: &str) -> Self {
        PropertyValue::Text(v.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(v: String) -> Self {
        PropertyValue::Text(v)
    }
}

impl From<Element> for PropertyValue {
    fn from(v: Element) -> Self {
        PropertyValue::Element(v)
    }
}

impl From<Vec<Element>> for PropertyValue {
    fn from(v: Vec<Element>) -> Self {
        PropertyValue::Elements(v)
    }
}

impl From<PathBuf> for PropertyValue {
    fn from(v: PathBuf) -> Self {
        PropertyValue::Path(v)
    }
}

/// How a profile name must look, chosen by its policy type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NamingConvention {
    /// `keymint*` policy types: slash-separated segments without spaces and
    /// without a trailing slash.
    Path,
    /// Every other policy type: a lower-case identifier that may contain
    /// digits, `_` and `-`.
    Identifier,
}

impl NamingConvention {
    pub fn for_policy_type(policy_type: &str) -> Self {
        if policy_type.starts_with("keymint") {
            NamingConvention::Path
        } else {
            NamingConvention::Identifier
        }
    }

    /// Full match of `name` against the convention.
    pub fn matches(self, name: &str) -> bool {
        match self {
            NamingConvention::Path => path_name_pattern().is_match(name),
            NamingConvention::Identifier => identifier_name_pattern().is_match(name),
        }
    }
}

fn path_name_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[^/ ]+(?:/+[^/ ]+)*$").expect("BUG: hardcoded path name pattern is invalid")
    })
}

fn identifier_name_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[a-z][a-z0-9_-]*$")
            .expect("BUG: hardcoded identifier name pattern is invalid")
    })
}

fn version_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[0-9]+\.[0-9_]+\.[0-9_]+$").expect("BUG: hardcoded version pattern is invalid")
    })
}

fn format_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[1-9][0-9]*$").expect("BUG: hardcoded format pattern is invalid")
    })
}

impl Profile {
    /// Field names in declaration order.
    pub const FIELDS: [&'static str; 10] = [
        "profile_format",
        "name",
        "version",
        "description",
        "policies",
        "authorities",
        "string",
        "tree",
        "export",
        "filename",
    ];

    /// An empty profile bound to `filename`.
    pub fn new(filename: Option<PathBuf>) -> Self {
        Self {
            filename,
            ..Self::default()
        }
    }

    /// Iterate the recognised field names in declaration order.
    pub fn fields() -> impl Iterator<Item = &'static str> {
        ProfileField::ALL.into_iter().map(ProfileField::as_str)
    }

    /// Build a profile from `(field name, value)` pairs.
    ///
    /// Every pair is checked before anything is assigned, so a failed
    /// construction reports all unknown names at once. A `filename` pair
    /// overrides the `filename` argument.
    ///
    /// # Errors
    ///
    /// - [`ProfileError::UnknownProperties`] naming every unrecognised key.
    /// - [`ProfileError::PropertyType`] when a value has the wrong kind.
    pub fn from_properties<K, I>(filename: Option<PathBuf>, properties: I) -> ProfileResult<Self>
    where
        K: AsRef<str>,
        I: IntoIterator<Item = (K, PropertyValue)>,
    {
        let mut known = Vec::new();
        let mut unknown = Vec::new();
        for (key, value) in properties {
            match key.as_ref().parse::<ProfileField>() {
                Ok(field) => known.push((field, value)),
                Err(_) => unknown.push(key.as_ref().to_string()),
            }
        }
        if !unknown.is_empty() {
            return Err(ProfileError::UnknownProperties(unknown));
        }

        let mut profile = Profile::new(filename);
        for (field, value) in known {
            profile.set(field, value)?;
        }
        Ok(profile)
    }

    fn set(&mut self, field: ProfileField, value: PropertyValue) -> ProfileResult<()> {
        let mismatch = |expected: &'static str| ProfileError::PropertyType {
            property: field.as_str(),
            expected,
        };
        match (field, value) {
            (ProfileField::ProfileFormat, PropertyValue::Format(v)) => self.profile_format = Some(v),
            (ProfileField::Name, PropertyValue::Text(v)) => self.name = Some(v),
            (ProfileField::Version, PropertyValue::Text(v)) => self.version = Some(v),
            (ProfileField::Description, PropertyValue::Text(v)) => self.description = Some(v),
            (ProfileField::String, PropertyValue::Text(v)) => self.string = Some(v),
            (ProfileField::Policies, PropertyValue::Elements(v)) => self.policies = Some(v),
            (ProfileField::Authorities, PropertyValue::Elements(v)) => self.authorities = Some(v),
            (ProfileField::Tree, PropertyValue::Element(v)) => self.tree = Some(v),
            (ProfileField::Export, PropertyValue::Element(v)) => self.export = Some(v),
            (ProfileField::Filename, PropertyValue::Path(v)) => self.filename = Some(v),
            (ProfileField::ProfileFormat, _) => return Err(mismatch("an integer")),
            (
                ProfileField::Name
                | ProfileField::Version
                | ProfileField::Description
                | ProfileField::String,
                _,
            ) => return Err(mismatch("text")),
            (ProfileField::Policies | ProfileField::Authorities, _) => {
                return Err(mismatch("a list of elements"))
            }
            (ProfileField::Tree | ProfileField::Export, _) => return Err(mismatch("an element")),
            (ProfileField::Filename, _) => return Err(mismatch("a path")),
        }
        Ok(())
    }

    /// Text of the single `export/policy_type` element.
    ///
    /// # Errors
    ///
    /// [`ProfileError::PolicyType`] when `export` is missing or holds zero
    /// or several `policy_type` children.
    pub fn get_policy_type(&self) -> ProfileResult<&str> {
        let types: Vec<&Element> = self
            .export
            .iter()
            .flat_map(|export| export.children_named("policy_type"))
            .collect();
        match types.as_slice() {
            [only] => Ok(only.text().unwrap_or("")),
            _ => Err(ProfileError::PolicyType { found: types.len() }),
        }
    }

    /// Check every semantic rule and report all failures together.
    ///
    /// # Errors
    ///
    /// [`ProfileError::Validation`] listing each failed rule in evaluation
    /// order.
    pub fn validate(&self) -> ProfileResult<()> {
        let mut violations = RuleViolations::new();

        if let Some(format) = self.profile_format {
            if !format_pattern().is_match(&format.to_string()) {
                violations.push(
                    ProfileRule::Format,
                    "The 'format' attribute of the profile must contain a positive integer if present",
                );
            }
        }

        let name = self.name.as_deref().unwrap_or("");
        if name.is_empty() {
            violations.push(ProfileRule::NameEmpty, "Profile name must not be empty");
        }

        match self.get_policy_type() {
            Ok(policy_type) => {
                if !NamingConvention::for_policy_type(policy_type).matches(name) {
                    violations.push(
                        ProfileRule::NameConvention,
                        format!("Profile name '{name}' does not follow naming conventions"),
                    );
                }
            }
            Err(e) => violations.push(ProfileRule::PolicyType, e.to_string()),
        }

        if let Some(version) = self.version.as_deref().filter(|v| !v.is_empty()) {
            if !version_pattern().is_match(version) {
                violations.push(
                    ProfileRule::Version,
                    format!("Profile version '{version}' does not follow version conventions"),
                );
            }
        }

        violations.into_result()
    }

    /// Number of merged policies.
    pub fn policy_count(&self) -> usize {
        self.policies.as_ref().map_or(0, Vec::len)
    }

    /// Number of merged authorities.
    pub fn authority_count(&self) -> usize {
        self.authorities.as_ref().map_or(0, Vec::len)
    }
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let json = serde_json::to_string(self).map_err(|_| fmt::Error)?;
        f.write_str(&json)
    }
}
