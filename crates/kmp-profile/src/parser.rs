//! # Profile Parser
//!
//! Orchestrates one parse: manifest schema check, format gate, fragment
//! aggregation with defaults overlay, then the semantic rules of
//! [`Profile::validate`].
//!
//! Fragment and defaults paths are resolved against the directory that
//! holds the manifest. Fragments are processed strictly in document order,
//! so the merged `policies` list keeps the order in which the manifest
//! references them.

use std::fs;
use std::io;
use std::num::IntErrorKind;
use std::path::Path;

use kmp_core::Element;
use kmp_schema::{
    check_schema, check_schema_text, DefaultsMerger, SchemaOverlay, SchemaRegistry, SchemaSource,
    AUTHORITIES_SCHEMA, POLICIES_SCHEMA, PROFILE_SCHEMA,
};

use crate::error::{ProfileError, ProfileResult};
use crate::locator::resolve_manifest;
use crate::profile::{Profile, SUPPORTED_FORMATS};

/// The two kinds of document a manifest can reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FragmentKind {
    Policy,
    Authority,
}

impl FragmentKind {
    /// Container element, both in the manifest and as fragment root.
    pub fn container(self) -> &'static str {
        match self {
            FragmentKind::Policy => "policies",
            FragmentKind::Authority => "authorities",
        }
    }

    /// Repeated item element inside the container.
    pub fn item(self) -> &'static str {
        match self {
            FragmentKind::Policy => "policy",
            FragmentKind::Authority => "authority",
        }
    }

    /// Manifest element holding the fragment path.
    pub fn path_element(self) -> &'static str {
        match self {
            FragmentKind::Policy => "policy_path",
            FragmentKind::Authority => "authority_path",
        }
    }

    /// Schema the fragment is checked against.
    pub fn schema(self) -> &'static str {
        match self {
            FragmentKind::Policy => POLICIES_SCHEMA,
            FragmentKind::Authority => AUTHORITIES_SCHEMA,
        }
    }
}

/// Parses profile manifests with an injectable schema engine and defaults
/// merger.
#[derive(Debug)]
pub struct ProfileParser {
    schemas: Box<dyn SchemaSource>,
    merger: Box<dyn DefaultsMerger>,
}

impl ProfileParser {
    pub fn new(schemas: Box<dyn SchemaSource>, merger: Box<dyn DefaultsMerger>) -> Self {
        Self { schemas, merger }
    }

    /// Parser over the schemas compiled into the binary.
    pub fn bundled() -> ProfileResult<Self> {
        Ok(Self::new(
            Box::new(SchemaRegistry::bundled()?),
            Box::new(SchemaOverlay),
        ))
    }

    /// Parser over the `*.schema.json` files of `schema_dir`.
    pub fn from_schema_dir(schema_dir: impl AsRef<Path>) -> ProfileResult<Self> {
        Ok(Self::new(
            Box::new(SchemaRegistry::from_dir(schema_dir)?),
            Box::new(SchemaOverlay),
        ))
    }

    /// Parse the profile at `path`, a manifest file or a profile directory.
    ///
    /// # Errors
    ///
    /// Invalid-profile errors are wrapped once in
    /// [`ProfileError::InvalidManifest`] naming the manifest. Path, I/O and
    /// format errors are returned as they are.
    pub fn parse(&self, path: impl AsRef<Path>) -> ProfileResult<Profile> {
        let manifest = resolve_manifest(path)?;
        let data = read_text(&manifest)?;
        let base = manifest.parent().map(Path::to_path_buf).unwrap_or_default();
        self.parse_string(&data, &base, Some(manifest.as_path()))
            .map_err(|e| e.in_manifest(manifest.clone()))
    }

    /// Parse manifest text. Referenced documents are resolved against
    /// `base_path`; `filename` only labels diagnostics.
    pub fn parse_string(
        &self,
        data: &str,
        base_path: &Path,
        filename: Option<&Path>,
    ) -> ProfileResult<Profile> {
        let label = filename.map(|f| f.display().to_string());

        let schema = self.schemas.load(PROFILE_SCHEMA)?;
        let root = check_schema_text(schema.as_ref(), data, label.as_deref())?;

        let mut profile = Profile::new(filename.map(Path::to_path_buf));
        profile.string = Some(data.to_string());
        profile.export = root.find("export").cloned();
        profile.profile_format = Some(parse_format(
            &root,
            label.as_deref().unwrap_or("<string>"),
        )?);
        profile.name = Some(
            root.find_text("name")
                .ok_or(ProfileError::MissingElement { element: "name" })?
                .to_string(),
        );

        profile.policies = self.merge_fragments(&root, base_path, FragmentKind::Policy)?;
        profile.authorities = self.merge_fragments(&root, base_path, FragmentKind::Authority)?;

        profile.version = root.find_text("version").map(str::to_string);
        profile.description = root.find_text("description").map(str::to_string);
        profile.tree = Some(root);

        profile.validate()?;

        tracing::info!(
            name = profile.name.as_deref().unwrap_or(""),
            policies = profile.policy_count(),
            authorities = profile.authority_count(),
            "parsed profile"
        );
        Ok(profile)
    }

    /// Load, overlay, check and flatten every fragment of `kind` the
    /// manifest references. `None` when the manifest has no container.
    fn merge_fragments(
        &self,
        root: &Element,
        base_path: &Path,
        kind: FragmentKind,
    ) -> ProfileResult<Option<Vec<Element>>> {
        let Some(references) = root.find(kind.container()) else {
            return Ok(None);
        };
        let schema = self.schemas.load(kind.schema())?;
        let selector = format!("{}/{}", kind.container(), kind.item());

        let mut merged = Vec::new();
        for reference in references.children_named(kind.item()) {
            let relative = reference
                .find_text(kind.path_element())
                .ok_or(ProfileError::MissingElement {
                    element: kind.path_element(),
                })?;
            let fragment_path = base_path.join(relative.trim());
            let mut fragment = load_document(&fragment_path)?;
            tracing::debug!(path = %fragment_path.display(), kind = kind.item(), "loaded fragment");

            if let Some(defaults) = reference.find_text("defaults_path") {
                let defaults_path = base_path.join(defaults.trim());
                let defaults = load_document(&defaults_path)?;
                fragment = self
                    .merger
                    .apply_defaults(schema.as_ref(), &fragment, &defaults)?;
                tracing::debug!(
                    path = %fragment_path.display(),
                    defaults = %defaults_path.display(),
                    "applied defaults"
                );
            }

            let label = fragment_path.display().to_string();
            check_schema(schema.as_ref(), &fragment, Some(label.as_str()))?;
            merged.extend(fragment.select(&selector).into_iter().cloned());
        }
        Ok(Some(merged))
    }
}

/// Parse the profile at `path` with the bundled schemas.
pub fn parse_profile(path: impl AsRef<Path>) -> ProfileResult<Profile> {
    ProfileParser::bundled()?.parse(path)
}

/// Parse manifest text with the bundled schemas.
pub fn parse_profile_string(
    data: &str,
    base_path: &Path,
    filename: Option<&Path>,
) -> ProfileResult<Profile> {
    ProfileParser::bundled()?.parse_string(data, base_path, filename)
}

fn read_text(path: &Path) -> ProfileResult<String> {
    fs::read_to_string(path).map_err(|source| match source.kind() {
        io::ErrorKind::NotFound => ProfileError::FragmentNotFound {
            path: path.to_path_buf(),
        },
        _ => ProfileError::Io {
            path: path.to_path_buf(),
            source,
        },
    })
}

fn load_document(path: &Path) -> ProfileResult<Element> {
    let text = read_text(path)?;
    Ok(Element::parse_named(&text, &path.display().to_string())?)
}

fn parse_format(root: &Element, filename: &str) -> ProfileResult<i64> {
    let value = root.get("format").unwrap_or("");
    let text = value.trim();
    let malformed = || ProfileError::MalformedFormat {
        filename: filename.to_string(),
        format: text.to_string(),
    };
    let unsupported = || ProfileError::UnsupportedFormat {
        filename: filename.to_string(),
        format: text.to_string(),
    };
    let format: i64 = match text.parse() {
        Ok(format) => format,
        Err(e) => {
            return Err(match e.kind() {
                IntErrorKind::PosOverflow => unsupported(),
                IntErrorKind::NegOverflow => malformed(),
                _ => ProfileError::NonIntegerFormat {
                    filename: filename.to_string(),
                    value: value.to_string(),
                },
            })
        }
    };
    if format <= 0 {
        return Err(malformed());
    }
    if !SUPPORTED_FORMATS.contains(&format) {
        return Err(unsupported());
    }
    Ok(format)
}
