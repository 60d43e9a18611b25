//! # Runtime Schema Validation
//!
//! Validates projected XML documents against JSON Schema (Draft 2020-12)
//! definitions. The three schemas the profile pipeline needs are bundled
//! into the crate from the workspace `schemas/` directory; a different set
//! can be loaded from disk with [`SchemaRegistry::from_dir`].
//!
//! ## Design
//!
//! [`SchemaRegistry`] compiles every schema once at construction and hands
//! out shared [`JsonSchema`] handles. Validation errors carry the XPath-like
//! location of the violating node and the engine's message.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use jsonschema::Validator;
use serde_json::Value;

use kmp_core::Element;

use crate::engine::{DocumentSchema, SchemaSource};
use crate::error::{SchemaError, ValidationViolations, Violation};
use crate::projection::{project_document, xpath_of};

/// Schema for the root `keymint_profile.xml` manifest.
pub const PROFILE_SCHEMA: &str = "keymint_profile";
/// Schema for policy fragments.
pub const POLICIES_SCHEMA: &str = "policies";
/// Schema for authority fragments.
pub const AUTHORITIES_SCHEMA: &str = "authorities";

const SCHEMA_SUFFIX: &str = ".schema.json";

/// `$ref` chains longer than this are treated as unresolvable.
const MAX_REF_DEPTH: usize = 16;

const BUNDLED: [(&str, &str); 3] = [
    (
        PROFILE_SCHEMA,
        include_str!("../../../schemas/keymint_profile.schema.json"),
    ),
    (
        POLICIES_SCHEMA,
        include_str!("../../../schemas/policies.schema.json"),
    ),
    (
        AUTHORITIES_SCHEMA,
        include_str!("../../../schemas/authorities.schema.json"),
    ),
];

// ---------------------------------------------------------------------------
// JsonSchema
// ---------------------------------------------------------------------------

/// A compiled JSON Schema applied to projected XML documents.
pub struct JsonSchema {
    name: String,
    raw: Value,
    validator: Validator,
}

impl fmt::Debug for JsonSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsonSchema")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl JsonSchema {
    /// Compile a parsed schema document.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::SchemaCompile`] if `raw` is not a valid
    /// Draft 2020-12 schema.
    pub fn compile(name: impl Into<String>, raw: Value) -> Result<Self, SchemaError> {
        let name = name.into();
        let validator = jsonschema::options()
            .with_draft(jsonschema::Draft::Draft202012)
            .build(&raw)
            .map_err(|e| SchemaError::SchemaCompile {
                name: name.clone(),
                reason: e.to_string(),
            })?;
        Ok(Self {
            name,
            raw,
            validator,
        })
    }

    /// Parse and compile schema text.
    pub fn parse(name: impl Into<String>, text: &str) -> Result<Self, SchemaError> {
        let name = name.into();
        let raw: Value = serde_json::from_str(text).map_err(|e| SchemaError::SchemaLoad {
            path: name.clone(),
            reason: format!("invalid JSON: {e}"),
        })?;
        Self::compile(name, raw)
    }

    /// The raw schema document.
    pub fn raw(&self) -> &Value {
        &self.raw
    }

    /// Follow local `$ref`s until a concrete schema node is reached.
    fn resolve<'a>(&'a self, mut node: &'a Value) -> Option<&'a Value> {
        for _ in 0..MAX_REF_DEPTH {
            match node.get("$ref").and_then(Value::as_str) {
                Some(reference) => {
                    let pointer = reference.strip_prefix('#')?;
                    node = self.raw.pointer(pointer)?;
                }
                None => return Some(node),
            }
        }
        None
    }

    /// The element schema behind a property: the array's `items` when the
    /// property groups repeated children, the property itself otherwise.
    fn element_schema<'a>(&'a self, property: &'a Value) -> Option<&'a Value> {
        let property = self.resolve(property)?;
        match property.get("items") {
            Some(items) => self.resolve(items),
            None => Some(property),
        }
    }
}

fn is_closed(node: &Value) -> bool {
    matches!(node.get("additionalProperties"), Some(Value::Bool(false)))
}

impl DocumentSchema for JsonSchema {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_valid(&self, document: &Element) -> bool {
        self.validator.is_valid(&project_document(document))
    }

    fn validate(&self, document: &Element) -> Result<(), ValidationViolations> {
        let instance = project_document(document);
        let violations: Vec<Violation> = self
            .validator
            .iter_errors(&instance)
            .map(|e| Violation {
                location: xpath_of(&e.instance_path.to_string()),
                message: e.to_string(),
            })
            .collect();
        if violations.is_empty() {
            Ok(())
        } else {
            Err(ValidationViolations::new(violations))
        }
    }

    fn declares(&self, path: &[&str]) -> bool {
        let Some(mut node) = self.resolve(&self.raw) else {
            return true;
        };
        for tag in path {
            match node.get("properties").and_then(|p| p.get(*tag)) {
                Some(property) => match self.element_schema(property) {
                    Some(next) => node = next,
                    None => return true,
                },
                None => return !is_closed(node),
            }
        }
        true
    }
}

// ---------------------------------------------------------------------------
// SchemaRegistry
// ---------------------------------------------------------------------------

/// Named, pre-compiled schemas.
///
/// Loads every schema at construction time and provides shared handles to
/// them through [`SchemaSource`].
pub struct SchemaRegistry {
    /// Directory the schemas were read from; `None` for bundled schemas.
    schema_dir: Option<PathBuf>,
    schemas: HashMap<String, Arc<JsonSchema>>,
}

impl fmt::Debug for SchemaRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaRegistry")
            .field("schema_dir", &self.schema_dir)
            .field("schemas", &self.schema_names())
            .finish()
    }
}

impl SchemaRegistry {
    /// Compile the schemas shipped with this crate.
    ///
    /// # Errors
    ///
    /// Only fails if a bundled schema is itself broken.
    pub fn bundled() -> Result<Self, SchemaError> {
        let mut schemas = HashMap::new();
        for (name, text) in BUNDLED {
            schemas.insert(name.to_string(), Arc::new(JsonSchema::parse(name, text)?));
        }
        tracing::debug!(count = schemas.len(), "compiled bundled schemas");
        Ok(Self {
            schema_dir: None,
            schemas,
        })
    }

    /// Load and compile every `*.schema.json` file in `schema_dir`.
    ///
    /// Each schema is registered under its filename without the
    /// `.schema.json` suffix.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::SchemaLoad`] if the directory or any schema
    /// file cannot be read or parsed, and [`SchemaError::SchemaCompile`] if
    /// a schema does not compile.
    pub fn from_dir(schema_dir: impl AsRef<Path>) -> Result<Self, SchemaError> {
        let schema_dir = schema_dir.as_ref().to_path_buf();
        let entries = std::fs::read_dir(&schema_dir).map_err(|e| SchemaError::SchemaLoad {
            path: schema_dir.display().to_string(),
            reason: format!("cannot read schema directory: {e}"),
        })?;

        let mut schemas = HashMap::new();
        for entry in entries {
            let path = entry?.path();
            let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            let Some(name) = file_name.strip_suffix(SCHEMA_SUFFIX) else {
                continue;
            };
            let text = std::fs::read_to_string(&path).map_err(|e| SchemaError::SchemaLoad {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;
            let raw: Value = serde_json::from_str(&text).map_err(|e| SchemaError::SchemaLoad {
                path: path.display().to_string(),
                reason: format!("invalid JSON: {e}"),
            })?;
            schemas.insert(name.to_string(), Arc::new(JsonSchema::compile(name, raw)?));
        }

        tracing::debug!(
            dir = %schema_dir.display(),
            count = schemas.len(),
            "compiled schemas from directory"
        );
        Ok(Self {
            schema_dir: Some(schema_dir),
            schemas,
        })
    }

    /// Directory the schemas were loaded from, if any.
    pub fn schema_dir(&self) -> Option<&Path> {
        self.schema_dir.as_deref()
    }

    /// Returns the number of loaded schemas.
    pub fn schema_count(&self) -> usize {
        self.schemas.len()
    }

    /// Returns the names of all loaded schemas, sorted alphabetically.
    pub fn schema_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.schemas.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Look up a compiled schema by name.
    pub fn get(&self, name: &str) -> Option<Arc<JsonSchema>> {
        self.schemas.get(name).cloned()
    }
}

impl SchemaSource for SchemaRegistry {
    fn load(&self, name: &str) -> Result<Arc<dyn DocumentSchema>, SchemaError> {
        match self.schemas.get(name) {
            Some(schema) => {
                let schema: Arc<dyn DocumentSchema> = schema.clone();
                Ok(schema)
            }
            None => Err(SchemaError::SchemaNotFound(name.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// check_schema
// ---------------------------------------------------------------------------

/// Check `document` against `schema`.
///
/// Runs the fast validity check first and asks the engine for its detailed
/// diagnostic only when that fails.
///
/// # Errors
///
/// Returns [`SchemaError::InvalidDocument`] labelled with `label` when the
/// document does not conform.
pub fn check_schema(
    schema: &dyn DocumentSchema,
    document: &Element,
    label: Option<&str>,
) -> Result<(), SchemaError> {
    if schema.is_valid(document) {
        return Ok(());
    }
    let violations = match schema.validate(document) {
        Err(violations) => violations,
        Ok(()) => ValidationViolations::single(
            "",
            format!("document rejected by schema '{}'", schema.name()),
        ),
    };
    Err(SchemaError::InvalidDocument {
        label: label.map(str::to_string),
        violations,
    })
}

/// Parse `text` and check the result against `schema`.
///
/// Text that is not well-formed XML is reported the same way as a schema
/// violation, at the document root.
pub fn check_schema_text(
    schema: &dyn DocumentSchema,
    text: &str,
    label: Option<&str>,
) -> Result<Element, SchemaError> {
    let root = Element::parse(text).map_err(|e| SchemaError::InvalidDocument {
        label: label.map(str::to_string),
        violations: ValidationViolations::single("", e.reason()),
    })?;
    check_schema(schema, &root, label)?;
    Ok(root)
}
