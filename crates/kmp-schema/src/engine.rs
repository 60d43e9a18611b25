//! Schema engine capabilities.
//!
//! The parser depends on these two traits only. [`crate::SchemaRegistry`]
//! is the production implementation.

use std::fmt;
use std::sync::Arc;

use kmp_core::Element;

use crate::error::{SchemaError, ValidationViolations};

/// A compiled schema that can check a parsed document.
pub trait DocumentSchema: fmt::Debug {
    /// Registered schema name, e.g. `policies`.
    fn name(&self) -> &str;

    /// Fast validity check without diagnostics.
    fn is_valid(&self, document: &Element) -> bool;

    /// Full validation producing the detailed diagnostic on failure.
    fn validate(&self, document: &Element) -> Result<(), ValidationViolations>;

    /// Whether an element at `path` (tag names from the document root down,
    /// root included) is declared by the schema.
    ///
    /// Engines that cannot answer return `true`.
    fn declares(&self, _path: &[&str]) -> bool {
        true
    }
}

/// Loads compiled schemas by name.
pub trait SchemaSource: fmt::Debug {
    /// Fetch the schema registered under `name`.
    fn load(&self, name: &str) -> Result<Arc<dyn DocumentSchema>, SchemaError>;
}
