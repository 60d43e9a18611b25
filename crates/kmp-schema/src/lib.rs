//! # kmp-schema — Schema Validation & Defaults Overlay
//!
//! Structural validation for the profile manifest and for every policy and
//! authority fragment it references.
//!
//! ## Engine seam (`engine`)
//!
//! The parser never talks to a concrete schema implementation. It loads
//! schemas by name through [`SchemaSource`] and checks documents through
//! [`DocumentSchema`], so tests can substitute fakes that pass, fail, or
//! declare arbitrary structure.
//!
//! ## JSON Schema backend (`validate`, `projection`)
//!
//! The production engine projects an XML [`Element`](kmp_core::Element)
//! tree onto a JSON value (attributes as `@name`, text as `#text`, child
//! elements grouped into arrays by tag) and validates it with the
//! `jsonschema` crate against the bundled `schemas/*.schema.json` files.
//! Violations carry an XPath-like location such as
//! `/profile/policies[1]/policy[2]/policy_path[1]`.
//!
//! ## Defaults overlay (`defaults`)
//!
//! [`SchemaOverlay`] fills the optional gaps of a fragment from a defaults
//! document without ever overriding explicit values.
//!
//! ## Crate Policy
//!
//! - Depends only on `kmp-core` internally.
//! - Compiled schemas are immutable after load and shared through `Arc`.

pub mod defaults;
pub mod engine;
pub mod error;
pub mod projection;
pub mod validate;

pub use defaults::{DefaultsMerger, SchemaOverlay};
pub use engine::{DocumentSchema, SchemaSource};
pub use error::{SchemaError, ValidationViolations, Violation};
pub use validate::{
    check_schema, check_schema_text, JsonSchema, SchemaRegistry, AUTHORITIES_SCHEMA,
    POLICIES_SCHEMA, PROFILE_SCHEMA,
};
