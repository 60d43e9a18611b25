//! # kmp-core — Foundational Types for Keymint Profiles
//!
//! Every other crate in the workspace depends on `kmp-core`; it depends on
//! nothing internal.
//!
//! ## Contents
//!
//! - [`Element`]: an owned, immutable-by-convention XML element tree. The
//!   profile manifest, every policy and authority fragment, and every
//!   defaults document are parsed into this type. Lookups use slash-separated
//!   tag paths (`policies/policy`) evaluated in document order.
//!
//! - [`XmlError`]: the single error raised when a document is not
//!   well-formed XML.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `kmp-*` crates (this is the leaf of the DAG).
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.
//! - DTDs are rejected by the parser; manifests never need them.

pub mod error;
pub mod xml;

pub use error::XmlError;
pub use xml::Element;
