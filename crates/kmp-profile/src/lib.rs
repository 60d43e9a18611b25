//! # kmp-profile — Keymint Profile Manifests
//!
//! Parses and validates `keymint_profile.xml`, the manifest a keymint
//! keystore build reads to learn which policies and certificate authorities
//! a profile aggregates.
//!
//! ## Pipeline
//!
//! 1. **Locate** ([`locator`]): a path is either the manifest itself or a
//!    directory holding `keymint_profile.xml`.
//! 2. **Check** the manifest against the `keymint_profile` schema.
//! 3. **Merge** ([`parser`]): every `<policy>` and `<authority>` reference
//!    is loaded relative to the profile directory, overlaid with its
//!    optional defaults document, checked against its own schema, and its
//!    `policy` / `authority` elements are appended in document order.
//! 4. **Validate** ([`profile`]): naming, version and `policy_type` rules
//!    are evaluated together and reported in one error.
//!
//! ```no_run
//! let profile = kmp_profile::parse_profile("profiles/talker")?;
//! println!("{} uses {}", profile.name.as_deref().unwrap_or(""), profile.get_policy_type()?);
//! # Ok::<(), kmp_profile::ProfileError>(())
//! ```
//!
//! New profile directories are created from a template with
//! [`bootstrap`].
//!
//! ## Crate Policy
//!
//! - No partially parsed [`Profile`] is ever returned.
//! - Each wrapping boundary adds its context once; the manifest path is
//!   prefixed by [`ProfileParser::parse`] only.

pub mod bootstrap;
pub mod error;
pub mod locator;
pub mod parser;
pub mod profile;

pub use bootstrap::{bootstrap_profile, bootstrap_profile_from};
pub use error::{ProfileError, ProfileResult, ProfileRule, RuleViolation, RuleViolations};
pub use locator::{profile_exists_at, resolve_manifest, PROFILE_MANIFEST_FILENAME};
pub use parser::{parse_profile, parse_profile_string, FragmentKind, ProfileParser};
pub use profile::{NamingConvention, Profile, ProfileField, PropertyValue, SUPPORTED_FORMATS};
