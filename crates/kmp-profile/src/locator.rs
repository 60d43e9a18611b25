//! Manifest discovery.
//!
//! Metadata checks only; nothing here opens a file.

use std::path::{Path, PathBuf};

use crate::error::{ProfileError, ProfileResult};

/// The well-known manifest filename inside a profile directory.
pub const PROFILE_MANIFEST_FILENAME: &str = "keymint_profile.xml";

/// Resolve `path` to a manifest file.
///
/// A regular file is returned unchanged. A directory resolves to its
/// `keymint_profile.xml`.
///
/// # Errors
///
/// - [`ProfileError::MissingManifest`] for a directory without a manifest.
/// - [`ProfileError::NotAProfile`] for anything else.
pub fn resolve_manifest(path: impl AsRef<Path>) -> ProfileResult<PathBuf> {
    let path = path.as_ref();
    if path.is_file() {
        return Ok(path.to_path_buf());
    }
    if path.is_dir() {
        let manifest = path.join(PROFILE_MANIFEST_FILENAME);
        if manifest.is_file() {
            return Ok(manifest);
        }
        return Err(ProfileError::MissingManifest {
            dir: path.to_path_buf(),
        });
    }
    Err(ProfileError::NotAProfile {
        path: path.to_path_buf(),
    })
}

/// True when `path` is a directory holding a manifest file.
pub fn profile_exists_at(path: impl AsRef<Path>) -> bool {
    let path = path.as_ref();
    path.is_dir() && path.join(PROFILE_MANIFEST_FILENAME).is_file()
}
