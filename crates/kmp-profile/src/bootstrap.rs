//! # Profile Bootstrap
//!
//! Creates a new profile directory from a template. The bundled template is
//! a complete, valid profile: a manifest referencing one policy fragment
//! and one authority fragment, each with a defaults document.

use std::fs;
use std::io;
use std::path::Path;

use crate::error::{ProfileError, ProfileResult};

/// Files of the bundled template, relative to the profile root.
const TEMPLATE: &[(&str, &str)] = &[
    (
        "keymint_profile.xml",
        include_str!("../templates/profile/keymint_profile.xml"),
    ),
    ("policies.xml", include_str!("../templates/profile/policies.xml")),
    (
        "authorities.xml",
        include_str!("../templates/profile/authorities.xml"),
    ),
    (
        "defaults/policies.xml",
        include_str!("../templates/profile/defaults/policies.xml"),
    ),
    (
        "defaults/authorities.xml",
        include_str!("../templates/profile/defaults/authorities.xml"),
    ),
];

/// Write the bundled template into `target`.
///
/// # Errors
///
/// [`ProfileError::TargetExists`] when `target` exists; I/O failures as
/// [`ProfileError::Io`].
pub fn bootstrap_profile(target: impl AsRef<Path>) -> ProfileResult<()> {
    let target = target.as_ref();
    ensure_absent(target)?;
    for (relative, contents) in TEMPLATE {
        let path = target.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| io_error(parent, e))?;
        }
        fs::write(&path, contents).map_err(|e| io_error(&path, e))?;
    }
    tracing::info!(profile = %target.display(), files = TEMPLATE.len(), "bootstrapped profile");
    Ok(())
}

/// Copy the template tree at `template` into `target`.
///
/// # Errors
///
/// [`ProfileError::TemplateNotFound`] when `template` is not a directory,
/// [`ProfileError::TargetExists`] when `target` exists.
pub fn bootstrap_profile_from(
    template: impl AsRef<Path>,
    target: impl AsRef<Path>,
) -> ProfileResult<()> {
    let (template, target) = (template.as_ref(), target.as_ref());
    if !template.is_dir() {
        return Err(ProfileError::TemplateNotFound {
            path: template.to_path_buf(),
        });
    }
    ensure_absent(target)?;
    let copied = copy_tree(template, target)?;
    tracing::info!(
        template = %template.display(),
        profile = %target.display(),
        files = copied,
        "bootstrapped profile from template"
    );
    Ok(())
}

fn ensure_absent(target: &Path) -> ProfileResult<()> {
    if target.exists() {
        return Err(ProfileError::TargetExists {
            path: target.to_path_buf(),
        });
    }
    Ok(())
}

fn copy_tree(from: &Path, to: &Path) -> ProfileResult<usize> {
    fs::create_dir_all(to).map_err(|e| io_error(to, e))?;
    let mut copied = 0;
    for entry in fs::read_dir(from).map_err(|e| io_error(from, e))? {
        let entry = entry.map_err(|e| io_error(from, e))?;
        let source = entry.path();
        let dest = to.join(entry.file_name());
        if source.is_dir() {
            copied += copy_tree(&source, &dest)?;
        } else {
            fs::copy(&source, &dest).map_err(|e| io_error(&source, e))?;
            copied += 1;
        }
    }
    Ok(copied)
}

fn io_error(path: &Path, source: io::Error) -> ProfileError {
    ProfileError::Io {
        path: path.to_path_buf(),
        source,
    }
}
