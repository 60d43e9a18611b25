//! # Validate Subcommand
//!
//! Parses every given profile and prints one `OK` or `FAIL` line per path,
//! followed by a summary.

use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use kmp_profile::ProfileParser;

use crate::{is_profile_failure, EXIT_FAILED, EXIT_OK};

/// Arguments for the `keymint-profile validate` subcommand.
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Profile directories or manifest files.
    #[arg(value_name = "PATH", required = true)]
    pub paths: Vec<PathBuf>,
}

/// Execute the validate subcommand.
///
/// Returns exit code: 0 when every profile passed, 1 otherwise.
pub fn run_validate(args: &ValidateArgs, parser: &ProfileParser, out: &mut dyn Write) -> Result<u8> {
    let mut failed = 0usize;

    for path in &args.paths {
        match parser.parse(path) {
            Ok(profile) => {
                let manifest = profile.filename.as_deref().unwrap_or(path.as_path());
                writeln!(
                    out,
                    "OK: {} ({})",
                    profile.name.as_deref().unwrap_or(""),
                    manifest.display()
                )?;
            }
            Err(e) if is_profile_failure(&e) => {
                tracing::debug!(path = %path.display(), error = %e, "profile failed");
                failed += 1;
                writeln!(out, "FAIL: {}", path.display())?;
                for line in e.to_string().lines() {
                    writeln!(out, "  {line}")?;
                }
            }
            Err(e) => {
                return Err(e).with_context(|| format!("failed to validate {}", path.display()))
            }
        }
    }

    let total = args.paths.len();
    writeln!(out, "Profiles: {}/{} passed", total - failed, total)?;

    Ok(if failed > 0 { EXIT_FAILED } else { EXIT_OK })
}
