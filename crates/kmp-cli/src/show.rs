//! # Show Subcommand
//!
//! Prints a short summary of one profile, or the whole parsed profile as
//! JSON with `--json`.

use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use kmp_profile::{Profile, ProfileParser};

use crate::{is_profile_failure, EXIT_FAILED, EXIT_OK};

/// Arguments for the `keymint-profile show` subcommand.
#[derive(Args, Debug)]
pub struct ShowArgs {
    /// Profile directory or manifest file.
    #[arg(value_name = "PATH")]
    pub path: PathBuf,

    /// Print the parsed profile as pretty JSON.
    #[arg(long)]
    pub json: bool,
}

/// Execute the show subcommand.
pub fn run_show(args: &ShowArgs, parser: &ProfileParser, out: &mut dyn Write) -> Result<u8> {
    let profile = match parser.parse(&args.path) {
        Ok(profile) => profile,
        Err(e) if is_profile_failure(&e) => {
            writeln!(out, "FAIL: {}", args.path.display())?;
            for line in e.to_string().lines() {
                writeln!(out, "  {line}")?;
            }
            return Ok(EXIT_FAILED);
        }
        Err(e) => {
            return Err(e).with_context(|| format!("failed to read {}", args.path.display()))
        }
    };

    if args.json {
        let json = serde_json::to_string_pretty(&profile).context("failed to serialize profile")?;
        writeln!(out, "{json}")?;
    } else {
        write_summary(&profile, out)?;
    }
    Ok(EXIT_OK)
}

fn write_summary(profile: &Profile, out: &mut dyn Write) -> Result<()> {
    let field = |v: &Option<String>| v.clone().unwrap_or_else(|| "-".to_string());
    writeln!(out, "name:        {}", field(&profile.name))?;
    writeln!(out, "version:     {}", field(&profile.version))?;
    writeln!(
        out,
        "format:      {}",
        profile
            .profile_format
            .map_or_else(|| "-".to_string(), |f| f.to_string())
    )?;
    writeln!(
        out,
        "policy_type: {}",
        profile.get_policy_type().unwrap_or("-")
    )?;
    writeln!(out, "policies:    {}", profile.policy_count())?;
    writeln!(out, "authorities: {}", profile.authority_count())?;
    if let Some(description) = &profile.description {
        writeln!(out, "description: {}", description.trim())?;
    }
    if let Some(filename) = &profile.filename {
        writeln!(out, "manifest:    {}", filename.display())?;
    }
    Ok(())
}
