//! # Init Subcommand
//!
//! Bootstraps a new profile directory from the bundled template or from a
//! template directory.

use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use kmp_profile::{bootstrap_profile, bootstrap_profile_from};

use crate::EXIT_OK;

/// Arguments for the `keymint-profile init` subcommand.
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Directory to create. Must not exist yet.
    #[arg(value_name = "DIR")]
    pub dir: PathBuf,

    /// Copy this template directory instead of the bundled template.
    #[arg(long, value_name = "DIR")]
    pub template: Option<PathBuf>,
}

/// Execute the init subcommand.
pub fn run_init(args: &InitArgs, out: &mut dyn Write) -> Result<u8> {
    match &args.template {
        Some(template) => bootstrap_profile_from(template, &args.dir).with_context(|| {
            format!(
                "failed to create profile {} from {}",
                args.dir.display(),
                template.display()
            )
        })?,
        None => bootstrap_profile(&args.dir)
            .with_context(|| format!("failed to create profile {}", args.dir.display()))?,
    }
    writeln!(out, "Created profile at {}", args.dir.display())?;
    Ok(EXIT_OK)
}
