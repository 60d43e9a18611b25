//! # kmp-cli — keymint-profile command-line tool
//!
//! Thin operator surface over `kmp-profile`.
//!
//! ## Subcommands
//!
//! - `keymint-profile validate <PATH>...` — parse and validate profiles.
//! - `keymint-profile show <PATH> [--json]` — print a parsed profile.
//! - `keymint-profile init <DIR> [--template <DIR>]` — bootstrap a profile.
//!
//! ```bash
//! keymint-profile validate profiles/talker profiles/listener
//! KEYMINT_SCHEMA_DIR=./schemas keymint-profile -v show profiles/talker --json
//! ```
//!
//! ## Exit codes
//!
//! `0` success, `1` at least one profile failed, `2` operational error
//! (unreadable schemas, unwritable target).

pub mod init;
pub mod show;
pub mod validate;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use kmp_profile::{ProfileError, ProfileParser};

use crate::init::InitArgs;
use crate::show::ShowArgs;
use crate::validate::ValidateArgs;

/// Exit code for a run where every profile passed.
pub const EXIT_OK: u8 = 0;
/// Exit code for a run where at least one profile failed.
pub const EXIT_FAILED: u8 = 1;
/// Exit code for operational errors.
pub const EXIT_ERROR: u8 = 2;

/// Validate, inspect and bootstrap keymint profile manifests.
#[derive(Parser, Debug)]
#[command(name = "keymint-profile", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Load `*.schema.json` files from this directory instead of the
    /// bundled schemas.
    #[arg(long, env = "KEYMINT_SCHEMA_DIR", global = true)]
    pub schema_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Parse and validate one or more profiles.
    Validate(ValidateArgs),

    /// Print a parsed profile.
    Show(ShowArgs),

    /// Create a new profile directory from a template.
    Init(InitArgs),
}

/// Build the profile parser, from `schema_dir` when given.
pub fn build_parser(schema_dir: Option<&Path>) -> Result<ProfileParser> {
    match schema_dir {
        Some(dir) => {
            tracing::debug!(schema_dir = %dir.display(), "loading schemas from directory");
            ProfileParser::from_schema_dir(dir)
                .with_context(|| format!("failed to load schemas from {}", dir.display()))
        }
        None => ProfileParser::bundled().context("failed to load bundled schemas"),
    }
}

/// Whether `err` describes the profile rather than the tool's environment.
///
/// Such errors are reported per profile and turn the exit code into
/// [`EXIT_FAILED`]; anything else aborts the command.
pub fn is_profile_failure(err: &ProfileError) -> bool {
    err.is_invalid_profile() || err.is_path_error() || err.is_format_error()
}

/// Dispatch a parsed command line. Returns the process exit code.
pub fn run(cli: &Cli, out: &mut dyn std::io::Write) -> Result<u8> {
    match &cli.command {
        Commands::Validate(args) => {
            let parser = build_parser(cli.schema_dir.as_deref())?;
            validate::run_validate(args, &parser, out)
        }
        Commands::Show(args) => {
            let parser = build_parser(cli.schema_dir.as_deref())?;
            show::run_show(args, &parser, out)
        }
        Commands::Init(args) => init::run_init(args, out),
    }
}
