//! CLI module — Clap argument parser, output helpers, and command implementations.

pub mod commands;
pub mod output;

use std::path::PathBuf;

use clap::{ArgAction, Args, Parser};
use zeroize::Zeroizing;

use crate::config::Settings;
use crate::errors::{Result, VultError};
use crate::pipeline::PassphraseProvider;

/// vultitool: decrypt and inspect Vultisig vault backups.
#[derive(Parser)]
#[command(
    name = "vultitool",
    about = "Decrypt and inspect Vultisig vault backups",
    version,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase diagnostic output on stderr (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file (default: ./vultitool.toml if present)
    #[arg(long, env = "VULTITOOL_CONFIG", global = true)]
    pub config: Option<PathBuf>,
}

/// All available subcommands.
#[derive(clap::Subcommand)]
pub enum Commands {
    /// Decrypt one or more .vult files and export their contents
    Decrypt {
        /// Vault files to decrypt
        #[arg(required = true)]
        files: Vec<PathBuf>,

        #[command(flatten)]
        passphrase: PassphraseArgs,

        /// Write the export to this file instead of stdout
        #[arg(short, long, conflicts_with = "output_dir")]
        output: Option<PathBuf>,

        /// Write one export per input into this directory
        #[arg(long)]
        output_dir: Option<PathBuf>,

        /// Export format: json (default) or toml
        #[arg(short, long)]
        format: Option<String>,
    },

    /// Show container metadata without decrypting
    Inspect {
        /// Vault file to inspect
        file: PathBuf,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,

        /// Include key share material for unencrypted vaults
        #[arg(long)]
        show_keyshares: bool,
    },

    /// Decrypt a vault and check that its contents are consistent
    Validate {
        /// Vault file to validate
        file: PathBuf,

        /// Also check library type, share keys and local party membership
        #[arg(long)]
        strict: bool,

        #[command(flatten)]
        passphrase: PassphraseArgs,
    },

    /// Show version
    Version,
}

/// How to obtain the passphrase for encrypted vaults.
#[derive(Args, Debug, Clone, Default)]
pub struct PassphraseArgs {
    /// Always prompt for the passphrase interactively
    #[arg(long, conflicts_with = "passphrase_env")]
    pub passphrase_prompt: bool,

    /// Read the passphrase from this environment variable
    #[arg(long, value_name = "VAR")]
    pub passphrase_env: Option<String>,
}

// ---------------------------------------------------------------------------
// Shared helpers used by multiple commands
// ---------------------------------------------------------------------------

/// Load settings from `--config` or the working directory.
pub fn load_settings(cli: &Cli) -> Result<Settings> {
    Settings::resolve(cli.config.as_deref())
}

/// Where the passphrase comes from once the flags are resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PassphraseSource {
    /// This variable must be set and non-empty.
    Env(String),
    /// Use this variable if it is set, otherwise prompt.
    EnvOrPrompt(String),
    Prompt,
}

impl PassphraseSource {
    /// Resolve the flags, in order:
    /// 1. `--passphrase-env VAR`
    /// 2. `--passphrase-prompt`
    /// 3. the configured variable (`VULTITOOL_PASSPHRASE`), then a prompt
    pub fn from_args(args: &PassphraseArgs, settings: &Settings) -> Self {
        if let Some(var) = &args.passphrase_env {
            return PassphraseSource::Env(var.clone());
        }
        if args.passphrase_prompt {
            return PassphraseSource::Prompt;
        }
        PassphraseSource::EnvOrPrompt(settings.passphrase_env.clone())
    }
}

fn read_env(var: &str) -> Option<Zeroizing<String>> {
    std::env::var(var)
        .ok()
        .filter(|pw| !pw.is_empty())
        .map(Zeroizing::new)
}

/// Prompt for the vault passphrase on the terminal.
///
/// Returns `Zeroizing<String>` so the passphrase is wiped from memory on drop.
pub fn prompt_passphrase() -> Result<Zeroizing<String>> {
    let pw = dialoguer::Password::new()
        .with_prompt("Enter vault passphrase")
        .allow_empty_password(true)
        .interact()
        .map_err(|e| VultError::PromptFailed(e.to_string()))?;
    Ok(Zeroizing::new(pw))
}

impl PassphraseProvider for PassphraseSource {
    fn passphrase(&self) -> Result<Zeroizing<String>> {
        match self {
            PassphraseSource::Env(var) => read_env(var).ok_or_else(|| {
                VultError::Usage(format!(
                    "environment variable {var} is not set or empty (from --passphrase-env)"
                ))
            }),
            PassphraseSource::EnvOrPrompt(var) => match read_env(var) {
                Some(pw) => Ok(pw),
                None => prompt_passphrase(),
            },
            PassphraseSource::Prompt => prompt_passphrase(),
        }
    }
}
