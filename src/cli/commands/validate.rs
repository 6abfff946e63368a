//! `vultitool validate` — decrypt a vault and check its contents.

use std::path::Path;

use crate::cli::output;
use crate::cli::{load_settings, Cli, PassphraseArgs, PassphraseSource};
use crate::errors::Result;
use crate::pipeline::{self, Context};
use crate::vault::validate;

/// Execute the `validate` command.
pub fn execute(
    cli: &Cli,
    ctx: &Context,
    file: &Path,
    passphrase: &PassphraseArgs,
    strict: bool,
) -> Result<()> {
    let settings = load_settings(cli)?;
    let source = PassphraseSource::from_args(passphrase, &settings);
    let vault = pipeline::open_vault(ctx, file, &source)?;

    validate::check(&vault, strict)?;

    let mode = if strict { "strict" } else { "basic" };
    output::success(&format!(
        "{} is valid ({mode} checks, {} signers, {} key shares)",
        file.display(),
        vault.signers.len(),
        vault.key_shares.len()
    ));
    Ok(())
}
