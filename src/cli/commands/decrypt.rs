//! `vultitool decrypt` — decrypt vault files and export their contents.
//!
//! A single file goes to stdout (or `--output`). Several files need
//! `--output-dir` and are decrypted in parallel, one export each.

use std::fs;
use std::path::{Path, PathBuf};

use crate::cli::output;
use crate::cli::{load_settings, Cli, PassphraseArgs, PassphraseSource};
use crate::errors::{IoError, Result, VultError};
use crate::pipeline::{self, CachedPassphrase, Context, Job};
use crate::vault::{Destination, ExportFormat};

/// Execute the `decrypt` command.
pub fn execute(
    cli: &Cli,
    ctx: &Context,
    files: &[PathBuf],
    passphrase: &PassphraseArgs,
    output_path: Option<&Path>,
    output_dir: Option<&Path>,
    format: Option<&str>,
) -> Result<()> {
    let settings = load_settings(cli)?;
    let format: ExportFormat = match format {
        Some(name) => name.parse()?,
        None => settings.export_format()?,
    };
    let passphrase = CachedPassphrase::new(PassphraseSource::from_args(passphrase, &settings));

    match (files, output_dir) {
        ([file], None) => {
            let destination = output_path.map_or(Destination::Stdout, |p| {
                Destination::File(p.to_path_buf())
            });
            let job = Job {
                input: file.clone(),
                destination,
                format,
            };
            pipeline::run(ctx, &job, &passphrase)?;

            // Stdout carries the export itself, so only confirm file writes.
            if let Destination::File(path) = &job.destination {
                output::success(&format!(
                    "Decrypted {} to {}",
                    file.display(),
                    path.display()
                ));
            }
            Ok(())
        }
        (_, None) => Err(VultError::Usage(
            "decrypting several files requires --output-dir".into(),
        )),
        (_, Some(dir)) => {
            fs::create_dir_all(dir).map_err(|source| IoError::WriteFailed {
                destination: dir.display().to_string(),
                source,
            })?;

            let jobs: Vec<Job> = files
                .iter()
                .map(|file| Job::into_dir(file, dir, format))
                .collect();
            let results = pipeline::run_batch(ctx, &jobs, &passphrase, settings.workers)?;

            let mut failed = 0;
            for (job, result) in jobs.iter().zip(&results) {
                match (result, &job.destination) {
                    (Ok(()), Destination::File(path)) => output::success(&format!(
                        "{} \u{2192} {}",
                        job.input.display(),
                        path.display()
                    )),
                    (Ok(()), Destination::Stdout) => {}
                    (Err(e), _) => {
                        failed += 1;
                        output::error(&format!("{}: {e}", job.input.display()));
                    }
                }
            }

            if ctx.cancel_token().is_cancelled() {
                return Err(VultError::Cancelled);
            }
            if failed > 0 {
                return Err(VultError::BatchFailed {
                    failed,
                    total: jobs.len(),
                });
            }
            output::info(&format!("Decrypted {} vault files.", jobs.len()));
            Ok(())
        }
    }
}
