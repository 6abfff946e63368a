//! The decode → derive → decrypt → emit pipeline.
//!
//! Every stage receives an explicit `Context` carrying the log
//! dispatcher and the cancellation token; nothing here touches global
//! state. Each file runs independently, so batch mode simply fans the
//! per-file pipeline out over a rayon pool.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use rayon::prelude::*;
use tracing::Dispatch;
use zeroize::Zeroizing;

use crate::crypto::{self, CancelToken};
use crate::errors::{IoError, Result, VultError};
use crate::vault::decrypted::DecryptedVault;
use crate::vault::export::{self, Destination, ExportFormat};
use crate::vault::format::{self, Payload, VaultContainer};

/// Pipeline progress, logged as each stage completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Start,
    Decoded,
    KeyDerived,
    Decrypted,
    Emitted,
    Failed,
}

/// Everything a pipeline run needs besides its inputs.
#[derive(Clone)]
pub struct Context {
    dispatch: Dispatch,
    cancel: CancelToken,
}

impl Context {
    pub fn new(dispatch: Dispatch, cancel: CancelToken) -> Self {
        Self { dispatch, cancel }
    }

    /// A context that logs nothing and is never cancelled.
    pub fn silent() -> Self {
        Self::new(Dispatch::none(), CancelToken::new())
    }

    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    /// Run `f` with this context's dispatcher as the active subscriber.
    pub fn in_scope<T>(&self, f: impl FnOnce() -> T) -> T {
        tracing::dispatcher::with_default(&self.dispatch, f)
    }
}

/// Supplies the passphrase for encrypted containers.
///
/// Only asked when a container actually needs one.
pub trait PassphraseProvider: Sync {
    fn passphrase(&self) -> Result<Zeroizing<String>>;
}

/// A passphrase that is already known.
pub struct FixedPassphrase(pub Zeroizing<String>);

impl FixedPassphrase {
    pub fn new(passphrase: &str) -> Self {
        Self(Zeroizing::new(passphrase.to_string()))
    }
}

impl PassphraseProvider for FixedPassphrase {
    fn passphrase(&self) -> Result<Zeroizing<String>> {
        Ok(self.0.clone())
    }
}

/// Asks an inner provider once and reuses the answer.
///
/// Used in batch mode so one prompt covers every file.
pub struct CachedPassphrase<P> {
    inner: P,
    cached: Mutex<Option<Zeroizing<String>>>,
}

impl<P: PassphraseProvider> CachedPassphrase<P> {
    pub fn new(inner: P) -> Self {
        Self {
            inner,
            cached: Mutex::new(None),
        }
    }
}

impl<P: PassphraseProvider> PassphraseProvider for CachedPassphrase<P> {
    fn passphrase(&self) -> Result<Zeroizing<String>> {
        // A poisoned lock only means another worker panicked mid-prompt.
        let mut cached = self
            .cached
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        if let Some(passphrase) = cached.as_ref() {
            return Ok(passphrase.clone());
        }
        let passphrase = self.inner.passphrase()?;
        *cached = Some(passphrase.clone());
        Ok(passphrase)
    }
}

/// Decrypt an already decoded container.
///
/// For encrypted containers the passphrase is requested, the key is
/// derived with the container's parameters and the AES-GCM tag is
/// verified before the plaintext is parsed.
pub fn decrypt_container(
    ctx: &Context,
    container: &VaultContainer,
    passphrase: &dyn PassphraseProvider,
) -> Result<DecryptedVault> {
    ctx.in_scope(|| -> Result<DecryptedVault> {
        match &container.payload {
            Payload::Plain(bytes) => {
                tracing::debug!("container is not encrypted, skipping key derivation");
                let vault = DecryptedVault::from_protobuf(bytes)?;
                tracing::debug!(stage = ?Stage::Decrypted, "vault parsed");
                Ok(vault)
            }
            Payload::Encrypted {
                nonce,
                ciphertext,
                tag,
            } => {
                let algorithm = container.kdf.algorithm()?;
                let secret = passphrase.passphrase()?;

                tracing::debug!(
                    algorithm = algorithm.as_str(),
                    iterations = container.kdf.iterations,
                    "deriving key"
                );
                let key = crypto::derive(secret.as_bytes(), &container.kdf, &ctx.cancel)?;
                drop(secret);
                tracing::debug!(stage = ?Stage::KeyDerived, "key derived");

                let plaintext = match crypto::decrypt(&key, nonce, ciphertext, tag) {
                    Ok(plaintext) => plaintext,
                    Err(e) => {
                        tracing::warn!("authentication tag mismatch");
                        return Err(e.into());
                    }
                };
                drop(key);

                let vault = DecryptedVault::from_protobuf(&plaintext)?;
                tracing::debug!(stage = ?Stage::Decrypted, "vault decrypted");
                Ok(vault)
            }
        }
    })
}

/// Read, decode and decrypt the vault at `path`.
pub fn open_vault(
    ctx: &Context,
    path: &Path,
    passphrase: &dyn PassphraseProvider,
) -> Result<DecryptedVault> {
    let container = ctx.in_scope(|| {
        tracing::debug!(stage = ?Stage::Start, path = %path.display(), "reading vault");
        let container = format::read_vault_file(path)?;
        tracing::debug!(
            stage = ?Stage::Decoded,
            version = container.version,
            encrypted = container.is_encrypted(),
            payload_len = container.payload_len(),
            "container decoded"
        );
        Ok::<_, VultError>(container)
    })?;
    decrypt_container(ctx, &container, passphrase)
}

/// One file to decrypt and where its export goes.
#[derive(Debug, Clone)]
pub struct Job {
    pub input: PathBuf,
    pub destination: Destination,
    pub format: ExportFormat,
}

impl Job {
    /// A job writing `<output_dir>/<input stem>.<format extension>`.
    pub fn into_dir(input: &Path, output_dir: &Path, format: ExportFormat) -> Self {
        let stem = input
            .file_stem()
            .map_or_else(|| "vault".into(), |s| s.to_string_lossy().into_owned());
        Self {
            input: input.to_path_buf(),
            destination: Destination::File(
                output_dir.join(format!("{stem}.{}", format.extension())),
            ),
            format,
        }
    }
}

/// Run the whole pipeline for one job.
///
/// A failed write removes the partially written export file.
pub fn run(ctx: &Context, job: &Job, passphrase: &dyn PassphraseProvider) -> Result<()> {
    let result = run_stages(ctx, job, passphrase);
    if let Err(e) = &result {
        ctx.in_scope(|| {
            tracing::debug!(
                stage = ?Stage::Failed,
                input = %job.input.display(),
                error = %e,
                "pipeline failed"
            );
        });
    }
    result
}

fn run_stages(ctx: &Context, job: &Job, passphrase: &dyn PassphraseProvider) -> Result<()> {
    let vault = open_vault(ctx, &job.input, passphrase)?;

    ctx.in_scope(|| -> Result<()> {
        let result = export::emit(&vault, &job.destination, job.format);
        discard_failed_export(result, &job.destination)?;
        tracing::info!(stage = ?Stage::Emitted, input = %job.input.display(), "vault exported");
        Ok(())
    })
}

/// Remove the export file left behind by a failed write, passing `result` through.
fn discard_failed_export(result: Result<()>, destination: &Destination) -> Result<()> {
    if let (Err(VultError::Io(IoError::WriteFailed { .. })), Destination::File(path)) =
        (&result, destination)
    {
        match std::fs::remove_file(path) {
            Ok(()) => tracing::warn!(path = %path.display(), "removed partially written export"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(
                path = %path.display(),
                error = %e,
                "cannot remove partially written export"
            ),
        }
    }
    result
}

/// Run `jobs` in parallel on `workers` threads (0 = one per CPU).
///
/// Results come back in input order. A failing file does not stop the
/// others.
pub fn run_batch(
    ctx: &Context,
    jobs: &[Job],
    passphrase: &dyn PassphraseProvider,
    workers: usize,
) -> Result<Vec<Result<()>>> {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .build()
        .map_err(|e| VultError::ConfigError(format!("cannot start worker pool: {e}")))?;

    Ok(pool.install(|| {
        jobs.par_iter()
            .map(|job| run(ctx, job, passphrase))
            .collect()
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::{self, Write};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    /// Passes `limit` bytes through to the file, then fails every write.
    struct FullDisk {
        file: File,
        limit: usize,
    }

    impl Write for FullDisk {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if self.limit == 0 {
                return Err(io::Error::other("no space left on device"));
            }
            let n = self.file.write(&buf[..buf.len().min(self.limit)])?;
            self.limit -= n;
            Ok(n)
        }

        fn flush(&mut self) -> io::Result<()> {
            self.file.flush()
        }
    }

    struct CountingPassphrase(AtomicUsize);

    impl PassphraseProvider for CountingPassphrase {
        fn passphrase(&self) -> Result<Zeroizing<String>> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(Zeroizing::new("pw".into()))
        }
    }

    #[test]
    fn cached_passphrase_asks_once() {
        let cached = CachedPassphrase::new(CountingPassphrase(AtomicUsize::new(0)));
        for _ in 0..3 {
            assert_eq!(cached.passphrase().unwrap().as_str(), "pw");
        }
        assert_eq!(cached.inner.0.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn job_into_dir_uses_input_stem() {
        let job = Job::into_dir(
            Path::new("/vaults/share1of2.vult"),
            Path::new("/out"),
            ExportFormat::Toml,
        );
        assert_eq!(
            job.destination,
            Destination::File(PathBuf::from("/out/share1of2.toml"))
        );
    }

    #[test]
    fn failed_write_removes_partial_export() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("vault.json");
        let destination = Destination::File(path.clone());
        let writer = FullDisk {
            file: File::create(&path).unwrap(),
            limit: 16,
        };

        let result = export::write_all(writer, &"x".repeat(1024), &destination);
        assert_eq!(std::fs::metadata(&path).unwrap().len(), 16);

        let err = discard_failed_export(result, &destination).unwrap_err();
        assert!(matches!(err, VultError::Io(IoError::WriteFailed { .. })));
        assert!(!path.exists());
    }

    #[test]
    fn other_failures_keep_the_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("vault.json");
        std::fs::write(&path, "keep me").unwrap();

        let err = discard_failed_export(
            Err(IoError::AlreadyExists(path.clone()).into()),
            &Destination::File(path.clone()),
        )
        .unwrap_err();
        assert!(matches!(err, VultError::Io(IoError::AlreadyExists(_))));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "keep me");
    }
}
