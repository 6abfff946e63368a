//! Passphrase-based key derivation.
//!
//! Three algorithms are understood, identified by the id stored in the
//! vault container:
//!
//! | id | algorithm            | parameters used                    |
//! |----|----------------------|------------------------------------|
//! | 0  | SHA-256              | none (legacy Vultisig scheme)      |
//! | 1  | PBKDF2-HMAC-SHA256   | salt, iterations                   |
//! | 2  | Argon2id             | salt, iterations, memory, lanes    |
//!
//! Containers without explicit parameters use id 0, which is what the
//! Vultisig apps write: the AES key is simply `SHA-256(passphrase)`.

use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Duration;

use argon2::{Algorithm, Argon2, Params, Version};
use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::{Digest, Sha256};
use zeroize::{Zeroize, Zeroizing};

use super::cancel::CancelToken;
use super::keys::{DerivedKey, KEY_LEN};
use crate::errors::{KeyDerivationError, Result};

/// Length of generated salts in bytes.
const SALT_LEN: usize = 16;

/// Shortest salt accepted for the salted algorithms.
const MIN_SALT_LEN: usize = 8;

/// Minimum safe Argon2 memory cost in KiB (8 MB).
const MIN_MEMORY_KIB: u32 = 8_192;

/// Largest Argon2 memory cost accepted from a container (4 GiB).
const MAX_MEMORY_KIB: u32 = 4_194_304;

/// Largest Argon2 time cost accepted from a container.
const MAX_ARGON2_ITERATIONS: u32 = 64;

/// Largest Argon2 lane count accepted from a container.
const MAX_PARALLELISM: u32 = 64;

/// Largest PBKDF2 round count accepted from a container.
const MAX_PBKDF2_ITERATIONS: u32 = 10_000_000;

/// PBKDF2 rounds between two cancellation checks.
const CANCEL_CHECK_INTERVAL: u32 = 4_096;

/// How often a running Argon2id derivation looks at the cancel token.
const CANCEL_POLL: Duration = Duration::from_millis(10);

/// Key derivation algorithm identifiers as stored on disk.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum KdfAlgorithm {
    Sha256 = 0,
    Pbkdf2HmacSha256 = 1,
    Argon2id = 2,
}

impl KdfAlgorithm {
    pub fn as_str(self) -> &'static str {
        match self {
            KdfAlgorithm::Sha256 => "sha256",
            KdfAlgorithm::Pbkdf2HmacSha256 => "pbkdf2-hmac-sha256",
            KdfAlgorithm::Argon2id => "argon2id",
        }
    }
}

/// Configurable Argon2id parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Argon2Params {
    /// Memory cost in KiB (default: 65 536 = 64 MB).
    pub memory_kib: u32,
    /// Number of iterations (default: 3).
    pub iterations: u32,
    /// Parallelism lanes (default: 4).
    pub parallelism: u32,
}

impl Default for Argon2Params {
    fn default() -> Self {
        Self {
            memory_kib: 65_536,
            iterations: 3,
            parallelism: 4,
        }
    }
}

/// Key derivation parameters exactly as read from a container.
///
/// `algorithm_id` is kept raw so that an unknown id is reported by
/// `derive` rather than by the container decoder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KdfParams {
    pub algorithm_id: i32,
    pub salt: Vec<u8>,
    pub iterations: u32,
    pub memory_kib: u32,
    pub parallelism: u32,
}

impl KdfParams {
    /// The legacy unsalted scheme.
    pub fn sha256() -> Self {
        Self {
            algorithm_id: KdfAlgorithm::Sha256 as i32,
            salt: Vec::new(),
            iterations: 0,
            memory_kib: 0,
            parallelism: 0,
        }
    }

    pub fn pbkdf2(salt: Vec<u8>, iterations: u32) -> Self {
        Self {
            algorithm_id: KdfAlgorithm::Pbkdf2HmacSha256 as i32,
            salt,
            iterations,
            memory_kib: 0,
            parallelism: 0,
        }
    }

    pub fn argon2id(salt: Vec<u8>, params: Argon2Params) -> Self {
        Self {
            algorithm_id: KdfAlgorithm::Argon2id as i32,
            salt,
            iterations: params.iterations,
            memory_kib: params.memory_kib,
            parallelism: params.parallelism,
        }
    }

    /// Resolve the stored id to a known algorithm.
    pub fn algorithm(&self) -> std::result::Result<KdfAlgorithm, KeyDerivationError> {
        KdfAlgorithm::try_from(self.algorithm_id)
            .map_err(|_| KeyDerivationError::UnsupportedAlgorithm(self.algorithm_id))
    }
}

/// Derive a 32-byte key from `passphrase` with the given parameters.
///
/// The same passphrase and parameters always produce the same key.
/// `cancel` is checked before starting and periodically while the
/// derivation runs; a cancelled derivation returns `Cancelled`.
/// Parameters outside the accepted bounds fail with `InvalidParameters`.
pub fn derive(passphrase: &[u8], params: &KdfParams, cancel: &CancelToken) -> Result<DerivedKey> {
    let algorithm = params.algorithm()?;
    cancel.check()?;

    let mut key = [0u8; KEY_LEN];
    let outcome = match algorithm {
        KdfAlgorithm::Sha256 => {
            key.copy_from_slice(&Sha256::digest(passphrase));
            Ok(())
        }
        KdfAlgorithm::Pbkdf2HmacSha256 => {
            check_salt(&params.salt)?;
            check_pbkdf2_iterations(params.iterations)?;
            pbkdf2_hmac_sha256(passphrase, &params.salt, params.iterations, cancel, &mut key)
        }
        KdfAlgorithm::Argon2id => {
            check_salt(&params.salt)?;
            let argon2_params = Argon2Params {
                memory_kib: params.memory_kib,
                iterations: params.iterations,
                parallelism: params.parallelism,
            };
            argon2id(passphrase, &params.salt, &argon2_params, cancel, &mut key)
        }
    };

    if let Err(e) = outcome {
        key.zeroize();
        return Err(e);
    }

    let derived = DerivedKey::new(key, params.clone());
    key.zeroize();
    Ok(derived)
}

fn check_salt(salt: &[u8]) -> std::result::Result<(), KeyDerivationError> {
    if salt.len() < MIN_SALT_LEN {
        return Err(KeyDerivationError::InvalidParameters(format!(
            "salt must be at least {MIN_SALT_LEN} bytes (got {})",
            salt.len()
        )));
    }
    Ok(())
}

fn check_pbkdf2_iterations(iterations: u32) -> std::result::Result<(), KeyDerivationError> {
    if !(1..=MAX_PBKDF2_ITERATIONS).contains(&iterations) {
        return Err(KeyDerivationError::InvalidParameters(format!(
            "PBKDF2 iterations must be between 1 and {MAX_PBKDF2_ITERATIONS} (got {iterations})"
        )));
    }
    Ok(())
}

/// PBKDF2 (RFC 8018) with HMAC-SHA256, producing exactly one 32-byte block.
///
/// The rounds are driven here rather than through an opaque helper so
/// the loop can observe `cancel`. Checked against the `pbkdf2` crate in
/// `tests/crypto_tests.rs::pbkdf2_matches_reference_implementation`.
fn pbkdf2_hmac_sha256(
    passphrase: &[u8],
    salt: &[u8],
    rounds: u32,
    cancel: &CancelToken,
    out: &mut [u8; KEY_LEN],
) -> Result<()> {
    let prf = Hmac::<Sha256>::new_from_slice(passphrase)
        .map_err(|e| KeyDerivationError::Failed(format!("HMAC init failed: {e}")))?;

    // U_1 = PRF(P, S || INT(1))
    let mut mac = prf.clone();
    mac.update(salt);
    mac.update(&1u32.to_be_bytes());
    let mut block = [0u8; KEY_LEN];
    block.copy_from_slice(&mac.finalize().into_bytes());
    *out = block;

    for round in 1..rounds {
        if round % CANCEL_CHECK_INTERVAL == 0 {
            if let Err(e) = cancel.check() {
                block.zeroize();
                return Err(e);
            }
        }

        let mut mac = prf.clone();
        mac.update(&block);
        block.copy_from_slice(&mac.finalize().into_bytes());
        for (acc, b) in out.iter_mut().zip(block.iter()) {
            *acc ^= b;
        }
    }

    block.zeroize();
    Ok(())
}

fn check_argon2_params(argon2_params: &Argon2Params) -> std::result::Result<(), KeyDerivationError> {
    let Argon2Params {
        memory_kib,
        iterations,
        parallelism,
    } = *argon2_params;

    if !(MIN_MEMORY_KIB..=MAX_MEMORY_KIB).contains(&memory_kib) {
        return Err(KeyDerivationError::InvalidParameters(format!(
            "Argon2 memory_kib must be between {MIN_MEMORY_KIB} and {MAX_MEMORY_KIB} (got {memory_kib})"
        )));
    }
    if !(1..=MAX_ARGON2_ITERATIONS).contains(&iterations) {
        return Err(KeyDerivationError::InvalidParameters(format!(
            "Argon2 iterations must be between 1 and {MAX_ARGON2_ITERATIONS} (got {iterations})"
        )));
    }
    if !(1..=MAX_PARALLELISM).contains(&parallelism) {
        return Err(KeyDerivationError::InvalidParameters(format!(
            "Argon2 parallelism must be between 1 and {MAX_PARALLELISM} (got {parallelism})"
        )));
    }
    Ok(())
}

/// Argon2id on a worker thread, polling `cancel` while it runs.
///
/// A cancelled derivation returns at once; the worker finishes in the
/// background and its output is zeroized when dropped.
fn argon2id(
    passphrase: &[u8],
    salt: &[u8],
    argon2_params: &Argon2Params,
    cancel: &CancelToken,
    out: &mut [u8; KEY_LEN],
) -> Result<()> {
    check_argon2_params(argon2_params)?;

    let params = Params::new(
        argon2_params.memory_kib,
        argon2_params.iterations,
        argon2_params.parallelism,
        Some(KEY_LEN),
    )
    .map_err(|e| KeyDerivationError::InvalidParameters(format!("invalid Argon2 params: {e}")))?;

    let passphrase = Zeroizing::new(passphrase.to_vec());
    let salt = salt.to_vec();
    let (tx, rx) = mpsc::channel();

    thread::Builder::new()
        .name("argon2id".into())
        .spawn(move || {
            let mut key = Zeroizing::new([0u8; KEY_LEN]);
            let result = Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
                .hash_password_into(&passphrase, &salt, key.as_mut_slice())
                .map(|()| key)
                .map_err(|e| KeyDerivationError::Failed(format!("Argon2id hashing failed: {e}")));
            // The receiver is gone if the derivation was cancelled.
            let _ = tx.send(result);
        })
        .map_err(|e| KeyDerivationError::Failed(format!("cannot start Argon2id worker: {e}")))?;

    loop {
        match rx.recv_timeout(CANCEL_POLL) {
            Ok(result) => {
                out.copy_from_slice(result?.as_slice());
                return Ok(());
            }
            Err(RecvTimeoutError::Timeout) => cancel.check()?,
            Err(RecvTimeoutError::Disconnected) => {
                return Err(
                    KeyDerivationError::Failed("Argon2id worker stopped unexpectedly".into()).into(),
                );
            }
        }
    }
}

/// Generate a cryptographically random salt.
pub fn generate_salt() -> Vec<u8> {
    let mut salt = vec![0u8; SALT_LEN];
    rand::rng().fill_bytes(&mut salt);
    salt
}
