use std::path::PathBuf;
use thiserror::Error;

/// The container could not be decoded.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FormatError {
    #[error("vault file is not valid base64: {0}")]
    Encoding(String),

    #[error("vault file is truncated: {0}")]
    Truncated(String),

    #[error("unsupported vault container version {0}")]
    UnsupportedVersion(u64),

    #[error("malformed vault data: {0}")]
    Malformed(String),
}

/// The key-derivation parameters stored in the container are unusable.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum KeyDerivationError {
    #[error("unsupported key derivation algorithm id {0}")]
    UnsupportedAlgorithm(i32),

    #[error("invalid key derivation parameters: {0}")]
    InvalidParameters(String),

    #[error("key derivation failed: {0}")]
    Failed(String),
}

/// Authenticated decryption failed.
///
/// There is deliberately a single variant: a wrong passphrase and a
/// tampered payload must be indistinguishable to the caller.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum DecryptError {
    #[error("Decryption failed — wrong passphrase or corrupted vault")]
    AuthenticationFailed,
}

/// Reading an input or writing an export failed.
#[derive(Debug, Error)]
pub enum IoError {
    #[error("cannot read {path}: {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("refusing to overwrite existing file {0}")]
    AlreadyExists(PathBuf),

    #[error("failed to write {destination}: {source}")]
    WriteFailed {
        destination: String,
        #[source]
        source: std::io::Error,
    },
}

/// All errors that can occur in vultitool.
#[derive(Debug, Error)]
pub enum VultError {
    #[error(transparent)]
    Format(#[from] FormatError),

    #[error(transparent)]
    KeyDerivation(#[from] KeyDerivationError),

    #[error(transparent)]
    Decrypt(#[from] DecryptError),

    #[error(transparent)]
    Io(#[from] IoError),

    // --- Encryption (sealing) errors ---
    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    // --- Validation errors ---
    #[error("Vault validation failed: {}", .0.join("; "))]
    ValidationFailed(Vec<String>),

    // --- Config errors ---
    #[error("Config file error: {0}")]
    ConfigError(String),

    // --- CLI errors ---
    #[error("{0}")]
    Usage(String),

    #[error("Passphrase prompt failed: {0}")]
    PromptFailed(String),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("{failed} of {total} vault files failed")]
    BatchFailed { failed: usize, total: usize },
}

impl VultError {
    /// Process exit code for this error: `2` for usage errors, `1` otherwise.
    pub fn exit_code(&self) -> i32 {
        match self {
            VultError::Usage(_) => 2,
            _ => 1,
        }
    }
}

/// Convenience type alias for vultitool results.
pub type Result<T> = std::result::Result<T, VultError>;
