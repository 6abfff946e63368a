//! Serialization of a decrypted vault to JSON or TOML.
//!
//! Export schema (`format = "vultitool/decrypted-vault/v1"`), stable
//! across releases:
//!
//! ```text
//! format, name, lib_type, public_key_ecdsa, public_key_eddsa,
//! hex_chain_code, local_party_id, reshare_prefix, threshold,
//! created_at (RFC 3339, omitted when unknown),
//! signers: [string], key_shares: [{ public_key, keyshare }]
//! ```
//!
//! Files are created with exclusive-create semantics and never
//! overwritten. If a write fails midway the file is left behind in an
//! undefined state; callers should delete it.

use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::Serialize;
use zeroize::Zeroizing;

use super::decrypted::DecryptedVault;
use crate::errors::{IoError, Result, VultError};

/// Identifier written into every export document.
pub const SCHEMA: &str = "vultitool/decrypted-vault/v1";

/// Output document format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Json,
    Toml,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Json => "json",
            ExportFormat::Toml => "toml",
        }
    }
}

impl FromStr for ExportFormat {
    type Err = VultError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(ExportFormat::Json),
            "toml" => Ok(ExportFormat::Toml),
            other => Err(VultError::Usage(format!(
                "unknown export format '{other}' — use 'json' or 'toml'"
            ))),
        }
    }
}

/// Where an export goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    Stdout,
    File(PathBuf),
}

impl Destination {
    fn label(&self) -> String {
        match self {
            Destination::Stdout => "stdout".to_string(),
            Destination::File(path) => path.display().to_string(),
        }
    }
}

// Scalars come before arrays so the TOML serializer can emit tables last.
#[derive(Serialize)]
struct ExportDocument<'a> {
    format: &'static str,
    name: &'a str,
    lib_type: &'static str,
    public_key_ecdsa: &'a str,
    public_key_eddsa: &'a str,
    hex_chain_code: &'a str,
    local_party_id: &'a str,
    reshare_prefix: &'a str,
    threshold: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    created_at: Option<String>,
    signers: &'a [String],
    key_shares: Vec<ExportKeyShare<'a>>,
}

#[derive(Serialize)]
struct ExportKeyShare<'a> {
    public_key: &'a str,
    keyshare: &'a str,
}

/// Render `vault` in `format` without writing it anywhere.
pub fn render(vault: &DecryptedVault, format: ExportFormat) -> Result<Zeroizing<String>> {
    let document = ExportDocument {
        format: SCHEMA,
        name: &vault.name,
        lib_type: vault.lib_type().map_or("UNKNOWN", |t| t.as_str()),
        public_key_ecdsa: &vault.public_key_ecdsa,
        public_key_eddsa: &vault.public_key_eddsa,
        hex_chain_code: &vault.hex_chain_code,
        local_party_id: &vault.local_party_id,
        reshare_prefix: &vault.reshare_prefix,
        threshold: vault.threshold(),
        created_at: vault.created_at.map(|dt| dt.to_rfc3339()),
        signers: &vault.signers,
        key_shares: vault
            .key_shares
            .iter()
            .map(|share| ExportKeyShare {
                public_key: &share.public_key,
                keyshare: &share.keyshare,
            })
            .collect(),
    };

    let mut content = match format {
        ExportFormat::Json => serde_json::to_string_pretty(&document)
            .map_err(|e| VultError::SerializationError(format!("JSON export: {e}")))?,
        ExportFormat::Toml => toml::to_string_pretty(&document)
            .map_err(|e| VultError::SerializationError(format!("TOML export: {e}")))?,
    };
    if !content.ends_with('\n') {
        content.push('\n');
    }
    Ok(Zeroizing::new(content))
}

/// Render `vault` and write it to `destination`.
pub fn emit(vault: &DecryptedVault, destination: &Destination, format: ExportFormat) -> Result<()> {
    let content = render(vault, format)?;

    match destination {
        Destination::Stdout => write_all(io::stdout().lock(), &content, destination),
        Destination::File(path) => {
            let file = create_exclusive(path)?;
            write_all(BufWriter::new(file), &content, destination)
        }
    }
}

/// Write `content` fully and flush, reporting any failure as `WriteFailed`.
pub fn write_all<W: Write>(mut writer: W, content: &str, destination: &Destination) -> Result<()> {
    let failed = |source| IoError::WriteFailed {
        destination: destination.label(),
        source,
    };
    writer.write_all(content.as_bytes()).map_err(failed)?;
    writer.flush().map_err(failed)?;
    Ok(())
}

/// Create `path` for writing, failing if anything already exists there.
fn create_exclusive(path: &Path) -> Result<File> {
    let mut options = OpenOptions::new();
    options.write(true).create_new(true);

    // Exports hold key shares: owner-only read/write on Unix.
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    options.open(path).map_err(|source| {
        if source.kind() == io::ErrorKind::AlreadyExists {
            VultError::from(IoError::AlreadyExists(path.to_path_buf()))
        } else {
            VultError::from(IoError::WriteFailed {
                destination: path.display().to_string(),
                source,
            })
        }
    })
}
