//! `.vult` container decoding and encoding.
//!
//! A `.vult` file is base64 text wrapping a protobuf `VaultContainer`:
//!
//! ```text
//! base64( VaultContainer { version = 1, vault = base64(payload), is_encrypted, kdf? } )
//! ```
//!
//! - Plaintext containers: `payload` is the serialized `Vault` message.
//! - Encrypted containers: `payload` is
//!   `[12-byte nonce][ciphertext][16-byte AES-GCM tag]`.
//! - `kdf` absent means the Vultisig default, `SHA-256(passphrase)`.

use std::fs;
use std::path::Path;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use prost::encoding::{decode_key, decode_varint, WireType};
use prost::Message;

use super::proto;
use crate::crypto::{KdfAlgorithm, KdfParams, NONCE_LEN, TAG_LEN};
use crate::errors::{FormatError, IoError, Result};

/// The only container version this tool understands.
pub const CURRENT_VERSION: u64 = 1;

/// Longest possible protobuf varint in bytes.
const MAX_VARINT_LEN: usize = 10;

// ---------------------------------------------------------------------------
// VaultContainer
// ---------------------------------------------------------------------------

/// The vault body carried by a container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    /// Serialized `Vault` protobuf, readable without a passphrase.
    Plain(Vec<u8>),
    /// AES-256-GCM output split into its three parts.
    Encrypted {
        nonce: Vec<u8>,
        ciphertext: Vec<u8>,
        tag: Vec<u8>,
    },
}

/// A decoded, structurally valid `.vult` container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VaultContainer {
    pub version: u64,

    /// ECDSA public key (hex) of the vault. Only visible when the
    /// container is not encrypted.
    pub public_key: Option<String>,

    /// How to turn a passphrase into the payload key.
    pub kdf: KdfParams,

    pub payload: Payload,
}

impl VaultContainer {
    pub fn is_encrypted(&self) -> bool {
        matches!(self.payload, Payload::Encrypted { .. })
    }

    /// Size of the decoded payload in bytes (nonce and tag included).
    pub fn payload_len(&self) -> usize {
        match &self.payload {
            Payload::Plain(bytes) => bytes.len(),
            Payload::Encrypted {
                nonce,
                ciphertext,
                tag,
            } => nonce.len() + ciphertext.len() + tag.len(),
        }
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Read a `.vult` file from disk and decode it.
pub fn read_vault_file(path: &Path) -> Result<VaultContainer> {
    let data = fs::read(path).map_err(|source| IoError::ReadFailed {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(decode(&data)?)
}

/// Decode the contents of a `.vult` file.
///
/// Pure and deterministic: the same bytes always produce the same
/// container or the same error.
pub fn decode(bytes: &[u8]) -> std::result::Result<VaultContainer, FormatError> {
    let text: Vec<u8> = bytes
        .iter()
        .copied()
        .filter(|b| !b.is_ascii_whitespace())
        .collect();
    if text.is_empty() {
        return Err(FormatError::Truncated("vault file is empty".into()));
    }

    let raw = decode_base64(&text, "vault file")?;
    check_framing(&raw)?;

    let container = proto::VaultContainer::decode(raw.as_slice())
        .map_err(|e| FormatError::Malformed(format!("container: {e}")))?;

    if container.version != CURRENT_VERSION {
        return Err(FormatError::UnsupportedVersion(container.version));
    }

    if container.vault.is_empty() {
        return Err(FormatError::Malformed("container holds no vault".into()));
    }
    let payload = decode_base64(container.vault.as_bytes(), "vault payload")?;

    let kdf = container
        .kdf
        .map_or_else(KdfParams::sha256, |k| KdfParams {
            algorithm_id: k.algorithm,
            salt: k.salt,
            iterations: k.iterations,
            memory_kib: k.memory_kib,
            parallelism: k.parallelism,
        });

    if container.is_encrypted {
        if payload.len() < NONCE_LEN + TAG_LEN {
            return Err(FormatError::Truncated(format!(
                "encrypted payload is {} bytes, need at least {}",
                payload.len(),
                NONCE_LEN + TAG_LEN
            )));
        }
        let tag_start = payload.len() - TAG_LEN;
        return Ok(VaultContainer {
            version: container.version,
            public_key: None,
            kdf,
            payload: Payload::Encrypted {
                nonce: payload[..NONCE_LEN].to_vec(),
                ciphertext: payload[NONCE_LEN..tag_start].to_vec(),
                tag: payload[tag_start..].to_vec(),
            },
        });
    }

    check_framing(&payload)?;
    let vault = proto::Vault::decode(payload.as_slice())
        .map_err(|e| FormatError::Malformed(format!("vault: {e}")))?;

    Ok(VaultContainer {
        version: container.version,
        public_key: Some(vault.public_key_ecdsa).filter(|k| !k.is_empty()),
        kdf,
        payload: Payload::Plain(payload),
    })
}

/// Encode a container back into `.vult` text.
pub fn encode(container: &VaultContainer) -> String {
    let (payload, is_encrypted) = match &container.payload {
        Payload::Plain(bytes) => (bytes.clone(), false),
        Payload::Encrypted {
            nonce,
            ciphertext,
            tag,
        } => {
            let mut blob = Vec::with_capacity(nonce.len() + ciphertext.len() + tag.len());
            blob.extend_from_slice(nonce);
            blob.extend_from_slice(ciphertext);
            blob.extend_from_slice(tag);
            (blob, true)
        }
    };

    // The legacy scheme is written without a kdf message so the
    // Vultisig apps can still read the file.
    let kdf = (container.kdf.algorithm_id != KdfAlgorithm::Sha256 as i32).then(|| {
        proto::KeyDerivation {
            algorithm: container.kdf.algorithm_id,
            salt: container.kdf.salt.clone(),
            iterations: container.kdf.iterations,
            memory_kib: container.kdf.memory_kib,
            parallelism: container.kdf.parallelism,
        }
    });

    let message = proto::VaultContainer {
        version: container.version,
        vault: BASE64.encode(payload),
        is_encrypted,
        kdf,
    };
    BASE64.encode(message.encode_to_vec())
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn decode_base64(text: &[u8], what: &str) -> std::result::Result<Vec<u8>, FormatError> {
    BASE64.decode(text).map_err(|e| match e {
        // Text that stops mid-quantum was cut short.
        base64::DecodeError::InvalidLength(_) | base64::DecodeError::InvalidPadding => {
            FormatError::Truncated(format!("{what}: {e}"))
        }
        _ => FormatError::Encoding(format!("{what}: {e}")),
    })
}

/// Walk the top-level protobuf fields of `buf` and make sure every
/// declared length fits inside the input.
fn check_framing(mut buf: &[u8]) -> std::result::Result<(), FormatError> {
    while !buf.is_empty() {
        require_varint(buf)?;
        let (tag, wire_type) =
            decode_key(&mut buf).map_err(|e| FormatError::Malformed(e.to_string()))?;

        match wire_type {
            WireType::Varint => {
                require_varint(buf)?;
                decode_varint(&mut buf).map_err(|e| FormatError::Malformed(e.to_string()))?;
            }
            WireType::SixtyFourBit => skip(&mut buf, 8, tag)?,
            WireType::ThirtyTwoBit => skip(&mut buf, 4, tag)?,
            WireType::LengthDelimited => {
                require_varint(buf)?;
                let len = decode_varint(&mut buf)
                    .map_err(|e| FormatError::Malformed(e.to_string()))?;
                let len = usize::try_from(len).map_err(|_| {
                    FormatError::Truncated(format!("field {tag} declares {len} bytes"))
                })?;
                skip(&mut buf, len, tag)?;
            }
            WireType::StartGroup | WireType::EndGroup => {
                return Err(FormatError::Malformed(format!(
                    "field {tag} uses a protobuf group"
                )));
            }
        }
    }
    Ok(())
}

/// A varint whose continuation bits run past the end of the input.
fn require_varint(buf: &[u8]) -> std::result::Result<(), FormatError> {
    let terminated = buf.iter().take(MAX_VARINT_LEN).any(|b| b & 0x80 == 0);
    if !terminated && buf.len() < MAX_VARINT_LEN {
        return Err(FormatError::Truncated("input ends inside a varint".into()));
    }
    Ok(())
}

fn skip(buf: &mut &[u8], len: usize, tag: u32) -> std::result::Result<(), FormatError> {
    if buf.len() < len {
        return Err(FormatError::Truncated(format!(
            "field {tag} declares {len} bytes but only {} remain",
            buf.len()
        )));
    }
    *buf = &buf[len..];
    Ok(())
}
