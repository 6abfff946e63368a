//! AES-256-GCM authenticated encryption.
//!
//! `encrypt` generates a fresh random 12-byte nonce and returns the
//! layout used by `.vult` payloads:
//!   [ 12-byte nonce | ciphertext | 16-byte auth tag ]
//!
//! `decrypt` takes the three parts separately and uses the detached-tag
//! API, so the tag is checked over the ciphertext before a single byte
//! of plaintext is produced.

use aes_gcm::aead::{AeadInPlace, KeyInit, OsRng};
use aes_gcm::{AeadCore, Aes256Gcm, Nonce, Tag};
use zeroize::Zeroizing;

use super::keys::DerivedKey;
use crate::errors::{DecryptError, Result, VultError};

/// Size of the AES-256-GCM nonce in bytes.
pub const NONCE_LEN: usize = 12;

/// Size of the AES-256-GCM authentication tag in bytes.
pub const TAG_LEN: usize = 16;

/// Encrypt `plaintext` under `key`.
///
/// Returns nonce || ciphertext || tag.
pub fn encrypt(key: &DerivedKey, plaintext: &[u8]) -> Result<Vec<u8>> {
    let cipher = Aes256Gcm::new_from_slice(key.as_bytes())
        .map_err(|e| VultError::EncryptionFailed(format!("invalid key length: {e}")))?;

    let nonce = Aes256Gcm::generate_nonce(&mut OsRng);

    let mut buffer = plaintext.to_vec();
    let tag = cipher
        .encrypt_in_place_detached(&nonce, b"", &mut buffer)
        .map_err(|e| VultError::EncryptionFailed(format!("encryption error: {e}")))?;

    let mut output = Vec::with_capacity(NONCE_LEN + buffer.len() + TAG_LEN);
    output.extend_from_slice(&nonce);
    output.extend_from_slice(&buffer);
    output.extend_from_slice(&tag);
    Ok(output)
}

/// Verify `tag` over `ciphertext` and, only if it matches, decrypt.
///
/// Every failure, including malformed nonce or tag lengths, maps to the
/// same `AuthenticationFailed` error.
pub fn decrypt(
    key: &DerivedKey,
    nonce: &[u8],
    ciphertext: &[u8],
    tag: &[u8],
) -> std::result::Result<Zeroizing<Vec<u8>>, DecryptError> {
    if nonce.len() != NONCE_LEN || tag.len() != TAG_LEN {
        return Err(DecryptError::AuthenticationFailed);
    }

    let cipher = Aes256Gcm::new_from_slice(key.as_bytes())
        .map_err(|_| DecryptError::AuthenticationFailed)?;

    let mut buffer = Zeroizing::new(ciphertext.to_vec());
    cipher
        .decrypt_in_place_detached(
            Nonce::from_slice(nonce),
            b"",
            buffer.as_mut_slice(),
            Tag::from_slice(tag),
        )
        .map_err(|_| DecryptError::AuthenticationFailed)?;

    Ok(buffer)
}
