//! Building `.vult` files: the inverse of decode + decrypt.

use zeroize::Zeroizing;

use super::decrypted::DecryptedVault;
use super::format::{self, Payload, VaultContainer, CURRENT_VERSION};
use crate::crypto::{derive, encrypt, CancelToken, KdfParams, NONCE_LEN, TAG_LEN};
use crate::errors::{Result, VultError};

/// Encrypt `vault` under `passphrase` and return `.vult` text.
///
/// A fresh nonce is generated on every call, so sealing the same vault
/// twice yields different files.
pub fn seal(vault: &DecryptedVault, passphrase: &[u8], params: &KdfParams) -> Result<String> {
    let key = derive(passphrase, params, &CancelToken::new())?;
    let plaintext = vault.to_protobuf();
    let blob = Zeroizing::new(encrypt(&key, &plaintext)?);

    if blob.len() < NONCE_LEN + TAG_LEN {
        return Err(VultError::EncryptionFailed("cipher output too short".into()));
    }
    let tag_start = blob.len() - TAG_LEN;

    let container = VaultContainer {
        version: CURRENT_VERSION,
        public_key: None,
        kdf: params.clone(),
        payload: Payload::Encrypted {
            nonce: blob[..NONCE_LEN].to_vec(),
            ciphertext: blob[NONCE_LEN..tag_start].to_vec(),
            tag: blob[tag_start..].to_vec(),
        },
    };
    Ok(format::encode(&container))
}

/// Wrap `vault` in an unencrypted container.
pub fn seal_plain(vault: &DecryptedVault) -> String {
    let container = VaultContainer {
        version: CURRENT_VERSION,
        public_key: Some(vault.public_key_ecdsa.clone()),
        kdf: KdfParams::sha256(),
        payload: Payload::Plain(vault.to_protobuf().to_vec()),
    };
    format::encode(&container)
}
