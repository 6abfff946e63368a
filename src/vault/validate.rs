//! Structural checks on a decrypted vault.

use super::decrypted::DecryptedVault;
use crate::errors::{Result, VultError};

/// Collect every problem found in `vault`.
///
/// The basic checks require a name, an ECDSA public key, signers and
/// key shares. `strict` additionally requires a known library type,
/// key shares that belong to one of the vault's public keys, and a
/// local party that is one of the signers.
pub fn issues(vault: &DecryptedVault, strict: bool) -> Vec<String> {
    let mut issues = Vec::new();

    if vault.name.is_empty() {
        issues.push("missing vault name".to_string());
    }
    if vault.public_key_ecdsa.is_empty() {
        issues.push("missing ECDSA public key".to_string());
    }
    if vault.signers.is_empty() {
        issues.push("no signers found".to_string());
    }
    if vault.key_shares.is_empty() {
        issues.push("no key shares found".to_string());
    }

    if strict {
        if vault.lib_type().is_none() {
            issues.push(format!("unknown lib_type {}", vault.lib_type_id));
        }

        for share in &vault.key_shares {
            let known = share.public_key == vault.public_key_ecdsa
                || (!vault.public_key_eddsa.is_empty()
                    && share.public_key == vault.public_key_eddsa);
            if !known {
                issues.push(format!(
                    "key share for {} matches neither vault public key",
                    share.public_key
                ));
            }
        }

        if !vault.signers.iter().any(|s| *s == vault.local_party_id) {
            issues.push(format!(
                "local party '{}' is not one of the signers",
                vault.local_party_id
            ));
        }
    }

    issues
}

/// Fail with `ValidationFailed` if `issues` reports anything.
pub fn check(vault: &DecryptedVault, strict: bool) -> Result<()> {
    let found = issues(vault, strict);
    if found.is_empty() {
        Ok(())
    } else {
        Err(VultError::ValidationFailed(found))
    }
}
