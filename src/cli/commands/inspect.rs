//! `vultitool inspect` — show what a vault file contains without a passphrase.
//!
//! Encrypted containers reveal only their envelope: version, key
//! derivation parameters and payload size. Unencrypted containers are
//! parsed and summarised in full.

use std::path::Path;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::Serialize;

use crate::cli::output;
use crate::crypto::{KdfAlgorithm, KdfParams};
use crate::errors::{Result, VultError};
use crate::vault::{read_vault_file, DecryptedVault, Payload, VaultContainer};

#[derive(Serialize)]
struct InspectReport {
    file: String,
    version: u64,
    encrypted: bool,
    payload_bytes: usize,
    kdf: KdfReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    vault: Option<VaultReport>,
}

#[derive(Serialize)]
struct KdfReport {
    algorithm: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    salt: Option<String>,
    #[serde(skip_serializing_if = "is_zero")]
    iterations: u32,
    #[serde(skip_serializing_if = "is_zero")]
    memory_kib: u32,
    #[serde(skip_serializing_if = "is_zero")]
    parallelism: u32,
}

#[derive(Serialize)]
struct VaultReport {
    name: String,
    lib_type: String,
    local_party_id: String,
    signers: Vec<String>,
    threshold: usize,
    public_key_ecdsa: String,
    public_key_eddsa: String,
    hex_chain_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    created_at: Option<String>,
    key_shares: Vec<KeyShareReport>,
}

#[derive(Serialize)]
struct KeyShareReport {
    public_key: String,
    keyshare_len: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    keyshare: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    keyshare_fields: Option<Vec<String>>,
}

fn is_zero(n: &u32) -> bool {
    *n == 0
}

fn algorithm_label(params: &KdfParams) -> String {
    match params.algorithm() {
        Ok(KdfAlgorithm::Sha256) => "SHA-256".to_string(),
        Ok(KdfAlgorithm::Pbkdf2HmacSha256) => "PBKDF2-HMAC-SHA256".to_string(),
        Ok(KdfAlgorithm::Argon2id) => "Argon2id".to_string(),
        Err(_) => format!("unknown (id {})", params.algorithm_id),
    }
}

fn kdf_report(params: &KdfParams) -> KdfReport {
    KdfReport {
        algorithm: algorithm_label(params),
        salt: (!params.salt.is_empty()).then(|| BASE64.encode(&params.salt)),
        iterations: params.iterations,
        memory_kib: params.memory_kib,
        parallelism: params.parallelism,
    }
}

/// Top-level keys of a key share stored as base64-encoded JSON.
///
/// `None` when the share is not in that form.
fn keyshare_fields(keyshare: &str) -> Option<Vec<String>> {
    let decoded = BASE64.decode(keyshare.trim()).ok()?;
    let text = std::str::from_utf8(&decoded).ok()?;
    match serde_json::from_str::<serde_json::Value>(text).ok()? {
        serde_json::Value::Object(map) => {
            let mut keys: Vec<String> = map.keys().cloned().collect();
            keys.sort();
            Some(keys)
        }
        _ => None,
    }
}

fn vault_report(vault: &DecryptedVault, show_keyshares: bool) -> VaultReport {
    VaultReport {
        name: vault.name.clone(),
        lib_type: vault
            .lib_type()
            .map_or("UNKNOWN", |t| t.as_str())
            .to_string(),
        local_party_id: vault.local_party_id.clone(),
        signers: vault.signers.clone(),
        threshold: vault.threshold(),
        public_key_ecdsa: vault.public_key_ecdsa.clone(),
        public_key_eddsa: vault.public_key_eddsa.clone(),
        hex_chain_code: vault.hex_chain_code.clone(),
        created_at: vault.created_at.map(|dt| dt.to_rfc3339()),
        key_shares: vault
            .key_shares
            .iter()
            .map(|share| KeyShareReport {
                public_key: share.public_key.clone(),
                keyshare_len: share.keyshare.len(),
                keyshare: show_keyshares.then(|| share.keyshare.as_str().to_owned()),
                keyshare_fields: show_keyshares
                    .then(|| keyshare_fields(&share.keyshare))
                    .flatten(),
            })
            .collect(),
    }
}

fn plaintext_vault(container: &VaultContainer) -> Result<Option<DecryptedVault>> {
    match &container.payload {
        Payload::Plain(bytes) => Ok(Some(DecryptedVault::from_protobuf(bytes)?)),
        Payload::Encrypted { .. } => Ok(None),
    }
}

/// Execute the `inspect` command.
pub fn execute(file: &Path, json: bool, show_keyshares: bool) -> Result<()> {
    let container = read_vault_file(file)?;
    let vault = plaintext_vault(&container)?;

    if json {
        let report = InspectReport {
            file: file.display().to_string(),
            version: container.version,
            encrypted: container.is_encrypted(),
            payload_bytes: container.payload_len(),
            kdf: kdf_report(&container.kdf),
            vault: vault.as_ref().map(|v| vault_report(v, show_keyshares)),
        };
        let rendered = serde_json::to_string_pretty(&report)
            .map_err(|e| VultError::SerializationError(format!("inspect report: {e}")))?;
        println!("{rendered}");
        return Ok(());
    }

    let kdf = kdf_report(&container.kdf);
    let mut rows = vec![
        ("File", file.display().to_string()),
        ("Container version", container.version.to_string()),
        (
            "Encrypted",
            if container.is_encrypted() { "yes" } else { "no" }.to_string(),
        ),
        ("Payload", format!("{} bytes", container.payload_len())),
    ];
    if container.is_encrypted() {
        rows.push(("Key derivation", kdf.algorithm));
        if kdf.iterations > 0 {
            rows.push(("Iterations", kdf.iterations.to_string()));
        }
        if kdf.memory_kib > 0 {
            rows.push(("Memory", format!("{} KiB", kdf.memory_kib)));
        }
        if let Some(salt) = kdf.salt {
            rows.push(("Salt", salt));
        }
    }
    output::print_fields_table(&rows);

    match vault {
        Some(vault) => {
            output::print_vault_table(&vault, show_keyshares);
            if show_keyshares {
                for share in &vault.key_shares {
                    match keyshare_fields(&share.keyshare) {
                        Some(fields) => output::info(&format!(
                            "Share {}: JSON with fields {}",
                            share.public_key,
                            fields.join(", ")
                        )),
                        None => output::info(&format!(
                            "Share {}: binary or encrypted data",
                            share.public_key
                        )),
                    }
                }
            }
        }
        None => {
            output::info("Vault contents are encrypted.");
            output::tip(&format!(
                "Run `vultitool decrypt {}` to read them.",
                file.display()
            ));
        }
    }

    Ok(())
}
