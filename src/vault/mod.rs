//! Vault module — the `.vult` file format and what it contains.
//!
//! This module provides:
//! - Protobuf message definitions (`proto`)
//! - Container decoding and encoding (`format`)
//! - The plaintext `DecryptedVault` type (`decrypted`)
//! - JSON/TOML export of decrypted vaults (`export`)
//! - Sealing vaults into encrypted containers (`seal`)
//! - Structural validation (`validate`)

pub mod decrypted;
pub mod export;
pub mod format;
pub mod proto;
pub mod seal;
pub mod validate;

// Re-export the most commonly used items.
pub use decrypted::{DecryptedVault, KeyShare, LibType};
pub use export::{emit, render, Destination, ExportFormat};
pub use format::{decode, encode, read_vault_file, Payload, VaultContainer};
pub use seal::{seal, seal_plain};
