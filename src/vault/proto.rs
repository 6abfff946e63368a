//! Protobuf messages of the `.vult` format.
//!
//! Field numbers follow Vultisig's `vultisig.vault.v1` schema
//! (`VaultContainer`, `Vault`). `VaultContainer.kdf` (tag 4) is a
//! vultitool extension; files written by the Vultisig apps never set it.

use crate::crypto::KdfAlgorithm;

/// Outer message of a `.vult` file.
#[derive(Clone, PartialEq, prost::Message)]
pub struct VaultContainer {
    #[prost(uint64, tag = "1")]
    pub version: u64,
    /// Base64 of either a serialized `Vault` or `nonce || ciphertext || tag`.
    #[prost(string, tag = "2")]
    pub vault: String,
    #[prost(bool, tag = "3")]
    pub is_encrypted: bool,
    #[prost(message, optional, tag = "4")]
    pub kdf: Option<KeyDerivation>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct KeyDerivation {
    #[prost(enumeration = "KdfAlgorithm", tag = "1")]
    pub algorithm: i32,
    #[prost(bytes = "vec", tag = "2")]
    pub salt: Vec<u8>,
    #[prost(uint32, tag = "3")]
    pub iterations: u32,
    #[prost(uint32, tag = "4")]
    pub memory_kib: u32,
    #[prost(uint32, tag = "5")]
    pub parallelism: u32,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct Vault {
    #[prost(string, tag = "1")]
    pub name: String,
    #[prost(string, tag = "2")]
    pub public_key_ecdsa: String,
    #[prost(string, tag = "3")]
    pub public_key_eddsa: String,
    #[prost(string, repeated, tag = "4")]
    pub signers: Vec<String>,
    #[prost(message, optional, tag = "5")]
    pub created_at: Option<prost_types::Timestamp>,
    #[prost(string, tag = "6")]
    pub hex_chain_code: String,
    #[prost(message, repeated, tag = "7")]
    pub key_shares: Vec<KeyShare>,
    #[prost(string, tag = "8")]
    pub local_party_id: String,
    #[prost(string, tag = "9")]
    pub reshare_prefix: String,
    #[prost(enumeration = "LibType", tag = "10")]
    pub lib_type: i32,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct KeyShare {
    #[prost(string, tag = "1")]
    pub public_key: String,
    #[prost(string, tag = "2")]
    pub keyshare: String,
}

/// MPC library that produced the key shares.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum LibType {
    Gg20 = 0,
    Dkls = 1,
}
