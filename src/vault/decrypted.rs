//! The plaintext contents of a vault.
//!
//! `DecryptedVault` is only ever built from bytes that either came from an
//! unencrypted container or passed AES-GCM tag verification. Key share
//! material is held in `Zeroizing` buffers and redacted from `Debug`.

use chrono::{DateTime, Utc};
use prost::Message;
use zeroize::Zeroizing;

use super::proto;
use crate::errors::FormatError;

/// MPC library a vault's key shares belong to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LibType {
    Gg20,
    Dkls,
}

impl LibType {
    pub fn as_str(self) -> &'static str {
        match self {
            LibType::Gg20 => "GG20",
            LibType::Dkls => "DKLS",
        }
    }

    fn from_id(id: i32) -> Option<Self> {
        match proto::LibType::try_from(id).ok()? {
            proto::LibType::Gg20 => Some(LibType::Gg20),
            proto::LibType::Dkls => Some(LibType::Dkls),
        }
    }

    fn id(self) -> i32 {
        match self {
            LibType::Gg20 => proto::LibType::Gg20 as i32,
            LibType::Dkls => proto::LibType::Dkls as i32,
        }
    }
}

/// One participant's share of a key, tied to the public key it signs for.
#[derive(Clone, PartialEq, Eq)]
pub struct KeyShare {
    pub public_key: String,
    pub keyshare: Zeroizing<String>,
}

impl std::fmt::Debug for KeyShare {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyShare")
            .field("public_key", &self.public_key)
            .field("keyshare", &format_args!("[{} bytes redacted]", self.keyshare.len()))
            .finish()
    }
}

/// A vault after successful decryption.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecryptedVault {
    pub name: String,
    pub public_key_ecdsa: String,
    pub public_key_eddsa: String,
    pub hex_chain_code: String,
    pub local_party_id: String,
    pub reshare_prefix: String,
    /// Raw library id; see `lib_type`.
    pub lib_type_id: i32,
    /// Party identifiers of every signer, including the local party.
    pub signers: Vec<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub key_shares: Vec<KeyShare>,
}

impl DecryptedVault {
    /// Parse a serialized `Vault` protobuf.
    pub fn from_protobuf(bytes: &[u8]) -> Result<Self, FormatError> {
        let vault = proto::Vault::decode(bytes)
            .map_err(|e| FormatError::Malformed(format!("vault: {e}")))?;

        let created_at = vault.created_at.and_then(|ts| {
            let nanos = u32::try_from(ts.nanos).ok()?;
            DateTime::from_timestamp(ts.seconds, nanos)
        });

        let key_shares = vault
            .key_shares
            .into_iter()
            .map(|share| KeyShare {
                public_key: share.public_key,
                keyshare: Zeroizing::new(share.keyshare),
            })
            .collect();

        Ok(Self {
            name: vault.name,
            public_key_ecdsa: vault.public_key_ecdsa,
            public_key_eddsa: vault.public_key_eddsa,
            hex_chain_code: vault.hex_chain_code,
            local_party_id: vault.local_party_id,
            reshare_prefix: vault.reshare_prefix,
            lib_type_id: vault.lib_type,
            signers: vault.signers,
            created_at,
            key_shares,
        })
    }

    /// Serialize back into a `Vault` protobuf.
    pub fn to_protobuf(&self) -> Zeroizing<Vec<u8>> {
        let vault = proto::Vault {
            name: self.name.clone(),
            public_key_ecdsa: self.public_key_ecdsa.clone(),
            public_key_eddsa: self.public_key_eddsa.clone(),
            signers: self.signers.clone(),
            created_at: self.created_at.map(|dt| prost_types::Timestamp {
                seconds: dt.timestamp(),
                nanos: i32::try_from(dt.timestamp_subsec_nanos()).unwrap_or(0),
            }),
            hex_chain_code: self.hex_chain_code.clone(),
            key_shares: self
                .key_shares
                .iter()
                .map(|share| proto::KeyShare {
                    public_key: share.public_key.clone(),
                    keyshare: share.keyshare.as_str().to_owned(),
                })
                .collect(),
            local_party_id: self.local_party_id.clone(),
            reshare_prefix: self.reshare_prefix.clone(),
            lib_type: self.lib_type_id,
        };
        let bytes = Zeroizing::new(vault.encode_to_vec());

        // The temporary message holds share copies too.
        let mut vault = vault;
        for share in &mut vault.key_shares {
            zeroize::Zeroize::zeroize(&mut share.keyshare);
        }
        bytes
    }

    /// The library type, or `None` for an id this tool does not know.
    pub fn lib_type(&self) -> Option<LibType> {
        LibType::from_id(self.lib_type_id)
    }

    pub fn set_lib_type(&mut self, lib_type: LibType) {
        self.lib_type_id = lib_type.id();
    }

    /// Signing threshold of the vault.
    ///
    /// Vultisig always runs keygen with `ceil(2n / 3)` for `n` signers.
    pub fn threshold(&self) -> usize {
        (2 * self.signers.len()).div_ceil(3)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> DecryptedVault {
        DecryptedVault {
            name: "Test Fast Vault DKLS".into(),
            public_key_ecdsa: "0333e3d4df9cc071be24fd6c995421036074a1a88e5d3e0bc211b7ef4330078d9b"
                .into(),
            public_key_eddsa: "a1b2".into(),
            hex_chain_code: "c0ffee".into(),
            local_party_id: "iPhone-5C9".into(),
            reshare_prefix: String::new(),
            lib_type_id: 1,
            signers: vec!["iPhone-5C9".into(), "Server-1172".into()],
            created_at: DateTime::from_timestamp(1_735_689_600, 0),
            key_shares: vec![KeyShare {
                public_key: "0333e3d4df9cc071be24fd6c995421036074a1a88e5d3e0bc211b7ef4330078d9b"
                    .into(),
                keyshare: Zeroizing::new("c2VjcmV0LXNoYXJl".into()),
            }],
        }
    }

    #[test]
    fn protobuf_roundtrip_preserves_every_field() {
        let vault = sample();
        let parsed = DecryptedVault::from_protobuf(&vault.to_protobuf()).unwrap();
        assert_eq!(parsed, vault);
    }

    #[test]
    fn lib_type_maps_known_ids() {
        let mut vault = sample();
        assert_eq!(vault.lib_type(), Some(LibType::Dkls));
        vault.set_lib_type(LibType::Gg20);
        assert_eq!(vault.lib_type_id, 0);
        vault.lib_type_id = 7;
        assert_eq!(vault.lib_type(), None);
    }

    #[test]
    fn threshold_is_two_thirds_rounded_up() {
        let mut vault = sample();
        assert_eq!(vault.threshold(), 2);
        vault.signers = (0..3).map(|i| format!("p{i}")).collect();
        assert_eq!(vault.threshold(), 2);
        vault.signers = (0..4).map(|i| format!("p{i}")).collect();
        assert_eq!(vault.threshold(), 3);
    }

    #[test]
    fn debug_output_hides_key_share_material() {
        let rendered = format!("{:?}", sample());
        assert!(!rendered.contains("c2VjcmV0LXNoYXJl"));
        assert!(rendered.contains("redacted"));
    }

    #[test]
    fn garbage_is_malformed() {
        assert!(matches!(
            DecryptedVault::from_protobuf(&[0xFF, 0xFF, 0xFF]),
            Err(FormatError::Malformed(_))
        ));
    }
}
