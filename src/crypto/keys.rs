//! The ephemeral symmetric key produced by key derivation.

use zeroize::{Zeroize, ZeroizeOnDrop};

use super::kdf::KdfParams;

/// Length of a derived key (256 bits, for AES-256).
pub const KEY_LEN: usize = 32;

/// A 32-byte decryption key whose memory is zeroed when dropped.
///
/// Keys are never serialized or written anywhere; `Debug` is implemented
/// by hand so the bytes cannot end up in a log line.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct DerivedKey {
    bytes: [u8; KEY_LEN],

    #[zeroize(skip)]
    params: Option<KdfParams>,
}

impl DerivedKey {
    /// Wrap key bytes that were produced with `params`.
    pub fn new(bytes: [u8; KEY_LEN], params: KdfParams) -> Self {
        Self {
            bytes,
            params: Some(params),
        }
    }

    /// Wrap raw key bytes of unknown provenance.
    pub fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        Self {
            bytes,
            params: None,
        }
    }

    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.bytes
    }

    /// The derivation parameters this key was produced with, if known.
    pub fn params(&self) -> Option<&KdfParams> {
        self.params.as_ref()
    }
}

impl std::fmt::Debug for DerivedKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DerivedKey")
            .field("bytes", &"[redacted]")
            .field("params", &self.params)
            .finish()
    }
}
