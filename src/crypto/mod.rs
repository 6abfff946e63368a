//! Cryptographic primitives for vultitool.
//!
//! This module provides:
//! - AES-256-GCM authenticated encryption and decryption (`encryption`)
//! - Passphrase-based key derivation: legacy SHA-256, PBKDF2, Argon2id (`kdf`)
//! - The zeroize-on-drop `DerivedKey` wrapper (`keys`)
//! - A cooperative cancellation flag for long derivations (`cancel`)

pub mod cancel;
pub mod encryption;
pub mod kdf;
pub mod keys;

pub use cancel::CancelToken;
pub use encryption::{decrypt, encrypt, NONCE_LEN, TAG_LEN};
pub use kdf::{derive, generate_salt, Argon2Params, KdfAlgorithm, KdfParams};
pub use keys::DerivedKey;
