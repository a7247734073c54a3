//! Cryptographic primitives for the vault.
//!
//! Provides the file digest, signature-to-key derivation and AES-256-GCM.

pub mod aead;
pub mod digest;
pub mod kdf;

pub use aead::{decrypt, encrypt, generate_salt};
pub use digest::FileDigest;
pub use kdf::{DerivedKey, derive_key};

/// Length of the KDF salt (16 bytes).
pub const SALT_LEN: usize = 16;
/// Length of the nonce (12 bytes for AES-GCM).
pub const NONCE_LEN: usize = 12;
/// Length of the encryption key (32 bytes / 256 bits).
pub const KEY_LEN: usize = 32;
/// Length of the GCM authentication tag appended to every ciphertext.
pub const TAG_LEN: usize = 16;
/// PBKDF2-HMAC-SHA256 rounds. Fixed; changing it breaks every stored container.
pub const PBKDF2_ITERATIONS: u32 = 200_000;
