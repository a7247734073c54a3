//! Framing of the single blob that goes to the content store.
//!
//! Layout:
//! ```text
//! SALT (16) | NONCE (12) | CIPHERTEXT + GCM TAG
//! ```
//!
//! No magic, no version, no length prefix. Decoding only checks that the
//! fixed header fits; whether the rest is genuine is decided by the tag check
//! in [`crate::crypto::decrypt`].

use crate::crypto::{NONCE_LEN, SALT_LEN};
use crate::error::VaultError;

/// Length of the fixed salt + nonce header.
pub const HEADER_LEN: usize = SALT_LEN + NONCE_LEN;

/// A decoded container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Container {
    salt: [u8; SALT_LEN],
    nonce: [u8; NONCE_LEN],
    ciphertext: Vec<u8>,
}

impl Container {
    pub fn new(salt: [u8; SALT_LEN], nonce: [u8; NONCE_LEN], ciphertext: Vec<u8>) -> Self {
        Self {
            salt,
            nonce,
            ciphertext,
        }
    }

    /// Returns the KDF salt.
    pub fn salt(&self) -> &[u8; SALT_LEN] {
        &self.salt
    }

    /// Returns the AEAD nonce.
    pub fn nonce(&self) -> &[u8; NONCE_LEN] {
        &self.nonce
    }

    /// Returns the ciphertext including the tag.
    pub fn ciphertext(&self) -> &[u8] {
        &self.ciphertext
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        encode(&self.salt, &self.nonce, &self.ciphertext)
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self, VaultError> {
        decode(data)
    }
}

/// Concatenates salt, nonce and ciphertext.
pub fn encode(salt: &[u8; SALT_LEN], nonce: &[u8; NONCE_LEN], ciphertext: &[u8]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(HEADER_LEN + ciphertext.len());

    buf.extend_from_slice(salt);
    buf.extend_from_slice(nonce);
    buf.extend_from_slice(ciphertext);

    buf
}

/// Splits a stored blob back into its parts.
///
/// # Errors
///
/// Returns [`VaultError::CorruptContainer`] if the blob is shorter than the
/// header. Anything at least that long splits successfully.
pub fn decode(data: &[u8]) -> Result<Container, VaultError> {
    if data.len() < HEADER_LEN {
        return Err(VaultError::CorruptContainer { len: data.len() });
    }

    let (salt, rest) = data.split_at(SALT_LEN);
    let (nonce, ciphertext) = rest.split_at(NONCE_LEN);

    Ok(Container {
        salt: salt
            .try_into()
            .map_err(|_| VaultError::CorruptContainer { len: data.len() })?,
        nonce: nonce
            .try_into()
            .map_err(|_| VaultError::CorruptContainer { len: data.len() })?,
        ciphertext: ciphertext.to_vec(),
    })
}
