use pbkdf2::pbkdf2_hmac;
use sha2::Sha256;
use zeroize::Zeroize;

use super::{KEY_LEN, PBKDF2_ITERATIONS, SALT_LEN};

/// AES-256 key derived from a signature. Wiped on drop, never persisted.
pub struct DerivedKey {
    bytes: [u8; KEY_LEN],
}

impl DerivedKey {
    pub(crate) fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.bytes
    }
}

impl Drop for DerivedKey {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

impl std::fmt::Debug for DerivedKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DerivedKey")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// Derive the file key from signer output and the per-file salt.
///
/// PBKDF2-HMAC-SHA256 with the signature as password. Identical inputs give
/// the identical key, which is what lets decryption rebuild it from a fresh
/// signature instead of storing it.
pub fn derive_key(signature: &[u8], salt: &[u8; SALT_LEN]) -> DerivedKey {
    let mut key = [0u8; KEY_LEN];
    pbkdf2_hmac::<Sha256>(signature, salt, PBKDF2_ITERATIONS, &mut key);
    let derived = DerivedKey::from_bytes(key);
    key.zeroize();
    derived
}
