use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::VaultError;

/// Length of the hex-encoded SHA-256 digest.
pub const DIGEST_HEX_LEN: usize = 64;

/// Lower-case hex SHA-256 of a file's plaintext.
///
/// Doubles as the content identifier shown to the user and as the only
/// variable input of the message the signer is asked to sign.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FileDigest(String);

impl FileDigest {
    pub fn of(bytes: &[u8]) -> Self {
        Self(hex::encode(Sha256::digest(bytes)))
    }

    /// Accepts 64 hex characters in either case.
    pub fn parse(s: &str) -> Result<Self, VaultError> {
        let s = s.trim();
        if s.len() != DIGEST_HEX_LEN || !s.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(VaultError::InvalidDigest(s.to_string()));
        }
        Ok(Self(s.to_ascii_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FileDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for FileDigest {
    type Error = VaultError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<FileDigest> for String {
    fn from(d: FileDigest) -> Self {
        d.0
    }
}
