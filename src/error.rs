use thiserror::Error;

/// Every way an encrypt or decrypt run can end early.
///
/// Variants stay distinct so callers can tell a user decline from a broken
/// store or a wrong key. `AuthenticationFailure` covers both the
/// wrong-key and the tampered-data case.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum VaultError {
    #[error("no signer available: {0}")]
    SignerUnavailable(String),

    #[error("signature request rejected by the user")]
    SignerDeclined,

    #[error("content store unreachable: {0}")]
    NetworkFailure(String),

    #[error("content '{0}' not found in store")]
    NotFound(String),

    #[error("encrypted container too short / corrupted ({len} bytes)")]
    CorruptContainer { len: usize },

    #[error("decryption failed: wrong signer or corrupted data")]
    AuthenticationFailure,

    #[error("invalid file hash '{0}': expected 64 hex characters")]
    InvalidDigest(String),

    #[error("file is {size} bytes, limit is {limit} bytes")]
    FileTooLarge { size: u64, limit: u64 },

    #[error("OS random generator unavailable")]
    Entropy,

    #[error("encryption failed")]
    Encryption,
}

/// Failure reported by a [`Signer`](crate::signer::Signer).
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SignerError {
    #[error("signer unavailable: {0}")]
    Unavailable(String),

    #[error("signature request declined")]
    Declined,
}

impl From<SignerError> for VaultError {
    fn from(err: SignerError) -> Self {
        match err {
            SignerError::Unavailable(why) => VaultError::SignerUnavailable(why),
            SignerError::Declined => VaultError::SignerDeclined,
        }
    }
}

/// Failure reported by a [`ContentStore`](crate::store::ContentStore).
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("content '{0}' not found")]
    NotFound(String),

    #[error("store unreachable: {0}")]
    Unreachable(String),
}

impl From<StoreError> for VaultError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => VaultError::NotFound(id),
            StoreError::Unreachable(why) => VaultError::NetworkFailure(why),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LedgerError {
    #[error("file hash '{0}' is already recorded")]
    AlreadyRecorded(String),

    #[error("file hash '{0}' is not recorded")]
    NotRecorded(String),
}
