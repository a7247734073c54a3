//! The encrypt and decrypt runs.
//!
//! ```text
//! seal: digest -> message -> sign -> derive(sig, salt) -> AES-GCM -> salt|nonce|ct
//! open: salt|nonce|ct -> message(digest) -> sign -> derive(sig, salt) -> AES-GCM -> sniff
//! ```
//!
//! Each run is sequential and self-contained. Salt, nonce, signature and key
//! are dropped (and wiped) when the call returns.

use tracing::debug;

use crate::container::{self, Container};
use crate::crypto::{self, FileDigest, NONCE_LEN, SALT_LEN};
use crate::error::VaultError;
use crate::message::encryption_message;
use crate::signer::Signer;
use crate::sniff::{self, SniffedType};

/// Name given to restored files when nothing better is known.
pub const FALLBACK_NAME: &str = "decrypted-file";

/// A file about to be encrypted.
#[derive(Debug, Clone)]
pub struct PlaintextFile {
    name: String,
    bytes: Vec<u8>,
}

impl PlaintextFile {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

/// Output of [`seal`]: the blob to store plus what is needed to open it again.
#[derive(Debug, Clone)]
pub struct SealedFile {
    digest: FileDigest,
    message: String,
    container: Vec<u8>,
}

impl SealedFile {
    pub fn digest(&self) -> &FileDigest {
        &self.digest
    }

    /// The message that was signed. Informational; it is rebuilt from the digest.
    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn container(&self) -> &[u8] {
        &self.container
    }

    pub fn into_container(self) -> Vec<u8> {
        self.container
    }
}

/// Output of [`open`].
#[derive(Debug, Clone)]
pub struct RestoredFile {
    bytes: Vec<u8>,
    name: String,
    kind: SniffedType,
}

impl RestoredFile {
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// Caller-supplied name (or the fallback) with its extension repaired.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> SniffedType {
        self.kind
    }

    pub fn mime(&self) -> &'static str {
        self.kind.mime()
    }
}

/// Encrypt `plaintext` with a key derived from `signer`'s signature.
///
/// # Errors
///
/// Signer errors abort before any key is derived. `Entropy` if the OS cannot
/// supply salt or nonce.
pub fn seal(plaintext: &[u8], signer: &dyn Signer) -> Result<SealedFile, VaultError> {
    let salt = crypto::generate_salt()?;
    let nonce = crypto::aead::generate_nonce()?;

    seal_with(plaintext, signer, salt, nonce)
}

/// `seal` with caller-chosen salt and nonce, for known-answer tests.
pub(crate) fn seal_with(
    plaintext: &[u8],
    signer: &dyn Signer,
    salt: [u8; SALT_LEN],
    nonce: [u8; NONCE_LEN],
) -> Result<SealedFile, VaultError> {
    let digest = FileDigest::of(plaintext);
    let message = encryption_message(&digest);
    debug!(%digest, len = plaintext.len(), "requesting signature for encryption");

    let signature = signer.sign(&message)?;
    let key = crypto::derive_key(signature.as_bytes(), &salt);
    drop(signature);

    let ciphertext = crypto::aead::encrypt_with_nonce(&key, &nonce, plaintext)?;
    let container = container::encode(&salt, &nonce, &ciphertext);
    debug!(%digest, container_len = container.len(), "file sealed");

    Ok(SealedFile {
        digest,
        message,
        container,
    })
}

/// Decrypt a stored container for the file with `digest`.
///
/// `name` is the original file name when known; the restored name is that
/// name (or [`FALLBACK_NAME`]) with its extension fixed to the sniffed type.
///
/// # Errors
///
/// `CorruptContainer` before the signer is bothered. Signer errors abort
/// before any key is derived. `AuthenticationFailure` if the signature does
/// not reproduce the key or the container was tampered with.
pub fn open(
    container: &[u8],
    digest: &FileDigest,
    name: Option<&str>,
    signer: &dyn Signer,
) -> Result<RestoredFile, VaultError> {
    let parsed: Container = container::decode(container)?;

    let message = encryption_message(digest);
    debug!(%digest, "requesting signature for decryption");

    let signature = signer.sign(&message)?;
    let key = crypto::derive_key(signature.as_bytes(), parsed.salt());
    drop(signature);

    let bytes = crypto::decrypt(&key, parsed.nonce(), parsed.ciphertext())?;

    let kind = sniff::classify(&bytes);
    let name = sniff::repair_name(name.unwrap_or(FALLBACK_NAME), kind);
    debug!(%digest, %kind, name = %name, "file restored");

    Ok(RestoredFile { bytes, name, kind })
}
