//! blockvault: encrypt files with a key derived from a wallet signature.
//!
//! The wallet signs a message built from the file's SHA-256; PBKDF2 turns the
//! signature into an AES-256-GCM key; the resulting `salt | nonce | ciphertext`
//! blob is the only thing that ever reaches the content store. Decryption asks
//! the same wallet to sign the same message again, so no key is ever stored.

pub mod container;
pub mod crypto;
pub mod error;
pub mod ledger;
pub mod message;
pub mod pipeline;
pub mod signer;
pub mod sniff;
pub mod storage;
pub mod store;

pub use crate::crypto::FileDigest;
pub use crate::error::{LedgerError, SignerError, StoreError, VaultError};
pub use crate::ledger::{Ledger, LedgerRecord};
pub use crate::pipeline::{PlaintextFile, RestoredFile, SealedFile, open, seal};
pub use crate::signer::{CommandSigner, LocalKeySigner, Signature, Signer};
pub use crate::sniff::SniffedType;
pub use crate::store::{ContentId, ContentStore, FsContentStore};

use anyhow::{Context, Result};
use directories::ProjectDirs;
use std::path::PathBuf;
use tracing::{info, warn};

/// Largest file accepted for upload unless configured otherwise (10 MiB).
pub const DEFAULT_MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;

/// Result of a successful upload.
#[derive(Debug)]
pub struct Upload {
    content_id: ContentId,
    digest: FileDigest,
    message: String,
    ledger_error: Option<String>,
}

impl Upload {
    pub fn content_id(&self) -> &ContentId {
        &self.content_id
    }

    pub fn digest(&self) -> &FileDigest {
        &self.digest
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Set when the container was stored but recording it in the ledger failed.
    pub fn ledger_error(&self) -> Option<&str> {
        self.ledger_error.as_deref()
    }
}

/// A content store, an optional ledger and an upload limit.
pub struct Vault<S: ContentStore> {
    store: S,
    ledger: Option<Ledger>,
    max_file_size: u64,
}

impl<S: ContentStore> Vault<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            ledger: None,
            max_file_size: DEFAULT_MAX_FILE_SIZE,
        }
    }

    pub fn with_ledger(mut self, ledger: Ledger) -> Self {
        self.ledger = Some(ledger);
        self
    }

    pub fn with_max_file_size(mut self, limit: u64) -> Self {
        self.max_file_size = limit;
        self
    }

    pub fn ledger(&self) -> Option<&Ledger> {
        self.ledger.as_ref()
    }

    /// Encrypt, store and (if a ledger is attached) record a file.
    ///
    /// The upload counts as done once the store accepted the container; a
    /// ledger failure after that is reported in [`Upload::ledger_error`].
    pub fn upload(
        &mut self,
        file: &PlaintextFile,
        signer: &dyn Signer,
        owner: Option<&str>,
    ) -> Result<Upload> {
        if file.size() > self.max_file_size {
            return Err(VaultError::FileTooLarge {
                size: file.size(),
                limit: self.max_file_size,
            }
            .into());
        }

        let sealed = pipeline::seal(file.bytes(), signer)?;
        let digest = sealed.digest().clone();
        let message = sealed.message().to_string();

        let content_id = self
            .store
            .put(sealed.container())
            .map_err(VaultError::from)
            .context("failed to upload encrypted file")?;
        info!(cid = %content_id, %digest, size = file.size(), "encrypted file stored");

        let ledger_error = match self.ledger.as_mut() {
            Some(ledger) => {
                let record = LedgerRecord::new(
                    content_id.as_str(),
                    digest.clone(),
                    owner.map(str::to_string),
                    file.name(),
                    file.size(),
                );
                match ledger.commit(record) {
                    Ok(()) => None,
                    Err(e) => {
                        warn!(cid = %content_id, "stored file but ledger update failed: {e:#}");
                        Some(format!("{e:#}"))
                    }
                }
            }
            None => None,
        };

        Ok(Upload {
            content_id,
            digest,
            message,
            ledger_error,
        })
    }

    /// Fetch and decrypt a container.
    ///
    /// Missing `digest` and `name` are looked up in the ledger by content id.
    /// The ledger's name and size win over what the plaintext suggests.
    pub fn download(
        &self,
        content_id: &ContentId,
        digest: Option<&FileDigest>,
        name: Option<&str>,
        signer: &dyn Signer,
    ) -> Result<RestoredFile> {
        let record = self
            .ledger
            .as_ref()
            .and_then(|l| l.find_by_content_id(content_id.as_str()));

        let digest = match (digest, record) {
            (Some(d), _) => d.clone(),
            (None, Some(r)) => r.digest().clone(),
            (None, None) => anyhow::bail!(
                "no file hash given and content '{content_id}' is not in the ledger"
            ),
        };
        let name = name.or(record.map(LedgerRecord::name));

        let container = self
            .store
            .get(content_id)
            .map_err(VaultError::from)
            .context("failed to fetch encrypted file")?;

        let restored = pipeline::open(&container, &digest, name, signer)?;

        if let Some(r) = record {
            if r.size() != restored.bytes().len() as u64 {
                warn!(
                    cid = %content_id,
                    recorded = r.size(),
                    actual = restored.bytes().len(),
                    "restored size differs from ledger"
                );
            }
        }
        info!(cid = %content_id, %digest, kind = %restored.kind(), "file decrypted");

        Ok(restored)
    }

    /// Ledger record for `digest`.
    pub fn record(&self, digest: &FileDigest) -> Result<&LedgerRecord> {
        let ledger = self.ledger.as_ref().context("no ledger configured")?;
        Ok(ledger
            .get(digest)
            .ok_or_else(|| LedgerError::NotRecorded(digest.to_string()))?)
    }
}

/// Per-user data directory, e.g. `~/.local/share/blockvault` on Linux.
pub fn default_data_dir() -> Result<PathBuf> {
    let project_dirs = ProjectDirs::from("", "", "blockvault")
        .context("could not determine platform directories")?;

    Ok(project_dirs.data_dir().to_path_buf())
}
