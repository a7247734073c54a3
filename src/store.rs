//! Content-addressable storage for encrypted containers.

use std::fmt;
use std::io::ErrorKind;
use std::path::PathBuf;

use sha2::{Digest, Sha256};
use tracing::debug;

use crate::error::StoreError;
use crate::storage::AtomicFile;

/// Identifier handed out by a store for a blob it accepted.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContentId(String);

impl ContentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An untrusted store addressed by the ids it returns.
///
/// It only ever sees containers, never plaintext. No retries happen here; a
/// failed call is reported and the caller decides.
pub trait ContentStore {
    fn put(&self, bytes: &[u8]) -> Result<ContentId, StoreError>;
    fn get(&self, id: &ContentId) -> Result<Vec<u8>, StoreError>;
}

impl<S: ContentStore + ?Sized> ContentStore for &S {
    fn put(&self, bytes: &[u8]) -> Result<ContentId, StoreError> {
        (**self).put(bytes)
    }

    fn get(&self, id: &ContentId) -> Result<Vec<u8>, StoreError> {
        (**self).get(id)
    }
}

/// Directory of blobs named by the SHA-256 of their bytes.
#[derive(Debug, Clone)]
pub struct FsContentStore {
    root: PathBuf,
}

impl FsContentStore {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &PathBuf {
        &self.root
    }

    fn object(&self, id: &ContentId) -> Option<AtomicFile> {
        let valid = id.as_str().len() == 64 && id.as_str().bytes().all(|b| b.is_ascii_hexdigit());
        valid.then(|| AtomicFile::new(self.root.join(id.as_str().to_ascii_lowercase())))
    }
}

impl ContentStore for FsContentStore {
    fn put(&self, bytes: &[u8]) -> Result<ContentId, StoreError> {
        let id = ContentId::new(hex::encode(Sha256::digest(bytes)));
        let object = self
            .object(&id)
            .ok_or_else(|| StoreError::Unreachable("bad object id".to_string()))?;

        // same bytes, same id: nothing to write
        if object.exists() {
            debug!(cid = %id, "object already stored");
            return Ok(id);
        }

        object
            .write(bytes)
            .map_err(|e| StoreError::Unreachable(format!("{e:#}")))?;

        debug!(cid = %id, len = bytes.len(), "object stored");
        Ok(id)
    }

    fn get(&self, id: &ContentId) -> Result<Vec<u8>, StoreError> {
        let object = self
            .object(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;

        object.read().map_err(|e| {
            match e.downcast_ref::<std::io::Error>().map(|io| io.kind()) {
                Some(ErrorKind::NotFound) => StoreError::NotFound(id.to_string()),
                _ => StoreError::Unreachable(format!("{e:#}")),
            }
        })
    }
}
