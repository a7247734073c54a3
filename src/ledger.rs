//! Metadata ledger: which content id holds which file, for whom.
//!
//! Kept apart from the encryption pipeline, which never reads or writes it.
//! Losing the ledger loses convenience (names, lookups by content id), not
//! data: a container can always be opened with its content id and file hash.

use std::collections::HashMap;
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::crypto::FileDigest;
use crate::error::LedgerError;
use crate::storage::AtomicFile;

/// One uploaded file.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct LedgerRecord {
    content_id: String,
    digest: FileDigest,
    owner: Option<String>,
    name: String,
    size: u64,
    timestamp: String,
}

impl LedgerRecord {
    pub fn new(
        content_id: impl Into<String>,
        digest: FileDigest,
        owner: Option<String>,
        name: impl Into<String>,
        size: u64,
    ) -> Self {
        Self {
            content_id: content_id.into(),
            digest,
            owner,
            name: name.into(),
            size,
            timestamp: Utc::now().to_rfc3339(),
        }
    }

    pub fn content_id(&self) -> &str {
        &self.content_id
    }

    pub fn digest(&self) -> &FileDigest {
        &self.digest
    }

    pub fn owner(&self) -> Option<&str> {
        self.owner.as_deref()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn timestamp(&self) -> &str {
        &self.timestamp
    }
}

#[derive(Serialize, Deserialize, Debug)]
struct LedgerData {
    files: HashMap<FileDigest, LedgerRecord>,
    creation_date: String,
}

/// JSON ledger file, loaded whole and saved atomically.
pub struct Ledger {
    data: LedgerData,
    file: AtomicFile,
}

impl Ledger {
    /// Opens the ledger at `path`, starting empty if it does not exist yet.
    pub fn open(path: PathBuf) -> Result<Self> {
        let file = AtomicFile::new(path);

        let data = if file.exists() {
            let raw = file.read()?;
            serde_json::from_slice(&raw).with_context(|| {
                format!("failed to parse ledger {}", file.path().display())
            })?
        } else {
            LedgerData {
                files: HashMap::new(),
                creation_date: Utc::now().to_rfc3339(),
            }
        };

        Ok(Self { data, file })
    }

    pub fn record(&mut self, record: LedgerRecord) -> Result<(), LedgerError> {
        if self.data.files.contains_key(record.digest()) {
            return Err(LedgerError::AlreadyRecorded(record.digest().to_string()));
        }
        self.data.files.insert(record.digest().clone(), record);
        Ok(())
    }

    /// Records and saves in one step. A failed save leaves the ledger as it was.
    pub fn commit(&mut self, record: LedgerRecord) -> Result<()> {
        let digest = record.digest().clone();
        self.record(record)?;

        if let Err(e) = self.save() {
            self.data.files.remove(&digest);
            return Err(e);
        }
        Ok(())
    }

    pub fn get(&self, digest: &FileDigest) -> Option<&LedgerRecord> {
        self.data.files.get(digest)
    }

    pub fn find_by_content_id(&self, content_id: &str) -> Option<&LedgerRecord> {
        self.data
            .files
            .values()
            .find(|r| r.content_id() == content_id)
    }

    /// Records owned by `owner`, oldest first.
    pub fn files_of(&self, owner: &str) -> Vec<&LedgerRecord> {
        let mut files: Vec<_> = self
            .data
            .files
            .values()
            .filter(|r| r.owner() == Some(owner))
            .collect();
        files.sort_by(|a, b| a.timestamp().cmp(b.timestamp()));
        files
    }

    /// Every record, oldest first.
    pub fn all(&self) -> Vec<&LedgerRecord> {
        let mut files: Vec<_> = self.data.files.values().collect();
        files.sort_by(|a, b| a.timestamp().cmp(b.timestamp()));
        files
    }

    pub fn exists(&self, digest: &FileDigest) -> bool {
        self.data.files.contains_key(digest)
    }

    pub fn total(&self) -> usize {
        self.data.files.len()
    }

    pub fn creation_date(&self) -> &str {
        &self.data.creation_date
    }

    pub fn save(&self) -> Result<()> {
        let raw = serde_json::to_vec_pretty(&self.data)?;
        self.file
            .write(&raw)
            .with_context(|| format!("failed to write ledger {}", self.file.path().display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn record(content: &[u8], owner: Option<&str>) -> LedgerRecord {
        LedgerRecord::new(
            format!("cid-{}", content.len()),
            FileDigest::of(content),
            owner.map(str::to_string),
            "file.txt",
            content.len() as u64,
        )
    }

    fn empty_ledger() -> (tempfile::TempDir, Ledger) {
        let dir = tempdir().unwrap();
        let ledger = Ledger::open(dir.path().join("ledger.json")).unwrap();
        (dir, ledger)
    }

    #[test]
    fn new_ledger_is_empty() {
        let (_dir, ledger) = empty_ledger();
        assert_eq!(ledger.total(), 0);
        assert_ne!(ledger.creation_date(), "");
    }

    #[test]
    fn record_and_get_works() {
        let (_dir, mut ledger) = empty_ledger();
        ledger.record(record(b"abc", Some("alice"))).unwrap();

        let found = ledger.get(&FileDigest::of(b"abc")).unwrap();
        assert_eq!(found.content_id(), "cid-3");
        assert_eq!(found.size(), 3);
        assert!(ledger.exists(&FileDigest::of(b"abc")));
        assert!(!ledger.exists(&FileDigest::of(b"abd")));
    }

    #[test]
    fn recording_same_digest_twice_fails() {
        let (_dir, mut ledger) = empty_ledger();
        ledger.record(record(b"abc", None)).unwrap();

        match ledger.record(record(b"abc", None)) {
            Err(LedgerError::AlreadyRecorded(d)) => assert_eq!(d, FileDigest::of(b"abc").to_string()),
            other => panic!("expected AlreadyRecorded, got: {other:?}"),
        }
    }

    #[test]
    fn find_by_content_id_works() {
        let (_dir, mut ledger) = empty_ledger();
        ledger.record(record(b"abcd", None)).unwrap();

        assert_eq!(
            ledger.find_by_content_id("cid-4").unwrap().digest(),
            &FileDigest::of(b"abcd")
        );
        assert!(ledger.find_by_content_id("cid-9").is_none());
    }

    #[test]
    fn files_of_filters_by_owner() {
        let (_dir, mut ledger) = empty_ledger();
        ledger.record(record(b"a", Some("alice"))).unwrap();
        ledger.record(record(b"bb", Some("bob"))).unwrap();
        ledger.record(record(b"ccc", Some("alice"))).unwrap();
        ledger.record(record(b"dddd", None)).unwrap();

        assert_eq!(ledger.files_of("alice").len(), 2);
        assert_eq!(ledger.files_of("bob").len(), 1);
        assert_eq!(ledger.files_of("carol").len(), 0);
        assert_eq!(ledger.all().len(), 4);
        assert_eq!(ledger.total(), 4);
    }

    #[test]
    fn ledger_survives_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ledger.json");

        let mut ledger = Ledger::open(path.clone()).unwrap();
        ledger.record(record(b"abc", Some("alice"))).unwrap();
        ledger.save().unwrap();

        let reopened = Ledger::open(path).unwrap();
        assert_eq!(reopened.total(), 1);
        assert_eq!(reopened.creation_date(), ledger.creation_date());
        assert_eq!(
            reopened.get(&FileDigest::of(b"abc")),
            ledger.get(&FileDigest::of(b"abc"))
        );
    }

    #[test]
    fn commit_persists_record() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ledger.json");

        let mut ledger = Ledger::open(path.clone()).unwrap();
        ledger.commit(record(b"abc", None)).unwrap();

        assert!(Ledger::open(path).unwrap().exists(&FileDigest::of(b"abc")));
    }

    #[test]
    fn failed_commit_leaves_ledger_unchanged() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, b"not a directory").unwrap();

        let mut ledger = Ledger::open(blocker.join("ledger.json")).unwrap();
        assert!(ledger.commit(record(b"abc", None)).is_err());
        assert!(!ledger.exists(&FileDigest::of(b"abc")));
        assert_eq!(ledger.total(), 0);

        // a retry hits the same write error, not a duplicate
        let err = ledger.commit(record(b"abc", None)).unwrap_err();
        assert!(err.downcast_ref::<LedgerError>().is_none());
    }

    #[test]
    fn garbage_ledger_fails_to_open() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ledger.json");
        std::fs::write(&path, b"{ not json").unwrap();

        assert!(Ledger::open(path).is_err());
    }
}
