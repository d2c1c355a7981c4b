//! Archive record store and the deletion-by-id operation.
//!
//! Separate from the replay pipeline: operates on items that were already
//! archived and indexed, not on in-flight captures. The store is a keyed
//! lookup/update of archive metadata; `JsonArchiveStore` is a small
//! file-backed implementation for single-node deployments.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::domain::SourceIdentity;

#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error("archive not found: {id}")]
    NotFound { id: String },

    #[error("archive store error: {0}")]
    Store(String),

    #[error("filesystem operation failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Metadata for one archived replay.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ArchiveRecord {
    pub id: String,
    pub source: SourceIdentity,
    pub file_path: PathBuf,
    pub deleted: bool,
}

impl ArchiveRecord {
    /// New record with a fresh id.
    pub fn new(source: SourceIdentity, file_path: PathBuf) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            source,
            file_path,
            deleted: false,
        }
    }
}

/// Keyed lookup/update of archived item metadata.
#[async_trait]
pub trait ArchiveStore: Send + Sync {
    /// Fetch a record by id. `ArchiveError::NotFound` if absent.
    async fn get(&self, id: &str) -> Result<ArchiveRecord, ArchiveError>;

    /// Flag a record as deleted.
    async fn mark_deleted(&self, id: &str) -> Result<(), ArchiveError>;
}

/// Delete an archived replay by id: remove its file, then flag the record.
///
/// A missing file is tolerated with a warning so a re-run after a partial
/// failure still converges on the deleted state.
pub async fn delete_archive(
    store: &dyn ArchiveStore,
    id: &str,
) -> Result<ArchiveRecord, ArchiveError> {
    let record = store.get(id).await?;

    match tokio::fs::remove_file(&record.file_path).await {
        Ok(()) => info!(id = %id, file = %record.file_path.display(), "archive file deleted"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            warn!(id = %id, file = %record.file_path.display(), "archive file already gone");
        }
        Err(e) => return Err(ArchiveError::Io(e)),
    }

    store.mark_deleted(id).await?;
    info!(id = %id, source = %record.source, "archive flagged deleted");

    Ok(ArchiveRecord {
        deleted: true,
        ..record
    })
}

/// File-backed archive store: a JSON map of id → record, rewritten on every
/// update.
pub struct JsonArchiveStore {
    path: PathBuf,
    records: Mutex<BTreeMap<String, ArchiveRecord>>,
}

impl JsonArchiveStore {
    /// Open a store file, creating an empty store if the file is absent.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, ArchiveError> {
        let path = path.as_ref().to_path_buf();
        let records = match std::fs::read_to_string(&path) {
            Ok(raw) => serde_json::from_str(&raw).map_err(|e| ArchiveError::Store(e.to_string()))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(ArchiveError::Io(e)),
        };
        Ok(Self {
            path,
            records: Mutex::new(records),
        })
    }

    /// Insert or replace a record, persisting immediately.
    pub fn put(&self, record: ArchiveRecord) -> Result<(), ArchiveError> {
        let mut records = self.records.lock().expect("archive store lock");
        records.insert(record.id.clone(), record);
        self.persist(&records)
    }

    fn persist(&self, records: &BTreeMap<String, ArchiveRecord>) -> Result<(), ArchiveError> {
        let raw =
            serde_json::to_string_pretty(records).map_err(|e| ArchiveError::Store(e.to_string()))?;
        std::fs::write(&self.path, raw)?;
        Ok(())
    }
}

#[async_trait]
impl ArchiveStore for JsonArchiveStore {
    async fn get(&self, id: &str) -> Result<ArchiveRecord, ArchiveError> {
        let records = self.records.lock().expect("archive store lock");
        records
            .get(id)
            .cloned()
            .ok_or_else(|| ArchiveError::NotFound { id: id.to_string() })
    }

    async fn mark_deleted(&self, id: &str) -> Result<(), ArchiveError> {
        let mut records = self.records.lock().expect("archive store lock");
        let record = records
            .get_mut(id)
            .ok_or_else(|| ArchiveError::NotFound { id: id.to_string() })?;
        record.deleted = true;
        self.persist(&records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn record(id: &str, file_path: PathBuf) -> ArchiveRecord {
        ArchiveRecord {
            id: id.to_string(),
            source: SourceIdentity::new("chan"),
            file_path,
            deleted: false,
        }
    }

    #[tokio::test]
    async fn delete_archive_removes_file_and_flags_record() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("replay.flv");
        std::fs::File::create(&file)
            .unwrap()
            .write_all(b"bytes")
            .unwrap();

        let store = JsonArchiveStore::open(dir.path().join("archives.json")).unwrap();
        store.put(record("a1", file.clone())).unwrap();

        let deleted = delete_archive(&store, "a1").await.unwrap();
        assert!(deleted.deleted);
        assert!(!file.exists());
        assert!(store.get("a1").await.unwrap().deleted);
    }

    #[tokio::test]
    async fn delete_archive_tolerates_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonArchiveStore::open(dir.path().join("archives.json")).unwrap();
        store
            .put(record("a2", dir.path().join("never-existed.flv")))
            .unwrap();

        let deleted = delete_archive(&store, "a2").await.unwrap();
        assert!(deleted.deleted);
    }

    #[tokio::test]
    async fn delete_unknown_archive_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonArchiveStore::open(dir.path().join("archives.json")).unwrap();

        assert!(matches!(
            delete_archive(&store, "missing").await,
            Err(ArchiveError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("archives.json");

        let fresh = ArchiveRecord::new(SourceIdentity::new("chan"), dir.path().join("x.flv"));
        let id = fresh.id.clone();
        {
            let store = JsonArchiveStore::open(&path).unwrap();
            store.put(fresh).unwrap();
            store.mark_deleted(&id).await.unwrap();
        }

        let reopened = JsonArchiveStore::open(&path).unwrap();
        assert!(reopened.get(&id).await.unwrap().deleted);
    }
}
