use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock, Mutex};

use log::{debug, error, info};
use regex::Regex;
use tempfile::NamedTempFile;

use crate::error_handling::types::{QueueError, StorageError};
use crate::storage::storage_trait::{Backend, Collection};
use crate::storage::types::{NewRecord, Record, RecordFilter, RecordId};

// Collection names and record ids both become path components.
static NAME_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]+$").expect("valid name pattern"));

/// Directory root plus the collection (sub-directory) holding queue records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileAdapter {
    pub base_path: PathBuf,
    pub collection: String,
}

impl FileAdapter {
    pub fn new<P: AsRef<Path>, S: Into<String>>(base_path: P, collection: S) -> Self {
        Self { base_path: base_path.as_ref().to_path_buf(), collection: collection.into() }
    }

    fn collection_dir(&self) -> PathBuf {
        self.base_path.join(&self.collection)
    }
}

/// Stores each record as one JSON document under `<base_path>/<collection>/<id>.json`.
#[derive(Default)]
pub struct FileBackend {
    // one writer lock per collection directory, shared by every resolved handle
    writers: Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>,
}

impl FileBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Backend for FileBackend {
    type Adapter = FileAdapter;
    type Collection = FileCollection;

    fn collection(&self, adapter: &FileAdapter) -> Result<FileCollection, QueueError> {
        if !NAME_PATTERN.is_match(&adapter.collection) {
            return Err(QueueError::Configuration(format!(
                "invalid collection name {:?}",
                adapter.collection
            )));
        }
        let dir = adapter.collection_dir();
        fs::create_dir_all(&dir).map_err(|e| {
            error!("Failed to create collection dir {}: {}", dir.display(), e);
            QueueError::Configuration(format!("cannot open {}: {}", dir.display(), e))
        })?;
        let write_lock = self
            .writers
            .lock()
            .map_err(|_| {
                error!("File writer registry lock poisoned");
                QueueError::Storage(StorageError::ConnectionFailed("writer registry poisoned".into()))
            })?
            .entry(dir.clone())
            .or_default()
            .clone();
        debug!("Resolved file collection at {}", dir.display());
        Ok(FileCollection { dir, write_lock })
    }
}

#[derive(Clone)]
pub struct FileCollection {
    dir: PathBuf,
    write_lock: Arc<Mutex<()>>,
}

impl FileCollection {
    fn record_path(&self, id: &RecordId) -> PathBuf {
        self.dir.join(format!("{}.json", id))
    }

    fn read_record(&self, path: &Path) -> Result<Record, StorageError> {
        let mut content = String::new();
        File::open(path)
            .and_then(|mut f| f.read_to_string(&mut content))
            .map_err(|e| {
                error!("Failed to read record file {}: {}", path.display(), e);
                StorageError::ReadFailed(e.to_string())
            })?;
        serde_json::from_str(&content).map_err(|e| {
            error!("Invalid record document {}: {}", path.display(), e);
            StorageError::Corrupted(format!("{}: {}", path.display(), e))
        })
    }

    // Write to a temp file in the same directory and rename it over the target.
    fn write_record(&self, record: &Record) -> Result<(), StorageError> {
        let path = self.record_path(&record.id);
        let json = serde_json::to_vec_pretty(record).map_err(|e| {
            error!("Failed to serialize record {}: {}", record.id, e);
            StorageError::WriteFailed(e.to_string())
        })?;
        let mut tmp = NamedTempFile::new_in(&self.dir).map_err(|e| {
            error!("Failed to create temp file in {}: {}", self.dir.display(), e);
            StorageError::WriteFailed(e.to_string())
        })?;
        tmp.write_all(&json).map_err(|e| {
            error!("Failed to write record {}: {}", record.id, e);
            StorageError::WriteFailed(e.to_string())
        })?;
        tmp.persist(&path).map_err(|e| {
            error!("Failed to persist record file {}: {}", path.display(), e.error);
            StorageError::WriteFailed(e.error.to_string())
        })?;
        Ok(())
    }

    fn lock_writer(&self) -> Result<std::sync::MutexGuard<'_, ()>, StorageError> {
        self.write_lock.lock().map_err(|_| {
            error!("Writer lock poisoned for {}", self.dir.display());
            StorageError::WriteFailed("writer lock poisoned".into())
        })
    }
}

impl Collection for FileCollection {
    fn insert(&self, record: NewRecord) -> Result<RecordId, StorageError> {
        let _guard = self.lock_writer()?;
        let record = record.into_record(RecordId::generate());
        self.write_record(&record)?;
        info!("Saved record {} to {}", record.id, self.dir.display());
        Ok(record.id)
    }

    fn find(&self, filter: &RecordFilter) -> Result<Vec<Record>, StorageError> {
        let mut records = Vec::new();
        let entries = fs::read_dir(&self.dir).map_err(|e| {
            error!("Failed to read collection dir {}: {}", self.dir.display(), e);
            StorageError::ReadFailed(e.to_string())
        })?;
        for entry in entries {
            let entry = entry.map_err(|e| {
                error!("Dir entry error: {}", e);
                StorageError::ReadFailed(e.to_string())
            })?;
            let path = entry.path();
            if path.extension().and_then(|s| s.to_str()) != Some("json") {
                continue;
            }
            let record = self.read_record(&path)?;
            if filter.matches(&record) {
                records.push(record);
            }
        }
        // directory order is arbitrary; oldest first, id as tie-break
        records.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then_with(|| a.id.cmp(&b.id)));
        if let Some(limit) = filter.limit {
            records.truncate(limit);
        }
        debug!("Loaded {} record(s) from {}", records.len(), self.dir.display());
        Ok(records)
    }

    fn mark_processed(&self, id: &RecordId) -> Result<bool, StorageError> {
        if !NAME_PATTERN.is_match(id.as_str()) {
            return Ok(false);
        }
        let _guard = self.lock_writer()?;
        let path = self.record_path(id);
        if !path.exists() {
            return Ok(false);
        }
        let mut record = self.read_record(&path)?;
        if record.processed {
            debug!("Record {} already processed", id);
            return Ok(true);
        }
        record.processed = true;
        self.write_record(&record)?;
        info!("Marked record {} processed", id);
        Ok(true)
    }
}
