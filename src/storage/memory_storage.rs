use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use log::{debug, error};

use crate::error_handling::types::{QueueError, StorageError};
use crate::storage::storage_trait::{Backend, Collection};
use crate::storage::types::{NewRecord, Record, RecordFilter, RecordId};

/// Names an in-process store. Queues holding equal adapters share records.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MemoryAdapter {
    pub name: String,
}

impl MemoryAdapter {
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self { name: name.into() }
    }
}

/// Process-local backend; nothing survives the process.
#[derive(Default)]
pub struct MemoryBackend {
    stores: Mutex<HashMap<String, Arc<Mutex<Vec<Record>>>>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Backend for MemoryBackend {
    type Adapter = MemoryAdapter;
    type Collection = MemoryCollection;

    fn collection(&self, adapter: &MemoryAdapter) -> Result<MemoryCollection, QueueError> {
        if adapter.name.is_empty() {
            return Err(QueueError::Configuration(
                "memory adapter requires a store name".into(),
            ));
        }
        let mut stores = self.stores.lock().map_err(|_| {
            error!("Memory store registry lock poisoned");
            QueueError::Storage(StorageError::ConnectionFailed("store registry poisoned".into()))
        })?;
        let records = stores.entry(adapter.name.clone()).or_default().clone();
        debug!("Resolved memory collection {}", adapter.name);
        Ok(MemoryCollection { records })
    }
}

/// Records kept in insertion order behind a mutex.
#[derive(Clone, Default)]
pub struct MemoryCollection {
    records: Arc<Mutex<Vec<Record>>>,
}

impl MemoryCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Collection pre-seeded with `records`, exactly as given.
    pub fn with_records(records: Vec<Record>) -> Self {
        Self { records: Arc::new(Mutex::new(records)) }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Vec<Record>>, StorageError> {
        self.records.lock().map_err(|_| {
            error!("Memory collection lock poisoned");
            StorageError::ReadFailed("memory collection poisoned".into())
        })
    }
}

impl Collection for MemoryCollection {
    fn insert(&self, record: NewRecord) -> Result<RecordId, StorageError> {
        let id = RecordId::generate();
        self.lock()?.push(record.into_record(id.clone()));
        debug!("Inserted record {} in memory", id);
        Ok(id)
    }

    fn find(&self, filter: &RecordFilter) -> Result<Vec<Record>, StorageError> {
        let records = self.lock()?;
        let limit = filter.limit.unwrap_or(usize::MAX);
        Ok(records
            .iter()
            .filter(|r| filter.matches(r))
            .take(limit)
            .cloned()
            .collect())
    }

    fn mark_processed(&self, id: &RecordId) -> Result<bool, StorageError> {
        let mut records = self.lock()?;
        match records.iter_mut().find(|r| &r.id == id) {
            Some(record) => {
                record.processed = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
