use std::sync::{PoisonError, RwLock};

use log::{debug, info, warn};

use crate::error_handling::types::QueueError;
use crate::storage::database_storage::DatabaseBackend;
use crate::storage::file_storage::FileBackend;
use crate::storage::memory_storage::MemoryBackend;
use crate::storage::record_filter;
use crate::storage::storage_trait::{Backend, Collection};
use crate::storage::types::{NewRecord, Record, RecordFilter, RecordId};

/// Holding area for intercepted requests awaiting analysis.
///
/// The queue knows nothing about how records are stored: every operation
/// resolves a collection through its `Backend` from the current adapter and
/// delegates to it.
///
/// # Fields Overview
///
/// - `backend`: turns an adapter into a live collection
/// - `adapter`: the replaceable, backend-defined connection context. Each
///   operation clones it once when it starts, so `set_adapter` from another
///   thread never changes the target of a call already in flight.
pub struct Queue<B: Backend> {
    backend: B,
    adapter: RwLock<Option<B::Adapter>>,
}

pub type MemoryQueue = Queue<MemoryBackend>;
pub type FileQueue = Queue<FileBackend>;
pub type DatabaseQueue = Queue<DatabaseBackend>;

impl<B: Backend> Queue<B> {
    /// Queue without an adapter; collection-dependent calls fail until one is set.
    pub fn new(backend: B) -> Self {
        Self { backend, adapter: RwLock::new(None) }
    }

    pub fn with_adapter(backend: B, adapter: B::Adapter) -> Self {
        Self { backend, adapter: RwLock::new(Some(adapter)) }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn adapter(&self) -> Option<B::Adapter> {
        // the guarded value is replaced wholesale, so a poisoned lock still holds a valid one
        self.adapter.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Replaces the adapter for subsequent operations. Collections resolved
    /// before the call keep pointing at the old target.
    pub fn set_adapter(&self, adapter: B::Adapter) {
        *self.adapter.write().unwrap_or_else(PoisonError::into_inner) = Some(adapter);
        debug!("Queue adapter replaced");
    }

    /// Resolves the queue's collection from a snapshot of the current adapter.
    pub fn collection(&self) -> Result<B::Collection, QueueError> {
        let adapter = self
            .adapter()
            .ok_or_else(|| QueueError::Configuration("no adapter configured".into()))?;
        self.backend.collection(&adapter)
    }

    /// Stores a new, unprocessed record and returns the id the backend assigned.
    pub fn enqueue(&self, record: NewRecord) -> Result<RecordId, QueueError> {
        let collection = self.collection()?;
        let remote_ip = record.remote_ip.clone();
        let id = collection.insert(record)?;
        info!("Enqueued record {} from {}", id, remote_ip);
        Ok(id)
    }

    /// Every record not yet marked processed, in the backend's natural order.
    pub fn get_pending(&self) -> Result<Vec<Record>, QueueError> {
        self.pending_matching(record_filter::pending())
    }

    /// At most `limit` pending records.
    pub fn get_pending_limited(&self, limit: usize) -> Result<Vec<Record>, QueueError> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        self.pending_matching(record_filter::pending().limit(limit))
    }

    /// Audit query: records matching `filter`, processed ones included.
    pub fn get_records(&self, filter: &RecordFilter) -> Result<Vec<Record>, QueueError> {
        Ok(self.collection()?.find(filter)?)
    }

    /// Flags the record as analysed. Marking an already processed record succeeds.
    pub fn mark_processed(&self, id: &RecordId) -> Result<(), QueueError> {
        if self.collection()?.mark_processed(id)? {
            info!("Record {} marked processed", id);
            Ok(())
        } else {
            warn!("Cannot mark unknown record {} processed", id);
            Err(QueueError::NotFound(id.clone()))
        }
    }

    fn pending_matching(&self, filter: RecordFilter) -> Result<Vec<Record>, QueueError> {
        let mut records = self.collection()?.find(&filter)?;
        let returned = records.len();
        records.retain(Record::is_pending);
        if records.len() != returned {
            warn!(
                "Backend returned {} processed record(s) for a pending query, dropped",
                returned - records.len()
            );
        }
        debug!("{} pending record(s)", records.len());
        Ok(records)
    }
}

impl<B: Backend + Default> Default for Queue<B> {
    fn default() -> Self {
        Self::new(B::default())
    }
}
