//! Storage Traits
//!
//! This module defines the two seams between the queue and a persistence
//! technology:
//!
//! - `Collection`: the minimal capability the queue needs from a store of
//!   record documents (insert, filtered read, update by id).
//! - `Backend`: turns a backend-defined adapter value into a live
//!   `Collection`. This is the only thing a new storage technology has to
//!   provide, and the thing tests replace with a stub.
//!
//! All methods return a `Result` to handle potential storage errors.

use crate::error_handling::types::{QueueError, StorageError};
use crate::storage::types::{NewRecord, Record, RecordFilter, RecordId};

/// A backend storage unit (table, directory, document collection) holding records.
pub trait Collection: Send + Sync {
    /// Stores `record` unprocessed and returns the id the backend assigned to it.
    fn insert(&self, record: NewRecord) -> Result<RecordId, StorageError>;

    /// Returns the records matching `filter`, in the backend's natural order.
    fn find(&self, filter: &RecordFilter) -> Result<Vec<Record>, StorageError>;

    /// Sets `processed = true` on the record identified by `id`.
    ///
    /// Returns `false` when no record has that id. Marking an already
    /// processed record is not an error and returns `true`.
    fn mark_processed(&self, id: &RecordId) -> Result<bool, StorageError>;
}

/// Resolves the queue's collection from an opaque adapter.
pub trait Backend: Send + Sync {
    /// Connection or configuration context; its shape is owned by the backend.
    type Adapter: Clone + Send + Sync;
    type Collection: Collection;

    /// Fails with `QueueError::Configuration` when the adapter cannot yield a collection.
    fn collection(&self, adapter: &Self::Adapter) -> Result<Self::Collection, QueueError>;
}
