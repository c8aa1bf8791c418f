pub mod cli;
pub mod configuration;
pub mod error_handling;
pub mod queue;
pub mod storage;

pub use error_handling::{ConfigError, QueueError, StorageError};
pub use queue::{DatabaseQueue, FileQueue, MemoryQueue, Queue};
pub use storage::{Backend, Collection, NewRecord, Record, RecordFilter, RecordId};
