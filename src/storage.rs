//! Storage subsystem
//!
//! This module provides the abstractions the queue persists records through,
//! and the bundled backends implementing them.
//!
//! Components:
//! - `storage_trait`: the `Collection` capability and the `Backend` accessor trait.
//! - `types`: the record data model shared by every backend.
//! - `record_filter`: helpers to build record queries.
//! - `memory_storage`: process-local backend, also the building block for test stubs.
//! - `file_storage`: one JSON document per record on the filesystem.
//! - `database_storage`: ORM-based SQLite implementation using SeaORM.
//! - `db_entities`: SeaORM entity model for the database backend.

pub mod database_storage;
pub mod db_entities;
pub mod file_storage;
pub mod memory_storage;
pub mod record_filter;
pub mod storage_trait;
pub mod types;

pub use database_storage::{DatabaseAdapter, DatabaseBackend, DatabaseCollection};
pub use file_storage::{FileAdapter, FileBackend, FileCollection};
pub use memory_storage::{MemoryAdapter, MemoryBackend, MemoryCollection};
pub use storage_trait::{Backend, Collection};
pub use types::{NewRecord, Record, RecordFilter, RecordId, RequestData};
