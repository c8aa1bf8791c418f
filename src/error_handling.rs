//! Error taxonomy shared by the queue, its storage backends and the
//! configuration loader.

pub mod types;

pub use types::{CliError, ConfigError, QueueError, StorageError};
