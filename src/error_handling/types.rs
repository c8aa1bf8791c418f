use std::fmt;

use crate::storage::types::RecordId;

#[derive(Debug)]
pub enum ConfigError {
    IoError(std::io::Error),
    TomlError(String),
    InvalidValue(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::IoError(e) => write!(f, "IO error: {}", e),
            ConfigError::TomlError(e) => write!(f, "TOML parsing error: {}", e),
            ConfigError::InvalidValue(e) => write!(f, "Invalid configuration value: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::IoError(err)
    }
}

/// Failures raised by a collection while talking to its storage.
///
/// The reason string carries the backend's own description; callers should
/// not match on its content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    ConnectionFailed(String),
    WriteFailed(String),
    ReadFailed(String),
    Corrupted(String),
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::ConnectionFailed(e) => write!(f, "Storage connection failed: {}", e),
            StorageError::WriteFailed(e) => write!(f, "Storage write failed: {}", e),
            StorageError::ReadFailed(e) => write!(f, "Storage read failed: {}", e),
            StorageError::Corrupted(e) => write!(f, "Stored record is corrupted: {}", e),
        }
    }
}

impl std::error::Error for StorageError {}

/// Errors surfaced by every queue operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueueError {
    /// No adapter is set, or the adapter cannot yield a collection.
    Configuration(String),
    /// `mark_processed` targeted an id the collection does not hold.
    NotFound(RecordId),
    Storage(StorageError),
}

impl fmt::Display for QueueError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueueError::Configuration(e) => write!(f, "Queue configuration error: {}", e),
            QueueError::NotFound(id) => write!(f, "Record not found: {}", id),
            QueueError::Storage(e) => write!(f, "Queue storage error: {}", e),
        }
    }
}

impl std::error::Error for QueueError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            QueueError::Storage(e) => Some(e),
            _ => None,
        }
    }
}

impl From<StorageError> for QueueError {
    fn from(err: StorageError) -> Self {
        QueueError::Storage(err)
    }
}

/// Top-level failure of a command-line invocation.
#[derive(Debug)]
pub enum CliError {
    Config(ConfigError),
    Queue(QueueError),
    Output(std::io::Error),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Config(e) => write!(f, "Configuration error: {}", e),
            CliError::Queue(e) => write!(f, "{}", e),
            CliError::Output(e) => write!(f, "Output error: {}", e),
        }
    }
}

impl std::error::Error for CliError {}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        CliError::Config(err)
    }
}

impl From<QueueError> for CliError {
    fn from(err: QueueError) -> Self {
        CliError::Queue(err)
    }
}

impl From<StorageError> for CliError {
    fn from(err: StorageError) -> Self {
        CliError::Queue(QueueError::Storage(err))
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        CliError::Output(err)
    }
}
