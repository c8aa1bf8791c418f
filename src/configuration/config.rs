use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info};
use serde::{Deserialize, Serialize};

use super::types::BackendKind;
use crate::error_handling::types::ConfigError;
use crate::storage::database_storage::DatabaseAdapter;
use crate::storage::file_storage::FileAdapter;

/// Runtime configuration of an intake queue deployment.
///
/// Loaded from a TOML file; every key is optional:
///
/// ```toml
/// backend = "file"            # file | database
/// storage_path = "/var/lib/intake"
/// collection = "queue"
/// database_file = "intake.sqlite3"
/// pending_limit = 100
/// ```
///
/// # Fields Overview
///
/// - `backend`: which storage technology holds the records
/// - `storage_path`: root directory for the file backend and for a relative
///   `database_file`. Defaults to the current directory
/// - `collection`: name of the record collection (file sub-directory)
/// - `database_file`: SQLite file used by the database backend
/// - `pending_limit`: upper bound on records returned by a pending listing;
///   unset means no bound
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct QueueConfig {
    pub backend: BackendKind,
    pub storage_path: PathBuf,
    pub collection: String,
    pub database_file: PathBuf,
    pub pending_limit: Option<usize>,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::default(),
            storage_path: PathBuf::from("."),
            collection: String::from("queue"),
            database_file: PathBuf::from(DatabaseAdapter::DEFAULT_DB_FILE),
            pending_limit: None,
        }
    }
}

impl QueueConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        let config = Self::from_toml_str(&content)?;
        info!("Loaded queue configuration from {}", path.display());
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: QueueConfig =
            toml::from_str(content).map_err(|e| ConfigError::TomlError(e.to_string()))?;
        config.validate()?;
        debug!("Parsed configuration: {:?}", config);
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.collection.trim().is_empty() {
            return Err(ConfigError::InvalidValue("collection must not be empty".into()));
        }
        if self.pending_limit == Some(0) {
            return Err(ConfigError::InvalidValue(
                "pending_limit must be at least 1 when set".into(),
            ));
        }
        if self.database_file.as_os_str().is_empty() {
            return Err(ConfigError::InvalidValue("database_file must not be empty".into()));
        }
        Ok(())
    }

    pub fn file_adapter(&self) -> FileAdapter {
        FileAdapter::new(&self.storage_path, self.collection.clone())
    }

    /// A relative `database_file` is resolved against `storage_path`.
    pub fn database_adapter(&self) -> DatabaseAdapter {
        if self.database_file.is_absolute() {
            DatabaseAdapter::new(&self.database_file)
        } else {
            DatabaseAdapter::new(self.storage_path.join(&self.database_file))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_from_empty_file() {
        let config = QueueConfig::from_toml_str("").unwrap();
        assert_eq!(config, QueueConfig::default());
        assert_eq!(config.backend, BackendKind::File);
        assert_eq!(config.collection, "queue");
        assert_eq!(config.pending_limit, None);
    }

    #[test]
    fn test_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("intake.toml");
        fs::write(
            &path,
            r#"
backend = "database"
storage_path = "/var/lib/intake"
collection = "requests"
database_file = "queue.db"
pending_limit = 25
"#,
        )
        .unwrap();

        let config = QueueConfig::from_file(&path).unwrap();
        assert_eq!(config.backend, BackendKind::Database);
        assert_eq!(config.collection, "requests");
        assert_eq!(config.pending_limit, Some(25));
        assert_eq!(
            config.database_adapter().path,
            PathBuf::from("/var/lib/intake/queue.db")
        );
        assert_eq!(
            config.file_adapter(),
            FileAdapter::new("/var/lib/intake", "requests")
        );
    }

    #[test]
    fn test_absolute_database_file_is_kept() {
        let config = QueueConfig {
            database_file: PathBuf::from("/tmp/other.sqlite3"),
            ..Default::default()
        };
        assert_eq!(config.database_adapter().path, PathBuf::from("/tmp/other.sqlite3"));
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        assert!(matches!(
            QueueConfig::from_toml_str("collection = \"  \""),
            Err(ConfigError::InvalidValue(_))
        ));
        assert!(matches!(
            QueueConfig::from_toml_str("pending_limit = 0"),
            Err(ConfigError::InvalidValue(_))
        ));
        assert!(matches!(
            QueueConfig::from_toml_str("backend = \"mongo\""),
            Err(ConfigError::TomlError(_))
        ));
        assert!(matches!(
            QueueConfig::from_toml_str("backend = \"memory\""),
            Err(ConfigError::TomlError(_))
        ));
        assert!(matches!(
            QueueConfig::from_toml_str("unknown_key = 1"),
            Err(ConfigError::TomlError(_))
        ));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            QueueConfig::from_file(&dir.path().join("absent.toml")),
            Err(ConfigError::IoError(_))
        ));
    }
}
