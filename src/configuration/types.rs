use std::fmt;

use serde::{Deserialize, Serialize};

/// Persistent storage technology a deployment keeps its records in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// One JSON document per record on disk
    #[default]
    File,
    /// SQLite database
    Database,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendKind::File => write!(f, "file"),
            BackendKind::Database => write!(f, "database"),
        }
    }
}
