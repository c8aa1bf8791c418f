use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use log::{debug, error, info};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ColumnTrait, ConnectionTrait, Database, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, Schema, Set,
};

use crate::error_handling::types::{QueueError, StorageError};
use crate::storage::db_entities::{self as queue_table, Column};
use crate::storage::storage_trait::{Backend, Collection};
use crate::storage::types::{NewRecord, Record, RecordFilter, RecordId, RequestData};

/// Location of the SQLite database holding the `queue` table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseAdapter {
    pub path: PathBuf,
}

impl DatabaseAdapter {
    /// Default database filename used in the application's working directory
    pub const DEFAULT_DB_FILE: &'static str = "intake.sqlite3";

    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self { path: path.as_ref().to_path_buf() }
    }
}

/// SQLite backend driven through SeaORM.
///
/// The ORM is async; this backend owns a private runtime and blocks on it, so
/// its collections must not be used from inside another tokio runtime.
/// Connections are opened once per database path and reused afterwards.
pub struct DatabaseBackend {
    // declared before `rt` so pools close before the runtime goes away
    connections: Mutex<HashMap<PathBuf, DatabaseConnection>>,
    rt: Arc<tokio::runtime::Runtime>,
}

impl DatabaseBackend {
    pub fn new() -> Result<Self, StorageError> {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| {
                error!("Failed to build database runtime: {}", e);
                StorageError::ConnectionFailed(e.to_string())
            })?;
        Ok(Self { connections: Mutex::new(HashMap::new()), rt: Arc::new(rt) })
    }

    fn connect(&self, path: &Path) -> Result<DatabaseConnection, StorageError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                error!("Failed to create database dir {}: {}", parent.display(), e);
                StorageError::ConnectionFailed(e.to_string())
            })?;
        }
        let url = format!("sqlite://{}?mode=rwc", path.display());
        self.rt.block_on(async {
            let conn = Database::connect(url.as_str()).await.map_err(|e| {
                error!("Failed to open database {}: {}", path.display(), e);
                StorageError::ConnectionFailed(e.to_string())
            })?;
            let backend = conn.get_database_backend();
            let mut create = Schema::new(backend).create_table_from_entity(queue_table::Entity);
            create.if_not_exists();
            conn.execute(backend.build(&create)).await.map_err(|e| {
                error!("Failed to create queue table in {}: {}", path.display(), e);
                StorageError::WriteFailed(e.to_string())
            })?;
            info!("Database queue opened at {}", path.display());
            Ok::<_, StorageError>(conn)
        })
    }
}

impl Backend for DatabaseBackend {
    type Adapter = DatabaseAdapter;
    type Collection = DatabaseCollection;

    /// Fails with `QueueError::Configuration` when called from inside a tokio
    /// runtime, where blocking on the backend's own runtime would panic.
    fn collection(&self, adapter: &DatabaseAdapter) -> Result<DatabaseCollection, QueueError> {
        if tokio::runtime::Handle::try_current().is_ok() {
            error!("Database collection requested from inside a tokio runtime");
            return Err(QueueError::Configuration(
                "database backend cannot be driven from inside a tokio runtime".into(),
            ));
        }
        let mut connections = self.connections.lock().map_err(|_| {
            error!("Database connection registry lock poisoned");
            QueueError::Storage(StorageError::ConnectionFailed("connection registry poisoned".into()))
        })?;
        let conn = match connections.get(&adapter.path) {
            Some(conn) => conn.clone(),
            None => {
                let conn = self.connect(&adapter.path).map_err(|e| {
                    QueueError::Configuration(format!(
                        "cannot open database {}: {}",
                        adapter.path.display(),
                        e
                    ))
                })?;
                connections.insert(adapter.path.clone(), conn.clone());
                conn
            }
        };
        debug!("Resolved database collection at {}", adapter.path.display());
        Ok(DatabaseCollection { conn, rt: self.rt.clone() })
    }
}

/// Handle on the `queue` table.
///
/// # Panics
///
/// Every `Collection` method blocks on the backend's runtime and panics if
/// called from inside a tokio runtime. `DatabaseBackend::collection` refuses
/// to hand out a handle in that context; a handle resolved outside a runtime
/// must not be moved into one.
#[derive(Clone)]
pub struct DatabaseCollection {
    conn: DatabaseConnection,
    rt: Arc<tokio::runtime::Runtime>,
}

fn into_record(row: queue_table::Model) -> Result<Record, StorageError> {
    let data: RequestData = serde_json::from_str(&row.data).map_err(|e| {
        error!("Invalid data column for record {}: {}", row.id, e);
        StorageError::Corrupted(format!("record {}: {}", row.id, e))
    })?;
    let timestamp = DateTime::<Utc>::from_timestamp(row.datetime, 0).ok_or_else(|| {
        error!("Invalid datetime column for record {}: {}", row.id, row.datetime);
        StorageError::Corrupted(format!("record {}: bad datetime {}", row.id, row.datetime))
    })?;
    Ok(Record {
        id: RecordId::from(row.id),
        data,
        remote_ip: row.remote_ip,
        timestamp,
        processed: row.processed,
    })
}

impl Collection for DatabaseCollection {
    fn insert(&self, record: NewRecord) -> Result<RecordId, StorageError> {
        let id = RecordId::generate();
        let data = serde_json::to_string(&record.data).map_err(|e| {
            error!("Failed to serialize request data: {}", e);
            StorageError::WriteFailed(e.to_string())
        })?;
        let row = queue_table::ActiveModel {
            id: Set(id.to_string()),
            data: Set(data),
            remote_ip: Set(record.remote_ip),
            datetime: Set(record.timestamp.timestamp()),
            processed: Set(false),
        };
        self.rt.block_on(async {
            queue_table::Entity::insert(row)
                .exec_without_returning(&self.conn)
                .await
                .map_err(|e| {
                    error!("Failed to insert record {}: {}", id, e);
                    StorageError::WriteFailed(e.to_string())
                })
        })?;
        debug!("Inserted record {}", id);
        Ok(id)
    }

    fn find(&self, filter: &RecordFilter) -> Result<Vec<Record>, StorageError> {
        let mut query = queue_table::Entity::find();
        if let Some(processed) = filter.processed {
            query = query.filter(Column::Processed.eq(processed));
        }
        if let Some(ref ip) = filter.remote_ip {
            query = query.filter(Column::RemoteIp.eq(ip.as_str()));
        }
        if let Some(since) = filter.since {
            // stored at whole seconds; round the bound up
            let secs = since.timestamp() + i64::from(since.timestamp_subsec_nanos() > 0);
            query = query.filter(Column::Datetime.gte(secs));
        }
        query = query.order_by_asc(Column::Datetime).order_by_asc(Column::Id);
        if let Some(limit) = filter.limit {
            query = query.limit(limit as u64);
        }
        let rows = self.rt.block_on(async {
            query.all(&self.conn).await.map_err(|e| {
                error!("Failed to query records: {}", e);
                StorageError::ReadFailed(e.to_string())
            })
        })?;
        rows.into_iter().map(into_record).collect()
    }

    fn mark_processed(&self, id: &RecordId) -> Result<bool, StorageError> {
        let result = self.rt.block_on(async {
            queue_table::Entity::update_many()
                .col_expr(Column::Processed, Expr::value(true))
                .filter(Column::Id.eq(id.as_str()))
                .exec(&self.conn)
                .await
                .map_err(|e| {
                    error!("Failed to mark record {} processed: {}", id, e);
                    StorageError::WriteFailed(e.to_string())
                })
        })?;
        Ok(result.rows_affected > 0)
    }
}
