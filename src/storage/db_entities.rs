//! SeaORM entity model used by the database storage backend.
//!
//! Maps the `queue` table created by `database_storage`. The request payload
//! is kept as its JSON text so the column layout does not depend on which
//! protocol sections a request carried.

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "queue")]
pub struct Model {
    /// UUID as string primary key
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    /// JSON-serialized `RequestData`
    pub data: String,
    pub remote_ip: String,
    /// Unix timestamp in seconds
    pub datetime: i64,
    pub processed: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
