//! Session entity backing [`SeaOrmStore`](crate::SeaOrmStore).

use sea_orm::entity::prelude::*;

/// A persisted `tower-sessions` record.
///
/// | Column      | Type               | Description                        |
/// |-------------|--------------------|------------------------------------|
/// | id          | TEXT (Primary Key) | Session ID                         |
/// | data        | BLOB / BYTEA       | MessagePack encoded session record |
/// | expiry_date | TIMESTAMPTZ        | Session expiration timestamp       |
///
/// Rows past `expiry_date` are invisible to `load` and are removed by the
/// periodic expired-session sweep.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "sessions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false, column_type = "Text")]
    pub id: String,
    pub data: Vec<u8>,
    pub expiry_date: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
