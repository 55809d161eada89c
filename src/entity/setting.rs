//! Settings entity.
//!
//! Holds singleton configuration rows keyed by name. The only key in use
//! is [`MAINTENANCE_KEY`].

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Primary key of the maintenance switch row.
pub const MAINTENANCE_KEY: &str = "maintenance";

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "settings")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false, column_type = "Text")]
    pub id: String,
    pub active: bool,
    /// JSON array of exempt seat numbers, e.g. `[3, 17]`.
    #[sea_orm(column_type = "Text")]
    pub testers: String,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
