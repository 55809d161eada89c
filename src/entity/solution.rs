//! Solution document entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// An uploaded solution document.
///
/// The binary lives in external file storage; this row only carries the
/// storage reference (`file_id`) and the retrieval URL built from it.
///
/// `view_count` is a denormalised counter. It is bumped on every view and
/// can drift from the view log; the aggregator rewrites it from the log.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "solutions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false, column_type = "Text")]
    pub id: String,
    /// Subject name, copied at upload time.
    pub subject: String,
    pub title: String,
    /// Stable reference returned by the file storage backend.
    pub file_id: String,
    pub url: String,
    pub view_count: i64,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
