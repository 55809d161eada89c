use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// One view of one solution. Rows are never updated, and they outlive the
/// solution they point at.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "view_logs")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false, column_type = "Text")]
    pub id: String,
    pub solution_id: String,
    /// Identity id of the viewer.
    pub viewer: String,
    pub viewed_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
