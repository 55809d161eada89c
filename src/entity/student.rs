//! Seat roster entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// A student seat.
///
/// At most one identity is bound to a seat at a time; binding overwrites
/// `identity_id`, `contact` and `photo_url` and unbinding clears all three.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "students")]
pub struct Model {
    /// Seat number, unique per class.
    #[sea_orm(primary_key, auto_increment = false)]
    pub seat: i32,
    pub name: String,
    pub identity_id: Option<String>,
    /// Contact address reported by the identity provider at bind time.
    pub contact: Option<String>,
    pub photo_url: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
