//! Identity record entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Role attached to an identity.
///
/// Stored as a short string so the column stays readable from SQL.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[sea_orm(string_value = "teacher")]
    Teacher,
    #[sea_orm(string_value = "student")]
    Student,
}

/// One row per external identity that has signed in or been bound to a seat.
///
/// | Column       | Type           | Description                               |
/// |--------------|----------------|-------------------------------------------|
/// | identity_id  | TEXT (PK)      | Stable subject id from the identity provider |
/// | role         | VARCHAR(16)    | `teacher` or `student`                    |
/// | seat         | INTEGER NULL   | Bound seat number, students only          |
/// | display_name | TEXT NULL      | Last display name seen at sign-in         |
/// | photo_url    | TEXT NULL      | Last avatar URL seen at sign-in           |
/// | created_at   | TIMESTAMPTZ    | First sign-in or first bind               |
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false, column_type = "Text")]
    pub identity_id: String,
    pub role: Role,
    pub seat: Option<i32>,
    pub display_name: Option<String>,
    pub photo_url: Option<String>,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
