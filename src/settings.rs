//! Accessor for the maintenance switch.
//!
//! The switch is a single row in `settings`. A missing row is reported as
//! `None`; callers decide what absence means (the gate treats it as off).

use chrono::Utc;
use sea_orm::{sea_query::OnConflict, ConnectionTrait, EntityTrait, Set};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{
    entity::setting::{self, MAINTENANCE_KEY},
    error::{PortalError, Result},
};

/// Maintenance mode state.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaintenanceSetting {
    pub active: bool,
    /// Seat numbers allowed through while `active` is set. Sorted, no
    /// duplicates.
    pub testers: Vec<i32>,
}

impl MaintenanceSetting {
    pub fn new(active: bool, testers: impl IntoIterator<Item = i32>) -> Self {
        let mut testers: Vec<i32> = testers.into_iter().collect();
        testers.sort_unstable();
        testers.dedup();
        Self { active, testers }
    }

    pub fn is_tester(&self, seat: i32) -> bool {
        self.testers.binary_search(&seat).is_ok()
    }

    fn from_model(model: setting::Model) -> Result<Self> {
        let testers: Vec<i32> =
            serde_json::from_str(&model.testers).map_err(|e| PortalError::CorruptRecord {
                entity: "setting",
                id: model.id.clone(),
                reason: format!("testers is not a list of seat numbers: {e}"),
            })?;
        Ok(Self::new(model.active, testers))
    }
}

pub async fn load_maintenance<C: ConnectionTrait>(db: &C) -> Result<Option<MaintenanceSetting>> {
    setting::Entity::find_by_id(MAINTENANCE_KEY.to_string())
        .one(db)
        .await?
        .map(MaintenanceSetting::from_model)
        .transpose()
}

/// Writes the whole switch, creating the row on first use.
pub async fn save_maintenance<C: ConnectionTrait>(
    db: &C,
    maintenance: &MaintenanceSetting,
) -> Result<()> {
    let normalized = MaintenanceSetting::new(maintenance.active, maintenance.testers.clone());
    let testers = serde_json::to_string(&normalized.testers)
        .map_err(|e| PortalError::validation(e.to_string()))?;

    let row = setting::ActiveModel {
        id: Set(MAINTENANCE_KEY.to_string()),
        active: Set(normalized.active),
        testers: Set(testers),
        updated_at: Set(Utc::now()),
    };

    setting::Entity::insert(row)
        .on_conflict(
            OnConflict::column(setting::Column::Id)
                .update_columns([
                    setting::Column::Active,
                    setting::Column::Testers,
                    setting::Column::UpdatedAt,
                ])
                .to_owned(),
        )
        .exec(db)
        .await?;

    info!(
        active = normalized.active,
        testers = ?normalized.testers,
        "maintenance setting saved"
    );
    Ok(())
}

pub async fn set_maintenance_active<C: ConnectionTrait>(
    db: &C,
    active: bool,
) -> Result<MaintenanceSetting> {
    let mut current = load_maintenance(db).await?.unwrap_or_default();
    current.active = active;
    save_maintenance(db, &current).await?;
    Ok(current)
}

pub async fn add_tester<C: ConnectionTrait>(db: &C, seat: i32) -> Result<MaintenanceSetting> {
    let current = load_maintenance(db).await?.unwrap_or_default();
    let updated = MaintenanceSetting::new(
        current.active,
        current.testers.into_iter().chain(Some(seat)),
    );
    save_maintenance(db, &updated).await?;
    Ok(updated)
}

pub async fn remove_tester<C: ConnectionTrait>(db: &C, seat: i32) -> Result<MaintenanceSetting> {
    let current = load_maintenance(db).await?.unwrap_or_default();
    let updated = MaintenanceSetting::new(
        current.active,
        current.testers.into_iter().filter(|s| *s != seat),
    );
    save_maintenance(db, &updated).await?;
    Ok(updated)
}
