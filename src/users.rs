//! Identity records and the signed-in principal.

use chrono::Utc;
use sea_orm::{ActiveModelTrait, EntityTrait, IntoActiveModel, Set};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{
    context::PortalContext,
    entity::user::{self, Role},
    error::{PortalError, Result},
};

/// What the identity provider hands over after a successful sign-in.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub identity_id: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub photo_url: Option<String>,
}

/// The user a session acts as.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub identity_id: String,
    pub display_name: Option<String>,
    pub role: Role,
    pub seat: Option<i32>,
}

impl Principal {
    pub fn is_teacher(&self) -> bool {
        self.role == Role::Teacher
    }

    pub fn require_teacher(&self) -> Result<()> {
        if self.is_teacher() {
            Ok(())
        } else {
            Err(PortalError::Forbidden)
        }
    }
}

impl From<user::Model> for Principal {
    fn from(model: user::Model) -> Self {
        Self {
            identity_id: model.identity_id,
            display_name: model.display_name,
            role: model.role,
            seat: model.seat,
        }
    }
}

/// Resolves an identity to its principal, creating the identity record on
/// first sign-in as a student with no seat.
pub async fn sign_in(ctx: &PortalContext, identity: &Identity) -> Result<Principal> {
    if identity.identity_id.trim().is_empty() {
        return Err(PortalError::validation("identity id is required"));
    }

    let model = match user::Entity::find_by_id(identity.identity_id.clone())
        .one(ctx.db())
        .await?
    {
        Some(existing) => {
            if existing.display_name == identity.display_name
                && existing.photo_url == identity.photo_url
            {
                existing
            } else {
                let mut active = existing.into_active_model();
                active.display_name = Set(identity.display_name.clone());
                active.photo_url = Set(identity.photo_url.clone());
                active.update(ctx.db()).await?
            }
        }
        None => {
            let created = user::ActiveModel {
                identity_id: Set(identity.identity_id.clone()),
                role: Set(Role::Student),
                seat: Set(None),
                display_name: Set(identity.display_name.clone()),
                photo_url: Set(identity.photo_url.clone()),
                created_at: Set(Utc::now()),
            }
            .insert(ctx.db())
            .await?;
            info!(identity = %created.identity_id, "first sign-in, identity record created");
            created
        }
    };

    Ok(model.into())
}

/// Re-reads the principal for an identity, e.g. after a bind changed its
/// seat.
pub async fn principal(ctx: &PortalContext, identity_id: &str) -> Result<Principal> {
    user::Entity::find_by_id(identity_id.to_string())
        .one(ctx.db())
        .await?
        .map(Principal::from)
        .ok_or_else(|| PortalError::not_found("user", identity_id))
}

pub async fn set_role(ctx: &PortalContext, identity_id: &str, role: Role) -> Result<Principal> {
    let existing = user::Entity::find_by_id(identity_id.to_string())
        .one(ctx.db())
        .await?
        .ok_or_else(|| PortalError::not_found("user", identity_id))?;

    let mut active = existing.into_active_model();
    active.role = Set(role);
    let updated = active.update(ctx.db()).await?;

    info!(identity = %identity_id, ?role, "role assigned");
    Ok(updated.into())
}
