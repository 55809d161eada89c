//! Admission gate for maintenance mode.
//!
//! The decision is taken once, when a session starts, and stored in the
//! session next to the principal. Requests then read the stored decision
//! instead of re-reading the maintenance switch.
//!
//! | switch                  | role    | seat in testers | result |
//! |-------------------------|---------|-----------------|--------|
//! | absent or `active=false`| any     | any             | allow  |
//! | `active=true`           | teacher | any             | allow  |
//! | `active=true`           | student | yes             | allow  |
//! | `active=true`           | student | no / unbound    | deny   |

use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::info;

use crate::{
    context::PortalContext,
    entity::user::Role,
    error::Result,
    settings::{self, MaintenanceSetting},
    users::Principal,
};

const PRINCIPAL_KEY: &str = "portal.principal";
const ADMISSION_KEY: &str = "portal.admission";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DenyReason {
    Maintenance,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "decision", content = "reason", rename_all = "snake_case")]
pub enum Admission {
    Allow,
    Deny(DenyReason),
}

impl Admission {
    pub fn is_allowed(self) -> bool {
        matches!(self, Admission::Allow)
    }
}

/// Pure admission decision. See the module table.
pub fn decide(setting: Option<&MaintenanceSetting>, role: Role, seat: Option<i32>) -> Admission {
    let Some(setting) = setting.filter(|s| s.active) else {
        return Admission::Allow;
    };

    match role {
        Role::Teacher => Admission::Allow,
        Role::Student if seat.is_some_and(|seat| setting.is_tester(seat)) => Admission::Allow,
        Role::Student => Admission::Deny(DenyReason::Maintenance),
    }
}

/// Reads the maintenance switch and decides for `principal`.
pub async fn check(ctx: &PortalContext, principal: &Principal) -> Result<Admission> {
    let setting = settings::load_maintenance(ctx.db()).await?;
    Ok(decide(setting.as_ref(), principal.role, principal.seat))
}

/// Session entry point: decides once and records the principal and the
/// decision in the session.
///
/// The session id is cycled so a pre-sign-in cookie cannot be replayed as
/// the signed-in session.
pub async fn admit_session(
    ctx: &PortalContext,
    session: &Session,
    principal: Principal,
) -> Result<Admission> {
    let admission = check(ctx, &principal).await?;

    session.cycle_id().await?;
    session.insert(PRINCIPAL_KEY, &principal).await?;
    session.insert(ADMISSION_KEY, admission).await?;

    info!(
        identity = %principal.identity_id,
        role = ?principal.role,
        seat = ?principal.seat,
        ?admission,
        "session admitted"
    );
    Ok(admission)
}

/// Replaces the stored principal after its record changed mid-session.
/// The admission decision is left alone until the next session start.
pub async fn update_session_principal(session: &Session, principal: &Principal) -> Result<()> {
    session.insert(PRINCIPAL_KEY, principal).await?;
    Ok(())
}

/// The principal and decision stored by [`admit_session`], if any.
pub async fn session_admission(session: &Session) -> Result<Option<(Principal, Admission)>> {
    let principal: Option<Principal> = session.get(PRINCIPAL_KEY).await?;
    let admission: Option<Admission> = session.get(ADMISSION_KEY).await?;
    Ok(principal.zip(admission))
}
