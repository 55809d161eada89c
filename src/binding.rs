//! Binding external identities to seats.
//!
//! Known gaps, kept as-is: binding does not check whether the identity is
//! already bound to another seat, and concurrent binds to one seat are
//! last-writer-wins. Only unbinding is transactional.

use chrono::Utc;
use sea_orm::{
    sea_query::{Expr, OnConflict},
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, IntoActiveModel, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use tracing::{info, warn};

use crate::{
    context::PortalContext,
    entity::{
        student,
        user::{self, Role},
    },
    error::{PortalError, Result},
    users::Identity,
};

/// All seats in ascending seat order.
pub async fn list_seats(ctx: &PortalContext) -> Result<Vec<student::Model>> {
    Ok(student::Entity::find()
        .order_by_asc(student::Column::Seat)
        .all(ctx.db())
        .await?)
}

async fn find_seat<C: ConnectionTrait>(db: &C, seat: i32) -> Result<student::Model> {
    student::Entity::find_by_id(seat)
        .one(db)
        .await?
        .ok_or_else(|| PortalError::not_found("seat", seat))
}

/// Binds `identity` to `seat`.
///
/// Writes the seat first, then points the identity record at it. A new
/// identity record is created as a student; an existing one keeps its
/// role. An identity displaced from the seat loses its seat number. The
/// writes are not atomic.
pub async fn bind_seat(
    ctx: &PortalContext,
    seat: i32,
    identity: &Identity,
) -> Result<student::Model> {
    if identity.identity_id.trim().is_empty() {
        return Err(PortalError::validation("identity id is required"));
    }

    let current = find_seat(ctx.db(), seat).await?;
    let displaced = current
        .identity_id
        .clone()
        .filter(|previous| *previous != identity.identity_id);

    let mut active = current.into_active_model();
    active.identity_id = Set(Some(identity.identity_id.clone()));
    active.contact = Set(identity.email.clone());
    active.photo_url = Set(identity.photo_url.clone());
    let bound = active.update(ctx.db()).await?;

    if let Some(previous) = displaced {
        warn!(seat, %previous, identity = %identity.identity_id, "overwriting existing seat binding");
        user::Entity::update_many()
            .col_expr(user::Column::Seat, Expr::value(Option::<i32>::None))
            .filter(user::Column::IdentityId.eq(previous.as_str()))
            .filter(user::Column::Seat.eq(seat))
            .exec(ctx.db())
            .await?;
    }

    // Existing records keep their role; only the seat moves.
    let record = user::ActiveModel {
        identity_id: Set(identity.identity_id.clone()),
        role: Set(Role::Student),
        seat: Set(Some(seat)),
        display_name: Set(identity.display_name.clone()),
        photo_url: Set(identity.photo_url.clone()),
        created_at: Set(Utc::now()),
    };
    user::Entity::insert(record)
        .on_conflict(
            OnConflict::column(user::Column::IdentityId)
                .update_column(user::Column::Seat)
                .to_owned(),
        )
        .exec(ctx.db())
        .await?;

    info!(seat, identity = %identity.identity_id, "seat bound");
    Ok(bound)
}

/// Clears the seat's identity, contact and photo and deletes the identity
/// record, in one transaction. Unbinding a free seat succeeds without
/// writing anything.
pub async fn unbind_seat(ctx: &PortalContext, seat: i32) -> Result<student::Model> {
    let txn = ctx.db().begin().await?;

    let current = find_seat(&txn, seat).await?;
    let Some(identity_id) = current.identity_id.clone() else {
        return Ok(current);
    };

    let mut active = current.into_active_model();
    active.identity_id = Set(None);
    active.contact = Set(None);
    active.photo_url = Set(None);
    let cleared = active.update(&txn).await?;

    user::Entity::delete_by_id(identity_id.clone())
        .exec(&txn)
        .await?;

    txn.commit().await?;

    info!(seat, identity = %identity_id, "seat unbound");
    Ok(cleared)
}
