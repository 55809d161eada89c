//! Subjects, solutions and view recording.

use chrono::Utc;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set,
};
use tracing::info;
use uuid::Uuid;

use crate::{
    context::PortalContext,
    entity::{solution, subject, view_log},
    error::{PortalError, Result},
};

pub async fn create_subject(ctx: &PortalContext, name: &str) -> Result<subject::Model> {
    let name = name.trim();
    if name.is_empty() {
        return Err(PortalError::validation("subject name is required"));
    }

    let created = subject::ActiveModel {
        id: Set(Uuid::new_v4().to_string()),
        name: Set(name.to_string()),
        created_at: Set(Utc::now()),
    }
    .insert(ctx.db())
    .await?;

    info!(subject = %created.name, id = %created.id, "subject created");
    Ok(created)
}

pub async fn list_subjects(ctx: &PortalContext) -> Result<Vec<subject::Model>> {
    Ok(subject::Entity::find()
        .order_by_asc(subject::Column::Name)
        .all(ctx.db())
        .await?)
}

/// Deletes a subject. Solutions filed under it are kept.
pub async fn delete_subject(ctx: &PortalContext, id: &str) -> Result<()> {
    let result = subject::Entity::delete_by_id(id.to_string())
        .exec(ctx.db())
        .await?;
    if result.rows_affected == 0 {
        return Err(PortalError::not_found("subject", id));
    }

    info!(subject = %id, "subject deleted");
    Ok(())
}

/// Solutions newest first, optionally restricted to one subject name.
pub async fn list_solutions(
    ctx: &PortalContext,
    subject: Option<&str>,
) -> Result<Vec<solution::Model>> {
    let mut query = solution::Entity::find();
    if let Some(subject) = subject {
        query = query.filter(solution::Column::Subject.eq(subject));
    }

    Ok(query
        .order_by_desc(solution::Column::CreatedAt)
        .all(ctx.db())
        .await?)
}

pub async fn get_solution(ctx: &PortalContext, id: &str) -> Result<solution::Model> {
    let model = solution::Entity::find_by_id(id.to_string())
        .one(ctx.db())
        .await?
        .ok_or_else(|| PortalError::not_found("solution", id))?;

    if model.view_count < 0 {
        return Err(PortalError::CorruptRecord {
            entity: "solution",
            id: model.id,
            reason: format!("negative view count {}", model.view_count),
        });
    }
    Ok(model)
}

/// Deletes the solution row. Its view log entries stay behind and are
/// skipped by the recount.
pub async fn delete_solution(ctx: &PortalContext, id: &str) -> Result<()> {
    let result = solution::Entity::delete_by_id(id.to_string())
        .exec(ctx.db())
        .await?;
    if result.rows_affected == 0 {
        return Err(PortalError::not_found("solution", id));
    }

    info!(solution = %id, "solution deleted");
    Ok(())
}

/// Appends a view event and bumps the solution's counter.
///
/// The two writes are independent. If the increment is lost the log still
/// has the event and the next recount restores the counter.
pub async fn record_view(
    ctx: &PortalContext,
    solution_id: &str,
    viewer: &str,
) -> Result<view_log::Model> {
    get_solution(ctx, solution_id).await?;

    let event = view_log::ActiveModel {
        id: Set(Uuid::new_v4().to_string()),
        solution_id: Set(solution_id.to_string()),
        viewer: Set(viewer.to_string()),
        viewed_at: Set(Utc::now()),
    }
    .insert(ctx.db())
    .await?;

    solution::Entity::update_many()
        .col_expr(
            solution::Column::ViewCount,
            Expr::col(solution::Column::ViewCount).add(1),
        )
        .filter(solution::Column::Id.eq(solution_id))
        .exec(ctx.db())
        .await?;

    Ok(event)
}
