use axum::{
    extract::{Multipart, Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_sessions::Session;

use crate::{
    aggregator::{self, RecountReport},
    binding, catalog,
    context::PortalContext,
    entity::{solution, student, subject, user::Role, view_log},
    error::{PortalError, Result},
    gate::{self, Admission},
    settings::{self, MaintenanceSetting},
    upload::{self, UploadRequest},
    users::{self, Identity, Principal},
};

use super::{maintenance_notice, ProxyAuth};

#[derive(Serialize)]
pub struct SessionView {
    principal: Principal,
    admission: Admission,
}

/// Signs in the identity the proxy vouches for. Request bodies are not
/// trusted to name an identity.
pub async fn start_session(
    State(ctx): State<PortalContext>,
    Extension(proxy): Extension<ProxyAuth>,
    session: Session,
    headers: HeaderMap,
) -> Result<Response> {
    let identity = proxy.identity(&headers)?;
    let principal = users::sign_in(&ctx, &identity).await?;
    let admission = gate::admit_session(&ctx, &session, principal.clone()).await?;

    if !admission.is_allowed() {
        return Ok(maintenance_notice(admission));
    }
    Ok(Json(SessionView {
        principal,
        admission,
    })
    .into_response())
}

pub async fn current_session(session: Session) -> Result<Json<SessionView>> {
    let (principal, admission) = gate::session_admission(&session)
        .await?
        .ok_or(PortalError::Unauthenticated)?;
    Ok(Json(SessionView {
        principal,
        admission,
    }))
}

pub async fn end_session(session: Session) -> Result<StatusCode> {
    session.flush().await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_subjects(State(ctx): State<PortalContext>) -> Result<Json<Vec<subject::Model>>> {
    Ok(Json(catalog::list_subjects(&ctx).await?))
}

#[derive(Deserialize)]
pub struct NewSubject {
    name: String,
}

pub async fn create_subject(
    State(ctx): State<PortalContext>,
    Extension(principal): Extension<Principal>,
    Json(body): Json<NewSubject>,
) -> Result<(StatusCode, Json<subject::Model>)> {
    principal.require_teacher()?;
    let created = catalog::create_subject(&ctx, &body.name).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn delete_subject(
    State(ctx): State<PortalContext>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    principal.require_teacher()?;
    catalog::delete_subject(&ctx, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Deserialize)]
pub struct SolutionFilter {
    subject: Option<String>,
}

pub async fn list_solutions(
    State(ctx): State<PortalContext>,
    Query(filter): Query<SolutionFilter>,
) -> Result<Json<Vec<solution::Model>>> {
    Ok(Json(
        catalog::list_solutions(&ctx, filter.subject.as_deref()).await?,
    ))
}

pub async fn delete_solution(
    State(ctx): State<PortalContext>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    principal.require_teacher()?;
    catalog::delete_solution(&ctx, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn record_view(
    State(ctx): State<PortalContext>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> Result<(StatusCode, Json<view_log::Model>)> {
    let event = catalog::record_view(&ctx, &id, &principal.identity_id).await?;
    Ok((StatusCode::CREATED, Json(event)))
}

/// Multipart upload: a `file` part plus `subject` and `title` text parts.
/// An optional `fileName` part overrides the name sent with the file.
pub async fn upload(
    State(ctx): State<PortalContext>,
    Extension(principal): Extension<Principal>,
    mut multipart: Multipart,
) -> Result<Json<serde_json::Value>> {
    principal.require_teacher()?;

    let mut request = UploadRequest {
        file_name: String::new(),
        content_type: "application/octet-stream".to_string(),
        bytes: Vec::new(),
        subject: String::new(),
        title: String::new(),
    };
    let mut file_name_override = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| PortalError::validation(e.body_text()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                if let Some(file_name) = field.file_name() {
                    request.file_name = file_name.to_string();
                }
                if let Some(content_type) = field.content_type() {
                    request.content_type = content_type.to_string();
                }
                request.bytes = field
                    .bytes()
                    .await
                    .map_err(|e| PortalError::validation(e.body_text()))?
                    .to_vec();
            }
            "fileName" | "subject" | "title" => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| PortalError::validation(e.body_text()))?;
                match name.as_str() {
                    "fileName" => file_name_override = Some(value),
                    "subject" => request.subject = value,
                    _ => request.title = value,
                }
            }
            _ => {}
        }
    }

    if let Some(file_name) = file_name_override.filter(|n| !n.trim().is_empty()) {
        request.file_name = file_name;
    }

    let created = upload::upload_solution(&ctx, request).await?;
    Ok(Json(json!({
        "status": "success",
        "id": created.id,
        "fileId": created.file_id,
        "url": created.url,
    })))
}

/// Seat as shown to clients. Binding details are only filled in for
/// teachers.
#[derive(Serialize)]
pub struct SeatView {
    seat: i32,
    name: String,
    bound: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    identity_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    contact: Option<String>,
    photo_url: Option<String>,
}

impl SeatView {
    fn new(model: student::Model, detailed: bool) -> Self {
        Self {
            seat: model.seat,
            name: model.name,
            bound: model.identity_id.is_some(),
            identity_id: model.identity_id.filter(|_| detailed),
            contact: model.contact.filter(|_| detailed),
            photo_url: model.photo_url,
        }
    }
}

pub async fn list_seats(
    State(ctx): State<PortalContext>,
    Extension(principal): Extension<Principal>,
) -> Result<Json<Vec<SeatView>>> {
    let detailed = principal.is_teacher();
    let seats = binding::list_seats(&ctx).await?;
    Ok(Json(
        seats
            .into_iter()
            .map(|seat| SeatView::new(seat, detailed))
            .collect(),
    ))
}

/// Students bind themselves; teachers may bind any identity.
pub async fn bind_seat(
    State(ctx): State<PortalContext>,
    Extension(principal): Extension<Principal>,
    session: Session,
    Path(seat): Path<i32>,
    Json(identity): Json<Identity>,
) -> Result<Json<SeatView>> {
    let binding_self = identity.identity_id == principal.identity_id;
    if !binding_self && !principal.is_teacher() {
        return Err(PortalError::Forbidden);
    }

    let bound = binding::bind_seat(&ctx, seat, &identity).await?;
    if binding_self {
        let refreshed = users::principal(&ctx, &principal.identity_id).await?;
        gate::update_session_principal(&session, &refreshed).await?;
    }

    Ok(Json(SeatView::new(bound, principal.is_teacher())))
}

pub async fn unbind_seat(
    State(ctx): State<PortalContext>,
    Extension(principal): Extension<Principal>,
    Path(seat): Path<i32>,
) -> Result<Json<SeatView>> {
    principal.require_teacher()?;
    let cleared = binding::unbind_seat(&ctx, seat).await?;
    Ok(Json(SeatView::new(cleared, true)))
}

pub async fn get_maintenance(
    State(ctx): State<PortalContext>,
    Extension(principal): Extension<Principal>,
) -> Result<Json<MaintenanceSetting>> {
    principal.require_teacher()?;
    let current = settings::load_maintenance(ctx.db())
        .await?
        .unwrap_or_default();
    Ok(Json(current))
}

pub async fn put_maintenance(
    State(ctx): State<PortalContext>,
    Extension(principal): Extension<Principal>,
    Json(body): Json<MaintenanceSetting>,
) -> Result<Json<MaintenanceSetting>> {
    principal.require_teacher()?;
    settings::save_maintenance(ctx.db(), &body).await?;
    Ok(Json(MaintenanceSetting::new(body.active, body.testers)))
}

pub async fn add_tester(
    State(ctx): State<PortalContext>,
    Extension(principal): Extension<Principal>,
    Path(seat): Path<i32>,
) -> Result<Json<MaintenanceSetting>> {
    principal.require_teacher()?;
    Ok(Json(settings::add_tester(ctx.db(), seat).await?))
}

pub async fn remove_tester(
    State(ctx): State<PortalContext>,
    Extension(principal): Extension<Principal>,
    Path(seat): Path<i32>,
) -> Result<Json<MaintenanceSetting>> {
    principal.require_teacher()?;
    Ok(Json(settings::remove_tester(ctx.db(), seat).await?))
}

pub async fn recount_views(
    State(ctx): State<PortalContext>,
    Extension(principal): Extension<Principal>,
) -> Result<Json<RecountReport>> {
    principal.require_teacher()?;
    Ok(Json(aggregator::recount_views(&ctx).await?))
}

#[derive(Deserialize)]
pub struct Limit {
    limit: Option<u64>,
}

pub async fn view_report(
    State(ctx): State<PortalContext>,
    Extension(principal): Extension<Principal>,
    Query(params): Query<Limit>,
) -> Result<Json<Vec<solution::Model>>> {
    principal.require_teacher()?;
    let limit = params.limit.unwrap_or(20).min(500);
    Ok(Json(aggregator::view_report(&ctx, limit).await?))
}

pub async fn recent_views(
    State(ctx): State<PortalContext>,
    Extension(principal): Extension<Principal>,
    Query(params): Query<Limit>,
) -> Result<Json<Vec<view_log::Model>>> {
    principal.require_teacher()?;
    let limit = params.limit.unwrap_or(50).min(500);
    Ok(Json(aggregator::recent_views(&ctx, limit).await?))
}

#[derive(Deserialize)]
pub struct RoleChange {
    role: Role,
}

pub async fn set_role(
    State(ctx): State<PortalContext>,
    Extension(principal): Extension<Principal>,
    Path(identity): Path<String>,
    Json(body): Json<RoleChange>,
) -> Result<Json<Principal>> {
    principal.require_teacher()?;
    Ok(Json(users::set_role(&ctx, &identity, body.role).await?))
}
