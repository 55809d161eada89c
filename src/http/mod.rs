//! JSON API over the portal operations.
//!
//! Sessions are started from the identity the authenticating proxy
//! forwards (see [`ProxyAuth`]). Everything except the session endpoints
//! sits behind [`require_admission`], which only passes sessions admitted
//! by the gate. The caller adds the session layer.

use axum::{
    extract::{DefaultBodyLimit, Request},
    http::StatusCode,
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
    Extension, Json, Router,
};
use serde_json::json;
use tower_sessions::Session;

use crate::{
    context::PortalContext,
    error::{PortalError, Result},
    gate::{self, Admission},
};

mod handlers;
mod proxy;

pub use proxy::{
    ProxyAuth, EMAIL_HEADER, IDENTITY_HEADER, NAME_HEADER, PHOTO_HEADER, SECRET_HEADER,
};

/// Shown to sessions the gate turned away.
pub const MAINTENANCE_NOTICE: &str =
    "The portal is temporarily closed for maintenance. Please come back later.";

const MAX_UPLOAD_BYTES: usize = 32 * 1024 * 1024;

pub fn router(ctx: PortalContext, proxy: ProxyAuth) -> Router {
    let gated = Router::new()
        .route(
            "/api/subjects",
            get(handlers::list_subjects).post(handlers::create_subject),
        )
        .route("/api/subjects/{id}", delete(handlers::delete_subject))
        .route("/api/solutions", get(handlers::list_solutions))
        .route("/api/solutions/{id}", delete(handlers::delete_solution))
        .route("/api/solutions/{id}/views", post(handlers::record_view))
        .route(
            "/api/upload",
            post(handlers::upload).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        .route("/api/seats", get(handlers::list_seats))
        .route(
            "/api/seats/{seat}/binding",
            post(handlers::bind_seat).delete(handlers::unbind_seat),
        )
        .route(
            "/api/admin/maintenance",
            get(handlers::get_maintenance).put(handlers::put_maintenance),
        )
        .route(
            "/api/admin/maintenance/testers/{seat}",
            put(handlers::add_tester).delete(handlers::remove_tester),
        )
        .route("/api/admin/views/recount", post(handlers::recount_views))
        .route("/api/admin/views/report", get(handlers::view_report))
        .route("/api/admin/views/recent", get(handlers::recent_views))
        .route("/api/admin/users/{identity}/role", put(handlers::set_role))
        .route_layer(middleware::from_fn(require_admission));

    Router::new()
        .route(
            "/api/session",
            get(handlers::current_session)
                .post(handlers::start_session)
                .delete(handlers::end_session),
        )
        .merge(gated)
        .with_state(ctx)
        .layer(Extension(proxy))
}

/// Lets a request through only when its session was admitted, and hands
/// the principal to the handler as an extension.
async fn require_admission(session: Session, mut req: Request, next: Next) -> Result<Response> {
    let (principal, admission) = gate::session_admission(&session)
        .await?
        .ok_or(PortalError::Unauthenticated)?;

    if !admission.is_allowed() {
        return Ok(maintenance_notice(admission));
    }

    req.extensions_mut().insert(principal);
    Ok(next.run(req).await)
}

pub(crate) fn maintenance_notice(admission: Admission) -> Response {
    (
        StatusCode::SERVICE_UNAVAILABLE,
        Json(json!({
            "status": "maintenance",
            "message": MAINTENANCE_NOTICE,
            "admission": admission,
        })),
    )
        .into_response()
}
