use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use sea_orm::DbErr;
use serde_json::json;
use thiserror::Error;

/// Result alias used by every portal operation.
pub type Result<T, E = PortalError> = std::result::Result<T, E>;

/// Errors surfaced by portal operations.
///
/// Every variant is scoped to the single action that produced it; nothing
/// here is fatal to the process.
#[derive(Error, Debug)]
pub enum PortalError {
    #[error("database error: {0}")]
    Database(#[from] DbErr),

    #[error("file storage error: {0}")]
    Storage(String),

    #[error("invalid request: {0}")]
    Validation(String),

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },

    /// A stored row failed validation on the way out of the database.
    #[error("corrupt {entity} record {id}: {reason}")]
    CorruptRecord {
        entity: &'static str,
        id: String,
        reason: String,
    },

    #[error("sign in required")]
    Unauthenticated,

    #[error("not allowed for this role")]
    Forbidden,

    #[error("the portal is under maintenance")]
    Maintenance,

    #[error("session error: {0}")]
    Session(#[from] tower_sessions::session::Error),
}

impl PortalError {
    pub(crate) fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            PortalError::Validation(_) => StatusCode::BAD_REQUEST,
            PortalError::NotFound { .. } => StatusCode::NOT_FOUND,
            PortalError::Unauthenticated => StatusCode::UNAUTHORIZED,
            PortalError::Forbidden => StatusCode::FORBIDDEN,
            PortalError::Maintenance => StatusCode::SERVICE_UNAVAILABLE,
            PortalError::Storage(_) => StatusCode::BAD_GATEWAY,
            PortalError::Database(_)
            | PortalError::CorruptRecord { .. }
            | PortalError::Session(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for PortalError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() && status != StatusCode::SERVICE_UNAVAILABLE {
            tracing::warn!(error = %self, "request failed");
        }

        (
            status,
            Json(json!({ "status": "error", "message": self.to_string() })),
        )
            .into_response()
    }
}
