//! Upload pipeline: store the binary, then record the solution.
//!
//! The two steps are not transactional. A storage write that succeeds
//! followed by a failed insert leaves an orphaned binary behind; it is
//! logged and not cleaned up.

use chrono::Utc;
use sea_orm::{ActiveModelTrait, Set};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    context::PortalContext,
    entity::solution,
    error::{PortalError, Result},
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UploadRequest {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
    pub subject: String,
    pub title: String,
}

impl UploadRequest {
    /// Rejects requests with a missing field before anything is sent out.
    pub fn validate(&self) -> Result<()> {
        let required = [
            ("file name", self.file_name.trim()),
            ("subject", self.subject.trim()),
            ("title", self.title.trim()),
        ];
        if let Some((field, _)) = required.iter().find(|(_, value)| value.is_empty()) {
            return Err(PortalError::validation(format!("{field} is required")));
        }
        if self.bytes.is_empty() {
            return Err(PortalError::validation("file is empty"));
        }
        Ok(())
    }
}

pub async fn upload_solution(ctx: &PortalContext, request: UploadRequest) -> Result<solution::Model> {
    request.validate()?;

    let UploadRequest {
        file_name,
        content_type,
        bytes,
        subject,
        title,
    } = request;

    let size = bytes.len();
    let stored = ctx.storage().put(&file_name, &content_type, bytes).await?;
    info!(file_id = %stored.file_id, %file_name, size, "file stored");

    let row = solution::ActiveModel {
        id: Set(Uuid::new_v4().to_string()),
        subject: Set(subject.trim().to_string()),
        title: Set(title.trim().to_string()),
        file_id: Set(stored.file_id.clone()),
        url: Set(stored.url.clone()),
        view_count: Set(0),
        created_at: Set(Utc::now()),
    };

    match row.insert(ctx.db()).await {
        Ok(created) => {
            info!(solution = %created.id, subject = %created.subject, "solution recorded");
            Ok(created)
        }
        Err(e) => {
            warn!(file_id = %stored.file_id, error = %e, "solution insert failed, stored file is orphaned");
            Err(e.into())
        }
    }
}
