//! File storage backends for uploaded solution binaries.
//!
//! Storage only has to accept a named payload and hand back a stable
//! reference. Nothing in the portal ever deletes from it.

use std::{fmt::Debug, path::PathBuf};

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::error::{PortalError, Result};

/// Reference to a stored binary.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredFile {
    /// Stable identifier issued by the backend.
    pub file_id: String,
    /// URL the file can be retrieved from.
    pub url: String,
}

/// A backend that persists binaries outside the database.
#[async_trait]
pub trait FileStorage: Debug + Send + Sync {
    async fn put(&self, file_name: &str, content_type: &str, bytes: Vec<u8>)
        -> Result<StoredFile>;
}

/// Stores files in a local directory under a generated name.
#[derive(Clone, Debug)]
pub struct LocalDirStorage {
    root: PathBuf,
    public_url: String,
}

impl LocalDirStorage {
    pub fn new(root: impl Into<PathBuf>, public_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            public_url: public_url.into().trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl FileStorage for LocalDirStorage {
    async fn put(
        &self,
        file_name: &str,
        _content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<StoredFile> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|e| PortalError::Storage(e.to_string()))?;

        let file_id = format!("{}-{}", Uuid::new_v4(), sanitize_file_name(file_name));
        tokio::fs::write(self.root.join(&file_id), bytes)
            .await
            .map_err(|e| PortalError::Storage(e.to_string()))?;

        debug!(%file_id, "stored file locally");
        Ok(StoredFile {
            url: format!("{}/{}", self.public_url, file_id),
            file_id,
        })
    }
}

/// Posts files to an external upload endpoint, one folder per deployment.
///
/// The endpoint receives the raw bytes with `folder` and `name` query
/// parameters and answers `{"id": "..."}`. Retrieval URLs are built from
/// `public_url` when set, otherwise from the endpoint itself.
#[derive(Clone, Debug)]
pub struct HttpFileStorage {
    client: Client,
    endpoint: String,
    folder_id: String,
    public_url: String,
}

#[derive(Deserialize)]
struct UploadResponse {
    id: String,
}

impl HttpFileStorage {
    pub fn new(
        endpoint: impl Into<String>,
        folder_id: impl Into<String>,
        public_url: Option<String>,
    ) -> Self {
        let endpoint = endpoint.into();
        let public_url = public_url
            .unwrap_or_else(|| endpoint.clone())
            .trim_end_matches('/')
            .to_string();

        Self {
            client: Client::new(),
            endpoint,
            folder_id: folder_id.into(),
            public_url,
        }
    }
}

#[async_trait]
impl FileStorage for HttpFileStorage {
    async fn put(
        &self,
        file_name: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<StoredFile> {
        let response = self
            .client
            .post(&self.endpoint)
            .query(&[("folder", self.folder_id.as_str()), ("name", file_name)])
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(bytes)
            .send()
            .await
            .and_then(|res| res.error_for_status())
            .map_err(|e| PortalError::Storage(e.to_string()))?;

        let UploadResponse { id } = response
            .json()
            .await
            .map_err(|e| PortalError::Storage(format!("malformed upload response: {e}")))?;

        debug!(file_id = %id, "stored file remotely");
        Ok(StoredFile {
            url: format!("{}/{}", self.public_url, id),
            file_id: id,
        })
    }
}

/// Keeps ASCII alphanumerics, `.`, `-` and `_`; everything else becomes `_`.
fn sanitize_file_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();

    match cleaned.trim_start_matches('.') {
        "" => "file".to_string(),
        rest => rest.to_string(),
    }
}
