use std::{sync::Arc, time::Duration};

use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use tracing::info;

use crate::{
    config::{Config, StorageConfig},
    error::Result,
    storage::{FileStorage, HttpFileStorage, LocalDirStorage},
};

/// Handles every portal operation runs against.
///
/// Built once per process and passed explicitly; there is no global store
/// or storage handle anywhere in the crate. Cloning is cheap, the
/// connection pool and the storage backend are shared.
#[derive(Clone, Debug)]
pub struct PortalContext {
    db: DatabaseConnection,
    storage: Arc<dyn FileStorage>,
}

impl PortalContext {
    pub fn new(db: DatabaseConnection, storage: Arc<dyn FileStorage>) -> Self {
        Self { db, storage }
    }

    /// Connects to the database and builds the configured storage backend.
    pub async fn connect(config: &Config) -> Result<Self> {
        let mut opt = ConnectOptions::new(config.database_url.clone());
        opt.max_connections(config.database_max_connections)
            .min_connections(1)
            .connect_timeout(Duration::from_secs(10))
            .acquire_timeout(Duration::from_secs(10))
            .idle_timeout(Duration::from_secs(60))
            .max_lifetime(Duration::from_secs(10 * 60))
            .sqlx_logging(false);

        let db = Database::connect(opt).await?;
        info!("Connected to database");

        let storage: Arc<dyn FileStorage> = match &config.storage {
            StorageConfig::Http {
                endpoint,
                folder_id,
                public_url,
            } => {
                info!(%endpoint, "Using HTTP file storage");
                Arc::new(HttpFileStorage::new(
                    endpoint.clone(),
                    folder_id.clone(),
                    public_url.clone(),
                ))
            }
            StorageConfig::LocalDir { root, public_url } => {
                info!(root = %root.display(), "Using local file storage");
                Arc::new(LocalDirStorage::new(root.clone(), public_url.clone()))
            }
        };

        Ok(Self::new(db, storage))
    }

    pub fn db(&self) -> &DatabaseConnection {
        &self.db
    }

    pub fn storage(&self) -> &dyn FileStorage {
        self.storage.as_ref()
    }

    /// Closes the connection pool. Other clones of this context become
    /// unusable afterwards.
    pub async fn close(self) -> Result<()> {
        self.db.close().await?;
        info!("Database connection closed");
        Ok(())
    }
}
