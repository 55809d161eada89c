#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use sea_orm::{
    ActiveModelTrait, ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Set,
};
use solutions_portal::{
    entity::{solution, student, view_log},
    migration::{Migrator, MigratorTrait},
    FileStorage, PortalContext, PortalError, Result, StoredFile,
};

/// Fresh in-memory database with the schema applied.
///
/// A single pooled connection keeps every query on the same in-memory
/// database.
pub async fn database() -> DatabaseConnection {
    let mut opt = ConnectOptions::new("sqlite::memory:");
    opt.max_connections(1).min_connections(1).sqlx_logging(false);

    let db = Database::connect(opt).await.expect("connect sqlite");
    Migrator::up(&db, None).await.expect("apply migrations");
    db
}

pub async fn context() -> (PortalContext, Arc<FakeStorage>) {
    let storage = Arc::new(FakeStorage::default());
    (PortalContext::new(database().await, storage.clone()), storage)
}

/// Makes every statement of `kind` (`INSERT`, `UPDATE`, `DELETE`) on
/// `table` matching `when` abort.
pub async fn fail_writes(ctx: &PortalContext, kind: &str, table: &str, when: &str) {
    let sql = format!(
        "CREATE TRIGGER fail_{name}_{table} BEFORE {kind} ON {table} \
         WHEN {when} BEGIN SELECT RAISE(ABORT, 'injected failure'); END;",
        name = kind.to_lowercase(),
    );
    ctx.db()
        .execute_unprepared(&sql)
        .await
        .expect("create failure trigger");
}

pub fn at(minutes: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 9, 2, 8, 0, 0).unwrap() + Duration::minutes(minutes)
}

pub async fn seed_seat(ctx: &PortalContext, seat: i32, name: &str) -> student::Model {
    student::ActiveModel {
        seat: Set(seat),
        name: Set(name.to_string()),
        identity_id: Set(None),
        contact: Set(None),
        photo_url: Set(None),
    }
    .insert(ctx.db())
    .await
    .expect("seed seat")
}

pub async fn seed_solution(
    ctx: &PortalContext,
    id: &str,
    subject: &str,
    view_count: i64,
    created_minute: i64,
) -> solution::Model {
    solution::ActiveModel {
        id: Set(id.to_string()),
        subject: Set(subject.to_string()),
        title: Set(format!("Solution {id}")),
        file_id: Set(format!("file-{id}")),
        url: Set(format!("https://files.example/file-{id}")),
        view_count: Set(view_count),
        created_at: Set(at(created_minute)),
    }
    .insert(ctx.db())
    .await
    .expect("seed solution")
}

pub async fn seed_view(ctx: &PortalContext, id: &str, solution_id: &str, minute: i64) {
    view_log::ActiveModel {
        id: Set(id.to_string()),
        solution_id: Set(solution_id.to_string()),
        viewer: Set("viewer".to_string()),
        viewed_at: Set(at(minute)),
    }
    .insert(ctx.db())
    .await
    .expect("seed view");
}

/// Storage that keeps files in memory and hands out sequential ids.
#[derive(Debug, Default)]
pub struct FakeStorage {
    pub stored: Mutex<Vec<(String, Vec<u8>)>>,
    pub fail: Mutex<bool>,
}

impl FakeStorage {
    pub fn stored_names(&self) -> Vec<String> {
        self.stored
            .lock()
            .unwrap()
            .iter()
            .map(|(name, _)| name.clone())
            .collect()
    }
}

#[async_trait]
impl FileStorage for FakeStorage {
    async fn put(
        &self,
        file_name: &str,
        _content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<StoredFile> {
        if *self.fail.lock().unwrap() {
            return Err(PortalError::Storage("quota exceeded".into()));
        }

        let mut stored = self.stored.lock().unwrap();
        stored.push((file_name.to_string(), bytes));
        let file_id = format!("R-{}", stored.len());
        Ok(StoredFile {
            url: format!("https://files.example/{file_id}"),
            file_id,
        })
    }
}
