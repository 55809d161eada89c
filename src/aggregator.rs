//! View counter repair and reporting.
//!
//! `view_count` on a solution is bumped per view and can drift from the
//! view log (lost or doubled increments). [`recount_views`] rebuilds every
//! counter from the log and writes them back in one transaction.

use std::collections::BTreeMap;

use sea_orm::{
    sea_query::Expr, ColumnTrait, ConnectionTrait, DbBackend, EntityTrait, IsolationLevel,
    QueryFilter, QueryOrder, QuerySelect, TransactionTrait,
};
use serde::Serialize;
use tracing::{debug, info};

use crate::{
    context::PortalContext,
    entity::{solution, view_log},
    error::Result,
};

/// Counters rebuilt from the log.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ViewTally {
    /// One entry per known solution, zero when it has no views.
    pub counts: BTreeMap<String, i64>,
    /// Log entries pointing at solutions that no longer exist.
    pub ignored: u64,
}

/// Counts log entries per known solution. Entries for unknown ids are
/// skipped, never inserted.
pub fn tally<S, L>(solution_ids: S, log_solution_ids: L) -> ViewTally
where
    S: IntoIterator,
    S::Item: Into<String>,
    L: IntoIterator,
    L::Item: AsRef<str>,
{
    let mut tally = ViewTally {
        counts: solution_ids.into_iter().map(|id| (id.into(), 0)).collect(),
        ignored: 0,
    };

    for entry in log_solution_ids {
        match tally.counts.get_mut(entry.as_ref()) {
            Some(count) => *count += 1,
            None => tally.ignored += 1,
        }
    }

    tally
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RecountReport {
    pub counts: BTreeMap<String, i64>,
    /// Solutions whose stored counter differed from the log.
    pub corrected: usize,
    pub ignored_entries: u64,
}

/// Rebuilds every solution's view counter from the view log.
///
/// Reads and writes share one transaction: if any write fails nothing is
/// committed and the previous counters stay as they were. On Postgres the
/// transaction runs at `REPEATABLE READ` so both reads see one snapshot.
/// Only counters that differ from the log are written. Running it again with an unchanged log
/// writes nothing.
pub async fn recount_views(ctx: &PortalContext) -> Result<RecountReport> {
    let txn = match ctx.db().get_database_backend() {
        DbBackend::Postgres => {
            ctx.db()
                .begin_with_config(Some(IsolationLevel::RepeatableRead), None)
                .await?
        }
        _ => ctx.db().begin().await?,
    };

    let stored: Vec<(String, i64)> = solution::Entity::find()
        .select_only()
        .column(solution::Column::Id)
        .column(solution::Column::ViewCount)
        .into_tuple()
        .all(&txn)
        .await?;

    let log: Vec<String> = view_log::Entity::find()
        .select_only()
        .column(view_log::Column::SolutionId)
        .into_tuple()
        .all(&txn)
        .await?;

    let ViewTally { counts, ignored } = tally(stored.iter().map(|(id, _)| id.clone()), &log);

    let mut corrected = 0;
    for (id, previous) in &stored {
        let count = counts.get(id).copied().unwrap_or_default();
        if count == *previous {
            continue;
        }

        debug!(solution = %id, previous, count, "correcting view counter");
        solution::Entity::update_many()
            .col_expr(solution::Column::ViewCount, Expr::value(count))
            .filter(solution::Column::Id.eq(id.as_str()))
            .exec(&txn)
            .await?;
        corrected += 1;
    }

    txn.commit().await?;

    info!(
        solutions = counts.len(),
        log_entries = log.len(),
        corrected,
        ignored,
        "view counters recounted"
    );

    Ok(RecountReport {
        counts,
        corrected,
        ignored_entries: ignored,
    })
}

/// Most viewed solutions first.
pub async fn view_report(ctx: &PortalContext, limit: u64) -> Result<Vec<solution::Model>> {
    Ok(solution::Entity::find()
        .order_by_desc(solution::Column::ViewCount)
        .order_by_desc(solution::Column::CreatedAt)
        .limit(limit)
        .all(ctx.db())
        .await?)
}

/// Newest view events first.
pub async fn recent_views(ctx: &PortalContext, limit: u64) -> Result<Vec<view_log::Model>> {
    Ok(view_log::Entity::find()
        .order_by_desc(view_log::Column::ViewedAt)
        .limit(limit)
        .all(ctx.db())
        .await?)
}
