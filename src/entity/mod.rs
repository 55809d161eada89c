//! SeaORM entity models for the portal tables.
//!
//! Each module maps one table. Rows are read back through the typed models
//! here and validated at the boundary by the component modules, so nothing
//! outside this crate sees an untyped record.

/// Identity records: one row per signed-in external identity.
pub mod user;

/// Seat roster. Rows come from roster import; binding only touches the
/// identity columns.
pub mod student;

pub mod subject;

/// Uploaded solution documents and their view counters.
pub mod solution;

/// Append-only view events. The source of truth for counter repair.
pub mod view_log;

/// Singleton configuration rows such as the maintenance switch.
pub mod setting;

/// Persisted `tower-sessions` records.
pub mod session;
