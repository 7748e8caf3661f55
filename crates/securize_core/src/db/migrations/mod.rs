//! Schema steps for the persisted profile.
//!
//! # Invariants
//! - Steps are listed with strictly increasing `version`.
//! - The schema version of a profile lives in `PRAGMA user_version`; a profile
//!   newer than this binary is refused rather than touched.

use crate::db::{DbError, DbResult};
use log::info;
use rusqlite::Connection;

struct SchemaStep {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

const SCHEMA_STEPS: &[SchemaStep] = &[SchemaStep {
    version: 1,
    name: "kv_entries",
    sql: include_str!("0001_kv_entries.sql"),
}];

/// Version a freshly migrated profile ends up at.
pub fn latest_version() -> u32 {
    SCHEMA_STEPS.last().map_or(0, |step| step.version)
}

/// Reads the schema version recorded in the profile.
pub fn schema_version(conn: &Connection) -> DbResult<u32> {
    Ok(conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?)
}

/// Brings the profile named `profile` up to [`latest_version`].
///
/// Returns the version the profile was at before any step ran. All pending
/// steps share one transaction, so a failure leaves the profile untouched.
pub fn apply_migrations(conn: &mut Connection, profile: &str) -> DbResult<u32> {
    let from = schema_version(conn)?;
    let latest = latest_version();
    if from > latest {
        return Err(DbError::ProfileTooNew {
            profile: profile.to_string(),
            found: from,
            supported: latest,
        });
    }

    let pending: Vec<&SchemaStep> = SCHEMA_STEPS.iter().filter(|s| s.version > from).collect();
    if pending.is_empty() {
        return Ok(from);
    }

    let tx = conn.transaction()?;
    for step in pending {
        tx.execute_batch(step.sql)?;
        tx.pragma_update(None, "user_version", step.version)?;
        info!(
            "event=schema_step module=db status=ok profile={profile} version={} name={}",
            step.version, step.name
        );
    }
    tx.commit()?;
    Ok(from)
}
