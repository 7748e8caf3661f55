//! Connection bootstrap for profile databases.
//!
//! # Invariants
//! - Returned connections run in WAL journal mode when file-backed.
//! - Returned connections are at the latest schema version.

use super::migrations::apply_migrations;
use super::{DbError, DbResult};
use log::{error, info};
use rusqlite::Connection;
use std::path::Path;
use std::time::{Duration, Instant};

/// Profile name reported for `open_db_in_memory` connections.
pub const MEMORY_PROFILE: &str = ":memory:";

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Opens (or creates) a profile file and brings its schema up to date.
///
/// Each connection behaves like an independent tab sharing the same
/// persisted profile.
///
/// # Side effects
/// - Emits `db_open` logging events with duration and status.
pub fn open_db(path: impl AsRef<Path>) -> DbResult<Connection> {
    let path = path.as_ref();
    let profile = path.display().to_string();
    open_profile(&profile, true, || Connection::open(path))
}

/// Opens a private in-memory profile.
pub fn open_db_in_memory() -> DbResult<Connection> {
    open_profile(MEMORY_PROFILE, false, Connection::open_in_memory)
}

fn open_profile(
    profile: &str,
    file_backed: bool,
    connect: impl FnOnce() -> rusqlite::Result<Connection>,
) -> DbResult<Connection> {
    let started_at = Instant::now();
    info!("event=db_open module=db status=start profile={profile}");

    let result = connect()
        .map_err(DbError::from)
        .and_then(|mut conn| prepare_profile(&mut conn, profile, file_backed).map(|()| conn))
        .map_err(|err| err.in_profile(profile));

    let duration_ms = started_at.elapsed().as_millis();
    match &result {
        Ok(_) => {
            info!("event=db_open module=db status=ok profile={profile} duration_ms={duration_ms}")
        }
        Err(err) => error!(
            "event=db_open module=db status=error profile={profile} duration_ms={duration_ms} error={err}"
        ),
    }
    result
}

fn prepare_profile(conn: &mut Connection, profile: &str, file_backed: bool) -> DbResult<()> {
    if file_backed {
        // journal_mode returns a row, so it cannot go through execute_batch.
        conn.query_row("PRAGMA journal_mode = WAL;", [], |_| Ok(()))?;
    }
    conn.busy_timeout(BUSY_TIMEOUT)?;
    if apply_migrations(conn, profile)? == 0 {
        info!("event=profile_created module=db status=ok profile={profile}");
    }
    Ok(())
}
