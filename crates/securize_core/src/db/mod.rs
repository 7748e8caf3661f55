//! SQLite profile bootstrap.
//!
//! A profile is one SQLite file (or a private in-memory database) holding the
//! key-value slots behind `SqliteKeyValueStore`. Several connections may share
//! one profile file, the way browser tabs share one local storage.
//!
//! # Invariants
//! - Schema version is tracked via `PRAGMA user_version`.
//! - No slot is read or written before the schema steps succeed.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod migrations;
mod open;

pub use open::{open_db, open_db_in_memory, MEMORY_PROFILE};

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug)]
pub enum DbError {
    /// The profile could not be opened or brought up to date.
    Profile {
        profile: String,
        source: rusqlite::Error,
    },
    /// The profile was written by a newer build; it is left untouched.
    ProfileTooNew {
        profile: String,
        found: u32,
        supported: u32,
    },
    /// Slot query failed on an already open profile.
    Sqlite(rusqlite::Error),
}

impl DbError {
    /// Attaches the profile name to a bare SQLite failure.
    fn in_profile(self, profile: &str) -> Self {
        match self {
            Self::Sqlite(source) => Self::Profile {
                profile: profile.to_string(),
                source,
            },
            other => other,
        }
    }
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Profile { profile, source } => {
                write!(f, "profile `{profile}` is unusable: {source}")
            }
            Self::ProfileTooNew {
                profile,
                found,
                supported,
            } => write!(
                f,
                "profile `{profile}` has schema version {found}; this build reads up to {supported}"
            ),
            Self::Sqlite(err) => write!(f, "profile query failed: {err}"),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Profile { source, .. } | Self::Sqlite(source) => Some(source),
            Self::ProfileTooNew { .. } => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}
