//! Key-value persistence abstraction for the content profile.
//!
//! # Responsibility
//! - Model the browser-profile key-value store as an injected dependency.
//! - Provide an in-memory implementation for tests and a SQLite one for
//!   durable profiles.
//!
//! # Invariants
//! - `set` overwrites the whole value of a key; there is no partial update.
//! - Write failures are always returned, never swallowed.

use crate::db::DbError;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

mod memory;
mod sqlite;

pub use memory::MemoryKeyValueStore;
pub use sqlite::SqliteKeyValueStore;

pub type StorageResult<T> = Result<T, StorageError>;

/// Storage-level failures.
#[derive(Debug)]
pub enum StorageError {
    /// Writing the value would exceed the store's byte quota.
    QuotaExceeded {
        key: String,
        required: usize,
        limit: usize,
    },
    /// Storage is switched off for this profile.
    Disabled,
    Db(DbError),
}

impl Display for StorageError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::QuotaExceeded {
                key,
                required,
                limit,
            } => write!(
                f,
                "storage quota exceeded writing `{key}`: {required} bytes required, limit {limit}"
            ),
            Self::Disabled => write!(f, "storage is disabled"),
            Self::Db(err) => write!(f, "{err}"),
        }
    }
}

impl Error for StorageError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::QuotaExceeded { .. } | Self::Disabled => None,
        }
    }
}

impl From<DbError> for StorageError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for StorageError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Named-slot string store, the equivalent of a browser's local storage.
pub trait KeyValueStore {
    /// Reads one slot. `Ok(None)` when the key was never written.
    fn get(&self, key: &str) -> StorageResult<Option<String>>;
    /// Overwrites one slot entirely.
    fn set(&self, key: &str, value: &str) -> StorageResult<()>;
    /// Removes one slot. Removing an absent key is not an error.
    fn delete(&self, key: &str) -> StorageResult<()>;
}

impl<T: KeyValueStore + ?Sized> KeyValueStore for &T {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        (**self).set(key, value)
    }

    fn delete(&self, key: &str) -> StorageResult<()> {
        (**self).delete(key)
    }
}

impl<T: KeyValueStore + ?Sized> KeyValueStore for Arc<T> {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        (**self).set(key, value)
    }

    fn delete(&self, key: &str) -> StorageResult<()> {
        (**self).delete(key)
    }
}
