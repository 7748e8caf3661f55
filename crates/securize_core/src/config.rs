//! Site configuration file.
//!
//! A missing file means "all defaults"; a present but malformed file is an
//! error rather than being silently replaced.

use crate::logging::default_log_level;
use crate::service::content_store::DEFAULT_STORAGE_KEY;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

const DEFAULT_DATABASE_FILE: &str = "securize-profile.db";
const DEFAULT_ADMIN_RECIPIENT: &str = "requests@securize.example";
const DEFAULT_CONFIRMATION_SUBJECT: &str = "Pentest Request Received - SECURIZE";

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    /// Slot holding the persisted post collection.
    pub storage_key: String,
    /// SQLite file used as the persisted profile.
    pub database_path: PathBuf,
    /// One of trace|debug|info|warn|error.
    pub log_level: String,
    /// Rolling log directory. File logging is off when unset.
    pub log_dir: Option<PathBuf>,
    pub contact: ContactConfig,
}

/// Mail settings for pentest requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContactConfig {
    pub admin_recipient: String,
    pub confirmation_subject: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            database_path: PathBuf::from(DEFAULT_DATABASE_FILE),
            log_level: default_log_level().to_string(),
            log_dir: None,
            contact: ContactConfig::default(),
        }
    }
}

impl Default for ContactConfig {
    fn default() -> Self {
        Self {
            admin_recipient: DEFAULT_ADMIN_RECIPIENT.to_string(),
            confirmation_subject: DEFAULT_CONFIRMATION_SUBJECT.to_string(),
        }
    }
}

/// Configuration load/save errors.
#[derive(Debug)]
pub enum ConfigError {
    Io { path: PathBuf, source: std::io::Error },
    Parse { path: PathBuf, source: serde_json::Error },
    Invalid(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => write!(f, "config `{}`: {source}", path.display()),
            Self::Parse { path, source } => {
                write!(f, "config `{}` is malformed: {source}", path.display())
            }
            Self::Invalid(message) => write!(f, "invalid config: {message}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse { source, .. } => Some(source),
            Self::Invalid(_) => None,
        }
    }
}

impl SiteConfig {
    /// Reads `path`, falling back to defaults when the file does not exist.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => {
                return Err(ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        let config: Self = serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Writes this configuration as pretty JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let text = serde_json::to_string_pretty(self).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        std::fs::write(path, text).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.storage_key.trim().is_empty() {
            return Err(ConfigError::Invalid("storage_key cannot be empty".to_string()));
        }
        if self.contact.admin_recipient.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "contact.admin_recipient cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}
