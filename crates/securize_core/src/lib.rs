//! Content core for the Securize site.
//! This crate is the single source of truth for post invariants: catalog
//! merge, persisted profile access, editing rules and change notification.

pub mod catalog;
pub mod codec;
pub mod config;
pub mod contact;
pub mod db;
pub mod events;
pub mod kv;
pub mod logging;
pub mod model;
pub mod render;
pub mod service;
pub mod slug;

pub use catalog::{Catalog, CatalogError};
pub use codec::{decode_posts, encode_posts, encode_posts_pretty, DecodeError};
pub use config::{ConfigError, ContactConfig, SiteConfig};
pub use contact::{
    CancelToken, ContactError, ContactService, MailError, MailRelay, MessageId, OutboxRelay,
    OutgoingMail, PentestRequest, SubmissionReceipt,
};
pub use events::{ChangeEvent, DocumentEvents, DocumentId, ProfileBus, SubscriptionId};
pub use kv::{KeyValueStore, MemoryKeyValueStore, SqliteKeyValueStore, StorageError, StorageResult};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::post::{BlogPost, PostMetadata, PostValidationError, Slug};
pub use render::{parse_blocks, to_html, Block};
pub use service::content_store::{
    merge_with_catalog, ContentStore, ContentStoreError, StoreResult, DEFAULT_STORAGE_KEY,
};
pub use service::post_editor::{EditorMode, PostEditor, SubmittedPost};
pub use slug::{is_canonical_slug, slugify};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
