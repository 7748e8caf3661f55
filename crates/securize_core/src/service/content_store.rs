//! Local content store: merge-on-read over catalog and persisted profile.
//!
//! # Responsibility
//! - Produce one de-duplicated, newest-first view of posts by combining the
//!   persisted collection with the built-in catalog.
//! - Overwrite the persisted collection wholesale on every mutation and
//!   announce the write to other views.
//!
//! # Invariants
//! - Read paths never fail: unreadable, malformed or empty persisted data
//!   degrades to the catalog.
//! - Write paths always surface failures and never persist a collection with
//!   invalid posts or repeated slugs.
//! - Catalog slugs never vanish from `load()`; persisted values win for slugs
//!   present in both.
//! - Last writer wins at whole-collection granularity.

use crate::catalog::Catalog;
use crate::codec::{
    decode_posts, encode_posts, encode_posts_pretty, find_duplicate_slug, DecodeError,
};
use crate::events::{ChangeEvent, DocumentEvents};
use crate::kv::{KeyValueStore, StorageError};
use crate::model::post::{BlogPost, PostValidationError, Slug};
use crate::service::post_editor::{EditorMode, SubmittedPost};
use log::{error, info, warn};
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

/// Slot name used by the site for the persisted collection.
pub const DEFAULT_STORAGE_KEY: &str = "blogPosts";

pub type StoreResult<T> = Result<T, ContentStoreError>;

/// Write-path errors of the content store.
#[derive(Debug)]
pub enum ContentStoreError {
    /// A new post (or a renamed one) would reuse an existing slug.
    SlugCollision(Slug),
    /// The post being edited no longer exists.
    NotFound(Slug),
    Validation {
        slug: Slug,
        source: PostValidationError,
    },
    /// Import payload rejected; persisted state untouched.
    Decode(DecodeError),
    Encode(serde_json::Error),
    /// Underlying storage refused the write.
    Storage(StorageError),
}

impl Display for ContentStoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SlugCollision(slug) => write!(
                f,
                "a post with slug `{slug}` already exists; choose a different slug"
            ),
            Self::NotFound(slug) => write!(f, "post not found: {slug}"),
            Self::Validation { slug, source } => write!(f, "post `{slug}` is invalid: {source}"),
            Self::Decode(err) => write!(f, "import rejected: {err}"),
            Self::Encode(err) => write!(f, "failed to encode posts: {err}"),
            Self::Storage(err) => write!(f, "failed to persist posts: {err}"),
        }
    }
}

impl Error for ContentStoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation { source, .. } => Some(source),
            Self::Decode(err) => Some(err),
            Self::Encode(err) => Some(err),
            Self::Storage(err) => Some(err),
            Self::SlugCollision(_) | Self::NotFound(_) => None,
        }
    }
}

impl From<DecodeError> for ContentStoreError {
    fn from(value: DecodeError) -> Self {
        Self::Decode(value)
    }
}

impl From<StorageError> for ContentStoreError {
    fn from(value: StorageError) -> Self {
        Self::Storage(value)
    }
}

/// Content store bound to one key-value profile.
pub struct ContentStore<S: KeyValueStore> {
    catalog: Catalog,
    store: S,
    key: String,
    events: Option<Arc<DocumentEvents>>,
}

impl<S: KeyValueStore> ContentStore<S> {
    /// Creates a store over `store` using the default slot name.
    pub fn new(catalog: Catalog, store: S) -> Self {
        Self {
            catalog,
            store,
            key: DEFAULT_STORAGE_KEY.to_string(),
            events: None,
        }
    }

    /// Uses a different slot name for the persisted collection.
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }

    /// Announces successful writes through `events`.
    pub fn with_events(mut self, events: Arc<DocumentEvents>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn events(&self) -> Option<&Arc<DocumentEvents>> {
        self.events.as_ref()
    }

    /// Returns the merged, newest-first view of all posts.
    ///
    /// Never fails; see `load_persisted` for the fail-open rules.
    pub fn load(&self) -> Vec<BlogPost> {
        let persisted = self.load_persisted();
        let source = if persisted.is_some() {
            "persisted"
        } else {
            "catalog"
        };
        let base = persisted.unwrap_or_else(|| self.catalog.posts().to_vec());
        let posts = merge_with_catalog(base, self.catalog.posts());
        info!(
            "event=store_load module=content status=ok source={source} count={}",
            posts.len()
        );
        posts
    }

    /// Returns the persisted base collection.
    ///
    /// `None` when the slot is absent, unreadable, malformed or empty.
    pub fn load_persisted(&self) -> Option<Vec<BlogPost>> {
        self.read_slot().filter(|posts| !posts.is_empty())
    }

    /// Overwrites the persisted collection with `posts`, then notifies views.
    ///
    /// # Errors
    /// - `Validation` / `SlugCollision` when `posts` breaks a collection
    ///   invariant; nothing is written.
    /// - `Storage` when the underlying store refuses the write; no
    ///   notification is sent.
    pub fn save(&self, posts: &[BlogPost]) -> StoreResult<()> {
        for post in posts {
            validate_post(post)?;
        }
        if let Some(slug) = find_duplicate_slug(posts) {
            return Err(ContentStoreError::SlugCollision(slug.to_string()));
        }

        let payload = encode_posts(posts).map_err(ContentStoreError::Encode)?;
        if let Err(err) = self.store.set(&self.key, &payload) {
            error!(
                "event=store_save module=content status=error key={} count={} bytes={} error={}",
                self.key,
                posts.len(),
                payload.len(),
                err
            );
            return Err(err.into());
        }

        info!(
            "event=store_save module=content status=ok key={} count={} bytes={}",
            self.key,
            posts.len(),
            payload.len()
        );
        self.notify_write();
        Ok(())
    }

    /// Replaces the post with the same slug, or appends it when new.
    ///
    /// Mutations return the new view and persist it newest first, so applying
    /// the same post twice leaves the same collection.
    pub fn upsert(&self, post: BlogPost) -> StoreResult<Vec<BlogPost>> {
        validate_post(&post)?;
        let mut posts = self.load();
        match posts.iter_mut().find(|existing| existing.slug == post.slug) {
            Some(existing) => *existing = post,
            None => posts.push(post),
        }
        self.persist(posts)
    }

    /// Adds a new post. Fails with `SlugCollision` when the slug is taken.
    pub fn create(&self, post: BlogPost) -> StoreResult<Vec<BlogPost>> {
        validate_post(&post)?;
        let mut posts = self.load();
        if posts.iter().any(|existing| existing.slug == post.slug) {
            return Err(ContentStoreError::SlugCollision(post.slug));
        }
        posts.push(post);
        self.persist(posts)
    }

    /// Replaces the post currently stored under `original_slug`.
    ///
    /// The slug may change as long as the new one is not taken by another
    /// post.
    pub fn update(&self, original_slug: &str, post: BlogPost) -> StoreResult<Vec<BlogPost>> {
        validate_post(&post)?;
        let mut posts = self.load();
        let index = posts
            .iter()
            .position(|existing| existing.slug == original_slug)
            .ok_or_else(|| ContentStoreError::NotFound(original_slug.to_string()))?;
        if post.slug != original_slug && posts.iter().any(|existing| existing.slug == post.slug) {
            return Err(ContentStoreError::SlugCollision(post.slug));
        }
        posts[index] = post;
        self.persist(posts)
    }

    /// Persists the result of an editing session as a create or an update.
    pub fn submit(&self, submitted: SubmittedPost) -> StoreResult<Vec<BlogPost>> {
        let SubmittedPost { post, mode } = submitted;
        match mode {
            EditorMode::Create => self.create(post),
            EditorMode::Edit { original_slug } => self.update(&original_slug, post),
        }
    }

    /// Removes the post with `slug` from the persisted base. Returns `false`
    /// (and writes nothing) when the base does not hold it.
    ///
    /// The base is the decoded slot, or the catalog when nothing readable is
    /// persisted. Catalog posts resurface on the next `load()`; removing one
    /// only drops persisted edits made to it, and a repeated call is a no-op.
    pub fn remove(&self, slug: &str) -> StoreResult<bool> {
        let mut posts = self
            .read_slot()
            .unwrap_or_else(|| self.catalog.posts().to_vec());
        let before = posts.len();
        posts.retain(|post| post.slug != slug);
        if posts.len() == before {
            info!("event=store_remove module=content status=noop slug={slug}");
            return Ok(false);
        }
        if self.catalog.contains(slug) {
            warn!("event=store_remove module=content status=ok slug={slug} catalog_post=true");
        }
        self.save(&posts)?;
        Ok(true)
    }

    /// Replaces the persisted collection with a decoded import payload.
    ///
    /// Rejects the whole payload, leaving persisted state untouched, when it
    /// is not a JSON array of valid posts with unique slugs.
    pub fn import_all(&self, payload: &str) -> StoreResult<usize> {
        let posts = decode_posts(payload).map_err(|err| {
            warn!(
                "event=store_import module=content status=rejected key={} error={}",
                self.key, err
            );
            ContentStoreError::Decode(err)
        })?;
        self.save(&posts)?;
        info!(
            "event=store_import module=content status=ok key={} count={}",
            self.key,
            posts.len()
        );
        Ok(posts.len())
    }

    /// Serializes the current merged collection for download.
    pub fn export_all(&self) -> StoreResult<String> {
        encode_posts_pretty(&self.load()).map_err(ContentStoreError::Encode)
    }

    /// Deletes the persisted collection, returning to the catalog view.
    pub fn reset(&self) -> StoreResult<()> {
        self.store.delete(&self.key)?;
        info!("event=store_reset module=content status=ok key={}", self.key);
        self.notify_write();
        Ok(())
    }

    /// Looks up one post in the merged view.
    pub fn find(&self, slug: &str) -> Option<BlogPost> {
        self.load().into_iter().find(|post| post.slug == slug)
    }

    /// Featured posts, newest first.
    pub fn featured(&self) -> Vec<BlogPost> {
        self.load().into_iter().filter(|post| post.featured).collect()
    }

    /// Posts in `category` (case-insensitive), newest first.
    pub fn by_category(&self, category: &str) -> Vec<BlogPost> {
        self.load()
            .into_iter()
            .filter(|post| post.in_category(category))
            .collect()
    }

    /// Whether a view backed by this store should reload for `event`.
    pub fn should_reload(&self, event: &ChangeEvent) -> bool {
        match event {
            ChangeEvent::StoreUpdated | ChangeEvent::FocusRegained => true,
            ChangeEvent::StorageChanged { key } => *key == self.key,
        }
    }

    /// Decodes the slot as stored, keeping an empty array as `Some`.
    ///
    /// `None` when the slot is absent, unreadable or malformed.
    fn read_slot(&self) -> Option<Vec<BlogPost>> {
        let raw = match self.store.get(&self.key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(err) => {
                warn!(
                    "event=store_read module=content status=degraded key={} reason=storage_error error={}",
                    self.key, err
                );
                return None;
            }
        };

        match decode_posts(&raw) {
            Ok(posts) => Some(posts),
            Err(err) => {
                warn!(
                    "event=store_read module=content status=degraded key={} reason=malformed error={}",
                    self.key, err
                );
                None
            }
        }
    }

    /// Saves `posts` newest first and returns them as the new view.
    fn persist(&self, mut posts: Vec<BlogPost>) -> StoreResult<Vec<BlogPost>> {
        sort_newest_first(&mut posts);
        self.save(&posts)?;
        Ok(posts)
    }

    fn notify_write(&self) {
        if let Some(events) = &self.events {
            events.notify_write(&self.key);
        }
    }
}

/// Appends catalog posts missing from `base`, then sorts newest first.
///
/// The sort is stable, so posts sharing a date keep merge order.
pub fn merge_with_catalog(mut base: Vec<BlogPost>, catalog: &[BlogPost]) -> Vec<BlogPost> {
    let known: BTreeSet<Slug> = base.iter().map(|post| post.slug.clone()).collect();
    base.extend(
        catalog
            .iter()
            .filter(|post| !known.contains(&post.slug))
            .cloned(),
    );
    sort_newest_first(&mut base);
    base
}

/// Stable sort by `published_at`, newest first.
pub fn sort_newest_first(posts: &mut [BlogPost]) {
    posts.sort_by(|left, right| right.published_at.cmp(&left.published_at));
}

fn validate_post(post: &BlogPost) -> StoreResult<()> {
    post.validate()
        .map_err(|source| ContentStoreError::Validation {
            slug: post.slug.clone(),
            source,
        })
}
