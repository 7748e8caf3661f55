//! Blog post domain model.
//!
//! # Invariants
//! - `slug` is stable across edits and already in canonical slug form.
//! - `slug`, `title` and `content` are never blank for a valid post.
//! - `tags` keep display order but never contain blank or repeated values.

use crate::slug::slugify;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Stable identifier of a post. Also its URL path segment.
pub type Slug = String;

/// Free-form display fields rendered next to a post.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PostMetadata {
    pub author: String,
    pub author_role: String,
    pub category: String,
    /// Human estimate such as `5 min read`.
    pub read_time: String,
    /// Image URL or data URI. Omitted from JSON when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

/// One unit of publishable content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlogPost {
    pub slug: Slug,
    pub title: String,
    #[serde(default)]
    pub excerpt: String,
    /// Markdown-subset body, see `render::parse_blocks`.
    pub content: String,
    /// Serialized as `date` (`YYYY-MM-DD`) to match the persisted layout.
    #[serde(rename = "date")]
    pub published_at: NaiveDate,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub featured: bool,
    #[serde(flatten)]
    pub metadata: PostMetadata,
}

impl BlogPost {
    /// Creates a post with empty optional fields.
    pub fn new(
        slug: impl Into<Slug>,
        title: impl Into<String>,
        content: impl Into<String>,
        published_at: NaiveDate,
    ) -> Self {
        Self {
            slug: slug.into(),
            title: title.into(),
            excerpt: String::new(),
            content: content.into(),
            published_at,
            tags: Vec::new(),
            featured: false,
            metadata: PostMetadata::default(),
        }
    }

    /// Checks the record-level invariants.
    ///
    /// # Errors
    /// - `EmptyField` when slug, title or content is blank.
    /// - `NonCanonicalSlug` when the slug would change under `slugify`.
    /// - `BlankTag` / `DuplicateTag` for malformed tag lists.
    pub fn validate(&self) -> Result<(), PostValidationError> {
        for (field, value) in [
            ("slug", self.slug.as_str()),
            ("title", self.title.as_str()),
            ("content", self.content.as_str()),
        ] {
            if value.trim().is_empty() {
                return Err(PostValidationError::EmptyField(field));
            }
        }

        let canonical = slugify(&self.slug);
        if canonical != self.slug {
            return Err(PostValidationError::NonCanonicalSlug {
                slug: self.slug.clone(),
                expected: canonical,
            });
        }

        let mut seen = BTreeSet::new();
        for tag in &self.tags {
            if tag.trim().is_empty() {
                return Err(PostValidationError::BlankTag);
            }
            if !seen.insert(tag.as_str()) {
                return Err(PostValidationError::DuplicateTag(tag.clone()));
            }
        }

        Ok(())
    }

    /// Case-insensitive category match used by category listings.
    pub fn in_category(&self, category: &str) -> bool {
        self.metadata
            .category
            .trim()
            .eq_ignore_ascii_case(category.trim())
    }
}

/// Record-level validation errors for `BlogPost`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostValidationError {
    EmptyField(&'static str),
    NonCanonicalSlug { slug: String, expected: String },
    BlankTag,
    DuplicateTag(String),
}

impl Display for PostValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyField(field) => write!(f, "required field `{field}` is empty"),
            Self::NonCanonicalSlug { slug, expected } => {
                write!(f, "slug `{slug}` is not canonical; expected `{expected}`")
            }
            Self::BlankTag => write!(f, "tags cannot be blank"),
            Self::DuplicateTag(tag) => write!(f, "tag `{tag}` appears more than once"),
        }
    }
}

impl Error for PostValidationError {}
