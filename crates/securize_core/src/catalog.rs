//! Immutable build-time catalog of default posts.
//!
//! # Invariants
//! - A catalog is never mutated after construction.
//! - Every catalog post is valid and slugs are unique.

use crate::codec::{decode_posts, find_duplicate_slug};
use crate::model::post::{BlogPost, PostValidationError};
use once_cell::sync::Lazy;
use std::error::Error;
use std::fmt::{Display, Formatter};

static BUILTIN_CATALOG: Lazy<Catalog> = Lazy::new(|| {
    let posts = decode_posts(include_str!("../data/catalog.json"))
        .expect("bundled catalog.json must decode");
    Catalog { posts }
});

/// Catalog construction errors.
#[derive(Debug)]
pub enum CatalogError {
    InvalidPost {
        slug: String,
        source: PostValidationError,
    },
    DuplicateSlug(String),
}

impl Display for CatalogError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidPost { slug, source } => write!(f, "catalog post `{slug}`: {source}"),
            Self::DuplicateSlug(slug) => write!(f, "catalog slug `{slug}` is not unique"),
        }
    }
}

impl Error for CatalogError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidPost { source, .. } => Some(source),
            Self::DuplicateSlug(_) => None,
        }
    }
}

/// Ordered list of default posts shipped with the site.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    posts: Vec<BlogPost>,
}

impl Catalog {
    /// Builds a catalog from already-constructed posts.
    pub fn new(posts: Vec<BlogPost>) -> Result<Self, CatalogError> {
        for post in &posts {
            post.validate().map_err(|source| CatalogError::InvalidPost {
                slug: post.slug.clone(),
                source,
            })?;
        }
        if let Some(slug) = find_duplicate_slug(&posts) {
            return Err(CatalogError::DuplicateSlug(slug.to_string()));
        }
        Ok(Self { posts })
    }

    /// Catalog with no posts.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Posts bundled into this binary.
    pub fn builtin() -> &'static Catalog {
        &BUILTIN_CATALOG
    }

    pub fn posts(&self) -> &[BlogPost] {
        &self.posts
    }

    pub fn get(&self, slug: &str) -> Option<&BlogPost> {
        self.posts.iter().find(|post| post.slug == slug)
    }

    pub fn contains(&self, slug: &str) -> bool {
        self.get(slug).is_some()
    }

    pub fn len(&self) -> usize {
        self.posts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.posts.is_empty()
    }
}
