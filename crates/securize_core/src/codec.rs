//! Validating JSON codec for post collections.
//!
//! # Responsibility
//! - Decode persisted slots and import files into `Vec<BlogPost>`.
//! - Encode collections for the persisted slot and for export downloads.
//!
//! # Invariants
//! - Decoding either yields a fully valid collection or an error; partially
//!   valid collections are never returned.
//! - A decoded collection never contains two posts with the same slug.

use crate::model::post::{BlogPost, PostValidationError};
use serde_json::Value;
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Reason a payload could not be decoded into a post collection.
#[derive(Debug)]
pub enum DecodeError {
    /// Payload is not JSON at all.
    Json(serde_json::Error),
    /// Top-level JSON value is not an array.
    NotAnArray { found: &'static str },
    /// One element does not have the post shape.
    InvalidItem {
        index: usize,
        source: serde_json::Error,
    },
    /// One element has the post shape but breaks a record invariant.
    InvalidPost {
        index: usize,
        source: PostValidationError,
    },
    /// Two elements share the same slug.
    DuplicateSlug(String),
}

impl Display for DecodeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Json(err) => write!(f, "payload is not valid JSON: {err}"),
            Self::NotAnArray { found } => {
                write!(f, "expected a JSON array of posts, found {found}")
            }
            Self::InvalidItem { index, source } => {
                write!(f, "item {index} is not a well-formed post: {source}")
            }
            Self::InvalidPost { index, source } => write!(f, "item {index} is invalid: {source}"),
            Self::DuplicateSlug(slug) => write!(f, "slug `{slug}` appears more than once"),
        }
    }
}

impl Error for DecodeError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Json(err) => Some(err),
            Self::InvalidItem { source, .. } => Some(source),
            Self::InvalidPost { source, .. } => Some(source),
            Self::NotAnArray { .. } | Self::DuplicateSlug(_) => None,
        }
    }
}

/// Decodes a JSON document whose top level must be an array of posts.
pub fn decode_posts(payload: &str) -> Result<Vec<BlogPost>, DecodeError> {
    let value: Value = serde_json::from_str(payload).map_err(DecodeError::Json)?;
    let items = match value {
        Value::Array(items) => items,
        other => {
            return Err(DecodeError::NotAnArray {
                found: json_kind(&other),
            })
        }
    };

    let mut posts = Vec::with_capacity(items.len());
    for (index, item) in items.into_iter().enumerate() {
        let post: BlogPost = serde_json::from_value(item)
            .map_err(|source| DecodeError::InvalidItem { index, source })?;
        post.validate()
            .map_err(|source| DecodeError::InvalidPost { index, source })?;
        posts.push(post);
    }

    if let Some(slug) = find_duplicate_slug(&posts) {
        return Err(DecodeError::DuplicateSlug(slug.to_string()));
    }
    Ok(posts)
}

/// Compact encoding used for the persisted slot.
pub fn encode_posts(posts: &[BlogPost]) -> serde_json::Result<String> {
    serde_json::to_string(posts)
}

/// Human-readable encoding used for export files.
pub fn encode_posts_pretty(posts: &[BlogPost]) -> serde_json::Result<String> {
    serde_json::to_string_pretty(posts)
}

/// Returns the first slug that occurs a second time, if any.
pub fn find_duplicate_slug(posts: &[BlogPost]) -> Option<&str> {
    let mut seen = BTreeSet::new();
    posts
        .iter()
        .map(|post| post.slug.as_str())
        .find(|slug| !seen.insert(*slug))
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::{decode_posts, encode_posts_pretty, DecodeError};

    const TWO_POSTS: &str = r#"[
        {"slug":"first","title":"First","content":"a","date":"2025-01-01","tags":["AI"]},
        {"slug":"second","title":"Second","content":"b","date":"2025-01-05","featured":true}
    ]"#;

    #[test]
    fn decodes_array_of_posts_in_order() {
        let posts = decode_posts(TWO_POSTS).unwrap();
        assert_eq!(posts.len(), 2);
        assert_eq!(posts[0].slug, "first");
        assert!(posts[1].featured);
    }

    #[test]
    fn empty_array_is_a_valid_collection() {
        assert!(decode_posts("[]").unwrap().is_empty());
    }

    #[test]
    fn rejects_non_array_top_level() {
        for (payload, kind) in [(r#"{"slug":"a"}"#, "object"), (r#""posts""#, "string")] {
            match decode_posts(payload) {
                Err(DecodeError::NotAnArray { found }) => assert_eq!(found, kind),
                other => panic!("unexpected decode result: {other:?}"),
            }
        }
    }

    #[test]
    fn rejects_garbage() {
        assert!(matches!(decode_posts("not json"), Err(DecodeError::Json(_))));
    }

    #[test]
    fn reports_index_of_malformed_item() {
        let payload = r#"[
            {"slug":"ok","title":"Ok","content":"a","date":"2025-01-01"},
            {"slug":"bad","title":"Bad","content":"b","date":"yesterday"}
        ]"#;
        match decode_posts(payload) {
            Err(DecodeError::InvalidItem { index, .. }) => assert_eq!(index, 1),
            other => panic!("unexpected decode result: {other:?}"),
        }
    }

    #[test]
    fn reports_invalid_post_fields() {
        let payload = r#"[{"slug":"Not A Slug","title":"T","content":"c","date":"2025-01-01"}]"#;
        assert!(matches!(
            decode_posts(payload),
            Err(DecodeError::InvalidPost { index: 0, .. })
        ));
    }

    #[test]
    fn rejects_duplicate_slugs() {
        let payload = r#"[
            {"slug":"same","title":"One","content":"a","date":"2025-01-01"},
            {"slug":"same","title":"Two","content":"b","date":"2025-01-02"}
        ]"#;
        match decode_posts(payload) {
            Err(DecodeError::DuplicateSlug(slug)) => assert_eq!(slug, "same"),
            other => panic!("unexpected decode result: {other:?}"),
        }
    }

    #[test]
    fn pretty_export_decodes_to_same_collection() {
        let posts = decode_posts(TWO_POSTS).unwrap();
        let exported = encode_posts_pretty(&posts).unwrap();
        assert!(exported.contains("\n  {"));
        assert_eq!(decode_posts(&exported).unwrap(), posts);
    }
}
