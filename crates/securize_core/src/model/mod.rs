//! Domain model for publishable blog content.
//!
//! # Responsibility
//! - Define the canonical `BlogPost` record shared by catalog, persisted
//!   profile, import and export.
//!
//! # Invariants
//! - Every post is identified by its `slug`; slugs are unique within any
//!   collection the content store exposes.
//! - The serialized shape matches the site's `blogPosts` JSON array exactly.

pub mod post;
