//! Content use-case services.
//!
//! # Responsibility
//! - Orchestrate catalog, codec and key-value storage into the content
//!   store operations used by views and the admin panel.
//! - Own the post editing session rules.

pub mod content_store;
pub mod post_editor;
