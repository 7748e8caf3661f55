//! Post editing session.
//!
//! # Responsibility
//! - Hold the working copy of a post while an admin edits it.
//! - Derive the slug from the title until the slug is edited by hand.
//!
//! # Invariants
//! - The manual-slug flag lives only as long as the session; it is never
//!   persisted.
//! - Editing an existing post starts with the flag set, so renaming its
//!   title never silently changes its identity.
//! - `finish` always yields a canonical slug.

use crate::model::post::{BlogPost, PostMetadata, PostValidationError, Slug};
use crate::slug::slugify;
use chrono::NaiveDate;

const DEFAULT_READ_TIME: &str = "5 min read";

/// Whether a session creates a new post or edits an existing one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditorMode {
    Create,
    Edit { original_slug: Slug },
}

/// Finished session output, ready for `ContentStore::submit`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmittedPost {
    pub post: BlogPost,
    pub mode: EditorMode,
}

/// Working copy of one post.
#[derive(Debug, Clone)]
pub struct PostEditor {
    draft: BlogPost,
    mode: EditorMode,
    slug_overridden: bool,
}

impl PostEditor {
    /// Starts a blank post dated `today`.
    pub fn new_post(today: NaiveDate) -> Self {
        let mut draft = BlogPost::new("", "", "", today);
        draft.metadata = PostMetadata {
            read_time: DEFAULT_READ_TIME.to_string(),
            ..PostMetadata::default()
        };
        Self {
            draft,
            mode: EditorMode::Create,
            slug_overridden: false,
        }
    }

    /// Starts editing a copy of `post`.
    pub fn edit(post: &BlogPost) -> Self {
        Self {
            draft: post.clone(),
            mode: EditorMode::Edit {
                original_slug: post.slug.clone(),
            },
            slug_overridden: true,
        }
    }

    pub fn draft(&self) -> &BlogPost {
        &self.draft
    }

    pub fn mode(&self) -> &EditorMode {
        &self.mode
    }

    pub fn is_creating(&self) -> bool {
        self.mode == EditorMode::Create
    }

    /// Whether the slug was edited by hand in this session.
    pub fn slug_overridden(&self) -> bool {
        self.slug_overridden
    }

    /// Sets the title and, unless overridden, re-derives the slug.
    pub fn set_title(&mut self, title: impl Into<String>) {
        self.draft.title = title.into();
        if !self.slug_overridden && !self.draft.title.is_empty() {
            self.draft.slug = slugify(&self.draft.title);
        }
    }

    /// Sets the slug by hand. Stops automatic derivation for this session.
    pub fn set_slug(&mut self, slug: impl Into<String>) {
        self.slug_overridden = true;
        self.draft.slug = slug.into();
    }

    pub fn set_excerpt(&mut self, excerpt: impl Into<String>) {
        self.draft.excerpt = excerpt.into();
    }

    pub fn set_content(&mut self, content: impl Into<String>) {
        self.draft.content = content.into();
    }

    pub fn set_published_at(&mut self, date: NaiveDate) {
        self.draft.published_at = date;
    }

    pub fn set_featured(&mut self, featured: bool) {
        self.draft.featured = featured;
    }

    pub fn metadata_mut(&mut self) -> &mut PostMetadata {
        &mut self.draft.metadata
    }

    /// Appends a trimmed tag. Blank and already-present tags are ignored.
    pub fn add_tag(&mut self, tag: &str) -> bool {
        let tag = tag.trim();
        if tag.is_empty() || self.draft.tags.iter().any(|existing| existing == tag) {
            return false;
        }
        self.draft.tags.push(tag.to_string());
        true
    }

    pub fn remove_tag(&mut self, tag: &str) -> bool {
        let before = self.draft.tags.len();
        self.draft.tags.retain(|existing| existing != tag);
        self.draft.tags.len() != before
    }

    /// Ends the session, cleaning the slug and checking required fields.
    pub fn finish(self) -> Result<SubmittedPost, PostValidationError> {
        let mut post = self.draft;
        post.slug = slugify(&post.slug);
        post.validate()?;
        Ok(SubmittedPost {
            post,
            mode: self.mode,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{EditorMode, PostEditor};
    use crate::model::post::{BlogPost, PostValidationError};
    use chrono::NaiveDate;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 2, 1).unwrap()
    }

    #[test]
    fn title_drives_slug_until_slug_is_edited() {
        let mut editor = PostEditor::new_post(today());
        editor.set_title("My First Post!");
        assert_eq!(editor.draft().slug, "my-first-post");

        editor.set_slug("launch");
        editor.set_title("Something Else Entirely");
        assert!(editor.slug_overridden());
        assert_eq!(editor.draft().slug, "launch");
    }

    #[test]
    fn clearing_title_keeps_last_derived_slug() {
        let mut editor = PostEditor::new_post(today());
        editor.set_title("Red Team Ops");
        editor.set_title("");
        assert_eq!(editor.draft().slug, "red-team-ops");
    }

    #[test]
    fn editing_existing_post_never_rederives_slug() {
        let post = BlogPost::new("kept-slug", "Old", "body", today());
        let mut editor = PostEditor::edit(&post);
        editor.set_title("New Title");
        assert_eq!(editor.draft().slug, "kept-slug");
        assert_eq!(
            *editor.mode(),
            EditorMode::Edit {
                original_slug: "kept-slug".to_string()
            }
        );
    }

    #[test]
    fn finish_cleans_manual_slug() {
        let mut editor = PostEditor::new_post(today());
        editor.set_title("Title");
        editor.set_slug("  --Weird___Title--  ");
        editor.set_content("body");
        let submitted = editor.finish().unwrap();
        assert_eq!(submitted.post.slug, "weird_title");
        assert_eq!(submitted.mode, EditorMode::Create);
        assert_eq!(submitted.post.metadata.read_time, "5 min read");
    }

    #[test]
    fn finish_requires_title_slug_and_content() {
        let mut editor = PostEditor::new_post(today());
        editor.set_title("Only a title");
        assert_eq!(
            editor.finish().unwrap_err(),
            PostValidationError::EmptyField("content")
        );

        let mut editor = PostEditor::new_post(today());
        editor.set_title("???");
        editor.set_content("body");
        assert_eq!(
            editor.finish().unwrap_err(),
            PostValidationError::EmptyField("slug")
        );
    }

    #[test]
    fn tags_are_trimmed_and_deduplicated() {
        let mut editor = PostEditor::new_post(today());
        assert!(editor.add_tag(" AI "));
        assert!(!editor.add_tag("AI"));
        assert!(!editor.add_tag("   "));
        assert!(editor.add_tag("Pentesting"));
        assert!(editor.remove_tag("AI"));
        assert!(!editor.remove_tag("AI"));
        assert_eq!(editor.draft().tags, vec!["Pentesting".to_string()]);
    }
}
