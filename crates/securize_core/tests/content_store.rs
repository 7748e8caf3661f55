use chrono::NaiveDate;
use securize_core::{
    BlogPost, Catalog, ContentStore, ContentStoreError, DocumentEvents, KeyValueStore,
    MemoryKeyValueStore, PostEditor, StorageError, DEFAULT_STORAGE_KEY,
};
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn post(slug: &str, title: &str, published_at: NaiveDate) -> BlogPost {
    BlogPost::new(slug, title, format!("# {title}\n\nbody"), published_at)
}

fn catalog_ab() -> Catalog {
    Catalog::new(vec![
        post("a", "A", date(2025, 1, 1)),
        post("b", "B", date(2025, 1, 5)),
    ])
    .unwrap()
}

fn slugs(posts: &[BlogPost]) -> Vec<&str> {
    posts.iter().map(|p| p.slug.as_str()).collect()
}

#[test]
fn end_to_end_catalog_then_upsert() {
    let kv = MemoryKeyValueStore::new();
    let store = ContentStore::new(catalog_ab(), &kv);
    assert_eq!(slugs(&store.load()), vec!["b", "a"]);

    store.upsert(post("c", "C", date(2025, 1, 10))).unwrap();

    let fresh = ContentStore::new(catalog_ab(), &kv);
    assert_eq!(slugs(&fresh.load()), vec!["c", "b", "a"]);
}

#[test]
fn absent_empty_or_malformed_persisted_data_falls_back_to_catalog() {
    let expected = vec!["b", "a"];
    for raw in [None, Some("[]"), Some("{not json"), Some(r#"{"slug":"x"}"#), Some("[1,2]")] {
        let kv = MemoryKeyValueStore::new();
        if let Some(raw) = raw {
            kv.set(DEFAULT_STORAGE_KEY, raw).unwrap();
        }
        let store = ContentStore::new(catalog_ab(), &kv);
        assert_eq!(slugs(&store.load()), expected, "persisted={raw:?}");
        assert!(store.load_persisted().is_none());
    }
}

#[test]
fn unreadable_storage_falls_back_to_catalog() {
    let kv = MemoryKeyValueStore::new();
    kv.set_disabled(true);
    let store = ContentStore::new(catalog_ab(), &kv);
    assert_eq!(slugs(&store.load()), vec!["b", "a"]);
}

#[test]
fn load_is_union_of_ids_and_persisted_values_win() {
    let kv = MemoryKeyValueStore::new();
    let store = ContentStore::new(catalog_ab(), &kv);
    let mut edited_a = post("a", "A (edited)", date(2025, 1, 1));
    edited_a.featured = true;
    store
        .save(&[edited_a.clone(), post("z", "Z", date(2024, 12, 31))])
        .unwrap();

    let loaded = store.load();
    let ids: BTreeSet<_> = loaded.iter().map(|p| p.slug.clone()).collect();
    let expected: BTreeSet<_> = ["a", "b", "z"].iter().map(|s| s.to_string()).collect();
    assert_eq!(ids, expected);
    assert_eq!(store.find("a"), Some(edited_a));
    assert_eq!(slugs(&loaded), vec!["b", "a", "z"]);
}

#[test]
fn save_then_load_keeps_catalog_ids() {
    let kv = MemoryKeyValueStore::new();
    let store = ContentStore::new(catalog_ab(), &kv);
    store.save(&[post("only", "Only", date(2025, 3, 1))]).unwrap();

    assert_eq!(slugs(&store.load_persisted().unwrap()), vec!["only"]);
    assert_eq!(slugs(&store.load()), vec!["only", "b", "a"]);
}

#[test]
fn save_is_last_writer_wins_and_never_persists_duplicates() {
    let kv = MemoryKeyValueStore::new();
    let first_tab = ContentStore::new(catalog_ab(), &kv);
    let second_tab = ContentStore::new(catalog_ab(), &kv);

    first_tab.save(&[post("x", "X", date(2025, 2, 1))]).unwrap();
    second_tab.save(&[post("y", "Y", date(2025, 2, 2))]).unwrap();
    assert_eq!(slugs(&first_tab.load_persisted().unwrap()), vec!["y"]);

    let dup = [post("y", "Y", date(2025, 2, 2)), post("y", "Y2", date(2025, 2, 3))];
    assert!(matches!(
        first_tab.save(&dup),
        Err(ContentStoreError::SlugCollision(slug)) if slug == "y"
    ));
    assert_eq!(slugs(&first_tab.load_persisted().unwrap()), vec!["y"]);
}

#[test]
fn upsert_twice_is_idempotent() {
    let kv = MemoryKeyValueStore::new();
    let store = ContentStore::new(catalog_ab(), &kv);
    let item = post("c", "C", date(2025, 1, 10));

    let once = store.upsert(item.clone()).unwrap();
    let persisted_once = kv.get(DEFAULT_STORAGE_KEY).unwrap();
    let twice = store.upsert(item).unwrap();

    assert_eq!(once, twice);
    assert_eq!(kv.get(DEFAULT_STORAGE_KEY).unwrap(), persisted_once);
}

#[test]
fn upsert_replaces_catalog_post_in_place() {
    let kv = MemoryKeyValueStore::new();
    let store = ContentStore::new(catalog_ab(), &kv);
    store.upsert(post("b", "B rewritten", date(2025, 1, 5))).unwrap();

    let loaded = store.load();
    assert_eq!(loaded.len(), 2);
    assert_eq!(loaded[0].title, "B rewritten");
}

#[test]
fn create_rejects_existing_slug_but_edit_keeps_it() {
    let kv = MemoryKeyValueStore::new();
    let store = ContentStore::new(catalog_ab(), &kv);

    let err = store.create(post("a", "Another A", date(2025, 4, 1))).unwrap_err();
    assert!(matches!(err, ContentStoreError::SlugCollision(ref slug) if slug == "a"));
    assert!(kv.get(DEFAULT_STORAGE_KEY).unwrap().is_none());

    let updated = store.update("a", post("a", "A v2", date(2025, 1, 1))).unwrap();
    assert_eq!(updated.iter().find(|p| p.slug == "a").unwrap().title, "A v2");
}

#[test]
fn update_can_rename_but_not_onto_existing_slug() {
    let kv = MemoryKeyValueStore::new();
    let store = ContentStore::new(Catalog::empty(), &kv);
    store.create(post("draft", "Draft", date(2025, 1, 1))).unwrap();
    store.create(post("other", "Other", date(2025, 1, 2))).unwrap();

    assert!(matches!(
        store.update("draft", post("other", "Draft", date(2025, 1, 1))),
        Err(ContentStoreError::SlugCollision(_))
    ));
    store
        .update("draft", post("final", "Final", date(2025, 1, 1)))
        .unwrap();
    assert_eq!(slugs(&store.load()), vec!["other", "final"]);

    assert!(matches!(
        store.update("draft", post("draft", "Gone", date(2025, 1, 1))),
        Err(ContentStoreError::NotFound(_))
    ));
}

#[test]
fn remove_twice_is_a_noop_the_second_time() {
    let kv = MemoryKeyValueStore::new();
    let store = ContentStore::new(catalog_ab(), &kv);
    store.create(post("c", "C", date(2025, 1, 10))).unwrap();

    assert!(store.remove("c").unwrap());
    let persisted = kv.get(DEFAULT_STORAGE_KEY).unwrap();
    assert!(!store.remove("c").unwrap());
    assert_eq!(kv.get(DEFAULT_STORAGE_KEY).unwrap(), persisted);
    assert_eq!(slugs(&store.load()), vec!["b", "a"]);
}

#[test]
fn removing_catalog_post_drops_edits_but_post_resurfaces() {
    let kv = MemoryKeyValueStore::new();
    let store = ContentStore::new(catalog_ab(), &kv);
    store.upsert(post("a", "A edited", date(2025, 1, 1))).unwrap();

    assert!(store.remove("a").unwrap());
    assert_eq!(store.find("a").unwrap().title, "A");

    let persisted = kv.get(DEFAULT_STORAGE_KEY).unwrap();
    assert!(!store.remove("a").unwrap());
    assert_eq!(kv.get(DEFAULT_STORAGE_KEY).unwrap(), persisted);
    assert_eq!(slugs(&store.load()), vec!["b", "a"]);
}

#[test]
fn repeated_remove_of_catalog_post_writes_and_notifies_once() {
    let kv = MemoryKeyValueStore::new();
    let document = DocumentEvents::standalone();
    let catalog = Catalog::new(vec![post("a", "A", date(2025, 1, 1))]).unwrap();
    let store = ContentStore::new(catalog, &kv).with_events(Arc::clone(&document));
    let writes = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&writes);
    document.subscribe(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    assert!(store.remove("a").unwrap());
    assert_eq!(kv.get(DEFAULT_STORAGE_KEY).unwrap().as_deref(), Some("[]"));
    assert!(!store.remove("a").unwrap());
    assert!(!store.remove("a").unwrap());

    assert_eq!(writes.load(Ordering::SeqCst), 1);
    assert_eq!(slugs(&store.load()), vec!["a"]);
}

#[test]
fn storage_failure_is_surfaced_and_previous_state_kept() {
    let kv = MemoryKeyValueStore::with_quota(64);
    let store = ContentStore::new(Catalog::empty(), &kv);

    let mut huge = post("huge", "Huge", date(2025, 1, 1));
    huge.content = "x".repeat(256);
    let err = store.create(huge).unwrap_err();
    assert!(matches!(
        err,
        ContentStoreError::Storage(StorageError::QuotaExceeded { .. })
    ));
    assert!(store.load().is_empty());

    kv.set_disabled(true);
    assert!(matches!(
        store.save(&[]),
        Err(ContentStoreError::Storage(StorageError::Disabled))
    ));
}

#[test]
fn invalid_posts_are_rejected_before_writing() {
    let kv = MemoryKeyValueStore::new();
    let store = ContentStore::new(catalog_ab(), &kv);
    let bad = post("Bad Slug", "Bad", date(2025, 1, 1));

    assert!(matches!(
        store.upsert(bad),
        Err(ContentStoreError::Validation { .. })
    ));
    assert!(kv.get(DEFAULT_STORAGE_KEY).unwrap().is_none());
}

#[test]
fn editor_session_flows_into_create_and_update() {
    let kv = MemoryKeyValueStore::new();
    let store = ContentStore::new(catalog_ab(), &kv);

    let mut editor = PostEditor::new_post(date(2025, 6, 1));
    editor.set_title("My First Post!");
    editor.set_content("hello");
    editor.add_tag("AI");
    store.submit(editor.finish().unwrap()).unwrap();
    assert_eq!(store.load()[0].slug, "my-first-post");

    let existing = store.find("my-first-post").unwrap();
    let mut editor = PostEditor::edit(&existing);
    editor.set_title("Renamed Title");
    store.submit(editor.finish().unwrap()).unwrap();
    assert_eq!(store.find("my-first-post").unwrap().title, "Renamed Title");

    let mut editor = PostEditor::new_post(date(2025, 6, 2));
    editor.set_title("A");
    editor.set_content("clash");
    assert!(matches!(
        store.submit(editor.finish().unwrap()),
        Err(ContentStoreError::SlugCollision(_))
    ));
}

#[test]
fn queries_read_the_merged_view() {
    let kv = MemoryKeyValueStore::new();
    let store = ContentStore::new(Catalog::builtin().clone(), &kv);

    assert_eq!(store.featured().len(), 1);
    assert_eq!(store.by_category("devops").len(), 1);
    assert_eq!(
        store.find("vulnerability-discovery-ai").unwrap().metadata.author_role,
        "Head of AI"
    );
    assert!(store.find("missing").is_none());
}

#[test]
fn custom_key_isolates_collections() {
    let kv = MemoryKeyValueStore::new();
    let posts = ContentStore::new(Catalog::empty(), &kv).with_key("draftPosts");
    posts.create(post("d", "D", date(2025, 1, 1))).unwrap();

    assert!(kv.get(DEFAULT_STORAGE_KEY).unwrap().is_none());
    assert!(kv.get("draftPosts").unwrap().is_some());
    assert!(ContentStore::new(Catalog::empty(), &kv).load().is_empty());
}
