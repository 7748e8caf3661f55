//! `securize` admin entry point.
//!
//! # Responsibility
//! - Resolve configuration from file, environment and flags.
//! - Open the SQLite profile and run one content command against it.

mod cli;

use anyhow::{bail, Context, Result};
use chrono::{Local, NaiveDate};
use clap::Parser;
use cli::{CliArgs, Command, PostArgs, ProfileCommand};
use log::info;
use securize_core::db::open_db;
use securize_core::{
    init_logging, parse_blocks, slugify, to_html, CancelToken, Catalog, ContactService,
    ContentStore, DocumentEvents, KeyValueStore, OutboxRelay, PentestRequest, PostEditor,
    SiteConfig, SqliteKeyValueStore,
};
use std::path::Path;

fn main() -> Result<()> {
    let args = CliArgs::parse();
    let mut config = SiteConfig::load(&args.config)
        .with_context(|| format!("loading {}", args.config.display()))?;
    if let Some(db) = &args.db {
        config.database_path = db.clone();
    }
    if let Some(dir) = &args.log_dir {
        config.log_dir = Some(dir.clone());
    }
    if let Some(level) = &args.log_level {
        config.log_level = level.clone();
    }
    config.validate()?;

    if let Some(dir) = &config.log_dir {
        let dir = std::path::absolute(dir).context("resolving log directory")?;
        init_logging(&config.log_level, dir)?;
    }
    info!(
        "event=cli_start module=cli status=ok version={}",
        securize_core::core_version()
    );

    match args.command {
        Command::Slug { title } => {
            println!("{}", slugify(&title));
            Ok(())
        }
        Command::Contact { file } => dry_run_contact(&config, &file),
        Command::InitConfig { force } => {
            if args.config.exists() && !force {
                bail!("{} already exists; pass --force", args.config.display());
            }
            config.save(&args.config)?;
            println!("wrote {}", args.config.display());
            Ok(())
        }
        Command::Profile(command) => {
            let conn = open_db(&config.database_path)
                .with_context(|| format!("opening {}", config.database_path.display()))?;
            let store = ContentStore::new(
                Catalog::builtin().clone(),
                SqliteKeyValueStore::new(&conn),
            )
            .with_key(config.storage_key.clone())
            .with_events(DocumentEvents::standalone());
            run_content_command(&store, command)
        }
    }
}

fn run_content_command<S: KeyValueStore>(
    store: &ContentStore<S>,
    command: ProfileCommand,
) -> Result<()> {
    match command {
        ProfileCommand::List { featured, category } => {
            let posts = match (featured, category) {
                (true, _) => store.featured(),
                (false, Some(category)) => store.by_category(&category),
                (false, None) => store.load(),
            };
            for post in &posts {
                println!(
                    "{}  {:<40}  {}{}",
                    post.published_at,
                    post.slug,
                    post.title,
                    if post.featured { "  [featured]" } else { "" }
                );
            }
            println!("total: {}", posts.len());
        }
        ProfileCommand::Show { slug, html } => {
            let post = store
                .find(&slug)
                .with_context(|| format!("no post with slug `{slug}`"))?;
            println!(
                "{}\n{} · {} · {}",
                post.title, post.metadata.author, post.metadata.read_time, post.published_at
            );
            if !post.tags.is_empty() {
                println!("tags: {}", post.tags.join(", "));
            }
            println!();
            if html {
                print!("{}", to_html(&parse_blocks(&post.content)));
            } else {
                println!("{}", post.content);
            }
        }
        ProfileCommand::Create(fields) => {
            let mut editor = PostEditor::new_post(Local::now().date_naive());
            apply_fields(&mut editor, fields)?;
            let submitted = editor.finish()?;
            let slug = submitted.post.slug.clone();
            store.submit(submitted)?;
            println!("created {slug}");
        }
        ProfileCommand::Edit { target, post } => {
            let existing = store
                .find(&target)
                .with_context(|| format!("no post with slug `{target}`"))?;
            let mut editor = PostEditor::edit(&existing);
            apply_fields(&mut editor, post)?;
            let submitted = editor.finish()?;
            let new_slug = submitted.post.slug.clone();
            store.submit(submitted)?;
            println!("updated {new_slug}");
        }
        ProfileCommand::Delete { slug } => {
            if store.remove(&slug)? {
                if store.catalog().contains(&slug) {
                    println!("removed edits to built-in post {slug}");
                } else {
                    println!("deleted {slug}");
                }
            } else {
                println!("nothing to delete for {slug}");
            }
        }
        ProfileCommand::Import { file } => {
            let payload = std::fs::read_to_string(&file)
                .with_context(|| format!("reading {}", file.display()))?;
            let count = store.import_all(&payload)?;
            println!("imported {count} posts");
        }
        ProfileCommand::Export { out } => {
            let exported = store.export_all()?;
            match out {
                Some(path) => {
                    std::fs::write(&path, exported)
                        .with_context(|| format!("writing {}", path.display()))?;
                    println!("exported to {}", path.display());
                }
                None => println!("{exported}"),
            }
        }
        ProfileCommand::Reset => {
            store.reset()?;
            println!("persisted posts cleared");
        }
    }
    Ok(())
}

fn apply_fields(editor: &mut PostEditor, fields: PostArgs) -> Result<()> {
    if let Some(title) = fields.title {
        editor.set_title(title);
    }
    if let Some(slug) = fields.slug {
        editor.set_slug(slug);
    }
    if let Some(path) = fields.content_file {
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("reading {}", path.display()))?;
        editor.set_content(content);
    }
    if let Some(excerpt) = fields.excerpt {
        editor.set_excerpt(excerpt);
    }
    if let Some(date) = fields.date {
        let date = NaiveDate::parse_from_str(&date, "%Y-%m-%d")
            .with_context(|| format!("invalid date `{date}`, expected YYYY-MM-DD"))?;
        editor.set_published_at(date);
    }
    if let Some(featured) = fields.featured {
        editor.set_featured(featured);
    }

    let metadata = editor.metadata_mut();
    if let Some(author) = fields.author {
        metadata.author = author;
    }
    if let Some(role) = fields.author_role {
        metadata.author_role = role;
    }
    if let Some(category) = fields.category {
        metadata.category = category;
    }
    if let Some(read_time) = fields.read_time {
        metadata.read_time = read_time;
    }
    if let Some(image) = fields.image {
        metadata.image = (!image.trim().is_empty()).then_some(image);
    }

    for tag in &fields.tags {
        editor.add_tag(tag);
    }
    for tag in &fields.remove_tags {
        editor.remove_tag(tag);
    }
    Ok(())
}

fn dry_run_contact(config: &SiteConfig, file: &Path) -> Result<()> {
    let payload =
        std::fs::read_to_string(file).with_context(|| format!("reading {}", file.display()))?;
    let request: PentestRequest =
        serde_json::from_str(&payload).context("pentest request must be a JSON object")?;

    let service = ContactService::new(OutboxRelay::new(), config.contact.clone());
    let receipt = service.submit(&request, &CancelToken::new())?;
    for (id, mail) in service.relay().sent() {
        println!("message-id: {id}");
        println!("to: {}", mail.to);
        if let Some(reply_to) = &mail.reply_to {
            println!("reply-to: {reply_to}");
        }
        println!("subject: {}\n\n{}", mail.subject, mail.html_body);
    }
    info!(
        "event=contact_dry_run module=cli status=ok notification={} confirmation={}",
        receipt.notification_id, receipt.confirmation_id
    );
    Ok(())
}
