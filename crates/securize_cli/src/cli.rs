//! Command-line arguments for the `securize` admin tool.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Admin tool for the Securize blog content profile.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// Path to the site configuration file.
    #[arg(short, long, env = "SECURIZE_CONFIG", default_value = "securize.json")]
    pub config: PathBuf,

    /// Profile database, overriding `database_path` from the config.
    #[arg(long, env = "SECURIZE_DB")]
    pub db: Option<PathBuf>,

    /// Log directory, overriding `log_dir` from the config.
    #[arg(long)]
    pub log_dir: Option<PathBuf>,

    /// Log level, overriding `log_level` from the config.
    #[arg(long)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    #[command(flatten)]
    Profile(ProfileCommand),

    /// Print the slug derived from a title.
    Slug { title: String },

    /// Validate a pentest request (JSON file) and print the outgoing mail
    /// without delivering it.
    Contact { file: PathBuf },

    /// Write the effective configuration to the config path.
    InitConfig {
        /// Overwrite an existing file.
        #[arg(long)]
        force: bool,
    },
}

/// Commands that read or write the persisted profile.
#[derive(Subcommand, Debug)]
pub enum ProfileCommand {
    /// List posts, newest first.
    List {
        /// Only featured posts.
        #[arg(long)]
        featured: bool,

        /// Only posts in this category.
        #[arg(long)]
        category: Option<String>,
    },

    /// Print one post.
    Show {
        slug: String,

        /// Render the body as HTML instead of raw markdown.
        #[arg(long)]
        html: bool,
    },

    /// Create a new post.
    Create(PostArgs),

    /// Edit an existing post.
    Edit {
        /// Slug of the post to edit. `--slug` renames it.
        #[arg(value_name = "SLUG")]
        target: String,

        #[command(flatten)]
        post: PostArgs,
    },

    /// Delete a post.
    Delete { slug: String },

    /// Replace all persisted posts with a JSON export.
    Import { file: PathBuf },

    /// Write all posts as JSON.
    Export {
        /// Output file. Stdout when omitted.
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Drop persisted posts and return to the built-in catalog.
    Reset,
}

/// Post fields accepted by `create` and `edit`.
#[derive(Args, Debug, Default)]
pub struct PostArgs {
    #[arg(long)]
    pub title: Option<String>,

    /// Explicit slug. Derived from the title when omitted on create.
    #[arg(long)]
    pub slug: Option<String>,

    /// File holding the markdown body.
    #[arg(long)]
    pub content_file: Option<PathBuf>,

    #[arg(long)]
    pub excerpt: Option<String>,

    /// Publication date, `YYYY-MM-DD`. Today when omitted on create.
    #[arg(long)]
    pub date: Option<String>,

    #[arg(long)]
    pub author: Option<String>,

    #[arg(long)]
    pub author_role: Option<String>,

    #[arg(long)]
    pub category: Option<String>,

    #[arg(long)]
    pub read_time: Option<String>,

    #[arg(long)]
    pub image: Option<String>,

    /// Tag to add. Repeatable.
    #[arg(long = "tag")]
    pub tags: Vec<String>,

    /// Tag to remove. Repeatable.
    #[arg(long = "untag")]
    pub remove_tags: Vec<String>,

    #[arg(long)]
    pub featured: Option<bool>,
}
