use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "scriptura")]
#[command(about = "Offline-aware scripture reader", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Directory holding local data and config.json
    #[arg(long, global = true, env = "SCRIPTURA_HOME")]
    pub data_dir: Option<PathBuf>,

    /// Verse provider base URL (overrides config)
    #[arg(long, global = true, env = "SCRIPTURA_API_URL")]
    pub api_url: Option<String>,

    /// Translation for this invocation (kjv, esv, niv, nasb, nlt)
    #[arg(short, long, global = true)]
    pub translation: Option<String>,

    /// Act as this signed-in user (requires a configured backend)
    #[arg(long, global = true, env = "SCRIPTURA_USER")]
    pub user: Option<String>,

    /// Access token for the signed-in user
    #[arg(long, global = true, env = "SCRIPTURA_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Treat the device as offline: saved chapters are served without asking the network
    #[arg(long, global = true)]
    pub offline: bool,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Read a chapter
    #[command(alias = "r")]
    Read { book: String, chapter: u32 },

    /// Show a single verse
    #[command(alias = "v")]
    Verse {
        book: String,
        chapter: u32,
        verse: u32,
    },

    /// Search verse text
    #[command(alias = "s")]
    Search {
        #[arg(required = true, num_args = 1..)]
        terms: Vec<String>,
    },

    /// Verse of the day
    Daily {
        /// Date to pick for (YYYY-MM-DD), defaults to today
        #[arg(long)]
        date: Option<NaiveDate>,
    },

    /// List the books of the canon
    Books,

    /// List available translations
    Translations,

    /// Manage bookmarks (lists them when no action is given)
    #[command(alias = "bm")]
    Bookmark {
        #[command(subcommand)]
        action: Option<BookmarkAction>,
    },

    /// Show reading history
    History {
        /// Only the most recent distinct chapters
        #[arg(long)]
        recent: bool,
    },

    /// Show or change preferences
    Prefs {
        #[command(subcommand)]
        action: Option<PrefsAction>,
    },

    /// List chapters saved for offline reading
    Saved,

    /// Export local data as JSON
    Export {
        /// Write to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Import a previously exported JSON document
    Import { file: PathBuf },

    /// Delete all local data
    Reset {
        /// Skip the confirmation guard
        #[arg(long)]
        yes: bool,
    },

    /// Move local data into the signed-in account
    Migrate {
        /// Keep local data on this device instead
        #[arg(long)]
        decline: bool,
    },

    /// Get or set configuration
    Config {
        /// Configuration key (e.g., api-url)
        key: Option<String>,

        /// Value to set (if omitted, prints current value)
        value: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
pub enum BookmarkAction {
    /// Bookmark a verse
    Add {
        book: String,
        chapter: u32,
        verse: u32,

        #[arg(short, long)]
        note: Option<String>,
    },

    /// List bookmarks
    #[command(alias = "ls")]
    List {
        /// Only favorites
        #[arg(long)]
        favorites: bool,
    },

    /// Remove a bookmark by list position or id
    #[command(alias = "remove")]
    Rm { selector: String },

    /// Toggle favorite on a bookmark
    Fav { selector: String },

    /// Set the note on a bookmark
    Note { selector: String, note: String },
}

#[derive(Subcommand, Debug)]
pub enum PrefsAction {
    /// Show the effective preferences and where they come from
    Show,

    /// Set one preference (theme, font-size, font-family, auto-scroll,
    /// daily-reminders, reminder-time, translation)
    Set { key: String, value: String },
}
