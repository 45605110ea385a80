//! # CLI Layer
//!
//! This module is **one possible UI client** for scriptura. It is the only
//! place that knows about terminal I/O, exit codes and argument parsing.
//!
//! ## Structure
//!
//! - `run()`: builds the context and dispatches (called by `main.rs`)
//! - `run_with()`: the same dispatch for whichever user backend is configured
//! - `handle_*()`: per-command handlers that call [`ScripturaApi`] and render
//!
//! Every handler drives the async facade through one current-thread tokio
//! runtime owned by the context.

use super::args::{BookmarkAction, Cli, Commands, PrefsAction};
use super::render::{self, print_message, Level};
use chrono::{Local, NaiveDate, NaiveTime};
use clap::Parser;
use directories::ProjectDirs;
use scriptura::api::ScripturaApi;
use scriptura::catalog::DEFAULT_TRANSLATION;
use scriptura::config::{AppConfig, CONFIG_KEYS};
use scriptura::content::cache::MemoryCache;
use scriptura::content::resolver::Connectivity;
use scriptura::content::transport::HttpTransport;
use scriptura::error::{Result, ScripturaError};
use scriptura::model::PreferencesPatch;
use scriptura::preferences::mapping::remote_dropped_fields;
use scriptura::preferences::theme::ThemeController;
use scriptura::store::fs::FsKv;
use scriptura::user::backend::UserBackend;
use scriptura::user::memory::MemoryBackend;
use scriptura::user::rest::RestBackend;
use scriptura::user::session::{AuthUser, Session};
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use tokio::runtime::Runtime;

struct AppContext<B: UserBackend> {
    api: ScripturaApi<HttpTransport, FsKv, B>,
    runtime: Runtime,
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    super::init_tracing(cli.verbose);

    let data_dir = resolve_data_dir(cli.data_dir.clone())?;
    let mut config = AppConfig::load(&data_dir)?;

    // Config edits never need the network or the stores.
    if let Some(Commands::Config { key, value }) = &cli.command {
        return handle_config(&data_dir, config, key.as_deref(), value.clone());
    }

    if let Some(url) = &cli.api_url {
        config.api_base_url = url.trim_end_matches('/').to_string();
    }

    let session = match &cli.user {
        Some(id) => {
            let mut user = AuthUser::new(id.clone());
            if let Some(token) = &cli.token {
                user = user.with_token(token.clone());
            }
            Session::signed_in(user)
        }
        None => Session::anonymous(),
    };

    match config.backend.clone() {
        Some(backend) => {
            let backend = RestBackend::new(
                &backend.url,
                &backend.api_key,
                session.clone(),
                config.request_timeout(),
            )?;
            run_with(cli, &config, &data_dir, backend, session)
        }
        None if session.is_authenticated() => Err(ScripturaError::Config(
            "--user needs a backend; set backend-url with `scriptura config`".to_string(),
        )),
        None => run_with(cli, &config, &data_dir, MemoryBackend::new(), session),
    }
}

fn resolve_data_dir(flag: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(dir) = flag {
        return Ok(dir);
    }
    ProjectDirs::from("com", "scriptura", "scriptura")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .ok_or_else(|| ScripturaError::Config("Could not determine data dir".to_string()))
}

fn run_with<B: UserBackend>(
    cli: Cli,
    config: &AppConfig,
    data_dir: &Path,
    backend: B,
    session: Session,
) -> Result<()> {
    let transport = HttpTransport::new(&config.api_base_url, config.request_timeout())?;
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    let mut api = ScripturaApi::new(
        transport,
        Box::new(MemoryCache::new()),
        FsKv::new(data_dir),
        backend,
        session,
        Rc::new(ThemeController::default()),
        &config.default_translation,
    );
    if cli.offline {
        api.set_connectivity(Connectivity::Offline);
    }

    let mut ctx = AppContext { api, runtime };
    apply_translation(&mut ctx, cli.translation.as_deref())?;

    match cli.command {
        Some(Commands::Read { book, chapter }) => handle_read(&mut ctx, &book, chapter),
        Some(Commands::Verse {
            book,
            chapter,
            verse,
        }) => handle_verse(&mut ctx, &book, chapter, verse),
        Some(Commands::Search { terms }) => handle_search(&mut ctx, &terms.join(" ")),
        Some(Commands::Daily { date }) => handle_daily(&mut ctx, date),
        Some(Commands::Books) => {
            print!("{}", render::books());
            Ok(())
        }
        Some(Commands::Translations) => {
            print!("{}", render::translations(ctx.api.current_translation()));
            Ok(())
        }
        Some(Commands::Bookmark { action }) => handle_bookmark(&mut ctx, action),
        Some(Commands::History { recent }) => handle_history(&mut ctx, recent),
        Some(Commands::Prefs { action }) => handle_prefs(&mut ctx, action),
        Some(Commands::Saved) => handle_saved(&ctx),
        Some(Commands::Export { output }) => handle_export(&ctx, output),
        Some(Commands::Import { file }) => handle_import(&ctx, &file),
        Some(Commands::Reset { yes }) => handle_reset(&mut ctx, yes),
        Some(Commands::Migrate { decline }) => handle_migrate(&mut ctx, decline),
        Some(Commands::Config { .. }) => Ok(()),
        None => handle_daily(&mut ctx, None),
    }
}

/// Flag first, then the reader's preferred translation, then the configured default.
fn apply_translation<B: UserBackend>(ctx: &mut AppContext<B>, flag: Option<&str>) -> Result<()> {
    if let Some(id) = flag {
        return ctx.api.set_translation(id);
    }
    match ctx.runtime.block_on(ctx.api.preferences()) {
        Ok((prefs, _)) if prefs.preferred_translation != DEFAULT_TRANSLATION => {
            if let Err(err) = ctx.api.set_translation(&prefs.preferred_translation) {
                tracing::warn!(error = %err, "Ignoring preferred translation");
            }
        }
        Ok(_) => {}
        Err(err) => tracing::warn!(error = %err, "Could not load preferences"),
    }
    Ok(())
}

fn handle_read<B: UserBackend>(ctx: &mut AppContext<B>, book: &str, chapter: u32) -> Result<()> {
    let (book, load) = ctx.runtime.block_on(ctx.api.read_chapter(book, chapter))?;
    print!("{}", render::chapter(&book, chapter, &load));
    Ok(())
}

fn handle_verse<B: UserBackend>(
    ctx: &mut AppContext<B>,
    book: &str,
    chapter: u32,
    verse: u32,
) -> Result<()> {
    let found = ctx.runtime.block_on(ctx.api.verse(book, chapter, verse))?;
    print!("{}", render::verse(&found));
    Ok(())
}

fn handle_search<B: UserBackend>(ctx: &mut AppContext<B>, query: &str) -> Result<()> {
    let results = ctx.runtime.block_on(ctx.api.search(query));
    print!("{}", render::search(query, &results));
    Ok(())
}

fn handle_daily<B: UserBackend>(ctx: &mut AppContext<B>, date: Option<NaiveDate>) -> Result<()> {
    let date = date.unwrap_or_else(|| Local::now().date_naive());
    let verse = ctx.runtime.block_on(ctx.api.daily_verse(date));
    print_message(Level::Info, &format!("Verse of the day, {}", date));
    print!("{}", render::verse(&verse));
    Ok(())
}

fn handle_bookmark<B: UserBackend>(
    ctx: &mut AppContext<B>,
    action: Option<BookmarkAction>,
) -> Result<()> {
    let rt = &ctx.runtime;
    let api = &mut ctx.api;
    match action.unwrap_or(BookmarkAction::List { favorites: false }) {
        BookmarkAction::List { favorites } => {
            let entries = if favorites {
                rt.block_on(api.favorites())?
            } else {
                rt.block_on(api.bookmarks())?
            };
            print!("{}", render::bookmarks(&entries));
        }
        BookmarkAction::Add {
            book,
            chapter,
            verse,
            note,
        } => {
            let entry = rt.block_on(api.add_bookmark(&book, chapter, verse, note))?;
            print_message(Level::Success, &format!("Bookmarked {}", entry.reference()));
        }
        BookmarkAction::Rm { selector } => {
            let entry = rt.block_on(api.remove_bookmark(&selector))?;
            print_message(Level::Success, &format!("Removed {}", entry.reference()));
        }
        BookmarkAction::Fav { selector } => {
            let entry = rt.block_on(api.toggle_favorite(&selector))?;
            let text = if entry.is_favorite {
                format!("{} is now a favorite", entry.reference())
            } else {
                format!("{} is no longer a favorite", entry.reference())
            };
            print_message(Level::Success, &text);
        }
        BookmarkAction::Note { selector, note } => {
            let entry = rt.block_on(api.set_bookmark_note(&selector, &note))?;
            print_message(Level::Success, &format!("Note saved on {}", entry.reference()));
        }
    }
    Ok(())
}

fn handle_history<B: UserBackend>(ctx: &mut AppContext<B>, recent: bool) -> Result<()> {
    let items = if recent {
        ctx.runtime.block_on(ctx.api.recent_books())?
    } else {
        ctx.runtime.block_on(ctx.api.reading_history())?
    };
    print!("{}", render::history(&items));
    Ok(())
}

fn handle_prefs<B: UserBackend>(
    ctx: &mut AppContext<B>,
    action: Option<PrefsAction>,
) -> Result<()> {
    if let Some(PrefsAction::Set { key, value }) = action {
        let patch = parse_preference(&key, &value)?;
        ctx.runtime.block_on(ctx.api.update_preferences(&patch))?;
        let signed_in = ctx.api.session().is_authenticated();
        let (level, message) = set_outcome(&key, &value, &patch, signed_in);
        print_message(level, &message);
    }
    let (prefs, source) = ctx.runtime.block_on(ctx.api.preferences())?;
    print!("{}", render::preferences(&prefs, source));
    Ok(())
}

/// Signed-in accounts have no column for some device-only settings, so a
/// change to one of those is reported as not saved.
fn set_outcome(
    key: &str,
    value: &str,
    patch: &PreferencesPatch,
    signed_in: bool,
) -> (Level, String) {
    if signed_in && !remote_dropped_fields(patch).is_empty() {
        let message = format!("{} is not stored for signed-in accounts, nothing saved", key);
        (Level::Warning, message)
    } else {
        (Level::Success, format!("Set {} = {}", key, value))
    }
}

fn parse_preference(key: &str, value: &str) -> Result<PreferencesPatch> {
    let invalid = |e: String| ScripturaError::Api(e);
    let mut patch = PreferencesPatch::default();
    match key {
        "theme" => patch.theme = Some(value.parse().map_err(invalid)?),
        "font-size" => patch.font_size = Some(value.parse().map_err(invalid)?),
        "font-family" => patch.font_family = Some(value.parse().map_err(invalid)?),
        "auto-scroll" => patch.auto_scroll = Some(parse_flag(value)?),
        "daily-reminders" => patch.daily_reminders = Some(parse_flag(value)?),
        "reminder-time" => {
            NaiveTime::parse_from_str(value, "%H:%M").map_err(|_| {
                ScripturaError::Api(format!("reminder-time must be HH:MM: {}", value))
            })?;
            patch.reminder_time = Some(value.to_string());
        }
        "translation" => patch.preferred_translation = Some(value.to_lowercase()),
        other => {
            return Err(ScripturaError::Api(format!("Unknown preference: {}", other)));
        }
    }
    Ok(patch)
}

fn parse_flag(value: &str) -> Result<bool> {
    match value.to_lowercase().as_str() {
        "true" | "on" | "yes" | "1" => Ok(true),
        "false" | "off" | "no" | "0" => Ok(false),
        _ => Err(ScripturaError::Api(format!("Expected on or off: {}", value))),
    }
}

fn handle_saved<B: UserBackend>(ctx: &AppContext<B>) -> Result<()> {
    let keys = ctx.api.offline_chapters()?;
    if keys.is_empty() {
        println!("No chapters saved for offline reading.");
    }
    for key in keys {
        println!("{}", key);
    }
    Ok(())
}

fn handle_export<B: UserBackend>(ctx: &AppContext<B>, output: Option<PathBuf>) -> Result<()> {
    let json = ctx.api.export_json()?;
    match output {
        Some(path) => {
            fs::write(&path, json)?;
            print_message(Level::Success, &format!("Exported to {}", path.display()));
        }
        None => println!("{}", json),
    }
    Ok(())
}

fn handle_import<B: UserBackend>(ctx: &AppContext<B>, file: &Path) -> Result<()> {
    let json = fs::read_to_string(file)?;
    let summary = ctx.api.import_json(&json)?;
    print_message(Level::Success, &render::import_summary(&summary));
    Ok(())
}

fn handle_reset<B: UserBackend>(ctx: &mut AppContext<B>, yes: bool) -> Result<()> {
    if !yes {
        print_message(
            Level::Warning,
            "This deletes every bookmark, preference, history entry and saved chapter \
             on this device. Re-run with --yes to confirm.",
        );
        return Ok(());
    }
    ctx.api.reset()?;
    print_message(Level::Success, "Local data cleared.");
    Ok(())
}

fn handle_migrate<B: UserBackend>(ctx: &mut AppContext<B>, decline: bool) -> Result<()> {
    if !ctx.api.session().is_authenticated() {
        return Err(ScripturaError::Api(
            "Sign in with --user to move local data into an account".to_string(),
        ));
    }
    if decline {
        ctx.api.decline_migration();
        print_message(Level::Info, "Keeping local data on this device.");
        return Ok(());
    }
    if !ctx.api.detect_migration()? {
        print_message(Level::Info, "No local data to migrate.");
        return Ok(());
    }
    let report = ctx.runtime.block_on(ctx.api.migrate())?;
    print_message(Level::Success, &render::migration_report(&report));
    Ok(())
}

fn handle_config(
    data_dir: &Path,
    mut config: AppConfig,
    key: Option<&str>,
    value: Option<String>,
) -> Result<()> {
    match (key, value) {
        (None, _) => {
            for key in CONFIG_KEYS {
                println!("{} = {}", key, shown(key, &config));
            }
        }
        (Some(key), None) => {
            if config.get(key).is_none() {
                return Err(ScripturaError::Config(format!("Unknown config key: {}", key)));
            }
            println!("{} = {}", key, shown(key, &config));
        }
        (Some(key), Some(value)) => {
            config.set(key, &value).map_err(ScripturaError::Config)?;
            config.save(data_dir)?;
            print_message(Level::Success, &format!("Set {} = {}", key, shown(key, &config)));
        }
    }
    Ok(())
}

fn shown(key: &str, config: &AppConfig) -> String {
    let value = config.get(key).unwrap_or_default();
    if key == "backend-key" && !value.is_empty() {
        "********".to_string()
    } else {
        value
    }
}
