use colored::*;
use scriptura::api::{BookmarkEntry, HistoryItem};
use scriptura::catalog;
use scriptura::content::resolver::{ChapterLoad, SearchResults};
use scriptura::model::{Book, Testament, UserPreferences, Verse};
use scriptura::preferences::resolver::PreferenceSource;
use scriptura::store::transfer::ImportSummary;
use scriptura::sync::migration::MigrationReport;
use std::fmt::Write;

#[derive(Debug, Clone, Copy)]
pub enum Level {
    Info,
    Success,
    Warning,
}

pub fn print_message(level: Level, content: &str) {
    match level {
        Level::Info => println!("{}", content.dimmed()),
        Level::Success => println!("{}", content.green()),
        Level::Warning => println!("{}", content.yellow()),
    }
}

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M";

fn verse_lines(out: &mut String, verses: &[Verse]) {
    for v in verses {
        let _ = writeln!(out, "{:>4}  {}", v.verse.to_string().yellow(), v.text);
    }
}

pub fn chapter(book: &Book, chapter: u32, load: &ChapterLoad) -> String {
    let mut out = String::new();
    let title = format!("{} {}", book.name, chapter);
    if let ChapterLoad::NoContent = load {
        let _ = writeln!(out, "No content available for {}", title.bold());
        return out;
    }
    let _ = writeln!(out, "{} {}", title.bold(), format!("({})", load.origin()).dimmed());
    let _ = writeln!(out);
    verse_lines(&mut out, load.verses());
    if matches!(load, ChapterLoad::Bundled(_)) {
        let _ = writeln!(out);
        let _ = writeln!(
            out,
            "{}",
            "Showing bundled sample verses; the full chapter needs a connection.".dimmed()
        );
    }
    out
}

pub fn verse(v: &Verse) -> String {
    format!("{}\n{}\n", v.reference().bold(), v.text)
}

pub fn search(query: &str, results: &SearchResults) -> String {
    let mut out = String::new();
    let verses = results.verses();
    if verses.is_empty() {
        let _ = writeln!(out, "No verses found for \"{}\"", query);
        return out;
    }
    if let SearchResults::Bundled(_) = results {
        let _ = writeln!(out, "{}", "Offline results from bundled verses".dimmed());
    }
    for v in verses {
        let _ = writeln!(out, "{}  {}", v.reference().bold(), v.text);
    }
    out
}

pub fn bookmarks(entries: &[BookmarkEntry]) -> String {
    let mut out = String::new();
    if entries.is_empty() {
        let _ = writeln!(out, "No bookmarks yet.");
        return out;
    }
    for (i, b) in entries.iter().enumerate() {
        let star = if b.is_favorite { "★" } else { " " };
        let translation = b
            .translation
            .as_deref()
            .map(|t| format!(" [{}]", t))
            .unwrap_or_default();
        let _ = writeln!(
            out,
            "{:>3}. {} {}{}  {}",
            i + 1,
            star.yellow(),
            b.reference().bold(),
            translation.dimmed(),
            b.text
        );
        if let Some(note) = &b.note {
            let _ = writeln!(out, "       {}", note.italic());
        }
    }
    out
}

pub fn history(items: &[HistoryItem]) -> String {
    let mut out = String::new();
    if items.is_empty() {
        let _ = writeln!(out, "Nothing read yet.");
        return out;
    }
    for h in items {
        let _ = writeln!(
            out,
            "{:<24} {:>4}%  {}",
            format!("{} {}", h.book, h.chapter),
            h.progress,
            h.last_read_at.format(TIME_FORMAT).to_string().dimmed()
        );
    }
    out
}

pub fn preferences(prefs: &UserPreferences, source: PreferenceSource) -> String {
    let origin = match source {
        PreferenceSource::Local => "device",
        PreferenceSource::Remote => "account",
    };
    let mut out = String::new();
    let _ = writeln!(out, "{}", format!("Preferences ({})", origin).bold());
    let rows = [
        ("theme", prefs.theme.to_string()),
        ("font-size", prefs.font_size.to_string()),
        ("font-family", prefs.font_family.to_string()),
        ("auto-scroll", prefs.auto_scroll.to_string()),
        ("daily-reminders", prefs.daily_reminders.to_string()),
        ("reminder-time", prefs.reminder_time.clone()),
        ("translation", prefs.preferred_translation.clone()),
    ];
    for (key, value) in rows {
        let _ = writeln!(out, "  {:<16} {}", key.dimmed(), value);
    }
    out
}

pub fn books() -> String {
    let mut out = String::new();
    let sections = [
        (Testament::Old, "Old Testament"),
        (Testament::New, "New Testament"),
    ];
    for (testament, title) in sections {
        let _ = writeln!(out, "{}", title.bold());
        for book in catalog::books().iter().filter(|b| b.testament == testament) {
            let noun = if book.chapter_count == 1 { "chapter" } else { "chapters" };
            let _ = writeln!(out, "  {:<18} {:>3} {}", book.name, book.chapter_count, noun);
        }
    }
    out
}

pub fn translations(current: &str) -> String {
    let mut out = String::new();
    for t in catalog::translations() {
        let marker = if t.id == current { "*" } else { " " };
        let _ = writeln!(
            out,
            "{} {:<5} {}  {}",
            marker.green(),
            t.abbreviation.bold(),
            t.name,
            t.description.dimmed()
        );
    }
    out
}

pub fn import_summary(summary: &ImportSummary) -> String {
    let mut parts = Vec::new();
    if let Some(n) = summary.bookmarks {
        parts.push(format!("{} bookmarks", n));
    }
    if summary.preferences {
        parts.push("preferences".to_string());
    }
    if let Some(n) = summary.reading_history {
        parts.push(format!("{} history entries", n));
    }
    if parts.is_empty() {
        "Nothing to import.".to_string()
    } else {
        format!("Imported {}.", parts.join(", "))
    }
}

pub fn migration_report(report: &MigrationReport) -> String {
    format!(
        "Migrated {} bookmarks, preferences and {} history entries. Local data cleared.",
        report.bookmarks, report.reading_history
    )
}
