use super::transfer::{self, ExportDocument, ImportSummary};
use super::{
    KeyValueStore, ALL_KEYS, BOOKMARKS_KEY, OFFLINE_CHAPTERS_KEY, PREFERENCES_KEY,
    READING_HISTORY_KEY,
};
use crate::error::{Result, ScripturaError};
use crate::model::{
    clamp_progress, BookmarkedVerse, FontFamily, FontSize, NewLocalBookmark, OfflineChapter,
    PreferencesPatch, ReadingHistoryEntry, Theme, UserPreferences, Verse,
};
use crate::preferences::mapping::{canonical_to_local, local_to_canonical};
use crate::preferences::theme::ThemeController;
use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::rc::Rc;

pub const HISTORY_LIMIT: usize = 50;
pub const RECENT_BOOKS_LIMIT: usize = 10;

/// The preferences document as persisted on the device.
///
/// Every field is optional so documents written by older versions, or
/// partial imports, still load: missing fields fall back to defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredPreferences {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub theme: Option<Theme>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_size: Option<FontSize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_family: Option<FontFamily>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_scroll: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub daily_reminders: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reminder_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferred_translation: Option<String>,
}

/// Offline chapter map, keyed "Book-chapter".
pub type OfflineChapters = BTreeMap<String, OfflineChapter>;

pub fn offline_key(book: &str, chapter: u32) -> String {
    format!("{}-{}", book, chapter)
}

/// Durable same-device storage for bookmarks, preferences, reading history
/// and offline chapters.
pub struct LocalStore<K: KeyValueStore> {
    kv: K,
    theme: Option<Rc<ThemeController>>,
}

impl<K: KeyValueStore> LocalStore<K> {
    pub fn new(kv: K) -> Self {
        Self { kv, theme: None }
    }

    /// Attach the controller that receives theme changes made through this store.
    pub fn with_theme(mut self, theme: Rc<ThemeController>) -> Self {
        self.theme = Some(theme);
        self
    }

    pub fn kv(&self) -> &K {
        &self.kv
    }

    // --- Documents ---

    /// Load a document. A corrupt document is logged and treated as empty.
    fn load<T: DeserializeOwned + Default>(&self, key: &str) -> Result<T> {
        match self.kv.get(key)? {
            None => Ok(T::default()),
            Some(raw) => match serde_json::from_str(&raw) {
                Ok(value) => Ok(value),
                Err(err) => {
                    tracing::warn!(key, error = %err, "Discarding unreadable local document");
                    Ok(T::default())
                }
            },
        }
    }

    fn save<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        let raw = serde_json::to_string(value).map_err(ScripturaError::Serialization)?;
        self.kv.set(key, &raw)
    }

    // --- Bookmarks ---

    pub fn bookmarks(&self) -> Result<Vec<BookmarkedVerse>> {
        self.load(BOOKMARKS_KEY)
    }

    /// Add a bookmark. An existing bookmark for the same verse is replaced in
    /// place by the new one (fresh id and date); otherwise it goes to the front.
    pub fn add_bookmark(&self, new: NewLocalBookmark) -> Result<BookmarkedVerse> {
        let mut bookmarks = self.bookmarks()?;
        let now = Utc::now();
        let bookmark = BookmarkedVerse {
            id: format!(
                "{}-{}-{}-{}",
                new.book,
                new.chapter,
                new.verse,
                now.timestamp_millis()
            ),
            book: new.book,
            chapter: new.chapter,
            verse: new.verse,
            text: new.text,
            date_added: now,
            is_favorite: new.is_favorite,
            note: new.note,
            tags: new.tags,
        };

        match bookmarks
            .iter()
            .position(|b| b.same_verse(&bookmark.book, bookmark.chapter, bookmark.verse))
        {
            Some(idx) => bookmarks[idx] = bookmark.clone(),
            None => bookmarks.insert(0, bookmark.clone()),
        }

        self.save(BOOKMARKS_KEY, &bookmarks)?;
        Ok(bookmark)
    }

    /// Remove by id. Returns whether anything was removed.
    pub fn remove_bookmark(&self, id: &str) -> Result<bool> {
        let mut bookmarks = self.bookmarks()?;
        let before = bookmarks.len();
        bookmarks.retain(|b| b.id != id);
        if bookmarks.len() == before {
            return Ok(false);
        }
        self.save(BOOKMARKS_KEY, &bookmarks)?;
        Ok(true)
    }

    /// Flip the favorite flag. Returns the new value, or None for an unknown id.
    pub fn toggle_favorite(&self, id: &str) -> Result<Option<bool>> {
        let mut bookmarks = self.bookmarks()?;
        let Some(bookmark) = bookmarks.iter_mut().find(|b| b.id == id) else {
            return Ok(None);
        };
        bookmark.is_favorite = !bookmark.is_favorite;
        let flag = bookmark.is_favorite;
        self.save(BOOKMARKS_KEY, &bookmarks)?;
        Ok(Some(flag))
    }

    pub fn update_bookmark_note(&self, id: &str, note: &str) -> Result<bool> {
        let mut bookmarks = self.bookmarks()?;
        let Some(bookmark) = bookmarks.iter_mut().find(|b| b.id == id) else {
            return Ok(false);
        };
        bookmark.note = Some(note.to_string());
        self.save(BOOKMARKS_KEY, &bookmarks)?;
        Ok(true)
    }

    pub fn is_bookmarked(&self, book: &str, chapter: u32, verse: u32) -> Result<bool> {
        Ok(self
            .bookmarks()?
            .iter()
            .any(|b| b.same_verse(book, chapter, verse)))
    }

    // --- Preferences ---

    /// Stored preferences merged over the defaults.
    pub fn preferences(&self) -> Result<UserPreferences> {
        let stored: StoredPreferences = self.load(PREFERENCES_KEY)?;
        Ok(local_to_canonical(&stored))
    }

    /// Shallow-merge `patch` over the current preferences and persist the result.
    /// A theme change is applied to the attached controller right away.
    pub fn update_preferences(&self, patch: &PreferencesPatch) -> Result<UserPreferences> {
        let mut prefs = self.preferences()?;
        patch.apply_to(&mut prefs);
        self.save(PREFERENCES_KEY, &canonical_to_local(&prefs))?;

        if let (Some(theme), Some(controller)) = (patch.theme, &self.theme) {
            controller.apply(theme);
        }
        Ok(prefs)
    }

    // --- Reading history ---

    /// Most recently read first.
    pub fn reading_history(&self) -> Result<Vec<ReadingHistoryEntry>> {
        self.load(READING_HISTORY_KEY)
    }

    /// Record a read of (book, chapter). The entry moves to the front and the
    /// history is trimmed to the newest [`HISTORY_LIMIT`] entries.
    pub fn update_reading_history(
        &self,
        book: &str,
        chapter: u32,
        progress: u32,
    ) -> Result<ReadingHistoryEntry> {
        let mut history = self.reading_history()?;
        history.retain(|h| !(h.book == book && h.chapter == chapter));

        let entry = ReadingHistoryEntry {
            book: book.to_string(),
            chapter,
            last_read_at: Utc::now(),
            progress: clamp_progress(progress),
        };
        history.insert(0, entry.clone());
        history.truncate(HISTORY_LIMIT);

        self.save(READING_HISTORY_KEY, &history)?;
        Ok(entry)
    }

    pub fn recent_books(&self) -> Result<Vec<ReadingHistoryEntry>> {
        let mut history = self.reading_history()?;
        history.truncate(RECENT_BOOKS_LIMIT);
        Ok(history)
    }

    // --- Offline chapters ---

    fn offline_chapters(&self) -> Result<OfflineChapters> {
        self.load(OFFLINE_CHAPTERS_KEY)
    }

    /// Last write wins; nothing is ever evicted.
    pub fn save_offline_chapter(&self, book: &str, chapter: u32, verses: &[Verse]) -> Result<()> {
        let mut chapters = self.offline_chapters()?;
        chapters.insert(
            offline_key(book, chapter),
            OfflineChapter {
                verses: verses.to_vec(),
                saved_at: Utc::now(),
            },
        );
        self.save(OFFLINE_CHAPTERS_KEY, &chapters)
    }

    pub fn offline_chapter(&self, book: &str, chapter: u32) -> Result<Option<OfflineChapter>> {
        let mut chapters = self.offline_chapters()?;
        Ok(chapters.remove(&offline_key(book, chapter)))
    }

    pub fn offline_chapter_keys(&self) -> Result<Vec<String>> {
        Ok(self.offline_chapters()?.into_keys().collect())
    }

    // --- Bulk ---

    pub fn export_data(&self) -> Result<ExportDocument> {
        Ok(ExportDocument {
            bookmarks: self.bookmarks()?,
            preferences: self.preferences()?,
            reading_history: self.reading_history()?,
            export_date: Utc::now(),
        })
    }

    pub fn export_json(&self) -> Result<String> {
        let doc = self.export_data()?;
        serde_json::to_string_pretty(&doc).map_err(ScripturaError::Serialization)
    }

    /// Import a previously exported document. The whole document is validated
    /// first; only the top-level fields it carries are overwritten. An imported
    /// theme is applied to the attached controller.
    pub fn import_json(&self, json: &str) -> Result<ImportSummary> {
        let doc = transfer::parse_import(json)?;
        let mut summary = ImportSummary::default();

        if let Some(bookmarks) = &doc.bookmarks {
            self.save(BOOKMARKS_KEY, bookmarks)?;
            summary.bookmarks = Some(bookmarks.len());
        }
        if let Some(preferences) = &doc.preferences {
            self.save(PREFERENCES_KEY, preferences)?;
            summary.preferences = true;
            if let Some(controller) = &self.theme {
                controller.apply(local_to_canonical(preferences).theme);
            }
        }
        if let Some(history) = &doc.reading_history {
            self.save(READING_HISTORY_KEY, history)?;
            summary.reading_history = Some(history.len());
        }
        Ok(summary)
    }

    /// Remove all four documents. Each is cleared independently; the first
    /// failure is reported after every key has been attempted.
    pub fn clear_all(&self) -> Result<()> {
        let mut first_error = None;
        for key in ALL_KEYS {
            if let Err(err) = self.kv.remove(key) {
                tracing::warn!(key, error = %err, "Failed to clear local document");
                first_error.get_or_insert(err);
            }
        }
        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Theme;
    use crate::preferences::theme::testing::RecordingSink;
    use crate::preferences::theme::Appearance;
    use crate::store::memory::MemoryKv;

    fn store() -> LocalStore<MemoryKv> {
        LocalStore::new(MemoryKv::new())
    }

    fn new_bookmark(book: &str, chapter: u32, verse: u32, text: &str) -> NewLocalBookmark {
        NewLocalBookmark {
            book: book.into(),
            chapter,
            verse,
            text: text.into(),
            ..Default::default()
        }
    }

    #[test]
    fn adding_same_verse_twice_keeps_one_with_latest_fields() {
        let store = store();
        store
            .add_bookmark(new_bookmark("John", 3, 16, "first"))
            .unwrap();
        store
            .add_bookmark(new_bookmark("Psalms", 23, 1, "shepherd"))
            .unwrap();
        let mut second = new_bookmark("John", 3, 16, "second");
        second.note = Some("loved".into());
        store.add_bookmark(second).unwrap();

        let bookmarks = store.bookmarks().unwrap();
        assert_eq!(bookmarks.len(), 2);
        let john: Vec<_> = bookmarks
            .iter()
            .filter(|b| b.same_verse("John", 3, 16))
            .collect();
        assert_eq!(john.len(), 1);
        assert_eq!(john[0].text, "second");
        assert_eq!(john[0].note.as_deref(), Some("loved"));
        // Overwritten in place: Psalms was added after John and sits in front.
        assert_eq!(bookmarks[0].book, "Psalms");
    }

    #[test]
    fn new_bookmarks_go_to_the_front() {
        let store = store();
        store.add_bookmark(new_bookmark("John", 3, 16, "a")).unwrap();
        store.add_bookmark(new_bookmark("John", 3, 17, "b")).unwrap();
        assert_eq!(store.bookmarks().unwrap()[0].verse, 17);
    }

    #[test]
    fn remove_toggle_and_note_by_id() {
        let store = store();
        let b = store.add_bookmark(new_bookmark("John", 3, 16, "a")).unwrap();

        assert_eq!(store.toggle_favorite(&b.id).unwrap(), Some(true));
        assert_eq!(store.toggle_favorite(&b.id).unwrap(), Some(false));
        assert_eq!(store.toggle_favorite("missing").unwrap(), None);

        assert!(store.update_bookmark_note(&b.id, "note").unwrap());
        assert_eq!(
            store.bookmarks().unwrap()[0].note.as_deref(),
            Some("note")
        );

        assert!(store.is_bookmarked("John", 3, 16).unwrap());
        assert!(store.remove_bookmark(&b.id).unwrap());
        assert!(!store.remove_bookmark(&b.id).unwrap());
        assert!(!store.is_bookmarked("John", 3, 16).unwrap());
    }

    #[test]
    fn preferences_merge_defaults_under_partial_document() {
        let store = store();
        store
            .kv()
            .set(PREFERENCES_KEY, r#"{"theme":"dark"}"#)
            .unwrap();
        let prefs = store.preferences().unwrap();
        assert_eq!(prefs.theme, Theme::Dark);
        assert_eq!(prefs.reminder_time, "08:00");
        assert_eq!(prefs.preferred_translation, "kjv");
    }

    #[test]
    fn unreadable_preferences_fall_back_to_defaults() {
        let store = store();
        store.kv().set(PREFERENCES_KEY, "{not json").unwrap();
        assert_eq!(store.preferences().unwrap(), UserPreferences::default());
    }

    #[test]
    fn update_preferences_merges_and_applies_theme() {
        let sink = RecordingSink::default();
        let controller = Rc::new(ThemeController::new(Box::new(sink.clone())));
        let store = store().with_theme(controller);

        store
            .update_preferences(&PreferencesPatch {
                font_size: Some(FontSize::Large),
                ..Default::default()
            })
            .unwrap();
        assert!(sink.0.borrow().is_empty());

        let prefs = store
            .update_preferences(&PreferencesPatch::theme(Theme::Dark))
            .unwrap();
        assert_eq!(prefs.font_size, FontSize::Large);
        assert_eq!(prefs.theme, Theme::Dark);
        assert_eq!(*sink.0.borrow(), vec![Appearance::Dark]);
        assert_eq!(store.preferences().unwrap(), prefs);
    }

    #[test]
    fn failed_write_does_not_apply_theme() {
        let sink = RecordingSink::default();
        let controller = Rc::new(ThemeController::new(Box::new(sink.clone())));
        let store = store().with_theme(controller);
        store.kv().set_simulate_write_error(true);

        assert!(store
            .update_preferences(&PreferencesPatch::theme(Theme::Dark))
            .is_err());
        assert!(sink.0.borrow().is_empty());
    }

    #[test]
    fn history_is_most_recent_first_and_capped() {
        let store = store();
        for chapter in 1..=51 {
            store.update_reading_history("Psalms", chapter, 100).unwrap();
        }
        let history = store.reading_history().unwrap();
        assert_eq!(history.len(), HISTORY_LIMIT);
        assert_eq!(history[0].chapter, 51);
        assert!(history.iter().all(|h| h.chapter != 1));
    }

    #[test]
    fn rereading_moves_entry_to_front_without_duplicating() {
        let store = store();
        store.update_reading_history("John", 1, 10).unwrap();
        store.update_reading_history("John", 2, 10).unwrap();
        store.update_reading_history("John", 1, 80).unwrap();

        let history = store.reading_history().unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].chapter, 1);
        assert_eq!(history[0].progress, 80);
    }

    #[test]
    fn recent_books_returns_first_ten() {
        let store = store();
        for chapter in 1..=15 {
            store.update_reading_history("Genesis", chapter, 0).unwrap();
        }
        let recent = store.recent_books().unwrap();
        assert_eq!(recent.len(), RECENT_BOOKS_LIMIT);
        assert_eq!(recent[0].chapter, 15);
    }

    #[test]
    fn offline_chapters_last_write_wins() {
        let store = store();
        assert!(store.offline_chapter("John", 3).unwrap().is_none());

        store
            .save_offline_chapter("John", 3, &[Verse::new("John", 3, 16, "old")])
            .unwrap();
        store
            .save_offline_chapter("John", 3, &[Verse::new("John", 3, 16, "new")])
            .unwrap();
        store
            .save_offline_chapter("John", 4, &[Verse::new("John", 4, 1, "x")])
            .unwrap();

        let cached = store.offline_chapter("John", 3).unwrap().unwrap();
        assert_eq!(cached.verses[0].text, "new");
        assert_eq!(
            store.offline_chapter_keys().unwrap(),
            vec!["John-3".to_string(), "John-4".to_string()]
        );
    }

    #[test]
    fn export_then_import_into_reset_store_round_trips() {
        let store = store();
        store.add_bookmark(new_bookmark("John", 3, 16, "a")).unwrap();
        let fav = store
            .add_bookmark(new_bookmark("Romans", 8, 28, "b"))
            .unwrap();
        store.toggle_favorite(&fav.id).unwrap();
        store
            .update_preferences(&PreferencesPatch {
                theme: Some(Theme::Light),
                preferred_translation: Some("esv".into()),
                ..Default::default()
            })
            .unwrap();

        let before_bookmarks = store.bookmarks().unwrap();
        let before_prefs = store.preferences().unwrap();
        let exported = store.export_json().unwrap();

        store.clear_all().unwrap();
        assert!(store.bookmarks().unwrap().is_empty());

        store.import_json(&exported).unwrap();
        assert_eq!(store.bookmarks().unwrap(), before_bookmarks);
        assert_eq!(store.preferences().unwrap(), before_prefs);
    }

    #[test]
    fn import_only_overwrites_present_fields() {
        let store = store();
        store.add_bookmark(new_bookmark("John", 3, 16, "a")).unwrap();
        store.update_reading_history("John", 3, 50).unwrap();

        let summary = store
            .import_json(r#"{"preferences":{"fontSize":"xl"}}"#)
            .unwrap();
        assert!(summary.preferences);
        assert_eq!(summary.bookmarks, None);

        assert_eq!(store.bookmarks().unwrap().len(), 1);
        assert_eq!(store.reading_history().unwrap().len(), 1);
        assert_eq!(store.preferences().unwrap().font_size, FontSize::Xl);
    }

    #[test]
    fn import_is_held_to_store_rules() {
        let start = Utc::now();
        let mut history: Vec<serde_json::Value> = (0..60)
            .map(|i| {
                serde_json::json!({
                    "book": "Psalms",
                    "chapter": i + 1,
                    "lastRead": (start - chrono::Duration::minutes(i)).to_rfc3339(),
                    "progress": 250,
                })
            })
            .collect();
        // An older duplicate of the newest chapter, placed first.
        history.insert(
            0,
            serde_json::json!({
                "book": "Psalms",
                "chapter": 1,
                "lastRead": (start - chrono::Duration::days(3)).to_rfc3339(),
                "progress": 10,
            }),
        );
        let bookmark = |text: &str| {
            serde_json::json!({
                "id": format!("john-{}", text),
                "book": "John",
                "chapter": 3,
                "verse": 16,
                "text": text,
                "dateAdded": start.to_rfc3339(),
            })
        };
        let doc = serde_json::json!({
            "bookmarks": [bookmark("first"), bookmark("second")],
            "readingHistory": history,
        });

        let store = store();
        let summary = store.import_json(&doc.to_string()).unwrap();
        assert_eq!(summary.bookmarks, Some(1));
        assert_eq!(summary.reading_history, Some(HISTORY_LIMIT));

        let bookmarks = store.bookmarks().unwrap();
        assert_eq!(bookmarks.len(), 1);
        assert_eq!(bookmarks[0].text, "first");

        let history = store.reading_history().unwrap();
        assert_eq!(history.len(), HISTORY_LIMIT);
        assert!(history.iter().all(|h| h.progress <= 100));
        assert!(history
            .windows(2)
            .all(|w| w[0].last_read_at >= w[1].last_read_at));
        let first_chapters: Vec<_> = history.iter().filter(|h| h.chapter == 1).collect();
        assert_eq!(first_chapters.len(), 1);
        assert_eq!(first_chapters[0].progress, 100);
        assert_eq!(history[0].chapter, 1);
    }

    #[test]
    fn malformed_import_writes_nothing() {
        let store = store();
        store.add_bookmark(new_bookmark("John", 3, 16, "a")).unwrap();

        let bad = r#"{"preferences":{"theme":"dark"},"bookmarks":"oops"}"#;
        assert!(matches!(
            store.import_json(bad),
            Err(ScripturaError::Import(_))
        ));
        assert!(store.import_json("not json").is_err());
        assert!(store.import_json("[1,2]").is_err());

        assert_eq!(store.bookmarks().unwrap().len(), 1);
        assert_eq!(store.preferences().unwrap().theme, Theme::System);
    }

    #[test]
    fn clear_all_removes_every_category() {
        let store = store();
        store.add_bookmark(new_bookmark("John", 3, 16, "a")).unwrap();
        store
            .update_preferences(&PreferencesPatch::theme(Theme::Dark))
            .unwrap();
        store.update_reading_history("John", 3, 10).unwrap();
        store
            .save_offline_chapter("John", 3, &[Verse::new("John", 3, 16, "x")])
            .unwrap();

        store.clear_all().unwrap();
        assert!(store.kv().keys().is_empty());
        assert_eq!(store.preferences().unwrap(), UserPreferences::default());
    }
}
