//! # API Facade
//!
//! The single entry point every UI client uses. It owns one instance of each
//! core component and decides, per call, which one answers:
//!
//! - Content always goes through the [`ContentResolver`].
//! - Bookmarks and reading history go to the remote user store while a user
//!   is signed in, and to the device store otherwise.
//! - Preferences go through the [`PreferenceResolver`], which applies the
//!   same rule.
//! - Export, import and reset only ever touch the device store.
//!
//! The facade returns data, never strings for display, and performs no I/O
//! of its own beyond what the components do.
//!
//! ## Generic over every seam
//!
//! `ScripturaApi<T, K, B>` is generic over the verse transport, the device
//! key-value store and the user backend. The CLI runs
//! `ScripturaApi<HttpTransport, FsKv, RestBackend>`; tests run it over
//! `StubTransport`, `MemoryKv` and `MemoryBackend`.

use crate::catalog;
use crate::content::cache::ContentCache;
use crate::content::resolver::{ChapterLoad, Connectivity, ContentResolver, SearchResults};
use crate::content::source::ContentSource;
use crate::content::transport::VerseTransport;
use crate::error::{Result, ScripturaError};
use crate::model::{
    Book, Bookmark, BookmarkedVerse, NewBookmark, NewLocalBookmark, PreferencesPatch,
    ReadingHistoryEntry, RemoteHistoryEntry, UserPreferences, Verse,
};
use crate::preferences::resolver::{PreferenceResolver, PreferenceSource};
use crate::preferences::theme::ThemeController;
use crate::store::local::{LocalStore, RECENT_BOOKS_LIMIT};
use crate::store::transfer::ImportSummary;
use crate::store::KeyValueStore;
use crate::sync::migration::{MigrationCoordinator, MigrationReport, MigrationState};
use crate::user::backend::UserBackend;
use crate::user::session::{AuthUser, Session};
use crate::user::UserStore;
use chrono::{DateTime, NaiveDate, Utc};
use std::rc::Rc;

/// A bookmark from either store, in one shape for display.
#[derive(Debug, Clone, PartialEq)]
pub struct BookmarkEntry {
    pub id: String,
    pub book: String,
    pub chapter: u32,
    pub verse: u32,
    pub text: String,
    pub is_favorite: bool,
    pub note: Option<String>,
    /// Only remote bookmarks record a translation.
    pub translation: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl BookmarkEntry {
    pub fn reference(&self) -> String {
        format!("{} {}:{}", self.book, self.chapter, self.verse)
    }
}

impl From<BookmarkedVerse> for BookmarkEntry {
    fn from(b: BookmarkedVerse) -> Self {
        Self {
            id: b.id,
            book: b.book,
            chapter: b.chapter,
            verse: b.verse,
            text: b.text,
            is_favorite: b.is_favorite,
            note: b.note,
            translation: None,
            created_at: b.date_added,
        }
    }
}

impl From<Bookmark> for BookmarkEntry {
    fn from(b: Bookmark) -> Self {
        Self {
            id: b.id,
            book: b.book,
            chapter: b.chapter,
            verse: b.verse_number,
            text: b.verse_text,
            is_favorite: b.is_favorite,
            note: b.note,
            translation: Some(b.translation),
            created_at: b.created_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryItem {
    pub book: String,
    pub chapter: u32,
    pub progress: u8,
    pub last_read_at: DateTime<Utc>,
}

impl From<ReadingHistoryEntry> for HistoryItem {
    fn from(h: ReadingHistoryEntry) -> Self {
        Self {
            book: h.book,
            chapter: h.chapter,
            progress: h.progress,
            last_read_at: h.last_read_at,
        }
    }
}

impl From<RemoteHistoryEntry> for HistoryItem {
    fn from(h: RemoteHistoryEntry) -> Self {
        Self {
            book: h.book,
            chapter: h.chapter,
            progress: h.progress,
            last_read_at: h.last_read_at,
        }
    }
}

/// The main API facade.
pub struct ScripturaApi<T: VerseTransport, K: KeyValueStore, B: UserBackend> {
    content: ContentResolver<T, K>,
    local: Rc<LocalStore<K>>,
    user: UserStore<B>,
    preferences: PreferenceResolver<K, B>,
    migration: MigrationCoordinator<K, B>,
    session: Session,
}

impl<T: VerseTransport, K: KeyValueStore, B: UserBackend> ScripturaApi<T, K, B> {
    pub fn new(
        transport: T,
        cache: Box<dyn ContentCache>,
        kv: K,
        backend: B,
        session: Session,
        theme: Rc<ThemeController>,
        translation: &str,
    ) -> Self {
        let local = Rc::new(LocalStore::new(kv).with_theme(theme.clone()));
        let backend = Rc::new(backend);
        let source = ContentSource::new(transport, cache, translation);
        let user = UserStore::new(backend.clone(), session.clone());
        let preferences =
            PreferenceResolver::new(local.clone(), user.preferences(), session.clone(), theme);
        let migration = MigrationCoordinator::new(local.clone(), backend, session.clone());

        Self {
            content: ContentResolver::new(source, local.clone()),
            local,
            user,
            preferences,
            migration,
            session,
        }
    }

    // --- Session ---

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn sign_in(&self, user: AuthUser) {
        self.session.sign_in(user);
    }

    pub fn sign_out(&self) {
        self.session.sign_out();
    }

    fn remote(&self) -> bool {
        self.session.is_authenticated()
    }

    // --- Content ---

    pub fn set_connectivity(&mut self, connectivity: Connectivity) {
        self.content.set_connectivity(connectivity);
    }

    pub fn set_translation(&mut self, id: &str) -> Result<()> {
        let id = id.to_lowercase();
        if catalog::translation_info(&id).is_none() {
            return Err(ScripturaError::Api(format!("Unknown translation: {}", id)));
        }
        if self.content.source().current_translation() != id {
            self.content.source_mut().set_translation(&id);
        }
        Ok(())
    }

    pub fn current_translation(&self) -> &str {
        self.content.source().current_translation()
    }

    pub fn clear_cache(&mut self) {
        self.content.source_mut().clear_cache();
    }

    pub fn cache_size(&self) -> usize {
        self.content.source().cache_size()
    }

    /// Load a chapter and, when anything was found, record it as read.
    ///
    /// Recording is best effort: a failed history write is logged and the
    /// chapter is still returned.
    pub async fn read_chapter(&mut self, book: &str, chapter: u32) -> Result<(Book, ChapterLoad)> {
        let book = resolve_chapter(book, chapter)?;
        let load = self.content.load_chapter(&book.name, chapter, None).await;
        if !load.verses().is_empty() {
            if let Err(err) = self.record_reading(&book.name, chapter, 100).await {
                tracing::warn!(
                    book = %book.name,
                    chapter,
                    error = %err,
                    "Could not record reading history"
                );
            }
        }
        Ok((book, load))
    }

    pub async fn verse(&mut self, book: &str, chapter: u32, verse: u32) -> Result<Verse> {
        let book = resolve_chapter(book, chapter)?;
        self.content
            .verse(&book.name, chapter, verse, None)
            .await
            .ok_or_else(|| {
                ScripturaError::NotFound(format!("{} {}:{}", book.name, chapter, verse))
            })
    }

    pub async fn search(&mut self, query: &str) -> SearchResults {
        self.content.search(query, None).await
    }

    pub async fn daily_verse(&mut self, date: NaiveDate) -> Verse {
        self.content.daily_verse(date, None).await
    }

    pub fn offline_chapters(&self) -> Result<Vec<String>> {
        self.local.offline_chapter_keys()
    }

    // --- Bookmarks ---

    pub async fn bookmarks(&mut self) -> Result<Vec<BookmarkEntry>> {
        if self.remote() {
            let rows = self.user.bookmarks.refresh().await?;
            Ok(rows.iter().cloned().map(BookmarkEntry::from).collect())
        } else {
            Ok(self
                .local
                .bookmarks()?
                .into_iter()
                .map(BookmarkEntry::from)
                .collect())
        }
    }

    pub async fn favorites(&mut self) -> Result<Vec<BookmarkEntry>> {
        let mut all = self.bookmarks().await?;
        all.retain(|b| b.is_favorite);
        Ok(all)
    }

    /// Bookmark a verse, fetching its text first.
    pub async fn add_bookmark(
        &mut self,
        book: &str,
        chapter: u32,
        verse: u32,
        note: Option<String>,
    ) -> Result<BookmarkEntry> {
        let found = self.verse(book, chapter, verse).await?;

        if self.remote() {
            let translation = catalog::translation_info(self.current_translation())
                .map(|t| t.abbreviation.clone());
            let created = self
                .user
                .bookmarks
                .add(NewBookmark {
                    book: found.book,
                    chapter,
                    verse_number: verse,
                    verse_text: found.text,
                    translation,
                    note,
                    highlight_color: None,
                })
                .await?
                .ok_or_else(|| ScripturaError::Api("Not signed in".to_string()))?;
            Ok(created.into())
        } else {
            let created = self.local.add_bookmark(NewLocalBookmark {
                book: found.book,
                chapter,
                verse,
                text: found.text,
                note,
                ..Default::default()
            })?;
            Ok(created.into())
        }
    }

    /// Accepts a bookmark id or its 1-based position in [`Self::bookmarks`].
    pub async fn resolve_bookmark(&mut self, selector: &str) -> Result<BookmarkEntry> {
        let all = self.bookmarks().await?;
        let by_position = selector
            .parse::<usize>()
            .ok()
            .and_then(|n| n.checked_sub(1))
            .and_then(|i| all.get(i));
        by_position
            .or_else(|| all.iter().find(|b| b.id == selector))
            .cloned()
            .ok_or_else(|| ScripturaError::NotFound(format!("Bookmark {}", selector)))
    }

    pub async fn remove_bookmark(&mut self, selector: &str) -> Result<BookmarkEntry> {
        let target = self.resolve_bookmark(selector).await?;
        let removed = if self.remote() {
            self.user.bookmarks.remove(&target.id).await?
        } else {
            self.local.remove_bookmark(&target.id)?
        };
        if !removed {
            return Err(ScripturaError::NotFound(format!("Bookmark {}", selector)));
        }
        Ok(target)
    }

    /// Returns the bookmark with its new favorite flag.
    pub async fn toggle_favorite(&mut self, selector: &str) -> Result<BookmarkEntry> {
        let mut target = self.resolve_bookmark(selector).await?;
        let flag = if self.remote() {
            self.user
                .bookmarks
                .toggle_favorite(&target.id)
                .await?
                .map(|b| b.is_favorite)
        } else {
            self.local.toggle_favorite(&target.id)?
        };
        target.is_favorite =
            flag.ok_or_else(|| ScripturaError::NotFound(format!("Bookmark {}", selector)))?;
        Ok(target)
    }

    pub async fn set_bookmark_note(&mut self, selector: &str, note: &str) -> Result<BookmarkEntry> {
        let mut target = self.resolve_bookmark(selector).await?;
        let updated = if self.remote() {
            self.user
                .bookmarks
                .update_note(&target.id, note)
                .await?
                .is_some()
        } else {
            self.local.update_bookmark_note(&target.id, note)?
        };
        if !updated {
            return Err(ScripturaError::NotFound(format!("Bookmark {}", selector)));
        }
        target.note = Some(note.to_string());
        Ok(target)
    }

    // --- Reading history ---

    pub async fn record_reading(
        &mut self,
        book: &str,
        chapter: u32,
        progress: u32,
    ) -> Result<Option<HistoryItem>> {
        if self.remote() {
            Ok(self
                .user
                .history
                .update(book, chapter, progress)
                .await?
                .map(HistoryItem::from))
        } else {
            Ok(Some(
                self.local
                    .update_reading_history(book, chapter, progress)?
                    .into(),
            ))
        }
    }

    pub async fn reading_history(&mut self) -> Result<Vec<HistoryItem>> {
        if self.remote() {
            let rows = self.user.history.refresh().await?;
            Ok(rows.iter().cloned().map(HistoryItem::from).collect())
        } else {
            Ok(self
                .local
                .reading_history()?
                .into_iter()
                .map(HistoryItem::from)
                .collect())
        }
    }

    pub async fn recent_books(&mut self) -> Result<Vec<HistoryItem>> {
        if self.remote() {
            self.user.history.refresh().await?;
            Ok(self
                .user
                .history
                .recent_books(RECENT_BOOKS_LIMIT)
                .into_iter()
                .cloned()
                .map(HistoryItem::from)
                .collect())
        } else {
            Ok(self
                .local
                .recent_books()?
                .into_iter()
                .map(HistoryItem::from)
                .collect())
        }
    }

    // --- Preferences ---

    pub async fn preferences(&mut self) -> Result<(UserPreferences, PreferenceSource)> {
        let prefs = self.preferences.refresh().await?;
        Ok((prefs, self.preferences.source()))
    }

    pub async fn update_preferences(
        &mut self,
        patch: &PreferencesPatch,
    ) -> Result<UserPreferences> {
        if let Some(id) = &patch.preferred_translation {
            if catalog::translation_info(id).is_none() {
                return Err(ScripturaError::Api(format!("Unknown translation: {}", id)));
            }
        }
        self.preferences.update(patch).await
    }

    pub fn system_preference_changed(&self, dark: bool) {
        self.preferences.system_preference_changed(dark);
    }

    // --- Device data ---

    pub fn export_json(&self) -> Result<String> {
        self.local.export_json()
    }

    pub fn import_json(&self, json: &str) -> Result<ImportSummary> {
        self.local.import_json(json)
    }

    /// Wipe every device document, drop cached content and reset the theme.
    pub fn reset(&mut self) -> Result<()> {
        self.content.source_mut().clear_cache();
        self.preferences.reset()
    }

    // --- Migration ---

    pub fn detect_migration(&mut self) -> Result<bool> {
        self.migration.detect()
    }

    pub async fn migrate(&mut self) -> Result<MigrationReport> {
        self.migration.migrate().await
    }

    pub fn decline_migration(&mut self) {
        self.migration.decline();
    }

    pub fn migration_state(&self) -> &MigrationState {
        self.migration.state()
    }
}

fn resolve_chapter(book: &str, chapter: u32) -> Result<Book> {
    let found = catalog::find_book(book)
        .ok_or_else(|| ScripturaError::Api(format!("Unknown book: {}", book)))?;
    if !found.has_chapter(chapter) {
        let noun = if found.chapter_count == 1 {
            "chapter"
        } else {
            "chapters"
        };
        return Err(ScripturaError::Api(format!(
            "{} has {} {}",
            found.name, found.chapter_count, noun
        )));
    }
    Ok(found.clone())
}
