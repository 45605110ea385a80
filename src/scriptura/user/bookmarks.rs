use super::backend::{eq, from_row, from_rows, to_row, Order, Table, UserBackend};
use super::session::Session;
use super::state::{reduce, Keyed, ListPatch, Resource, Transition};
use crate::error::Result;
use crate::model::{Bookmark, NewBookmark};
use serde::Serialize;
use std::rc::Rc;

/// Translation recorded on remote bookmarks when the caller gives none.
pub const DEFAULT_BOOKMARK_TRANSLATION: &str = "NIV";

impl Keyed for Bookmark {
    fn key(&self) -> String {
        self.id.clone()
    }
}

/// Insert payload for the bookmarks table.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct BookmarkInsert {
    pub user_id: String,
    pub book: String,
    pub chapter: u32,
    pub verse_number: u32,
    pub verse_text: String,
    pub translation: String,
    pub note: Option<String>,
    pub is_favorite: bool,
    pub highlight_color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

/// The signed-in user's bookmarks, mirrored newest first.
pub struct RemoteBookmarks<B: UserBackend> {
    backend: Rc<B>,
    session: Session,
    state: Resource<Vec<Bookmark>>,
}

impl<B: UserBackend> RemoteBookmarks<B> {
    pub fn new(backend: Rc<B>, session: Session) -> Self {
        Self {
            backend,
            session,
            state: Resource::default(),
        }
    }

    pub fn state(&self) -> &Resource<Vec<Bookmark>> {
        &self.state
    }

    /// The mirror, or nothing when it was loaded for someone other than the
    /// current session user.
    pub fn bookmarks(&self) -> &[Bookmark] {
        let current = self.session.user_id();
        if self
            .state
            .data
            .iter()
            .all(|b| Some(&b.user_id) == current.as_ref())
        {
            self.state.data.as_slice()
        } else {
            &[]
        }
    }

    fn transition(&mut self, t: Transition<Vec<Bookmark>>) {
        self.state = reduce(std::mem::take(&mut self.state), t);
    }

    fn fail<T>(&mut self, err: crate::error::ScripturaError) -> Result<T> {
        self.transition(Transition::Failed(err.to_string()));
        Err(err)
    }

    /// Reload from the backend. Signed out, the mirror is simply emptied.
    pub async fn refresh(&mut self) -> Result<&[Bookmark]> {
        let Some(user_id) = self.session.user_id() else {
            self.transition(Transition::Loaded(Vec::new()));
            return Ok(self.bookmarks());
        };
        self.transition(Transition::Started);

        let result = self
            .backend
            .select(
                Table::Bookmarks,
                &[eq("user_id", user_id)],
                Some(&Order::desc("created_at")),
            )
            .await
            .and_then(from_rows::<Bookmark>);
        match result {
            Ok(rows) => {
                self.transition(Transition::Loaded(rows));
                Ok(self.bookmarks())
            }
            Err(err) => self.fail(err),
        }
    }

    /// Create a bookmark. Returns None when signed out.
    pub async fn add(&mut self, new: NewBookmark) -> Result<Option<Bookmark>> {
        let Some(user_id) = self.session.user_id() else {
            return Ok(None);
        };
        let insert = BookmarkInsert {
            user_id,
            book: new.book,
            chapter: new.chapter,
            verse_number: new.verse_number,
            verse_text: new.verse_text,
            translation: new
                .translation
                .unwrap_or_else(|| DEFAULT_BOOKMARK_TRANSLATION.to_string()),
            note: new.note,
            is_favorite: false,
            highlight_color: new.highlight_color,
            created_at: None,
        };

        let result = match to_row(&insert) {
            Ok(row) => self.backend.insert(Table::Bookmarks, vec![row]).await,
            Err(err) => Err(err),
        };
        let stored = match result.and_then(|mut rows| match rows.pop() {
            Some(row) => from_row::<Bookmark>(row),
            None => Err(crate::error::ScripturaError::Backend(
                "insert returned no row".to_string(),
            )),
        }) {
            Ok(b) => b,
            Err(err) => return self.fail(err),
        };

        tracing::debug!(id = %stored.id, "Bookmark created");
        self.transition(Transition::Patched(ListPatch::Prepend(stored.clone())));
        Ok(Some(stored))
    }

    /// Delete a bookmark owned by the current user. A bookmark id belonging to
    /// anyone else matches nothing and reports `false`.
    pub async fn remove(&mut self, id: &str) -> Result<bool> {
        let Some(user_id) = self.session.user_id() else {
            return Ok(false);
        };
        match self
            .backend
            .delete(Table::Bookmarks, &[eq("id", id), eq("user_id", user_id)])
            .await
        {
            Ok(0) => Ok(false),
            Ok(_) => {
                self.transition(Transition::Patched(ListPatch::Remove(id.to_string())));
                Ok(true)
            }
            Err(err) => self.fail(err),
        }
    }

    /// Flip the favorite flag.
    ///
    /// This is a read-modify-write, not an atomic toggle: two sessions
    /// toggling the same bookmark concurrently can both read `false` and both
    /// write `true`.
    pub async fn toggle_favorite(&mut self, id: &str) -> Result<Option<Bookmark>> {
        let Some(user_id) = self.session.user_id() else {
            return Ok(None);
        };
        let filters = [eq("id", id), eq("user_id", user_id)];

        let current = match self
            .backend
            .select(Table::Bookmarks, &filters, None)
            .await
            .and_then(from_rows::<Bookmark>)
        {
            Ok(mut rows) => rows.pop(),
            Err(err) => return self.fail(err),
        };
        let Some(current) = current else {
            return Ok(None);
        };

        let mut patch = serde_json::Map::new();
        patch.insert("is_favorite".into(), (!current.is_favorite).into());
        self.write_patch(&filters, patch).await
    }

    /// Overwrite the note on a bookmark.
    pub async fn update_note(&mut self, id: &str, note: &str) -> Result<Option<Bookmark>> {
        let Some(user_id) = self.session.user_id() else {
            return Ok(None);
        };
        let mut patch = serde_json::Map::new();
        patch.insert("note".into(), note.into());
        self.write_patch(&[eq("id", id), eq("user_id", user_id)], patch)
            .await
    }

    async fn write_patch(
        &mut self,
        filters: &[super::backend::Filter],
        patch: super::backend::Row,
    ) -> Result<Option<Bookmark>> {
        match self
            .backend
            .update(Table::Bookmarks, filters, patch)
            .await
            .and_then(from_rows::<Bookmark>)
        {
            Ok(mut rows) => {
                let updated = rows.pop();
                if let Some(bookmark) = &updated {
                    self.transition(Transition::Patched(ListPatch::Replace(bookmark.clone())));
                }
                Ok(updated)
            }
            Err(err) => self.fail(err),
        }
    }

    pub fn is_bookmarked(&self, book: &str, chapter: u32, verse: u32) -> bool {
        self.bookmarks()
            .iter()
            .any(|b| b.book == book && b.chapter == chapter && b.verse_number == verse)
    }

    pub fn favorites(&self) -> Vec<&Bookmark> {
        self.bookmarks().iter().filter(|b| b.is_favorite).collect()
    }

    pub fn by_book(&self, book: &str) -> Vec<&Bookmark> {
        self.bookmarks().iter().filter(|b| b.book == book).collect()
    }
}
