use super::backend::{eq, from_rows, to_row, Order, Table, UserBackend};
use super::session::Session;
use super::state::{reduce, Keyed, ListPatch, Resource, Transition};
use crate::error::{Result, ScripturaError};
use crate::model::{clamp_progress, RemoteHistoryEntry};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashSet;
use std::rc::Rc;

/// Conflict target for history upserts: one row per user and chapter.
pub const HISTORY_CONFLICT: [&str; 3] = ["user_id", "book", "chapter"];

impl Keyed for RemoteHistoryEntry {
    fn key(&self) -> String {
        format!("{}-{}", self.book, self.chapter)
    }
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct HistoryUpsert {
    pub user_id: String,
    pub book: String,
    pub chapter: u32,
    pub progress: u8,
    pub last_read_at: DateTime<Utc>,
}

pub struct RemoteHistory<B: UserBackend> {
    backend: Rc<B>,
    session: Session,
    state: Resource<Vec<RemoteHistoryEntry>>,
}

impl<B: UserBackend> RemoteHistory<B> {
    pub fn new(backend: Rc<B>, session: Session) -> Self {
        Self {
            backend,
            session,
            state: Resource::default(),
        }
    }

    pub fn state(&self) -> &Resource<Vec<RemoteHistoryEntry>> {
        &self.state
    }

    pub fn entries(&self) -> &[RemoteHistoryEntry] {
        &self.state.data
    }

    fn transition(&mut self, t: Transition<Vec<RemoteHistoryEntry>>) {
        self.state = reduce(std::mem::take(&mut self.state), t);
    }

    /// Reload, most recently read first.
    pub async fn refresh(&mut self) -> Result<&[RemoteHistoryEntry]> {
        let Some(user_id) = self.session.user_id() else {
            self.transition(Transition::Loaded(Vec::new()));
            return Ok(self.entries());
        };
        self.transition(Transition::Started);

        match self
            .backend
            .select(
                Table::ReadingHistory,
                &[eq("user_id", user_id)],
                Some(&Order::desc("last_read_at")),
            )
            .await
            .and_then(from_rows::<RemoteHistoryEntry>)
        {
            Ok(rows) => {
                self.transition(Transition::Loaded(rows));
                Ok(self.entries())
            }
            Err(err) => {
                self.transition(Transition::Failed(err.to_string()));
                Err(err)
            }
        }
    }

    /// Record that a chapter was read now. Re-reading a chapter updates its
    /// single row and moves it to the front.
    pub async fn update(
        &mut self,
        book: &str,
        chapter: u32,
        progress: u32,
    ) -> Result<Option<RemoteHistoryEntry>> {
        let Some(user_id) = self.session.user_id() else {
            return Ok(None);
        };
        let upsert = HistoryUpsert {
            user_id,
            book: book.to_string(),
            chapter,
            progress: clamp_progress(progress),
            last_read_at: Utc::now(),
        };

        let written = match to_row(&upsert) {
            Ok(row) => self
                .backend
                .upsert(Table::ReadingHistory, vec![row], &HISTORY_CONFLICT)
                .await
                .and_then(from_rows::<RemoteHistoryEntry>),
            Err(err) => Err(err),
        };
        match written.and_then(|mut rows| {
            rows.pop()
                .ok_or_else(|| ScripturaError::Backend("upsert returned no row".into()))
        }) {
            Ok(entry) => {
                self.transition(Transition::Patched(ListPatch::Prepend(entry.clone())));
                Ok(Some(entry))
            }
            Err(err) => {
                self.transition(Transition::Failed(err.to_string()));
                Err(err)
            }
        }
    }

    /// Distinct (book, chapter) pairs from the mirror, newest first.
    pub fn recent_books(&self, limit: usize) -> Vec<&RemoteHistoryEntry> {
        let mut seen = HashSet::new();
        self.entries()
            .iter()
            .filter(|e| seen.insert((e.book.as_str(), e.chapter)))
            .take(limit)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::user::memory::MemoryBackend;
    use crate::user::session::AuthUser;

    fn repo(backend: &Rc<MemoryBackend>) -> RemoteHistory<MemoryBackend> {
        RemoteHistory::new(backend.clone(), Session::signed_in(AuthUser::new("u1")))
    }

    #[tokio::test]
    async fn rereading_updates_the_single_row() {
        let backend = Rc::new(MemoryBackend::new());
        let mut history = repo(&backend);

        history.update("John", 3, 20).await.unwrap();
        history.update("Romans", 8, 50).await.unwrap();
        let entry = history.update("John", 3, 140).await.unwrap().unwrap();

        assert_eq!(entry.progress, 100);
        assert_eq!(backend.rows(Table::ReadingHistory).len(), 2);
        assert_eq!(history.entries()[0].book, "John");
        assert_eq!(history.entries().len(), 2);
    }

    #[tokio::test]
    async fn refresh_orders_by_last_read() {
        let backend = Rc::new(MemoryBackend::new());
        let mut history = repo(&backend);
        history.update("Genesis", 1, 10).await.unwrap();
        history.update("Exodus", 2, 10).await.unwrap();

        let mut fresh = repo(&backend);
        let books: Vec<_> = fresh
            .refresh()
            .await
            .unwrap()
            .iter()
            .map(|e| e.book.clone())
            .collect();
        assert_eq!(books, vec!["Exodus", "Genesis"]);
    }

    #[tokio::test]
    async fn recent_books_are_distinct_and_limited() {
        let backend = Rc::new(MemoryBackend::new());
        let mut history = repo(&backend);
        for chapter in 1..=12 {
            history.update("Psalms", chapter, 100).await.unwrap();
        }
        history.update("Psalms", 12, 100).await.unwrap();

        let recent = history.recent_books(10);
        assert_eq!(recent.len(), 10);
        assert_eq!(recent[0].chapter, 12);
    }

    #[tokio::test]
    async fn signed_out_update_is_a_no_op() {
        let backend = Rc::new(MemoryBackend::new());
        let mut history = RemoteHistory::new(backend.clone(), Session::anonymous());
        assert!(history.update("John", 1, 1).await.unwrap().is_none());
        assert!(backend.calls().is_empty());
    }
}
