use crate::error::{Result, ScripturaError};
use crate::preferences::mapping::canonical_to_remote;
use crate::store::local::LocalStore;
use crate::store::KeyValueStore;
use crate::user::backend::{to_row, Row, Table, UserBackend};
use crate::user::bookmarks::{BookmarkInsert, DEFAULT_BOOKMARK_TRANSLATION};
use crate::user::history::{HistoryUpsert, HISTORY_CONFLICT};
use crate::user::session::Session;
use std::fmt;
use std::rc::Rc;

/// Bookmarks are inserted in chunks of this size.
pub const BOOKMARK_BATCH_SIZE: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationStage {
    Bookmarks,
    Preferences,
    ReadingHistory,
}

impl MigrationStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            MigrationStage::Bookmarks => "bookmarks",
            MigrationStage::Preferences => "preferences",
            MigrationStage::ReadingHistory => "reading history",
        }
    }
}

impl fmt::Display for MigrationStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum MigrationState {
    #[default]
    Idle,
    Detecting,
    Migrating(MigrationStage),
    Completed,
    Failed {
        stage: MigrationStage,
        message: String,
    },
    Declined,
}

/// What a successful migration moved.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationReport {
    pub bookmarks: usize,
    pub preferences: bool,
    pub reading_history: usize,
}

/// One-shot transfer of device data into the signed-in user's remote store.
///
/// Stages run in order (bookmarks, preferences, reading history) and the
/// first failure stops the run. Stages already written stay written, and
/// local data is only wiped after every stage succeeded.
pub struct MigrationCoordinator<K: KeyValueStore, B: UserBackend> {
    local: Rc<LocalStore<K>>,
    backend: Rc<B>,
    session: Session,
    state: MigrationState,
    declined: bool,
}

impl<K: KeyValueStore, B: UserBackend> MigrationCoordinator<K, B> {
    pub fn new(local: Rc<LocalStore<K>>, backend: Rc<B>, session: Session) -> Self {
        Self {
            local,
            backend,
            session,
            state: MigrationState::Idle,
            declined: false,
        }
    }

    pub fn state(&self) -> &MigrationState {
        &self.state
    }

    /// Whether there is device data to offer for migration.
    ///
    /// Only bookmarks count: preferences or history alone do not trigger a
    /// migration. Once declined, this coordinator never offers again.
    pub fn detect(&mut self) -> Result<bool> {
        if self.declined || !self.session.is_authenticated() {
            return Ok(false);
        }
        self.state = MigrationState::Detecting;
        let found = !self.local.bookmarks()?.is_empty();
        self.state = MigrationState::Idle;
        tracing::debug!(found, "Checked for local data");
        Ok(found)
    }

    /// Keep local data where it is. Detection stays quiet for the rest of
    /// this coordinator's life.
    pub fn decline(&mut self) {
        tracing::info!("Migration declined");
        self.declined = true;
        self.state = MigrationState::Declined;
    }

    /// Run every stage. Once completed or declined, or with no local
    /// bookmarks, this returns an empty report without calling the backend.
    pub async fn migrate(&mut self) -> Result<MigrationReport> {
        let Some(user_id) = self.session.user_id() else {
            return Err(ScripturaError::Api("sign in before migrating".to_string()));
        };
        let mut report = MigrationReport::default();

        // Settled or empty runs stay off the backend entirely.
        if self.declined || self.state == MigrationState::Completed {
            tracing::debug!(state = ?self.state, "Migration already settled");
            return Ok(report);
        }
        if self.local.bookmarks()?.is_empty() {
            tracing::debug!("No local data to migrate");
            return Ok(report);
        }

        self.enter(MigrationStage::Bookmarks);
        report.bookmarks = self
            .migrate_bookmarks(&user_id)
            .await
            .map_err(|e| self.fail(MigrationStage::Bookmarks, e))?;

        self.enter(MigrationStage::Preferences);
        self.migrate_preferences(&user_id)
            .await
            .map_err(|e| self.fail(MigrationStage::Preferences, e))?;
        report.preferences = true;

        self.enter(MigrationStage::ReadingHistory);
        report.reading_history = self
            .migrate_history(&user_id)
            .await
            .map_err(|e| self.fail(MigrationStage::ReadingHistory, e))?;

        self.state = MigrationState::Completed;
        tracing::info!(
            bookmarks = report.bookmarks,
            reading_history = report.reading_history,
            "Migration completed"
        );
        self.local.clear_all()?;
        Ok(report)
    }

    fn enter(&mut self, stage: MigrationStage) {
        tracing::info!(%stage, "Migrating");
        self.state = MigrationState::Migrating(stage);
    }

    fn fail(&mut self, stage: MigrationStage, err: ScripturaError) -> ScripturaError {
        let message = match err {
            ScripturaError::Backend(message) => message,
            other => other.to_string(),
        };
        tracing::warn!(%stage, %message, "Migration stage failed");
        self.state = MigrationState::Failed {
            stage,
            message: message.clone(),
        };
        ScripturaError::Migration {
            stage: stage.to_string(),
            message,
        }
    }

    async fn migrate_bookmarks(&self, user_id: &str) -> Result<usize> {
        let rows = self
            .local
            .bookmarks()?
            .into_iter()
            .map(|b| {
                to_row(&BookmarkInsert {
                    user_id: user_id.to_string(),
                    book: b.book,
                    chapter: b.chapter,
                    verse_number: b.verse,
                    verse_text: b.text,
                    translation: DEFAULT_BOOKMARK_TRANSLATION.to_string(),
                    note: b.note,
                    is_favorite: b.is_favorite,
                    highlight_color: None,
                    created_at: Some(b.date_added.to_rfc3339()),
                })
            })
            .collect::<Result<Vec<Row>>>()?;

        for batch in rows.chunks(BOOKMARK_BATCH_SIZE) {
            self.backend
                .insert(Table::Bookmarks, batch.to_vec())
                .await?;
        }
        Ok(rows.len())
    }

    async fn migrate_preferences(&self, user_id: &str) -> Result<()> {
        let prefs = self.local.preferences()?;
        let mut row = to_row(&canonical_to_remote(&prefs))?;
        row.insert("user_id".into(), user_id.into());
        self.backend
            .upsert(Table::Profiles, vec![row], &["user_id"])
            .await?;
        Ok(())
    }

    async fn migrate_history(&self, user_id: &str) -> Result<usize> {
        let rows = self
            .local
            .reading_history()?
            .into_iter()
            .map(|h| {
                to_row(&HistoryUpsert {
                    user_id: user_id.to_string(),
                    book: h.book,
                    chapter: h.chapter,
                    progress: h.progress,
                    last_read_at: h.last_read_at,
                })
            })
            .collect::<Result<Vec<Row>>>()?;
        if rows.is_empty() {
            return Ok(0);
        }
        let count = rows.len();
        self.backend
            .upsert(Table::ReadingHistory, rows, &HISTORY_CONFLICT)
            .await?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{NewLocalBookmark, PreferencesPatch, Theme};
    use crate::store::memory::MemoryKv;
    use crate::user::backend::{eq, Operation};
    use crate::user::memory::MemoryBackend;
    use crate::user::session::AuthUser;

    struct Fixture {
        local: Rc<LocalStore<MemoryKv>>,
        backend: Rc<MemoryBackend>,
        coordinator: MigrationCoordinator<MemoryKv, MemoryBackend>,
    }

    fn fixture(bookmarks: u32) -> Fixture {
        let local = Rc::new(LocalStore::new(MemoryKv::new()));
        for verse in 1..=bookmarks {
            local
                .add_bookmark(NewLocalBookmark {
                    book: "Psalms".into(),
                    chapter: 119,
                    verse,
                    text: format!("verse {}", verse),
                    ..Default::default()
                })
                .unwrap();
        }
        let backend = Rc::new(MemoryBackend::new());
        let coordinator = MigrationCoordinator::new(
            local.clone(),
            backend.clone(),
            Session::signed_in(AuthUser::new("u1")),
        );
        Fixture {
            local,
            backend,
            coordinator,
        }
    }

    #[test]
    fn detection_looks_at_bookmarks_only() {
        let mut f = fixture(0);
        f.local
            .update_preferences(&PreferencesPatch::theme(Theme::Dark))
            .unwrap();
        f.local.update_reading_history("John", 1, 50).unwrap();
        assert!(!f.coordinator.detect().unwrap());

        let mut f = fixture(1);
        assert!(f.coordinator.detect().unwrap());
    }

    #[test]
    fn declining_silences_detection_for_this_coordinator() {
        let mut f = fixture(2);
        assert!(f.coordinator.detect().unwrap());
        f.coordinator.decline();
        assert_eq!(f.coordinator.state(), &MigrationState::Declined);
        assert!(!f.coordinator.detect().unwrap());
        assert_eq!(f.local.bookmarks().unwrap().len(), 2);

        let mut next_login = MigrationCoordinator::new(
            f.local.clone(),
            f.backend.clone(),
            Session::signed_in(AuthUser::new("u1")),
        );
        assert!(next_login.detect().unwrap());
    }

    #[tokio::test]
    async fn full_success_moves_everything_and_clears_local() {
        let mut f = fixture(3);
        f.local
            .update_preferences(&PreferencesPatch::theme(Theme::Dark))
            .unwrap();
        f.local.update_reading_history("John", 3, 80).unwrap();
        f.local.update_reading_history("John", 4, 10).unwrap();

        let report = f.coordinator.migrate().await.unwrap();
        assert_eq!(
            report,
            MigrationReport {
                bookmarks: 3,
                preferences: true,
                reading_history: 2,
            }
        );
        assert_eq!(f.coordinator.state(), &MigrationState::Completed);

        let bookmarks = f.backend.rows(Table::Bookmarks);
        assert_eq!(bookmarks.len(), 3);
        assert!(bookmarks.iter().all(|r| r["translation"] == "NIV"));
        let profiles = f.backend.rows(Table::Profiles);
        assert_eq!(profiles[0]["theme"], "dark");
        assert_eq!(f.backend.rows(Table::ReadingHistory).len(), 2);

        assert!(f.local.bookmarks().unwrap().is_empty());
        assert!(f.local.reading_history().unwrap().is_empty());
        assert_eq!(f.local.preferences().unwrap().theme, Theme::System);
    }

    #[tokio::test]
    async fn preferences_failure_keeps_bookmarks_remote_and_local_data() {
        let mut f = fixture(3);
        f.backend
            .fail_on(Table::Profiles, Operation::Upsert, "permission denied");

        let err = f.coordinator.migrate().await.unwrap_err();
        match err {
            ScripturaError::Migration { stage, message } => {
                assert_eq!(stage, "preferences");
                assert_eq!(message, "permission denied");
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(
            f.coordinator.state(),
            &MigrationState::Failed {
                stage: MigrationStage::Preferences,
                message: "permission denied".into(),
            }
        );
        assert_eq!(f.backend.rows(Table::Bookmarks).len(), 3);
        assert!(f.backend.rows(Table::ReadingHistory).is_empty());
        assert_eq!(f.local.bookmarks().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn bookmarks_are_inserted_in_batches() {
        let mut f = fixture(250);
        f.coordinator.migrate().await.unwrap();

        let inserts: Vec<usize> = f
            .backend
            .calls()
            .into_iter()
            .filter(|(t, op, _)| *t == Table::Bookmarks && *op == Operation::Insert)
            .map(|(_, _, n)| n)
            .collect();
        assert_eq!(inserts, vec![100, 100, 50]);
    }

    #[tokio::test]
    async fn batch_failure_aborts_before_later_stages() {
        let mut f = fixture(5);
        f.backend
            .fail_on(Table::Bookmarks, Operation::Insert, "too large");
        assert!(f.coordinator.migrate().await.is_err());
        assert!(f
            .backend
            .calls()
            .iter()
            .all(|(t, _, _)| *t == Table::Bookmarks));
        assert_eq!(f.local.bookmarks().unwrap().len(), 5);
    }

    #[tokio::test]
    async fn second_run_leaves_the_remote_profile_alone() {
        let mut f = fixture(2);
        f.coordinator.migrate().await.unwrap();

        let mut patch = Row::new();
        patch.insert("theme".into(), "dark".into());
        f.backend
            .update(Table::Profiles, &[eq("user_id", "u1")], patch)
            .await
            .unwrap();
        let calls_before = f.backend.calls().len();

        let report = f.coordinator.migrate().await.unwrap();
        assert_eq!(report, MigrationReport::default());
        assert_eq!(f.backend.calls().len(), calls_before);
        assert_eq!(f.backend.rows(Table::Profiles)[0]["theme"], "dark");
    }

    #[tokio::test]
    async fn declined_or_empty_runs_skip_the_backend() {
        let mut f = fixture(2);
        f.coordinator.decline();
        assert_eq!(
            f.coordinator.migrate().await.unwrap(),
            MigrationReport::default()
        );
        assert_eq!(f.local.bookmarks().unwrap().len(), 2);

        let mut empty = fixture(0);
        empty
            .local
            .update_preferences(&PreferencesPatch::theme(Theme::Light))
            .unwrap();
        assert_eq!(
            empty.coordinator.migrate().await.unwrap(),
            MigrationReport::default()
        );

        assert!(f.backend.calls().is_empty());
        assert!(empty.backend.calls().is_empty());
        assert_eq!(empty.coordinator.state(), &MigrationState::Idle);
    }

    #[tokio::test]
    async fn signed_out_migration_is_refused() {
        let local = Rc::new(LocalStore::new(MemoryKv::new()));
        let backend = Rc::new(MemoryBackend::new());
        let mut coordinator = MigrationCoordinator::new(local, backend, Session::anonymous());
        assert!(!coordinator.detect().unwrap());
        assert!(matches!(
            coordinator.migrate().await,
            Err(ScripturaError::Api(_))
        ));
    }
}
