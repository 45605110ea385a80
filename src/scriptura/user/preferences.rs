use super::backend::{eq, from_rows, to_row, Table, UserBackend};
use super::session::Session;
use super::state::{reduce, Resource, Transition};
use crate::error::{Result, ScripturaError};
use serde::{Deserialize, Serialize};
use std::rc::Rc;

/// The preference columns of a `profiles` row.
///
/// Values are kept as plain strings so a profile written by another client
/// with an unknown theme or size still loads; mapping to the typed
/// preferences happens in `preferences::mapping`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileRow {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub user_id: String,
    #[serde(default)]
    pub preferred_translation: Option<String>,
    #[serde(default)]
    pub theme: Option<String>,
    #[serde(default)]
    pub font_size: Option<String>,
    #[serde(default)]
    pub daily_reminders: Option<bool>,
    #[serde(default)]
    pub reminder_time: Option<String>,
}

/// Columns to change on the profile row. Unset fields are not sent.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProfilePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preferred_translation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub theme: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_size: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub daily_reminders: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reminder_time: Option<String>,
}

impl ProfilePatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

pub struct RemotePreferences<B: UserBackend> {
    backend: Rc<B>,
    session: Session,
    state: Resource<Option<ProfileRow>>,
}

impl<B: UserBackend> RemotePreferences<B> {
    pub fn new(backend: Rc<B>, session: Session) -> Self {
        Self {
            backend,
            session,
            state: Resource::default(),
        }
    }

    pub fn state(&self) -> &Resource<Option<ProfileRow>> {
        &self.state
    }

    /// The mirrored profile, if it belongs to the current session user.
    pub fn profile(&self) -> Option<&ProfileRow> {
        let current = self.session.user_id()?;
        self.state
            .data
            .as_ref()
            .filter(|profile| profile.user_id == current)
    }

    fn transition(&mut self, t: Transition<Option<ProfileRow>>) {
        self.state = reduce(std::mem::take(&mut self.state), t);
    }

    /// Load the user's profile row. A missing row is not an error.
    pub async fn refresh(&mut self) -> Result<Option<&ProfileRow>> {
        let Some(user_id) = self.session.user_id() else {
            self.transition(Transition::Reset);
            return Ok(None);
        };
        self.transition(Transition::Started);

        match self
            .backend
            .select(Table::Profiles, &[eq("user_id", user_id)], None)
            .await
            .and_then(from_rows::<ProfileRow>)
        {
            Ok(mut rows) => {
                self.transition(Transition::Loaded(rows.pop()));
                Ok(self.profile())
            }
            Err(err) => {
                self.transition(Transition::Failed(err.to_string()));
                Err(err)
            }
        }
    }

    /// Write the changed columns, creating the profile row if needed.
    pub async fn update(&mut self, patch: &ProfilePatch) -> Result<Option<&ProfileRow>> {
        let Some(user_id) = self.session.user_id() else {
            return Ok(None);
        };
        if patch.is_empty() {
            return Ok(self.profile());
        }

        let result = to_row(patch).map(|mut row| {
            row.insert("user_id".into(), user_id.into());
            row
        });
        let written = match result {
            Ok(row) => self
                .backend
                .upsert(Table::Profiles, vec![row], &["user_id"])
                .await
                .and_then(from_rows::<ProfileRow>),
            Err(err) => Err(err),
        };

        match written.and_then(|mut rows| {
            rows.pop()
                .ok_or_else(|| ScripturaError::Backend("upsert returned no row".into()))
        }) {
            Ok(profile) => {
                self.transition(Transition::Patched(profile));
                Ok(self.profile())
            }
            Err(err) => {
                self.transition(Transition::Failed(err.to_string()));
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::user::backend::Operation;
    use crate::user::memory::MemoryBackend;
    use crate::user::session::AuthUser;

    fn repo(backend: &Rc<MemoryBackend>) -> RemotePreferences<MemoryBackend> {
        RemotePreferences::new(backend.clone(), Session::signed_in(AuthUser::new("u1")))
    }

    #[tokio::test]
    async fn missing_profile_loads_as_none() {
        let backend = Rc::new(MemoryBackend::new());
        let mut prefs = repo(&backend);
        assert!(prefs.refresh().await.unwrap().is_none());
        assert!(!prefs.state().loading);
    }

    #[tokio::test]
    async fn update_creates_then_merges_profile() {
        let backend = Rc::new(MemoryBackend::new());
        let mut prefs = repo(&backend);

        prefs
            .update(&ProfilePatch {
                theme: Some("dark".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        let profile = prefs
            .update(&ProfilePatch {
                font_size: Some("large".into()),
                ..Default::default()
            })
            .await
            .unwrap()
            .cloned()
            .unwrap();

        assert_eq!(profile.theme.as_deref(), Some("dark"));
        assert_eq!(profile.font_size.as_deref(), Some("large"));
        assert_eq!(backend.rows(Table::Profiles).len(), 1);
    }

    #[tokio::test]
    async fn empty_patch_skips_the_backend() {
        let backend = Rc::new(MemoryBackend::new());
        let mut prefs = repo(&backend);
        prefs.update(&ProfilePatch::default()).await.unwrap();
        assert!(backend.calls().is_empty());
    }

    #[tokio::test]
    async fn profile_is_hidden_from_other_users() {
        let backend = Rc::new(MemoryBackend::new());
        let session = Session::signed_in(AuthUser::new("u1"));
        let mut prefs = RemotePreferences::new(backend.clone(), session.clone());
        prefs
            .update(&ProfilePatch {
                theme: Some("dark".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert!(prefs.profile().is_some());

        session.sign_in(AuthUser::new("u2"));
        assert!(prefs.profile().is_none());
        session.sign_out();
        assert!(prefs.profile().is_none());
    }

    #[tokio::test]
    async fn failed_update_is_reported() {
        let backend = Rc::new(MemoryBackend::new());
        backend.fail_on(Table::Profiles, Operation::Upsert, "denied");
        let mut prefs = repo(&backend);
        let err = prefs
            .update(&ProfilePatch {
                theme: Some("light".into()),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ScripturaError::Backend(_)));
        assert!(prefs.state().error.is_some());
        assert!(prefs.profile().is_none());
    }
}
