use super::mapping::{patch_to_remote, remote_to_canonical};
use super::theme::ThemeController;
use crate::error::Result;
use crate::model::{PreferencesPatch, Theme, UserPreferences};
use crate::store::local::LocalStore;
use crate::store::KeyValueStore;
use crate::user::backend::UserBackend;
use crate::user::preferences::RemotePreferences;
use crate::user::session::Session;
use std::rc::Rc;

/// Which copy the effective preferences came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreferenceSource {
    Local,
    Remote,
}

/// The single effective preference set, whichever store holds it.
///
/// Signed in with a remote profile loaded, the profile wins; otherwise the
/// device copy is used. Writes follow the same rule and never touch both.
pub struct PreferenceResolver<K: KeyValueStore, B: UserBackend> {
    local: Rc<LocalStore<K>>,
    remote: RemotePreferences<B>,
    session: Session,
    theme: Rc<ThemeController>,
}

impl<K: KeyValueStore, B: UserBackend> PreferenceResolver<K, B> {
    pub fn new(
        local: Rc<LocalStore<K>>,
        remote: RemotePreferences<B>,
        session: Session,
        theme: Rc<ThemeController>,
    ) -> Self {
        Self {
            local,
            remote,
            session,
            theme,
        }
    }

    pub fn source(&self) -> PreferenceSource {
        if self.session.is_authenticated() && self.remote.profile().is_some() {
            PreferenceSource::Remote
        } else {
            PreferenceSource::Local
        }
    }

    pub fn effective(&self) -> Result<UserPreferences> {
        match (self.source(), self.remote.profile()) {
            (PreferenceSource::Remote, Some(profile)) => Ok(remote_to_canonical(profile)),
            _ => self.local.preferences(),
        }
    }

    /// Load the remote profile (when signed in) and apply the effective theme.
    pub async fn refresh(&mut self) -> Result<UserPreferences> {
        if self.session.is_authenticated() {
            self.remote.refresh().await?;
        }
        let prefs = self.effective()?;
        self.theme.apply(prefs.theme);
        Ok(prefs)
    }

    /// Apply a partial update to the authoritative copy.
    ///
    /// Signed in, only the remote profile is written, so `fontFamily` and
    /// `autoScroll` changes have nowhere to go and are dropped. The theme is
    /// applied once the write succeeds; signed out, the local store applies it.
    pub async fn update(&mut self, patch: &PreferencesPatch) -> Result<UserPreferences> {
        if !self.session.is_authenticated() {
            return self.local.update_preferences(patch);
        }

        tracing::debug!("Routing preference update to remote profile");
        self.remote.update(&patch_to_remote(patch)).await?;
        if let Some(theme) = patch.theme {
            self.theme.apply(theme);
        }
        self.effective()
    }

    pub fn system_preference_changed(&self, dark: bool) {
        self.theme.system_preference_changed(dark);
    }

    /// Wipe every local document and return to the default theme.
    pub fn reset(&self) -> Result<()> {
        self.local.clear_all()?;
        self.theme.apply(Theme::default());
        Ok(())
    }
}
