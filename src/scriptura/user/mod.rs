//! # Remote User Store
//!
//! Per-user bookmarks, reading history and profile preferences held by a
//! hosted backend. Every operation requires an authenticated [`Session`];
//! signed out, reads come back empty and writes are no-ops.
//!
//! ## Layers
//!
//! - [`backend::UserBackend`]: row-level access (select/insert/update/delete/upsert)
//!   to the three tables. [`rest::RestBackend`] talks PostgREST over HTTP,
//!   [`memory::MemoryBackend`] keeps rows in memory for tests.
//! - Repositories ([`bookmarks::RemoteBookmarks`], [`history::RemoteHistory`],
//!   [`preferences::RemotePreferences`]) hold a mirror of the user's rows as a
//!   [`state::Resource`] and keep it in step with each successful write.
//!
//! Mirrors are per-repository: two repositories over the same backend do not
//! see each other's writes until they refresh.

pub mod backend;
pub mod bookmarks;
pub mod history;
pub mod memory;
pub mod preferences;
pub mod rest;
pub mod session;
pub mod state;

use self::backend::UserBackend;
use self::bookmarks::RemoteBookmarks;
use self::history::RemoteHistory;
use self::preferences::RemotePreferences;
use self::session::Session;
use crate::error::Result;
use std::rc::Rc;

/// Bookmarks and reading history for the signed-in user, over one backend.
pub struct UserStore<B: UserBackend> {
    backend: Rc<B>,
    session: Session,
    pub bookmarks: RemoteBookmarks<B>,
    pub history: RemoteHistory<B>,
}

impl<B: UserBackend> UserStore<B> {
    pub fn new(backend: Rc<B>, session: Session) -> Self {
        Self {
            bookmarks: RemoteBookmarks::new(backend.clone(), session.clone()),
            history: RemoteHistory::new(backend.clone(), session.clone()),
            backend,
            session,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn backend(&self) -> &Rc<B> {
        &self.backend
    }

    /// A profile-preferences repository sharing this store's backend and session.
    pub fn preferences(&self) -> RemotePreferences<B> {
        RemotePreferences::new(self.backend.clone(), self.session.clone())
    }

    /// Reload both mirrors.
    pub async fn refresh(&mut self) -> Result<()> {
        self.bookmarks.refresh().await?;
        self.history.refresh().await?;
        Ok(())
    }
}
