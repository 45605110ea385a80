//! # Storage Layer
//!
//! Device-local persistence. Everything here is synchronous and has no
//! dependency on the network or on authentication.
//!
//! ## Two levels
//!
//! - [`KeyValueStore`]: raw string documents under fixed keys. This is the
//!   "how" (filesystem vs memory).
//! - [`local::LocalStore`]: the "what": bookmarks, preferences, reading
//!   history and the offline chapter cache, each serialized as one JSON
//!   document under its own key.
//!
//! ## Implementations
//!
//! - [`fs::FsKv`]: production storage, one file per key in a data directory,
//!   written atomically (tmp file then rename).
//! - [`memory::MemoryKv`]: in-memory storage for tests, with write-error
//!   simulation.
//!
//! ## Storage Format
//!
//! ```text
//! <data dir>/
//! ├── scriptura_bookmarks.json
//! ├── scriptura_preferences.json
//! ├── scriptura_reading_history.json
//! └── scriptura_offline_chapters.json
//! ```
//!
//! The four documents are independent: clearing or importing touches each
//! key separately, so there is no cross-document atomicity.

use crate::error::Result;

pub mod fs;
pub mod local;
pub mod memory;
pub mod transfer;

pub const BOOKMARKS_KEY: &str = "scriptura_bookmarks";
pub const PREFERENCES_KEY: &str = "scriptura_preferences";
pub const READING_HISTORY_KEY: &str = "scriptura_reading_history";
pub const OFFLINE_CHAPTERS_KEY: &str = "scriptura_offline_chapters";

pub const ALL_KEYS: [&str; 4] = [
    BOOKMARKS_KEY,
    PREFERENCES_KEY,
    READING_HISTORY_KEY,
    OFFLINE_CHAPTERS_KEY,
];

/// Abstract interface for synchronous key-value device storage.
///
/// All methods take `&self`: implementations use interior mutability since
/// the application is single-threaded.
pub trait KeyValueStore {
    /// Read the raw document stored under `key`.
    /// Returns Ok(None) when nothing is stored.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Store `value` under `key`, replacing any previous document.
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Remove the document under `key`. Removing a missing key is not an error.
    fn remove(&self, key: &str) -> Result<()>;
}
