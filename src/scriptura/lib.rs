//! # Scriptura Architecture
//!
//! Scriptura is the **offline-aware core of a scripture-reading app**: where a
//! chapter's text comes from, how a reader's bookmarks, preferences and
//! reading history are kept on the device or in their account, and how the
//! two are reconciled when they first sign in. Page layout, navigation and
//! forms live in whatever UI sits on top; the bundled CLI is one such UI.
//!
//! ## Layers
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  CLI Layer (cli/, wired by main.rs)                         │
//! │  - Parses arguments, formats output, handles terminal I/O   │
//! │  - The ONLY place that knows about stdout/stderr/exit codes │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  API Layer (api.rs)                                         │
//! │  - Owns one instance of every component                     │
//! │  - Routes to device or account storage by session state     │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!          ┌───────────────┬───┴───────────┬───────────────┐
//!          ▼               ▼               ▼               ▼
//!     content/        preferences/       sync/           user/
//!   source, cache,    resolver,        migration     remote user store
//!   resolver          mapping, theme
//!          │               │               │               │
//!          └───────────────┴───────┬───────┴───────────────┘
//!                                  ▼
//!                    store/ (device key-value documents)
//! ```
//!
//! ## Where content comes from
//!
//! A chapter request is answered by the first of:
//!
//! 1. the device's saved copy, but only while offline;
//! 2. the remote provider (and the answer is saved for offline use);
//! 3. the bundled sample verses for that exact chapter;
//! 4. nothing: [`content::resolver::ChapterLoad::NoContent`].
//!
//! ## Single-threaded by construction
//!
//! Everything runs on one thread. Shared handles are `Rc`, interior state is
//! `Cell`/`RefCell`, and async traits are declared `?Send`. Network calls are
//! awaited; device storage calls are synchronous.
//!
//! ## Error Handling
//!
//! All fallible operations return [`error::Result`]. Content transport
//! failures are the exception: they are logged and turned into fallbacks,
//! never errors.
//!
//! ## Logging
//!
//! The library emits `tracing` events and never installs a subscriber.
//!
//! ## Module Overview
//!
//! - [`api`]: The facade every UI client uses
//! - [`content`]: Remote content source, cache and resolver
//! - [`store`]: Device key-value storage and the local store
//! - [`user`]: Remote per-user store and session
//! - [`sync`]: First sign-in migration
//! - [`preferences`]: Effective preferences and theme application
//! - [`catalog`]: Books, translations and bundled verses
//! - [`model`]: Core data types
//! - [`config`]: Configuration management
//! - [`error`]: Error types
//! - `cli`: Argument parsing and terminal rendering for the binary (not part of the lib API)

pub mod api;
pub mod catalog;
pub mod config;
pub mod content;
pub mod error;
pub mod model;
pub mod preferences;
pub mod store;
pub mod sync;
pub mod user;
