//! # Content Layer
//!
//! Verse text from the remote provider, with an in-memory cache in front of
//! it and the device's offline chapter store and bundled verses behind it.
//!
//! - [`transport::VerseTransport`]: the provider seam. [`transport::HttpTransport`]
//!   speaks the bible-api.com URL scheme.
//! - [`cache::ContentCache`]: injected cache. Keys always carry a translation.
//! - [`source::ContentSource`]: fetch + cache, absorbing transport failures.
//! - [`resolver::ContentResolver`]: picks offline copy, network or bundled
//!   fallback for each request and writes fetched chapters through.

pub mod cache;
pub mod resolver;
pub mod source;
pub mod transport;
