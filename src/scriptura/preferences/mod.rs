//! Effective preferences and theme application.
//!
//! [`resolver::PreferenceResolver`] picks the authoritative copy,
//! [`mapping`] translates between the stored shapes, and
//! [`theme::ThemeController`] pushes the result to the presentation layer.

pub mod mapping;
pub mod resolver;
pub mod theme;
