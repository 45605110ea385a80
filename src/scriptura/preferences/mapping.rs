//! Conversions between the canonical [`UserPreferences`] and the two stored
//! shapes: the device document ([`StoredPreferences`], camelCase, every field
//! optional) and the remote profile row ([`ProfileRow`], snake_case, no
//! `fontFamily` or `autoScroll` columns).

use crate::model::{PreferencesPatch, UserPreferences};
use crate::store::local::StoredPreferences;
use crate::user::preferences::{ProfilePatch, ProfileRow};
use std::str::FromStr;

pub fn local_to_canonical(stored: &StoredPreferences) -> UserPreferences {
    let defaults = UserPreferences::default();
    UserPreferences {
        theme: stored.theme.unwrap_or(defaults.theme),
        font_size: stored.font_size.unwrap_or(defaults.font_size),
        font_family: stored.font_family.unwrap_or(defaults.font_family),
        auto_scroll: stored.auto_scroll.unwrap_or(defaults.auto_scroll),
        daily_reminders: stored.daily_reminders.unwrap_or(defaults.daily_reminders),
        reminder_time: stored
            .reminder_time
            .clone()
            .unwrap_or(defaults.reminder_time),
        preferred_translation: stored
            .preferred_translation
            .clone()
            .unwrap_or(defaults.preferred_translation),
    }
}

pub fn canonical_to_local(prefs: &UserPreferences) -> StoredPreferences {
    StoredPreferences {
        theme: Some(prefs.theme),
        font_size: Some(prefs.font_size),
        font_family: Some(prefs.font_family),
        auto_scroll: Some(prefs.auto_scroll),
        daily_reminders: Some(prefs.daily_reminders),
        reminder_time: Some(prefs.reminder_time.clone()),
        preferred_translation: Some(prefs.preferred_translation.clone()),
    }
}

fn parse_or<T: FromStr + Copy>(value: Option<&str>, fallback: T) -> T {
    value.and_then(|v| v.parse().ok()).unwrap_or(fallback)
}

/// `fontFamily` and `autoScroll` have no remote columns and always take the
/// local defaults. Unrecognized values fall back to defaults as well.
pub fn remote_to_canonical(row: &ProfileRow) -> UserPreferences {
    let defaults = UserPreferences::default();
    UserPreferences {
        theme: parse_or(row.theme.as_deref(), defaults.theme),
        font_size: parse_or(row.font_size.as_deref(), defaults.font_size),
        font_family: defaults.font_family,
        auto_scroll: defaults.auto_scroll,
        daily_reminders: row.daily_reminders.unwrap_or(defaults.daily_reminders),
        reminder_time: row
            .reminder_time
            .clone()
            .unwrap_or(defaults.reminder_time),
        preferred_translation: row
            .preferred_translation
            .clone()
            .unwrap_or(defaults.preferred_translation),
    }
}

/// The remote-storable part of a patch. Font family and auto-scroll are dropped.
pub fn patch_to_remote(patch: &PreferencesPatch) -> ProfilePatch {
    ProfilePatch {
        preferred_translation: patch.preferred_translation.clone(),
        theme: patch.theme.map(|t| t.as_str().to_string()),
        font_size: patch.font_size.map(|s| s.as_str().to_string()),
        daily_reminders: patch.daily_reminders,
        reminder_time: patch.reminder_time.clone(),
    }
}

/// Fields of `patch` that the remote profile has no column for.
pub fn remote_dropped_fields(patch: &PreferencesPatch) -> Vec<&'static str> {
    let mut dropped = Vec::new();
    if patch.font_family.is_some() {
        dropped.push("fontFamily");
    }
    if patch.auto_scroll.is_some() {
        dropped.push("autoScroll");
    }
    dropped
}

/// Every remote column of a full preference set, as written by migration.
pub fn canonical_to_remote(prefs: &UserPreferences) -> ProfilePatch {
    ProfilePatch {
        preferred_translation: Some(prefs.preferred_translation.clone()),
        theme: Some(prefs.theme.as_str().to_string()),
        font_size: Some(prefs.font_size.as_str().to_string()),
        daily_reminders: Some(prefs.daily_reminders),
        reminder_time: Some(prefs.reminder_time.clone()),
    }
}
