//! Export/import document for moving local data between devices or backups.

use super::local::{StoredPreferences, HISTORY_LIMIT};
use crate::error::{Result, ScripturaError};
use crate::model::{clamp_progress, BookmarkedVerse, ReadingHistoryEntry, UserPreferences};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportDocument {
    pub bookmarks: Vec<BookmarkedVerse>,
    pub preferences: UserPreferences,
    pub reading_history: Vec<ReadingHistoryEntry>,
    pub export_date: DateTime<Utc>,
}

/// An import after validation: each field is present only if the source carried it.
#[derive(Debug, Default)]
pub struct ImportDocument {
    pub bookmarks: Option<Vec<BookmarkedVerse>>,
    pub preferences: Option<StoredPreferences>,
    pub reading_history: Option<Vec<ReadingHistoryEntry>>,
}

impl ImportDocument {
    /// Hold imported lists to the same rules the store enforces on its own
    /// writes: one bookmark per verse (the first wins), one history entry per
    /// chapter (the newest wins), newest first, progress clamped, capped at
    /// [`HISTORY_LIMIT`].
    pub fn normalize(&mut self) {
        if let Some(bookmarks) = &mut self.bookmarks {
            let mut seen = HashSet::new();
            bookmarks.retain(|b| seen.insert((b.book.clone(), b.chapter, b.verse)));
        }
        if let Some(history) = &mut self.reading_history {
            history.sort_by(|a, b| b.last_read_at.cmp(&a.last_read_at));
            let mut seen = HashSet::new();
            history.retain(|h| seen.insert((h.book.clone(), h.chapter)));
            for entry in history.iter_mut() {
                entry.progress = clamp_progress(entry.progress.into());
            }
            history.truncate(HISTORY_LIMIT);
        }
    }
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub bookmarks: Option<usize>,
    pub preferences: bool,
    pub reading_history: Option<usize>,
}

/// Parse, validate and normalize an import document without touching storage.
///
/// The top level must be an object. Missing or null fields are skipped;
/// a field that is present but has the wrong shape fails the whole import.
pub fn parse_import(json: &str) -> Result<ImportDocument> {
    let value: Value = serde_json::from_str(json)
        .map_err(|e| ScripturaError::Import(format!("not valid JSON: {}", e)))?;
    let Value::Object(map) = value else {
        return Err(ScripturaError::Import(
            "expected a JSON object at the top level".to_string(),
        ));
    };

    let mut doc = ImportDocument {
        bookmarks: field(&map, "bookmarks")?,
        preferences: field(&map, "preferences")?,
        reading_history: field(&map, "readingHistory")?,
    };
    doc.normalize();
    Ok(doc)
}

fn field<T: DeserializeOwned>(map: &Map<String, Value>, name: &str) -> Result<Option<T>> {
    match map.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(raw) => serde_json::from_value(raw.clone())
            .map(Some)
            .map_err(|e| ScripturaError::Import(format!("invalid `{}`: {}", name, e))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_imports_nothing() {
        let doc = parse_import("{}").unwrap();
        assert!(doc.bookmarks.is_none());
        assert!(doc.preferences.is_none());
        assert!(doc.reading_history.is_none());
    }

    #[test]
    fn null_fields_are_skipped() {
        let doc = parse_import(r#"{"bookmarks":null,"readingHistory":[]}"#).unwrap();
        assert!(doc.bookmarks.is_none());
        assert_eq!(doc.reading_history.unwrap().len(), 0);
    }

    #[test]
    fn wrong_shape_names_the_field() {
        let err = parse_import(r#"{"readingHistory":{"a":1}}"#).unwrap_err();
        assert!(err.to_string().contains("readingHistory"));
    }

    #[test]
    fn export_date_field_is_ignored_on_import() {
        let doc =
            parse_import(r#"{"exportDate":"2024-01-01T00:00:00Z","preferences":{}}"#).unwrap();
        assert_eq!(doc.preferences, Some(StoredPreferences::default()));
    }
}
