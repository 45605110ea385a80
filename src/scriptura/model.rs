use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One addressable unit of text. Immutable once fetched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verse {
    pub book: String,
    pub chapter: u32,
    pub verse: u32,
    pub text: String,
}

impl Verse {
    pub fn new(book: impl Into<String>, chapter: u32, verse: u32, text: impl Into<String>) -> Self {
        Self {
            book: book.into(),
            chapter,
            verse,
            text: text.into(),
        }
    }

    pub fn reference(&self) -> String {
        format!("{} {}:{}", self.book, self.chapter, self.verse)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chapter {
    pub book: String,
    pub chapter: u32,
    pub verses: Vec<Verse>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Testament {
    Old,
    New,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Book {
    pub id: String,
    pub name: String,
    pub chapter_count: u32,
    pub testament: Testament,
}

impl Book {
    pub fn has_chapter(&self, chapter: u32) -> bool {
        (1..=self.chapter_count).contains(&chapter)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Translation {
    pub id: String,
    pub name: String,
    pub abbreviation: String,
    pub language: String,
    pub description: String,
}

/// A bookmark kept in the device-local store.
///
/// Unique per (book, chapter, verse): re-adding the same verse overwrites
/// the existing entry in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookmarkedVerse {
    pub id: String,
    pub book: String,
    pub chapter: u32,
    pub verse: u32,
    pub text: String,
    pub date_added: DateTime<Utc>,
    #[serde(default)]
    pub is_favorite: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

impl BookmarkedVerse {
    pub fn same_verse(&self, book: &str, chapter: u32, verse: u32) -> bool {
        self.book == book && self.chapter == chapter && self.verse == verse
    }
}

/// Caller-provided fields for a new local bookmark; id and date are assigned by the store.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewLocalBookmark {
    pub book: String,
    pub chapter: u32,
    pub verse: u32,
    pub text: String,
    pub is_favorite: bool,
    pub note: Option<String>,
    pub tags: Option<Vec<String>>,
}

/// A bookmark row owned by an authenticated user in the remote store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bookmark {
    pub id: String,
    pub user_id: String,
    pub book: String,
    pub chapter: u32,
    pub verse_number: u32,
    pub verse_text: String,
    pub translation: String,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub is_favorite: bool,
    #[serde(default)]
    pub highlight_color: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewBookmark {
    pub book: String,
    pub chapter: u32,
    pub verse_number: u32,
    pub verse_text: String,
    pub translation: Option<String>,
    pub note: Option<String>,
    pub highlight_color: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    Dark,
    #[default]
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FontSize {
    Small,
    #[default]
    Medium,
    Large,
    Xl,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FontFamily {
    #[default]
    Inter,
    Playfair,
    System,
}

macro_rules! lowercase_enum_text {
    ($ty:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $ty {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($ty::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_lowercase().as_str() {
                    $($text => Ok($ty::$variant),)+
                    other => Err(format!(
                        "invalid {}: {}",
                        stringify!($ty).to_lowercase(),
                        other
                    )),
                }
            }
        }
    };
}

lowercase_enum_text!(Theme { Light => "light", Dark => "dark", System => "system" });
lowercase_enum_text!(FontSize {
    Small => "small",
    Medium => "medium",
    Large => "large",
    Xl => "xl"
});
lowercase_enum_text!(FontFamily { Inter => "inter", Playfair => "playfair", System => "system" });

/// The single effective preference set handed to UI consumers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPreferences {
    pub theme: Theme,
    pub font_size: FontSize,
    pub font_family: FontFamily,
    pub auto_scroll: bool,
    pub daily_reminders: bool,
    pub reminder_time: String,
    pub preferred_translation: String,
}

impl Default for UserPreferences {
    fn default() -> Self {
        Self {
            theme: Theme::System,
            font_size: FontSize::Medium,
            font_family: FontFamily::Inter,
            auto_scroll: false,
            daily_reminders: true,
            reminder_time: "08:00".to_string(),
            preferred_translation: "kjv".to_string(),
        }
    }
}

/// A partial preference update. Unset fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreferencesPatch {
    pub theme: Option<Theme>,
    pub font_size: Option<FontSize>,
    pub font_family: Option<FontFamily>,
    pub auto_scroll: Option<bool>,
    pub daily_reminders: Option<bool>,
    pub reminder_time: Option<String>,
    pub preferred_translation: Option<String>,
}

impl PreferencesPatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn theme(theme: Theme) -> Self {
        Self {
            theme: Some(theme),
            ..Self::default()
        }
    }

    pub fn apply_to(&self, prefs: &mut UserPreferences) {
        if let Some(theme) = self.theme {
            prefs.theme = theme;
        }
        if let Some(size) = self.font_size {
            prefs.font_size = size;
        }
        if let Some(family) = self.font_family {
            prefs.font_family = family;
        }
        if let Some(auto_scroll) = self.auto_scroll {
            prefs.auto_scroll = auto_scroll;
        }
        if let Some(daily) = self.daily_reminders {
            prefs.daily_reminders = daily;
        }
        if let Some(time) = &self.reminder_time {
            prefs.reminder_time = time.clone();
        }
        if let Some(translation) = &self.preferred_translation {
            prefs.preferred_translation = translation.clone();
        }
    }
}

/// Local reading history entry, unique per (book, chapter).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadingHistoryEntry {
    pub book: String,
    pub chapter: u32,
    #[serde(rename = "lastRead", alias = "lastReadAt")]
    pub last_read_at: DateTime<Utc>,
    #[serde(default)]
    pub progress: u8,
}

/// Reading history row in the remote store, unique per (user, book, chapter).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteHistoryEntry {
    pub id: String,
    pub user_id: String,
    pub book: String,
    pub chapter: u32,
    #[serde(default)]
    pub progress: u8,
    pub last_read_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OfflineChapter {
    pub verses: Vec<Verse>,
    pub saved_at: DateTime<Utc>,
}

/// Progress is a percentage; anything above 100 is clamped.
pub fn clamp_progress(progress: u32) -> u8 {
    progress.min(100) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preferences_defaults_match_documented_values() {
        let prefs = UserPreferences::default();
        assert_eq!(prefs.theme, Theme::System);
        assert_eq!(prefs.font_size, FontSize::Medium);
        assert_eq!(prefs.reminder_time, "08:00");
        assert_eq!(prefs.preferred_translation, "kjv");
        assert!(prefs.daily_reminders);
        assert!(!prefs.auto_scroll);
    }

    #[test]
    fn patch_only_touches_set_fields() {
        let mut prefs = UserPreferences::default();
        let patch = PreferencesPatch {
            font_size: Some(FontSize::Xl),
            reminder_time: Some("21:30".into()),
            ..Default::default()
        };
        patch.apply_to(&mut prefs);
        assert_eq!(prefs.font_size, FontSize::Xl);
        assert_eq!(prefs.reminder_time, "21:30");
        assert_eq!(prefs.theme, Theme::System);
    }

    #[test]
    fn enums_parse_case_insensitively() {
        assert_eq!("Dark".parse::<Theme>().unwrap(), Theme::Dark);
        assert_eq!("XL".parse::<FontSize>().unwrap(), FontSize::Xl);
        assert!("sepia".parse::<Theme>().is_err());
    }

    #[test]
    fn history_entry_accepts_both_timestamp_names() {
        let a: ReadingHistoryEntry = serde_json::from_str(
            r#"{"book":"John","chapter":3,"lastRead":"2024-01-01T00:00:00Z","progress":40}"#,
        )
        .unwrap();
        let b: ReadingHistoryEntry = serde_json::from_str(
            r#"{"book":"John","chapter":3,"lastReadAt":"2024-01-01T00:00:00Z","progress":40}"#,
        )
        .unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn clamp_progress_caps_at_hundred() {
        assert_eq!(clamp_progress(250), 100);
        assert_eq!(clamp_progress(42), 42);
    }
}
