//! Static reference data: the book canon, the translation catalog, and the
//! small set of verses bundled with the application for offline fallback.

use crate::model::{Book, Testament, Translation, Verse};
use chrono::{Datelike, NaiveDate};
use once_cell::sync::Lazy;

pub const DEFAULT_TRANSLATION: &str = "kjv";

const BOOK_TABLE: &[(&str, &str, Testament, u32)] = &[
    ("genesis", "Genesis", Testament::Old, 50),
    ("exodus", "Exodus", Testament::Old, 40),
    ("leviticus", "Leviticus", Testament::Old, 27),
    ("numbers", "Numbers", Testament::Old, 36),
    ("deuteronomy", "Deuteronomy", Testament::Old, 34),
    ("joshua", "Joshua", Testament::Old, 24),
    ("judges", "Judges", Testament::Old, 21),
    ("ruth", "Ruth", Testament::Old, 4),
    ("1samuel", "1 Samuel", Testament::Old, 31),
    ("2samuel", "2 Samuel", Testament::Old, 24),
    ("1kings", "1 Kings", Testament::Old, 22),
    ("2kings", "2 Kings", Testament::Old, 25),
    ("1chronicles", "1 Chronicles", Testament::Old, 29),
    ("2chronicles", "2 Chronicles", Testament::Old, 36),
    ("ezra", "Ezra", Testament::Old, 10),
    ("nehemiah", "Nehemiah", Testament::Old, 13),
    ("esther", "Esther", Testament::Old, 10),
    ("job", "Job", Testament::Old, 42),
    ("psalms", "Psalms", Testament::Old, 150),
    ("proverbs", "Proverbs", Testament::Old, 31),
    ("ecclesiastes", "Ecclesiastes", Testament::Old, 12),
    ("song", "Song of Songs", Testament::Old, 8),
    ("isaiah", "Isaiah", Testament::Old, 66),
    ("jeremiah", "Jeremiah", Testament::Old, 52),
    ("lamentations", "Lamentations", Testament::Old, 5),
    ("ezekiel", "Ezekiel", Testament::Old, 48),
    ("daniel", "Daniel", Testament::Old, 12),
    ("hosea", "Hosea", Testament::Old, 14),
    ("joel", "Joel", Testament::Old, 3),
    ("amos", "Amos", Testament::Old, 9),
    ("obadiah", "Obadiah", Testament::Old, 1),
    ("jonah", "Jonah", Testament::Old, 4),
    ("micah", "Micah", Testament::Old, 7),
    ("nahum", "Nahum", Testament::Old, 3),
    ("habakkuk", "Habakkuk", Testament::Old, 3),
    ("zephaniah", "Zephaniah", Testament::Old, 3),
    ("haggai", "Haggai", Testament::Old, 2),
    ("zechariah", "Zechariah", Testament::Old, 14),
    ("malachi", "Malachi", Testament::Old, 4),
    ("matthew", "Matthew", Testament::New, 28),
    ("mark", "Mark", Testament::New, 16),
    ("luke", "Luke", Testament::New, 24),
    ("john", "John", Testament::New, 21),
    ("acts", "Acts", Testament::New, 28),
    ("romans", "Romans", Testament::New, 16),
    ("1corinthians", "1 Corinthians", Testament::New, 16),
    ("2corinthians", "2 Corinthians", Testament::New, 13),
    ("galatians", "Galatians", Testament::New, 6),
    ("ephesians", "Ephesians", Testament::New, 6),
    ("philippians", "Philippians", Testament::New, 4),
    ("colossians", "Colossians", Testament::New, 4),
    ("1thessalonians", "1 Thessalonians", Testament::New, 5),
    ("2thessalonians", "2 Thessalonians", Testament::New, 3),
    ("1timothy", "1 Timothy", Testament::New, 6),
    ("2timothy", "2 Timothy", Testament::New, 4),
    ("titus", "Titus", Testament::New, 3),
    ("philemon", "Philemon", Testament::New, 1),
    ("hebrews", "Hebrews", Testament::New, 13),
    ("james", "James", Testament::New, 5),
    ("1peter", "1 Peter", Testament::New, 5),
    ("2peter", "2 Peter", Testament::New, 3),
    ("1john", "1 John", Testament::New, 5),
    ("2john", "2 John", Testament::New, 1),
    ("3john", "3 John", Testament::New, 1),
    ("jude", "Jude", Testament::New, 1),
    ("revelation", "Revelation", Testament::New, 22),
];

const TRANSLATION_TABLE: &[(&str, &str, &str, &str, &str)] = &[
    ("kjv", "King James Version", "KJV", "English", "The classic 1611 translation"),
    ("esv", "English Standard Version", "ESV", "English", "Modern literal translation"),
    ("niv", "New International Version", "NIV", "English", "Popular modern translation"),
    ("nasb", "New American Standard Bible", "NASB", "English", "Literal and accurate translation"),
    ("nlt", "New Living Translation", "NLT", "English", "Clear and contemporary"),
];

const SAMPLE_TABLE: &[(&str, u32, u32, &str)] = &[
    (
        "John",
        3,
        16,
        "For God so loved the world that he gave his one and only Son, that \
         whoever believes in him shall not perish but have eternal life.",
    ),
    ("Psalms", 23, 1, "The Lord is my shepherd, I lack nothing."),
    ("Philippians", 4, 13, "I can do all this through him who gives me strength."),
    (
        "Proverbs",
        3,
        5,
        "Trust in the Lord with all your heart and lean not on your own \
         understanding.",
    ),
    (
        "Romans",
        8,
        28,
        "And we know that in all things God works for the good of those who \
         love him, who have been called according to his purpose.",
    ),
    (
        "Matthew",
        5,
        16,
        "In the same way, let your light shine before others, that they may see \
         your good deeds and glorify your Father in heaven.",
    ),
    (
        "Isaiah",
        40,
        31,
        "But those who hope in the Lord will renew their strength. They will \
         soar on wings like eagles; they will run and not grow weary, they will \
         walk and not be faint.",
    ),
];

/// Curated references cycled through by the verse of the day.
pub const DAILY_VERSE_REFERENCES: &[&str] = &[
    "john3:16",
    "psalms23:1",
    "philippians4:13",
    "romans8:28",
    "jeremiah29:11",
    "proverbs3:5-6",
    "isaiah40:31",
    "matthew5:16",
    "psalms46:10",
    "2corinthians5:17",
    "ephesians2:8-9",
    "romans5:8",
    "joshua1:9",
    "psalms139:14",
    "matthew11:28",
    "john14:6",
];

static BOOKS: Lazy<Vec<Book>> = Lazy::new(|| {
    BOOK_TABLE
        .iter()
        .map(|(id, name, testament, chapters)| Book {
            id: id.to_string(),
            name: name.to_string(),
            chapter_count: *chapters,
            testament: *testament,
        })
        .collect()
});

static TRANSLATIONS: Lazy<Vec<Translation>> = Lazy::new(|| {
    TRANSLATION_TABLE
        .iter()
        .map(|(id, name, abbreviation, language, description)| Translation {
            id: id.to_string(),
            name: name.to_string(),
            abbreviation: abbreviation.to_string(),
            language: language.to_string(),
            description: description.to_string(),
        })
        .collect()
});

static SAMPLE_VERSES: Lazy<Vec<Verse>> = Lazy::new(|| {
    SAMPLE_TABLE
        .iter()
        .map(|(book, chapter, verse, text)| Verse::new(*book, *chapter, *verse, *text))
        .collect()
});

pub fn books() -> &'static [Book] {
    &BOOKS
}

pub fn translations() -> &'static [Translation] {
    &TRANSLATIONS
}

pub fn sample_verses() -> &'static [Verse] {
    &SAMPLE_VERSES
}

/// Look up a book by id ("1corinthians") or display name ("1 Corinthians"), ignoring case.
pub fn find_book(name: &str) -> Option<&'static Book> {
    let needle = name.trim().to_lowercase();
    let compact: String = needle.chars().filter(|c| !c.is_whitespace()).collect();
    books()
        .iter()
        .find(|b| b.id == compact || b.name.to_lowercase() == needle)
}

pub fn translation_info(id: &str) -> Option<&'static Translation> {
    translations().iter().find(|t| t.id == id)
}

/// Bundled verses for an exact (book, chapter) match.
pub fn bundled_chapter(book: &str, chapter: u32) -> Vec<Verse> {
    sample_verses()
        .iter()
        .filter(|v| v.book == book && v.chapter == chapter)
        .cloned()
        .collect()
}

/// Case-insensitive substring search over bundled verse text and book name.
pub fn search_bundled(query: &str) -> Vec<Verse> {
    let term = query.trim().to_lowercase();
    if term.is_empty() {
        return Vec::new();
    }
    sample_verses()
        .iter()
        .filter(|v| v.text.to_lowercase().contains(&term) || v.book.to_lowercase().contains(&term))
        .cloned()
        .collect()
}

/// Index into a rotating list for a given date: `day_of_year mod len`, with
/// January 1st as day 1.
pub fn daily_index(date: NaiveDate, len: usize) -> usize {
    if len == 0 {
        return 0;
    }
    date.ordinal() as usize % len
}

pub fn daily_reference(date: NaiveDate) -> &'static str {
    DAILY_VERSE_REFERENCES[daily_index(date, DAILY_VERSE_REFERENCES.len())]
}

/// Offline verse of the day drawn from the bundled verses.
pub fn bundled_daily_verse(date: NaiveDate) -> Verse {
    let verses = sample_verses();
    verses[daily_index(date, verses.len())].clone()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn canon_has_sixty_six_books() {
        assert_eq!(books().len(), 66);
        assert_eq!(
            books().iter().filter(|b| b.testament == Testament::New).count(),
            27
        );
    }

    #[test]
    fn find_book_by_id_or_name() {
        assert_eq!(find_book("1 Corinthians").unwrap().id, "1corinthians");
        assert_eq!(find_book("1corinthians").unwrap().name, "1 Corinthians");
        assert_eq!(find_book("john").unwrap().chapter_count, 21);
        assert!(find_book("Hezekiah").is_none());
    }

    #[test]
    fn bundled_chapter_matches_exact_book_and_chapter() {
        let verses = bundled_chapter("John", 3);
        assert_eq!(verses.len(), 1);
        assert_eq!(verses[0].verse, 16);
        assert!(bundled_chapter("John", 4).is_empty());
        assert!(bundled_chapter("john", 3).is_empty());
    }

    #[test]
    fn bundled_search_covers_text_and_book_name() {
        let by_text = search_bundled("SHEPHERD");
        assert_eq!(by_text.len(), 1);
        assert_eq!(by_text[0].book, "Psalms");

        let by_book = search_bundled("romans");
        assert_eq!(by_book.len(), 1);

        assert!(search_bundled("   ").is_empty());
    }

    #[test]
    fn daily_reference_is_stable_within_a_day() {
        let d = date(2024, 3, 14);
        assert_eq!(daily_reference(d), daily_reference(d));
        // Jan 1 is day 1.
        assert_eq!(daily_reference(date(2024, 1, 1)), "psalms23:1");
        // 16 entries: day 17 wraps back to index 1.
        assert_eq!(daily_reference(date(2024, 1, 17)), "psalms23:1");
    }

    #[test]
    fn translation_lookup() {
        assert_eq!(translation_info("esv").unwrap().abbreviation, "ESV");
        assert!(translation_info("xyz").is_none());
    }
}
