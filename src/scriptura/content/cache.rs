use crate::model::{Chapter, Verse};
use std::collections::HashMap;
use std::fmt;

/// What a cached entry was fetched for. Every key carries its translation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    Verse {
        translation: String,
        book: String,
        chapter: u32,
        verse: u32,
    },
    Chapter {
        translation: String,
        book: String,
        chapter: u32,
    },
    Search {
        translation: String,
        query: String,
    },
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheKey::Verse {
                translation,
                book,
                chapter,
                verse,
            } => write!(f, "{}-{}-{}-{}", translation, book, chapter, verse),
            CacheKey::Chapter {
                translation,
                book,
                chapter,
            } => write!(f, "{}-{}-{}", translation, book, chapter),
            CacheKey::Search { translation, query } => {
                write!(f, "search-{}-{}", translation, query)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CachedContent {
    Verse(Verse),
    Chapter(Chapter),
    Search(Vec<Verse>),
}

/// Storage for fetched content. Entries never expire.
pub trait ContentCache {
    fn get(&self, key: &CacheKey) -> Option<CachedContent>;
    fn put(&mut self, key: CacheKey, content: CachedContent);
    fn clear(&mut self);
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Unbounded process-lifetime cache.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: HashMap<CacheKey, CachedContent>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ContentCache for MemoryCache {
    fn get(&self, key: &CacheKey) -> Option<CachedContent> {
        self.entries.get(key).cloned()
    }

    fn put(&mut self, key: CacheKey, content: CachedContent) {
        self.entries.insert(key, content);
    }

    fn clear(&mut self) {
        self.entries.clear();
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}
