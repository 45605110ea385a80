use super::cache::{CacheKey, CachedContent, ContentCache};
use super::transport::{ApiResponse, ApiVerse, VerseTransport};
use crate::catalog;
use crate::model::{Chapter, Verse};
use chrono::NaiveDate;

fn to_verse(v: ApiVerse) -> Verse {
    Verse {
        book: v.book_name,
        chapter: v.chapter,
        verse: v.verse,
        text: v.text.trim().to_string(),
    }
}

/// Client for the verse-text provider with a translation-aware cache.
///
/// Transport failures never escape: they are logged and reported as `None`
/// or an empty list so callers can choose a fallback.
pub struct ContentSource<T: VerseTransport> {
    transport: T,
    cache: Box<dyn ContentCache>,
    translation: String,
}

impl<T: VerseTransport> ContentSource<T> {
    pub fn new(transport: T, cache: Box<dyn ContentCache>, translation: impl Into<String>) -> Self {
        Self {
            transport,
            cache,
            translation: translation.into(),
        }
    }

    pub fn current_translation(&self) -> &str {
        &self.translation
    }

    /// Switch the current translation. The whole cache is dropped.
    pub fn set_translation(&mut self, id: &str) {
        tracing::info!(from = %self.translation, to = %id, "Switching translation");
        self.translation = id.to_string();
        self.cache.clear();
    }

    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }

    pub fn cache_size(&self) -> usize {
        self.cache.len()
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    fn translation_for(&self, requested: Option<&str>) -> String {
        requested.unwrap_or(&self.translation).to_string()
    }

    async fn fetch(&self, reference: &str, translation: &str) -> Option<ApiResponse> {
        match self.transport.fetch(reference, translation).await {
            Ok(response) => Some(response),
            Err(err) => {
                tracing::warn!(reference, translation, error = %err, "Content fetch failed");
                None
            }
        }
    }

    pub async fn get_verse(
        &mut self,
        book: &str,
        chapter: u32,
        verse: u32,
        translation: Option<&str>,
    ) -> Option<Verse> {
        let translation = self.translation_for(translation);
        let key = CacheKey::Verse {
            translation: translation.clone(),
            book: book.to_string(),
            chapter,
            verse,
        };
        if let Some(CachedContent::Verse(hit)) = self.cache.get(&key) {
            tracing::debug!(%key, "Cache hit");
            return Some(hit);
        }

        let reference = format!("{}{}:{}", book, chapter, verse);
        let data = self.fetch(&reference, &translation).await?;
        let found = Verse::new(book, chapter, verse, data.text.trim());
        self.cache.put(key, CachedContent::Verse(found.clone()));
        Some(found)
    }

    pub async fn get_chapter(
        &mut self,
        book: &str,
        chapter: u32,
        translation: Option<&str>,
    ) -> Option<Chapter> {
        let translation = self.translation_for(translation);
        let key = CacheKey::Chapter {
            translation: translation.clone(),
            book: book.to_string(),
            chapter,
        };
        if let Some(CachedContent::Chapter(hit)) = self.cache.get(&key) {
            tracing::debug!(%key, "Cache hit");
            return Some(hit);
        }

        let data = self
            .fetch(&format!("{}{}", book, chapter), &translation)
            .await?;
        let book_name = data
            .verses
            .first()
            .map(|v| v.book_name.clone())
            .unwrap_or_else(|| book.to_string());
        let found = Chapter {
            book: book_name,
            chapter,
            verses: data.verses.into_iter().map(to_verse).collect(),
        };
        self.cache.put(key, CachedContent::Chapter(found.clone()));
        Some(found)
    }

    /// Free-text search. A blank query returns nothing without a request.
    pub async fn search_verses(&mut self, query: &str, translation: Option<&str>) -> Vec<Verse> {
        if query.trim().is_empty() {
            return Vec::new();
        }
        let translation = self.translation_for(translation);
        let key = CacheKey::Search {
            translation: translation.clone(),
            query: query.to_string(),
        };
        if let Some(CachedContent::Search(hit)) = self.cache.get(&key) {
            tracing::debug!(%key, "Cache hit");
            return hit;
        }

        let Some(data) = self.fetch(query, &translation).await else {
            return Vec::new();
        };
        let found: Vec<Verse> = data.verses.into_iter().map(to_verse).collect();
        self.cache.put(key, CachedContent::Search(found.clone()));
        found
    }

    /// The verse of the day for `date`: the same curated reference for every
    /// caller on a given calendar date. Not cached.
    pub async fn get_random_verse(
        &mut self,
        date: NaiveDate,
        translation: Option<&str>,
    ) -> Option<Verse> {
        let translation = self.translation_for(translation);
        let reference = catalog::daily_reference(date);
        let data = self.fetch(reference, &translation).await?;
        let Some(first) = data.verses.first() else {
            tracing::warn!(reference, "Daily verse response carried no verses");
            return None;
        };
        Some(Verse::new(
            first.book_name.clone(),
            first.chapter,
            first.verse,
            data.text.trim(),
        ))
    }
}
