use super::source::ContentSource;
use super::transport::VerseTransport;
use crate::catalog;
use crate::model::Verse;
use crate::store::local::LocalStore;
use crate::store::KeyValueStore;
use chrono::NaiveDate;
use std::rc::Rc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Connectivity {
    #[default]
    Online,
    Offline,
}

/// Where a chapter's verses came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChapterLoad {
    Remote(Vec<Verse>),
    OfflineCache(Vec<Verse>),
    /// The bundled sample verses for this chapter.
    Bundled(Vec<Verse>),
    /// Nothing anywhere. Not an error: the chapter simply has no content here.
    NoContent,
}

impl ChapterLoad {
    pub fn verses(&self) -> &[Verse] {
        match self {
            ChapterLoad::Remote(v) | ChapterLoad::OfflineCache(v) | ChapterLoad::Bundled(v) => v,
            ChapterLoad::NoContent => &[],
        }
    }

    pub fn origin(&self) -> &'static str {
        match self {
            ChapterLoad::Remote(_) => "remote",
            ChapterLoad::OfflineCache(_) => "offline cache",
            ChapterLoad::Bundled(_) => "bundled",
            ChapterLoad::NoContent => "none",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchResults {
    Remote(Vec<Verse>),
    Bundled(Vec<Verse>),
}

impl SearchResults {
    pub fn verses(&self) -> &[Verse] {
        match self {
            SearchResults::Remote(v) | SearchResults::Bundled(v) => v,
        }
    }
}

/// Single entry point for verse content regardless of connectivity.
///
/// Owns the [`ContentSource`]. Every load takes `&mut self`, so a new load
/// cannot begin until the previous one has settled.
pub struct ContentResolver<T: VerseTransport, K: KeyValueStore> {
    source: ContentSource<T>,
    local: Rc<LocalStore<K>>,
    connectivity: Connectivity,
}

impl<T: VerseTransport, K: KeyValueStore> ContentResolver<T, K> {
    pub fn new(source: ContentSource<T>, local: Rc<LocalStore<K>>) -> Self {
        Self {
            source,
            local,
            connectivity: Connectivity::Online,
        }
    }

    pub fn source(&self) -> &ContentSource<T> {
        &self.source
    }

    pub fn source_mut(&mut self) -> &mut ContentSource<T> {
        &mut self.source
    }

    pub fn connectivity(&self) -> Connectivity {
        self.connectivity
    }

    pub fn set_connectivity(&mut self, connectivity: Connectivity) {
        tracing::debug!(?connectivity, "Connectivity changed");
        self.connectivity = connectivity;
    }

    /// Load a chapter.
    ///
    /// Offline with a saved copy, the copy is served and the network is not
    /// touched. Otherwise the provider is asked; a non-empty answer is
    /// written through to the offline store. Empty or failed fetches fall
    /// back to the bundled verses for exactly this (book, chapter).
    pub async fn load_chapter(
        &mut self,
        book: &str,
        chapter: u32,
        translation: Option<&str>,
    ) -> ChapterLoad {
        if self.connectivity == Connectivity::Offline {
            match self.local.offline_chapter(book, chapter) {
                Ok(Some(saved)) => {
                    tracing::debug!(book, chapter, "Serving offline copy");
                    return ChapterLoad::OfflineCache(saved.verses);
                }
                Ok(None) => {}
                Err(err) => {
                    tracing::warn!(book, chapter, error = %err, "Offline store read failed")
                }
            }
        }

        if let Some(fetched) = self.source.get_chapter(book, chapter, translation).await {
            if !fetched.verses.is_empty() {
                if let Err(err) = self
                    .local
                    .save_offline_chapter(book, chapter, &fetched.verses)
                {
                    tracing::warn!(book, chapter, error = %err, "Offline write-through failed");
                }
                return ChapterLoad::Remote(fetched.verses);
            }
        }

        let bundled = catalog::bundled_chapter(book, chapter);
        if bundled.is_empty() {
            ChapterLoad::NoContent
        } else {
            tracing::debug!(book, chapter, "Serving bundled verses");
            ChapterLoad::Bundled(bundled)
        }
    }

    /// Remote search, falling back to a substring search over the bundled
    /// verses when the provider fails or finds nothing.
    pub async fn search(&mut self, query: &str, translation: Option<&str>) -> SearchResults {
        let remote = self.source.search_verses(query, translation).await;
        if remote.is_empty() {
            SearchResults::Bundled(catalog::search_bundled(query))
        } else {
            SearchResults::Remote(remote)
        }
    }

    /// The verse of the day, or the bundled pick for `date` when unavailable.
    pub async fn daily_verse(&mut self, date: NaiveDate, translation: Option<&str>) -> Verse {
        match self.source.get_random_verse(date, translation).await {
            Some(verse) => verse,
            None => catalog::bundled_daily_verse(date),
        }
    }

    pub async fn verse(
        &mut self,
        book: &str,
        chapter: u32,
        verse: u32,
        translation: Option<&str>,
    ) -> Option<Verse> {
        if let Some(found) = self.source.get_verse(book, chapter, verse, translation).await {
            return Some(found);
        }
        catalog::bundled_chapter(book, chapter)
            .into_iter()
            .find(|v| v.verse == verse)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::cache::MemoryCache;
    use crate::content::transport::testing::StubTransport;
    use crate::store::memory::MemoryKv;

    fn resolver(
        stub: StubTransport,
    ) -> (ContentResolver<StubTransport, MemoryKv>, Rc<LocalStore<MemoryKv>>) {
        let local = Rc::new(LocalStore::new(MemoryKv::new()));
        let source = ContentSource::new(stub, Box::new(MemoryCache::new()), "kjv");
        (ContentResolver::new(source, local.clone()), local)
    }

    #[tokio::test]
    async fn remote_success_writes_through() {
        let stub = StubTransport::new();
        stub.chapter("kjv", "Romans", 8, &[(28, "And we know")]);
        let (mut resolver, local) = resolver(stub);

        let load = resolver.load_chapter("Romans", 8, None).await;
        assert!(matches!(load, ChapterLoad::Remote(_)));
        let saved = local.offline_chapter("Romans", 8).unwrap().unwrap();
        assert_eq!(saved.verses, load.verses());
    }

    #[tokio::test]
    async fn offline_with_saved_copy_skips_network() {
        let stub = StubTransport::new();
        let (mut resolver, local) = resolver(stub);
        local
            .save_offline_chapter("Romans", 8, &[Verse::new("Romans", 8, 28, "saved")])
            .unwrap();

        resolver.set_connectivity(Connectivity::Offline);
        let load = resolver.load_chapter("Romans", 8, None).await;
        assert_eq!(load, ChapterLoad::OfflineCache(vec![Verse::new("Romans", 8, 28, "saved")]));
        assert_eq!(resolver.source().transport().request_count(), 0);
    }

    #[tokio::test]
    async fn online_prefers_the_network_over_the_saved_copy() {
        let stub = StubTransport::new();
        stub.chapter("kjv", "Romans", 8, &[(28, "fresh")]);
        let (mut resolver, local) = resolver(stub);
        local
            .save_offline_chapter("Romans", 8, &[Verse::new("Romans", 8, 28, "stale")])
            .unwrap();

        let load = resolver.load_chapter("Romans", 8, None).await;
        assert_eq!(load.verses()[0].text, "fresh");
    }

    #[tokio::test]
    async fn failed_fetch_falls_back_to_bundled_chapter_only() {
        let stub = StubTransport::new();
        stub.set_offline(true);
        let (mut resolver, local) = resolver(stub);

        let load = resolver.load_chapter("John", 3, None).await;
        let ChapterLoad::Bundled(verses) = load else {
            panic!("expected bundled verses, got {:?}", load);
        };
        assert_eq!(verses.len(), 1);
        assert_eq!((verses[0].book.as_str(), verses[0].chapter, verses[0].verse), ("John", 3, 16));
        assert!(local.offline_chapter_keys().unwrap().is_empty());
    }

    #[tokio::test]
    async fn unknown_chapter_is_no_content() {
        let (mut resolver, _) = resolver(StubTransport::new());
        assert_eq!(resolver.load_chapter("Obadiah", 1, None).await, ChapterLoad::NoContent);
    }

    #[tokio::test]
    async fn offline_without_saved_copy_still_tries_the_network() {
        let stub = StubTransport::new();
        stub.chapter("kjv", "Jude", 1, &[(1, "Jude, the servant")]);
        let (mut resolver, _) = resolver(stub);
        resolver.set_connectivity(Connectivity::Offline);

        let load = resolver.load_chapter("Jude", 1, None).await;
        assert!(matches!(load, ChapterLoad::Remote(_)));
    }

    #[tokio::test]
    async fn write_through_failure_does_not_fail_the_load() {
        let stub = StubTransport::new();
        stub.chapter("kjv", "Jude", 1, &[(1, "Jude, the servant")]);
        let (mut resolver, local) = resolver(stub);
        local.kv().set_simulate_write_error(true);

        let load = resolver.load_chapter("Jude", 1, None).await;
        assert!(matches!(load, ChapterLoad::Remote(_)));
    }

    #[tokio::test]
    async fn search_falls_back_to_bundled_substring_match() {
        let stub = StubTransport::new();
        stub.set_offline(true);
        let (mut resolver, _) = resolver(stub);

        let results = resolver.search("SHEPHERD", None).await;
        assert!(matches!(results, SearchResults::Bundled(_)));
        assert_eq!(results.verses()[0].book, "Psalms");

        let results = resolver.search("john", None).await;
        assert!(results.verses().iter().all(|v| v.book == "John"));
    }

    #[tokio::test]
    async fn daily_verse_falls_back_when_offline() {
        let stub = StubTransport::new();
        stub.set_offline(true);
        let (mut resolver, _) = resolver(stub);
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        assert_eq!(
            resolver.daily_verse(date, None).await,
            catalog::bundled_daily_verse(date)
        );
    }
}
