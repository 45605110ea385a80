use crate::catalog::DEFAULT_TRANSLATION;
use crate::error::{Result, ScripturaError};
use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Deserialize;
use std::time::Duration;

/// One verse as the provider returns it.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ApiVerse {
    #[serde(default)]
    pub book_id: String,
    pub book_name: String,
    pub chapter: u32,
    pub verse: u32,
    pub text: String,
}

/// Body of a provider response: the passage as a whole plus its verses.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ApiResponse {
    #[serde(default)]
    pub reference: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub verses: Vec<ApiVerse>,
}

/// A verse-text provider addressed by free-form reference ("john3:16",
/// "psalms23", or a search phrase).
#[async_trait(?Send)]
pub trait VerseTransport {
    async fn fetch(&self, reference: &str, translation: &str) -> Result<ApiResponse>;
}

/// HTTP client for a bible-api.com compatible endpoint.
pub struct HttpTransport {
    client: Client,
    base_url: Url,
}

impl HttpTransport {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| ScripturaError::Config(format!("invalid api url {}: {}", base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(ScripturaError::Config(format!(
                "api url cannot be a base: {}",
                base_url
            )));
        }
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, base_url })
    }

    /// `{base}/{reference}`, with `?translation=` only for non-default translations.
    pub fn url(&self, reference: &str, translation: &str) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                ScripturaError::Config(format!("api url cannot be a base: {}", self.base_url))
            })?
            .pop_if_empty()
            .push(reference);
        if !translation.eq_ignore_ascii_case(DEFAULT_TRANSLATION) {
            url.query_pairs_mut().append_pair("translation", translation);
        }
        Ok(url)
    }
}

#[async_trait(?Send)]
impl VerseTransport for HttpTransport {
    async fn fetch(&self, reference: &str, translation: &str) -> Result<ApiResponse> {
        let url = self.url(reference, translation)?;
        tracing::debug!(%url, "Fetching verse content");
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ScripturaError::Api(format!("HTTP error! status: {}", status)));
        }
        Ok(response.json::<ApiResponse>().await?)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::cell::RefCell;
    use std::collections::HashMap;

    /// Canned provider: answers from a (translation, reference) table and
    /// records every request. Unknown references fail like a 404.
    #[derive(Default)]
    pub struct StubTransport {
        responses: RefCell<HashMap<(String, String), ApiResponse>>,
        offline: std::cell::Cell<bool>,
        pub requests: RefCell<Vec<(String, String)>>,
    }

    impl StubTransport {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn respond(&self, translation: &str, reference: &str, response: ApiResponse) {
            self.responses
                .borrow_mut()
                .insert((translation.to_string(), reference.to_string()), response);
        }

        /// Answer a chapter request with the given (verse, text) pairs.
        pub fn chapter(
            &self,
            translation: &str,
            book: &str,
            chapter: u32,
            verses: &[(u32, &str)],
        ) {
            let verses: Vec<ApiVerse> = verses
                .iter()
                .map(|(n, text)| ApiVerse {
                    book_id: book.to_lowercase(),
                    book_name: book.to_string(),
                    chapter,
                    verse: *n,
                    text: format!("{}\n", text),
                })
                .collect();
            let text = verses.iter().map(|v| v.text.as_str()).collect::<String>();
            self.respond(
                translation,
                &format!("{}{}", book, chapter),
                ApiResponse {
                    reference: format!("{} {}", book, chapter),
                    text,
                    verses,
                },
            );
        }

        pub fn set_offline(&self, offline: bool) {
            self.offline.set(offline);
        }

        pub fn request_count(&self) -> usize {
            self.requests.borrow().len()
        }
    }

    #[async_trait(?Send)]
    impl VerseTransport for StubTransport {
        async fn fetch(&self, reference: &str, translation: &str) -> Result<ApiResponse> {
            self.requests
                .borrow_mut()
                .push((translation.to_string(), reference.to_string()));
            if self.offline.get() {
                return Err(ScripturaError::Api("network unreachable".into()));
            }
            self.responses
                .borrow()
                .get(&(translation.to_string(), reference.to_string()))
                .cloned()
                .ok_or_else(|| ScripturaError::Api("HTTP error! status: 404 Not Found".into()))
        }
    }
}
