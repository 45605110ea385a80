//! PostgREST-style HTTP backend for the remote user store.
//!
//! Each [`Table`] maps to `{base_url}/{table}`. Filters become `column=eq.value`
//! query pairs, ordering becomes `order=column.desc`, and upserts use
//! `on_conflict` with a merge-duplicates preference. Requests carry the
//! project API key and, when signed in, the user's bearer token.

use super::backend::{Filter, Order, Row, Table, UserBackend};
use super::session::Session;
use crate::error::{Result, ScripturaError};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

pub struct RestBackend {
    client: Client,
    base_url: String,
    api_key: String,
    session: Session,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
    code: Option<String>,
}

impl RestBackend {
    pub fn new(base_url: &str, api_key: &str, session: Session, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            session,
        })
    }

    fn url(&self, table: Table) -> String {
        format!("{}/{}", self.base_url, table.name())
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        let token = self
            .session
            .user()
            .and_then(|u| u.access_token)
            .unwrap_or_else(|| self.api_key.clone());
        request
            .header("apikey", &self.api_key)
            .bearer_auth(token)
    }

    async fn rows(response: Response) -> Result<Vec<Row>> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorBody>(&body)
                .ok()
                .and_then(|e| match (e.message, e.code) {
                    (Some(m), Some(c)) => Some(format!("{} ({})", m, c)),
                    (Some(m), None) => Some(m),
                    _ => None,
                })
                .unwrap_or_else(|| format!("HTTP {}", status));
            tracing::warn!(%status, %message, "User backend request failed");
            return Err(ScripturaError::Backend(message));
        }
        let text = response.text().await?;
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }
        let value: Value = serde_json::from_str(&text)?;
        match value {
            Value::Array(items) => Ok(items
                .into_iter()
                .filter_map(|v| match v {
                    Value::Object(map) => Some(map),
                    _ => None,
                })
                .collect()),
            Value::Object(map) => Ok(vec![map]),
            _ => Err(ScripturaError::Backend(
                "unexpected response body".to_string(),
            )),
        }
    }
}

fn filter_pairs(filters: &[Filter]) -> Vec<(String, String)> {
    filters
        .iter()
        .map(|f| {
            let value = match &f.value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            (f.column.clone(), format!("eq.{}", value))
        })
        .collect()
}

#[async_trait(?Send)]
impl UserBackend for RestBackend {
    async fn select(
        &self,
        table: Table,
        filters: &[Filter],
        order: Option<&Order>,
    ) -> Result<Vec<Row>> {
        let mut query = filter_pairs(filters);
        query.push(("select".to_string(), "*".to_string()));
        if let Some(order) = order {
            let dir = if order.descending { "desc" } else { "asc" };
            query.push(("order".to_string(), format!("{}.{}", order.column, dir)));
        }
        let request = self.authorize(self.client.get(self.url(table)).query(&query));
        Self::rows(request.send().await?).await
    }

    async fn insert(&self, table: Table, rows: Vec<Row>) -> Result<Vec<Row>> {
        let request = self.authorize(
            self.client
                .post(self.url(table))
                .header("Prefer", "return=representation")
                .json(&rows),
        );
        Self::rows(request.send().await?).await
    }

    async fn update(&self, table: Table, filters: &[Filter], patch: Row) -> Result<Vec<Row>> {
        let request = self.authorize(
            self.client
                .patch(self.url(table))
                .query(&filter_pairs(filters))
                .header("Prefer", "return=representation")
                .json(&patch),
        );
        Self::rows(request.send().await?).await
    }

    async fn delete(&self, table: Table, filters: &[Filter]) -> Result<usize> {
        let request = self.authorize(
            self.client
                .delete(self.url(table))
                .query(&filter_pairs(filters))
                .header("Prefer", "return=representation"),
        );
        Ok(Self::rows(request.send().await?).await?.len())
    }

    async fn upsert(&self, table: Table, rows: Vec<Row>, conflict: &[&str]) -> Result<Vec<Row>> {
        let request = self.authorize(
            self.client
                .post(self.url(table))
                .query(&[("on_conflict", conflict.join(","))])
                .header("Prefer", "resolution=merge-duplicates,return=representation")
                .json(&rows),
        );
        Self::rows(request.send().await?).await
    }
}
