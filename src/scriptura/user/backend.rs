use crate::error::{Result, ScripturaError};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;

pub type Row = Map<String, Value>;

/// The three logical tables of the remote user store. Every row carries a
/// `user_id` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    Bookmarks,
    Profiles,
    ReadingHistory,
}

impl Table {
    pub fn name(&self) -> &'static str {
        match self {
            Table::Bookmarks => "bookmarks",
            Table::Profiles => "profiles",
            Table::ReadingHistory => "reading_history",
        }
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Select,
    Insert,
    Update,
    Delete,
    Upsert,
}

/// Equality filter on one column.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub column: String,
    pub value: Value,
}

pub fn eq(column: &str, value: impl Into<Value>) -> Filter {
    Filter {
        column: column.to_string(),
        value: value.into(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub column: String,
    pub descending: bool,
}

impl Order {
    pub fn desc(column: &str) -> Self {
        Self {
            column: column.to_string(),
            descending: true,
        }
    }
}

/// Row-level access to the per-user backend.
///
/// Implementations report query failures as [`ScripturaError::Backend`].
/// Nothing here retries.
#[async_trait(?Send)]
pub trait UserBackend {
    /// Rows matching every filter, optionally ordered.
    async fn select(&self, table: Table, filters: &[Filter], order: Option<&Order>)
        -> Result<Vec<Row>>;

    /// Insert rows; the stored rows (with server-assigned columns) are returned.
    async fn insert(&self, table: Table, rows: Vec<Row>) -> Result<Vec<Row>>;

    /// Merge `patch` into every matching row and return the updated rows.
    async fn update(&self, table: Table, filters: &[Filter], patch: Row) -> Result<Vec<Row>>;

    /// Delete matching rows and return how many were removed.
    async fn delete(&self, table: Table, filters: &[Filter]) -> Result<usize>;

    /// Insert rows, merging into existing rows that agree on every `conflict` column.
    async fn upsert(&self, table: Table, rows: Vec<Row>, conflict: &[&str]) -> Result<Vec<Row>>;
}

pub fn to_row<T: Serialize>(value: &T) -> Result<Row> {
    match serde_json::to_value(value).map_err(ScripturaError::Serialization)? {
        Value::Object(map) => Ok(map),
        other => Err(ScripturaError::Backend(format!(
            "expected an object row, got {}",
            other
        ))),
    }
}

pub fn from_row<T: DeserializeOwned>(row: Row) -> Result<T> {
    serde_json::from_value(Value::Object(row)).map_err(ScripturaError::Serialization)
}

pub fn from_rows<T: DeserializeOwned>(rows: Vec<Row>) -> Result<Vec<T>> {
    rows.into_iter().map(from_row).collect()
}
