use super::backend::{Filter, Operation, Order, Row, Table, UserBackend};
use crate::error::{Result, ScripturaError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::cell::RefCell;
use std::cmp::Ordering;
use std::collections::HashMap;
use uuid::Uuid;

/// In-memory user backend for tests and local development.
///
/// Assigns `id`, `created_at` and `updated_at` like the hosted database does,
/// and can be told to fail specific (table, operation) pairs.
#[derive(Default)]
pub struct MemoryBackend {
    tables: RefCell<HashMap<Table, Vec<Row>>>,
    failures: RefCell<HashMap<(Table, Operation), String>>,
    calls: RefCell<Vec<(Table, Operation, usize)>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every `op` on `table` fail with `message` until cleared.
    pub fn fail_on(&self, table: Table, op: Operation, message: &str) {
        self.failures
            .borrow_mut()
            .insert((table, op), message.to_string());
    }

    pub fn clear_failures(&self) {
        self.failures.borrow_mut().clear();
    }

    /// Snapshot of a table's rows in insertion order.
    pub fn rows(&self, table: Table) -> Vec<Row> {
        self.tables
            .borrow()
            .get(&table)
            .cloned()
            .unwrap_or_default()
    }

    /// Every call made so far as (table, operation, rows sent or matched).
    pub fn calls(&self) -> Vec<(Table, Operation, usize)> {
        self.calls.borrow().clone()
    }

    fn check(&self, table: Table, op: Operation, size: usize) -> Result<()> {
        self.calls.borrow_mut().push((table, op, size));
        match self.failures.borrow().get(&(table, op)) {
            Some(message) => Err(ScripturaError::Backend(message.clone())),
            None => Ok(()),
        }
    }

    fn stamp_new(mut row: Row, now: &str) -> Row {
        row.entry("id".to_string())
            .or_insert_with(|| Value::String(Uuid::new_v4().to_string()));
        row.entry("created_at".to_string())
            .or_insert_with(|| Value::String(now.to_string()));
        row.insert("updated_at".to_string(), Value::String(now.to_string()));
        row
    }
}

fn matches(row: &Row, filters: &[Filter]) -> bool {
    filters
        .iter()
        .all(|f| row.get(&f.column).is_some_and(|v| values_equal(v, &f.value)))
}

fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        _ => a == b,
    }
}

fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::String(x)), Some(Value::String(y))) => {
            match (
                DateTime::parse_from_rfc3339(x),
                DateTime::parse_from_rfc3339(y),
            ) {
                (Ok(dx), Ok(dy)) => dx.cmp(&dy),
                _ => x.cmp(y),
            }
        }
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Greater,
        (None, Some(_)) => Ordering::Less,
        _ => Ordering::Equal,
    }
}

#[async_trait(?Send)]
impl UserBackend for MemoryBackend {
    async fn select(
        &self,
        table: Table,
        filters: &[Filter],
        order: Option<&Order>,
    ) -> Result<Vec<Row>> {
        let tables = self.tables.borrow();
        let mut found: Vec<(usize, Row)> = tables
            .get(&table)
            .map(|rows| {
                rows.iter()
                    .enumerate()
                    .filter(|(_, r)| matches(r, filters))
                    .map(|(i, r)| (i, r.clone()))
                    .collect()
            })
            .unwrap_or_default();
        drop(tables);
        self.check(table, Operation::Select, found.len())?;

        if let Some(order) = order {
            // Ties keep insertion order, reversed along with the column for descending.
            found.sort_by(|(ia, a), (ib, b)| {
                let ord = compare_values(a.get(&order.column), b.get(&order.column))
                    .then(ia.cmp(ib));
                if order.descending {
                    ord.reverse()
                } else {
                    ord
                }
            });
        }
        Ok(found.into_iter().map(|(_, r)| r).collect())
    }

    async fn insert(&self, table: Table, rows: Vec<Row>) -> Result<Vec<Row>> {
        self.check(table, Operation::Insert, rows.len())?;
        let now = Utc::now().to_rfc3339();
        let stored: Vec<Row> = rows
            .into_iter()
            .map(|row| Self::stamp_new(row, &now))
            .collect();
        self.tables
            .borrow_mut()
            .entry(table)
            .or_default()
            .extend(stored.iter().cloned());
        Ok(stored)
    }

    async fn update(&self, table: Table, filters: &[Filter], patch: Row) -> Result<Vec<Row>> {
        let mut tables = self.tables.borrow_mut();
        let rows = tables.entry(table).or_default();
        let hits = rows.iter().filter(|r| matches(r, filters)).count();
        self.check(table, Operation::Update, hits)?;

        let now = Utc::now().to_rfc3339();
        let mut updated = Vec::new();
        for row in rows.iter_mut().filter(|r| matches(r, filters)) {
            for (k, v) in &patch {
                row.insert(k.clone(), v.clone());
            }
            row.insert("updated_at".to_string(), Value::String(now.clone()));
            updated.push(row.clone());
        }
        Ok(updated)
    }

    async fn delete(&self, table: Table, filters: &[Filter]) -> Result<usize> {
        let mut tables = self.tables.borrow_mut();
        let rows = tables.entry(table).or_default();
        let hits = rows.iter().filter(|r| matches(r, filters)).count();
        self.check(table, Operation::Delete, hits)?;
        rows.retain(|r| !matches(r, filters));
        Ok(hits)
    }

    async fn upsert(&self, table: Table, rows: Vec<Row>, conflict: &[&str]) -> Result<Vec<Row>> {
        self.check(table, Operation::Upsert, rows.len())?;
        let now = Utc::now().to_rfc3339();
        let mut tables = self.tables.borrow_mut();
        let existing = tables.entry(table).or_default();

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            let key: Vec<Filter> = conflict
                .iter()
                .map(|c| Filter {
                    column: c.to_string(),
                    value: row.get(*c).cloned().unwrap_or(Value::Null),
                })
                .collect();

            match existing.iter_mut().find(|r| matches(r, &key)) {
                Some(current) => {
                    for (k, v) in row {
                        current.insert(k, v);
                    }
                    current.insert("updated_at".to_string(), Value::String(now.clone()));
                    out.push(current.clone());
                }
                None => {
                    let stored = Self::stamp_new(row, &now);
                    existing.push(stored.clone());
                    out.push(stored);
                }
            }
        }
        Ok(out)
    }
}
