//! Repository layer for the local content database
//!
//! Translates backend-neutral table queries into SQLite statements. Rows come
//! back as JSON objects so the local gateway returns exactly what the hosted
//! one would.

use crate::error::{AppError, Result};
use crate::gateway::{Table, TableQuery};
use chrono::{SecondsFormat, Utc};
use serde_json::Value;
use sqlx::SqlitePool;
use uuid::Uuid;

/// Repository for content rows
#[derive(Clone)]
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Run a filtered, ordered query and return each row as a JSON object
    pub async fn select_rows(&self, query: &TableQuery) -> Result<Vec<Value>> {
        let table = query.table;
        let mut sql = format!("SELECT {} FROM {}", json_projection(table), table.name());

        for (i, filter) in query.filters.iter().enumerate() {
            ensure_column(table, &filter.column)?;
            sql.push_str(if i == 0 { " WHERE " } else { " AND " });
            sql.push_str(&filter.column);
            sql.push_str(" = ?");
        }

        if let Some(order) = &query.order {
            ensure_column(table, &order.column)?;
            let direction = if order.ascending { "ASC" } else { "DESC" };
            // rowid keeps rows with equal sort keys in insertion order
            sql.push_str(&format!(
                " ORDER BY {} {}, rowid {}",
                order.column, direction, direction
            ));
        }

        if query.limit.is_some() {
            sql.push_str(" LIMIT ?");
        }

        let mut q = sqlx::query_scalar::<_, String>(&sql);
        for filter in &query.filters {
            q = q.bind(&filter.value);
        }
        if let Some(limit) = query.limit {
            q = q.bind(limit as i64);
        }

        let rows = q.fetch_all(&self.pool).await?;

        tracing::debug!("Selected {} rows from {}", rows.len(), table.name());

        rows.iter()
            .map(|raw| serde_json::from_str(raw).map_err(Into::into))
            .collect()
    }

    /// Insert one row, assigning `id` and the table's timestamp when absent
    pub async fn insert_row(&self, table: Table, row: Value) -> Result<Value> {
        let Value::Object(fields) = row else {
            return Err(AppError::Validation(format!(
                "Row for {} must be a JSON object",
                table.name()
            )));
        };

        let mut columns: Vec<String> = Vec::with_capacity(fields.len() + 2);
        let mut values: Vec<Option<String>> = Vec::with_capacity(fields.len() + 2);

        for (column, value) in &fields {
            ensure_column(table, column)?;
            columns.push(column.clone());
            values.push(column_value(column, value)?);
        }

        if !fields.contains_key("id") {
            columns.push("id".to_string());
            values.push(Some(Uuid::new_v4().to_string()));
        }

        let timestamp_column = table.timestamp_column();
        if !fields.contains_key(timestamp_column) {
            columns.push(timestamp_column.to_string());
            values.push(Some(Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)));
        }

        let placeholders = vec!["?"; columns.len()].join(", ");
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({}) RETURNING {}",
            table.name(),
            columns.join(", "),
            placeholders,
            json_projection(table)
        );

        let mut q = sqlx::query_scalar::<_, String>(&sql);
        for value in &values {
            q = q.bind(value.as_deref());
        }

        let stored = q.fetch_one(&self.pool).await?;

        tracing::debug!("Inserted row into {}", table.name());

        Ok(serde_json::from_str(&stored)?)
    }

    /// Number of rows in a table
    pub async fn count_rows(&self, table: Table) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", table.name()))
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

/// `json_object('col', col, ...)` over every column of the table
fn json_projection(table: Table) -> String {
    let pairs: Vec<String> = table
        .columns()
        .iter()
        .map(|c| format!("'{}', {}", c, c))
        .collect();
    format!("json_object({})", pairs.join(", "))
}

fn ensure_column(table: Table, column: &str) -> Result<()> {
    if table.has_column(column) {
        Ok(())
    } else {
        Err(AppError::Validation(format!(
            "Unknown column {} for table {}",
            column,
            table.name()
        )))
    }
}

fn column_value(column: &str, value: &Value) -> Result<Option<String>> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s.clone())),
        Value::Number(n) => Ok(Some(n.to_string())),
        Value::Bool(b) => Ok(Some(b.to_string())),
        Value::Array(_) | Value::Object(_) => Err(AppError::Validation(format!(
            "Column {} only accepts scalar values",
            column
        ))),
    }
}
