//! Database module
//!
//! This module provides the local content database used by the offline gateway:
//! - Schema and migrations
//! - Model definitions shared with the hosted gateway
//! - Repository layer translating gateway queries into SQL

pub mod models;
pub mod repository;
pub mod schema;

pub use models::*;
pub use repository::Repository;
pub use schema::initialize_database;

use crate::error::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::time::Duration;

/// Open the content database, creating it and its tables if needed.
///
/// The content tables are append-only and never altered in place, so a
/// single pool serves both the schema check and the gateway queries.
pub async fn create_pool(db_path: &Path) -> Result<SqlitePool> {
    tracing::info!("Opening content database at: {:?}", db_path);

    if let Some(parent) = db_path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true)
        .busy_timeout(Duration::from_secs(5))
        .journal_mode(SqliteJournalMode::Wal);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    initialize_database(&pool).await?;

    Ok(pool)
}
