//! Local content schema and migrations
//!
//! Creates the announcements, calendar events and materials tables with the
//! same columns the hosted gateway exposes.

use crate::error::{AppError, Result};
use sqlx::sqlite::SqlitePool;

/// Schema scripts, applied in order; index + 1 is the `user_version` they bring the file to
const SCHEMA_SCRIPTS: &[&str] = &[include_str!("migrations/001_content_tables.sql")];

/// Bring the content tables up to the current schema version.
///
/// The version lives in SQLite's `user_version` header field, so no
/// bookkeeping table sits next to the content tables.
pub async fn initialize_database(pool: &SqlitePool) -> Result<()> {
    let mut conn = pool.acquire().await?;
    let current: i64 = sqlx::query_scalar("PRAGMA user_version")
        .fetch_one(&mut *conn)
        .await?;
    let target = SCHEMA_SCRIPTS.len() as i64;

    if current > target {
        return Err(AppError::Generic(format!(
            "Content database schema v{} is newer than this build (v{})",
            current, target
        )));
    }

    for (index, script) in SCHEMA_SCRIPTS.iter().enumerate().skip(current as usize) {
        let version = index as i64 + 1;
        tracing::info!("Applying content schema v{}", version);

        let mut tx = sqlx::Connection::begin(&mut *conn).await?;
        sqlx::raw_sql(script).execute(&mut *tx).await?;
        // PRAGMA does not take bind parameters
        sqlx::raw_sql(&format!("PRAGMA user_version = {}", version))
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
    }

    tracing::debug!("Content schema at v{}", target);
    Ok(())
}
