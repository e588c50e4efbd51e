//! `SQLite` schema bootstrap logic.
//!
//! Uses `CREATE TABLE IF NOT EXISTS`, so it is safe to re-run on every startup.

use sqlx::SqlitePool;

use crate::Result;

/// Apply the saved-item table definition to the connected database.
///
/// The implicit `rowid` records save order, which `list_all` relies on.
///
/// # Errors
///
/// Returns `AppError::Db` if any DDL statement fails.
pub async fn bootstrap_schema(pool: &SqlitePool) -> Result<()> {
    let ddl = r"
CREATE TABLE IF NOT EXISTS saved_item (
    id              TEXT PRIMARY KEY NOT NULL,
    payload         TEXT NOT NULL,
    interval_ms     INTEGER NOT NULL CHECK(interval_ms > 0),
    next_review     INTEGER NOT NULL,
    last_reviewed   INTEGER,
    review_count    INTEGER NOT NULL DEFAULT 0 CHECK(review_count >= 0)
);

CREATE INDEX IF NOT EXISTS idx_saved_item_next_review ON saved_item(next_review);
";

    sqlx::raw_sql(ddl).execute(pool).await?;
    Ok(())
}
