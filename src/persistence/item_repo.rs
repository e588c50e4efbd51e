//! Saved item repository for `SQLite` persistence.

use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use sqlx::query::Query;
use sqlx::sqlite::{Sqlite, SqliteArguments};

use crate::models::item::{PostPayload, SavedItem};
use crate::review::TimeScale;
use crate::{AppError, Result};

use super::db::Database;
use super::ItemStore;

/// Repository for saved item records.
#[derive(Clone)]
pub struct ItemRepo {
    db: Arc<Database>,
}

/// Internal row struct for `SQLite` deserialization.
#[derive(sqlx::FromRow)]
struct ItemRow {
    id: String,
    payload: String,
    interval_ms: i64,
    next_review: i64,
    last_reviewed: Option<i64>,
    review_count: i64,
}

impl ItemRow {
    fn into_item(self) -> Result<SavedItem> {
        let payload: PostPayload = serde_json::from_str(&self.payload)
            .map_err(|e| AppError::Db(format!("invalid payload for {}: {e}", self.id)))?;
        let review_count = u32::try_from(self.review_count)
            .map_err(|e| AppError::Db(format!("invalid review_count for {}: {e}", self.id)))?;

        Ok(SavedItem {
            id: self.id,
            payload,
            interval: self.interval_ms,
            next_review: self.next_review,
            last_reviewed: self.last_reviewed,
            review_count,
        })
    }
}

/// Persisted shape of the whole store: one mapping under a single namespace key.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    /// All saved items keyed by id.
    #[serde(default)]
    pub saved_items: BTreeMap<String, SavedItem>,
}

const SELECT_COLUMNS: &str =
    "SELECT id, payload, interval_ms, next_review, last_reviewed, review_count FROM saved_item";

impl ItemRepo {
    /// Create a new repository instance.
    #[must_use]
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Fetch one item by id.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the query fails or the row is malformed.
    pub async fn get_by_id(&self, id: &str) -> Result<Option<SavedItem>> {
        let row: Option<ItemRow> = sqlx::query_as(&format!("{SELECT_COLUMNS} WHERE id = ?1"))
            .bind(id)
            .fetch_optional(self.db.as_ref())
            .await?;
        row.map(ItemRow::into_item).transpose()
    }

    /// Fetch every item in save order.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the query fails or a row is malformed.
    pub async fn list_all(&self) -> Result<Vec<SavedItem>> {
        let rows: Vec<ItemRow> = sqlx::query_as(&format!("{SELECT_COLUMNS} ORDER BY rowid ASC"))
            .fetch_all(self.db.as_ref())
            .await?;
        rows.into_iter().map(ItemRow::into_item).collect()
    }

    /// Fetch items whose `next_review` is at or before `now`, in save order.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the query fails or a row is malformed.
    pub async fn list_due(&self, now: i64) -> Result<Vec<SavedItem>> {
        let rows: Vec<ItemRow> = sqlx::query_as(&format!(
            "{SELECT_COLUMNS} WHERE next_review <= ?1 ORDER BY rowid ASC"
        ))
        .bind(now)
        .fetch_all(self.db.as_ref())
        .await?;
        rows.into_iter().map(ItemRow::into_item).collect()
    }

    /// Insert a new item, rejecting an id that is already saved.
    ///
    /// # Errors
    ///
    /// Returns `AppError::DuplicateItem` if the id exists, or `AppError::Db`
    /// if the insert fails.
    pub async fn insert(&self, item: &SavedItem) -> Result<()> {
        let payload = serde_json::to_string(&item.payload)?;
        let result = sqlx::query(
            "INSERT INTO saved_item (id, payload, interval_ms, next_review, last_reviewed, review_count)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(id) DO NOTHING",
        )
        .bind(&item.id)
        .bind(&payload)
        .bind(item.interval)
        .bind(item.next_review)
        .bind(item.last_reviewed)
        .bind(i64::from(item.review_count))
        .execute(self.db.as_ref())
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::DuplicateItem(item.id.clone()));
        }
        Ok(())
    }

    /// Insert or overwrite an item. Existing rows keep their save order.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the write fails.
    pub async fn upsert(&self, item: &SavedItem) -> Result<()> {
        let payload = serde_json::to_string(&item.payload)?;
        upsert_query(item, payload)
            .execute(self.db.as_ref())
            .await?;
        Ok(())
    }

    /// Delete one item. Returns whether a row was removed.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the delete fails.
    pub async fn delete(&self, id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM saved_item WHERE id = ?1")
            .bind(id)
            .execute(self.db.as_ref())
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete every item. Returns the number of rows removed.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the delete fails.
    pub async fn clear(&self) -> Result<u64> {
        let result = sqlx::query("DELETE FROM saved_item")
            .execute(self.db.as_ref())
            .await?;
        Ok(result.rows_affected())
    }

    /// Collect the whole store into a [`Snapshot`].
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the read fails.
    pub async fn export_snapshot(&self) -> Result<Snapshot> {
        let saved_items = self
            .list_all()
            .await?
            .into_iter()
            .map(|item| (item.id.clone(), item))
            .collect();
        Ok(Snapshot { saved_items })
    }

    /// Write every item of a [`Snapshot`], overwriting records with the same id.
    ///
    /// Map keys win over any mismatching `id` inside the record. Every
    /// interval must lie within one day and one year of `scale`. The whole
    /// snapshot is written in one transaction: either every item lands or
    /// none does. Returns the number of items written.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Serialization` if a record's interval is out of
    /// range, or `AppError::Db` if a write fails.
    pub async fn import_snapshot(&self, snapshot: Snapshot, scale: TimeScale) -> Result<usize> {
        let bounds = scale.day_ms()..=scale.year_ms();
        let items: Vec<SavedItem> = snapshot
            .saved_items
            .into_iter()
            .map(|(id, item)| SavedItem { id, ..item })
            .collect();

        if let Some(bad) = items.iter().find(|item| !bounds.contains(&item.interval)) {
            return Err(AppError::Serialization(format!(
                "interval {} of {} outside [{}, {}]",
                bad.interval,
                bad.id,
                bounds.start(),
                bounds.end()
            )));
        }

        let mut tx = self.db.begin().await?;
        for item in &items {
            let payload = serde_json::to_string(&item.payload)?;
            upsert_query(item, payload).execute(&mut *tx).await?;
        }
        tx.commit().await?;
        Ok(items.len())
    }
}

fn upsert_query(item: &SavedItem, payload: String) -> Query<'_, Sqlite, SqliteArguments<'_>> {
    sqlx::query(
        "INSERT INTO saved_item (id, payload, interval_ms, next_review, last_reviewed, review_count)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)
         ON CONFLICT(id) DO UPDATE SET
            payload = excluded.payload,
            interval_ms = excluded.interval_ms,
            next_review = excluded.next_review,
            last_reviewed = excluded.last_reviewed,
            review_count = excluded.review_count",
    )
    .bind(&item.id)
    .bind(payload)
    .bind(item.interval)
    .bind(item.next_review)
    .bind(item.last_reviewed)
    .bind(i64::from(item.review_count))
}

impl ItemStore for ItemRepo {
    fn get<'a>(
        &'a self,
        id: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Option<SavedItem>>> + Send + 'a>> {
        Box::pin(self.get_by_id(id))
    }

    fn list_all(&self) -> Pin<Box<dyn Future<Output = Result<Vec<SavedItem>>> + Send + '_>> {
        Box::pin(ItemRepo::list_all(self))
    }

    fn insert<'a>(
        &'a self,
        item: &'a SavedItem,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(ItemRepo::insert(self, item))
    }

    fn list_due(&self, now: i64) -> Pin<Box<dyn Future<Output = Result<Vec<SavedItem>>> + Send + '_>> {
        Box::pin(ItemRepo::list_due(self, now))
    }

    fn put<'a>(
        &'a self,
        item: &'a SavedItem,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(self.upsert(item))
    }

    fn delete<'a>(&'a self, id: &'a str) -> Pin<Box<dyn Future<Output = Result<bool>> + Send + 'a>> {
        Box::pin(ItemRepo::delete(self, id))
    }

    fn clear(&self) -> Pin<Box<dyn Future<Output = Result<u64>> + Send + '_>> {
        Box::pin(ItemRepo::clear(self))
    }
}
