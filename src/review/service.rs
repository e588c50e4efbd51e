//! Store-backed review operations.
//!
//! Each call reads the current record, applies a [`Scheduler`] transition,
//! and writes it back. A failed write leaves nothing committed; callers may
//! retry. Operations on unknown ids are no-ops that return `Ok(None)`.

use std::sync::Arc;

use tracing::{debug, info};

use crate::models::item::{PostPayload, SavedItem};
use crate::models::review::ReviewOutcome;
use crate::persistence::ItemStore;
use crate::Result;

use super::scheduler::Scheduler;

/// Review operations over an [`ItemStore`].
#[derive(Clone)]
pub struct ReviewService {
    store: Arc<dyn ItemStore>,
    scheduler: Scheduler,
}

impl ReviewService {
    /// Create a new service instance.
    #[must_use]
    pub fn new(store: Arc<dyn ItemStore>, scheduler: Scheduler) -> Self {
        Self { store, scheduler }
    }

    /// The scheduler applied by this service.
    #[must_use]
    pub fn scheduler(&self) -> Scheduler {
        self.scheduler
    }

    /// Save a new item due one day from `now`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::DuplicateItem` if the id is already saved, or
    /// `AppError::Db` if the store fails.
    pub async fn save(&self, id: String, payload: PostPayload, now: i64) -> Result<SavedItem> {
        let item = self.scheduler.create_item(id, payload, now);
        self.store.insert(&item).await?;
        info!(item_id = %item.id, next_review = item.next_review, "item saved for review");
        Ok(item)
    }

    /// Record a review outcome for `id`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the store fails.
    pub async fn mark(
        &self,
        id: &str,
        outcome: ReviewOutcome,
        now: i64,
    ) -> Result<Option<SavedItem>> {
        self.update(id, |item| self.scheduler.review(item, outcome, now))
            .await
            .inspect(|updated| {
                if let Some(item) = updated {
                    info!(
                        item_id = %item.id,
                        ?outcome,
                        interval = item.interval,
                        review_count = item.review_count,
                        "review recorded"
                    );
                }
            })
    }

    /// Make `id` due immediately.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the store fails.
    pub async fn review_today(&self, id: &str, now: i64) -> Result<Option<SavedItem>> {
        self.update(id, |item| self.scheduler.reschedule_to_now(item, now))
            .await
    }

    /// Halve the remaining wait for `id`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the store fails.
    pub async fn review_earlier(&self, id: &str, now: i64) -> Result<Option<SavedItem>> {
        self.update(id, |item| self.scheduler.reschedule_earlier(item, now))
            .await
    }

    /// Delete `id`. Returns whether it existed.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the store fails.
    pub async fn remove(&self, id: &str) -> Result<bool> {
        let removed = self.store.delete(id).await?;
        debug!(item_id = id, removed, "item removal");
        Ok(removed)
    }

    /// Delete every saved item. Returns how many were removed.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the store fails.
    pub async fn clear(&self) -> Result<u64> {
        let removed = self.store.clear().await?;
        info!(removed, "all saved items cleared");
        Ok(removed)
    }

    /// Every saved item in retrieval order.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the store fails.
    pub async fn list(&self) -> Result<Vec<SavedItem>> {
        self.store.list_all().await
    }

    /// Items eligible for resurfacing at `now`, in retrieval order.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the store fails.
    pub async fn due_items(&self, now: i64) -> Result<Vec<SavedItem>> {
        self.store.list_due(now).await
    }

    async fn update<F>(&self, id: &str, transition: F) -> Result<Option<SavedItem>>
    where
        F: FnOnce(&SavedItem) -> SavedItem,
    {
        let Some(current) = self.store.get(id).await? else {
            debug!(item_id = id, "ignoring update for unknown item");
            return Ok(None);
        };
        let next = transition(&current);
        self.store.put(&next).await?;
        Ok(Some(next))
    }
}
