//! Persistence layer modules.
//!
//! [`ItemStore`] is the record-store contract the review service and the
//! feed runner consume; [`item_repo::ItemRepo`] implements it on `SQLite`.

pub mod db;
pub mod item_repo;
pub mod schema;

use std::future::Future;
use std::pin::Pin;

use crate::models::item::SavedItem;
use crate::Result;

/// Re-export the database pool type for convenience.
pub use sqlx::SqlitePool;

/// Durable key/value store of saved items keyed by id.
///
/// Used from a single writer at a time; implementations need not offer
/// cross-call transactions.
pub trait ItemStore: Send + Sync {
    /// Fetch one item, or `None` if the id is unknown.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` on read failure.
    fn get<'a>(
        &'a self,
        id: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Option<SavedItem>>> + Send + 'a>>;

    /// Fetch every item in retrieval order.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` on read failure.
    fn list_all(&self) -> Pin<Box<dyn Future<Output = Result<Vec<SavedItem>>> + Send + '_>>;

    /// Fetch items due at or before `now`, in retrieval order.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` on read failure.
    fn list_due(&self, now: i64) -> Pin<Box<dyn Future<Output = Result<Vec<SavedItem>>> + Send + '_>>;

    /// Insert a new item atomically.
    ///
    /// # Errors
    ///
    /// Returns `AppError::DuplicateItem` if the id is already stored, or
    /// `AppError::Db` on write failure.
    fn insert<'a>(
        &'a self,
        item: &'a SavedItem,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;

    /// Insert or overwrite an item.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` on write failure; the record is then not committed.
    fn put<'a>(&'a self, item: &'a SavedItem)
        -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;

    /// Remove an item, returning whether it existed.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` on write failure.
    fn delete<'a>(&'a self, id: &'a str) -> Pin<Box<dyn Future<Output = Result<bool>> + Send + 'a>>;

    /// Remove every item, returning how many were removed.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` on write failure.
    fn clear(&self) -> Pin<Box<dyn Future<Output = Result<u64>> + Send + '_>>;
}
