//! Geometric-interval review scheduler.
//!
//! Pure state transitions over a [`SavedItem`]: every operation takes the
//! current time explicitly and returns the updated record. A positive review
//! doubles the interval (capped at one year); a negative review resets it
//! to one day. Manual overrides only touch `next_review`.

use chrono::Utc;
use serde::Deserialize;

use crate::models::item::{PostPayload, SavedItem};
use crate::models::review::ReviewOutcome;

/// One day in milliseconds.
pub const ONE_DAY: i64 = 86_400_000;

/// One year (365 days) in milliseconds.
pub const ONE_YEAR: i64 = 365 * ONE_DAY;

const ONE_MINUTE: i64 = 60_000;

/// Length of a scheduling "day" and "year".
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TimeScale {
    /// Real calendar durations.
    #[default]
    Standard,
    /// One day lasts a minute and one year lasts fifteen minutes.
    Compressed,
}

impl TimeScale {
    /// Duration of one scheduling day in milliseconds.
    #[must_use]
    pub fn day_ms(self) -> i64 {
        match self {
            Self::Standard => ONE_DAY,
            Self::Compressed => ONE_MINUTE,
        }
    }

    /// Duration of one scheduling year in milliseconds.
    #[must_use]
    pub fn year_ms(self) -> i64 {
        match self {
            Self::Standard => ONE_YEAR,
            Self::Compressed => 15 * ONE_MINUTE,
        }
    }
}

/// Current wall-clock time in milliseconds since the Unix epoch.
#[must_use]
pub fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

/// Stateless review scheduler parameterized by a [`TimeScale`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Scheduler {
    scale: TimeScale,
}

impl Scheduler {
    /// Build a scheduler for the given time scale.
    #[must_use]
    pub fn new(scale: TimeScale) -> Self {
        Self { scale }
    }

    /// The time scale this scheduler runs on.
    #[must_use]
    pub fn scale(&self) -> TimeScale {
        self.scale
    }

    /// Create a fresh record due one day after `now`.
    ///
    /// Duplicate detection is the caller's job; see
    /// [`ReviewService::save`](super::service::ReviewService::save).
    #[must_use]
    pub fn create_item(&self, id: String, payload: PostPayload, now: i64) -> SavedItem {
        let one_day = self.scale.day_ms();
        SavedItem {
            id,
            payload,
            interval: one_day,
            next_review: now + one_day,
            last_reviewed: None,
            review_count: 0,
        }
    }

    /// Apply a review outcome at `now`.
    #[must_use]
    pub fn review(&self, item: &SavedItem, outcome: ReviewOutcome, now: i64) -> SavedItem {
        let mut next = item.clone();
        match outcome {
            ReviewOutcome::Positive => {
                next.review_count = next.review_count.saturating_add(1);
                next.interval = item
                    .interval
                    .max(self.scale.day_ms())
                    .saturating_mul(2)
                    .min(self.scale.year_ms());
            }
            ReviewOutcome::Negative => {
                next.review_count = 0;
                next.interval = self.scale.day_ms();
            }
        }
        next.last_reviewed = Some(now);
        next.next_review = now + next.interval;
        next
    }

    /// Make the item due immediately ("review today").
    #[must_use]
    pub fn reschedule_to_now(&self, item: &SavedItem, now: i64) -> SavedItem {
        SavedItem {
            next_review: now,
            ..item.clone()
        }
    }

    /// Halve the remaining wait ("review earlier").
    ///
    /// An item that is already due is returned unchanged.
    #[must_use]
    pub fn reschedule_earlier(&self, item: &SavedItem, now: i64) -> SavedItem {
        let remaining = item.next_review - now;
        if remaining <= 0 {
            return item.clone();
        }
        SavedItem {
            next_review: now + remaining / 2,
            ..item.clone()
        }
    }
}

/// Whether the item is eligible for resurfacing at `now`.
#[must_use]
pub fn is_due(item: &SavedItem, now: i64) -> bool {
    item.next_review <= now
}
