//! Review outcome reported by the user for a resurfaced item.

use serde::{Deserialize, Serialize};

/// Whether the user remembered the item when it resurfaced.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ReviewOutcome {
    /// Remembered: the interval doubles.
    Positive,
    /// Forgotten: the interval resets to one day.
    Negative,
}
