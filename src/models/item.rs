//! Saved item model: one resurfacable post plus its review schedule.

use serde::{Deserialize, Serialize};

/// Engagement counters captured when the post was saved.
///
/// Values are kept exactly as displayed by the source feed (for example
/// `"1.2K"`); nothing in this crate parses them.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PostMetrics {
    /// Reply count as displayed.
    #[serde(default)]
    pub replies: String,
    /// Repost count as displayed.
    #[serde(default)]
    pub retweets: String,
    /// Like count as displayed.
    #[serde(default)]
    pub likes: String,
    /// View count as displayed.
    #[serde(default)]
    pub views: String,
}

/// Display data for a saved post.
///
/// The scheduler and the insertion queue never interpret these fields;
/// they are threaded through to the renderer untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PostPayload {
    /// Link back to the original post.
    #[serde(default)]
    pub url: String,
    /// Author handle.
    #[serde(default)]
    pub handle: String,
    /// Author profile picture URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_pic: Option<String>,
    /// Author profile URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_link: Option<String>,
    /// Post body text.
    #[serde(default)]
    pub text: String,
    /// First attached media URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_url: Option<String>,
    /// Quoted post URL, if the post quotes another.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quoted_tweet_url: Option<String>,
    /// Outbound links found in the post body.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub links: Vec<String>,
    /// Engagement counters at save time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics: Option<PostMetrics>,
}

/// A saved post and its spaced-repetition state.
///
/// All timestamps are milliseconds since the Unix epoch and all durations
/// are milliseconds. Persisted with camelCase keys so the stored shape
/// is `{ id, ...payload, interval, nextReview, lastReviewed, reviewCount }`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SavedItem {
    /// Stable identifier of the source post; unique key in the store.
    pub id: String,
    /// Opaque display data.
    #[serde(flatten)]
    pub payload: PostPayload,
    /// Wait after a positive review, clamped to `[one day, one year]`.
    pub interval: i64,
    /// When the item becomes eligible for resurfacing.
    pub next_review: i64,
    /// Most recent review outcome time; `None` until first reviewed.
    #[serde(default)]
    pub last_reviewed: Option<i64>,
    /// Consecutive positive reviews since the last reset.
    #[serde(default)]
    pub review_count: u32,
}
