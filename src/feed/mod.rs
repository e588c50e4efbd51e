//! Feed integration: resurfacing due items into a live, scrolling view.
//!
//! The view itself (its foreign items, geometry, and element mounting) is
//! owned by the host. This module defines the collaborator contracts the
//! host implements ([`FeedView`] and [`Renderer`]), the events it reports
//! back ([`FeedEvent`]), and the machinery that decides what to insert
//! where:
//!
//! - [`slot`] picks an insertion position that keeps resurfaced items spaced.
//! - [`queue`] owns the pending due set and the occupied positions.
//! - [`runner`] drives the queue from a periodic due-scan, a drain timer,
//!   and host events on one task.
//! - [`retry`] waits for the host view to become ready.

pub mod queue;
pub mod retry;
pub mod runner;
pub mod slot;

use serde::Serialize;

use crate::config::FeedConfig;
use crate::models::item::SavedItem;
use crate::Result;

/// Scroll geometry of the host view, in pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    /// Document offset of the top of the visible area.
    pub scroll_y: f64,
    /// Height of the visible area.
    pub height: f64,
    /// Total scrollable document height.
    pub document_height: f64,
}

impl Viewport {
    /// Document offset of the bottom of the visible area.
    #[must_use]
    pub fn bottom(&self) -> f64 {
        self.scroll_y + self.height
    }

    /// Remaining scrollable distance below the visible area.
    #[must_use]
    pub fn distance_from_bottom(&self) -> f64 {
        self.document_height - self.bottom()
    }
}

/// A native feed entry currently rendered by the host.
#[derive(Debug, Clone, PartialEq)]
pub struct ForeignItem<A> {
    /// Host reference used to mount before this entry.
    pub anchor: A,
    /// Document offset of the entry's top edge.
    pub top: f64,
}

/// Direction of the most recent scroll movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollDirection {
    /// Towards the top of the document.
    Up,
    /// Towards the bottom of the document.
    Down,
}

/// Source of the foreign items and geometry of the host view.
pub trait FeedView {
    /// Host reference to a foreign item.
    type Anchor: Clone;

    /// Whether the feed container exists yet.
    fn is_ready(&self) -> bool;

    /// Current scroll geometry.
    fn viewport(&self) -> Viewport;

    /// Foreign items currently rendered, in document order.
    ///
    /// Must exclude items mounted by the [`Renderer`].
    fn foreign_items(&self) -> Vec<ForeignItem<Self::Anchor>>;
}

/// Mounts resurfaced items into the host view.
///
/// The mounted element exposes remember, remove, and open-original actions;
/// the host reports their use as [`FeedEvent`]s.
pub trait Renderer<A> {
    /// Host reference to a mounted element.
    type Handle;

    /// Render `item` immediately before the foreign item `before`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Feed` if the host rejects the mount.
    fn mount(&mut self, item: &SavedItem, before: &A) -> Result<Self::Handle>;

    /// Remove a mounted element from the view.
    fn unmount(&mut self, handle: Self::Handle);

    /// Document offset of the element's top edge, or `None` once detached.
    fn top_of(&self, handle: &Self::Handle) -> Option<f64>;

    /// Replace the element's actions with the next review time.
    fn show_next_review(&mut self, handle: &Self::Handle, next_review: i64);
}

/// Notifications from the host view.
#[derive(Debug, Clone, PartialEq)]
pub enum FeedEvent {
    /// The user scrolled.
    Scrolled {
        /// Direction of the movement.
        direction: ScrollDirection,
    },
    /// A mounted element stopped intersecting the observed area.
    VisibilityLost {
        /// Item whose element left view.
        item_id: String,
    },
    /// The set of rendered foreign items changed.
    ContentChanged,
    /// The user marked a mounted item as remembered.
    Remembered {
        /// Item the action belongs to.
        item_id: String,
    },
    /// The user marked a mounted item as forgotten.
    Forgotten {
        /// Item the action belongs to.
        item_id: String,
    },
    /// The user removed a mounted item from their saved items.
    Removed {
        /// Item the action belongs to.
        item_id: String,
    },
}

/// What the runner did, for observers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FeedNotice {
    /// A due item was mounted.
    Inserted {
        /// Mounted item.
        item_id: String,
        /// Occupied slot position.
        position: usize,
    },
    /// A mounted item was unmounted after scrolling out of range.
    Retired {
        /// Unmounted item.
        item_id: String,
    },
    /// A review outcome was persisted.
    Reviewed {
        /// Reviewed item.
        item_id: String,
        /// New due time.
        next_review: i64,
    },
    /// An item was deleted from the store and the view.
    Removed {
        /// Deleted item.
        item_id: String,
    },
}

/// Spacing and geometry parameters for the insertion queue.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeedSettings {
    /// Minimum distance between occupied positions.
    pub minimum_gap: usize,
    /// Look-ahead and look-behind, in screen heights.
    pub viewport_buffer: f64,
    /// Distance from the document bottom that resumes draining, in pixels.
    pub scroll_threshold: f64,
}

impl Default for FeedSettings {
    fn default() -> Self {
        Self {
            minimum_gap: 5,
            viewport_buffer: 2.0,
            scroll_threshold: 100.0,
        }
    }
}

impl From<&FeedConfig> for FeedSettings {
    fn from(config: &FeedConfig) -> Self {
        Self {
            minimum_gap: config.minimum_gap,
            viewport_buffer: config.viewport_buffer,
            scroll_threshold: config.scroll_threshold_px,
        }
    }
}
