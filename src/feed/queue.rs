//! Insertion queue manager.
//!
//! Owns the pending due set, the occupied slot positions, and the elements
//! it has mounted. One instance lives for the lifetime of a host view; all
//! mutation happens through `&mut self`, so a single owner (normally the
//! [`runner`](super::runner)) serializes every operation.
//!
//! State machine: `Idle → Draining` on a non-empty refresh or a wake-up,
//! `Draining → Draining` for each [`drain_step`](InsertionQueue::drain_step),
//! and `Draining → Idle` once the pending queue empties or no slot is free.

use std::collections::{BTreeSet, HashMap, VecDeque};

use tracing::{debug, info, warn};

use crate::models::item::SavedItem;

use super::slot::{self, InsertionSlot};
use super::{FeedSettings, FeedView, Renderer, ScrollDirection, Viewport};

/// Result of a single [`InsertionQueue::drain_step`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DrainStep {
    /// Nothing was pending; the manager is idle.
    Idle,
    /// The popped item was already mounted and was discarded.
    Duplicate {
        /// Discarded item.
        item_id: String,
    },
    /// No slot was free; the popped item was dropped until the next due-scan.
    NoSlot {
        /// Dropped item.
        item_id: String,
    },
    /// The popped item was mounted.
    Inserted {
        /// Mounted item.
        item_id: String,
        /// Occupied position.
        position: usize,
    },
    /// The renderer refused the mount; the item was dropped.
    MountFailed {
        /// Dropped item.
        item_id: String,
    },
}

/// Result of [`InsertionQueue::on_scroll`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScrollOutcome {
    /// Items unmounted because they scrolled out of range.
    pub retired: Vec<String>,
    /// Whether an idle manager resumed draining.
    pub resumed: bool,
}

struct Mounted<H> {
    position: usize,
    handle: H,
}

/// Live working set of due items for one host view.
pub struct InsertionQueue<V, R>
where
    V: FeedView,
    R: Renderer<V::Anchor>,
{
    view: V,
    renderer: R,
    settings: FeedSettings,
    pending: VecDeque<SavedItem>,
    occupied: BTreeSet<usize>,
    mounted: HashMap<String, Mounted<R::Handle>>,
    processing: bool,
}

impl<V, R> InsertionQueue<V, R>
where
    V: FeedView,
    R: Renderer<V::Anchor>,
{
    /// Create an idle manager over a host view.
    #[must_use]
    pub fn new(view: V, renderer: R, settings: FeedSettings) -> Self {
        Self {
            view,
            renderer,
            settings,
            pending: VecDeque::new(),
            occupied: BTreeSet::new(),
            mounted: HashMap::new(),
            processing: false,
        }
    }

    /// Replace the pending queue with `due_items`.
    ///
    /// Any not-yet-inserted remainder of the previous set is discarded.
    /// Returns `true` when an idle manager starts draining and the caller
    /// should schedule a [`drain_step`](Self::drain_step).
    pub fn refresh_due_set(&mut self, due_items: Vec<SavedItem>) -> bool {
        let discarded = self.pending.len();
        self.pending = due_items.into();
        debug!(pending = self.pending.len(), discarded, "due set refreshed");
        self.wake()
    }

    /// Process exactly one pending item.
    pub fn drain_step(&mut self) -> DrainStep {
        let Some(item) = self.pending.pop_front() else {
            self.processing = false;
            return DrainStep::Idle;
        };
        self.processing = true;

        let step = self.place(item);
        if self.pending.is_empty() || matches!(step, DrainStep::NoSlot { .. }) {
            self.processing = false;
        }
        step
    }

    fn place(&mut self, item: SavedItem) -> DrainStep {
        if self.mounted.contains_key(&item.id) {
            debug!(item_id = %item.id, "item already mounted, skipping");
            return DrainStep::Duplicate { item_id: item.id };
        }

        let Some(InsertionSlot { position, anchor }) = self.find_slot() else {
            debug!(item_id = %item.id, "no insertion slot available");
            return DrainStep::NoSlot { item_id: item.id };
        };

        match self.renderer.mount(&item, &anchor) {
            Ok(handle) => {
                self.occupied.insert(position);
                self.mounted.insert(item.id.clone(), Mounted { position, handle });
                info!(item_id = %item.id, position, "inserted review item");
                DrainStep::Inserted {
                    item_id: item.id,
                    position,
                }
            }
            Err(err) => {
                warn!(item_id = %item.id, %err, "mount failed");
                DrainStep::MountFailed { item_id: item.id }
            }
        }
    }

    /// Find a free position in the current view.
    #[must_use]
    pub fn find_slot(&self) -> Option<InsertionSlot<V::Anchor>> {
        slot::find_slot(
            &self.view.viewport(),
            &self.view.foreign_items(),
            &self.occupied,
            &self.settings,
        )
    }

    /// Unmount every element whose top edge is above the look-behind bound.
    ///
    /// Returns the retired item ids.
    pub fn retire_offscreen(&mut self, viewport: &Viewport) -> Vec<String> {
        let cutoff = self.retire_cutoff(viewport);
        let mut past: Vec<(usize, &String)> = self
            .mounted
            .iter()
            .filter(|(_, m)| self.is_past(&m.handle, cutoff))
            .map(|(id, m)| (m.position, id))
            .collect();
        past.sort_unstable();
        let stale: Vec<String> = past.into_iter().map(|(_, id)| id.clone()).collect();

        for id in &stale {
            self.unmount(id);
        }
        if !stale.is_empty() {
            debug!(retired = stale.len(), "retired off-screen items");
        }
        stale
    }

    /// Retire one element after the view reports it left the observed area.
    ///
    /// Returns `true` if it was far enough past to be unmounted.
    pub fn retire_if_offscreen(&mut self, item_id: &str, viewport: &Viewport) -> bool {
        let cutoff = self.retire_cutoff(viewport);
        let past = self
            .mounted
            .get(item_id)
            .is_some_and(|m| self.is_past(&m.handle, cutoff));
        if past {
            self.unmount(item_id);
        }
        past
    }

    /// React to a scroll movement.
    ///
    /// Scrolling up retires far-behind elements; nearing the bottom of the
    /// document wakes an idle manager that still has pending items.
    pub fn on_scroll(&mut self, direction: ScrollDirection, viewport: &Viewport) -> ScrollOutcome {
        let retired = if direction == ScrollDirection::Up {
            self.retire_offscreen(viewport)
        } else {
            Vec::new()
        };

        let near_bottom = viewport.distance_from_bottom() < self.settings.scroll_threshold;
        let resumed = near_bottom && self.wake();
        ScrollOutcome { retired, resumed }
    }

    /// Start draining if idle with pending items. Returns whether it started.
    pub fn wake(&mut self) -> bool {
        if self.processing || self.pending.is_empty() {
            return false;
        }
        self.processing = true;
        true
    }

    /// Forget `item_id` entirely: unmount it and drop it from the pending queue.
    ///
    /// Returns `true` if it was mounted or pending.
    pub fn remove(&mut self, item_id: &str) -> bool {
        let before = self.pending.len();
        self.pending.retain(|item| item.id != item_id);
        let was_pending = self.pending.len() != before;
        if self.pending.is_empty() {
            self.processing = false;
        }
        self.unmount(item_id) || was_pending
    }

    /// Show the new due time on a mounted element. Returns whether it is mounted.
    pub fn show_next_review(&mut self, item_id: &str, next_review: i64) -> bool {
        match self.mounted.get(item_id) {
            Some(m) => {
                self.renderer.show_next_review(&m.handle, next_review);
                true
            }
            None => false,
        }
    }

    /// Whether the manager is draining.
    #[must_use]
    pub fn is_processing(&self) -> bool {
        self.processing
    }

    /// Ids awaiting insertion, front first.
    #[must_use]
    pub fn pending_ids(&self) -> Vec<String> {
        self.pending.iter().map(|item| item.id.clone()).collect()
    }

    /// Currently allocated positions in ascending order.
    #[must_use]
    pub fn occupied_positions(&self) -> Vec<usize> {
        self.occupied.iter().copied().collect()
    }

    /// Whether an element for `item_id` is mounted.
    #[must_use]
    pub fn is_mounted(&self, item_id: &str) -> bool {
        self.mounted.contains_key(item_id)
    }

    /// Number of mounted elements.
    #[must_use]
    pub fn mounted_count(&self) -> usize {
        self.mounted.len()
    }

    /// The host view.
    #[must_use]
    pub fn view(&self) -> &V {
        &self.view
    }

    /// The renderer.
    #[must_use]
    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    fn retire_cutoff(&self, viewport: &Viewport) -> f64 {
        viewport.scroll_y - viewport.height * self.settings.viewport_buffer
    }

    fn is_past(&self, handle: &R::Handle, cutoff: f64) -> bool {
        // A detached element no longer holds its slot.
        self.renderer.top_of(handle).is_none_or(|top| top < cutoff)
    }

    fn unmount(&mut self, item_id: &str) -> bool {
        let Some(Mounted { position, handle }) = self.mounted.remove(item_id) else {
            return false;
        };
        self.occupied.remove(&position);
        self.renderer.unmount(handle);
        debug!(item_id, position, "unmounted review item");
        true
    }
}
