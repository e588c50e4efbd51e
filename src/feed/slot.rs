//! Insertion slot selection.
//!
//! A slot position is an index into the foreign items whose top edge lies
//! in `[scroll_y, bottom + height * buffer)`. A resurfaced item is always
//! mounted immediately before the chosen foreign item, so it never lands
//! above the current scroll position or after the last candidate.

use std::collections::BTreeSet;

use super::{FeedSettings, ForeignItem, Viewport};

/// A chosen insertion point.
#[derive(Debug, Clone, PartialEq)]
pub struct InsertionSlot<A> {
    /// Index among the eligible foreign items; unique while occupied.
    pub position: usize,
    /// Foreign item to mount before.
    pub anchor: A,
}

/// Whether `position` is closer than `gap` to any occupied position.
///
/// An occupied position is at distance zero from itself, so this also
/// rejects positions that are already taken.
#[must_use]
pub fn is_near_occupied(position: usize, occupied: &BTreeSet<usize>, gap: usize) -> bool {
    occupied.iter().any(|&used| used.abs_diff(position) < gap)
}

/// Pick the lowest eligible position at least `minimum_gap` away from every
/// occupied one, or `None` when the view has no room.
#[must_use]
pub fn find_slot<A: Clone>(
    viewport: &Viewport,
    candidates: &[ForeignItem<A>],
    occupied: &BTreeSet<usize>,
    settings: &FeedSettings,
) -> Option<InsertionSlot<A>> {
    let lower = viewport.scroll_y;
    let upper = viewport.bottom() + viewport.height * settings.viewport_buffer;

    candidates
        .iter()
        .filter(|item| item.top >= lower && item.top < upper)
        .enumerate()
        .find(|(position, _)| !is_near_occupied(*position, occupied, settings.minimum_gap))
        .map(|(position, item)| InsertionSlot {
            position,
            anchor: item.anchor.clone(),
        })
}
