//! Stable node identifiers for live UI elements.
//!
//! Ids are kept in a generational slot table keyed by [`ElementHandle::slot`].
//! The table is shared between the capture phase and the background worker, so it
//! lives in a `DashMap`. Entries are removed explicitly, either when the host reports
//! that an element was destroyed or during a periodic sweep of dead handles.

use crate::types::{ElementHandle, NodeId};
use dashmap::DashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use tracing::trace;

/// Ids reserved for one live element
#[derive(Debug, Clone)]
struct SlotEntry {
    generation: u32,
    ids: Vec<NodeId>,
}

/// Issues stable, never-reused ids for UI elements
#[derive(Debug, Default)]
pub struct IdentityGenerator {
    slots: DashMap<u32, SlotEntry>,
    next_id: AtomicI64,
}

impl IdentityGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the id of an element, assigning a fresh one on first sight
    pub fn node_id(&self, handle: ElementHandle) -> NodeId {
        self.node_ids(handle, 1)[0]
    }

    /// Get `count` ids for an element that renders several wireframes.
    ///
    /// The run of ids is stable across calls; asking for more ids than were
    /// reserved before extends the run without changing the existing ones.
    /// A handle older than the tracked generation gets ids that are never
    /// reused and leaves the live element's run alone.
    pub fn node_ids(&self, handle: ElementHandle, count: usize) -> Vec<NodeId> {
        let count = count.max(1);
        let mut entry = self.slots.entry(handle.slot).or_insert_with(|| SlotEntry {
            generation: handle.generation,
            ids: Vec::new(),
        });

        if handle.generation < entry.generation {
            trace!(
                "Stale handle for slot {} (generation {} < {}), issuing one-off ids",
                handle.slot,
                handle.generation,
                entry.generation
            );
            return (0..count)
                .map(|_| self.next_id.fetch_add(1, Ordering::Relaxed))
                .collect();
        }

        if handle.generation > entry.generation {
            trace!(
                "Slot {} reused (generation {} -> {}), issuing fresh ids",
                handle.slot,
                entry.generation,
                handle.generation
            );
            entry.generation = handle.generation;
            entry.ids.clear();
        }

        while entry.ids.len() < count {
            entry.ids.push(self.next_id.fetch_add(1, Ordering::Relaxed));
        }

        entry.ids[..count].to_vec()
    }

    /// Forget an element that the host destroyed.
    ///
    /// A stale handle (older generation than the one tracked) is ignored.
    pub fn element_destroyed(&self, handle: ElementHandle) {
        self.slots
            .remove_if(&handle.slot, |_, entry| entry.generation == handle.generation);
    }

    /// Drop every tracked element for which `is_alive` returns false
    pub fn sweep<F>(&self, mut is_alive: F) -> usize
    where
        F: FnMut(ElementHandle) -> bool,
    {
        let before = self.slots.len();
        self.slots
            .retain(|slot, entry| is_alive(ElementHandle::new(*slot, entry.generation)));
        let removed = before.saturating_sub(self.slots.len());
        if removed > 0 {
            trace!("Swept {} dead element slots", removed);
        }
        removed
    }

    /// Number of elements currently tracked
    pub fn tracked_count(&self) -> usize {
        self.slots.len()
    }
}
