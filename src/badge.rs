//! Unread Badges
//!
//! Per-lane unread counts derived from one mark per item. Marking is
//! idempotent, so replayed events never double-count.

use std::collections::HashMap;

use crate::models::{ItemId, Lane};

#[derive(Debug, Default, Clone)]
pub struct UnreadBadges {
    marks: HashMap<ItemId, Lane>,
}

impl UnreadBadges {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark the item unread in `lane`, replacing any mark in another lane
    pub fn mark(&mut self, id: ItemId, lane: &Lane) {
        self.marks.insert(id, lane.clone());
    }

    /// Clear the item's mark if it is held by `lane`
    pub fn leave(&mut self, id: ItemId, lane: &Lane) {
        if self.marks.get(&id) == Some(lane) {
            self.marks.remove(&id);
        }
    }

    /// Detail view opened, or the item is gone
    pub fn clear(&mut self, id: ItemId) -> bool {
        self.marks.remove(&id).is_some()
    }

    pub fn is_unread(&self, id: ItemId) -> bool {
        self.marks.contains_key(&id)
    }

    pub fn count(&self, lane: &Lane) -> usize {
        self.marks.values().filter(|marked| *marked == lane).count()
    }
}
