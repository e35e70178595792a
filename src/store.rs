//! Filtered Queue Store
//!
//! Client-side cache of the lanes a session currently views. Each lane is a
//! copy-on-write sequence: snapshots handed out by `lane` stay valid and
//! unchanged while later mutations write to a fresh copy.
//!
//! Invariant: an item is held by at most one lane at any time.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::models::{Item, ItemId, Lane};

/// Optimistic move still waiting for its canonical event
#[derive(Debug, Clone, PartialEq)]
pub struct Pending {
    pub lane: Lane,
    pub provisional_rank: f64,
}

/// Materialized lanes keyed by lane, plus an item → lane index
#[derive(Debug, Default, Clone)]
pub struct QueueStore {
    lanes: HashMap<Lane, Arc<Vec<Item>>>,
    index: HashMap<ItemId, Lane>,
    pending: HashMap<ItemId, Pending>,
    stale: HashSet<Lane>,
}

impl QueueStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_materialized(&self, lane: &Lane) -> bool {
        self.lanes.contains_key(lane)
    }

    pub fn materialized_lanes(&self) -> impl Iterator<Item = &Lane> {
        self.lanes.keys()
    }

    /// Snapshot of a lane; cheap, never observes later mutations
    pub fn lane(&self, lane: &Lane) -> Option<Arc<Vec<Item>>> {
        self.lanes.get(lane).cloned()
    }

    /// Borrowed view of a lane, empty when not materialized
    pub fn items(&self, lane: &Lane) -> &[Item] {
        self.lanes.get(lane).map(|items| items.as_slice()).unwrap_or(&[])
    }

    pub fn ids(&self, lane: &Lane) -> Vec<ItemId> {
        self.items(lane).iter().map(|item| item.id).collect()
    }

    pub fn get(&self, id: ItemId) -> Option<&Item> {
        let lane = self.index.get(&id)?;
        self.items(lane).iter().find(|item| item.id == id)
    }

    /// Lane and index currently holding `id`
    pub fn position(&self, id: ItemId) -> Option<(&Lane, usize)> {
        let lane = self.index.get(&id)?;
        let pos = self.items(lane).iter().position(|item| item.id == id)?;
        Some((lane, pos))
    }

    /// Replace a lane wholesale (initial fetch or filter switch)
    ///
    /// Items are ordered by rank, ties keeping their given order. Items that
    /// were cached in another lane are dropped from it, and optimistic marks
    /// for this lane are cleared.
    pub fn load(&mut self, lane: Lane, items: Vec<Item>) {
        if let Some(old) = self.lanes.remove(&lane) {
            for item in old.iter() {
                self.index.remove(&item.id);
            }
        }

        let mut seen = HashSet::with_capacity(items.len());
        let mut fresh: Vec<Item> = Vec::with_capacity(items.len());
        for mut item in items {
            if !seen.insert(item.id) {
                continue;
            }
            self.detach(item.id);
            item.lane = lane.clone();
            fresh.push(item);
        }
        fresh.sort_by(|a, b| a.rank.total_cmp(&b.rank));

        for item in &fresh {
            self.index.insert(item.id, lane.clone());
        }
        self.pending.retain(|_, pending| pending.lane != lane);
        self.stale.remove(&lane);
        log::debug!("loaded lane {} with {} items", lane, fresh.len());
        self.lanes.insert(lane, Arc::new(fresh));
    }

    /// Drop a lane from the cache (view closed)
    pub fn discard(&mut self, lane: &Lane) -> bool {
        let Some(old) = self.lanes.remove(lane) else {
            return false;
        };
        for item in old.iter() {
            self.index.remove(&item.id);
        }
        self.pending.retain(|_, pending| &pending.lane != lane);
        self.stale.remove(lane);
        true
    }

    /// Insert at `index` (clamped), shifting later items
    ///
    /// Any existing copy of the item is removed first. Returns false and
    /// changes nothing when the lane is not materialized.
    pub fn insert(&mut self, lane: &Lane, mut item: Item, index: usize) -> bool {
        if !self.is_materialized(lane) {
            return false;
        }
        self.detach(item.id);
        item.lane = lane.clone();
        let id = item.id;
        if let Some(items) = self.lanes.get_mut(lane) {
            let items = Arc::make_mut(items);
            let at = index.min(items.len());
            items.insert(at, item);
        }
        self.index.insert(id, lane.clone());
        true
    }

    /// Insert at the rank-ordered position, after items of equal rank
    pub fn insert_by_rank(&mut self, lane: &Lane, item: Item) -> bool {
        let at = self
            .items(lane)
            .iter()
            .filter(|existing| existing.id != item.id)
            .take_while(|existing| existing.rank <= item.rank)
            .count();
        self.insert(lane, item, at)
    }

    /// Remove from whichever lane holds it; absent items are a no-op
    pub fn remove(&mut self, id: ItemId) -> Option<Item> {
        self.pending.remove(&id);
        self.detach(id)
    }

    /// Move an item between lanes (or within one) in a single step
    ///
    /// The item must currently sit in `from`. When `to` is not materialized
    /// the item leaves the local view. Returns whether the store changed.
    pub fn move_across_lanes(
        &mut self,
        id: ItemId,
        from: &Lane,
        to: &Lane,
        index: usize,
        rank: f64,
    ) -> bool {
        if self.index.get(&id) != Some(from) {
            return false;
        }
        let Some(mut item) = self.detach(id) else {
            return false;
        };
        item.rank = rank;
        if !self.insert(to, item, index) {
            log::debug!("item {} left the local view for lane {}", id, to);
        }
        true
    }

    /// Rewrite ranks of a lane and restore rank order
    pub fn update_ranks(&mut self, lane: &Lane, ranks: &[(ItemId, f64)]) -> bool {
        let Some(items) = self.lanes.get_mut(lane) else {
            return false;
        };
        let ranks: HashMap<ItemId, f64> = ranks.iter().copied().collect();
        let items = Arc::make_mut(items);
        for item in items.iter_mut() {
            if let Some(rank) = ranks.get(&item.id) {
                item.rank = *rank;
            }
        }
        items.sort_by(|a, b| a.rank.total_cmp(&b.rank));
        true
    }

    pub fn mark_pending(&mut self, id: ItemId, lane: Lane, provisional_rank: f64) {
        self.pending.insert(
            id,
            Pending {
                lane,
                provisional_rank,
            },
        );
    }

    pub fn clear_pending(&mut self, id: ItemId) -> Option<Pending> {
        self.pending.remove(&id)
    }

    pub fn is_pending(&self, id: ItemId) -> bool {
        self.pending.contains_key(&id)
    }

    /// Flag a lane whose local order may disagree with the server
    pub fn mark_stale(&mut self, lane: &Lane) {
        if self.is_materialized(lane) {
            self.stale.insert(lane.clone());
        }
    }

    pub fn is_stale(&self, lane: &Lane) -> bool {
        self.stale.contains(lane)
    }

    /// Take the item out of its lane without touching pending marks
    fn detach(&mut self, id: ItemId) -> Option<Item> {
        let lane = self.index.remove(&id)?;
        let items = self.lanes.get_mut(&lane)?;
        let pos = items.iter().position(|item| item.id == id)?;
        Some(Arc::make_mut(items).remove(pos))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: u64, rank: f64) -> Item {
        Item::new(ItemId(id), Lane::new("new"), rank, format!("Item {}", id))
    }

    fn lanes_holding(store: &QueueStore, id: ItemId) -> usize {
        store
            .materialized_lanes()
            .filter(|lane| store.items(lane).iter().any(|i| i.id == id))
            .count()
    }

    #[test]
    fn test_load_sorts_by_rank_keeping_arrival_for_ties() {
        let mut store = QueueStore::new();
        let lane = Lane::new("new");
        store.load(lane.clone(), vec![item(1, 1280.0), item(2, 640.0), item(3, 1280.0)]);

        assert_eq!(store.ids(&lane), vec![ItemId(2), ItemId(1), ItemId(3)]);
    }

    #[test]
    fn test_load_moves_item_out_of_other_lane() {
        let mut store = QueueStore::new();
        let (new, open) = (Lane::new("new"), Lane::new("open"));
        store.load(new.clone(), vec![item(1, 640.0)]);
        store.load(open.clone(), vec![item(1, 640.0)]);

        assert!(store.items(&new).is_empty());
        assert_eq!(store.position(ItemId(1)), Some((&open, 0)));
    }

    #[test]
    fn test_load_clears_pending_for_lane() {
        let mut store = QueueStore::new();
        let lane = Lane::new("new");
        store.load(lane.clone(), vec![item(1, 640.0)]);
        store.mark_pending(ItemId(1), lane.clone(), 640.0);
        store.mark_stale(&lane);

        store.load(lane.clone(), vec![item(1, 640.0)]);
        assert!(!store.is_pending(ItemId(1)));
        assert!(!store.is_stale(&lane));
    }

    #[test]
    fn test_insert_clamps_and_requires_materialized_lane() {
        let mut store = QueueStore::new();
        let lane = Lane::new("new");
        store.load(lane.clone(), vec![item(1, 640.0)]);

        assert!(store.insert(&lane, item(2, 1280.0), 99));
        assert_eq!(store.ids(&lane), vec![ItemId(1), ItemId(2)]);

        assert!(!store.insert(&Lane::new("open"), item(3, 640.0), 0));
        assert!(store.get(ItemId(3)).is_none());
    }

    #[test]
    fn test_remove_absent_is_noop() {
        let mut store = QueueStore::new();
        assert!(store.remove(ItemId(42)).is_none());
    }

    #[test]
    fn test_move_across_lanes_keeps_exclusivity() {
        let mut store = QueueStore::new();
        let (new, open) = (Lane::new("new"), Lane::new("open"));
        store.load(new.clone(), vec![item(1, 640.0), item(2, 1280.0)]);
        store.load(open.clone(), vec![item(3, 640.0)]);

        assert!(store.move_across_lanes(ItemId(3), &open, &new, 1, 960.0));
        assert_eq!(store.ids(&new), vec![ItemId(1), ItemId(3), ItemId(2)]);
        assert!(store.items(&open).is_empty());
        assert_eq!(store.get(ItemId(3)).map(|i| i.lane.clone()), Some(new.clone()));
        for id in 1..=3 {
            assert_eq!(lanes_holding(&store, ItemId(id)), 1);
        }
    }

    #[test]
    fn test_move_from_wrong_lane_is_rejected() {
        let mut store = QueueStore::new();
        let (new, open) = (Lane::new("new"), Lane::new("open"));
        store.load(new.clone(), vec![item(1, 640.0)]);
        store.load(open.clone(), vec![]);

        assert!(!store.move_across_lanes(ItemId(1), &open, &new, 0, 1.0));
        assert_eq!(store.ids(&new), vec![ItemId(1)]);
    }

    #[test]
    fn test_move_to_unviewed_lane_leaves_view() {
        let mut store = QueueStore::new();
        let new = Lane::new("new");
        store.load(new.clone(), vec![item(1, 640.0)]);

        assert!(store.move_across_lanes(ItemId(1), &new, &Lane::new("resolved"), 0, 640.0));
        assert!(store.get(ItemId(1)).is_none());
    }

    #[test]
    fn test_snapshot_is_not_aliased() {
        let mut store = QueueStore::new();
        let lane = Lane::new("new");
        store.load(lane.clone(), vec![item(1, 640.0)]);

        let before = store.lane(&lane).unwrap();
        store.insert(&lane, item(2, 1280.0), 0);

        assert_eq!(before.len(), 1);
        assert_eq!(store.items(&lane).len(), 2);
    }

    #[test]
    fn test_insert_by_rank_goes_after_equal_ranks() {
        let mut store = QueueStore::new();
        let lane = Lane::new("new");
        store.load(lane.clone(), vec![item(1, 640.0), item(2, 1280.0)]);

        store.insert_by_rank(&lane, item(3, 640.0));
        store.insert_by_rank(&lane, item(4, 0.0));
        assert_eq!(
            store.ids(&lane),
            vec![ItemId(4), ItemId(1), ItemId(3), ItemId(2)]
        );
    }

    #[test]
    fn test_update_ranks_resorts() {
        let mut store = QueueStore::new();
        let lane = Lane::new("new");
        store.load(lane.clone(), vec![item(1, 640.0), item(2, 1280.0)]);

        store.update_ranks(&lane, &[(ItemId(1), 1920.0)]);
        assert_eq!(store.ids(&lane), vec![ItemId(2), ItemId(1)]);
    }

    #[test]
    fn test_discard_drops_index() {
        let mut store = QueueStore::new();
        let lane = Lane::new("new");
        store.load(lane.clone(), vec![item(1, 640.0)]);

        assert!(store.discard(&lane));
        assert!(!store.is_materialized(&lane));
        assert!(store.position(ItemId(1)).is_none());
    }
}
