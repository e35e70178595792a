//! Event Reconciler
//!
//! Applies server-canonical events to the local store. Every handler is
//! idempotent: replaying an event, or applying it on top of the equivalent
//! optimistic move, leaves the same state as applying it once.

use crate::badge::UnreadBadges;
use crate::models::{ItemId, Lane};
use crate::protocol::{ArrivalEvent, MutationEvent, RemovalEvent, RerankEvent, ServerMessage};
use crate::store::QueueStore;

#[derive(Debug, Default)]
pub struct EventReconciler {
    badges: UnreadBadges,
}

impl EventReconciler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn unread(&self, lane: &Lane) -> usize {
        self.badges.count(lane)
    }

    /// Detail view of the item was opened
    pub fn mark_seen(&mut self, id: ItemId) {
        self.badges.clear(id);
    }

    /// Route a broadcast event; replies and errors are not handled here
    pub fn apply(&mut self, store: &mut QueueStore, msg: &ServerMessage) {
        match msg {
            ServerMessage::MutationEvent(ev) => self.on_mutation_event(store, ev),
            ServerMessage::ArrivalEvent(ev) => self.on_arrival_event(store, ev),
            ServerMessage::RemovalEvent(ev) => self.on_removal_event(store, ev),
            ServerMessage::RerankEvent(ev) => self.on_rerank_event(store, ev),
            ServerMessage::Rejected { item_id, reason, .. } => {
                self.on_rejected(store, *item_id, reason)
            }
            ServerMessage::Snapshot { .. } => {}
            ServerMessage::Error { message } => log::warn!("server error: {}", message),
        }
    }

    /// Move the item to its canonical lane, rank and index
    ///
    /// The item is always taken out of wherever it sits locally first. When
    /// the destination lane is not materialized only its unread badge moves.
    pub fn on_mutation_event(&mut self, store: &mut QueueStore, ev: &MutationEvent) {
        let local = store.remove(ev.item_id);
        let crossed = ev.from_lane != ev.to_lane;

        if crossed {
            self.badges.leave(ev.item_id, &ev.from_lane);
        }
        if let Some(local) = &local {
            if local.lane != ev.to_lane {
                self.badges.leave(ev.item_id, &local.lane);
            }
        }

        if !store.is_materialized(&ev.to_lane) {
            if crossed {
                self.badges.mark(ev.item_id, &ev.to_lane);
            }
            log::debug!("{} moved to unviewed lane {}", ev.item_id, ev.to_lane);
            return;
        }

        let Some(mut item) = ev.item.clone().or(local) else {
            log::warn!(
                "{} moved into {} but no copy is known locally",
                ev.item_id,
                ev.to_lane
            );
            store.mark_stale(&ev.to_lane);
            return;
        };
        item.rank = ev.rank;
        store.insert(&ev.to_lane, item, ev.insert_index);
    }

    /// New item appeared in a lane
    pub fn on_arrival_event(&mut self, store: &mut QueueStore, ev: &ArrivalEvent) {
        let mut item = ev.item.clone();
        item.lane = ev.lane.clone();
        if !store.insert_by_rank(&ev.lane, item) {
            // arrival into a lane we do not view; a stale local copy must go
            store.remove(ev.item.id);
        }
        self.badges.mark(ev.item.id, &ev.lane);
    }

    /// Item is gone from every lane
    pub fn on_removal_event(&mut self, store: &mut QueueStore, ev: &RemovalEvent) {
        store.remove(ev.item_id);
        self.badges.clear(ev.item_id);
    }

    pub fn on_rerank_event(&mut self, store: &mut QueueStore, ev: &RerankEvent) {
        if store.update_ranks(&ev.lane, &ev.ranks) {
            log::info!("lane {} re-ranked ({} items)", ev.lane, ev.ranks.len());
        }
    }

    /// The server refused one of our intents; no rollback, the lanes it
    /// touched are flagged for re-fetch instead
    pub fn on_rejected(&mut self, store: &mut QueueStore, item_id: ItemId, reason: &str) {
        log::warn!("intent for {} rejected: {}", item_id, reason);
        if let Some(pending) = store.clear_pending(item_id) {
            store.mark_stale(&pending.lane);
        }
        let current = store.position(item_id).map(|(lane, _)| lane.clone());
        if let Some(lane) = current {
            store.mark_stale(&lane);
        }
    }
}
