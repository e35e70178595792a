//! Optimistic Mutation Controller
//!
//! Turns a finished drag into an immediate local move plus an outbound
//! `move_intent`. The local move never waits on the server; the canonical
//! event that follows is reconciled on top of it.

use drag_gesture::DragOutcome;

use crate::channel::{Channel, SyncResult};
use crate::models::{Item, ItemId, Lane};
use crate::protocol::{ClientMessage, MoveIntent};
use crate::rank;
use crate::store::QueueStore;
use crate::topic::Scope;

/// A move resolved against the local view, not yet applied
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedMove {
    pub item_id: ItemId,
    pub from: Lane,
    pub to: Lane,
    /// Final index in the destination lane
    pub index: usize,
    pub rank: f64,
    pub before: Option<ItemId>,
    pub after: Option<ItemId>,
}

/// Resolve a drop against the current local view
///
/// `dest_index` is the item's final position: for a same-lane reorder it is
/// counted with the dragged item already taken out. Returns `None` when the
/// item is not in `source` locally or the drop lands where it already is.
pub fn plan_drop(
    store: &QueueStore,
    item_id: ItemId,
    source: &Lane,
    dest: &Lane,
    dest_index: usize,
) -> Option<PlannedMove> {
    let (lane, current) = store.position(item_id)?;
    if lane != source {
        return None;
    }

    let others: Vec<&Item> = store
        .items(dest)
        .iter()
        .filter(|item| item.id != item_id)
        .collect();
    let index = dest_index.min(others.len());
    if source == dest && index == current {
        return None;
    }

    let before = index.checked_sub(1).and_then(|i| others.get(i)).copied();
    let after = others.get(index).copied();
    Some(PlannedMove {
        item_id,
        from: source.clone(),
        to: dest.clone(),
        index,
        rank: rank::allocate(before.map(|i| i.rank), after.map(|i| i.rank)),
        before: before.map(|i| i.id),
        after: after.map(|i| i.id),
    })
}

pub struct OptimisticController<C: Channel> {
    channel: C,
}

impl<C: Channel> OptimisticController<C> {
    pub fn new(channel: C) -> Self {
        Self { channel }
    }

    pub fn channel(&self) -> &C {
        &self.channel
    }

    /// Apply a drag end locally and emit the intent
    ///
    /// No-op drops emit nothing and leave the store untouched. If the intent
    /// cannot be sent the local move is kept as the best guess.
    pub fn on_drag_end(
        &self,
        store: &mut QueueStore,
        scope: Scope,
        item_id: ItemId,
        source: &Lane,
        dest: &Lane,
        dest_index: usize,
    ) -> SyncResult<Option<MoveIntent>> {
        let Some(planned) = plan_drop(store, item_id, source, dest, dest_index) else {
            log::debug!("drop of {} onto {}[{}] is a no-op", item_id, dest, dest_index);
            return Ok(None);
        };

        store.move_across_lanes(
            planned.item_id,
            &planned.from,
            &planned.to,
            planned.index,
            planned.rank,
        );
        store.mark_pending(planned.item_id, planned.to.clone(), planned.rank);

        let intent = MoveIntent {
            scope,
            item_id: planned.item_id,
            from_lane: planned.from,
            to_lane: planned.to,
            before_item_id: planned.before,
            after_item_id: planned.after,
            provisional_rank: planned.rank,
        };
        log::debug!(
            "optimistic move {} {} -> {} at rank {}",
            intent.item_id,
            intent.from_lane,
            intent.to_lane,
            intent.provisional_rank
        );
        self.channel.send(ClientMessage::MoveIntent(intent.clone()))?;
        Ok(Some(intent))
    }

    /// Finish a gesture from the drag tracker; only real drops move anything
    pub fn on_drop(
        &self,
        store: &mut QueueStore,
        scope: Scope,
        outcome: DragOutcome<ItemId, Lane>,
    ) -> SyncResult<Option<MoveIntent>> {
        match outcome {
            DragOutcome::Dropped {
                item,
                source,
                target,
            } => self.on_drag_end(store, scope, item, &source, &target.lane, target.index),
            DragOutcome::Cancelled { item } => {
                log::debug!("drag of {} cancelled", item);
                Ok(None)
            }
            DragOutcome::Click { .. } | DragOutcome::Idle => Ok(None),
        }
    }

    /// Ask the server to claim a ticket; the move arrives as a canonical event
    pub fn claim(&self, scope: Scope, item_id: ItemId) -> SyncResult<()> {
        self.channel.send(ClientMessage::ClaimIntent { scope, item_id })
    }
}
