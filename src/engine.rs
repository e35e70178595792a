//! Sync Engine
//!
//! One session's state: an open view per scope, each with its own store,
//! reconciler and room subscription. All mutation happens inside `&mut self`
//! calls, one gesture or one incoming message per call.

use std::collections::HashMap;

use drag_gesture::DragOutcome;

use crate::channel::{Channel, LaneSource, SyncResult};
use crate::controller::OptimisticController;
use crate::models::{Item, ItemId, Lane};
use crate::protocol::{ClientMessage, MoveIntent, ServerMessage};
use crate::reconciler::EventReconciler;
use crate::store::QueueStore;
use crate::subscription::Subscription;
use crate::topic::Scope;

/// An open view: dropping it leaves the room
struct View<C: Channel> {
    _subscription: Subscription<C>,
    store: QueueStore,
    reconciler: EventReconciler,
}

pub struct SyncEngine<C: Channel> {
    controller: OptimisticController<C>,
    views: HashMap<Scope, View<C>>,
    fetches: HashMap<u64, (Scope, Lane)>,
    next_request_id: u64,
}

impl<C: Channel> SyncEngine<C> {
    pub fn new(channel: C) -> Self {
        Self {
            controller: OptimisticController::new(channel),
            views: HashMap::new(),
            fetches: HashMap::new(),
            next_request_id: 1,
        }
    }

    fn channel(&self) -> &C {
        self.controller.channel()
    }

    /// Introduce the session; the server ignores intents until this is sent
    pub fn identify(&self, actor: impl Into<String>, tenant: u64) -> SyncResult<()> {
        self.channel().send(ClientMessage::Identify {
            actor: actor.into(),
            tenant,
        })
    }

    /// Join `scope` and materialize already-fetched lanes
    ///
    /// Reopening a scope leaves the previous subscription before joining
    /// again, so joins and leaves always pair up.
    pub fn open_view(&mut self, scope: Scope, lanes: Vec<(Lane, Vec<Item>)>) -> SyncResult<()> {
        self.close_view(scope);
        let subscription = Subscription::join(self.channel().clone(), scope)?;
        let mut store = QueueStore::new();
        for (lane, items) in lanes {
            store.load(lane, items);
        }
        self.views.insert(
            scope,
            View {
                _subscription: subscription,
                store,
                reconciler: EventReconciler::new(),
            },
        );
        Ok(())
    }

    /// Join `scope`, then fetch and load each lane
    ///
    /// Joining first means no event is missed between fetch and join. On a
    /// failed fetch the subscription is dropped, which sends `leave`.
    pub async fn open_view_from<S>(
        &mut self,
        source: &S,
        scope: Scope,
        lanes: &[Lane],
    ) -> SyncResult<()>
    where
        S: LaneSource + ?Sized,
    {
        self.close_view(scope);
        let subscription = Subscription::join(self.channel().clone(), scope)?;
        let mut store = QueueStore::new();
        for lane in lanes {
            let items = source.fetch_lane(scope, lane).await?;
            store.load(lane.clone(), items);
        }
        self.views.insert(
            scope,
            View {
                _subscription: subscription,
                store,
                reconciler: EventReconciler::new(),
            },
        );
        Ok(())
    }

    /// Join `scope` with empty lanes and request their contents over the
    /// channel; `Snapshot` replies fill them in.
    pub fn open_view_remote(&mut self, scope: Scope, lanes: &[Lane]) -> SyncResult<()> {
        self.open_view(
            scope,
            lanes.iter().map(|lane| (lane.clone(), Vec::new())).collect(),
        )?;
        for lane in lanes {
            self.request_lane(scope, lane.clone())?;
        }
        Ok(())
    }

    /// Ask the server for the full contents of a lane
    pub fn request_lane(&mut self, scope: Scope, lane: Lane) -> SyncResult<u64> {
        let request_id = self.next_request_id;
        self.next_request_id += 1;
        self.channel().send(ClientMessage::Fetch {
            request_id,
            scope,
            lane: lane.clone(),
        })?;
        self.fetches.insert(request_id, (scope, lane));
        Ok(request_id)
    }

    /// Leave the room and drop the scope's cached lanes
    pub fn close_view(&mut self, scope: Scope) -> bool {
        self.fetches.retain(|_, (pending, _)| *pending != scope);
        self.views.remove(&scope).is_some()
    }

    pub fn is_open(&self, scope: Scope) -> bool {
        self.views.contains_key(&scope)
    }

    pub fn open_scopes(&self) -> Vec<Scope> {
        let mut scopes: Vec<Scope> = self.views.keys().copied().collect();
        scopes.sort();
        scopes
    }

    pub fn store(&self, scope: Scope) -> Option<&QueueStore> {
        self.views.get(&scope).map(|view| &view.store)
    }

    pub fn unread(&self, scope: Scope, lane: &Lane) -> usize {
        self.views
            .get(&scope)
            .map(|view| view.reconciler.unread(lane))
            .unwrap_or(0)
    }

    /// Detail view of an item was opened
    pub fn mark_seen(&mut self, scope: Scope, id: ItemId) {
        if let Some(view) = self.views.get_mut(&scope) {
            view.reconciler.mark_seen(id);
        }
    }

    /// Finished drag inside a view
    pub fn drag_end(
        &mut self,
        scope: Scope,
        item_id: ItemId,
        source: &Lane,
        dest: &Lane,
        dest_index: usize,
    ) -> SyncResult<Option<MoveIntent>> {
        let Some(view) = self.views.get_mut(&scope) else {
            return Ok(None);
        };
        self.controller
            .on_drag_end(&mut view.store, scope, item_id, source, dest, dest_index)
    }

    /// Finished gesture from a `DragTracker`
    pub fn drop_outcome(
        &mut self,
        scope: Scope,
        outcome: DragOutcome<ItemId, Lane>,
    ) -> SyncResult<Option<MoveIntent>> {
        let Some(view) = self.views.get_mut(&scope) else {
            return Ok(None);
        };
        self.controller.on_drop(&mut view.store, scope, outcome)
    }

    pub fn claim(&self, scope: Scope, item_id: ItemId) -> SyncResult<()> {
        self.controller.claim(scope, item_id)
    }

    /// Apply one message from the server
    pub fn handle(&mut self, msg: &ServerMessage) {
        if let ServerMessage::Snapshot {
            request_id,
            scope,
            lane,
            items,
        } = msg
        {
            self.on_snapshot(*request_id, *scope, lane, items);
            return;
        }
        let Some(scope) = msg.scope() else {
            if let ServerMessage::Error { message } = msg {
                log::warn!("server error: {}", message);
            }
            return;
        };
        match self.views.get_mut(&scope) {
            Some(view) => view.reconciler.apply(&mut view.store, msg),
            None => log::debug!("event for {} ignored, view not open", scope),
        }
    }

    fn on_snapshot(&mut self, request_id: u64, scope: Scope, lane: &Lane, items: &[Item]) {
        if self.fetches.remove(&request_id) != Some((scope, lane.clone())) {
            log::debug!("unexpected snapshot {} for {}/{}", request_id, scope, lane);
            return;
        }
        if let Some(view) = self.views.get_mut(&scope) {
            view.store.load(lane.clone(), items.to_vec());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::{MemoryChannel, SyncError};
    use crate::protocol::{ArrivalEvent, MutationEvent};
    use async_trait::async_trait;

    const INBOX: Scope = Scope::Department {
        tenant: 1,
        department: 1,
    };
    const OTHER: Scope = Scope::Department {
        tenant: 1,
        department: 2,
    };

    fn item(id: u64, lane: &str, rank: f64) -> Item {
        Item::new(ItemId(id), Lane::new(lane), rank, format!("T{}", id))
    }

    struct FixedSource {
        fail_on: Option<Lane>,
    }

    #[async_trait]
    impl LaneSource for FixedSource {
        async fn fetch_lane(&self, _scope: Scope, lane: &Lane) -> SyncResult<Vec<Item>> {
            if self.fail_on.as_ref() == Some(lane) {
                return Err(SyncError::Fetch("backend down".to_string()));
            }
            // one distinct item per lane, so loading one lane never steals from another
            let id = if lane.as_str() == "new" { 1 } else { 2 };
            Ok(vec![item(id, lane.as_str(), 640.0)])
        }
    }

    #[test]
    fn test_reopen_pairs_join_and_leave() {
        let channel = MemoryChannel::new();
        let mut engine = SyncEngine::new(channel.clone());

        engine.open_view(INBOX, vec![(Lane::new("new"), vec![])]).unwrap();
        engine.open_view(INBOX, vec![(Lane::new("open"), vec![])]).unwrap();
        engine.close_view(INBOX);

        assert_eq!(
            channel.take(),
            vec![
                ClientMessage::Join { scope: INBOX },
                ClientMessage::Leave { scope: INBOX },
                ClientMessage::Join { scope: INBOX },
                ClientMessage::Leave { scope: INBOX },
            ]
        );
    }

    #[test]
    fn test_drop_engine_leaves_every_room() {
        let channel = MemoryChannel::new();
        {
            let mut engine = SyncEngine::new(channel.clone());
            engine.open_view(INBOX, vec![]).unwrap();
            engine.open_view(OTHER, vec![]).unwrap();
            assert_eq!(engine.open_scopes(), vec![INBOX, OTHER]);
        }
        let leaves = channel
            .take()
            .into_iter()
            .filter(|msg| matches!(msg, ClientMessage::Leave { .. }))
            .count();
        assert_eq!(leaves, 2);
    }

    #[test]
    fn test_events_route_by_scope() {
        let mut engine = SyncEngine::new(MemoryChannel::new());
        engine.open_view(INBOX, vec![(Lane::new("new"), vec![])]).unwrap();
        engine.open_view(OTHER, vec![(Lane::new("new"), vec![])]).unwrap();

        engine.handle(&ServerMessage::ArrivalEvent(ArrivalEvent {
            scope: OTHER,
            item: item(7, "new", 640.0),
            lane: Lane::new("new"),
        }));

        assert!(engine.store(INBOX).unwrap().items(&Lane::new("new")).is_empty());
        assert_eq!(engine.store(OTHER).unwrap().ids(&Lane::new("new")), vec![ItemId(7)]);
        assert_eq!(engine.unread(OTHER, &Lane::new("new")), 1);
        engine.mark_seen(OTHER, ItemId(7));
        assert_eq!(engine.unread(OTHER, &Lane::new("new")), 0);
    }

    #[test]
    fn test_events_for_closed_scope_are_ignored() {
        let mut engine = SyncEngine::new(MemoryChannel::new());
        engine.handle(&ServerMessage::MutationEvent(MutationEvent {
            scope: INBOX,
            item_id: ItemId(1),
            from_lane: Lane::new("new"),
            to_lane: Lane::new("open"),
            rank: 640.0,
            insert_index: 0,
            item: None,
        }));
        assert!(engine.store(INBOX).is_none());
    }

    #[test]
    fn test_remote_fetch_fills_lane() {
        let channel = MemoryChannel::new();
        let mut engine = SyncEngine::new(channel.clone());
        engine.open_view_remote(INBOX, &[Lane::new("new")]).unwrap();

        let request_id = channel
            .take()
            .into_iter()
            .find_map(|msg| match msg {
                ClientMessage::Fetch { request_id, .. } => Some(request_id),
                _ => None,
            })
            .unwrap();

        engine.handle(&ServerMessage::Snapshot {
            request_id,
            scope: INBOX,
            lane: Lane::new("new"),
            items: vec![item(2, "new", 1280.0), item(1, "new", 640.0)],
        });
        assert_eq!(
            engine.store(INBOX).unwrap().ids(&Lane::new("new")),
            vec![ItemId(1), ItemId(2)]
        );

        // a second delivery of the same reply is ignored
        engine.handle(&ServerMessage::Snapshot {
            request_id,
            scope: INBOX,
            lane: Lane::new("new"),
            items: vec![],
        });
        assert_eq!(engine.store(INBOX).unwrap().items(&Lane::new("new")).len(), 2);
    }

    #[tokio::test]
    async fn test_open_view_from_source() {
        let channel = MemoryChannel::new();
        let mut engine = SyncEngine::new(channel.clone());
        let source = FixedSource { fail_on: None };

        engine
            .open_view_from(&source, INBOX, &[Lane::new("new"), Lane::new("open")])
            .await
            .unwrap();
        let store = engine.store(INBOX).unwrap();
        assert_eq!(store.ids(&Lane::new("new")), vec![ItemId(1)]);
        assert_eq!(store.ids(&Lane::new("open")), vec![ItemId(2)]);
    }

    #[tokio::test]
    async fn test_failed_fetch_still_leaves() {
        let channel = MemoryChannel::new();
        let mut engine = SyncEngine::new(channel.clone());
        let source = FixedSource {
            fail_on: Some(Lane::new("open")),
        };

        let result = engine
            .open_view_from(&source, INBOX, &[Lane::new("new"), Lane::new("open")])
            .await;
        assert!(result.is_err());
        assert!(!engine.is_open(INBOX));
        assert_eq!(
            channel.take(),
            vec![
                ClientMessage::Join { scope: INBOX },
                ClientMessage::Leave { scope: INBOX },
            ]
        );
    }

    #[test]
    fn test_drag_in_closed_view_is_ignored() {
        let channel = MemoryChannel::new();
        let mut engine = SyncEngine::new(channel.clone());
        let result = engine
            .drag_end(INBOX, ItemId(1), &Lane::new("new"), &Lane::new("open"), 0)
            .unwrap();
        assert!(result.is_none());
        assert!(channel.is_empty());
    }
}
