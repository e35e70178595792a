//! Lane Service
//!
//! Sequencer plus hub: every canonical change goes through here so it is
//! persisted and broadcast together.
//!
//! `order` is held from the sequencer's first read until the resulting
//! events (or the snapshot reply) are queued on every outbound sender.
//! Each session's queue therefore sees changes in commit order.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use lane_sync::{ArrivalEvent, ItemId, Lane, RemovalEvent, RerankEvent, Scope, ServerMessage};
use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::{Mutex, MutexGuard};

use crate::domain::{Actor, DomainResult};
use crate::hub::Hub;
use crate::sequencer::{MoveOutcome, Sequencer};
use crate::session::Session;

pub struct LaneService {
    sequencer: Sequencer,
    hub: Hub,
    order: Mutex<()>,
    next_session: AtomicU64,
}

impl LaneService {
    pub fn new(sequencer: Sequencer) -> Self {
        Self {
            sequencer,
            hub: Hub::new(),
            order: Mutex::new(()),
            next_session: AtomicU64::new(1),
        }
    }

    pub fn sequencer(&self) -> &Sequencer {
        &self.sequencer
    }

    pub fn hub(&self) -> &Hub {
        &self.hub
    }

    /// Serialize a change (or a snapshot read) with its delivery
    pub(crate) async fn order(&self) -> MutexGuard<'_, ()> {
        self.order.lock().await
    }

    /// New session whose replies and room events go to `outbound`
    pub fn open_session(self: &Arc<Self>, outbound: UnboundedSender<ServerMessage>) -> Session {
        let id = self.next_session.fetch_add(1, Ordering::Relaxed);
        log::debug!("session {} opened", id);
        Session::new(id, Arc::clone(self), outbound)
    }

    /// Broadcast a move or claim result; call with `order` held
    pub(crate) fn publish_outcome(&self, outcome: MoveOutcome) {
        if let MoveOutcome::Moved { event, rerank } = outcome {
            self.hub.publish(&ServerMessage::MutationEvent(event));
            if let Some(rerank) = rerank {
                self.hub.publish(&ServerMessage::RerankEvent(rerank));
            }
        }
    }

    pub async fn create_item(
        &self,
        actor: &Actor,
        scope: Scope,
        lane: &Lane,
        title: &str,
        data: serde_json::Value,
    ) -> DomainResult<ArrivalEvent> {
        let _order = self.order().await;
        let event = self
            .sequencer
            .create_item(actor, scope, lane, title, data)
            .await?;
        self.hub.publish(&ServerMessage::ArrivalEvent(event.clone()));
        Ok(event)
    }

    pub async fn remove_item(
        &self,
        actor: &Actor,
        scope: Scope,
        id: ItemId,
    ) -> DomainResult<RemovalEvent> {
        let _order = self.order().await;
        let event = self.sequencer.remove_item(actor, scope, id).await?;
        self.hub.publish(&ServerMessage::RemovalEvent(event.clone()));
        Ok(event)
    }

    /// Maintenance respace of a whole lane
    pub async fn rerank_lane(&self, scope: Scope, lane: &Lane) -> DomainResult<RerankEvent> {
        let _order = self.order().await;
        let event = self.sequencer.rerank_lane(scope, lane).await?;
        self.hub.publish(&ServerMessage::RerankEvent(event.clone()));
        Ok(event)
    }
}
