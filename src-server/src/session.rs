//! Session
//!
//! Server side of one client connection. Broadcast events reach the session
//! through the hub; replies (`snapshot`, `rejected`, `error`) go straight
//! to its own outbound sender and nowhere else.
//!
//! Intents and fetches run under the service's order lock until their
//! events or reply are queued, so a snapshot never overtakes a later change.

use std::collections::BTreeSet;
use std::sync::Arc;

use lane_sync::{ClientMessage, ItemId, Scope, ServerMessage};
use tokio::sync::mpsc::UnboundedSender;

use crate::domain::{Actor, DomainError, DomainResult};
use crate::hub::SessionId;
use crate::sequencer::MoveOutcome;
use crate::service::LaneService;

pub struct Session {
    id: SessionId,
    service: Arc<LaneService>,
    outbound: UnboundedSender<ServerMessage>,
    actor: Option<Actor>,
    rooms: BTreeSet<Scope>,
}

impl Session {
    pub(crate) fn new(
        id: SessionId,
        service: Arc<LaneService>,
        outbound: UnboundedSender<ServerMessage>,
    ) -> Self {
        Self {
            id,
            service,
            outbound,
            actor: None,
            rooms: BTreeSet::new(),
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn actor(&self) -> Option<&Actor> {
        self.actor.as_ref()
    }

    pub fn rooms(&self) -> impl Iterator<Item = &Scope> {
        self.rooms.iter()
    }

    fn reply(&self, msg: ServerMessage) {
        if self.outbound.send(msg).is_err() {
            log::debug!("session {} outbound closed", self.id);
        }
    }

    /// Report a line that could not be decoded
    pub fn protocol_error(&self, message: impl Into<String>) {
        self.reply(ServerMessage::Error {
            message: message.into(),
        });
    }

    fn require_actor(&self) -> DomainResult<&Actor> {
        self.actor
            .as_ref()
            .ok_or_else(|| DomainError::Unauthorized("identify first".to_string()))
    }

    pub async fn handle(&mut self, msg: ClientMessage) {
        match msg {
            ClientMessage::Identify { actor, tenant } => {
                log::info!("session {} is {} (tenant {})", self.id, actor, tenant);
                self.actor = Some(Actor::new(actor, tenant));
            }
            ClientMessage::Join { scope } => self.join(scope),
            ClientMessage::Leave { scope } => {
                self.rooms.remove(&scope);
                self.service.hub().leave(scope, self.id);
            }
            ClientMessage::MoveIntent(intent) => {
                let _order = self.service.order().await;
                let result = match self.require_actor() {
                    Ok(actor) => self.service.sequencer().move_item(actor, &intent).await,
                    Err(e) => Err(e),
                };
                self.finish(intent.scope, intent.item_id, result);
            }
            ClientMessage::ClaimIntent { scope, item_id } => {
                let _order = self.service.order().await;
                let result = match self.require_actor() {
                    Ok(actor) => self.service.sequencer().claim(actor, scope, item_id).await,
                    Err(e) => Err(e),
                };
                self.finish(scope, item_id, result);
            }
            ClientMessage::Fetch {
                request_id,
                scope,
                lane,
            } => {
                let _order = self.service.order().await;
                let result = match self.require_actor() {
                    Ok(actor) => self.service.sequencer().snapshot(actor, scope, &lane).await,
                    Err(e) => Err(e),
                };
                match result {
                    Ok(items) => self.reply(ServerMessage::Snapshot {
                        request_id,
                        scope,
                        lane,
                        items,
                    }),
                    Err(e) => self.reply(ServerMessage::Error {
                        message: e.to_string(),
                    }),
                }
            }
        }
    }

    fn join(&mut self, scope: Scope) {
        let allowed = self
            .require_actor()
            .and_then(|actor| self.service.sequencer().authorize(actor, scope));
        if let Err(e) = allowed {
            log::warn!("session {} join {} refused: {}", self.id, scope, e);
            self.reply(ServerMessage::Error {
                message: e.to_string(),
            });
            return;
        }
        self.service.hub().join(scope, self.id, self.outbound.clone());
        self.rooms.insert(scope);
    }

    /// Broadcast an accepted intent, or tell only this session it was refused
    ///
    /// Called with the order lock held.
    fn finish(&self, scope: Scope, item_id: ItemId, result: DomainResult<MoveOutcome>) {
        match result {
            Ok(outcome) => self.service.publish_outcome(outcome),
            Err(e) => {
                log::warn!("session {}: intent for {} rejected: {}", self.id, item_id, e);
                self.reply(ServerMessage::Rejected {
                    scope,
                    item_id,
                    reason: e.to_string(),
                });
            }
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.service.hub().leave_all(self.id);
        log::debug!("session {} closed", self.id);
    }
}
