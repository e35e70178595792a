//! Wire Messages
//!
//! JSON messages exchanged over a session's socket, one per line, tagged
//! with `"type"`.

use serde::{Deserialize, Serialize};

use crate::models::{Item, ItemId, Lane};
use crate::topic::Scope;

/// Client-proposed move; never durable
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveIntent {
    pub scope: Scope,
    pub item_id: ItemId,
    pub from_lane: Lane,
    pub to_lane: Lane,
    /// Item that ends up directly before the moved one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub before_item_id: Option<ItemId>,
    /// Item that ends up directly after the moved one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub after_item_id: Option<ItemId>,
    pub provisional_rank: f64,
}

/// Server-canonical move, safe to re-apply
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MutationEvent {
    pub scope: Scope,
    pub item_id: ItemId,
    pub from_lane: Lane,
    pub to_lane: Lane,
    pub rank: f64,
    pub insert_index: usize,
    /// Canonical copy of the moved item, for sessions that never fetched it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item: Option<Item>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArrivalEvent {
    pub scope: Scope,
    pub item: Item,
    pub lane: Lane,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemovalEvent {
    pub scope: Scope,
    pub item_id: ItemId,
}

/// Lane renumbered after rank precision ran out; order is unchanged
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RerankEvent {
    pub scope: Scope,
    pub lane: Lane,
    pub ranks: Vec<(ItemId, f64)>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    Identify {
        actor: String,
        tenant: u64,
    },
    Join {
        scope: Scope,
    },
    Leave {
        scope: Scope,
    },
    MoveIntent(MoveIntent),
    #[serde(rename_all = "camelCase")]
    ClaimIntent {
        scope: Scope,
        item_id: ItemId,
    },
    /// Initial lane fetch; answered with `ServerMessage::Snapshot`
    #[serde(rename_all = "camelCase")]
    Fetch {
        request_id: u64,
        scope: Scope,
        lane: Lane,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    MutationEvent(MutationEvent),
    ArrivalEvent(ArrivalEvent),
    RemovalEvent(RemovalEvent),
    RerankEvent(RerankEvent),
    #[serde(rename_all = "camelCase")]
    Snapshot {
        request_id: u64,
        scope: Scope,
        lane: Lane,
        items: Vec<Item>,
    },
    /// Sent to the originating session only; never broadcast
    #[serde(rename_all = "camelCase")]
    Rejected {
        scope: Scope,
        item_id: ItemId,
        reason: String,
    },
    Error {
        message: String,
    },
}

impl ServerMessage {
    /// Room the message belongs to; `None` for connection-level errors
    pub fn scope(&self) -> Option<Scope> {
        match self {
            ServerMessage::MutationEvent(ev) => Some(ev.scope),
            ServerMessage::ArrivalEvent(ev) => Some(ev.scope),
            ServerMessage::RemovalEvent(ev) => Some(ev.scope),
            ServerMessage::RerankEvent(ev) => Some(ev.scope),
            ServerMessage::Snapshot { scope, .. } | ServerMessage::Rejected { scope, .. } => {
                Some(*scope)
            }
            ServerMessage::Error { .. } => None,
        }
    }

    /// Fan-out events, as opposed to replies meant for one session
    pub fn is_broadcast(&self) -> bool {
        matches!(
            self,
            ServerMessage::MutationEvent(_)
                | ServerMessage::ArrivalEvent(_)
                | ServerMessage::RemovalEvent(_)
                | ServerMessage::RerankEvent(_)
        )
    }
}
