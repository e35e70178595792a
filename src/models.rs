//! Queue Models
//!
//! Data structures shared between client sessions and the server.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Stable item identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(pub u64);

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Named partition of a collection (ticket status or board column)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Lane(String);

impl Lane {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Lane {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Lane {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<TicketStatus> for Lane {
    fn from(status: TicketStatus) -> Self {
        Self::new(status.as_str())
    }
}

/// Ticket lifecycle states, each backed by a lane of the same name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TicketStatus {
    New,
    Open,
    Resolved,
    Deleted,
}

impl TicketStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TicketStatus::New => "new",
            TicketStatus::Open => "open",
            TicketStatus::Resolved => "resolved",
            TicketStatus::Deleted => "deleted",
        }
    }

    pub fn from_lane(lane: &Lane) -> Option<Self> {
        match lane.as_str() {
            "new" => Some(TicketStatus::New),
            "open" => Some(TicketStatus::Open),
            "resolved" => Some(TicketStatus::Resolved),
            "deleted" => Some(TicketStatus::Deleted),
            _ => None,
        }
    }

    /// Resolved and deleted tickets never leave their lane
    pub fn is_terminal(&self) -> bool {
        matches!(self, TicketStatus::Resolved | TicketStatus::Deleted)
    }

    /// Whether a ticket may move from `self` to `to`
    ///
    /// NEW→OPEN (claim), OPEN→NEW (return), NEW/OPEN→RESOLVED, any→DELETED.
    /// Staying in the same lane (a reorder) is allowed for live states.
    pub fn can_transition(&self, to: TicketStatus) -> bool {
        use TicketStatus::*;
        match (self, to) {
            (from, _) if from.is_terminal() => false,
            (_, Deleted) => true,
            (New, New) | (Open, Open) => true,
            (New, Open) | (Open, New) => true,
            (New, Resolved) | (Open, Resolved) => true,
            _ => false,
        }
    }
}

/// Queue entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: ItemId,
    pub lane: Lane,
    /// Sort key within the lane; meaningless across lanes
    pub rank: f64,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignee: Option<String>,
    /// Domain payload (ticket contact, order totals, ...)
    #[serde(default)]
    pub data: serde_json::Value,
}

impl Item {
    pub fn new(id: ItemId, lane: Lane, rank: f64, title: impl Into<String>) -> Self {
        Self {
            id,
            lane,
            rank,
            title: title.into(),
            assignee: None,
            data: serde_json::Value::Null,
        }
    }
}
