//! Room Scopes
//!
//! Typed identifiers for the rooms a session can join. Every wire topic is
//! produced by `Scope::topic` and parsed back by `Scope::from_topic`; no other
//! code builds topic strings.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A room: which tenant-wide, department inbox or board a view follows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Scope {
    Tenant { tenant: u64 },
    Department { tenant: u64, department: u64 },
    Board { tenant: u64, board: u64 },
}

impl Scope {
    pub fn tenant(&self) -> u64 {
        match *self {
            Scope::Tenant { tenant }
            | Scope::Department { tenant, .. }
            | Scope::Board { tenant, .. } => tenant,
        }
    }

    /// Whether lanes in this scope follow the ticket lifecycle
    pub fn is_ticket_queue(&self) -> bool {
        matches!(self, Scope::Tenant { .. } | Scope::Department { .. })
    }

    /// Wire-level topic string
    pub fn topic(&self) -> String {
        match *self {
            Scope::Tenant { tenant } => format!("tenant-{}", tenant),
            Scope::Department { tenant, department } => {
                format!("tenant-{}/department-{}", tenant, department)
            }
            Scope::Board { tenant, board } => format!("tenant-{}/board-{}", tenant, board),
        }
    }

    /// Inverse of `topic`; anything else is rejected
    pub fn from_topic(topic: &str) -> Option<Self> {
        let (head, rest) = match topic.split_once('/') {
            Some((head, rest)) => (head, Some(rest)),
            None => (topic, None),
        };
        let tenant = parse_segment(head, "tenant-")?;
        match rest {
            None => Some(Scope::Tenant { tenant }),
            Some(rest) => {
                if let Some(department) = parse_segment(rest, "department-") {
                    Some(Scope::Department { tenant, department })
                } else {
                    parse_segment(rest, "board-").map(|board| Scope::Board { tenant, board })
                }
            }
        }
    }
}

fn parse_segment(segment: &str, prefix: &str) -> Option<u64> {
    let digits = segment.strip_prefix(prefix)?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.topic())
    }
}
