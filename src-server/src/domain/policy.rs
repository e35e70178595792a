//! Lane Policies
//!
//! Which lanes exist in a scope and which moves between them are legal.
//! Ticket queues follow the ticket lifecycle; boards accept any configured
//! stage in any order.

use lane_sync::{Lane, Scope, TicketStatus};

use super::{DomainError, DomainResult};

pub trait LanePolicy: Send + Sync {
    /// Items may be created in, or moved into, this lane
    fn check_lane(&self, lane: &Lane) -> DomainResult<()>;

    /// `from -> to` is a legal move; `from == to` is a reorder
    fn check_move(&self, from: &Lane, to: &Lane) -> DomainResult<()>;
}

/// NEW / OPEN / RESOLVED / DELETED with terminal RESOLVED and DELETED
#[derive(Debug, Default, Clone, Copy)]
pub struct TicketLifecycle;

impl TicketLifecycle {
    fn status(lane: &Lane) -> DomainResult<TicketStatus> {
        TicketStatus::from_lane(lane)
            .ok_or_else(|| DomainError::InvalidInput(format!("unknown ticket lane {}", lane)))
    }
}

impl LanePolicy for TicketLifecycle {
    fn check_lane(&self, lane: &Lane) -> DomainResult<()> {
        Self::status(lane).map(|_| ())
    }

    fn check_move(&self, from: &Lane, to: &Lane) -> DomainResult<()> {
        let (from_status, to_status) = (Self::status(from)?, Self::status(to)?);
        // reordering inside a terminal lane is still allowed
        if from_status == to_status || from_status.can_transition(to_status) {
            Ok(())
        } else {
            Err(DomainError::Conflict(format!(
                "ticket cannot go from {} to {}",
                from, to
            )))
        }
    }
}

/// Free pipeline stages; an empty list allows any lane name
#[derive(Debug, Default, Clone)]
pub struct OpenLanes {
    lanes: Vec<Lane>,
}

impl OpenLanes {
    pub fn new(lanes: Vec<Lane>) -> Self {
        Self { lanes }
    }
}

impl LanePolicy for OpenLanes {
    fn check_lane(&self, lane: &Lane) -> DomainResult<()> {
        if lane.as_str().is_empty() {
            return Err(DomainError::InvalidInput("empty lane name".to_string()));
        }
        if self.lanes.is_empty() || self.lanes.contains(lane) {
            Ok(())
        } else {
            Err(DomainError::InvalidInput(format!("unknown board lane {}", lane)))
        }
    }

    fn check_move(&self, from: &Lane, to: &Lane) -> DomainResult<()> {
        self.check_lane(from)?;
        self.check_lane(to)
    }
}

/// Policy for a scope: ticket queues for tenants and departments, open
/// stages for boards
pub fn policy_for(scope: Scope, board_lanes: &[Lane]) -> Box<dyn LanePolicy> {
    if scope.is_ticket_queue() {
        Box::new(TicketLifecycle)
    } else {
        Box::new(OpenLanes::new(board_lanes.to_vec()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lane(name: &str) -> Lane {
        Lane::new(name)
    }

    #[test]
    fn test_ticket_lifecycle() {
        let policy = TicketLifecycle;
        assert!(policy.check_move(&lane("new"), &lane("open")).is_ok());
        assert!(policy.check_move(&lane("open"), &lane("new")).is_ok());
        assert!(policy.check_move(&lane("open"), &lane("resolved")).is_ok());
        assert!(policy.check_move(&lane("new"), &lane("new")).is_ok());
        assert!(policy.check_move(&lane("resolved"), &lane("resolved")).is_ok());
        assert!(policy.check_move(&lane("resolved"), &lane("deleted")).is_err());
        assert!(policy.check_move(&lane("resolved"), &lane("open")).is_err());
        assert!(policy.check_move(&lane("deleted"), &lane("new")).is_err());
        assert!(matches!(
            policy.check_move(&lane("new"), &lane("doing")),
            Err(DomainError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_open_lanes() {
        let any = OpenLanes::default();
        assert!(any.check_move(&lane("todo"), &lane("shipped")).is_ok());
        assert!(any.check_lane(&lane("")).is_err());

        let fixed = OpenLanes::new(vec![lane("todo"), lane("doing"), lane("done")]);
        assert!(fixed.check_move(&lane("done"), &lane("todo")).is_ok());
        assert!(fixed.check_lane(&lane("archive")).is_err());
    }

    #[test]
    fn test_policy_for_scope() {
        let board = policy_for(Scope::Board { tenant: 1, board: 2 }, &[]);
        assert!(board.check_move(&lane("resolved"), &lane("new")).is_ok());

        let inbox = policy_for(Scope::Department { tenant: 1, department: 2 }, &[]);
        assert!(inbox.check_move(&lane("resolved"), &lane("new")).is_err());
    }
}
