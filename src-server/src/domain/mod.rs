//! Domain Layer
//!
//! Errors, actors and the lane rules each scope enforces.
//! Nothing here touches storage or sockets.

mod actor;
mod error;
mod policy;

pub use actor::{Actor, Authorizer, TenantAuthorizer};
pub use error::{DomainError, DomainResult};
pub use policy::{policy_for, LanePolicy, OpenLanes, TicketLifecycle};
