//! Client side of the lane synchronization engine.
//!
//! A view opens a [`Subscription`] to a scope's room, loads its lanes into a
//! [`QueueStore`], applies drags optimistically through the
//! [`OptimisticController`] and folds the server's canonical events back in
//! with the [`EventReconciler`]. [`SyncEngine`] wires the pieces together for
//! one session. The wire types in [`protocol`] are shared with the server.

pub mod badge;
pub mod channel;
pub mod controller;
pub mod engine;
pub mod models;
pub mod protocol;
pub mod rank;
pub mod reconciler;
pub mod store;
pub mod subscription;
pub mod topic;

pub use channel::{Channel, LaneSource, MemoryChannel, SyncError, SyncResult};
pub use controller::{plan_drop, OptimisticController, PlannedMove};
pub use engine::SyncEngine;
pub use models::{Item, ItemId, Lane, TicketStatus};
pub use protocol::{
    ArrivalEvent, ClientMessage, MoveIntent, MutationEvent, RemovalEvent, RerankEvent,
    ServerMessage,
};
pub use reconciler::EventReconciler;
pub use store::QueueStore;
pub use subscription::Subscription;
pub use topic::Scope;
