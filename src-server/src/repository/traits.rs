//! Repository Layer - Core Traits
//!
//! Storage of the canonical lanes. Every call is scoped, so an item id from
//! one room is never visible through another.

use async_trait::async_trait;
use lane_sync::{Item, ItemId, Lane, Scope};

use crate::domain::DomainResult;

#[async_trait]
pub trait LaneRepository: Send + Sync {
    /// Items of one lane, by rank then arrival
    async fn list_lane(&self, scope: Scope, lane: &Lane) -> DomainResult<Vec<Item>>;

    async fn find(&self, scope: Scope, id: ItemId) -> DomainResult<Option<Item>>;

    /// Store a new item; the id on `item` is ignored and a fresh one assigned
    async fn create(&self, scope: Scope, item: &Item) -> DomainResult<Item>;

    /// Overwrite an item. Changing its lane counts as a new arrival there.
    async fn update(&self, scope: Scope, item: &Item) -> DomainResult<Item>;

    async fn delete(&self, scope: Scope, id: ItemId) -> DomainResult<()>;

    /// Rewrite ranks of items in `lane` in one step
    async fn set_ranks(
        &self,
        scope: Scope,
        lane: &Lane,
        ranks: &[(ItemId, f64)],
    ) -> DomainResult<()>;
}
