//! In-process repository, used for `:memory:` configs and tests

use std::collections::HashMap;

use async_trait::async_trait;
use lane_sync::{Item, ItemId, Lane, Scope};
use tokio::sync::Mutex;

use super::traits::LaneRepository;
use crate::domain::{DomainError, DomainResult};

struct Row {
    scope: Scope,
    item: Item,
    arrival: u64,
}

#[derive(Default)]
struct MemoryState {
    rows: HashMap<ItemId, Row>,
    next_id: u64,
    next_arrival: u64,
}

impl MemoryState {
    fn arrival(&mut self) -> u64 {
        self.next_arrival += 1;
        self.next_arrival
    }

    fn row_mut(&mut self, scope: Scope, id: ItemId) -> DomainResult<&mut Row> {
        self.rows
            .get_mut(&id)
            .filter(|row| row.scope == scope)
            .ok_or_else(|| DomainError::NotFound(format!("item {} in {}", id, scope)))
    }
}

#[derive(Default)]
pub struct MemoryLaneRepository {
    state: Mutex<MemoryState>,
}

impl MemoryLaneRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LaneRepository for MemoryLaneRepository {
    async fn list_lane(&self, scope: Scope, lane: &Lane) -> DomainResult<Vec<Item>> {
        let state = self.state.lock().await;
        let mut rows: Vec<&Row> = state
            .rows
            .values()
            .filter(|row| row.scope == scope && &row.item.lane == lane)
            .collect();
        rows.sort_by(|a, b| {
            a.item
                .rank
                .total_cmp(&b.item.rank)
                .then(a.arrival.cmp(&b.arrival))
        });
        Ok(rows.into_iter().map(|row| row.item.clone()).collect())
    }

    async fn find(&self, scope: Scope, id: ItemId) -> DomainResult<Option<Item>> {
        let state = self.state.lock().await;
        Ok(state
            .rows
            .get(&id)
            .filter(|row| row.scope == scope)
            .map(|row| row.item.clone()))
    }

    async fn create(&self, scope: Scope, item: &Item) -> DomainResult<Item> {
        let mut state = self.state.lock().await;
        state.next_id += 1;
        let mut created = item.clone();
        created.id = ItemId(state.next_id);
        let arrival = state.arrival();
        state.rows.insert(
            created.id,
            Row {
                scope,
                item: created.clone(),
                arrival,
            },
        );
        Ok(created)
    }

    async fn update(&self, scope: Scope, item: &Item) -> DomainResult<Item> {
        let mut state = self.state.lock().await;
        let arrival = state.arrival();
        let row = state.row_mut(scope, item.id)?;
        if row.item.lane != item.lane {
            row.arrival = arrival;
        }
        row.item = item.clone();
        Ok(item.clone())
    }

    async fn delete(&self, scope: Scope, id: ItemId) -> DomainResult<()> {
        let mut state = self.state.lock().await;
        state.row_mut(scope, id)?;
        state.rows.remove(&id);
        Ok(())
    }

    async fn set_ranks(
        &self,
        scope: Scope,
        lane: &Lane,
        ranks: &[(ItemId, f64)],
    ) -> DomainResult<()> {
        let mut state = self.state.lock().await;
        for (id, rank) in ranks {
            let row = state.row_mut(scope, *id)?;
            if &row.item.lane == lane {
                row.item.rank = *rank;
            }
        }
        Ok(())
    }
}
