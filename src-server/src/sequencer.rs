//! Sequencer
//!
//! The single authority for lane order. Intents are applied against the
//! lanes as they are *now*: neighbor ids from the client only anchor the
//! drop, and a stale anchor falls back to the next one instead of failing.
//!
//! The sequencer does not serialize its callers. `LaneService` holds its
//! order lock from the first read until the resulting events are delivered,
//! so commit order and delivery order are the same.

use std::sync::Arc;

use lane_sync::rank::{self, RankExhausted};
use lane_sync::{
    ArrivalEvent, Item, ItemId, Lane, MoveIntent, MutationEvent, RemovalEvent, RerankEvent, Scope,
    TicketStatus,
};
use crate::config::ServerConfig;
use crate::domain::{policy_for, Actor, Authorizer, DomainError, DomainResult, LanePolicy};
use crate::repository::LaneRepository;

/// Result of a move or claim
#[derive(Debug, Clone, PartialEq)]
pub enum MoveOutcome {
    /// Broadcast `event`, then `rerank` if the destination lane was re-ranked
    Moved {
        event: MutationEvent,
        rerank: Option<RerankEvent>,
    },
    /// The item already sits at the requested place
    Unchanged,
}

/// Where in the destination lane an item should land
#[derive(Debug, Clone, Copy, PartialEq)]
enum Anchor {
    Between {
        before: Option<ItemId>,
        after: Option<ItemId>,
    },
    Tail,
}

impl Anchor {
    /// Index among `others` (the lane without the moved item)
    fn resolve(self, others: &[Item]) -> usize {
        let position = |id: ItemId| others.iter().position(|item| item.id == id);
        match self {
            Anchor::Between { before, after } => before
                .and_then(position)
                .map(|i| i + 1)
                .or_else(|| after.and_then(position))
                .unwrap_or(others.len()),
            Anchor::Tail => others.len(),
        }
    }
}

pub struct Sequencer {
    repo: Arc<dyn LaneRepository>,
    authorizer: Arc<dyn Authorizer>,
    board_lanes: Vec<Lane>,
    min_spacing: f64,
}

impl Sequencer {
    pub fn new(
        repo: Arc<dyn LaneRepository>,
        authorizer: Arc<dyn Authorizer>,
        config: &ServerConfig,
    ) -> Self {
        Self {
            repo,
            authorizer,
            board_lanes: config.board_lanes.clone(),
            min_spacing: config.rank_min_spacing,
        }
    }

    fn policy(&self, scope: Scope) -> Box<dyn LanePolicy> {
        policy_for(scope, &self.board_lanes)
    }

    async fn load(&self, scope: Scope, id: ItemId) -> DomainResult<Item> {
        self.repo
            .find(scope, id)
            .await?
            .ok_or_else(|| DomainError::NotFound(format!("item {} in {}", id, scope)))
    }

    pub fn authorize(&self, actor: &Actor, scope: Scope) -> DomainResult<()> {
        self.authorizer.authorize(actor, scope)
    }

    /// Initial contents of a lane for a joining view
    pub async fn snapshot(
        &self,
        actor: &Actor,
        scope: Scope,
        lane: &Lane,
    ) -> DomainResult<Vec<Item>> {
        self.authorizer.authorize(actor, scope)?;
        self.repo.list_lane(scope, lane).await
    }

    /// Canonicalize a client's drag
    pub async fn move_item(
        &self,
        actor: &Actor,
        intent: &MoveIntent,
    ) -> DomainResult<MoveOutcome> {
        self.authorizer.authorize(actor, intent.scope)?;
        let item = self.load(intent.scope, intent.item_id).await?;
        if item.lane != intent.from_lane {
            log::debug!(
                "{} intent from {} but item is in {}",
                item.id,
                intent.from_lane,
                item.lane
            );
        }
        self.policy(intent.scope)
            .check_move(&item.lane, &intent.to_lane)?;

        let anchor = Anchor::Between {
            before: intent.before_item_id,
            after: intent.after_item_id,
        };
        self.place(intent.scope, item, &intent.to_lane, anchor).await
    }

    /// Ticket shortcut: NEW -> tail of OPEN, assigned to the actor
    pub async fn claim(
        &self,
        actor: &Actor,
        scope: Scope,
        id: ItemId,
    ) -> DomainResult<MoveOutcome> {
        self.authorizer.authorize(actor, scope)?;
        if !scope.is_ticket_queue() {
            return Err(DomainError::InvalidInput(format!(
                "{} has no tickets to claim",
                scope
            )));
        }
        let mut item = self.load(scope, id).await?;
        if TicketStatus::from_lane(&item.lane) != Some(TicketStatus::New) {
            return Err(DomainError::Conflict(format!("{} is not new", id)));
        }
        item.assignee = Some(actor.id.clone());
        self.place(scope, item, &Lane::from(TicketStatus::Open), Anchor::Tail)
            .await
    }

    async fn place(
        &self,
        scope: Scope,
        mut item: Item,
        to_lane: &Lane,
        anchor: Anchor,
    ) -> DomainResult<MoveOutcome> {
        let from_lane = item.lane.clone();
        let lane = self.repo.list_lane(scope, to_lane).await?;
        let current = lane.iter().position(|other| other.id == item.id);
        let others: Vec<Item> = lane
            .into_iter()
            .filter(|other| other.id != item.id)
            .collect();

        let index = anchor.resolve(&others);
        if current == Some(index) {
            log::debug!("{} already at {}[{}]", item.id, to_lane, index);
            return Ok(MoveOutcome::Unchanged);
        }

        let prev = index.checked_sub(1).map(|i| others[i].rank);
        let next = others.get(index).map(|other| other.rank);
        let (rank, rerank) = match rank::try_allocate_with(prev, next, self.min_spacing) {
            Ok(rank) => (rank, None),
            Err(exhausted) => {
                let (rank, ranks) = self
                    .spread_lane(scope, to_lane, &others, item.id, index, exhausted)
                    .await?;
                let rerank = RerankEvent {
                    scope,
                    lane: to_lane.clone(),
                    ranks,
                };
                (rank, Some(rerank))
            }
        };

        item.lane = to_lane.clone();
        item.rank = rank;
        let item = self.repo.update(scope, &item).await?;
        log::info!(
            "{} {} -> {}[{}] rank {}",
            scope,
            from_lane,
            to_lane,
            index,
            rank
        );

        Ok(MoveOutcome::Moved {
            event: MutationEvent {
                scope,
                item_id: item.id,
                from_lane,
                to_lane: to_lane.clone(),
                rank,
                insert_index: index,
                item: Some(item),
            },
            rerank,
        })
    }

    /// Re-rank `others` with the moved item at `index`; returns the moved
    /// item's new rank and the full new order
    async fn spread_lane(
        &self,
        scope: Scope,
        lane: &Lane,
        others: &[Item],
        moved: ItemId,
        index: usize,
        exhausted: RankExhausted,
    ) -> DomainResult<(f64, Vec<(ItemId, f64)>)> {
        log::warn!("{}/{}: {}, re-ranking", scope, lane, exhausted);
        let mut order: Vec<ItemId> = others.iter().map(|item| item.id).collect();
        order.insert(index, moved);
        let ranks: Vec<(ItemId, f64)> = order
            .into_iter()
            .zip(rank::spread(others.len() + 1))
            .collect();

        let resident: Vec<(ItemId, f64)> = ranks
            .iter()
            .copied()
            .filter(|(id, _)| *id != moved)
            .collect();
        self.repo.set_ranks(scope, lane, &resident).await?;
        Ok((ranks[index].1, ranks))
    }

    /// New item at the head of `lane`
    pub async fn create_item(
        &self,
        actor: &Actor,
        scope: Scope,
        lane: &Lane,
        title: &str,
        data: serde_json::Value,
    ) -> DomainResult<ArrivalEvent> {
        self.authorizer.authorize(actor, scope)?;
        self.policy(scope).check_lane(lane)?;
        if title.trim().is_empty() {
            return Err(DomainError::InvalidInput("title is empty".to_string()));
        }
        let head = self
            .repo
            .list_lane(scope, lane)
            .await?
            .first()
            .map(|item| item.rank);
        let rank = rank::allocate(None, head);
        let mut draft = Item::new(ItemId(0), lane.clone(), rank, title.trim());
        draft.data = data;
        let item = self.repo.create(scope, &draft).await?;
        log::info!("{} created {} in {}", scope, item.id, lane);
        Ok(ArrivalEvent {
            scope,
            lane: lane.clone(),
            item,
        })
    }

    pub async fn remove_item(
        &self,
        actor: &Actor,
        scope: Scope,
        id: ItemId,
    ) -> DomainResult<RemovalEvent> {
        self.authorizer.authorize(actor, scope)?;
        self.repo.delete(scope, id).await?;
        log::info!("{} removed {}", scope, id);
        Ok(RemovalEvent { scope, item_id: id })
    }

    /// Respace a whole lane to `GAP` multiples, keeping its order
    pub async fn rerank_lane(&self, scope: Scope, lane: &Lane) -> DomainResult<RerankEvent> {
        let items = self.repo.list_lane(scope, lane).await?;
        let ranks: Vec<(ItemId, f64)> = items
            .iter()
            .map(|item| item.id)
            .zip(rank::spread(items.len()))
            .collect();
        self.repo.set_ranks(scope, lane, &ranks).await?;
        log::info!("{}/{} re-ranked ({} items)", scope, lane, ranks.len());
        Ok(RerankEvent {
            scope,
            lane: lane.clone(),
            ranks,
        })
    }
}
