//! Repository tests, run against both backends

use lane_sync::{Item, ItemId, Lane, Scope};

use super::{LaneRepository, MemoryLaneRepository, SqliteLaneRepository};
use crate::domain::DomainError;

const INBOX: Scope = Scope::Department {
    tenant: 1,
    department: 1,
};

fn backends() -> Vec<(&'static str, Box<dyn LaneRepository>)> {
    vec![
        ("memory", Box::new(MemoryLaneRepository::new())),
        (
            "sqlite",
            Box::new(SqliteLaneRepository::open(":memory:").expect("Failed to open test DB")),
        ),
    ]
}

fn draft(lane: &str, rank: f64, title: &str) -> Item {
    Item::new(ItemId(0), Lane::new(lane), rank, title)
}

#[tokio::test]
async fn test_create_assigns_ids() {
    for (name, repo) in backends() {
        let a = repo.create(INBOX, &draft("new", 640.0, "A")).await.unwrap();
        let b = repo.create(INBOX, &draft("new", 1280.0, "B")).await.unwrap();
        assert!(a.id.0 > 0, "{}", name);
        assert_ne!(a.id, b.id, "{}", name);
        assert_eq!(repo.find(INBOX, b.id).await.unwrap(), Some(b), "{}", name);
    }
}

#[tokio::test]
async fn test_list_orders_by_rank_then_arrival() {
    for (name, repo) in backends() {
        let late = repo.create(INBOX, &draft("new", 1280.0, "late")).await.unwrap();
        let first = repo.create(INBOX, &draft("new", 640.0, "tie-1")).await.unwrap();
        let second = repo.create(INBOX, &draft("new", 640.0, "tie-2")).await.unwrap();
        repo.create(INBOX, &draft("open", 0.0, "other lane")).await.unwrap();

        let ids: Vec<ItemId> = repo
            .list_lane(INBOX, &Lane::new("new"))
            .await
            .unwrap()
            .into_iter()
            .map(|item| item.id)
            .collect();
        assert_eq!(ids, vec![first.id, second.id, late.id], "{}", name);
    }
}

#[tokio::test]
async fn test_lane_change_is_a_new_arrival() {
    for (name, repo) in backends() {
        let moved = repo.create(INBOX, &draft("new", 640.0, "moved")).await.unwrap();
        let resident = repo.create(INBOX, &draft("open", 640.0, "resident")).await.unwrap();

        let mut update = moved.clone();
        update.lane = Lane::new("open");
        repo.update(INBOX, &update).await.unwrap();

        let ids: Vec<ItemId> = repo
            .list_lane(INBOX, &Lane::new("open"))
            .await
            .unwrap()
            .into_iter()
            .map(|item| item.id)
            .collect();
        assert_eq!(ids, vec![resident.id, moved.id], "{}", name);
    }
}

#[tokio::test]
async fn test_scopes_are_isolated() {
    for (name, repo) in backends() {
        let other = Scope::Department {
            tenant: 1,
            department: 2,
        };
        let item = repo.create(INBOX, &draft("new", 640.0, "mine")).await.unwrap();
        assert_eq!(repo.find(other, item.id).await.unwrap(), None, "{}", name);
        assert!(repo.list_lane(other, &Lane::new("new")).await.unwrap().is_empty());
        assert!(matches!(
            repo.delete(other, item.id).await,
            Err(DomainError::NotFound(_))
        ));
    }
}

#[tokio::test]
async fn test_update_and_delete() {
    for (name, repo) in backends() {
        let mut item = repo.create(INBOX, &draft("new", 640.0, "Original")).await.unwrap();
        item.title = "Updated".to_string();
        item.assignee = Some("ana".to_string());
        item.data = serde_json::json!({"contact": "+100"});
        repo.update(INBOX, &item).await.unwrap();
        assert_eq!(repo.find(INBOX, item.id).await.unwrap(), Some(item.clone()), "{}", name);

        repo.delete(INBOX, item.id).await.unwrap();
        assert_eq!(repo.find(INBOX, item.id).await.unwrap(), None, "{}", name);

        let missing = repo.update(INBOX, &item).await;
        assert!(matches!(missing, Err(DomainError::NotFound(_))), "{}", name);
    }
}

#[tokio::test]
async fn test_set_ranks() {
    for (name, repo) in backends() {
        let a = repo.create(INBOX, &draft("new", 1.0, "a")).await.unwrap();
        let b = repo.create(INBOX, &draft("new", 1.0000001, "b")).await.unwrap();
        repo.set_ranks(INBOX, &Lane::new("new"), &[(b.id, 640.0), (a.id, 1280.0)])
            .await
            .unwrap();

        let lane = repo.list_lane(INBOX, &Lane::new("new")).await.unwrap();
        let ranks: Vec<(ItemId, f64)> = lane.iter().map(|item| (item.id, item.rank)).collect();
        assert_eq!(ranks, vec![(b.id, 640.0), (a.id, 1280.0)], "{}", name);
    }
}
