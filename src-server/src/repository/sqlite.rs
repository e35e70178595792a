//! SQLite Lane Repository
//!
//! One `items` table; the scope is stored as its topic string. Arrival is a
//! monotonic counter bumped whenever an item enters a lane.

use std::sync::Arc;

use async_trait::async_trait;
use lane_sync::{Item, ItemId, Lane, Scope};
use rusqlite::{params, Connection, OptionalExtension};
use tokio::sync::Mutex;

use super::traits::LaneRepository;
use crate::domain::{DomainError, DomainResult};

const ITEM_COLUMNS: &str = "id, lane, rank, title, assignee, data";

pub struct SqliteLaneRepository {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteLaneRepository {
    /// Open (or create) the database file; `:memory:` opens a private
    /// in-memory database
    pub fn open(path: &str) -> DomainResult<Self> {
        let conn = if path == ":memory:" {
            Connection::open_in_memory()?
        } else {
            Connection::open(path)?
        };
        run_migrations(&conn)?;
        Ok(Self::new(Arc::new(Mutex::new(conn))))
    }

    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }
}

fn run_migrations(conn: &Connection) -> DomainResult<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS items (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            topic TEXT NOT NULL,
            lane TEXT NOT NULL,
            rank REAL NOT NULL,
            title TEXT NOT NULL,
            assignee TEXT,
            data TEXT NOT NULL DEFAULT 'null',
            arrival INTEGER NOT NULL,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_items_lane ON items(topic, lane, rank, arrival);",
    )?;
    Ok(())
}

fn row_to_item(row: &rusqlite::Row<'_>) -> rusqlite::Result<Item> {
    let id: i64 = row.get(0)?;
    let lane: String = row.get(1)?;
    let data: String = row.get(5)?;
    Ok(Item {
        id: ItemId(id as u64),
        lane: Lane::new(lane),
        rank: row.get(2)?,
        title: row.get(3)?,
        assignee: row.get(4)?,
        data: serde_json::from_str(&data).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(5, rusqlite::types::Type::Text, Box::new(e))
        })?,
    })
}

fn encode_data(item: &Item) -> DomainResult<String> {
    serde_json::to_string(&item.data).map_err(|e| DomainError::InvalidInput(e.to_string()))
}

fn next_arrival(conn: &Connection) -> DomainResult<i64> {
    let arrival = conn.query_row("SELECT COALESCE(MAX(arrival), 0) + 1 FROM items", [], |row| {
        row.get(0)
    })?;
    Ok(arrival)
}

fn find_in(conn: &Connection, topic: &str, id: ItemId) -> DomainResult<Option<Item>> {
    let sql = format!("SELECT {} FROM items WHERE id = ?1 AND topic = ?2", ITEM_COLUMNS);
    let item = conn
        .query_row(&sql, params![id.0 as i64, topic], row_to_item)
        .optional()?;
    Ok(item)
}

#[async_trait]
impl LaneRepository for SqliteLaneRepository {
    async fn list_lane(&self, scope: Scope, lane: &Lane) -> DomainResult<Vec<Item>> {
        let conn = self.conn.lock().await;
        let sql = format!(
            "SELECT {} FROM items WHERE topic = ?1 AND lane = ?2 ORDER BY rank ASC, arrival ASC",
            ITEM_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params![scope.topic(), lane.as_str()], row_to_item)?;
        let mut items = Vec::new();
        for row in rows {
            items.push(row?);
        }
        Ok(items)
    }

    async fn find(&self, scope: Scope, id: ItemId) -> DomainResult<Option<Item>> {
        let conn = self.conn.lock().await;
        find_in(&conn, &scope.topic(), id)
    }

    async fn create(&self, scope: Scope, item: &Item) -> DomainResult<Item> {
        let conn = self.conn.lock().await;
        let now = chrono::Utc::now().timestamp_millis();
        let arrival = next_arrival(&conn)?;
        conn.execute(
            "INSERT INTO items
                (topic, lane, rank, title, assignee, data, arrival, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)",
            params![
                scope.topic(),
                item.lane.as_str(),
                item.rank,
                item.title,
                item.assignee,
                encode_data(item)?,
                arrival,
                now
            ],
        )?;
        let mut created = item.clone();
        created.id = ItemId(conn.last_insert_rowid() as u64);
        Ok(created)
    }

    async fn update(&self, scope: Scope, item: &Item) -> DomainResult<Item> {
        let conn = self.conn.lock().await;
        let topic = scope.topic();
        let existing = find_in(&conn, &topic, item.id)?
            .ok_or_else(|| DomainError::NotFound(format!("item {} in {}", item.id, scope)))?;
        let arrival = if existing.lane != item.lane {
            Some(next_arrival(&conn)?)
        } else {
            None
        };
        conn.execute(
            "UPDATE items SET lane = ?1, rank = ?2, title = ?3, assignee = ?4, data = ?5,
                arrival = COALESCE(?6, arrival), updated_at = ?7
             WHERE id = ?8 AND topic = ?9",
            params![
                item.lane.as_str(),
                item.rank,
                item.title,
                item.assignee,
                encode_data(item)?,
                arrival,
                chrono::Utc::now().timestamp_millis(),
                item.id.0 as i64,
                topic
            ],
        )?;
        Ok(item.clone())
    }

    async fn delete(&self, scope: Scope, id: ItemId) -> DomainResult<()> {
        let conn = self.conn.lock().await;
        let deleted = conn.execute(
            "DELETE FROM items WHERE id = ?1 AND topic = ?2",
            params![id.0 as i64, scope.topic()],
        )?;
        if deleted == 0 {
            return Err(DomainError::NotFound(format!("item {} in {}", id, scope)));
        }
        Ok(())
    }

    async fn set_ranks(
        &self,
        scope: Scope,
        lane: &Lane,
        ranks: &[(ItemId, f64)],
    ) -> DomainResult<()> {
        let mut conn = self.conn.lock().await;
        let topic = scope.topic();
        let now = chrono::Utc::now().timestamp_millis();
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "UPDATE items SET rank = ?1, updated_at = ?2
                 WHERE id = ?3 AND topic = ?4 AND lane = ?5",
            )?;
            for (id, rank) in ranks {
                stmt.execute(params![rank, now, id.0 as i64, topic, lane.as_str()])?;
            }
        }
        tx.commit()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const INBOX: Scope = Scope::Department {
        tenant: 1,
        department: 1,
    };

    #[tokio::test]
    async fn test_corrupt_data_column_is_an_error() {
        let repo = SqliteLaneRepository::open(":memory:").expect("Failed to open test DB");
        let item = repo
            .create(INBOX, &Item::new(ItemId(0), Lane::new("new"), 640.0, "T1"))
            .await
            .unwrap();
        repo.conn
            .lock()
            .await
            .execute("UPDATE items SET data = 'not json'", [])
            .unwrap();

        let found = repo.find(INBOX, item.id).await;
        assert!(matches!(found, Err(DomainError::Internal(_))));
        let listed = repo.list_lane(INBOX, &Lane::new("new")).await;
        assert!(matches!(listed, Err(DomainError::Internal(_))));
    }
}
