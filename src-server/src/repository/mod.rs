//! Repository Layer
//!
//! Data access abstractions and implementations.

mod memory;
mod sqlite;
mod traits;

#[cfg(test)]
mod tests;

pub use memory::MemoryLaneRepository;
pub use sqlite::SqliteLaneRepository;
pub use traits::LaneRepository;

use std::sync::Arc;

use crate::domain::DomainResult;

/// Open the configured backend; `:memory:` selects the in-process store
pub fn open_repository(database_path: &str) -> DomainResult<Arc<dyn LaneRepository>> {
    if database_path == ":memory:" {
        Ok(Arc::new(MemoryLaneRepository::new()))
    } else {
        Ok(Arc::new(SqliteLaneRepository::open(database_path)?))
    }
}
