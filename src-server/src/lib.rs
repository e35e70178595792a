//! Lane Sync Server
//!
//! Layered like the client it serves:
//! - domain: errors, actors, lane policies
//! - repository: canonical lane storage (memory or SQLite)
//! - sequencer: the single authority for rank and lane
//! - hub / session / transport: rooms and the JSON-lines socket

use std::sync::Arc;

use tokio::net::TcpListener;

pub mod config;
pub mod domain;
pub mod hub;
pub mod repository;
pub mod sequencer;
pub mod service;
pub mod session;
pub mod transport;

pub use config::ServerConfig;
pub use domain::{Actor, DomainError, DomainResult};
pub use hub::Hub;
pub use sequencer::{MoveOutcome, Sequencer};
pub use service::LaneService;
pub use session::Session;

/// Build the service from `config`
pub fn build_service(config: &ServerConfig) -> DomainResult<Arc<LaneService>> {
    let repo = repository::open_repository(&config.database_path)?;
    let sequencer = Sequencer::new(repo, Arc::new(domain::TenantAuthorizer), config);
    Ok(Arc::new(LaneService::new(sequencer)))
}

/// Serve until the listener fails
pub async fn run(config: ServerConfig) -> DomainResult<()> {
    let service = build_service(&config)?;
    let listener = TcpListener::bind(&config.bind_addr)
        .await
        .map_err(|e| DomainError::Internal(format!("Failed to bind {}: {}", config.bind_addr, e)))?;
    log::info!("listening on {} (db {})", config.bind_addr, config.database_path);
    transport::serve(listener, service)
        .await
        .map_err(|e| DomainError::Internal(e.to_string()))
}
