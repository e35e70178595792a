//! Session Channel
//!
//! Outbound half of a session's socket, passed explicitly to everything that
//! emits messages. Implementations must not block: the optimistic path calls
//! `send` inside the same turn that mutates the store.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::mpsc::UnboundedSender;

use crate::models::{Item, Lane};
use crate::protocol::ClientMessage;
use crate::topic::Scope;

/// Common result type for client operations
pub type SyncResult<T> = Result<T, SyncError>;

/// Client-side errors
#[derive(Debug, Clone, PartialEq)]
pub enum SyncError {
    /// The outbound channel is closed
    Channel(String),
    /// Initial lane fetch failed
    Fetch(String),
}

impl std::fmt::Display for SyncError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SyncError::Channel(msg) => write!(f, "Channel error: {}", msg),
            SyncError::Fetch(msg) => write!(f, "Fetch error: {}", msg),
        }
    }
}

impl std::error::Error for SyncError {}

/// Outbound message sink
pub trait Channel: Clone {
    fn send(&self, msg: ClientMessage) -> SyncResult<()>;
}

impl Channel for UnboundedSender<ClientMessage> {
    fn send(&self, msg: ClientMessage) -> SyncResult<()> {
        UnboundedSender::send(self, msg).map_err(|e| SyncError::Channel(e.to_string()))
    }
}

/// In-process channel that records what was sent
#[derive(Debug, Clone, Default)]
pub struct MemoryChannel {
    sent: Arc<Mutex<Vec<ClientMessage>>>,
    closed: Arc<Mutex<bool>>,
}

impl MemoryChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drain everything sent so far
    pub fn take(&self) -> Vec<ClientMessage> {
        self.sent
            .lock()
            .map(|mut sent| std::mem::take(&mut *sent))
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.sent.lock().map(|sent| sent.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Make every later `send` fail
    pub fn close(&self) {
        if let Ok(mut closed) = self.closed.lock() {
            *closed = true;
        }
    }
}

impl Channel for MemoryChannel {
    fn send(&self, msg: ClientMessage) -> SyncResult<()> {
        let closed = self.closed.lock().map(|c| *c).unwrap_or(true);
        if closed {
            return Err(SyncError::Channel("channel closed".to_string()));
        }
        self.sent
            .lock()
            .map_err(|_| SyncError::Channel("channel lock poisoned".to_string()))?
            .push(msg);
        Ok(())
    }
}

/// Request/response source for the initial contents of a lane
#[async_trait]
pub trait LaneSource: Send + Sync {
    async fn fetch_lane(&self, scope: Scope, lane: &Lane) -> SyncResult<Vec<Item>>;
}
