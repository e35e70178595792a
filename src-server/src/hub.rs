//! Room hub: who is subscribed to which topic

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};

use lane_sync::{Scope, ServerMessage};
use tokio::sync::mpsc::UnboundedSender;

pub type SessionId = u64;

#[derive(Default)]
struct HubState {
    rooms: HashMap<String, BTreeMap<SessionId, UnboundedSender<ServerMessage>>>,
}

#[derive(Clone, Default)]
pub struct Hub {
    inner: Arc<Mutex<HubState>>,
}

impl Hub {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_state(&self) -> MutexGuard<'_, HubState> {
        // a panic while holding the lock leaves the map itself intact
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Add a session to a scope's room; joining twice is harmless
    pub fn join(&self, scope: Scope, session: SessionId, sender: UnboundedSender<ServerMessage>) {
        let mut state = self.lock_state();
        state.rooms.entry(scope.topic()).or_default().insert(session, sender);
        log::debug!("session {} joined {}", session, scope);
    }

    pub fn leave(&self, scope: Scope, session: SessionId) -> bool {
        let mut state = self.lock_state();
        let topic = scope.topic();
        let Some(room) = state.rooms.get_mut(&topic) else {
            return false;
        };
        let removed = room.remove(&session).is_some();
        if room.is_empty() {
            state.rooms.remove(&topic);
        }
        removed
    }

    /// Drop a disconnected session from every room
    pub fn leave_all(&self, session: SessionId) {
        let mut state = self.lock_state();
        state.rooms.retain(|_, room| {
            room.remove(&session);
            !room.is_empty()
        });
    }

    pub fn members(&self, scope: Scope) -> Vec<SessionId> {
        let state = self.lock_state();
        state
            .rooms
            .get(&scope.topic())
            .map(|room| room.keys().copied().collect())
            .unwrap_or_default()
    }

    pub fn room_count(&self) -> usize {
        self.lock_state().rooms.len()
    }

    /// Send to every member of the message's room, origin included
    ///
    /// Members whose receiver is gone are dropped from the room. Returns the
    /// number of sessions reached.
    pub fn publish(&self, msg: &ServerMessage) -> usize {
        let Some(scope) = msg.scope().filter(|_| msg.is_broadcast()) else {
            log::warn!("refusing to broadcast a reply");
            return 0;
        };
        let topic = scope.topic();
        let mut state = self.lock_state();
        let Some(room) = state.rooms.get_mut(&topic) else {
            return 0;
        };
        room.retain(|session, sender| {
            let alive = sender.send(msg.clone()).is_ok();
            if !alive {
                log::debug!("session {} gone from {}", session, topic);
            }
            alive
        });
        let reached = room.len();
        if room.is_empty() {
            state.rooms.remove(&topic);
        }
        reached
    }
}
