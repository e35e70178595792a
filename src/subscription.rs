//! Room Membership
//!
//! `Subscription` is the only way to join a room: creating one sends `join`,
//! and `leave` is sent exactly once when it is dropped or left explicitly.

use crate::channel::{Channel, SyncResult};
use crate::protocol::ClientMessage;
use crate::topic::Scope;

#[derive(Debug)]
pub struct Subscription<C: Channel> {
    channel: C,
    scope: Scope,
    joined: bool,
}

impl<C: Channel> Subscription<C> {
    /// Join `scope`; nothing is held if the join cannot be sent
    pub fn join(channel: C, scope: Scope) -> SyncResult<Self> {
        channel.send(ClientMessage::Join { scope })?;
        log::debug!("joined {}", scope);
        Ok(Self {
            channel,
            scope,
            joined: true,
        })
    }

    pub fn scope(&self) -> Scope {
        self.scope
    }

    /// Leave now, reporting a send failure instead of only logging it
    pub fn leave(mut self) -> SyncResult<()> {
        self.joined = false;
        self.channel.send(ClientMessage::Leave { scope: self.scope })
    }
}

impl<C: Channel> Drop for Subscription<C> {
    fn drop(&mut self) {
        if !self.joined {
            return;
        }
        self.joined = false;
        match self.channel.send(ClientMessage::Leave { scope: self.scope }) {
            Ok(()) => log::debug!("left {}", self.scope),
            Err(e) => log::warn!("leave for {} not sent: {}", self.scope, e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::MemoryChannel;

    #[test]
    fn test_drop_sends_single_leave() {
        let channel = MemoryChannel::new();
        let scope = Scope::Board { tenant: 1, board: 4 };
        {
            let sub = Subscription::join(channel.clone(), scope).unwrap();
            assert_eq!(sub.scope(), scope);
        }
        assert_eq!(
            channel.take(),
            vec![ClientMessage::Join { scope }, ClientMessage::Leave { scope }]
        );
    }

    #[test]
    fn test_explicit_leave_is_not_repeated_on_drop() {
        let channel = MemoryChannel::new();
        let scope = Scope::Tenant { tenant: 1 };
        let sub = Subscription::join(channel.clone(), scope).unwrap();
        sub.leave().unwrap();
        assert_eq!(channel.take().len(), 2);
    }

    #[test]
    fn test_leave_sent_on_error_path() {
        fn open_then_fail(channel: &MemoryChannel, scope: Scope) -> Result<(), String> {
            let _sub = Subscription::join(channel.clone(), scope).map_err(|e| e.to_string())?;
            Err("render failed".to_string())
        }

        let channel = MemoryChannel::new();
        let scope = Scope::Department { tenant: 1, department: 1 };
        assert!(open_then_fail(&channel, scope).is_err());
        assert_eq!(channel.take().last(), Some(&ClientMessage::Leave { scope }));
    }

    #[test]
    fn test_failed_join_holds_nothing() {
        let channel = MemoryChannel::new();
        channel.close();
        assert!(Subscription::join(channel.clone(), Scope::Tenant { tenant: 1 }).is_err());
        assert!(channel.is_empty());
    }
}
