use actix::prelude::*;
use log::{debug, error, info};
use serde_json::json;
use std::collections::HashMap;

use crate::models::ChatView;

pub const NEW_CHAT: &str = "newChat";
pub const LEAVE_CHAT: &str = "leaveChat";

/// A frame pushed to one WebSocket session, already serialized.
#[derive(Message)]
#[rtype(result = "()")]
pub struct WsMessage(pub String);

#[derive(Message)]
#[rtype(result = "()")]
pub struct Connect {
    pub user_id: String,
    pub addr: Recipient<WsMessage>,
}

#[derive(Message)]
#[rtype(result = "()")]
pub struct Disconnect {
    pub user_id: String,
    pub addr: Recipient<WsMessage>,
}

/// Best-effort push of a chat projection to one user. Dropped silently when
/// the user has no open connection; never reported back to the caller.
#[derive(Message)]
#[rtype(result = "()")]
pub struct Notify {
    pub user_id: String,
    pub event: &'static str,
    pub payload: ChatView,
}

/// Live-connection registry: user id to the channels currently open for that
/// user. A user may hold several connections (multiple tabs/devices).
pub struct ConnectionRegistry<T> {
    sessions: HashMap<String, Vec<T>>,
}

impl<T: PartialEq> ConnectionRegistry<T> {
    pub fn new() -> Self {
        ConnectionRegistry {
            sessions: HashMap::new(),
        }
    }

    pub fn register(&mut self, user_id: String, channel: T) {
        self.sessions.entry(user_id).or_default().push(channel);
    }

    /// Removes one channel; the user entry disappears with its last channel.
    /// Unknown users and unknown channels are no-ops.
    pub fn deregister(&mut self, user_id: &str, channel: &T) {
        if let Some(channels) = self.sessions.get_mut(user_id) {
            channels.retain(|c| c != channel);
            if channels.is_empty() {
                self.sessions.remove(user_id);
            }
        }
    }

    pub fn channels(&self, user_id: &str) -> &[T] {
        self.sessions.get(user_id).map(Vec::as_slice).unwrap_or(&[])
    }
}

pub struct ChatServer {
    registry: ConnectionRegistry<Recipient<WsMessage>>,
}

impl ChatServer {
    pub fn new() -> Self {
        ChatServer {
            registry: ConnectionRegistry::new(),
        }
    }
}

impl Actor for ChatServer {
    type Context = Context<Self>;
}

impl Handler<Connect> for ChatServer {
    type Result = ();

    fn handle(&mut self, msg: Connect, _: &mut Context<Self>) {
        info!("User {} connected (WS)", msg.user_id);
        self.registry.register(msg.user_id, msg.addr);
    }
}

impl Handler<Disconnect> for ChatServer {
    type Result = ();

    fn handle(&mut self, msg: Disconnect, _: &mut Context<Self>) {
        info!("User {} disconnected (WS)", msg.user_id);
        self.registry.deregister(&msg.user_id, &msg.addr);
    }
}

impl Handler<Notify> for ChatServer {
    type Result = ();

    fn handle(&mut self, msg: Notify, _: &mut Context<Self>) {
        let channels = self.registry.channels(&msg.user_id);
        if channels.is_empty() {
            debug!("No open connection for user {}, dropping {}", msg.user_id, msg.event);
            return;
        }
        let frame = match serde_json::to_string(&json!({
            "event": msg.event,
            "chat": msg.payload,
        })) {
            Ok(frame) => frame,
            Err(e) => {
                error!("Failed to serialize {} payload: {}", msg.event, e);
                return;
            }
        };
        for addr in channels {
            addr.do_send(WsMessage(frame.clone()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_keeps_multiple_channels_per_user() {
        let mut registry: ConnectionRegistry<u32> = ConnectionRegistry::new();
        registry.register("u1".to_string(), 1);
        registry.register("u1".to_string(), 2);
        assert_eq!(registry.channels("u1"), &[1, 2]);
    }

    #[test]
    fn deregister_removes_only_the_matching_channel() {
        let mut registry: ConnectionRegistry<u32> = ConnectionRegistry::new();
        registry.register("u1".to_string(), 1);
        registry.register("u1".to_string(), 2);
        registry.deregister("u1", &1);
        assert_eq!(registry.channels("u1"), &[2]);
        registry.deregister("u1", &2);
        assert!(registry.channels("u1").is_empty());
    }

    #[test]
    fn absent_user_is_a_no_op() {
        let mut registry: ConnectionRegistry<u32> = ConnectionRegistry::new();
        registry.deregister("ghost", &1);
        assert!(registry.channels("ghost").is_empty());
    }
}
