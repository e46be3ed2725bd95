use std::fmt;

use serde::Serialize;
use serde_json::Value;
use tokio::sync::broadcast;

/// Push event carrying a freshly persisted notification.
pub const NEW_NOTIFICATION: &str = "new_notification";
/// Push event announcing that an event record changed.
pub const EVENT_UPDATED: &str = "eventUpdated";

/// Delivery target for a real-time message.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Room {
    User(String),
    SuperAdmins,
}

impl fmt::Display for Room {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Room::User(id) => write!(f, "user:{}", id),
            Room::SuperAdmins => write!(f, "super_admins"),
        }
    }
}

/// Outbound side of the real-time channel, injected into services.
pub trait Notifier: Send + Sync {
    fn emit(&self, room: Room, event: &'static str, payload: Value);
}

#[derive(Debug, Clone, Serialize)]
pub struct Broadcast {
    #[serde(skip)]
    pub room: Room,
    pub event: &'static str,
    pub payload: Value,
}

/// In-process fan-out hub. Every WebSocket connection holds a receiver and
/// keeps only the messages addressed to rooms it joined.
pub struct RealtimeHub {
    sender: broadcast::Sender<Broadcast>,
}

impl RealtimeHub {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Broadcast> {
        self.sender.subscribe()
    }

    pub fn connection_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for RealtimeHub {
    fn default() -> Self {
        Self::new(256)
    }
}

impl Notifier for RealtimeHub {
    fn emit(&self, room: Room, event: &'static str, payload: Value) {
        tracing::debug!(room = %room, event, "realtime push");
        // No subscribers is not an error: nobody is online to receive it.
        let _ = self.sender.send(Broadcast { room, event, payload });
    }
}

/// Rooms a connection joins, derived from its authenticated identity.
pub fn rooms_for(user_id: &str, is_super_admin: bool) -> Vec<Room> {
    let mut rooms = vec![Room::User(user_id.to_string())];
    if is_super_admin {
        rooms.push(Room::SuperAdmins);
    }
    rooms
}
