//! Broadcast fan-out for room SSE subscribers, modeled directly on the
//! teacher's `events::EventBus` (`tokio::sync::broadcast`, fire-and-forget
//! publish — no subscribers is not an error).

use tokio::sync::broadcast;

use crate::models::{Message, RoomSummary};

#[derive(Debug, Clone)]
pub enum RoomEvent {
    MessageCreated { room_id: String, message: Message },
    Gap { room_id: String, from_seq: i64, available_from: i64 },
    RoomCreated { room_id: String, summary: RoomSummary },
    MemberJoined { room_id: String, user_id: String },
}

pub struct EventBus {
    pub sender: broadcast::Sender<RoomEvent>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(1024);
        EventBus { sender }
    }

    pub fn publish(&self, event: RoomEvent) {
        let _ = self.sender.send(event);
    }
}
