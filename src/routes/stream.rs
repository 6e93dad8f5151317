use rocket::get;
use rocket::response::stream::{Event, EventStream};
use rocket::State;
use tokio::time::{interval, Duration};

use crate::app;
use crate::config::Config;
use crate::events::{EventBus, RoomEvent};
use crate::identity::{tenant_id_for, Identity};
use crate::room::RoomCoordinator;
use crate::runtime::Registry;
use crate::store::Db;

/// `GET /api/events/rooms/:id?from_seq` (§6's SSE framing).
#[get("/api/events/rooms/<room_id>?<from_seq>")]
pub fn room_events(
    identity: Identity,
    room_id: &str,
    from_seq: Option<i64>,
    db: &State<Db>,
    config: &State<Config>,
    events: &State<EventBus>,
    rooms: &State<Registry<RoomCoordinator>>,
) -> EventStream![] {
    let mut rx = events.sender.subscribe();
    let tenant_id = tenant_id_for(&identity.0.email_domain, config);
    let room_id = room_id.to_string();
    let keepalive_ms = config.keepalive_interval_ms;

    let room_lock = app::room_for(db, rooms, config, &tenant_id, &room_id);
    let (gap, replay) = {
        let room = room_lock.lock().unwrap();
        room.replay_from(from_seq.unwrap_or(0))
    };

    EventStream! {
        if let Some((gap_from, available_from)) = gap {
            let payload = serde_json::json!({"from_seq": gap_from, "available_from": available_from});
            yield Event::json(&payload).event("room.gap");
        }
        for message in replay {
            yield Event::json(&message).id(message.room_seq.to_string()).event("message.created");
        }

        let mut heartbeat = interval(Duration::from_millis(keepalive_ms));

        loop {
            tokio::select! {
                msg = rx.recv() => {
                    match msg {
                        Ok(RoomEvent::MessageCreated { room_id: ref rid, ref message }) if *rid == room_id => {
                            yield Event::json(message).id(message.room_seq.to_string()).event("message.created");
                        }
                        Ok(RoomEvent::RoomCreated { room_id: ref rid, ref summary }) if *rid == room_id => {
                            yield Event::json(summary).event("room.created");
                        }
                        Ok(RoomEvent::MemberJoined { room_id: ref rid, ref user_id }) if *rid == room_id => {
                            yield Event::json(&serde_json::json!({"user_id": user_id})).event("room.member_joined");
                        }
                        Ok(RoomEvent::Gap { room_id: ref rid, from_seq, available_from }) if *rid == room_id => {
                            yield Event::json(&serde_json::json!({"from_seq": from_seq, "available_from": available_from})).event("room.gap");
                        }
                        Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                        _ => {}
                    }
                }
                _ = heartbeat.tick() => {
                    yield Event::comment("keepalive");
                }
            }
        }
    }
}
