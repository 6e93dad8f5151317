use rocket::http::{ContentType, Status};

use crate::common::{identity_headers, test_client};

fn bootstrap(client: &rocket::local::blocking::Client, user_id: &str, email: &str) {
    let mut req = client.get("/api/whoami");
    for h in identity_headers(user_id, email) {
        req = req.header(h);
    }
    req.dispatch();
}

/// The stream never terminates (heartbeat loop), so this only checks the
/// response is accepted and framed as SSE — it never reads the body to EOF.
#[test]
fn room_events_stream_opens_as_event_stream() {
    let client = test_client();
    bootstrap(&client, "u:alice", "alice@acme.com");

    let mut req = client.get("/api/events/rooms/r:general");
    for h in identity_headers("u:alice", "alice@acme.com") {
        req = req.header(h);
    }
    let res = req.dispatch();
    assert_eq!(res.status(), Status::Ok);
    assert_eq!(res.content_type(), Some(ContentType::EventStream));
}

#[test]
fn mcp_keepalive_stream_opens() {
    let client = test_client();
    let res = client.get("/mcp?session_id=s:test").dispatch();
    assert_eq!(res.status(), Status::Ok);
    assert_eq!(res.content_type(), Some(ContentType::EventStream));
}
