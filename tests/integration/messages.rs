use rocket::http::{ContentType, Status};

use crate::common::{identity_headers, test_client};

fn bootstrap(client: &rocket::local::blocking::Client, user_id: &str, email: &str) {
    let mut req = client.get("/api/whoami");
    for h in identity_headers(user_id, email) {
        req = req.header(h);
    }
    req.dispatch();
}

#[test]
fn send_then_read_history() {
    let client = test_client();
    bootstrap(&client, "u:alice", "alice@acme.com");

    let mut req = client
        .post("/api/rooms/r:general/messages")
        .header(ContentType::JSON)
        .body(r#"{"type":"text","body":{"text":"hello there"}}"#);
    for h in identity_headers("u:alice", "alice@acme.com") {
        req = req.header(h);
    }
    let res = req.dispatch();
    assert_eq!(res.status(), Status::Created);
    let body: serde_json::Value = res.into_json().unwrap();
    assert_eq!(body["message"]["body"]["text"], "hello there");
    assert!(body["message"]["receipt"]["cid"].as_str().unwrap().len() > 0);

    let mut req = client.get("/api/rooms/r:general/history");
    for h in identity_headers("u:alice", "alice@acme.com") {
        req = req.header(h);
    }
    let res = req.dispatch();
    assert_eq!(res.status(), Status::Ok);
    let body: serde_json::Value = res.into_json().unwrap();
    let messages = body["messages"].as_array().unwrap();
    // bootstrap system message + ours
    assert!(messages.iter().any(|m| m["body"]["text"] == "hello there"));
}

#[test]
fn send_to_missing_room_is_not_found() {
    let client = test_client();
    bootstrap(&client, "u:alice", "alice@acme.com");

    let mut req = client
        .post("/api/rooms/r:does-not-exist/messages")
        .header(ContentType::JSON)
        .body(r#"{"type":"text","body":{"text":"hi"}}"#);
    for h in identity_headers("u:alice", "alice@acme.com") {
        req = req.header(h);
    }
    let res = req.dispatch();
    assert_eq!(res.status(), Status::NotFound);
}

#[test]
fn oversized_message_is_rejected() {
    let client = test_client();
    bootstrap(&client, "u:alice", "alice@acme.com");

    let huge = "x".repeat(20_000);
    let mut req = client
        .post("/api/rooms/r:general/messages")
        .header(ContentType::JSON)
        .body(format!(r#"{{"type":"text","body":{{"text":"{huge}"}}}}"#));
    for h in identity_headers("u:alice", "alice@acme.com") {
        req = req.header(h);
    }
    let res = req.dispatch();
    assert_eq!(res.status(), Status::BadRequest);
}

#[test]
fn receipt_is_retrievable_by_seq() {
    let client = test_client();
    bootstrap(&client, "u:alice", "alice@acme.com");

    let mut req = client
        .post("/api/rooms/r:general/messages")
        .header(ContentType::JSON)
        .body(r#"{"type":"text","body":{"text":"receipt me"}}"#);
    for h in identity_headers("u:alice", "alice@acme.com") {
        req = req.header(h);
    }
    let res = req.dispatch();
    let body: serde_json::Value = res.into_json().unwrap();
    let seq = body["message"]["receipt"]["seq"].as_i64().unwrap();

    let mut req = client.get(format!("/api/receipts/{seq}"));
    for h in identity_headers("u:alice", "alice@acme.com") {
        req = req.header(h);
    }
    let res = req.dispatch();
    assert_eq!(res.status(), Status::Ok);
    let body: serde_json::Value = res.into_json().unwrap();
    assert_eq!(body["seq"], seq);
    assert!(body["atoms"].as_array().unwrap().len() >= 1);
}
