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
fn receipts_chain_by_seq_over_several_messages() {
    let client = test_client();
    bootstrap(&client, "u:alice", "alice@acme.com");

    let mut seqs = Vec::new();
    for i in 0..5 {
        let body = format!(r#"{{"type":"text","body":{{"text":"msg {i}"}}}}"#);
        let mut req = client.post("/api/rooms/r:general/messages").header(ContentType::JSON).body(body);
        for h in identity_headers("u:alice", "alice@acme.com") {
            req = req.header(h);
        }
        let res = req.dispatch();
        assert_eq!(res.status(), Status::Created);
        let value: serde_json::Value = res.into_json().unwrap();
        seqs.push(value["message"]["receipt"]["seq"].as_i64().unwrap());
    }

    // seqs strictly increase: action + effect atoms interleave with the
    // bootstrap system message, so consecutive sends are not seq+1 apart,
    // but they must be monotonically increasing.
    for pair in seqs.windows(2) {
        assert!(pair[1] > pair[0]);
    }

    for seq in seqs {
        let mut req = client.get(format!("/api/receipts/{seq}"));
        for h in identity_headers("u:alice", "alice@acme.com") {
            req = req.header(h);
        }
        let res = req.dispatch();
        assert_eq!(res.status(), Status::Ok);
    }
}

#[test]
fn missing_receipt_is_not_found() {
    let client = test_client();
    bootstrap(&client, "u:alice", "alice@acme.com");

    let mut req = client.get("/api/receipts/999999");
    for h in identity_headers("u:alice", "alice@acme.com") {
        req = req.header(h);
    }
    let res = req.dispatch();
    assert_eq!(res.status(), Status::NotFound);
}
