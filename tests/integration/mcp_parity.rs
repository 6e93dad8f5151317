use rocket::http::{ContentType, Status};

use crate::common::{identity_headers, test_client};

fn bootstrap(client: &rocket::local::blocking::Client, user_id: &str, email: &str) {
    let mut req = client.get("/api/whoami");
    for h in identity_headers(user_id, email) {
        req = req.header(h);
    }
    req.dispatch();
}

fn rpc(
    client: &rocket::local::blocking::Client,
    user_id: &str,
    email: &str,
    body: serde_json::Value,
) -> serde_json::Value {
    let mut req = client.post("/mcp").header(ContentType::JSON).body(body.to_string());
    for h in identity_headers(user_id, email) {
        req = req.header(h);
    }
    let res = req.dispatch();
    assert_eq!(res.status(), Status::Ok);
    res.into_json().unwrap()
}

#[test]
fn initialize_and_tools_list() {
    let client = test_client();
    let res = rpc(
        &client,
        "u:alice",
        "alice@acme.com",
        serde_json::json!({"jsonrpc": "2.0", "id": 1, "method": "initialize", "params": {}}),
    );
    assert_eq!(res["result"]["serverInfo"]["name"], "ubl-core");

    let res = rpc(
        &client,
        "u:alice",
        "alice@acme.com",
        serde_json::json!({"jsonrpc": "2.0", "id": 2, "method": "tools/list", "params": {}}),
    );
    let tools = res["result"]["tools"].as_array().unwrap();
    assert!(tools.iter().any(|t| t["name"] == "messenger.send"));
    assert!(tools.iter().any(|t| t["name"] == "office.document.create"));
}

/// `messenger.send` over `/mcp` lands in the same room/ledger as the REST
/// `POST /api/rooms/:id/messages` route, proving the two surfaces share
/// coordinators (same tenant bootstrap, same receipt shape).
#[test]
fn mcp_send_is_isomorphic_to_rest_send() {
    let client = test_client();
    bootstrap(&client, "u:alice", "alice@acme.com");

    let res = rpc(
        &client,
        "u:alice",
        "alice@acme.com",
        serde_json::json!({
            "jsonrpc": "2.0",
            "id": 3,
            "method": "tools/call",
            "params": {
                "name": "messenger.send",
                "arguments": {"room_id": "r:general", "type": "text", "body": {"text": "via mcp"}},
            },
        }),
    );
    let message = &res["result"]["content"][0]["json"]["message"];
    assert_eq!(message["body"]["text"], "via mcp");
    assert!(message["receipt"]["seq"].as_i64().is_some());

    let mut req = client.get("/api/rooms/r:general/history");
    for h in identity_headers("u:alice", "alice@acme.com") {
        req = req.header(h);
    }
    let res = req.dispatch();
    let body: serde_json::Value = res.into_json().unwrap();
    let messages = body["messages"].as_array().unwrap();
    assert!(messages.iter().any(|m| m["body"]["text"] == "via mcp"));
}

#[test]
fn origin_not_in_allowlist_is_rejected() {
    let config = ubl_core::config::Config {
        allowed_origins: vec!["https://trusted.example".to_string()],
        ..ubl_core::config::Config::default()
    };
    let client = super::common::test_client_with_config(config);

    let mut req = client
        .post("/mcp")
        .header(ContentType::JSON)
        .header(rocket::http::Header::new("Origin", "https://evil.example"))
        .body(
            serde_json::json!({"jsonrpc": "2.0", "id": 1, "method": "tools/list", "params": {}}).to_string(),
        );
    for h in identity_headers("u:alice", "alice@acme.com") {
        req = req.header(h);
    }
    let res = req.dispatch();
    assert_eq!(res.status(), Status::Ok);
    let body: serde_json::Value = res.into_json().unwrap();
    assert_eq!(body["error"]["code"], -32003);
}
