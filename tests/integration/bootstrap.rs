use rocket::http::Status;

use crate::common::{identity_headers, test_client};

#[test]
fn whoami_bootstraps_tenant_and_general_room() {
    let client = test_client();
    let mut req = client.get("/api/whoami");
    for h in identity_headers("u:alice", "alice@acme.com") {
        req = req.header(h);
    }
    let res = req.dispatch();
    assert_eq!(res.status(), Status::Ok);
    let body: serde_json::Value = res.into_json().unwrap();
    assert_eq!(body["tenant_id"], "t:acme.com");
    assert_eq!(body["role"], "owner");

    let mut req = client.get("/api/rooms");
    for h in identity_headers("u:alice", "alice@acme.com") {
        req = req.header(h);
    }
    let res = req.dispatch();
    assert_eq!(res.status(), Status::Ok);
    let body: serde_json::Value = res.into_json().unwrap();
    let rooms = body["rooms"].as_array().unwrap();
    assert!(rooms.iter().any(|r| r["room_id"] == "r:general"));
}

#[test]
fn platform_domain_resolves_to_shared_tenant() {
    let client = test_client();
    let mut req = client.get("/api/whoami");
    for h in identity_headers("u:svc", "svc@ubl_core.internal") {
        req = req.header(h);
    }
    let res = req.dispatch();
    assert_eq!(res.status(), Status::Ok);
    let body: serde_json::Value = res.into_json().unwrap();
    assert_eq!(body["tenant_id"], "t:ubl_core");
}

#[test]
fn second_member_is_auto_added_without_invite() {
    let client = test_client();
    let mut req = client.get("/api/whoami");
    for h in identity_headers("u:alice", "alice@acme.com") {
        req = req.header(h);
    }
    req.dispatch();

    let mut req = client.get("/api/whoami");
    for h in identity_headers("u:bob", "bob@acme.com") {
        req = req.header(h);
    }
    let res = req.dispatch();
    assert_eq!(res.status(), Status::Ok);
    let body: serde_json::Value = res.into_json().unwrap();
    assert_eq!(body["tenant_id"], "t:acme.com");
    assert_eq!(body["role"], "member");
}
