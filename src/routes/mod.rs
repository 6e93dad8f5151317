//! HTTP surface (§6). Each handler resolves `tenant_id` from the `Identity`
//! guard, bootstraps the tenant/room/ledger coordinators via `crate::app`,
//! and wraps success bodies with `crate::envelope::wrap`.

pub mod mcp_routes;
pub mod messages;
pub mod receipts;
pub mod rooms;
pub mod stream;
pub mod whoami;

use rocket::serde::json::Json;
use rocket::{catch, get};

#[get("/api/health")]
pub fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok"}))
}

#[catch(404)]
pub fn not_found() -> Json<serde_json::Value> {
    Json(serde_json::json!({"error": {"code": "not_found", "message": "not_found"}}))
}

#[catch(429)]
pub fn too_many_requests() -> Json<serde_json::Value> {
    Json(serde_json::json!({"error": {"code": "rate_limited", "message": "rate_limited"}}))
}
