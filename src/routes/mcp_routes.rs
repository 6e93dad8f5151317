use rocket::response::stream::{Event, EventStream};
use rocket::serde::json::Json;
use rocket::{get, post, State};
use serde_json::Value;
use tokio::time::{interval, Duration};

use crate::config::Config;
use crate::events::EventBus;
use crate::identity::{tenant_id_for, Identity, RequestId};
use crate::ledger::LedgerCoordinator;
use crate::mcp::{self, DispatchContext, JsonRpcRequest};
use crate::room::RoomCoordinator;
use crate::runtime::Registry;
use crate::store::Db;
use crate::tenant::TenantCoordinator;
use crate::workspace::WorkspaceCoordinator;

/// Origin header normalized by Rocket's own `Origin` header access; we read
/// it directly via a request guard so the origin check in `mcp::dispatch`
/// can run before any coordinator is touched.
pub struct OriginHeader(pub Option<String>);

#[rocket::async_trait]
impl<'r> rocket::request::FromRequest<'r> for OriginHeader {
    type Error = std::convert::Infallible;

    async fn from_request(req: &'r rocket::Request<'_>) -> rocket::request::Outcome<Self, Self::Error> {
        rocket::request::Outcome::Success(OriginHeader(req.headers().get_one("Origin").map(|s| s.to_string())))
    }
}

#[post("/mcp", data = "<body>")]
#[allow(clippy::too_many_arguments)]
pub fn mcp_call(
    identity: Identity,
    request_id: RequestId,
    origin: OriginHeader,
    body: Json<JsonRpcRequest>,
    db: &State<Db>,
    config: &State<Config>,
    events: &State<EventBus>,
    tenants: &State<Registry<TenantCoordinator>>,
    rooms: &State<Registry<RoomCoordinator>>,
    ledgers: &State<Registry<LedgerCoordinator>>,
    workspaces: &State<Registry<WorkspaceCoordinator>>,
) -> Json<Value> {
    if let Err(e) = mcp::check_origin(config, origin.0.as_deref()) {
        return Json(serde_json::json!({
            "jsonrpc": "2.0",
            "id": body.id,
            "error": {"code": e.jsonrpc_code(), "message": e.to_string()},
        }));
    }

    let tenant_id = tenant_id_for(&identity.0.email_domain, config);
    let ctx = DispatchContext {
        db: db.inner(),
        config: config.inner(),
        events: events.inner(),
        tenants: tenants.inner(),
        rooms: rooms.inner(),
        ledgers: ledgers.inner(),
        workspaces: workspaces.inner(),
    };
    Json(mcp::dispatch(&ctx, body.into_inner(), &identity.0, &tenant_id, &request_id.0))
}

#[get("/mcp?<session_id>")]
pub fn mcp_stream(session_id: Option<&str>, config: &State<Config>) -> EventStream![] {
    let _ = session_id;
    let keepalive_ms = config.keepalive_interval_ms;
    EventStream! {
        let mut heartbeat = interval(Duration::from_millis(keepalive_ms));
        loop {
            heartbeat.tick().await;
            yield Event::comment("keepalive");
        }
    }
}
