use rocket::http::Status;
use rocket::serde::json::Json;
use rocket::State;
use rocket::{get, post};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::app;
use crate::config::Config;
use crate::envelope;
use crate::error::AppError;
use crate::events::EventBus;
use crate::identity::{tenant_id_for, Identity, RequestId};
use crate::ledger::LedgerCoordinator;
use crate::rate_limit::{RateLimitConfig, RateLimiter};
use crate::room::RoomCoordinator;
use crate::runtime::Registry;
use crate::store::Db;
use crate::tenant::TenantCoordinator;

#[get("/api/rooms")]
#[allow(clippy::too_many_arguments)]
pub fn list_rooms(
    identity: Identity,
    request_id: RequestId,
    db: &State<Db>,
    config: &State<Config>,
    events: &State<EventBus>,
    tenants: &State<Registry<TenantCoordinator>>,
    rooms: &State<Registry<RoomCoordinator>>,
    ledgers: &State<Registry<LedgerCoordinator>>,
) -> Result<Json<Value>, AppError> {
    app::bootstrap_tenant(db, tenants, rooms, ledgers, events, config, &tenant_id(&identity, config), &identity.0)?;
    let tenant_lock = app::tenant_for(db, tenants, &tenant_id(&identity, config));
    let tenant = tenant_lock.lock().unwrap();
    Ok(envelope::wrap(json!({"rooms": tenant.list_rooms()}), &request_id.0))
}

#[derive(Debug, Deserialize)]
pub struct CreateRoomInput {
    pub name: String,
}

#[post("/api/rooms", data = "<input>")]
#[allow(clippy::too_many_arguments)]
pub fn create_room(
    identity: Identity,
    request_id: RequestId,
    input: Json<CreateRoomInput>,
    db: &State<Db>,
    config: &State<Config>,
    events: &State<EventBus>,
    tenants: &State<Registry<TenantCoordinator>>,
    rooms: &State<Registry<RoomCoordinator>>,
    ledgers: &State<Registry<LedgerCoordinator>>,
    rate_limiter: &State<RateLimiter>,
    rate_limit_config: &State<RateLimitConfig>,
) -> Result<(Status, Json<Value>), AppError> {
    let tid = tenant_id(&identity, config);
    if !rate_limiter.check(
        &format!("write:{}:{}", tid, identity.0.user_id),
        rate_limit_config.writes_max,
        rate_limit_config.writes_window_secs,
    ) {
        return Err(AppError::RateLimited);
    }

    app::bootstrap_tenant(db, tenants, rooms, ledgers, events, config, &tid, &identity.0)?;
    let tenant_lock = app::tenant_for(db, tenants, &tid);
    let mut tenant = tenant_lock.lock().unwrap();
    let summary = tenant.create_room(db, rooms, ledgers, events, config, &input.name, &identity.0)?;
    Ok((Status::Created, envelope::wrap(json!({"room_id": summary.room_id}), &request_id.0)))
}

fn tenant_id(identity: &Identity, config: &Config) -> String {
    tenant_id_for(&identity.0.email_domain, config)
}
