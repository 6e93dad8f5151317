use rocket::http::Status;
use rocket::serde::json::Json;
use rocket::State;
use rocket::{get, post};
use serde_json::{json, Value};

use crate::app;
use crate::config::Config;
use crate::envelope;
use crate::error::AppError;
use crate::events::EventBus;
use crate::identity::{tenant_id_for, Identity, RequestId};
use crate::ledger::LedgerCoordinator;
use crate::rate_limit::{RateLimitConfig, RateLimiter};
use crate::room::{RoomCoordinator, SendMessageInput};
use crate::runtime::Registry;
use crate::store::Db;
use crate::tenant::TenantCoordinator;

#[get("/api/rooms/<room_id>/history?<cursor>&<limit>")]
#[allow(clippy::too_many_arguments)]
pub fn get_history(
    identity: Identity,
    request_id: RequestId,
    room_id: &str,
    cursor: Option<i64>,
    limit: Option<i64>,
    db: &State<Db>,
    config: &State<Config>,
    rooms: &State<Registry<RoomCoordinator>>,
) -> Result<Json<Value>, AppError> {
    let tenant_id = tenant_id_for(&identity.0.email_domain, config);
    let room_lock = app::room_for(db, rooms, config, &tenant_id, room_id);
    let room = room_lock.lock().unwrap();
    if !room.is_initialized() {
        return Err(AppError::NotFound("room"));
    }
    let clamped_limit = config.clamp_history_limit(limit);
    let (messages, next_cursor) = room.get_history(cursor, clamped_limit);
    Ok(envelope::wrap(json!({"messages": messages, "next_cursor": next_cursor}), &request_id.0))
}

#[post("/api/rooms/<room_id>/messages", data = "<input>")]
#[allow(clippy::too_many_arguments)]
pub fn send_message(
    identity: Identity,
    request_id: RequestId,
    room_id: &str,
    input: Json<SendMessageInput>,
    db: &State<Db>,
    config: &State<Config>,
    events: &State<EventBus>,
    tenants: &State<Registry<TenantCoordinator>>,
    rooms: &State<Registry<RoomCoordinator>>,
    ledgers: &State<Registry<LedgerCoordinator>>,
    rate_limiter: &State<RateLimiter>,
    rate_limit_config: &State<RateLimitConfig>,
) -> Result<(Status, Json<Value>), AppError> {
    let tenant_id = tenant_id_for(&identity.0.email_domain, config);
    if !rate_limiter.check(
        &format!("write:{}:{}", tenant_id, identity.0.user_id),
        rate_limit_config.writes_max,
        rate_limit_config.writes_window_secs,
    ) {
        return Err(AppError::RateLimited);
    }

    app::bootstrap_tenant(db, tenants, rooms, ledgers, events, config, &tenant_id, &identity.0)?;
    let tenant_lock = app::tenant_for(db, tenants, &tenant_id);
    let tenant = tenant_lock.lock().unwrap();
    if tenant.get_room(room_id).is_none() {
        return Err(AppError::NotFound("room"));
    }
    drop(tenant);

    let room_lock = app::room_for(db, rooms, config, &tenant_id, room_id);
    let ledger_lock = app::ledger_for(db, ledgers, config, &tenant_id);
    let mut room = room_lock.lock().unwrap();
    let mut ledger = ledger_lock.lock().unwrap();
    let message = room.send_message(db, &mut ledger, events, config, input.into_inner(), &identity.0, &request_id.0)?;
    Ok((Status::Created, envelope::wrap(json!({"message": message}), &request_id.0)))
}
