use rocket::get;
use rocket::serde::json::Json;
use rocket::State;
use serde_json::{json, Value};

use crate::app;
use crate::config::Config;
use crate::envelope;
use crate::error::AppError;
use crate::events::EventBus;
use crate::identity::{tenant_id_for, Identity, RequestId};
use crate::ledger::LedgerCoordinator;
use crate::room::RoomCoordinator;
use crate::runtime::Registry;
use crate::store::Db;
use crate::tenant::TenantCoordinator;

#[get("/api/whoami")]
pub fn whoami(
    identity: Identity,
    request_id: RequestId,
    db: &State<Db>,
    config: &State<Config>,
    events: &State<EventBus>,
    tenants: &State<Registry<TenantCoordinator>>,
    rooms: &State<Registry<RoomCoordinator>>,
    ledgers: &State<Registry<LedgerCoordinator>>,
) -> Result<Json<Value>, AppError> {
    let tenant_id = tenant_id_for(&identity.0.email_domain, config);
    let (tenant, role) = app::bootstrap_tenant(db, tenants, rooms, ledgers, events, config, &tenant_id, &identity.0)?;
    Ok(envelope::wrap(
        json!({"identity": identity.0, "tenant_id": tenant.tenant_id, "role": role}),
        &request_id.0,
    ))
}
