//! Shared coordinator-orchestration glue used by both the HTTP routes and
//! the JSON-RPC tool dispatcher, so the two surfaces stay isomorphic (§4.6:
//! "same identity, same tenant/room/ledger coordinators").

use std::sync::{Arc, Mutex};

use crate::config::Config;
use crate::error::AppError;
use crate::events::EventBus;
use crate::ledger::LedgerCoordinator;
use crate::models::{Identity, Role, Tenant};
use crate::room::RoomCoordinator;
use crate::runtime::Registry;
use crate::store::Db;
use crate::tenant::TenantCoordinator;
use crate::workspace::WorkspaceCoordinator;

pub fn ledger_for(db: &Db, ledgers: &Registry<LedgerCoordinator>, config: &Config, tenant_id: &str) -> Arc<Mutex<LedgerCoordinator>> {
    ledgers.get_or_init(tenant_id, || {
        LedgerCoordinator::load_or_init(db, tenant_id, config.hot_atoms_limit, config.dedup_limit)
    })
}

pub fn room_for(
    db: &Db,
    rooms: &Registry<RoomCoordinator>,
    config: &Config,
    tenant_id: &str,
    room_id: &str,
) -> Arc<Mutex<RoomCoordinator>> {
    rooms.get_or_init(&format!("{tenant_id}:{room_id}"), || {
        RoomCoordinator::load_or_init(db, tenant_id, room_id, config.hot_messages_limit, config.seen_limit)
    })
}

pub fn workspace_for(
    db: &Db,
    workspaces: &Registry<WorkspaceCoordinator>,
    tenant_id: &str,
) -> Arc<Mutex<WorkspaceCoordinator>> {
    // One workspace per tenant in this core; keyed by tenant_id itself.
    workspaces.get_or_init(tenant_id, || WorkspaceCoordinator::load_or_init(db, tenant_id, tenant_id))
}

#[allow(clippy::too_many_arguments)]
pub fn bootstrap_tenant(
    db: &Db,
    tenants: &Registry<TenantCoordinator>,
    rooms: &Registry<RoomCoordinator>,
    ledgers: &Registry<LedgerCoordinator>,
    events: &EventBus,
    config: &Config,
    tenant_id: &str,
    identity: &Identity,
) -> Result<(Tenant, Role), AppError> {
    let tenant_lock = tenants.get_or_init(tenant_id, || TenantCoordinator::load_or_init(db, tenant_id));
    let mut tenant = tenant_lock.lock().unwrap();
    tenant.ensure_tenant_and_member(db, rooms, ledgers, events, config, identity)
}

pub fn tenant_for(db: &Db, tenants: &Registry<TenantCoordinator>, tenant_id: &str) -> Arc<Mutex<TenantCoordinator>> {
    tenants.get_or_init(tenant_id, || TenantCoordinator::load_or_init(db, tenant_id))
}
