//! `TenantCoordinator` (§4.4): owns the tenant record and its room-summary
//! list. Room content itself lives in per-room `RoomCoordinator`s.

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::config::Config;
use crate::error::AppError;
use crate::events::{EventBus, RoomEvent};
use crate::ids;
use crate::ledger::LedgerCoordinator;
use crate::models::{Identity, Member, Role, RoomMode, RoomSummary, Tenant, TenantDefaults, TenantType};
use crate::room::RoomCoordinator;
use crate::runtime::Registry;
use crate::store::{index, keyed, Db};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct TenantState {
    tenant: Option<Tenant>,
    rooms: Vec<RoomSummary>,
}

impl Default for TenantState {
    fn default() -> Self {
        Self { tenant: None, rooms: Vec::new() }
    }
}

pub struct TenantCoordinator {
    tenant_id: String,
    state: TenantState,
}

impl TenantCoordinator {
    pub fn load_or_init(db: &Db, tenant_id: &str) -> Self {
        let conn = db.conn.lock().unwrap();
        let state = keyed::load::<TenantState>(&conn, &Self::key(tenant_id))
            .ok()
            .flatten()
            .unwrap_or_default();
        Self { tenant_id: tenant_id.to_string(), state }
    }

    fn key(tenant_id: &str) -> String {
        format!("tenant:{tenant_id}")
    }

    fn persist(&self, db: &Db) -> Result<(), AppError> {
        let conn = db.conn.lock().unwrap();
        keyed::save(&conn, &Self::key(&self.tenant_id), "tenant", &self.state)?;
        Ok(())
    }

    /// `ensureTenantAndMember`: lazy tenant creation, auto-add caller as
    /// member (frictionless), bootstrap the `r:general` room on first
    /// creation (§4.4).
    #[allow(clippy::too_many_arguments)]
    pub fn ensure_tenant_and_member(
        &mut self,
        db: &Db,
        rooms_registry: &Registry<RoomCoordinator>,
        ledgers: &Registry<LedgerCoordinator>,
        events: &EventBus,
        config: &Config,
        identity: &Identity,
    ) -> Result<(Tenant, Role), AppError> {
        if self.state.tenant.is_none() {
            let now = chrono::Utc::now().to_rfc3339();
            let tenant_type = if self.tenant_id == "t:ubl_core" { TenantType::Platform } else { TenantType::Customer };
            let mut members = std::collections::HashMap::new();
            members.insert(
                identity.user_id.clone(),
                Member { role: Role::Owner, email: identity.email.clone(), joined_at: now.clone() },
            );
            let tenant = Tenant {
                tenant_id: self.tenant_id.clone(),
                tenant_type,
                created_at: now.clone(),
                members,
                defaults: TenantDefaults {
                    room_mode: RoomMode::Internal,
                    retention_days: 0,
                    max_message_bytes: config.max_message_bytes,
                },
            };
            self.state.tenant = Some(tenant.clone());
            self.persist(db)?;

            {
                let conn = db.conn.lock().unwrap();
                index::upsert_tenant(&conn, &tenant)?;
                index::upsert_agreement(
                    &conn,
                    &crate::models::Agreement {
                        id: ids::tenant_agreement_id(&self.tenant_id),
                        agreement_type: crate::models::AgreementType::TenantLicense,
                        tenant_id: self.tenant_id.clone(),
                        created_at: now.clone(),
                        created_by: identity.user_id.clone(),
                        metadata: json!({"tenant_id": self.tenant_id}),
                    },
                )?;
            }

            self.create_room(db, rooms_registry, ledgers, events, config, "general", identity)?;
            return Ok((tenant, Role::Owner));
        }

        let tenant = self.state.tenant.as_mut().unwrap();
        let role = if let Some(member) = tenant.members.get(&identity.user_id) {
            member.role
        } else {
            tenant.members.insert(
                identity.user_id.clone(),
                Member {
                    role: Role::Member,
                    email: identity.email.clone(),
                    joined_at: chrono::Utc::now().to_rfc3339(),
                },
            );
            Role::Member
        };
        let tenant = tenant.clone();
        self.persist(db)?;
        {
            let conn = db.conn.lock().unwrap();
            index::upsert_tenant(&conn, &tenant)?;
        }
        Ok((tenant, role))
    }

    pub fn list_rooms(&self) -> Vec<RoomSummary> {
        self.state.rooms.clone()
    }

    pub fn get_room(&self, room_id: &str) -> Option<RoomSummary> {
        self.state.rooms.iter().find(|r| r.room_id == room_id).cloned()
    }

    pub fn get_tenant(&self) -> Option<Tenant> {
        self.state.tenant.clone()
    }

    /// `createRoom`: idempotent by slug — a second call with the same name
    /// returns the existing summary rather than erroring (§4.4, §8 property).
    pub fn create_room(
        &mut self,
        db: &Db,
        rooms_registry: &Registry<RoomCoordinator>,
        ledgers: &Registry<LedgerCoordinator>,
        events: &EventBus,
        config: &Config,
        name: &str,
        identity: &Identity,
    ) -> Result<RoomSummary, AppError> {
        let room_id = ids::room_id_for(name);
        if let Some(existing) = self.get_room(&room_id) {
            return Ok(existing);
        }

        {
            let conn = db.conn.lock().unwrap();
            index::upsert_agreement(
                &conn,
                &crate::models::Agreement {
                    id: ids::room_agreement_id(&room_id),
                    agreement_type: crate::models::AgreementType::RoomGovernance,
                    tenant_id: self.tenant_id.clone(),
                    created_at: chrono::Utc::now().to_rfc3339(),
                    created_by: identity.user_id.clone(),
                    metadata: json!({"room_id": room_id, "name": name}),
                },
            )?;
        }

        let room_lock = rooms_registry.get_or_init(&format!("{}:{}", self.tenant_id, room_id), || {
            RoomCoordinator::load_or_init(db, &self.tenant_id, &room_id, config.hot_messages_limit, config.seen_limit)
        });
        let ledger_lock = ledgers.get_or_init(&self.tenant_id, || {
            LedgerCoordinator::load_or_init(db, &self.tenant_id, config.hot_atoms_limit, config.dedup_limit)
        });

        let summary = {
            let mut room = room_lock.lock().unwrap();
            let mut ledger = ledger_lock.lock().unwrap();
            room.init(db, &mut ledger, events, config, name, RoomMode::Internal, &identity.user_id)?
        };

        {
            let conn = db.conn.lock().unwrap();
            index::upsert_room_summary(&conn, &self.tenant_id, &summary)?;
        }

        self.state.rooms.push(summary.clone());
        self.persist(db)?;

        events.publish(RoomEvent::RoomCreated { room_id: room_id.clone(), summary: summary.clone() });

        Ok(summary)
    }
}
