//! `RoomCoordinator` (§4.3): the sole writer for a `(tenant, room_id)` pair.

use std::collections::{HashMap, VecDeque};

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::config::Config;
use crate::error::AppError;
use crate::events::{EventBus, RoomEvent};
use crate::ids;
use crate::ledger::LedgerCoordinator;
use crate::models::{
    Identity, Member, Message, MessageBody, MessageType, Receipt, Role, RoomConfig, RoomMembership,
    RoomMode, RoomPolicy, RoomSummary, SeenEntry,
};
use crate::store::{index, keyed, Db};

#[derive(Debug, Deserialize)]
pub struct SendMessageInput {
    #[serde(rename = "type")]
    pub message_type: MessageType,
    pub body: MessageBody,
    pub reply_to: Option<String>,
    pub client_request_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RoomState {
    config: Option<RoomConfig>,
    seq: i64,
    hot: VecDeque<Message>,
    seen: HashMap<String, SeenEntry>,
    seen_order: VecDeque<String>,
}

impl Default for RoomState {
    fn default() -> Self {
        Self {
            config: None,
            seq: 0,
            hot: VecDeque::new(),
            seen: HashMap::new(),
            seen_order: VecDeque::new(),
        }
    }
}

pub struct RoomCoordinator {
    tenant_id: String,
    room_id: String,
    hot_limit: usize,
    seen_limit: usize,
    state: RoomState,
}

impl RoomCoordinator {
    pub fn load_or_init(db: &Db, tenant_id: &str, room_id: &str, hot_limit: usize, seen_limit: usize) -> Self {
        let conn = db.conn.lock().unwrap();
        let state = keyed::load::<RoomState>(&conn, &Self::key(tenant_id, room_id))
            .ok()
            .flatten()
            .unwrap_or_default();
        Self {
            tenant_id: tenant_id.to_string(),
            room_id: room_id.to_string(),
            hot_limit,
            seen_limit,
            state,
        }
    }

    fn key(tenant_id: &str, room_id: &str) -> String {
        format!("room:{tenant_id}:{room_id}")
    }

    fn persist(&self, db: &Db) -> Result<(), AppError> {
        let conn = db.conn.lock().unwrap();
        keyed::save(&conn, &Self::key(&self.tenant_id, &self.room_id), "room", &self.state)?;
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.state.config.is_some()
    }

    /// `init`: creates the config, writes the `RoomGovernance` agreement, and
    /// sends the bootstrap `system` message (itself a receipted, broadcast
    /// send — §4.3's state machine).
    #[allow(clippy::too_many_arguments)]
    pub fn init(
        &mut self,
        db: &Db,
        ledger: &mut LedgerCoordinator,
        events: &EventBus,
        config: &Config,
        name: &str,
        mode: RoomMode,
        creator: &str,
    ) -> Result<RoomSummary, AppError> {
        if let Some(existing) = &self.state.config {
            return Ok(RoomSummary {
                room_id: existing.room_id.clone(),
                name: existing.name.clone(),
                mode: existing.mode,
                created_at: existing.created_at.clone(),
            });
        }

        let now = chrono::Utc::now().to_rfc3339();
        let mut members = HashMap::new();
        members.insert(
            creator.to_string(),
            RoomMembership { role: Role::Owner, joined_at: now.clone() },
        );

        let room_config = RoomConfig {
            tenant_id: self.tenant_id.clone(),
            room_id: self.room_id.clone(),
            name: name.to_string(),
            mode,
            created_at: now.clone(),
            members,
            policy: RoomPolicy {
                max_message_bytes: config.max_message_bytes,
                retention_days: 0,
            },
            hot_limit: self.hot_limit,
        };
        self.state.config = Some(room_config);
        self.persist(db)?;

        {
            let conn = db.conn.lock().unwrap();
            index::upsert_agreement(
                &conn,
                &crate::models::Agreement {
                    id: ids::room_agreement_id(&self.room_id),
                    agreement_type: crate::models::AgreementType::RoomGovernance,
                    tenant_id: self.tenant_id.clone(),
                    created_at: now.clone(),
                    created_by: creator.to_string(),
                    metadata: json!({"room_id": self.room_id, "name": name}),
                },
            )?;
        }

        let summary = RoomSummary {
            room_id: self.room_id.clone(),
            name: name.to_string(),
            mode,
            created_at: now,
        };

        let bootstrap_input = SendMessageInput {
            message_type: MessageType::System,
            body: MessageBody { text: format!("Room created: {name}") },
            reply_to: None,
            client_request_id: None,
        };
        let identity = Identity {
            user_id: creator.to_string(),
            email: String::new(),
            email_domain: String::new(),
            groups: Vec::new(),
            is_service: true,
        };
        self.send_message(db, ledger, events, config, bootstrap_input, &identity, &ids::request_id())?;

        Ok(summary)
    }

    /// `assertMember`: frictionless MVP — auto-adds the caller as `member` if
    /// absent and persists the config; never rejects (§4.3).
    pub fn assert_member(&mut self, db: &Db, identity: &Identity) -> Result<(), AppError> {
        let config = self.state.config.as_mut().ok_or(AppError::NotFound("room"))?;
        if !config.members.contains_key(&identity.user_id) {
            config.members.insert(
                identity.user_id.clone(),
                RoomMembership { role: Role::Member, joined_at: chrono::Utc::now().to_rfc3339() },
            );
            self.persist(db)?;
        }
        Ok(())
    }

    /// `sendMessage` (§4.3's eight-step protocol).
    #[allow(clippy::too_many_arguments)]
    pub fn send_message(
        &mut self,
        db: &Db,
        ledger: &mut LedgerCoordinator,
        events: &EventBus,
        config: &Config,
        input: SendMessageInput,
        identity: &Identity,
        request_id: &str,
    ) -> Result<Message, AppError> {
        self.assert_member(db, identity)?;

        let client_request_id = input.client_request_id.clone().unwrap_or_else(|| request_id.to_string());
        if let Some(seen) = self.state.seen.get(&client_request_id) {
            if let Some(existing) = self.state.hot.iter().find(|m| m.msg_id == seen.msg_id) {
                return Ok(existing.clone());
            }
            return Err(AppError::IdempotencyEvicted);
        }

        let room_policy_max = self
            .state
            .config
            .as_ref()
            .map(|c| c.policy.max_message_bytes)
            .unwrap_or(config.max_message_bytes);
        let body_json = serde_json::to_value(&input.body).map_err(|e| AppError::ValidationError(e.to_string()))?;
        let body_bytes = crate::canon::canonicalize(&body_json)?.len();
        if body_bytes > room_policy_max {
            return Err(AppError::MessageTooLarge);
        }
        if let Some(reply_to) = &input.reply_to {
            if !reply_to.starts_with("m:") {
                return Err(AppError::ValidationError("reply_to must be a message id".to_string()));
            }
        }

        let new_room_seq = self.state.seq + 1;
        let msg_id = ids::message_id();
        let body_hash = crate::canon::body_hash(&body_json)?;
        let now = chrono::Utc::now().to_rfc3339();

        let action = json!({
            "kind": "action.v1",
            "tenant_id": self.tenant_id,
            "when": now,
            "who": {
                "user_id": identity.user_id,
                "email": identity.email,
                "is_service": identity.is_service,
            },
            "did": "messenger.send",
            "this": {
                "room_id": self.room_id,
                "msg_id": msg_id,
                "room_seq": new_room_seq,
                "body_hash": body_hash,
            },
            "agreement_id": ids::room_agreement_id(&self.room_id),
            "status": "executed",
            "trace": {"request_id": request_id},
        });

        let action_outcome = ledger.append_atom(db, &action, Some(&identity.user_id))?;

        let effect = json!({
            "kind": "effect.v1",
            "tenant_id": self.tenant_id,
            "when": now,
            "ref_action_cid": action_outcome.cid,
            "outcome": "ok",
            "effects": [{"op": "room.append", "room_id": self.room_id, "room_seq": new_room_seq}],
            "pointers": {"msg_id": msg_id},
        });
        let mut effect_append_failed = false;
        if let Err(e) = ledger.append_atom(db, &effect, Some(&identity.user_id)) {
            tracing::warn!(error = %e, msg_id = %msg_id, "effect_append_failed");
            effect_append_failed = true;
        }

        let mut receipt = action_outcome.receipt;
        receipt.effect_append_failed = effect_append_failed;

        let message = Message {
            msg_id: msg_id.clone(),
            tenant_id: self.tenant_id.clone(),
            room_id: self.room_id.clone(),
            room_seq: new_room_seq,
            sender_id: identity.user_id.clone(),
            sent_at: chrono::Utc::now().to_rfc3339(),
            message_type: input.message_type,
            body: input.body,
            reply_to: input.reply_to,
            attachments: Vec::new(),
            receipt,
        };

        self.state.seq = new_room_seq;
        self.state.hot.push_back(message.clone());
        while self.state.hot.len() > self.hot_limit {
            self.state.hot.pop_front();
        }

        self.state.seen.insert(
            client_request_id.clone(),
            SeenEntry { msg_id: msg_id.clone(), room_seq: new_room_seq, receipt_seq: message.receipt.seq },
        );
        self.state.seen_order.push_back(client_request_id.clone());
        while self.state.seen_order.len() > self.seen_limit {
            if let Some(evicted) = self.state.seen_order.pop_front() {
                self.state.seen.remove(&evicted);
            }
        }

        self.persist(db)?;

        events.publish(RoomEvent::MessageCreated { room_id: self.room_id.clone(), message: message.clone() });

        Ok(message)
    }

    /// `getHistory`: newest-first page when `cursor` is absent, else the page
    /// strictly older than `cursor`, both returned in ascending `room_seq`.
    pub fn get_history(&self, cursor: Option<i64>, limit: i64) -> (Vec<Message>, Option<i64>) {
        let mut candidates: Vec<&Message> = match cursor {
            None => self.state.hot.iter().collect(),
            Some(c) => self.state.hot.iter().filter(|m| m.room_seq < c).collect(),
        };
        candidates.sort_by_key(|m| m.room_seq);
        let total = candidates.len();
        let page: Vec<Message> = if total as i64 > limit {
            candidates[total - limit as usize..].iter().map(|m| (**m).clone()).collect()
        } else {
            candidates.iter().map(|m| (**m).clone()).collect()
        };

        let oldest_hot_seq = self.state.hot.front().map(|m| m.room_seq);
        let next_cursor = match (page.first(), oldest_hot_seq) {
            (Some(first), Some(oldest)) if first.room_seq > oldest => Some(first.room_seq),
            _ => None,
        };

        (page, next_cursor)
    }

    /// For SSE reconnects: messages with `room_seq > from_seq` still in the
    /// hot window, plus whether a gap exists before them (§6's SSE framing).
    pub fn replay_from(&self, from_seq: i64) -> (Option<(i64, i64)>, Vec<Message>) {
        let oldest = self.state.hot.front().map(|m| m.room_seq);
        let gap = match oldest {
            Some(oldest) if oldest > from_seq + 1 => Some((from_seq + 1, oldest)),
            _ => None,
        };
        let replay: Vec<Message> = self.state.hot.iter().filter(|m| m.room_seq > from_seq).cloned().collect();
        (gap, replay)
    }

    pub fn room_id(&self) -> &str {
        &self.room_id
    }
}
