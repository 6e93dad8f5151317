//! Data model (§3): tenants, rooms, messages, atoms, agreements, receipts.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TenantType {
    Platform,
    Customer,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Owner,
    Admin,
    Member,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Member {
    pub role: Role,
    pub email: String,
    pub joined_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TenantDefaults {
    pub room_mode: RoomMode,
    pub retention_days: u32,
    pub max_message_bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tenant {
    pub tenant_id: String,
    #[serde(rename = "type")]
    pub tenant_type: TenantType,
    pub created_at: String,
    pub members: HashMap<String, Member>,
    pub defaults: TenantDefaults,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RoomMode {
    Internal,
    External,
    E2ee,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomSummary {
    pub room_id: String,
    pub name: String,
    pub mode: RoomMode,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomMembership {
    pub role: Role,
    pub joined_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomPolicy {
    pub max_message_bytes: usize,
    pub retention_days: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomConfig {
    pub tenant_id: String,
    pub room_id: String,
    pub name: String,
    pub mode: RoomMode,
    pub created_at: String,
    pub members: HashMap<String, RoomMembership>,
    pub policy: RoomPolicy,
    pub hot_limit: usize,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
    Text,
    System,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageBody {
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub msg_id: String,
    pub tenant_id: String,
    pub room_id: String,
    pub room_seq: i64,
    pub sender_id: String,
    pub sent_at: String,
    #[serde(rename = "type")]
    pub message_type: MessageType,
    pub body: MessageBody,
    pub reply_to: Option<String>,
    #[serde(default)]
    pub attachments: Vec<serde_json::Value>,
    pub receipt: Receipt,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Receipt {
    pub ledger_shard: String,
    pub seq: i64,
    pub cid: String,
    pub head_hash: String,
    pub time: String,
    /// Not part of the wire spec's Receipt shape, but surfaced so callers can
    /// observe the action/effect asymmetry the spec's open questions name
    /// instead of it being silently swallowed (DESIGN.md Open Question 1).
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    #[serde(default)]
    pub effect_append_failed: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AtomStatus {
    Executed,
    Pending,
    Failed,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Ok,
    Error,
}

/// `action.v1` / `effect.v1` are both modeled as a single JSON `Value`
/// envelope rather than a Rust enum, because §3 specifies them as
/// "discriminated by `kind`" free-form documents whose `this`/`effects`
/// payload shape varies per `did`. Coordinators build them with
/// `serde_json::json!` (matching how `other_examples/2cbdb40a_...
/// messenger_v1.rs` builds its atoms) and hash them via `canon::cid_of`.
pub type Atom = serde_json::Value;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Agreement {
    pub id: String,
    #[serde(rename = "type")]
    pub agreement_type: AgreementType,
    pub tenant_id: String,
    pub created_at: String,
    pub created_by: String,
    pub metadata: serde_json::Value,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AgreementType {
    TenantLicense,
    RoomGovernance,
    WorkspaceAgreement,
    ToolAccess,
    WorkflowApproval,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeenEntry {
    pub msg_id: String,
    pub room_seq: i64,
    pub receipt_seq: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub document_id: String,
    pub workspace_id: String,
    pub title: String,
    pub content: String,
    pub content_hash: String,
    pub created_at: String,
    pub created_by: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkspaceConfig {
    pub tenant_id: String,
    pub workspace_id: String,
    pub created_at: String,
}

/// Identity normalized from the (external) request-authentication layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Identity {
    pub user_id: String,
    pub email: String,
    pub email_domain: String,
    #[serde(default)]
    pub groups: Vec<String>,
    #[serde(default)]
    pub is_service: bool,
}
