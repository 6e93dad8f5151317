//! The `/mcp` JSON-RPC 2.0 tool-dispatch surface (§4.6). Hand-rolled rather
//! than built on a JSON-RPC crate (e.g. `jsonrpsee`, which owns its own
//! transport and doesn't compose with mounting `/mcp` inside the same Rocket
//! app as the REST routes) — plain serde structs, matching the teacher's
//! general preference for ad-hoc `serde_json::json!` payloads over dedicated
//! protocol crates.

pub mod tools;

use serde::Deserialize;
use serde_json::{json, Value};

use crate::app;
use crate::config::Config;
use crate::error::AppError;
use crate::events::EventBus;
use crate::ids;
use crate::ledger::LedgerCoordinator;
use crate::models::Identity;
use crate::room::{RoomCoordinator, SendMessageInput};
use crate::runtime::Registry;
use crate::store::Db;
use crate::tenant::TenantCoordinator;
use crate::workspace::WorkspaceCoordinator;

#[derive(Debug, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    #[serde(default)]
    pub id: Value,
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

#[allow(clippy::too_many_arguments)]
pub struct DispatchContext<'a> {
    pub db: &'a Db,
    pub config: &'a Config,
    pub events: &'a EventBus,
    pub tenants: &'a Registry<TenantCoordinator>,
    pub rooms: &'a Registry<RoomCoordinator>,
    pub ledgers: &'a Registry<LedgerCoordinator>,
    pub workspaces: &'a Registry<WorkspaceCoordinator>,
}

fn rpc_error(id: &Value, code: i64, message: &str) -> Value {
    json!({"jsonrpc": "2.0", "id": id, "error": {"code": code, "message": message}})
}

fn rpc_result(id: &Value, result: Value) -> Value {
    json!({"jsonrpc": "2.0", "id": id, "result": result})
}

fn app_error_response(id: &Value, error: AppError) -> Value {
    rpc_error(id, error.jsonrpc_code(), &error.to_string())
}

/// Origin allowlist check (§4.6): absent Origin is allowed; present Origin
/// must match the configured allowlist exactly.
pub fn check_origin(config: &Config, origin: Option<&str>) -> Result<(), AppError> {
    match origin {
        None => Ok(()),
        Some(o) if config.allowed_origins.iter().any(|allowed| allowed == o) => Ok(()),
        Some(_) => Err(AppError::OriginNotAllowed),
    }
}

pub fn dispatch(
    ctx: &DispatchContext,
    request: JsonRpcRequest,
    identity: &Identity,
    tenant_id: &str,
    request_id: &str,
) -> Value {
    if request.jsonrpc != "2.0" {
        return rpc_error(&request.id, -32600, "invalid jsonrpc version");
    }

    match request.method.as_str() {
        "initialize" => rpc_result(
            &request.id,
            json!({
                "serverInfo": {"name": "ubl-core", "version": env!("CARGO_PKG_VERSION")},
                "capabilities": {"tools": true, "streaming": true},
                "session_id": ids::session_id(),
            }),
        ),
        "tools/list" => rpc_result(&request.id, json!({"tools": tools::descriptors()})),
        "tools/call" => dispatch_tool_call(ctx, &request, identity, tenant_id, request_id),
        _ => rpc_error(&request.id, -32601, "method not found"),
    }
}

fn dispatch_tool_call(
    ctx: &DispatchContext,
    request: &JsonRpcRequest,
    identity: &Identity,
    tenant_id: &str,
    request_id: &str,
) -> Value {
    let name = match request.params.get("name").and_then(|v| v.as_str()) {
        Some(n) => n,
        None => return rpc_error(&request.id, -32602, "missing tool name"),
    };
    let arguments = request.params.get("arguments").cloned().unwrap_or(Value::Null);

    let result = match name {
        "messenger.list_rooms" => call_list_rooms(ctx, identity, tenant_id),
        "messenger.send" => call_send(ctx, &arguments, identity, tenant_id, request_id),
        "messenger.history" => call_history(ctx, &arguments, identity, tenant_id),
        "office.document.create" => call_document_create(ctx, &arguments, identity, tenant_id, request_id),
        "office.document.get" => call_document_get(ctx, &arguments, tenant_id),
        "office.document.search" => call_document_search(ctx, &arguments, identity, tenant_id, request_id),
        "office.llm.complete" => call_llm_complete(ctx, &arguments, identity, tenant_id, request_id),
        _ => return rpc_error(&request.id, -32601, "unknown tool"),
    };

    match result {
        Ok(value) => rpc_result(&request.id, json!({"content": [{"type": "json", "json": value}]})),
        Err(e) => app_error_response(&request.id, e),
    }
}

fn call_list_rooms(ctx: &DispatchContext, identity: &Identity, tenant_id: &str) -> Result<Value, AppError> {
    app::bootstrap_tenant(ctx.db, ctx.tenants, ctx.rooms, ctx.ledgers, ctx.events, ctx.config, tenant_id, identity)?;
    let tenant_lock = app::tenant_for(ctx.db, ctx.tenants, tenant_id);
    let tenant = tenant_lock.lock().unwrap();
    Ok(json!({"rooms": tenant.list_rooms()}))
}

fn call_send(
    ctx: &DispatchContext,
    arguments: &Value,
    identity: &Identity,
    tenant_id: &str,
    request_id: &str,
) -> Result<Value, AppError> {
    app::bootstrap_tenant(ctx.db, ctx.tenants, ctx.rooms, ctx.ledgers, ctx.events, ctx.config, tenant_id, identity)?;
    let room_id = arguments
        .get("room_id")
        .and_then(|v| v.as_str())
        .ok_or_else(|| AppError::ValidationError("room_id is required".to_string()))?;
    let input: SendMessageInput =
        serde_json::from_value(arguments.clone()).map_err(|e| AppError::ValidationError(e.to_string()))?;

    let room_lock = app::room_for(ctx.db, ctx.rooms, ctx.config, tenant_id, room_id);
    let ledger_lock = app::ledger_for(ctx.db, ctx.ledgers, ctx.config, tenant_id);
    let mut room = room_lock.lock().unwrap();
    let mut ledger = ledger_lock.lock().unwrap();
    let message = room.send_message(ctx.db, &mut ledger, ctx.events, ctx.config, input, identity, request_id)?;
    Ok(json!({"message": message}))
}

fn call_history(ctx: &DispatchContext, arguments: &Value, identity: &Identity, tenant_id: &str) -> Result<Value, AppError> {
    app::bootstrap_tenant(ctx.db, ctx.tenants, ctx.rooms, ctx.ledgers, ctx.events, ctx.config, tenant_id, identity)?;
    let room_id = arguments
        .get("room_id")
        .and_then(|v| v.as_str())
        .ok_or_else(|| AppError::ValidationError("room_id is required".to_string()))?;
    let cursor = arguments.get("cursor").and_then(|v| v.as_i64());
    let limit = ctx.config.clamp_history_limit(arguments.get("limit").and_then(|v| v.as_i64()));

    let room_lock = app::room_for(ctx.db, ctx.rooms, ctx.config, tenant_id, room_id);
    let room = room_lock.lock().unwrap();
    let (messages, next_cursor) = room.get_history(cursor, limit);
    Ok(json!({"messages": messages, "next_cursor": next_cursor}))
}

fn call_document_create(
    ctx: &DispatchContext,
    arguments: &Value,
    identity: &Identity,
    tenant_id: &str,
    request_id: &str,
) -> Result<Value, AppError> {
    app::bootstrap_tenant(ctx.db, ctx.tenants, ctx.rooms, ctx.ledgers, ctx.events, ctx.config, tenant_id, identity)?;
    let title = arguments
        .get("title")
        .and_then(|v| v.as_str())
        .ok_or_else(|| AppError::ValidationError("title is required".to_string()))?;
    let content = arguments
        .get("content")
        .and_then(|v| v.as_str())
        .ok_or_else(|| AppError::ValidationError("content is required".to_string()))?;

    let workspace_lock = app::workspace_for(ctx.db, ctx.workspaces, tenant_id);
    let ledger_lock = app::ledger_for(ctx.db, ctx.ledgers, ctx.config, tenant_id);
    let mut workspace = workspace_lock.lock().unwrap();
    let mut ledger = ledger_lock.lock().unwrap();
    let (document, _receipt) =
        workspace.create_document(ctx.db, &mut ledger, identity, title, content, request_id)?;
    Ok(json!({"document": document}))
}

fn call_document_get(ctx: &DispatchContext, arguments: &Value, tenant_id: &str) -> Result<Value, AppError> {
    let document_id = arguments
        .get("document_id")
        .and_then(|v| v.as_str())
        .ok_or_else(|| AppError::ValidationError("document_id is required".to_string()))?;
    let workspace_lock = app::workspace_for(ctx.db, ctx.workspaces, tenant_id);
    let workspace = workspace_lock.lock().unwrap();
    let document = workspace.get_document(document_id).ok_or(AppError::NotFound("document"))?;
    Ok(json!({"document": document}))
}

fn call_document_search(
    ctx: &DispatchContext,
    arguments: &Value,
    identity: &Identity,
    tenant_id: &str,
    request_id: &str,
) -> Result<Value, AppError> {
    let query = arguments
        .get("query")
        .and_then(|v| v.as_str())
        .ok_or_else(|| AppError::ValidationError("query is required".to_string()))?;
    let workspace_lock = app::workspace_for(ctx.db, ctx.workspaces, tenant_id);
    let ledger_lock = app::ledger_for(ctx.db, ctx.ledgers, ctx.config, tenant_id);
    let mut workspace = workspace_lock.lock().unwrap();
    let mut ledger = ledger_lock.lock().unwrap();
    let (documents, _receipt) = workspace.search_documents(ctx.db, &mut ledger, identity, query, request_id)?;
    Ok(json!({"documents": documents}))
}

fn call_llm_complete(
    ctx: &DispatchContext,
    arguments: &Value,
    identity: &Identity,
    tenant_id: &str,
    request_id: &str,
) -> Result<Value, AppError> {
    let prompt = arguments
        .get("prompt")
        .and_then(|v| v.as_str())
        .ok_or_else(|| AppError::ValidationError("prompt is required".to_string()))?;
    let workspace_lock = app::workspace_for(ctx.db, ctx.workspaces, tenant_id);
    let ledger_lock = app::ledger_for(ctx.db, ctx.ledgers, ctx.config, tenant_id);
    let mut workspace = workspace_lock.lock().unwrap();
    let mut ledger = ledger_lock.lock().unwrap();
    let result = workspace.llm_complete(ctx.db, &mut ledger, identity, prompt, request_id)?;
    Ok(json!({
        "completion": result.text,
        "usage": {"prompt_tokens": result.prompt_tokens, "completion_tokens": result.completion_tokens},
    }))
}
