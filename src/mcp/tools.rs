//! The seven tool descriptors exposed by `tools/list` (§4.6). Input schemas
//! mirror the id regexes (§3) and byte limits (§5/§6) used by the REST
//! surface these tools are isomorphic to.

use serde_json::{json, Value};

pub fn descriptors() -> Vec<Value> {
    vec![
        json!({
            "name": "messenger.list_rooms",
            "description": "List the calling tenant's rooms.",
            "inputSchema": {"type": "object", "properties": {}},
        }),
        json!({
            "name": "messenger.send",
            "description": "Send a message into a room.",
            "inputSchema": {
                "type": "object",
                "required": ["room_id", "type", "body"],
                "properties": {
                    "room_id": {"type": "string", "pattern": "^r:[a-z0-9-]{1,50}$"},
                    "type": {"type": "string", "enum": ["text", "system"]},
                    "body": {
                        "type": "object",
                        "required": ["text"],
                        "properties": {"text": {"type": "string", "maxLength": 8000}},
                    },
                    "reply_to": {"type": "string", "pattern": "^m:"},
                    "client_request_id": {"type": "string"},
                },
            },
        }),
        json!({
            "name": "messenger.history",
            "description": "Page through a room's message history.",
            "inputSchema": {
                "type": "object",
                "required": ["room_id"],
                "properties": {
                    "room_id": {"type": "string", "pattern": "^r:[a-z0-9-]{1,50}$"},
                    "cursor": {"type": "integer"},
                    "limit": {"type": "integer", "maximum": 200},
                },
            },
        }),
        json!({
            "name": "office.document.create",
            "description": "Create a workspace document.",
            "inputSchema": {
                "type": "object",
                "required": ["title", "content"],
                "properties": {
                    "title": {"type": "string"},
                    "content": {"type": "string"},
                },
            },
        }),
        json!({
            "name": "office.document.get",
            "description": "Fetch a workspace document by id.",
            "inputSchema": {
                "type": "object",
                "required": ["document_id"],
                "properties": {"document_id": {"type": "string", "pattern": "^d:"}},
            },
        }),
        json!({
            "name": "office.document.search",
            "description": "Case-insensitive substring search over title and content.",
            "inputSchema": {
                "type": "object",
                "required": ["query"],
                "properties": {"query": {"type": "string"}},
            },
        }),
        json!({
            "name": "office.llm.complete",
            "description": "Stub completion; returns a fixed placeholder.",
            "inputSchema": {
                "type": "object",
                "required": ["prompt"],
                "properties": {"prompt": {"type": "string"}},
            },
        }),
    ]
}
