//! The tabular secondary mirror (§6): `tenants`, `agreements`, `rooms`,
//! `documents`, `spans`, `sessions`, `audit_log`, `policy_cache`. Coordinators
//! write here after committing their own keyed state so admin/search surfaces
//! can query without waking a coordinator; never consulted to serve hot-path
//! reads (§5 — those come from the coordinator's in-memory hot window).

use rusqlite::{params, Connection, OptionalExtension};

use crate::models::{Agreement, Document, RoomSummary, Tenant};

pub fn upsert_tenant(conn: &Connection, tenant: &Tenant) -> rusqlite::Result<()> {
    let json = serde_json::to_string(tenant).expect("tenant must serialize");
    conn.execute(
        "INSERT INTO tenants (id, tenant_json, created_at) VALUES (?1, ?2, ?3)
         ON CONFLICT(id) DO UPDATE SET tenant_json = excluded.tenant_json",
        params![tenant.tenant_id, json, tenant.created_at],
    )?;
    Ok(())
}

pub fn get_tenant(conn: &Connection, tenant_id: &str) -> rusqlite::Result<Option<Tenant>> {
    let json: Option<String> = conn
        .query_row(
            "SELECT tenant_json FROM tenants WHERE id = ?1",
            params![tenant_id],
            |row| row.get(0),
        )
        .optional()?;
    Ok(json.and_then(|j| serde_json::from_str(&j).ok()))
}

/// Agreements are append-mostly, but metadata may be amended (e.g. a
/// license renewal) without minting a new agreement id, so writes upsert
/// on `id` and overwrite `metadata` (§5 "ON CONFLICT DO UPDATE metadata
/// for agreements").
pub fn upsert_agreement(conn: &Connection, agreement: &Agreement) -> rusqlite::Result<()> {
    let agreement_type = serde_json::to_value(agreement.agreement_type)
        .expect("agreement type must serialize")
        .as_str()
        .unwrap()
        .to_string();
    let metadata = serde_json::to_string(&agreement.metadata).expect("metadata must serialize");
    conn.execute(
        "INSERT INTO agreements (id, type, tenant_id, created_at, created_by, metadata)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)
         ON CONFLICT(id) DO UPDATE SET metadata = excluded.metadata",
        params![
            agreement.id,
            agreement_type,
            agreement.tenant_id,
            agreement.created_at,
            agreement.created_by,
            metadata
        ],
    )?;
    Ok(())
}

pub fn get_agreement(conn: &Connection, id: &str) -> rusqlite::Result<Option<Agreement>> {
    conn.query_row(
        "SELECT type, tenant_id, created_at, created_by, metadata FROM agreements WHERE id = ?1",
        params![id],
        |row| {
            let agreement_type: String = row.get(0)?;
            let metadata_json: String = row.get(4)?;
            Ok(Agreement {
                id: id.to_string(),
                agreement_type: serde_json::from_value(serde_json::Value::String(agreement_type))
                    .unwrap_or(crate::models::AgreementType::ToolAccess),
                tenant_id: row.get(1)?,
                created_at: row.get(2)?,
                created_by: row.get(3)?,
                metadata: serde_json::from_str(&metadata_json).unwrap_or(serde_json::Value::Null),
            })
        },
    )
    .optional()
}

pub fn list_agreements_for_tenant(conn: &Connection, tenant_id: &str) -> rusqlite::Result<Vec<Agreement>> {
    let mut stmt = conn.prepare(
        "SELECT id, type, created_at, created_by, metadata FROM agreements WHERE tenant_id = ?1 ORDER BY created_at",
    )?;
    let rows = stmt.query_map(params![tenant_id], |row| {
        let agreement_type: String = row.get(1)?;
        let metadata_json: String = row.get(4)?;
        Ok(Agreement {
            id: row.get(0)?,
            agreement_type: serde_json::from_value(serde_json::Value::String(agreement_type))
                .unwrap_or(crate::models::AgreementType::ToolAccess),
            tenant_id: tenant_id.to_string(),
            created_at: row.get(2)?,
            created_by: row.get(3)?,
            metadata: serde_json::from_str(&metadata_json).unwrap_or(serde_json::Value::Null),
        })
    })?;
    rows.collect()
}

pub fn upsert_room_summary(conn: &Connection, tenant_id: &str, summary: &RoomSummary) -> rusqlite::Result<()> {
    let json = serde_json::to_string(summary).expect("room summary must serialize");
    conn.execute(
        "INSERT INTO rooms (room_id, tenant_id, summary_json) VALUES (?1, ?2, ?3)
         ON CONFLICT(room_id) DO UPDATE SET summary_json = excluded.summary_json",
        params![summary.room_id, tenant_id, json],
    )?;
    Ok(())
}

pub fn list_room_summaries(conn: &Connection, tenant_id: &str) -> rusqlite::Result<Vec<RoomSummary>> {
    let mut stmt = conn.prepare(
        "SELECT summary_json FROM rooms WHERE tenant_id = ?1 ORDER BY room_id",
    )?;
    let rows = stmt.query_map(params![tenant_id], |row| {
        let json: String = row.get(0)?;
        Ok(json)
    })?;
    let mut out = Vec::new();
    for json in rows {
        if let Ok(summary) = serde_json::from_str(&json?) {
            out.push(summary);
        }
    }
    Ok(out)
}

pub fn get_room_summary(conn: &Connection, room_id: &str) -> rusqlite::Result<Option<RoomSummary>> {
    let json: Option<String> = conn
        .query_row(
            "SELECT summary_json FROM rooms WHERE room_id = ?1",
            params![room_id],
            |row| row.get(0),
        )
        .optional()?;
    Ok(json.and_then(|j| serde_json::from_str(&j).ok()))
}

pub fn upsert_document(conn: &Connection, tenant_id: &str, document: &Document) -> rusqlite::Result<()> {
    let json = serde_json::to_string(document).expect("document must serialize");
    conn.execute(
        "INSERT INTO documents (document_id, tenant_id, workspace_id, document_json) VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(document_id) DO UPDATE SET document_json = excluded.document_json",
        params![document.document_id, tenant_id, document.workspace_id, json],
    )?;
    Ok(())
}

pub fn get_document(conn: &Connection, document_id: &str) -> rusqlite::Result<Option<Document>> {
    let json: Option<String> = conn
        .query_row(
            "SELECT document_json FROM documents WHERE document_id = ?1",
            params![document_id],
            |row| row.get(0),
        )
        .optional()?;
    Ok(json.and_then(|j| serde_json::from_str(&j).ok()))
}

pub fn list_documents_for_workspace(
    conn: &Connection,
    tenant_id: &str,
    workspace_id: &str,
) -> rusqlite::Result<Vec<Document>> {
    let mut stmt = conn.prepare(
        "SELECT document_json FROM documents WHERE tenant_id = ?1 AND workspace_id = ?2 ORDER BY document_id",
    )?;
    let rows = stmt.query_map(params![tenant_id, workspace_id], |row| {
        let json: String = row.get(0)?;
        Ok(json)
    })?;
    let mut out = Vec::new();
    for json in rows {
        if let Ok(document) = serde_json::from_str(&json?) {
            out.push(document);
        }
    }
    Ok(out)
}

/// A span mirrors one ledger atom into the index store for admin/search
/// surfaces. `(tenant_id, hash)` is unique, so a coordinator retrying an
/// append after a crash just no-ops here instead of erroring (§5 "INSERT ...
/// ON CONFLICT DO NOTHING for spans").
#[allow(clippy::too_many_arguments)]
pub fn insert_span(
    conn: &Connection,
    id: &str,
    tenant_id: &str,
    seq: i64,
    user_id: Option<&str>,
    kind: &str,
    hash: &str,
    size: usize,
    metadata: &serde_json::Value,
) -> rusqlite::Result<()> {
    let metadata_json = serde_json::to_string(metadata).expect("span metadata must serialize");
    conn.execute(
        "INSERT INTO spans (id, tenant_id, seq, user_id, kind, hash, size, metadata)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
         ON CONFLICT(tenant_id, hash) DO NOTHING",
        params![id, tenant_id, seq, user_id, kind, hash, size as i64, metadata_json],
    )?;
    Ok(())
}

/// Fetch a mirrored atom (`metadata.atom`) by its ledger `seq`, for
/// `LedgerCoordinator::getBySeq` falling through past the hot window.
pub fn get_span_atom_by_seq(
    conn: &Connection,
    tenant_id: &str,
    seq: i64,
) -> rusqlite::Result<Option<serde_json::Value>> {
    let metadata_json: Option<String> = conn
        .query_row(
            "SELECT metadata FROM spans WHERE tenant_id = ?1 AND seq = ?2",
            params![tenant_id, seq],
            |row| row.get(0),
        )
        .optional()?;
    Ok(metadata_json.and_then(|j| {
        serde_json::from_str::<serde_json::Value>(&j)
            .ok()
            .and_then(|v| v.get("atom").cloned())
    }))
}

/// Page of mirrored atoms in descending `seq` order, for
/// `LedgerCoordinator::queryRecent` falling through past the hot window.
pub fn query_spans_desc(
    conn: &Connection,
    tenant_id: &str,
    before_seq: Option<i64>,
    limit: i64,
) -> rusqlite::Result<Vec<(i64, serde_json::Value)>> {
    let mut stmt = match before_seq {
        Some(_) => conn.prepare(
            "SELECT seq, metadata FROM spans WHERE tenant_id = ?1 AND seq < ?2 ORDER BY seq DESC LIMIT ?3",
        )?,
        None => conn.prepare(
            "SELECT seq, metadata FROM spans WHERE tenant_id = ?1 ORDER BY seq DESC LIMIT ?3",
        )?,
    };
    let rows = if let Some(cursor) = before_seq {
        stmt.query_map(params![tenant_id, cursor, limit], |row| {
            let seq: i64 = row.get(0)?;
            let metadata_json: String = row.get(1)?;
            Ok((seq, metadata_json))
        })?
        .collect::<Result<Vec<_>, _>>()?
    } else {
        stmt.query_map(params![tenant_id, limit], |row| {
            let seq: i64 = row.get(0)?;
            let metadata_json: String = row.get(1)?;
            Ok((seq, metadata_json))
        })?
        .collect::<Result<Vec<_>, _>>()?
    };
    Ok(rows
        .into_iter()
        .filter_map(|(seq, json)| {
            serde_json::from_str::<serde_json::Value>(&json)
                .ok()
                .and_then(|v| v.get("atom").cloned())
                .map(|atom| (seq, atom))
        })
        .collect())
}

pub fn span_exists_for_hash(conn: &Connection, tenant_id: &str, hash: &str) -> rusqlite::Result<bool> {
    let found: Option<String> = conn
        .query_row(
            "SELECT id FROM spans WHERE tenant_id = ?1 AND hash = ?2",
            params![tenant_id, hash],
            |row| row.get(0),
        )
        .optional()?;
    Ok(found.is_some())
}

pub fn record_session(conn: &Connection, id: &str) -> rusqlite::Result<()> {
    let now = chrono::Utc::now().to_rfc3339();
    conn.execute(
        "INSERT INTO sessions (id, created_at) VALUES (?1, ?2) ON CONFLICT(id) DO NOTHING",
        params![id, now],
    )?;
    Ok(())
}

pub fn record_audit(conn: &Connection, tenant_id: &str, request_id: &str, action: &str) -> rusqlite::Result<()> {
    let now = chrono::Utc::now().to_rfc3339();
    conn.execute(
        "INSERT INTO audit_log (tenant_id, request_id, action, created_at) VALUES (?1, ?2, ?3, ?4)",
        params![tenant_id, request_id, action, now],
    )?;
    Ok(())
}

pub fn cache_policy(conn: &Connection, key: &str, value: &serde_json::Value) -> rusqlite::Result<()> {
    let json = serde_json::to_string(value).expect("policy value must serialize");
    let now = chrono::Utc::now().to_rfc3339();
    conn.execute(
        "INSERT INTO policy_cache (key, value, cached_at) VALUES (?1, ?2, ?3)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value, cached_at = excluded.cached_at",
        params![key, json, now],
    )?;
    Ok(())
}

pub fn get_cached_policy(conn: &Connection, key: &str) -> rusqlite::Result<Option<serde_json::Value>> {
    let json: Option<String> = conn
        .query_row(
            "SELECT value FROM policy_cache WHERE key = ?1",
            params![key],
            |row| row.get(0),
        )
        .optional()?;
    Ok(json.and_then(|j| serde_json::from_str(&j).ok()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Db;

    fn temp_db(name: &str) -> (Db, String) {
        let path = format!("/tmp/ubl_core_test_index_{}_{}.db", name, uuid::Uuid::new_v4());
        (Db::new(&path), path)
    }

    fn cleanup(path: &str) {
        std::fs::remove_file(path).ok();
        std::fs::remove_file(format!("{path}-wal")).ok();
        std::fs::remove_file(format!("{path}-shm")).ok();
    }

    #[test]
    fn span_insert_is_idempotent_on_duplicate_hash() {
        let (db, path) = temp_db("spans");
        let conn = db.conn.lock().unwrap();
        let metadata = serde_json::json!({"kind": "message"});
        insert_span(&conn, "span:1", "t:example.com", 1, Some("u:a"), "message", "b:abc", 10, &metadata).unwrap();
        insert_span(&conn, "span:2", "t:example.com", 2, Some("u:a"), "message", "b:abc", 10, &metadata).unwrap();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM spans WHERE tenant_id = ?1", params!["t:example.com"], |r| r.get(0))
            .unwrap();
        assert_eq!(count, 1);
        drop(conn);
        drop(db);
        cleanup(&path);
    }

    #[test]
    fn tenant_round_trips() {
        let (db, path) = temp_db("tenants");
        let conn = db.conn.lock().unwrap();
        let tenant = Tenant {
            tenant_id: "t:example.com".to_string(),
            tenant_type: crate::models::TenantType::Customer,
            created_at: "2026-01-01T00:00:00Z".to_string(),
            members: Default::default(),
            defaults: crate::models::TenantDefaults {
                room_mode: crate::models::RoomMode::Internal,
                retention_days: 30,
                max_message_bytes: 8000,
            },
        };
        upsert_tenant(&conn, &tenant).unwrap();
        let loaded = get_tenant(&conn, "t:example.com").unwrap().unwrap();
        assert_eq!(loaded.tenant_id, "t:example.com");
        drop(conn);
        drop(db);
        cleanup(&path);
    }

    #[test]
    fn room_summaries_list_for_tenant() {
        let (db, path) = temp_db("rooms");
        let conn = db.conn.lock().unwrap();
        let summary = RoomSummary {
            room_id: "r:general".to_string(),
            name: "general".to_string(),
            mode: crate::models::RoomMode::Internal,
            created_at: "2026-01-01T00:00:00Z".to_string(),
        };
        upsert_room_summary(&conn, "t:example.com", &summary).unwrap();
        let rooms = list_room_summaries(&conn, "t:example.com").unwrap();
        assert_eq!(rooms.len(), 1);
        assert_eq!(rooms[0].room_id, "r:general");
        drop(conn);
        drop(db);
        cleanup(&path);
    }
}
