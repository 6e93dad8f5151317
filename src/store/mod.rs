//! Persistence. One `rusqlite::Connection` behind a `std::sync::Mutex`,
//! exactly like the teacher's `db::Db` — it plays two roles here:
//!
//! - `keyed`: the coordinator-owned store (§2/§3's "per-coordinator keyed
//!   store") — one row per coordinator key holding its full serialized
//!   state. This is the stand-in for the spec's external "durable-object-
//!   style persistence primitive".
//! - `index`: the tabular secondary mirror (§6) — `tenants`, `agreements`,
//!   `rooms`, `documents`, `spans`, `sessions`, `audit_log`, `policy_cache`.
//!   Never read to serve hot-window reads (§5); writes here are best-effort
//!   from the core's point of view, but in this single-connection
//!   implementation they share the same transactional connection as the
//!   keyed store, so in practice they don't fail independently. Coordinators
//!   still treat index-write failures as non-fatal (`.ok()`/log-and-continue)
//!   to keep the behavioral contract intact if the store is later split.

pub mod index;
pub mod keyed;

use rusqlite::Connection;
use std::sync::Mutex;

pub struct Db {
    pub conn: Mutex<Connection>,
}

impl Db {
    pub fn new(path: &str) -> Self {
        if let Some(parent) = std::path::Path::new(path).parent() {
            std::fs::create_dir_all(parent).ok();
        }
        let conn = Connection::open(path).expect("failed to open database");
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")
            .expect("failed to set pragmas");
        let db = Db { conn: Mutex::new(conn) };
        db.migrate();
        db
    }

    fn migrate(&self) {
        let conn = self.conn.lock().unwrap();

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS coordinator_state (
                key TEXT PRIMARY KEY,
                kind TEXT NOT NULL,
                state_json TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );",
        )
        .expect("failed to create coordinator_state table");

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS tenants (
                id TEXT PRIMARY KEY,
                tenant_json TEXT NOT NULL,
                created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS agreements (
                id TEXT PRIMARY KEY,
                type TEXT NOT NULL,
                tenant_id TEXT NOT NULL,
                created_at TEXT NOT NULL,
                created_by TEXT NOT NULL,
                metadata TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_agreements_tenant ON agreements(tenant_id);

            CREATE TABLE IF NOT EXISTS rooms (
                room_id TEXT PRIMARY KEY,
                tenant_id TEXT NOT NULL,
                summary_json TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_rooms_tenant ON rooms(tenant_id);

            CREATE TABLE IF NOT EXISTS documents (
                document_id TEXT PRIMARY KEY,
                tenant_id TEXT NOT NULL,
                workspace_id TEXT NOT NULL,
                document_json TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_documents_workspace ON documents(tenant_id, workspace_id);

            CREATE TABLE IF NOT EXISTS spans (
                id TEXT PRIMARY KEY,
                tenant_id TEXT NOT NULL,
                seq INTEGER NOT NULL,
                user_id TEXT,
                kind TEXT NOT NULL,
                hash TEXT NOT NULL,
                size INTEGER NOT NULL,
                metadata TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_spans_tenant_seq ON spans(tenant_id, seq);
            CREATE UNIQUE INDEX IF NOT EXISTS idx_spans_tenant_hash ON spans(tenant_id, hash);

            CREATE TABLE IF NOT EXISTS sessions (
                id TEXT PRIMARY KEY,
                created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS audit_log (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                tenant_id TEXT NOT NULL,
                request_id TEXT NOT NULL,
                action TEXT NOT NULL,
                created_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_audit_tenant ON audit_log(tenant_id);

            CREATE TABLE IF NOT EXISTS policy_cache (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                cached_at TEXT NOT NULL
            );",
        )
        .expect("failed to create index store tables");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migrate_is_idempotent() {
        let path = format!("/tmp/ubl_core_test_migrate_{}.db", uuid::Uuid::new_v4());
        let db = Db::new(&path);
        drop(db);
        let db = Db::new(&path);
        drop(db);
        std::fs::remove_file(&path).ok();
        std::fs::remove_file(format!("{path}-wal")).ok();
        std::fs::remove_file(format!("{path}-shm")).ok();
    }
}
