//! The coordinator-owned keyed store: `coordinator_state(key, kind,
//! state_json, updated_at)`. Each coordinator serializes its entire owned
//! state to JSON and writes one row per key, the same way a real
//! durable-object primitive would persist a single object's storage.

use rusqlite::{params, Connection, OptionalExtension};
use serde::{de::DeserializeOwned, Serialize};

pub fn load<T: DeserializeOwned>(conn: &Connection, key: &str) -> rusqlite::Result<Option<T>> {
    let json: Option<String> = conn
        .query_row(
            "SELECT state_json FROM coordinator_state WHERE key = ?1",
            params![key],
            |row| row.get(0),
        )
        .optional()?;
    Ok(json.and_then(|j| serde_json::from_str(&j).ok()))
}

pub fn save<T: Serialize>(conn: &Connection, key: &str, kind: &str, state: &T) -> rusqlite::Result<()> {
    let json = serde_json::to_string(state).expect("coordinator state must serialize");
    let now = chrono::Utc::now().to_rfc3339();
    conn.execute(
        "INSERT INTO coordinator_state (key, kind, state_json, updated_at) VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(key) DO UPDATE SET state_json = excluded.state_json, updated_at = excluded.updated_at",
        params![key, kind, json, now],
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Db;

    #[test]
    fn save_then_load_round_trips() {
        let path = format!("/tmp/ubl_core_test_keyed_{}.db", uuid::Uuid::new_v4());
        let db = Db::new(&path);
        let conn = db.conn.lock().unwrap();
        save(&conn, "t:example.com", "tenant", &42i64).unwrap();
        let loaded: Option<i64> = load(&conn, "t:example.com").unwrap();
        assert_eq!(loaded, Some(42));
        drop(conn);
        drop(db);
        std::fs::remove_file(&path).ok();
        std::fs::remove_file(format!("{path}-wal")).ok();
        std::fs::remove_file(format!("{path}-shm")).ok();
    }

    #[test]
    fn load_missing_key_returns_none() {
        let path = format!("/tmp/ubl_core_test_keyed_missing_{}.db", uuid::Uuid::new_v4());
        let db = Db::new(&path);
        let conn = db.conn.lock().unwrap();
        let loaded: Option<i64> = load(&conn, "nope").unwrap();
        assert_eq!(loaded, None);
        drop(conn);
        drop(db);
        std::fs::remove_file(&path).ok();
        std::fs::remove_file(format!("{path}-wal")).ok();
        std::fs::remove_file(format!("{path}-shm")).ok();
    }
}
