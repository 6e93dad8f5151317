//! `LedgerCoordinator` (§4.2): the sole writer for a `(tenant, shard=0)` pair.
//! One shard per tenant in this MVP (§9), so the coordinator is keyed
//! directly by `tenant_id`.

use std::collections::{HashMap, VecDeque};

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::canon::{self, GENESIS_HEAD};
use crate::error::AppError;
use crate::models::{Atom, Receipt};
use crate::store::{index, keyed, Db};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct HotAtom {
    seq: i64,
    head_hash: String,
    cid: String,
    atom: Atom,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LedgerState {
    seq: i64,
    head: String,
    /// The head_hash immediately preceding `hot`'s oldest surviving entry,
    /// needed so `verifyChain` has a starting point once older entries have
    /// been evicted from the hot window.
    floor_head: String,
    hot: VecDeque<HotAtom>,
    dedup: HashMap<String, i64>,
    dedup_order: VecDeque<String>,
}

impl Default for LedgerState {
    fn default() -> Self {
        Self {
            seq: 0,
            head: GENESIS_HEAD.to_string(),
            floor_head: GENESIS_HEAD.to_string(),
            hot: VecDeque::new(),
            dedup: HashMap::new(),
            dedup_order: VecDeque::new(),
        }
    }
}

pub struct AppendOutcome {
    pub receipt: Receipt,
    pub cid: String,
    /// True iff this append was a dedup replay (same cid already appended);
    /// the spec's open question 2 keeps the returned head_hash as the
    /// *current* head rather than the one observed at original insertion.
    pub duplicate: bool,
}

pub struct ChainVerification {
    pub valid: bool,
    pub errors: Vec<String>,
}

pub struct LedgerCoordinator {
    tenant_id: String,
    hot_limit: usize,
    dedup_limit: usize,
    state: LedgerState,
}

impl LedgerCoordinator {
    pub fn load_or_init(db: &Db, tenant_id: &str, hot_limit: usize, dedup_limit: usize) -> Self {
        let conn = db.conn.lock().unwrap();
        let state = keyed::load::<LedgerState>(&conn, &Self::key(tenant_id))
            .ok()
            .flatten()
            .unwrap_or_default();
        Self {
            tenant_id: tenant_id.to_string(),
            hot_limit,
            dedup_limit,
            state,
        }
    }

    fn key(tenant_id: &str) -> String {
        format!("ledger:{tenant_id}")
    }

    fn persist(&self, db: &Db) -> Result<(), AppError> {
        let conn = db.conn.lock().unwrap();
        keyed::save(&conn, &Self::key(&self.tenant_id), "ledger", &self.state)?;
        Ok(())
    }

    pub fn get_state(&self) -> (i64, String) {
        (self.state.seq, self.state.head.clone())
    }

    /// `appendAtom`: `atom_without_cid` must already carry a `kind` field
    /// (`"action.v1"` / `"effect.v1"`); for action atoms, `prev_hash` is
    /// spliced in here, not by the caller.
    pub fn append_atom(
        &mut self,
        db: &Db,
        atom_without_cid: &Value,
        user_id: Option<&str>,
    ) -> Result<AppendOutcome, AppError> {
        let cid = canon::cid_of(atom_without_cid)?;

        if let Some(&existing_seq) = self.state.dedup.get(&cid) {
            let receipt = Receipt {
                ledger_shard: "0".to_string(),
                seq: existing_seq,
                cid: cid.clone(),
                // Open question 2: documented as returning the *current*
                // head rather than re-reading the historical one.
                head_hash: self.state.head.clone(),
                time: chrono::Utc::now().to_rfc3339(),
                effect_append_failed: false,
            };
            return Ok(AppendOutcome { receipt, cid, duplicate: true });
        }

        let mut complete = atom_without_cid.clone();
        let obj = complete
            .as_object_mut()
            .ok_or_else(|| AppError::ValidationError("atom must be a JSON object".to_string()))?;
        obj.insert("cid".to_string(), Value::String(cid.clone()));
        let kind = obj
            .get("kind")
            .and_then(|v| v.as_str())
            .unwrap_or("atom")
            .to_string();
        if kind == "action.v1" {
            obj.insert("prev_hash".to_string(), Value::String(self.state.head.clone()));
        }

        let new_seq = self.state.seq + 1;
        let new_head = canon::next_head_hash(&self.state.head, &cid);

        self.state.hot.push_back(HotAtom {
            seq: new_seq,
            head_hash: new_head.clone(),
            cid: cid.clone(),
            atom: complete.clone(),
        });
        while self.state.hot.len() > self.hot_limit {
            if let Some(evicted) = self.state.hot.pop_front() {
                self.state.floor_head = evicted.head_hash;
            }
        }

        self.state.dedup.insert(cid.clone(), new_seq);
        self.state.dedup_order.push_back(cid.clone());
        while self.state.dedup_order.len() > self.dedup_limit {
            if let Some(evicted_cid) = self.state.dedup_order.pop_front() {
                self.state.dedup.remove(&evicted_cid);
            }
        }

        self.state.seq = new_seq;
        self.state.head = new_head.clone();

        // Persist the keyed (seq, head, hot, dedup) state first: this is
        // the source-of-truth transaction. A failure here fails the append.
        self.persist(db)?;

        // Mirror into the index store; failures here are logged, not fatal
        // (§4.2 failure semantics — index is a reader-side convenience).
        let size = canon::canonicalize(&complete).map(|b| b.len()).unwrap_or(0);
        let metadata = json!({"atom": complete, "seq": new_seq, "head_hash": new_head});
        let conn = db.conn.lock().unwrap();
        if let Err(e) = index::insert_span(
            &conn,
            &format!("span:{new_seq}"),
            &self.tenant_id,
            new_seq,
            user_id,
            &kind,
            &cid,
            size,
            &metadata,
        ) {
            tracing::warn!(error = %e, tenant_id = %self.tenant_id, seq = new_seq, "span_mirror_failed");
        }
        drop(conn);

        let receipt = Receipt {
            ledger_shard: "0".to_string(),
            seq: new_seq,
            cid: cid.clone(),
            head_hash: new_head,
            time: chrono::Utc::now().to_rfc3339(),
            effect_append_failed: false,
        };
        Ok(AppendOutcome { receipt, cid, duplicate: false })
    }

    /// `getBySeq`: the atom at `seq` plus, when it's an `action.v1`, the
    /// immediately following `effect.v1` iff its `ref_action_cid` matches.
    pub fn get_by_seq(&self, db: &Db, seq: i64) -> Result<Vec<Atom>, AppError> {
        let first = match self.hot_atom_at(seq) {
            Some(atom) => Some(atom),
            None => {
                let conn = db.conn.lock().unwrap();
                index::get_span_atom_by_seq(&conn, &self.tenant_id, seq)?
            }
        };
        let Some(first) = first else {
            return Ok(Vec::new());
        };

        let mut out = vec![first.clone()];
        if first.get("kind").and_then(|v| v.as_str()) == Some("action.v1") {
            let action_cid = first.get("cid").and_then(|v| v.as_str()).map(|s| s.to_string());
            let next = match self.hot_atom_at(seq + 1) {
                Some(atom) => Some(atom),
                None => {
                    let conn = db.conn.lock().unwrap();
                    index::get_span_atom_by_seq(&conn, &self.tenant_id, seq + 1)?
                }
            };
            if let Some(next) = next {
                let matches = next.get("ref_action_cid").and_then(|v| v.as_str()) == action_cid.as_deref();
                if matches {
                    out.push(next);
                }
            }
        }
        Ok(out)
    }

    fn hot_atom_at(&self, seq: i64) -> Option<Atom> {
        self.state.hot.iter().find(|a| a.seq == seq).map(|a| a.atom.clone())
    }

    /// `queryRecent`: page of atoms in descending seq order with a
    /// `next_cursor` for continuation. Served from the index store, which
    /// mirrors every appended atom regardless of hot-window eviction.
    pub fn query_recent(
        &self,
        db: &Db,
        cursor: Option<i64>,
        limit: i64,
    ) -> Result<(Vec<Atom>, Option<i64>), AppError> {
        let conn = db.conn.lock().unwrap();
        let mut page = index::query_spans_desc(&conn, &self.tenant_id, cursor, limit + 1)?;
        drop(conn);

        let has_more = page.len() as i64 > limit;
        if has_more {
            page.truncate(limit as usize);
        }
        let next_cursor = if has_more { page.last().map(|(seq, _)| *seq) } else { None };
        let atoms: Vec<Atom> = page.into_iter().map(|(_, atom)| atom).collect();
        Ok((atoms, next_cursor))
    }

    /// `verifyChain`: recompute every cid/head_hash over the hot window and
    /// confirm the running head matches what's stored.
    pub fn verify_chain(&self) -> ChainVerification {
        let mut errors = Vec::new();
        let mut running = self.state.floor_head.clone();

        for entry in &self.state.hot {
            match canon::cid_of(&entry.atom) {
                Ok(recomputed) if recomputed == entry.cid => {}
                Ok(recomputed) => errors.push(format!(
                    "seq {}: cid mismatch (stored {}, recomputed {})",
                    entry.seq, entry.cid, recomputed
                )),
                Err(e) => errors.push(format!("seq {}: {}", entry.seq, e)),
            }

            let recomputed_head = canon::next_head_hash(&running, &entry.cid);
            if recomputed_head != entry.head_hash {
                errors.push(format!(
                    "seq {}: head_hash mismatch (stored {}, recomputed {})",
                    entry.seq, entry.head_hash, recomputed_head
                ));
            }

            if entry.atom.get("kind").and_then(|v| v.as_str()) == Some("action.v1") {
                if let Some(prev_hash) = entry.atom.get("prev_hash").and_then(|v| v.as_str()) {
                    if prev_hash != running {
                        errors.push(format!(
                            "seq {}: prev_hash mismatch (expected {}, found {})",
                            entry.seq, running, prev_hash
                        ));
                    }
                }
            }

            running = entry.head_hash.clone();
        }

        if running != self.state.head {
            errors.push(format!(
                "final head mismatch (stored {}, recomputed {})",
                self.state.head, running
            ));
        }

        ChainVerification { valid: errors.is_empty(), errors }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_db(name: &str) -> (Db, String) {
        let path = format!("/tmp/ubl_core_test_ledger_{}_{}.db", name, uuid::Uuid::new_v4());
        (Db::new(&path), path)
    }

    fn cleanup(path: &str) {
        std::fs::remove_file(path).ok();
        std::fs::remove_file(format!("{path}-wal")).ok();
        std::fs::remove_file(format!("{path}-shm")).ok();
    }

    #[test]
    fn first_append_chains_from_genesis() {
        let (db, path) = temp_db("append");
        let mut ledger = LedgerCoordinator::load_or_init(&db, "t:example.com", 2000, 5000);
        let atom = json!({"kind": "action.v1", "did": "messenger.send", "this": {"room_id": "r:general"}});
        let outcome = ledger.append_atom(&db, &atom, Some("u:alice")).unwrap();
        assert_eq!(outcome.receipt.seq, 1);
        assert!(!outcome.duplicate);
        assert_eq!(outcome.receipt.head_hash, canon::next_head_hash(GENESIS_HEAD, &outcome.cid));
        cleanup(&path);
    }

    #[test]
    fn duplicate_atom_returns_existing_seq_and_current_head() {
        let (db, path) = temp_db("dup");
        let mut ledger = LedgerCoordinator::load_or_init(&db, "t:example.com", 2000, 5000);
        let atom = json!({"kind": "action.v1", "did": "messenger.send", "this": {"room_id": "r:general"}});
        let first = ledger.append_atom(&db, &atom, None).unwrap();
        let other = json!({"kind": "action.v1", "did": "messenger.send", "this": {"room_id": "r:other"}});
        ledger.append_atom(&db, &other, None).unwrap();
        let second = ledger.append_atom(&db, &atom, None).unwrap();
        assert!(second.duplicate);
        assert_eq!(second.receipt.seq, first.receipt.seq);
        assert_eq!(second.receipt.head_hash, ledger.get_state().1);
        cleanup(&path);
    }

    #[test]
    fn verify_chain_passes_for_untampered_window() {
        let (db, path) = temp_db("verify");
        let mut ledger = LedgerCoordinator::load_or_init(&db, "t:example.com", 2000, 5000);
        for i in 0..5 {
            let atom = json!({"kind": "action.v1", "did": "messenger.send", "this": {"seq": i}});
            ledger.append_atom(&db, &atom, None).unwrap();
        }
        let result = ledger.verify_chain();
        assert!(result.valid, "errors: {:?}", result.errors);
        cleanup(&path);
    }

    #[test]
    fn get_by_seq_pairs_action_and_effect() {
        let (db, path) = temp_db("pair");
        let mut ledger = LedgerCoordinator::load_or_init(&db, "t:example.com", 2000, 5000);
        let action = json!({"kind": "action.v1", "did": "messenger.send", "this": {"room_id": "r:general"}});
        let action_outcome = ledger.append_atom(&db, &action, None).unwrap();
        let effect = json!({"kind": "effect.v1", "ref_action_cid": action_outcome.cid, "effects": []});
        ledger.append_atom(&db, &effect, None).unwrap();

        let atoms = ledger.get_by_seq(&db, 1).unwrap();
        assert_eq!(atoms.len(), 2);
        assert_eq!(atoms[1].get("ref_action_cid").and_then(|v| v.as_str()), Some(action_outcome.cid.as_str()));
        cleanup(&path);
    }
}
