//! `WorkspaceCoordinator` (§4.5): analogous to `RoomCoordinator` but lighter
//! — documents and a stub LLM-completion tool, both ledger-receipted.

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::canon;
use crate::error::AppError;
use crate::ids;
use crate::ledger::LedgerCoordinator;
use crate::models::{Document, Identity, Receipt, WorkspaceConfig};
use crate::store::{index, keyed, Db};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct WorkspaceState {
    config: Option<WorkspaceConfig>,
    documents: std::collections::HashMap<String, Document>,
}

impl Default for WorkspaceState {
    fn default() -> Self {
        Self { config: None, documents: std::collections::HashMap::new() }
    }
}

pub struct CompletionResult {
    pub text: String,
    pub prompt_tokens: usize,
    pub completion_tokens: usize,
    pub receipt: Receipt,
}

pub struct WorkspaceCoordinator {
    tenant_id: String,
    workspace_id: String,
    state: WorkspaceState,
}

impl WorkspaceCoordinator {
    pub fn load_or_init(db: &Db, tenant_id: &str, workspace_id: &str) -> Self {
        let conn = db.conn.lock().unwrap();
        let state = keyed::load::<WorkspaceState>(&conn, &Self::key(tenant_id, workspace_id))
            .ok()
            .flatten()
            .unwrap_or_default();
        Self { tenant_id: tenant_id.to_string(), workspace_id: workspace_id.to_string(), state }
    }

    fn key(tenant_id: &str, workspace_id: &str) -> String {
        format!("workspace:{tenant_id}:{workspace_id}")
    }

    fn persist(&self, db: &Db) -> Result<(), AppError> {
        let conn = db.conn.lock().unwrap();
        keyed::save(&conn, &Self::key(&self.tenant_id, &self.workspace_id), "workspace", &self.state)?;
        Ok(())
    }

    fn ensure_init(&mut self, db: &Db, creator: &str) -> Result<(), AppError> {
        if self.state.config.is_some() {
            return Ok(());
        }
        let now = chrono::Utc::now().to_rfc3339();
        self.state.config = Some(WorkspaceConfig {
            tenant_id: self.tenant_id.clone(),
            workspace_id: self.workspace_id.clone(),
            created_at: now.clone(),
        });
        self.persist(db)?;

        let conn = db.conn.lock().unwrap();
        index::upsert_agreement(
            &conn,
            &crate::models::Agreement {
                id: ids::workspace_agreement_id(&self.workspace_id),
                agreement_type: crate::models::AgreementType::WorkspaceAgreement,
                tenant_id: self.tenant_id.clone(),
                created_at: now,
                created_by: creator.to_string(),
                metadata: json!({"workspace_id": self.workspace_id}),
            },
        )?;
        Ok(())
    }

    fn agreement_id(&self) -> String {
        ids::workspace_agreement_id(&self.workspace_id)
    }

    pub fn create_document(
        &mut self,
        db: &Db,
        ledger: &mut LedgerCoordinator,
        creator: &Identity,
        title: &str,
        content: &str,
        request_id: &str,
    ) -> Result<(Document, Receipt), AppError> {
        self.ensure_init(db, &creator.user_id)?;

        let document_id = ids::document_id();
        let content_hash = canon::content_hash(content);
        let now = chrono::Utc::now().to_rfc3339();

        let action = json!({
            "kind": "action.v1",
            "tenant_id": self.tenant_id,
            "when": now,
            "who": {
                "user_id": creator.user_id,
                "email": creator.email,
                "is_service": creator.is_service,
            },
            "did": "office.document.create",
            "this": {"workspace_id": self.workspace_id, "document_id": document_id, "content_hash": content_hash},
            "agreement_id": self.agreement_id(),
            "status": "executed",
            "trace": {"request_id": request_id},
        });
        let action_outcome = ledger.append_atom(db, &action, Some(&creator.user_id))?;

        let effect = json!({
            "kind": "effect.v1",
            "tenant_id": self.tenant_id,
            "when": now,
            "ref_action_cid": action_outcome.cid,
            "outcome": "ok",
            "effects": [{"op": "workspace.document.create", "workspace_id": self.workspace_id, "document_id": document_id}],
            "pointers": {"document_id": document_id},
        });
        let mut effect_append_failed = false;
        if let Err(e) = ledger.append_atom(db, &effect, Some(&creator.user_id)) {
            tracing::warn!(error = %e, document_id = %document_id, "effect_append_failed");
            effect_append_failed = true;
        }

        let mut receipt = action_outcome.receipt;
        receipt.effect_append_failed = effect_append_failed;

        let document = Document {
            document_id: document_id.clone(),
            workspace_id: self.workspace_id.clone(),
            title: title.to_string(),
            content: content.to_string(),
            content_hash,
            created_at: now,
            created_by: creator.user_id.clone(),
        };
        self.state.documents.insert(document_id.clone(), document.clone());
        self.persist(db)?;

        {
            let conn = db.conn.lock().unwrap();
            index::upsert_document(&conn, &self.tenant_id, &document)?;
        }

        Ok((document, receipt))
    }

    pub fn get_document(&self, document_id: &str) -> Option<Document> {
        self.state.documents.get(document_id).cloned()
    }

    /// Case-insensitive substring over `title ∥ content` — ranking/stemming
    /// explicitly out of scope (§4.5).
    pub fn search_documents(
        &mut self,
        db: &Db,
        ledger: &mut LedgerCoordinator,
        requester: &Identity,
        query: &str,
        request_id: &str,
    ) -> Result<(Vec<Document>, Receipt), AppError> {
        self.ensure_init(db, &requester.user_id)?;

        let needle = query.to_lowercase();
        let results: Vec<Document> = self
            .state
            .documents
            .values()
            .filter(|d| {
                let haystack = format!("{}{}", d.title, d.content).to_lowercase();
                haystack.contains(&needle)
            })
            .cloned()
            .collect();

        let now = chrono::Utc::now().to_rfc3339();
        let action = json!({
            "kind": "action.v1",
            "tenant_id": self.tenant_id,
            "when": now,
            "who": {
                "user_id": requester.user_id,
                "email": requester.email,
                "is_service": requester.is_service,
            },
            "did": "office.document.search",
            "this": {"workspace_id": self.workspace_id, "query": query, "result_count": results.len()},
            "agreement_id": self.agreement_id(),
            "status": "executed",
            "trace": {"request_id": request_id},
        });
        let outcome = ledger.append_atom(db, &action, Some(&requester.user_id))?;

        Ok((results, outcome.receipt))
    }

    /// `llmComplete`: a fixed-placeholder stub; the receipt and usage counts
    /// are the only observable behavior required here (§4.5).
    pub fn llm_complete(
        &mut self,
        db: &Db,
        ledger: &mut LedgerCoordinator,
        requester: &Identity,
        prompt: &str,
        request_id: &str,
    ) -> Result<CompletionResult, AppError> {
        self.ensure_init(db, &requester.user_id)?;

        let prompt_tokens = prompt.split_whitespace().count();
        let completion_tokens = 20;
        let text = "This is a placeholder completion.".to_string();

        let now = chrono::Utc::now().to_rfc3339();
        let action = json!({
            "kind": "action.v1",
            "tenant_id": self.tenant_id,
            "when": now,
            "who": {
                "user_id": requester.user_id,
                "email": requester.email,
                "is_service": requester.is_service,
            },
            "did": "office.llm.complete",
            "this": {"workspace_id": self.workspace_id, "prompt_tokens": prompt_tokens, "completion_tokens": completion_tokens},
            "agreement_id": self.agreement_id(),
            "status": "executed",
            "trace": {"request_id": request_id},
        });
        let outcome = ledger.append_atom(db, &action, Some(&requester.user_id))?;

        Ok(CompletionResult { text, prompt_tokens, completion_tokens, receipt: outcome.receipt })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Db;

    fn cleanup(path: &str) {
        std::fs::remove_file(path).ok();
        std::fs::remove_file(format!("{path}-wal")).ok();
        std::fs::remove_file(format!("{path}-shm")).ok();
    }

    fn alice() -> Identity {
        Identity {
            user_id: "u:alice".to_string(),
            email: "alice@acme.com".to_string(),
            email_domain: "acme.com".to_string(),
            groups: vec![],
            is_service: false,
        }
    }

    #[test]
    fn create_document_then_search_finds_it() {
        let path = format!("/tmp/ubl_core_test_workspace_{}.db", uuid::Uuid::new_v4());
        let db = Db::new(&path);
        let mut ledger = LedgerCoordinator::load_or_init(&db, "t:example.com", 2000, 5000);
        let mut workspace = WorkspaceCoordinator::load_or_init(&db, "t:example.com", "t:example.com");
        let alice = alice();

        let (doc, receipt) = workspace
            .create_document(&db, &mut ledger, &alice, "Roadmap", "Q3 planning notes", "req:1")
            .unwrap();
        assert!(receipt.seq > 0);

        let (found, _) = workspace.search_documents(&db, &mut ledger, &alice, "planning", "req:2").unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].document_id, doc.document_id);
        cleanup(&path);
    }

    #[test]
    fn llm_complete_counts_prompt_tokens_by_whitespace() {
        let path = format!("/tmp/ubl_core_test_workspace_llm_{}.db", uuid::Uuid::new_v4());
        let db = Db::new(&path);
        let mut ledger = LedgerCoordinator::load_or_init(&db, "t:example.com", 2000, 5000);
        let mut workspace = WorkspaceCoordinator::load_or_init(&db, "t:example.com", "t:example.com");

        let result = workspace.llm_complete(&db, &mut ledger, &alice(), "what is the status", "req:1").unwrap();
        assert_eq!(result.prompt_tokens, 4);
        assert_eq!(result.completion_tokens, 20);
        cleanup(&path);
    }
}
