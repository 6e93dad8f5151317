use rocket::get;
use rocket::serde::json::Json;
use rocket::State;
use serde_json::{json, Value};

use crate::app;
use crate::config::Config;
use crate::envelope;
use crate::error::AppError;
use crate::identity::{tenant_id_for, Identity, RequestId};
use crate::ledger::LedgerCoordinator;
use crate::runtime::Registry;
use crate::store::Db;

#[get("/api/receipts/<seq>")]
pub fn get_receipt(
    identity: Identity,
    request_id: RequestId,
    seq: i64,
    db: &State<Db>,
    config: &State<Config>,
    ledgers: &State<Registry<LedgerCoordinator>>,
) -> Result<Json<Value>, AppError> {
    let tenant_id = tenant_id_for(&identity.0.email_domain, config);
    let ledger_lock = app::ledger_for(db, ledgers, config, &tenant_id);
    let ledger = ledger_lock.lock().unwrap();
    let atoms = ledger.get_by_seq(db, seq)?;
    if atoms.is_empty() {
        return Err(AppError::NotFound("receipt"));
    }
    Ok(envelope::wrap(json!({"seq": seq, "atoms": atoms}), &request_id.0))
}
