//! Every HTTP response body carries `request_id` and `server_time` (§6).
//! This merges those two fields into a handler's JSON success body; kept as
//! a free function (not a wrapper type) because success bodies otherwise
//! have no common shape across routes, matching the teacher's habit of
//! building each response with `serde_json::json!` inline.

use rocket::serde::json::Json;
use serde::Serialize;
use serde_json::Value;

pub fn wrap<T: Serialize>(body: T, request_id: &str) -> Json<Value> {
    let mut value = serde_json::to_value(body).unwrap_or(Value::Null);
    let now = chrono::Utc::now().to_rfc3339();
    if let Some(obj) = value.as_object_mut() {
        obj.insert("request_id".to_string(), Value::String(request_id.to_string()));
        obj.insert("server_time".to_string(), Value::String(now));
    }
    Json(value)
}
