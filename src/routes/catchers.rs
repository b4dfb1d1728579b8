use rocket::http::Status;
use rocket::serde::json::{json, Json, Value};
use rocket::Request;

// Errors raised before a handler runs (bad JSON, failed guards, unknown routes)
#[catch(default)]
pub fn default_catcher(status: Status, request: &Request) -> (Status, Json<Value>) {
    tracing::debug!(uri = %request.uri(), code = status.code, "request rejected by rocket");
    let reason = status.reason().unwrap_or("Request failed");
    (status, Json(json!({ "error": reason })))
}
