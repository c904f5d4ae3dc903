//! Liveness probe.

use axum::Json;
use serde_json::{json, Value};

/// Handler for GET /health
///
/// Does not check the store; failure means the process is hung.
pub async fn health_check() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
