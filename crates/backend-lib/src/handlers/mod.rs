// ============================
// crates/backend-lib/src/handlers/mod.rs
// ============================
//! HTTP handlers.

pub mod auth;
pub mod users;

use axum::Json;
use serde_json::{json, Value};

/// Liveness check
pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
