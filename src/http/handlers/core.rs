use axum::extract::State;
use axum::Json;
use serde_json::json;

use crate::http::error::ok;
use crate::http::types::SharedState;

pub async fn health(State(state): State<SharedState>) -> Json<serde_json::Value> {
    ok(json!({
        "version": env!("CARGO_PKG_VERSION"),
        "dbPath": state.db_path.to_string_lossy(),
    }))
}
