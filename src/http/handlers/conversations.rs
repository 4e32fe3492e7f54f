use axum::extract::{Path, State};
use axum::Json;
use serde_json::json;

use crate::http::error::{ok, ApiError};
use crate::http::types::SharedState;
use crate::org;
use crate::scores;

pub async fn conversations(
    State(state): State<SharedState>,
    Path((code, user_id)): Path<(String, String)>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let transcripts = {
        let conn = state.db.lock().await;
        let members = org::members(&conn, &code)?;
        org::require_member(&members, &user_id)?;
        scores::fetch_transcripts(&conn, &user_id)?
    };

    Ok(ok(json!({
        "organizationCode": code,
        "userId": user_id,
        "conversationCount": transcripts.len(),
        "conversations": transcripts,
    })))
}
