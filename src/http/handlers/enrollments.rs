use axum::extract::State;
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use crate::enroll::{self, EnrollRequest};
use crate::http::error::{ok, ApiError};
use crate::http::types::SharedState;

pub async fn enroll(
    State(state): State<SharedState>,
    Json(req): Json<EnrollRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let result = enroll::enroll_student(&state, &req).await?;
    Ok(ok(result))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkEnrollBody {
    pub enrollments: Vec<EnrollRequest>,
}

const BULK_LIMIT: usize = 100;

pub async fn enroll_bulk(
    State(state): State<SharedState>,
    Json(body): Json<BulkEnrollBody>,
) -> Result<Json<serde_json::Value>, ApiError> {
    if body.enrollments.is_empty() {
        return Err(ApiError::bad_params("enrollments must not be empty"));
    }
    if body.enrollments.len() > BULK_LIMIT {
        return Err(ApiError::bad_params(format!(
            "enrollments must contain at most {} items",
            BULK_LIMIT
        )));
    }

    let results = enroll::enroll_bulk(&state, &body.enrollments).await;
    let succeeded = results
        .iter()
        .filter(|r| r.get("ok").and_then(|v| v.as_bool()) == Some(true))
        .count();
    Ok(ok(json!({
        "total": results.len(),
        "succeeded": succeeded,
        "failed": results.len() - succeeded,
        "results": results,
    })))
}
