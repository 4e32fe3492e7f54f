use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use sha2::{Digest, Sha256};
use tracing::info;

use crate::enroll;
use crate::http::error::{ok, ApiError};
use crate::http::types::SharedState;

pub const SIGNATURE_HEADER: &str = "x-identity-signature";
pub const TIMESTAMP_HEADER: &str = "x-identity-timestamp";
const MAX_TIMESTAMP_SKEW_SECS: i64 = 300;

fn signature_digest(secret: &str, timestamp: &str, body: &str) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(secret.as_bytes());
    hasher.update(b".");
    hasher.update(timestamp.as_bytes());
    hasher.update(b".");
    hasher.update(body.as_bytes());
    hasher.finalize().into()
}

/// Expected signature: hex(sha256(secret "." timestamp "." body)).
pub fn compute_signature(secret: &str, timestamp: &str, body: &str) -> String {
    hex::encode(signature_digest(secret, timestamp, body))
}

// Byte-wise fold so a mismatch costs the same wherever it occurs.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

pub fn verify_signature(
    secret: &str,
    timestamp: &str,
    signature: &str,
    body: &str,
    now_epoch_secs: i64,
) -> Result<(), ApiError> {
    let ts: i64 = timestamp
        .parse()
        .map_err(|_| ApiError::new("invalid_signature", "timestamp is not an epoch integer"))?;
    if (now_epoch_secs - ts).abs() > MAX_TIMESTAMP_SKEW_SECS {
        return Err(ApiError::new(
            "invalid_signature",
            "timestamp outside the accepted window",
        ));
    }
    let expected = signature_digest(secret, timestamp, body);
    let provided = hex::decode(signature)
        .map_err(|_| ApiError::new("invalid_signature", "signature mismatch"))?;
    if !constant_time_eq(&provided, &expected) {
        return Err(ApiError::new("invalid_signature", "signature mismatch"));
    }
    Ok(())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WebhookEvent {
    #[serde(rename = "type")]
    event_type: String,
    data: WebhookUser,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WebhookUser {
    email: String,
    #[serde(default)]
    previous_email: Option<String>,
}

pub async fn identity_webhook(
    State(state): State<SharedState>,
    headers: HeaderMap,
    body: String,
) -> Result<Json<serde_json::Value>, ApiError> {
    let signature = header_str(&headers, SIGNATURE_HEADER)?;
    let timestamp = header_str(&headers, TIMESTAMP_HEADER)?;
    verify_signature(
        &state.webhook_secret,
        &timestamp,
        &signature,
        &body,
        Utc::now().timestamp(),
    )?;

    let event: WebhookEvent = serde_json::from_str(&body)
        .map_err(|e| ApiError::bad_params(format!("invalid event body: {}", e)))?;
    enroll::validate_email(&event.data.email)?;

    let affected = {
        let conn = state.db.lock().await;
        match event.event_type.as_str() {
            "user.created" => enroll::apply_user_created(&conn, &event.data.email)?,
            "user.updated" => {
                let previous = event
                    .data
                    .previous_email
                    .as_deref()
                    .unwrap_or(&event.data.email);
                enroll::apply_user_updated(&conn, previous, &event.data.email)?
            }
            "user.deleted" => enroll::apply_user_deleted(&conn, &event.data.email)?,
            other => {
                return Err(ApiError::bad_params(format!(
                    "unknown event type: {}",
                    other
                )))
            }
        }
    };

    info!(
        event = "webhook_applied",
        event_type = %event.event_type,
        affected = affected
    );
    Ok(ok(json!({
        "eventType": event.event_type,
        "affected": affected,
    })))
}

fn header_str(headers: &HeaderMap, name: &str) -> Result<String, ApiError> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_string())
        .ok_or_else(|| ApiError::new("invalid_signature", format!("missing {} header", name)))
}
