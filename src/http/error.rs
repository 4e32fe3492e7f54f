use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

/// Error taxonomy for request handling. The code is stable and drives the
/// HTTP status; the message is safe to show in the dashboard.
#[derive(Debug, Clone)]
pub struct ApiError {
    pub code: String,
    pub message: String,
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    pub fn new(code: &str, message: impl Into<String>) -> Self {
        Self {
            code: code.to_string(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn bad_params(message: impl Into<String>) -> Self {
        Self::new("bad_params", message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new("not_found", message)
    }

    pub fn db(e: rusqlite::Error) -> Self {
        Self::new("db_query_failed", e.to_string())
    }

    pub fn upstream(message: impl Into<String>) -> Self {
        Self::new("upstream_failed", message)
    }

    pub fn status(&self) -> StatusCode {
        match self.code.as_str() {
            "bad_params" => StatusCode::BAD_REQUEST,
            "invalid_signature" => StatusCode::UNAUTHORIZED,
            "not_found" => StatusCode::NOT_FOUND,
            "already_enrolled" => StatusCode::CONFLICT,
            "upstream_failed" => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let mut error = json!({
            "code": self.code,
            "message": self.message,
        });
        if let Some(d) = self.details {
            error["details"] = d;
        }
        (status, Json(json!({ "ok": false, "error": error }))).into_response()
    }
}

/// Success envelope shared by every endpoint.
pub fn ok(result: serde_json::Value) -> Json<serde_json::Value> {
    Json(json!({ "ok": true, "result": result }))
}
