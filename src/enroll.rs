use chrono::Utc;
use rusqlite::{Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;

use crate::http::error::ApiError;
use crate::http::types::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnrollmentStatus {
    Invited,
    Active,
    Inactive,
}

impl EnrollmentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            EnrollmentStatus::Invited => "invited",
            EnrollmentStatus::Active => "active",
            EnrollmentStatus::Inactive => "inactive",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrollRequest {
    pub student_email: String,
    pub course_id: String,
    pub organization_code: String,
    #[serde(default)]
    pub class_id: Option<String>,
}

pub fn validate_request(req: &EnrollRequest) -> Result<(), ApiError> {
    validate_email(&req.student_email)?;
    if req.course_id.trim().is_empty() {
        return Err(ApiError::bad_params("courseId must not be empty"));
    }
    if req.organization_code.trim().is_empty() {
        return Err(ApiError::bad_params("organizationCode must not be empty"));
    }
    Ok(())
}

pub fn validate_email(email: &str) -> Result<(), ApiError> {
    let trimmed = email.trim();
    let Some((local, domain)) = trimmed.split_once('@') else {
        return Err(ApiError::bad_params(format!(
            "invalid studentEmail: {}",
            email
        )));
    };
    if local.is_empty() || domain.is_empty() || !domain.contains('.') || domain.contains('@') {
        return Err(ApiError::bad_params(format!(
            "invalid studentEmail: {}",
            email
        )));
    }
    Ok(())
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrollmentRow {
    pub id: String,
    pub student_email: String,
    pub course_id: String,
    pub organization_code: String,
    pub class_id: Option<String>,
    pub status: String,
    pub invitation_id: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

pub fn find_existing(
    conn: &Connection,
    email: &str,
    course_id: &str,
    organization_code: &str,
) -> Result<Option<EnrollmentRow>, ApiError> {
    conn.query_row(
        "SELECT id, student_email, course_id, organization_code, class_id,
                status, invitation_id, created_at, updated_at
         FROM enrollments
         WHERE student_email = ? AND course_id = ? AND organization_code = ?",
        (email, course_id, organization_code),
        row_to_enrollment,
    )
    .optional()
    .map_err(ApiError::db)
}

fn row_to_enrollment(r: &rusqlite::Row<'_>) -> rusqlite::Result<EnrollmentRow> {
    Ok(EnrollmentRow {
        id: r.get(0)?,
        student_email: r.get(1)?,
        course_id: r.get(2)?,
        organization_code: r.get(3)?,
        class_id: r.get(4)?,
        status: r.get(5)?,
        invitation_id: r.get(6)?,
        created_at: r.get(7)?,
        updated_at: r.get(8)?,
    })
}

fn insert_enrollment(
    conn: &Connection,
    req: &EnrollRequest,
    invitation_id: &str,
) -> Result<String, rusqlite::Error> {
    let id = Uuid::new_v4().to_string();
    let now = Utc::now().to_rfc3339();
    conn.execute(
        "INSERT INTO enrollments(
            id, student_email, course_id, organization_code, class_id,
            status, invitation_id, created_at, updated_at
         ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        (
            &id,
            req.student_email.trim(),
            &req.course_id,
            &req.organization_code,
            &req.class_id,
            EnrollmentStatus::Invited.as_str(),
            invitation_id,
            &now,
            &now,
        ),
    )?;
    Ok(id)
}

/// The invite-then-insert two-step. The invitation is created at the
/// provider first; if the row insert then fails, the invitation is revoked
/// best-effort, leaving a logged orphan when the revoke also fails.
pub async fn enroll_student(
    state: &AppState,
    req: &EnrollRequest,
) -> Result<serde_json::Value, ApiError> {
    validate_request(req)?;
    let email = req.student_email.trim().to_string();

    {
        let conn = state.db.lock().await;
        if let Some(existing) = find_existing(&conn, &email, &req.course_id, &req.organization_code)? {
            return Err(ApiError::new(
                "already_enrolled",
                format!("{} is already enrolled in this course", email),
            )
            .with_details(json!({ "enrollmentId": existing.id, "status": existing.status })));
        }
    }

    let invitation = state
        .identity
        .create_invitation(&email, &req.organization_code, &req.course_id)
        .await
        .map_err(|e| ApiError::upstream(e.to_string()))?;

    let insert_result = {
        let conn = state.db.lock().await;
        insert_enrollment(&conn, req, &invitation.invitation_id)
    };

    match insert_result {
        Ok(id) => {
            info!(
                event = "enrollment_created",
                enrollment_id = %id,
                organization_code = %req.organization_code,
                course_id = %req.course_id
            );
            Ok(json!({
                "enrollmentId": id,
                "status": EnrollmentStatus::Invited.as_str(),
                "invitationId": invitation.invitation_id,
            }))
        }
        Err(rusqlite::Error::SqliteFailure(e, _))
            if e.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            // Lost the race to a concurrent request. Revoke our invitation
            // and report the duplicate.
            revoke_best_effort(state, &invitation.invitation_id).await;
            Err(ApiError::new(
                "already_enrolled",
                format!("{} is already enrolled in this course", email),
            ))
        }
        Err(e) => {
            revoke_best_effort(state, &invitation.invitation_id).await;
            Err(ApiError::new("db_query_failed", e.to_string()))
        }
    }
}

async fn revoke_best_effort(state: &AppState, invitation_id: &str) {
    if let Err(e) = state.identity.revoke_invitation(invitation_id).await {
        warn!(
            event = "invitation_orphaned",
            invitation_id = %invitation_id,
            error = %e
        );
    }
}

/// Applies the same flow per item; failures are reported per email instead
/// of failing the request.
pub async fn enroll_bulk(
    state: &AppState,
    requests: &[EnrollRequest],
) -> Vec<serde_json::Value> {
    let mut results = Vec::with_capacity(requests.len());
    for req in requests {
        let item = match enroll_student(state, req).await {
            Ok(result) => json!({
                "studentEmail": req.student_email,
                "ok": true,
                "result": result,
            }),
            Err(e) => json!({
                "studentEmail": req.student_email,
                "ok": false,
                "error": { "code": e.code, "message": e.message },
            }),
        };
        results.push(item);
    }
    results
}

/// user.created: the student signed up, so every invited enrollment for the
/// email becomes active. Re-delivery against already-active rows matches
/// zero rows and is a no-op.
pub fn apply_user_created(conn: &Connection, email: &str) -> Result<usize, ApiError> {
    let now = Utc::now().to_rfc3339();
    conn.execute(
        "UPDATE enrollments SET status = ?, updated_at = ?
         WHERE student_email = ? AND status = ?",
        (
            EnrollmentStatus::Active.as_str(),
            &now,
            email,
            EnrollmentStatus::Invited.as_str(),
        ),
    )
    .map_err(ApiError::db)
}

/// user.updated: the provider changed the account email; keep enrollment
/// rows pointed at the current address.
pub fn apply_user_updated(
    conn: &Connection,
    previous_email: &str,
    email: &str,
) -> Result<usize, ApiError> {
    let now = Utc::now().to_rfc3339();
    conn.execute(
        "UPDATE enrollments SET student_email = ?, updated_at = ?
         WHERE student_email = ?",
        (email, &now, previous_email),
    )
    .map_err(ApiError::db)
}

/// user.deleted: every enrollment for the email goes inactive.
pub fn apply_user_deleted(conn: &Connection, email: &str) -> Result<usize, ApiError> {
    let now = Utc::now().to_rfc3339();
    conn.execute(
        "UPDATE enrollments SET status = ?, updated_at = ?
         WHERE student_email = ? AND status != ?",
        (
            EnrollmentStatus::Inactive.as_str(),
            &now,
            email,
            EnrollmentStatus::Inactive.as_str(),
        ),
    )
    .map_err(ApiError::db)
}
