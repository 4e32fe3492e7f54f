
use axum::http::StatusCode;
use serde_json::json;
use test_support::{
    app, app_with, enrollment_count, enrollment_status, post_json, result_of, MockIdentity,
};

fn enroll_body(email: &str) -> serde_json::Value {
    json!({
        "studentEmail": email,
        "courseId": "spanish-101",
        "organizationCode": "ORG1",
        "classId": "class-3b",
    })
}

#[tokio::test]
async fn enroll_creates_invitation_then_invited_row() {
    let app = app();

    let (status, body) = post_json(&app, "/api/enrollments", &enroll_body("ana@example.com")).await;
    assert_eq!(status, StatusCode::OK);
    let result = result_of(&body);
    assert_eq!(result.get("status").and_then(|v| v.as_str()), Some("invited"));
    assert_eq!(result.get("invitationId").and_then(|v| v.as_str()), Some("inv-1"));

    assert_eq!(app.identity.created_emails(), vec!["ana@example.com"]);
    assert_eq!(
        enrollment_status(&app, "ana@example.com", "spanish-101").await,
        Some("invited".to_string())
    );
}

#[tokio::test]
async fn duplicate_enrollment_is_409_and_creates_no_second_invitation() {
    let app = app();

    let (status, _) = post_json(&app, "/api/enrollments", &enroll_body("ana@example.com")).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = post_json(&app, "/api/enrollments", &enroll_body("ana@example.com")).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(test_support::error_code(&body), "already_enrolled");

    // Exactly one of the two identical requests took effect.
    assert_eq!(enrollment_count(&app).await, 1);
    assert_eq!(app.identity.created_emails().len(), 1);
}

#[tokio::test]
async fn unique_index_rejects_duplicate_rows_at_the_database() {
    let app = app();

    let insert = "INSERT INTO enrollments(
        id, student_email, course_id, organization_code,
        status, invitation_id, created_at, updated_at
    ) VALUES (?, 'ana@example.com', 'spanish-101', 'ORG1',
              'invited', NULL, '2026-01-01T00:00:00Z', '2026-01-01T00:00:00Z')";

    let conn = app.state.db.lock().await;
    conn.execute(insert, ["e1"]).expect("first insert");
    let err = conn.execute(insert, ["e2"]).expect_err("second insert must fail");
    match err {
        rusqlite::Error::SqliteFailure(e, _) => {
            assert_eq!(e.code, rusqlite::ErrorCode::ConstraintViolation)
        }
        other => panic!("expected a constraint violation, got {}", other),
    }
}

#[tokio::test]
async fn losing_the_insert_race_revokes_and_reports_already_enrolled() {
    let app = app();

    // Sneak a rival row in between the existence check and the insert, so
    // the insert itself hits the unique index.
    {
        let conn = app.state.db.lock().await;
        conn.execute_batch(
            "CREATE TRIGGER rival_enrollment
             BEFORE INSERT ON enrollments
             WHEN NOT EXISTS (
                 SELECT 1 FROM enrollments WHERE student_email = NEW.student_email
             )
             BEGIN
                 INSERT INTO enrollments(
                     id, student_email, course_id, organization_code,
                     status, invitation_id, created_at, updated_at
                 ) VALUES (
                     'rival', NEW.student_email, NEW.course_id, NEW.organization_code,
                     'invited', 'inv-rival', NEW.created_at, NEW.updated_at
                 );
             END;",
        )
        .expect("install trigger");
    }

    let (status, body) = post_json(&app, "/api/enrollments", &enroll_body("ana@example.com")).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(test_support::error_code(&body), "already_enrolled");

    // Our invitation was created, then revoked once the insert lost.
    assert_eq!(app.identity.created_emails(), vec!["ana@example.com"]);
    assert_eq!(app.identity.revoked_invitations(), vec!["inv-1"]);
    // The aborted statement rolls its trigger's rival row back with it.
    assert_eq!(enrollment_count(&app).await, 0);
}

#[tokio::test]
async fn validation_failures_are_400_before_any_provider_call() {
    let app = app();

    let (status, body) = post_json(&app, "/api/enrollments", &enroll_body("not-an-email")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(test_support::error_code(&body), "bad_params");

    let (status, _) = post_json(
        &app,
        "/api/enrollments",
        &json!({
            "studentEmail": "ana@example.com",
            "courseId": "",
            "organizationCode": "ORG1",
        }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    assert!(app.identity.created_emails().is_empty());
    assert_eq!(enrollment_count(&app).await, 0);
}

#[tokio::test]
async fn provider_outage_maps_to_upstream_failure() {
    let mut mock = MockIdentity::new();
    mock.fail_invitations = true;
    let app = app_with(mock);

    let (status, body) = post_json(&app, "/api/enrollments", &enroll_body("ana@example.com")).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(test_support::error_code(&body), "upstream_failed");
    assert_eq!(enrollment_count(&app).await, 0);
}

#[tokio::test]
async fn failed_row_insert_revokes_the_invitation() {
    let app = app();

    // Force the insert to fail after the invitation step.
    {
        let conn = app.state.db.lock().await;
        conn.execute_batch(
            "CREATE TRIGGER block_enrollment_inserts
             BEFORE INSERT ON enrollments
             BEGIN SELECT RAISE(ABORT, 'forced failure'); END;",
        )
        .expect("install trigger");
    }

    let (status, _) = post_json(&app, "/api/enrollments", &enroll_body("ana@example.com")).await;
    assert_ne!(status, StatusCode::OK);

    // The invitation was created and then revoked best-effort.
    assert_eq!(app.identity.created_emails(), vec!["ana@example.com"]);
    assert_eq!(app.identity.revoked_invitations(), vec!["inv-1"]);
    assert_eq!(enrollment_count(&app).await, 0);
}
