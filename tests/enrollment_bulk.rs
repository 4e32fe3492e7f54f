
use axum::http::StatusCode;
use serde_json::json;
use test_support::{app, enrollment_count, post_json, result_of};

#[tokio::test]
async fn bulk_enrollment_reports_per_item_results() {
    let app = app();

    // Pre-enroll ben so his bulk item is a duplicate.
    let (status, _) = post_json(
        &app,
        "/api/enrollments",
        &json!({
            "studentEmail": "ben@example.com",
            "courseId": "spanish-101",
            "organizationCode": "ORG1",
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = post_json(
        &app,
        "/api/enrollments/bulk",
        &json!({
            "enrollments": [
                { "studentEmail": "ana@example.com", "courseId": "spanish-101", "organizationCode": "ORG1" },
                { "studentEmail": "broken-address", "courseId": "spanish-101", "organizationCode": "ORG1" },
                { "studentEmail": "ben@example.com", "courseId": "spanish-101", "organizationCode": "ORG1" },
            ]
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let result = result_of(&body);

    assert_eq!(result.get("total").and_then(|v| v.as_u64()), Some(3));
    assert_eq!(result.get("succeeded").and_then(|v| v.as_u64()), Some(1));
    assert_eq!(result.get("failed").and_then(|v| v.as_u64()), Some(2));

    let results = result.get("results").and_then(|v| v.as_array()).expect("results");
    assert_eq!(results[0].get("ok").and_then(|v| v.as_bool()), Some(true));
    assert_eq!(results[1].get("ok").and_then(|v| v.as_bool()), Some(false));
    assert_eq!(
        results[1]
            .get("error")
            .and_then(|e| e.get("code"))
            .and_then(|v| v.as_str()),
        Some("bad_params")
    );
    assert_eq!(results[2].get("ok").and_then(|v| v.as_bool()), Some(false));
    assert_eq!(
        results[2]
            .get("error")
            .and_then(|e| e.get("code"))
            .and_then(|v| v.as_str()),
        Some("already_enrolled")
    );

    // ben's original row plus ana's new one.
    assert_eq!(enrollment_count(&app).await, 2);
}

#[tokio::test]
async fn bulk_enrollment_rejects_empty_and_oversized_batches() {
    let app = app();

    let (status, body) = post_json(&app, "/api/enrollments/bulk", &json!({ "enrollments": [] })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(test_support::error_code(&body), "bad_params");

    let oversized: Vec<serde_json::Value> = (0..101)
        .map(|i| {
            json!({
                "studentEmail": format!("s{}@example.com", i),
                "courseId": "spanish-101",
                "organizationCode": "ORG1",
            })
        })
        .collect();
    let (status, _) = post_json(
        &app,
        "/api/enrollments/bulk",
        &json!({ "enrollments": oversized }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(enrollment_count(&app).await, 0);
}
