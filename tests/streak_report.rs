
use axum::http::StatusCode;
use chrono::{Duration, Utc};
use test_support::{app_with, get_json, result_of, seed_completion, seed_member, MockIdentity};

fn day_ts(days_ago: i64) -> String {
    let day = Utc::now().date_naive() - Duration::days(days_ago);
    format!("{}T08:00:00Z", day)
}

#[tokio::test]
async fn streak_report_ranks_students_by_current_streak() {
    let app = app_with(
        MockIdentity::new()
            .with_profile("u-ana", "Ana Flores", "ana@example.com")
            .with_profile("u-ben", "Ben Okafor", "ben@example.com")
            .with_profile("u-cam", "Cam Ruiz", "cam@example.com"),
    );
    seed_member(&app, "u-ana", "ORG1", "Lincoln High").await;
    seed_member(&app, "u-ben", "ORG1", "Lincoln High").await;
    seed_member(&app, "u-cam", "ORG1", "Lincoln High").await;

    // Ana: 3-day streak ending today. Two same-day completions count once.
    seed_completion(&app, "u-ana", "t1", "course-a", 1, &day_ts(2)).await;
    seed_completion(&app, "u-ana", "t2", "course-a", 1, &day_ts(1)).await;
    seed_completion(&app, "u-ana", "t3", "course-a", 1, &day_ts(0)).await;
    seed_completion(&app, "u-ana", "t4", "course-a", 1, &day_ts(0)).await;
    // Ben: streak broken by a two-day gap; longest run was 2.
    seed_completion(&app, "u-ben", "t1", "course-a", 1, &day_ts(5)).await;
    seed_completion(&app, "u-ben", "t2", "course-a", 1, &day_ts(4)).await;
    // Cam: nothing.

    let (status, body) = get_json(&app, "/api/orgs/ORG1/streaks").await;
    assert_eq!(status, StatusCode::OK);
    let result = result_of(&body);
    let students = result.get("students").and_then(|v| v.as_array()).expect("students");
    assert_eq!(students.len(), 3);

    assert_eq!(students[0].get("userId").and_then(|v| v.as_str()), Some("u-ana"));
    let ana = students[0].get("streak").expect("ana streak");
    assert_eq!(ana.get("current").and_then(|v| v.as_i64()), Some(3));
    assert_eq!(ana.get("activeDays").and_then(|v| v.as_i64()), Some(3));

    let ben = students
        .iter()
        .find(|s| s.get("userId").and_then(|v| v.as_str()) == Some("u-ben"))
        .and_then(|s| s.get("streak"))
        .expect("ben streak");
    assert_eq!(ben.get("current").and_then(|v| v.as_i64()), Some(0));
    assert_eq!(ben.get("longest").and_then(|v| v.as_i64()), Some(2));

    let cam = students
        .iter()
        .find(|s| s.get("userId").and_then(|v| v.as_str()) == Some("u-cam"))
        .and_then(|s| s.get("streak"))
        .expect("cam streak");
    assert_eq!(cam.get("current").and_then(|v| v.as_i64()), Some(0));
    assert_eq!(cam.get("longest").and_then(|v| v.as_i64()), Some(0));
}
