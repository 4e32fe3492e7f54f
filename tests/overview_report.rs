
use axum::http::StatusCode;
use test_support::{app_with, get_json, result_of, seed_completion, seed_member, seed_score, MockIdentity};

#[tokio::test]
async fn overview_rolls_up_every_skill_and_enriches_students() {
    let app = app_with(
        MockIdentity::new()
            .with_profile("u-ana", "Ana Flores", "ana@example.com")
            .with_profile("u-ben", "Ben Okafor", "ben@example.com"),
    );
    seed_member(&app, "u-ana", "ORG1", "Lincoln High").await;
    seed_member(&app, "u-ben", "ORG1", "Lincoln High").await;

    seed_score(&app, "speaking_scores", "u-ana", "t1", 80.0, "2026-01-01T10:00:00Z", None).await;
    seed_score(&app, "grammar_scores", "u-ana", "t2", 60.0, "2026-01-02T10:00:00Z", None).await;
    seed_score(&app, "listening_scores", "u-ben", "t3", 40.0, "2026-01-03T10:00:00Z", None).await;
    seed_completion(&app, "u-ana", "t1", "course-a", 1, "2026-01-01T10:30:00Z").await;

    let (status, body) = get_json(&app, "/api/orgs/ORG1/overview").await;
    assert_eq!(status, StatusCode::OK);
    let result = result_of(&body);

    assert_eq!(
        result.get("organizationName").and_then(|v| v.as_str()),
        Some("Lincoln High")
    );
    assert_eq!(result.get("memberCount").and_then(|v| v.as_u64()), Some(2));
    assert_eq!(result.get("average").and_then(|v| v.as_f64()), Some(60.0));

    let per_skill = result.get("perSkill").and_then(|v| v.as_array()).expect("perSkill");
    assert_eq!(per_skill.len(), 7);
    let speaking = per_skill
        .iter()
        .find(|s| s.get("skill").and_then(|v| v.as_str()) == Some("speaking"))
        .expect("speaking entry");
    assert_eq!(speaking.get("lessonCount").and_then(|v| v.as_u64()), Some(1));
    assert_eq!(speaking.get("average").and_then(|v| v.as_f64()), Some(80.0));
    let writing = per_skill
        .iter()
        .find(|s| s.get("skill").and_then(|v| v.as_str()) == Some("writing"))
        .expect("writing entry");
    assert_eq!(writing.get("lessonCount").and_then(|v| v.as_u64()), Some(0));
    assert_eq!(writing.get("average").and_then(|v| v.as_f64()), Some(0.0));
    assert_eq!(writing.get("trend").and_then(|v| v.as_str()), Some("stable"));

    let students = result.get("students").and_then(|v| v.as_array()).expect("students");
    assert_eq!(students.len(), 2);
    let ana = students
        .iter()
        .find(|s| s.get("userId").and_then(|v| v.as_str()) == Some("u-ana"))
        .expect("ana");
    assert_eq!(ana.get("displayName").and_then(|v| v.as_str()), Some("Ana Flores"));
    assert_eq!(ana.get("email").and_then(|v| v.as_str()), Some("ana@example.com"));
    assert_eq!(ana.get("lessonCount").and_then(|v| v.as_u64()), Some(2));
    assert_eq!(ana.get("average").and_then(|v| v.as_f64()), Some(70.0));
    assert!(ana.get("insightScore").and_then(|v| v.as_f64()).is_some());
}

#[tokio::test]
async fn overview_distribution_counts_sum_to_lesson_count() {
    let app = app_with(MockIdentity::new());
    seed_member(&app, "u-ana", "ORG1", "Lincoln High").await;
    for (i, score) in [5.0, 25.0, 45.0, 65.0, 85.0, 95.0].iter().enumerate() {
        seed_score(
            &app,
            "writing_scores",
            "u-ana",
            &format!("t{}", i),
            *score,
            &format!("2026-01-0{}T10:00:00Z", i + 1),
            None,
        )
        .await;
    }

    let (status, body) = get_json(&app, "/api/orgs/ORG1/overview").await;
    assert_eq!(status, StatusCode::OK);
    let result = result_of(&body);
    let buckets = result.get("distribution").and_then(|v| v.as_array()).expect("buckets");
    let counts: Vec<u64> = buckets
        .iter()
        .filter_map(|b| b.get("count").and_then(|v| v.as_u64()))
        .collect();
    assert_eq!(counts, vec![1, 1, 1, 1, 2]);
}
