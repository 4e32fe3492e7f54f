use axum::extract::{Path, State};
use axum::Json;
use chrono::Utc;
use serde_json::json;

use crate::aggregate;
use crate::http::error::{ok, ApiError};
use crate::http::types::SharedState;
use crate::identity;
use crate::org;
use crate::scores::{self, ScoreFilters, ALL_SKILLS};

pub async fn student_report(
    State(state): State<SharedState>,
    Path((code, user_id)): Path<(String, String)>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let filters = ScoreFilters {
        user_id: Some(user_id.clone()),
        ..ScoreFilters::default()
    };

    let (per_skill_rows, completions) = {
        let conn = state.db.lock().await;
        let members = org::members(&conn, &code)?;
        org::require_member(&members, &user_id)?;
        let scoped = vec![user_id.clone()];
        let mut per_skill_rows = Vec::with_capacity(ALL_SKILLS.len());
        for skill in ALL_SKILLS {
            per_skill_rows.push((skill, scores::fetch_scores(&conn, skill, &scoped, &filters)?));
        }
        let completions = scores::fetch_completions(&conn, &scoped)?;
        (per_skill_rows, completions)
    };

    let profile = identity::enrich_profiles(state.identity.as_ref(), &[user_id.clone()])
        .await
        .into_iter()
        .next()
        .unwrap_or_else(|| identity::placeholder_profile(&user_id));

    let per_skill: Vec<serde_json::Value> = per_skill_rows
        .iter()
        .map(|(skill, rows)| {
            let values: Vec<f64> = rows.iter().map(|r| r.score).collect();
            json!({
                "skill": skill.as_str(),
                "lessonCount": rows.len(),
                "average": aggregate::round1(aggregate::mean(&values)),
                "trend": aggregate::classify_trend(&values).as_str(),
                "lastActivityAt": rows.last().map(|r| r.created_at.clone()),
            })
        })
        .collect();

    let today = Utc::now().date_naive();
    let days: Vec<chrono::NaiveDate> = completions
        .iter()
        .filter_map(|c| scores::completion_day(&c.completed_at))
        .collect();
    let streak = aggregate::streaks(&days, today);

    // Overall trend wants one time-ordered series across every skill.
    let mut timeline: Vec<(&str, f64)> = per_skill_rows
        .iter()
        .flat_map(|(_, rows)| rows.iter().map(|r| (r.created_at.as_str(), r.score)))
        .collect();
    timeline.sort_by(|a, b| a.0.cmp(b.0));
    let all_values: Vec<f64> = timeline.iter().map(|(_, score)| *score).collect();
    let average = aggregate::round1(aggregate::mean(&all_values));
    let completion_rate = aggregate::completion_rate(&days, today);

    // Tasks the student needed several attempts on, hardest first.
    let mut retried: Vec<&scores::CompletionRow> =
        completions.iter().filter(|c| c.attempts > 1).collect();
    retried.sort_by(|a, b| b.attempts.cmp(&a.attempts));
    let difficult_tasks: Vec<serde_json::Value> = retried
        .iter()
        .take(5)
        .map(|c| {
            json!({
                "taskId": c.task_id,
                "courseId": c.course_id,
                "attempts": c.attempts,
                "completedAt": c.completed_at,
            })
        })
        .collect();

    Ok(ok(json!({
        "organizationCode": code,
        "userId": user_id,
        "displayName": profile.display_name,
        "email": profile.email,
        "average": average,
        "trend": aggregate::classify_trend(&all_values).as_str(),
        "perSkill": per_skill,
        "streak": streak,
        "insightScore": aggregate::insight_score(average, completion_rate, streak.current),
        "difficultTasks": difficult_tasks,
    })))
}
