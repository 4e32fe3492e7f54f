use std::collections::HashMap;

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

pub async fn overview(
    State(state): State<SharedState>,
    Path(code): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let filters = ScoreFilters::default();

    let (members, per_skill_rows, completions) = {
        let conn = state.db.lock().await;
        let members = org::members(&conn, &code)?;
        let ids = org::member_ids(&members);
        let mut per_skill_rows = Vec::with_capacity(ALL_SKILLS.len());
        for skill in ALL_SKILLS {
            per_skill_rows.push((skill, scores::fetch_scores(&conn, skill, &ids, &filters)?));
        }
        let completions = scores::fetch_completions(&conn, &ids)?;
        (members, per_skill_rows, completions)
    };

    let organization_name = members
        .first()
        .map(|m| m.organization_name.clone())
        .unwrap_or_default();
    let profiles =
        identity::enrich_profiles(state.identity.as_ref(), &org::member_ids(&members)).await;

    let per_skill: Vec<serde_json::Value> = per_skill_rows
        .iter()
        .map(|(skill, rows)| {
            let values: Vec<f64> = rows.iter().map(|r| r.score).collect();
            json!({
                "skill": skill.as_str(),
                "lessonCount": rows.len(),
                "average": aggregate::round1(aggregate::mean(&values)),
                "distribution": aggregate::distribution(&values),
                "trend": aggregate::classify_trend(&values).as_str(),
            })
        })
        .collect();

    // Cohort insight: each student's all-skill average, completion activity
    // and streak blended into one engagement figure.
    let today = Utc::now().date_naive();
    let mut completion_days: HashMap<String, Vec<chrono::NaiveDate>> = HashMap::new();
    for c in &completions {
        if let Some(day) = scores::completion_day(&c.completed_at) {
            completion_days.entry(c.user_id.clone()).or_default().push(day);
        }
    }
    let mut students: Vec<serde_json::Value> = Vec::new();
    for profile in &profiles {
        let mut values: Vec<f64> = Vec::new();
        for (_, rows) in &per_skill_rows {
            values.extend(rows.iter().filter(|r| r.user_id == profile.user_id).map(|r| r.score));
        }
        let days = completion_days
            .get(&profile.user_id)
            .map(Vec::as_slice)
            .unwrap_or(&[]);
        let streak = aggregate::streaks(days, today);
        let average = aggregate::round1(aggregate::mean(&values));
        let completion_rate = aggregate::completion_rate(days, today);
        students.push(json!({
            "userId": profile.user_id,
            "displayName": profile.display_name,
            "email": profile.email,
            "lessonCount": values.len(),
            "average": average,
            "currentStreak": streak.current,
            "insightScore": aggregate::insight_score(average, completion_rate, streak.current),
        }));
    }

    let cohort_values: Vec<f64> = per_skill_rows
        .iter()
        .flat_map(|(_, rows)| rows.iter().map(|r| r.score))
        .collect();

    Ok(ok(json!({
        "organizationCode": code,
        "organizationName": organization_name,
        "memberCount": members.len(),
        "average": aggregate::round1(aggregate::mean(&cohort_values)),
        "distribution": aggregate::distribution(&cohort_values),
        "perSkill": per_skill,
        "students": students,
    })))
}
