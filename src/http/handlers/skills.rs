use std::collections::HashMap;

use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::NaiveDate;
use serde_json::json;

use crate::aggregate;
use crate::http::error::{ok, ApiError};
use crate::http::types::SharedState;
use crate::identity;
use crate::org;
use crate::scores::{self, ScoreFilters, Skill};

fn parse_date(params: &HashMap<String, String>, key: &str) -> Result<Option<NaiveDate>, ApiError> {
    let Some(raw) = params.get(key) else {
        return Ok(None);
    };
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map(Some)
        .map_err(|_| ApiError::bad_params(format!("{} must be a YYYY-MM-DD date", key)))
}

fn parse_score(params: &HashMap<String, String>, key: &str) -> Result<Option<f64>, ApiError> {
    let Some(raw) = params.get(key) else {
        return Ok(None);
    };
    let value: f64 = raw
        .parse()
        .map_err(|_| ApiError::bad_params(format!("{} must be a number", key)))?;
    if !(0.0..=100.0).contains(&value) {
        return Err(ApiError::bad_params(format!(
            "{} must be in range 0..=100",
            key
        )));
    }
    Ok(Some(value))
}

pub fn parse_filters(params: &HashMap<String, String>) -> Result<ScoreFilters, ApiError> {
    let filters = ScoreFilters {
        user_id: params
            .get("userId")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty()),
        from: parse_date(params, "from")?,
        to: parse_date(params, "to")?,
        min_score: parse_score(params, "minScore")?,
        max_score: parse_score(params, "maxScore")?,
    };
    filters.validate()?;
    Ok(filters)
}

pub async fn skill_report(
    State(state): State<SharedState>,
    Path((code, skill_raw)): Path<(String, String)>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let skill = Skill::parse(&skill_raw)?;
    let filters = parse_filters(&params)?;

    let (members, rows) = {
        let conn = state.db.lock().await;
        let members = org::members(&conn, &code)?;
        if let Some(user_id) = &filters.user_id {
            org::require_member(&members, user_id)?;
        }
        let rows = scores::fetch_scores(&conn, skill, &org::member_ids(&members), &filters)?;
        (members, rows)
    };

    let values: Vec<f64> = rows.iter().map(|r| r.score).collect();
    let profiles =
        identity::enrich_profiles(state.identity.as_ref(), &org::member_ids(&members)).await;

    // Per-student rollup: time-ordered scores per user, then mean and trend.
    let mut by_user: HashMap<String, Vec<&scores::ScoreRow>> = HashMap::new();
    for row in &rows {
        by_user.entry(row.user_id.clone()).or_default().push(row);
    }
    let mut per_student: Vec<serde_json::Value> = Vec::new();
    for profile in &profiles {
        let Some(user_rows) = by_user.get(&profile.user_id) else {
            continue;
        };
        let user_values: Vec<f64> = user_rows.iter().map(|r| r.score).collect();
        per_student.push(json!({
            "userId": profile.user_id,
            "displayName": profile.display_name,
            "lessonCount": user_rows.len(),
            "average": aggregate::round1(aggregate::mean(&user_values)),
            "trend": aggregate::classify_trend(&user_values).as_str(),
            "lastActivityAt": user_rows.last().map(|r| r.created_at.clone()),
        }));
    }

    Ok(ok(json!({
        "organizationCode": code,
        "skill": skill.as_str(),
        "lessonCount": rows.len(),
        "average": aggregate::round1(aggregate::mean(&values)),
        "distribution": aggregate::distribution(&values),
        "trend": aggregate::classify_trend(&values).as_str(),
        "perStudent": per_student,
    })))
}
