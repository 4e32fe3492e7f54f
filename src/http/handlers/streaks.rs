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
use crate::scores;

pub async fn streak_report(
    State(state): State<SharedState>,
    Path(code): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let (members, completions) = {
        let conn = state.db.lock().await;
        let members = org::members(&conn, &code)?;
        let completions = scores::fetch_completions(&conn, &org::member_ids(&members))?;
        (members, completions)
    };

    let profiles =
        identity::enrich_profiles(state.identity.as_ref(), &org::member_ids(&members)).await;

    let today = Utc::now().date_naive();
    let mut days_by_user: HashMap<String, Vec<chrono::NaiveDate>> = HashMap::new();
    for c in &completions {
        if let Some(day) = scores::completion_day(&c.completed_at) {
            days_by_user.entry(c.user_id.clone()).or_default().push(day);
        }
    }

    let mut rows: Vec<serde_json::Value> = profiles
        .iter()
        .map(|profile| {
            let streak = days_by_user
                .get(&profile.user_id)
                .map(|days| aggregate::streaks(days, today))
                .unwrap_or_default();
            json!({
                "userId": profile.user_id,
                "displayName": profile.display_name,
                "streak": streak,
            })
        })
        .collect();
    // Longest current streaks first for the leaderboard card.
    rows.sort_by_key(|r| {
        std::cmp::Reverse(
            r.get("streak")
                .and_then(|s| s.get("current"))
                .and_then(|v| v.as_i64())
                .unwrap_or(0),
        )
    });

    Ok(ok(json!({
        "organizationCode": code,
        "students": rows,
    })))
}
