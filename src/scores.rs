use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params_from_iter, types::Value, Connection};
use serde::Serialize;
use tracing::warn;

use crate::http::error::ApiError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Skill {
    Speaking,
    Listening,
    Reading,
    Writing,
    Grammar,
    Pronunciation,
    Chatbot,
}

pub const ALL_SKILLS: [Skill; 7] = [
    Skill::Speaking,
    Skill::Listening,
    Skill::Reading,
    Skill::Writing,
    Skill::Grammar,
    Skill::Pronunciation,
    Skill::Chatbot,
];

impl Skill {
    pub fn as_str(self) -> &'static str {
        match self {
            Skill::Speaking => "speaking",
            Skill::Listening => "listening",
            Skill::Reading => "reading",
            Skill::Writing => "writing",
            Skill::Grammar => "grammar",
            Skill::Pronunciation => "pronunciation",
            Skill::Chatbot => "chatbot",
        }
    }

    pub fn table(self) -> &'static str {
        match self {
            Skill::Speaking => "speaking_scores",
            Skill::Listening => "listening_scores",
            Skill::Reading => "reading_scores",
            Skill::Writing => "writing_scores",
            Skill::Grammar => "grammar_scores",
            Skill::Pronunciation => "pronunciation_scores",
            Skill::Chatbot => "chatbot_scores",
        }
    }

    pub fn parse(raw: &str) -> Result<Self, ApiError> {
        match raw.to_ascii_lowercase().as_str() {
            "speaking" => Ok(Skill::Speaking),
            "listening" => Ok(Skill::Listening),
            "reading" => Ok(Skill::Reading),
            "writing" => Ok(Skill::Writing),
            "grammar" => Ok(Skill::Grammar),
            "pronunciation" => Ok(Skill::Pronunciation),
            "chatbot" => Ok(Skill::Chatbot),
            other => Err(ApiError::bad_params(format!(
                "unknown skill '{}'; expected one of: speaking, listening, reading, writing, grammar, pronunciation, chatbot",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ScoreFilters {
    pub user_id: Option<String>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub min_score: Option<f64>,
    pub max_score: Option<f64>,
}

impl ScoreFilters {
    pub fn validate(&self) -> Result<(), ApiError> {
        if let (Some(from), Some(to)) = (self.from, self.to) {
            if from > to {
                return Err(ApiError::bad_params("from must be <= to"));
            }
        }
        if let (Some(min), Some(max)) = (self.min_score, self.max_score) {
            if min > max {
                return Err(ApiError::bad_params("minScore must be <= maxScore"));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreRow {
    pub user_id: String,
    pub task_id: String,
    pub score: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<serde_json::Value>,
    pub created_at: String,
}

/// Fetches one skill table filtered to the given member ids plus the
/// optional user/date/score filters, oldest first. The embedded JSON payload
/// is parsed leniently: malformed blobs are dropped, not errors.
pub fn fetch_scores(
    conn: &Connection,
    skill: Skill,
    member_ids: &[String],
    filters: &ScoreFilters,
) -> Result<Vec<ScoreRow>, ApiError> {
    if member_ids.is_empty() {
        return Ok(Vec::new());
    }

    let placeholders = std::iter::repeat("?")
        .take(member_ids.len())
        .collect::<Vec<_>>()
        .join(",");
    let mut sql = format!(
        "SELECT user_id, task_id, score, payload, created_at
         FROM {}
         WHERE user_id IN ({})",
        skill.table(),
        placeholders
    );
    let mut bind_values: Vec<Value> = member_ids
        .iter()
        .map(|id| Value::Text(id.clone()))
        .collect();

    if let Some(user_id) = &filters.user_id {
        sql.push_str(" AND user_id = ?");
        bind_values.push(Value::Text(user_id.clone()));
    }
    if let Some(from) = filters.from {
        sql.push_str(" AND created_at >= ?");
        bind_values.push(Value::Text(format!("{}T00:00:00Z", from)));
    }
    if let Some(to) = filters.to {
        sql.push_str(" AND created_at <= ?");
        bind_values.push(Value::Text(format!("{}T23:59:59Z", to)));
    }
    if let Some(min) = filters.min_score {
        sql.push_str(" AND score >= ?");
        bind_values.push(Value::Real(min));
    }
    if let Some(max) = filters.max_score {
        sql.push_str(" AND score <= ?");
        bind_values.push(Value::Real(max));
    }
    sql.push_str(" ORDER BY created_at");

    let mut stmt = conn.prepare(&sql).map_err(ApiError::db)?;
    let rows = stmt
        .query_map(params_from_iter(bind_values), |r| {
            let payload_raw: Option<String> = r.get(3)?;
            Ok((
                r.get::<_, String>(0)?,
                r.get::<_, String>(1)?,
                r.get::<_, f64>(2)?,
                payload_raw,
                r.get::<_, String>(4)?,
            ))
        })
        .and_then(|it| it.collect::<Result<Vec<_>, _>>())
        .map_err(ApiError::db)?;

    let mut out = Vec::with_capacity(rows.len());
    for (user_id, task_id, score, payload_raw, created_at) in rows {
        let payload = payload_raw.as_deref().and_then(|raw| {
            match serde_json::from_str::<serde_json::Value>(raw) {
                Ok(v) => Some(v),
                Err(e) => {
                    warn!(
                        event = "bad_score_payload",
                        table = skill.table(),
                        task_id = %task_id,
                        error = %e
                    );
                    None
                }
            }
        });
        out.push(ScoreRow {
            user_id,
            task_id,
            score,
            payload,
            created_at,
        });
    }
    Ok(out)
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptMessage {
    pub role: String,
    pub content: String,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Transcript {
    pub task_id: String,
    pub message_count: usize,
    pub started_at: String,
    pub messages: Vec<TranscriptMessage>,
}

/// Reconstructs chatbot transcripts for a student: messages grouped by task
/// and sorted by time, transcripts ordered newest first.
pub fn fetch_transcripts(conn: &Connection, user_id: &str) -> Result<Vec<Transcript>, ApiError> {
    let mut stmt = conn
        .prepare(
            "SELECT task_id, role, content, created_at
             FROM conversation_messages
             WHERE user_id = ?
             ORDER BY task_id, created_at",
        )
        .map_err(ApiError::db)?;
    let rows = stmt
        .query_map([user_id], |r| {
            Ok((
                r.get::<_, String>(0)?,
                r.get::<_, String>(1)?,
                r.get::<_, String>(2)?,
                r.get::<_, String>(3)?,
            ))
        })
        .and_then(|it| it.collect::<Result<Vec<_>, _>>())
        .map_err(ApiError::db)?;

    let mut transcripts: Vec<Transcript> = Vec::new();
    for (task_id, role, content, created_at) in rows {
        let message = TranscriptMessage {
            role,
            content,
            created_at: created_at.clone(),
        };
        match transcripts.last_mut() {
            Some(t) if t.task_id == task_id => t.messages.push(message),
            _ => transcripts.push(Transcript {
                task_id,
                message_count: 0,
                started_at: created_at,
                messages: vec![message],
            }),
        }
    }
    for t in &mut transcripts {
        t.message_count = t.messages.len();
    }
    transcripts.sort_by(|a, b| b.started_at.cmp(&a.started_at));
    Ok(transcripts)
}

#[derive(Debug, Clone)]
pub struct CompletionRow {
    pub user_id: String,
    pub task_id: String,
    pub course_id: String,
    pub attempts: i64,
    pub completed_at: String,
}

pub fn fetch_completions(
    conn: &Connection,
    member_ids: &[String],
) -> Result<Vec<CompletionRow>, ApiError> {
    if member_ids.is_empty() {
        return Ok(Vec::new());
    }
    let placeholders = std::iter::repeat("?")
        .take(member_ids.len())
        .collect::<Vec<_>>()
        .join(",");
    let sql = format!(
        "SELECT user_id, task_id, course_id, attempts, completed_at
         FROM task_completions
         WHERE user_id IN ({})
         ORDER BY completed_at",
        placeholders
    );
    let bind_values: Vec<Value> = member_ids
        .iter()
        .map(|id| Value::Text(id.clone()))
        .collect();
    let mut stmt = conn.prepare(&sql).map_err(ApiError::db)?;
    stmt.query_map(params_from_iter(bind_values), |r| {
        Ok(CompletionRow {
            user_id: r.get(0)?,
            task_id: r.get(1)?,
            course_id: r.get(2)?,
            attempts: r.get(3)?,
            completed_at: r.get(4)?,
        })
    })
    .and_then(|it| it.collect::<Result<Vec<_>, _>>())
    .map_err(ApiError::db)
}

/// Calendar day of a stored RFC 3339 timestamp. Rows with unparseable
/// timestamps are skipped by callers.
pub fn completion_day(completed_at: &str) -> Option<NaiveDate> {
    DateTime::parse_from_rfc3339(completed_at)
        .ok()
        .map(|dt| dt.with_timezone(&Utc).date_naive())
}
