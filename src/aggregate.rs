use chrono::NaiveDate;
use serde::Serialize;

/// 1-decimal rounding used for every figure the dashboard displays.
pub fn round1(x: f64) -> f64 {
    (x * 10.0).round() / 10.0
}

/// Arithmetic mean. Empty input is 0, never NaN.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / (values.len() as f64)
}

pub const BUCKET_LABELS: [&str; 5] = ["0-20", "21-40", "41-60", "61-80", "81-100"];

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DistributionBucket {
    pub label: String,
    pub count: usize,
    pub percent: f64,
}

/// Counts scores into the five fixed percentage buckets. Scores are clamped
/// into 0..=100 first, so bucket counts always sum to the input length.
pub fn distribution(values: &[f64]) -> Vec<DistributionBucket> {
    let mut counts = [0_usize; 5];
    for v in values {
        let clamped = v.clamp(0.0, 100.0);
        let idx = if clamped <= 20.0 {
            0
        } else if clamped <= 40.0 {
            1
        } else if clamped <= 60.0 {
            2
        } else if clamped <= 80.0 {
            3
        } else {
            4
        };
        counts[idx] += 1;
    }
    let total = values.len();
    BUCKET_LABELS
        .iter()
        .zip(counts.iter())
        .map(|(label, count)| DistributionBucket {
            label: label.to_string(),
            count: *count,
            percent: if total > 0 {
                round1(100.0 * (*count as f64) / (total as f64))
            } else {
                0.0
            },
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trend {
    Improving,
    Declining,
    Stable,
}

impl Trend {
    pub fn as_str(self) -> &'static str {
        match self {
            Trend::Improving => "improving",
            Trend::Declining => "declining",
            Trend::Stable => "stable",
        }
    }
}

pub const TREND_THRESHOLD: f64 = 5.0;

/// Classifies a time-ordered score series (oldest first) by comparing the
/// mean of the recent half against the mean of the older half. Fewer than
/// two points is always stable. Odd lengths give the extra point to the
/// recent window.
pub fn classify_trend(points: &[f64]) -> Trend {
    if points.len() < 2 {
        return Trend::Stable;
    }
    let split = points.len() / 2;
    let older = mean(&points[..split]);
    let recent = mean(&points[split..]);
    let delta = recent - older;
    if delta > TREND_THRESHOLD {
        Trend::Improving
    } else if delta < -TREND_THRESHOLD {
        Trend::Declining
    } else {
        Trend::Stable
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StreakSummary {
    pub current: i64,
    pub longest: i64,
    pub active_days: i64,
}

/// Walks completion dates as calendar days. The current streak is the run of
/// consecutive days ending today or yesterday; any gap of two or more days
/// breaks it.
pub fn streaks(dates: &[NaiveDate], today: NaiveDate) -> StreakSummary {
    let mut days: Vec<NaiveDate> = dates.to_vec();
    days.sort();
    days.dedup();
    if days.is_empty() {
        return StreakSummary::default();
    }

    let mut longest = 1_i64;
    let mut run = 1_i64;
    for pair in days.windows(2) {
        let gap = (pair[1] - pair[0]).num_days();
        if gap == 1 {
            run += 1;
        } else {
            run = 1;
        }
        longest = longest.max(run);
    }

    let last = *days.last().unwrap_or(&today);
    let current = if (today - last).num_days() <= 1 {
        run
    } else {
        0
    };

    StreakSummary {
        current,
        longest,
        active_days: days.len() as i64,
    }
}

pub const COMPLETION_WINDOW_DAYS: i64 = 30;

/// Share of the trailing 30 calendar days (today inclusive) with at least
/// one completion, as a percentage. Older activity does not count.
pub fn completion_rate(dates: &[NaiveDate], today: NaiveDate) -> f64 {
    let cutoff = today - chrono::Duration::days(COMPLETION_WINDOW_DAYS - 1);
    let mut days: Vec<NaiveDate> = dates
        .iter()
        .copied()
        .filter(|d| *d >= cutoff && *d <= today)
        .collect();
    days.sort();
    days.dedup();
    100.0 * (days.len() as f64) / (COMPLETION_WINDOW_DAYS as f64)
}

pub const INSIGHT_WEIGHT_SCORE: f64 = 0.5;
pub const INSIGHT_WEIGHT_COMPLETION: f64 = 0.3;
pub const INSIGHT_WEIGHT_STREAK: f64 = 0.2;
const INSIGHT_STREAK_CAP_DAYS: f64 = 30.0;

/// Weighted engagement score in 0..=100. The streak component saturates at
/// 30 consecutive days.
pub fn insight_score(avg_score: f64, completion_rate: f64, current_streak: i64) -> f64 {
    let score_part = avg_score.clamp(0.0, 100.0);
    let completion_part = completion_rate.clamp(0.0, 100.0);
    let streak_part = 100.0 * ((current_streak as f64).min(INSIGHT_STREAK_CAP_DAYS))
        / INSIGHT_STREAK_CAP_DAYS;
    round1(
        INSIGHT_WEIGHT_SCORE * score_part
            + INSIGHT_WEIGHT_COMPLETION * completion_part
            + INSIGHT_WEIGHT_STREAK * streak_part,
    )
}
