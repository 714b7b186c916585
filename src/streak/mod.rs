// SPDX-License-Identifier: MPL-2.0

//! Daily study streaks.
//!
//! Only timestamps are persisted. Whether a streak is active, at risk or
//! broken is derived from them at read time, so the answer stays right even
//! when the app has been closed for days.

mod service;

pub use service::{STREAK_KEY, StreakService, StreakSnapshot, StreakWatcher};

use crate::model::timestamp;
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Hours after the last activity before a streak breaks
pub const GRACE_HOURS: f64 = 48.0;

/// Final stretch of the grace window in which a streak is at risk
pub const AT_RISK_HOURS: f64 = 24.0;

/// Broken streaks kept in history, newest first
pub const MAX_PAST_STREAKS: usize = 10;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StreakState {
    pub current_streak: u32,
    pub longest_streak: u32,
    #[serde(with = "timestamp::option")]
    pub last_study_date: Option<DateTime<Utc>>,
    #[serde(with = "timestamp::option")]
    pub streak_start_date: Option<DateTime<Utc>>,
    pub past_streaks: Vec<PastStreak>,
}

/// A finished streak
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PastStreak {
    pub streak: u32,
    #[serde(with = "timestamp")]
    pub start_date: DateTime<Utc>,
    #[serde(with = "timestamp")]
    pub end_date: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StreakStatus {
    Active,
    AtRisk,
    Broken,
}

/// Hours left before the streak breaks, never negative
pub fn hours_remaining<Tz: TimeZone>(state: &StreakState, now: &DateTime<Tz>) -> f64 {
    let Some(last) = state.last_study_date else {
        return 0.0;
    };
    let elapsed = now.with_timezone(&Utc) - last;
    let since = elapsed.num_milliseconds() as f64 / 3_600_000.0;
    (GRACE_HOURS - since).max(0.0)
}

pub fn status<Tz: TimeZone>(state: &StreakState, now: &DateTime<Tz>) -> StreakStatus {
    if state.last_study_date.is_none() {
        return StreakStatus::Broken;
    }
    match hours_remaining(state, now) {
        h if h <= 0.0 => StreakStatus::Broken,
        h if h <= AT_RISK_HOURS => StreakStatus::AtRisk,
        _ => StreakStatus::Active,
    }
}

/// `last` and `now` fall on the same calendar day in `now`'s timezone
fn same_day<Tz: TimeZone>(last: DateTime<Utc>, now: &DateTime<Tz>) -> bool {
    last.with_timezone(&now.timezone()).date_naive() == now.date_naive()
}

/// Count a study session at `now`.
///
/// A second session on the same calendar day only moves `last_study_date`.
pub fn record_activity<Tz: TimeZone>(state: &mut StreakState, now: &DateTime<Tz>) {
    let at = now.with_timezone(&Utc);

    if state.current_streak > 0
        && let Some(last) = state.last_study_date
        && same_day(last, now)
    {
        state.last_study_date = Some(at);
        return;
    }

    if state.current_streak == 0 || status(state, now) == StreakStatus::Broken {
        state.current_streak = 1;
        state.streak_start_date = Some(at);
    } else {
        state.current_streak += 1;
    }
    state.longest_streak = state.longest_streak.max(state.current_streak);
    state.last_study_date = Some(at);
}

/// Archive and clear a streak whose grace window has run out.
/// Returns the archived entry, if any.
pub fn check_and_break<Tz: TimeZone>(
    state: &mut StreakState,
    now: &DateTime<Tz>,
) -> Option<PastStreak> {
    if state.current_streak == 0 || status(state, now) != StreakStatus::Broken {
        return None;
    }

    let archived = state.last_study_date.map(|end| PastStreak {
        streak: state.current_streak,
        start_date: state.streak_start_date.unwrap_or(end),
        end_date: end,
    });
    if let Some(past) = &archived {
        state.past_streaks.insert(0, past.clone());
        state.past_streaks.truncate(MAX_PAST_STREAKS);
    }

    state.current_streak = 0;
    state.streak_start_date = None;
    archived
}

/// Wipe everything, history included
pub fn reset(state: &mut StreakState) {
    *state = StreakState::default();
}

/// Display stage reached after `min_days` consecutive days
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Stage {
    pub min_days: u32,
    pub label: &'static str,
}

pub const DEFAULT_STAGES: &[Stage] = &[
    Stage { min_days: 0, label: "Seedling" },
    Stage { min_days: 3, label: "Sprout" },
    Stage { min_days: 7, label: "Sapling" },
    Stage { min_days: 14, label: "Bloom" },
    Stage { min_days: 30, label: "Evergreen" },
];

/// Highest stage whose threshold `current_streak` has reached
pub fn stage(current_streak: u32, table: &[Stage]) -> Option<&Stage> {
    table
        .iter()
        .filter(|s| s.min_days <= current_streak)
        .max_by_key(|s| s.min_days)
}
