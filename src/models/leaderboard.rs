//! Leaderboard aggregates and ranking.
//!
//! One `LeaderboardStat` exists per user. Counters only ever change through
//! atomic increments in the store; ranking is a pure function over a set of
//! stats so both store backends agree on ordering.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Per-user leaderboard aggregate.
///
/// Stored at: `leaderboard_stats/{user_id}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardStat {
    pub user_id: String,
    /// Snapshot of the user's display name
    pub name: String,
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(default)]
    pub drops: i64,
    #[serde(default)]
    pub lessons_completed: i64,
    #[serde(default)]
    pub streak: i64,
    #[serde(with = "crate::time_utils::rfc3339_millis")]
    pub updated_at: DateTime<Utc>,
}

impl LeaderboardStat {
    /// A zeroed record for a user seen for the first time.
    pub fn empty(user_id: &str, name: &str, avatar: Option<String>, now: DateTime<Utc>) -> Self {
        Self {
            user_id: user_id.to_string(),
            name: name.to_string(),
            avatar,
            drops: 0,
            lessons_completed: 0,
            streak: 0,
            updated_at: now,
        }
    }

    /// Apply a delta in memory. Stores must call this only under the
    /// record's write lock.
    ///
    /// Returns `false` and leaves the record untouched if any counter would
    /// overflow.
    pub fn apply(&mut self, delta: &StatsDelta, now: DateTime<Utc>) -> bool {
        let (Some(drops), Some(lessons), Some(streak)) = (
            self.drops.checked_add(delta.drops),
            self.lessons_completed.checked_add(delta.lessons),
            self.streak.checked_add(delta.streak),
        ) else {
            return false;
        };

        self.drops = drops;
        self.lessons_completed = lessons;
        self.streak = streak;
        self.updated_at = now;
        true
    }

    pub fn metric_value(&self, metric: RankMetric) -> i64 {
        match metric {
            RankMetric::Drops => self.drops,
            RankMetric::Lessons => self.lessons_completed,
            RankMetric::Streak => self.streak,
        }
    }

    pub fn summary(&self) -> StatsSummary {
        StatsSummary {
            drops: self.drops,
            lessons_completed: self.lessons_completed,
            streak: self.streak,
        }
    }
}

/// Largest magnitude accepted for a single counter change.
pub const MAX_COUNTER_DELTA: i64 = 1_000_000;

/// Counter increments applied atomically to a `LeaderboardStat`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsDelta {
    pub drops: i64,
    pub lessons: i64,
    pub streak: i64,
}

impl StatsDelta {
    pub fn drops(drops: i64) -> Self {
        Self {
            drops,
            ..Default::default()
        }
    }

    pub fn within_bounds(&self) -> bool {
        [self.drops, self.lessons, self.streak]
            .iter()
            .all(|v| v.unsigned_abs() <= MAX_COUNTER_DELTA.unsigned_abs())
    }
}

/// Counter subset returned to the stat's owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "camelCase")]
pub struct StatsSummary {
    pub drops: i64,
    pub lessons_completed: i64,
    pub streak: i64,
}

/// Field the leaderboard is sorted by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RankMetric {
    #[default]
    Drops,
    Lessons,
    Streak,
}

impl RankMetric {
    /// Parse the `by` query value. Anything unrecognized ranks by drops.
    pub fn from_query(by: Option<&str>) -> Self {
        match by {
            Some("lessons") => RankMetric::Lessons,
            Some("streak") => RankMetric::Streak,
            _ => RankMetric::Drops,
        }
    }

    /// Stored field name of the sort key.
    pub fn field(self) -> &'static str {
        match self {
            RankMetric::Drops => "drops",
            RankMetric::Lessons => "lessonsCompleted",
            RankMetric::Streak => "streak",
        }
    }
}

/// A ranked leaderboard row. `rank` is 1-based within the returned page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "camelCase")]
pub struct RankEntry {
    pub user_id: String,
    pub name: String,
    pub avatar: Option<String>,
    pub drops: i64,
    pub lessons_completed: i64,
    pub streak: i64,
    pub rank: u32,
}

/// Ordering used by every leaderboard read: metric descending, then most
/// recently updated first.
pub fn compare_for_rank(
    a: &LeaderboardStat,
    b: &LeaderboardStat,
    metric: RankMetric,
) -> Ordering {
    b.metric_value(metric)
        .cmp(&a.metric_value(metric))
        .then_with(|| b.updated_at.cmp(&a.updated_at))
}

/// Sort and truncate in memory.
pub fn top_stats(
    mut stats: Vec<LeaderboardStat>,
    metric: RankMetric,
    limit: usize,
) -> Vec<LeaderboardStat> {
    stats.sort_by(|a, b| compare_for_rank(a, b, metric));
    stats.truncate(limit);
    stats
}

/// Number an already ordered page of stats starting at 1.
pub fn assign_ranks(stats: Vec<LeaderboardStat>) -> Vec<RankEntry> {
    stats
        .into_iter()
        .zip(1u32..)
        .map(|(s, rank)| RankEntry {
            user_id: s.user_id,
            name: s.name,
            avatar: s.avatar,
            drops: s.drops,
            lessons_completed: s.lessons_completed,
            streak: s.streak,
            rank,
        })
        .collect()
}

/// Record of a leaderboard award that could not be applied after an
/// approval was committed.
///
/// Stored at: `award_reconciliations/{submission_id}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AwardReconciliation {
    pub submission_id: String,
    pub user_id: String,
    pub user_name: String,
    pub drops: i64,
    pub attempts: u32,
    pub last_error: String,
    #[serde(with = "crate::time_utils::rfc3339_millis")]
    pub created_at: DateTime<Utc>,
}
