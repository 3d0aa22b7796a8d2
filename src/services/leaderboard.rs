//! Leaderboard query service.
//!
//! Rankings are read straight from the per-user aggregates; the caller's
//! own record is created lazily on first read or first award.

use crate::db::{LeaderboardStore, UserStore};
use crate::error::{AppError, Result};
use crate::models::leaderboard::{assign_ranks, MAX_COUNTER_DELTA};
use crate::models::{LeaderboardStat, RankEntry, RankMetric, StatsDelta, User};
use std::sync::Arc;

/// Upper bound for a leaderboard page.
pub const MAX_RANK_LIMIT: u32 = 100;
/// Page size when the caller doesn't ask for one.
pub const DEFAULT_RANK_LIMIT: u32 = 50;

#[derive(Clone)]
pub struct LeaderboardService {
    users: Arc<dyn UserStore>,
    stats: Arc<dyn LeaderboardStore>,
}

impl LeaderboardService {
    pub fn new(users: Arc<dyn UserStore>, stats: Arc<dyn LeaderboardStore>) -> Self {
        Self { users, stats }
    }

    async fn resolve_user(&self, user_id: &str) -> Result<User> {
        self.users
            .get_user(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", user_id)))
    }

    /// Top entries by `metric`. A `limit` of 0 means the default page size.
    pub async fn rank(&self, metric: RankMetric, limit: u32) -> Result<Vec<RankEntry>> {
        let limit = match limit {
            0 => DEFAULT_RANK_LIMIT,
            n => n.min(MAX_RANK_LIMIT),
        };

        let stats = self.stats.top_stats(metric, limit).await?;
        Ok(assign_ranks(stats))
    }

    /// The caller's own stats, created with zero counters if absent.
    pub async fn get_or_create_for_user(&self, user_id: &str) -> Result<LeaderboardStat> {
        let user = self.resolve_user(user_id).await?;

        if let Some(stat) = self.stats.get_stat(user_id).await? {
            return Ok(stat);
        }

        let seed = LeaderboardStat::empty(&user.id, &user.name, user.avatar, chrono::Utc::now());
        let stat = self.stats.create_stat_if_absent(&seed).await?;
        tracing::info!(user_id, "Created leaderboard stats");
        Ok(stat)
    }

    /// Apply direct award increments to the caller's own stats.
    ///
    /// `drops` and `lessons` are earned tallies and may not be negative;
    /// `streak` may go down (e.g. when a streak is broken).
    pub async fn increment_for_user(
        &self,
        user_id: &str,
        delta: StatsDelta,
    ) -> Result<LeaderboardStat> {
        if delta.drops < 0 || delta.lessons < 0 {
            return Err(AppError::BadRequest(
                "drops and lessons increments must not be negative".to_string(),
            ));
        }
        if !delta.within_bounds() {
            return Err(AppError::BadRequest(format!(
                "increments must be within ±{}",
                MAX_COUNTER_DELTA
            )));
        }

        let user = self.resolve_user(user_id).await?;

        let stat = self
            .stats
            .increment_stat(&user.id, &user.name, user.avatar.as_deref(), delta)
            .await?;

        tracing::debug!(
            user_id,
            drops = delta.drops,
            lessons = delta.lessons,
            streak = delta.streak,
            total_drops = stat.drops,
            "Leaderboard stats incremented"
        );

        Ok(stat)
    }
}
