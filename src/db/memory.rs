// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-memory store for local development and tests.
//!
//! Every record lives in a `DashMap`. Mutations go through the map's entry
//! API, which holds the shard write lock for the duration of the closure, so
//! increments and state transitions on one record never interleave.

use crate::db::{LeaderboardStore, SubmissionStore, UserStore};
use crate::error::AppError;
use crate::models::leaderboard;
use crate::models::{
    AwardReconciliation, LeaderboardStat, RankMetric, StatsDelta, SubmissionStatus,
    TaskSubmission, Transition, User, Verdict,
};
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;

#[derive(Default)]
struct Collections {
    users: DashMap<String, User>,
    submissions: DashMap<String, TaskSubmission>,
    stats: DashMap<String, LeaderboardStat>,
    reconciliations: DashMap<String, AwardReconciliation>,
}

/// Process-local database. Clones share the same data.
#[derive(Clone, Default)]
pub struct MemoryDb {
    inner: Arc<Collections>,
}

impl MemoryDb {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pending award reconciliations, for inspection.
    pub fn reconciliations(&self) -> Vec<AwardReconciliation> {
        self.inner
            .reconciliations
            .iter()
            .map(|r| r.value().clone())
            .collect()
    }
}

fn newest_first(mut submissions: Vec<TaskSubmission>) -> Vec<TaskSubmission> {
    submissions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    submissions
}

#[async_trait]
impl UserStore for MemoryDb {
    async fn get_user(&self, user_id: &str) -> Result<Option<User>, AppError> {
        Ok(self.inner.users.get(user_id).map(|u| u.clone()))
    }

    async fn upsert_user(&self, user: &User) -> Result<(), AppError> {
        self.inner.users.insert(user.id.clone(), user.clone());
        Ok(())
    }
}

#[async_trait]
impl SubmissionStore for MemoryDb {
    async fn insert_submission(&self, submission: &TaskSubmission) -> Result<(), AppError> {
        self.inner
            .submissions
            .insert(submission.id.clone(), submission.clone());
        Ok(())
    }

    async fn get_submission(&self, id: &str) -> Result<Option<TaskSubmission>, AppError> {
        Ok(self.inner.submissions.get(id).map(|s| s.clone()))
    }

    async fn list_submissions_for_user(
        &self,
        user_id: &str,
    ) -> Result<Vec<TaskSubmission>, AppError> {
        let matching = self
            .inner
            .submissions
            .iter()
            .filter(|s| s.user_id == user_id)
            .map(|s| s.value().clone())
            .collect();
        Ok(newest_first(matching))
    }

    async fn list_submissions_by_status(
        &self,
        status: SubmissionStatus,
        limit: u32,
    ) -> Result<Vec<TaskSubmission>, AppError> {
        let matching = self
            .inner
            .submissions
            .iter()
            .filter(|s| s.status == status)
            .map(|s| s.value().clone())
            .collect();
        let mut submissions = newest_first(matching);
        submissions.truncate(limit as usize);
        Ok(submissions)
    }

    async fn transition_submission(
        &self,
        id: &str,
        verdict: Verdict,
    ) -> Result<Option<Transition>, AppError> {
        let Some(mut submission) = self.inner.submissions.get_mut(id) else {
            return Ok(None);
        };

        let transition = if submission.apply_verdict(verdict, chrono::Utc::now()) {
            Transition::Applied(submission.clone())
        } else {
            Transition::AlreadyFinal(submission.clone())
        };
        Ok(Some(transition))
    }
}

#[async_trait]
impl LeaderboardStore for MemoryDb {
    async fn get_stat(&self, user_id: &str) -> Result<Option<LeaderboardStat>, AppError> {
        Ok(self.inner.stats.get(user_id).map(|s| s.clone()))
    }

    async fn create_stat_if_absent(
        &self,
        seed: &LeaderboardStat,
    ) -> Result<LeaderboardStat, AppError> {
        let stat = self
            .inner
            .stats
            .entry(seed.user_id.clone())
            .or_insert_with(|| seed.clone());
        Ok(stat.clone())
    }

    async fn increment_stat(
        &self,
        user_id: &str,
        name: &str,
        avatar: Option<&str>,
        delta: StatsDelta,
    ) -> Result<LeaderboardStat, AppError> {
        let now = chrono::Utc::now();
        let mut stat = self
            .inner
            .stats
            .entry(user_id.to_string())
            .or_insert_with(|| LeaderboardStat::empty(user_id, name, None, now));

        if !stat.apply(&delta, now) {
            return Err(AppError::BadRequest(format!(
                "Stats increment for {} would overflow",
                user_id
            )));
        }
        stat.name = name.to_string();
        if let Some(avatar) = avatar {
            stat.avatar = Some(avatar.to_string());
        }
        Ok(stat.clone())
    }

    async fn top_stats(
        &self,
        metric: RankMetric,
        limit: u32,
    ) -> Result<Vec<LeaderboardStat>, AppError> {
        let all: Vec<LeaderboardStat> =
            self.inner.stats.iter().map(|s| s.value().clone()).collect();
        Ok(leaderboard::top_stats(all, metric, limit as usize))
    }

    async fn has_any_stats(&self) -> Result<bool, AppError> {
        Ok(!self.inner.stats.is_empty())
    }

    async fn record_reconciliation(&self, record: &AwardReconciliation) -> Result<(), AppError> {
        self.inner
            .reconciliations
            .insert(record.submission_id.clone(), record.clone());
        Ok(())
    }
}
