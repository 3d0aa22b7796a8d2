//! Database layer.
//!
//! The services talk to persistence through three narrow traits. Two
//! backends implement all of them: Firestore for deployments and an
//! in-memory map for local runs and tests.

pub mod firestore;
pub mod memory;

pub use firestore::FirestoreDb;
pub use memory::MemoryDb;

use crate::error::AppError;
use crate::models::{
    AwardReconciliation, LeaderboardStat, RankMetric, StatsDelta, SubmissionStatus,
    TaskSubmission, Transition, User, Verdict,
};
use async_trait::async_trait;

/// Collection names as constants.
pub mod collections {
    pub const USERS: &str = "users";
    pub const TASK_SUBMISSIONS: &str = "task_submissions";
    /// Leaderboard aggregates (keyed by user_id)
    pub const LEADERBOARD_STATS: &str = "leaderboard_stats";
    /// Awards that could not be applied after approval (keyed by submission id)
    pub const AWARD_RECONCILIATIONS: &str = "award_reconciliations";
}

/// Read access to the identity provider's user directory.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn get_user(&self, user_id: &str) -> Result<Option<User>, AppError>;

    /// Create or replace a user. Used by fixtures; the identity provider
    /// owns these records in production.
    async fn upsert_user(&self, user: &User) -> Result<(), AppError>;
}

/// Durable `TaskSubmission` records.
#[async_trait]
pub trait SubmissionStore: Send + Sync {
    async fn insert_submission(&self, submission: &TaskSubmission) -> Result<(), AppError>;

    async fn get_submission(&self, id: &str) -> Result<Option<TaskSubmission>, AppError>;

    /// All submissions for a user, newest first.
    async fn list_submissions_for_user(
        &self,
        user_id: &str,
    ) -> Result<Vec<TaskSubmission>, AppError>;

    /// Submissions in a given state, newest first.
    async fn list_submissions_by_status(
        &self,
        status: SubmissionStatus,
        limit: u32,
    ) -> Result<Vec<TaskSubmission>, AppError>;

    /// Atomically apply a verdict if the submission is still `submitted`.
    ///
    /// Returns `None` if the submission does not exist. Concurrent callers
    /// observe exactly one `Transition::Applied`.
    async fn transition_submission(
        &self,
        id: &str,
        verdict: Verdict,
    ) -> Result<Option<Transition>, AppError>;
}

/// Per-user `LeaderboardStat` aggregates.
#[async_trait]
pub trait LeaderboardStore: Send + Sync {
    async fn get_stat(&self, user_id: &str) -> Result<Option<LeaderboardStat>, AppError>;

    /// Insert a zeroed record unless one already exists, returning whichever
    /// record is stored afterwards.
    async fn create_stat_if_absent(
        &self,
        seed: &LeaderboardStat,
    ) -> Result<LeaderboardStat, AppError>;

    /// Atomic upsert-increment of the counters.
    ///
    /// `name` (and `avatar`, when given) are written alongside the increment
    /// and seed the record if it does not exist yet.
    async fn increment_stat(
        &self,
        user_id: &str,
        name: &str,
        avatar: Option<&str>,
        delta: StatsDelta,
    ) -> Result<LeaderboardStat, AppError>;

    /// Top `limit` records ordered by `metric` descending, then most
    /// recently updated.
    async fn top_stats(
        &self,
        metric: RankMetric,
        limit: u32,
    ) -> Result<Vec<LeaderboardStat>, AppError>;

    async fn has_any_stats(&self) -> Result<bool, AppError>;

    async fn record_reconciliation(&self, record: &AwardReconciliation) -> Result<(), AppError>;
}
