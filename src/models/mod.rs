// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod leaderboard;
pub mod submission;
pub mod user;

pub use leaderboard::{
    AwardReconciliation, LeaderboardStat, RankEntry, RankMetric, StatsDelta, StatsSummary,
};
pub use submission::{NewSubmission, SubmissionStatus, TaskSubmission, Transition, Verdict};
pub use user::{Role, User};
