// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Submission service.
//!
//! Handles the verification workflow:
//! 1. Users submit proof for a challenge (optionally with an uploaded file)
//! 2. Admins approve or reject each submission exactly once
//! 3. Approval awards drops on the user's leaderboard stats
//!
//! The approval write and the leaderboard increment are separate store
//! writes. The approval is authoritative: a failed increment is retried and,
//! if it keeps failing, recorded for reconciliation. It is never rolled back.

use crate::config::AwardRetryPolicy;
use crate::db::{LeaderboardStore, SubmissionStore, UserStore};
use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::leaderboard::MAX_COUNTER_DELTA;
use crate::models::{
    AwardReconciliation, NewSubmission, StatsDelta, SubmissionStatus, TaskSubmission,
    Transition, User, Verdict,
};
use crate::services::blob::{BlobError, BlobStore};
use std::sync::Arc;

/// Upper bound for admin listings.
pub const MAX_LIST_LIMIT: u32 = 200;

/// A file received from the client.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// Creates, lists and verifies task submissions.
#[derive(Clone)]
pub struct SubmissionService {
    users: Arc<dyn UserStore>,
    submissions: Arc<dyn SubmissionStore>,
    leaderboard: Arc<dyn LeaderboardStore>,
    blobs: Arc<dyn BlobStore>,
    award_retry: AwardRetryPolicy,
}

impl SubmissionService {
    pub fn new(
        users: Arc<dyn UserStore>,
        submissions: Arc<dyn SubmissionStore>,
        leaderboard: Arc<dyn LeaderboardStore>,
        blobs: Arc<dyn BlobStore>,
        award_retry: AwardRetryPolicy,
    ) -> Self {
        Self {
            users,
            submissions,
            leaderboard,
            blobs,
            award_retry,
        }
    }

    async fn resolve_user(&self, user_id: &str) -> Result<User> {
        self.users
            .get_user(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", user_id)))
    }

    /// Create a `submitted` record. No leaderboard effect.
    pub async fn create(&self, user_id: &str, new: NewSubmission) -> Result<TaskSubmission> {
        let challenge_id = new.challenge_id.trim();
        if challenge_id.is_empty() {
            return Err(AppError::BadRequest("challengeId is required".to_string()));
        }
        let new = NewSubmission {
            challenge_id: challenge_id.to_string(),
            ..new
        };

        let user = self.resolve_user(user_id).await?;
        let submission = TaskSubmission::new(&user, new, chrono::Utc::now());
        self.submissions.insert_submission(&submission).await?;

        tracing::info!(
            submission_id = %submission.id,
            user_id,
            challenge_id = %submission.challenge_id,
            has_file = submission.file_url.is_some(),
            "Submission created"
        );

        Ok(submission)
    }

    /// Store the file, then create the submission pointing at it.
    ///
    /// If the blob write fails nothing is inserted.
    pub async fn create_with_upload(
        &self,
        user_id: &str,
        challenge_id: &str,
        file: Option<UploadedFile>,
        challenge_title: Option<String>,
    ) -> Result<TaskSubmission> {
        if challenge_id.trim().is_empty() {
            return Err(AppError::BadRequest("challengeId is required".to_string()));
        }

        // Resolve first so an unknown user never leaves a stray blob behind
        self.resolve_user(user_id).await?;

        let file = file
            .filter(|f| !f.bytes.is_empty())
            .ok_or_else(|| AppError::BadRequest("No file uploaded".to_string()))?;

        let blob = self
            .blobs
            .put(&file.filename, &file.bytes)
            .await
            .map_err(|e| match e {
                BlobError::Empty => AppError::BadRequest("Uploaded file is empty".to_string()),
                other => AppError::UploadFailed(other.to_string()),
            })?;

        self.create(
            user_id,
            NewSubmission {
                challenge_id: challenge_id.to_string(),
                challenge_title,
                filename: Some(file.filename),
                file_url: Some(blob.url),
            },
        )
        .await
    }

    /// A user's own submissions, newest first.
    pub async fn list_for_user(&self, user_id: &str) -> Result<Vec<TaskSubmission>> {
        self.submissions.list_submissions_for_user(user_id).await
    }

    /// Submissions in a state, newest first (admin only).
    ///
    /// A `limit` of 0 means the maximum page size.
    pub async fn list_by_status(
        &self,
        caller: &AuthUser,
        status: SubmissionStatus,
        limit: u32,
    ) -> Result<Vec<TaskSubmission>> {
        caller.require_admin()?;
        let limit = match limit {
            0 => MAX_LIST_LIMIT,
            n => n.min(MAX_LIST_LIMIT),
        };
        self.submissions
            .list_submissions_by_status(status, limit)
            .await
    }

    /// Approve or reject a submission (admin only).
    ///
    /// Only a `submitted` record can be verified; anything else is a
    /// `Conflict` carrying the unchanged record.
    pub async fn verify(
        &self,
        caller: &AuthUser,
        submission_id: &str,
        approve: bool,
        drops_award: i64,
    ) -> Result<TaskSubmission> {
        caller.require_admin()?;

        if !(0..=MAX_COUNTER_DELTA).contains(&drops_award) {
            return Err(AppError::BadRequest(format!(
                "dropsAward must be between 0 and {}",
                MAX_COUNTER_DELTA
            )));
        }

        let verdict = Verdict::from_request(approve, drops_award);
        let transition = self
            .submissions
            .transition_submission(submission_id, verdict)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("Submission {} not found", submission_id))
            })?;

        let submission = match transition {
            Transition::Applied(submission) => submission,
            Transition::AlreadyFinal(submission) => {
                tracing::warn!(
                    submission_id,
                    admin_id = %caller.user_id,
                    status = %submission.status,
                    "Rejected re-verification of terminal submission"
                );
                return Err(AppError::Conflict(Box::new(submission)));
            }
        };

        tracing::info!(
            submission_id,
            admin_id = %caller.user_id,
            user_id = %submission.user_id,
            status = %submission.status,
            drops_awarded = submission.drops_awarded,
            "Submission verified"
        );

        if submission.status == SubmissionStatus::Approved {
            self.award_drops(&submission).await;
        }

        Ok(submission)
    }

    /// Apply an approved submission's award with bounded retries.
    ///
    /// Failures are logged and recorded, never returned: the approval has
    /// already been committed.
    async fn award_drops(&self, submission: &TaskSubmission) {
        let delta = StatsDelta::drops(submission.drops_awarded);
        let mut last_error = String::new();

        for attempt in 1..=self.award_retry.attempts {
            match self
                .leaderboard
                .increment_stat(&submission.user_id, &submission.user_name, None, delta)
                .await
            {
                Ok(stat) => {
                    tracing::debug!(
                        submission_id = %submission.id,
                        user_id = %submission.user_id,
                        drops = stat.drops,
                        attempt,
                        "Drops awarded"
                    );
                    return;
                }
                Err(e) => {
                    tracing::warn!(
                        submission_id = %submission.id,
                        user_id = %submission.user_id,
                        attempt,
                        error = %e,
                        "Leaderboard award failed"
                    );
                    last_error = e.to_string();
                }
            }

            if attempt < self.award_retry.attempts {
                tokio::time::sleep(self.award_retry.delay_for(attempt)).await;
            }
        }

        let record = AwardReconciliation {
            submission_id: submission.id.clone(),
            user_id: submission.user_id.clone(),
            user_name: submission.user_name.clone(),
            drops: submission.drops_awarded,
            attempts: self.award_retry.attempts,
            last_error,
            created_at: chrono::Utc::now(),
        };

        tracing::error!(
            submission_id = %record.submission_id,
            user_id = %record.user_id,
            drops = record.drops,
            attempts = record.attempts,
            last_error = %record.last_error,
            "Award needs reconciliation: submission approved but drops not applied"
        );

        if let Err(e) = self.leaderboard.record_reconciliation(&record).await {
            tracing::error!(
                submission_id = %record.submission_id,
                error = %e,
                "Failed to persist reconciliation record"
            );
        }
    }
}
