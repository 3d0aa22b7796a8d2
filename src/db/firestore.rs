// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore client wrapper with typed operations.
//!
//! Provides high-level operations for:
//! - Users (read-only directory published by the identity provider)
//! - Task submissions (state transitions inside a transaction)
//! - Leaderboard stats (server-side `increment` transforms)
//! - Award reconciliations

use crate::db::{collections, LeaderboardStore, SubmissionStore, UserStore};
use crate::error::AppError;
use crate::models::{
    AwardReconciliation, LeaderboardStat, RankMetric, StatsDelta, SubmissionStatus,
    TaskSubmission, Transition, User, Verdict,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Non-counter fields written alongside a stats increment.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StatIdentity {
    user_id: String,
    name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    avatar: Option<String>,
    #[serde(with = "crate::time_utils::rfc3339_millis")]
    updated_at: chrono::DateTime<chrono::Utc>,
}

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: Option<firestore::FirestoreDb>,
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        // If the emulator environment variable is set, use unauthenticated connection
        // to avoid local credential warnings and leakage.
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id).await.map_err(|e| {
            AppError::StoreUnavailable(format!("Failed to connect to Firestore: {}", e))
        })?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, AppError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::StoreUnavailable(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a mock Firestore client for testing (offline mode).
    ///
    /// All database operations will return `StoreUnavailable` if called.
    pub fn new_mock() -> Self {
        Self { client: None }
    }

    /// Helper to get the client or return an error if offline.
    fn get_client(&self) -> Result<&firestore::FirestoreDb, AppError> {
        self.client.as_ref().ok_or_else(|| {
            AppError::StoreUnavailable("Database not connected (offline mode)".to_string())
        })
    }

    async fn query_submissions(
        &self,
        field: &'static str,
        value: String,
        limit: Option<u32>,
    ) -> Result<Vec<TaskSubmission>, AppError> {
        let query = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::TASK_SUBMISSIONS)
            .filter(move |q| q.for_all([q.field(field).eq(value.clone())]))
            .order_by([("createdAt", firestore::FirestoreQueryDirection::Descending)]);

        let query = match limit {
            Some(limit) => query.limit(limit),
            None => query,
        };

        query
            .obj()
            .query()
            .await
            .map_err(AppError::store)
    }
}

// ─── User Operations ─────────────────────────────────────────

#[async_trait]
impl UserStore for FirestoreDb {
    async fn get_user(&self, user_id: &str) -> Result<Option<User>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::USERS)
            .obj()
            .one(user_id)
            .await
            .map_err(AppError::store)
    }

    async fn upsert_user(&self, user: &User) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::USERS)
            .document_id(&user.id)
            .object(user)
            .execute()
            .await
            .map_err(AppError::store)?;
        Ok(())
    }
}

// ─── Submission Operations ───────────────────────────────────

#[async_trait]
impl SubmissionStore for FirestoreDb {
    async fn insert_submission(&self, submission: &TaskSubmission) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .insert()
            .into(collections::TASK_SUBMISSIONS)
            .document_id(&submission.id)
            .object(submission)
            .execute()
            .await
            .map_err(AppError::store)?;
        Ok(())
    }

    async fn get_submission(&self, id: &str) -> Result<Option<TaskSubmission>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::TASK_SUBMISSIONS)
            .obj()
            .one(id)
            .await
            .map_err(AppError::store)
    }

    async fn list_submissions_for_user(
        &self,
        user_id: &str,
    ) -> Result<Vec<TaskSubmission>, AppError> {
        self.query_submissions("userId", user_id.to_string(), None)
            .await
    }

    async fn list_submissions_by_status(
        &self,
        status: SubmissionStatus,
        limit: u32,
    ) -> Result<Vec<TaskSubmission>, AppError> {
        self.query_submissions("status", status.as_str().to_string(), Some(limit))
            .await
    }

    /// Apply a verdict inside a Firestore transaction.
    ///
    /// The submission is read through the transaction so a concurrent verify
    /// of the same document makes one of the two commits fail instead of
    /// both succeeding.
    async fn transition_submission(
        &self,
        id: &str,
        verdict: Verdict,
    ) -> Result<Option<Transition>, AppError> {
        let client = self.get_client()?;

        let mut transaction = client.begin_transaction().await.map_err(|e| {
            AppError::StoreUnavailable(format!("Failed to begin transaction: {}", e))
        })?;

        // Reads through this handle register the document with the transaction
        let tx_client = client.clone_with_consistency_selector(
            firestore::FirestoreConsistencySelector::Transaction(
                transaction.transaction_id().clone(),
            ),
        );

        let current: Option<TaskSubmission> = tx_client
            .fluent()
            .select()
            .by_id_in(collections::TASK_SUBMISSIONS)
            .obj()
            .one(id)
            .await
            .map_err(|e| {
                AppError::StoreUnavailable(format!(
                    "Failed to read submission in transaction: {}",
                    e
                ))
            })?;

        let Some(mut submission) = current else {
            let _ = transaction.rollback().await;
            return Ok(None);
        };

        if !submission.apply_verdict(verdict, chrono::Utc::now()) {
            tracing::debug!(
                submission_id = id,
                status = %submission.status,
                "Submission already verified (no write)"
            );
            let _ = transaction.rollback().await;
            return Ok(Some(Transition::AlreadyFinal(submission)));
        }

        client
            .fluent()
            .update()
            .fields(["status", "dropsAwarded", "updatedAt"])
            .in_col(collections::TASK_SUBMISSIONS)
            .document_id(id)
            .object(&submission)
            .add_to_transaction(&mut transaction)
            .map_err(|e| {
                AppError::StoreUnavailable(format!(
                    "Failed to add submission to transaction: {}",
                    e
                ))
            })?;

        transaction.commit().await.map_err(|e| {
            AppError::StoreUnavailable(format!("Transaction commit failed: {}", e))
        })?;

        tracing::info!(
            submission_id = id,
            status = %submission.status,
            drops_awarded = submission.drops_awarded,
            "Submission transitioned"
        );

        Ok(Some(Transition::Applied(submission)))
    }
}

// ─── Leaderboard Operations ──────────────────────────────────

#[async_trait]
impl LeaderboardStore for FirestoreDb {
    async fn get_stat(&self, user_id: &str) -> Result<Option<LeaderboardStat>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::LEADERBOARD_STATS)
            .obj()
            .one(user_id)
            .await
            .map_err(AppError::store)
    }

    /// Create-only insert; on conflict another request created the record
    /// first, so the stored one is returned instead.
    async fn create_stat_if_absent(
        &self,
        seed: &LeaderboardStat,
    ) -> Result<LeaderboardStat, AppError> {
        let inserted: Result<LeaderboardStat, _> = self
            .get_client()?
            .fluent()
            .insert()
            .into(collections::LEADERBOARD_STATS)
            .document_id(&seed.user_id)
            .object(seed)
            .execute()
            .await;

        match inserted {
            Ok(stat) => Ok(stat),
            Err(insert_err) => {
                tracing::debug!(
                    user_id = %seed.user_id,
                    error = %insert_err,
                    "Stat insert rejected, reading existing record"
                );
                self.get_stat(&seed.user_id)
                    .await?
                    .ok_or_else(|| AppError::store(insert_err))
            }
        }
    }

    /// Upsert-increment using Firestore field transforms.
    ///
    /// The increments are applied by the server against the latest stored
    /// value, so concurrent awards to the same user never overwrite each
    /// other. A missing document is created with the identity fields and the
    /// increments applied to zero.
    async fn increment_stat(
        &self,
        user_id: &str,
        name: &str,
        avatar: Option<&str>,
        delta: StatsDelta,
    ) -> Result<LeaderboardStat, AppError> {
        let client = self.get_client()?;

        let identity = StatIdentity {
            user_id: user_id.to_string(),
            name: name.to_string(),
            avatar: avatar.map(str::to_string),
            updated_at: chrono::Utc::now(),
        };
        let mut fields = vec!["userId", "name", "updatedAt"];
        if avatar.is_some() {
            fields.push("avatar");
        }

        let mut transaction = client.begin_transaction().await.map_err(|e| {
            AppError::StoreUnavailable(format!("Failed to begin transaction: {}", e))
        })?;

        client
            .fluent()
            .update()
            .fields(fields)
            .in_col(collections::LEADERBOARD_STATS)
            .document_id(user_id)
            .object(&identity)
            .transforms(|t| {
                t.fields([
                    t.field("drops").increment(delta.drops),
                    t.field("lessonsCompleted").increment(delta.lessons),
                    t.field("streak").increment(delta.streak),
                ])
            })
            .add_to_transaction(&mut transaction)
            .map_err(|e| {
                AppError::StoreUnavailable(format!("Failed to add increment to transaction: {}", e))
            })?;

        transaction.commit().await.map_err(|e| {
            AppError::StoreUnavailable(format!("Increment commit failed: {}", e))
        })?;

        self.get_stat(user_id).await?.ok_or_else(|| {
            AppError::StoreUnavailable(format!("Stats for {} missing after increment", user_id))
        })
    }

    async fn top_stats(
        &self,
        metric: RankMetric,
        limit: u32,
    ) -> Result<Vec<LeaderboardStat>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .from(collections::LEADERBOARD_STATS)
            .order_by([
                (metric.field(), firestore::FirestoreQueryDirection::Descending),
                ("updatedAt", firestore::FirestoreQueryDirection::Descending),
            ])
            .limit(limit)
            .obj()
            .query()
            .await
            .map_err(AppError::store)
    }

    async fn has_any_stats(&self) -> Result<bool, AppError> {
        let sample: Vec<LeaderboardStat> = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::LEADERBOARD_STATS)
            .limit(1)
            .obj()
            .query()
            .await
            .map_err(AppError::store)?;
        Ok(!sample.is_empty())
    }

    async fn record_reconciliation(&self, record: &AwardReconciliation) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::AWARD_RECONCILIATIONS)
            .document_id(&record.submission_id)
            .object(record)
            .execute()
            .await
            .map_err(AppError::store)?;
        Ok(())
    }
}
