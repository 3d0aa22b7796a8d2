// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Submission routes (authenticated).

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::{NewSubmission, SubmissionStatus, TaskSubmission};
use crate::services::submission::UploadedFile;
use crate::AppState;
use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Multipart, Path, Query, State,
    },
    http::StatusCode,
    routing::{get, post},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Submission routes (require authentication via JWT).
/// The auth middleware is applied in routes/mod.rs for these routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/api/submissions",
            get(list_by_status).post(create_submission),
        )
        .route("/api/submissions/upload", post(upload_submission))
        .route("/api/submissions/mine", get(list_mine))
        .route("/api/submissions/{id}/verify", post(verify_submission))
        .route("/api/challenges/{id}/submit", post(submit_for_challenge))
        .route("/api/challenges/{id}/upload", post(upload_for_challenge))
}

/// Single submission response.
#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct SubmissionResponse {
    pub submission: TaskSubmission,
}

/// Submission list response.
#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct SubmissionsResponse {
    pub submissions: Vec<TaskSubmission>,
}

// ─── Create ──────────────────────────────────────────────────

#[derive(Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
struct CreateSubmissionRequest {
    #[serde(default)]
    #[validate(length(min = 1, max = 200, message = "challengeId is required"))]
    challenge_id: String,
    #[validate(length(max = 200))]
    challenge_title: Option<String>,
    #[validate(length(max = 255))]
    filename: Option<String>,
}

/// Metadata-only submission; the challenge id is in the path.
#[derive(Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
struct ChallengeSubmitRequest {
    #[validate(length(max = 200))]
    challenge_title: Option<String>,
    #[validate(length(max = 255))]
    filename: Option<String>,
}

/// Submit proof for a challenge (metadata only).
async fn create_submission(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(body): Json<CreateSubmissionRequest>,
) -> Result<(StatusCode, Json<SubmissionResponse>)> {
    body.validate()?;

    let submission = state
        .submission_service
        .create(
            &user.user_id,
            NewSubmission {
                challenge_id: body.challenge_id,
                challenge_title: body.challenge_title,
                filename: body.filename,
                file_url: None,
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(SubmissionResponse { submission })))
}

async fn submit_for_challenge(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(challenge_id): Path<String>,
    Json(body): Json<ChallengeSubmitRequest>,
) -> Result<(StatusCode, Json<SubmissionResponse>)> {
    body.validate()?;

    let submission = state
        .submission_service
        .create(
            &user.user_id,
            NewSubmission {
                challenge_id,
                challenge_title: body.challenge_title,
                filename: body.filename,
                file_url: None,
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(SubmissionResponse { submission })))
}

// ─── Upload ──────────────────────────────────────────────────

/// Fields read from a multipart upload form.
#[derive(Default)]
struct UploadForm {
    challenge_id: Option<String>,
    challenge_title: Option<String>,
    file: Option<UploadedFile>,
}

fn malformed(err: axum::extract::multipart::MultipartError) -> AppError {
    AppError::BadRequest(format!("Malformed upload: {}", err.body_text()))
}

async fn read_upload_form(mut multipart: Multipart) -> Result<UploadForm> {
    let mut form = UploadForm::default();

    while let Some(field) = multipart.next_field().await.map_err(malformed)? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("file") => {
                let filename = field
                    .file_name()
                    .map(str::to_string)
                    .unwrap_or_else(|| "upload".to_string());
                let bytes = field.bytes().await.map_err(malformed)?;
                form.file = Some(UploadedFile {
                    filename,
                    bytes: bytes.to_vec(),
                });
            }
            Some("challengeId") => {
                form.challenge_id = Some(field.text().await.map_err(malformed)?)
            }
            Some("challengeTitle") => {
                form.challenge_title = Some(field.text().await.map_err(malformed)?)
            }
            other => tracing::debug!(field = ?other, "Ignoring unknown upload field"),
        }
    }

    Ok(form)
}

/// Upload a proof file and create a submission for it.
async fn upload_submission(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<SubmissionResponse>)> {
    let form = read_upload_form(multipart).await?;
    let challenge_id = form.challenge_id.unwrap_or_default();

    let submission = state
        .submission_service
        .create_with_upload(&user.user_id, &challenge_id, form.file, form.challenge_title)
        .await?;

    Ok((StatusCode::CREATED, Json(SubmissionResponse { submission })))
}

async fn upload_for_challenge(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(challenge_id): Path<String>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<SubmissionResponse>)> {
    let form = read_upload_form(multipart).await?;

    let submission = state
        .submission_service
        .create_with_upload(&user.user_id, &challenge_id, form.file, form.challenge_title)
        .await?;

    Ok((StatusCode::CREATED, Json(SubmissionResponse { submission })))
}

// ─── Listing ─────────────────────────────────────────────────

/// Get the caller's own submissions, newest first.
async fn list_mine(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<SubmissionsResponse>> {
    let submissions = state
        .submission_service
        .list_for_user(&user.user_id)
        .await?;

    Ok(Json(SubmissionsResponse { submissions }))
}

#[derive(Deserialize)]
struct ListQuery {
    /// `submitted` (default), `approved` or `rejected`
    status: Option<String>,
    limit: Option<u32>,
}

/// List submissions by status (admin only).
async fn list_by_status(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    params: std::result::Result<Query<ListQuery>, QueryRejection>,
) -> Result<Json<SubmissionsResponse>> {
    user.require_admin()?;
    let Query(params) = params.map_err(|e| AppError::BadRequest(e.body_text()))?;

    let status = match params.status.as_deref() {
        None | Some("") => SubmissionStatus::Submitted,
        Some(raw) => raw.parse().map_err(AppError::BadRequest)?,
    };
    let limit = params.limit.unwrap_or(0);

    let submissions = state
        .submission_service
        .list_by_status(&user, status, limit)
        .await?;

    Ok(Json(SubmissionsResponse { submissions }))
}

// ─── Verification ────────────────────────────────────────────

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct VerifyRequest {
    approve: bool,
    #[serde(default)]
    drops_award: i64,
}

/// Approve or reject a submission (admin only).
async fn verify_submission(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
    body: std::result::Result<Json<VerifyRequest>, JsonRejection>,
) -> Result<Json<SubmissionResponse>> {
    // Admin check precedes body validation
    user.require_admin()?;
    let Json(body) = body.map_err(|e| AppError::BadRequest(e.body_text()))?;

    let submission = state
        .submission_service
        .verify(&user, &id, body.approve, body.drops_award)
        .await?;

    Ok(Json(SubmissionResponse { submission }))
}
