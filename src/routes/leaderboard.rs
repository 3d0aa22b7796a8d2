// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Leaderboard routes.

use crate::error::Result;
use crate::middleware::auth::AuthUser;
use crate::models::{RankEntry, RankMetric, StatsDelta, StatsSummary};
use crate::AppState;
use axum::{
    extract::{Query, State},
    routing::get,
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Public ranking. Anyone may read the board.
pub fn public_routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/leaderboard", get(get_leaderboard))
}

/// The caller's own stats (require authentication).
pub fn protected_routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/leaderboard/mine", get(get_my_stats).post(increment_my_stats))
}

#[derive(Deserialize)]
struct RankQuery {
    /// `drops` (default), `lessons` or `streak`
    by: Option<String>,
    /// 0 or absent means the default page size
    limit: Option<u32>,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct LeaderboardResponse {
    pub entries: Vec<RankEntry>,
}

async fn get_leaderboard(
    State(state): State<Arc<AppState>>,
    Query(params): Query<RankQuery>,
) -> Result<Json<LeaderboardResponse>> {
    let metric = RankMetric::from_query(params.by.as_deref());
    let entries = state
        .leaderboard_service
        .rank(metric, params.limit.unwrap_or(0))
        .await?;

    Ok(Json(LeaderboardResponse { entries }))
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct MyStatsResponse {
    pub stats: StatsSummary,
}

/// Get (creating if needed) the caller's stats.
async fn get_my_stats(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<MyStatsResponse>> {
    let stat = state
        .leaderboard_service
        .get_or_create_for_user(&user.user_id)
        .await?;

    Ok(Json(MyStatsResponse {
        stats: stat.summary(),
    }))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct IncrementRequest {
    #[serde(default)]
    drops: i64,
    #[serde(default)]
    lessons: i64,
    #[serde(default)]
    streak_delta: i64,
}

/// Apply increments to the caller's stats.
async fn increment_my_stats(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(body): Json<IncrementRequest>,
) -> Result<Json<MyStatsResponse>> {
    let delta = StatsDelta {
        drops: body.drops,
        lessons: body.lessons,
        streak: body.streak_delta,
    };

    let stat = state
        .leaderboard_service
        .increment_for_user(&user.user_id, delta)
        .await?;

    Ok(Json(MyStatsResponse {
        stats: stat.summary(),
    }))
}
