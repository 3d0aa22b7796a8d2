// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Optional demo data for an empty leaderboard.
//!
//! Not part of any request path: `main` calls this at startup only when
//! `SEED_DEMO_LEADERBOARD` is set.

use crate::db::LeaderboardStore;
use crate::error::AppError;
use crate::models::StatsDelta;
use futures_util::{stream, StreamExt};

const MAX_CONCURRENT_SEED_WRITES: usize = 5;

/// (name, drops, lessons completed, streak)
const DEMO_ROWS: [(&str, i64, i64, i64); 5] = [
    ("Alex Chen", 847, 89, 45),
    ("Sarah Johnson", 623, 76, 32),
    ("Mike Rodriguez", 589, 64, 28),
    ("Emma Wilson", 456, 52, 21),
    ("David Kim", 423, 47, 19),
];

/// Insert the demo rows if no leaderboard stats exist yet.
///
/// Returns the number of rows written (0 if the board already had data).
pub async fn ensure_demo_leaderboard(store: &dyn LeaderboardStore) -> Result<usize, AppError> {
    if store.has_any_stats().await? {
        tracing::debug!("Leaderboard already populated, skipping demo seed");
        return Ok(0);
    }

    let written = stream::iter(DEMO_ROWS.iter().enumerate())
        .map(|(i, &(name, drops, lessons, streak))| async move {
            let user_id = format!("demo-{}", i + 1);
            let delta = StatsDelta {
                drops,
                lessons,
                streak,
            };
            store.increment_stat(&user_id, name, None, delta).await
        })
        .buffer_unordered(MAX_CONCURRENT_SEED_WRITES)
        .collect::<Vec<_>>()
        .await
        .into_iter()
        .collect::<Result<Vec<_>, AppError>>()?
        .len();

    tracing::info!(rows = written, "Seeded demo leaderboard");
    Ok(written)
}
