// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Garden Drops: challenge submissions and the water-drop leaderboard
//!
//! This crate provides the backend API through which learners submit proof
//! of completed challenges, admins verify them, and approved work is awarded
//! as drops on a shared leaderboard.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod seed;
pub mod services;
pub mod time_utils;

use config::Config;
use db::{LeaderboardStore, SubmissionStore, UserStore};
use services::{BlobStore, LeaderboardService, SubmissionService};
use std::sync::Arc;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub submission_service: SubmissionService,
    pub leaderboard_service: LeaderboardService,
}

impl AppState {
    /// Wire the services to one store backend and a blob store.
    pub fn new<S>(config: Config, store: Arc<S>, blobs: Arc<dyn BlobStore>) -> Self
    where
        S: UserStore + SubmissionStore + LeaderboardStore + 'static,
    {
        let users: Arc<dyn UserStore> = store.clone();
        let submissions: Arc<dyn SubmissionStore> = store.clone();
        let leaderboard: Arc<dyn LeaderboardStore> = store;

        Self {
            submission_service: SubmissionService::new(
                users.clone(),
                submissions,
                leaderboard.clone(),
                blobs,
                config.award_retry,
            ),
            leaderboard_service: LeaderboardService::new(users, leaderboard),
            config,
        }
    }
}
