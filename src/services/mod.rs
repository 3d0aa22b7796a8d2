// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod blob;
pub mod leaderboard;
pub mod submission;

pub use blob::{BlobError, BlobStore, LocalBlobStore, StoredBlob};
pub use leaderboard::LeaderboardService;
pub use submission::{SubmissionService, UploadedFile};
