// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Task submission model and its verification state machine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::models::User;

/// Lifecycle state of a submission.
///
/// `Submitted` is the only non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "lowercase")]
pub enum SubmissionStatus {
    #[default]
    Submitted,
    Approved,
    Rejected,
}

impl SubmissionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            SubmissionStatus::Submitted => "submitted",
            SubmissionStatus::Approved => "approved",
            SubmissionStatus::Rejected => "rejected",
        }
    }

    pub fn is_terminal(self) -> bool {
        !matches!(self, SubmissionStatus::Submitted)
    }
}

impl fmt::Display for SubmissionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SubmissionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "submitted" => Ok(SubmissionStatus::Submitted),
            "approved" => Ok(SubmissionStatus::Approved),
            "rejected" => Ok(SubmissionStatus::Rejected),
            other => Err(format!("unknown submission status '{}'", other)),
        }
    }
}

/// Proof-of-completion record for a challenge.
///
/// Stored at: `task_submissions/{id}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "camelCase")]
pub struct TaskSubmission {
    pub id: String,
    pub user_id: String,
    /// Snapshot of the user's display name at submission time (never resynced)
    pub user_name: String,
    pub challenge_id: String,
    /// Snapshot of the challenge title at submission time
    #[serde(default)]
    pub challenge_title: String,
    #[serde(default)]
    pub filename: String,
    #[serde(default)]
    pub file_url: Option<String>,
    #[serde(default)]
    pub status: SubmissionStatus,
    #[serde(default)]
    pub drops_awarded: i64,
    #[serde(with = "crate::time_utils::rfc3339_millis")]
    #[cfg_attr(feature = "binding-generation", ts(type = "string"))]
    pub created_at: DateTime<Utc>,
    #[serde(with = "crate::time_utils::rfc3339_millis")]
    #[cfg_attr(feature = "binding-generation", ts(type = "string"))]
    pub updated_at: DateTime<Utc>,
}

/// Fields supplied by the caller when creating a submission.
#[derive(Debug, Clone, Default)]
pub struct NewSubmission {
    pub challenge_id: String,
    pub challenge_title: Option<String>,
    pub filename: Option<String>,
    pub file_url: Option<String>,
}

/// An admin decision on a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Approve { drops: i64 },
    Reject,
}

impl Verdict {
    pub fn from_request(approve: bool, drops_award: i64) -> Self {
        if approve {
            Verdict::Approve { drops: drops_award }
        } else {
            Verdict::Reject
        }
    }
}

/// Result of applying a verdict in the store.
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    /// The submission moved out of `submitted`.
    Applied(TaskSubmission),
    /// The submission was already terminal and was left untouched.
    AlreadyFinal(TaskSubmission),
}

impl TaskSubmission {
    /// Build a fresh `submitted` record, denormalizing the user's name.
    pub fn new(user: &User, new: NewSubmission, now: DateTime<Utc>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user.id.clone(),
            user_name: user.name.clone(),
            challenge_id: new.challenge_id,
            challenge_title: new.challenge_title.unwrap_or_default(),
            filename: new.filename.unwrap_or_default(),
            file_url: new.file_url,
            status: SubmissionStatus::Submitted,
            drops_awarded: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Apply a verdict in memory.
    ///
    /// Returns `false` (and leaves the record unchanged) if the submission is
    /// already terminal.
    pub fn apply_verdict(&mut self, verdict: Verdict, now: DateTime<Utc>) -> bool {
        if self.status.is_terminal() {
            return false;
        }

        match verdict {
            Verdict::Approve { drops } => {
                self.status = SubmissionStatus::Approved;
                self.drops_awarded = drops;
            }
            Verdict::Reject => {
                self.status = SubmissionStatus::Rejected;
            }
        }
        self.updated_at = now;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;

    fn make_submission() -> TaskSubmission {
        let user = User {
            id: "u1".to_string(),
            name: "Ada".to_string(),
            role: Role::User,
            avatar: None,
        };
        TaskSubmission::new(
            &user,
            NewSubmission {
                challenge_id: "compost-101".to_string(),
                ..Default::default()
            },
            Utc::now(),
        )
    }

    #[test]
    fn test_new_submission_defaults() {
        let submission = make_submission();

        assert_eq!(submission.status, SubmissionStatus::Submitted);
        assert_eq!(submission.drops_awarded, 0);
        assert_eq!(submission.user_name, "Ada");
        assert_eq!(submission.challenge_title, "");
        assert_eq!(submission.filename, "");
        assert!(submission.file_url.is_none());
    }

    #[test]
    fn test_approve_sets_award() {
        let mut submission = make_submission();

        assert!(submission.apply_verdict(Verdict::Approve { drops: 25 }, Utc::now()));
        assert_eq!(submission.status, SubmissionStatus::Approved);
        assert_eq!(submission.drops_awarded, 25);
    }

    #[test]
    fn test_reject_keeps_zero_award() {
        let mut submission = make_submission();

        assert!(submission.apply_verdict(Verdict::Reject, Utc::now()));
        assert_eq!(submission.status, SubmissionStatus::Rejected);
        assert_eq!(submission.drops_awarded, 0);
    }

    #[test]
    fn test_terminal_states_are_final() {
        let mut approved = make_submission();
        approved.apply_verdict(Verdict::Approve { drops: 10 }, Utc::now());
        let snapshot = approved.clone();

        assert!(!approved.apply_verdict(Verdict::Reject, Utc::now()));
        assert!(!approved.apply_verdict(Verdict::Approve { drops: 99 }, Utc::now()));
        assert_eq!(approved, snapshot);

        let mut rejected = make_submission();
        rejected.apply_verdict(Verdict::Reject, Utc::now());
        assert!(!rejected.apply_verdict(Verdict::Approve { drops: 10 }, Utc::now()));
        assert_eq!(rejected.status, SubmissionStatus::Rejected);
    }

    #[test]
    fn test_status_wire_format() {
        let json = serde_json::to_string(&SubmissionStatus::Approved).unwrap();
        assert_eq!(json, "\"approved\"");
        assert_eq!(
            "rejected".parse::<SubmissionStatus>().unwrap(),
            SubmissionStatus::Rejected
        );
        assert!("pending".parse::<SubmissionStatus>().is_err());
    }

    #[test]
    fn test_submission_serializes_camel_case() {
        let value = serde_json::to_value(make_submission()).unwrap();
        assert!(value.get("challengeId").is_some());
        assert!(value.get("dropsAwarded").is_some());
        assert!(value.get("createdAt").unwrap().as_str().unwrap().ends_with('Z'));
    }
}
