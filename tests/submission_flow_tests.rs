// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! End-to-end submission workflow over the HTTP API.

use axum::http::{header, StatusCode};
use garden_drops::db::{LeaderboardStore, SubmissionStore};
use garden_drops::models::{Role, SubmissionStatus};
use serde_json::json;
use std::sync::Arc;

mod common;
use common::{
    body_json, create_test_app, create_test_app_with_blobs, get_request, json_request,
    multipart_request, seed_user, FailingBlobStore, MemoryBlobStore, TestApp,
};

async fn app_with_users() -> (TestApp, String, String) {
    let app = create_test_app();
    seed_user(app.db.as_ref(), "learner", "Lena", Role::User).await;
    seed_user(app.db.as_ref(), "admin", "Ari", Role::Admin).await;
    let user_token = app.token("learner", Role::User);
    let admin_token = app.token("admin", Role::Admin);
    (app, user_token, admin_token)
}

async fn submit(app: &TestApp, token: &str, challenge_id: &str) -> serde_json::Value {
    let response = app
        .send(json_request(
            "POST",
            "/api/submissions",
            token,
            json!({ "challengeId": challenge_id, "challengeTitle": "Plant a tree" }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    body_json(response).await["submission"].clone()
}

#[tokio::test]
async fn test_create_submission() {
    let (app, token, _) = app_with_users().await;

    let submission = submit(&app, &token, "c1").await;

    assert_eq!(submission["status"], "submitted");
    assert_eq!(submission["userId"], "learner");
    assert_eq!(submission["userName"], "Lena");
    assert_eq!(submission["challengeId"], "c1");
    assert_eq!(submission["challengeTitle"], "Plant a tree");
    assert_eq!(submission["dropsAwarded"], 0);
    assert!(submission["fileUrl"].is_null());
    assert!(submission["createdAt"].as_str().unwrap().ends_with('Z'));

    // No leaderboard effect until approval
    assert!(app.db.get_stat("learner").await.unwrap().is_none());
}

#[tokio::test]
async fn test_create_submission_requires_challenge_id() {
    let (app, token, _) = app_with_users().await;

    let response = app
        .send(json_request("POST", "/api/submissions", &token, json!({})))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .send(json_request(
            "POST",
            "/api/submissions",
            &token,
            json!({ "challengeId": "   " }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_create_submission_unknown_user() {
    let (app, _, _) = app_with_users().await;
    let ghost = app.token("ghost", Role::User);

    let response = app
        .send(json_request(
            "POST",
            "/api/submissions",
            &ghost,
            json!({ "challengeId": "c1" }),
        ))
        .await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_submit_for_challenge_path() {
    let (app, token, _) = app_with_users().await;

    let response = app
        .send(json_request(
            "POST",
            "/api/challenges/c7/submit",
            &token,
            json!({ "challengeTitle": "Compost" }),
        ))
        .await;

    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    assert_eq!(body["submission"]["challengeId"], "c7");
    assert_eq!(body["submission"]["challengeTitle"], "Compost");
}

#[tokio::test]
async fn test_list_mine_newest_first() {
    let (app, token, _) = app_with_users().await;

    let first = submit(&app, &token, "c1").await;
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    let second = submit(&app, &token, "c2").await;

    let response = app.send(get_request("/api/submissions/mine", &token)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let list = body["submissions"].as_array().unwrap();

    assert_eq!(list.len(), 2);
    assert_eq!(list[0]["id"], second["id"]);
    assert_eq!(list[1]["id"], first["id"]);
}

#[tokio::test]
async fn test_duplicate_submissions_allowed() {
    let (app, token, _) = app_with_users().await;

    let a = submit(&app, &token, "c1").await;
    let b = submit(&app, &token, "c1").await;

    assert_ne!(a["id"], b["id"]);
    assert_eq!(
        app.db.list_submissions_for_user("learner").await.unwrap().len(),
        2
    );
}

#[tokio::test]
async fn test_admin_lists_pending() {
    let (app, token, admin) = app_with_users().await;
    submit(&app, &token, "c1").await;
    submit(&app, &token, "c2").await;

    let response = app.send(get_request("/api/submissions", &admin)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["submissions"].as_array().unwrap().len(), 2);

    let response = app
        .send(get_request("/api/submissions?status=approved", &admin))
        .await;
    let body = body_json(response).await;
    assert!(body["submissions"].as_array().unwrap().is_empty());

    let response = app
        .send(get_request("/api/submissions?status=submitted&limit=1", &admin))
        .await;
    let body = body_json(response).await;
    assert_eq!(body["submissions"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_list_by_status_rejects_unknown_status() {
    let (app, _, admin) = app_with_users().await;

    let response = app
        .send(get_request("/api/submissions?status=pending", &admin))
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_non_admin_cannot_list_or_verify() {
    let (app, token, _) = app_with_users().await;
    let submission = submit(&app, &token, "c1").await;
    let id = submission["id"].as_str().unwrap();

    let response = app.send(get_request("/api/submissions", &token)).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .send(json_request(
            "POST",
            &format!("/api/submissions/{}/verify", id),
            &token,
            json!({ "approve": true, "dropsAward": 50 }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let stored = app.db.get_submission(id).await.unwrap().unwrap();
    assert_eq!(stored.status, SubmissionStatus::Submitted);
}

#[tokio::test]
async fn test_approve_awards_drops() {
    let (app, token, admin) = app_with_users().await;
    let submission = submit(&app, &token, "c1").await;
    let id = submission["id"].as_str().unwrap();

    let response = app
        .send(json_request(
            "POST",
            &format!("/api/submissions/{}/verify", id),
            &admin,
            json!({ "approve": true, "dropsAward": 50 }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["submission"]["status"], "approved");
    assert_eq!(body["submission"]["dropsAwarded"], 50);

    let stat = app.db.get_stat("learner").await.unwrap().unwrap();
    assert_eq!(stat.drops, 50);
    assert_eq!(stat.name, "Lena");

    let response = app.send(get_request("/api/leaderboard/mine", &token)).await;
    let body = body_json(response).await;
    assert_eq!(body["stats"]["drops"], 50);
}

#[tokio::test]
async fn test_reject_leaves_leaderboard_untouched() {
    let (app, token, admin) = app_with_users().await;
    let submission = submit(&app, &token, "c1").await;
    let id = submission["id"].as_str().unwrap();

    let response = app
        .send(json_request(
            "POST",
            &format!("/api/submissions/{}/verify", id),
            &admin,
            json!({ "approve": false, "dropsAward": 50 }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["submission"]["status"], "rejected");
    assert_eq!(body["submission"]["dropsAwarded"], 0);

    assert!(app.db.get_stat("learner").await.unwrap().is_none());
}

#[tokio::test]
async fn test_zero_award_approval_creates_stat() {
    let (app, token, admin) = app_with_users().await;
    let submission = submit(&app, &token, "c1").await;
    let id = submission["id"].as_str().unwrap();

    let response = app
        .send(json_request(
            "POST",
            &format!("/api/submissions/{}/verify", id),
            &admin,
            json!({ "approve": true }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let stat = app.db.get_stat("learner").await.unwrap().unwrap();
    assert_eq!(stat.drops, 0);
}

#[tokio::test]
async fn test_reverify_conflicts_and_awards_once() {
    let (app, token, admin) = app_with_users().await;
    let submission = submit(&app, &token, "c1").await;
    let uri = format!("/api/submissions/{}/verify", submission["id"].as_str().unwrap());

    let response = app
        .send(json_request(
            "POST",
            &uri,
            &admin,
            json!({ "approve": true, "dropsAward": 50 }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    // Second approval with a different amount
    let response = app
        .send(json_request(
            "POST",
            &uri,
            &admin,
            json!({ "approve": true, "dropsAward": 80 }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body = body_json(response).await;
    assert_eq!(body["error"], "conflict");
    assert_eq!(body["submission"]["status"], "approved");
    assert_eq!(body["submission"]["dropsAwarded"], 50);

    // Rejecting after approval is refused too
    let response = app
        .send(json_request("POST", &uri, &admin, json!({ "approve": false })))
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let stat = app.db.get_stat("learner").await.unwrap().unwrap();
    assert_eq!(stat.drops, 50);
}

#[tokio::test]
async fn test_verify_unknown_submission() {
    let (app, _, admin) = app_with_users().await;

    let response = app
        .send(json_request(
            "POST",
            "/api/submissions/does-not-exist/verify",
            &admin,
            json!({ "approve": true, "dropsAward": 10 }),
        ))
        .await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_verify_negative_award_rejected() {
    let (app, token, admin) = app_with_users().await;
    let submission = submit(&app, &token, "c1").await;
    let id = submission["id"].as_str().unwrap();

    let response = app
        .send(json_request(
            "POST",
            &format!("/api/submissions/{}/verify", id),
            &admin,
            json!({ "approve": true, "dropsAward": -5 }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let stored = app.db.get_submission(id).await.unwrap().unwrap();
    assert_eq!(stored.status, SubmissionStatus::Submitted);
}

#[tokio::test]
async fn test_verify_oversized_award_rejected() {
    let (app, token, admin) = app_with_users().await;
    let submission = submit(&app, &token, "c1").await;
    let id = submission["id"].as_str().unwrap();

    for award in [1_000_001, i64::MAX] {
        let response = app
            .send(json_request(
                "POST",
                &format!("/api/submissions/{}/verify", id),
                &admin,
                json!({ "approve": true, "dropsAward": award }),
            ))
            .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    let stored = app.db.get_submission(id).await.unwrap().unwrap();
    assert_eq!(stored.status, SubmissionStatus::Submitted);
    assert!(app.db.get_stat("learner").await.unwrap().is_none());
}

#[tokio::test]
async fn test_non_admin_gets_forbidden_before_input_errors() {
    let (app, token, _) = app_with_users().await;
    let submission = submit(&app, &token, "c1").await;
    let id = submission["id"].as_str().unwrap();

    for uri in ["/api/submissions?status=bogus", "/api/submissions?limit=-1"] {
        let response = app.send(get_request(uri, &token)).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    let response = app
        .send(json_request(
            "POST",
            &format!("/api/submissions/{}/verify", id),
            &token,
            json!({ "approve": "yes" }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .send(
            axum::http::Request::builder()
                .method("POST")
                .uri(format!("/api/submissions/{}/verify", id))
                .header(header::AUTHORIZATION, format!("Bearer {}", token))
                .header(header::CONTENT_TYPE, "application/json")
                .body(axum::body::Body::from("{not json"))
                .unwrap(),
        )
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let stored = app.db.get_submission(id).await.unwrap().unwrap();
    assert_eq!(stored.status, SubmissionStatus::Submitted);
}

#[tokio::test]
async fn test_admin_malformed_verify_body_is_bad_request() {
    let (app, token, admin) = app_with_users().await;
    let submission = submit(&app, &token, "c1").await;
    let id = submission["id"].as_str().unwrap();

    let response = app
        .send(json_request(
            "POST",
            &format!("/api/submissions/{}/verify", id),
            &admin,
            json!({ "approve": "yes" }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// ─── Uploads ─────────────────────────────────────────────────

#[tokio::test]
async fn test_upload_creates_submission_with_file_url() {
    let blobs = Arc::new(MemoryBlobStore::default());
    let app = create_test_app_with_blobs(blobs.clone());
    seed_user(app.db.as_ref(), "learner", "Lena", Role::User).await;
    let token = app.token("learner", Role::User);

    let response = app
        .send(multipart_request(
            "/api/submissions/upload",
            &token,
            &[("challengeId", "c3"), ("challengeTitle", "Rain barrel")],
            Some(("proof.jpg", b"\xff\xd8\xff\xe0jpeg-bytes")),
        ))
        .await;

    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    assert_eq!(body["submission"]["challengeId"], "c3");
    assert_eq!(body["submission"]["filename"], "proof.jpg");
    assert!(body["submission"]["fileUrl"]
        .as_str()
        .unwrap()
        .starts_with("/uploads/"));

    let puts = blobs.puts.lock().unwrap();
    assert_eq!(puts.len(), 1);
    assert_eq!(puts[0].1, b"\xff\xd8\xff\xe0jpeg-bytes");
}

#[tokio::test]
async fn test_upload_via_challenge_path() {
    let (app, token, _) = app_with_users().await;

    let response = app
        .send(multipart_request(
            "/api/challenges/c9/upload",
            &token,
            &[],
            Some(("notes.pdf", b"%PDF-1.4")),
        ))
        .await;

    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    assert_eq!(body["submission"]["challengeId"], "c9");
}

#[tokio::test]
async fn test_upload_without_file() {
    let (app, token, _) = app_with_users().await;

    let response = app
        .send(multipart_request(
            "/api/submissions/upload",
            &token,
            &[("challengeId", "c3")],
            None,
        ))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .send(multipart_request(
            "/api/submissions/upload",
            &token,
            &[("challengeId", "c3")],
            Some(("empty.txt", b"")),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    assert!(app
        .db
        .list_submissions_for_user("learner")
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_upload_failure_creates_no_submission() {
    let app = create_test_app_with_blobs(Arc::new(FailingBlobStore));
    seed_user(app.db.as_ref(), "learner", "Lena", Role::User).await;
    let token = app.token("learner", Role::User);

    let response = app
        .send(multipart_request(
            "/api/submissions/upload",
            &token,
            &[("challengeId", "c3")],
            Some(("proof.jpg", b"bytes")),
        ))
        .await;

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let body = body_json(response).await;
    assert_eq!(body["error"], "upload_failed");

    assert!(app
        .db
        .list_submissions_for_user("learner")
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_upload_unknown_user_stores_nothing() {
    let blobs = Arc::new(MemoryBlobStore::default());
    let app = create_test_app_with_blobs(blobs.clone());
    let token = app.token("ghost", Role::User);

    let response = app
        .send(multipart_request(
            "/api/submissions/upload",
            &token,
            &[("challengeId", "c3")],
            Some(("proof.jpg", b"bytes")),
        ))
        .await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(blobs.puts.lock().unwrap().is_empty());
}
