//! E2E tests for the admin moderation and configuration endpoints

mod common;

use common::TestServer;
use serde_json::{Value, json};

async fn admin_get(server: &TestServer, token: &str, path: &str) -> Value {
    let response = server
        .client
        .get(server.url(path))
        .bearer_auth(token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200, "GET {} failed", path);
    response.json().await.unwrap()
}

#[tokio::test]
async fn test_admin_routes_reject_non_admins() {
    let server = TestServer::new().await;
    let (_id, student) = server.create_user("student", "student").await;

    for path in [
        "/api/admin/dashboard",
        "/api/admin/configurations",
        "/api/admin/logs",
        "/api/admin/photos/pending",
        "/api/admin/analysis",
    ] {
        let response = server
            .client
            .get(server.url(path))
            .bearer_auth(&student)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 403, "{} should be admin only", path);

        let response = server.client.get(server.url(path)).send().await.unwrap();
        assert_eq!(response.status(), 401, "{} should need a token", path);
    }
}

#[tokio::test]
async fn test_dashboard_counts() {
    let server = TestServer::new().await;
    let admin = server.admin_token().await;
    let (_id, owner) = server.create_user("shooter", "photographer").await;
    server.approved_photo(&owner, &admin, "Counted").await;
    server.upload_photo(&owner, "Also counted").await;

    let counts = admin_get(&server, &admin, "/api/admin/dashboard").await;
    assert_eq!(counts["total_users"], 2);
    assert_eq!(counts["total_photos"], 2);
    assert_eq!(counts["photos_this_month"], 2);
    assert_eq!(counts["total_competitions"], 0);
}

#[tokio::test]
async fn test_configurations_are_seeded_and_updatable() {
    let server = TestServer::new().await;
    let admin = server.admin_token().await;

    let list = admin_get(&server, &admin, "/api/admin/configurations").await;
    let keys: Vec<&str> = list["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|item| item["key"].as_str().unwrap())
        .collect();
    assert!(keys.contains(&"daily_upload_limit"));
    assert!(keys.contains(&"ranking_weights"));

    let response = server
        .client
        .put(server.url("/api/admin/configurations"))
        .bearer_auth(&admin)
        .json(&json!({"configurations": [{
            "key": "daily_upload_limit",
            "value": {"value": 1, "enabled": true}
        }]}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["updated"], json!(["daily_upload_limit"]));

    // The new limit applies to the next upload
    let (_id, owner) = server.create_user("shooter", "photographer").await;
    server.upload_photo(&owner, "First").await;
    let response = server.try_upload(&owner, "Second", "second.png").await;
    assert_eq!(response.status(), 429);

    let logs = admin_get(
        &server,
        &admin,
        "/api/admin/logs?action=update_configuration",
    )
    .await;
    assert_eq!(logs["total"], 1);
    assert_eq!(logs["items"][0]["resource_type"], "configuration");
}

#[tokio::test]
async fn test_configuration_update_rejects_bad_items() {
    let server = TestServer::new().await;
    let admin = server.admin_token().await;

    for body in [
        json!({"configurations": [{"key": "no_such_key", "value": {}}]}),
        json!({"configurations": [{"key": "ranking_weights", "value": 3}]}),
        json!({"configurations": [{
            "key": "ranking_weights",
            "value": {"like": -1.0, "view": 0.3, "favorite": 0.2, "vote": 0.1}
        }]}),
    ] {
        let response = server
            .client
            .put(server.url("/api/admin/configurations"))
            .bearer_auth(&admin)
            .json(&body)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 400, "{} should be rejected", body);
    }
}

#[tokio::test]
async fn test_bulk_review_skips_reviewed_photos() {
    let server = TestServer::new().await;
    let admin = server.admin_token().await;
    let (_id, owner) = server.create_user("shooter", "photographer").await;

    let first = server.upload_photo(&owner, "One").await["id"].as_i64().unwrap();
    let second = server.upload_photo(&owner, "Two").await["id"].as_i64().unwrap();
    let reviewed = server.approved_photo(&owner, &admin, "Done").await;

    let pending = admin_get(&server, &admin, "/api/admin/photos/pending").await;
    assert_eq!(pending["total"], 2);

    let response = server
        .client
        .post(server.url("/api/admin/bulk-actions/approve-photos"))
        .bearer_auth(&admin)
        .json(&json!({"photo_ids": [first, reviewed, 9999], "notes": "batch"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["processed"], json!([first]));
    assert_eq!(body["skipped"], json!([reviewed, 9999]));

    let response = server
        .client
        .post(server.url("/api/admin/bulk-actions/reject-photos"))
        .bearer_auth(&admin)
        .json(&json!({"photo_ids": [second]}))
        .send()
        .await
        .unwrap();
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["processed"], json!([second]));

    let response = server
        .client
        .post(server.url("/api/admin/bulk-actions/reject-photos"))
        .bearer_auth(&admin)
        .json(&json!({"photo_ids": []}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);

    let stats = admin_get(&server, &admin, "/api/admin/photos/approval-stats").await;
    assert_eq!(stats["total_pending"], 0);
    assert_eq!(stats["total_approved"], 2);
    assert_eq!(stats["total_rejected"], 1);
    assert_eq!(stats["today_approved"], 2);

    let logs = admin_get(&server, &admin, "/api/admin/logs?action=bulk_approve_photos").await;
    assert_eq!(logs["total"], 1);
}

#[tokio::test]
async fn test_admin_photo_listing_and_analysis_override() {
    let server = TestServer::new().await;
    let admin = server.admin_token().await;
    let (_id, owner) = server.create_user("shooter", "photographer").await;
    let approved = server.approved_photo(&owner, &admin, "Sunset over the lake").await;
    server.upload_photo(&owner, "Library").await;

    let listing = admin_get(&server, &admin, "/api/admin/photos?search=sunset").await;
    assert_eq!(listing["total"], 1);
    assert_eq!(listing["items"][0]["id"], approved);

    let listing = admin_get(&server, &admin, "/api/admin/photos?status_filter=pending").await;
    assert_eq!(listing["total"], 1);

    let response = server
        .client
        .get(server.url("/api/admin/photos?status_filter=lost"))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);

    let response = server
        .client
        .put(server.url(&format!("/api/admin/photos/{}/analysis", approved)))
        .bearer_auth(&admin)
        .json(&json!({"theme": "landscape", "confidence": 0.9}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let photo: Value = response.json().await.unwrap();
    assert_eq!(photo["theme"], "landscape");

    let report = admin_get(&server, &admin, "/api/admin/analysis").await;
    assert_eq!(report["total_photos"], 2);
    assert!(report["category_distribution"].is_array());
    assert!(report["recent_analysis"].is_array());
}

#[tokio::test]
async fn test_admin_can_delete_any_photo() {
    let server = TestServer::new().await;
    let admin = server.admin_token().await;
    let (_id, owner) = server.create_user("shooter", "photographer").await;
    let id = server.approved_photo(&owner, &admin, "Removed").await;

    let response = server
        .client
        .delete(server.url(&format!("/api/admin/photos/{}", id)))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let response = server
        .client
        .get(server.url(&format!("/api/photos/{}", id)))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 404);
}
