//! E2E tests for uploads, moderation visibility and interactions

mod common;

use common::TestServer;
use serde_json::{Value, json};

async fn public_photo_ids(server: &TestServer) -> Vec<i64> {
    let body: Value = server
        .client
        .get(server.url("/api/photos"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    body["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|photo| photo["id"].as_i64().unwrap())
        .collect()
}

#[tokio::test]
async fn test_upload_starts_pending_and_hidden() {
    let server = TestServer::new().await;
    let (_id, token) = server.create_user("shooter", "photographer").await;

    let photo = server.upload_photo(&token, "Campus at dusk").await;
    assert_eq!(photo["approval_status"], "pending");
    assert_eq!(photo["is_approved"], false);
    assert!(photo["image_url"].as_str().unwrap().starts_with("/media/"));
    assert!(photo["quality_score"].is_number());

    let id = photo["id"].as_i64().unwrap();
    assert!(!public_photo_ids(&server).await.contains(&id));

    // Anonymous readers cannot see a pending photo
    let response = server
        .client
        .get(server.url(&format!("/api/photos/{}", id)))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 404);

    // The owner still can
    let response = server
        .client
        .get(server.url(&format!("/api/photos/{}", id)))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
}

#[tokio::test]
async fn test_approval_is_visible_immediately() {
    let server = TestServer::new().await;
    let admin = server.admin_token().await;
    let (_id, token) = server.create_user("shooter", "photographer").await;

    let photo = server.upload_photo(&token, "Library steps").await;
    let id = photo["id"].as_i64().unwrap();

    let approved = server.approve_photo(&admin, id).await;
    assert_eq!(approved["approval_status"], "approved");
    assert!(approved["approved_by"].is_number());
    assert!(public_photo_ids(&server).await.contains(&id));

    // Locally stored media is served under /media
    let image_url = approved["image_url"].as_str().unwrap();
    let response = server.client.get(server.url(image_url)).send().await.unwrap();
    assert_eq!(response.status(), 200);

    // A second review is refused
    let response = server
        .client
        .put(server.url(&format!("/api/admin/photos/{}/approve", id)))
        .bearer_auth(&admin)
        .json(&json!({"approval_status": "rejected"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn test_upload_rejects_unsupported_extension() {
    let server = TestServer::new().await;
    let (_id, token) = server.create_user("shooter", "photographer").await;

    let response = server.try_upload(&token, "Animated", "photo.gif").await;
    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn test_upload_requires_authentication() {
    let server = TestServer::new().await;

    let response = server
        .client
        .post(server.url("/api/photos/upload"))
        .multipart(reqwest::multipart::Form::new().text("title", "anon"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 401);
}

#[tokio::test]
async fn test_like_toggles_and_detail_counts_views() {
    let server = TestServer::new().await;
    let admin = server.admin_token().await;
    let (_owner, owner_token) = server.create_user("shooter", "photographer").await;
    let (_fan, fan_token) = server.create_user("fan", "student").await;
    let id = server.approved_photo(&owner_token, &admin, "Quad").await;

    let interact = |kind: &'static str| {
        server
            .client
            .post(server.url(&format!("/api/photos/{}/interact", id)))
            .bearer_auth(&fan_token)
            .json(&json!({"type": kind}))
            .send()
    };

    let liked: Value = interact("like").await.unwrap().json().await.unwrap();
    assert_eq!(liked["active"], true);
    assert_eq!(liked["likes"], 1);

    let unliked: Value = interact("like").await.unwrap().json().await.unwrap();
    assert_eq!(unliked["active"], false);
    assert_eq!(unliked["likes"], 0);

    let response = interact("share").await.unwrap();
    assert_eq!(response.status(), 400);

    let detail: Value = server
        .client
        .get(server.url(&format!("/api/photos/{}", id)))
        .bearer_auth(&fan_token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(detail["views"], 1);
    assert_eq!(detail["is_liked"], false);
}

#[tokio::test]
async fn test_only_owner_or_admin_can_delete() {
    let server = TestServer::new().await;
    let admin = server.admin_token().await;
    let (_owner, owner_token) = server.create_user("shooter", "photographer").await;
    let (_other, other_token) = server.create_user("other", "student").await;
    let id = server.approved_photo(&owner_token, &admin, "Fountain").await;

    let response = server
        .client
        .delete(server.url(&format!("/api/photos/{}", id)))
        .bearer_auth(&other_token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 403);

    let response = server
        .client
        .delete(server.url(&format!("/api/photos/{}", id)))
        .bearer_auth(&owner_token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    assert!(!public_photo_ids(&server).await.contains(&id));
}

#[tokio::test]
async fn test_my_photos_filters_by_status() {
    let server = TestServer::new().await;
    let admin = server.admin_token().await;
    let (_owner, token) = server.create_user("shooter", "photographer").await;
    server.approved_photo(&token, &admin, "Approved one").await;
    server.upload_photo(&token, "Pending one").await;

    let body: Value = server
        .client
        .get(server.url("/api/photos/me/photos?status_filter=pending"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["total"], 1);
    assert_eq!(body["items"][0]["title"], "Pending one");

    let response = server
        .client
        .get(server.url("/api/photos/me/photos?size=0"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn test_listing_rejects_pages_beyond_the_offset_range() {
    let server = TestServer::new().await;

    let response = server
        .client
        .get(server.url("/api/photos?page=9223372036854775807&size=100"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);

    let response = server
        .client
        .get(server.url("/api/photos?page=2&size=100"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
}
