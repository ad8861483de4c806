//! E2E tests for photo and photographer rankings

mod common;

use common::TestServer;
use serde_json::{Value, json};

async fn like(server: &TestServer, token: &str, photo_id: i64) {
    let response = server
        .client
        .post(server.url(&format!("/api/photos/{}/interact", photo_id)))
        .bearer_auth(token)
        .json(&json!({"type": "like"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
}

async fn get_json(server: &TestServer, path: &str) -> Value {
    let response = server.client.get(server.url(path)).send().await.unwrap();
    assert_eq!(response.status(), 200, "GET {} failed", path);
    response.json().await.unwrap()
}

#[tokio::test]
async fn test_photo_rankings_follow_heat_then_id() {
    let server = TestServer::new().await;
    let admin = server.admin_token().await;
    let (_owner, owner_token) = server.create_user("shooter", "photographer").await;
    let (_fan, fan_token) = server.create_user("fan", "student").await;

    let quiet = server.approved_photo(&owner_token, &admin, "Quiet").await;
    let popular = server.approved_photo(&owner_token, &admin, "Popular").await;
    let tied = server.approved_photo(&owner_token, &admin, "Tied").await;
    // Pending photos never rank
    server.upload_photo(&owner_token, "Pending").await;

    like(&server, &fan_token, popular).await;

    let rankings = get_json(&server, "/api/rankings/photos?period=week&limit=10").await;
    let rankings = rankings.as_array().unwrap();
    let ids: Vec<i64> = rankings.iter().map(|p| p["id"].as_i64().unwrap()).collect();
    assert_eq!(ids, vec![popular, quiet, tied]);
    assert_eq!(rankings[0]["rank"], 1);
    assert_eq!(rankings[0]["user"]["username"], "shooter");
}

fn position(rankings: &Value, photo_id: i64) -> (i64, f64) {
    let entry = rankings
        .as_array()
        .unwrap()
        .iter()
        .find(|p| p["id"] == photo_id)
        .unwrap();
    (
        entry["rank"].as_i64().unwrap(),
        entry["heat_score"].as_f64().unwrap(),
    )
}

#[tokio::test]
async fn test_like_after_cached_rankings_never_lowers_rank() {
    let server = TestServer::new().await;
    let admin = server.admin_token().await;
    let (_owner, owner) = server.create_user("shooter", "photographer").await;
    let (_first_fan, first_fan) = server.create_user("fan1", "student").await;
    let (_second_fan, second_fan) = server.create_user("fan2", "student").await;

    let leader = server.approved_photo(&owner, &admin, "Leader").await;
    server.approved_photo(&owner, &admin, "Middle").await;
    let trailing = server.approved_photo(&owner, &admin, "Trailing").await;
    like(&server, &first_fan, leader).await;

    // The second read is answered from the cached entry
    let path = "/api/rankings/photos?period=week&limit=10";
    let before = get_json(&server, path).await;
    assert_eq!(get_json(&server, path).await, before);
    let (rank_before, heat_before) = position(&before, trailing);
    assert_eq!(rank_before, 3);

    like(&server, &first_fan, trailing).await;
    let after = get_json(&server, path).await;
    let (rank_after, heat_after) = position(&after, trailing);
    assert!(rank_after <= rank_before);
    assert!(heat_after > heat_before);

    like(&server, &second_fan, trailing).await;
    let last = get_json(&server, path).await;
    let (rank_last, _) = position(&last, trailing);
    assert!(rank_last <= rank_after);
    assert_eq!(rank_last, 1);
}

#[tokio::test]
async fn test_ranking_parameters_are_validated() {
    let server = TestServer::new().await;

    for path in [
        "/api/rankings/photos?period=fortnight",
        "/api/rankings/photos?limit=0",
        "/api/rankings/photos?limit=101",
        "/api/rankings/photos?strategy=redis",
        "/api/rankings/photographers?period=decade",
    ] {
        let response = server.client.get(server.url(path)).send().await.unwrap();
        assert_eq!(response.status(), 400, "{} should be rejected", path);
    }
}

#[tokio::test]
async fn test_photographer_rankings_and_stats() {
    let server = TestServer::new().await;
    let admin = server.admin_token().await;
    let (first_id, first) = server.create_user("first", "photographer").await;
    let (_second_id, second) = server.create_user("second", "photographer").await;
    let (_fan, fan) = server.create_user("fan", "student").await;

    let liked = server.approved_photo(&first, &admin, "Liked").await;
    server.approved_photo(&second, &admin, "Plain").await;
    like(&server, &fan, liked).await;

    let photographers = get_json(&server, "/api/rankings/photographers?period=month").await;
    let photographers = photographers.as_array().unwrap();
    assert_eq!(photographers.len(), 2);
    assert_eq!(photographers[0]["id"], first_id);
    assert_eq!(photographers[0]["rank"], 1);
    assert_eq!(photographers[0]["total_likes"], 1);

    let stats = get_json(&server, "/api/rankings/stats?period=year").await;
    assert_eq!(stats["total_photos"], 2);
    assert_eq!(stats["total_photographers"], 2);
    assert_eq!(stats["period"], "year");
}

#[tokio::test]
async fn test_recalculate_requires_admin() {
    let server = TestServer::new().await;
    let admin = server.admin_token().await;
    let (_id, student) = server.create_user("student", "student").await;

    let response = server
        .client
        .post(server.url("/api/rankings/recalculate"))
        .bearer_auth(&student)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 403);

    let response = server
        .client
        .post(server.url("/api/rankings/recalculate"))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert!(body["updated_count"].is_number());
}

#[tokio::test]
async fn test_new_weights_reorder_rankings() {
    let server = TestServer::new().await;
    let admin = server.admin_token().await;
    let (_owner, owner) = server.create_user("shooter", "photographer").await;
    let (_fan, fan) = server.create_user("fan", "student").await;

    let liked = server.approved_photo(&owner, &admin, "Liked").await;
    let viewed = server.approved_photo(&owner, &admin, "Viewed").await;
    like(&server, &fan, liked).await;
    for _ in 0..3 {
        get_json(&server, &format!("/api/photos/{}", viewed)).await;
    }

    // Views dominate once likes weigh nothing
    let response = server
        .client
        .put(server.url("/api/admin/configurations"))
        .bearer_auth(&admin)
        .json(&json!({"configurations": [{
            "key": "ranking_weights",
            "value": {"like": 0.0, "view": 1.0, "favorite": 0.0, "vote": 0.0}
        }]}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let rankings = get_json(&server, "/api/rankings/photos").await;
    assert_eq!(rankings[0]["id"], viewed);
    assert_eq!(rankings[0]["heat_score"], 3.0);
}
