//! E2E tests for competition lifecycle and entries

mod common;

use chrono::{Duration, Utc};
use common::TestServer;
use serde_json::{Value, json};

async fn create_competition(server: &TestServer, admin: &str, name: &str) -> Value {
    let start = Utc::now();
    let response = server
        .client
        .post(server.url("/api/competitions"))
        .bearer_auth(admin)
        .json(&json!({
            "name": name,
            "theme": "campus",
            "start_time": start.to_rfc3339(),
            "end_time": (start + Duration::days(7)).to_rfc3339(),
            "max_submissions": 2,
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    response.json().await.unwrap()
}

async fn admin_post(server: &TestServer, token: &str, path: &str) -> reqwest::Response {
    server
        .client
        .post(server.url(path))
        .bearer_auth(token)
        .send()
        .await
        .unwrap()
}

#[tokio::test]
async fn test_lifecycle_moves_forward_only() {
    let server = TestServer::new().await;
    let admin = server.admin_token().await;
    let competition = create_competition(&server, &admin, "Spring light").await;
    assert_eq!(competition["status"], "draft");
    let id = competition["id"].as_i64().unwrap();

    // Voting cannot open on a draft
    let response =
        admin_post(&server, &admin, &format!("/api/competitions/{}/start-voting", id)).await;
    assert_eq!(response.status(), 400);

    let started: Value = admin_post(&server, &admin, &format!("/api/competitions/{}/start", id))
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(started["status"], "active");

    let running: Value = server
        .client
        .get(server.url("/api/competitions/active/list"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(running[0]["id"], id);

    let voting: Value =
        admin_post(&server, &admin, &format!("/api/competitions/{}/start-voting", id))
            .await
            .json()
            .await
            .unwrap();
    assert_eq!(voting["status"], "voting");

    let closed: Value = admin_post(&server, &admin, &format!("/api/competitions/{}/close", id))
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(closed["status"], "closed");

    let response = admin_post(&server, &admin, &format!("/api/competitions/{}/close", id)).await;
    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn test_only_admins_manage_competitions() {
    let server = TestServer::new().await;
    let (_id, student) = server.create_user("student", "student").await;

    let response = server
        .client
        .post(server.url("/api/competitions"))
        .bearer_auth(&student)
        .json(&json!({
            "name": "Mine",
            "start_time": Utc::now().to_rfc3339(),
            "end_time": (Utc::now() + Duration::days(1)).to_rfc3339(),
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 403);
}

#[tokio::test]
async fn test_create_validates_times() {
    let server = TestServer::new().await;
    let admin = server.admin_token().await;
    let start = Utc::now();

    let response = server
        .client
        .post(server.url("/api/competitions"))
        .bearer_auth(&admin)
        .json(&json!({
            "name": "Backwards",
            "start_time": start.to_rfc3339(),
            "end_time": (start - Duration::days(1)).to_rfc3339(),
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn test_join_enters_photos_up_to_the_limit() {
    let server = TestServer::new().await;
    let admin = server.admin_token().await;
    let (_owner, owner) = server.create_user("shooter", "photographer").await;
    let (_other, other) = server.create_user("other", "photographer").await;

    let id = create_competition(&server, &admin, "Night shots").await["id"]
        .as_i64()
        .unwrap();

    // Entries only open once the competition is active
    let response = server
        .client
        .post(server.url(&format!("/api/competitions/{}/join", id)))
        .bearer_auth(&owner)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
    admin_post(&server, &admin, &format!("/api/competitions/{}/start", id)).await;

    let eligibility: Value = server
        .client
        .post(server.url(&format!("/api/competitions/{}/join", id)))
        .bearer_auth(&owner)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(eligibility["remaining_submissions"], 2);

    let first = server.approved_photo(&owner, &admin, "Stars").await;
    let second = server.approved_photo(&owner, &admin, "Moon").await;
    let third = server.approved_photo(&owner, &admin, "Streetlights").await;

    let join = |photo_id: i64, token: &str| {
        server
            .client
            .post(server.url(&format!("/api/competitions/{}/join?photo_id={}", id, photo_id)))
            .bearer_auth(token.to_string())
            .send()
    };

    // Someone else's photo cannot be entered
    assert_eq!(join(first, &other).await.unwrap().status(), 403);

    let entered: Value = join(first, &owner).await.unwrap().json().await.unwrap();
    assert_eq!(entered["remaining_submissions"], 1);
    // The same photo cannot be entered twice
    assert_eq!(join(first, &owner).await.unwrap().status(), 400);

    let entered: Value = join(second, &owner).await.unwrap().json().await.unwrap();
    assert_eq!(entered["remaining_submissions"], 0);
    assert_eq!(join(third, &owner).await.unwrap().status(), 400);

    let detail: Value = server
        .client
        .get(server.url(&format!("/api/competitions/{}", id)))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(detail["photos_count"], 2);
    assert_eq!(detail["participants_count"], 1);

    let leaderboard: Value = server
        .client
        .get(server.url(&format!("/api/competitions/{}/leaderboard", id)))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(leaderboard.as_array().unwrap().len(), 2);
    assert_eq!(leaderboard[0]["rank"], 1);

    // A competition with entries cannot be deleted
    let response = server
        .client
        .delete(server.url(&format!("/api/competitions/{}", id)))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn test_empty_competition_can_be_deleted() {
    let server = TestServer::new().await;
    let admin = server.admin_token().await;
    let id = create_competition(&server, &admin, "Cancelled").await["id"]
        .as_i64()
        .unwrap();

    let response = server
        .client
        .delete(server.url(&format!("/api/competitions/{}", id)))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let response = server
        .client
        .get(server.url(&format!("/api/competitions/{}", id)))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 404);
}
