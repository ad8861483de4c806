//! E2E tests for registration, login and session endpoints

mod common;

use common::{TEST_PASSWORD, TestServer};
use serde_json::{Value, json};

#[tokio::test]
async fn test_register_then_login_returns_bearer_token() {
    let server = TestServer::new().await;

    let response = server
        .client
        .post(server.url("/api/auth/register"))
        .json(&json!({
            "username": "alice",
            "email": "alice@example.com",
            "password": "secret123",
        }))
        .send()
        .await
        .expect("request succeeds");
    assert_eq!(response.status(), 200);
    let user: Value = response.json().await.unwrap();
    assert_eq!(user["role"], "student");
    assert!(user.get("password_hash").is_none());

    let response = server
        .client
        .post(server.url("/api/auth/login"))
        .json(&json!({"username": "alice@example.com", "password": "secret123"}))
        .send()
        .await
        .expect("request succeeds");
    assert_eq!(response.status(), 200);

    let cookie = response
        .headers()
        .get("set-cookie")
        .and_then(|v| v.to_str().ok())
        .expect("token cookie")
        .to_string();
    assert!(cookie.starts_with("campusphoto_token="));
    assert!(cookie.contains("HttpOnly"));

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["token_type"], "bearer");
    assert_eq!(body["expires_in"], 1800);
    assert_eq!(body["user"]["username"], "alice");
}

#[tokio::test]
async fn test_register_rejects_duplicates_and_admin_role() {
    let server = TestServer::new().await;
    server.create_user("bob", "student").await;

    let duplicate = server
        .client
        .post(server.url("/api/auth/register"))
        .json(&json!({
            "username": "bob",
            "email": "other@example.com",
            "password": "secret123",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(duplicate.status(), 400);

    let admin = server
        .client
        .post(server.url("/api/auth/register"))
        .json(&json!({
            "username": "mallory",
            "email": "mallory@example.com",
            "password": "secret123",
            "role": "admin",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(admin.status(), 400);
}

#[tokio::test]
async fn test_wrong_password_is_unauthorized() {
    let server = TestServer::new().await;
    server.create_user("carol", "student").await;

    let response = server
        .client
        .post(server.url("/api/auth/login"))
        .json(&json!({"username": "carol", "password": "wrong-password"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 401);
}

#[tokio::test]
async fn test_me_accepts_bearer_and_cookie() {
    let server = TestServer::new().await;
    let (id, token) = server.create_user("dave", "photographer").await;

    let bearer: Value = server
        .client
        .get(server.url("/api/auth/me"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(bearer["id"], id);
    assert_eq!(bearer["role"], "photographer");

    let response = server
        .client
        .get(server.url("/api/auth/me"))
        .header("Cookie", format!("campusphoto_token={}", token))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let response = server
        .client
        .get(server.url("/api/auth/me"))
        .bearer_auth("not-a-token")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 401);
}

#[tokio::test]
async fn test_change_password_then_login_with_new_password() {
    let server = TestServer::new().await;
    let (_id, token) = server.create_user("erin", "student").await;

    let wrong = server
        .client
        .post(server.url("/api/auth/change-password"))
        .bearer_auth(&token)
        .json(&json!({"old_password": "nope-nope", "new_password": "newsecret1"}))
        .send()
        .await
        .unwrap();
    assert_eq!(wrong.status(), 400);

    let response = server
        .client
        .post(server.url("/api/auth/change-password"))
        .bearer_auth(&token)
        .json(&json!({"old_password": TEST_PASSWORD, "new_password": "newsecret1"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    server.login("erin", "newsecret1").await;
}

#[tokio::test]
async fn test_deactivated_user_loses_access() {
    let server = TestServer::new().await;
    let admin = server.admin_token().await;
    let (id, token) = server.create_user("frank", "student").await;

    let response = server
        .client
        .post(server.url(&format!("/api/users/{}/deactivate", id)))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    // The still-valid token is refused once the account is inactive
    let response = server
        .client
        .get(server.url("/api/auth/me"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 401);
}

#[tokio::test]
async fn test_refresh_issues_new_token() {
    let server = TestServer::new().await;
    let (_id, token) = server.create_user("grace", "student").await;

    let response = server
        .client
        .post(server.url("/api/auth/refresh"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    let refreshed = body["access_token"].as_str().unwrap();

    let response = server
        .client
        .get(server.url("/api/auth/me"))
        .bearer_auth(refreshed)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
}
