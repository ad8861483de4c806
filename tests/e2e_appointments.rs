//! E2E tests for the appointment state machine

mod common;

use chrono::{Duration, Utc};
use common::TestServer;
use serde_json::{Value, json};

async fn book(
    server: &TestServer,
    student_token: &str,
    photographer_id: i64,
    hours_ahead: i64,
) -> reqwest::Response {
    let preferred_time = Utc::now() + Duration::hours(hours_ahead);
    server
        .client
        .post(server.url("/api/appointments"))
        .bearer_auth(student_token)
        .json(&json!({
            "photographer_id": photographer_id,
            "title": "Graduation portraits",
            "preferred_time": preferred_time.to_rfc3339(),
            "location": "Main gate",
        }))
        .send()
        .await
        .unwrap()
}

async fn act(server: &TestServer, token: &str, id: i64, query: &str) -> reqwest::Response {
    server
        .client
        .post(server.url(&format!("/api/appointments/{}/actions?{}", id, query)))
        .bearer_auth(token)
        .send()
        .await
        .unwrap()
}

#[tokio::test]
async fn test_full_lifecycle_accept_complete_rate() {
    let server = TestServer::new().await;
    let (photographer_id, photographer) = server.create_user("shooter", "photographer").await;
    let (_student_id, student) = server.create_user("student", "student").await;

    let response = book(&server, &student, photographer_id, 72).await;
    assert_eq!(response.status(), 200);
    let appointment: Value = response.json().await.unwrap();
    assert_eq!(appointment["status"], "pending");
    let id = appointment["id"].as_i64().unwrap();

    // Students cannot accept their own booking
    assert_eq!(act(&server, &student, id, "action=accept").await.status(), 403);

    let accepted: Value = act(&server, &photographer, id, "action=accept&notes=See%20you")
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(accepted["status"], "accepted");
    assert_eq!(accepted["notes"], "See you");

    // Named action route reaches the same transition
    let response = server
        .client
        .post(server.url(&format!("/api/appointments/{}/complete", id)))
        .bearer_auth(&photographer)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let completed: Value = response.json().await.unwrap();
    assert_eq!(completed["status"], "completed");

    assert_eq!(act(&server, &student, id, "action=rate&rating=6").await.status(), 400);
    let rated: Value = act(&server, &student, id, "action=rate&rating=5&review=Great")
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(rated["rating"], 5);
    assert_eq!(act(&server, &student, id, "action=rate&rating=4").await.status(), 400);

    let stats: Value = server
        .client
        .get(server.url("/api/appointments/my/statistics"))
        .bearer_auth(&photographer)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(stats["completed"], 1);
    assert_eq!(stats["avg_rating"], 5.0);
}

#[tokio::test]
async fn test_illegal_transitions_are_rejected() {
    let server = TestServer::new().await;
    let (photographer_id, photographer) = server.create_user("shooter", "photographer").await;
    let (_student_id, student) = server.create_user("student", "student").await;

    let appointment: Value = book(&server, &student, photographer_id, 72)
        .await
        .json()
        .await
        .unwrap();
    let id = appointment["id"].as_i64().unwrap();

    // Cannot complete before accepting
    assert_eq!(act(&server, &photographer, id, "action=complete").await.status(), 400);

    assert_eq!(act(&server, &photographer, id, "action=reject").await.status(), 200);
    // Rejected is terminal
    assert_eq!(act(&server, &photographer, id, "action=accept").await.status(), 400);

    assert_eq!(act(&server, &photographer, id, "action=teleport").await.status(), 400);
    assert_eq!(act(&server, &photographer, id, "").await.status(), 400);
}

#[tokio::test]
async fn test_cancellation_window_is_enforced() {
    let server = TestServer::new().await;
    let (photographer_id, _photographer) = server.create_user("shooter", "photographer").await;
    let (_student_id, student) = server.create_user("student", "student").await;

    let soon: Value = book(&server, &student, photographer_id, 12)
        .await
        .json()
        .await
        .unwrap();
    let later: Value = book(&server, &student, photographer_id, 96)
        .await
        .json()
        .await
        .unwrap();

    let response = act(&server, &student, soon["id"].as_i64().unwrap(), "action=cancel").await;
    assert_eq!(response.status(), 400);

    let response = act(&server, &student, later["id"].as_i64().unwrap(), "action=cancel").await;
    assert_eq!(response.status(), 200);
    let cancelled: Value = response.json().await.unwrap();
    assert_eq!(cancelled["status"], "cancelled");
}

#[tokio::test]
async fn test_booking_validation() {
    let server = TestServer::new().await;
    let (photographer_id, _photographer) = server.create_user("shooter", "photographer").await;
    let (student_id, student) = server.create_user("student", "student").await;

    // Past time
    assert_eq!(book(&server, &student, photographer_id, -2).await.status(), 400);
    // Beyond the 30-day window
    assert_eq!(
        book(&server, &student, photographer_id, 24 * 31).await.status(),
        400
    );
    // Booking a non-photographer
    assert_eq!(book(&server, &student, student_id, 72).await.status(), 404);
}

#[tokio::test]
async fn test_status_cannot_be_set_through_update() {
    let server = TestServer::new().await;
    let (photographer_id, _photographer) = server.create_user("shooter", "photographer").await;
    let (_student_id, student) = server.create_user("student", "student").await;

    let appointment: Value = book(&server, &student, photographer_id, 72)
        .await
        .json()
        .await
        .unwrap();
    let id = appointment["id"].as_i64().unwrap();

    let response = server
        .client
        .put(server.url(&format!("/api/appointments/{}", id)))
        .bearer_auth(&student)
        .json(&json!({"status": "completed"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn test_outsiders_cannot_read_appointments() {
    let server = TestServer::new().await;
    let admin = server.admin_token().await;
    let (photographer_id, _photographer) = server.create_user("shooter", "photographer").await;
    let (_student_id, student) = server.create_user("student", "student").await;
    let (_other_id, other) = server.create_user("other", "student").await;

    let appointment: Value = book(&server, &student, photographer_id, 72)
        .await
        .json()
        .await
        .unwrap();
    let path = format!("/api/appointments/{}", appointment["id"]);

    let response = server
        .client
        .get(server.url(&path))
        .bearer_auth(&other)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 403);

    let detail: Value = server
        .client
        .get(server.url(&path))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(detail["photographer"]["id"], photographer_id);
    assert_eq!(detail["can_cancel"], true);

    let list: Value = server
        .client
        .get(server.url("/api/appointments"))
        .bearer_auth(&other)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(list["total"], 0);
}
