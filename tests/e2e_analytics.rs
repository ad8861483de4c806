//! E2E tests for the analytics reports

mod common;

use chrono::{Duration, Utc};
use common::TestServer;
use serde_json::{Value, json};

async fn get_json(server: &TestServer, path: &str) -> Value {
    let response = server.client.get(server.url(path)).send().await.unwrap();
    assert_eq!(response.status(), 200, "GET {} failed", path);
    response.json().await.unwrap()
}

async fn interact(server: &TestServer, token: &str, photo_id: i64, kind: &str) {
    let response = server
        .client
        .post(server.url(&format!("/api/photos/{}/interact", photo_id)))
        .bearer_auth(token)
        .json(&json!({"type": kind}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
}

async fn set_theme(server: &TestServer, admin: &str, photo_id: i64, theme: &str) {
    let response = server
        .client
        .put(server.url(&format!("/api/admin/photos/{}/analysis", photo_id)))
        .bearer_auth(admin)
        .json(&json!({"theme": theme}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
}

#[tokio::test]
async fn test_hot_rankings_follow_heat_and_theme() {
    let server = TestServer::new().await;
    let admin = server.admin_token().await;
    let (owner_id, owner) = server.create_user("shooter", "photographer").await;
    let (_fan, fan) = server.create_user("fan", "student").await;

    let portrait = server.approved_photo(&owner, &admin, "Portrait").await;
    let landscape = server.approved_photo(&owner, &admin, "Landscape").await;
    set_theme(&server, &admin, portrait, "portrait").await;
    set_theme(&server, &admin, landscape, "nature_landscape").await;
    interact(&server, &fan, landscape, "like").await;

    let hot = get_json(&server, "/api/analytics/rankings/hot").await;
    assert_eq!(hot["period"], "week");
    assert_eq!(hot["total"], 2);
    assert_eq!(hot["rankings"][0]["rank"], 1);
    assert_eq!(hot["rankings"][0]["photo"]["id"], landscape);
    assert_eq!(hot["rankings"][0]["score"], hot["rankings"][0]["photo"]["heat_score"]);
    assert_eq!(hot["rankings"][0]["user"]["id"], owner_id);

    let themed = get_json(&server, "/api/analytics/rankings/hot?theme=portrait&period=all").await;
    assert_eq!(themed["theme"], "portrait");
    assert_eq!(themed["total"], 1);
    assert_eq!(themed["rankings"][0]["photo"]["id"], portrait);

    for path in [
        "/api/analytics/rankings/hot?period=weekly",
        "/api/analytics/rankings/hot?limit=0",
        "/api/analytics/themes/popularity?period=decade",
    ] {
        let response = server.client.get(server.url(path)).send().await.unwrap();
        assert_eq!(response.status(), 400, "{} should be rejected", path);
    }
}

#[tokio::test]
async fn test_competition_rankings_order_entries() {
    let server = TestServer::new().await;
    let admin = server.admin_token().await;
    let (_owner_id, owner) = server.create_user("shooter", "photographer").await;
    let (_fan, fan) = server.create_user("fan", "student").await;

    let start = Utc::now();
    let competition: Value = server
        .client
        .post(server.url("/api/competitions"))
        .bearer_auth(&admin)
        .json(&json!({
            "name": "Campus at night",
            "start_time": start.to_rfc3339(),
            "end_time": (start + Duration::days(7)).to_rfc3339(),
        }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let id = competition["id"].as_i64().unwrap();
    let response = server
        .client
        .post(server.url(&format!("/api/competitions/{}/start", id)))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let first = server.approved_photo(&owner, &admin, "Lanterns").await;
    let second = server.approved_photo(&owner, &admin, "Library").await;
    for photo_id in [first, second] {
        let response = server
            .client
            .post(server.url(&format!("/api/competitions/{}/join?photo_id={}", id, photo_id)))
            .bearer_auth(&owner)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 200);
    }
    interact(&server, &fan, second, "like").await;
    interact(&server, &fan, second, "favorite").await;

    let standings = get_json(
        &server,
        &format!("/api/analytics/rankings/competition/{}", id),
    )
    .await;
    assert_eq!(standings["competition"]["name"], "Campus at night");
    assert_eq!(standings["competition"]["status"], "active");
    assert_eq!(standings["total"], 2);
    assert_eq!(standings["rankings"][0]["photo"]["id"], second);
    // favorites·2 + likes
    assert_eq!(standings["rankings"][0]["score"], 3);
    assert_eq!(standings["rankings"][1]["photo"]["id"], first);
    assert_eq!(standings["rankings"][1]["rank"], 2);

    let response = server
        .client
        .get(server.url("/api/analytics/rankings/competition/9999"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 404);
}

#[tokio::test]
async fn test_user_stats_report() {
    let server = TestServer::new().await;
    let admin = server.admin_token().await;
    let (owner_id, owner) = server.create_user("shooter", "photographer").await;
    let (_fan, fan) = server.create_user("fan", "student").await;

    let approved = server.approved_photo(&owner, &admin, "Approved").await;
    server.upload_photo(&owner, "Still pending").await;
    set_theme(&server, &admin, approved, "architecture").await;
    interact(&server, &fan, approved, "like").await;

    let stats = get_json(&server, &format!("/api/analytics/user-stats/{}", owner_id)).await;
    assert_eq!(stats["user"]["username"], "shooter");
    assert_eq!(stats["user"]["role"], "photographer");
    assert_eq!(stats["basic_stats"]["total_photos"], 2);
    assert_eq!(stats["basic_stats"]["approved_photos"], 1);
    assert_eq!(stats["basic_stats"]["total_likes"], 1);
    assert_eq!(
        stats["theme_distribution"],
        json!([{"theme": "architecture", "count": 1}])
    );
    assert_eq!(stats["popular_photos"][0]["id"], approved);
    assert_eq!(stats["upload_trend"][0]["count"], 2);

    let response = server
        .client
        .get(server.url("/api/analytics/user-stats/9999"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 404);
}

#[tokio::test]
async fn test_trending_and_interaction_summary() {
    let server = TestServer::new().await;
    let admin = server.admin_token().await;
    let (_owner_id, owner) = server.create_user("shooter", "photographer").await;
    let (fan_id, fan) = server.create_user("fan", "student").await;
    let (_other_id, other) = server.create_user("other", "student").await;

    let busy = server.approved_photo(&owner, &admin, "Busy").await;
    let quiet = server.approved_photo(&owner, &admin, "Quiet").await;
    interact(&server, &fan, busy, "like").await;
    interact(&server, &fan, busy, "favorite").await;
    interact(&server, &other, quiet, "like").await;

    let trending = get_json(&server, "/api/analytics/trending?hours=1").await;
    assert_eq!(trending["period_hours"], 1);
    let photos = trending["trending_photos"].as_array().unwrap();
    assert_eq!(photos.len(), 2);
    assert_eq!(photos[0]["photo"]["id"], busy);
    assert_eq!(photos[0]["recent_interactions"], 2);
    assert_eq!(photos[0]["trend_score"], 2);
    assert_eq!(photos[0]["total_interactions"], 2);
    assert_eq!(photos[1]["photo"]["id"], quiet);

    let summary = get_json(&server, "/api/analytics/interactions/summary").await;
    assert_eq!(summary["period_days"], 7);
    assert_eq!(
        summary["interaction_stats"],
        json!([{"type": "favorite", "count": 1}, {"type": "like", "count": 2}])
    );
    assert_eq!(summary["active_users"][0]["user_id"], fan_id);
    assert_eq!(summary["active_users"][0]["interaction_count"], 2);
    let daily: i64 = summary["daily_trends"]
        .as_array()
        .unwrap()
        .iter()
        .map(|row| row["count"].as_i64().unwrap())
        .sum();
    assert_eq!(daily, 3);

    for path in [
        "/api/analytics/trending?hours=169",
        "/api/analytics/trending?limit=51",
        "/api/analytics/interactions/summary?days=0",
    ] {
        let response = server.client.get(server.url(path)).send().await.unwrap();
        assert_eq!(response.status(), 400, "{} should be rejected", path);
    }
}

#[tokio::test]
async fn test_theme_popularity_scores() {
    let server = TestServer::new().await;
    let admin = server.admin_token().await;
    let (_owner_id, owner) = server.create_user("shooter", "photographer").await;
    let (_fan, fan) = server.create_user("fan", "student").await;

    let first = server.approved_photo(&owner, &admin, "Lake").await;
    let second = server.approved_photo(&owner, &admin, "Hill").await;
    let third = server.approved_photo(&owner, &admin, "Friend").await;
    set_theme(&server, &admin, first, "nature_landscape").await;
    set_theme(&server, &admin, second, "nature_landscape").await;
    set_theme(&server, &admin, third, "portrait").await;
    interact(&server, &fan, first, "like").await;

    let report = get_json(&server, "/api/analytics/themes/popularity").await;
    assert_eq!(report["period"], "month");
    let themes = report["theme_analysis"].as_array().unwrap();
    assert_eq!(themes.len(), 2);
    assert_eq!(themes[0]["theme"], "nature_landscape");
    assert_eq!(themes[0]["upload_count"], 2);
    assert_eq!(themes[0]["total_interactions"], 1);
    assert_eq!(themes[0]["avg_interactions"], 0.5);
    // 2·0.3 + 0.5·0.7
    assert_eq!(themes[0]["popularity_score"], 0.95);
    assert_eq!(themes[1]["theme"], "portrait");
    assert_eq!(themes[1]["popularity_score"], 0.3);
}

#[tokio::test]
async fn test_photographer_performance_is_scoped_by_role() {
    let server = TestServer::new().await;
    let admin = server.admin_token().await;
    let (shooter_id, shooter) = server.create_user("shooter", "photographer").await;
    let (other_id, _other) = server.create_user("other", "photographer").await;
    let (_student_id, student) = server.create_user("student", "student").await;

    for (photographer_id, hours_ahead) in [(shooter_id, 72), (shooter_id, 96), (other_id, 72)] {
        let response = server
            .client
            .post(server.url("/api/appointments"))
            .bearer_auth(&student)
            .json(&json!({
                "photographer_id": photographer_id,
                "title": "Club photos",
                "preferred_time": (Utc::now() + Duration::hours(hours_ahead)).to_rfc3339(),
            }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 200);
    }

    let path = "/api/analytics/photographers/performance";
    let response = server.client.get(server.url(path)).send().await.unwrap();
    assert_eq!(response.status(), 401);
    let response = server
        .client
        .get(server.url(path))
        .bearer_auth(&student)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 403);

    let own: Value = server
        .client
        .get(server.url(path))
        .bearer_auth(&shooter)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(own["photographer_id"], shooter_id);
    assert_eq!(own["appointment_stats"]["total"], 2);
    assert_eq!(own["appointment_stats"]["by_status"]["pending"], 2);
    assert_eq!(own["appointment_stats"]["by_status"]["completed"], 0);
    assert_eq!(own["appointment_stats"]["avg_rating"], 0.0);
    assert_eq!(own["monthly_trend"][0]["count"], 2);

    let everyone: Value = server
        .client
        .get(server.url(path))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(everyone["photographer_id"].is_null());
    assert_eq!(everyone["appointment_stats"]["total"], 3);
}
