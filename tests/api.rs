mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use serde_json::{Value, json};

use common::TestServer;
use steadfast::billing::{SIGNATURE_HEADER, sign};

const BILLING_SECRET: &str = "whsec_test";

#[tokio::test]
async fn test_health_and_levels_are_public() {
    let server = TestServer::start();

    let (status, _) = server.request("GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = server.request("GET", "/api/v1/levels", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    let tiers = body["data"]["tiers"].as_array().expect("tiers");
    assert_eq!(tiers[0]["level"], 1);
    assert_eq!(tiers[0]["xp_threshold"], 0);
    assert_eq!(tiers.last().expect("last tier")["level"], 50);
}

#[tokio::test]
async fn test_requests_without_token_are_rejected() {
    let server = TestServer::start();

    let response = server
        .send(
            Request::builder()
                .uri("/api/v1/me")
                .body(Body::empty())
                .expect("request"),
        )
        .await;
    assert_eq!(response.0, StatusCode::UNAUTHORIZED);
    assert_eq!(response.1["success"], false);

    let (status, _) = server
        .request("GET", "/api/v1/me", Some("steadfast_nope_nope"), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_admin_token_cannot_use_user_routes() {
    let server = TestServer::start();
    let (status, _) = server.get("/api/v1/me", &server.admin_token).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (_, user_token) = server.create_user("Sam");
    let (status, _) = server.get("/api/v1/admin/users", &user_token).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_check_in_then_duplicate_is_conflict() {
    let server = TestServer::start();
    let (_, token) = server.create_user("Sam");

    let (status, body) = server
        .request("POST", "/api/v1/check-ins", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let data = &body["data"];
    assert_eq!(data["streak_days"], 1);
    assert_eq!(data["xp_gained"], 10);
    assert_eq!(data["total_xp"], 10);
    assert_eq!(data["level"], 1);
    assert_eq!(data["leveled_up"], false);
    assert_eq!(data["tier"]["name"], "Seedling");

    let (status, body) = server
        .request("POST", "/api/v1/check-ins", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["success"], false);
    assert!(body["error"].as_str().expect("error").contains("Already checked in"));

    let (status, body) = server.get("/api/v1/progress", &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["progress"]["xp"], 10);
    assert_eq!(body["data"]["checked_in_today"], true);
    assert_eq!(body["data"]["active_streak"]["duration_days"], 1);
}

#[tokio::test]
async fn test_reset_is_idempotent() {
    let server = TestServer::start();
    let (_, token) = server.create_user("Sam");

    let (status, body) = server
        .request("POST", "/api/v1/streak/reset", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["reset"], false);
    assert_eq!(body["data"]["total_relapses"], 0);

    server
        .request("POST", "/api/v1/check-ins", Some(&token), None)
        .await;

    let (_, body) = server
        .request("POST", "/api/v1/streak/reset", Some(&token), None)
        .await;
    assert_eq!(body["data"]["reset"], true);
    assert_eq!(body["data"]["total_relapses"], 1);
    assert_eq!(body["data"]["ended_streak"]["is_active"], false);

    let (_, body) = server
        .request("POST", "/api/v1/streak/reset", Some(&token), None)
        .await;
    assert_eq!(body["data"]["reset"], false);
    assert_eq!(body["data"]["total_relapses"], 1);

    // XP survives a relapse.
    let (_, body) = server.get("/api/v1/me", &token).await;
    assert_eq!(body["data"]["xp"], 10);
    assert_eq!(body["data"]["total_relapses"], 1);

    let (_, body) = server.get("/api/v1/streaks", &token).await;
    assert_eq!(body["data"].as_array().expect("streaks").len(), 1);
}

#[tokio::test]
async fn test_profile_and_onboarding() {
    let server = TestServer::start();
    let (_, token) = server.create_user("Sam");

    let (status, _) = server
        .post(
            "/api/v1/onboarding",
            &token,
            json!({ "display_name": "Sam", "goals": [] }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = server
        .post(
            "/api/v1/onboarding",
            &token,
            json!({
                "display_name": " Samira ",
                "goals": ["sleep earlier", "sleep earlier", "walk daily"],
                "triggers": ["late nights"]
            }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let data = &body["data"];
    assert_eq!(data["display_name"], "Samira");
    assert_eq!(data["goals"], json!(["sleep earlier", "walk daily"]));
    assert!(data["onboarding_completed_at"].is_string());
    assert_eq!(data["progress"]["tier"]["name"], "Seedling");

    let (status, body) = server
        .request(
            "PATCH",
            "/api/v1/me",
            Some(&token),
            Some(json!({ "triggers": ["boredom"] })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["triggers"], json!(["boredom"]));
    assert_eq!(body["data"]["display_name"], "Samira");
}

#[tokio::test]
async fn test_admin_user_lifecycle_and_xp_award() {
    let server = TestServer::start();
    let admin = server.admin_token.clone();

    let (status, body) = server
        .post("/api/v1/admin/users", &admin, json!({ "display_name": "Riley" }))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let user_id = body["data"]["id"].as_str().expect("user id").to_string();
    assert_eq!(body["data"]["level"], 1);

    let (status, body) = server
        .post(&format!("/api/v1/admin/users/{user_id}/tokens"), &admin, json!({}))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let user_token = body["data"]["token"].as_str().expect("token").to_string();
    assert!(user_token.starts_with("steadfast_"));

    let (status, _) = server
        .post(
            &format!("/api/v1/admin/users/{user_id}/xp"),
            &admin,
            json!({ "amount": 0 }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = server
        .post(
            &format!("/api/v1/admin/users/{user_id}/xp"),
            &admin,
            json!({ "amount": 130 }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total_xp"], 130);
    assert_eq!(body["data"]["level"], 3);
    assert_eq!(body["data"]["leveled_up"], true);

    let (_, body) = server.get("/api/v1/me", &user_token).await;
    assert_eq!(body["data"]["progress"]["tier"]["name"], "Sapling");

    let (status, _) = server
        .post(
            "/api/v1/admin/users/missing/xp",
            &admin,
            json!({ "amount": 5 }),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = server
        .request(
            "DELETE",
            &format!("/api/v1/admin/users/{user_id}"),
            Some(&admin),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = server.get("/api/v1/me", &user_token).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_admin_cannot_delete_own_token() {
    let server = TestServer::start();
    let admin = server.admin_token.clone();

    let (_, body) = server.get("/api/v1/admin/tokens", &admin).await;
    let tokens = body["data"].as_array().expect("tokens");
    assert_eq!(tokens.len(), 1);
    let id = tokens[0]["id"].as_str().expect("id").to_string();

    let (status, _) = server
        .request(
            "DELETE",
            &format!("/api/v1/admin/tokens/{id}"),
            Some(&admin),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_community_posts_likes_and_comments() {
    let server = TestServer::start();
    let (_, alice) = server.create_user("Alice");
    let (_, bob) = server.create_user("Bob");

    let (status, _) = server
        .post("/api/v1/posts", &alice, json!({ "body": "   " }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = server
        .post("/api/v1/posts", &alice, json!({ "body": "Day one done." }))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let post_id = body["data"]["id"].as_str().expect("post id").to_string();
    assert_eq!(body["data"]["author_name"], "Alice");

    for _ in 0..2 {
        let (status, _) = server
            .request("PUT", &format!("/api/v1/posts/{post_id}/like"), Some(&bob), None)
            .await;
        assert_eq!(status, StatusCode::NO_CONTENT);
    }

    let (status, _) = server
        .post(
            &format!("/api/v1/posts/{post_id}/comments"),
            &bob,
            json!({ "body": "Proud of you" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (_, body) = server.get(&format!("/api/v1/posts/{post_id}"), &bob).await;
    assert_eq!(body["data"]["like_count"], 1);
    assert_eq!(body["data"]["comment_count"], 1);
    assert_eq!(body["data"]["liked_by_me"], true);

    let (_, body) = server.get("/api/v1/posts", &alice).await;
    assert_eq!(body["has_more"], false);
    assert_eq!(body["data"][0]["liked_by_me"], false);

    let (_, body) = server
        .get(&format!("/api/v1/posts/{post_id}/comments"), &alice)
        .await;
    assert_eq!(body["data"][0]["author_name"], "Bob");

    let (status, _) = server
        .request("DELETE", &format!("/api/v1/posts/{post_id}"), Some(&bob), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = server
        .request("DELETE", &format!("/api/v1/posts/{post_id}"), Some(&alice), None)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = server.get(&format!("/api/v1/posts/{post_id}"), &alice).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_coach_falls_back_without_provider() {
    let server = TestServer::start();
    let (_, token) = server.create_user("Sam");

    let (status, body) = server
        .post(
            "/api/v1/coach/messages",
            &token,
            json!({ "message": "Rough evening, cravings are loud." }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["message"]["role"], "user");
    assert_eq!(body["data"]["reply"]["role"], "coach");
    assert_eq!(body["data"]["reply"]["is_fallback"], true);
    assert_eq!(
        body["data"]["reply"]["content"],
        steadfast::coach::FALLBACK_REPLY
    );

    let (_, body) = server.get("/api/v1/coach/messages", &token).await;
    let history = body["data"].as_array().expect("history");
    assert_eq!(history.len(), 2);
    assert_eq!(history[0]["role"], "user");
    assert_eq!(history[1]["role"], "coach");
}

fn billing_event(id: &str, event_type: &str, created: i64, user_id: &str, status: &str) -> Value {
    json!({
        "id": id,
        "type": event_type,
        "created": created,
        "data": {
            "subscription_id": "sub_1",
            "user_id": user_id,
            "status": status,
        }
    })
}

async fn deliver(server: &TestServer, event: &Value, secret: &str) -> (StatusCode, Value) {
    let body = event.to_string();
    let signature = sign(secret, body.as_bytes());
    server
        .send(
            Request::builder()
                .method("POST")
                .uri("/webhooks/billing")
                .header(header::CONTENT_TYPE, "application/json")
                .header(SIGNATURE_HEADER, signature)
                .body(Body::from(body))
                .expect("request"),
        )
        .await
}

#[tokio::test]
async fn test_billing_webhook_toggles_premium() {
    let server = TestServer::with_billing_secret(Some(BILLING_SECRET));
    let (user_id, token) = server.create_user("Sam");

    let created = billing_event("evt_1", "subscription.created", 1_000, &user_id, "active");
    let (status, body) = deliver(&server, &created, "wrong-secret").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);

    let (status, body) = deliver(&server, &created, BILLING_SECRET).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["applied"], true);
    assert_eq!(body["data"]["is_premium"], true);

    let (_, body) = server.get("/api/v1/me", &token).await;
    assert_eq!(body["data"]["is_premium"], true);

    let canceled = billing_event("evt_2", "subscription.canceled", 2_000, &user_id, "active");
    let (_, body) = deliver(&server, &canceled, BILLING_SECRET).await;
    assert_eq!(body["data"]["is_premium"], false);

    // A late redelivery of the older event does not restore premium.
    let (_, body) = deliver(&server, &created, BILLING_SECRET).await;
    assert_eq!(body["data"]["applied"], false);
    assert_eq!(body["data"]["is_premium"], false);

    let other = billing_event("evt_3", "invoice.paid", 3_000, &user_id, "paid");
    let (status, body) = deliver(&server, &other, BILLING_SECRET).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["applied"], false);
}

#[tokio::test]
async fn test_billing_webhook_disabled_without_secret() {
    let server = TestServer::start();
    let event = billing_event("evt_1", "subscription.created", 1_000, "u", "active");
    let (status, _) = deliver(&server, &event, BILLING_SECRET).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}
