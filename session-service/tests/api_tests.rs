mod common;

use common::TestApp;
use reqwest::StatusCode;
use serde_json::json;
use serde_json::Value;

async fn refresh(app: &TestApp, tokens: &Value) -> reqwest::Response {
    app.post("/api/auth/refresh")
        .json(&json!({
            "refresh_token_id": tokens["refresh_token_id"],
            "refresh_token": tokens["refresh_token"]
        }))
        .send()
        .await
        .expect("Failed to execute request")
}

#[tokio::test]
async fn test_register_success() {
    let app = TestApp::spawn().await;

    let data = app.register("nicola@example.com", "pass_word!").await;

    assert_eq!(data["user"]["email"], "nicola@example.com");
    assert_eq!(data["user"]["name"], "Test User");
    assert_eq!(data["user"]["is_active"], true);
    assert!(data["user"].get("password_hash").is_none());
    assert!(data["tokens"]["access_token"].is_string());
    assert!(data["tokens"]["refresh_token_id"].is_string());
    assert_eq!(data["tokens"]["refresh_token"].as_str().unwrap().len(), 64);
    assert_eq!(data["tokens"]["access_expires_in"], 900);
}

#[tokio::test]
async fn test_register_duplicate_email() {
    let app = TestApp::spawn().await;
    app.register("nicola@example.com", "pass_word!").await;

    let response = app
        .post("/api/auth/register")
        .json(&json!({
            "email": "nicola@example.com",
            "password": "pass_word!",
            "name": "Again"
        }))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["status_code"], 409);
}

#[tokio::test]
async fn test_register_invalid_input() {
    let app = TestApp::spawn().await;

    for body in [
        json!({ "email": "not-an-email", "password": "pass_word!", "name": "N" }),
        json!({ "email": "nicola@example.com", "password": "short", "name": "N" }),
        json!({ "email": "nicola@example.com", "password": "pass_word!", "name": "   " }),
    ] {
        let response = app
            .post("/api/auth/register")
            .json(&body)
            .send()
            .await
            .expect("Failed to execute request");

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }
}

#[tokio::test]
async fn test_login_failures_are_indistinguishable() {
    let app = TestApp::spawn().await;
    app.register("nicola@example.com", "pass_word!").await;

    let mut messages = Vec::new();
    for body in [
        json!({ "email": "nicola@example.com", "password": "wrong_password" }),
        json!({ "email": "ghost@example.com", "password": "pass_word!" }),
        json!({ "email": "not-an-email", "password": "pass_word!" }),
    ] {
        let response = app
            .post("/api/auth/login")
            .json(&body)
            .send()
            .await
            .expect("Failed to execute request");

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body: Value = response.json().await.expect("Failed to parse response");
        messages.push(body["data"]["message"].clone());
    }

    assert!(messages.windows(2).all(|pair| pair[0] == pair[1]));
}

#[tokio::test]
async fn test_login_then_me() {
    let app = TestApp::spawn().await;
    app.register("nicola@example.com", "pass_word!").await;

    let response = app
        .post("/api/auth/login")
        .json(&json!({ "email": "NICOLA@example.com", "password": "pass_word!" }))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.expect("Failed to parse response");
    let access_token = body["data"]["tokens"]["access_token"].as_str().unwrap();

    let response = app
        .get_authenticated("/api/auth/me", access_token)
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["data"]["email"], "nicola@example.com");
}

#[tokio::test]
async fn test_me_requires_bearer_token() {
    let app = TestApp::spawn().await;

    let missing = app
        .get("/api/auth/me")
        .send()
        .await
        .expect("Failed to execute request");
    let garbage = app
        .get_authenticated("/api/auth/me", "not.a.token")
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(missing.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(garbage.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_refresh_rotation_and_replay() {
    let app = TestApp::spawn().await;
    let data = app.register("nicola@example.com", "pass_word!").await;
    let original = data["tokens"].clone();

    let response = refresh(&app, &original).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.expect("Failed to parse response");
    let rotated = body["data"].clone();
    assert_ne!(rotated["refresh_token_id"], original["refresh_token_id"]);

    let replay = refresh(&app, &original).await;
    assert_eq!(replay.status(), StatusCode::UNAUTHORIZED);

    // The replay revoked the whole chain, including the rotated token.
    let after = refresh(&app, &rotated).await;
    assert_eq!(after.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_refresh_with_malformed_id() {
    let app = TestApp::spawn().await;

    let response = refresh(
        &app,
        &json!({ "refresh_token_id": "nope", "refresh_token": "secret" }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_logout_is_idempotent() {
    let app = TestApp::spawn().await;
    let data = app.register("nicola@example.com", "pass_word!").await;
    let body = json!({
        "refresh_token_id": data["tokens"]["refresh_token_id"],
        "refresh_token": data["tokens"]["refresh_token"]
    });

    for _ in 0..2 {
        let response = app
            .post("/api/auth/logout")
            .json(&body)
            .send()
            .await
            .expect("Failed to execute request");
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
    }

    let response = refresh(&app, &data["tokens"]).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_logout_all_ends_every_session() {
    let app = TestApp::spawn().await;
    let data = app.register("nicola@example.com", "pass_word!").await;
    let second = app
        .post("/api/auth/login")
        .json(&json!({ "email": "nicola@example.com", "password": "pass_word!" }))
        .send()
        .await
        .expect("Failed to execute request");
    let second: Value = second.json().await.expect("Failed to parse response");
    let access_token = data["tokens"]["access_token"].as_str().unwrap();

    let response = app
        .post_authenticated("/api/auth/logout-all", access_token)
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    assert_eq!(
        refresh(&app, &data["tokens"]).await.status(),
        StatusCode::UNAUTHORIZED
    );
    assert_eq!(
        refresh(&app, &second["data"]["tokens"]).await.status(),
        StatusCode::UNAUTHORIZED
    );
}

#[tokio::test]
async fn test_logout_all_requires_authentication() {
    let app = TestApp::spawn().await;

    let response = app
        .post("/api/auth/logout-all")
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
