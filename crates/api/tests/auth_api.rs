//! HTTP-level tests for registration, login and token handling.

mod common;

use axum::http::StatusCode;
use common::{body_json, get, get_auth, post_json, signup, TEST_PASSWORD};
use serde_json::json;
use sqlx::SqlitePool;

#[sqlx::test(migrations = "../db/migrations")]
async fn register_then_login_then_me(pool: SqlitePool) {
    let (app, _media) = common::build_test_app(pool);

    let response = post_json(
        &app,
        "/api/v1/auth/register",
        json!({ "username": "alice", "email": "alice@example.com", "password": TEST_PASSWORD }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let registered = body_json(response).await;
    assert_eq!(registered["data"]["username"], "alice");
    assert!(registered["data"].get("password_hash").is_none());

    let response = post_json(
        &app,
        "/api/v1/auth/login",
        json!({ "username": "alice", "password": TEST_PASSWORD }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let login = body_json(response).await;
    assert!(login["access_token"].is_string());
    assert_eq!(login["expires_in"], 3600);
    assert_eq!(login["user"]["email"], "alice@example.com");

    let token = login["access_token"].as_str().unwrap();
    let me = body_json(get_auth(&app, "/api/v1/auth/me", token).await).await;
    assert_eq!(me["data"]["id"], registered["data"]["id"]);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn wrong_password_is_unauthorized(pool: SqlitePool) {
    let (app, _media) = common::build_test_app(pool);
    signup(&app, "alice").await;

    let response = post_json(
        &app,
        "/api/v1/auth/login",
        json!({ "username": "alice", "password": "not-the-password" }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["code"], "UNAUTHORIZED");
}

#[sqlx::test(migrations = "../db/migrations")]
async fn short_password_is_rejected(pool: SqlitePool) {
    let (app, _media) = common::build_test_app(pool);

    let response = post_json(
        &app,
        "/api/v1/auth/register",
        json!({ "username": "alice", "email": "alice@example.com", "password": "short" }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "VALIDATION_ERROR");
}

#[sqlx::test(migrations = "../db/migrations")]
async fn duplicate_username_conflicts(pool: SqlitePool) {
    let (app, _media) = common::build_test_app(pool);
    signup(&app, "alice").await;

    let response = post_json(
        &app,
        "/api/v1/auth/register",
        json!({ "username": "alice", "email": "other@example.com", "password": TEST_PASSWORD }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn registration_can_be_closed(pool: SqlitePool) {
    let (app, _media) = common::build_test_app_with(pool, |config| {
        config.allow_registration = false;
    });

    let response = post_json(
        &app,
        "/api/v1/auth/register",
        json!({ "username": "alice", "email": "alice@example.com", "password": TEST_PASSWORD }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn me_rejects_missing_and_bad_tokens(pool: SqlitePool) {
    let (app, _media) = common::build_test_app(pool);

    assert_eq!(get(&app, "/api/v1/auth/me").await.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        get_auth(&app, "/api/v1/auth/me", "not.a.jwt").await.status(),
        StatusCode::UNAUTHORIZED
    );
}
